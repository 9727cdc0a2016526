use std::collections::HashSet;
use std::ops::{Bound, RangeBounds};
use tracing::warn;

use crate::error::AnnotationError;
use crate::schema::{Annotation, Denotation, Relation, Span};
use crate::text;

/// Extracts the part of an annotation that falls inside a character range.
///
/// In strict mode (the default) a denotation cut by the range boundary, or a
/// relation with exactly one endpoint inside, is an error. Otherwise such
/// items are dropped and the slice is lossy.
pub struct AnnotationSlicer<'a> {
    annotation: &'a Annotation,
    strict: bool,
}

impl<'a> AnnotationSlicer<'a> {
    pub fn new(annotation: &'a Annotation) -> Self {
        Self {
            annotation,
            strict: true,
        }
    }

    pub fn strict_mode(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Sub-annotation for `range`, rebased so the range starts at 0.
    ///
    /// Both bounds must be given; `..10` or `5..` is rejected.
    pub fn annotation_in<R: RangeBounds<usize>>(&self, range: R) -> Result<Annotation, AnnotationError> {
        let range = resolve_range(&range)?;
        let denotations = self.denotations_in(range)?;
        let relations = self.relations_of(&denotations, range)?;

        Ok(Annotation {
            text: text::char_slice(&self.annotation.text, range.begin, range.end).to_string(),
            denotations,
            relations,
        })
    }

    fn denotations_in(&self, range: Span) -> Result<Vec<Denotation>, AnnotationError> {
        let mut kept = Vec::new();

        for denotation in &self.annotation.denotations {
            if range.contains(&denotation.span) {
                kept.push(Denotation {
                    id: denotation.id.clone(),
                    span: denotation.span.rebased(range.begin),
                    obj: denotation.obj.clone(),
                });
            } else if range.overlaps(&denotation.span) {
                if self.strict {
                    return Err(AnnotationError::DenotationFragmented {
                        denotation: denotation.clone(),
                        range,
                    });
                }
                warn!(
                    id = %denotation.id,
                    span = %denotation.span,
                    range = %range,
                    "Dropping fragmented denotation"
                );
            }
        }

        Ok(kept)
    }

    fn relations_of(
        &self,
        denotations: &[Denotation],
        range: Span,
    ) -> Result<Vec<Relation>, AnnotationError> {
        let ids: HashSet<&str> = denotations.iter().map(|d| d.id.as_str()).collect();
        let mut kept = Vec::new();

        for relation in &self.annotation.relations {
            let subj_in = ids.contains(relation.subj.as_str());
            let obj_in = ids.contains(relation.obj.as_str());

            match (subj_in, obj_in) {
                (true, true) => kept.push(relation.clone()),
                (false, false) => continue,
                _ if self.strict => {
                    return Err(AnnotationError::RelationOutOfRange {
                        relation: relation.clone(),
                        range,
                    });
                }
                _ => warn!(relation = %relation, range = %range, "Dropping relation crossing range"),
            }
        }

        Ok(kept)
    }
}

fn resolve_range<R: RangeBounds<usize>>(range: &R) -> Result<Span, AnnotationError> {
    let begin = match range.start_bound() {
        Bound::Included(&b) => b,
        Bound::Excluded(&b) => b.checked_add(1).ok_or_else(|| {
            AnnotationError::InvalidRange(format!("begin after {b} overflows"))
        })?,
        Bound::Unbounded => {
            return Err(AnnotationError::InvalidRange("begin is unbounded".to_string()));
        }
    };
    let end = match range.end_bound() {
        Bound::Included(&e) => e.checked_add(1).ok_or_else(|| {
            AnnotationError::InvalidRange(format!("end through {e} overflows"))
        })?,
        Bound::Excluded(&e) => e,
        Bound::Unbounded => {
            return Err(AnnotationError::InvalidRange("end is unbounded".to_string()));
        }
    };

    if begin > end {
        return Err(AnnotationError::InvalidRange(format!(
            "begin {begin} is past end {end}"
        )));
    }

    Ok(Span::new(begin, end))
}
