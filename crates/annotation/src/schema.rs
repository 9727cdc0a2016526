use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::AnnotationError;
use crate::text;

/// Half-open code-point interval `[begin, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub begin: usize,
    pub end: usize,
}

impl Span {
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `other` lies entirely inside `self`. A span ending exactly at
    /// `self.end` is inside.
    pub fn contains(&self, other: &Span) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }

    /// The spans intersect. An empty `self` strictly inside `other` counts,
    /// since it cuts `other` in two.
    pub fn overlaps(&self, other: &Span) -> bool {
        other.begin < self.end && self.begin < other.end
    }

    pub fn shifted(&self, offset: usize) -> Span {
        Span::new(self.begin + offset, self.end + offset)
    }

    pub fn rebased(&self, origin: usize) -> Span {
        Span::new(self.begin - origin, self.end - origin)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denotation {
    pub id: String,
    pub span: Span,
    pub obj: String,
}

impl Denotation {
    pub fn new(id: impl Into<String>, begin: usize, end: usize, obj: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            span: Span::new(begin, end),
            obj: obj.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub pred: String,
    pub subj: String,
    pub obj: String,
}

impl Relation {
    pub fn new(pred: impl Into<String>, subj: impl Into<String>, obj: impl Into<String>) -> Self {
        Self {
            id: None,
            pred: pred.into(),
            subj: subj.into(),
            obj: obj.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.pred, self.subj, self.obj)
    }
}

/// Text plus the denotations and relations annotated on it.
///
/// Empty `denotations`/`relations` are omitted when serialized and default to
/// empty when absent from input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub denotations: Vec<Denotation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,
}

impl Annotation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_denotations(mut self, denotations: Vec<Denotation>) -> Self {
        self.denotations = denotations;
        self
    }

    pub fn with_relations(mut self, relations: Vec<Relation>) -> Self {
        self.relations = relations;
        self
    }

    /// Length of `text` in code points.
    pub fn char_len(&self) -> usize {
        text::char_len(&self.text)
    }

    pub fn denotation(&self, id: &str) -> Option<&Denotation> {
        self.denotations.iter().find(|d| d.id == id)
    }

    pub fn denotation_ids(&self) -> HashSet<&str> {
        self.denotations.iter().map(|d| d.id.as_str()).collect()
    }

    /// Check that every relation endpoint names a denotation of this
    /// annotation.
    pub fn validate(&self) -> Result<(), AnnotationError> {
        let ids = self.denotation_ids();
        for relation in &self.relations {
            for endpoint in [&relation.subj, &relation.obj] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(AnnotationError::DanglingRelation {
                        relation: relation.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_collections_default_to_empty() {
        let annotation: Annotation = serde_json::from_str(r#"{"text": "Alice"}"#).unwrap();
        assert!(annotation.denotations.is_empty());
        assert!(annotation.relations.is_empty());
    }

    #[test]
    fn empty_collections_are_omitted() {
        let json = serde_json::to_value(Annotation::new("Alice")).unwrap();
        assert_eq!(json, serde_json::json!({ "text": "Alice" }));
    }

    #[test]
    fn relation_id_is_optional_on_the_wire() {
        let relation: Relation =
            serde_json::from_str(r#"{"pred": "met", "subj": "T1", "obj": "T2"}"#).unwrap();
        assert_eq!(relation.id, None);

        let json = serde_json::to_value(relation.with_id("R1")).unwrap();
        assert_eq!(json["id"], "R1");
    }

    #[test]
    fn validate_reports_missing_endpoint() {
        let annotation = Annotation::new("Alice met Bob.")
            .with_denotations(vec![Denotation::new("T1", 0, 5, "Person")])
            .with_relations(vec![Relation::new("met", "T1", "T2")]);

        match annotation.validate() {
            Err(AnnotationError::DanglingRelation { missing, .. }) => assert_eq!(missing, "T2"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn span_containment_is_half_open() {
        let range = Span::new(0, 14);
        assert!(range.contains(&Span::new(10, 14)));
        assert!(!range.contains(&Span::new(10, 15)));
        assert!(range.overlaps(&Span::new(10, 15)));
        assert!(!range.overlaps(&Span::new(14, 18)));
    }
}
