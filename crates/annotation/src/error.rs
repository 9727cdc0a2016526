use thiserror::Error;

use crate::schema::{Denotation, Relation, Span};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    /// Slice range that does not resolve to a span
    #[error("invalid slice range: {0}")]
    InvalidRange(String),

    #[error("denotation {} {} is fragmented by range {range}", .denotation.id, .denotation.span)]
    DenotationFragmented { denotation: Denotation, range: Span },

    #[error("relation {relation} crosses the boundary of range {range}")]
    RelationOutOfRange { relation: Relation, range: Span },

    #[error("relation {relation} refers to missing denotation {missing}")]
    DanglingRelation { relation: Relation, missing: String },
}

impl AnnotationError {
    /// A denotation or relation straddles a boundary. Callers may retry
    /// non-strictly or ask the user before losing it.
    pub fn is_fragmentation(&self) -> bool {
        matches!(
            self,
            Self::DenotationFragmented { .. } | Self::RelationOutOfRange { .. }
        )
    }
}
