use annotation::{AnnotationError, Span};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("invalid window size {0}: window size must be positive")]
    InvalidWindowSize(usize),

    #[error("chunk {chunk_index} {range}: {source}")]
    Slice {
        chunk_index: usize,
        range: Span,
        #[source]
        source: AnnotationError,
    },
}

impl ChunkError {
    /// A denotation or relation straddles a chunk boundary.
    pub fn is_fragmentation(&self) -> bool {
        match self {
            ChunkError::Slice { source, .. } => source.is_fragmentation(),
            ChunkError::InvalidWindowSize(_) => false,
        }
    }
}
