pub mod error;
pub mod merger;
pub mod schema;
pub mod slicer;
pub mod text;

pub use error::AnnotationError;
pub use merger::AnnotationMerger;
pub use schema::{Annotation, Denotation, Relation, Span};
pub use slicer::AnnotationSlicer;

use std::ops::RangeBounds;

/// Sub-annotation of `annotation` inside `range`, rebased to start at 0.
pub fn slice<R: RangeBounds<usize>>(
    annotation: &Annotation,
    range: R,
    strict: bool,
) -> Result<Annotation, AnnotationError> {
    AnnotationSlicer::new(annotation)
        .strict_mode(strict)
        .annotation_in(range)
}

/// Merge chunk-level annotations back into one annotation, in order.
pub fn merge(chunks: &[Annotation]) -> Annotation {
    AnnotationMerger::new(chunks).merged()
}
