pub mod chunker;
pub mod error;
pub mod language;
pub mod script;
pub mod sentence;
pub mod tokenizer;
pub mod window;

pub use chunker::{ChunkGenerator, ChunkOutcome, ChunkerConfig};
pub use error::ChunkError;
pub use language::{FixedLanguage, Language, LanguageDetector, ScriptLanguageDetector};
pub use sentence::{Sentence, SentenceSplitter};
pub use tokenizer::{Token, TokenKind, Tokenizer, UnicodeTokenizer};
pub use window::WindowUnitCalculator;

pub use annotation::{merge, slice};

use annotation::Annotation;

/// Chunk `annotation` with the default tokenizer and language detector.
pub fn generate_chunks(
    annotation: &Annotation,
    window_size: usize,
    strict: bool,
) -> Result<Vec<Annotation>, ChunkError> {
    ChunkGenerator::new(ChunkerConfig::new(window_size).strict(strict)).generate(annotation)
}
