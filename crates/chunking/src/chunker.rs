use annotation::{Annotation, AnnotationSlicer, Span};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ChunkError;
use crate::language::{LanguageDetector, ScriptLanguageDetector};
use crate::sentence::SentenceSplitter;
use crate::tokenizer::{Tokenizer, UnicodeTokenizer};
use crate::window::WindowUnitCalculator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Budget per chunk, in characters for ja/ko and tokens otherwise
    pub window_size: usize,
    /// Fail on denotations or relations cut by a chunk boundary instead of
    /// dropping them
    pub strict: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            strict: true,
        }
    }
}

impl ChunkerConfig {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            ..Default::default()
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.window_size == 0 {
            return Err(ChunkError::InvalidWindowSize(self.window_size));
        }
        Ok(())
    }
}

/// Result of chunking when the caller may have to confirm a lossy split.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    Chunked(Vec<Annotation>),
    /// Strict chunking hit a fragmented denotation or relation. `proposed`
    /// is the lenient chunking the caller can accept.
    NeedsConfirmation {
        reason: ChunkError,
        proposed: Vec<Annotation>,
    },
}

/// Packs whole sentences into chunks that fit the window.
///
/// Sentences are added greedily while the accumulated size stays within
/// `window_size`. A sentence larger than the window becomes a chunk on its
/// own. Chunk boundaries fall on sentence boundaries, with the whitespace
/// that opens a chunk left out.
pub struct ChunkGenerator<T = UnicodeTokenizer, D = ScriptLanguageDetector> {
    config: ChunkerConfig,
    tokenizer: T,
    detector: D,
}

impl ChunkGenerator {
    pub fn new(config: ChunkerConfig) -> Self {
        Self::with_analyzers(config, UnicodeTokenizer, ScriptLanguageDetector)
    }
}

impl<T: Tokenizer, D: LanguageDetector> ChunkGenerator<T, D> {
    pub fn with_analyzers(config: ChunkerConfig, tokenizer: T, detector: D) -> Self {
        Self {
            config,
            tokenizer,
            detector,
        }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Character ranges of the chunks for `text`.
    ///
    /// Empty when the tokenizer finds nothing to measure.
    pub fn chunk_ranges(&self, text: &str) -> Result<Vec<Span>, ChunkError> {
        self.config.validate()?;

        let tokens = self.tokenizer.tokenize(text);
        if tokens.is_empty() {
            if !text.is_empty() {
                warn!(chars = text.chars().count(), "Tokenizer returned no tokens, no chunks generated");
            }
            return Ok(Vec::new());
        }

        let language = self.detector.detect(text);
        let sentences = SentenceSplitter::sentences(text, &tokens);
        let window_size = self.config.window_size;

        let chars: Vec<char> = text.chars().collect();
        let mut ranges = Vec::new();
        let mut current: Option<Span> = None;
        let mut current_size = 0;

        for sentence in sentences {
            let sentence_size = WindowUnitCalculator::size(language, &sentence.tokens);
            let span = trim_leading_whitespace(&chars, sentence.span);

            current = match current {
                Some(open) if current_size + sentence_size <= window_size => {
                    current_size += sentence_size;
                    Some(Span::new(open.begin, span.end))
                }
                Some(open) => {
                    ranges.push(open);
                    current_size = sentence_size;
                    Some(span)
                }
                None => {
                    current_size = sentence_size;
                    Some(span)
                }
            };
        }
        ranges.extend(current);

        debug!(
            language = %language,
            window_size,
            chunks = ranges.len(),
            "Planned chunks"
        );

        Ok(ranges)
    }

    /// Chunks of `annotation` using the configured strictness.
    pub fn generate(&self, annotation: &Annotation) -> Result<Vec<Annotation>, ChunkError> {
        self.generate_with(annotation, self.config.strict)
    }

    pub fn generate_with(
        &self,
        annotation: &Annotation,
        strict: bool,
    ) -> Result<Vec<Annotation>, ChunkError> {
        let ranges = self.chunk_ranges(&annotation.text)?;
        let slicer = AnnotationSlicer::new(annotation).strict_mode(strict);

        ranges
            .into_iter()
            .enumerate()
            .map(|(chunk_index, range)| {
                let chunk = slicer
                    .annotation_in(range.begin..range.end)
                    .map_err(|source| ChunkError::Slice {
                        chunk_index,
                        range,
                        source,
                    })?;
                debug!(
                    chunk = chunk_index,
                    range = %range,
                    denotations = chunk.denotations.len(),
                    relations = chunk.relations.len(),
                    "Built chunk"
                );
                Ok(chunk)
            })
            .collect()
    }

    /// Strict chunking that reports fragmentation as a question instead of
    /// an error. With `force` the lenient chunking is returned directly.
    pub fn generate_or_confirm(
        &self,
        annotation: &Annotation,
        force: bool,
    ) -> Result<ChunkOutcome, ChunkError> {
        if force {
            return self.generate_with(annotation, false).map(ChunkOutcome::Chunked);
        }

        match self.generate_with(annotation, true) {
            Ok(chunks) => Ok(ChunkOutcome::Chunked(chunks)),
            Err(reason) if reason.is_fragmentation() => {
                let proposed = self.generate_with(annotation, false)?;
                Ok(ChunkOutcome::NeedsConfirmation { reason, proposed })
            }
            Err(e) => Err(e),
        }
    }
}

fn trim_leading_whitespace(chars: &[char], span: Span) -> Span {
    let skipped = chars[span.begin..span.end]
        .iter()
        .take_while(|c| c.is_whitespace())
        .count();
    Span::new(span.begin + skipped, span.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotation::{Denotation, Relation};

    fn alice_and_carol() -> Annotation {
        Annotation::new("Alice met Bob. Carol likes Dave.")
            .with_denotations(vec![
                Denotation::new("T1", 0, 5, "Person"),
                Denotation::new("T2", 10, 13, "Person"),
                Denotation::new("T3", 15, 20, "Person"),
                Denotation::new("T4", 27, 31, "Person"),
            ])
            .with_relations(vec![
                Relation::new("met", "T1", "T2"),
                Relation::new("likes", "T3", "T4"),
            ])
    }

    #[test]
    fn zero_window_is_rejected() {
        let generator = ChunkGenerator::new(ChunkerConfig::new(0));
        assert_eq!(
            generator.generate(&alice_and_carol()),
            Err(ChunkError::InvalidWindowSize(0))
        );
        assert!(matches!(
            generator.generate_or_confirm(&alice_and_carol(), true),
            Err(ChunkError::InvalidWindowSize(0))
        ));
        assert!(generator.chunk_ranges("").is_err());
    }

    #[test]
    fn small_window_splits_per_sentence() {
        let generator = ChunkGenerator::new(ChunkerConfig::new(3));
        let ranges = generator.chunk_ranges("Alice met Bob. Carol likes Dave.").unwrap();
        assert_eq!(ranges, vec![Span::new(0, 14), Span::new(15, 32)]);
    }

    #[test]
    fn large_window_keeps_one_chunk() {
        let annotation = alice_and_carol();
        let chunks = ChunkGenerator::new(ChunkerConfig::new(50))
            .generate(&annotation)
            .unwrap();
        assert_eq!(chunks, vec![annotation]);
    }

    #[test]
    fn exact_fit_is_packed_together() {
        // 4 tokens per sentence including the period
        let generator = ChunkGenerator::new(ChunkerConfig::new(8));
        let ranges = generator.chunk_ranges("Alice met Bob. Carol likes Dave.").unwrap();
        assert_eq!(ranges, vec![Span::new(0, 32)]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunks = ChunkGenerator::new(ChunkerConfig::default())
            .generate(&Annotation::new(""))
            .unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn force_returns_lenient_chunks() {
        let annotation = Annotation::new("Elon Musk is a member. Of the PayPal Mafia.")
            .with_denotations(vec![
                Denotation::new("T1", 0, 9, "Person"),
                Denotation::new("T2", 30, 42, "Organization"),
            ])
            .with_relations(vec![Relation::new("member_of", "T1", "T2")]);
        let generator = ChunkGenerator::new(ChunkerConfig::new(3));

        match generator.generate_or_confirm(&annotation, true).unwrap() {
            ChunkOutcome::Chunked(chunks) => {
                assert_eq!(chunks.len(), 2);
                assert!(chunks.iter().all(|c| c.relations.is_empty()));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
