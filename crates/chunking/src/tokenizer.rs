use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::script::Script;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    #[serde(rename = "<ALPHANUM>")]
    AlphaNum,
    #[serde(rename = "<NUM>")]
    Num,
    #[serde(rename = "<HIRAGANA>")]
    Hiragana,
    #[serde(rename = "<KATAKANA>")]
    Katakana,
    #[serde(rename = "<IDEOGRAPHIC>")]
    Ideographic,
    #[serde(rename = "<HANGUL>")]
    Hangul,
    /// Sentence-terminal mark added by the sentence splitter
    #[serde(rename = "<PUNCT>")]
    Punct,
}

impl TokenKind {
    fn classify(word: &str) -> Self {
        if word.chars().all(|c| c.is_numeric() || c == '.' || c == ',') {
            return TokenKind::Num;
        }
        match word.chars().next().map(Script::of) {
            Some(Script::Hiragana) => TokenKind::Hiragana,
            Some(Script::Katakana) => TokenKind::Katakana,
            Some(Script::Han) => TokenKind::Ideographic,
            Some(Script::Hangul) => TokenKind::Hangul,
            _ => TokenKind::AlphaNum,
        }
    }
}

/// A word with its code-point offsets `[start_offset, end_offset)` in the
/// analyzed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub kind: TokenKind,
}

impl Token {
    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn covers(&self, offset: usize) -> bool {
        self.start_offset <= offset && offset < self.end_offset
    }
}

pub trait Tokenizer {
    /// Tokens in text order. Offsets count code points.
    fn tokenize(&self, text: &str) -> Vec<Token>;
}

/// UAX #29 word segmentation, lower-cased, punctuation and whitespace
/// skipped. Kana and ideographs come out one character per token, Hangul
/// and Latin words whole.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeTokenizer;

impl Tokenizer for UnicodeTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut char_pos = 0;
        let mut byte_pos = 0;

        for (byte_idx, word) in text.unicode_word_indices() {
            char_pos += text[byte_pos..byte_idx].chars().count();
            let len = word.chars().count();

            tokens.push(Token {
                text: word.to_lowercase(),
                start_offset: char_pos,
                end_offset: char_pos + len,
                kind: TokenKind::classify(word),
            });

            char_pos += len;
            byte_pos = byte_idx + word.len();
        }

        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_words_with_char_offsets() {
        let tokens = UnicodeTokenizer.tokenize("Alice met Bob.");
        let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, ["alice", "met", "bob"]);
        assert_eq!((tokens[2].start_offset, tokens[2].end_offset), (10, 13));
    }

    #[test]
    fn offsets_count_code_points_not_bytes() {
        let tokens = UnicodeTokenizer.tokenize("이순신은 조선의 장군이다.");
        assert_eq!(tokens.len(), 3);
        assert_eq!((tokens[1].start_offset, tokens[1].end_offset), (5, 8));
        assert_eq!(tokens[1].kind, TokenKind::Hangul);
    }

    #[test]
    fn japanese_punctuation_is_not_a_token() {
        let tokens = UnicodeTokenizer.tokenize("鳥は卵を産む。");
        assert!(tokens.iter().all(|t| t.kind != TokenKind::Punct));
        assert_eq!(tokens.last().map(|t| t.end_offset), Some(6));
        assert_eq!(tokens[0].kind, TokenKind::Ideographic);
        assert_eq!(tokens[1].kind, TokenKind::Hiragana);
    }

    #[test]
    fn numbers_are_tagged() {
        let tokens = UnicodeTokenizer.tokenize("in 1976.");
        assert_eq!(tokens[1].kind, TokenKind::Num);
    }

    #[test]
    fn whitespace_only_has_no_tokens() {
        assert!(UnicodeTokenizer.tokenize(" \n\t ").is_empty());
    }
}
