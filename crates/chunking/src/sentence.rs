use annotation::Span;
use annotation::text::char_len;
use regex::Regex;
use std::sync::LazyLock;

use crate::tokenizer::{Token, TokenKind};

static TERMINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.。．｡!?！？]").expect("terminal punctuation pattern"));

/// A sentence range and the tokens that start inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub span: Span,
    pub tokens: Vec<Token>,
}

/// Splits text into sentences at terminal punctuation.
///
/// Each terminal mark closes the current sentence, so `。。。` yields three
/// one-character sentences. Text after the last mark forms a final sentence.
/// Ranges cover the whole text without gaps.
pub struct SentenceSplitter;

impl SentenceSplitter {
    pub fn split(text: &str) -> Vec<Span> {
        let mut spans = Vec::new();
        let mut begin = 0;
        let mut char_pos = 0;
        let mut byte_pos = 0;

        for mark in TERMINAL.find_iter(text) {
            char_pos += text[byte_pos..mark.start()].chars().count() + 1;
            byte_pos = mark.end();
            spans.push(Span::new(begin, char_pos));
            begin = char_pos;
        }

        let total = char_len(text);
        if begin < total {
            spans.push(Span::new(begin, total));
        }

        spans
    }

    /// Sentences of `text` with their tokens.
    ///
    /// A token running past a terminal mark, like the decimal point in
    /// `3.50`, joins the following sentence to its own. A sentence ending in
    /// a terminal mark no token covers gets a one-character `Punct` token
    /// for it. Sentences left without any token are dropped.
    pub fn sentences(text: &str, tokens: &[Token]) -> Vec<Sentence> {
        let mut spans = Self::split(text).into_iter().peekable();
        let chars: Vec<char> = text.chars().collect();
        let mut remaining = tokens.iter().peekable();
        let mut sentences = Vec::new();

        while let Some(mut span) = spans.next() {
            let mut group: Vec<Token> = Vec::new();
            loop {
                while let Some(token) = remaining.next_if(|t| t.start_offset < span.end) {
                    group.push(token.clone());
                }
                let straddles = group.last().is_some_and(|t| t.end_offset > span.end);
                match spans.next_if(|_| straddles) {
                    Some(next) => span.end = next.end,
                    None => break,
                }
            }

            let last = span.end - 1;
            let mark = chars[last];
            // tokens are ordered and disjoint, so only the last one can reach the mark
            if is_terminal(mark) && !group.last().is_some_and(|t| t.covers(last)) {
                group.push(Token {
                    text: mark.to_string(),
                    start_offset: last,
                    end_offset: span.end,
                    kind: TokenKind::Punct,
                });
            }

            if !group.is_empty() {
                sentences.push(Sentence { span, tokens: group });
            }
        }

        sentences
    }
}

pub fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '。' | '．' | '｡' | '!' | '?' | '！' | '？')
}
