use serde::{Deserialize, Serialize};
use std::fmt;

use crate::script::Script;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ja,
    Ko,
    Unknown,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ja => "ja",
            Language::Ko => "ko",
            Language::Unknown => "unknown",
        }
    }

    /// Languages without whitespace-delimited words, sized in characters.
    pub fn is_cjk(&self) -> bool {
        matches!(self, Language::Ja | Language::Ko)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait LanguageDetector {
    fn detect(&self, text: &str) -> Language;
}

/// Guesses the language from a census of letter scripts.
///
/// Any kana means Japanese. Otherwise the most frequent of Hangul, Latin and
/// Han letters wins: Hangul is Korean, Latin is English, Han alone is
/// reported as unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptLanguageDetector;

impl LanguageDetector for ScriptLanguageDetector {
    fn detect(&self, text: &str) -> Language {
        let (mut kana, mut hangul, mut latin, mut han) = (0usize, 0usize, 0usize, 0usize);

        for c in text.chars() {
            match Script::of(c) {
                s if s.is_kana() => kana += 1,
                Script::Hangul => hangul += 1,
                Script::Latin => latin += 1,
                Script::Han => han += 1,
                _ => {}
            }
        }

        if kana > 0 {
            Language::Ja
        } else if hangul > 0 && hangul >= latin && hangul >= han {
            Language::Ko
        } else if latin > 0 && latin >= han {
            Language::En
        } else {
            Language::Unknown
        }
    }
}

/// Always reports the same language. Useful when the caller already knows.
#[derive(Debug, Clone, Copy)]
pub struct FixedLanguage(pub Language);

impl LanguageDetector for FixedLanguage {
    fn detect(&self, _text: &str) -> Language {
        self.0
    }
}
