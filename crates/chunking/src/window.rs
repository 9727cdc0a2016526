use crate::language::Language;
use crate::tokenizer::Token;

/// Measures token sequences in the unit the window budget is expressed in.
pub struct WindowUnitCalculator;

impl WindowUnitCalculator {
    /// Characters covered by `tokens` for Japanese and Korean, token count
    /// for everything else.
    pub fn size(language: Language, tokens: &[Token]) -> usize {
        if language.is_cjk() {
            tokens.iter().map(Token::len).sum()
        } else {
            tokens.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{Tokenizer, UnicodeTokenizer};

    #[test]
    fn cjk_counts_characters() {
        let tokens = UnicodeTokenizer.tokenize("이순신은 조선의");
        assert_eq!(WindowUnitCalculator::size(Language::Ko, &tokens), 7);
        assert_eq!(WindowUnitCalculator::size(Language::En, &tokens), 2);
    }

    #[test]
    fn unknown_counts_tokens() {
        let tokens = UnicodeTokenizer.tokenize("Steve Jobs founded Apple");
        assert_eq!(WindowUnitCalculator::size(Language::Unknown, &tokens), 4);
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(WindowUnitCalculator::size(Language::Ja, &[]), 0);
        assert_eq!(WindowUnitCalculator::size(Language::En, &[]), 0);
    }
}
