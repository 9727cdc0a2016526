/// Writing system of a single character, as far as sizing and language
/// detection care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Hiragana,
    Katakana,
    Han,
    Hangul,
    Latin,
    Digit,
    Other,
}

impl Script {
    pub fn of(c: char) -> Self {
        match c {
            '\u{3040}'..='\u{309F}' => Script::Hiragana,
            '\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' | '\u{FF66}'..='\u{FF9F}' => {
                Script::Katakana
            }
            '\u{3400}'..='\u{4DBF}'
            | '\u{4E00}'..='\u{9FFF}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{20000}'..='\u{2FA1F}' => Script::Han,
            '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}' | '\u{AC00}'..='\u{D7AF}' => {
                Script::Hangul
            }
            c if c.is_numeric() => Script::Digit,
            c if c.is_alphabetic() && (c.is_ascii() || ('\u{00C0}'..='\u{024F}').contains(&c)) => {
                Script::Latin
            }
            _ => Script::Other,
        }
    }

    pub fn is_kana(self) -> bool {
        matches!(self, Script::Hiragana | Script::Katakana)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_cjk() {
        assert_eq!(Script::of('は'), Script::Hiragana);
        assert_eq!(Script::of('ニ'), Script::Katakana);
        assert_eq!(Script::of('鳥'), Script::Han);
        assert_eq!(Script::of('한'), Script::Hangul);
        assert_eq!(Script::of('é'), Script::Latin);
        assert_eq!(Script::of('7'), Script::Digit);
        assert_eq!(Script::of('。'), Script::Other);
    }
}
