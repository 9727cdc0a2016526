//! Helpers for code-point addressed text.
//!
//! Spans and token offsets count Unicode scalar values, not bytes, so CJK
//! text can be sliced with the same arithmetic as ASCII.

/// Number of code points in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the code point at `char_idx`, or `text.len()` past the end.
pub fn byte_index(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(byte_idx, _)| byte_idx)
        .unwrap_or(text.len())
}

/// Substring covering code points `[begin, end)`, clamped to the text.
pub fn char_slice(text: &str, begin: usize, end: usize) -> &str {
    if begin >= end {
        return "";
    }
    let start = byte_index(text, begin);
    let stop = start + byte_index(&text[start..], end - begin);
    &text[start..stop]
}
