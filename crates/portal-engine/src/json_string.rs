//! Reversible whitespace escaping for transported strings.
//!
//! Some transport encodings collapse significant whitespace. Plain string
//! props therefore pass through a reversible transform on the sending
//! side: newline, tab, and carriage return map to private-use code
//! points, with the exact inverse applied on the receiving side.

/// Private-use stand-in for `\n`.
const NEWLINE_SENTINEL: char = '\u{E000}';
/// Private-use stand-in for `\t`.
const TAB_SENTINEL: char = '\u{E001}';
/// Private-use stand-in for `\r`.
const CARRIAGE_RETURN_SENTINEL: char = '\u{E002}';

/// Escape whitespace-sensitive characters for transport.
pub fn encode_json_string(raw: &str) -> String {
    raw.chars()
        .map(|ch| match ch {
            '\n' => NEWLINE_SENTINEL,
            '\t' => TAB_SENTINEL,
            '\r' => CARRIAGE_RETURN_SENTINEL,
            other => other,
        })
        .collect()
}

/// Exact inverse of [`encode_json_string`].
pub fn decode_json_string(encoded: &str) -> String {
    encoded
        .chars()
        .map(|ch| match ch {
            NEWLINE_SENTINEL => '\n',
            TAB_SENTINEL => '\t',
            CARRIAGE_RETURN_SENTINEL => '\r',
            other => other,
        })
        .collect()
}
