//! Purpose: Recognize and parse decimal numbers in table files.
//! Exports: `is_number`, `parse_f64`, `parse_dim`, `ParseNumberError`.
//! Role: Number layer under the text table parser.
//! Invariants: The decimal separator is always '.', whatever the host locale says.
//! Invariants: A parse consumes the whole token; leftovers are an error.
use std::fmt;

/// Cheap shape check used to classify content after a table is full.
///
/// Accepts an optional leading sign, digits, at most one decimal point (only
/// before the exponent), at most one `e`/`E`, and at most one sign directly
/// after the exponent marker. Nothing else is allowed. Like the classifier it
/// replaces, it does not require a digit to be present.
pub fn is_number(token: &[u8]) -> bool {
    let body = match token.first() {
        Some(b'+' | b'-') => &token[1..],
        _ => token,
    };

    let mut seen_dot = false;
    let mut seen_exp = false;
    let mut prev_was_exp = false;
    for &byte in body {
        let is_exp = matches!(byte, b'e' | b'E');
        match byte {
            b'0'..=b'9' => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if !seen_exp => seen_exp = true,
            b'+' | b'-' if prev_was_exp => {}
            _ => return false,
        }
        prev_was_exp = is_exp;
    }
    true
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseNumberError {
    token: String,
}

impl ParseNumberError {
    fn new(token: &[u8]) -> Self {
        Self {
            token: String::from_utf8_lossy(token).into_owned(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for ParseNumberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" is not a number", self.token)
    }
}

impl std::error::Error for ParseNumberError {}

/// Parses a whole token as `f64` with '.' as decimal point.
///
/// `str::parse::<f64>` never consults the process locale, so no locale state is
/// touched here and concurrent parses need no coordination.
pub fn parse_f64(token: &[u8]) -> Result<f64, ParseNumberError> {
    std::str::from_utf8(token)
        .ok()
        .and_then(|text| text.parse::<f64>().ok())
        .ok_or_else(|| ParseNumberError::new(token))
}

/// Parses a declared row or column count (base 10, optional '+').
pub fn parse_dim(token: &[u8]) -> Option<usize> {
    std::str::from_utf8(token).ok()?.parse::<usize>().ok()
}
