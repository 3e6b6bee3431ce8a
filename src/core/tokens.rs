// Delimiter-based tokenizer with an explicit cursor.
// Runs of delimiters collapse; empty tokens are never produced.

/// Delimiters of a table header line: `double name(rows,cols)`.
pub const HEADER_DELIMS: &[u8] = b" \t(,)\r";

/// Delimiters between numbers on a data line.
pub const DATA_DELIMS: &[u8] = b" \t,;\r";

#[derive(Clone, Debug)]
pub struct Tokens<'a> {
    rest: &'a [u8],
    delims: &'a [u8],
}

impl<'a> Tokens<'a> {
    pub fn new(input: &'a [u8], delims: &'a [u8]) -> Self {
        Self {
            rest: input,
            delims,
        }
    }

    fn is_delim(&self, byte: u8) -> bool {
        self.delims.contains(&byte)
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let input: &'a [u8] = self.rest;
        let Some(start) = input.iter().position(|&b| !self.is_delim(b)) else {
            self.rest = &input[input.len()..];
            return None;
        };
        let tail = &input[start..];
        let len = tail
            .iter()
            .position(|&b| self.is_delim(b))
            .unwrap_or(tail.len());
        let (token, rest) = tail.split_at(len);
        self.rest = rest;
        Some(token)
    }
}
