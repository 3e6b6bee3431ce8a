// Physical line reader with a doubling, reusable line buffer.
// A line is everything up to '\n' (or "\r\n"); the terminator is stripped.
// The buffer capacity never shrinks, so later lines reuse the grown allocation.
use std::io::{self, BufRead};

use bstr::ByteSlice;
use tracing::debug;

use crate::core::error::{Error, ErrorKind, alloc_error};

pub const DEFAULT_LINE_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    capacity: usize,
    line_no: u64,
}

impl<R: BufRead> LineReader<R> {
    /// A zero capacity is bumped to 1 so that doubling always makes progress.
    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            capacity: capacity.max(1),
            line_no: 0,
        }
    }

    #[cfg(test)]
    fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of lines returned so far; the line last returned has this number.
    pub fn line_no(&self) -> u64 {
        self.line_no
    }

    /// Reads the next physical line.
    ///
    /// Returns `Ok(None)` only when end of stream is hit before a single byte was
    /// appended. A final line without terminator is returned like any other.
    pub fn read_line(&mut self) -> Result<Option<&[u8]>, Error> {
        self.buf.clear();
        if self.buf.capacity() < self.capacity {
            self.buf
                .try_reserve_exact(self.capacity)
                .map_err(|err| alloc_error("line buffer", err))?;
        }

        loop {
            let available = match self.inner.fill_buf() {
                Ok(available) => available,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(Error::new(ErrorKind::Io)
                        .with_message("failed to read line")
                        .with_line(self.line_no + 1)
                        .with_source(err));
                }
            };
            if available.is_empty() {
                break;
            }

            let room = self.capacity - self.buf.len();
            let window = &available[..available.len().min(room)];
            if let Some(pos) = window.find_byte(b'\n') {
                self.buf.extend_from_slice(&window[..pos]);
                self.inner.consume(pos + 1);
                return Ok(Some(self.finish_line()));
            }

            let taken = window.len();
            self.buf.extend_from_slice(window);
            self.inner.consume(taken);
            if self.buf.len() == self.capacity {
                self.grow()?;
            }
        }

        if self.buf.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.finish_line()))
    }

    fn finish_line(&mut self) -> &[u8] {
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        self.line_no += 1;
        &self.buf
    }

    fn grow(&mut self) -> Result<(), Error> {
        let capacity = self.capacity.checked_mul(2).ok_or_else(|| {
            Error::new(ErrorKind::Alloc)
                .with_message("memory allocation error (line buffer overflow)")
                .with_line(self.line_no + 1)
        })?;
        self.buf
            .try_reserve_exact(capacity - self.buf.len())
            .map_err(|err| alloc_error("line buffer", err).with_line(self.line_no + 1))?;
        debug!(capacity, line = self.line_no + 1, "line buffer grown");
        self.capacity = capacity;
        Ok(())
    }
}
