//! Decoder for the processor's framed diagnostic stream.
//!
//! The processor writes one record per diagnostic to standard error:
//!
//! ```text
//! 1            <- "1" for a warning, anything else for an error
//! 12           <- line
//! 4            <- column
//! 9            <- message length in UTF-16 code units
//! bad token    <- exactly that many characters, may contain newlines
//!              <- one terminator line, discarded
//! ```
//!
//! A stream that ends anywhere other than a record boundary, or carries a
//! non-numeric header field, is rejected as a whole.

use crate::diagnostic::TemplateError;
use crate::error::{GenerationError, Result};
use std::io::BufRead;

/// Iterator over the framed records in one error stream.
///
/// Yields `Err` at most once; the iterator is exhausted afterwards.
pub struct DiagnosticDecoder<R> {
    reader: R,
    record: usize,
    done: bool,
}

impl<R: BufRead> DiagnosticDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            record: 0,
            done: false,
        }
    }

    fn at_end(&mut self) -> Result<bool> {
        let record = self.record;
        let buf = self
            .reader
            .fill_buf()
            .map_err(|e| violation(record, format!("failed to read error stream: {}", e)))?;
        Ok(buf.is_empty())
    }

    fn read_record(&mut self) -> Result<TemplateError> {
        let warning = self.header_line("warning flag")? == "1";
        let line = self.header_int("line")?;
        let column = self.header_int("column")?;

        let length = self.header_line("message length")?;
        let length: usize = length.trim().parse().map_err(|_| {
            self.violation(format!("message length is not a count: '{}'", length))
        })?;

        let message = self.read_chars(length)?;

        // Record terminator. A stream that ends right after the message has
        // still delivered every field.
        let mut terminator = Vec::new();
        self.reader
            .read_until(b'\n', &mut terminator)
            .map_err(|e| self.violation(format!("failed to read error stream: {}", e)))?;

        Ok(TemplateError::new(warning, message, line, column))
    }

    fn header_line(&mut self, field: &str) -> Result<String> {
        let mut raw = Vec::new();
        let read = self
            .reader
            .read_until(b'\n', &mut raw)
            .map_err(|e| self.violation(format!("failed to read error stream: {}", e)))?;

        if read == 0 {
            return Err(self.violation(format!("stream ended before the {} field", field)));
        }

        if raw.last() == Some(&b'\n') {
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
        }

        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    fn header_int(&mut self, field: &str) -> Result<i32> {
        let value = self.header_line(field)?;
        value
            .trim()
            .parse()
            .map_err(|_| self.violation(format!("{} is not an integer: '{}'", field, value)))
    }

    /// Read a message of `count` UTF-16 code units from the UTF-8 stream.
    ///
    /// Characters outside the Basic Multilingual Plane count as two units.
    fn read_chars(&mut self, count: usize) -> Result<String> {
        let mut message = String::new();
        let mut units = 0;

        while units < count {
            let mut encoded = [0u8; 4];
            if !self.read_byte(&mut encoded[0])? {
                return Err(self.violation(format!(
                    "stream ended after {} of {} message characters",
                    units, count
                )));
            }

            let width = utf8_width(encoded[0]);
            for slot in encoded.iter_mut().take(width).skip(1) {
                if !self.read_byte(slot)? {
                    return Err(self.violation("stream ended inside a character".to_string()));
                }
            }

            let decoded = String::from_utf8_lossy(&encoded[..width]);
            units += decoded.encode_utf16().count();
            if units > count {
                return Err(self.violation(format!(
                    "message length {} splits a surrogate pair",
                    count
                )));
            }
            message.push_str(&decoded);
        }

        Ok(message)
    }

    fn read_byte(&mut self, out: &mut u8) -> Result<bool> {
        let record = self.record;
        let buf = self
            .reader
            .fill_buf()
            .map_err(|e| violation(record, format!("failed to read error stream: {}", e)))?;
        match buf.first() {
            Some(&b) => {
                *out = b;
                self.reader.consume(1);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn violation(&self, detail: String) -> GenerationError {
        violation(self.record, detail)
    }
}

fn violation(record: usize, detail: String) -> GenerationError {
    GenerationError::Protocol(format!("record {}: {}", record + 1, detail))
}

impl<R: BufRead> Iterator for DiagnosticDecoder<R> {
    type Item = Result<TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = match self.at_end() {
            Ok(true) => {
                self.done = true;
                return None;
            }
            Ok(false) => self.read_record(),
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => self.record += 1,
            Err(_) => self.done = true,
        }
        Some(result)
    }
}

/// Decode a whole error stream, failing if any record is malformed.
pub fn decode_all<R: BufRead>(reader: R) -> Result<Vec<TemplateError>> {
    DiagnosticDecoder::new(reader).collect()
}

/// Byte length of a UTF-8 sequence given its lead byte.
///
/// Invalid lead bytes count as a single (replacement) character.
fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}
