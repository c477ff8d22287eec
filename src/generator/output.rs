//! Reading generated output back from the processor's output file.
//!
//! The same pipeline serves byte-for-byte passthrough and text generation;
//! only this last step differs.

use crate::directive::OutputDirective;
use crate::error::{GenerationError, Result};
use std::path::Path;

/// Payload returned when generation fails for reasons outside the template.
pub const ERROR_OUTPUT: &str = "ErrorGeneratingOutput";

/// Turns the processor's output file into the caller's output type.
pub trait OutputMaterializer {
    type Output;

    /// Read the generated file at `path`.
    fn materialize(&self, path: &Path, directive: &OutputDirective) -> Result<Self::Output>;

    /// Fallback payload for failed generations.
    fn sentinel(&self) -> Self::Output;
}

/// Byte-for-byte passthrough.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBytes;

impl OutputMaterializer for RawBytes {
    type Output = Vec<u8>;

    fn materialize(&self, path: &Path, _directive: &OutputDirective) -> Result<Vec<u8>> {
        std::fs::read(path)
            .map_err(|e| GenerationError::io("failed to read generated output", path, e))
    }

    fn sentinel(&self) -> Vec<u8> {
        ERROR_OUTPUT.as_bytes().to_vec()
    }
}

/// Decode to text using the file's byte order mark, or the directive's
/// `encoding` when there is none.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodedText;

impl OutputMaterializer for DecodedText {
    type Output = String;

    fn materialize(&self, path: &Path, directive: &OutputDirective) -> Result<String> {
        let bytes = std::fs::read(path)
            .map_err(|e| GenerationError::io("failed to read generated output", path, e))?;
        Ok(decode_text(&bytes, directive.encoding.as_deref()))
    }

    fn sentinel(&self) -> String {
        ERROR_OUTPUT.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    fn from_hint(hint: Option<&str>) -> Self {
        match hint.map(|h| h.trim().to_ascii_lowercase()).as_deref() {
            Some("utf-16" | "utf-16le" | "unicode") => TextEncoding::Utf16Le,
            Some("utf-16be" | "bigendianunicode") => TextEncoding::Utf16Be,
            _ => TextEncoding::Utf8,
        }
    }
}

/// Decode bytes to text.
///
/// A UTF-8 or UTF-16 byte order mark wins and is stripped; without one the
/// `hint` (an `encoding` directive value) picks UTF-16, otherwise UTF-8.
/// Invalid sequences become U+FFFD.
pub fn decode_text(bytes: &[u8], hint: Option<&str>) -> String {
    let (encoding, body) = match bytes {
        [0xEF, 0xBB, 0xBF, rest @ ..] => (TextEncoding::Utf8, rest),
        [0xFF, 0xFE, rest @ ..] => (TextEncoding::Utf16Le, rest),
        [0xFE, 0xFF, rest @ ..] => (TextEncoding::Utf16Be, rest),
        _ => (TextEncoding::from_hint(hint), bytes),
    };

    match encoding {
        TextEncoding::Utf8 => String::from_utf8_lossy(body).into_owned(),
        TextEncoding::Utf16Le => decode_utf16(body, u16::from_le_bytes),
        TextEncoding::Utf16Be => decode_utf16(body, u16::from_be_bytes),
    }
}

fn decode_utf16(body: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let chunks = body.chunks_exact(2);
    let odd = !chunks.remainder().is_empty();

    let units: Vec<u16> = chunks.map(|c| unit([c[0], c[1]])).collect();
    let mut text = String::from_utf16_lossy(&units);
    if odd {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    fn utf16be(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
    }

    #[test]
    fn test_plain_utf8() {
        assert_eq!(decode_text("héllo".as_bytes(), None), "héllo");
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"class A {}");
        assert_eq!(decode_text(&bytes, None), "class A {}");
    }

    #[test]
    fn test_utf16_boms() {
        let mut le = vec![0xFF, 0xFE];
        le.extend(utf16le("Größe"));
        assert_eq!(decode_text(&le, None), "Größe");

        let mut be = vec![0xFE, 0xFF];
        be.extend(utf16be("Größe"));
        assert_eq!(decode_text(&be, None), "Größe");
    }

    #[test]
    fn test_bom_wins_over_hint() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"abc");
        assert_eq!(decode_text(&bytes, Some("utf-16")), "abc");
    }

    #[test]
    fn test_hint_selects_utf16_without_bom() {
        assert_eq!(decode_text(&utf16le("abc"), Some("Unicode")), "abc");
        assert_eq!(decode_text(&utf16be("abc"), Some("utf-16BE")), "abc");
    }

    #[test]
    fn test_odd_utf16_length_is_replaced() {
        let mut bytes = utf16le("ab");
        bytes.push(0x41);
        assert_eq!(decode_text(&bytes, Some("utf-16")), "ab\u{FFFD}");
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        assert_eq!(decode_text(&[b'a', 0xFF, b'b'], None), "a\u{FFFD}b");
    }

    #[test]
    fn test_raw_bytes_passthrough() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.bin");
        let content = vec![0xFF, 0xFE, 0x00, 0x01, b'\r', b'\n'];
        std::fs::write(&path, &content).unwrap();

        let read = RawBytes
            .materialize(&path, &OutputDirective::default())
            .unwrap();
        assert_eq!(read, content);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("never-written.cs");

        let err = DecodedText
            .materialize(&path, &OutputDirective::default())
            .unwrap_err();
        assert!(matches!(err, GenerationError::Io { .. }));
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(RawBytes.sentinel(), b"ErrorGeneratingOutput".to_vec());
        assert_eq!(DecodedText.sentinel(), "ErrorGeneratingOutput");
    }
}
