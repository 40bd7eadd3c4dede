use super::structure;
use super::{Decoded, Decoder};
use crate::consts::BINARY_PREVIEW_BYTES;
use crate::error::{ErrorKind, Result};
use crate::models::extension_of;
use exn::ResultExt;
use serde_json::{Map, Value, json};
use std::fs;
use std::path::Path;
use tracing::instrument;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];
/// Latin-1 is accepted only while control characters stay under 1 in 20 bytes.
const LATIN1_MAX_CONTROL_RATIO: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
}

impl TextEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16Le => "utf-16le",
            TextEncoding::Utf16Be => "utf-16be",
            TextEncoding::Latin1 => "latin-1",
        }
    }
}

/// Result of running the decoding attempts over raw bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decoding {
    Text { text: String, encoding: TextEncoding },
    /// Nothing produced text; a hex preview of the leading bytes instead.
    Binary { hex: String, truncated: bool },
}

type Attempt = fn(&[u8]) -> Option<String>;

/// Tried in order; the first attempt that yields text wins.
const ATTEMPTS: &[(TextEncoding, Attempt)] = &[
    (TextEncoding::Utf8, utf8),
    (TextEncoding::Utf16Le, utf16_le),
    (TextEncoding::Utf16Be, utf16_be),
    (TextEncoding::Latin1, latin1),
];

pub fn decode_bytes(bytes: &[u8]) -> Decoding {
    for (encoding, attempt) in ATTEMPTS {
        if let Some(text) = attempt(bytes) {
            return Decoding::Text { text, encoding: *encoding };
        }
    }
    let truncated = bytes.len() > BINARY_PREVIEW_BYTES;
    Decoding::Binary { hex: hex::encode(&bytes[..bytes.len().min(BINARY_PREVIEW_BYTES)]), truncated }
}

/// Best-effort content for a file with no decoder of its own, such as an
/// unsupported archive member.
pub fn decode_inline(bytes: &[u8]) -> Value {
    match decode_bytes(bytes) {
        Decoding::Text { text, encoding } => json!({ "text": text, "encoding": encoding.as_str() }),
        Decoding::Binary { hex, truncated } => json!({ "binary_content": hex, "truncated": truncated }),
    }
}

fn utf8(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    std::str::from_utf8(bytes).ok().map(str::to_string)
}

fn utf16_le(bytes: &[u8]) -> Option<String> {
    utf16(bytes.strip_prefix(UTF16_LE_BOM)?, u16::from_le_bytes)
}

fn utf16_be(bytes: &[u8]) -> Option<String> {
    utf16(bytes.strip_prefix(UTF16_BE_BOM)?, u16::from_be_bytes)
}

fn utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units).collect::<std::result::Result<String, _>>().ok()
}

fn latin1(bytes: &[u8]) -> Option<String> {
    if bytes.contains(&0) {
        return None;
    }
    let control = bytes.iter().filter(|b| b.is_ascii_control() && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0C)).count();
    if control * LATIN1_MAX_CONTROL_RATIO > bytes.len() {
        return None;
    }
    Some(bytes.iter().map(|&b| char::from(b)).collect())
}

/// Plain text, source code, data formats and markup.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextDecoder;

impl Decoder for TextDecoder {
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    fn decode(&self, path: &Path) -> Result<Decoded> {
        let bytes = fs::read(path).or_raise(|| ErrorKind::Io)?;
        let extension = extension_of(path);
        let extension = extension.trim_start_matches('.');
        let file_type = match extension {
            "" => "txt",
            ext => ext,
        };
        let (text, encoding) = match decode_bytes(&bytes) {
            Decoding::Text { text, encoding } => (text, encoding),
            Decoding::Binary { hex, truncated } => {
                tracing::warn!(path = %path.display(), "no text encoding matched, storing hex preview");
                return Ok(Decoded::partial(
                    json!({ "binary_content": hex, "truncated": truncated, "file_type": file_type }),
                    "content is not text in any supported encoding",
                ));
            },
        };

        let mut content = Map::new();
        content.insert("lines".to_string(), json!(text.split('\n').count()));
        content.insert("words".to_string(), json!(text.split_whitespace().count()));
        content.insert("characters".to_string(), json!(text.chars().count()));
        content.insert("encoding".to_string(), json!(encoding.as_str()));
        content.insert("file_type".to_string(), json!(file_type));
        let problem = structure::annotate(extension, &text, &mut content);
        content.insert("text".to_string(), Value::String(text));

        Ok(match problem {
            Some(message) => Decoded::partial(Value::Object(content), message),
            None => Decoded::success(Value::Object(content)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case(b"plain ascii".as_slice(), TextEncoding::Utf8, "plain ascii")]
    #[case(b"\xEF\xBB\xBFwith bom".as_slice(), TextEncoding::Utf8, "with bom")]
    #[case(b"\xFF\xFEh\x00i\x00".as_slice(), TextEncoding::Utf16Le, "hi")]
    #[case(b"\xFE\xFF\x00h\x00i".as_slice(), TextEncoding::Utf16Be, "hi")]
    #[case(b"caf\xE9".as_slice(), TextEncoding::Latin1, "caf\u{e9}")]
    fn decodes_text(#[case] bytes: &[u8], #[case] encoding: TextEncoding, #[case] expected: &str) {
        assert_eq!(decode_bytes(bytes), Decoding::Text { text: expected.to_string(), encoding });
    }

    #[test]
    fn binary_falls_back_to_hex() {
        let bytes = [0x00u8, 0xFF, 0x10, 0x80];
        assert_eq!(decode_bytes(&bytes), Decoding::Binary { hex: "00ff1080".to_string(), truncated: false });
    }

    #[test]
    fn hex_preview_is_capped() {
        let bytes = [0x00u8, 0xFF].repeat(BINARY_PREVIEW_BYTES / 2 + 5);
        let Decoding::Binary { hex, truncated } = decode_bytes(&bytes) else {
            panic!("expected binary");
        };
        assert!(truncated);
        assert_eq!(hex.len(), BINARY_PREVIEW_BYTES * 2);
    }

    #[test]
    fn inline_shapes() {
        assert_eq!(decode_inline(b"hello"), json!({ "text": "hello", "encoding": "utf-8" }));
        assert_eq!(decode_inline(&[0x00, 0xFF, 0x01]), json!({ "binary_content": "00ff01", "truncated": false }));
    }

    #[test]
    fn decodes_plain_text_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        fs::write(&path, "one two\nthree").unwrap();

        let decoded = TextDecoder.decode(&path).unwrap();
        assert_eq!(decoded.status, Status::Success);
        assert_eq!(decoded.content["lines"], 2);
        assert_eq!(decoded.content["words"], 3);
        assert_eq!(decoded.content["characters"], 13);
        assert_eq!(decoded.content["file_type"], "txt");
        assert_eq!(decoded.content["text"], "one two\nthree");
    }

    #[test]
    fn binary_file_is_partial() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blob.txt");
        fs::write(&path, [0u8, 159, 146, 150]).unwrap();

        let decoded = TextDecoder.decode(&path).unwrap();
        assert_eq!(decoded.status, Status::Partial);
        assert_eq!(decoded.content["binary_content"], "009f9296");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = TextDecoder.decode(Path::new("/no/such/file.txt")).unwrap_err();
        assert_eq!(*err, ErrorKind::Io);
    }
}
