use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::DecodeError;
use crate::models::RawDocument;

/// Bytes sniffed for a `<meta charset>` declaration.
const META_SNIFF_LEN: usize = 4096;

static META_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([A-Za-z0-9_\-:.]+)"#)
        .expect("Invalid meta charset regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static str,
    /// The bytes were not valid in UTF-8 or the declared charset.
    pub fallback: bool,
}

/// Charset declared by `<meta charset>` or `http-equiv` in the document head.
pub fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(META_SNIFF_LEN)];
    let head = String::from_utf8_lossy(head);
    META_CHARSET
        .captures(&head)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// Declared charset (transport, then meta), strict UTF-8, then Latin-1.
pub fn decode_document(document: &RawDocument) -> Result<DecodedText, DecodeError> {
    let bytes = strip_utf8_bom(&document.bytes);

    let declared = document
        .charset
        .clone()
        .or_else(|| sniff_meta_charset(bytes));
    let declared_encoding = declared
        .as_deref()
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()));

    if let Some(encoding) = declared_encoding {
        if encoding != UTF_8 {
            if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
                debug!("Decoded document as declared {}", encoding.name());
                return Ok(DecodedText {
                    text: text.into_owned(),
                    encoding: encoding.name(),
                    fallback: false,
                });
            }
            warn!("Document is not valid {} despite declaring it", encoding.name());
        }
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(DecodedText {
            text: text.to_string(),
            encoding: UTF_8.name(),
            fallback: false,
        });
    }

    // WHATWG maps ISO-8859-1 to windows-1252
    match WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => {
            warn!("Document is not valid UTF-8, decoded as Latin-1");
            Ok(DecodedText {
                text: text.into_owned(),
                encoding: WINDOWS_1252.name(),
                fallback: true,
            })
        }
        // Not reached: windows-1252 maps every byte
        None => Err(DecodeError::Undecodable {
            declared: declared.unwrap_or_else(|| "no declared charset".to_string()),
        }),
    }
}

fn strip_utf8_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}

/// `charset` parameter of a `Content-Type` header value.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentOrigin;

    #[test]
    fn utf8_passes_through() {
        let doc = RawDocument::from_text("<p>L'Oréal</p>");
        let decoded = decode_document(&doc).unwrap();
        assert_eq!(decoded.text, "<p>L'Oréal</p>");
        assert!(!decoded.fallback);
    }

    #[test]
    fn bom_is_stripped() {
        let doc = RawDocument::new(b"\xEF\xBB\xBF<p>a</p>".to_vec(), DocumentOrigin::Inline);
        assert_eq!(decode_document(&doc).unwrap().text, "<p>a</p>");
    }

    #[test]
    fn invalid_utf8_falls_back_to_latin1() {
        // "Loréal" with é as the single Latin-1 byte 0xE9
        let doc = RawDocument::new(b"<p>Lor\xE9al</p>".to_vec(), DocumentOrigin::Inline);
        let decoded = decode_document(&doc).unwrap();
        assert_eq!(decoded.text, "<p>Loréal</p>");
        assert!(decoded.fallback);
        assert_eq!(decoded.encoding, "windows-1252");
    }

    #[test]
    fn every_byte_decodes_via_latin1() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let doc = RawDocument::new(bytes, DocumentOrigin::Inline);
        let decoded = decode_document(&doc).unwrap();
        assert!(decoded.fallback);
        assert_eq!(decoded.text.chars().count(), 256);
    }

    #[test]
    fn declared_charset_wins() {
        let doc = RawDocument::new(
            b"<meta charset=\"iso-8859-1\"><p>Lor\xE9al</p>".to_vec(),
            DocumentOrigin::Inline,
        );
        let decoded = decode_document(&doc).unwrap();
        assert!(decoded.text.contains("Loréal"));
        assert!(!decoded.fallback);
    }

    #[test]
    fn content_type_charset_is_parsed() {
        assert_eq!(
            charset_from_content_type("text/html; charset=\"UTF-8\""),
            Some("UTF-8".to_string())
        );
        assert_eq!(charset_from_content_type("text/html"), None);
    }
}
