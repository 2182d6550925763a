//! Byte-level character encoding detection and decoding (§4.7, ambient).
//!
//! Sits in front of the tag layer: it turns a raw GEDCOM file's bytes into the `String` the
//! parser consumes, honoring a BOM when present and otherwise sniffing the declared `HEAD.CHAR`
//! value on a first pass over the bytes.

use crate::GedcomError;

/// The character encoding a GEDCOM file was decoded from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectedEncoding {
    /// UTF-8, detected via BOM or `CHAR UTF-8`.
    Utf8,
    /// Windows-1252, used for `CHAR ANSI`.
    Ansi,
    /// ANSEL, decoded as Windows-1252 (a documented approximation; true ANSEL diacritics are
    /// not remapped).
    Ansel,
    /// UTF-16, little-endian, detected via BOM.
    Utf16Le,
    /// UTF-16, big-endian, detected via BOM.
    Utf16Be,
}

/// Detects `bytes`' encoding and decodes it to a `String`.
///
/// A byte-order mark takes precedence over any declared `CHAR` value. Absent a BOM, the first
/// several kilobytes are scanned (decoded provisionally as UTF-8) for a level-1 `CHAR` line
/// under `HEAD`; its value selects the codec for the full decode. `ANSEL` is decoded as
/// `windows-1252`, matching the documented limitation of this family of GEDCOM readers.
///
/// # Errors
///
/// Returns [`GedcomError::EncodingError`] if the declared `CHAR` value names an encoding this
/// crate does not support, or if decoding produces malformed output the codec cannot recover
/// from (`encoding_rs` replaces unmappable bytes, so this only triggers for encodings lacking a
/// lossy fallback).
pub fn detect_and_decode(bytes: &[u8]) -> Result<(String, DetectedEncoding), GedcomError> {
    if let Some((text, encoding)) = decode_by_bom(bytes) {
        return Ok((text, encoding));
    }

    let declared = sniff_char_value(bytes);
    let (codec, encoding) = match declared.as_deref() {
        Some("ANSI") => (encoding_rs::WINDOWS_1252, DetectedEncoding::Ansi),
        Some("ANSEL") => (encoding_rs::WINDOWS_1252, DetectedEncoding::Ansel),
        Some("UTF-8") | None => (encoding_rs::UTF_8, DetectedEncoding::Utf8),
        Some(other) => {
            return Err(GedcomError::EncodingError(format!(
                "unsupported declared character encoding: {other}"
            )))
        }
    };

    let (decoded, _, had_errors) = codec.decode(bytes);
    if had_errors && codec == encoding_rs::UTF_8 {
        return Err(GedcomError::EncodingError(
            "input declared as UTF-8 contains invalid byte sequences".to_string(),
        ));
    }
    Ok((decoded.into_owned(), encoding))
}

fn decode_by_bom(bytes: &[u8]) -> Option<(String, DetectedEncoding)> {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        let (decoded, _, _) = encoding_rs::UTF_8.decode(&bytes[3..]);
        return Some((decoded.into_owned(), DetectedEncoding::Utf8));
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        let (decoded, _, _) = encoding_rs::UTF_16LE.decode(&bytes[2..]);
        return Some((decoded.into_owned(), DetectedEncoding::Utf16Le));
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let (decoded, _, _) = encoding_rs::UTF_16BE.decode(&bytes[2..]);
        return Some((decoded.into_owned(), DetectedEncoding::Utf16Be));
    }
    None
}

fn sniff_char_value(bytes: &[u8]) -> Option<String> {
    let prefix_len = bytes.len().min(8192);
    let (prefix, _, _) = encoding_rs::UTF_8.decode(&bytes[..prefix_len]);
    for line in prefix.lines() {
        let mut parts = line.trim().splitn(3, char::is_whitespace);
        let Some(level) = parts.next() else { continue };
        if level != "1" {
            continue;
        }
        let Some(tag) = parts.next() else { continue };
        if tag == "CHAR" {
            return parts.next().map(str::trim).map(str::to_string);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"0 HEAD\n");
        let (text, encoding) = detect_and_decode(&bytes).unwrap();
        assert_eq!(encoding, DetectedEncoding::Utf8);
        assert_eq!(text, "0 HEAD\n");
    }

    #[test]
    fn sniffs_declared_ansi_char_value() {
        let source = "0 HEAD\n1 CHAR ANSI\n0 TRLR\n";
        let (text, encoding) = detect_and_decode(source.as_bytes()).unwrap();
        assert_eq!(encoding, DetectedEncoding::Ansi);
        assert!(text.contains("CHAR ANSI"));
    }

    #[test]
    fn defaults_to_utf8_with_no_bom_or_declaration() {
        let source = "0 HEAD\n0 TRLR\n";
        let (_, encoding) = detect_and_decode(source.as_bytes()).unwrap();
        assert_eq!(encoding, DetectedEncoding::Utf8);
    }

    #[test]
    fn sniffs_char_value_past_a_blank_line() {
        let source = "0 HEAD\n\n1 CHAR ANSI\n0 TRLR\n";
        let (_, encoding) = detect_and_decode(source.as_bytes()).unwrap();
        assert_eq!(encoding, DetectedEncoding::Ansi);
    }
}
