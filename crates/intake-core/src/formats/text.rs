//! Plain text (`.txt`, `.md`, `.csv`) extraction.

use tracing::debug;

use crate::error::ProcessingError;
use crate::models::document::{trimmed_len, ExtractionResult};

/// Decode bytes as UTF-8 (lossy, BOM stripped) and apply the length floor.
///
/// Feeding the returned text back through this function yields the same text.
pub fn extract_plain_text(
    data: &[u8],
    file_name: &str,
    min_text_length: usize,
) -> Result<ExtractionResult, ProcessingError> {
    let decoded = String::from_utf8_lossy(data);
    // A BOM may sit behind leading whitespace; both are dropped together.
    let text = decoded
        .trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .trim_end();

    let len = trimmed_len(text);
    debug!("Plain text '{}': {} chars", file_name, len);

    if len < min_text_length {
        return Err(ProcessingError::empty_file(
            file_name,
            format!("text has {} chars, minimum is {}", len, min_text_length),
        ));
    }

    Ok(ExtractionResult::native(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::models::document::ExtractionMethod;
    use pretty_assertions::assert_eq;

    const NOTES: &str = "Morning routine: stretch 10 min, journal, walk the dog.";

    #[test]
    fn test_accepts_text_above_floor() {
        let result = extract_plain_text(NOTES.as_bytes(), "notes.txt", 30).unwrap();
        assert_eq!(result.text, NOTES);
        assert_eq!(result.extraction_method, ExtractionMethod::Native);
        assert!(result.ocr_confidence.is_none());
        assert!(result.metadata.is_none());
    }

    #[test]
    fn test_rejects_short_text() {
        let err = extract_plain_text(b"   too short   ", "a.txt", 30).unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyFile);
        assert!(err.user_message.contains("a.txt"));
    }

    #[test]
    fn test_strips_bom_and_whitespace() {
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend_from_slice(format!("\n\n{}\n", NOTES).as_bytes());
        let result = extract_plain_text(&data, "bom.md", 30).unwrap();
        assert_eq!(result.text, NOTES);
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_rejected() {
        let mut data = NOTES.as_bytes().to_vec();
        data.push(0xFF);
        let result = extract_plain_text(&data, "bad.txt", 30).unwrap();
        assert!(result.text.ends_with('\u{fffd}'));
    }

    #[test]
    fn test_round_trip_idempotent() {
        let first = extract_plain_text(format!("\u{feff}  {}\r\n", NOTES).as_bytes(), "x.txt", 30).unwrap();
        let second = extract_plain_text(first.text.as_bytes(), "x.txt", 30).unwrap();
        assert_eq!(second.text, first.text);
    }

    #[test]
    fn test_bom_after_leading_whitespace() {
        let input = format!(" \u{feff}{}", NOTES);
        let first = extract_plain_text(input.as_bytes(), "x.txt", 30).unwrap();
        assert_eq!(first.text, NOTES);

        let second = extract_plain_text(first.text.as_bytes(), "x.txt", 30).unwrap();
        assert_eq!(second.text, first.text);

        let stacked = format!("\u{feff} \u{feff}\n{}", NOTES);
        let stacked = extract_plain_text(stacked.as_bytes(), "x.txt", 30).unwrap();
        assert_eq!(stacked.text, NOTES);
    }
}
