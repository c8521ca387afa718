//! Extractors for formats that carry their own text: plain text and Word documents.

mod docx;
mod text;

pub use docx::DocxExtractor;
pub use text::extract_plain_text;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TRAILING_SPACE: Regex = Regex::new(r"(?m)[ \t]+$").unwrap();
    static ref BLANK_RUNS: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Tidy text pulled from a document body: strip trailing spaces per line, collapse runs of
/// blank lines to one, trim the ends.
pub fn normalize_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = TRAILING_SPACE.replace_all(&text, "");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        let raw = "  \n\nTitle   \r\n\n\n\n\nBody line\t\nnext\n\n\n";
        assert_eq!(normalize_text(raw), "Title\n\nBody line\nnext");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_text("a  \n\n\n\nb\r\nc   ");
        assert_eq!(normalize_text(&once), once);
    }
}
