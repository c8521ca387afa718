//! Text extraction result models.

use serde::{Deserialize, Serialize};

/// Which strategy produced the text of an [`ExtractionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Read directly from the file's own text (plain text, DOCX, PDF text layer).
    Native,
    /// Local OCR engine.
    LocalOcr,
    /// Remote OCR service.
    CloudOcr,
    /// Several OCR strategies contributed (e.g. PDF pages split between local and cloud).
    Hybrid,
}

impl ExtractionMethod {
    /// Whether the method went through OCR (and therefore carries a confidence).
    pub fn is_ocr(&self) -> bool {
        !matches!(self, ExtractionMethod::Native)
    }
}

/// Source-embedded document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Number of pages, when the format is paginated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,

    /// Document title from the file's info dictionary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Document author from the file's info dictionary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl DocumentMetadata {
    pub fn with_page_count(page_count: u32) -> Self {
        Self {
            page_count: Some(page_count),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.page_count.is_none() && self.title.is_none() && self.author.is_none()
    }
}

/// Successfully recovered text of an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// The recovered plain text. Never empty.
    pub text: String,

    /// Metadata, only when the source format embeds it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,

    /// The strategy that produced `text`.
    pub extraction_method: ExtractionMethod,

    /// OCR confidence on a 0-100 scale; only set for OCR methods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_confidence: Option<f32>,
}

impl ExtractionResult {
    /// A result read from the file's own text.
    pub fn native(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: None,
            extraction_method: ExtractionMethod::Native,
            ocr_confidence: None,
        }
    }

    /// A result produced by OCR.
    pub fn ocr(text: impl Into<String>, method: ExtractionMethod, confidence: f32) -> Self {
        Self {
            text: text.into(),
            metadata: None,
            extraction_method: method,
            ocr_confidence: Some(confidence.clamp(0.0, 100.0)),
        }
    }

    /// Attach metadata, dropping it when nothing was populated.
    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = if metadata.is_empty() { None } else { Some(metadata) };
        self
    }

    /// Length of the trimmed text in characters.
    pub fn text_len(&self) -> usize {
        self.text.trim().chars().count()
    }
}

/// Character count of trimmed text; every length threshold in the crate uses this measure.
pub fn trimmed_len(text: &str) -> usize {
    text.trim().chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_serialization() {
        let json = serde_json::to_value(ExtractionMethod::LocalOcr).unwrap();
        assert_eq!(json, serde_json::json!("local_ocr"));
        assert!(!ExtractionMethod::Native.is_ocr());
        assert!(ExtractionMethod::Hybrid.is_ocr());
    }

    #[test]
    fn test_empty_metadata_dropped() {
        let result = ExtractionResult::native("text").with_metadata(DocumentMetadata::default());
        assert!(result.metadata.is_none());

        let result = ExtractionResult::native("text").with_metadata(DocumentMetadata::with_page_count(3));
        assert_eq!(result.metadata.unwrap().page_count, Some(3));
    }

    #[test]
    fn test_ocr_confidence_clamped() {
        let result = ExtractionResult::ocr("abc", ExtractionMethod::CloudOcr, 140.0);
        assert_eq!(result.ocr_confidence, Some(100.0));
    }

    #[test]
    fn test_trimmed_len_counts_chars() {
        assert_eq!(trimmed_len("  żółw  "), 4);
        assert_eq!(trimmed_len("\n\n"), 0);
    }
}
