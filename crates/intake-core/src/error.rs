//! Error types for the intake-core library.
//!
//! Two layers live here. [`ProcessingError`] is the classified, user-facing failure every public
//! extraction entry point returns. The `thiserror` enums below it describe the internal failure
//! families of each collaborator, and [`StageError`] is the tagged union the extractors pass
//! upward so the orchestrator can tell an already-classified failure from everything else.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable failure code carried by [`ProcessingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The upload (or its decoded text) is too short to be useful.
    EmptyFile,
    /// A word-processor document parsed but held too little text.
    EmptyDocument,
    /// No extractor handles this MIME type / extension.
    UnsupportedFileType,
    /// An image container no OCR adapter can decode (HEIC/HEIF).
    UnsupportedImageFormat,
    /// Every image OCR tier failed to clear its acceptance bar.
    OcrFailed,
    /// Rasterized PDF OCR produced too little text.
    PdfOcrFailed,
    /// The PDF could not be parsed and the OCR fallback did not recover it.
    PdfExtractionFailed,
    /// The DOCX container could not be read.
    DocxExtractionFailed,
    /// Catch-all for anything not classified closer to the failure.
    ExtractionFailed,
}

impl ErrorCode {
    /// The wire form of the code, e.g. `OCR_FAILED`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::EmptyFile => "EMPTY_FILE",
            ErrorCode::EmptyDocument => "EMPTY_DOCUMENT",
            ErrorCode::UnsupportedFileType => "UNSUPPORTED_FILE_TYPE",
            ErrorCode::UnsupportedImageFormat => "UNSUPPORTED_IMAGE_FORMAT",
            ErrorCode::OcrFailed => "OCR_FAILED",
            ErrorCode::PdfOcrFailed => "PDF_OCR_FAILED",
            ErrorCode::PdfExtractionFailed => "PDF_EXTRACTION_FAILED",
            ErrorCode::DocxExtractionFailed => "DOCX_EXTRACTION_FAILED",
            ErrorCode::ExtractionFailed => "EXTRACTION_FAILED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified extraction failure.
///
/// `message` is diagnostic and meant for logs; `user_message` and `suggestions` are what an end
/// user should see. Once constructed it crosses every layer unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingError {
    pub code: ErrorCode,
    pub message: String,
    pub user_message: String,
    pub is_recoverable: bool,
    pub suggestions: Vec<String>,
}

impl ProcessingError {
    /// Build an error from its parts.
    pub fn new(
        code: ErrorCode,
        message: impl Into<String>,
        user_message: impl Into<String>,
        is_recoverable: bool,
        suggestions: &[&str],
    ) -> Self {
        Self {
            code,
            message: message.into(),
            user_message: user_message.into(),
            is_recoverable,
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn empty_file(file_name: &str, detail: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::EmptyFile,
            detail,
            format!("\"{}\" appears to be empty or has too little text to read.", file_name),
            false,
            &[
                "Check that the file has content",
                "Try uploading a different file",
                "Paste the text directly instead",
            ],
        )
    }

    pub fn empty_document(file_name: &str, detail: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::EmptyDocument,
            detail,
            format!("\"{}\" doesn't contain enough text to analyze.", file_name),
            false,
            &[
                "Make sure the document has text content, not only images",
                "Try uploading a different document",
            ],
        )
    }

    pub fn unsupported_file_type(file_name: &str, mime_type: &str) -> Self {
        Self::new(
            ErrorCode::UnsupportedFileType,
            format!("no extractor for mime type '{}' (file '{}')", mime_type, file_name),
            format!("We can't read \"{}\" because this file type isn't supported.", file_name),
            true,
            &[
                "Upload a PDF, Word document, text file, or image",
                "Copy and paste the text content directly",
            ],
        )
    }

    pub fn unsupported_image_format(file_name: &str, mime_type: &str) -> Self {
        Self::new(
            ErrorCode::UnsupportedImageFormat,
            format!("HEIC/HEIF images are not supported (file '{}', mime '{}')", file_name, mime_type),
            "This photo format (HEIC) isn't supported yet.",
            true,
            &[
                "Take a screenshot of the photo and upload that instead",
                "Convert the photo to JPEG or PNG",
                "Try a different photo",
            ],
        )
    }

    pub fn ocr_failed(detail: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::OcrFailed,
            detail,
            "We couldn't read any text in this image.",
            true,
            &[
                "Make sure the image is well lit and in focus",
                "Frame the document so the text fills the picture",
                "Type the content in manually",
            ],
        )
    }

    pub fn pdf_ocr_failed(detail: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::PdfOcrFailed,
            detail,
            "This PDF looks like a scan and we couldn't read enough text from it.",
            true,
            &[
                "Upload screenshots of the pages instead",
                "Try a higher-quality scan",
                "Enter the content manually",
            ],
        )
    }

    pub fn pdf_extraction_failed(detail: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::PdfExtractionFailed,
            detail,
            "We couldn't open this PDF. It may be damaged or password protected.",
            true,
            &[
                "Export the PDF again from the original application",
                "Remove any password protection and re-upload",
                "Copy and paste the text content directly",
            ],
        )
    }

    pub fn docx_extraction_failed(detail: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::DocxExtractionFailed,
            detail,
            "We couldn't read this Word document.",
            true,
            &[
                "Save the document as .docx or PDF and try again",
                "Copy and paste the text content directly",
            ],
        )
    }

    pub fn extraction_failed(detail: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExtractionFailed,
            detail,
            "Something went wrong while reading your file.",
            true,
            &[
                "Try uploading the file again",
                "Try a different file format",
                "Copy and paste the text content directly",
            ],
        )
    }
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProcessingError {}

/// Failure code reported by the cloud OCR adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisionErrorCode {
    NotConfigured,
    RateLimited,
    Forbidden,
    NoTextFound,
    ApiError,
    NetworkError,
    InvalidResponse,
}

/// Typed failure from the cloud OCR service, distinct from transport failures by `code`.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("cloud OCR {code:?}: {message}")]
pub struct VisionError {
    pub code: VisionErrorCode,
    pub message: String,
    pub is_retryable: bool,
}

impl VisionError {
    pub fn new(code: VisionErrorCode, message: impl Into<String>) -> Self {
        let is_retryable = matches!(
            code,
            VisionErrorCode::RateLimited | VisionErrorCode::NetworkError
        );
        Self {
            code,
            message: message.into(),
            is_retryable,
        }
    }

    /// Override the default retryability (e.g. a 5xx `ApiError`).
    pub fn retryable(mut self, is_retryable: bool) -> Self {
        self.is_retryable = is_retryable;
        self
    }
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to turn a page into an image.
    #[error("failed to render page {page}: {reason}")]
    Render { page: u32, reason: String },

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to local OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors related to DOCX reading.
#[derive(Error, Debug)]
pub enum DocxError {
    /// The file is not a readable zip container.
    #[error("not a valid DOCX archive: {0}")]
    Archive(String),

    /// The container has no main document part.
    #[error("missing word/document.xml")]
    MissingDocumentPart,

    /// The document part is not well-formed XML.
    #[error("malformed document XML: {0}")]
    Xml(String),
}

/// Failure as it leaves the extractor dispatch.
///
/// Sub-extractors classify their own failures, so `Processing` must reach the caller untouched.
/// `Unexpected` covers anything they did not anticipate (a panic, an empty success) and is
/// wrapped exactly once by [`StageError::into_processing`].
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error("{0}")]
    Unexpected(String),
}

impl StageError {
    /// Collapse into the public taxonomy without double-wrapping classified errors.
    pub fn into_processing(self) -> ProcessingError {
        match self {
            StageError::Processing(err) => err,
            StageError::Unexpected(detail) => ProcessingError::extraction_failed(detail),
        }
    }
}

/// Result type for the public extraction API.
pub type Result<T> = std::result::Result<T, ProcessingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_code_wire_format() {
        assert_eq!(ErrorCode::UnsupportedImageFormat.as_str(), "UNSUPPORTED_IMAGE_FORMAT");
        let json = serde_json::to_value(ErrorCode::PdfOcrFailed).unwrap();
        assert_eq!(json, serde_json::json!("PDF_OCR_FAILED"));
    }

    #[test]
    fn test_processing_error_serializes_camel_case() {
        let err = ProcessingError::ocr_failed("no tier accepted");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "OCR_FAILED");
        assert_eq!(json["isRecoverable"], true);
        assert!(json["userMessage"].is_string());
        assert_eq!(json["suggestions"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_classified_error_passes_through_unchanged() {
        let original = ProcessingError::docx_extraction_failed("bad zip");
        let stage: StageError = original.clone().into();
        assert_eq!(stage.into_processing(), original);
    }

    #[test]
    fn test_unclassified_error_wrapped_once() {
        let stage = StageError::Unexpected(format!("parser gave up: {}", PdfError::Encrypted));
        let err = stage.into_processing();
        assert_eq!(err.code, ErrorCode::ExtractionFailed);
        assert_eq!(err.message, "parser gave up: PDF is encrypted");
        assert!(err.is_recoverable);
        assert_eq!(err.suggestions.len(), 3);
    }

    #[test]
    fn test_vision_error_retryability() {
        assert!(VisionError::new(VisionErrorCode::RateLimited, "slow down").is_retryable);
        assert!(!VisionError::new(VisionErrorCode::Forbidden, "no").is_retryable);
        assert!(VisionError::new(VisionErrorCode::ApiError, "503").retryable(true).is_retryable);
    }

    #[test]
    fn test_empty_errors_not_recoverable() {
        assert!(!ProcessingError::empty_file("a.txt", "short").is_recoverable);
        assert!(!ProcessingError::empty_document("a.docx", "short").is_recoverable);
    }
}
