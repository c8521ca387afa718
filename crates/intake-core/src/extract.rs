//! Extraction orchestrator: routes an upload to the right extractor and normalizes failures.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::error::{ProcessingError, StageError};
use crate::formats::{extract_plain_text, DocxExtractor};
use crate::models::config::IntakeConfig;
use crate::models::document::ExtractionResult;
use crate::ocr::{load_local_engine, CascadeThresholds, CloudOcr, ImageOcrCascade, LocalOcr, VisionClient};
use crate::pdf::{LopdfExtractor, PageRasterizer, PdfPipeline, PdfPipelineSettings, PdfTextParser};

const IMAGE_TYPES: &[&str] = &["png", "jpeg", "jpg", "gif", "webp", "bmp", "tiff", "tif"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "csv"];

/// Extractor branch chosen for an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Pdf,
    Docx,
    PlainText,
    Image,
    /// An image container no adapter can decode (HEIC/HEIF).
    UnsupportedImage,
    Unsupported,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Route::Pdf => "pdf",
            Route::Docx => "docx",
            Route::PlainText => "text",
            Route::Image => "image",
            Route::UnsupportedImage => "unsupported-image",
            Route::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Pick the extractor for a declared MIME type and file name. First match wins; the MIME type
/// is matched case-insensitively by substring, the extension is the secondary signal.
pub fn route(mime_type: &str, file_name: &str) -> Route {
    let mime = mime_type.trim().to_ascii_lowercase();
    let ext = extension(file_name);
    let ext = ext.as_deref().unwrap_or("");

    if mime.contains("pdf") || ext == "pdf" {
        Route::Pdf
    } else if mime.contains("msword")
        || mime.contains("wordprocessingml")
        || ext == "doc"
        || ext == "docx"
    {
        Route::Docx
    } else if mime.starts_with("text/") || TEXT_EXTENSIONS.contains(&ext) {
        Route::PlainText
    } else if is_image_mime(&mime) || IMAGE_TYPES.contains(&ext) {
        Route::Image
    } else if mime.contains("heic") || mime.contains("heif") || ext == "heic" || ext == "heif" {
        Route::UnsupportedImage
    } else {
        Route::Unsupported
    }
}

fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/") && IMAGE_TYPES.iter().any(|t| mime.contains(t))
}

fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Top-level document extractor.
pub struct DocumentExtractor {
    min_text_length: usize,
    cascade: ImageOcrCascade,
    pdf: PdfPipeline,
    docx: DocxExtractor,
}

impl DocumentExtractor {
    /// Wire the extractor from explicit collaborators.
    pub fn new(
        config: &IntakeConfig,
        local: Option<Arc<dyn LocalOcr>>,
        cloud: Option<Arc<dyn CloudOcr>>,
        parser: Arc<dyn PdfTextParser>,
        rasterizer: Arc<dyn PageRasterizer>,
    ) -> Self {
        let cascade = ImageOcrCascade::new(
            local.clone(),
            cloud.clone(),
            config.ocr.language.clone(),
            CascadeThresholds::from(config),
        );
        let pdf = PdfPipeline::new(
            parser,
            rasterizer,
            local,
            cloud,
            PdfPipelineSettings::from(config),
        );

        Self {
            min_text_length: config.extraction.min_text_length,
            cascade,
            pdf,
            docx: DocxExtractor::new(),
        }
    }

    /// Build the production adapters described by `config`.
    ///
    /// Missing OCR models disable the local engine, and a cloud client that cannot be built
    /// disables the cloud tier; neither is fatal.
    pub fn from_config(config: &IntakeConfig) -> Self {
        let local = load_local_engine(&config.ocr);

        let cloud: Option<Arc<dyn CloudOcr>> = match VisionClient::new(config.vision.clone()) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("Cloud OCR disabled: {}", e);
                None
            }
        };

        let pdf = Arc::new(LopdfExtractor::new(config.pdf.max_render_dimension));

        Self::new(config, local, cloud, pdf.clone(), pdf)
    }

    /// Extract text from an uploaded file.
    ///
    /// Every failure is a [`ProcessingError`]: classified errors from the extractors come back
    /// unchanged, anything else (including a panic) becomes `EXTRACTION_FAILED`.
    pub fn extract(
        &self,
        data: &[u8],
        mime_type: &str,
        file_name: &str,
    ) -> Result<ExtractionResult, ProcessingError> {
        let start = Instant::now();
        let route = route(mime_type, file_name);

        info!(
            "Extracting '{}' ({} bytes, {}) via {}",
            file_name,
            data.len(),
            mime_type,
            route
        );

        if data.is_empty() {
            return Err(ProcessingError::empty_file(file_name, "file is zero bytes"));
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.dispatch(route, data, mime_type, file_name)
        }))
        .unwrap_or_else(|payload| Err(StageError::Unexpected(panic_message(payload.as_ref()))));

        let elapsed = start.elapsed().as_millis();
        match outcome.map_err(StageError::into_processing) {
            Ok(result) => {
                if result.extraction_method.is_ocr() {
                    info!(
                        "Extracted '{}': {} chars ({:?}, {:.1}% confidence) in {}ms",
                        file_name,
                        result.text_len(),
                        result.extraction_method,
                        result.ocr_confidence.unwrap_or_default(),
                        elapsed
                    );
                } else {
                    info!(
                        "Extracted '{}': {} chars ({:?}) in {}ms",
                        file_name,
                        result.text_len(),
                        result.extraction_method,
                        elapsed
                    );
                }
                Ok(result)
            }
            Err(err) => {
                warn!("Extraction of '{}' failed after {}ms: {}", file_name, elapsed, err);
                Err(err)
            }
        }
    }

    fn dispatch(
        &self,
        route: Route,
        data: &[u8],
        mime_type: &str,
        file_name: &str,
    ) -> Result<ExtractionResult, StageError> {
        let result = match route {
            Route::Pdf => self.pdf.extract_from_pdf(data)?,
            Route::Docx => self.docx.extract(data, file_name, self.min_text_length)?,
            Route::PlainText => extract_plain_text(data, file_name, self.min_text_length)?,
            Route::Image => self.cascade.extract_from_image(data, mime_type)?,
            Route::UnsupportedImage => {
                return Err(ProcessingError::unsupported_image_format(file_name, mime_type).into())
            }
            Route::Unsupported => {
                return Err(ProcessingError::unsupported_file_type(file_name, mime_type).into())
            }
        };

        if result.text.trim().is_empty() {
            return Err(StageError::Unexpected(format!(
                "{} extractor returned empty text",
                route
            )));
        }

        Ok(result)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("extractor panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("extractor panicked: {}", s)
    } else {
        "extractor panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::models::document::{trimmed_len, ExtractionMethod};
    use crate::test_support::{FakeParser, FakeRasterizer, FixedCloud, FixedLocal, PanickingParser};
    use pretty_assertions::assert_eq;

    const NOTES: &str = "Breakfast: greek yogurt, granola and blueberries";

    fn extractor_with(
        parser: Arc<dyn PdfTextParser>,
        local: Option<Arc<dyn LocalOcr>>,
        cloud: Option<Arc<dyn CloudOcr>>,
    ) -> DocumentExtractor {
        DocumentExtractor::new(
            &IntakeConfig::default(),
            local,
            cloud,
            parser,
            Arc::new(FakeRasterizer::new(1)),
        )
    }

    fn extractor() -> DocumentExtractor {
        extractor_with(
            Arc::new(FakeParser::text(NOTES, 1)),
            Some(Arc::new(FixedLocal::ok(NOTES, 88.0))),
            None,
        )
    }

    #[test]
    fn test_routing_is_deterministic() {
        assert_eq!(route("application/pdf", "x.pdf"), Route::Pdf);
        assert_eq!(route("image/png", "x.png"), Route::Image);
        assert_eq!(route("application/octet-stream", "x.heic"), Route::UnsupportedImage);
        for _ in 0..3 {
            assert_eq!(route("image/png", "x.png"), Route::Image);
        }
    }

    #[test]
    fn test_routing_order_and_secondary_signals() {
        assert_eq!(route("APPLICATION/PDF", "scan"), Route::Pdf);
        assert_eq!(route("application/octet-stream", "Plan.PDF"), Route::Pdf);
        assert_eq!(
            route(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "plan"
            ),
            Route::Docx
        );
        assert_eq!(route("application/msword", "old.doc"), Route::Docx);
        assert_eq!(route("", "notes.md"), Route::PlainText);
        assert_eq!(route("text/csv", "meals"), Route::PlainText);
        assert_eq!(route("image/jpeg", "photo"), Route::Image);
        assert_eq!(route("", "photo.webp"), Route::Image);
        assert_eq!(route("image/heic", "IMG_0001"), Route::UnsupportedImage);
        assert_eq!(route("application/zip", "archive.zip"), Route::Unsupported);
        assert_eq!(route("", "README"), Route::Unsupported);
    }

    #[test]
    fn test_zero_bytes_is_empty_file() {
        let err = extractor().extract(b"", "text/plain", "empty.txt").unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyFile);
    }

    #[test]
    fn test_plain_text_below_floor() {
        let err = extractor()
            .extract(b"short note", "text/plain", "note.txt")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyFile);
        assert!(!err.is_recoverable);
    }

    #[test]
    fn test_plain_text_accepted() {
        let result = extractor()
            .extract(NOTES.as_bytes(), "text/plain", "note.txt")
            .unwrap();
        assert_eq!(result.text, NOTES);
        assert_eq!(result.extraction_method, ExtractionMethod::Native);
    }

    #[test]
    fn test_heic_never_attempted() {
        let local = Arc::new(FixedLocal::ok(NOTES, 99.0));
        let err = extractor_with(Arc::new(FakeParser::text("", 1)), Some(local.clone()), None)
            .extract(b"ftypheic", "application/octet-stream", "x.heic")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedImageFormat);
        assert!(err.is_recoverable);
        assert_eq!(local.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let err = extractor()
            .extract(b"PK\x03\x04", "application/zip", "bundle.zip")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedFileType);
        assert!(err.is_recoverable);
        assert!(!err.suggestions.is_empty());
    }

    #[test]
    fn test_classified_errors_pass_through_unchanged() {
        let err = extractor_with(Arc::new(FakeParser::text("", 1)), None, None)
            .extract(b"img", "image/png", "x.png")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OcrFailed);
    }

    #[test]
    fn test_panic_is_normalized() {
        let err = extractor_with(Arc::new(PanickingParser), None, None)
            .extract(b"%PDF-1.7", "application/pdf", "boom.pdf")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ExtractionFailed);
        assert!(err.is_recoverable);
        assert!(err.message.contains("content stream exploded"));
        assert_eq!(err.suggestions.len(), 3);
    }

    #[test]
    fn test_length_floor_holds_except_last_resort() {
        let extractor = extractor_with(
            Arc::new(FakeParser::text(NOTES, 2)),
            Some(Arc::new(FixedLocal::ok("Oats 40g milk", 20.0))),
            Some(Arc::new(FixedCloud::unconfigured())),
        );

        let pdf = extractor.extract(b"%PDF", "application/pdf", "a.pdf").unwrap();
        assert!(trimmed_len(&pdf.text) >= 30);

        let text = extractor
            .extract(NOTES.as_bytes(), "text/markdown", "a.md")
            .unwrap();
        assert!(trimmed_len(&text.text) >= 30);

        // The last-resort image tier is the one path with a lower floor.
        let image = extractor.extract(b"img", "image/jpeg", "a.jpg").unwrap();
        assert_eq!(image.text, "Oats 40g milk");
        assert!(trimmed_len(&image.text) >= 10);
        assert_eq!(image.ocr_confidence, Some(20.0));
    }
}
