//! PDF pipeline: native text layer first, page-capped rasterized OCR as the fallback.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::{PageRasterizer, PdfTextParser};
use crate::error::ProcessingError;
use crate::models::config::IntakeConfig;
use crate::models::document::{trimmed_len, DocumentMetadata, ExtractionMethod, ExtractionResult};
use crate::ocr::{CloudOcr, LocalOcr};

/// Joins per-page OCR text.
pub const PAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Tunables for [`PdfPipeline`].
#[derive(Debug, Clone)]
pub struct PdfPipelineSettings {
    pub min_text_length: usize,
    pub max_ocr_pages: u32,
    pub render_scale: f32,
    pub language: String,
}

impl From<&IntakeConfig> for PdfPipelineSettings {
    fn from(config: &IntakeConfig) -> Self {
        Self {
            min_text_length: config.extraction.min_text_length,
            max_ocr_pages: config.pdf.max_ocr_pages,
            render_scale: config.pdf.render_scale,
            language: config.ocr.language.clone(),
        }
    }
}

impl Default for PdfPipelineSettings {
    fn default() -> Self {
        Self::from(&IntakeConfig::default())
    }
}

/// Text recovered from one page by OCR.
struct PageText {
    text: String,
    confidence: f32,
    method: ExtractionMethod,
}

pub struct PdfPipeline {
    parser: Arc<dyn PdfTextParser>,
    rasterizer: Arc<dyn PageRasterizer>,
    local: Option<Arc<dyn LocalOcr>>,
    cloud: Option<Arc<dyn CloudOcr>>,
    settings: PdfPipelineSettings,
}

impl PdfPipeline {
    pub fn new(
        parser: Arc<dyn PdfTextParser>,
        rasterizer: Arc<dyn PageRasterizer>,
        local: Option<Arc<dyn LocalOcr>>,
        cloud: Option<Arc<dyn CloudOcr>>,
        settings: PdfPipelineSettings,
    ) -> Self {
        Self {
            parser,
            rasterizer,
            local,
            cloud,
            settings,
        }
    }

    /// Extract text from PDF bytes.
    ///
    /// Fails with `PDF_OCR_FAILED` when the text layer was merely too short and OCR could not
    /// make up for it, and with `PDF_EXTRACTION_FAILED` when the document could not be parsed
    /// at all and OCR did not recover it either.
    pub fn extract_from_pdf(&self, data: &[u8]) -> Result<ExtractionResult, ProcessingError> {
        match self.parser.parse(data) {
            Ok(native) => {
                let len = trimmed_len(&native.text);
                if len >= self.settings.min_text_length {
                    info!("PDF native text accepted: {} chars, {} pages", len, native.page_count);
                    let metadata = DocumentMetadata {
                        page_count: Some(native.page_count),
                        title: native.title,
                        author: native.author,
                    };
                    return Ok(ExtractionResult::native(native.text.trim()).with_metadata(metadata));
                }

                debug!("PDF text layer too short ({} chars), trying OCR", len);
                self.ocr_fallback(data).map_err(ProcessingError::pdf_ocr_failed)
            }
            Err(parse_err) => {
                warn!("PDF parse failed, trying OCR: {}", parse_err);
                self.ocr_fallback(data).map_err(|detail| {
                    ProcessingError::pdf_extraction_failed(format!(
                        "{}; OCR fallback: {}",
                        parse_err, detail
                    ))
                })
            }
        }
    }

    /// Rasterize up to the page cap and OCR each page. The error is a diagnostic string.
    fn ocr_fallback(&self, data: &[u8]) -> Result<ExtractionResult, String> {
        let start = Instant::now();
        let source = self
            .rasterizer
            .open(data)
            .map_err(|e| format!("rasterization unavailable: {}", e))?;

        let total_pages = source.page_count();
        let pages = total_pages.min(self.settings.max_ocr_pages);
        if pages < total_pages {
            info!("OCR limited to first {} of {} pages", pages, total_pages);
        }

        let mut recovered = Vec::new();
        for page in 1..=pages {
            let image = match source.render_page(page, self.settings.render_scale) {
                Ok(image) => image,
                Err(e) => {
                    warn!("Skipping page {}: {}", page, e);
                    continue;
                }
            };

            match self.ocr_page(page, &image) {
                Some(page_text) => recovered.push(page_text),
                None => debug!("No text recovered from page {}", page),
            }
        }

        let text = recovered
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR);

        let len = trimmed_len(&text);
        if len < self.settings.min_text_length {
            return Err(format!(
                "OCR recovered {} chars from {} of {} pages",
                len, pages, total_pages
            ));
        }

        let confidence =
            recovered.iter().map(|p| p.confidence).sum::<f32>() / recovered.len() as f32;
        let methods: HashSet<ExtractionMethod> = recovered.iter().map(|p| p.method).collect();
        let method = if methods.len() == 1 {
            recovered[0].method
        } else {
            ExtractionMethod::Hybrid
        };

        info!(
            "PDF OCR accepted: {} chars from {} pages ({:?}, confidence {:.1}) in {}ms",
            len,
            recovered.len(),
            method,
            confidence,
            start.elapsed().as_millis()
        );

        Ok(ExtractionResult::ocr(text, method, confidence)
            .with_metadata(DocumentMetadata::with_page_count(total_pages)))
    }

    /// Local OCR for one page; the cloud service only when the local engine errors or is absent.
    fn ocr_page(&self, page: u32, image: &[u8]) -> Option<PageText> {
        if let Some(engine) = &self.local {
            match engine.recognize(image, &self.settings.language) {
                Ok(result) => {
                    let text = result.text.trim();
                    return (!text.is_empty()).then(|| PageText {
                        text: text.to_string(),
                        confidence: result.confidence,
                        method: ExtractionMethod::LocalOcr,
                    });
                }
                Err(e) => warn!("Local OCR failed on page {}: {}", page, e),
            }
        }

        let cloud = self.cloud.as_ref().filter(|c| c.is_configured())?;
        match cloud.detect_text(image, "image/png") {
            Ok(result) => {
                let text = result.text.trim();
                (!text.is_empty()).then(|| PageText {
                    text: text.to_string(),
                    confidence: result.confidence,
                    method: ExtractionMethod::CloudOcr,
                })
            }
            Err(e) => {
                warn!("Cloud OCR failed on page {}: {}", page, e);
                None
            }
        }
    }
}
