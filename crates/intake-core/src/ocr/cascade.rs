//! Image OCR cascade: local engine, then cloud service, then a lower-bar local fallback.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::ProcessingError;
use crate::models::config::IntakeConfig;
use crate::models::document::{trimmed_len, ExtractionMethod, ExtractionResult};

use super::{CloudOcr, LocalOcr, OcrResult};

/// Acceptance bars for each tier. Each bar is strictly lower than the one before it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeThresholds {
    /// Minimum trimmed length for the local (tier 1) and cloud (tier 2) results.
    pub min_text_length: usize,
    /// Minimum confidence (0-100) for the local result to be accepted at tier 1.
    pub min_confidence: f32,
    /// Minimum trimmed length for the last-resort local result.
    pub last_resort_min_length: usize,
}

impl Default for CascadeThresholds {
    fn default() -> Self {
        Self::from(&IntakeConfig::default())
    }
}

impl From<&IntakeConfig> for CascadeThresholds {
    fn from(config: &IntakeConfig) -> Self {
        Self {
            min_text_length: config.extraction.min_text_length,
            min_confidence: config.ocr.min_confidence,
            last_resort_min_length: config.ocr.last_resort_min_length,
        }
    }
}

/// Best-effort text recovery from a raster image.
pub struct ImageOcrCascade {
    local: Option<Arc<dyn LocalOcr>>,
    cloud: Option<Arc<dyn CloudOcr>>,
    language: String,
    thresholds: CascadeThresholds,
}

impl ImageOcrCascade {
    pub fn new(
        local: Option<Arc<dyn LocalOcr>>,
        cloud: Option<Arc<dyn CloudOcr>>,
        language: impl Into<String>,
        thresholds: CascadeThresholds,
    ) -> Self {
        Self {
            local,
            cloud,
            language: language.into(),
            thresholds,
        }
    }

    /// Run the cascade over encoded image bytes.
    ///
    /// Fails with `OCR_FAILED` only when no tier cleared its bar; never returns empty text.
    pub fn extract_from_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<ExtractionResult, ProcessingError> {
        let start = Instant::now();
        let local = self.run_local(image);

        if let Some(ref result) = local {
            let len = trimmed_len(&result.text);
            if len >= self.thresholds.min_text_length
                && result.confidence >= self.thresholds.min_confidence
            {
                info!(
                    "Image OCR accepted at local tier: {} chars, confidence {:.1} in {}ms",
                    len,
                    result.confidence,
                    start.elapsed().as_millis()
                );
                return Ok(ExtractionResult::ocr(
                    result.text.trim(),
                    ExtractionMethod::LocalOcr,
                    result.confidence,
                ));
            }
            debug!(
                "Local OCR below bar: {} chars, confidence {:.1}",
                len, result.confidence
            );
        }

        if let Some(cloud) = self.cloud.as_ref().filter(|c| c.is_configured()) {
            match cloud.detect_text(image, mime_type) {
                Ok(result) => {
                    let len = trimmed_len(&result.text);
                    if len >= self.thresholds.min_text_length {
                        info!(
                            "Image OCR accepted at cloud tier: {} chars, confidence {:.1} in {}ms",
                            len,
                            result.confidence,
                            start.elapsed().as_millis()
                        );
                        return Ok(ExtractionResult::ocr(
                            result.text.trim(),
                            ExtractionMethod::CloudOcr,
                            result.confidence,
                        ));
                    }
                    debug!("Cloud OCR below bar: {} chars", len);
                }
                Err(e) => {
                    warn!("Cloud OCR failed, continuing cascade: {}", e);
                }
            }
        } else {
            debug!("Cloud OCR not configured, skipping tier");
        }

        if let Some(result) = local {
            let len = trimmed_len(&result.text);
            if len >= self.thresholds.last_resort_min_length {
                info!(
                    "Image OCR accepted at last-resort tier: {} chars, confidence {:.1}",
                    len, result.confidence
                );
                return Ok(ExtractionResult::ocr(
                    result.text.trim(),
                    ExtractionMethod::LocalOcr,
                    result.confidence,
                ));
            }
        }

        Err(ProcessingError::ocr_failed(format!(
            "no OCR tier produced acceptable text after {}ms",
            start.elapsed().as_millis()
        )))
    }

    fn run_local(&self, image: &[u8]) -> Option<OcrResult> {
        let Some(engine) = self.local.as_ref() else {
            debug!("Local OCR unavailable, skipping tier");
            return None;
        };

        match engine.recognize(image, &self.language) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Local OCR failed, continuing cascade: {}", e);
                None
            }
        }
    }
}
