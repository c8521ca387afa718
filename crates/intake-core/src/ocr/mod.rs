//! OCR adapters and the image OCR cascade.
//!
//! Two capability traits describe the engines the cascade can draw on:
//! - [`LocalOcr`]: an offline engine (PaddleOCR models through `pure-onnx-ocr` in production)
//! - [`CloudOcr`]: a remote document-text-detection service ([`VisionClient`])
//!
//! Both report confidence on a 0-100 scale.

mod cascade;
#[cfg(feature = "native")]
mod pure_engine;
mod vision;

pub use cascade::{CascadeThresholds, ImageOcrCascade};
#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;
pub use vision::{interpret_response, VisionClient};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{OcrError, VisionError};
use crate::models::config::OcrConfig;

/// A recognized text region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Axis-aligned bounding box (x1, y1, x2, y2).
    pub bbox: [f32; 4],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub score: f32,
}

/// Result of running OCR over one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    /// Recognized regions, in reading order. Empty for engines that only report full text.
    pub boxes: Vec<TextBox>,

    /// Full text.
    pub text: String,

    /// Confidence, 0-100.
    pub confidence: f32,

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl OcrResult {
    /// A result carrying only text and confidence.
    pub fn from_text(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            boxes: Vec::new(),
            text: text.into(),
            confidence,
            processing_time_ms: 0,
        }
    }

    /// Build a result from regions: reading-order sort, newline join, mean score as confidence.
    pub fn from_boxes(mut boxes: Vec<TextBox>, processing_time_ms: u64) -> Self {
        sort_by_reading_order(&mut boxes);

        let text = boxes
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let confidence = if boxes.is_empty() {
            0.0
        } else {
            boxes.iter().map(|b| b.score).sum::<f32>() / boxes.len() as f32 * 100.0
        };

        Self {
            boxes,
            text,
            confidence,
            processing_time_ms,
        }
    }
}

/// Sort boxes top-to-bottom, then left-to-right within a 20px row band.
fn sort_by_reading_order(boxes: &mut [TextBox]) {
    boxes.sort_by(|a, b| {
        let row_a = (a.bbox[1] / 20.0) as i32;
        let row_b = (b.bbox[1] / 20.0) as i32;

        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            a.bbox[0]
                .partial_cmp(&b.bbox[0])
                .unwrap_or(std::cmp::Ordering::Equal)
        }
    });
}

/// An offline OCR engine.
pub trait LocalOcr {
    /// Recognize text in encoded image bytes (PNG, JPEG, ...).
    fn recognize(&self, image: &[u8], language: &str) -> Result<OcrResult, OcrError>;
}

/// A remote OCR service.
pub trait CloudOcr {
    /// Whether credentials are present; an unconfigured service is never called.
    fn is_configured(&self) -> bool;

    /// Detect document text in encoded image bytes.
    fn detect_text(&self, image: &[u8], mime_type: &str) -> Result<OcrResult, VisionError>;
}

/// Load the local engine from the configured model directory, if its models are present.
pub fn load_local_engine(config: &OcrConfig) -> Option<Arc<dyn LocalOcr>> {
    if !config.models_present() {
        warn!(
            "OCR models not found in {}, local OCR disabled",
            config.model_dir.display()
        );
        return None;
    }

    build_local_engine(config)
}

#[cfg(feature = "native")]
fn build_local_engine(config: &OcrConfig) -> Option<Arc<dyn LocalOcr>> {
    match PureOcrEngine::from_config(config) {
        Ok(engine) => {
            info!("Local OCR engine ready");
            Some(Arc::new(engine))
        }
        Err(e) => {
            warn!("Failed to load local OCR engine: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "native"))]
fn build_local_engine(_config: &OcrConfig) -> Option<Arc<dyn LocalOcr>> {
    info!("Built without the native feature, local OCR disabled");
    None
}
