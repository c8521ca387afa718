//! Pure Rust local OCR engine using `pure-onnx-ocr`.

use std::time::Instant;

use image::GenericImageView;
use tracing::{debug, info, trace};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::{LocalOcr, OcrResult, TextBox};

/// Local OCR backed by `pure-onnx-ocr` (PaddleOCR detection + recognition, no native runtime).
pub struct PureOcrEngine {
    engine: pure_onnx_ocr::engine::OcrEngine,
    keep_unk: bool,
}

impl PureOcrEngine {
    /// Load the engine from the model files named in the configuration.
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let det_path = config.model_path(&config.detection_model);
        let rec_path = config.model_path(&config.recognition_model);
        let dict_path = config.model_path(&config.dictionary);

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", config.model_dir.display());

        Ok(Self {
            engine,
            keep_unk: config.keep_unk,
        })
    }
}

impl LocalOcr for PureOcrEngine {
    fn recognize(&self, image: &[u8], language: &str) -> Result<OcrResult, OcrError> {
        let start = Instant::now();

        let decoded = image::load_from_memory(image)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;
        let (width, height) = decoded.dimensions();

        // The recognizer's language is fixed by its dictionary.
        trace!("Language hint '{}' ignored by pure-onnx-ocr", language);
        debug!("Running local OCR on {}x{} image", width, height);

        let regions = self
            .engine
            .run_from_image(&decoded)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let boxes: Vec<TextBox> = regions
            .iter()
            .map(|r| {
                let text = if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                TextBox {
                    bbox: polygon_to_rect(&r.bounding_box),
                    text,
                    score: r.confidence as f32,
                }
            })
            .collect();

        let result = OcrResult::from_boxes(boxes, start.elapsed().as_millis() as u64);

        info!(
            "Local OCR complete: {} text boxes, confidence {:.1} in {}ms",
            result.boxes.len(),
            result.confidence,
            result.processing_time_ms
        );

        Ok(result)
    }
}

/// Reduce the detector's quadrilateral to an axis-aligned `[x1, y1, x2, y2]` rectangle.
fn polygon_to_rect(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 4] {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for coord in polygon.exterior().coords().take(4) {
        min_x = min_x.min(coord.x);
        min_y = min_y.min(coord.y);
        max_x = max_x.max(coord.x);
        max_y = max_y.max(coord.y);
    }

    if !min_x.is_finite() {
        return [0.0; 4];
    }

    [min_x as f32, min_y as f32, max_x as f32, max_y as f32]
}
