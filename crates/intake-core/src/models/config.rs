//! Configuration structures for the intake pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the intake pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Format-independent extraction settings.
    pub extraction: ExtractionConfig,

    /// Local OCR engine configuration.
    pub ocr: OcrConfig,

    /// Cloud OCR service configuration.
    pub vision: VisionConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Analysis validation configuration.
    pub analysis: AnalysisConfig,
}

/// Acceptance settings shared by every extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum trimmed text length for an extraction to be accepted.
    pub min_text_length: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self { min_text_length: 30 }
    }
}

/// Local OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Minimum confidence (0-100) for the local result to be accepted outright.
    pub min_confidence: f32,

    /// Length bar for the last-resort tier of the image cascade.
    pub last_resort_min_length: usize,

    /// Language hint passed to the engine.
    pub language: String,

    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` tokens in recognized text instead of blanking them.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            min_confidence: 60.0,
            last_resort_min_length: 10,
            language: "eng".to_string(),
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.model_dir.join(model_name)
    }

    /// Whether the detection and recognition models are present on disk.
    pub fn models_present(&self) -> bool {
        [&self.detection_model, &self.recognition_model, &self.dictionary]
            .iter()
            .all(|name| self.model_path(name).exists())
    }
}

/// Cloud OCR service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// API key; the cloud tier is skipped entirely when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// `images:annotate` endpoint.
    pub endpoint: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Language hints sent with each request.
    pub language_hints: Vec<String>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://vision.googleapis.com/v1/images:annotate".to_string(),
            timeout_secs: 30,
            language_hints: vec!["en".to_string()],
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Maximum pages run through OCR, regardless of page count.
    pub max_ocr_pages: u32,

    /// Scale factor applied when rasterizing pages.
    pub render_scale: f32,

    /// Upper bound on the longer edge of a rendered page, in pixels.
    pub max_render_dimension: u32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            max_ocr_pages: 10,
            render_scale: 2.0,
            max_render_dimension: 4096,
        }
    }
}

/// Analysis validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Share of items (0.0-1.0) a category needs to become the primary category.
    pub majority_threshold: f64,

    /// Confidence given to items that don't carry a numeric one.
    pub default_item_confidence: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            majority_threshold: 0.6,
            default_item_confidence: 50.0,
        }
    }
}

impl IntakeConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
