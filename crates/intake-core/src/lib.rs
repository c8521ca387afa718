//! Core library for document intake.
//!
//! This crate provides:
//! - Format routing for uploads of untrusted MIME type (PDF, Word, plain text, images)
//! - PDF text extraction with a page-capped, rasterized OCR fallback
//! - An image OCR cascade over a local engine and a cloud vision service
//! - Validation of classifier output into typed analysis items

pub mod analysis;
pub mod error;
pub mod extract;
pub mod formats;
pub mod models;
pub mod ocr;
pub mod pdf;

#[cfg(test)]
mod test_support;

pub use analysis::{validate_analysis, AnalysisValidator};
pub use error::{ErrorCode, ProcessingError, Result, StageError, VisionError, VisionErrorCode};
pub use extract::{route, DocumentExtractor, Route};
pub use models::analysis::{AnalysisItem, AnalysisResult, DestinationSystem, ItemType, PrimaryCategory};
pub use models::config::IntakeConfig;
pub use models::document::{DocumentMetadata, ExtractionMethod, ExtractionResult};
pub use ocr::{CloudOcr, LocalOcr, OcrResult, TextBox, VisionClient};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pdf::{LopdfExtractor, PageRasterizer, PageSource, PdfTextParser};
