//! PDF processing module.
//!
//! Native text-layer extraction comes first; rasterized OCR is the fallback for scanned pages.

mod extractor;
mod pipeline;

pub use extractor::{LoadedPdf, LopdfExtractor};
pub use pipeline::{PdfPipeline, PdfPipelineSettings, PAGE_SEPARATOR};

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text read from a PDF's own text layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeText {
    pub text: String,
    pub page_count: u32,
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Native text-layer parser.
pub trait PdfTextParser {
    /// Parse the document and return its text. Fails on malformed or encrypted input.
    fn parse(&self, data: &[u8]) -> Result<NativeText>;
}

/// Turns PDF pages into raster images.
pub trait PageRasterizer {
    /// Open a document for page-by-page rendering.
    fn open(&self, data: &[u8]) -> Result<Box<dyn PageSource>>;
}

/// An opened document ready for rendering.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Render one page (1-indexed) at `scale` and return it as encoded PNG.
    fn render_page(&self, page: u32, scale: f32) -> Result<Vec<u8>>;
}
