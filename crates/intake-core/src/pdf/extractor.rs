//! PDF text extraction and page rasterization using lopdf and pdf-extract.

use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};

use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{NativeText, PageRasterizer, PageSource, PdfTextParser, Result};
use crate::error::PdfError;
use crate::formats::normalize_text;

/// PDF parser and rasterizer backed by lopdf (structure, images) and pdf-extract (text).
#[derive(Debug, Clone)]
pub struct LopdfExtractor {
    max_dimension: u32,
}

impl LopdfExtractor {
    /// Create an extractor bounding rendered pages to `max_dimension` pixels on the longer edge.
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    fn load(&self, data: &[u8]) -> Result<(Document, Vec<u8>)> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        let raw_data = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract needs the decrypted bytes
            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        if doc.get_pages().is_empty() {
            return Err(PdfError::NoPages);
        }

        Ok((doc, raw_data))
    }
}

impl Default for LopdfExtractor {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl PdfTextParser for LopdfExtractor {
    fn parse(&self, data: &[u8]) -> Result<NativeText> {
        let (doc, raw_data) = self.load(data)?;
        let page_count = doc.get_pages().len() as u32;

        // pdf-extract panics on some malformed content streams.
        let text = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(&raw_data)
        }))
        .map_err(|_| PdfError::TextExtraction("text extractor panicked".to_string()))?
        .map_err(|e| PdfError::TextExtraction(e.to_string()))?;

        let text = normalize_text(&text);

        debug!("Native PDF text: {} pages, {} chars", page_count, text.len());

        Ok(NativeText {
            text,
            page_count,
            title: info_string(&doc, b"Title"),
            author: info_string(&doc, b"Author"),
        })
    }
}

impl PageRasterizer for LopdfExtractor {
    fn open(&self, data: &[u8]) -> Result<Box<dyn PageSource>> {
        let (document, _) = self.load(data)?;
        debug!("Opened PDF for rendering: {} pages", document.get_pages().len());
        Ok(Box::new(LoadedPdf {
            document,
            max_dimension: self.max_dimension,
        }))
    }
}

/// A parsed document whose pages can be rendered.
///
/// Rendering recovers the raster content of a page from its image XObjects, which is what a
/// scanned page consists of. Pages made only of vector text have nothing to render.
pub struct LoadedPdf {
    document: Document,
    max_dimension: u32,
}

impl PageSource for LoadedPdf {
    fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    fn render_page(&self, page: u32, scale: f32) -> Result<Vec<u8>> {
        let images = self.page_images(page)?;

        // A scanned page is one dominant image; stray logos and stamps are smaller.
        let largest = images
            .into_iter()
            .max_by_key(|img| {
                let (w, h) = img.dimensions();
                w as u64 * h as u64
            })
            .ok_or_else(|| PdfError::Render {
                page,
                reason: "no raster content on page".to_string(),
            })?;

        let scaled = scale_image(largest, scale, self.max_dimension);

        let mut png = Vec::new();
        scaled
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| PdfError::Render {
                page,
                reason: e.to_string(),
            })?;

        trace!("Rendered page {} to {} PNG bytes", page, png.len());
        Ok(png)
    }
}

impl LoadedPdf {
    fn page_images(&self, page: u32) -> Result<Vec<DynamicImage>> {
        let doc = &self.document;
        let pages = doc.get_pages();
        let page_id = pages.get(&page).ok_or(PdfError::InvalidPage(page))?;

        let mut images = Vec::new();

        if let Some(resources) = page_resources(doc, *page_id) {
            if let Ok(xobjects) = resources.get(b"XObject") {
                if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
                    for (_name, obj_ref) in xobj_dict.iter() {
                        if let Ok((_, obj)) = doc.dereference(obj_ref) {
                            if let Some(img) = decode_image_object(doc, obj) {
                                images.push(img);
                            }
                        }
                    }
                }
            }
        }

        debug!("Found {} images on page {}", images.len(), page);
        Ok(images)
    }
}

/// Scale by `factor`, then shrink to fit `max_dimension` if the result got too large.
fn scale_image(image: DynamicImage, factor: f32, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    let mut target_w = (width as f32 * factor).round().max(1.0);
    let mut target_h = (height as f32 * factor).round().max(1.0);

    let longest = target_w.max(target_h);
    if max_dimension > 0 && longest > max_dimension as f32 {
        let shrink = max_dimension as f32 / longest;
        target_w = (target_w * shrink).round().max(1.0);
        target_h = (target_h * shrink).round().max(1.0);
    }

    let (target_w, target_h) = (target_w as u32, target_h as u32);
    if (target_w, target_h) == (width, height) {
        return image;
    }

    image.resize_exact(target_w, target_h, image::imageops::FilterType::Lanczos3)
}

fn decode_image_object(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    // Check if it's an image XObject
    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

    trace!("Found image object: {}x{}", width, height);

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) if !arr.is_empty() => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                // JPEG data - use raw stream content (already compressed)
                return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                    .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Unsupported image filter, skipping");
                return None;
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    if bits != 8 {
        trace!("Unsupported bits per component: {}", bits);
        return None;
    }

    raw_to_image(&data, width, height, color_space)
}

fn raw_to_image(data: &[u8], width: u32, height: u32, color_space: &[u8]) -> Option<DynamicImage> {
    let pixels = (width as usize).checked_mul(height as usize)?;

    let rgba: Vec<u8> = match color_space {
        b"DeviceRGB" | b"RGB" if data.len() >= pixels * 3 => data[..pixels * 3]
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 255])
            .collect(),
        b"DeviceGray" | b"G" if data.len() >= pixels => data[..pixels]
            .iter()
            .flat_map(|&g| [g, g, g, 255])
            .collect(),
        _ => {
            trace!(
                "Could not decode image: colorspace={:?}, data_len={}",
                String::from_utf8_lossy(color_space),
                data.len()
            );
            return None;
        }
    };

    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
}

/// Resources dictionary for a page, following /Parent inheritance.
fn page_resources(doc: &Document, node_id: ObjectId) -> Option<lopdf::Dictionary> {
    let Ok(Object::Dictionary(dict)) = doc.get_object(node_id) else {
        return None;
    };

    if let Ok(resources) = dict.get(b"Resources") {
        if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
            return Some(res_dict.clone());
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => page_resources(doc, *parent_id),
        _ => None,
    }
}

/// Read a string entry from the document Info dictionary.
fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info = doc.trailer.get(b"Info").ok()?;
    let (_, info) = doc.dereference(info).ok()?;
    let Object::Dictionary(dict) = info else {
        return None;
    };

    let (_, value) = doc.dereference(dict.get(key).ok()?).ok()?;
    let Object::String(bytes, _) = value else {
        return None;
    };

    let decoded = decode_pdf_string(bytes);
    let trimmed = decoded.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Decode a PDF text string: UTF-16BE when it carries a BOM, otherwise byte-per-char.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    bytes.iter().map(|&b| b as char).collect()
}
