//! Test doubles for the OCR and PDF collaborator traits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{OcrError, PdfError, VisionError, VisionErrorCode};
use crate::ocr::{CloudOcr, LocalOcr, OcrResult};
use crate::pdf::{NativeText, PageRasterizer, PageSource, PdfTextParser};

pub struct FixedLocal {
    pub text: String,
    pub confidence: f32,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FixedLocal {
    pub fn ok(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok("", 0.0)
        }
    }
}

impl LocalOcr for FixedLocal {
    fn recognize(&self, _image: &[u8], _language: &str) -> Result<OcrResult, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(OcrError::Recognition("engine crashed".to_string()));
        }
        Ok(OcrResult::from_text(self.text.clone(), self.confidence))
    }
}

pub struct FixedCloud {
    pub configured: bool,
    pub result: Result<(String, f32), VisionErrorCode>,
    pub calls: AtomicUsize,
}

impl FixedCloud {
    pub fn ok(text: &str, confidence: f32) -> Self {
        Self {
            configured: true,
            result: Ok((text.to_string(), confidence)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn err(code: VisionErrorCode) -> Self {
        Self {
            configured: true,
            result: Err(code),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::ok("never returned because no key is set", 99.0)
        }
    }
}

impl CloudOcr for FixedCloud {
    fn is_configured(&self) -> bool {
        self.configured
    }

    fn detect_text(&self, _image: &[u8], _mime_type: &str) -> Result<OcrResult, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok((text, confidence)) => Ok(OcrResult::from_text(text.clone(), *confidence)),
            Err(code) => Err(VisionError::new(*code, "simulated")),
        }
    }
}

/// Local engine answering from a script, one entry per call; `Err(())` simulates a crash.
pub struct SequenceLocal {
    script: Mutex<VecDeque<Result<(String, f32), ()>>>,
}

impl SequenceLocal {
    pub fn new(script: Vec<Result<(String, f32), ()>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

impl LocalOcr for SequenceLocal {
    fn recognize(&self, _image: &[u8], _language: &str) -> Result<OcrResult, OcrError> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok((text, confidence))) => Ok(OcrResult::from_text(text, confidence)),
            Some(Err(())) => Err(OcrError::Recognition("engine crashed".to_string())),
            None => Err(OcrError::Recognition("script exhausted".to_string())),
        }
    }
}

pub enum FakeParser {
    Text(NativeText),
    Encrypted,
    Corrupt(String),
}

impl FakeParser {
    pub fn text(text: &str, page_count: u32) -> Self {
        FakeParser::Text(NativeText {
            text: text.to_string(),
            page_count,
            title: None,
            author: None,
        })
    }

    pub fn with_title(mut self, title: &str) -> Self {
        if let FakeParser::Text(native) = &mut self {
            native.title = Some(title.to_string());
        }
        self
    }

    pub fn corrupt(reason: &str) -> Self {
        FakeParser::Corrupt(reason.to_string())
    }
}

impl PdfTextParser for FakeParser {
    fn parse(&self, _data: &[u8]) -> crate::pdf::Result<NativeText> {
        match self {
            FakeParser::Text(native) => Ok(native.clone()),
            FakeParser::Encrypted => Err(PdfError::Encrypted),
            FakeParser::Corrupt(reason) => Err(PdfError::Parse(reason.clone())),
        }
    }
}

/// Rasterizer over a fake document of `pages` pages that counts rendered pages.
pub struct FakeRasterizer {
    pages: Option<u32>,
    pub renders: Arc<AtomicUsize>,
}

impl FakeRasterizer {
    pub fn new(pages: u32) -> Self {
        Self {
            pages: Some(pages),
            renders: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unopenable() -> Self {
        Self {
            pages: None,
            renders: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl PageRasterizer for FakeRasterizer {
    fn open(&self, _data: &[u8]) -> crate::pdf::Result<Box<dyn PageSource>> {
        let pages = self
            .pages
            .ok_or_else(|| PdfError::Parse("cannot open document".to_string()))?;
        Ok(Box::new(FakePages {
            pages,
            renders: Arc::clone(&self.renders),
        }))
    }
}

struct FakePages {
    pages: u32,
    renders: Arc<AtomicUsize>,
}

impl PageSource for FakePages {
    fn page_count(&self) -> u32 {
        self.pages
    }

    fn render_page(&self, page: u32, _scale: f32) -> crate::pdf::Result<Vec<u8>> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(format!("page-{}", page).into_bytes())
    }
}

/// Parser that panics, like a native library tripping over a malformed content stream.
pub struct PanickingParser;

impl PdfTextParser for PanickingParser {
    fn parse(&self, _data: &[u8]) -> crate::pdf::Result<NativeText> {
        panic!("content stream exploded")
    }
}
