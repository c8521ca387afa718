//! Raw text extraction from Word (OOXML) documents.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use super::normalize_text;
use crate::error::{DocxError, ProcessingError};
use crate::models::document::{trimmed_len, ExtractionResult};

const DOCUMENT_PART: &str = "word/document.xml";

/// Reads the body text of a `.docx` file.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExtractor;

impl DocxExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract and validate document text.
    ///
    /// Unreadable containers fail with `DOCX_EXTRACTION_FAILED`; documents with too little
    /// text fail with `EMPTY_DOCUMENT`.
    pub fn extract(
        &self,
        data: &[u8],
        file_name: &str,
        min_text_length: usize,
    ) -> Result<ExtractionResult, ProcessingError> {
        let text = self
            .read_text(data)
            .map_err(|e| ProcessingError::docx_extraction_failed(e.to_string()))?;

        let len = trimmed_len(&text);
        debug!("DOCX '{}': {} chars", file_name, len);

        if len < min_text_length {
            return Err(ProcessingError::empty_document(
                file_name,
                format!("document has {} chars, minimum is {}", len, min_text_length),
            ));
        }

        Ok(ExtractionResult::native(text))
    }

    /// Raw text of the main document part, one line per paragraph.
    pub fn read_text(&self, data: &[u8]) -> Result<String, DocxError> {
        let mut archive =
            ZipArchive::new(Cursor::new(data)).map_err(|e| DocxError::Archive(e.to_string()))?;

        let mut xml = String::new();
        match archive.by_name(DOCUMENT_PART) {
            Ok(mut part) => {
                part.read_to_string(&mut xml)
                    .map_err(|e| DocxError::Archive(e.to_string()))?;
            }
            Err(ZipError::FileNotFound) => return Err(DocxError::MissingDocumentPart),
            Err(e) => return Err(DocxError::Archive(e.to_string())),
        }

        Ok(normalize_text(&body_text(&xml)?))
    }
}

/// Walk WordprocessingML and collect run text (`w:t`), tabs, breaks and paragraph ends.
/// Tabs and breaks only count inside a run (`w:r`); `w:tab` also appears as a tab-stop
/// definition under `w:pPr/w:tabs`.
fn body_text(xml: &str) -> Result<String, DocxError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"r" => in_run = false,
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) if in_run => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| DocxError::Xml(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DocxError::Xml(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    Ok(out)
}
