//! Text extraction from uploaded documents (PDF, DOCX, plain text).

use std::io::{Cursor, Read};

use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("Failed to parse PDF: {0}")]
    Pdf(String),

    #[error("Failed to parse DOCX: {0}")]
    Docx(String),
}

/// Text pulled out of an uploaded file.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub text: String,
    pub file_type: String,
}

/// Lower-cased text after the last `.`. A name without a dot is its own
/// extension; a trailing dot gives an empty one.
pub fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// File name with its extension removed.
pub fn file_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Extracts sanitized text from `bytes` according to the file extension.
/// PDF parsing runs on the blocking pool.
pub async fn parse_file(file_name: &str, bytes: Bytes) -> Result<ParsedDocument, DocumentError> {
    let file_type = file_extension(file_name);

    let text = match file_type.as_str() {
        "pdf" => tokio::task::spawn_blocking(move || parse_pdf(&bytes))
            .await
            .map_err(|e| DocumentError::Pdf(e.to_string()))??,
        "docx" | "doc" => parse_docx(&bytes)?,
        "txt" => String::from_utf8_lossy(&bytes).into_owned(),
        other => return Err(DocumentError::Unsupported(other.to_string())),
    };

    Ok(ParsedDocument {
        text: sanitize_text(&text),
        file_type,
    })
}

fn parse_pdf(bytes: &[u8]) -> Result<String, DocumentError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| DocumentError::Pdf(e.to_string()))
}

/// Reads the run text of `word/document.xml`. Paragraph ends and `<w:br/>`
/// become newlines, `<w:tab/>` becomes a tab.
fn parse_docx(bytes: &[u8]) -> Result<String, DocumentError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| DocumentError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| DocumentError::Docx(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| DocumentError::Docx(e.to_string()))?;

    let mut reader = Reader::from_str(&xml);
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| DocumentError::Docx(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DocumentError::Docx(e.to_string())),
            _ => {}
        }
    }

    Ok(out)
}

/// Removes NUL and control characters (tab, LF and CR are kept), then trims.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(*c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}'))
        .collect::<String>()
        .trim()
        .to_string()
}
