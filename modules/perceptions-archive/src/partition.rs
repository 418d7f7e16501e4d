// Generic document partitioning: bytes + declared type → ordered text elements.

use std::io::{Cursor, Read};
use std::sync::LazyLock;

use quick_xml::events::Event;
use regex::Regex;
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};

use crate::classify::mime_essence;
use crate::error::ExtractError;

static BLANK_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n").unwrap());

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const DOCX_BODY: &str = "word/document.xml";

/// Converts one document into its text elements, in reading order.
///
/// Runs on the blocking pool, so implementations may be CPU heavy. A panic is
/// caught by the caller and reported as an extraction failure.
pub trait Partitioner: Send + Sync {
    fn partition(
        &self,
        bytes: &[u8],
        content_type: &str,
        url: &str,
    ) -> Result<Vec<String>, ExtractError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Pdf,
    Docx,
    Html,
    Text,
}

/// Format-polymorphic partitioner: PDF via `pdf-extract`, Word (OOXML) via
/// `zip` + `quick-xml`, HTML via readability, and the plain-text family
/// decoded as UTF-8.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentPartitioner;

impl Partitioner for DocumentPartitioner {
    fn partition(
        &self,
        bytes: &[u8],
        content_type: &str,
        url: &str,
    ) -> Result<Vec<String>, ExtractError> {
        let text = match detect_format(bytes, content_type)? {
            DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| ExtractError::Pdf(e.to_string()))?
                .replace('\u{c}', "\n\n"),
            DocumentFormat::Docx => return docx_paragraphs(bytes),
            DocumentFormat::Html => html_to_markdown(bytes, url),
            DocumentFormat::Text => String::from_utf8_lossy(bytes).into_owned(),
        };
        Ok(split_elements(&text))
    }
}

fn detect_format(bytes: &[u8], content_type: &str) -> Result<DocumentFormat, ExtractError> {
    let essence = mime_essence(content_type);
    match essence.as_str() {
        "application/pdf" | "application/x-pdf" => return Ok(DocumentFormat::Pdf),
        DOCX_MIME => return Ok(DocumentFormat::Docx),
        // Servers often label .docx as msword. Legacy binary .doc stays unsupported.
        "application/msword" if bytes.starts_with(ZIP_MAGIC) => return Ok(DocumentFormat::Docx),
        "text/html" | "application/xhtml+xml" => return Ok(DocumentFormat::Html),
        "" | "application/octet-stream" | "binary/octet-stream" => return sniff(bytes, &essence),
        _ => {}
    }

    if bytes.starts_with(b"%PDF-") {
        return Ok(DocumentFormat::Pdf);
    }

    let textual = essence.starts_with("text/")
        || essence.ends_with("+xml")
        || essence.ends_with("+json")
        || matches!(essence.as_str(), "application/json" | "application/xml");
    if textual {
        Ok(DocumentFormat::Text)
    } else {
        Err(ExtractError::Unsupported(essence))
    }
}

/// Best guess for responses that did not declare a useful type.
fn sniff(bytes: &[u8], essence: &str) -> Result<DocumentFormat, ExtractError> {
    if bytes.starts_with(b"%PDF-") {
        return Ok(DocumentFormat::Pdf);
    }
    if bytes.starts_with(ZIP_MAGIC) {
        return Ok(DocumentFormat::Docx);
    }
    let Ok(text) = std::str::from_utf8(bytes) else {
        let label = if essence.is_empty() { "<undeclared binary>" } else { essence };
        return Err(ExtractError::Unsupported(label.to_string()));
    };
    let head = text.trim_start().chars().take(15).collect::<String>().to_ascii_lowercase();
    if head.starts_with("<!doctype html") || head.starts_with("<html") {
        Ok(DocumentFormat::Html)
    } else {
        Ok(DocumentFormat::Text)
    }
}

fn split_elements(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    BLANK_LINE_RE
        .split(&normalized)
        .map(str::trim)
        .filter(|el| !el.is_empty())
        .map(String::from)
        .collect()
}

/// One element per non-empty `<w:p>` in the main document part.
fn docx_paragraphs(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    let docx_err = |e: &dyn std::fmt::Display| ExtractError::Docx(e.to_string());

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| docx_err(&e))?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|e| docx_err(&format!("{DOCX_BODY}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| docx_err(&e))?;

    let mut reader = quick_xml::Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(|e| docx_err(&e))? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    let paragraph = current.trim();
                    if !paragraph.is_empty() {
                        paragraphs.push(paragraph.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                current.push_str(&t.unescape().map_err(|e| docx_err(&e))?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn html_to_markdown(html: &[u8], url: &str) -> String {
    let parsed_url = url::Url::parse(url).ok();
    let config = TransformConfig {
        readability: true,
        main_content: true,
        return_format: ReturnFormat::Markdown,
        filter_images: true,
        filter_svg: true,
        clean_html: true,
    };
    transform_content_input(
        TransformInput {
            url: parsed_url.as_ref(),
            content: html,
            screenshot_bytes: None,
            encoding: None,
            selector_config: None,
            ignore_tags: None,
        },
        &config,
    )
}

#[cfg(test)]
mod fixtures {
    use std::io::{Cursor, Write};

    /// Single-page PDF drawing `lines` in Helvetica, with a correct xref table.
    pub fn pdf(lines: &[&str]) -> Vec<u8> {
        let mut content = String::from("BT /F1 12 Tf 72 720 Td");
        for line in lines {
            content.push_str(&format!(" ({line}) Tj 0 -48 Td"));
        }
        content.push_str(" ET");

        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
             /Resources << /Font << /F1 5 0 R >> >> >>"
                .to_string(),
            format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
        }
        let xref = pdf.len();
        let size = objects.len() + 1;
        pdf.extend_from_slice(format!("xref\n0 {size}\n0000000000 65535 f \n").as_bytes());
        for offset in offsets {
            pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        let trailer =
            format!("trailer\n<< /Size {size} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n");
        pdf.extend_from_slice(trailer.as_bytes());
        pdf
    }

    /// Minimal OOXML package holding just `word/document.xml` with `paragraphs`.
    pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!(r#"<w:p><w:r><w:t xml:space="preserve">{p}</w:t></w:r></w:p>"#))
            .collect();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }
}
