/// Extraction strategy for a fetched response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Web page: resolved through the reader service when one is configured.
    Html,
    /// Anything else: handed to the document partitioner.
    Other,
}

const HTML_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// Lowercased media type without parameters: `"Text/HTML; charset=utf-8"` → `"text/html"`.
pub fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn classify(content_type: &str) -> ContentKind {
    let essence = mime_essence(content_type);
    if HTML_TYPES.contains(&essence.as_str()) {
        ContentKind::Html
    } else {
        ContentKind::Other
    }
}
