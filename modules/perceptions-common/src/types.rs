use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{PerceptionsError, Result};

/// `full_text` of a batch whose search returned no organic hits.
pub const NO_ORGANIC_RESULTS: &str = "No organic results found.";
/// Content of an item whose fetch (or reader call) ran past its timeout.
pub const TIMED_OUT: &str = "Timed out";
/// Content of an item that could not be fetched or extracted.
pub const CONTENT_UNAVAILABLE: &str = "Could not access content";

// --- Search results ---

/// One organic search hit as returned by the search provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_link: Option<String>,
}

impl SearchResultItem {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The part of a search provider response the pipeline consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub organic: Vec<SearchResultItem>,
}

impl SearchResponse {
    /// Parse a raw provider response, rejecting shapes that break the batch contract.
    ///
    /// A missing or null `organic` key is an empty batch. A non-object root, a
    /// non-array `organic`, or a non-object entry is an error.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| {
            PerceptionsError::InvalidSearchResponse(format!(
                "expected a JSON object, got {}",
                json_kind(value)
            ))
        })?;

        match map.get("organic") {
            None | Some(serde_json::Value::Null) => return Ok(Self::default()),
            Some(serde_json::Value::Array(entries)) => {
                if let Some((i, bad)) = entries.iter().enumerate().find(|(_, e)| !e.is_object()) {
                    return Err(PerceptionsError::InvalidSearchResponse(format!(
                        "organic[{i}] is {}, expected an object",
                        json_kind(bad)
                    )));
                }
            }
            Some(other) => {
                return Err(PerceptionsError::InvalidSearchResponse(format!(
                    "`organic` is {}, expected an array",
                    json_kind(other)
                )))
            }
        }

        Ok(serde_json::from_value(value.clone())?)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// --- Extracted content ---

/// Positional label for the item at `index`: 0 → "A", 25 → "Z", 26 → "AA".
pub fn article_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// One search result after content acquisition. `content` is either the
/// extracted (possibly truncated) text or a sentinel string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub link: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub article_letter: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_length: Option<usize>,
}

impl ExtractedDocument {
    /// The `<doc>` block this document contributes to a batch's `full_text`.
    pub fn to_doc_block(&self) -> String {
        format!(
            "<doc>\nArticle Letter: {}\n{}\n{}\n{}\n</doc>",
            self.article_letter, self.title, self.description, self.content
        )
    }
}

/// Join documents into the delimited text handed to the completion provider.
pub fn join_doc_blocks<'a>(docs: impl IntoIterator<Item = &'a ExtractedDocument>) -> String {
    docs.into_iter()
        .map(ExtractedDocument::to_doc_block)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Output artifact of one content-acquisition run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultBatch {
    pub full_text: String,
    pub individual_results: Vec<ExtractedDocument>,
}

impl ResultBatch {
    pub fn empty() -> Self {
        Self {
            full_text: NO_ORGANIC_RESULTS.to_string(),
            individual_results: Vec::new(),
        }
    }

    /// Build a batch from documents already in input order.
    pub fn from_documents(documents: Vec<ExtractedDocument>) -> Self {
        if documents.is_empty() {
            return Self::empty();
        }
        Self {
            full_text: join_doc_blocks(&documents),
            individual_results: documents,
        }
    }
}
