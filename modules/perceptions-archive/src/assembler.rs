// Result assembly: fetch → classify → extract → truncate for every organic
// hit, bounded parallelism, output in input order.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use perceptions_common::{
    article_letter, Config, ExtractedDocument, ResultBatch, SearchResponse, SearchResultItem,
    CONTENT_UNAVAILABLE, TIMED_OUT,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::extract::extract_text;
use crate::fetcher::{FetchOutcome, Fetcher};
use crate::partition::Partitioner;
use crate::truncate::{truncate, Truncated};

#[derive(Debug, Clone, Copy)]
pub struct AssemblerConfig {
    /// Items fetched and extracted at the same time.
    pub max_concurrent: usize,
    /// Character budget for each document's content.
    pub max_chars: usize,
    /// Time cap for partitioning one raw document.
    pub extract_timeout: Duration,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            max_chars: 10_000,
            extract_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&Config> for AssemblerConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrent: config.max_concurrent_fetches,
            max_chars: config.max_content_chars,
            extract_timeout: config.extract_timeout,
        }
    }
}

/// How one item ended up. Collapsed to document content only at the end.
enum ItemOutcome {
    Extracted(Truncated),
    TimedOut,
    Failed,
}

impl ItemOutcome {
    fn into_content(self) -> (String, bool, Option<usize>) {
        match self {
            ItemOutcome::Extracted(t) => (t.text, t.truncated, t.original_length),
            ItemOutcome::TimedOut => (TIMED_OUT.to_string(), false, None),
            ItemOutcome::Failed => (CONTENT_UNAVAILABLE.to_string(), false, None),
        }
    }
}

pub struct ContentAssembler {
    fetcher: Arc<dyn Fetcher>,
    partitioner: Arc<dyn Partitioner>,
    config: AssemblerConfig,
}

impl ContentAssembler {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        partitioner: Arc<dyn Partitioner>,
        config: AssemblerConfig,
    ) -> Self {
        Self {
            fetcher,
            partitioner,
            config,
        }
    }

    /// Validate a raw search response, then assemble its organic results.
    pub async fn assemble_response(&self, response: &Value) -> Result<ResultBatch> {
        let parsed = SearchResponse::from_value(response)?;
        Ok(self.assemble(parsed.organic).await)
    }

    /// One document per input item, in input order. Never fails: per-item
    /// problems become sentinel content.
    pub async fn assemble(&self, items: Vec<SearchResultItem>) -> ResultBatch {
        if items.is_empty() {
            info!("assemble: no organic results");
            return ResultBatch::empty();
        }

        let total = items.len();
        let cap = self.config.max_concurrent.max(1);
        info!(
            items = total,
            concurrency = cap,
            fetcher = self.fetcher.name(),
            "assemble: starting"
        );

        let mut results: Vec<(usize, SearchResultItem, ItemOutcome)> =
            stream::iter(items.into_iter().enumerate().map(|(index, item)| async move {
                let outcome = self.process(index, &item).await;
                (index, item, outcome)
            }))
            .buffer_unordered(cap)
            .collect()
            .await;

        results.sort_by_key(|(index, _, _)| *index);

        let mut failed = 0usize;
        let documents: Vec<ExtractedDocument> = results
            .into_iter()
            .map(|(index, item, outcome)| {
                if !matches!(outcome, ItemOutcome::Extracted(_)) {
                    failed += 1;
                }
                let (content, truncated, original_length) = outcome.into_content();
                ExtractedDocument {
                    link: item.link,
                    title: item.title.unwrap_or_default(),
                    description: item.description.unwrap_or_default(),
                    content,
                    article_letter: article_letter(index),
                    truncated,
                    original_length,
                }
            })
            .collect();

        info!(items = total, failed, "assemble: complete");
        ResultBatch::from_documents(documents)
    }

    async fn process(&self, index: usize, item: &SearchResultItem) -> ItemOutcome {
        let letter = article_letter(index);
        let url = item.link.as_str();

        let content = match self.fetcher.fetch(url).await {
            FetchOutcome::Success(content) => content,
            FetchOutcome::Timeout => {
                warn!(url, article_letter = %letter, "assemble: fetch timed out");
                return ItemOutcome::TimedOut;
            }
            FetchOutcome::Error { reason } => {
                warn!(url, article_letter = %letter, error = %reason, "assemble: fetch failed");
                return ItemOutcome::Failed;
            }
        };

        let content_type = content.content_type.clone();
        let limit = self.config.extract_timeout;
        match extract_text(self.partitioner.clone(), content, url, limit).await {
            Ok(text) => {
                let bounded = truncate(&text, self.config.max_chars);
                debug!(
                    url,
                    article_letter = %letter,
                    chars = bounded.original_length.unwrap_or(text.chars().count()),
                    truncated = bounded.truncated,
                    "assemble: extracted"
                );
                ItemOutcome::Extracted(bounded)
            }
            Err(e) => {
                warn!(
                    url,
                    article_letter = %letter,
                    content_type,
                    error = %e,
                    "assemble: extraction failed"
                );
                ItemOutcome::Failed
            }
        }
    }
}
