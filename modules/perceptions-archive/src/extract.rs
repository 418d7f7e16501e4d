use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::ExtractError;
use crate::fetcher::{FetchedBody, FetchedContent};
use crate::paragraphs::repair_paragraphs;
use crate::partition::Partitioner;

/// Turn a successful fetch into repaired plain text.
///
/// Reader text is already the main article and only gets paragraph repair.
/// Raw bodies are partitioned on the blocking pool, elements joined with a
/// newline. The partitioner gets `limit` to finish; an overrun or a panic
/// becomes an `ExtractError` rather than taking the task down.
pub async fn extract_text(
    partitioner: Arc<dyn Partitioner>,
    content: FetchedContent,
    url: &str,
    limit: Duration,
) -> Result<String, ExtractError> {
    let FetchedContent { content_type, body } = content;

    let text = match body {
        FetchedBody::Reader(text) => text,
        FetchedBody::Raw(bytes) => {
            let url = url.to_string();
            let job = tokio::task::spawn_blocking(move || {
                partitioner.partition(&bytes, &content_type, &url)
            });

            let elements = match tokio::time::timeout(limit, job).await {
                Ok(Ok(result)) => result?,
                Ok(Err(join_err)) => return Err(ExtractError::Crashed(join_err.to_string())),
                Err(_) => return Err(ExtractError::TimedOut(limit)),
            };
            debug!(elements = elements.len(), "extract: partitioned");
            elements.join("\n")
        }
    };

    Ok(repair_paragraphs(&text))
}
