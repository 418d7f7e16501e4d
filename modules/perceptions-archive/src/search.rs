use std::time::Duration;

use async_trait::async_trait;
use perceptions_common::{retry_with_backoff, Backoff};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ArchiveError, Result};

const SEARCH_BUDGET: Duration = Duration::from_secs(120);
const GOOGLE_SEARCH_URL: &str = "http://www.google.com/search";

/// Issues one search query and returns the provider's raw JSON response.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Value>;
}

/// Google results through the Bright Data SERP proxy (`brd_json=1` asks the
/// proxy for parsed JSON instead of HTML).
pub struct BrightDataSearch {
    client: reqwest::Client,
    endpoint: String,
    backoff: Backoff,
}

impl BrightDataSearch {
    /// `proxy_url` is the full proxy URL with the credential embedded.
    pub fn new(proxy_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .proxy(reqwest::Proxy::all(proxy_url)?)
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self::with_client(client, GOOGLE_SEARCH_URL))
    }

    /// Direct client against a custom endpoint, no proxy.
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            backoff: Backoff::with_budget(SEARCH_BUDGET),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    fn query_url(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        format!("{}?q={encoded}&brd_json=1", self.endpoint)
    }

    async fn search_once(&self, url: &str) -> Result<Value> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ArchiveError::SearchFailed(format!("{status}: {body}")));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl SearchProvider for BrightDataSearch {
    async fn search(&self, query: &str) -> Result<Value> {
        let url = self.query_url(query);
        debug!(query, "search: requesting");

        let value =
            retry_with_backoff("brightdata search", self.backoff, || self.search_once(&url)).await?;

        let hits = value
            .get("organic")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        info!(query, hits, "search: complete");
        Ok(value)
    }
}
