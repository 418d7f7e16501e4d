pub mod error;

pub use error::{ReaderError, Result};

use std::time::Duration;

use tracing::debug;

/// Client for a reader service that turns a page URL into its main-article
/// text (`GET {base_url}/{page_url}`).
pub struct ReaderClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ReaderClient {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the extracted article text for `url`.
    pub async fn read(&self, url: &str) -> Result<String> {
        let endpoint = format!("{}/{}", self.base_url, url);
        debug!(url, "reader: requesting article text");

        let mut req = self.client.get(&endpoint);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ReaderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}
