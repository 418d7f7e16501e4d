// Single point of network I/O for content acquisition.
// Never fails: every outcome, including transport errors, is a FetchOutcome.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reader_client::ReaderClient;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use tracing::{debug, info};

use crate::classify::{classify, ContentKind};
use crate::error::Result;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:52.0) Gecko/20100101 Firefox/52.0";

pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// What a successful fetch carried back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedBody {
    /// Main-article text from the reader service. Already extracted.
    Reader(String),
    /// Raw response body, to be partitioned.
    Raw(Bytes),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    /// Declared `Content-Type`, empty when the server sent none.
    pub content_type: String,
    pub body: FetchedBody,
}

impl FetchedContent {
    pub fn reader(content_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            body: FetchedBody::Reader(text.into()),
        }
    }

    pub fn raw(content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            body: FetchedBody::Raw(bytes.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(FetchedContent),
    Timeout,
    Error { reason: String },
}

impl FetchOutcome {
    pub fn error(reason: impl Into<String>) -> Self {
        FetchOutcome::Error {
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchOutcome;
    fn name(&self) -> &str;
}

/// `reqwest` fetcher with a browser-like header set. HTML pages are re-read
/// through the reader service when one is configured.
pub struct HttpFetcher {
    client: reqwest::Client,
    reader: Option<ReaderClient>,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, reader: Option<ReaderClient>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers())
            .build()?;

        info!(
            timeout_secs = timeout.as_secs(),
            reader = reader.as_ref().map(|r| r.base_url()).unwrap_or("off"),
            "HttpFetcher initialized"
        );

        Ok(Self {
            client,
            reader,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Raw bodies larger than this are abandoned with `FetchOutcome::Error`.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    async fn read_through_reader(
        &self,
        reader: &ReaderClient,
        url: &str,
        content_type: String,
    ) -> FetchOutcome {
        match reader.read(url).await {
            Ok(text) => {
                debug!(url, chars = text.len(), "fetch: reader returned article text");
                FetchOutcome::Success(FetchedContent::reader(content_type, text))
            }
            Err(e) if e.is_timeout() => FetchOutcome::Timeout,
            Err(e) => FetchOutcome::error(format!("reader: {e}")),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        debug!(url, "fetch: requesting");

        let resp = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => return transport_outcome(e),
        };

        // Status is not a failure condition: error pages are still content.
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if classify(&content_type) == ContentKind::Html {
            if let Some(reader) = &self.reader {
                drop(resp);
                return self.read_through_reader(reader, url, content_type).await;
            }
        }

        match read_capped(resp, self.max_body_bytes).await {
            Ok(bytes) => {
                debug!(
                    url,
                    status = status.as_u16(),
                    content_type,
                    bytes = bytes.len(),
                    "fetch: body received"
                );
                FetchOutcome::Success(FetchedContent::raw(content_type, bytes))
            }
            Err(outcome) => outcome,
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Stream the body, giving up as soon as it grows past `cap`.
async fn read_capped(
    mut resp: reqwest::Response,
    cap: usize,
) -> std::result::Result<Bytes, FetchOutcome> {
    let too_large = || FetchOutcome::error(format!("body exceeds {cap} bytes"));
    if resp.content_length().is_some_and(|len| len > cap as u64) {
        return Err(too_large());
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = resp.chunk().await.map_err(transport_outcome)? {
        if body.len() + chunk.len() > cap {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

fn transport_outcome(err: reqwest::Error) -> FetchOutcome {
    if err.is_timeout() {
        FetchOutcome::Timeout
    } else {
        FetchOutcome::error(err.to_string())
    }
}

/// Browser-like identification plus the permissive CORS headers sent with every fetch.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    for (name, value) in [
        ("access-control-allow-origin", "*"),
        ("access-control-allow-methods", "GET"),
        ("access-control-allow-headers", "Content-Type"),
        ("access-control-max-age", "3600"),
    ] {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    headers
}
