//! Result assembly with scripted fetchers and partitioners.
//!
//! No network: each test supplies a `Fetcher` that answers per URL, optionally
//! after a delay, so ordering and failure containment can be asserted exactly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use perceptions_archive::{
    AssemblerConfig, ContentAssembler, DocumentPartitioner, ExtractError, FetchOutcome,
    FetchedContent, Fetcher, Partitioner,
};
use perceptions_common::{SearchResultItem, CONTENT_UNAVAILABLE, NO_ORGANIC_RESULTS, TIMED_OUT};
use serde_json::json;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Scripted {
    Text(&'static str),
    Raw(&'static str, &'static [u8]),
    Timeout,
    Error,
}

struct ScriptedFetcher {
    responses: HashMap<String, (Scripted, Duration)>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFetcher {
    fn new() -> Self {
        Self {
            responses: HashMap::new(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn on(mut self, url: &str, response: Scripted) -> Self {
        self.responses.insert(url.to_string(), (response, Duration::ZERO));
        self
    }

    fn slow(mut self, url: &str, response: Scripted, delay: Duration) -> Self {
        self.responses.insert(url.to_string(), (response, delay));
        self
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let (response, delay) = self
            .responses
            .get(url)
            .cloned()
            .unwrap_or((Scripted::Error, Duration::ZERO));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match response {
            Scripted::Text(text) => {
                FetchOutcome::Success(FetchedContent::reader("text/html", text))
            }
            Scripted::Raw(content_type, bytes) => {
                FetchOutcome::Success(FetchedContent::raw(content_type, bytes))
            }
            Scripted::Timeout => FetchOutcome::Timeout,
            Scripted::Error => FetchOutcome::error("connection refused"),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Fails on any document whose bytes contain `boom`.
struct FailingPartitioner;

impl Partitioner for FailingPartitioner {
    fn partition(
        &self,
        bytes: &[u8],
        content_type: &str,
        url: &str,
    ) -> Result<Vec<String>, ExtractError> {
        if bytes.windows(4).any(|w| w == b"boom") {
            return Err(ExtractError::Pdf("corrupt xref table".into()));
        }
        DocumentPartitioner.partition(bytes, content_type, url)
    }
}

fn item(link: &str, title: &str, description: &str) -> SearchResultItem {
    SearchResultItem::new(link)
        .with_title(title)
        .with_description(description)
}

fn assembler(fetcher: ScriptedFetcher) -> ContentAssembler {
    assembler_with(Arc::new(fetcher), AssemblerConfig::default())
}

fn assembler_with(fetcher: Arc<ScriptedFetcher>, config: AssemblerConfig) -> ContentAssembler {
    ContentAssembler::new(fetcher, Arc::new(FailingPartitioner), config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn timed_out_item_keeps_its_slot() {
    let fetcher = ScriptedFetcher::new()
        .on("http://a.example", Scripted::Text("Solar farm approved by the county."))
        .on("http://bad.example", Scripted::Timeout);

    let batch = assembler(fetcher)
        .assemble_response(&json!({
            "organic": [
                {"link": "http://a.example", "title": "T1", "description": "D1"},
                {"link": "http://bad.example", "title": "T2", "description": "D2"}
            ]
        }))
        .await
        .unwrap();

    assert_eq!(batch.individual_results.len(), 2);
    let a = &batch.individual_results[0];
    assert_eq!(a.article_letter, "A");
    assert_eq!(a.content, "Solar farm approved by the county.");
    let b = &batch.individual_results[1];
    assert_eq!(b.article_letter, "B");
    assert_eq!(b.content, TIMED_OUT);

    let pos_a = batch.full_text.find("Article Letter: A").unwrap();
    let pos_b = batch.full_text.find("Article Letter: B").unwrap();
    assert!(pos_a < pos_b);
    assert!(batch.full_text.contains("T1\nD1\nSolar farm approved by the county."));
}

#[tokio::test]
async fn order_follows_input_not_completion() {
    let fetcher = ScriptedFetcher::new()
        .slow("http://1.example", Scripted::Text("first"), Duration::from_millis(150))
        .slow("http://2.example", Scripted::Text("second"), Duration::from_millis(80))
        .on("http://3.example", Scripted::Text("third"));

    let batch = assembler(fetcher)
        .assemble(vec![
            item("http://1.example", "one", ""),
            item("http://2.example", "two", ""),
            item("http://3.example", "three", ""),
        ])
        .await;

    let contents: Vec<&str> = batch.individual_results.iter().map(|d| d.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second", "third"]);
    let letters: Vec<&str> = batch
        .individual_results
        .iter()
        .map(|d| d.article_letter.as_str())
        .collect();
    assert_eq!(letters, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn extraction_failure_is_contained() {
    let fetcher = ScriptedFetcher::new()
        .on("http://a.example", Scripted::Raw("text/plain", b"Plain text report."))
        .on("http://b.example", Scripted::Raw("application/pdf", b"%PDF-1.4 boom"))
        .on("http://c.example", Scripted::Raw("image/png", b"\x89PNG"))
        .on("http://d.example", Scripted::Error)
        .on("http://e.example", Scripted::Text("Fine."));

    let batch = assembler(fetcher)
        .assemble(
            ["a", "b", "c", "d", "e"]
                .iter()
                .map(|h| item(&format!("http://{h}.example"), h, h))
                .collect(),
        )
        .await;

    let contents: Vec<&str> = batch.individual_results.iter().map(|d| d.content.as_str()).collect();
    assert_eq!(
        contents,
        vec![
            "Plain text report.",
            CONTENT_UNAVAILABLE,
            CONTENT_UNAVAILABLE,
            CONTENT_UNAVAILABLE,
            "Fine."
        ]
    );
}

#[tokio::test]
async fn letters_track_position_not_content() {
    let forward = ScriptedFetcher::new()
        .on("http://x.example", Scripted::Text("x"))
        .on("http://y.example", Scripted::Text("y"));
    let backward = ScriptedFetcher::new()
        .on("http://x.example", Scripted::Text("x"))
        .on("http://y.example", Scripted::Text("y"));

    let first = assembler(forward)
        .assemble(vec![item("http://x.example", "", ""), item("http://y.example", "", "")])
        .await;
    let second = assembler(backward)
        .assemble(vec![item("http://y.example", "", ""), item("http://x.example", "", "")])
        .await;

    assert_eq!(first.individual_results[0].content, "x");
    assert_eq!(first.individual_results[0].article_letter, "A");
    assert_eq!(second.individual_results[0].content, "y");
    assert_eq!(second.individual_results[0].article_letter, "A");
    assert_eq!(second.individual_results[1].content, "x");
    assert_eq!(second.individual_results[1].article_letter, "B");
}

#[tokio::test]
async fn long_content_is_truncated_with_marker() {
    let long: &'static str = Box::leak("word ".repeat(30).into_boxed_str());
    let fetcher = ScriptedFetcher::new().on("http://long.example", Scripted::Text(long));
    let config = AssemblerConfig {
        max_chars: 20,
        ..AssemblerConfig::default()
    };

    let batch = assembler_with(Arc::new(fetcher), config)
        .assemble(vec![item("http://long.example", "L", "")])
        .await;

    let doc = &batch.individual_results[0];
    assert!(doc.truncated);
    // Repair trims the trailing space: 149 characters remain.
    assert_eq!(doc.original_length, Some(149));
    assert_eq!(
        doc.content,
        "word word word word ... Remaining content truncated. Full length: 149 characters."
    );

    let serialized = serde_json::to_value(doc).unwrap();
    assert_eq!(serialized["truncated"], true);
    assert_eq!(serialized["original_length"], 149);
}

#[tokio::test]
async fn untruncated_documents_omit_truncation_fields() {
    let fetcher = ScriptedFetcher::new().on("http://a.example", Scripted::Text("short"));
    let batch = assembler(fetcher).assemble(vec![item("http://a.example", "", "")]).await;

    let serialized = serde_json::to_value(&batch).unwrap();
    let doc = &serialized["individual_results"][0];
    assert!(doc.get("truncated").is_none());
    assert!(doc.get("original_length").is_none());
    assert_eq!(doc["article_letter"], "A");
}

#[tokio::test]
async fn missing_metadata_defaults_to_empty() {
    let fetcher = ScriptedFetcher::new().on("http://a.example", Scripted::Text("body"));
    let batch = assembler(fetcher)
        .assemble_response(&json!({"organic": [{"link": "http://a.example"}]}))
        .await
        .unwrap();

    let doc = &batch.individual_results[0];
    assert_eq!(doc.title, "");
    assert_eq!(doc.description, "");
    assert_eq!(batch.full_text, "<doc>\nArticle Letter: A\n\n\nbody\n</doc>");
}

#[tokio::test]
async fn empty_batch() {
    let batch = assembler(ScriptedFetcher::new())
        .assemble_response(&json!({"organic": []}))
        .await
        .unwrap();
    assert!(batch.individual_results.is_empty());
    assert_eq!(batch.full_text, NO_ORGANIC_RESULTS);

    let batch = assembler(ScriptedFetcher::new())
        .assemble_response(&json!({"knowledge_graph": {}}))
        .await
        .unwrap();
    assert_eq!(batch.full_text, NO_ORGANIC_RESULTS);
}

#[tokio::test]
async fn malformed_batch_is_rejected() {
    let assembler = assembler(ScriptedFetcher::new());
    assert!(assembler.assemble_response(&json!("nope")).await.is_err());
    assert!(assembler.assemble_response(&json!({"organic": {"link": "x"}})).await.is_err());
    assert!(assembler.assemble_response(&json!({"organic": [42]})).await.is_err());
}

#[tokio::test]
async fn concurrency_is_bounded() {
    let mut fetcher = ScriptedFetcher::new();
    let mut items = Vec::new();
    for i in 0..12 {
        let url = format!("http://{i}.example");
        fetcher = fetcher.slow(&url, Scripted::Text("ok"), Duration::from_millis(30));
        items.push(item(&url, "", ""));
    }
    let fetcher = Arc::new(fetcher);
    let config = AssemblerConfig {
        max_concurrent: 3,
        ..AssemblerConfig::default()
    };

    let batch = assembler_with(fetcher.clone(), config).assemble(items).await;

    assert_eq!(batch.individual_results.len(), 12);
    assert!(batch.individual_results.iter().all(|d| d.content == "ok"));
    assert!(fetcher.peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(batch.individual_results[11].article_letter, "L");
}
