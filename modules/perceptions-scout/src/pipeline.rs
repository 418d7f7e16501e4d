// Stage runners. Each stage reads the previous stage's results from the store,
// skips plants it has already completed, and writes one file per plant.

use std::fmt;
use std::future::Future;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use perceptions_archive::{ContentAssembler, SearchProvider};
use perceptions_common::{
    join_doc_blocks, ArticleRelevanceScores, ContentRelevance, RelevantContent, ResultBatch,
    SearchResponse,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::plants::Plant;
use crate::scorer::Scorer;
use crate::store::{ResultsStore, Stage};

/// Article grade at or above which a document counts as relevant.
pub const RELEVANT_GRADE: i64 = 4;
pub const NO_RELEVANT_CONTENT: &str = "No relevant content found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} completed, {} already done, {} failed",
            self.stage, self.completed, self.skipped, self.failed
        )
    }
}

/// Worker counts per stage.
#[derive(Debug, Clone, Copy)]
pub struct Workers {
    pub search: usize,
    pub content: usize,
    pub relevance: usize,
    pub score: usize,
}

impl Default for Workers {
    fn default() -> Self {
        Self {
            search: 100,
            content: 10,
            relevance: 5,
            score: 2,
        }
    }
}

/// Run `job` for every plant without a `stage` result, `workers` at a time,
/// saving each result as soon as it is ready. A failing plant is logged and
/// counted; the others carry on.
async fn run_stage<'a, T, F, Fut>(
    store: &'a ResultsStore,
    stage: Stage,
    plants: &'a [Plant],
    workers: usize,
    job: F,
) -> StageReport
where
    T: Serialize,
    F: Fn(&'a Plant) -> Fut,
    Fut: Future<Output = Result<T>> + 'a,
{
    let (done, pending): (Vec<&Plant>, Vec<&Plant>) = plants
        .iter()
        .partition(|p| store.exists(stage, &p.plant_code));

    info!(
        stage = %stage,
        pending = pending.len(),
        skipped = done.len(),
        workers,
        "pipeline: stage starting"
    );

    let outcomes: Vec<bool> = stream::iter(pending.into_iter().map(|plant| {
        let fut = job(plant);
        async move {
            let result = match fut.await {
                Ok(value) => store.save(stage, &plant.plant_code, &value).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        stage = %stage,
                        plant_code = plant.plant_code.as_str(),
                        error = %format!("{e:#}"),
                        "pipeline: plant failed"
                    );
                    false
                }
            }
        }
    }))
    .buffer_unordered(workers.max(1))
    .collect()
    .await;

    let report = StageReport {
        stage,
        completed: outcomes.iter().filter(|ok| **ok).count(),
        skipped: done.len(),
        failed: outcomes.iter().filter(|ok| !**ok).count(),
    };
    info!("pipeline: {report}");
    report
}

pub async fn run_search(
    store: &ResultsStore,
    plants: &[Plant],
    provider: &dyn SearchProvider,
    workers: usize,
) -> StageReport {
    run_stage(store, Stage::Search, plants, workers, |plant| async move {
        let response: Value = provider.search(&plant.search_query).await?;
        anyhow::Ok(response)
    })
    .await
}

pub async fn run_content(
    store: &ResultsStore,
    plants: &[Plant],
    assembler: &ContentAssembler,
    workers: usize,
) -> StageReport {
    run_stage(store, Stage::Content, plants, workers, |plant| async move {
        let response: Value = store.load(Stage::Search, &plant.plant_code).await?;
        let batch = assembler.assemble_response(&response).await?;
        anyhow::Ok(batch)
    })
    .await
}

pub async fn run_article_relevance(
    store: &ResultsStore,
    plants: &[Plant],
    scorer: &dyn Scorer,
    workers: usize,
) -> StageReport {
    run_stage(store, Stage::ArticleRelevance, plants, workers, |plant| async move {
        let search = load_search(store, plant).await?;
        if search.organic.is_empty() {
            return Ok(ArticleRelevanceScores {
                scores_and_justifications: Vec::new(),
            });
        }
        scorer.score_articles(plant, &search.organic).await
    })
    .await
}

pub async fn run_content_relevance(
    store: &ResultsStore,
    plants: &[Plant],
    scorer: &dyn Scorer,
    workers: usize,
) -> StageReport {
    run_stage(store, Stage::ContentRelevance, plants, workers, |plant| async move {
        let search = load_search(store, plant).await?;
        if search.organic.is_empty() {
            return Ok(ContentRelevance {
                score_and_justification: Vec::new(),
            });
        }
        scorer.score_content(plant, &search.organic).await
    })
    .await
}

/// Keep the documents whose article grade is at least `RELEVANT_GRADE`.
/// Local only: no concurrency needed.
pub async fn run_relevant_content(store: &ResultsStore, plants: &[Plant]) -> StageReport {
    run_stage(store, Stage::RelevantContent, plants, 1, |plant| async move {
        let batch: ResultBatch = store.load(Stage::Content, &plant.plant_code).await?;
        let scores: ArticleRelevanceScores =
            store.load(Stage::ArticleRelevance, &plant.plant_code).await?;
        anyhow::Ok(select_relevant(&batch, &scores))
    })
    .await
}

pub async fn run_scores(
    store: &ResultsStore,
    plants: &[Plant],
    scorer: &dyn Scorer,
    workers: usize,
) -> StageReport {
    run_stage(store, Stage::Scores, plants, workers, |plant| async move {
        let relevant: RelevantContent =
            store.load(Stage::RelevantContent, &plant.plant_code).await?;
        scorer.score_project(plant, &relevant.relevant_content_text).await
    })
    .await
}

async fn load_search(store: &ResultsStore, plant: &Plant) -> Result<SearchResponse> {
    let raw: Value = store.load(Stage::Search, &plant.plant_code).await?;
    Ok(SearchResponse::from_value(&raw)?)
}

/// Documents graded relevant, in batch order, as `<doc>` blocks.
pub fn select_relevant(batch: &ResultBatch, scores: &ArticleRelevanceScores) -> RelevantContent {
    let wanted = scores.letters_at_least(RELEVANT_GRADE);
    let docs: Vec<_> = batch
        .individual_results
        .iter()
        .filter(|d| wanted.contains(&d.article_letter))
        .collect();

    if docs.is_empty() {
        return RelevantContent {
            relevant_letters: Vec::new(),
            relevant_content_text: NO_RELEVANT_CONTENT.to_string(),
        };
    }

    RelevantContent {
        relevant_letters: docs.iter().map(|d| d.article_letter.clone()).collect(),
        relevant_content_text: join_doc_blocks(docs.iter().copied()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perceptions_common::{ArticleScore, ExtractedDocument};

    fn doc(letter: &str) -> ExtractedDocument {
        ExtractedDocument {
            link: format!("http://{letter}.example"),
            title: format!("Title {letter}"),
            description: String::new(),
            content: format!("Body {letter}"),
            article_letter: letter.to_string(),
            truncated: false,
            original_length: None,
        }
    }

    fn grade(letter: &str, grade: i64) -> ArticleScore {
        ArticleScore {
            article_letter: letter.to_string(),
            grade,
            justification: "test".into(),
        }
    }

    #[test]
    fn relevant_documents_keep_batch_order() {
        let batch = ResultBatch::from_documents(vec![doc("A"), doc("B"), doc("C")]);
        let scores = ArticleRelevanceScores {
            scores_and_justifications: vec![grade("C", 5), grade("a", 4), grade("B", 3)],
        };

        let relevant = select_relevant(&batch, &scores);
        assert_eq!(relevant.relevant_letters, vec!["A", "C"]);
        assert_eq!(
            relevant.relevant_content_text,
            "<doc>\nArticle Letter: A\nTitle A\n\nBody A\n</doc>\n<doc>\nArticle Letter: C\nTitle C\n\nBody C\n</doc>"
        );
    }

    #[test]
    fn nothing_relevant() {
        let batch = ResultBatch::from_documents(vec![doc("A")]);
        let scores = ArticleRelevanceScores {
            scores_and_justifications: vec![grade("A", 2), grade("Z", 5)],
        };
        let relevant = select_relevant(&batch, &scores);
        assert!(relevant.relevant_letters.is_empty());
        assert_eq!(relevant.relevant_content_text, NO_RELEVANT_CONTENT);
    }

    #[test]
    fn report_display() {
        let report = StageReport {
            stage: Stage::Content,
            completed: 3,
            skipped: 1,
            failed: 0,
        };
        assert_eq!(report.to_string(), "content: 3 completed, 1 already done, 0 failed");
    }
}
