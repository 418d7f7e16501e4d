use std::time::Duration;

use ai_client::Claude;
use anyhow::{Context, Result};
use async_trait::async_trait;
use perceptions_common::{
    article_letter, retry_with_backoff, ArticleRelevanceScores, Backoff, Config, ContentRelevance,
    ProjectSummary, SearchResultItem,
};
use tracing::info;

use crate::plants::Plant;

const PROJECT_BUDGET: Duration = Duration::from_secs(120);
const RELEVANCE_BUDGET: Duration = Duration::from_secs(30);

const RESEARCH_QUESTION: &str = "What is the narrative surrounding the development of this \
renewable energy project in this location, and what evidence of opposition or support for the \
project can be identified?";

/// Structured-completion calls the pipeline depends on.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Grade each search result 1-5 by its title, display link and description.
    async fn score_articles(
        &self,
        plant: &Plant,
        results: &[SearchResultItem],
    ) -> Result<ArticleRelevanceScores>;

    /// Grade the result set as a whole 1-5.
    async fn score_content(
        &self,
        plant: &Plant,
        results: &[SearchResultItem],
    ) -> Result<ContentRelevance>;

    /// Answer the opposition/support questions from the relevant content.
    async fn score_project(&self, plant: &Plant, content: &str) -> Result<ProjectSummary>;
}

/// Search results as `<article>` blocks, one per line.
pub fn format_articles(results: &[SearchResultItem]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "<article>Article Letter: {}, Title: {}, Display URL: {}, Description: {}</article>",
                article_letter(i),
                r.title.as_deref().unwrap_or("No article title"),
                r.display_link.as_deref().unwrap_or("No article display link."),
                r.description.as_deref().unwrap_or("No article description."),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn expert_system(plant: &Plant, articles: &str) -> String {
    format!(
        "You are an expert on public perceptions on large renewable energy projects. Your aim is \
         to take a set of search results from Google corresponding to the following search query: \
         {} and determine whether or not the search results are relevant to our research question. \
         Here are the search results: {articles}",
        plant.search_query
    )
}

fn article_prompt(plant: &Plant) -> String {
    let info = &plant.plant_info;
    format!(
        "Based on the title, display link, and description of each URL, we would like to identify \
         which search results are most relevant to this research question: '{RESEARCH_QUESTION}' \
         Score each search result by its article letter with a number between 1-5, with 1 meaning \
         the article is least relevant and 5 the most relevant. Guide:\
         \n1 - does not mention renewable energy or the project in question ({info}), but may cover a different project or ordinance\
         \n2 - may relate to renewable energy near the location but does not mention the specific project ({info})\
         \n3 - mentions the specific project and location ({info}) but only basic facts, no opposition or support\
         \n4 - you are EXTREMELY CONFIDENT it mentions the exact project and location ({info})\
         \n5 - you are EXTREMELY CONFIDENT it describes the narrative of the project development ({info}), including opposition and support"
    )
}

fn content_prompt(plant: &Plant) -> String {
    let info = &plant.plant_info;
    format!(
        "Based on the description of each URL and other metadata, we would like to know how \
         relevant these search results are to this research question: '{RESEARCH_QUESTION}' Score \
         all of the search results as a whole with one number between 1-5. Guide:\
         \n1 - NONE of the articles mention {info} or renewable energy near the location\
         \n2 - SOME articles relate to renewable energy near the location but not {info}\
         \n3 - AT LEAST ONE article mentions {info}\
         \n4 - MOST of the articles mention {info}\
         \n5 - MOST of the articles mention {info}, AND there are mentions of opposition or support"
    )
}

fn project_system(plant: &Plant, content: &str) -> String {
    format!(
        "You are an expert on public perceptions on large renewable energy projects. Here is the \
         name and location of the project in question ({}) from which the following search result \
         content is generated: {content}",
        plant.plant_info
    )
}

fn project_prompt(plant: &Plant) -> String {
    let info = &plant.plant_info;
    format!(
        "Our aim is to understand the public opinion and perceptions of a particular renewable \
         energy project ({info}) based solely on online media evidence from a search engine query \
         on the project. Using only the text content provided, answer each binary question with 1 \
         if evidence is found and 0 if not, then write a one-paragraph summary of public \
         perceptions of the project. None of the content may be relevant; if so, every integer \
         must be 0 and the narrative must be \"No relevant info found.\" ONLY SCORE 1 if you are \
         EXTREMELY CONFIDENT the evidence concerns this specific project and location ({info})."
    )
}

/// `Scorer` backed by Claude forced tool calls. Every response is validated
/// and a failure (transport, decoding or validation) is retried with backoff.
pub struct ClaudeScorer {
    relevance: Claude,
    scoring: Claude,
    relevance_backoff: Backoff,
    project_backoff: Backoff,
}

impl ClaudeScorer {
    pub fn new(relevance: Claude, scoring: Claude) -> Self {
        Self {
            relevance,
            scoring,
            relevance_backoff: Backoff::with_budget(RELEVANCE_BUDGET),
            project_backoff: Backoff::with_budget(PROJECT_BUDGET),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let key = config.require_anthropic_key()?;
        Ok(Self::new(
            Claude::new(key, &config.relevance_model),
            Claude::new(key, &config.scoring_model),
        ))
    }

    pub fn with_backoff(mut self, relevance: Backoff, project: Backoff) -> Self {
        self.relevance_backoff = relevance;
        self.project_backoff = project;
        self
    }
}

#[async_trait]
impl Scorer for ClaudeScorer {
    async fn score_articles(
        &self,
        plant: &Plant,
        results: &[SearchResultItem],
    ) -> Result<ArticleRelevanceScores> {
        let ai = self.relevance.clone().with_temperature(0.0);
        let system = expert_system(plant, &format_articles(results));
        let prompt = article_prompt(plant);

        let scores = retry_with_backoff("article relevance", self.relevance_backoff, || async {
            let scores: ArticleRelevanceScores =
                ai.extract(system.as_str(), prompt.as_str()).await?;
            scores.validate()?;
            anyhow::Ok(scores)
        })
        .await
        .with_context(|| format!("Article relevance failed for plant {}", plant.plant_code))?;

        info!(
            plant_code = plant.plant_code.as_str(),
            graded = scores.scores_and_justifications.len(),
            "scorer: articles graded"
        );
        Ok(scores)
    }

    async fn score_content(
        &self,
        plant: &Plant,
        results: &[SearchResultItem],
    ) -> Result<ContentRelevance> {
        let ai = self.relevance.clone().with_temperature(0.1);
        let system = expert_system(plant, &format_articles(results));
        let prompt = content_prompt(plant);

        retry_with_backoff("content relevance", self.relevance_backoff, || async {
            let relevance: ContentRelevance = ai.extract(system.as_str(), prompt.as_str()).await?;
            relevance.validate()?;
            anyhow::Ok(relevance)
        })
        .await
        .with_context(|| format!("Content relevance failed for plant {}", plant.plant_code))
    }

    async fn score_project(&self, plant: &Plant, content: &str) -> Result<ProjectSummary> {
        let ai = self.scoring.clone().with_temperature(0.1);
        let system = project_system(plant, content);
        let prompt = project_prompt(plant);

        let summary = retry_with_backoff("project scoring", self.project_backoff, || async {
            let summary: ProjectSummary = ai.extract(system.as_str(), prompt.as_str()).await?;
            summary.validate()?;
            anyhow::Ok(summary)
        })
        .await
        .with_context(|| format!("Project scoring failed for plant {}", plant.plant_code))?;

        info!(plant_code = plant.plant_code.as_str(), model = ai.model(), "scorer: project scored");
        Ok(summary)
    }
}
