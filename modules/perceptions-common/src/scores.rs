//! Response schemas for the structured-completion provider.
//!
//! Each type derives a JSON schema (doc comments become field descriptions)
//! and exposes `validate()`, which callers run right after deserializing a
//! provider response. A failed validation is treated like any other provider
//! failure and retried.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{PerceptionsError, Result};

/// Longest justification, in words, the rubric accepts.
pub const MAX_JUSTIFICATION_WORDS: usize = 8;

fn check_flag(field: &str, value: i64) -> Result<()> {
    if value == 0 || value == 1 {
        Ok(())
    } else {
        Err(PerceptionsError::Validation(format!(
            "{field} must be 0 or 1, got {value}"
        )))
    }
}

fn check_grade(field: &str, value: i64) -> Result<()> {
    if (1..=5).contains(&value) {
        Ok(())
    } else {
        Err(PerceptionsError::Validation(format!(
            "{field} must be between 1 and 5, got {value}"
        )))
    }
}

fn check_short(field: &str, text: &str) -> Result<()> {
    let words = text.split_whitespace().count();
    if words <= MAX_JUSTIFICATION_WORDS {
        Ok(())
    } else {
        Err(PerceptionsError::Validation(format!(
            "{field} has {words} words, at most {MAX_JUSTIFICATION_WORDS} allowed"
        )))
    }
}

// --- Project perceptions ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PerceptionScore {
    /// The binary score for the specified question, 1 if evidence is found somewhere in the content and 0 if not.
    pub score: i64,
    /// Specific article letters that have evidence supporting the score (example: A, B, D), or a brief justification for the score. Use no more than 8 words.
    pub sources: String,
}

impl PerceptionScore {
    pub fn validate(&self, field: &str) -> Result<()> {
        check_flag(&format!("{field}.score"), self.score)?;
        check_short(&format!("{field}.sources"), &self.sources)
    }
}

/// Opposition/support indicators for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectPerceptions {
    /// A single binary score indicating any mention of support (e.g., an individual or organization mentioned in support of the project), with 1 if mentioned and 0 if not, along with the supporting article letters.
    pub mention_support: Vec<PerceptionScore>,
    /// A single binary score indicating any mention of opposition (e.g., an individual or organization mentioned in opposition of the project), with 1 if mentioned and 0 if not, along with the supporting article letters.
    pub mention_opp: Vec<PerceptionScore>,
    /// 1 if evidence of physical opposition involving at least one person (e.g., protests, marches, picketing, mass presence at governmental meetings), 0 if not.
    pub physical_opp: i64,
    /// 1 if evidence of the use or attempted use of legislation (like ordinances or moratoria) or permitting to block projects, 0 if not.
    pub policy_opp: i64,
    /// 1 if evidence of legal challenges and the use of courts to block projects, 0 if not.
    pub legal_opp: i64,
    /// 1 if any opinion-editorials or other media explicitly opposing a project exist, 0 if not.
    pub opinion_opp: i64,
    /// 1 if evidence of environmental concerns, like water, soil, wildlife, and ecological impacts, 0 if not.
    pub environmental_opp: i64,
    /// 1 if evidence of opposition stemming from a perceived or real lack of participation or fairness in the project, 0 if not.
    pub participation_opp: i64,
    /// 1 if evidence of tribal opposition from an indigenous community or nation, 0 if not.
    pub tribal_opp: i64,
    /// 1 if evidence of opposition from real or perceived health and safety risks from the project, 0 if not.
    pub health_opp: i64,
    /// 1 if any evidence of disagreement between local, regional, and federal government about the project, 0 if not.
    pub intergov_opp: i64,
    /// 1 if evidence of opposition from real or perceived property value impacts, 0 if not.
    pub property_opp: i64,
    /// 1 if evidence of support or opposition from real or perceived lack of additional non-required compensation or benefits from the project (like a community benefits agreement), 0 if not.
    pub compensation: i64,
    /// 1 if evidence of a substantial delay (months or years) in project development because of opposition, 0 if not.
    pub delay: i64,
    /// 1 if evidence of the project co-existing with other land uses, such as agriculture, recreation, and grazing, 0 if not.
    pub co_land_use: i64,
    /// A 3-4 sentence narrative summary of the public perceptions of the specific project, including its name, location, developer, when it was proposed, the public response, and any evidence of opposition or support.
    pub narrative: String,
}

impl ProjectPerceptions {
    pub fn flags(&self) -> [(&'static str, i64); 13] {
        [
            ("physical_opp", self.physical_opp),
            ("policy_opp", self.policy_opp),
            ("legal_opp", self.legal_opp),
            ("opinion_opp", self.opinion_opp),
            ("environmental_opp", self.environmental_opp),
            ("participation_opp", self.participation_opp),
            ("tribal_opp", self.tribal_opp),
            ("health_opp", self.health_opp),
            ("intergov_opp", self.intergov_opp),
            ("property_opp", self.property_opp),
            ("compensation", self.compensation),
            ("delay", self.delay),
            ("co_land_use", self.co_land_use),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        for score in &self.mention_support {
            score.validate("mention_support")?;
        }
        for score in &self.mention_opp {
            score.validate("mention_opp")?;
        }
        for (field, value) in self.flags() {
            check_flag(field, value)?;
        }
        if self.narrative.trim().is_empty() {
            return Err(PerceptionsError::Validation("narrative is empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectSummary {
    pub all_scores_and_sources: Vec<ProjectPerceptions>,
}

impl ProjectSummary {
    pub fn validate(&self) -> Result<()> {
        if self.all_scores_and_sources.is_empty() {
            return Err(PerceptionsError::Validation(
                "all_scores_and_sources is empty".into(),
            ));
        }
        self.all_scores_and_sources
            .iter()
            .try_for_each(ProjectPerceptions::validate)
    }
}

// --- Relevance grading ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ArticleScore {
    /// The letter of the article (A, B, C, etc.)
    pub article_letter: String,
    /// The score of the article (1-5). If you are NOT CONFIDENT that the content is relevant to the specific project, do not score above 3.
    pub grade: i64,
    /// The justification for the grade. Use no more than 8 words.
    pub justification: String,
}

impl ArticleScore {
    pub fn validate(&self) -> Result<()> {
        if self.article_letter.trim().is_empty() {
            return Err(PerceptionsError::Validation("article_letter is empty".into()));
        }
        check_grade("grade", self.grade)?;
        check_short("justification", &self.justification)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ArticleRelevanceScores {
    pub scores_and_justifications: Vec<ArticleScore>,
}

impl ArticleRelevanceScores {
    pub fn validate(&self) -> Result<()> {
        self.scores_and_justifications
            .iter()
            .try_for_each(ArticleScore::validate)
    }

    /// Letters graded at or above `min_grade`, in the order they were graded.
    pub fn letters_at_least(&self, min_grade: i64) -> Vec<String> {
        self.scores_and_justifications
            .iter()
            .filter(|s| s.grade >= min_grade)
            .map(|s| s.article_letter.trim().to_uppercase())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RelevanceScore {
    /// The score, between 1-5, for whether ALL of the content is relevant to the project. If you are not sure, score 1. Only one score is generated per project.
    pub score: i64,
    /// Less than 8 word justification for the score with specific evidence.
    pub justification: String,
}

impl RelevanceScore {
    pub fn validate(&self) -> Result<()> {
        check_grade("score", self.score)?;
        check_short("justification", &self.justification)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContentRelevance {
    pub score_and_justification: Vec<RelevanceScore>,
}

impl ContentRelevance {
    pub fn validate(&self) -> Result<()> {
        self.score_and_justification
            .iter()
            .try_for_each(RelevanceScore::validate)
    }
}

/// Stored output of the relevant-content filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevantContent {
    pub relevant_letters: Vec<String>,
    pub relevant_content_text: String,
}
