// On-disk results: {root}/{stage}/{plant_code}.json. A file's existence is the
// completion marker for that plant and stage.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Search,
    Content,
    ArticleRelevance,
    ContentRelevance,
    RelevantContent,
    Scores,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Search,
        Stage::Content,
        Stage::ArticleRelevance,
        Stage::ContentRelevance,
        Stage::RelevantContent,
        Stage::Scores,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            Stage::Search => "search",
            Stage::Content => "content",
            Stage::ArticleRelevance => "article_relevance",
            Stage::ContentRelevance => "content_relevance",
            Stage::RelevantContent => "relevant_content",
            Stage::Scores => "scores",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Debug, Clone)]
pub struct ResultsStore {
    root: PathBuf,
}

impl ResultsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, stage: Stage, plant_code: &str) -> Result<PathBuf> {
        if plant_code.is_empty()
            || plant_code == "."
            || plant_code == ".."
            || plant_code.contains(['/', '\\'])
        {
            bail!("Invalid plant code for a file name: {plant_code:?}");
        }
        Ok(self
            .root
            .join(stage.dir_name())
            .join(format!("{plant_code}.json")))
    }

    pub fn exists(&self, stage: Stage, plant_code: &str) -> bool {
        self.path(stage, plant_code).map(|p| p.is_file()).unwrap_or(false)
    }

    pub async fn load<T: DeserializeOwned>(&self, stage: Stage, plant_code: &str) -> Result<T> {
        let path = self.path(stage, plant_code)?;
        let raw = tokio::fs::read(&path).await.with_context(|| {
            format!("No {stage} result for plant {plant_code} at {}", path.display())
        })?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("Corrupt {stage} result at {}", path.display()))
    }

    /// Write through a temp file and rename, so readers never see a partial file.
    pub async fn save<T: Serialize>(
        &self,
        stage: Stage,
        plant_code: &str,
        value: &T,
    ) -> Result<()> {
        let path = self.path(stage, plant_code)?;
        let dir = self.root.join(stage.dir_name());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let tmp = dir.join(format!(".{plant_code}.json.tmp"));
        let json = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to move result into {}", path.display()))?;

        debug!(stage = %stage, plant_code, "store: saved");
        Ok(())
    }
}
