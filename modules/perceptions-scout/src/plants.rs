use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

/// One renewable-energy plant to research.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    /// Identifier used as the results file name. Numeric codes are accepted.
    #[serde(deserialize_with = "code_as_string")]
    pub plant_code: String,
    pub search_query: String,
    /// Name and location, quoted into every prompt.
    pub plant_info: String,
}

fn code_as_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Int(i64),
        Text(String),
    }

    Ok(match Code::deserialize(deserializer)? {
        Code::Int(n) => n.to_string(),
        Code::Text(s) => s.trim().to_string(),
    })
}

/// Read the plants file. Later duplicates of a plant code are dropped, since
/// they would share one results file.
pub fn load_plants(path: &Path) -> Result<Vec<Plant>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plants file {}", path.display()))?;
    let plants: Vec<Plant> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse plants file {}", path.display()))?;

    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(plants.len());
    for plant in plants {
        if plant.plant_code.is_empty() {
            bail!("Plant with search query {:?} has an empty plant_code", plant.search_query);
        }
        if seen.insert(plant.plant_code.clone()) {
            unique.push(plant);
        } else {
            warn!(plant_code = plant.plant_code.as_str(), "plants: duplicate code dropped");
        }
    }

    info!(plants = unique.len(), path = %path.display(), "plants: loaded");
    Ok(unique)
}
