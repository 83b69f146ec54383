//! Racial abilities catalog
//!
//! A JSON object keyed by lowercase race name. Each entry is either a list of
//! ability descriptions or an object whose values are the descriptions, in
//! file order.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Shown when the character has no race
pub const NO_RACE: &str = "No race specified.";

/// Shown when the race is not in the catalog
pub const NO_ABILITIES: &str = "No racial abilities found.";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid catalog entry for race {0}")]
    InvalidEntry(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaceCatalog {
    races: HashMap<String, Vec<String>>,
}

fn entry_abilities(race: &str, value: Value) -> Result<Vec<String>, CatalogError> {
    let values: Vec<Value> = match value {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        _ => return Err(CatalogError::InvalidEntry(race.to_string())),
    };

    values
        .into_iter()
        .map(|v| match v {
            Value::String(s) => Ok(s),
            _ => Err(CatalogError::InvalidEntry(race.to_string())),
        })
        .collect()
}

impl RaceCatalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let root: serde_json::Map<String, Value> = serde_json::from_str(json)?;

        let races = root
            .into_iter()
            .map(|(race, value)| {
                let abilities = entry_abilities(&race, value)?;
                Ok((race.to_lowercase(), abilities))
            })
            .collect::<Result<HashMap<_, _>, CatalogError>>()?;

        Ok(Self { races })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let catalog = Self::from_json(&std::fs::read_to_string(path)?)?;
        debug!("Loaded {} races from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.races.len()
    }

    pub fn is_empty(&self) -> bool {
        self.races.is_empty()
    }

    /// Abilities of a race, or a single explanatory line
    pub fn abilities(&self, race: Option<&str>) -> Vec<String> {
        let race = match race.map(str::trim) {
            Some(race) if !race.is_empty() => race,
            _ => return vec![NO_RACE.to_string()],
        };

        match self.races.get(&race.to_lowercase()) {
            Some(abilities) => abilities.clone(),
            None => vec![NO_ABILITIES.to_string()],
        }
    }
}
