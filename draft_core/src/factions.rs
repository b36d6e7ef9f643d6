use std::{
    collections::BTreeSet,
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUILTIN_FACTION_REGISTRY: &str = include_str!("data/factions.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    pub name: String,
    pub short_name: String,
    pub home_tile: i32,
}

#[derive(Debug, Clone, Deserialize)]
struct FactionRegistryFile {
    factions: Vec<Faction>,
}

#[derive(Debug, Error)]
pub enum FactionRegistryError {
    #[error("failed to parse faction registry: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read faction registry from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("faction name '{0}' is used more than once")]
    DuplicateName(String),
}

/// Playable factions, looked up by full or short name.
#[derive(Debug, Clone)]
pub struct FactionRegistry {
    factions: Vec<Faction>,
}

impl FactionRegistry {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            FactionRegistry::from_json_str(BUILTIN_FACTION_REGISTRY)
                .expect("builtin faction registry should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, FactionRegistryError> {
        let parsed: FactionRegistryFile = serde_json::from_str(json)?;
        let mut seen = BTreeSet::new();
        for faction in &parsed.factions {
            let names = BTreeSet::from([faction.name.as_str(), faction.short_name.as_str()]);
            for name in names {
                if !seen.insert(name) {
                    return Err(FactionRegistryError::DuplicateName(name.to_string()));
                }
            }
        }
        Ok(Self {
            factions: parsed.factions,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, FactionRegistryError> {
        let contents = fs::read_to_string(path).map_err(|source| FactionRegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        FactionRegistry::from_json_str(&contents)
    }

    /// Exact, case-sensitive match on the full or short name.
    pub fn resolve(&self, name: &str) -> Option<&Faction> {
        self.factions
            .iter()
            .find(|faction| faction.name == name || faction.short_name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factions.iter().map(|faction| faction.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Faction> {
        self.factions.iter()
    }

    pub fn len(&self) -> usize {
        self.factions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }

    /// Up to `count` distinct factions in random order.
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Faction> {
        self.factions
            .choose_multiple(rng, count)
            .cloned()
            .collect()
    }
}

pub fn load_faction_registry_from_env() -> Arc<FactionRegistry> {
    if let Some(path) = env::var("FACTION_REGISTRY_PATH").ok().map(PathBuf::from) {
        match FactionRegistry::from_file(&path) {
            Ok(registry) => {
                tracing::info!(
                    target: "slice_draft::config",
                    path = %path.display(),
                    factions = registry.len(),
                    "faction_registry.loaded=file"
                );
                return Arc::new(registry);
            }
            Err(err) => {
                tracing::warn!(
                    target: "slice_draft::config",
                    path = %path.display(),
                    error = %err,
                    "faction_registry.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "slice_draft::config", "faction_registry.loaded=builtin");
    FactionRegistry::builtin()
}
