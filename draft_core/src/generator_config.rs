use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use thiserror::Error;

use crate::sampler::WeightedOption;

pub const BUILTIN_GENERATOR_CONFIG: &str = include_str!("data/generator_config.json");

/// Tunables shared by every generator variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    max_attempts: u32,
    balance: BalanceConfig,
    weak_slice_repair: WeakSliceRepairConfig,
    promotion: PromotionConfig,
    scoring: ScoringConfig,
    ring_template_slots: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 100_000,
            balance: BalanceConfig::default(),
            weak_slice_repair: WeakSliceRepairConfig::default(),
            promotion: PromotionConfig::default(),
            scoring: ScoringConfig::default(),
            ring_template_slots: 8,
        }
    }
}

impl GeneratorConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_GENERATOR_CONFIG)
                .expect("builtin generator config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, GeneratorConfigError> {
        let contents =
            fs::read_to_string(path).map_err(|source| GeneratorConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let config = GeneratorConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn balance(&self) -> &BalanceConfig {
        &self.balance
    }

    pub fn weak_slice_repair(&self) -> &WeakSliceRepairConfig {
        &self.weak_slice_repair
    }

    pub fn promotion(&self) -> &PromotionConfig {
        &self.promotion
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn ring_template_slots(&self) -> usize {
        self.ring_template_slots
    }
}

#[derive(Debug, Error)]
pub enum GeneratorConfigError {
    #[error("failed to parse generator config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read generator config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Bounds every slice must meet for an attempt to be accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    min_optimal_resources: f32,
    min_optimal_influence: f32,
    min_optimal_total: f32,
    max_optimal_total: f32,
}

impl BalanceConfig {
    pub fn min_optimal_resources(&self) -> f32 {
        self.min_optimal_resources
    }

    pub fn min_optimal_influence(&self) -> f32 {
        self.min_optimal_influence
    }

    pub fn min_optimal_total(&self) -> f32 {
        self.min_optimal_total
    }

    pub fn max_optimal_total(&self) -> f32 {
        self.max_optimal_total
    }
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            min_optimal_resources: 2.5,
            min_optimal_influence: 4.0,
            min_optimal_total: 9.0,
            max_optimal_total: 13.0,
        }
    }
}

/// Floors below which the weak-slice pass tries a swap.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeakSliceRepairConfig {
    min_optimal_resources: f32,
    min_optimal_influence: f32,
}

impl WeakSliceRepairConfig {
    pub fn min_optimal_resources(&self) -> f32 {
        self.min_optimal_resources
    }

    pub fn min_optimal_influence(&self) -> f32 {
        self.min_optimal_influence
    }
}

impl Default for WeakSliceRepairConfig {
    fn default() -> Self {
        Self {
            min_optimal_resources: 2.0,
            min_optimal_influence: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WeightedCount {
    pub count: usize,
    pub weight: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromotionConfig {
    wormhole_targets: Vec<WeightedCount>,
    legendary_targets: Vec<WeightedCount>,
}

impl PromotionConfig {
    /// Distribution of the minimum number of each wormhole type.
    pub fn wormhole_targets(&self) -> Vec<WeightedOption<usize>> {
        to_options(&self.wormhole_targets)
    }

    pub fn legendary_targets(&self) -> Vec<WeightedOption<usize>> {
        to_options(&self.legendary_targets)
    }
}

fn to_options(counts: &[WeightedCount]) -> Vec<WeightedOption<usize>> {
    counts
        .iter()
        .map(|entry| WeightedOption::new(entry.weight, entry.count))
        .collect()
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            wormhole_targets: vec![
                WeightedCount {
                    count: 2,
                    weight: 3.0,
                },
                WeightedCount {
                    count: 3,
                    weight: 1.0,
                },
            ],
            legendary_targets: vec![
                WeightedCount {
                    count: 1,
                    weight: 3.0,
                },
                WeightedCount {
                    count: 2,
                    weight: 1.0,
                },
            ],
        }
    }
}

/// Weights used when resolving a tier slot to a concrete tile.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    base_weight: f64,
    balance_bonus: f64,
    diversity_bonus: f64,
    duplicate_feature_weight: f64,
}

impl ScoringConfig {
    pub fn base_weight(&self) -> f64 {
        self.base_weight
    }

    pub fn balance_bonus(&self) -> f64 {
        self.balance_bonus
    }

    pub fn diversity_bonus(&self) -> f64 {
        self.diversity_bonus
    }

    /// Near-zero weight kept for candidates that would duplicate a wormhole
    /// or legendary already in the group.
    pub fn duplicate_feature_weight(&self) -> f64 {
        self.duplicate_feature_weight
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_weight: 1.0,
            balance_bonus: 2.0,
            diversity_bonus: 0.5,
            duplicate_feature_weight: 0.001,
        }
    }
}

pub fn load_generator_config_from_env() -> Arc<GeneratorConfig> {
    if let Some(path) = env::var("GENERATOR_CONFIG_PATH").ok().map(PathBuf::from) {
        match GeneratorConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "slice_draft::config",
                    path = %path.display(),
                    "generator_config.loaded=file"
                );
                return Arc::new(config);
            }
            Err(err) => {
                tracing::warn!(
                    target: "slice_draft::config",
                    path = %path.display(),
                    error = %err,
                    "generator_config.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "slice_draft::config", "generator_config.loaded=builtin");
    GeneratorConfig::builtin()
}
