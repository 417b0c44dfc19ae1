use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants;
use crate::error::{EtlError, Result};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV_VAR: &str = "NUTRITION_ETL_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub storage: StorageConfig,
    pub memory: MemoryConfig,
    pub translation: TranslationConfig,
    pub classification: ClassificationConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub path: PathBuf,
    /// Single-byte field delimiter
    pub delimiter: char,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/fastfood.csv"),
            delimiter: ',',
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/fastfood_nutrition.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Share of available memory a single chunk may use
    pub fraction: f64,
    /// Skip memory probing and use this many bytes instead
    pub available_bytes: Option<u64>,
    /// Used when the system cannot report available memory
    pub fallback_available_bytes: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            fraction: constants::DEFAULT_MEMORY_FRACTION,
            available_bytes: None,
            fallback_available_bytes: 512 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub dictionary_path: PathBuf,
    pub target_language: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            dictionary_path: PathBuf::from("data/curated_translations.csv"),
            target_language: constants::DEFAULT_TARGET_LANGUAGE.to_string(),
            endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
            timeout_secs: 10,
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl TranslationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelStrategy {
    /// Order clusters by the mean of the rank feature and label them in that order
    CalorieRank,
    /// Cluster id i takes label i
    Positional,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub clusters: usize,
    pub seed: u64,
    pub max_iterations: usize,
    pub features: Vec<String>,
    pub labels: Vec<String>,
    pub label_strategy: LabelStrategy,
    pub rank_feature: String,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            clusters: constants::DEFAULT_CLUSTERS,
            seed: constants::DEFAULT_SEED,
            max_iterations: constants::DEFAULT_MAX_ITERATIONS,
            features: constants::DEFAULT_FEATURES.iter().map(|s| s.to_string()).collect(),
            labels: constants::DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
            label_strategy: LabelStrategy::CalorieRank,
            rank_feature: constants::CALORIES.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/food_categories.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Load from `NUTRITION_ETL_CONFIG`, or `config.toml`, or built-in defaults when neither exists.
    pub fn load() -> Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::load_from(path.trim()),
            _ if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load_from(DEFAULT_CONFIG_PATH),
            _ => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.memory.fraction > 0.0 && self.memory.fraction <= 1.0) {
            return Err(EtlError::Config(format!(
                "memory.fraction must be in (0, 1], got {}",
                self.memory.fraction
            )));
        }
        if !self.source.delimiter.is_ascii() {
            return Err(EtlError::Config(format!(
                "source.delimiter must be a single ASCII character, got '{}'",
                self.source.delimiter
            )));
        }
        let classification = &self.classification;
        if classification.clusters == 0 {
            return Err(EtlError::Config("classification.clusters must be at least 1".into()));
        }
        if classification.features.is_empty() {
            return Err(EtlError::Config("classification.features must not be empty".into()));
        }
        if classification.labels.len() < classification.clusters {
            return Err(EtlError::Config(format!(
                "classification.labels has {} entries but {} clusters are configured",
                classification.labels.len(),
                classification.clusters
            )));
        }
        if classification.label_strategy == LabelStrategy::CalorieRank
            && !classification.features.contains(&classification.rank_feature)
        {
            return Err(EtlError::Config(format!(
                "classification.rank_feature '{}' must be one of the clustering features",
                classification.rank_feature
            )));
        }
        if self.translation.target_language.trim().is_empty() {
            return Err(EtlError::Config("translation.target_language must not be empty".into()));
        }
        Ok(())
    }
}
