//! Pipeline configuration
//!
//! Defaults reproduce the registry export run: certified projects in India
//! with at least one estimated annual credit. A TOML file may override any
//! subset of fields.

use crate::errors::{ImpactError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_INPUT_PATH: &str = "../GSF Registry Projects Export 2025-05-12.csv";
pub const DEFAULT_OUTPUT_PATH: &str = "impact_scores.json";
pub const DEFAULT_MODEL_PATH: &str = "impact_model.json";
pub const DEFAULT_TARGET_COUNTRY: &str = "India";
pub const DEFAULT_STATUS: &str = "Gold Standard Certified Project";

/// Training hyperparameters for the fixed-topology network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Maximum number of passes over the training partition
    pub epochs: usize,
    pub batch_size: usize,
    /// Epochs without validation improvement before stopping
    pub patience: usize,
    pub learning_rate: f64,
    pub dropout_rate: f64,
    /// Fraction of rows held out for validation
    pub test_fraction: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 32,
            patience: 10,
            learning_rate: 0.001,
            dropout_rate: 0.3,
            test_fraction: 0.2,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Registry export to read
    pub input_path: PathBuf,
    /// Prediction report destination
    pub output_path: PathBuf,
    /// Persisted model artifact destination
    pub model_path: PathBuf,
    pub target_country: String,
    /// Status values a project must carry to be scored
    pub relevant_statuses: Vec<String>,
    pub min_estimated_credits: f64,
    /// Number of projects written to the report
    pub sample_size: usize,
    pub random_seed: i64,
    pub training: TrainingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            target_country: DEFAULT_TARGET_COUNTRY.to_string(),
            relevant_statuses: vec![DEFAULT_STATUS.to_string()],
            min_estimated_credits: 1.0,
            sample_size: 10,
            random_seed: 42,
            training: TrainingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file; absent fields keep their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&data)
            .map_err(|e| ImpactError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        info!("Loaded pipeline configuration from {}", path.display());
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.relevant_statuses.is_empty() {
            return Err(ImpactError::Config(
                "relevant_statuses must not be empty".to_string(),
            ));
        }
        if !self.min_estimated_credits.is_finite() || self.min_estimated_credits < 0.0 {
            return Err(ImpactError::Config(
                "min_estimated_credits must be a non-negative number".to_string(),
            ));
        }
        let t = &self.training;
        if t.epochs == 0 {
            return Err(ImpactError::Config("epochs must be positive".to_string()));
        }
        if t.batch_size == 0 {
            return Err(ImpactError::Config("batch_size must be positive".to_string()));
        }
        if !(0.0..1.0).contains(&t.dropout_rate) {
            return Err(ImpactError::Config(
                "dropout_rate must be in [0, 1)".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&t.test_fraction) {
            return Err(ImpactError::Config(
                "test_fraction must be in [0, 1)".to_string(),
            ));
        }
        if t.learning_rate.is_nan() || t.learning_rate <= 0.0 {
            return Err(ImpactError::Config(
                "learning_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
