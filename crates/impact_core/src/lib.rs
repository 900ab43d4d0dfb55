//! Impact scoring core: data preparation for carbon-offset projects
//!
//! Turns a registry export into model-ready features and an impact score
//! target.
//!
//! Modules:
//! - `loader`: CSV export loading with header normalization
//! - `record`: raw project rows and column names
//! - `features`: status/country/credit filtering and feature derivation
//! - `sdg`: Sustainable Development Goal tag parsing
//! - `target`: `log1p` + min-max impact score scaling
//! - `preprocessing`: impute/scale/one-hot column transformer
//! - `config`: pipeline configuration
//! - `errors`: error types

pub mod config;
pub mod errors;
pub mod features;
pub mod loader;
pub mod preprocessing;
pub mod record;
pub mod sdg;
pub mod target;

pub use config::{PipelineConfig, TrainingConfig};
pub use errors::{ImpactError, Result};
pub use features::{filter_projects, prepare_features, FeatureLayout, FeatureRow, PreparedData, ScoredProject};
pub use loader::load_projects;
pub use preprocessing::{ColumnTransformer, FittedPreprocessor};
pub use record::{LoadedDataset, ProjectRecord};
pub use sdg::parse_sdgs;
pub use target::{TargetScaler, TargetSummary};
