//! Carbon Canopy impact trainer
//!
//! Trains the impact score regression network on prepared project features,
//! persists it with its fitted preprocessing, and writes prediction reports.

pub mod artifact;
pub mod deterministic;
pub mod network;
pub mod optimizer;
pub mod pipeline;
pub mod report;
pub mod trainer;

pub use artifact::{ArtifactMetadata, ModelArtifact};
pub use deterministic::{sample_indices, train_test_split, DeterministicRng, Split};
pub use network::ImpactNetwork;
pub use pipeline::{run_scoring, run_training, train_model};
pub use report::{build_predictions, write_report, ImpactReport, ProjectPrediction};
pub use trainer::{EarlyStopping, ImpactTrainer, TrainingOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
