//! Error types for the impact scoring pipeline

use thiserror::Error;

/// Errors that can occur while preparing data or training the impact model
#[derive(Error, Debug)]
pub enum ImpactError {
    /// Input could not be read or held no rows
    #[error("{0}")]
    Load(String),

    /// A column required by a stage is absent from the input
    #[error("'{0}' column not found")]
    MissingColumn(String),

    /// Filtering or feature derivation left nothing to work with
    #[error("Preprocessing failed: {0}")]
    Preprocessing(String),

    /// Training could not run or produced no model
    #[error("Model training failed: {0}")]
    Training(String),

    /// Row width does not match what a fitted component expects
    #[error("Dimension mismatch: expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Persisted model does not match its recorded hash
    #[error("Artifact integrity check failed: {0}")]
    ArtifactIntegrity(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for impact scoring operations
pub type Result<T> = std::result::Result<T, ImpactError>;
