//! Persisted model artifact
//!
//! Bundles the trained network with the preprocessing it was trained behind,
//! so a later run can score new rows without refitting anything. Written as
//! JSON next to a BLAKE3 hash sidecar (`<path>.hash`).

use canopy_impact_core::{FittedPreprocessor, ImpactError, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::network::ImpactNetwork;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub version: String,
    pub created_at: i64,
    pub seed: i64,
    pub input_width: usize,
    /// Transformed column names in network input order
    pub feature_names: Vec<String>,
    pub epochs_run: usize,
    pub best_epoch: usize,
    pub best_val_loss: f64,
    #[serde(default)]
    pub test_loss: Option<f64>,
    #[serde(default)]
    pub test_mae: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ArtifactMetadata,
    pub preprocessor: FittedPreprocessor,
    pub network: ImpactNetwork,
}

/// Location of the hash sidecar for an artifact path
pub fn hash_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".hash");
    PathBuf::from(name)
}

impl ModelArtifact {
    /// Reject artifacts whose parts disagree on input width
    pub fn validate(&self) -> Result<()> {
        let width = self.preprocessor.output_width();
        if width != self.network.input_width {
            return Err(ImpactError::DimensionMismatch {
                expected: self.network.input_width,
                actual: width,
            });
        }
        if self.metadata.input_width != width {
            return Err(ImpactError::DimensionMismatch {
                expected: self.metadata.input_width,
                actual: width,
            });
        }
        Ok(())
    }

    /// Write the artifact and its hash sidecar, replacing existing files.
    ///
    /// Returns the hex BLAKE3 hash of the written JSON.
    pub fn save(&self, path: &Path) -> Result<String> {
        self.validate()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, &json)?;

        let hash_hex = hex::encode(blake3::hash(json.as_bytes()).as_bytes());
        std::fs::write(hash_path(path), &hash_hex)?;

        info!("Model saved to {} (blake3 {})", path.display(), hash_hex);
        Ok(hash_hex)
    }

    /// Read an artifact, verifying the hash sidecar when one exists
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;

        let sidecar = hash_path(path);
        if sidecar.exists() {
            let expected = std::fs::read_to_string(&sidecar)?;
            let actual = hex::encode(blake3::hash(json.as_bytes()).as_bytes());
            if expected.trim() != actual {
                return Err(ImpactError::ArtifactIntegrity(format!(
                    "{} hashes to {actual}, sidecar records {}",
                    path.display(),
                    expected.trim()
                )));
            }
        } else {
            warn!("No hash sidecar for {}, skipping verification", path.display());
        }

        let artifact: ModelArtifact = serde_json::from_str(&json)?;
        artifact.validate()?;
        Ok(artifact)
    }
}
