//! Prediction report
//!
//! The report file holds either an array of per-project predictions or, when
//! any stage failed, a single `{"error": "..."}` object. Consumers tell the
//! two apart by shape.

use canopy_impact_core::{FeatureRow, FittedPreprocessor, ImpactError, Result, ScoredProject};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::network::ImpactNetwork;

const NOT_AVAILABLE: &str = "N/A";

/// One scored project as written to the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPrediction {
    #[serde(rename = "GSID")]
    pub gsid: i64,
    #[serde(rename = "Project_Name")]
    pub project_name: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Project_Type")]
    pub project_type: String,
    #[serde(rename = "Estimated_Annual_Credits")]
    pub estimated_annual_credits: i64,
    #[serde(rename = "Parsed_SDGs")]
    pub parsed_sdgs: Vec<String>,
    #[serde(rename = "Predicted_Impact_Score")]
    pub predicted_impact_score: f64,
}

impl ProjectPrediction {
    fn from_project(project: &ScoredProject, score: f64) -> Self {
        let record = &project.record;
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        Self {
            gsid: record.gsid_number().unwrap_or(0),
            project_name: text(&record.project_name),
            country: text(&record.country),
            project_type: text(&record.project_type),
            estimated_annual_credits: project.credits as i64,
            parsed_sdgs: project.parsed_sdgs.clone(),
            predicted_impact_score: score,
        }
    }
}

/// Report file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImpactReport {
    Predictions(Vec<ProjectPrediction>),
    Failure { error: String },
}

impl ImpactReport {
    pub fn failure(message: impl Into<String>) -> Self {
        ImpactReport::Failure {
            error: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ImpactReport::Failure { .. })
    }
}

/// Predict the sampled projects and join scores back to their attributes.
///
/// `sample` holds indices into `projects`; rows are transformed with the
/// already fitted `preprocessor`, never refit.
pub fn build_predictions(
    network: &ImpactNetwork,
    projects: &[ScoredProject],
    features: &[FeatureRow],
    sample: &[usize],
    preprocessor: &FittedPreprocessor,
) -> Result<Vec<ProjectPrediction>> {
    if sample.is_empty() || projects.is_empty() {
        return Err(ImpactError::Training(
            "no data or preprocessor for prediction".to_string(),
        ));
    }
    if projects.len() != features.len() {
        return Err(ImpactError::DimensionMismatch {
            expected: projects.len(),
            actual: features.len(),
        });
    }

    let mut sample_rows = Vec::with_capacity(sample.len());
    for &idx in sample {
        let row = features
            .get(idx)
            .ok_or_else(|| ImpactError::DimensionMismatch {
                expected: features.len(),
                actual: idx + 1,
            })?;
        sample_rows.push(row.clone());
    }

    let transformed = preprocessor.transform(&sample_rows)?;
    let scores = network.predict(&transformed)?;

    let predictions: Vec<ProjectPrediction> = sample
        .iter()
        .zip(scores)
        .map(|(&idx, score)| ProjectPrediction::from_project(&projects[idx], score))
        .collect();
    info!("Generated predictions for {} projects", predictions.len());
    Ok(predictions)
}

/// Serialize a report with four-space indentation
pub fn render_report(report: &ImpactReport) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    report.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| ImpactError::Io(std::io::Error::other(e)))
}

/// Write the report, replacing any previous file
pub fn write_report(path: &Path, report: &ImpactReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_report(report)?)?;
    match report {
        ImpactReport::Predictions(p) => {
            info!("Saved {} predictions to {}", p.len(), path.display())
        }
        ImpactReport::Failure { error } => {
            info!("Saved error report to {}: {}", path.display(), error)
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_impact_core::ProjectRecord;

    fn project() -> ScoredProject {
        ScoredProject {
            record: ProjectRecord {
                gsid: Some("4021".to_string()),
                project_name: Some("Biogas Karnataka".to_string()),
                country: Some("India".to_string()),
                project_type: None,
                ..Default::default()
            },
            credits: 12_500.7,
            parsed_sdgs: vec!["SDG 7".to_string(), "SDG 13".to_string()],
            impact_score: 42.0,
        }
    }

    #[test]
    fn test_prediction_fields() -> Result<()> {
        let prediction = ProjectPrediction::from_project(&project(), 37.5);
        let value = serde_json::to_value(&prediction)?;

        assert_eq!(value["GSID"], 4021);
        assert_eq!(value["Project_Name"], "Biogas Karnataka");
        assert_eq!(value["Project_Type"], "N/A");
        assert_eq!(value["Estimated_Annual_Credits"], 12_500);
        assert_eq!(value["Parsed_SDGs"], serde_json::json!(["SDG 7", "SDG 13"]));
        assert_eq!(value["Predicted_Impact_Score"], 37.5);
        Ok(())
    }

    #[test]
    fn test_failure_shape() -> Result<()> {
        let rendered = render_report(&ImpactReport::failure("no data"))?;
        assert_eq!(rendered, "{\n    \"error\": \"no data\"\n}");

        let parsed: ImpactReport = serde_json::from_str(&rendered)?;
        assert!(parsed.is_failure());
        Ok(())
    }

    #[test]
    fn test_predictions_shape() -> Result<()> {
        let report = ImpactReport::Predictions(vec![ProjectPrediction::from_project(&project(), 1.0)]);
        let value: serde_json::Value = serde_json::from_str(&render_report(&report)?)?;
        assert!(value.is_array());
        assert_eq!(value.as_array().map(Vec::len), Some(1));
        Ok(())
    }
}
