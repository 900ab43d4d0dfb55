//! Project filtering and feature derivation
//!
//! Narrows the export to the configured projects, parses goal tags, derives
//! the numeric and categorical feature columns and computes the impact score
//! target. Every step logs its row counts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::errors::{ImpactError, Result};
use crate::preprocessing::ColumnTransformer;
use crate::record::{
    LoadedDataset, ProjectRecord, COUNTRY, ESTIMATED_ANNUAL_CREDITS, PROGRAMME_OF_ACTIVITIES,
    PROJECT_TYPE, SIZE, STATUS, SUSTAINABLE_DEVELOPMENT_GOALS,
};
use crate::sdg::{flag_column_name, parse_sdgs};
use crate::target::{TargetScaler, TargetSummary};

pub const SDG_COUNT: &str = "SDG_Count";
const FEW_ROWS_WARNING: usize = 10;
const UNKNOWN_COUNTRY: &str = "Unknown";

/// A project that passed every filter, with its derived columns
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredProject {
    pub record: ProjectRecord,
    /// Parsed, validated estimated annual credits
    pub credits: f64,
    pub parsed_sdgs: Vec<String>,
    /// Rescaled `log1p(credits)` in [0, 100]
    pub impact_score: f64,
}

/// Names of the feature columns in model input order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl FeatureLayout {
    pub fn is_empty(&self) -> bool {
        self.numeric.is_empty() && self.categorical.is_empty()
    }

    /// Build the feature row for one project under this layout.
    ///
    /// Tag flags absent from the layout are ignored, so rows built for new
    /// data always match the width the model was trained on.
    pub fn row_for(&self, record: &ProjectRecord, parsed_sdgs: &[String]) -> FeatureRow {
        let numeric = self
            .numeric
            .iter()
            .map(|column| {
                if column == SDG_COUNT {
                    parsed_sdgs.len() as f64
                } else if parsed_sdgs.iter().any(|tag| flag_column_name(tag) == *column) {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();

        let categorical = self
            .categorical
            .iter()
            .map(|column| categorical_value(record, column))
            .collect();

        FeatureRow {
            numeric,
            categorical,
        }
    }
}

/// One unprocessed feature row. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub numeric: Vec<f64>,
    pub categorical: Vec<Option<String>>,
}

/// Output of the filter/feature stage
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub layout: FeatureLayout,
    /// Feature rows, aligned with `projects` and `targets`
    pub features: Vec<FeatureRow>,
    pub targets: Vec<f64>,
    pub projects: Vec<ScoredProject>,
    /// Every tag found in the filtered set, sorted
    pub sdg_tags: Vec<String>,
    pub target_scaler: TargetScaler,
    /// Unfitted preprocessing for this layout
    pub preprocessor: ColumnTransformer,
}

impl PreparedData {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn categorical_value(record: &ProjectRecord, column: &str) -> Option<String> {
    match column {
        PROJECT_TYPE => record.project_type.clone(),
        SIZE => record.size.clone(),
        PROGRAMME_OF_ACTIVITIES => record.programme_of_activities.clone(),
        _ => None,
    }
}

/// Apply the status, country and credit filters.
///
/// Returns each surviving record with its numeric credits.
pub fn filter_projects(
    dataset: &LoadedDataset,
    config: &PipelineConfig,
) -> Result<Vec<(ProjectRecord, f64)>> {
    info!("Initial rows: {}", dataset.len());

    if !dataset.has_column(STATUS) {
        warn!("'{STATUS}' column not found");
        return Err(ImpactError::MissingColumn(STATUS.to_string()));
    }
    let by_status: Vec<&ProjectRecord> = dataset
        .records
        .iter()
        .filter(|r| {
            r.status
                .as_ref()
                .is_some_and(|s| config.relevant_statuses.contains(s))
        })
        .collect();
    info!(
        "Rows after Status filter ({:?}): {}",
        config.relevant_statuses,
        by_status.len()
    );

    if !dataset.has_column(COUNTRY) {
        warn!("'{COUNTRY}' column not found");
        return Err(ImpactError::MissingColumn(COUNTRY.to_string()));
    }
    let by_country: Vec<&ProjectRecord> = by_status
        .into_iter()
        .filter(|r| r.country.as_deref().unwrap_or(UNKNOWN_COUNTRY) == config.target_country)
        .collect();
    info!(
        "Rows after Country filter ('{}'): {}",
        config.target_country,
        by_country.len()
    );
    if by_country.is_empty() {
        return Err(ImpactError::Preprocessing(format!(
            "No projects for {}.",
            config.target_country
        )));
    }

    if !dataset.has_column(ESTIMATED_ANNUAL_CREDITS) {
        return Err(ImpactError::MissingColumn(ESTIMATED_ANNUAL_CREDITS.to_string()));
    }
    let by_credits: Vec<(ProjectRecord, f64)> = by_country
        .into_iter()
        .filter_map(|r| r.credits().map(|c| (r, c)))
        .filter(|(_, credits)| *credits >= config.min_estimated_credits)
        .map(|(r, credits)| (r.clone(), credits))
        .collect();
    info!(
        "Rows after {} filter (>= {}): {}",
        ESTIMATED_ANNUAL_CREDITS,
        config.min_estimated_credits,
        by_credits.len()
    );

    if by_credits.len() < FEW_ROWS_WARNING {
        warn!("Very few rows after filtering: {}", by_credits.len());
    }
    if by_credits.is_empty() {
        return Err(ImpactError::Preprocessing(
            "no projects left after filtering".to_string(),
        ));
    }

    Ok(by_credits)
}

/// Run the full filter/feature stage over a loaded export
pub fn prepare_features(dataset: &LoadedDataset, config: &PipelineConfig) -> Result<PreparedData> {
    info!("Starting preprocessing");
    let filtered = filter_projects(dataset, config)?;

    let has_goals = dataset.has_column(SUSTAINABLE_DEVELOPMENT_GOALS);
    let parsed: Vec<Vec<String>> = filtered
        .iter()
        .map(|(record, _)| {
            if has_goals {
                parse_sdgs(record.sustainable_development_goals.as_deref().unwrap_or(""))
            } else {
                Vec::new()
            }
        })
        .collect();

    let sdg_tags: Vec<String> = parsed
        .iter()
        .flatten()
        .cloned()
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect();
    if has_goals {
        info!("Found SDGs after filtering: {:?}", sdg_tags);
    }

    let credits: Vec<f64> = filtered.iter().map(|(_, c)| *c).collect();
    let target_scaler = TargetScaler::fit(&credits)
        .ok_or_else(|| ImpactError::Preprocessing("no target values".to_string()))?;
    let targets: Vec<f64> = credits.iter().map(|&c| target_scaler.transform(c)).collect();
    if let Some(summary) = TargetSummary::from_values(&targets) {
        info!(
            "ImpactScore distribution: count={} mean={:.3} std={:.3} min={:.3} 25%={:.3} 50%={:.3} 75%={:.3} max={:.3}",
            summary.count,
            summary.mean,
            summary.std,
            summary.min,
            summary.q25,
            summary.median,
            summary.q75,
            summary.max
        );
    }

    let mut numeric = vec![SDG_COUNT.to_string()];
    numeric.extend(sdg_tags.iter().map(|tag| flag_column_name(tag)));

    let mut categorical: Vec<String> = Vec::new();
    for column in [PROJECT_TYPE, SIZE] {
        if dataset.has_column(column) {
            categorical.push(column.to_string());
        }
    }
    if dataset.has_column(PROGRAMME_OF_ACTIVITIES) {
        categorical.push(PROGRAMME_OF_ACTIVITIES.to_string());
    } else {
        warn!("'{PROGRAMME_OF_ACTIVITIES}' column not found, excluding from features");
    }

    let layout = FeatureLayout {
        numeric,
        categorical,
    };
    if layout.is_empty() {
        return Err(ImpactError::Preprocessing("no features available".to_string()));
    }
    info!("Selected categorical features: {:?}", layout.categorical);
    info!("Selected numeric features: {:?}", layout.numeric);

    let mut features = Vec::with_capacity(filtered.len());
    let mut projects = Vec::with_capacity(filtered.len());
    for (((record, credits), parsed_sdgs), impact_score) in
        filtered.into_iter().zip(parsed).zip(targets.iter().copied())
    {
        features.push(layout.row_for(&record, &parsed_sdgs));
        projects.push(ScoredProject {
            record,
            credits,
            parsed_sdgs,
            impact_score,
        });
    }

    info!("Preprocessing complete: {} rows", features.len());
    Ok(PreparedData {
        preprocessor: ColumnTransformer::new(layout.clone()),
        layout,
        features,
        targets,
        projects,
        sdg_tags,
        target_scaler,
    })
}
