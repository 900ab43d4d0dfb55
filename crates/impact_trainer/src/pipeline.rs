//! End-to-end runs
//!
//! Training: load → filter/features → split → fit preprocessing on the
//! training partition → train → persist → sample → predict → report.
//! Scoring: load → filter/features → predict every project with a persisted
//! artifact → report.
//!
//! Any stage failure is written as the error-shaped report instead of being
//! returned; only failing to write the report itself is an `Err`.

use canopy_impact_core::{
    load_projects, prepare_features, FeatureRow, ImpactError, PipelineConfig, PreparedData,
    Result,
};
use std::path::Path;
use tracing::{error, info};

use crate::artifact::{ArtifactMetadata, ModelArtifact};
use crate::deterministic::{sample_indices, train_test_split};
use crate::report::{build_predictions, write_report, ImpactReport, ProjectPrediction};
use crate::trainer::ImpactTrainer;
use crate::VERSION;

fn rows_at(features: &[FeatureRow], indices: &[usize]) -> Vec<FeatureRow> {
    indices.iter().map(|&i| features[i].clone()).collect()
}

fn values_at(values: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| values[i]).collect()
}

fn into_report(result: Result<Vec<ProjectPrediction>>) -> ImpactReport {
    match result {
        Ok(predictions) => ImpactReport::Predictions(predictions),
        Err(err) => {
            error!("{err}");
            ImpactReport::failure(err.to_string())
        }
    }
}

/// Train, persist the model and write the prediction report
pub fn run_training(config: &PipelineConfig) -> Result<ImpactReport> {
    let report = into_report(train_and_predict(config));
    write_report(&config.output_path, &report)?;
    Ok(report)
}

/// Score every filtered project with a persisted artifact and write the report
pub fn run_scoring(config: &PipelineConfig, model_path: &Path) -> Result<ImpactReport> {
    let report = into_report(score_with_artifact(config, model_path));
    write_report(&config.output_path, &report)?;
    Ok(report)
}

fn train_and_predict(config: &PipelineConfig) -> Result<Vec<ProjectPrediction>> {
    let dataset = load_projects(&config.input_path)?;
    let prepared = prepare_features(&dataset, config)?;
    let artifact = train_model(&prepared, config)?;

    let sample = sample_indices(prepared.len(), config.sample_size, config.random_seed);
    info!("Sampling {} of {} projects for the report", sample.len(), prepared.len());

    build_predictions(
        &artifact.network,
        &prepared.projects,
        &prepared.features,
        &sample,
        &artifact.preprocessor,
    )
}

/// Split, fit preprocessing on the training rows only, train and persist
pub fn train_model(prepared: &PreparedData, config: &PipelineConfig) -> Result<ModelArtifact> {
    if prepared.is_empty() {
        return Err(ImpactError::Training("no trainable data".to_string()));
    }

    let split = train_test_split(
        prepared.len(),
        config.training.test_fraction,
        config.random_seed,
    );
    let train_rows = rows_at(&prepared.features, &split.train);
    let test_rows = rows_at(&prepared.features, &split.test);
    let y_train = values_at(&prepared.targets, &split.train);
    let y_test = values_at(&prepared.targets, &split.test);

    let (preprocessor, x_train) = prepared.preprocessor.fit_transform(&train_rows)?;
    let x_test = preprocessor.transform(&test_rows)?;
    info!(
        "Processed shapes: train {}x{}, test {}x{}",
        x_train.len(),
        preprocessor.output_width(),
        x_test.len(),
        preprocessor.output_width()
    );

    let trainer = ImpactTrainer::new(config.training.clone(), config.random_seed);
    let outcome = trainer.train(&x_train, &y_train, &x_test, &y_test)?;

    let (test_loss, test_mae) = if x_test.is_empty() {
        (None, None)
    } else {
        let (loss, mae) = outcome.network.evaluate(&x_test, &y_test)?;
        info!("Test loss (MSE): {:.4}, test MAE: {:.4}", loss, mae);
        (Some(loss), Some(mae))
    };

    let artifact = ModelArtifact {
        metadata: ArtifactMetadata {
            version: VERSION.to_string(),
            created_at: chrono::Utc::now().timestamp(),
            seed: config.random_seed,
            input_width: preprocessor.output_width(),
            feature_names: preprocessor.output_names(),
            epochs_run: outcome.epochs_run(),
            best_epoch: outcome.best_epoch,
            best_val_loss: outcome.best_val_loss,
            test_loss,
            test_mae,
        },
        network: outcome.network,
        preprocessor,
    };
    artifact.save(&config.model_path)?;
    Ok(artifact)
}

fn score_with_artifact(config: &PipelineConfig, model_path: &Path) -> Result<Vec<ProjectPrediction>> {
    info!("Loading model artifact from {}", model_path.display());
    let artifact = ModelArtifact::load(model_path)?;

    let dataset = load_projects(&config.input_path)?;
    let prepared = prepare_features(&dataset, config)?;

    // rebuild rows under the layout the model was trained with
    let layout = &artifact.preprocessor.layout;
    let features: Vec<FeatureRow> = prepared
        .projects
        .iter()
        .map(|p| layout.row_for(&p.record, &p.parsed_sdgs))
        .collect();
    let every_row: Vec<usize> = (0..features.len()).collect();

    build_predictions(
        &artifact.network,
        &prepared.projects,
        &features,
        &every_row,
        &artifact.preprocessor,
    )
}
