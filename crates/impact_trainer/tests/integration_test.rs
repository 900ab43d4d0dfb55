//! End-to-end runs of the impact scorer pipeline
//!
//! Builds small registry exports in temp directories and checks the report
//! shapes, the persisted artifact and run-to-run determinism.

use anyhow::Result;
use canopy_impact_core::{load_projects, prepare_features, PipelineConfig};
use canopy_impact_trainer::artifact::hash_path;
use canopy_impact_trainer::{run_scoring, run_training, ImpactReport, ModelArtifact, VERSION};
use std::io::Write;
use std::path::Path;
use tempfile::{tempdir, TempDir};

const HEADER: &str = "GSID,Project Name,Status,Country,Project Type,Size,Programme of Activities,Sustainable Development Goals,Estimated Annual Credits";

fn write_export(dir: &Path, rows: &[&str]) -> Result<std::path::PathBuf> {
    let path = dir.join("export.csv");
    let mut file = std::fs::File::create(&path)?;
    writeln!(file, "{HEADER}")?;
    for row in rows {
        writeln!(file, "{row}")?;
    }
    file.flush()?;
    Ok(path)
}

fn config_for(dir: &TempDir, input: std::path::PathBuf) -> PipelineConfig {
    let mut config = PipelineConfig {
        input_path: input,
        output_path: dir.path().join("impact_scores.json"),
        model_path: dir.path().join("impact_model.json"),
        ..PipelineConfig::default()
    };
    config.training.epochs = 5;
    config.training.batch_size = 4;
    config
}

fn read_report(path: &Path) -> Result<serde_json::Value> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

fn many_projects() -> Vec<String> {
    let types = ["Energy Efficiency", "Renewable Energy", "Afforestation"];
    let sizes = ["Large Scale", "Small Scale", "Micro Scale"];
    (0..24)
        .map(|i| {
            format!(
                "{},Project {i},Gold Standard Certified Project,India,{},{},{},\"{}\",{}",
                1000 + i,
                types[i % 3],
                sizes[i % 3],
                if i % 2 == 0 { "Yes" } else { "No" },
                match i % 4 {
                    0 => "SDG 7, SDG 13",
                    1 => "13 - Climate Action, 3 - Good Health",
                    2 => "SDG 7",
                    _ => "",
                },
                500 + i * 1_250
            )
        })
        .collect()
}

#[test]
fn test_single_passing_row() -> Result<()> {
    let dir = tempdir()?;
    let input = write_export(
        dir.path(),
        &[
            "101,Solar Rajasthan,Gold Standard Certified Project,India,Renewable Energy,Large Scale,No,\"SDG 7, SDG 13\",5000",
            "102,Cookstoves Kenya,Gold Standard Certified Project,Kenya,Energy Efficiency,Small Scale,Yes,SDG 3,800",
            "103,Wind Gujarat,Listed,India,Renewable Energy,Large Scale,No,SDG 7,12000",
        ],
    )?;
    let config = config_for(&dir, input);

    let prepared = prepare_features(&load_projects(&config.input_path)?, &config)?;
    assert_eq!(prepared.len(), 1);
    assert_eq!(prepared.targets.len(), 1);

    let report = run_training(&config)?;
    assert!(!report.is_failure(), "unexpected failure: {report:?}");

    let value = read_report(&config.output_path)?;
    let entries = value.as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["GSID"], 101);
    assert_eq!(entries[0]["Country"], "India");
    assert_eq!(entries[0]["Estimated_Annual_Credits"], 5000);
    assert_eq!(
        entries[0]["Parsed_SDGs"],
        serde_json::json!(["SDG 7", "SDG 13"])
    );
    assert!(entries[0]["Predicted_Impact_Score"].is_number());
    Ok(())
}

#[test]
fn test_no_matching_country_writes_error() -> Result<()> {
    let dir = tempdir()?;
    let input = write_export(
        dir.path(),
        &["201,Hydro Nepal,Gold Standard Certified Project,Nepal,Renewable Energy,Large Scale,No,SDG 7,3000"],
    )?;
    let config = config_for(&dir, input);

    let report = run_training(&config)?;
    assert!(report.is_failure());

    let value = read_report(&config.output_path)?;
    assert_eq!(value["error"], "Preprocessing failed: No projects for India.");
    assert!(!config.model_path.exists());
    Ok(())
}

#[test]
fn test_missing_input_writes_load_error() -> Result<()> {
    let dir = tempdir()?;
    let config = config_for(&dir, dir.path().join("absent.csv"));

    let report = run_training(&config)?;
    assert!(report.is_failure());

    let value = read_report(&config.output_path)?;
    let message = value["error"].as_str().unwrap_or_default();
    assert!(message.starts_with("Failed to load data from"), "{message}");
    Ok(())
}

#[test]
fn test_training_is_deterministic() -> Result<()> {
    let rows = many_projects();
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();

    let mut reports = Vec::new();
    for _ in 0..2 {
        let dir = tempdir()?;
        let input = write_export(dir.path(), &rows)?;
        let config = config_for(&dir, input);
        reports.push(run_training(&config)?);
    }

    match (&reports[0], &reports[1]) {
        (ImpactReport::Predictions(a), ImpactReport::Predictions(b)) => {
            assert_eq!(a.len(), 10);
            assert_eq!(a, b);
        }
        other => panic!("expected predictions, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_score_with_saved_model() -> Result<()> {
    let rows = many_projects();
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();

    let dir = tempdir()?;
    let input = write_export(dir.path(), &rows)?;
    let config = config_for(&dir, input);

    assert!(!run_training(&config)?.is_failure());
    assert!(config.model_path.exists());
    assert!(hash_path(&config.model_path).exists());

    let artifact = ModelArtifact::load(&config.model_path)?;
    assert_eq!(artifact.metadata.seed, 42);
    assert_eq!(artifact.metadata.version, VERSION);
    assert_eq!(
        artifact.metadata.input_width,
        artifact.preprocessor.output_width()
    );

    let scoring = PipelineConfig {
        output_path: dir.path().join("rescored.json"),
        ..config.clone()
    };
    match run_scoring(&scoring, &config.model_path)? {
        ImpactReport::Predictions(predictions) => assert_eq!(predictions.len(), rows.len()),
        other => panic!("expected predictions, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_score_without_model_writes_error() -> Result<()> {
    let rows = many_projects();
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();

    let dir = tempdir()?;
    let input = write_export(dir.path(), &rows)?;
    let config = config_for(&dir, input);

    let report = run_scoring(&config, &dir.path().join("missing_model.json"))?;
    assert!(report.is_failure());
    Ok(())
}
