//! Column-wise preprocessing for model input
//!
//! Two independent column groups:
//! - numeric: median imputation, then standardization
//! - categorical: constant `"Missing"` imputation, then one-hot encoding
//!
//! [`ColumnTransformer::fit`] learns the statistics from the training
//! partition and returns a [`FittedPreprocessor`]. The fitted form has no way
//! to be refit; it is applied unchanged to every other partition and to
//! inference samples.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::errors::{ImpactError, Result};
use crate::features::{FeatureLayout, FeatureRow};

pub const MISSING_CATEGORY: &str = "Missing";

/// Preprocessing definition for a feature layout, not yet fitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTransformer {
    layout: FeatureLayout,
}

/// Frozen statistics for one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    /// Replacement for missing values
    pub median: f64,
    pub mean: f64,
    /// Divisor after centering; 1 for a constant column
    pub scale: f64,
}

/// Frozen vocabulary for one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    /// Sorted categories seen during fitting
    pub categories: Vec<String>,
}

/// Preprocessing with statistics frozen from the training partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    pub layout: FeatureLayout,
    pub numeric: Vec<NumericColumn>,
    pub categorical: Vec<CategoricalColumn>,
}

impl ColumnTransformer {
    pub fn new(layout: FeatureLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    /// Learn imputation, scaling and vocabulary from `rows`
    pub fn fit(&self, rows: &[FeatureRow]) -> Result<FittedPreprocessor> {
        if rows.is_empty() {
            return Err(ImpactError::Preprocessing(
                "cannot fit preprocessing on an empty partition".to_string(),
            ));
        }
        for row in rows {
            check_row(&self.layout, row)?;
        }

        let numeric = self
            .layout
            .numeric
            .iter()
            .enumerate()
            .map(|(idx, name)| fit_numeric(name, rows.iter().map(|r| r.numeric[idx])))
            .collect();

        let categorical = self
            .layout
            .categorical
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let categories: BTreeSet<String> = rows
                    .iter()
                    .map(|r| impute_category(&r.categorical[idx]).to_string())
                    .collect();
                CategoricalColumn {
                    name: name.clone(),
                    categories: categories.into_iter().collect(),
                }
            })
            .collect();

        let fitted = FittedPreprocessor {
            layout: self.layout.clone(),
            numeric,
            categorical,
        };
        debug!(
            "Fitted preprocessing on {} rows -> {} output columns",
            rows.len(),
            fitted.output_width()
        );
        Ok(fitted)
    }

    /// Fit on `rows` and transform them in one step
    pub fn fit_transform(&self, rows: &[FeatureRow]) -> Result<(FittedPreprocessor, Vec<Vec<f64>>)> {
        let fitted = self.fit(rows)?;
        let transformed = fitted.transform(rows)?;
        Ok((fitted, transformed))
    }
}

impl FittedPreprocessor {
    /// Number of values each transformed row holds
    pub fn output_width(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|c| c.categories.len())
                .sum::<usize>()
    }

    /// Output column names: numeric names, then `{column}_{category}`
    pub fn output_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|c| c.name.clone()).collect();
        for column in &self.categorical {
            names.extend(
                column
                    .categories
                    .iter()
                    .map(|cat| format!("{}_{}", column.name, cat)),
            );
        }
        names
    }

    /// Transform rows with the frozen statistics.
    ///
    /// Unknown categories encode as all zeros in their block.
    pub fn transform(&self, rows: &[FeatureRow]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    pub fn transform_row(&self, row: &FeatureRow) -> Result<Vec<f64>> {
        check_row(&self.layout, row)?;

        let mut out = Vec::with_capacity(self.output_width());
        for (column, &value) in self.numeric.iter().zip(&row.numeric) {
            let imputed = if value.is_nan() { column.median } else { value };
            out.push((imputed - column.mean) / column.scale);
        }
        for (column, value) in self.categorical.iter().zip(&row.categorical) {
            let category = impute_category(value);
            out.extend(
                column
                    .categories
                    .iter()
                    .map(|c| if c == category { 1.0 } else { 0.0 }),
            );
        }
        Ok(out)
    }
}

fn impute_category(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(MISSING_CATEGORY)
}

fn check_row(layout: &FeatureLayout, row: &FeatureRow) -> Result<()> {
    if row.numeric.len() != layout.numeric.len() {
        return Err(ImpactError::DimensionMismatch {
            expected: layout.numeric.len(),
            actual: row.numeric.len(),
        });
    }
    if row.categorical.len() != layout.categorical.len() {
        return Err(ImpactError::DimensionMismatch {
            expected: layout.categorical.len(),
            actual: row.categorical.len(),
        });
    }
    Ok(())
}

fn fit_numeric(name: &str, values: impl Iterator<Item = f64>) -> NumericColumn {
    let values: Vec<f64> = values.collect();
    let mut present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    present.sort_by(f64::total_cmp);

    let median = match present.len() {
        0 => 0.0,
        n if n % 2 == 1 => present[n / 2],
        n => (present[n / 2 - 1] + present[n / 2]) / 2.0,
    };

    let imputed: Vec<f64> = values
        .iter()
        .map(|&v| if v.is_nan() { median } else { v })
        .collect();
    let n = imputed.len() as f64;
    let mean = imputed.iter().sum::<f64>() / n;
    let variance = imputed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    let scale = if std > f64::EPSILON { std } else { 1.0 };

    NumericColumn {
        name: name.to_string(),
        median,
        mean,
        scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> FeatureLayout {
        FeatureLayout {
            numeric: vec!["SDG_Count".to_string(), "Has_SDG_1".to_string()],
            categorical: vec!["Size".to_string()],
        }
    }

    fn row(count: f64, flag: f64, size: Option<&str>) -> FeatureRow {
        FeatureRow {
            numeric: vec![count, flag],
            categorical: vec![size.map(str::to_string)],
        }
    }

    fn training_rows() -> Vec<FeatureRow> {
        vec![
            row(1.0, 1.0, Some("Large")),
            row(3.0, 0.0, Some("Small")),
            row(f64::NAN, 1.0, None),
        ]
    }

    #[test]
    fn test_fit_statistics() -> Result<()> {
        let fitted = ColumnTransformer::new(layout()).fit(&training_rows())?;

        // median of [1, 3] fills the gap, mean of [1, 3, 2]
        assert_eq!(fitted.numeric[0].median, 2.0);
        assert!((fitted.numeric[0].mean - 2.0).abs() < 1e-12);
        assert_eq!(
            fitted.categorical[0].categories,
            vec!["Large", "Missing", "Small"]
        );
        assert_eq!(fitted.output_width(), 5);
        assert_eq!(
            fitted.output_names(),
            vec!["SDG_Count", "Has_SDG_1", "Size_Large", "Size_Missing", "Size_Small"]
        );
        Ok(())
    }

    #[test]
    fn test_standardized_training_columns() -> Result<()> {
        let (_, out) = ColumnTransformer::new(layout()).fit_transform(&training_rows())?;
        for col in 0..2 {
            let mean: f64 = out.iter().map(|r| r[col]).sum::<f64>() / out.len() as f64;
            assert!(mean.abs() < 1e-12);
        }
        assert_eq!(&out[2][2..], &[0.0, 1.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_unknown_category_is_all_zero() -> Result<()> {
        let fitted = ColumnTransformer::new(layout()).fit(&training_rows())?;
        let out = fitted.transform_row(&row(1.0, 0.0, Some("Micro")))?;
        assert_eq!(&out[2..], &[0.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_constant_column_scales_by_one() -> Result<()> {
        let rows = vec![row(2.0, 1.0, None), row(2.0, 1.0, None)];
        let fitted = ColumnTransformer::new(layout()).fit(&rows)?;
        assert_eq!(fitted.numeric[0].scale, 1.0);
        assert_eq!(fitted.transform_row(&rows[0])?[0], 0.0);
        Ok(())
    }

    #[test]
    fn test_transform_is_stable_across_calls() -> Result<()> {
        let fitted = ColumnTransformer::new(layout()).fit(&training_rows())?;
        let unseen = vec![row(5.0, 1.0, Some("Small")), row(f64::NAN, 0.0, Some("Huge"))];
        let first = fitted.transform(&unseen)?;
        let second = fitted.transform(&unseen)?;
        let third = fitted.transform(&unseen)?;
        assert_eq!(first, second);
        assert_eq!(second, third);
        Ok(())
    }

    #[test]
    fn test_transform_does_not_learn_from_new_rows() -> Result<()> {
        let fitted = ColumnTransformer::new(layout()).fit(&training_rows())?;
        let before = fitted.clone();
        fitted.transform(&[row(100.0, 1.0, Some("Giant"))])?;
        assert_eq!(fitted, before);
        Ok(())
    }

    #[test]
    fn test_width_mismatch() -> Result<()> {
        let fitted = ColumnTransformer::new(layout()).fit(&training_rows())?;
        let bad = FeatureRow {
            numeric: vec![1.0],
            categorical: vec![None],
        };
        assert!(matches!(
            fitted.transform_row(&bad),
            Err(ImpactError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        Ok(())
    }

    #[test]
    fn test_empty_fit_rejected() {
        assert!(ColumnTransformer::new(layout()).fit(&[]).is_err());
    }
}
