//! Impact score target: `log1p(credits)` rescaled to a fixed range

use serde::{Deserialize, Serialize};

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

/// Min-max scaler over log-transformed credits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetScaler {
    pub data_min: f64,
    pub data_max: f64,
}

impl TargetScaler {
    /// Fit on raw credit values. Returns `None` for an empty slice.
    pub fn fit(credits: &[f64]) -> Option<Self> {
        let mut logs = credits.iter().map(|c| c.ln_1p());
        let first = logs.next()?;
        let (data_min, data_max) = logs.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(Self { data_min, data_max })
    }

    /// Scale one raw credit value into [`SCORE_MIN`, `SCORE_MAX`].
    ///
    /// A degenerate fit (all values equal) maps everything to `SCORE_MIN`.
    pub fn transform(&self, credits: f64) -> f64 {
        let range = self.data_max - self.data_min;
        let unit = if range > 0.0 {
            (credits.ln_1p() - self.data_min) / range
        } else {
            credits.ln_1p() - self.data_min
        };
        SCORE_MIN + unit * (SCORE_MAX - SCORE_MIN)
    }
}

/// Distribution summary of the target column
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); zero for a single value
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl TargetSummary {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        } else {
            0.0
        };

        Some(Self {
            count: n,
            mean,
            std,
            min: sorted[0],
            q25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max: sorted[n - 1],
        })
    }
}

/// Linear-interpolated quantile over sorted, non-empty data
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}
