//! Raw registry rows and column naming

use serde::{Deserialize, Serialize};

pub const GSID: &str = "GSID";
pub const PROJECT_NAME: &str = "Project_Name";
pub const STATUS: &str = "Status";
pub const COUNTRY: &str = "Country";
pub const PROJECT_TYPE: &str = "Project_Type";
pub const SIZE: &str = "Size";
pub const PROGRAMME_OF_ACTIVITIES: &str = "Programme_of_Activities";
pub const SUSTAINABLE_DEVELOPMENT_GOALS: &str = "Sustainable_Development_Goals";
pub const ESTIMATED_ANNUAL_CREDITS: &str = "Estimated_Annual_Credits";

/// Replace every run of whitespace in a header with a single underscore.
///
/// `"Estimated Annual Credits"` and `"Estimated_Annual_Credits"` both map to
/// the same name, so either spelling in the export is accepted.
pub fn normalize_column_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// One registered project as read from the export. Empty cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub gsid: Option<String>,
    pub project_name: Option<String>,
    pub status: Option<String>,
    pub country: Option<String>,
    pub project_type: Option<String>,
    pub size: Option<String>,
    pub programme_of_activities: Option<String>,
    pub sustainable_development_goals: Option<String>,
    /// Raw text; may be missing or non-numeric
    pub estimated_annual_credits: Option<String>,
}

impl ProjectRecord {
    /// Assign a cell by normalized column name. Unknown columns are ignored.
    pub fn set_field(&mut self, column: &str, value: Option<String>) {
        let slot = match column {
            GSID => &mut self.gsid,
            PROJECT_NAME => &mut self.project_name,
            STATUS => &mut self.status,
            COUNTRY => &mut self.country,
            PROJECT_TYPE => &mut self.project_type,
            SIZE => &mut self.size,
            PROGRAMME_OF_ACTIVITIES => &mut self.programme_of_activities,
            SUSTAINABLE_DEVELOPMENT_GOALS => &mut self.sustainable_development_goals,
            ESTIMATED_ANNUAL_CREDITS => &mut self.estimated_annual_credits,
            _ => return,
        };
        *slot = value;
    }

    /// Credits as a number, when the cell holds one
    pub fn credits(&self) -> Option<f64> {
        self.estimated_annual_credits
            .as_deref()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// GSID as an integer, truncating any fractional part
    pub fn gsid_number(&self) -> Option<i64> {
        self.gsid
            .as_deref()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .map(|v| v as i64)
    }
}

/// Loaded export: normalized header plus every row
#[derive(Debug, Clone, Default)]
pub struct LoadedDataset {
    pub columns: Vec<String>,
    pub records: Vec<ProjectRecord>,
}

impl LoadedDataset {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
