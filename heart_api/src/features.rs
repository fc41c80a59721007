//! Serving-time feature construction.
//!
//! The fitted pipeline saw twelve raw columns: the eleven record fields plus
//! the `Cholesterol_missing` flag. A [`FeatureLayout`] describes how those
//! raw columns were expanded into the numeric vector the estimator consumes,
//! and is validated once when the model is loaded.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ModelError;
use crate::types::PatientRecord;

pub const CHOLESTEROL_MISSING: &str = "Cholesterol_missing";

/// Raw column names in training order.
pub const RAW_FEATURES: [&str; 12] = [
    "Age",
    "Sex",
    "ChestPainType",
    "RestingBP",
    "Cholesterol",
    "FastingBS",
    "RestingECG",
    "MaxHR",
    "ExerciseAngina",
    "Oldpeak",
    "ST_Slope",
    CHOLESTEROL_MISSING,
];

/// A cholesterol of 0 is the dataset's sentinel for "not measured".
pub fn cholesterol_missing(cholesterol: i64) -> i64 {
    i64::from(cholesterol == 0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue {
    Numeric(f64),
    Category(&'static str),
}

impl PatientRecord {
    /// Looks up one raw column by its training-time name.
    pub fn raw_value(&self, name: &str) -> Option<RawValue> {
        use RawValue::{Category, Numeric};
        let v = match name {
            "Age" => Numeric(self.age as f64),
            "Sex" => Category(self.sex.code()),
            "ChestPainType" => Category(self.chest_pain_type.code()),
            "RestingBP" => Numeric(self.resting_bp as f64),
            "Cholesterol" => Numeric(self.cholesterol as f64),
            "FastingBS" => Numeric(self.fasting_bs as f64),
            "RestingECG" => Category(self.resting_ecg.code()),
            "MaxHR" => Numeric(self.max_hr as f64),
            "ExerciseAngina" => Category(self.exercise_angina.code()),
            "Oldpeak" => Numeric(self.oldpeak),
            "ST_Slope" => Category(self.st_slope.code()),
            CHOLESTEROL_MISSING => Numeric(cholesterol_missing(self.cholesterol) as f64),
            _ => return None,
        };
        Some(v)
    }
}

fn is_categorical(name: &str) -> bool {
    matches!(
        name,
        "Sex" | "ChestPainType" | "RestingECG" | "ExerciseAngina" | "ST_Slope"
    )
}

// ---------- Layout ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnSpec {
    /// Passed through as a single slot.
    Numeric { name: String },
    /// Expanded to one indicator slot per fitted level.
    OneHot { name: String, levels: Vec<String> },
}

impl ColumnSpec {
    pub fn name(&self) -> &str {
        match self {
            ColumnSpec::Numeric { name } | ColumnSpec::OneHot { name, .. } => name,
        }
    }

    fn width(&self) -> usize {
        match self {
            ColumnSpec::Numeric { .. } => 1,
            ColumnSpec::OneHot { levels, .. } => levels.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureLayout {
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
}

impl FeatureLayout {
    /// Number of slots in the encoded vector.
    pub fn width(&self) -> usize {
        self.columns.iter().map(ColumnSpec::width).sum()
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen = HashSet::new();
        for col in &self.columns {
            let name = col.name();
            if !RAW_FEATURES.contains(&name) {
                return Err(ModelError::Layout(format!("unknown column {name:?}")));
            }
            if !seen.insert(name) {
                return Err(ModelError::Layout(format!("column {name:?} listed twice")));
            }
            match col {
                ColumnSpec::Numeric { .. } if is_categorical(name) => {
                    return Err(ModelError::Layout(format!(
                        "{name} is categorical but encoded as numeric"
                    )));
                }
                ColumnSpec::OneHot { levels, .. } => {
                    if !is_categorical(name) {
                        return Err(ModelError::Layout(format!(
                            "{name} is numeric but encoded as one-hot"
                        )));
                    }
                    if levels.is_empty() {
                        return Err(ModelError::Layout(format!("{name} has no levels")));
                    }
                    let distinct: HashSet<_> = levels.iter().collect();
                    if distinct.len() != levels.len() {
                        return Err(ModelError::Layout(format!("{name} has duplicate levels")));
                    }
                }
                _ => {}
            }
        }
        if let Some(missing) = RAW_FEATURES.iter().find(|f| !seen.contains(*f)) {
            return Err(ModelError::Layout(format!("layout does not include {missing}")));
        }
        Ok(())
    }

    /// Builds the estimator input for one record, in layout order.
    pub fn encode(&self, record: &PatientRecord) -> Result<Vec<f64>, ModelError> {
        let mut out = Vec::with_capacity(self.width());
        for col in &self.columns {
            let raw = record
                .raw_value(col.name())
                .ok_or_else(|| ModelError::Layout(format!("unknown column {:?}", col.name())))?;
            match (col, raw) {
                (ColumnSpec::Numeric { .. }, RawValue::Numeric(v)) => out.push(v),
                (ColumnSpec::OneHot { name, levels }, RawValue::Category(code)) => {
                    let hit = levels.iter().position(|l| l == code);
                    if hit.is_none() && self.handle_unknown == HandleUnknown::Error {
                        return Err(ModelError::UnknownCategory {
                            column: name.clone(),
                            value: code.to_string(),
                        });
                    }
                    out.extend((0..levels.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
                }
                (col, _) => {
                    return Err(ModelError::Layout(format!(
                        "column {} does not match its value type",
                        col.name()
                    )));
                }
            }
        }
        Ok(out)
    }

    /// Expanded slot names, e.g. `Sex_M`.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|col| match col {
                ColumnSpec::Numeric { name } => vec![name.clone()],
                ColumnSpec::OneHot { name, levels } => {
                    levels.iter().map(|l| format!("{name}_{l}")).collect()
                }
            })
            .collect()
    }
}
