use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

// ---------- Categorical levels ----------

#[derive(Debug, thiserror::Error)]
#[error("invalid {field} value {value:?}; expected one of {expected}")]
pub struct ParseLevelError {
    pub field: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Declares a closed categorical field: serde uses the wire codes, and
/// `FromStr`/`Display` agree with them so CLI input round-trips exactly.
macro_rules! level_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal { $($variant:ident => $code:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $code)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }

        impl FromStr for $name {
            type Err = ParseLevelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($code => Ok($name::$variant),)+
                    other => Err(ParseLevelError {
                        field: $field,
                        value: other.to_string(),
                        expected: concat!($($code, " "),+),
                    }),
                }
            }
        }
    };
}

level_enum!(Sex, "Sex" { Male => "M", Female => "F" });

level_enum!(ChestPainType, "ChestPainType" {
    Asymptomatic => "ASY",
    AtypicalAngina => "ATA",
    NonAnginalPain => "NAP",
    TypicalAngina => "TA",
});

level_enum!(
    /// Resting electrocardiogram result.
    RestingEcg, "RestingECG" { Normal => "Normal", St => "ST", Lvh => "LVH" }
);

level_enum!(ExerciseAngina, "ExerciseAngina" { No => "N", Yes => "Y" });

level_enum!(
    /// Slope of the peak exercise ST segment.
    StSlope, "ST_Slope" { Up => "Up", Flat => "Flat", Down => "Down" }
);

// ---------- Request/Response types ----------

/// One patient as submitted to `POST /predict`.
///
/// Numeric fields are only type-checked; values outside the documented
/// clinical ranges are passed through to the model unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(rename = "Age")]
    pub age: i64,
    #[serde(rename = "Sex")]
    pub sex: Sex,
    #[serde(rename = "ChestPainType")]
    pub chest_pain_type: ChestPainType,
    #[serde(rename = "RestingBP")]
    pub resting_bp: i64,
    /// mg/dl; 0 means the measurement is missing.
    #[serde(rename = "Cholesterol")]
    pub cholesterol: i64,
    #[serde(rename = "FastingBS")]
    pub fasting_bs: i64,
    #[serde(rename = "RestingECG")]
    pub resting_ecg: RestingEcg,
    #[serde(rename = "MaxHR")]
    pub max_hr: i64,
    #[serde(rename = "ExerciseAngina")]
    pub exercise_angina: ExerciseAngina,
    #[serde(rename = "Oldpeak")]
    pub oldpeak: f64,
    #[serde(rename = "ST_Slope")]
    pub st_slope: StSlope,
}

impl PatientRecord {
    /// Default form values; also used for the startup warm-up pass.
    pub fn sample() -> Self {
        Self {
            age: 40,
            sex: Sex::Male,
            chest_pain_type: ChestPainType::Asymptomatic,
            resting_bp: 140,
            cholesterol: 200,
            fasting_bs: 0,
            resting_ecg: RestingEcg::Normal,
            max_hr: 150,
            exercise_angina: ExerciseAngina::No,
            oldpeak: 1.0,
            st_slope: StSlope::Up,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 1 = heart disease, 0 = none.
    pub prediction: u8,
    /// Probability of the positive class.
    pub risk_probability: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub backend: String,
    pub n_features: usize,
    pub feature_names: Vec<String>,
    pub raw_features: Vec<String>,
}
