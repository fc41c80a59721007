//! Heart Disease Prediction
//!
//! Collects one patient record from the command line, asks the prediction
//! API for a risk estimate and prints the result.

use std::process::ExitCode;

use clap::Parser;
use heart_api::types::{ChestPainType, ExerciseAngina, RestingEcg, Sex, StSlope};
use heart_api::PatientRecord;
use heart_client::{api::DEFAULT_API_URL, report, PredictionClient};
use tracing_subscriber::EnvFilter;

fn parse_oldpeak(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (-5.0..=10.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("{v} is not in -5.0..=10.0"))
    }
}

/// Heart disease risk estimation from clinical patient data.
///
/// Not a medical diagnosis.
#[derive(Parser, Debug)]
#[command(name = "heart-client")]
#[command(version)]
struct Cli {
    /// Prediction endpoint
    #[arg(long, env = "HEART_API_URL", default_value = DEFAULT_API_URL)]
    url: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Age in years
    #[arg(long, default_value_t = 40, value_parser = clap::value_parser!(i64).range(1..=120))]
    age: i64,

    /// M or F
    #[arg(long, default_value_t = Sex::Male)]
    sex: Sex,

    /// ASY, ATA, NAP or TA
    #[arg(long, default_value_t = ChestPainType::Asymptomatic)]
    chest_pain_type: ChestPainType,

    /// Resting blood pressure (mm Hg)
    #[arg(long, default_value_t = 140, value_parser = clap::value_parser!(i64).range(0..=250))]
    resting_bp: i64,

    /// Cholesterol (mg/dl); 0 if not measured
    #[arg(long, default_value_t = 200, value_parser = clap::value_parser!(i64).range(0..=700))]
    cholesterol: i64,

    /// Fasting blood sugar > 120 mg/dl (0 or 1)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(i64).range(0..=1))]
    fasting_bs: i64,

    /// Normal, ST or LVH
    #[arg(long, default_value_t = RestingEcg::Normal)]
    resting_ecg: RestingEcg,

    /// Maximum heart rate achieved
    #[arg(long, default_value_t = 150, value_parser = clap::value_parser!(i64).range(50..=250))]
    max_hr: i64,

    /// Exercise induced angina (N or Y)
    #[arg(long, default_value_t = ExerciseAngina::No)]
    exercise_angina: ExerciseAngina,

    /// ST depression
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true, value_parser = parse_oldpeak)]
    oldpeak: f64,

    /// Up, Flat or Down
    #[arg(long, default_value_t = StSlope::Up)]
    st_slope: StSlope,
}

impl Cli {
    fn record(&self) -> PatientRecord {
        PatientRecord {
            age: self.age,
            sex: self.sex,
            chest_pain_type: self.chest_pain_type,
            resting_bp: self.resting_bp,
            cholesterol: self.cholesterol,
            fasting_bs: self.fasting_bs,
            resting_ecg: self.resting_ecg,
            max_hr: self.max_hr,
            exercise_angina: self.exercise_angina,
            oldpeak: self.oldpeak,
            st_slope: self.st_slope,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let record = cli.record();
    let client = PredictionClient::new(cli.url.clone());

    eprintln!("Running prediction against {} ...", client.url());
    match client.submit(&record).await {
        Ok(result) => {
            print!("{}", report::render(&record, &result));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", report::render_error(&e));
            ExitCode::FAILURE
        }
    }
}
