use std::fmt::Write;

use heart_api::{PatientRecord, PredictionResult};

use crate::api::ClientError;
use crate::risk::RiskBand;

const BAR_WIDTH: usize = 30;

fn progress_bar(p: f64) -> String {
    let filled = (p.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

/// Result screen for one successful submission.
pub fn render(record: &PatientRecord, result: &PredictionResult) -> String {
    let band = RiskBand::from_probability(result.risk_probability);
    let verdict = if result.prediction == 1 {
        "Heart Disease Detected"
    } else {
        "No Heart Disease Detected"
    };

    let mut out = String::new();
    let _ = writeln!(out, "---------- Prediction Result ----------");
    let _ = writeln!(out, "{} {}", band.indicator(), verdict);
    let _ = writeln!(out, "Risk Probability: {:.2}%", result.risk_probability * 100.0);
    let _ = writeln!(out, "{}", progress_bar(result.risk_probability));
    let _ = writeln!(out, "Risk Category: {}", band);
    let _ = writeln!(out);
    let _ = writeln!(out, "Submitted Patient Data:");
    match serde_json::to_string_pretty(record) {
        Ok(json) => {
            let _ = writeln!(out, "{}", json);
        }
        Err(e) => {
            let _ = writeln!(out, "<unprintable record: {}>", e);
        }
    }
    out
}

/// Message shown instead of a result when the call fails.
pub fn render_error(err: &ClientError) -> String {
    match err {
        ClientError::Status { body, .. } => format!("{}\n{}", err, body),
        ClientError::Transport(source) | ClientError::Decode(source) => {
            format!("{}\n{}", err, source)
        }
    }
}
