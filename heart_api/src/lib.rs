//! Heart disease prediction service: a fitted classifier behind a small
//! HTTP API.

pub mod config;
pub mod error;
pub mod features;
pub mod model;
pub mod routes;
#[cfg(feature = "torch")]
pub mod torch;
pub mod types;

pub use config::ServiceConfig;
pub use model::{load_model, ModelHandle};
pub use routes::{router, AppState};
pub use types::{PatientRecord, PredictionResult};
