//! Terminal client for the heart disease prediction API.

pub mod api;
pub mod report;
pub mod risk;

pub use api::{ClientError, PredictionClient};
pub use risk::RiskBand;
