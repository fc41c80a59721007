//! HTTP client for the prediction endpoint.

use heart_api::{PatientRecord, PredictionResult};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/predict";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API Error: {status}")]
    Status { status: StatusCode, body: String },
    #[error("Could not connect to the prediction API.")]
    Transport(#[source] reqwest::Error),
    #[error("Unexpected response from the prediction API.")]
    Decode(#[source] reqwest::Error),
}

/// Sends one record per call; failures are returned as-is, never retried.
pub struct PredictionClient {
    client: Client,
    url: String,
}

impl PredictionClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn submit(&self, record: &PatientRecord) -> Result<PredictionResult, ClientError> {
        debug!("POST {}", self.url);
        let res = self
            .client
            .post(&self.url)
            .json(record)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        let status = res.status();
        if status != StatusCode::OK {
            let body = res
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            return Err(ClientError::Status { status, body });
        }
        res.json().await.map_err(ClientError::Decode)
    }
}
