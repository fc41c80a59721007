use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::error::ApiError;
use crate::model::ModelHandle;
use crate::types::{ErrorBody, ModelInfo, PatientRecord, PredictionResult, StatusMessage};

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub model: ModelHandle,
}

impl AppState {
    pub fn new(model: ModelHandle) -> Self {
        Self { model }
    }
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/predict", post(predict))
        .route("/model", get(model_info))
        .fallback(not_found)
        .with_state(state)
        .layer(cors_layer(cors_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let list = origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!("ignoring unusable CORS origin {:?}", o);
                    None
                }
            })
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(AllowOrigin::list(list))
    };
    cors.allow_methods(Any).allow_headers(Any)
}

// ---------- Handlers ----------

async fn home() -> Json<StatusMessage> {
    Json(StatusMessage {
        message: "API running".to_string(),
    })
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PatientRecord>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    // Shape errors stop here; the model is never reached.
    let Json(record) = payload?;

    let model = state.model.clone();
    let result = tokio::task::spawn_blocking(move || model.infer(&record))
        .await
        .map_err(|e| ApiError::Task(e.to_string()))??;

    tracing::debug!(
        prediction = result.prediction,
        risk_probability = result.risk_probability,
        "prediction served"
    );
    Ok(Json(result))
}

async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.model.info())
}

async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            detail: "Not Found".to_string(),
        }),
    )
}
