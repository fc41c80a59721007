use anyhow::Context;
use heart_api::{load_model, router, AppState, PatientRecord, ServiceConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::from_env().context("failed to read service config")?;

    let model = load_model(&config)
        .with_context(|| format!("failed to load model from {}", config.model_path.display()))?;
    let info = model.info();
    tracing::info!(
        "loaded model {} ({}); features[{}]: {:?}",
        info.name,
        info.backend,
        info.n_features,
        info.feature_names
    );

    // Warmup to ensure layout and estimator agree before taking traffic
    let warm = model
        .infer(&PatientRecord::sample())
        .context("warmup prediction failed")?;
    tracing::info!(
        "warmup forward ok (prediction={}, risk_probability={:.3})",
        warm.prediction,
        warm.risk_probability
    );

    let app = router(AppState::new(model), &config.cors_origins);

    let addr = config.bind_addr();
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install ctrl-c handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
