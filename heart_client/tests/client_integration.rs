/// Integration tests for the terminal client
///
/// Run with: cargo test -p heart_client --test client_integration -- --nocapture

use std::path::Path;

use heart_api::model::ForestArtifact;
use heart_api::{router, AppState, ModelHandle, PatientRecord};
use heart_client::{report, ClientError, PredictionClient, RiskBand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const MODEL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../heart_api/model/rf_heart_model.json");

async fn spawn_api() -> String {
    let artifact = ForestArtifact::load(Path::new(MODEL)).unwrap();
    let model = ModelHandle::from_artifact(artifact).unwrap();
    let app = router(AppState::new(model), &["*".to_string()]);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[test]
fn test_risk_band_mapping() {
    println!("\n=== Test: Risk Band Mapping ===");
    let cases = [
        (0.0, RiskBand::Low),
        (0.20, RiskBand::Low),
        (0.3499, RiskBand::Low),
        (0.35, RiskBand::Medium),
        (0.50, RiskBand::Medium),
        (0.6999, RiskBand::Medium),
        (0.70, RiskBand::High),
        (0.85, RiskBand::High),
        (1.0, RiskBand::High),
    ];
    for (p, expected) in cases {
        assert_eq!(RiskBand::from_probability(p), expected, "p={}", p);
    }
    assert_eq!(RiskBand::from_probability(0.20).label(), "LOW RISK");
    assert_eq!(RiskBand::from_probability(0.50).label(), "MEDIUM RISK");
    assert_eq!(RiskBand::from_probability(0.85).label(), "HIGH RISK");
    println!("✓ {} boundary cases mapped", cases.len());
}

#[tokio::test]
async fn test_submit_and_render() {
    println!("\n=== Test: Submit and Render ===");
    let base = spawn_api().await;
    let client = PredictionClient::new(format!("{}/predict", base));

    let mut record = PatientRecord::sample();
    record.cholesterol = 0;
    record.st_slope = "Flat".parse().unwrap();

    let result = client.submit(&record).await.unwrap();
    assert_eq!(result.prediction, 1);
    assert_eq!(RiskBand::from_probability(result.risk_probability), RiskBand::Medium);

    let text = report::render(&record, &result);
    assert!(text.contains("Heart Disease Detected"));
    assert!(text.contains("Risk Probability: 68.00%"));
    assert!(text.contains("Risk Category: MEDIUM RISK"));
    assert!(text.contains("\"Cholesterol\": 0"));
    println!("{}", text);
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    println!("\n=== Test: Non-200 Response ===");
    let base = spawn_api().await;
    // Wrong route: the API answers 404 with a JSON detail
    let client = PredictionClient::new(format!("{}/predict/v2", base));

    let err = client.submit(&PatientRecord::sample()).await.unwrap_err();
    match &err {
        ClientError::Status { status, body } => {
            assert_eq!(status.as_u16(), 404);
            assert!(body.contains("Not Found"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
    let text = report::render_error(&err);
    assert!(text.starts_with("API Error: 404"));
    println!("✓ {}", text.replace('\n', " | "));
}

#[tokio::test]
async fn test_transport_error_is_reported() {
    println!("\n=== Test: Connection Failure ===");
    // Reserve a port, then close it so nothing is listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = PredictionClient::new(format!("http://{}/predict", addr));
    let err = client.submit(&PatientRecord::sample()).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)), "{:?}", err);
    assert!(report::render_error(&err).starts_with("Could not connect to the prediction API."));
    println!("✓ Transport error surfaced without retry");
}

#[tokio::test]
async fn test_truncated_error_body_is_reported() {
    println!("\n=== Test: Error Body Cut Short ===");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Answers 500 promising 100 body bytes, sends 5, then hangs up
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + length {
                    break;
                }
            }
        }
        socket
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\nshort")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let client = PredictionClient::new(format!("http://{}/predict", addr));
    let err = client.submit(&PatientRecord::sample()).await.unwrap_err();
    match &err {
        ClientError::Status { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert!(body.starts_with("<unreadable body:"), "{}", body);
        }
        other => panic!("expected status error, got {:?}", other),
    }
    println!("✓ {}", report::render_error(&err).replace('\n', " | "));
}
