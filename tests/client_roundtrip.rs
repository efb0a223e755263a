//! Client and sink against a live metrics service on an ephemeral port.

mod common;

use std::time::Duration;

use chrono::Utc;
use therapy_flux::client::{HttpMetricsSink, MetricsClient};
use therapy_flux::server::{build_router, AppState, MetricStore};
use therapy_flux::types::{ExerciseType, TherapyMetricRecord};
use therapy_flux::{MetricsSink, ProgressSummary};

async fn spawn_service() -> String {
    let app = build_router(AppState::new(MetricStore::new()), &common::test_config());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn record(child: &str, accuracy: f64, duration: Option<f64>) -> TherapyMetricRecord {
    TherapyMetricRecord {
        child_id: child.to_string(),
        exercise_type: ExerciseType::VocalizationBalloon,
        duration_seconds: duration,
        intensity: Some(250.0),
        accuracy_percent: Some(accuracy),
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn submit_and_summarize() {
    let client = MetricsClient::new(spawn_service().await);

    let stored = client.submit(&record("mia", 80.0, Some(8.0))).await.unwrap();
    assert_eq!(stored.child_id, "mia");
    assert_eq!(stored.exercise_type, "Vocalization Balloon");
    assert_eq!(stored.accuracy, Some(80.0));

    client.submit(&record("mia", 50.0, Some(5.0))).await.unwrap();
    client.submit(&record("noah", 10.0, None)).await.unwrap();

    let records = client.fetch_recent(Some("mia")).await.unwrap();
    assert_eq!(records.len(), 2);

    let summary = ProgressSummary::from_records(&records);
    assert_eq!(summary.attempts, 2);
    assert_eq!(summary.average_accuracy, 65);
    assert!((summary.average_duration - 6.5).abs() < 1e-9);

    assert_eq!(client.fetch_recent(None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn sink_posts_in_background() {
    let base = spawn_service().await;
    let client = MetricsClient::new(base);
    let sink = HttpMetricsSink::current(client.clone()).unwrap();

    sink.submit(record("zoe", 100.0, Some(12.0)));

    let mut stored = Vec::new();
    for _ in 0..50 {
        stored = client.fetch_recent(Some("zoe")).await.unwrap();
        if !stored.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].duration, Some(12.0));
}
