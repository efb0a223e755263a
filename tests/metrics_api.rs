//! HTTP-level tests for the metrics service.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use common::{body_json, get, post_json};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn health_check_returns_ok() {
    let app = common::build_test_app();
    let response = get(app, "/api/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["message"].is_string());
    assert_eq!(json["version"], therapy_flux::FLUX_VERSION);
}

#[tokio::test]
async fn create_without_exercise_type_is_rejected() {
    let app = common::build_test_app();
    let response = post_json(app.clone(), "/api/metrics", json!({"childId": "kid", "accuracy": 50})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Missing required fields");
    assert_eq!(json["code"], "BAD_REQUEST");

    // Nothing was stored
    let listing = body_json(get(app, "/api/metrics").await).await;
    assert_eq!(listing.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn create_with_only_exercise_type_uses_defaults() {
    let app = common::build_test_app();
    let before = Utc::now();
    let response = post_json(app, "/api/metrics", json!({"exerciseType": "Oral Motor Training"})).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["childId"], "Leo Thompson");
    assert_eq!(json["exerciseType"], "Oral Motor Training");
    assert!(json["duration"].is_null());
    assert!(json["id"].is_string());

    let date: DateTime<Utc> = json["date"].as_str().unwrap().parse().unwrap();
    assert!(date >= before && date <= Utc::now());
}

#[tokio::test]
async fn numeric_strings_are_accepted() {
    let app = common::build_test_app();
    let body = json!({
        "childId": "kid",
        "exerciseType": "Vocalization Balloon",
        "duration": "6.5",
        "intensity": "220",
        "accuracy": 65,
    });
    let response = post_json(app, "/api/metrics", body).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["duration"], 6.5);
    assert_eq!(json["intensity"], 220.0);
    assert_eq!(json["accuracy"], 65.0);
}

#[tokio::test]
async fn invalid_number_is_rejected() {
    let app = common::build_test_app();
    let body = json!({"exerciseType": "Vocalization Balloon", "duration": "long"});
    let response = post_json(app, "/api/metrics", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn malformed_json_is_a_json_bad_request() {
    let app = common::build_test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/metrics")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn list_filters_by_child_newest_first() {
    let app = common::build_test_app();
    let base = Utc::now() - Duration::hours(1);

    for (child, minutes) in [("ana", 5), ("ben", 10), ("ana", 20), ("ana", 1)] {
        let date = (base + Duration::minutes(minutes)).to_rfc3339();
        let body = json!({"childId": child, "exerciseType": "Oral Motor Training", "date": date});
        let response = post_json(app.clone(), "/api/metrics", body).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let json = body_json(get(app.clone(), "/api/metrics?childId=ana").await).await;
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r["childId"] == "ana"));

    let dates: Vec<DateTime<Utc>> = records
        .iter()
        .map(|r| r["date"].as_str().unwrap().parse().unwrap())
        .collect();
    assert!(dates.windows(2).all(|w| w[0] >= w[1]));

    let all = body_json(get(app, "/api/metrics").await).await;
    assert_eq!(all.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn list_is_capped_at_fifty() {
    let app = common::build_test_app();
    for i in 0..55 {
        let body = json!({"childId": "kid", "exerciseType": "Oral Motor Training", "accuracy": i});
        post_json(app.clone(), "/api/metrics", body).await;
    }

    let json = body_json(get(app, "/api/metrics?childId=kid").await).await;
    assert_eq!(json.as_array().unwrap().len(), 50);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = common::build_test_app();
    let response = get(app, "/api/does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
