//! Handlers for `/api/metrics` and `/api/health`

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::store::RECENT_LIMIT;
use super::AppState;
use crate::error::TherapyError;
use crate::metrics::DEFAULT_CHILD_ID;
use crate::types::StoredMetric;

/// Body of `POST /api/metrics`
///
/// Numeric fields accept a JSON number or a numeric string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetricRequest {
    #[serde(default)]
    pub child_id: Option<String>,
    #[serde(default)]
    pub exercise_type: Option<String>,
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub intensity: Option<Value>,
    #[serde(default)]
    pub accuracy: Option<Value>,
    #[serde(default)]
    pub date: Option<String>,
}

impl CreateMetricRequest {
    /// Validate and assign a server id; `now` is used when no date was sent
    pub fn into_metric(self, now: DateTime<Utc>) -> Result<StoredMetric, TherapyError> {
        let exercise_type = self
            .exercise_type
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TherapyError::MissingField("exerciseType".to_string()))?;

        let child_id = self
            .child_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CHILD_ID.to_string());

        let date = match self.date.as_deref().map(str::trim) {
            None | Some("") => now,
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|_| TherapyError::ParseError(format!("Invalid date: {raw}")))?,
        };

        Ok(StoredMetric {
            id: Uuid::new_v4(),
            child_id,
            exercise_type,
            duration: flexible_number("duration", self.duration)?,
            intensity: flexible_number("intensity", self.intensity)?,
            accuracy: flexible_number("accuracy", self.accuracy)?,
            date,
        })
    }
}

fn flexible_number(field: &str, value: Option<Value>) -> Result<Option<f64>, TherapyError> {
    let invalid = || TherapyError::ParseError(format!("Invalid number for {field}"));
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(invalid),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(invalid()),
        },
        Some(_) => Err(invalid()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListMetricsQuery {
    #[serde(rename = "childId")]
    pub child_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub version: &'static str,
}

/// POST /metrics
async fn create_metric(
    State(state): State<AppState>,
    payload: Result<Json<CreateMetricRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StoredMetric>)> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let metric = request.into_metric(Utc::now())?;

    state.store.insert(metric.clone()).await;
    info!(
        id = %metric.id,
        child = %metric.child_id,
        exercise = %metric.exercise_type,
        "metric recorded"
    );
    Ok((StatusCode::CREATED, Json(metric)))
}

/// GET /metrics
async fn list_metrics(
    State(state): State<AppState>,
    Query(query): Query<ListMetricsQuery>,
) -> Json<Vec<StoredMetric>> {
    let child_id = query.child_id.as_deref().filter(|s| !s.is_empty());
    Json(state.store.recent(child_id, RECENT_LIMIT).await)
}

/// GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Therapy metrics service is running",
        version: crate::FLUX_VERSION,
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(list_metrics).post(create_metric))
        .route("/health", get(health_check))
}
