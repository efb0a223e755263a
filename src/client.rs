//! HTTP client for the metrics service

use std::time::Duration;

use reqwest::Client;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::error::TherapyError;
use crate::metrics::MetricsSink;
use crate::types::{StoredMetric, TherapyMetricRecord};

/// Client for `/api/metrics`
#[derive(Debug, Clone)]
pub struct MetricsClient {
    client: Client,
    base_url: String,
}

impl MetricsClient {
    /// `base_url` is the service root, e.g. `http://localhost:3001`
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn metrics_url(&self) -> String {
        format!("{}/api/metrics", self.base_url.trim_end_matches('/'))
    }

    /// Save one record; returns the stored copy with its server id
    pub async fn submit(&self, record: &TherapyMetricRecord) -> Result<StoredMetric, TherapyError> {
        let response = self
            .client
            .post(self.metrics_url())
            .json(record)
            .send()
            .await
            .map_err(|e| TherapyError::Persistence(format!("metrics request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TherapyError::Persistence(format!(
                "metrics service returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TherapyError::Persistence(format!("invalid metrics response: {e}")))
    }

    /// Most recent records, newest first
    pub async fn fetch_recent(&self, child_id: Option<&str>) -> Result<Vec<StoredMetric>, TherapyError> {
        let mut request = self.client.get(self.metrics_url());
        if let Some(id) = child_id {
            request = request.query(&[("childId", id)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TherapyError::Persistence(format!("metrics request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TherapyError::Persistence(format!(
                "metrics service returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TherapyError::Persistence(format!("invalid metrics response: {e}")))
    }
}

/// Fire-and-forget sink posting records to the metrics service
///
/// Each record is sent on the given runtime; failures are logged at warn.
#[derive(Debug, Clone)]
pub struct HttpMetricsSink {
    client: MetricsClient,
    handle: Handle,
}

impl HttpMetricsSink {
    pub fn new(client: MetricsClient, handle: Handle) -> Self {
        Self { client, handle }
    }

    /// Sink bound to the runtime of the calling context
    pub fn current(client: MetricsClient) -> Result<Self, TherapyError> {
        let handle = Handle::try_current()
            .map_err(|e| TherapyError::InvalidState(format!("no tokio runtime: {e}")))?;
        Ok(Self::new(client, handle))
    }
}

impl MetricsSink for HttpMetricsSink {
    fn submit(&self, record: TherapyMetricRecord) {
        let client = self.client.clone();
        self.handle.spawn(async move {
            match client.submit(&record).await {
                Ok(stored) => debug!(id = %stored.id, "metric saved"),
                Err(e) => warn!(
                    error = %e,
                    exercise = record.exercise_type.as_str(),
                    "failed to save metric"
                ),
            }
        });
    }
}
