//! In-memory metric store with an optional JSON snapshot file

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::TherapyError;
use crate::types::StoredMetric;

/// Maximum number of records returned by a listing
pub const RECENT_LIMIT: usize = 50;

#[derive(Debug, Default)]
pub struct MetricStore {
    records: RwLock<Vec<StoredMetric>>,
    snapshot_path: Option<PathBuf>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records from `path` if it exists; every insert writes the file back
    ///
    /// A leftover staging file from an interrupted write is discarded; the last
    /// completed snapshot is what loads.
    pub fn with_snapshot(path: &Path) -> Result<Self, TherapyError> {
        let staging = staging_path(path);
        if staging.exists() {
            debug!(path = %staging.display(), "discarding unfinished snapshot write");
            std::fs::remove_file(&staging)?;
        }

        let records = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let records: Vec<StoredMetric> = serde_json::from_str(&raw)?;
            info!(path = %path.display(), count = records.len(), "loaded metric snapshot");
            records
        } else {
            Vec::new()
        };

        Ok(Self {
            records: RwLock::new(records),
            snapshot_path: Some(path.to_path_buf()),
        })
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Append a record
    ///
    /// A failed snapshot write is logged; the record stays in memory.
    pub async fn insert(&self, metric: StoredMetric) {
        let mut records = self.records.write().await;
        records.push(metric);

        if let Some(path) = &self.snapshot_path {
            if let Err(e) = write_snapshot(path, &records).await {
                warn!(path = %path.display(), error = %e, "failed to write metric snapshot");
            }
        }
    }

    /// Up to `limit` records, newest first, optionally for one child
    pub async fn recent(&self, child_id: Option<&str>, limit: usize) -> Vec<StoredMetric> {
        let records = self.records.read().await;
        // Reverse insertion order first so equal dates list the later insert first
        let mut matching: Vec<StoredMetric> = records
            .iter()
            .rev()
            .filter(|m| child_id.map_or(true, |id| m.child_id == id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.date.cmp(&a.date));
        matching.truncate(limit);
        matching
    }
}

/// Write to a sibling staging file, then rename it over the snapshot so a reader
/// only ever sees a complete file
async fn write_snapshot(path: &Path, records: &[StoredMetric]) -> Result<(), TherapyError> {
    let json = serde_json::to_string_pretty(records)?;
    let staging = staging_path(path);

    let mut file = tokio::fs::File::create(&staging).await?;
    file.write_all(json.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&staging, path).await?;
    Ok(())
}

/// `metrics.json` → `metrics.json.tmp`
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
