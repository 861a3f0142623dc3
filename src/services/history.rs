// src/services/history.rs
use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{HistoricalRecord, Metrics, Snapshot};
use super::store::{KvStore, HISTORICAL_DATA_KEY};

pub const RETENTION_DAYS: i64 = 30;

/// Append-only per-item time series with a rolling retention window.
pub struct HistoricalStore {
    records: HashMap<String, HistoricalRecord>,
    retention: Duration,
    store: Arc<dyn KvStore>,
}

impl HistoricalStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        HistoricalStore {
            records: HashMap::new(),
            retention: Duration::days(RETENTION_DAYS),
            store,
        }
    }

    /// Loads persisted history. A missing or unreadable record starts fresh.
    pub async fn load(store: Arc<dyn KvStore>) -> Self {
        let mut history = Self::new(store);
        match history.store.load(HISTORICAL_DATA_KEY).await {
            Ok(Some(text)) => match serde_json::from_str::<HashMap<String, HistoricalRecord>>(&text) {
                Ok(records) => {
                    info!("Loaded historical data: {} trends tracked", records.len());
                    history.records = records;
                }
                Err(e) => warn!("Discarding unreadable historical data: {}", e),
            },
            Ok(None) => info!("No historical data yet, starting fresh"),
            Err(e) => error!("Failed to load historical data: {}", e),
        }
        history
    }

    /// Adds one snapshot for `id`, creating the record on first sighting, then drops
    /// snapshots that fell out of the retention window relative to `timestamp`.
    pub fn append(&mut self, id: &str, metrics: &Metrics, timestamp: DateTime<Utc>) {
        let retention = self.retention;
        let record = self
            .records
            .entry(id.to_string())
            .or_insert_with(|| HistoricalRecord {
                first_seen: timestamp,
                snapshots: Vec::new(),
            });

        record.snapshots.push(Snapshot {
            timestamp,
            metrics: metrics.clone(),
        });
        record.snapshots.retain(|s| timestamp - s.timestamp < retention);
    }

    pub fn get(&self, id: &str) -> Option<&HistoricalRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes the whole map back. Failures are logged and the in-memory copy stays authoritative.
    pub async fn persist(&self) -> bool {
        let text = match serde_json::to_string(&self.records) {
            Ok(text) => text,
            Err(e) => {
                error!("Error serializing historical data: {}", e);
                return false;
            }
        };
        match self.store.save(HISTORICAL_DATA_KEY, &text).await {
            Ok(()) => {
                info!("Saved historical data ({} records)", self.records.len());
                true
            }
            Err(e) => {
                error!("Error saving historical data: {}", e);
                false
            }
        }
    }
}
