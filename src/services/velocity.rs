// src/services/velocity.rs
use crate::models::{HistoricalRecord, Snapshot, SourceKind};

/// Rate-of-change between the two most recent snapshots of an item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub latest_rate: f64,
    pub previous_rate: f64,
    pub change_percent: f64,
}

fn rate_at(snapshot: &Snapshot, metric: Option<&str>) -> f64 {
    metric
        .and_then(|m| snapshot.metrics.get(m))
        .copied()
        .unwrap_or(0.0)
}

/// Compares the last two snapshots in append order. `None` with fewer than two.
pub fn measure(record: &HistoricalRecord, kind: SourceKind) -> Option<Velocity> {
    let [.., previous, latest] = record.snapshots.as_slice() else {
        return None;
    };

    let metric = kind.rate_metric();
    let latest_rate = rate_at(latest, metric);
    let previous_rate = rate_at(previous, metric);
    let change_percent = if previous_rate > 0.0 {
        (latest_rate - previous_rate) / previous_rate * 100.0
    } else {
        0.0
    };

    Some(Velocity {
        latest_rate,
        previous_rate,
        change_percent,
    })
}
