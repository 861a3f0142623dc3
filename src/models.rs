// src/models.rs
use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Source-specific metric name -> value.
pub type Metrics = BTreeMap<String, f64>;

/// Which family of source an item came from. Drives rate-metric and threshold lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Repository,
    Forum,
    Community,
    Generic,
}

impl SourceKind {
    /// The metric compared cycle over cycle for this kind of source.
    pub fn rate_metric(&self) -> Option<&'static str> {
        match self {
            SourceKind::Repository => Some("dailyStarRate"),
            SourceKind::Forum => Some("scorePerHour"),
            SourceKind::Community => Some("upvotesPerHour"),
            SourceKind::Generic => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub source: String,
    pub source_kind: SourceKind,
    pub source_url: String,
    pub category: String,
    pub raw_metrics: Metrics,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_custom: bool,
}

impl TrendItem {
    pub fn metric(&self, key: &str) -> f64 {
        self.raw_metrics.get(key).copied().unwrap_or(0.0)
    }

    /// Current value of the source's rate metric, 0 when absent.
    pub fn rate(&self) -> f64 {
        self.source_kind.rate_metric().map(|m| self.metric(m)).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalRecord {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub first_seen: DateTime<Utc>,
    #[serde(rename = "dataPoints")]
    pub snapshots: Vec<Snapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionLabel {
    BreakingOut,
    ViralPotential,
    CommunityMomentum,
    Rising,
    NewSignal,
    Monitoring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LabelBadge {
    pub label: PredictionLabel,
    pub text: &'static str,
    pub color: &'static str,
}

static LABEL_BADGES: [LabelBadge; 6] = [
    LabelBadge { label: PredictionLabel::BreakingOut, text: "Breaking Out", color: "red" },
    LabelBadge { label: PredictionLabel::ViralPotential, text: "Viral Potential", color: "orange" },
    LabelBadge { label: PredictionLabel::CommunityMomentum, text: "Strong Momentum", color: "yellow" },
    LabelBadge { label: PredictionLabel::Rising, text: "Rising", color: "blue" },
    LabelBadge { label: PredictionLabel::NewSignal, text: "New Signal", color: "purple" },
    LabelBadge { label: PredictionLabel::Monitoring, text: "Monitoring", color: "gray" },
];

impl PredictionLabel {
    pub fn badges() -> &'static [LabelBadge] {
        &LABEL_BADGES
    }

    pub fn badge(&self) -> &'static LabelBadge {
        // every variant has exactly one row
        LABEL_BADGES
            .iter()
            .find(|b| b.label == *self)
            .unwrap_or(&LABEL_BADGES[5])
    }
}

impl fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.badge().text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub confidence: i64,
    pub velocity_change_percent: i64,
    pub is_accelerating: bool,
    pub prediction_label: PredictionLabel,
    pub days_tracked: i64,
    pub data_point_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedItem {
    #[serde(flatten)]
    pub item: TrendItem,
    pub analysis: Analysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    #[serde(flatten)]
    pub trend: AnalyzedItem,
    pub prediction_type: PredictionLabel,
    pub estimated_breakout_days: i64,
    pub reasoning: String,
}

/// Kind of URL a custom target was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Github,
    Hackernews,
    Reddit,
    Twitter,
    Linkedin,
    Youtube,
    Blog,
    Generic,
}

impl SourceType {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceType::Github => SourceKind::Repository,
            SourceType::Hackernews => SourceKind::Forum,
            SourceType::Reddit => SourceKind::Community,
            _ => SourceKind::Generic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Github => "github",
            SourceType::Hackernews => "hackernews",
            SourceType::Reddit => "reddit",
            SourceType::Twitter => "twitter",
            SourceType::Linkedin => "linkedin",
            SourceType::Youtube => "youtube",
            SourceType::Blog => "blog",
            SourceType::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTarget {
    pub url: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub item_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Collecting,
    Analyzing,
    Predicting,
    Complete,
    Error,
}

impl CycleState {
    /// A new cycle may only start from one of these states.
    pub fn is_settled(&self) -> bool {
        matches!(self, CycleState::Idle | CycleState::Complete | CycleState::Error)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub signals: f64,
    pub trends: usize,
    pub avg_confidence: i64,
    pub predictions: usize,
    pub tracked_items: usize,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanView {
    pub items: Vec<AnalyzedItem>,
    pub predictions: Vec<Prediction>,
    pub stats: DashboardStats,
    pub cycle_state: CycleState,
    pub error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for ScanView {
    fn default() -> Self {
        ScanView {
            items: Vec::new(),
            predictions: Vec::new(),
            stats: DashboardStats::default(),
            cycle_state: CycleState::Idle,
            error: None,
            last_update: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn snapshot_serializes_metrics_inline_with_millisecond_timestamp() {
        let mut metrics = Metrics::new();
        metrics.insert("stars".to_string(), 120.0);
        let snap = Snapshot {
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            metrics,
        };

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);
        assert_eq!(json["stars"], 120.0);

        let back: Snapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn custom_target_uses_persisted_key_names() {
        let target = CustomTarget {
            url: "https://github.com/rust-lang/rust".to_string(),
            source_type: SourceType::Github,
            item_id: "rust-lang/rust".to_string(),
            added_at: Utc.timestamp_millis_opt(1_000).unwrap(),
        };
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(json["type"], "github");
        assert_eq!(json["itemId"], "rust-lang/rust");
        assert_eq!(json["addedAt"], 1_000);
    }

    #[test]
    fn every_label_has_a_badge() {
        for label in [
            PredictionLabel::BreakingOut,
            PredictionLabel::ViralPotential,
            PredictionLabel::CommunityMomentum,
            PredictionLabel::Rising,
            PredictionLabel::NewSignal,
            PredictionLabel::Monitoring,
        ] {
            assert_eq!(label.badge().label, label);
        }
        assert_eq!(PredictionLabel::badges().len(), 6);
    }

    #[test]
    fn settled_states_accept_new_cycles() {
        assert!(CycleState::Idle.is_settled());
        assert!(CycleState::Error.is_settled());
        assert!(!CycleState::Collecting.is_settled());
        assert!(!CycleState::Predicting.is_settled());
    }
}
