// src/services/scoring.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::models::{Analysis, AnalyzedItem, HistoricalRecord, PredictionLabel, SourceKind, TrendItem};
use super::calculations::round_half_up;
use super::history::HistoricalStore;
use super::velocity;

/// First matching row (by `rate > min_rate`, in order) decides a cold-start item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColdStartRule {
    pub min_rate: f64,
    pub confidence: f64,
    /// `None` keeps the default `monitoring` label.
    pub label: Option<PredictionLabel>,
    #[serde(default)]
    pub accelerating: bool,
}

/// `latest > min_rate && velocity > min_velocity` =>
/// `confidence = min(cap, offset + velocity / velocity_divisor)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakoutRule {
    pub min_rate: f64,
    pub min_velocity: f64,
    pub label: PredictionLabel,
    pub offset: f64,
    pub velocity_divisor: f64,
    pub cap: f64,
}

/// Non-accelerating fallback applied when the breakout rule misses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SteadyRule {
    pub min_rate: f64,
    pub confidence: f64,
    pub label: PredictionLabel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SourceRules {
    pub cold_start: Vec<ColdStartRule>,
    pub breakout: Option<BreakoutRule>,
    pub steady: Option<SteadyRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecencyBonus {
    pub min_days: i64,
    pub bonus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PredictionRules {
    pub min_confidence: i64,
    pub horizon_days: i64,
    pub min_breakout_days: i64,
}

impl Default for PredictionRules {
    fn default() -> Self {
        PredictionRules {
            min_confidence: 70,
            horizon_days: 14,
            min_breakout_days: 3,
        }
    }
}

/// The single table of per-source thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoringConfig {
    pub base_confidence: f64,
    pub repository: SourceRules,
    pub forum: SourceRules,
    pub community: SourceRules,
    pub recency_bonuses: Vec<RecencyBonus>,
    pub predictions: PredictionRules,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let cold = |min_rate, confidence, label, accelerating| ColdStartRule {
            min_rate,
            confidence,
            label,
            accelerating,
        };

        ScoringConfig {
            base_confidence: 50.0,
            repository: SourceRules {
                cold_start: vec![
                    cold(20.0, 75.0, Some(PredictionLabel::NewSignal), true),
                    cold(10.0, 68.0, Some(PredictionLabel::Rising), false),
                    cold(5.0, 62.0, None, false),
                ],
                breakout: Some(BreakoutRule {
                    min_rate: 10.0,
                    min_velocity: 50.0,
                    label: PredictionLabel::BreakingOut,
                    offset: 60.0,
                    velocity_divisor: 2.0,
                    cap: 85.0,
                }),
                steady: Some(SteadyRule {
                    min_rate: 5.0,
                    confidence: 65.0,
                    label: PredictionLabel::Rising,
                }),
            },
            forum: SourceRules {
                cold_start: vec![
                    cold(30.0, 78.0, Some(PredictionLabel::ViralPotential), true),
                    cold(20.0, 70.0, Some(PredictionLabel::NewSignal), false),
                    cold(10.0, 64.0, None, false),
                ],
                breakout: Some(BreakoutRule {
                    min_rate: 20.0,
                    min_velocity: 30.0,
                    label: PredictionLabel::ViralPotential,
                    offset: 60.0,
                    velocity_divisor: 3.0,
                    cap: 82.0,
                }),
                steady: None,
            },
            community: SourceRules {
                cold_start: vec![
                    cold(50.0, 76.0, Some(PredictionLabel::CommunityMomentum), true),
                    cold(25.0, 68.0, Some(PredictionLabel::NewSignal), false),
                ],
                breakout: Some(BreakoutRule {
                    min_rate: 15.0,
                    min_velocity: 40.0,
                    label: PredictionLabel::CommunityMomentum,
                    offset: 60.0,
                    velocity_divisor: 4.0,
                    cap: 80.0,
                }),
                steady: None,
            },
            recency_bonuses: vec![
                RecencyBonus { min_days: 3, bonus: 5.0 },
                RecencyBonus { min_days: 7, bonus: 5.0 },
            ],
            predictions: PredictionRules::default(),
        }
    }
}

impl ScoringConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scoring config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing scoring config {}", path.display()))
    }

    /// Overrides layered onto the default table. Objects merge key by key, so a
    /// section that only sets `coldStart` keeps its default breakout and steady
    /// rules; lists and scalars replace, and an explicit `null` removes a rule.
    pub fn from_json(text: &str) -> Result<Self> {
        let overrides: Value = serde_json::from_str(text)?;
        let mut merged = serde_json::to_value(Self::default())?;
        merge_json(&mut merged, overrides);
        let config: Self = serde_json::from_value(merged)?;

        for (name, rules) in [
            ("repository", &config.repository),
            ("forum", &config.forum),
            ("community", &config.community),
        ] {
            if rules.breakout.is_none() {
                warn!("Scoring config has no breakout rule for {}, warm {} items never accelerate", name, name);
            }
        }
        Ok(config)
    }

    pub fn rules_for(&self, kind: SourceKind) -> Option<&SourceRules> {
        match kind {
            SourceKind::Repository => Some(&self.repository),
            SourceKind::Forum => Some(&self.forum),
            SourceKind::Community => Some(&self.community),
            SourceKind::Generic => None,
        }
    }
}

fn merge_json(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                merge_json(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, value) => *base = value,
    }
}

/// Maps current and historical metrics to a confidence score and a label.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    config: ScoringConfig,
}

impl ConfidenceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        ConfidenceScorer { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn analyze(&self, item: &TrendItem, record: Option<&HistoricalRecord>, now: DateTime<Utc>) -> Analysis {
        match record {
            Some(record) if record.snapshots.len() > 1 => self.warm(item.source_kind, record, now),
            _ => self.cold_start(item),
        }
    }

    /// Analyzes every item against `history` and sorts by descending confidence.
    pub fn analyze_all(&self, items: Vec<TrendItem>, history: &HistoricalStore, now: DateTime<Utc>) -> Vec<AnalyzedItem> {
        let mut analyzed: Vec<AnalyzedItem> = items
            .into_iter()
            .map(|item| {
                let analysis = self.analyze(&item, history.get(&item.id), now);
                AnalyzedItem { item, analysis }
            })
            .collect();
        analyzed.sort_by(|a, b| b.analysis.confidence.cmp(&a.analysis.confidence));
        analyzed
    }

    fn cold_start(&self, item: &TrendItem) -> Analysis {
        let rate = item.rate();
        let matched = self
            .config
            .rules_for(item.source_kind)
            .and_then(|rules| rules.cold_start.iter().find(|rule| rate > rule.min_rate));

        let (confidence, label, accelerating) = match matched {
            Some(rule) => (
                rule.confidence,
                rule.label.unwrap_or(PredictionLabel::Monitoring),
                rule.accelerating,
            ),
            None => (self.config.base_confidence, PredictionLabel::Monitoring, false),
        };

        Analysis {
            confidence: round_half_up(confidence) as i64,
            velocity_change_percent: 0,
            is_accelerating: accelerating,
            prediction_label: label,
            days_tracked: 0,
            data_point_count: 1,
        }
    }

    fn warm(&self, kind: SourceKind, record: &HistoricalRecord, now: DateTime<Utc>) -> Analysis {
        let mut confidence = self.config.base_confidence;
        let mut label = PredictionLabel::Monitoring;
        let mut accelerating = false;

        let velocity = velocity::measure(record, kind);
        let change = velocity.map(|v| v.change_percent).unwrap_or(0.0);

        if let (Some(rules), Some(v)) = (self.config.rules_for(kind), velocity) {
            let breakout = rules
                .breakout
                .as_ref()
                .filter(|rule| v.latest_rate > rule.min_rate && v.change_percent > rule.min_velocity);

            if let Some(rule) = breakout {
                accelerating = true;
                label = rule.label;
                confidence = rule.cap.min(rule.offset + v.change_percent / rule.velocity_divisor);
            } else if let Some(rule) = rules.steady.as_ref().filter(|rule| v.latest_rate > rule.min_rate) {
                confidence = rule.confidence;
                label = rule.label;
            }
        }

        let days_tracked = (now - record.first_seen).num_days().max(0);
        for bonus in &self.config.recency_bonuses {
            if days_tracked > bonus.min_days {
                confidence += bonus.bonus;
            }
        }

        Analysis {
            confidence: round_half_up(confidence) as i64,
            velocity_change_percent: round_half_up(change) as i64,
            is_accelerating: accelerating,
            prediction_label: label,
            days_tracked,
            data_point_count: record.snapshots.len(),
        }
    }
}
