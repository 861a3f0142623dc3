// src/services/fallback.rs
use chrono::{DateTime, Utc};

use crate::models::{Analysis, AnalyzedItem, Metrics, PredictionLabel, SourceKind, TrendItem};

fn metrics(pairs: &[(&str, f64)]) -> Metrics {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Fixed dataset published when no source returned anything. One item per source kind,
/// each with preset analysis that is never recomputed.
pub fn fallback_items(timestamp: DateTime<Utc>) -> Vec<AnalyzedItem> {
    vec![
        AnalyzedItem {
            item: TrendItem {
                id: "fallback-1".to_string(),
                name: "AI-Powered Development Tools".to_string(),
                description: "Next generation of coding assistants using large language models".to_string(),
                source: "GitHub".to_string(),
                source_kind: SourceKind::Repository,
                source_url: "https://github.com/trending".to_string(),
                category: "AI/ML".to_string(),
                raw_metrics: metrics(&[
                    ("stars", 12500.0),
                    ("forks", 1800.0),
                    ("watchers", 3500.0),
                    ("openIssues", 45.0),
                    ("dailyStarRate", 85.0),
                    ("daysSinceCreation", 45.0),
                ]),
                timestamp,
                is_custom: false,
            },
            analysis: Analysis {
                confidence: 78,
                velocity_change_percent: 125,
                is_accelerating: true,
                prediction_label: PredictionLabel::BreakingOut,
                days_tracked: 3,
                data_point_count: 3,
            },
        },
        AnalyzedItem {
            item: TrendItem {
                id: "fallback-2".to_string(),
                name: "Micro-SaaS Platform Builders".to_string(),
                description: "Tools for rapidly building and deploying small SaaS businesses".to_string(),
                source: "Hacker News".to_string(),
                source_kind: SourceKind::Forum,
                source_url: "https://news.ycombinator.com".to_string(),
                category: "Startups".to_string(),
                raw_metrics: metrics(&[
                    ("score", 520.0),
                    ("comments", 145.0),
                    ("scorePerHour", 28.0),
                    ("hoursSincePost", 6.0),
                ]),
                timestamp,
                is_custom: false,
            },
            analysis: Analysis {
                confidence: 82,
                velocity_change_percent: 95,
                is_accelerating: true,
                prediction_label: PredictionLabel::ViralPotential,
                days_tracked: 2,
                data_point_count: 2,
            },
        },
        AnalyzedItem {
            item: TrendItem {
                id: "fallback-3".to_string(),
                name: "Climate Tech Data Analytics".to_string(),
                description: "Carbon tracking and ESG reporting automation for enterprises".to_string(),
                source: "Reddit r/startups".to_string(),
                source_kind: SourceKind::Community,
                source_url: "https://reddit.com/r/startups".to_string(),
                category: "Climate".to_string(),
                raw_metrics: metrics(&[
                    ("upvotes", 1450.0),
                    ("comments", 210.0),
                    ("upvoteRatio", 0.94),
                    ("upvotesPerHour", 72.0),
                    ("hoursSincePost", 8.0),
                ]),
                timestamp,
                is_custom: false,
            },
            analysis: Analysis {
                confidence: 75,
                velocity_change_percent: 88,
                is_accelerating: true,
                prediction_label: PredictionLabel::CommunityMomentum,
                days_tracked: 1,
                data_point_count: 1,
            },
        },
    ]
}
