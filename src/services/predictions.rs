// src/services/predictions.rs
use crate::models::{AnalyzedItem, Prediction, SourceKind};
use super::scoring::PredictionRules;

/// Confident, accelerating items decorated with a breakout estimate and reasoning.
pub fn build_predictions(items: &[AnalyzedItem], rules: &PredictionRules) -> Vec<Prediction> {
    items
        .iter()
        .filter(|t| t.analysis.confidence > rules.min_confidence && t.analysis.is_accelerating)
        .map(|t| Prediction {
            trend: t.clone(),
            prediction_type: t.analysis.prediction_label,
            estimated_breakout_days: rules
                .min_breakout_days
                .max(rules.horizon_days - t.analysis.days_tracked),
            reasoning: reasoning(t),
        })
        .collect()
}

pub fn reasoning(trend: &AnalyzedItem) -> String {
    let item = &trend.item;
    let velocity = trend.analysis.velocity_change_percent;

    match item.source_kind {
        SourceKind::Repository => format!(
            "Daily star rate of {} with {}% acceleration. Typical breakout pattern detected.",
            item.metric("dailyStarRate"),
            velocity
        ),
        SourceKind::Forum => format!(
            "Score velocity of {}/hour ({}% change) with {} comments. High engagement indicates viral potential.",
            item.metric("scorePerHour"),
            velocity,
            item.metric("comments")
        ),
        SourceKind::Community => format!(
            "{} upvotes/hour ({}% change) with {:.0}% approval. Strong community momentum.",
            item.metric("upvotesPerHour"),
            velocity,
            item.metric("upvoteRatio") * 100.0
        ),
        SourceKind::Generic => format!(
            "Custom tracked item with {}% change in engagement.",
            velocity
        ),
    }
}
