// src/services/calculations.rs
use crate::models::{AnalyzedItem, DashboardStats};

/// Halves go toward positive infinity, so -2.5 becomes -2.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn calculate_average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Headline count for an item: stars, else score, else upvotes.
fn signal_count(item: &AnalyzedItem) -> f64 {
    let metrics = &item.item.raw_metrics;
    ["stars", "score", "upvotes"]
        .iter()
        .filter_map(|k| metrics.get(*k).copied())
        .find(|v| *v != 0.0)
        .unwrap_or(0.0)
}

pub fn calculate_stats(items: &[AnalyzedItem], prediction_count: usize, tracked_items: usize) -> DashboardStats {
    let confidences: Vec<f64> = items.iter().map(|t| t.analysis.confidence as f64).collect();

    DashboardStats {
        signals: items.iter().map(signal_count).sum(),
        trends: items.len(),
        avg_confidence: calculate_average(&confidences).floor() as i64,
        predictions: prediction_count,
        tracked_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fallback::fallback_items;
    use chrono::Utc;

    #[test]
    fn halves_round_toward_positive_infinity() {
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.6), -3.0);
        assert_eq!(round_half_up(82.4), 82.0);
    }

    #[test]
    fn stats_over_fallback_set() {
        let items = fallback_items(Utc::now());
        let stats = calculate_stats(&items, 3, 0);

        assert_eq!(stats.trends, 3);
        assert_eq!(stats.signals, 12500.0 + 520.0 + 1450.0);
        // (78 + 82 + 75) / 3 = 78.33
        assert_eq!(stats.avg_confidence, 78);
        assert_eq!(stats.predictions, 3);
    }

    #[test]
    fn empty_stats_are_zero() {
        let stats = calculate_stats(&[], 0, 4);
        assert_eq!(stats.avg_confidence, 0);
        assert_eq!(stats.signals, 0.0);
        assert_eq!(stats.tracked_items, 4);
    }
}
