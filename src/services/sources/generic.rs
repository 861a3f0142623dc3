// src/services/sources/generic.rs
use chrono::{DateTime, Utc};

use crate::models::{CustomTarget, Metrics, SourceKind, TrendItem};
use crate::services::topics::extract_trend_from_title;

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

fn display_source(target: &CustomTarget) -> String {
    let kind = target.source_type.as_str();
    let mut chars = kind.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{} (Custom)", capitalized)
}

/// Placeholder item for targets with no metrics API. The id is derived from the
/// target's item id so it stays stable across cycles.
pub fn custom_item(target: &CustomTarget, now: DateTime<Utc>) -> TrendItem {
    let words = strip_scheme(&target.url).replace(['/', '.', '-', '_', '?', '=', '&'], " ");
    let mut name = extract_trend_from_title(&words);
    if name.is_empty() {
        name = target.item_id.clone();
    }

    let mut raw_metrics = Metrics::new();
    raw_metrics.insert("views".to_string(), 0.0);
    raw_metrics.insert("engagement".to_string(), 0.0);
    raw_metrics.insert("trackingSince".to_string(), target.added_at.timestamp_millis() as f64);

    TrendItem {
        id: format!("custom-{}-{}", target.source_type.as_str(), target.item_id),
        name,
        description: format!("Custom tracked: {}", target.url),
        source: display_source(target),
        source_kind: SourceKind::Generic,
        source_url: target.url.clone(),
        category: "Custom".to_string(),
        raw_metrics,
        timestamp: now,
        is_custom: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceType;
    use chrono::{Duration, TimeZone};

    #[test]
    fn generic_item_id_is_stable_across_cycles() {
        let added = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        let target = CustomTarget {
            url: "https://www.youtube.com/watch?v=abc123".to_string(),
            source_type: SourceType::Youtube,
            item_id: "abc123".to_string(),
            added_at: added,
        };

        let first = custom_item(&target, added);
        let later = custom_item(&target, added + Duration::hours(6));
        assert_eq!(first.id, "custom-youtube-abc123");
        assert_eq!(first.id, later.id);
        assert_eq!(first.source, "Youtube (Custom)");
        assert_eq!(first.name, "youtube watch abc123");
        assert_eq!(first.raw_metrics["trackingSince"], added.timestamp_millis() as f64);
    }
}
