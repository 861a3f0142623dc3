// src/services/sources/hackernews.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;

use crate::config::HN_API_BASE;
use crate::models::{Metrics, SourceKind, TrendItem};
use crate::services::calculations::round_half_up;
use crate::services::topics::{categorize_topic, extract_trend_from_title};
use super::{per_unit, SourceAdapter};

/// Max concurrent item detail requests
const DETAIL_CONCURRENCY: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct HnStory {
    pub id: u64,
    pub title: Option<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub descendants: f64,
    /// Unix seconds
    pub time: i64,
    pub url: Option<String>,
}

/// Forum/aggregator: the current top stories.
pub struct HackerNewsAdapter {
    client: Client,
    api_base: String,
    story_limit: usize,
}

impl HackerNewsAdapter {
    pub fn new(client: Client, story_limit: usize) -> Self {
        Self::with_base(client, HN_API_BASE, story_limit)
    }

    pub fn with_base(client: Client, api_base: impl Into<String>, story_limit: usize) -> Self {
        HackerNewsAdapter {
            client,
            api_base: api_base.into(),
            story_limit,
        }
    }

    async fn fetch_story(&self, id: u64) -> Result<Option<HnStory>> {
        let url = format!("{}/item/{}.json", self.api_base, id);
        let story = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Option<HnStory>>()
            .await?;
        Ok(story)
    }
}

/// `None` for items without a title (comments, deleted stories).
pub fn normalize_story(story: &HnStory, now: DateTime<Utc>, custom: bool) -> Option<TrendItem> {
    let title = story.title.as_deref().filter(|t| !t.is_empty())?;
    let hours_since = (now.timestamp() - story.time) as f64 / 3600.0;

    let mut raw_metrics = Metrics::new();
    raw_metrics.insert("score".to_string(), story.score);
    raw_metrics.insert("comments".to_string(), story.descendants);
    raw_metrics.insert("scorePerHour".to_string(), per_unit(story.score, hours_since));
    raw_metrics.insert("hoursSincePost".to_string(), round_half_up(hours_since));

    let (id, source) = if custom {
        (format!("custom-hn-{}", story.id), "Hacker News (Custom)")
    } else {
        (format!("hn-{}", story.id), "Hacker News")
    };

    Some(TrendItem {
        id,
        name: extract_trend_from_title(title),
        description: title.to_string(),
        source: source.to_string(),
        source_kind: SourceKind::Forum,
        source_url: story
            .url
            .clone()
            .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", story.id)),
        category: categorize_topic(title).to_string(),
        raw_metrics,
        timestamp: now,
        is_custom: custom,
    })
}

#[async_trait]
impl SourceAdapter for HackerNewsAdapter {
    fn name(&self) -> &str {
        "Hacker News"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Forum
    }

    async fn collect(&self, now: DateTime<Utc>) -> Result<Vec<TrendItem>> {
        let url = format!("{}/topstories.json", self.api_base);
        let top_ids: Vec<u64> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("parsing top stories")?;
        info!("Fetching {} of {} Hacker News top stories", self.story_limit.min(top_ids.len()), top_ids.len());

        // a failed detail fetch just drops that story
        let stories: Vec<HnStory> = stream::iter(top_ids.into_iter().take(self.story_limit))
            .map(|id| async move {
                match self.fetch_story(id).await {
                    Ok(story) => story,
                    Err(e) => {
                        debug!("Skipping HN item {}: {}", id, e);
                        None
                    }
                }
            })
            .buffered(DETAIL_CONCURRENCY)
            .filter_map(|story| async move { story })
            .collect()
            .await;

        Ok(stories.iter().filter_map(|s| normalize_story(s, now, false)).collect())
    }

    async fn fetch_one(&self, item_id: &str, now: DateTime<Utc>) -> Result<Option<TrendItem>> {
        let id: u64 = item_id
            .parse()
            .with_context(|| format!("Hacker News item id must be numeric, got {}", item_id))?;
        Ok(self
            .fetch_story(id)
            .await?
            .and_then(|story| normalize_story(&story, now, true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn story_rates_are_per_hour() {
        let now = Utc.with_ymd_and_hms(2026, 2, 2, 12, 0, 0).unwrap();
        let story: HnStory = serde_json::from_value(serde_json::json!({
            "id": 4242,
            "title": "Show HN: Blazing fast Rust parser",
            "score": 350,
            "descendants": 80,
            "time": (now.timestamp() - 10 * 3600),
        }))
        .unwrap();

        let item = normalize_story(&story, now, false).unwrap();
        assert_eq!(item.id, "hn-4242");
        assert_eq!(item.raw_metrics["scorePerHour"], 35.0);
        assert_eq!(item.raw_metrics["hoursSincePost"], 10.0);
        assert_eq!(item.raw_metrics["comments"], 80.0);
        assert_eq!(item.source_url, "https://news.ycombinator.com/item?id=4242");
        assert_eq!(item.category, "Dev Tools");
    }

    #[test]
    fn fresh_story_divides_by_one_hour() {
        let now = Utc.with_ymd_and_hms(2026, 2, 2, 12, 0, 0).unwrap();
        let story = HnStory {
            id: 1,
            title: Some("Launch".to_string()),
            score: 12.0,
            descendants: 0.0,
            time: now.timestamp() - 600,
            url: Some("https://example.com".to_string()),
        };
        let item = normalize_story(&story, now, true).unwrap();
        assert_eq!(item.id, "custom-hn-1");
        assert_eq!(item.raw_metrics["scorePerHour"], 12.0);
        assert_eq!(item.source_url, "https://example.com");
    }

    #[test]
    fn untitled_items_are_skipped() {
        let story = HnStory {
            id: 2,
            title: None,
            score: 0.0,
            descendants: 0.0,
            time: 0,
            url: None,
        };
        assert!(normalize_story(&story, Utc::now(), false).is_none());
    }

    async fn mount_story(server: &MockServer, id: u64, title: &str, now: DateTime<Utc>) {
        Mock::given(method("GET"))
            .and(path(format!("/item/{}.json", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": id,
                "title": title,
                "score": 120,
                "descendants": 30,
                "time": now.timestamp() - 4 * 3600,
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn failed_details_drop_only_that_story() {
        let server = MockServer::start().await;
        let now = Utc.with_ymd_and_hms(2026, 2, 2, 12, 0, 0).unwrap();
        Mock::given(method("GET"))
            .and(path("/topstories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([11, 12, 13, 14, 15])))
            .mount(&server)
            .await;
        mount_story(&server, 11, "Show HN: A tiny database", now).await;
        Mock::given(method("GET"))
            .and(path("/item/12.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/item/13.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Null))
            .mount(&server)
            .await;
        mount_story(&server, 14, "New AI model released", now).await;
        mount_story(&server, 15, "Past the limit", now).await;

        let adapter = HackerNewsAdapter::with_base(Client::new(), server.uri(), 4);
        let items = adapter.collect(now).await.unwrap();

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["hn-11", "hn-14"]);
        assert_eq!(items[0].raw_metrics["scorePerHour"], 30.0);
    }

    #[tokio::test]
    async fn unreachable_top_list_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/topstories.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let adapter = HackerNewsAdapter::with_base(Client::new(), server.uri(), 30);
        assert!(adapter.collect(Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn single_story_lookup() {
        let server = MockServer::start().await;
        let now = Utc.with_ymd_and_hms(2026, 2, 2, 12, 0, 0).unwrap();
        mount_story(&server, 77, "Launch day", now).await;
        Mock::given(method("GET"))
            .and(path("/item/78.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Null))
            .mount(&server)
            .await;

        let adapter = HackerNewsAdapter::with_base(Client::new(), server.uri(), 30);
        let item = adapter.fetch_one("77", now).await.unwrap().unwrap();
        assert_eq!(item.id, "custom-hn-77");
        assert_eq!(item.source, "Hacker News (Custom)");

        // deleted items come back as null
        assert!(adapter.fetch_one("78", now).await.unwrap().is_none());
        assert!(adapter.fetch_one("abc", now).await.is_err());
    }
}
