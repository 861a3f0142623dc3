// src/services/sources/reddit.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{error, info};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::REDDIT_BASE;
use crate::models::{Metrics, SourceKind, TrendItem};
use crate::services::calculations::round_half_up;
use crate::services::topics::{categorize_topic, extract_trend_from_title};
use super::{per_unit, SourceAdapter};

const HOT_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: RedditPost,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditPost {
    pub id: String,
    pub title: String,
    pub score: f64,
    #[serde(default)]
    pub num_comments: f64,
    #[serde(default)]
    pub upvote_ratio: f64,
    /// Unix seconds
    pub created_utc: f64,
    pub permalink: String,
}

/// Community board: hot posts across a set of subreddits.
pub struct RedditAdapter {
    client: Client,
    base: String,
    subreddits: Vec<String>,
}

impl RedditAdapter {
    pub fn new(client: Client, subreddits: Vec<String>) -> Self {
        Self::with_base(client, REDDIT_BASE, subreddits)
    }

    pub fn with_base(client: Client, base: impl Into<String>, subreddits: Vec<String>) -> Self {
        RedditAdapter {
            client,
            base: base.into(),
            subreddits,
        }
    }

    async fn fetch_hot(&self, subreddit: &str) -> Result<Vec<RedditPost>> {
        let url = format!("{}/r/{}/hot.json?limit={}", self.base, subreddit, HOT_LIMIT);
        let listing: Listing = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(listing.data.children.into_iter().map(|c| c.data).collect())
    }
}

/// `source` is the display name, e.g. `Reddit r/startups`.
pub fn normalize_post(post: &RedditPost, source: &str, now: DateTime<Utc>, custom: bool) -> TrendItem {
    let hours_since = (now.timestamp() as f64 - post.created_utc) / 3600.0;

    let mut raw_metrics = Metrics::new();
    raw_metrics.insert("upvotes".to_string(), post.score);
    raw_metrics.insert("comments".to_string(), post.num_comments);
    raw_metrics.insert("upvoteRatio".to_string(), post.upvote_ratio);
    raw_metrics.insert("upvotesPerHour".to_string(), per_unit(post.score, hours_since));
    raw_metrics.insert("hoursSincePost".to_string(), round_half_up(hours_since));

    let id = if custom {
        format!("custom-reddit-{}", post.id)
    } else {
        format!("reddit-{}", post.id)
    };

    TrendItem {
        id,
        name: extract_trend_from_title(&post.title),
        description: post.title.clone(),
        source: source.to_string(),
        source_kind: SourceKind::Community,
        source_url: format!("https://reddit.com{}", post.permalink),
        category: categorize_topic(&post.title).to_string(),
        raw_metrics,
        timestamp: now,
        is_custom: custom,
    }
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    fn name(&self) -> &str {
        "Reddit"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Community
    }

    async fn collect(&self, now: DateTime<Utc>) -> Result<Vec<TrendItem>> {
        let results = join_all(self.subreddits.iter().map(|sub| async move {
            (sub, self.fetch_hot(sub).await)
        }))
        .await;

        let mut items = Vec::new();
        let mut failures = 0;
        for (sub, result) in results {
            match result {
                Ok(posts) => {
                    let source = format!("Reddit r/{}", sub);
                    items.extend(posts.iter().map(|p| normalize_post(p, &source, now, false)));
                }
                Err(e) => {
                    failures += 1;
                    error!("Reddit r/{} fetch error: {}", sub, e);
                }
            }
        }

        if failures > 0 && failures == self.subreddits.len() {
            bail!("all {} subreddits failed", failures);
        }
        info!("Collected {} Reddit posts from {} subreddits", items.len(), self.subreddits.len() - failures);
        Ok(items)
    }

    async fn fetch_one(&self, item_id: &str, now: DateTime<Utc>) -> Result<Option<TrendItem>> {
        let url = format!("{}/comments/{}.json", self.base, item_id);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        // [post listing, comment listing]
        let listings: Vec<Listing> = response.error_for_status()?.json().await?;
        let post = listings
            .into_iter()
            .next()
            .and_then(|l| l.data.children.into_iter().next())
            .map(|c| c.data);

        Ok(post.map(|p| normalize_post(&p, "Reddit (Custom)", now, true)))
    }
}
