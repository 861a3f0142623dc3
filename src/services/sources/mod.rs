// src/services/sources/mod.rs
//! Source adapters: fetch raw items from one external origin and normalize them.
//!
//! Adapters return `anyhow::Result`; the guarded wrappers in this module are the
//! boundary where any failure (HTTP, parse, timeout, panic) becomes an empty result.

pub mod generic;
pub mod github;
pub mod hackernews;
pub mod reddit;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, USER_AGENT};
use crate::models::{CustomTarget, SourceKind, TrendItem};
use crate::services::calculations::round_half_up;

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> SourceKind;

    /// Trending discovery. Every returned item is stamped with `now`.
    async fn collect(&self, now: DateTime<Utc>) -> Result<Vec<TrendItem>>;

    /// Targeted lookup for a custom target's item id. `Ok(None)` when the item does not exist.
    async fn fetch_one(&self, item_id: &str, now: DateTime<Utc>) -> Result<Option<TrendItem>>;
}

pub fn http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// GitHub, Hacker News and Reddit adapters sharing one client.
pub fn default_adapters(client: Client, config: &AppConfig) -> Vec<Arc<dyn SourceAdapter>> {
    vec![
        Arc::new(github::GithubAdapter::new(client.clone(), config.github_lookback_days)),
        Arc::new(hackernews::HackerNewsAdapter::new(client.clone(), config.hn_story_limit)),
        Arc::new(reddit::RedditAdapter::new(client, config.subreddits.clone())),
    ]
}

/// `metric / max(1, elapsed)`, rounded to 2 decimals.
pub(crate) fn per_unit(metric: f64, elapsed: f64) -> f64 {
    round_half_up(metric / elapsed.max(1.0) * 100.0) / 100.0
}

/// Runs one adapter's discovery with a time limit. Never fails: any problem is logged
/// and the adapter contributes nothing to the cycle.
pub async fn collect_guarded(adapter: Arc<dyn SourceAdapter>, now: DateTime<Utc>, limit: Duration) -> Vec<TrendItem> {
    let name = adapter.name().to_string();
    let task = tokio::spawn(async move { tokio::time::timeout(limit, adapter.collect(now)).await });

    match task.await {
        Ok(Ok(Ok(items))) => {
            info!("{}: collected {} items", name, items.len());
            items
        }
        Ok(Ok(Err(e))) => {
            error!("{} fetch error: {:#}", name, e);
            Vec::new()
        }
        Ok(Err(_)) => {
            error!("{} fetch timed out after {:?}", name, limit);
            Vec::new()
        }
        Err(e) => {
            error!("{} fetch task failed: {}", name, e);
            Vec::new()
        }
    }
}

/// Resolves one custom target to a fresh item. Generic targets never touch the network.
pub async fn fetch_target(
    adapters: &[Arc<dyn SourceAdapter>],
    target: &CustomTarget,
    now: DateTime<Utc>,
    limit: Duration,
) -> Option<TrendItem> {
    let kind = target.source_type.kind();
    if kind == SourceKind::Generic {
        return Some(generic::custom_item(target, now));
    }

    let Some(adapter) = adapters.iter().find(|a| a.kind() == kind).cloned() else {
        warn!("No adapter for custom {} target {}", target.source_type.as_str(), target.url);
        return None;
    };

    let item_id = target.item_id.clone();
    let task = tokio::spawn(async move { tokio::time::timeout(limit, adapter.fetch_one(&item_id, now)).await });

    let source = target.source_type.as_str();
    match task.await {
        Ok(Ok(Ok(Some(item)))) => Some(item),
        Ok(Ok(Ok(None))) => {
            warn!("Custom {} item {} not found", source, target.item_id);
            None
        }
        Ok(Ok(Err(e))) => {
            error!("Error fetching custom {} data: {:#}", source, e);
            None
        }
        Ok(Err(_)) => {
            error!("Custom {} fetch for {} timed out", source, target.item_id);
            None
        }
        Err(e) => {
            error!("Custom {} fetch task for {} failed: {}", source, target.item_id, e);
            None
        }
    }
}
