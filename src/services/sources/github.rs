// src/services/sources/github.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::info;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::GITHUB_API_BASE;
use crate::models::{Metrics, SourceKind, TrendItem};
use crate::services::topics::format_repo_name;
use super::{per_unit, SourceAdapter};

const PER_PAGE: u32 = 20;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<GithubRepo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubRepo {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub language: Option<String>,
    pub stargazers_count: f64,
    pub forks_count: f64,
    pub watchers_count: f64,
    pub open_issues_count: f64,
    pub created_at: DateTime<Utc>,
}

/// Repository host: newly created repositories ranked by stars.
pub struct GithubAdapter {
    client: Client,
    api_base: String,
    lookback_days: i64,
}

impl GithubAdapter {
    pub fn new(client: Client, lookback_days: i64) -> Self {
        Self::with_base(client, GITHUB_API_BASE, lookback_days)
    }

    pub fn with_base(client: Client, api_base: impl Into<String>, lookback_days: i64) -> Self {
        GithubAdapter {
            client,
            api_base: api_base.into(),
            lookback_days,
        }
    }
}

/// Whole days since creation, at least 1.
fn days_since(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days().max(1)
}

pub fn normalize_repo(repo: &GithubRepo, now: DateTime<Utc>, custom: bool) -> TrendItem {
    let days = days_since(repo.created_at, now);

    let mut raw_metrics = Metrics::new();
    raw_metrics.insert("stars".to_string(), repo.stargazers_count);
    raw_metrics.insert("forks".to_string(), repo.forks_count);
    raw_metrics.insert("watchers".to_string(), repo.watchers_count);
    raw_metrics.insert("openIssues".to_string(), repo.open_issues_count);
    raw_metrics.insert("dailyStarRate".to_string(), per_unit(repo.stargazers_count, days as f64));
    raw_metrics.insert("daysSinceCreation".to_string(), days as f64);

    let (id, name, source, fallback_description) = if custom {
        (
            format!("custom-gh-{}", repo.id),
            repo.name.clone(),
            "GitHub (Custom)",
            "Custom tracked GitHub repository",
        )
    } else {
        (
            format!("gh-{}", repo.id),
            format_repo_name(&repo.name),
            "GitHub",
            "GitHub repository gaining traction",
        )
    };

    TrendItem {
        id,
        name,
        description: repo
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| fallback_description.to_string()),
        source: source.to_string(),
        source_kind: SourceKind::Repository,
        source_url: repo.html_url.clone(),
        category: repo.language.clone().unwrap_or_else(|| "Technology".to_string()),
        raw_metrics,
        timestamp: now,
        is_custom: custom,
    }
}

#[async_trait]
impl SourceAdapter for GithubAdapter {
    fn name(&self) -> &str {
        "GitHub"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Repository
    }

    async fn collect(&self, now: DateTime<Utc>) -> Result<Vec<TrendItem>> {
        let since = (now - Duration::days(self.lookback_days)).format("%Y-%m-%d").to_string();
        let url = format!("{}/search/repositories", self.api_base);
        info!("Fetching GitHub repositories created since {}", since);

        let per_page = PER_PAGE.to_string();
        let response: SearchResponse = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github.v3+json")
            .query(&[
                ("q", format!("created:>{}", since).as_str()),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.items.iter().map(|repo| normalize_repo(repo, now, false)).collect())
    }

    async fn fetch_one(&self, item_id: &str, now: DateTime<Utc>) -> Result<Option<TrendItem>> {
        let Some((owner, repo)) = item_id.split_once('/') else {
            bail!("GitHub item id must be owner/repo, got {}", item_id);
        };
        let url = format!("{}/repos/{}/{}", self.api_base, owner, repo);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let repo: GithubRepo = response.error_for_status()?.json().await?;
        Ok(Some(normalize_repo(&repo, now, true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample() -> GithubRepo {
        serde_json::from_str(
            r#"{
                "id": 987,
                "name": "tiny-llm-server",
                "description": null,
                "html_url": "https://github.com/acme/tiny-llm-server",
                "language": "Rust",
                "stargazers_count": 1000,
                "forks_count": 40,
                "watchers_count": 1000,
                "open_issues_count": 7,
                "created_at": "2026-04-01T00:00:00Z"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn discovered_repo_is_normalized() {
        let now = Utc.with_ymd_and_hms(2026, 4, 4, 12, 0, 0).unwrap();
        let item = normalize_repo(&sample(), now, false);

        assert_eq!(item.id, "gh-987");
        assert_eq!(item.name, "Tiny Llm Server");
        assert_eq!(item.description, "GitHub repository gaining traction");
        assert_eq!(item.category, "Rust");
        assert_eq!(item.raw_metrics["daysSinceCreation"], 3.0);
        assert_eq!(item.raw_metrics["dailyStarRate"], 333.33);
        assert_eq!(item.rate(), 333.33);
        assert!(!item.is_custom);
    }

    #[test]
    fn custom_repo_keeps_raw_name_and_prefix() {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 6, 0, 0).unwrap();
        let item = normalize_repo(&sample(), now, true);

        assert_eq!(item.id, "custom-gh-987");
        assert_eq!(item.name, "tiny-llm-server");
        assert_eq!(item.source, "GitHub (Custom)");
        // created the same day still divides by one
        assert_eq!(item.raw_metrics["daysSinceCreation"], 1.0);
        assert_eq!(item.raw_metrics["dailyStarRate"], 1000.0);
        assert!(item.is_custom);
    }

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "id": 987,
            "name": "tiny-llm-server",
            "description": "Serve small models",
            "html_url": "https://github.com/acme/tiny-llm-server",
            "language": "Rust",
            "stargazers_count": 1000,
            "forks_count": 40,
            "watchers_count": 1000,
            "open_issues_count": 7,
            "created_at": "2026-04-01T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn search_results_become_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .and(query_param("sort", "stars"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_count": 1,
                "items": [sample_json()]
            })))
            .mount(&server)
            .await;

        let adapter = GithubAdapter::with_base(Client::new(), server.uri(), 60);
        let now = Utc.with_ymd_and_hms(2026, 4, 4, 12, 0, 0).unwrap();
        let items = adapter.collect(now).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "gh-987");
        assert_eq!(items[0].description, "Serve small models");
    }

    #[tokio::test]
    async fn search_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let adapter = GithubAdapter::with_base(Client::new(), server.uri(), 60);
        assert!(adapter.collect(Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn repo_lookup_handles_missing_repos() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/tiny-llm-server"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_json()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = GithubAdapter::with_base(Client::new(), server.uri(), 60);
        let now = Utc.with_ymd_and_hms(2026, 4, 4, 12, 0, 0).unwrap();

        let item = adapter.fetch_one("acme/tiny-llm-server", now).await.unwrap().unwrap();
        assert_eq!(item.id, "custom-gh-987");
        assert_eq!(item.source, "GitHub (Custom)");

        assert!(adapter.fetch_one("acme/gone", now).await.unwrap().is_none());
        assert!(adapter.fetch_one("no-slash", now).await.is_err());
    }
}
