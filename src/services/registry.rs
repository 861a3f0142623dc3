// src/services/registry.rs
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::models::{CustomTarget, SourceType};
use super::store::{KvStore, CUSTOM_URLS_KEY};

const GENERIC_ID_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    EmptyUrl,
    DuplicateTarget(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RegistryError::EmptyUrl => write!(f, "Please enter a URL"),
            RegistryError::DuplicateTarget(url) => write!(f, "Already tracking {}", url),
        }
    }
}

impl std::error::Error for RegistryError {}

/// How the item id is pulled out of a matching URL.
enum IdRule {
    /// Join all capture groups with `/`.
    Captures,
    /// The URL itself identifies the item.
    WholeUrl,
}

/// Ordered URL conventions; the first match wins, anything else is generic.
pub struct UrlClassifier {
    patterns: Vec<(SourceType, Regex, IdRule)>,
}

impl Default for UrlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlClassifier {
    pub fn new() -> Self {
        let rules = [
            (SourceType::Github, r"^(?:https?://)?(?:www\.)?github\.com/([^/?#]+)/([^/?#]+?)(?:\.git)?(?:[/?#]|$)", IdRule::Captures),
            (SourceType::Hackernews, r"^(?:https?://)?news\.ycombinator\.com/.*[?&]id=(\d+)", IdRule::Captures),
            (SourceType::Reddit, r"^(?:https?://)?(?:[\w-]+\.)?reddit\.com/.*comments/([^/?#]+)", IdRule::Captures),
            (SourceType::Twitter, r"^(?:https?://)?(?:www\.|mobile\.)?(?:twitter|x)\.com/.*status/(\d+)", IdRule::Captures),
            (SourceType::Linkedin, r"^(?:https?://)?(?:[\w-]+\.)?linkedin\.com(?:[/?#]|$)", IdRule::WholeUrl),
            (SourceType::Youtube, r"^(?:https?://)?(?:(?:www\.|m\.)?youtube\.com/watch\?(?:[^#]*&)?v=|youtu\.be/)([^&?#/]+)", IdRule::Captures),
            (SourceType::Blog, r"^(?:https?://)?(?:[\w-]+\.)?(?:medium\.com|substack\.com|dev\.to)(?:[/?#]|$)", IdRule::WholeUrl),
        ];

        UrlClassifier {
            patterns: rules
                .into_iter()
                .map(|(kind, pattern, rule)| (kind, Regex::new(pattern).unwrap(), rule))
                .collect(),
        }
    }

    /// Never fails: unknown shapes become `generic` with an id cut from the URL text.
    pub fn classify(&self, url: &str) -> (SourceType, String) {
        for (kind, re, rule) in &self.patterns {
            let Some(caps) = re.captures(url) else {
                continue;
            };
            let item_id = match rule {
                IdRule::WholeUrl => url.to_string(),
                IdRule::Captures => caps
                    .iter()
                    .skip(1)
                    .flatten()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join("/"),
            };
            if !item_id.is_empty() {
                return (*kind, item_id);
            }
        }
        (SourceType::Generic, generic_item_id(url))
    }
}

/// Scheme stripped, first 50 characters.
pub fn generic_item_id(url: &str) -> String {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    rest.chars().take(GENERIC_ID_LEN).collect()
}

/// User-declared tracking targets, persisted under `custom_urls`.
pub struct TargetRegistry {
    targets: Vec<CustomTarget>,
    classifier: UrlClassifier,
    store: Arc<dyn KvStore>,
}

impl TargetRegistry {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        TargetRegistry {
            targets: Vec::new(),
            classifier: UrlClassifier::new(),
            store,
        }
    }

    pub async fn load(store: Arc<dyn KvStore>) -> Self {
        let mut registry = Self::new(store);
        match registry.store.load(CUSTOM_URLS_KEY).await {
            Ok(Some(text)) => match serde_json::from_str::<Vec<CustomTarget>>(&text) {
                Ok(targets) => {
                    info!("Loaded {} custom targets", targets.len());
                    registry.targets = targets;
                }
                Err(e) => warn!("Discarding unreadable custom targets: {}", e),
            },
            Ok(None) => info!("No custom URLs yet"),
            Err(e) => error!("Failed to load custom targets: {}", e),
        }
        registry
    }

    pub fn classify(&self, url: &str) -> (SourceType, String) {
        self.classifier.classify(url)
    }

    pub fn targets(&self) -> &[CustomTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub async fn register(&mut self, url: &str, now: DateTime<Utc>) -> Result<CustomTarget, RegistryError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(RegistryError::EmptyUrl);
        }
        if self.targets.iter().any(|t| t.url == url) {
            return Err(RegistryError::DuplicateTarget(url.to_string()));
        }

        let (source_type, item_id) = self.classifier.classify(url);
        let target = CustomTarget {
            url: url.to_string(),
            source_type,
            item_id,
            added_at: now,
        };
        info!("Tracking {} as {} ({})", target.url, source_type.as_str(), target.item_id);
        self.targets.push(target.clone());
        self.persist().await;
        Ok(target)
    }

    /// Returns whether anything was removed.
    pub async fn remove(&mut self, url: &str) -> bool {
        let url = url.trim();
        let before = self.targets.len();
        self.targets.retain(|t| t.url != url);
        let removed = self.targets.len() != before;
        if removed {
            info!("Stopped tracking {}", url);
            self.persist().await;
        }
        removed
    }

    async fn persist(&self) {
        let result = match serde_json::to_string(&self.targets) {
            Ok(text) => self.store.save(CUSTOM_URLS_KEY, &text).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            error!("Error saving custom URLs: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryStore;

    #[test]
    fn known_conventions_are_recognised() {
        let c = UrlClassifier::new();
        let cases = [
            ("https://github.com/tokio-rs/tokio", SourceType::Github, "tokio-rs/tokio"),
            ("https://github.com/tokio-rs/tokio/tree/master/tokio", SourceType::Github, "tokio-rs/tokio"),
            ("https://github.com/rust-lang/rust.git", SourceType::Github, "rust-lang/rust"),
            ("https://news.ycombinator.com/item?id=38490000", SourceType::Hackernews, "38490000"),
            ("https://www.reddit.com/r/rust/comments/1b2c3d/some_title/", SourceType::Reddit, "1b2c3d"),
            ("https://x.com/someone/status/17770001", SourceType::Twitter, "17770001"),
            ("https://twitter.com/someone/status/42", SourceType::Twitter, "42"),
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10", SourceType::Youtube, "dQw4w9WgXcQ"),
            ("https://youtu.be/dQw4w9WgXcQ", SourceType::Youtube, "dQw4w9WgXcQ"),
        ];
        for (url, kind, id) in cases {
            assert_eq!(c.classify(url), (kind, id.to_string()), "{}", url);
        }
    }

    #[test]
    fn whole_url_conventions_keep_the_url_as_id() {
        let c = UrlClassifier::new();
        let url = "https://www.linkedin.com/posts/someone_activity-123";
        assert_eq!(c.classify(url), (SourceType::Linkedin, url.to_string()));
        let blog = "https://someone.substack.com/p/a-post";
        assert_eq!(c.classify(blog), (SourceType::Blog, blog.to_string()));
    }

    #[test]
    fn unknown_urls_fall_back_to_generic() {
        let c = UrlClassifier::new();
        let url = "https://example.com/a/very/long/path/that/keeps/going/and/going/forever";
        let (kind, id) = c.classify(url);
        assert_eq!(kind, SourceType::Generic);
        assert_eq!(id, "example.com/a/very/long/path/that/keeps/going/and/");
        assert_eq!(id.chars().count(), 50);
    }

    #[test]
    fn partial_known_shapes_fall_through() {
        let c = UrlClassifier::new();
        // no repo segment, no post id
        assert_eq!(c.classify("https://github.com/tokio-rs").0, SourceType::Generic);
        assert_eq!(c.classify("https://news.ycombinator.com/news").0, SourceType::Generic);
        // lookalike host
        assert_eq!(c.classify("https://notgithub.com/a/b").0, SourceType::Generic);
    }

    #[tokio::test]
    async fn duplicate_registration_leaves_registry_unchanged() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let mut registry = TargetRegistry::new(store.clone());

        let target = registry.register("https://github.com/owner/repo", Utc::now()).await.unwrap();
        assert_eq!(target.source_type, SourceType::Github);
        assert_eq!(target.item_id, "owner/repo");

        let err = registry.register("https://github.com/owner/repo", Utc::now()).await.unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTarget("https://github.com/owner/repo".to_string()));
        assert_eq!(registry.len(), 1);

        let reloaded = TargetRegistry::load(store).await;
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.targets()[0].item_id, "owner/repo");
    }

    #[tokio::test]
    async fn blank_urls_are_rejected() {
        let mut registry = TargetRegistry::new(Arc::new(MemoryStore::new()));
        assert_eq!(registry.register("   ", Utc::now()).await, Err(RegistryError::EmptyUrl));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn unmatched_url_still_registers() {
        let mut registry = TargetRegistry::new(Arc::new(MemoryStore::new()));
        let target = registry.register("http://my-site.example/launch", Utc::now()).await.unwrap();
        assert_eq!(target.source_type, SourceType::Generic);
        assert_eq!(target.item_id, "my-site.example/launch");
    }

    #[tokio::test]
    async fn remove_is_a_no_op_for_unknown_urls() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let mut registry = TargetRegistry::new(store.clone());
        registry.register("https://dev.to/someone/post", Utc::now()).await.unwrap();

        assert!(!registry.remove("https://dev.to/other").await);
        assert_eq!(registry.len(), 1);
        assert!(registry.remove("https://dev.to/someone/post").await);
        assert!(registry.is_empty());
        assert!(TargetRegistry::load(store).await.is_empty());
    }
}
