//! Service configuration: source endpoints, defaults and environment parsing.

use log::warn;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// GitHub REST API base URL
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Hacker News Firebase API base URL
pub const HN_API_BASE: &str = "https://hacker-news.firebaseio.com/v0";

/// Reddit JSON endpoints base URL
pub const REDDIT_BASE: &str = "https://www.reddit.com";

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; trend-pulse/0.1)";

/// Default cron expression (sec min hour dom month dow): top of every hour
pub const DEFAULT_SCAN_SCHEDULE: &str = "0 0 * * * *";

pub const DEFAULT_PORT: u16 = 3030;
pub const DEFAULT_ADAPTER_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_GITHUB_LOOKBACK_DAYS: i64 = 60;
pub const DEFAULT_HN_STORY_LIMIT: usize = 30;
pub const DEFAULT_SUBREDDITS: &[&str] = &["technology", "startups", "artificial", "MachineLearning", "programming"];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// `None` keeps all state in memory.
    pub data_dir: Option<PathBuf>,
    /// Shared secret for the scheduled trigger endpoint. `None` disables it.
    pub cron_secret: Option<String>,
    pub scan_schedule: String,
    pub adapter_timeout: Duration,
    pub github_lookback_days: i64,
    pub hn_story_limit: usize,
    pub subreddits: Vec<String>,
    pub scoring_config: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            port: DEFAULT_PORT,
            data_dir: None,
            cron_secret: None,
            scan_schedule: DEFAULT_SCAN_SCHEDULE.to_string(),
            adapter_timeout: Duration::from_secs(DEFAULT_ADAPTER_TIMEOUT_SECS),
            github_lookback_days: DEFAULT_GITHUB_LOOKBACK_DAYS,
            hn_story_limit: DEFAULT_HN_STORY_LIMIT,
            subreddits: DEFAULT_SUBREDDITS.iter().map(|s| s.to_string()).collect(),
            scoring_config: None,
        }
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed_or<T: FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match non_empty(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("${} is not valid ({}), defaulting to {}", name, raw, default);
            default
        }),
        None => default,
    }
}

impl AppConfig {
    /// Reads the environment (call `dotenv().ok()` first to pick up `.env`).
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();

        let port = match non_empty("PORT") {
            Some(_) => parsed_or("PORT", DEFAULT_PORT),
            None => {
                warn!("$PORT not set, defaulting to {}", DEFAULT_PORT);
                DEFAULT_PORT
            }
        };

        let data_dir = non_empty("DATA_DIR").map(PathBuf::from);
        if data_dir.is_none() {
            warn!("$DATA_DIR not set, history and custom targets will not survive a restart");
        }

        let cron_secret = non_empty("CRON_SECRET");
        if cron_secret.is_none() {
            warn!("$CRON_SECRET not set, the scheduled trigger endpoint will reject every request");
        }

        let subreddits = non_empty("SUBREDDITS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.subreddits);

        AppConfig {
            port,
            data_dir,
            cron_secret,
            scan_schedule: non_empty("SCAN_SCHEDULE").unwrap_or(defaults.scan_schedule),
            adapter_timeout: Duration::from_secs(parsed_or("ADAPTER_TIMEOUT_SECS", DEFAULT_ADAPTER_TIMEOUT_SECS)),
            github_lookback_days: parsed_or("GITHUB_LOOKBACK_DAYS", DEFAULT_GITHUB_LOOKBACK_DAYS),
            hn_story_limit: parsed_or("HN_STORY_LIMIT", DEFAULT_HN_STORY_LIMIT),
            subreddits,
            scoring_config: non_empty("SCORING_CONFIG").map(PathBuf::from),
        }
    }
}
