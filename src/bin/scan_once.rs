// src/bin/scan_once.rs
//! Runs one scan against the live sources and prints the ranked result.

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;

use trend_pulse::config::AppConfig;
use trend_pulse::services::orchestrator::Scanner;
use trend_pulse::services::scoring::{ConfidenceScorer, ScoringConfig};
use trend_pulse::services::sources::{default_adapters, http_client};
use trend_pulse::services::store::{FileStore, KvStore, MemoryStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env();
    let store: Arc<dyn KvStore> = match &config.data_dir {
        Some(dir) => Arc::new(FileStore::new(dir.clone()).await?),
        None => Arc::new(MemoryStore::new()),
    };
    let scoring = match &config.scoring_config {
        Some(path) => ScoringConfig::from_file(path)?,
        None => ScoringConfig::default(),
    };
    let client = http_client(config.adapter_timeout).context("building HTTP client")?;

    let scanner = Scanner::load(
        default_adapters(client, &config),
        store,
        ConfidenceScorer::new(scoring),
        config.adapter_timeout,
    )
    .await;
    let view = scanner.run_cycle().await?;

    println!("State: {:?}", view.cycle_state);
    if let Some(error) = &view.error {
        println!("Error: {}", error);
    }
    println!(
        "{} trends, {} signals, avg confidence {}, {} tracked\n",
        view.stats.trends, view.stats.signals, view.stats.avg_confidence, view.stats.tracked_items
    );

    for trend in &view.items {
        println!(
            "{:>3}%  {:<18} {:<24} {}",
            trend.analysis.confidence,
            trend.analysis.prediction_label.to_string(),
            trend.item.source,
            trend.item.name
        );
    }

    println!("\nPredictions:");
    for prediction in &view.predictions {
        println!(
            "  {} in ~{} days: {}",
            prediction.trend.item.name, prediction.estimated_breakout_days, prediction.reasoning
        );
    }
    Ok(())
}
