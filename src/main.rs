use anyhow::{anyhow, Context, Result};
use dotenv::dotenv;
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use warp::Filter;

use trend_pulse::config::AppConfig;
use trend_pulse::routes;
use trend_pulse::services::orchestrator::Scanner;
use trend_pulse::services::scoring::{ConfidenceScorer, ScoringConfig};
use trend_pulse::services::sources::{default_adapters, http_client};
use trend_pulse::services::store::{FileStore, KvStore, MemoryStore};

async fn open_store(config: &AppConfig) -> Result<Arc<dyn KvStore>> {
    Ok(match &config.data_dir {
        Some(dir) => {
            info!("Persisting state under {}", dir.display());
            Arc::new(FileStore::new(dir.clone()).await?)
        }
        None => Arc::new(MemoryStore::new()),
    })
}

fn load_scoring(config: &AppConfig) -> ScoringConfig {
    match &config.scoring_config {
        Some(path) => ScoringConfig::from_file(path).unwrap_or_else(|e| {
            warn!("Could not read scoring config {}: {:#}, using defaults", path.display(), e);
            ScoringConfig::default()
        }),
        None => ScoringConfig::default(),
    }
}

async fn start_scheduler(scanner: Arc<Scanner>, schedule: &str) -> Result<JobScheduler> {
    let sched = JobScheduler::new()
        .await
        .map_err(|e| anyhow!("creating scheduler: {:?}", e))?;

    let job = Job::new_async(schedule, move |_uuid, _l| {
        let scanner = scanner.clone();
        Box::pin(async move {
            match scanner.start_cycle() {
                Ok(_) => info!("Scheduled scan started"),
                Err(e) => warn!("Skipping scheduled scan: {}", e),
            }
        })
    })
    .map_err(|e| anyhow!("creating scan job for '{}': {:?}", schedule, e))?;

    sched.add(job).await.map_err(|e| anyhow!("adding scan job: {:?}", e))?;
    sched.start().await.map_err(|e| anyhow!("starting scheduler: {:?}", e))?;
    info!("Scan scheduled with '{}'", schedule);
    Ok(sched)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    let config = AppConfig::from_env();
    let store = open_store(&config).await?;
    let client = http_client(config.adapter_timeout).context("building HTTP client")?;

    let scanner = Arc::new(
        Scanner::load(
            default_adapters(client, &config),
            store,
            ConfidenceScorer::new(load_scoring(&config)),
            config.adapter_timeout,
        )
        .await,
    );

    // first results without waiting for the schedule
    if let Err(e) = scanner.start_cycle() {
        warn!("Initial scan not started: {}", e);
    }
    let _sched = start_scheduler(scanner.clone(), &config.scan_schedule).await?;

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!("Will bind to: {}", addr);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "DELETE"]);

    let api = routes::routes(scanner, config.cron_secret.clone()).with(cors);
    info!("Routes configured successfully with CORS.");

    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;
    Ok(())
}
