// src/services/orchestrator.rs
//! One scan cycle at a time: collect, append to history, analyze, predict, publish.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use log::{error, info, warn};
use serde::Serialize;
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::models::{AnalyzedItem, CustomTarget, CycleState, Prediction, ScanView, TrendItem};
use super::calculations::calculate_stats;
use super::fallback::fallback_items;
use super::history::HistoricalStore;
use super::predictions::build_predictions;
use super::registry::{RegistryError, TargetRegistry};
use super::scoring::ConfidenceScorer;
use super::sources::{collect_guarded, fetch_target, SourceAdapter};
use super::store::KvStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    CycleInProgress,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanError::CycleInProgress => write!(f, "A scan is already running"),
        }
    }
}

impl std::error::Error for ScanError {}

/// Holds the in-flight flag for the lifetime of one cycle, released even if the cycle panics.
struct CycleGuard(Arc<AtomicBool>);

impl CycleGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard(flag.clone()))
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A freshly registered target and its first reading, if the source had one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPreview {
    pub target: CustomTarget,
    pub item: Option<AnalyzedItem>,
}

pub struct Scanner {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    registry: Mutex<TargetRegistry>,
    history: Mutex<HistoricalStore>,
    scorer: ConfidenceScorer,
    adapter_timeout: Duration,
    in_flight: Arc<AtomicBool>,
    view: watch::Sender<ScanView>,
}

impl Scanner {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        registry: TargetRegistry,
        history: HistoricalStore,
        scorer: ConfidenceScorer,
        adapter_timeout: Duration,
    ) -> Self {
        let (view, _) = watch::channel(ScanView::default());
        Scanner {
            adapters,
            registry: Mutex::new(registry),
            history: Mutex::new(history),
            scorer,
            adapter_timeout,
            in_flight: Arc::new(AtomicBool::new(false)),
            view,
        }
    }

    /// Restores history and custom targets from `store`.
    pub async fn load(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        store: Arc<dyn KvStore>,
        scorer: ConfidenceScorer,
        adapter_timeout: Duration,
    ) -> Self {
        let registry = TargetRegistry::load(store.clone()).await;
        let history = HistoricalStore::load(store).await;
        Self::new(adapters, registry, history, scorer, adapter_timeout)
    }

    /// Read-only subscription to the published view.
    pub fn subscribe(&self) -> watch::Receiver<ScanView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> ScanView {
        self.view.borrow().clone()
    }

    pub fn predictions(&self) -> Vec<Prediction> {
        self.view.borrow().predictions.clone()
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Runs a cycle to completion on the current task.
    pub async fn run_cycle(&self) -> Result<ScanView, ScanError> {
        let guard = CycleGuard::acquire(&self.in_flight).ok_or(ScanError::CycleInProgress)?;
        Ok(self.execute(guard).await)
    }

    /// Claims the in-flight flag immediately and runs the cycle in the background.
    pub fn start_cycle(self: &Arc<Self>) -> Result<JoinHandle<ScanView>, ScanError> {
        let guard = CycleGuard::acquire(&self.in_flight).ok_or(ScanError::CycleInProgress)?;
        let scanner = Arc::clone(self);
        Ok(tokio::spawn(async move { scanner.execute(guard).await }))
    }

    async fn execute(&self, _guard: CycleGuard) -> ScanView {
        match AssertUnwindSafe(self.try_execute()).catch_unwind().await {
            Ok(view) => view,
            Err(panic) => self.record_failure(&panic_message(panic.as_ref())),
        }
    }

    async fn try_execute(&self) -> ScanView {
        let now = Utc::now();
        debug_assert!(self.view.borrow().cycle_state.is_settled());
        self.set_state(CycleState::Collecting);
        info!("Scan started at {}", now);

        let items = self.collect(now).await;
        if items.is_empty() {
            warn!("No items collected from any source, publishing fallback data");
            return self.publish_fallback(now).await;
        }

        self.set_state(CycleState::Analyzing);
        let (analyzed, tracked_items) = {
            let mut history = self.history.lock().await;
            for item in &items {
                history.append(&item.id, &item.raw_metrics, now);
            }
            history.persist().await;
            (self.scorer.analyze_all(items, &history, now), history.len())
        };

        self.set_state(CycleState::Predicting);
        let predictions = build_predictions(&analyzed, &self.scorer.config().predictions);
        info!("Analyzed {} items, {} predictions", analyzed.len(), predictions.len());

        self.publish(analyzed, predictions, tracked_items, now)
    }

    /// Custom targets first, then discovery; the first item seen for an id wins.
    async fn collect(&self, now: DateTime<Utc>) -> Vec<TrendItem> {
        let targets = self.registry.lock().await.targets().to_vec();

        let custom = join_all(
            targets
                .iter()
                .map(|target| fetch_target(&self.adapters, target, now, self.adapter_timeout)),
        );
        let discovered = join_all(
            self.adapters
                .iter()
                .map(|adapter| collect_guarded(adapter.clone(), now, self.adapter_timeout)),
        );
        let (custom, discovered) = futures::join!(custom, discovered);

        let custom: Vec<TrendItem> = custom.into_iter().flatten().collect();
        info!("Fetched {} of {} custom targets", custom.len(), targets.len());

        let mut seen = HashSet::new();
        custom
            .into_iter()
            .chain(discovered.into_iter().flatten())
            .filter(|item| seen.insert(item.id.clone()))
            .collect()
    }

    async fn publish_fallback(&self, now: DateTime<Utc>) -> ScanView {
        let items = fallback_items(now);
        let predictions = build_predictions(&items, &self.scorer.config().predictions);
        let tracked_items = self.history.lock().await.len();
        self.publish(items, predictions, tracked_items, now)
    }

    fn publish(
        &self,
        items: Vec<AnalyzedItem>,
        predictions: Vec<Prediction>,
        tracked_items: usize,
        now: DateTime<Utc>,
    ) -> ScanView {
        let stats = calculate_stats(&items, predictions.len(), tracked_items);
        self.view.send_modify(|view| {
            view.items = items;
            view.predictions = predictions;
            view.stats = stats;
            view.cycle_state = CycleState::Complete;
            view.error = None;
            view.last_update = Some(now);
        });
        info!("Scan complete");
        self.view()
    }

    /// Keeps the last published items; substitutes the fallback set if there are none.
    fn record_failure(&self, cause: &str) -> ScanView {
        error!("Scan cycle failed: {}", cause);
        let now = Utc::now();
        let rules = &self.scorer.config().predictions;
        self.view.send_modify(|view| {
            view.cycle_state = CycleState::Error;
            view.error = Some(format!("Failed to fetch trend data: {}. Using fallback data.", cause));
            if view.items.is_empty() {
                let items = fallback_items(now);
                let predictions = build_predictions(&items, rules);
                view.stats = calculate_stats(&items, predictions.len(), view.stats.tracked_items);
                view.items = items;
                view.predictions = predictions;
            }
        });
        self.view()
    }

    fn set_state(&self, state: CycleState) {
        self.view.send_modify(|view| {
            view.cycle_state = state;
            if state == CycleState::Collecting {
                view.error = None;
            }
        });
    }

    pub async fn targets(&self) -> Vec<CustomTarget> {
        self.registry.lock().await.targets().to_vec()
    }

    /// Registers `url`, takes one reading of it and shows that reading in the published
    /// view right away. History is left to the next cycle.
    pub async fn add_target(&self, url: &str) -> Result<TargetPreview, RegistryError> {
        let now = Utc::now();
        let target = self.registry.lock().await.register(url, now).await?;

        let item = match fetch_target(&self.adapters, &target, now, self.adapter_timeout).await {
            Some(item) => {
                let history = self.history.lock().await;
                let analysis = self.scorer.analyze(&item, history.get(&item.id), now);
                Some(AnalyzedItem { item, analysis })
            }
            None => None,
        };
        if let Some(preview) = &item {
            self.show_preview(preview.clone());
        }
        Ok(TargetPreview { target, item })
    }

    fn show_preview(&self, preview: AnalyzedItem) {
        let rules = &self.scorer.config().predictions;
        self.view.send_modify(|view| {
            view.items.retain(|t| t.item.id != preview.item.id);
            view.items.push(preview);
            view.items.sort_by(|a, b| b.analysis.confidence.cmp(&a.analysis.confidence));
            view.predictions = build_predictions(&view.items, rules);
            view.stats = calculate_stats(&view.items, view.predictions.len(), view.stats.tracked_items);
        });
    }

    pub async fn remove_target(&self, url: &str) -> bool {
        self.registry.lock().await.remove(url).await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unexpected failure".to_string()
    }
}
