use anyhow::Result;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// How often counters are snapshotted to the stats file.
pub const STATS_INTERVAL: Duration = Duration::from_secs(1);

/// The persisted stats document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(rename = "req_per_second", default)]
    pub requests_per_second: u64,
    #[serde(rename = "req_counter", default)]
    pub request_counter: u64,
}

/// Request counters shared by every handler.
///
/// `per_interval` counts requests since the last tick, `total` is everything before that.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    per_interval: AtomicU64,
    total: AtomicU64,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a previously persisted snapshot.
    pub fn from_snapshot(snapshot: StatsSnapshot) -> Self {
        Self { per_interval: AtomicU64::new(snapshot.requests_per_second), total: AtomicU64::new(snapshot.request_counter) }
    }

    pub fn record_request(&self) {
        self.per_interval.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the counters, then fold the interval count into the total and reset it.
    ///
    /// The returned snapshot's `request_counter` therefore excludes its own
    /// `requests_per_second`; the next snapshot includes it.
    pub fn tick(&self) -> StatsSnapshot {
        let requests_per_second = self.per_interval.swap(0, Ordering::AcqRel);
        let request_counter = self.total.fetch_add(requests_per_second, Ordering::AcqRel);
        StatsSnapshot { requests_per_second, request_counter }
    }

    /// Current values without advancing the interval.
    pub fn peek(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_per_second: self.per_interval.load(Ordering::Acquire),
            request_counter: self.total.load(Ordering::Acquire),
        }
    }
}

/// JSON file the snapshots are written to.
#[derive(Debug, Clone)]
pub struct StatsStore {
    path: PathBuf,
}

impl StatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last snapshot, falling back to zeroed counters when the file is missing or corrupt.
    pub async fn load(&self) -> StatsSnapshot {
        if !self.path.exists() {
            debug!("No stats file at {}, starting from zero", self.path.display());
            return StatsSnapshot::default();
        }
        match self.try_load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to read stats file {}: {}, starting from zero", self.path.display(), e);
                StatsSnapshot::default()
            }
        }
    }

    async fn try_load(&self) -> Result<StatsSnapshot> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn save(&self, snapshot: &StatsSnapshot) -> Result<()> {
        let content = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

/// Persist a snapshot every [`STATS_INTERVAL`] until the task is dropped.
pub async fn run_stats_loop(stats: Arc<StatsAggregator>, store: StatsStore) {
    let mut ticker = tokio::time::interval(STATS_INTERVAL);
    // The first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        persist_tick(&stats, &store).await;
    }
}

/// One tick of the stats loop. Persistence failures are logged and the snapshot is dropped.
pub async fn persist_tick(stats: &StatsAggregator, store: &StatsStore) -> StatsSnapshot {
    let snapshot = stats.tick();
    trace!("Stats snapshot: {:?}", snapshot);
    if let Err(e) = store.save(&snapshot).await {
        warn!("Failed to persist stats to {}: {}", store.path().display(), e);
    }
    snapshot
}
