//! Announcement sync.
//!
//! Periodically re-scrapes the banner page and reports banners that have not
//! been announced yet:
//! 1. Fetch and extract banners
//! 2. Drop expired banners
//! 3. Drop banners already in the ledger
//! 4. Record the rest (unless dry run)

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::models::BannerRecord;
use crate::service::{BannerService, ServiceError};
use crate::storage::{AnnouncementLedger, StorageConfig};
use crate::temporal::classify_by_time;

/// Errors that can occur during sync.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("Sync interval must be greater than 0")]
    ZeroInterval,
}

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Interval for periodic syncs
    pub interval: Duration,

    /// Report new banners without recording them
    pub dry_run: bool,

    pub storage: StorageConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 3600),
            dry_run: false,
            storage: StorageConfig::default(),
        }
    }
}

/// State of the sync loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
    pub last_sync_started: Option<DateTime<Utc>>,
    pub last_sync_completed: Option<DateTime<Utc>>,
    pub last_sync_status: SyncStatus,

    /// Banners announced in the last run
    pub banners_announced: u32,

    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// Result of a sync run.
#[derive(Debug, Clone)]
pub struct SyncResult {
    /// Banners seen for the first time, active ones first
    pub new_banners: Vec<BannerRecord>,

    /// Banners currently on the page that are not expired
    pub live_banners: usize,

    /// Candidates skipped or degraded during extraction
    pub skipped: usize,
    pub degraded_entities: usize,

    pub duration: Duration,
}

/// Announces banners once per stable id.
pub struct AnnouncementSync {
    config: SyncConfig,
    service: Arc<BannerService>,
    ledger: Mutex<AnnouncementLedger>,
    state: Arc<RwLock<SyncState>>,
    cancel_token: Arc<RwLock<bool>>,
}

impl AnnouncementSync {
    /// Create a sync loop, loading the ledger from disk.
    pub fn new(config: SyncConfig, service: Arc<BannerService>) -> Result<Self, SyncError> {
        if config.interval.is_zero() {
            return Err(SyncError::ZeroInterval);
        }

        let ledger = AnnouncementLedger::open(&config.storage)?;
        info!("Loaded {} announced banners", ledger.len());

        Ok(Self {
            config,
            service,
            ledger: Mutex::new(ledger),
            state: Arc::new(RwLock::new(SyncState::default())),
            cancel_token: Arc::new(RwLock::new(false)),
        })
    }

    /// Get current sync state.
    pub async fn state(&self) -> SyncState {
        self.state.read().await.clone()
    }

    /// Request the periodic loop to stop after the current run.
    pub async fn cancel(&self) {
        *self.cancel_token.write().await = true;
    }

    /// Run a single sync.
    pub async fn sync_once(&self) -> Result<SyncResult, SyncError> {
        self.sync_at(Utc::now()).await
    }

    /// Run a single sync as of `now`.
    pub async fn sync_at(&self, now: DateTime<Utc>) -> Result<SyncResult, SyncError> {
        // Runs are serialized by the ledger lock
        let mut ledger = self.ledger.lock().await;

        {
            let mut state = self.state.write().await;
            state.last_sync_started = Some(Utc::now());
            state.last_sync_status = SyncStatus::Running;
            state.errors.clear();
        }

        let start = std::time::Instant::now();
        info!("Starting sync");

        let outcome = self.run(&mut ledger, now).await;

        let mut state = self.state.write().await;
        state.last_sync_completed = Some(Utc::now());
        match &outcome {
            Ok(result) => {
                state.last_sync_status = SyncStatus::Completed;
                state.banners_announced = result.new_banners.len() as u32;
            }
            Err(e) => {
                state.last_sync_status = SyncStatus::Failed;
                state.banners_announced = 0;
                state.errors.push(e.to_string());
            }
        }

        outcome.map(|mut result| {
            result.duration = start.elapsed();
            info!(
                "Sync completed: {} new of {} live banners in {:?}",
                result.new_banners.len(),
                result.live_banners,
                result.duration
            );
            result
        })
    }

    async fn run(&self, ledger: &mut AnnouncementLedger, now: DateTime<Utc>) -> Result<SyncResult, SyncError> {
        let report = self.service.try_fetch_banners(now).await?;
        let buckets = classify_by_time(&report.banners, now);

        let fresh = ledger.unannounced(buckets.iter());
        if fresh.is_empty() {
            info!("No new banners");
        } else if self.config.dry_run {
            info!("Dry run: {} new banners not recorded", fresh.len());
        } else {
            ledger.record(&fresh, now)?;
        }

        Ok(SyncResult {
            new_banners: fresh.into_iter().cloned().collect(),
            live_banners: buckets.len(),
            skipped: report.skipped,
            degraded_entities: report.degraded_entities,
            duration: Duration::ZERO,
        })
    }

    /// Run syncs on a fixed interval until cancelled, handing each result to
    /// `on_result`.
    pub async fn run_periodic<F>(self: Arc<Self>, mut on_result: F)
    where
        F: FnMut(&SyncResult) + Send,
    {
        let mut ticker = interval(self.config.interval);

        info!("Starting periodic sync every {:?}", self.config.interval);

        loop {
            ticker.tick().await;

            if *self.cancel_token.read().await {
                info!("Periodic sync stopped");
                break;
            }

            match self.sync_once().await {
                Ok(result) => on_result(&result),
                Err(e) => {
                    error!("Periodic sync failed: {}", e);
                }
            }

            if *self.cancel_token.read().await {
                warn!("Cancellation requested, stopping after this run");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::fetch::StaticPage;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const FIXTURE: &str = include_str!("../../tests/fixtures/mixed_page.html");

    fn test_sync(temp_dir: &TempDir, dry_run: bool) -> AnnouncementSync {
        let service = BannerService::builder(AppConfig::default())
            .page_source(Arc::new(StaticPage(FIXTURE.to_string())))
            .build()
            .unwrap();
        let config = SyncConfig {
            interval: Duration::from_secs(60),
            dry_run,
            storage: StorageConfig::new(temp_dir.path().to_path_buf()),
        };
        AnnouncementSync::new(config, Arc::new(service)).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_sync_state_default() {
        let state = SyncState::default();
        assert_eq!(state.last_sync_status, SyncStatus::Idle);
        assert!(state.last_sync_started.is_none());
    }

    #[tokio::test]
    async fn test_second_sync_announces_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let sync = test_sync(&temp_dir, false);

        let first = sync.sync_at(now()).await.unwrap();
        assert!(!first.new_banners.is_empty());
        assert_eq!(first.new_banners.len(), first.live_banners);

        let second = sync.sync_at(now()).await.unwrap();
        assert!(second.new_banners.is_empty());

        let state = sync.state().await;
        assert_eq!(state.last_sync_status, SyncStatus::Completed);
        assert_eq!(state.banners_announced, 0);
    }

    #[tokio::test]
    async fn test_ledger_survives_restart() {
        let temp_dir = TempDir::new().unwrap();
        let announced = test_sync(&temp_dir, false).sync_at(now()).await.unwrap();
        assert!(!announced.new_banners.is_empty());

        let restarted = test_sync(&temp_dir, false);
        assert!(restarted.sync_at(now()).await.unwrap().new_banners.is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_does_not_record() {
        let temp_dir = TempDir::new().unwrap();
        let sync = test_sync(&temp_dir, true);

        let first = sync.sync_at(now()).await.unwrap();
        let second = sync.sync_at(now()).await.unwrap();
        assert_eq!(first.new_banners.len(), second.new_banners.len());
        assert!(!StorageConfig::new(temp_dir.path().to_path_buf())
            .announced_path()
            .exists());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let service = BannerService::builder(AppConfig::default())
            .page_source(Arc::new(StaticPage(String::new())))
            .build()
            .unwrap();
        let config = SyncConfig {
            interval: Duration::ZERO,
            dry_run: true,
            storage: StorageConfig::new(temp_dir.path().to_path_buf()),
        };

        let result = AnnouncementSync::new(config, Arc::new(service));
        assert!(matches!(result, Err(SyncError::ZeroInterval)));
    }

    #[tokio::test]
    async fn test_cancelled_loop_exits() {
        let temp_dir = TempDir::new().unwrap();
        let sync = Arc::new(test_sync(&temp_dir, true));
        sync.cancel().await;

        let mut runs = 0;
        sync.clone().run_periodic(|_| runs += 1).await;
        assert_eq!(runs, 0);
    }

    #[test]
    fn test_sync_status_serialization() {
        let status = SyncStatus::Running;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"running\"");

        let parsed: SyncStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SyncStatus::Running);
    }
}
