//! # Sync Orchestrator
//!
//! Owns scheduling and status for every connected provider.
//!
//! ## Entry points
//!
//! - [`SyncOrchestrator::sync_all`]: syncs every provider whose last
//!   completion is older than the staleness threshold (or all of them when
//!   forced), then runs the dedup pass and stamps the full-sync time.
//! - [`SyncOrchestrator::sync_source`]: syncs one provider regardless of
//!   staleness, then runs the dedup pass.
//! - [`SyncOrchestrator::disconnect`]: removes a provider and its data.
//!
//! All three wait on one [`RunQueue`], so at most one of them touches
//! storage at a time.
//!
//! ## Failure handling
//!
//! - A failed track phase ends that provider's run.
//! - A failed playlist or album phase is rolled back and logged; the other
//!   phases still run and the provider ends in `error` with the first
//!   failure.
//! - One provider's failure never stops its siblings.
//! - Dedup failures are logged and otherwise ignored.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let orchestrator = Arc::new(SyncOrchestrator::new(store, settings, clock, bus, &config));
//! orchestrator.register_adapter(local_adapter).await;
//! orchestrator.restore().await?;
//!
//! let report = orchestrator.sync_all(false).await;
//! if let Some(message) = orchestrator.first_error().await {
//!     // show message, offer orchestrator.retry()
//! }
//! ```

use crate::adapter::{ProviderAdapter, SyncPhase, SyncSummary};
use crate::dedup::{DedupPass, DedupReport};
use crate::error::{Result, SyncError};
use crate::queue::{RunQueue, RunTicket};
use crate::reconcile::MergePolicy;
use crate::status::ProviderSyncStatus;
use bridge_traits::{Clock, SettingsStore};
use core_async::sync::RwLock;
use core_async::task::JoinHandle;
use core_async::time::Instant;
use core_auth::ProviderKind;
use core_library::{LibraryStore, ProviderPurge};
use core_runtime::config::SyncConfig;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, SyncEvent};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Settings key prefix for per-provider completion times.
pub const LAST_COMPLETED_KEY_PREFIX: &str = "sync.last_completed.";

/// Settings key for the last `sync_all` completion time.
pub const LAST_FULL_SYNC_KEY: &str = "sync.last_full_sync";

fn last_completed_key(provider: ProviderKind) -> String {
    format!("{}{}", LAST_COMPLETED_KEY_PREFIX, provider.as_str())
}

/// Result of one provider run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRunReport {
    pub provider: ProviderKind,
    /// Phases that committed, in execution order
    pub phases: Vec<(SyncPhase, SyncSummary)>,
    /// Phases that failed with their messages
    pub errors: Vec<(SyncPhase, String)>,
    /// Status after the run
    pub status: ProviderSyncStatus,
    pub duration_ms: u64,
}

impl ProviderRunReport {
    fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            phases: Vec::new(),
            errors: Vec::new(),
            status: ProviderSyncStatus::Syncing,
            duration_ms: 0,
        }
    }

    pub fn summary(&self, phase: SyncPhase) -> Option<&SyncSummary> {
        self.phases
            .iter()
            .find(|(p, _)| *p == phase)
            .map(|(_, summary)| summary)
    }

    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Result of [`SyncOrchestrator::sync_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncAllReport {
    pub providers: Vec<ProviderRunReport>,
    /// Providers left alone because their last sync is still fresh
    pub skipped: Vec<ProviderKind>,
    pub merged_duplicates: u64,
    pub finished_at: i64,
}

#[derive(Debug, Default)]
struct OrchestratorState {
    statuses: HashMap<ProviderKind, ProviderSyncStatus>,
    last_completed: HashMap<ProviderKind, i64>,
    last_full_sync: Option<i64>,
}

/// Schedules provider runs and tracks their status.
pub struct SyncOrchestrator {
    store: Arc<dyn LibraryStore>,
    adapters: RwLock<Vec<Arc<dyn ProviderAdapter>>>,
    state: RwLock<OrchestratorState>,
    queue: RunQueue,
    dedup: DedupPass,
    settings: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    staleness_threshold: Duration,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn LibraryStore>,
        settings: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
        config: &SyncConfig,
    ) -> Self {
        Self {
            store,
            adapters: RwLock::new(Vec::new()),
            state: RwLock::new(OrchestratorState::default()),
            queue: RunQueue::new(),
            dedup: DedupPass::default(),
            settings,
            clock,
            event_bus,
            staleness_threshold: config.staleness_threshold,
        }
    }

    /// Primary provider used by the dedup pass.
    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.dedup = DedupPass::new(policy);
        self
    }

    /// Connects a provider, replacing any adapter already registered for it.
    pub async fn register_adapter(&self, adapter: Arc<dyn ProviderAdapter>) {
        let provider = adapter.provider();
        {
            let mut adapters = self.adapters.write().await;
            adapters.retain(|a| a.provider() != provider);
            adapters.push(adapter);
        }
        self.state
            .write()
            .await
            .statuses
            .entry(provider)
            .or_default();
        info!(provider = %provider, "Provider adapter registered");
    }

    pub async fn connected_providers(&self) -> Vec<ProviderKind> {
        self.adapters
            .read()
            .await
            .iter()
            .map(|a| a.provider())
            .collect()
    }

    /// Reloads persisted completion times.
    ///
    /// Providers with a stored time start out `completed` at that time so
    /// the staleness check survives restarts.
    pub async fn restore(&self) -> Result<()> {
        let mut restored = OrchestratorState::default();
        for provider in ProviderKind::ALL {
            if let Some(at) = self.settings.get_i64(&last_completed_key(provider)).await? {
                restored.last_completed.insert(provider, at);
                restored
                    .statuses
                    .insert(provider, ProviderSyncStatus::Completed { at });
            }
        }
        restored.last_full_sync = self.settings.get_i64(LAST_FULL_SYNC_KEY).await?;

        let mut state = self.state.write().await;
        for (provider, status) in restored.statuses {
            state.statuses.insert(provider, status);
        }
        state.last_completed.extend(restored.last_completed);
        state.last_full_sync = restored.last_full_sync;
        debug!(
            providers = state.last_completed.len(),
            last_full_sync = ?state.last_full_sync,
            "Restored sync timestamps"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Syncs every stale provider (or all of them when `force`), then
    /// deduplicates.
    #[instrument(skip(self))]
    pub async fn sync_all(&self, force: bool) -> SyncAllReport {
        let _ticket = self.queue.enter().await;
        let adapters = self.adapters.read().await.clone();
        let now = self.clock.unix_timestamp();

        let mut providers = Vec::new();
        let mut skipped = Vec::new();
        for adapter in &adapters {
            let provider = adapter.provider();
            if !force && !self.is_stale(provider, now).await {
                debug!(provider = %provider, "Last sync is fresh, skipping");
                self.emit(CoreEvent::Sync(SyncEvent::Skipped {
                    provider: provider.as_str().to_string(),
                    reason: "last sync is within the staleness threshold".to_string(),
                }));
                skipped.push(provider);
                continue;
            }
            providers.push(self.run_provider(adapter, force).await);
        }

        let merged_duplicates = self.run_dedup().await;

        let finished_at = self.clock.unix_timestamp();
        self.state.write().await.last_full_sync = Some(finished_at);
        if let Err(e) = self.settings.set_i64(LAST_FULL_SYNC_KEY, finished_at).await {
            warn!(error = %e, "Failed to persist full sync time");
        }

        info!(
            ran = providers.len(),
            skipped = skipped.len(),
            merged_duplicates,
            "Full sync finished"
        );
        SyncAllReport {
            providers,
            skipped,
            merged_duplicates,
            finished_at,
        }
    }

    /// Forced [`sync_all`](Self::sync_all); what a retry affordance calls.
    pub async fn retry(&self) -> SyncAllReport {
        self.sync_all(true).await
    }

    /// Syncs one provider regardless of staleness, then deduplicates.
    #[instrument(skip(self))]
    pub async fn sync_source(&self, provider: ProviderKind) -> Result<ProviderRunReport> {
        let _ticket = self.queue.enter().await;
        let adapter = self
            .adapter(provider)
            .await
            .ok_or(SyncError::ProviderNotConnected(provider))?;

        let report = self.run_provider(&adapter, true).await;
        self.run_dedup().await;
        Ok(report)
    }

    /// Runs [`sync_all`](Self::sync_all) on a spawned task.
    pub fn spawn_sync_all(self: &Arc<Self>, force: bool) -> JoinHandle<SyncAllReport> {
        let this = Arc::clone(self);
        core_async::task::spawn(async move { this.sync_all(force).await })
    }

    /// Disconnects a provider and deletes everything it contributed.
    ///
    /// Tracks still referenced by another provider are kept.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, provider: ProviderKind) -> Result<ProviderPurge> {
        let _ticket = self.queue.enter().await;
        self.adapters
            .write()
            .await
            .retain(|a| a.provider() != provider);

        let mut session = self.store.open_session().await?;
        let purge = session.delete_provider_data(provider).await?;
        session.save().await?;
        drop(session);

        {
            let mut state = self.state.write().await;
            state.statuses.remove(&provider);
            state.last_completed.remove(&provider);
        }
        self.settings.delete(&last_completed_key(provider)).await?;

        self.emit(CoreEvent::Library(LibraryEvent::ProviderDisconnected {
            provider: provider.as_str().to_string(),
            tracks_removed: purge.orphaned_tracks,
        }));
        info!(provider = %provider, ?purge, "Provider disconnected");
        Ok(purge)
    }

    // ------------------------------------------------------------------
    // Status surface
    // ------------------------------------------------------------------

    pub async fn status(&self, provider: ProviderKind) -> ProviderSyncStatus {
        self.state
            .read()
            .await
            .statuses
            .get(&provider)
            .cloned()
            .unwrap_or_default()
    }

    /// Status of every known provider in declaration order.
    pub async fn statuses(&self) -> Vec<(ProviderKind, ProviderSyncStatus)> {
        let state = self.state.read().await;
        ProviderKind::ALL
            .iter()
            .filter_map(|p| state.statuses.get(p).map(|s| (*p, s.clone())))
            .collect()
    }

    /// Message of the first provider in error, for display.
    pub async fn first_error(&self) -> Option<String> {
        let state = self.state.read().await;
        ProviderKind::ALL
            .iter()
            .filter_map(|p| state.statuses.get(p))
            .find_map(|s| s.error_message().map(str::to_string))
    }

    pub async fn last_completed(&self, provider: ProviderKind) -> Option<i64> {
        self.state.read().await.last_completed.get(&provider).copied()
    }

    pub async fn last_full_sync(&self) -> Option<i64> {
        self.state.read().await.last_full_sync
    }

    pub fn is_running(&self) -> bool {
        self.queue.is_busy()
    }

    /// Waits for the run in flight and every queued request, then holds the
    /// queue until the returned ticket is dropped.
    pub async fn wait_idle(&self) -> RunTicket {
        self.queue.enter().await
    }

    /// Moves every provider in error back to idle without retrying.
    pub async fn dismiss_errors(&self) {
        let mut state = self.state.write().await;
        for status in state.statuses.values_mut() {
            *status = std::mem::take(status).dismiss();
        }
    }

    /// Moves every settled provider back to idle. Timestamps are kept.
    pub async fn reset_status(&self) {
        let mut state = self.state.write().await;
        for status in state.statuses.values_mut() {
            if !status.is_syncing() {
                *status = ProviderSyncStatus::Idle;
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn adapter(&self, provider: ProviderKind) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters
            .read()
            .await
            .iter()
            .find(|a| a.provider() == provider)
            .cloned()
    }

    async fn is_stale(&self, provider: ProviderKind, now: i64) -> bool {
        match self.last_completed(provider).await {
            Some(at) => now.saturating_sub(at) >= self.staleness_threshold.as_secs() as i64,
            None => true,
        }
    }

    fn emit(&self, event: CoreEvent) {
        let _ = self.event_bus.emit(event);
    }

    async fn transition<F>(&self, provider: ProviderKind, next: F) -> ProviderSyncStatus
    where
        F: FnOnce(ProviderSyncStatus) -> Result<ProviderSyncStatus>,
    {
        let mut state = self.state.write().await;
        let current = state.statuses.get(&provider).cloned().unwrap_or_default();
        let status = match next(current.clone()) {
            Ok(status) => status,
            Err(e) => {
                warn!(provider = %provider, error = %e, "Ignoring status transition");
                current
            }
        };
        state.statuses.insert(provider, status.clone());
        status
    }

    async fn record_completion(&self, provider: ProviderKind, at: i64) {
        self.state.write().await.last_completed.insert(provider, at);
        if let Err(e) = self.settings.set_i64(&last_completed_key(provider), at).await {
            warn!(provider = %provider, error = %e, "Failed to persist completion time");
        }
    }

    async fn run_provider(
        &self,
        adapter: &Arc<dyn ProviderAdapter>,
        forced: bool,
    ) -> ProviderRunReport {
        let provider = adapter.provider();
        let started = Instant::now();
        let mut report = ProviderRunReport::new(provider);

        self.transition(provider, ProviderSyncStatus::begin).await;
        self.emit(CoreEvent::Sync(SyncEvent::Started {
            provider: provider.as_str().to_string(),
            forced,
        }));
        info!(provider = %provider, forced, "Provider sync started");

        match self.store.open_session().await {
            Ok(mut session) => {
                for phase in [SyncPhase::Tracks, SyncPhase::Playlists, SyncPhase::Albums] {
                    let result = match phase {
                        SyncPhase::Tracks => adapter.sync_tracks(&mut *session).await,
                        SyncPhase::Playlists => adapter.sync_playlists(&mut *session).await,
                        SyncPhase::Albums => adapter.sync_albums(&mut *session).await,
                    };

                    match result {
                        Ok(summary) => {
                            self.emit(CoreEvent::Sync(SyncEvent::PhaseCompleted {
                                provider: provider.as_str().to_string(),
                                phase: phase.as_str().to_string(),
                                created: summary.created,
                                updated: summary.updated + summary.attached,
                            }));
                            report.phases.push((phase, summary));
                        }
                        Err(err) => {
                            if let Err(e) = session.rollback().await {
                                warn!(provider = %provider, error = %e, "Rollback failed");
                            }
                            error!(provider = %provider, phase = %phase, error = %err, "Sync phase failed");
                            self.emit(CoreEvent::Sync(SyncEvent::Failed {
                                provider: provider.as_str().to_string(),
                                phase: phase.as_str().to_string(),
                                message: err.to_string(),
                            }));
                            report.errors.push((phase, err.to_string()));
                            if phase == SyncPhase::Tracks || err.aborts_run() {
                                break;
                            }
                        }
                    }
                }
            }
            Err(e) => {
                let err = SyncError::from(e);
                error!(provider = %provider, error = %err, "No storage session");
                self.emit(CoreEvent::Sync(SyncEvent::Failed {
                    provider: provider.as_str().to_string(),
                    phase: SyncPhase::Tracks.as_str().to_string(),
                    message: err.to_string(),
                }));
                report.errors.push((SyncPhase::Tracks, err.to_string()));
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;

        report.status = match report.errors.first() {
            Some((_, message)) => {
                let message = message.clone();
                self.transition(provider, move |s| s.fail(message)).await
            }
            None => {
                let at = self.clock.unix_timestamp();
                self.record_completion(provider, at).await;
                let tracks = report.summary(SyncPhase::Tracks).copied().unwrap_or_default();
                self.emit(CoreEvent::Sync(SyncEvent::Completed {
                    provider: provider.as_str().to_string(),
                    tracks_created: tracks.created,
                    tracks_updated: tracks.updated + tracks.attached,
                    duration_ms: report.duration_ms,
                }));
                info!(provider = %provider, duration_ms = report.duration_ms, "Provider sync completed");
                self.transition(provider, move |s| s.complete(at)).await
            }
        };
        report
    }

    async fn dedup_once(&self) -> Result<DedupReport> {
        let mut session = self.store.open_session().await?;
        self.dedup.run(&mut *session).await
    }

    /// Best-effort dedup. Returns the number of merged tracks.
    async fn run_dedup(&self) -> u64 {
        match self.dedup_once().await {
            Ok(report) => {
                if report.merged > 0 {
                    self.emit(CoreEvent::Library(LibraryEvent::DuplicatesMerged {
                        merged: report.merged,
                    }));
                }
                report.merged
            }
            Err(e) => {
                warn!(error = %e, "Dedup pass failed");
                0
            }
        }
    }
}
