//! # Provider Adapters
//!
//! A [`ProviderAdapter`] runs the three sync phases for one provider:
//! tracks, playlists, albums. [`CatalogAdapter`] implements them once for
//! any [`CatalogSource`].
//!
//! ## Phase workflow
//!
//! 1. Snapshot the provider's existing records into a [`ProviderIndex`]
//! 2. Page through the source in its native order (first page bounded by
//!    the source's first-page timeout)
//! 3. Normalize each item and reconcile it against the indexes
//! 4. Yield to the scheduler every `yield_every` items
//! 5. Commit the session once at the end of the phase
//!
//! Nothing is ever pruned: records missing upstream stay in the library.
//! The only deletions are a playlist's own entries, which are replaced
//! each time the playlist is synced.

use crate::canonical::CanonicalPlaylist;
use crate::error::{Result, SyncError};
use crate::index::{ProviderIndex, TrackIndex};
use crate::reconcile::{
    reconcile_record, upsert_track, MergePolicy, UpsertContext, UpsertOutcome,
};
use crate::source::{CatalogSource, SourcePage};
use async_trait::async_trait;
use bridge_traits::Clock;
use core_async::future::deadline;
use core_async::task::YieldBudget;
use core_auth::ProviderKind;
use core_library::{LibrarySession, Playlist, PlaylistTrack};
use core_runtime::config::SyncConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The three phases of a provider run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Tracks,
    Playlists,
    Albums,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Tracks => "tracks",
            SyncPhase::Playlists => "playlists",
            SyncPhase::Albums => "albums",
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Items received from the source
    pub fetched: u64,
    pub created: u64,
    /// Source tracks attached to a track another provider created
    pub attached: u64,
    pub updated: u64,
    pub unchanged: u64,
    /// Playlist entries written
    pub entries: u64,
    /// Track phase stopped after the first page because nothing changed upstream
    pub skipped_unchanged: bool,
}

impl SyncSummary {
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::Attached => self.attached += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }

    /// Whether the phase wrote anything other than playlist entries.
    pub fn changed(&self) -> bool {
        self.created + self.attached + self.updated > 0
    }
}

/// Sync phases for one provider.
///
/// Each phase commits the session before returning `Ok`. On error the
/// caller decides whether to roll back.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> ProviderKind;

    async fn sync_tracks(&self, session: &mut dyn LibrarySession) -> Result<SyncSummary>;

    async fn sync_playlists(&self, session: &mut dyn LibrarySession) -> Result<SyncSummary>;

    async fn sync_albums(&self, session: &mut dyn LibrarySession) -> Result<SyncSummary>;
}

/// [`ProviderAdapter`] over any [`CatalogSource`].
pub struct CatalogAdapter {
    source: Arc<dyn CatalogSource>,
    policy: MergePolicy,
    clock: Arc<dyn Clock>,
    yield_every: usize,
}

impl CatalogAdapter {
    pub fn new(source: Arc<dyn CatalogSource>, config: &SyncConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            policy: MergePolicy::default(),
            clock,
            yield_every: config.yield_every,
        }
    }

    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Awaits a page fetch, bounding the first page of a collection.
    async fn fetch<T, F>(&self, offset: u64, request: F) -> Result<SourcePage<T>>
    where
        F: Future<Output = Result<SourcePage<T>>> + Send,
        T: Send,
    {
        match self.source.first_page_timeout() {
            Some(after) if offset == 0 => deadline(after, request).await.map_err(|e| {
                warn!(provider = %self.source.provider(), after = ?e.after, "First page timed out");
                SyncError::Timeout(e.after)
            })?,
            _ => request.await,
        }
    }

    async fn sync_playlist_entries(
        &self,
        session: &mut dyn LibrarySession,
        ctx: &mut UpsertContext<'_>,
        playlist: &Playlist,
        budget: &mut YieldBudget,
    ) -> Result<u64> {
        let mut entries: Vec<PlaylistTrack> = Vec::new();
        let mut offset = 0;

        loop {
            let page = self
                .fetch(
                    offset,
                    self.source
                        .fetch_playlist_entries(&playlist.provider_item_id, offset),
                )
                .await?;

            for entry in page.items {
                let track = entry.track.normalized();
                let (source, _) = upsert_track(session, ctx, &track).await?;
                entries.push(PlaylistTrack {
                    playlist_id: playlist.id,
                    track_id: source.track_id,
                    position: entries.len() as i64,
                    added_at: entry.added_at,
                });
                budget.tick().await;
            }

            match page.next_offset {
                Some(next) if next > offset => offset = next,
                _ => break,
            }
        }

        session
            .replace_playlist_tracks(playlist.id, &entries)
            .await?;
        Ok(entries.len() as u64)
    }
}

#[async_trait]
impl ProviderAdapter for CatalogAdapter {
    fn provider(&self) -> ProviderKind {
        self.source.provider()
    }

    #[instrument(skip(self, session), fields(provider = %self.source.provider()))]
    async fn sync_tracks(&self, session: &mut dyn LibrarySession) -> Result<SyncSummary> {
        self.source.prepare().await?;

        let provider = self.source.provider();
        let mut sources =
            ProviderIndex::new(provider, session.fetch_source_tracks(Some(provider)).await?);
        let known = session.count_saved_source_tracks(provider).await?;
        let mut tracks = TrackIndex::new();
        let mut ctx = UpsertContext {
            provider,
            policy: self.policy,
            now: self.clock.unix_timestamp(),
            in_library: true,
            sources: &mut sources,
            tracks: &mut tracks,
        };

        let mut summary = SyncSummary::default();
        let mut budget = YieldBudget::new(self.yield_every);
        let mut offset = 0;

        loop {
            let page = self.fetch(offset, self.source.fetch_tracks(offset)).await?;

            if offset == 0 && self.source.skip_when_unchanged() && page.total > 0 && page.total == known {
                info!(total = page.total, "Track count unchanged, skipping track sync");
                summary.skipped_unchanged = true;
                break;
            }

            summary.fetched += page.items.len() as u64;
            for item in page.items {
                let item = item.normalized();
                let (_, outcome) = upsert_track(session, &mut ctx, &item).await?;
                summary.record(outcome);
                budget.tick().await;
            }

            match page.next_offset {
                Some(next) if next > offset => offset = next,
                _ => break,
            }
        }

        session.save().await.map_err(SyncError::Commit)?;
        info!(
            fetched = summary.fetched,
            created = summary.created,
            attached = summary.attached,
            updated = summary.updated,
            "Track phase committed"
        );
        Ok(summary)
    }

    #[instrument(skip(self, session), fields(provider = %self.source.provider()))]
    async fn sync_playlists(&self, session: &mut dyn LibrarySession) -> Result<SyncSummary> {
        self.source.prepare().await?;

        let provider = self.source.provider();
        let now = self.clock.unix_timestamp();
        let mut playlists = ProviderIndex::new(provider, session.fetch_playlists(provider).await?);
        let mut sources =
            ProviderIndex::new(provider, session.fetch_source_tracks(Some(provider)).await?);
        let mut tracks = TrackIndex::new();
        let mut ctx = UpsertContext {
            provider,
            policy: self.policy,
            now,
            in_library: false,
            sources: &mut sources,
            tracks: &mut tracks,
        };

        let mut summary = SyncSummary::default();
        let mut budget = YieldBudget::new(self.yield_every);
        let mut offset = 0;

        loop {
            let page = self.fetch(offset, self.source.fetch_playlists(offset)).await?;
            summary.fetched += page.items.len() as u64;

            for item in page.items {
                let item: CanonicalPlaylist = item.normalized();
                let (playlist, outcome) =
                    reconcile_record(session, &mut playlists, &item, now).await?;
                summary.record(outcome);

                let written = self
                    .sync_playlist_entries(session, &mut ctx, &playlist, &mut budget)
                    .await?;
                summary.entries += written;
                debug!(playlist = %playlist.name, entries = written, "Playlist synced");
                budget.tick().await;
            }

            match page.next_offset {
                Some(next) if next > offset => offset = next,
                _ => break,
            }
        }

        session.save().await.map_err(SyncError::Commit)?;
        info!(
            fetched = summary.fetched,
            created = summary.created,
            updated = summary.updated,
            entries = summary.entries,
            "Playlist phase committed"
        );
        Ok(summary)
    }

    #[instrument(skip(self, session), fields(provider = %self.source.provider()))]
    async fn sync_albums(&self, session: &mut dyn LibrarySession) -> Result<SyncSummary> {
        self.source.prepare().await?;

        let provider = self.source.provider();
        let now = self.clock.unix_timestamp();
        let mut albums = ProviderIndex::new(provider, session.fetch_albums(provider).await?);

        let mut summary = SyncSummary::default();
        let mut budget = YieldBudget::new(self.yield_every);
        let mut offset = 0;

        loop {
            let page = self.fetch(offset, self.source.fetch_albums(offset)).await?;
            summary.fetched += page.items.len() as u64;

            for item in page.items {
                let item = item.normalized();
                let (_, outcome) = reconcile_record(session, &mut albums, &item, now).await?;
                summary.record(outcome);
                budget.tick().await;
            }

            match page.next_offset {
                Some(next) if next > offset => offset = next,
                _ => break,
            }
        }

        session.save().await.map_err(SyncError::Commit)?;
        info!(
            fetched = summary.fetched,
            created = summary.created,
            updated = summary.updated,
            "Album phase committed"
        );
        Ok(summary)
    }
}
