//! Run indexes.
//!
//! A phase snapshots the provider's existing records once, at its start, and
//! keeps the snapshot current as it writes. Nothing is re-queried mid-run.

use crate::error::Result;
use async_trait::async_trait;
use core_auth::ProviderKind;
use core_library::{
    Album, LibrarySession, Playlist, SourceTrack, Track, TrackId, TrackKey,
};
use std::collections::HashMap;
use tracing::debug;

/// A record owned by one provider and unique on its provider-native id.
#[async_trait]
pub trait StoredRecord: Clone + Send + Sync {
    fn provider_item_id(&self) -> &str;

    /// Equal in everything except the sync timestamp.
    fn same_content(&self, other: &Self) -> bool;

    fn with_last_synced_at(self, now: i64) -> Self;

    async fn insert(&self, session: &mut dyn LibrarySession) -> Result<()>;

    async fn update(&self, session: &mut dyn LibrarySession) -> Result<()>;
}

#[async_trait]
impl StoredRecord for SourceTrack {
    fn provider_item_id(&self) -> &str {
        &self.provider_item_id
    }

    fn same_content(&self, other: &Self) -> bool {
        SourceTrack::same_content(self, other)
    }

    fn with_last_synced_at(self, now: i64) -> Self {
        Self {
            last_synced_at: now,
            ..self
        }
    }

    async fn insert(&self, session: &mut dyn LibrarySession) -> Result<()> {
        Ok(session.insert_source_track(self).await?)
    }

    async fn update(&self, session: &mut dyn LibrarySession) -> Result<()> {
        Ok(session.update_source_track(self).await?)
    }
}

#[async_trait]
impl StoredRecord for Playlist {
    fn provider_item_id(&self) -> &str {
        &self.provider_item_id
    }

    fn same_content(&self, other: &Self) -> bool {
        Playlist::same_content(self, other)
    }

    fn with_last_synced_at(self, now: i64) -> Self {
        Self {
            last_synced_at: now,
            ..self
        }
    }

    async fn insert(&self, session: &mut dyn LibrarySession) -> Result<()> {
        Ok(session.insert_playlist(self).await?)
    }

    async fn update(&self, session: &mut dyn LibrarySession) -> Result<()> {
        Ok(session.update_playlist(self).await?)
    }
}

#[async_trait]
impl StoredRecord for Album {
    fn provider_item_id(&self) -> &str {
        &self.provider_item_id
    }

    fn same_content(&self, other: &Self) -> bool {
        Album::same_content(self, other)
    }

    fn with_last_synced_at(self, now: i64) -> Self {
        Self {
            last_synced_at: now,
            ..self
        }
    }

    async fn insert(&self, session: &mut dyn LibrarySession) -> Result<()> {
        Ok(session.insert_album(self).await?)
    }

    async fn update(&self, session: &mut dyn LibrarySession) -> Result<()> {
        Ok(session.update_album(self).await?)
    }
}

/// Existing records of one provider keyed by provider-native id.
#[derive(Debug, Clone)]
pub struct ProviderIndex<R> {
    provider: ProviderKind,
    by_item_id: HashMap<String, R>,
}

impl<R: StoredRecord> ProviderIndex<R> {
    pub fn new(provider: ProviderKind, records: Vec<R>) -> Self {
        let by_item_id = records
            .into_iter()
            .map(|r| (r.provider_item_id().to_string(), r))
            .collect();
        Self {
            provider,
            by_item_id,
        }
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn get(&self, provider_item_id: &str) -> Option<&R> {
        self.by_item_id.get(provider_item_id)
    }

    /// Registers or replaces a record.
    pub fn insert(&mut self, record: R) {
        self.by_item_id
            .insert(record.provider_item_id().to_string(), record);
    }

    pub fn len(&self) -> usize {
        self.by_item_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_item_id.is_empty()
    }
}

/// All tracks keyed by id and by normalized identity.
///
/// Loaded on first use; phases that never reach reconciliation (for example
/// an unchanged remote catalog) never read the track table.
#[derive(Debug, Default)]
pub struct TrackIndex {
    loaded: bool,
    tracks: HashMap<TrackId, Track>,
    keys: HashMap<TrackKey, TrackId>,
}

impl TrackIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub async fn ensure_loaded(&mut self, session: &mut dyn LibrarySession) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        for track in session.fetch_tracks().await? {
            self.insert(track);
        }
        self.loaded = true;
        debug!(tracks = self.tracks.len(), "Track index loaded");
        Ok(())
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn find_by_key(&self, key: &TrackKey) -> Option<&Track> {
        self.keys.get(key).and_then(|id| self.tracks.get(id))
    }

    /// Whether `key` is unused or already belongs to `owner`.
    pub fn key_available_for(&self, key: &TrackKey, owner: TrackId) -> bool {
        self.keys.get(key).map_or(true, |id| *id == owner)
    }

    /// Registers or replaces a track, moving its key mapping if its identity changed.
    pub fn insert(&mut self, track: Track) {
        if let Some(previous) = self.tracks.get(&track.id) {
            let old_key = previous.key();
            if self.keys.get(&old_key) == Some(&track.id) {
                self.keys.remove(&old_key);
            }
        }
        self.keys.insert(track.key(), track.id);
        self.tracks.insert(track.id, track);
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
