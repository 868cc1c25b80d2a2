//! # Reconciliation
//!
//! Upserts canonical records into the library.
//!
//! ## Tracks
//!
//! [`upsert_track`] resolves an incoming [`CanonicalTrack`] in three steps:
//!
//! 1. **Known id**: the provider already has a [`SourceTrack`] for this
//!    provider-native id. The source record is refreshed and its Track is
//!    merged.
//! 2. **Metadata match**: another provider already created a Track with the
//!    same normalized (title, artist, album). A new SourceTrack is attached
//!    to it and the Track is merged.
//! 3. **New**: a Track and its SourceTrack are created and registered in
//!    both indexes so later items of the same run see them.
//!
//! Tracks reached through a playlist reconcile with `in_library == false`.
//! They never demote a saved SourceTrack and never move its `added_at`.
//!
//! ## Merge policy
//!
//! [`merge_track`] never blanks a field the Track already has, keeps artwork
//! that came from the primary provider, keeps the earliest `added_at`, and
//! only fills an ISRC that is still empty.
//!
//! ## Playlists and albums
//!
//! [`reconcile_record`] is the same known-id-or-create routine for any
//! [`CanonicalRecord`].

use crate::canonical::{is_placeholder, CanonicalAlbum, CanonicalPlaylist, CanonicalTrack};
use crate::error::Result;
use crate::index::{ProviderIndex, StoredRecord, TrackIndex};
use core_auth::ProviderKind;
use core_library::{
    Album, AlbumId, LibrarySession, Playlist, PlaylistId, SourceTrack, SourceTrackId, Track,
    TrackId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Rules for merging one provider's view into a shared Track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePolicy {
    /// Provider whose artwork wins and whose tracks survive deduplication.
    pub primary: ProviderKind,
}

impl MergePolicy {
    pub fn new(primary: ProviderKind) -> Self {
        Self { primary }
    }
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            primary: ProviderKind::LocalLibrary,
        }
    }
}

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// New Track and SourceTrack (or new playlist/album)
    Created,
    /// New SourceTrack attached to an existing Track
    Attached,
    /// Existing records changed
    Updated,
    /// Existing records already matched the incoming values
    Unchanged,
}

/// Shared state for one reconciliation run.
pub struct UpsertContext<'a> {
    pub provider: ProviderKind,
    pub policy: MergePolicy,
    pub now: i64,
    /// Items come from the provider's saved library rather than a playlist.
    pub in_library: bool,
    pub sources: &'a mut ProviderIndex<SourceTrack>,
    pub tracks: &'a mut TrackIndex,
}

fn earliest(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn prefer_identity(existing: &str, incoming: &str) -> String {
    if is_placeholder(incoming) && !is_placeholder(existing) {
        existing.to_string()
    } else {
        incoming.to_string()
    }
}

/// Merges `incoming` from `provider` into `existing`.
///
/// A changed (title, artist, album) identity is applied only when the new key
/// is free in `tracks`; otherwise the existing identity is kept.
pub fn merge_track(
    existing: &Track,
    incoming: &CanonicalTrack,
    provider: ProviderKind,
    policy: MergePolicy,
    tracks: &TrackIndex,
    now: i64,
) -> Track {
    let mut merged = existing.clone();

    // Spelling differences that normalize to the same key keep the stored text.
    if incoming.key() != existing.key() {
        merged.title = prefer_identity(&existing.title, &incoming.title);
        merged.artist_name = prefer_identity(&existing.artist_name, &incoming.artist_name);
        merged.album_name = prefer_identity(&existing.album_name, &incoming.album_name);
        if !tracks.key_available_for(&merged.key(), existing.id) {
            trace!(track_id = %existing.id, "Identity change would collide, keeping existing");
            merged.title = existing.title.clone();
            merged.artist_name = existing.artist_name.clone();
            merged.album_name = existing.album_name.clone();
        }
    }

    let primary_artwork =
        existing.artwork_url.is_some() && existing.artwork_provider == Some(policy.primary);
    if incoming.artwork_url.is_some() && (!primary_artwork || provider == policy.primary) {
        merged.artwork_url = incoming.artwork_url.clone();
        merged.artwork_provider = Some(provider);
    }

    if incoming.duration_ms > 0 {
        merged.duration_ms = incoming.duration_ms;
    }
    if !incoming.genres.is_empty() {
        merged.genres = incoming.genres.clone();
    }
    merged.album_artist = incoming.album_artist.clone().or(merged.album_artist);
    merged.composer = incoming.composer.clone().or(merged.composer);
    merged.release_date = incoming.release_date.clone().or(merged.release_date);
    merged.disc_number = incoming.disc_number.or(merged.disc_number);
    merged.track_number = incoming.track_number.or(merged.track_number);
    merged.explicit = existing.explicit || incoming.explicit;

    if merged.isrc.as_deref().map_or(true, |s| s.trim().is_empty()) {
        merged.isrc = incoming.isrc.clone();
    }
    merged.added_at = earliest(existing.added_at, incoming.added_at);

    if !merged.same_content(existing) {
        merged.last_synced_at = now;
    }
    merged
}

fn new_track(incoming: &CanonicalTrack, provider: ProviderKind, now: i64) -> Track {
    Track {
        id: TrackId::new(),
        title: incoming.title.clone(),
        artist_name: incoming.artist_name.clone(),
        album_name: incoming.album_name.clone(),
        album_artist: incoming.album_artist.clone(),
        artwork_provider: incoming.artwork_url.as_ref().map(|_| provider),
        artwork_url: incoming.artwork_url.clone(),
        duration_ms: incoming.duration_ms,
        genres: incoming.genres.clone(),
        release_date: incoming.release_date.clone(),
        explicit: incoming.explicit,
        isrc: incoming.isrc.clone(),
        disc_number: incoming.disc_number,
        track_number: incoming.track_number,
        composer: incoming.composer.clone(),
        added_at: incoming.added_at,
        last_synced_at: now,
    }
}

fn new_source(ctx: &UpsertContext<'_>, incoming: &CanonicalTrack, track_id: TrackId) -> SourceTrack {
    SourceTrack {
        id: SourceTrackId::new(),
        track_id,
        provider: ctx.provider,
        provider_item_id: incoming.provider_item_id.clone(),
        in_library: ctx.in_library,
        added_at: incoming.added_at,
        play_count: incoming.play_count,
        last_played_at: incoming.last_played_at,
        rating: incoming.rating,
        popularity: incoming.popularity,
        preview_url: incoming.preview_url.clone(),
        artwork_url: incoming.artwork_url.clone(),
        last_synced_at: ctx.now,
    }
}

/// Refreshes a provider's own record; its stats are the provider's to overwrite.
fn merge_source(existing: &SourceTrack, incoming: &CanonicalTrack, in_library: bool, now: i64) -> SourceTrack {
    let added_at = if in_library {
        incoming.added_at.or(existing.added_at)
    } else {
        existing.added_at.or(incoming.added_at)
    };
    let mut merged = SourceTrack {
        in_library: existing.in_library || in_library,
        added_at,
        play_count: incoming.play_count.or(existing.play_count),
        last_played_at: incoming.last_played_at.or(existing.last_played_at),
        rating: incoming.rating.or(existing.rating),
        popularity: incoming.popularity.or(existing.popularity),
        preview_url: incoming.preview_url.clone().or(existing.preview_url.clone()),
        artwork_url: incoming.artwork_url.clone().or(existing.artwork_url.clone()),
        ..existing.clone()
    };
    merged.last_synced_at = if merged.same_content(existing) {
        existing.last_synced_at
    } else {
        now
    };
    merged
}

/// Writes the merged Track when it differs. Returns whether it changed.
async fn apply_track_merge(
    session: &mut dyn LibrarySession,
    ctx: &mut UpsertContext<'_>,
    existing: &Track,
    incoming: &CanonicalTrack,
) -> Result<bool> {
    let merged = merge_track(existing, incoming, ctx.provider, ctx.policy, ctx.tracks, ctx.now);
    if merged.same_content(existing) {
        return Ok(false);
    }
    session.update_track(&merged).await?;
    ctx.tracks.insert(merged);
    Ok(true)
}

/// Reconciles one canonical track. Returns the provider's SourceTrack for it.
pub async fn upsert_track(
    session: &mut dyn LibrarySession,
    ctx: &mut UpsertContext<'_>,
    incoming: &CanonicalTrack,
) -> Result<(SourceTrack, UpsertOutcome)> {
    ctx.tracks.ensure_loaded(session).await?;

    if let Some(existing) = ctx.sources.get(&incoming.provider_item_id).cloned() {
        let mut changed = false;

        let source = merge_source(&existing, incoming, ctx.in_library, ctx.now);
        if !source.same_content(&existing) {
            source.update(session).await?;
            ctx.sources.insert(source.clone());
            changed = true;
        }

        if let Some(track) = ctx.tracks.get(existing.track_id).cloned() {
            changed |= apply_track_merge(session, ctx, &track, incoming).await?;
        }

        let outcome = if changed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Unchanged
        };
        return Ok((source, outcome));
    }

    if let Some(track) = ctx.tracks.find_by_key(&incoming.key()).cloned() {
        let source = new_source(ctx, incoming, track.id);
        source.insert(session).await?;
        ctx.sources.insert(source.clone());
        apply_track_merge(session, ctx, &track, incoming).await?;

        debug!(
            provider = %ctx.provider,
            item = %incoming.provider_item_id,
            track_id = %track.id,
            "Attached source to existing track"
        );
        return Ok((source, UpsertOutcome::Attached));
    }

    let track = new_track(incoming, ctx.provider, ctx.now);
    session.insert_track(&track).await?;
    let source = new_source(ctx, incoming, track.id);
    source.insert(session).await?;

    ctx.tracks.insert(track);
    ctx.sources.insert(source.clone());
    Ok((source, UpsertOutcome::Created))
}

/// Canonical value of a provider-owned record.
pub trait CanonicalRecord {
    type Record: StoredRecord;

    fn provider_item_id(&self) -> &str;

    fn create(&self, provider: ProviderKind, now: i64) -> Self::Record;

    /// Applies this value over `existing`, keeping fields it leaves blank.
    fn merge(&self, existing: &Self::Record) -> Self::Record;
}

impl CanonicalRecord for CanonicalPlaylist {
    type Record = Playlist;

    fn provider_item_id(&self) -> &str {
        &self.provider_item_id
    }

    fn create(&self, provider: ProviderKind, now: i64) -> Playlist {
        Playlist {
            id: PlaylistId::new(),
            provider,
            provider_item_id: self.provider_item_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            artwork_url: self.artwork_url.clone(),
            track_count: self.track_count,
            owner_name: self.owner_name.clone(),
            is_public: self.is_public,
            last_synced_at: now,
        }
    }

    fn merge(&self, existing: &Playlist) -> Playlist {
        Playlist {
            name: self.name.clone(),
            description: self.description.clone().or(existing.description.clone()),
            artwork_url: self.artwork_url.clone().or(existing.artwork_url.clone()),
            track_count: self.track_count,
            owner_name: self.owner_name.clone().or(existing.owner_name.clone()),
            is_public: self.is_public,
            ..existing.clone()
        }
    }
}

impl CanonicalRecord for CanonicalAlbum {
    type Record = Album;

    fn provider_item_id(&self) -> &str {
        &self.provider_item_id
    }

    fn create(&self, provider: ProviderKind, now: i64) -> Album {
        Album {
            id: AlbumId::new(),
            provider,
            provider_item_id: self.provider_item_id.clone(),
            title: self.title.clone(),
            artist_name: self.artist_name.clone(),
            artwork_url: self.artwork_url.clone(),
            track_count: self.track_count,
            release_date: self.release_date.clone(),
            genres: self.genres.clone(),
            last_synced_at: now,
        }
    }

    fn merge(&self, existing: &Album) -> Album {
        Album {
            title: self.title.clone(),
            artist_name: self.artist_name.clone(),
            artwork_url: self.artwork_url.clone().or(existing.artwork_url.clone()),
            track_count: self.track_count,
            release_date: self.release_date.clone().or(existing.release_date.clone()),
            genres: if self.genres.is_empty() {
                existing.genres.clone()
            } else {
                self.genres.clone()
            },
            ..existing.clone()
        }
    }
}

/// Known-id-or-create for playlists and albums.
pub async fn reconcile_record<C>(
    session: &mut dyn LibrarySession,
    index: &mut ProviderIndex<C::Record>,
    incoming: &C,
    now: i64,
) -> Result<(C::Record, UpsertOutcome)>
where
    C: CanonicalRecord + Sync,
{
    if let Some(existing) = index.get(incoming.provider_item_id()).cloned() {
        let merged = incoming.merge(&existing);
        if merged.same_content(&existing) {
            return Ok((existing, UpsertOutcome::Unchanged));
        }
        let merged = merged.with_last_synced_at(now);
        merged.update(session).await?;
        index.insert(merged.clone());
        return Ok((merged, UpsertOutcome::Updated));
    }

    let record = incoming.create(index.provider(), now);
    record.insert(session).await?;
    index.insert(record.clone());
    Ok((record, UpsertOutcome::Created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::{create_test_pool, LibraryStore, SqliteLibraryStore};

    async fn session() -> Box<dyn LibrarySession> {
        let store = SqliteLibraryStore::new(create_test_pool().await.unwrap());
        store.open_session().await.unwrap()
    }

    fn canonical(id: &str, title: &str) -> CanonicalTrack {
        CanonicalTrack {
            duration_ms: 200_000,
            ..CanonicalTrack::new(id, title, "Artist", "Album")
        }
        .normalized()
    }

    fn existing_track() -> Track {
        Track {
            id: TrackId::new(),
            title: "Song".to_string(),
            artist_name: "Artist".to_string(),
            album_name: "Album".to_string(),
            album_artist: Some("Various".to_string()),
            artwork_url: Some("local://art".to_string()),
            artwork_provider: Some(ProviderKind::LocalLibrary),
            duration_ms: 180_000,
            genres: vec!["Rock".to_string()],
            release_date: None,
            explicit: false,
            isrc: Some("USRC12345678".to_string()),
            disc_number: None,
            track_number: Some(3),
            composer: Some("Writer".to_string()),
            added_at: Some(500),
            last_synced_at: 1,
        }
    }

    #[test]
    fn test_merge_never_blanks_existing_fields() {
        let existing = existing_track();
        let mut index = TrackIndex::new();
        index.insert(existing.clone());

        let incoming = canonical("r1", "Song");
        let merged = merge_track(
            &existing,
            &incoming,
            ProviderKind::RemoteApi,
            MergePolicy::default(),
            &index,
            10,
        );

        assert_eq!(merged.genres, vec!["Rock"]);
        assert_eq!(merged.composer.as_deref(), Some("Writer"));
        assert_eq!(merged.album_artist.as_deref(), Some("Various"));
        assert_eq!(merged.track_number, Some(3));
        assert_eq!(merged.duration_ms, 200_000);
    }

    #[test]
    fn test_merge_keeps_primary_artwork_and_first_isrc() {
        let existing = existing_track();
        let mut index = TrackIndex::new();
        index.insert(existing.clone());

        let mut incoming = canonical("r1", "Song");
        incoming.artwork_url = Some("remote://art".to_string());
        incoming.isrc = Some("GBXXX0000001".to_string());

        let merged = merge_track(
            &existing,
            &incoming,
            ProviderKind::RemoteApi,
            MergePolicy::default(),
            &index,
            10,
        );
        assert_eq!(merged.artwork_url.as_deref(), Some("local://art"));
        assert_eq!(merged.artwork_provider, Some(ProviderKind::LocalLibrary));
        assert_eq!(merged.isrc.as_deref(), Some("USRC12345678"));
    }

    #[test]
    fn test_merge_accepts_artwork_over_secondary_artwork() {
        let mut existing = existing_track();
        existing.artwork_provider = Some(ProviderKind::RemoteApi);
        existing.isrc = None;
        let mut index = TrackIndex::new();
        index.insert(existing.clone());

        let mut incoming = canonical("l1", "Song");
        incoming.artwork_url = Some("local://new".to_string());
        incoming.isrc = Some("USRC00000001".to_string());

        let merged = merge_track(
            &existing,
            &incoming,
            ProviderKind::LocalLibrary,
            MergePolicy::default(),
            &index,
            10,
        );
        assert_eq!(merged.artwork_url.as_deref(), Some("local://new"));
        assert_eq!(merged.artwork_provider, Some(ProviderKind::LocalLibrary));
        assert_eq!(merged.isrc.as_deref(), Some("USRC00000001"));
    }

    #[test]
    fn test_merge_keeps_earliest_added_at() {
        let existing = existing_track();
        let mut index = TrackIndex::new();
        index.insert(existing.clone());

        let mut later = canonical("r1", "Song");
        later.added_at = Some(900);
        let merged = merge_track(&existing, &later, ProviderKind::RemoteApi, MergePolicy::default(), &index, 10);
        assert_eq!(merged.added_at, Some(500));

        let mut earlier = canonical("r1", "Song");
        earlier.added_at = Some(100);
        let merged = merge_track(&existing, &earlier, ProviderKind::RemoteApi, MergePolicy::default(), &index, 10);
        assert_eq!(merged.added_at, Some(100));
    }

    #[test]
    fn test_merge_skips_colliding_identity_change() {
        let existing = existing_track();
        let other = Track {
            id: TrackId::new(),
            title: "Other".to_string(),
            ..existing_track()
        };
        let mut index = TrackIndex::new();
        index.insert(existing.clone());
        index.insert(other);

        let renamed = canonical("l1", "Other");
        let merged = merge_track(&existing, &renamed, ProviderKind::LocalLibrary, MergePolicy::default(), &index, 10);
        assert_eq!(merged.title, "Song");
    }

    #[test]
    fn test_placeholder_does_not_replace_real_identity() {
        let existing = existing_track();
        let mut index = TrackIndex::new();
        index.insert(existing.clone());

        let incoming = CanonicalTrack::new("l1", "Song", "", "Album").normalized();
        let merged = merge_track(&existing, &incoming, ProviderKind::LocalLibrary, MergePolicy::default(), &index, 10);
        assert_eq!(merged.artist_name, "Artist");
    }

    #[core_async::test]
    async fn test_upsert_create_attach_update_unchanged() {
        let mut session = session().await;
        let mut local = ProviderIndex::new(ProviderKind::LocalLibrary, Vec::new());
        let mut remote = ProviderIndex::new(ProviderKind::RemoteApi, Vec::new());
        let mut tracks = TrackIndex::new();

        let mut ctx = UpsertContext {
            provider: ProviderKind::LocalLibrary,
            policy: MergePolicy::default(),
            now: 1,
            in_library: true,
            sources: &mut local,
            tracks: &mut tracks,
        };
        let (created, outcome) = upsert_track(&mut *session, &mut ctx, &canonical("l1", "Song"))
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);

        let (_, outcome) = upsert_track(&mut *session, &mut ctx, &canonical("l1", "Song"))
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Unchanged);

        let mut changed = canonical("l1", "Song");
        changed.play_count = Some(4);
        let (_, outcome) = upsert_track(&mut *session, &mut ctx, &changed).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        let mut ctx = UpsertContext {
            provider: ProviderKind::RemoteApi,
            policy: MergePolicy::default(),
            now: 2,
            in_library: true,
            sources: &mut remote,
            tracks: &mut tracks,
        };
        let (attached, outcome) =
            upsert_track(&mut *session, &mut ctx, &canonical("r1", " song "))
                .await
                .unwrap();
        assert_eq!(outcome, UpsertOutcome::Attached);
        assert_eq!(attached.track_id, created.track_id);
        assert_eq!(tracks.get(created.track_id).unwrap().title, "Song");

        assert_eq!(session.fetch_tracks().await.unwrap().len(), 1);
        assert_eq!(session.fetch_source_tracks(None).await.unwrap().len(), 2);
    }

    #[core_async::test]
    async fn test_playlist_reference_keeps_saved_source() {
        let mut session = session().await;
        let mut remote = ProviderIndex::new(ProviderKind::RemoteApi, Vec::new());
        let mut tracks = TrackIndex::new();

        let mut saved = canonical("r1", "Song");
        saved.added_at = Some(100);
        let mut ctx = UpsertContext {
            provider: ProviderKind::RemoteApi,
            policy: MergePolicy::default(),
            now: 1,
            in_library: true,
            sources: &mut remote,
            tracks: &mut tracks,
        };
        upsert_track(&mut *session, &mut ctx, &saved).await.unwrap();

        ctx.in_library = false;
        ctx.now = 2;
        let mut referenced = canonical("r1", "Song");
        referenced.added_at = Some(200);
        let (source, outcome) = upsert_track(&mut *session, &mut ctx, &referenced)
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Unchanged);
        assert!(source.in_library);
        assert_eq!(source.added_at, Some(100));
        assert_eq!(source.last_synced_at, 1);

        let (listed, outcome) = upsert_track(&mut *session, &mut ctx, &canonical("r9", "Other"))
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);
        assert!(!listed.in_library);

        ctx.in_library = true;
        let (promoted, outcome) = upsert_track(&mut *session, &mut ctx, &canonical("r9", "Other"))
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
        assert!(promoted.in_library);
        assert_eq!(
            session
                .count_saved_source_tracks(ProviderKind::RemoteApi)
                .await
                .unwrap(),
            2
        );
    }

    #[core_async::test]
    async fn test_reconcile_playlist_created_then_unchanged() {
        let mut session = session().await;
        let mut index: ProviderIndex<Playlist> = ProviderIndex::new(ProviderKind::RemoteApi, Vec::new());

        let incoming = CanonicalPlaylist::new("p1", "Road Trip").normalized();
        let (created, outcome) = reconcile_record(&mut *session, &mut index, &incoming, 1)
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);

        let (same, outcome) = reconcile_record(&mut *session, &mut index, &incoming, 2)
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Unchanged);
        assert_eq!(same.last_synced_at, 1);

        let renamed = CanonicalPlaylist::new("p1", "Road Trip 2").normalized();
        let (updated, outcome) = reconcile_record(&mut *session, &mut index, &renamed, 3)
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.last_synced_at, 3);
    }

    #[core_async::test]
    async fn test_reconcile_album_keeps_genres_when_blank() {
        let mut session = session().await;
        let mut index: ProviderIndex<Album> = ProviderIndex::new(ProviderKind::RemoteApi, Vec::new());

        let mut first = CanonicalAlbum::new("a1", "Album", "Artist");
        first.genres = vec!["Pop".to_string()];
        reconcile_record(&mut *session, &mut index, &first.normalized(), 1)
            .await
            .unwrap();

        let bare = CanonicalAlbum::new("a1", "Album", "Artist").normalized();
        let (album, outcome) = reconcile_record(&mut *session, &mut index, &bare, 2)
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Unchanged);
        assert_eq!(album.genres, vec!["Pop"]);
    }
}
