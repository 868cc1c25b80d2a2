//! Device library connector
//!
//! Implements `CatalogSource` over the host's `MediaLibrary` bridge.

use async_trait::async_trait;
use bridge_traits::media_library::{
    MediaAlbum, MediaArtwork, MediaLibrary, MediaPageRequest, MediaPlaylist, MediaSong,
};
use chrono::{DateTime, Utc};
use core_auth::ProviderKind;
use core_runtime::config::SyncConfig;
use core_sync::{
    best_fit_artwork, ArtworkCandidate, CanonicalAlbum, CanonicalPlaylist,
    CanonicalPlaylistEntry, CanonicalTrack, CatalogSource, Result, SourcePage, SyncError,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// On-device catalog as a sync source.
///
/// This is the primary provider: its artwork wins merges and its tracks
/// survive dedup. The first page of every collection races the configured
/// timeout, since hosts can stall indefinitely while indexing.
pub struct LocalLibraryCatalog {
    library: Arc<dyn MediaLibrary>,
    page_size: u32,
    first_page_timeout: Duration,
    artwork_target: u32,
}

impl LocalLibraryCatalog {
    pub fn new(library: Arc<dyn MediaLibrary>, config: &SyncConfig) -> Self {
        Self {
            library,
            page_size: config.page_size,
            first_page_timeout: config.first_page_timeout,
            artwork_target: config.artwork_target_size,
        }
    }

    fn request(&self, offset: u64) -> MediaPageRequest {
        MediaPageRequest {
            offset,
            limit: self.page_size,
        }
    }

    fn artwork(&self, artwork: &[MediaArtwork]) -> Option<String> {
        let candidates: Vec<ArtworkCandidate> = artwork
            .iter()
            .map(|a| ArtworkCandidate::new(a.url.clone(), a.width, a.height))
            .collect();
        best_fit_artwork(&candidates, self.artwork_target)
    }

    fn timestamp(at: Option<DateTime<Utc>>) -> Option<i64> {
        at.map(|at| at.timestamp())
    }

    fn convert_song(&self, song: MediaSong) -> CanonicalTrack {
        CanonicalTrack {
            provider_item_id: song.persistent_id,
            title: song.title,
            artist_name: song.artist,
            album_name: song.album,
            album_artist: song.album_artist,
            artwork_url: self.artwork(&song.artwork),
            duration_ms: (song.duration_secs * 1000.0).round() as i64,
            genres: song.genre.into_iter().collect(),
            release_date: song.release_date,
            explicit: song.is_explicit,
            isrc: song.isrc,
            disc_number: song.disc_number.map(|n| n as i32),
            track_number: song.track_number.map(|n| n as i32),
            composer: song.composer,
            added_at: Self::timestamp(song.date_added),
            play_count: song.play_count.map(|n| n as i64),
            last_played_at: Self::timestamp(song.last_played),
            rating: song.rating.map(i32::from),
            ..Default::default()
        }
    }

    fn convert_playlist(&self, playlist: MediaPlaylist) -> CanonicalPlaylist {
        CanonicalPlaylist {
            provider_item_id: playlist.persistent_id,
            name: playlist.name,
            description: playlist.description,
            artwork_url: self.artwork(&playlist.artwork),
            track_count: playlist.track_count as i64,
            owner_name: playlist.owner_name,
            is_public: playlist.is_public.unwrap_or(false),
        }
    }

    fn convert_album(&self, album: MediaAlbum) -> CanonicalAlbum {
        CanonicalAlbum {
            provider_item_id: album.persistent_id,
            title: album.title,
            artist_name: album.artist,
            artwork_url: self.artwork(&album.artwork),
            track_count: album.track_count as i64,
            release_date: album.release_date,
            genres: album.genres,
        }
    }
}

#[async_trait]
impl CatalogSource for LocalLibraryCatalog {
    fn provider(&self) -> ProviderKind {
        ProviderKind::LocalLibrary
    }

    fn first_page_timeout(&self) -> Option<Duration> {
        Some(self.first_page_timeout)
    }

    async fn prepare(&self) -> Result<()> {
        if self.library.is_authorized().await? {
            Ok(())
        } else {
            warn!("Media library access not granted");
            Err(SyncError::Unauthenticated(
                "media library access not granted".to_string(),
            ))
        }
    }

    #[instrument(skip(self))]
    async fn fetch_tracks(&self, offset: u64) -> Result<SourcePage<CanonicalTrack>> {
        let page = self.library.songs(self.request(offset)).await?;
        info!(count = page.items.len(), total = page.total, "Retrieved songs");
        Ok(SourcePage {
            items: page
                .items
                .into_iter()
                .map(|song| self.convert_song(song))
                .collect(),
            total: page.total,
            next_offset: page.next_offset,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_playlists(&self, offset: u64) -> Result<SourcePage<CanonicalPlaylist>> {
        let page = self.library.playlists(self.request(offset)).await?;
        info!(count = page.items.len(), total = page.total, "Retrieved playlists");
        Ok(SourcePage {
            items: page
                .items
                .into_iter()
                .map(|playlist| self.convert_playlist(playlist))
                .collect(),
            total: page.total,
            next_offset: page.next_offset,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_playlist_entries(
        &self,
        playlist_item_id: &str,
        offset: u64,
    ) -> Result<SourcePage<CanonicalPlaylistEntry>> {
        let page = self
            .library
            .playlist_entries(playlist_item_id, self.request(offset))
            .await?;
        debug!(count = page.items.len(), "Retrieved playlist entries");
        Ok(SourcePage {
            items: page
                .items
                .into_iter()
                .map(|entry| CanonicalPlaylistEntry {
                    added_at: Self::timestamp(entry.date_added),
                    track: self.convert_song(entry.song),
                })
                .collect(),
            total: page.total,
            next_offset: page.next_offset,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_albums(&self, offset: u64) -> Result<SourcePage<CanonicalAlbum>> {
        let page = self.library.albums(self.request(offset)).await?;
        info!(count = page.items.len(), total = page.total, "Retrieved albums");
        Ok(SourcePage {
            items: page
                .items
                .into_iter()
                .map(|album| self.convert_album(album))
                .collect(),
            total: page.total,
            next_offset: page.next_offset,
        })
    }
}
