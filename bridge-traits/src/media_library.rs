//! On-Device Media Library Abstraction
//!
//! Read-only, paginated access to the device's music catalog. Records are
//! returned in the host's native shape; the local-library provider maps them
//! into canonical tracks, playlists and albums.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Offset/limit window into one of the catalog collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaPageRequest {
    pub offset: u64,
    pub limit: u32,
}

impl MediaPageRequest {
    pub fn first(limit: u32) -> Self {
        Self { offset: 0, limit }
    }
}

/// One page of catalog records.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPage<T> {
    pub items: Vec<T>,
    /// Total number of records in the collection, across all pages.
    pub total: u64,
    /// Offset of the next page, `None` on the last page.
    pub next_offset: Option<u64>,
}

impl<T> MediaPage<T> {
    pub fn is_last(&self) -> bool {
        self.next_offset.is_none()
    }
}

/// An artwork rendition offered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaArtwork {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// A song as the device catalog describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSong {
    pub persistent_id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: Option<String>,
    pub composer: Option<String>,
    pub genre: Option<String>,
    /// Playback duration in seconds. Hosts occasionally report negative values.
    pub duration_secs: f64,
    pub release_date: Option<String>,
    pub is_explicit: bool,
    pub isrc: Option<String>,
    pub disc_number: Option<u32>,
    pub track_number: Option<u32>,
    pub date_added: Option<DateTime<Utc>>,
    pub play_count: Option<u64>,
    pub last_played: Option<DateTime<Utc>>,
    /// User rating, 0-5.
    pub rating: Option<u8>,
    pub artwork: Vec<MediaArtwork>,
}

/// A playlist as the device catalog describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPlaylist {
    pub persistent_id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_name: Option<String>,
    pub is_public: Option<bool>,
    pub track_count: u64,
    pub artwork: Vec<MediaArtwork>,
}

/// One ordered entry of a playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPlaylistEntry {
    pub song: MediaSong,
    pub date_added: Option<DateTime<Utc>>,
}

/// An album as the device catalog describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAlbum {
    pub persistent_id: String,
    pub title: String,
    pub artist: String,
    pub genres: Vec<String>,
    pub release_date: Option<String>,
    pub track_count: u64,
    pub artwork: Vec<MediaArtwork>,
}

/// Device music catalog.
///
/// Each collection is paged with [`MediaPageRequest`] and reports its total
/// size on every page. Hosts that need user consent should return
/// `Ok(false)` from [`is_authorized`](MediaLibrary::is_authorized) rather than
/// failing individual reads.
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// Whether the user granted access to the catalog.
    async fn is_authorized(&self) -> Result<bool>;

    /// Songs saved in the library.
    async fn songs(&self, request: MediaPageRequest) -> Result<MediaPage<MediaSong>>;

    /// User playlists.
    async fn playlists(&self, request: MediaPageRequest) -> Result<MediaPage<MediaPlaylist>>;

    /// Ordered entries of one playlist.
    async fn playlist_entries(
        &self,
        playlist_id: &str,
        request: MediaPageRequest,
    ) -> Result<MediaPage<MediaPlaylistEntry>>;

    /// Albums saved in the library.
    async fn albums(&self, request: MediaPageRequest) -> Result<MediaPage<MediaAlbum>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_reports_last() {
        let page: MediaPage<MediaAlbum> = MediaPage {
            items: Vec::new(),
            total: 0,
            next_offset: None,
        };
        assert!(page.is_last());
        assert_eq!(MediaPageRequest::first(50).offset, 0);
    }
}
