//! Catalog sources.
//!
//! A [`CatalogSource`] pages one provider's catalog and maps its native
//! records into canonical ones. Everything else (indexes, reconciliation,
//! commits, yielding) is handled by [`CatalogAdapter`](crate::adapter::CatalogAdapter).

use crate::canonical::{CanonicalAlbum, CanonicalPlaylist, CanonicalPlaylistEntry, CanonicalTrack};
use crate::error::Result;
use async_trait::async_trait;
use core_auth::ProviderKind;
use std::time::Duration;

/// One page of canonical records.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePage<T> {
    pub items: Vec<T>,
    /// Size of the whole collection as reported by the source.
    pub total: u64,
    /// Offset of the next page, `None` on the last page.
    pub next_offset: Option<u64>,
}

impl<T> SourcePage<T> {
    pub fn last(items: Vec<T>) -> Self {
        let total = items.len() as u64;
        Self {
            items,
            total,
            next_offset: None,
        }
    }
}

/// Paged, read-only access to one provider's catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// Bound on the first page of each collection. `None` waits indefinitely.
    fn first_page_timeout(&self) -> Option<Duration> {
        None
    }

    /// Stop the track phase after the first page when the reported total
    /// equals the number of tracks already saved for this provider. Tracks
    /// known only through playlists do not count.
    fn skip_when_unchanged(&self) -> bool {
        false
    }

    /// Checks access before a phase starts.
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_tracks(&self, offset: u64) -> Result<SourcePage<CanonicalTrack>>;

    async fn fetch_playlists(&self, offset: u64) -> Result<SourcePage<CanonicalPlaylist>>;

    async fn fetch_playlist_entries(
        &self,
        playlist_item_id: &str,
        offset: u64,
    ) -> Result<SourcePage<CanonicalPlaylistEntry>>;

    async fn fetch_albums(&self, offset: u64) -> Result<SourcePage<CanonicalAlbum>>;
}
