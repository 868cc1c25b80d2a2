//! Remote catalog API connector
//!
//! Implements `CatalogSource` for the bearer-token HTTP catalog API.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use core_auth::{CredentialProvider, ProviderKind};
use core_runtime::config::SyncConfig;
use core_sync::{
    best_fit_artwork, ArtworkCandidate, CanonicalAlbum, CanonicalPlaylist,
    CanonicalPlaylistEntry, CanonicalTrack, CatalogSource, SourcePage,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{RemoteApiError, Result};
use crate::types::{
    AlbumDto, ArtistDto, ImageDto, Paging, PlaylistDto, PlaylistItemDto, SavedAlbumDto,
    SavedTrackDto, TrackDto,
};

/// Per-request transport timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote catalog API connector
///
/// # Features
///
/// - `limit`/`offset` paging over saved tracks, playlists (with their
///   entries) and saved albums
/// - 429 handling: waits for `Retry-After` (or a fixed fallback) and retries
///   up to a bounded number of attempts
/// - Track phase shortcut when the saved-track total is unchanged
/// - Bearer tokens fetched per request from a `CredentialProvider`
///
/// # Example
///
/// ```ignore
/// use provider_remote_api::RemoteApiCatalog;
///
/// let catalog = RemoteApiCatalog::new(http_client, token_manager, "https://api.example.com/v1", &config);
/// let adapter = CatalogAdapter::new(Arc::new(catalog), &config, clock);
/// ```
pub struct RemoteApiCatalog {
    http_client: Arc<dyn HttpClient>,
    credentials: Arc<dyn CredentialProvider>,
    base_url: String,
    page_size: u32,
    max_attempts: u32,
    fallback_delay: Duration,
    artwork_target: u32,
}

impl RemoteApiCatalog {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        credentials: Arc<dyn CredentialProvider>,
        base_url: impl Into<String>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            http_client,
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_size: config.page_size,
            max_attempts: config.rate_limit_max_attempts.max(1),
            fallback_delay: config.rate_limit_fallback_delay,
            artwork_target: config.artwork_target_size,
        }
    }

    /// Parse RFC 3339 timestamp to Unix timestamp
    fn parse_timestamp(rfc3339: Option<&str>) -> Option<i64> {
        rfc3339
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc).timestamp())
    }

    fn join_artists(artists: &[ArtistDto]) -> String {
        artists
            .iter()
            .map(|a| a.name.trim())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn artwork(&self, images: &[ImageDto]) -> Option<String> {
        let candidates: Vec<ArtworkCandidate> = images
            .iter()
            .map(|image| {
                ArtworkCandidate::new(
                    image.url.clone(),
                    image.width.unwrap_or(0),
                    image.height.unwrap_or(0),
                )
            })
            .collect();
        best_fit_artwork(&candidates, self.artwork_target)
    }

    /// Converts a track. Items without an id cannot be tracked and are dropped.
    fn convert_track(&self, dto: TrackDto, added_at: Option<&str>) -> Option<CanonicalTrack> {
        let Some(id) = dto.id else {
            debug!(name = %dto.name, "Skipping track without id");
            return None;
        };

        Some(CanonicalTrack {
            provider_item_id: id,
            title: dto.name,
            artist_name: Self::join_artists(&dto.artists),
            album_name: dto.album.name,
            album_artist: dto.album.artists.first().map(|a| a.name.clone()),
            artwork_url: self.artwork(&dto.album.images),
            duration_ms: dto.duration_ms,
            release_date: dto.album.release_date,
            explicit: dto.explicit,
            isrc: dto.external_ids.isrc,
            disc_number: dto.disc_number,
            track_number: dto.track_number,
            added_at: Self::parse_timestamp(added_at),
            popularity: dto.popularity,
            preview_url: dto.preview_url,
            ..Default::default()
        })
    }

    fn convert_playlist(&self, dto: PlaylistDto) -> CanonicalPlaylist {
        CanonicalPlaylist {
            provider_item_id: dto.id,
            name: dto.name,
            description: dto.description,
            artwork_url: self.artwork(&dto.images),
            track_count: dto.tracks.total,
            owner_name: dto.owner.and_then(|o| o.display_name),
            is_public: dto.public.unwrap_or(false),
        }
    }

    fn convert_album(&self, dto: AlbumDto) -> CanonicalAlbum {
        CanonicalAlbum {
            provider_item_id: dto.id,
            title: dto.name,
            artist_name: Self::join_artists(&dto.artists),
            artwork_url: self.artwork(&dto.images),
            track_count: dto.total_tracks,
            release_date: dto.release_date,
            genres: dto.genres,
        }
    }

    fn collection_url(&self, path: &str, offset: u64) -> String {
        format!(
            "{}{}?limit={}&offset={}",
            self.base_url, path, self.page_size, offset
        )
    }

    /// Wait requested by a 429 response.
    fn retry_delay(&self, response: &HttpResponse) -> Duration {
        response
            .header("Retry-After")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.fallback_delay)
    }

    /// GET a JSON document, retrying while rate limited.
    #[instrument(skip(self), fields(url = %url))]
    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let token = self.credentials.access_token().await?;
            let request = HttpRequest::get(url.clone())
                .bearer_token(&token)
                .header("Accept", "application/json")
                .timeout(REQUEST_TIMEOUT);

            let response = self.http_client.execute(request).await?;
            match response.status {
                200..=299 => {
                    debug!(status = response.status, "API request succeeded");
                    return serde_json::from_slice(&response.body)
                        .map_err(|e| RemoteApiError::InvalidResponse(e.to_string()));
                }
                429 => {
                    if attempt >= self.max_attempts {
                        warn!(attempts = attempt, "Rate limit retries exhausted");
                        return Err(RemoteApiError::RateLimited { attempts: attempt });
                    }
                    let delay = self.retry_delay(&response);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, retrying"
                    );
                    core_async::time::sleep(delay).await;
                }
                status => {
                    let body = response.text_lossy();
                    let message = if body.trim().is_empty() {
                        format!("HTTP {}", status)
                    } else {
                        body.trim().to_string()
                    };
                    warn!(status, "API request failed");
                    return Err(RemoteApiError::Http { status, message });
                }
            }
        }
    }
}

#[async_trait]
impl CatalogSource for RemoteApiCatalog {
    fn provider(&self) -> ProviderKind {
        ProviderKind::RemoteApi
    }

    fn skip_when_unchanged(&self) -> bool {
        true
    }

    async fn prepare(&self) -> core_sync::Result<()> {
        self.credentials
            .access_token()
            .await
            .map(|_| ())
            .map_err(|e| RemoteApiError::from(e).into())
    }

    #[instrument(skip(self))]
    async fn fetch_tracks(&self, offset: u64) -> core_sync::Result<SourcePage<CanonicalTrack>> {
        let page: Paging<SavedTrackDto> =
            self.get_json(self.collection_url("/me/tracks", offset)).await?;
        let next_offset = page.next_offset();

        let items: Vec<CanonicalTrack> = page
            .items
            .into_iter()
            .filter_map(|saved| self.convert_track(saved.track, saved.added_at.as_deref()))
            .collect();

        info!(count = items.len(), total = page.total, "Retrieved saved tracks");
        Ok(SourcePage {
            items,
            total: page.total,
            next_offset,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_playlists(
        &self,
        offset: u64,
    ) -> core_sync::Result<SourcePage<CanonicalPlaylist>> {
        let page: Paging<PlaylistDto> = self
            .get_json(self.collection_url("/me/playlists", offset))
            .await?;
        let next_offset = page.next_offset();

        let items: Vec<CanonicalPlaylist> = page
            .items
            .into_iter()
            .map(|dto| self.convert_playlist(dto))
            .collect();

        info!(count = items.len(), total = page.total, "Retrieved playlists");
        Ok(SourcePage {
            items,
            total: page.total,
            next_offset,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_playlist_entries(
        &self,
        playlist_item_id: &str,
        offset: u64,
    ) -> core_sync::Result<SourcePage<CanonicalPlaylistEntry>> {
        let path = format!("/playlists/{}/tracks", urlencoding::encode(playlist_item_id));
        let page: Paging<PlaylistItemDto> =
            self.get_json(self.collection_url(&path, offset)).await?;
        let next_offset = page.next_offset();

        let items: Vec<CanonicalPlaylistEntry> = page
            .items
            .into_iter()
            .filter_map(|item| {
                // The entry date belongs to the playlist, not to the saved track.
                let track = self.convert_track(item.track?, None)?;
                Some(CanonicalPlaylistEntry {
                    track,
                    added_at: Self::parse_timestamp(item.added_at.as_deref()),
                })
            })
            .collect();

        debug!(count = items.len(), "Retrieved playlist entries");
        Ok(SourcePage {
            items,
            total: page.total,
            next_offset,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_albums(&self, offset: u64) -> core_sync::Result<SourcePage<CanonicalAlbum>> {
        let page: Paging<SavedAlbumDto> =
            self.get_json(self.collection_url("/me/albums", offset)).await?;
        let next_offset = page.next_offset();

        let items: Vec<CanonicalAlbum> = page
            .items
            .into_iter()
            .map(|saved| self.convert_album(saved.album))
            .collect();

        info!(count = items.len(), total = page.total, "Retrieved saved albums");
        Ok(SourcePage {
            items,
            total: page.total,
            next_offset,
        })
    }
}
