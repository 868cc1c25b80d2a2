//! Remote catalog API response types
//!
//! Every collection endpoint answers with the same paging envelope
//! ([`Paging`]); items differ per endpoint.

use serde::{Deserialize, Serialize};

/// Paging envelope shared by every collection endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    pub items: Vec<T>,

    /// Size of the whole collection
    pub total: u64,

    /// URL of the next page, absent on the last page
    #[serde(default)]
    pub next: Option<String>,

    /// Offset this page starts at
    #[serde(default)]
    pub offset: u64,

    #[serde(default)]
    pub limit: u64,
}

impl<T> Paging<T> {
    /// Offset of the following page, if the API reports one.
    pub fn next_offset(&self) -> Option<u64> {
        self.next
            .as_ref()
            .map(|_| self.offset + self.items.len() as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDto {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistDto {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExternalIdsDto {
    #[serde(default)]
    pub isrc: Option<String>,
}

/// Album as embedded in a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackAlbumDto {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistDto>,
    #[serde(default)]
    pub images: Vec<ImageDto>,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDto {
    /// Local files carried by the API have no id
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistDto>,
    pub album: TrackAlbumDto,
    #[serde(default)]
    pub duration_ms: i64,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub external_ids: ExternalIdsDto,
    #[serde(default)]
    pub disc_number: Option<i32>,
    #[serde(default)]
    pub track_number: Option<i32>,
    #[serde(default)]
    pub popularity: Option<i32>,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// Item of `GET /me/tracks`.
#[derive(Debug, Clone, Deserialize)]
pub struct SavedTrackDto {
    /// RFC 3339
    #[serde(default)]
    pub added_at: Option<String>,
    pub track: TrackDto,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerDto {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTracksRefDto {
    pub total: i64,
}

/// Item of `GET /me/playlists`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageDto>,
    #[serde(default)]
    pub owner: Option<OwnerDto>,
    #[serde(default)]
    pub public: Option<bool>,
    pub tracks: PlaylistTracksRefDto,
}

/// Item of `GET /playlists/{id}/tracks`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItemDto {
    #[serde(default)]
    pub added_at: Option<String>,
    /// Null when the track was removed from the catalog
    #[serde(default)]
    pub track: Option<TrackDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistDto>,
    #[serde(default)]
    pub images: Vec<ImageDto>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub total_tracks: i64,
}

/// Item of `GET /me/albums`.
#[derive(Debug, Clone, Deserialize)]
pub struct SavedAlbumDto {
    #[serde(default)]
    pub added_at: Option<String>,
    pub album: AlbumDto,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_next_offset() {
        let page: Paging<SavedAlbumDto> = serde_json::from_str(
            r#"{"items": [], "total": 0, "next": null, "offset": 0, "limit": 50}"#,
        )
        .unwrap();
        assert_eq!(page.next_offset(), None);

        let page: Paging<PlaylistItemDto> = serde_json::from_str(
            r#"{
                "items": [{"added_at": null, "track": null}, {"track": null}],
                "total": 10,
                "next": "https://api.example.com/v1/playlists/p/tracks?offset=6&limit=2",
                "offset": 4,
                "limit": 2
            }"#,
        )
        .unwrap();
        assert_eq!(page.next_offset(), Some(6));
    }

    #[test]
    fn test_saved_track_deserialization() {
        let saved: SavedTrackDto = serde_json::from_str(
            r#"{
                "added_at": "2024-03-01T10:00:00Z",
                "track": {
                    "id": "t1",
                    "name": "Song",
                    "artists": [{"id": "a1", "name": "Artist"}],
                    "album": {"name": "Album", "images": [{"url": "https://img/640", "width": 640, "height": 640}]},
                    "duration_ms": 180000,
                    "external_ids": {"isrc": "USRC12345678"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(saved.track.id.as_deref(), Some("t1"));
        assert_eq!(saved.track.external_ids.isrc.as_deref(), Some("USRC12345678"));
        assert!(!saved.track.explicit);
        assert_eq!(saved.track.album.images[0].width, Some(640));
    }
}
