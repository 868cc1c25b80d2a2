//! Domain models for the merged music library
//!
//! Five entities are persisted: [`Track`] (the canonical song),
//! [`SourceTrack`] (one provider's view of a track), [`Playlist`] with its
//! ordered [`PlaylistTrack`] entries, and [`Album`].

use core_auth::ProviderKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// ID Types
// =============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a canonical track
    TrackId
);
entity_id!(
    /// Unique identifier for a provider's track record
    SourceTrackId
);
entity_id!(
    /// Unique identifier for a playlist
    PlaylistId
);
entity_id!(
    /// Unique identifier for an album
    AlbumId
);

// =============================================================================
// Identity keys
// =============================================================================

/// Normalized (title, artist, album) identity of a [`Track`].
///
/// Two tracks with equal keys are the same song as far as metadata matching
/// is concerned; the database enforces at most one track per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackKey {
    pub title: String,
    pub artist: String,
    pub album: String,
}

impl TrackKey {
    const SEPARATOR: char = '\u{1f}';

    pub fn new(title: &str, artist: &str, album: &str) -> Self {
        Self {
            title: normalize_key_part(title),
            artist: normalize_key_part(artist),
            album: normalize_key_part(album),
        }
    }

    /// Single-column form stored in `tracks.match_key`.
    pub fn storage_key(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.title,
            self.artist,
            self.album,
            sep = Self::SEPARATOR
        )
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.title, self.artist, self.album)
    }
}

fn normalize_key_part(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Trimmed, case-folded ISRC, or `None` when blank.
pub fn normalize_isrc(isrc: Option<&str>) -> Option<String> {
    isrc.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty())
}

// =============================================================================
// Domain Models
// =============================================================================

/// Canonical song identity shared by every provider that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist_name: String,
    pub album_name: String,
    pub album_artist: Option<String>,
    pub artwork_url: Option<String>,
    /// Provider that supplied `artwork_url`
    pub artwork_provider: Option<ProviderKind>,
    pub duration_ms: i64,
    pub genres: Vec<String>,
    pub release_date: Option<String>,
    pub explicit: bool,
    pub isrc: Option<String>,
    pub disc_number: Option<i32>,
    pub track_number: Option<i32>,
    pub composer: Option<String>,
    /// Earliest acquisition time across providers
    pub added_at: Option<i64>,
    pub last_synced_at: i64,
}

impl Track {
    pub fn key(&self) -> TrackKey {
        TrackKey::new(&self.title, &self.artist_name, &self.album_name)
    }

    pub fn normalized_isrc(&self) -> Option<String> {
        normalize_isrc(self.isrc.as_deref())
    }

    /// Equal in everything except the sync timestamp.
    pub fn same_content(&self, other: &Track) -> bool {
        Track {
            last_synced_at: other.last_synced_at,
            ..self.clone()
        } == *other
    }

    /// Validate track data
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Track title cannot be empty".to_string());
        }

        if self.duration_ms < 0 {
            return Err("Track duration cannot be negative".to_string());
        }

        Ok(())
    }
}

/// A provider's record of a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTrack {
    pub id: SourceTrackId,
    pub track_id: TrackId,
    pub provider: ProviderKind,
    pub provider_item_id: String,
    /// Saved in the provider's library. `false` when only a playlist refers to it.
    pub in_library: bool,
    pub added_at: Option<i64>,
    /// Local library only
    pub play_count: Option<i64>,
    /// Local library only
    pub last_played_at: Option<i64>,
    /// Local library only
    pub rating: Option<i32>,
    /// Remote API only
    pub popularity: Option<i32>,
    /// Remote API only
    pub preview_url: Option<String>,
    pub artwork_url: Option<String>,
    pub last_synced_at: i64,
}

impl SourceTrack {
    pub fn same_content(&self, other: &SourceTrack) -> bool {
        SourceTrack {
            last_synced_at: other.last_synced_at,
            ..self.clone()
        } == *other
    }
}

/// Provider-native playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub provider: ProviderKind,
    pub provider_item_id: String,
    pub name: String,
    pub description: Option<String>,
    pub artwork_url: Option<String>,
    pub track_count: i64,
    pub owner_name: Option<String>,
    pub is_public: bool,
    pub last_synced_at: i64,
}

impl Playlist {
    pub fn same_content(&self, other: &Playlist) -> bool {
        Playlist {
            last_synced_at: other.last_synced_at,
            ..self.clone()
        } == *other
    }
}

/// Position of a track within a playlist.
///
/// Positions are 0-based and contiguous as of the last sync of the playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    pub playlist_id: PlaylistId,
    pub track_id: TrackId,
    pub position: i64,
    pub added_at: Option<i64>,
}

/// Provider-native album.
///
/// Albums do not reference tracks; they are associated at query time by
/// matching (album name, artist name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub provider: ProviderKind,
    pub provider_item_id: String,
    pub title: String,
    pub artist_name: String,
    pub artwork_url: Option<String>,
    pub track_count: i64,
    pub release_date: Option<String>,
    pub genres: Vec<String>,
    pub last_synced_at: i64,
}

impl Album {
    pub fn same_content(&self, other: &Album) -> bool {
        Album {
            last_synced_at: other.last_synced_at,
            ..self.clone()
        } == *other
    }
}

/// Rows removed by a provider disconnect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderPurge {
    pub source_tracks: u64,
    pub playlists: u64,
    pub albums: u64,
    pub orphaned_tracks: u64,
}
