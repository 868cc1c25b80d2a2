//! Canonical records.
//!
//! Sources map their native records into these provider-agnostic shapes.
//! [`CanonicalTrack::normalized`] and friends apply the shared cleanup rules
//! before reconciliation: trimmed text, placeholder names for blank
//! identity fields, non-negative durations and de-duplicated genre lists.

use core_library::TrackKey;

pub const UNKNOWN_TRACK: &str = "Unknown Track";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNTITLED_PLAYLIST: &str = "Untitled Playlist";

/// Trims `value`, substituting `fallback` when nothing is left.
pub fn normalize_text(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Trims an optional value; blank becomes `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn clamp_duration_ms(duration_ms: i64) -> i64 {
    duration_ms.max(0)
}

/// Trimmed, non-empty genres in first-seen order without case-insensitive repeats.
pub fn normalize_genres(genres: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    genres
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty() && seen.insert(g.to_lowercase()))
        .collect()
}

/// Whether `value` is one of the placeholder names.
pub fn is_placeholder(value: &str) -> bool {
    matches!(value, UNKNOWN_TRACK | UNKNOWN_ARTIST | UNKNOWN_ALBUM)
}

/// An artwork rendition offered by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkCandidate {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl ArtworkCandidate {
    pub fn new(url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            url: url.into(),
            width,
            height,
        }
    }
}

/// Picks the candidate whose longer edge is nearest to `target` pixels.
///
/// Ties go to the earlier candidate. Candidates with blank URLs are ignored.
pub fn best_fit_artwork(candidates: &[ArtworkCandidate], target: u32) -> Option<String> {
    candidates
        .iter()
        .filter(|c| !c.url.trim().is_empty())
        .min_by_key(|c| c.width.max(c.height).abs_diff(target))
        .map(|c| c.url.trim().to_string())
}

/// Provider-agnostic track as delivered by a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalTrack {
    pub provider_item_id: String,
    pub title: String,
    pub artist_name: String,
    pub album_name: String,
    pub album_artist: Option<String>,
    pub artwork_url: Option<String>,
    pub duration_ms: i64,
    pub genres: Vec<String>,
    pub release_date: Option<String>,
    pub explicit: bool,
    pub isrc: Option<String>,
    pub disc_number: Option<i32>,
    pub track_number: Option<i32>,
    pub composer: Option<String>,
    pub added_at: Option<i64>,
    pub play_count: Option<i64>,
    pub last_played_at: Option<i64>,
    pub rating: Option<i32>,
    pub popularity: Option<i32>,
    pub preview_url: Option<String>,
}

impl CanonicalTrack {
    pub fn new(
        provider_item_id: impl Into<String>,
        title: impl Into<String>,
        artist_name: impl Into<String>,
        album_name: impl Into<String>,
    ) -> Self {
        Self {
            provider_item_id: provider_item_id.into(),
            title: title.into(),
            artist_name: artist_name.into(),
            album_name: album_name.into(),
            ..Default::default()
        }
    }

    pub fn normalized(self) -> Self {
        Self {
            provider_item_id: self.provider_item_id.trim().to_string(),
            title: normalize_text(&self.title, UNKNOWN_TRACK),
            artist_name: normalize_text(&self.artist_name, UNKNOWN_ARTIST),
            album_name: normalize_text(&self.album_name, UNKNOWN_ALBUM),
            album_artist: normalize_optional(self.album_artist),
            artwork_url: normalize_optional(self.artwork_url),
            duration_ms: clamp_duration_ms(self.duration_ms),
            genres: normalize_genres(self.genres),
            release_date: normalize_optional(self.release_date),
            isrc: normalize_optional(self.isrc),
            composer: normalize_optional(self.composer),
            preview_url: normalize_optional(self.preview_url),
            ..self
        }
    }

    pub fn key(&self) -> TrackKey {
        TrackKey::new(&self.title, &self.artist_name, &self.album_name)
    }
}

/// Provider-agnostic playlist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalPlaylist {
    pub provider_item_id: String,
    pub name: String,
    pub description: Option<String>,
    pub artwork_url: Option<String>,
    pub track_count: i64,
    pub owner_name: Option<String>,
    pub is_public: bool,
}

impl CanonicalPlaylist {
    pub fn new(provider_item_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            provider_item_id: provider_item_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn normalized(self) -> Self {
        Self {
            provider_item_id: self.provider_item_id.trim().to_string(),
            name: normalize_text(&self.name, UNTITLED_PLAYLIST),
            description: normalize_optional(self.description),
            artwork_url: normalize_optional(self.artwork_url),
            track_count: self.track_count.max(0),
            owner_name: normalize_optional(self.owner_name),
            ..self
        }
    }
}

/// One ordered playlist entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalPlaylistEntry {
    pub track: CanonicalTrack,
    pub added_at: Option<i64>,
}

/// Provider-agnostic album.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalAlbum {
    pub provider_item_id: String,
    pub title: String,
    pub artist_name: String,
    pub artwork_url: Option<String>,
    pub track_count: i64,
    pub release_date: Option<String>,
    pub genres: Vec<String>,
}

impl CanonicalAlbum {
    pub fn new(
        provider_item_id: impl Into<String>,
        title: impl Into<String>,
        artist_name: impl Into<String>,
    ) -> Self {
        Self {
            provider_item_id: provider_item_id.into(),
            title: title.into(),
            artist_name: artist_name.into(),
            ..Default::default()
        }
    }

    pub fn normalized(self) -> Self {
        Self {
            provider_item_id: self.provider_item_id.trim().to_string(),
            title: normalize_text(&self.title, UNKNOWN_ALBUM),
            artist_name: normalize_text(&self.artist_name, UNKNOWN_ARTIST),
            artwork_url: normalize_optional(self.artwork_url),
            track_count: self.track_count.max(0),
            release_date: normalize_optional(self.release_date),
            genres: normalize_genres(self.genres),
        }
    }
}
