//! Storage sessions.
//!
//! A sync run talks to the database through one [`LibrarySession`]. The
//! session wraps a single transaction that is opened lazily on first use and
//! committed by [`LibrarySession::save`]; the next call opens a fresh one.
//! Dropping a session without saving rolls back whatever it wrote since the
//! last save.

use crate::error::{LibraryError, Result};
use crate::models::{
    Album, AlbumId, Playlist, PlaylistId, PlaylistTrack, ProviderPurge, SourceTrack,
    SourceTrackId, Track, TrackId,
};
use async_trait::async_trait;
use core_auth::ProviderKind;
use sqlx::{FromRow, Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, info};

/// Hands out storage sessions.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Opens a session; fails with [`LibraryError::Unavailable`] when the
    /// storage engine cannot accept one.
    async fn open_session(&self) -> Result<Box<dyn LibrarySession>>;
}

/// Transactional view of the library used by one sync run.
#[async_trait]
pub trait LibrarySession: Send {
    /// All tracks in insertion order.
    async fn fetch_tracks(&mut self) -> Result<Vec<Track>>;

    async fn fetch_track(&mut self, id: TrackId) -> Result<Option<Track>>;

    /// Source tracks of `provider`, or of every provider when `None`.
    async fn fetch_source_tracks(
        &mut self,
        provider: Option<ProviderKind>,
    ) -> Result<Vec<SourceTrack>>;

    /// Source tracks of `provider` saved in its library, excluding those only
    /// referenced by playlists.
    async fn count_saved_source_tracks(&mut self, provider: ProviderKind) -> Result<u64>;

    async fn fetch_playlists(&mut self, provider: ProviderKind) -> Result<Vec<Playlist>>;

    /// Entries of a playlist ordered by position.
    async fn fetch_playlist_tracks(&mut self, playlist_id: PlaylistId) -> Result<Vec<PlaylistTrack>>;

    async fn fetch_albums(&mut self, provider: ProviderKind) -> Result<Vec<Album>>;

    /// Tracks whose album and artist names match `album`, case-insensitively.
    async fn fetch_album_tracks(&mut self, album: &Album) -> Result<Vec<Track>>;

    async fn insert_track(&mut self, track: &Track) -> Result<()>;

    async fn update_track(&mut self, track: &Track) -> Result<()>;

    async fn delete_track(&mut self, id: TrackId) -> Result<()>;

    async fn insert_source_track(&mut self, source: &SourceTrack) -> Result<()>;

    async fn update_source_track(&mut self, source: &SourceTrack) -> Result<()>;

    /// Moves source tracks and playlist entries from `from` onto `to`.
    /// Returns the number of source tracks moved.
    async fn reassign_track(&mut self, from: TrackId, to: TrackId) -> Result<u64>;

    async fn insert_playlist(&mut self, playlist: &Playlist) -> Result<()>;

    async fn update_playlist(&mut self, playlist: &Playlist) -> Result<()>;

    /// Deletes every entry of the playlist and inserts `entries`.
    async fn replace_playlist_tracks(
        &mut self,
        playlist_id: PlaylistId,
        entries: &[PlaylistTrack],
    ) -> Result<()>;

    async fn insert_album(&mut self, album: &Album) -> Result<()>;

    async fn update_album(&mut self, album: &Album) -> Result<()>;

    /// Deletes the provider's source tracks, playlists (with their entries)
    /// and albums, then sweeps tracks left without any source.
    async fn delete_provider_data(&mut self, provider: ProviderKind) -> Result<ProviderPurge>;

    /// Deletes tracks that no source track references.
    async fn delete_orphaned_tracks(&mut self) -> Result<u64>;

    /// Commits everything written since the last save.
    async fn save(&mut self) -> Result<()>;

    /// Discards everything written since the last save.
    async fn rollback(&mut self) -> Result<()>;
}

/// [`LibraryStore`] over a SQLite pool.
#[derive(Clone)]
pub struct SqliteLibraryStore {
    pool: SqlitePool,
}

impl SqliteLibraryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LibraryStore for SqliteLibraryStore {
    async fn open_session(&self) -> Result<Box<dyn LibrarySession>> {
        if self.pool.is_closed() {
            return Err(LibraryError::Unavailable(
                "connection pool is closed".to_string(),
            ));
        }
        Ok(Box::new(SqliteLibrarySession::new(self.pool.clone())))
    }
}

/// Session holding at most one open transaction.
pub struct SqliteLibrarySession {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteLibrarySession {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, tx: None }
    }

    async fn conn(&mut self) -> Result<&mut SqliteConnection> {
        if self.tx.is_none() {
            self.tx = Some(self.pool.begin().await?);
        }
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(LibraryError::Unavailable(
                "transaction could not be opened".to_string(),
            )),
        }
    }
}

// =============================================================================
// Row mapping
// =============================================================================

fn parse_provider(value: &str) -> Result<ProviderKind> {
    ProviderKind::parse(value)
        .ok_or_else(|| LibraryError::invalid("provider", format!("unknown provider {}", value)))
}

fn parse_genres(value: &str) -> Result<Vec<String>> {
    serde_json::from_str(value).map_err(|e| LibraryError::invalid("genres", e.to_string()))
}

fn encode_genres(genres: &[String]) -> Result<String> {
    serde_json::to_string(genres).map_err(|e| LibraryError::invalid("genres", e.to_string()))
}

fn parse_id<T>(field: &str, value: &str, parse: fn(&str) -> std::result::Result<T, uuid::Error>) -> Result<T> {
    parse(value).map_err(|e| LibraryError::invalid(field, e.to_string()))
}

const TRACK_COLUMNS: &str = "id, title, artist_name, album_name, album_artist, artwork_url, \
     artwork_provider, duration_ms, genres, release_date, explicit, isrc, disc_number, \
     track_number, composer, added_at, last_synced_at";

#[derive(Debug, FromRow)]
struct TrackRow {
    id: String,
    title: String,
    artist_name: String,
    album_name: String,
    album_artist: Option<String>,
    artwork_url: Option<String>,
    artwork_provider: Option<String>,
    duration_ms: i64,
    genres: String,
    release_date: Option<String>,
    explicit: bool,
    isrc: Option<String>,
    disc_number: Option<i32>,
    track_number: Option<i32>,
    composer: Option<String>,
    added_at: Option<i64>,
    last_synced_at: i64,
}

impl TryFrom<TrackRow> for Track {
    type Error = LibraryError;

    fn try_from(row: TrackRow) -> Result<Self> {
        Ok(Track {
            id: parse_id("id", &row.id, TrackId::from_string)?,
            title: row.title,
            artist_name: row.artist_name,
            album_name: row.album_name,
            album_artist: row.album_artist,
            artwork_url: row.artwork_url,
            artwork_provider: row.artwork_provider.as_deref().map(parse_provider).transpose()?,
            duration_ms: row.duration_ms,
            genres: parse_genres(&row.genres)?,
            release_date: row.release_date,
            explicit: row.explicit,
            isrc: row.isrc,
            disc_number: row.disc_number,
            track_number: row.track_number,
            composer: row.composer,
            added_at: row.added_at,
            last_synced_at: row.last_synced_at,
        })
    }
}

const SOURCE_TRACK_COLUMNS: &str = "id, track_id, provider, provider_item_id, in_library, added_at, \
     play_count, last_played_at, rating, popularity, preview_url, artwork_url, last_synced_at";

#[derive(Debug, FromRow)]
struct SourceTrackRow {
    id: String,
    track_id: String,
    provider: String,
    provider_item_id: String,
    in_library: bool,
    added_at: Option<i64>,
    play_count: Option<i64>,
    last_played_at: Option<i64>,
    rating: Option<i32>,
    popularity: Option<i32>,
    preview_url: Option<String>,
    artwork_url: Option<String>,
    last_synced_at: i64,
}

impl TryFrom<SourceTrackRow> for SourceTrack {
    type Error = LibraryError;

    fn try_from(row: SourceTrackRow) -> Result<Self> {
        Ok(SourceTrack {
            id: parse_id("id", &row.id, SourceTrackId::from_string)?,
            track_id: parse_id("track_id", &row.track_id, TrackId::from_string)?,
            provider: parse_provider(&row.provider)?,
            provider_item_id: row.provider_item_id,
            in_library: row.in_library,
            added_at: row.added_at,
            play_count: row.play_count,
            last_played_at: row.last_played_at,
            rating: row.rating,
            popularity: row.popularity,
            preview_url: row.preview_url,
            artwork_url: row.artwork_url,
            last_synced_at: row.last_synced_at,
        })
    }
}

const PLAYLIST_COLUMNS: &str = "id, provider, provider_item_id, name, description, artwork_url, \
     track_count, owner_name, is_public, last_synced_at";

#[derive(Debug, FromRow)]
struct PlaylistRow {
    id: String,
    provider: String,
    provider_item_id: String,
    name: String,
    description: Option<String>,
    artwork_url: Option<String>,
    track_count: i64,
    owner_name: Option<String>,
    is_public: bool,
    last_synced_at: i64,
}

impl TryFrom<PlaylistRow> for Playlist {
    type Error = LibraryError;

    fn try_from(row: PlaylistRow) -> Result<Self> {
        Ok(Playlist {
            id: parse_id("id", &row.id, PlaylistId::from_string)?,
            provider: parse_provider(&row.provider)?,
            provider_item_id: row.provider_item_id,
            name: row.name,
            description: row.description,
            artwork_url: row.artwork_url,
            track_count: row.track_count,
            owner_name: row.owner_name,
            is_public: row.is_public,
            last_synced_at: row.last_synced_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PlaylistTrackRow {
    playlist_id: String,
    track_id: String,
    position: i64,
    added_at: Option<i64>,
}

impl TryFrom<PlaylistTrackRow> for PlaylistTrack {
    type Error = LibraryError;

    fn try_from(row: PlaylistTrackRow) -> Result<Self> {
        Ok(PlaylistTrack {
            playlist_id: parse_id("playlist_id", &row.playlist_id, PlaylistId::from_string)?,
            track_id: parse_id("track_id", &row.track_id, TrackId::from_string)?,
            position: row.position,
            added_at: row.added_at,
        })
    }
}

const ALBUM_COLUMNS: &str = "id, provider, provider_item_id, title, artist_name, artwork_url, \
     track_count, release_date, genres, last_synced_at";

#[derive(Debug, FromRow)]
struct AlbumRow {
    id: String,
    provider: String,
    provider_item_id: String,
    title: String,
    artist_name: String,
    artwork_url: Option<String>,
    track_count: i64,
    release_date: Option<String>,
    genres: String,
    last_synced_at: i64,
}

impl TryFrom<AlbumRow> for Album {
    type Error = LibraryError;

    fn try_from(row: AlbumRow) -> Result<Self> {
        Ok(Album {
            id: parse_id("id", &row.id, AlbumId::from_string)?,
            provider: parse_provider(&row.provider)?,
            provider_item_id: row.provider_item_id,
            title: row.title,
            artist_name: row.artist_name,
            artwork_url: row.artwork_url,
            track_count: row.track_count,
            release_date: row.release_date,
            genres: parse_genres(&row.genres)?,
            last_synced_at: row.last_synced_at,
        })
    }
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = LibraryError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// =============================================================================
// Session implementation
// =============================================================================

#[async_trait]
impl LibrarySession for SqliteLibrarySession {
    async fn fetch_tracks(&mut self) -> Result<Vec<Track>> {
        let sql = format!("SELECT {} FROM tracks ORDER BY rowid", TRACK_COLUMNS);
        let rows = sqlx::query_as::<_, TrackRow>(&sql)
            .fetch_all(self.conn().await?)
            .await?;
        collect(rows)
    }

    async fn fetch_track(&mut self, id: TrackId) -> Result<Option<Track>> {
        let sql = format!("SELECT {} FROM tracks WHERE id = ?", TRACK_COLUMNS);
        let row = sqlx::query_as::<_, TrackRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(self.conn().await?)
            .await?;
        row.map(Track::try_from).transpose()
    }

    async fn fetch_source_tracks(
        &mut self,
        provider: Option<ProviderKind>,
    ) -> Result<Vec<SourceTrack>> {
        let rows = match provider {
            Some(provider) => {
                let sql = format!(
                    "SELECT {} FROM source_tracks WHERE provider = ? ORDER BY rowid",
                    SOURCE_TRACK_COLUMNS
                );
                sqlx::query_as::<_, SourceTrackRow>(&sql)
                    .bind(provider.as_str())
                    .fetch_all(self.conn().await?)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM source_tracks ORDER BY rowid",
                    SOURCE_TRACK_COLUMNS
                );
                sqlx::query_as::<_, SourceTrackRow>(&sql)
                    .fetch_all(self.conn().await?)
                    .await?
            }
        };
        collect(rows)
    }

    async fn count_saved_source_tracks(&mut self, provider: ProviderKind) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM source_tracks WHERE provider = ? AND in_library = 1",
        )
        .bind(provider.as_str())
        .fetch_one(self.conn().await?)
        .await?;
        Ok(count as u64)
    }

    async fn fetch_playlists(&mut self, provider: ProviderKind) -> Result<Vec<Playlist>> {
        let sql = format!(
            "SELECT {} FROM playlists WHERE provider = ? ORDER BY rowid",
            PLAYLIST_COLUMNS
        );
        let rows = sqlx::query_as::<_, PlaylistRow>(&sql)
            .bind(provider.as_str())
            .fetch_all(self.conn().await?)
            .await?;
        collect(rows)
    }

    async fn fetch_playlist_tracks(&mut self, playlist_id: PlaylistId) -> Result<Vec<PlaylistTrack>> {
        let rows = sqlx::query_as::<_, PlaylistTrackRow>(
            "SELECT playlist_id, track_id, position, added_at FROM playlist_tracks \
             WHERE playlist_id = ? ORDER BY position",
        )
        .bind(playlist_id.to_string())
        .fetch_all(self.conn().await?)
        .await?;
        collect(rows)
    }

    async fn fetch_albums(&mut self, provider: ProviderKind) -> Result<Vec<Album>> {
        let sql = format!(
            "SELECT {} FROM albums WHERE provider = ? ORDER BY rowid",
            ALBUM_COLUMNS
        );
        let rows = sqlx::query_as::<_, AlbumRow>(&sql)
            .bind(provider.as_str())
            .fetch_all(self.conn().await?)
            .await?;
        collect(rows)
    }

    async fn fetch_album_tracks(&mut self, album: &Album) -> Result<Vec<Track>> {
        let sql = format!(
            "SELECT {} FROM tracks \
             WHERE album_name = ? COLLATE NOCASE AND artist_name = ? COLLATE NOCASE \
             ORDER BY disc_number, track_number, rowid",
            TRACK_COLUMNS
        );
        let rows = sqlx::query_as::<_, TrackRow>(&sql)
            .bind(album.title.trim())
            .bind(album.artist_name.trim())
            .fetch_all(self.conn().await?)
            .await?;
        collect(rows)
    }

    async fn insert_track(&mut self, track: &Track) -> Result<()> {
        let genres = encode_genres(&track.genres)?;
        sqlx::query(
            r#"
            INSERT INTO tracks (
                id, match_key, title, artist_name, album_name, album_artist,
                artwork_url, artwork_provider, duration_ms, genres, release_date,
                explicit, isrc, disc_number, track_number, composer, added_at,
                last_synced_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(track.id.to_string())
        .bind(track.key().storage_key())
        .bind(&track.title)
        .bind(&track.artist_name)
        .bind(&track.album_name)
        .bind(&track.album_artist)
        .bind(&track.artwork_url)
        .bind(track.artwork_provider.map(|p| p.as_str()))
        .bind(track.duration_ms)
        .bind(genres)
        .bind(&track.release_date)
        .bind(track.explicit)
        .bind(&track.isrc)
        .bind(track.disc_number)
        .bind(track.track_number)
        .bind(&track.composer)
        .bind(track.added_at)
        .bind(track.last_synced_at)
        .execute(self.conn().await?)
        .await?;
        Ok(())
    }

    async fn update_track(&mut self, track: &Track) -> Result<()> {
        let genres = encode_genres(&track.genres)?;
        let result = sqlx::query(
            r#"
            UPDATE tracks SET
                match_key = ?, title = ?, artist_name = ?, album_name = ?,
                album_artist = ?, artwork_url = ?, artwork_provider = ?,
                duration_ms = ?, genres = ?, release_date = ?, explicit = ?,
                isrc = ?, disc_number = ?, track_number = ?, composer = ?,
                added_at = ?, last_synced_at = ?
            WHERE id = ?
            "#,
        )
        .bind(track.key().storage_key())
        .bind(&track.title)
        .bind(&track.artist_name)
        .bind(&track.album_name)
        .bind(&track.album_artist)
        .bind(&track.artwork_url)
        .bind(track.artwork_provider.map(|p| p.as_str()))
        .bind(track.duration_ms)
        .bind(genres)
        .bind(&track.release_date)
        .bind(track.explicit)
        .bind(&track.isrc)
        .bind(track.disc_number)
        .bind(track.track_number)
        .bind(&track.composer)
        .bind(track.added_at)
        .bind(track.last_synced_at)
        .bind(track.id.to_string())
        .execute(self.conn().await?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Track".to_string(),
                id: track.id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_track(&mut self, id: TrackId) -> Result<()> {
        sqlx::query("DELETE FROM tracks WHERE id = ?")
            .bind(id.to_string())
            .execute(self.conn().await?)
            .await?;
        Ok(())
    }

    async fn insert_source_track(&mut self, source: &SourceTrack) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO source_tracks (
                id, track_id, provider, provider_item_id, in_library, added_at,
                play_count, last_played_at, rating, popularity, preview_url,
                artwork_url, last_synced_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(source.id.to_string())
        .bind(source.track_id.to_string())
        .bind(source.provider.as_str())
        .bind(&source.provider_item_id)
        .bind(source.in_library)
        .bind(source.added_at)
        .bind(source.play_count)
        .bind(source.last_played_at)
        .bind(source.rating)
        .bind(source.popularity)
        .bind(&source.preview_url)
        .bind(&source.artwork_url)
        .bind(source.last_synced_at)
        .execute(self.conn().await?)
        .await?;
        Ok(())
    }

    async fn update_source_track(&mut self, source: &SourceTrack) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE source_tracks SET
                track_id = ?, in_library = ?, added_at = ?, play_count = ?, last_played_at = ?,
                rating = ?, popularity = ?, preview_url = ?, artwork_url = ?,
                last_synced_at = ?
            WHERE id = ?
            "#,
        )
        .bind(source.track_id.to_string())
        .bind(source.in_library)
        .bind(source.added_at)
        .bind(source.play_count)
        .bind(source.last_played_at)
        .bind(source.rating)
        .bind(source.popularity)
        .bind(&source.preview_url)
        .bind(&source.artwork_url)
        .bind(source.last_synced_at)
        .bind(source.id.to_string())
        .execute(self.conn().await?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "SourceTrack".to_string(),
                id: source.id.to_string(),
            });
        }
        Ok(())
    }

    async fn reassign_track(&mut self, from: TrackId, to: TrackId) -> Result<u64> {
        let moved = sqlx::query("UPDATE source_tracks SET track_id = ? WHERE track_id = ?")
            .bind(to.to_string())
            .bind(from.to_string())
            .execute(self.conn().await?)
            .await?
            .rows_affected();

        sqlx::query("UPDATE playlist_tracks SET track_id = ? WHERE track_id = ?")
            .bind(to.to_string())
            .bind(from.to_string())
            .execute(self.conn().await?)
            .await?;

        debug!(from = %from, to = %to, moved, "Reassigned track references");
        Ok(moved)
    }

    async fn insert_playlist(&mut self, playlist: &Playlist) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO playlists (
                id, provider, provider_item_id, name, description, artwork_url,
                track_count, owner_name, is_public, last_synced_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(playlist.id.to_string())
        .bind(playlist.provider.as_str())
        .bind(&playlist.provider_item_id)
        .bind(&playlist.name)
        .bind(&playlist.description)
        .bind(&playlist.artwork_url)
        .bind(playlist.track_count)
        .bind(&playlist.owner_name)
        .bind(playlist.is_public)
        .bind(playlist.last_synced_at)
        .execute(self.conn().await?)
        .await?;
        Ok(())
    }

    async fn update_playlist(&mut self, playlist: &Playlist) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE playlists SET
                name = ?, description = ?, artwork_url = ?, track_count = ?,
                owner_name = ?, is_public = ?, last_synced_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&playlist.name)
        .bind(&playlist.description)
        .bind(&playlist.artwork_url)
        .bind(playlist.track_count)
        .bind(&playlist.owner_name)
        .bind(playlist.is_public)
        .bind(playlist.last_synced_at)
        .bind(playlist.id.to_string())
        .execute(self.conn().await?)
        .await?;
        Ok(())
    }

    async fn replace_playlist_tracks(
        &mut self,
        playlist_id: PlaylistId,
        entries: &[PlaylistTrack],
    ) -> Result<()> {
        sqlx::query("DELETE FROM playlist_tracks WHERE playlist_id = ?")
            .bind(playlist_id.to_string())
            .execute(self.conn().await?)
            .await?;

        for entry in entries {
            sqlx::query(
                "INSERT INTO playlist_tracks (playlist_id, track_id, position, added_at) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(playlist_id.to_string())
            .bind(entry.track_id.to_string())
            .bind(entry.position)
            .bind(entry.added_at)
            .execute(self.conn().await?)
            .await?;
        }
        Ok(())
    }

    async fn insert_album(&mut self, album: &Album) -> Result<()> {
        let genres = encode_genres(&album.genres)?;
        sqlx::query(
            r#"
            INSERT INTO albums (
                id, provider, provider_item_id, title, artist_name, artwork_url,
                track_count, release_date, genres, last_synced_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(album.id.to_string())
        .bind(album.provider.as_str())
        .bind(&album.provider_item_id)
        .bind(&album.title)
        .bind(&album.artist_name)
        .bind(&album.artwork_url)
        .bind(album.track_count)
        .bind(&album.release_date)
        .bind(genres)
        .bind(album.last_synced_at)
        .execute(self.conn().await?)
        .await?;
        Ok(())
    }

    async fn update_album(&mut self, album: &Album) -> Result<()> {
        let genres = encode_genres(&album.genres)?;
        sqlx::query(
            r#"
            UPDATE albums SET
                title = ?, artist_name = ?, artwork_url = ?, track_count = ?,
                release_date = ?, genres = ?, last_synced_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&album.title)
        .bind(&album.artist_name)
        .bind(&album.artwork_url)
        .bind(album.track_count)
        .bind(&album.release_date)
        .bind(genres)
        .bind(album.last_synced_at)
        .bind(album.id.to_string())
        .execute(self.conn().await?)
        .await?;
        Ok(())
    }

    async fn delete_provider_data(&mut self, provider: ProviderKind) -> Result<ProviderPurge> {
        let source_tracks = sqlx::query("DELETE FROM source_tracks WHERE provider = ?")
            .bind(provider.as_str())
            .execute(self.conn().await?)
            .await?
            .rows_affected();

        let playlists = sqlx::query("DELETE FROM playlists WHERE provider = ?")
            .bind(provider.as_str())
            .execute(self.conn().await?)
            .await?
            .rows_affected();

        let albums = sqlx::query("DELETE FROM albums WHERE provider = ?")
            .bind(provider.as_str())
            .execute(self.conn().await?)
            .await?
            .rows_affected();

        let orphaned_tracks = self.delete_orphaned_tracks().await?;

        let purge = ProviderPurge {
            source_tracks,
            playlists,
            albums,
            orphaned_tracks,
        };
        info!(provider = %provider, ?purge, "Deleted provider data");
        Ok(purge)
    }

    async fn delete_orphaned_tracks(&mut self) -> Result<u64> {
        let deleted = sqlx::query(
            "DELETE FROM tracks WHERE id NOT IN (SELECT DISTINCT track_id FROM source_tracks)",
        )
        .execute(self.conn().await?)
        .await?
        .rows_affected();
        Ok(deleted)
    }

    async fn save(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
            debug!("Session committed");
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
            debug!("Session rolled back");
        }
        Ok(())
    }
}
