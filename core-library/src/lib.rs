//! # Music Library Storage
//!
//! Owns the merged library database: schema and migrations, the domain
//! models, and the transactional session API sync runs write through.
//!
//! ## Overview
//!
//! - [`db`]: connection pool setup and migrations
//! - [`models`]: tracks, source tracks, playlists, albums
//! - [`session`]: [`LibraryStore`] and [`LibrarySession`] with a SQLite
//!   implementation

pub mod db;
pub mod error;
pub mod models;
pub mod session;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
pub use models::{
    normalize_isrc, Album, AlbumId, Playlist, PlaylistId, PlaylistTrack, ProviderPurge,
    SourceTrack, SourceTrackId, Track, TrackId, TrackKey,
};
pub use session::{LibrarySession, LibraryStore, SqliteLibraryStore, SqliteLibrarySession};
