//! # Host Bridge Traits
//!
//! Contracts between the sync engine and the host it runs in.
//!
//! ## Overview
//!
//! The engine never talks to the network, the device catalog, or preference
//! storage directly. Each of those is a trait defined here and implemented per
//! host (`bridge-desktop` ships the desktop versions).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP requests against the remote catalog API
//!
//! ### Device catalog
//! - [`MediaLibrary`](media_library::MediaLibrary) - Paginated read access to the on-device songs,
//!   playlists and albums
//!
//! ### Storage
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences (persisted sync timestamps)
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic staleness tests
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert platform errors into it and keep messages actionable.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync`; sync runs execute on spawned tasks.

pub mod error;
pub mod http;
pub mod media_library;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use media_library::{
    MediaAlbum, MediaArtwork, MediaLibrary, MediaPage, MediaPageRequest, MediaPlaylist,
    MediaPlaylistEntry, MediaSong,
};
pub use storage::SettingsStore;
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
