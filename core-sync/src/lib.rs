//! # Sync & Dedup Module
//!
//! Pulls each connected provider's catalog into the unified library.
//!
//! ## Overview
//!
//! A sync run walks three phases per provider (tracks, playlists, albums).
//! Each incoming record is normalized, matched against what is already
//! stored and written only when its content actually changed, so running
//! the same sync twice leaves the library untouched. After every run a
//! dedup pass folds tracks that share an ISRC into one.
//!
//! ## Components
//!
//! - **Canonical records** (`canonical`): Normalized provider records and placeholder rules
//! - **Indexes** (`index`): In-memory lookups built once per phase
//! - **Reconciliation** (`reconcile`): Create, attach and merge rules for incoming records
//! - **Dedup** (`dedup`): ISRC-based duplicate folding
//! - **Sources & Adapters** (`source`, `adapter`): Paged provider access and phase drivers
//! - **Status** (`status`): Per-provider sync state machine
//! - **Run Queue** (`queue`): One run at a time, in request order
//! - **Orchestrator** (`orchestrator`): Staleness, scheduling, failure isolation and events

pub mod adapter;
pub mod canonical;
pub mod dedup;
pub mod error;
pub mod index;
pub mod orchestrator;
pub mod queue;
pub mod reconcile;
pub mod source;
pub mod status;

pub use adapter::{CatalogAdapter, ProviderAdapter, SyncPhase, SyncSummary};
pub use canonical::{
    best_fit_artwork, ArtworkCandidate, CanonicalAlbum, CanonicalPlaylist,
    CanonicalPlaylistEntry, CanonicalTrack,
};
pub use dedup::{DedupPass, DedupReport};
pub use error::{Result, SyncError};
pub use index::{ProviderIndex, StoredRecord, TrackIndex};
pub use orchestrator::{ProviderRunReport, SyncAllReport, SyncOrchestrator};
pub use queue::{RunQueue, RunTicket};
pub use reconcile::{MergePolicy, UpsertOutcome};
pub use source::{CatalogSource, SourcePage};
pub use status::ProviderSyncStatus;
