//! # Remote Catalog Provider
//!
//! Implements `CatalogSource` for the OAuth-backed remote music API.
//!
//! ## Overview
//!
//! This module provides:
//! - Saved tracks, playlists with their entries, and saved albums
//! - `limit`/`offset` paging driven by the API's `next`/`total` envelope
//! - Bounded wait-and-retry on HTTP 429
//! - Mapping of API payloads into canonical records

pub mod catalog;
pub mod error;
pub mod types;

pub use catalog::RemoteApiCatalog;
pub use error::{RemoteApiError, Result};
