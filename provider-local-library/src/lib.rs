//! # Local Library Provider
//!
//! Implements `CatalogSource` over the device's own music catalog.
//!
//! ## Overview
//!
//! This module provides:
//! - Paged songs, playlists with their entries, and albums from `MediaLibrary`
//! - Mapping of host records into canonical records (seconds to
//!   milliseconds, best-fit artwork, dates to Unix seconds)
//! - A bounded first page, so a stalled host fails the run with a timeout

pub mod catalog;

pub use catalog::LocalLibraryCatalog;
