//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the library sync crates:
//! - Logging and tracing setup
//! - Configuration (`CoreConfig`, `SyncConfig`)
//! - Event bus for auth, sync and library events

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, SyncConfig};
pub use error::{Error, Result};
