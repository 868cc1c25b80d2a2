//! Workspace umbrella crate.
//!
//! Re-exports the service facade so host applications can depend on a single
//! package and toggle the desktop bridges through the `desktop-shims` feature.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
