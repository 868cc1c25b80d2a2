//! Async runtime facade for the library sync engine.
//!
//! Every `core-*` and `provider-*` crate goes through this crate instead of
//! naming Tokio directly, so the executor stays swappable and the few
//! combinators the engine needs live in one place.
//!
//! # Modules
//!
//! - `task`: spawning and cooperative yielding
//! - `time`: sleep, timeouts and wall-clock helpers
//! - `sync`: async-aware locks and channels
//! - `future`: racing two futures and bounding a future by a deadline
//! - `runtime`: blocking entry point used by the `main`/`test` attributes
//!
//! # Examples
//!
//! ```rust
//! use core_async::future::{race, Either};
//! use core_async::time::{sleep, Duration};
//!
//! # core_async::runtime::block_on(async {
//! let winner = race(async { 1 }, sleep(Duration::from_secs(5))).await;
//! assert!(matches!(winner, Either::Left(1)));
//! # });
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

// Lets the attribute macros expand to `core_async::...` paths inside this crate.
extern crate self as core_async;

pub mod future;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
