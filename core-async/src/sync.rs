//! Synchronization primitives.
//!
//! Async-aware locks and channels from `tokio::sync`. The sync orchestrator
//! relies on [`Mutex`] being fair (FIFO) to serialize queued runs.
//!
//! ```rust
//! use core_async::sync::{Mutex, RwLock};
//!
//! # core_async::runtime::block_on(async {
//! let mutex = Mutex::new(42);
//! *mutex.lock().await += 1;
//!
//! let rwlock = RwLock::new(vec![1, 2, 3]);
//! assert_eq!(rwlock.read().await.len(), 3);
//! # });
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, OwnedMutexGuard, RwLock,
    RwLockReadGuard, RwLockWriteGuard, Semaphore,
};
