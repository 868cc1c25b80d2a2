//! Task spawning and cooperative scheduling.
//!
//! Sync runs execute their paging and reconciliation on a spawned task and
//! call [`yield_now`] periodically so long loops never monopolize the
//! executor.

pub use tokio::task::{spawn_blocking, yield_now, JoinError, JoinHandle};

/// Spawns a new asynchronous task on the current runtime.
///
/// # Examples
///
/// ```rust
/// use core_async::task::spawn;
///
/// # core_async::runtime::block_on(async {
/// let handle = spawn(async { 42 });
/// assert_eq!(handle.await.unwrap(), 42);
/// # });
/// ```
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Counts processed items and yields to the scheduler every `every` items.
///
/// An interval of zero disables yielding.
#[derive(Debug, Clone)]
pub struct YieldBudget {
    every: usize,
    processed: usize,
}

impl YieldBudget {
    pub fn new(every: usize) -> Self {
        Self {
            every,
            processed: 0,
        }
    }

    /// Records one processed item, yielding when the interval is reached.
    pub async fn tick(&mut self) {
        self.processed += 1;
        if self.every > 0 && self.processed % self.every == 0 {
            yield_now().await;
        }
    }

    /// Number of items recorded so far.
    pub fn processed(&self) -> usize {
        self.processed
    }
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
