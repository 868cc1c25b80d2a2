//! Single-flight run queue.
//!
//! Every sync, dedup and disconnect request takes a [`RunTicket`] before it
//! touches storage. Tickets are handed out in request order, one at a time,
//! so a later request waits for the one in flight instead of racing it.

use core_async::sync::{Mutex, OwnedMutexGuard};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

/// FIFO queue admitting one run at a time.
#[derive(Debug, Clone, Default)]
pub struct RunQueue {
    slot: Arc<Mutex<()>>,
    waiting: Arc<AtomicUsize>,
}

/// Permission to run. The next queued request starts when this is dropped.
#[derive(Debug)]
pub struct RunTicket {
    _guard: OwnedMutexGuard<()>,
}

impl RunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for every earlier request to finish.
    pub async fn enter(&self) -> RunTicket {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let guard = self.slot.clone().lock_owned().await;
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        trace!("Run ticket acquired");
        RunTicket { _guard: guard }
    }

    /// Whether a run currently holds a ticket.
    pub fn is_busy(&self) -> bool {
        self.slot.try_lock().is_err()
    }

    /// Requests waiting behind the current run.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_async::sync::Mutex as AsyncMutex;
    use std::time::Duration;

    #[core_async::test]
    async fn test_runs_are_serialized_in_order() {
        let queue = RunQueue::new();
        let log = Arc::new(AsyncMutex::new(Vec::new()));

        let first = queue.enter().await;
        assert!(queue.is_busy());

        let mut handles = Vec::new();
        for i in 0..3 {
            let queue = queue.clone();
            let log = log.clone();
            handles.push(core_async::task::spawn(async move {
                let _ticket = queue.enter().await;
                log.lock().await.push(i);
                core_async::time::sleep(Duration::from_millis(5)).await;
            }));
            // Let each task queue up before the next one
            core_async::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(queue.waiting(), 3);
        assert!(log.lock().await.is_empty());
        drop(first);

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*log.lock().await, vec![0, 1, 2]);
        assert!(!queue.is_busy());
    }
}
