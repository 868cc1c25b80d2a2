//! Future combinators.
//!
//! [`race`] polls two futures concurrently and resolves with whichever
//! finishes first. The loser is dropped on return, which cancels it.
//! [`deadline`] builds on it to bound an operation by a timer.

use futures::future::{self, FutureExt};
use std::future::Future;
use std::time::Duration;

pub use futures::future::Either;

/// Runs `left` and `right` concurrently and returns the first output.
///
/// If both are ready on the same poll, `left` wins.
pub async fn race<L, R>(left: L, right: R) -> Either<L::Output, R::Output>
where
    L: Future,
    R: Future,
{
    let left = left.fuse();
    let right = right.fuse();
    futures::pin_mut!(left);
    futures::pin_mut!(right);

    match future::select(left, right).await {
        Either::Left((output, _loser)) => Either::Left(output),
        Either::Right((output, _loser)) => Either::Right(output),
    }
}

/// Error returned by [`deadline`] when the timer wins the race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded {
    pub after: Duration,
}

impl std::fmt::Display for DeadlineExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation did not finish within {:?}", self.after)
    }
}

impl std::error::Error for DeadlineExceeded {}

/// Races `operation` against a sleep of `after`.
pub async fn deadline<F>(after: Duration, operation: F) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    match race(operation, crate::time::sleep(after)).await {
        Either::Left(output) => Ok(output),
        Either::Right(()) => Err(DeadlineExceeded { after }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::sleep;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[core_async::test]
    async fn test_race_returns_faster_side() {
        let winner = race(
            async {
                sleep(Duration::from_millis(200)).await;
                "slow"
            },
            async { 7u32 },
        )
        .await;

        assert!(matches!(winner, Either::Right(7)));
    }

    #[core_async::test]
    async fn test_race_drops_loser() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let _ = race(async { 1 }, async move {
            sleep(Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
        })
        .await;

        sleep(Duration::from_millis(50)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[core_async::test]
    async fn test_deadline_elapses() {
        let result = deadline(Duration::from_millis(10), async {
            sleep(Duration::from_secs(5)).await;
        })
        .await;

        assert_eq!(
            result,
            Err(DeadlineExceeded {
                after: Duration::from_millis(10)
            })
        );
    }

    #[core_async::test]
    async fn test_deadline_passes_output_through() {
        let result = deadline(Duration::from_secs(5), async { "page" }).await;
        assert_eq!(result, Ok("page"));
    }
}
