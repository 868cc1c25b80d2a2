//! Integration tests for core-async on the Tokio runtime.

use core_async::future::{deadline, race, Either};
use core_async::task::YieldBudget;
use core_async::{sync, task, time};
use std::sync::Arc;

#[core_async::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    let result = handle.await.unwrap();
    assert_eq!(result, 42);
}

#[core_async::test]
async fn test_timeout_failure() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(100)).await;
        42
    })
    .await;

    assert!(result.is_err());
}

#[core_async::test]
async fn test_mutex_serializes_waiters_in_order() {
    let gate = Arc::new(sync::Mutex::new(()));
    let order = Arc::new(sync::Mutex::new(Vec::new()));

    let guard = gate.lock().await;
    let mut handles = Vec::new();
    for i in 0..3 {
        let gate = Arc::clone(&gate);
        let order = Arc::clone(&order);
        handles.push(task::spawn(async move {
            let _turn = gate.lock().await;
            order.lock().await.push(i);
        }));
        // Let each waiter enqueue before spawning the next.
        task::yield_now().await;
    }
    drop(guard);

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(*order.lock().await, vec![0, 1, 2]);
}

#[core_async::test]
async fn test_race_prefers_first_ready() {
    let outcome = race(async { "page" }, async { 0u8 }).await;
    assert!(matches!(outcome, Either::Left("page")));
}

#[core_async::test]
async fn test_deadline_wraps_slow_operation() {
    let outcome = deadline(time::Duration::from_millis(5), async {
        time::sleep(time::Duration::from_secs(10)).await;
    })
    .await;

    let err = outcome.unwrap_err();
    assert_eq!(err.after, time::Duration::from_millis(5));
}

#[core_async::test]
async fn test_yield_budget_counts_items() {
    let mut budget = YieldBudget::new(100);
    for _ in 0..250 {
        budget.tick().await;
    }
    assert_eq!(budget.processed(), 250);

    let mut disabled = YieldBudget::new(0);
    disabled.tick().await;
    assert_eq!(disabled.processed(), 1);
}

#[core_async::test]
async fn test_broadcast_channel() {
    let (tx, mut rx1) = sync::broadcast::channel(8);
    let mut rx2 = tx.subscribe();

    tx.send("synced").unwrap();

    assert_eq!(rx1.recv().await.unwrap(), "synced");
    assert_eq!(rx2.recv().await.unwrap(), "synced");
}
