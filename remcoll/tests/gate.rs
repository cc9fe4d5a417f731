//! Integration tests for ConnectionGate under concurrency

use remcoll::{
    CollectionError, ConnectionGate, ConnectionState, JsonCodec, MemListStore, RemoteList,
    StoreError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Gate whose first attempt blocks until `release` is notified and then
/// yields `first`; later attempts connect immediately.
fn held_gate(
    release: &Arc<Notify>,
    calls: &Arc<AtomicUsize>,
    first: Result<(), StoreError>,
) -> Arc<ConnectionGate<MemListStore>> {
    let release = Arc::clone(release);
    let calls = Arc::clone(calls);
    Arc::new(ConnectionGate::new(move || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        let release = Arc::clone(&release);
        let first = first.clone();
        async move {
            if n == 0 {
                release.notified().await;
                first.map(|()| MemListStore::new())
            } else {
                Ok(MemListStore::new())
            }
        }
    }))
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_concurrent_connects_share_one_attempt() {
    let release = Arc::new(Notify::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = held_gate(&release, &calls, Ok(()));

    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.connect().await })
        })
        .collect();
    settle().await;
    assert_eq!(gate.state(), ConnectionState::Connecting);

    release.notify_one();
    let mut stores = Vec::new();
    for waiter in waiters {
        stores.push(waiter.await.unwrap().unwrap());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(stores.iter().all(|s| Arc::ptr_eq(s, &stores[0])));
    assert_eq!(gate.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_failure_reaches_every_waiter_then_retries() {
    let release = Arc::new(Notify::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = held_gate(
        &release,
        &calls,
        Err(StoreError::Connect("refused".to_string())),
    );

    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.connect().await })
        })
        .collect();
    settle().await;
    release.notify_one();

    for waiter in waiters {
        let result = waiter.await.unwrap();
        assert!(matches!(
            result,
            Err(CollectionError::Connection(StoreError::Connect(_)))
        ));
    }
    assert_eq!(gate.state(), ConnectionState::Uninitialized);
    assert_eq!(gate.attempts(), 1);

    gate.connect().await.unwrap();
    assert_eq!(gate.attempts(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_dispose_while_connecting() {
    let release = Arc::new(Notify::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = held_gate(&release, &calls, Ok(()));

    let waiter = {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move { gate.connect().await })
    };
    settle().await;
    gate.dispose();
    release.notify_one();

    assert!(matches!(
        waiter.await.unwrap(),
        Err(CollectionError::UseAfterDispose(_))
    ));
    assert_eq!(gate.state(), ConnectionState::Disposed);
}

#[tokio::test]
async fn test_lists_connect_lazily() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let store = MemListStore::new();
    let shared = store.clone();
    let gate = Arc::new(ConnectionGate::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        let store = shared.clone();
        async move { Ok(store) }
    }));

    let list: RemoteList<i32, _, _> = RemoteList::new(Arc::clone(&gate), "lazy", JsonCodec);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    list.add(&1).await.unwrap();
    list.add(&2).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.snapshot("lazy").len(), 2);
}
