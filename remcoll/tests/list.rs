//! Integration tests for RemoteList

#[macro_use]
extern crate hamcrest;

use futures::TryStreamExt;
use hamcrest::prelude::*;
use remcoll::{
    CollectionError, ConnectionGate, JsonCodec, ListOptions, MemListStore, RemoteList,
    RemovalMode,
};
use std::sync::Arc;

fn list_with(
    store: &MemListStore,
    removal: RemovalMode,
) -> RemoteList<String, MemListStore, JsonCodec> {
    let gate = Arc::new(ConnectionGate::connected(store.clone()));
    RemoteList::new(gate, "letters", JsonCodec).with_removal(removal)
}

async fn letters(list: &RemoteList<String, MemListStore, JsonCodec>, items: &[&str]) {
    for item in items {
        list.add(&(*item).to_string()).await.unwrap();
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[tokio::test]
async fn test_add_then_get_last() {
    let store = MemListStore::new();
    let list = list_with(&store, RemovalMode::Positional);

    list.add(&"alpha".to_string()).await.unwrap();
    let count = list.add(&"beta".to_string()).await.unwrap();

    assert_that!(count, is(equal_to(2)));
    assert_that!(list.get(count - 1).await.unwrap(), is(equal_to("beta".to_string())));
}

#[tokio::test]
async fn test_get_past_end_is_out_of_range() {
    let store = MemListStore::new();
    let list = list_with(&store, RemovalMode::Positional);
    letters(&list, &["a"]).await;

    let err = list.get(1).await.unwrap_err();
    assert!(matches!(
        err,
        CollectionError::IndexOutOfRange { position: 1, count: 1 }
    ));
}

#[tokio::test]
async fn test_set_overwrites() {
    let store = MemListStore::new();
    let list = list_with(&store, RemovalMode::Positional);
    letters(&list, &["a", "b"]).await;

    list.set(1, &"z".to_string()).await.unwrap();

    assert_eq!(list.values().await.unwrap(), owned(&["a", "z"]));
    assert!(matches!(
        list.set(2, &"q".to_string()).await,
        Err(CollectionError::IndexOutOfRange { position: 2, count: 2 })
    ));
}

#[tokio::test]
async fn test_insert_positions() {
    for removal in [RemovalMode::Positional, RemovalMode::ByValue] {
        let store = MemListStore::new();
        let list = list_with(&store, removal);
        letters(&list, &["a", "c"]).await;

        list.insert(1, &"b".to_string()).await.unwrap();
        list.insert(0, &"start".to_string()).await.unwrap();
        list.insert(4, &"end".to_string()).await.unwrap();

        assert_eq!(
            list.values().await.unwrap(),
            owned(&["start", "a", "b", "c", "end"])
        );
        assert!(matches!(
            list.insert(6, &"far".to_string()).await,
            Err(CollectionError::IndexOutOfRange { position: 6, count: 5 })
        ));
    }
}

#[tokio::test]
async fn test_positional_insert_among_duplicates() {
    let store = MemListStore::new();
    let list = list_with(&store, RemovalMode::Positional);
    letters(&list, &["x", "x", "x"]).await;

    list.insert(2, &"new".to_string()).await.unwrap();

    assert_eq!(list.values().await.unwrap(), owned(&["x", "x", "new", "x"]));
}

#[tokio::test]
async fn test_by_value_insert_among_duplicates_hits_first_match() {
    let store = MemListStore::new();
    let list = list_with(&store, RemovalMode::ByValue);
    letters(&list, &["x", "x", "x"]).await;

    list.insert(2, &"new".to_string()).await.unwrap();

    assert_eq!(list.values().await.unwrap(), owned(&["new", "x", "x", "x"]));
}

#[tokio::test]
async fn test_positional_remove_at_among_duplicates() {
    let store = MemListStore::new();
    let list = list_with(&store, RemovalMode::Positional);
    letters(&list, &["x", "y", "x", "z"]).await;

    let removed = list.remove_at(2).await.unwrap();

    assert_eq!(removed, "x");
    assert_eq!(list.values().await.unwrap(), owned(&["x", "y", "z"]));
    assert_eq!(store.snapshot("letters").len(), 3);
}

#[tokio::test]
async fn test_by_value_remove_at_among_duplicates_hits_first_match() {
    let store = MemListStore::new();
    let list = list_with(&store, RemovalMode::ByValue);
    letters(&list, &["x", "y", "x"]).await;

    let removed = list.remove_at(2).await.unwrap();

    // The first equal payload goes, so the order differs from [x, y]
    assert_eq!(removed, "x");
    assert_eq!(list.values().await.unwrap(), owned(&["y", "x"]));
}

#[tokio::test]
async fn test_remove_at_past_end() {
    let store = MemListStore::new();
    let list = list_with(&store, RemovalMode::Positional);

    assert!(matches!(
        list.remove_at(0).await,
        Err(CollectionError::IndexOutOfRange { position: 0, count: 0 })
    ));
}

#[tokio::test]
async fn test_remove_by_value_and_index_of() {
    let store = MemListStore::new();
    let list = list_with(&store, RemovalMode::Positional);
    letters(&list, &["a", "b", "a"]).await;

    assert_that!(list.index_of(&"a".to_string()).await.unwrap(), is(equal_to(Some(0))));
    assert_that!(list.index_of(&"q".to_string()).await.unwrap(), is(equal_to(None)));

    assert!(list.remove(&"a".to_string()).await.unwrap());
    assert!(!list.remove(&"q".to_string()).await.unwrap());

    assert_eq!(list.values().await.unwrap(), owned(&["b", "a"]));
    assert_that!(list.index_of(&"a".to_string()).await.unwrap(), is(equal_to(Some(1))));
    assert!(list.contains(&"b".to_string()).await.unwrap());
}

#[tokio::test]
async fn test_range_window() {
    let store = MemListStore::new();
    let list = list_with(&store, RemovalMode::Positional);
    letters(&list, &["a", "b", "c", "d"]).await;

    assert_eq!(list.range(1, 2).await.unwrap(), owned(&["b", "c"]));
    assert_eq!(list.range(3, 10).await.unwrap(), owned(&["d"]));
    assert!(list.range(9, 1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stream_reads_in_pages() {
    let store = MemListStore::new();
    let list = list_with(&store, RemovalMode::Positional);
    letters(&list, &["a", "b", "c", "d", "e"]).await;
    let before = store.round_trips();

    let streamed: Vec<String> = list.stream(2).try_collect().await.unwrap();

    assert_eq!(streamed, owned(&["a", "b", "c", "d", "e"]));
    // Pages of 2, 2 and a short final page of 1
    assert_eq!(store.round_trips() - before, 3);
}

#[tokio::test]
async fn test_stream_of_empty_list() {
    let store = MemListStore::new();
    let list = list_with(&store, RemovalMode::Positional);

    let streamed: Vec<String> = list.stream(10).try_collect().await.unwrap();

    assert!(streamed.is_empty());
}

#[tokio::test]
async fn test_clear_and_is_empty() {
    let store = MemListStore::new();
    let list = list_with(&store, RemovalMode::Positional);
    letters(&list, &["a"]).await;

    assert!(!list.is_empty().await.unwrap());
    assert!(list.clear().await.unwrap());
    assert!(list.is_empty().await.unwrap());
    assert!(!list.clear().await.unwrap());
}

#[tokio::test]
async fn test_use_after_dispose() {
    let store = MemListStore::new();
    let list = list_with(&store, RemovalMode::Positional);
    letters(&list, &["a"]).await;

    list.dispose();
    let before = store.round_trips();

    assert!(matches!(list.count().await, Err(CollectionError::UseAfterDispose(_))));
    assert!(matches!(
        list.add(&"b".to_string()).await,
        Err(CollectionError::UseAfterDispose(_))
    ));
    assert!(matches!(list.get(0).await, Err(CollectionError::UseAfterDispose(_))));
    assert_eq!(store.round_trips(), before);
}

#[tokio::test]
async fn test_lists_share_one_gate() {
    let store = MemListStore::new();
    let gate = Arc::new(ConnectionGate::connected(store.clone()));
    let first: RemoteList<i32, _, _> = RemoteList::new(Arc::clone(&gate), "first", JsonCodec);
    let second: RemoteList<i32, _, _> = RemoteList::new(Arc::clone(&gate), "second", JsonCodec);

    first.add(&1).await.unwrap();
    second.add(&2).await.unwrap();
    first.dispose();

    assert_eq!(second.values().await.unwrap(), vec![2]);
    assert_eq!(store.snapshot("first"), vec![b"1".to_vec()]);
}

#[tokio::test]
async fn test_from_options() {
    let store = MemListStore::new();
    let gate = Arc::new(ConnectionGate::connected(store.clone()));
    let options =
        ListOptions::from_slice(br#"{"list_key": "configured", "removal": "by_value"}"#).unwrap();

    let list: RemoteList<i32, _, _> = RemoteList::from_options(gate, &options, JsonCodec).unwrap();
    list.add(&7).await.unwrap();

    assert_eq!(list.key(), "configured");
    assert_eq!(list.removal(), RemovalMode::ByValue);
    assert_eq!(store.snapshot("configured"), vec![b"7".to_vec()]);
}

#[tokio::test]
async fn test_decode_failure_keeps_entry() {
    let store = MemListStore::new();
    let gate = Arc::new(ConnectionGate::connected(store.clone()));
    let raw: RemoteList<String, _, _> = RemoteList::new(Arc::clone(&gate), "mixed", JsonCodec);
    let numbers: RemoteList<i32, _, _> = RemoteList::new(gate, "mixed", JsonCodec);
    raw.add(&"not a number".to_string()).await.unwrap();

    assert!(matches!(
        numbers.remove_at(0).await,
        Err(CollectionError::Serialization(_))
    ));
    assert_eq!(store.snapshot("mixed").len(), 1);
}
