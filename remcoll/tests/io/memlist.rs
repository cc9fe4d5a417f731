//! Integration tests for MemListStore

use remcoll::{ListStore, MemListStore, StoreError};

async fn filled(values: &[&[u8]]) -> MemListStore {
    let store = MemListStore::new();
    for value in values {
        store.push_tail("k", value).await.unwrap();
    }
    store
}

#[tokio::test]
async fn test_insert_before_first_match() {
    let store = filled(&[b"a", b"m", b"m"]).await;

    let length = store.insert_before("k", b"m", b"x").await.unwrap();

    assert_eq!(length, Some(4));
    assert_eq!(
        store.snapshot("k"),
        vec![b"a".to_vec(), b"x".to_vec(), b"m".to_vec(), b"m".to_vec()]
    );
}

#[tokio::test]
async fn test_insert_before_missing_marker() {
    let store = filled(&[b"a"]).await;

    assert_eq!(store.insert_before("k", b"zz", b"x").await.unwrap(), None);
    assert_eq!(store.insert_before("other", b"a", b"x").await.unwrap(), None);
    assert_eq!(store.snapshot("k"), vec![b"a".to_vec()]);
}

#[tokio::test]
async fn test_set_at_out_of_range() {
    let store = filled(&[b"a"]).await;

    store.set_at("k", 0, b"b").await.unwrap();
    let err = store.set_at("k", 1, b"c").await.unwrap_err();

    assert!(matches!(err, StoreError::Command(_)));
    assert_eq!(store.snapshot("k"), vec![b"b".to_vec()]);
}

#[tokio::test]
async fn test_range_is_inclusive_and_clamped() {
    let store = filled(&[b"a", b"b", b"c", b"d"]).await;

    assert_eq!(
        store.range("k", 1, 2).await.unwrap(),
        vec![b"b".to_vec(), b"c".to_vec()]
    );
    assert_eq!(store.range("k", 3, 100).await.unwrap(), vec![b"d".to_vec()]);
    assert!(store.range("k", 4, 9).await.unwrap().is_empty());
    assert!(store.range("k", 2, 1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_key() {
    let store = filled(&[b"a"]).await;

    assert!(store.delete_key("k").await.unwrap());
    assert_eq!(store.length("k").await.unwrap(), 0);
    assert_eq!(store.round_trips(), 3);
}
