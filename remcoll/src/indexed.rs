//! Associative map over a remote list
//!
//! Values live in a remote list; a local position table maps each key to
//! the position of its value. The table is private to one map instance.
//!
//! # Invariant
//!
//! For every key, `table[key]` is the current position of its value, and the
//! table's insertion order matches position order. Every operation keeps it:
//!
//! - `set` of a new key appends remotely first, then records the position the
//!   store reported.
//! - `set` of a known key overwrites in place; positions do not move.
//! - `remove` deletes remotely first, then drops the key and shifts every
//!   later position down by one.
//!
//! Operations on one map are serialized by an async mutex. Other writers to
//! the same remote list are not accounted for; iteration reports
//! `CollectionError::Desync` when the two sides disagree.

use linked_hash_map::LinkedHashMap;
use std::hash::Hash;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::codec::Codec;
use crate::error::CollectionError;
use crate::io::ListStore;
use crate::list::RemoteList;

/// Key to value map whose values are stored in a remote list
pub struct IndexedMap<K, V, S, C> {
    values: RemoteList<V, S, C>,
    table: Mutex<LinkedHashMap<K, usize>>,
}

impl<K, V, S, C> IndexedMap<K, V, S, C>
where
    K: Hash + Eq + Clone,
    S: ListStore + 'static,
    C: Codec<V>,
{
    /// Create an empty map over `values`
    pub fn new(values: RemoteList<V, S, C>) -> Self {
        Self {
            values,
            table: Mutex::new(LinkedHashMap::new()),
        }
    }

    /// The backing list, for read-only use
    #[must_use]
    pub fn inner(&self) -> &RemoteList<V, S, C> {
        &self.values
    }

    /// Insert or overwrite the value for `key`
    ///
    /// # Errors
    /// `UseAfterDispose`, `Serialization`, `Connection`; the table is left
    /// untouched when the remote write fails
    pub async fn set(&self, key: K, value: &V) -> Result<(), CollectionError> {
        let mut table = self.table.lock().await;
        if let Some(&position) = table.get(&key) {
            return self.values.set(position, value).await;
        }
        let count = self.values.add(value).await?;
        table.insert(key, count - 1);
        Ok(())
    }

    /// Value for `key`, if present
    ///
    /// # Errors
    /// Connection and codec errors of the positional read
    pub async fn get(&self, key: &K) -> Result<Option<V>, CollectionError> {
        let table = self.table.lock().await;
        match table.get(key) {
            Some(&position) => self.values.get(position).await.map(Some),
            None => Ok(None),
        }
    }

    /// Whether `key` is present; no round trip
    pub async fn contains_key(&self, key: &K) -> bool {
        self.table.lock().await.contains_key(key)
    }

    /// Remove `key` and return its value
    ///
    /// # Errors
    /// `UseAfterDispose`, `Serialization`, `Connection`; the table is left
    /// untouched when the remote removal fails
    pub async fn remove(&self, key: &K) -> Result<Option<V>, CollectionError> {
        let mut table = self.table.lock().await;
        let Some(&position) = table.get(key) else {
            return Ok(None);
        };
        let value = self.values.remove_at(position).await?;
        table.remove(key);
        for (_, recorded) in table.iter_mut() {
            if *recorded > position {
                *recorded -= 1;
            }
        }
        debug!(key = self.values.key(), position, "indexed.remove");
        Ok(Some(value))
    }

    /// Number of keys; no round trip
    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.lock().await.is_empty()
    }

    /// Keys in position order; no round trip
    pub async fn keys(&self) -> Vec<K> {
        self.table.lock().await.keys().cloned().collect()
    }

    /// Every key with its value, in position order, in one round trip
    ///
    /// # Errors
    /// `Desync` when the table and the remote list disagree, plus
    /// connection and codec errors
    pub async fn entries(&self) -> Result<Vec<(K, V)>, CollectionError> {
        let table = self.table.lock().await;
        let values = self.values.values().await?;
        if values.len() != table.len() {
            warn!(
                key = self.values.key(),
                keys = table.len(),
                values = values.len(),
                "indexed.entries: position table out of sync"
            );
            return Err(CollectionError::Desync {
                keys: table.len(),
                values: values.len(),
            });
        }
        let value_count = values.len();
        let mut entries = Vec::with_capacity(value_count);
        for ((key, &position), (index, value)) in table.iter().zip(values.into_iter().enumerate()) {
            if position != index {
                warn!(
                    key = self.values.key(),
                    position, index, "indexed.entries: key recorded at a stale position"
                );
                return Err(CollectionError::Desync {
                    keys: table.len(),
                    values: value_count,
                });
            }
            entries.push((key.clone(), value));
        }
        Ok(entries)
    }

    /// Delete the remote list and forget every key
    ///
    /// # Errors
    /// `UseAfterDispose`, `Connection`
    pub async fn clear(&self) -> Result<(), CollectionError> {
        let mut table = self.table.lock().await;
        self.values.clear().await?;
        table.clear();
        Ok(())
    }

    pub fn dispose(&self) {
        self.values.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::gate::ConnectionGate;
    use crate::io::MemListStore;
    use std::sync::Arc;

    fn map(store: &MemListStore) -> IndexedMap<String, i32, MemListStore, JsonCodec> {
        let gate = Arc::new(ConnectionGate::connected(store.clone()));
        IndexedMap::new(RemoteList::new(gate, "scores", JsonCodec))
    }

    #[tokio::test]
    async fn test_overwrite_keeps_position() {
        let store = MemListStore::new();
        let scores = map(&store);

        scores.set("a".to_string(), &1).await.unwrap();
        scores.set("b".to_string(), &2).await.unwrap();
        scores.set("a".to_string(), &10).await.unwrap();

        assert_eq!(store.snapshot("scores"), vec![b"10".to_vec(), b"2".to_vec()]);
        assert_eq!(scores.get(&"a".to_string()).await.unwrap(), Some(10));
    }

    #[tokio::test]
    async fn test_contains_key_has_no_round_trip() {
        let store = MemListStore::new();
        let scores = map(&store);
        scores.set("a".to_string(), &1).await.unwrap();
        let before = store.round_trips();

        assert!(scores.contains_key(&"a".to_string()).await);
        assert!(!scores.contains_key(&"z".to_string()).await);
        assert_eq!(store.round_trips(), before);
    }

    #[tokio::test]
    async fn test_stale_position_is_reported_as_desync() {
        let store = MemListStore::new();
        let scores = map(&store);
        scores.set("a".to_string(), &1).await.unwrap();
        scores.inner().add(&99).await.unwrap();
        scores.set("b".to_string(), &2).await.unwrap();
        // Lengths agree again, but "b" is recorded at 2 in a list of 2
        scores.inner().remove_at(1).await.unwrap();

        let err = scores.entries().await.unwrap_err();
        assert!(matches!(err, CollectionError::Desync { keys: 2, values: 2 }));
    }

    #[tokio::test]
    async fn test_foreign_write_is_reported_as_desync() {
        let store = MemListStore::new();
        let scores = map(&store);
        scores.set("a".to_string(), &1).await.unwrap();
        scores.inner().add(&99).await.unwrap();

        let err = scores.entries().await.unwrap_err();
        assert!(matches!(err, CollectionError::Desync { keys: 1, values: 2 }));
    }
}
