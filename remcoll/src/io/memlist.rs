//! In-memory implementation of ListStore

use super::types::{ListStore, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory implementation of ListStore
///
/// Simple hash map based storage, useful for testing and single-process use.
/// Clones share the same lists, so a connection factory can hand out clones
/// and every "connection" sees the same data.
///
/// Every trait call counts as one round trip; [`MemListStore::round_trips`]
/// exposes the tally.
#[derive(Clone, Debug, Default)]
pub struct MemListStore {
    lists: Arc<Mutex<HashMap<String, Vec<Vec<u8>>>>>,
    round_trips: Arc<AtomicUsize>,
}

impl MemListStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of round trips served so far
    #[must_use]
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::Relaxed)
    }

    /// Copy of the raw payloads under `key`, without counting a round trip
    #[must_use]
    pub fn snapshot(&self, key: &str) -> Vec<Vec<u8>> {
        self.lists.lock().get(key).cloned().unwrap_or_default()
    }

    fn tick(&self) {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
    }
}

impl ListStore for MemListStore {
    async fn length(&self, key: &str) -> Result<usize, StoreError> {
        self.tick();
        Ok(self.lists.lock().get(key).map_or(0, Vec::len))
    }

    async fn get_at(&self, key: &str, position: usize) -> Result<Option<Vec<u8>>, StoreError> {
        self.tick();
        let lists = self.lists.lock();
        Ok(lists.get(key).and_then(|list| list.get(position)).cloned())
    }

    async fn push_tail(&self, key: &str, value: &[u8]) -> Result<usize, StoreError> {
        self.tick();
        let mut lists = self.lists.lock();
        let list = lists.entry(key.to_string()).or_default();
        list.push(value.to_vec());
        Ok(list.len())
    }

    async fn insert_before(
        &self,
        key: &str,
        marker: &[u8],
        value: &[u8],
    ) -> Result<Option<usize>, StoreError> {
        self.tick();
        let mut lists = self.lists.lock();
        let Some(list) = lists.get_mut(key) else {
            return Ok(None);
        };
        let Some(position) = list.iter().position(|entry| entry.as_slice() == marker) else {
            return Ok(None);
        };
        list.insert(position, value.to_vec());
        Ok(Some(list.len()))
    }

    async fn remove_by_value(
        &self,
        key: &str,
        value: &[u8],
        count: usize,
    ) -> Result<usize, StoreError> {
        self.tick();
        let mut lists = self.lists.lock();
        let Some(list) = lists.get_mut(key) else {
            return Ok(0);
        };
        let limit = if count == 0 { usize::MAX } else { count };
        let mut removed = 0;
        list.retain(|entry| {
            if removed < limit && entry.as_slice() == value {
                removed += 1;
                false
            } else {
                true
            }
        });
        // An emptied list disappears, like a remote key would
        if list.is_empty() {
            lists.remove(key);
        }
        Ok(removed)
    }

    async fn set_at(&self, key: &str, position: usize, value: &[u8]) -> Result<(), StoreError> {
        self.tick();
        let mut lists = self.lists.lock();
        let slot = lists
            .get_mut(key)
            .ok_or_else(|| StoreError::Command(format!("no such key: {key}")))?
            .get_mut(position)
            .ok_or_else(|| StoreError::Command(format!("index out of range: {position}")))?;
        *slot = value.to_vec();
        Ok(())
    }

    async fn range(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        self.tick();
        let lists = self.lists.lock();
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };
        if start >= list.len() || start > stop {
            return Ok(Vec::new());
        }
        let end = stop.min(list.len() - 1);
        Ok(list[start..=end].to_vec())
    }

    async fn delete_key(&self, key: &str) -> Result<bool, StoreError> {
        self.tick();
        Ok(self.lists.lock().remove(key).is_some())
    }
}
