//! Redis-backed implementation of `ListStore`
//!
//! One Redis list per key; every trait call is one command on a multiplexed
//! tokio connection. Enabled with the `redis` cargo feature.

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisError};

use super::types::{ListStore, StoreError};
use crate::config::StoreSource;
use crate::gate::ConnectionGate;

const SCHEME: &str = "redis";

/// Redis list store
///
/// Cheap to clone: clones share the multiplexed connection.
#[derive(Clone)]
pub struct RedisListStore {
    conn: MultiplexedConnection,
}

impl RedisListStore {
    /// Connect to the server at `url`, e.g. `redis://127.0.0.1/`
    ///
    /// # Errors
    /// `StoreError::Connect` when the URL is invalid or the server is unreachable
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(connect_error)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(connect_error)?;
        Ok(Self { conn })
    }

    /// # Errors
    /// `StoreError::Connect` when the server is unreachable
    pub async fn connect_source(source: &StoreSource) -> Result<Self, StoreError> {
        Self::connect(&source.to_connection_string(SCHEME)).await
    }

    /// Gate that connects to `source` on first use
    #[must_use]
    pub fn gate(source: StoreSource) -> ConnectionGate<Self> {
        ConnectionGate::new(move || {
            let source = source.clone();
            async move { Self::connect_source(&source).await }
        })
    }
}

fn connect_error(err: RedisError) -> StoreError {
    StoreError::Connect(err.to_string())
}

fn command_error(err: RedisError) -> StoreError {
    StoreError::Command(err.to_string())
}

/// Redis indexes are signed; positions past `isize::MAX` mean "to the end"
fn to_index(position: usize) -> isize {
    isize::try_from(position).unwrap_or(-1)
}

impl ListStore for RedisListStore {
    async fn length(&self, key: &str) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        conn.llen(key).await.map_err(command_error)
    }

    async fn get_at(&self, key: &str, position: usize) -> Result<Option<Vec<u8>>, StoreError> {
        let Ok(index) = isize::try_from(position) else {
            return Ok(None);
        };
        let mut conn = self.conn.clone();
        conn.lindex(key, index).await.map_err(command_error)
    }

    async fn push_tail(&self, key: &str, value: &[u8]) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        conn.rpush(key, value).await.map_err(command_error)
    }

    async fn insert_before(
        &self,
        key: &str,
        marker: &[u8],
        value: &[u8],
    ) -> Result<Option<usize>, StoreError> {
        let mut conn = self.conn.clone();
        // -1: marker not found, 0: no such key
        let length: isize = conn
            .linsert_before(key, marker, value)
            .await
            .map_err(command_error)?;
        Ok(usize::try_from(length).ok().filter(|&n| n > 0))
    }

    async fn remove_by_value(
        &self,
        key: &str,
        value: &[u8],
        count: usize,
    ) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        let count = isize::try_from(count).unwrap_or(0);
        conn.lrem(key, count, value).await.map_err(command_error)
    }

    async fn set_at(&self, key: &str, position: usize, value: &[u8]) -> Result<(), StoreError> {
        let Ok(index) = isize::try_from(position) else {
            return Err(StoreError::Command(format!("index out of range: {position}")));
        };
        let mut conn = self.conn.clone();
        conn.lset(key, index, value).await.map_err(command_error)
    }

    async fn range(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let Ok(start) = isize::try_from(start) else {
            return Ok(Vec::new());
        };
        let mut conn = self.conn.clone();
        conn.lrange(key, start, to_index(stop))
            .await
            .map_err(command_error)
    }

    async fn delete_key(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let deleted: usize = conn.del(key).await.map_err(command_error)?;
        Ok(deleted > 0)
    }
}
