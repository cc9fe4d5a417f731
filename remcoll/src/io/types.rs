//! Remote ordered-list store types and traits

use std::fmt;
use std::future::Future;

/// Errors reported by a list store backend
///
/// `Clone` so that one failed connection attempt can be handed to every
/// caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Establishing the connection failed
    Connect(String),
    /// A round trip was rejected or failed in transit
    Command(String),
    /// The connection was torn down
    Closed,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(msg) => write!(f, "Store connection failed: {msg}"),
            Self::Command(msg) => write!(f, "Store command failed: {msg}"),
            Self::Closed => write!(f, "Store connection is closed"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Trait for remote ordered-list backends
///
/// Every method is one round trip. Lists are identified by a string key and
/// hold opaque byte payloads addressed by zero-based position. A missing key
/// behaves like an empty list.
pub trait ListStore: Send + Sync {
    /// Current length of the list.
    fn length(&self, key: &str) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Payload at `position`, or `None` when the position is past the end.
    fn get_at(
        &self,
        key: &str,
        position: usize,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;

    /// Append at the tail. Returns the new length.
    fn push_tail(
        &self,
        key: &str,
        value: &[u8],
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Insert `value` before the first entry equal to `marker`.
    ///
    /// Returns the new length, or `None` when no entry equals `marker`.
    fn insert_before(
        &self,
        key: &str,
        marker: &[u8],
        value: &[u8],
    ) -> impl Future<Output = Result<Option<usize>, StoreError>> + Send;

    /// Remove up to `count` entries equal to `value`, scanning from the head.
    ///
    /// A `count` of 0 removes every match. Returns the number removed.
    fn remove_by_value(
        &self,
        key: &str,
        value: &[u8],
        count: usize,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Overwrite the payload at `position`.
    ///
    /// Fails with `StoreError::Command` when the position is past the end.
    fn set_at(
        &self,
        key: &str,
        position: usize,
        value: &[u8],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Payloads from `start` to `stop`, both inclusive, clamped to the list.
    ///
    /// `usize::MAX` as `stop` reads to the end.
    fn range(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> impl Future<Output = Result<Vec<Vec<u8>>, StoreError>> + Send;

    /// Delete the whole list. Returns whether the key existed.
    fn delete_key(&self, key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;
}
