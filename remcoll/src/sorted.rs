//! Sorted, set-like collection over a remote list
//!
//! Keeps the backing list ordered by a comparator and locates positions by
//! binary search, one round trip per comparison. The order is only guaranteed
//! while every mutation goes through this type; writing to the backing list
//! by other means breaks later searches.

use futures::Stream;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use crate::codec::Codec;
use crate::error::CollectionError;
use crate::io::ListStore;
use crate::list::RemoteList;

/// Ordering used by a [`SortedList`]
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Remote list kept in comparator order, without duplicates
///
/// Two values are duplicates when the comparator says `Equal`.
pub struct SortedList<T, S, C> {
    list: RemoteList<T, S, C>,
    compare: Comparator<T>,
}

impl<T, S, C> SortedList<T, S, C>
where
    T: Ord + 'static,
    S: ListStore + 'static,
    C: Codec<T>,
{
    /// Sort by the natural ordering of `T`
    pub fn new(list: RemoteList<T, S, C>) -> Self {
        Self::with_comparator(list, T::cmp)
    }
}

impl<T, S, C> SortedList<T, S, C>
where
    S: ListStore + 'static,
    C: Codec<T>,
{
    pub fn with_comparator<F>(list: RemoteList<T, S, C>, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self {
            list,
            compare: Arc::new(compare),
        }
    }

    /// The backing list, for read-only use
    #[must_use]
    pub fn inner(&self) -> &RemoteList<T, S, C> {
        &self.list
    }

    /// Binary search for `value`
    ///
    /// `Ok(position)` when an equal value is stored at `position`,
    /// `Err(position)` with the insertion point that keeps the order.
    ///
    /// # Errors
    /// Connection and codec errors of the reads
    pub async fn search(&self, value: &T) -> Result<Result<usize, usize>, CollectionError> {
        let mut lo = 0;
        let mut hi = self.list.count().await?;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let candidate = self.list.get(mid).await?;
            match (self.compare)(&candidate, value) {
                Ordering::Equal => return Ok(Ok(mid)),
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
            }
        }
        Ok(Err(lo))
    }

    /// Insert `value` at its sorted position. Returns false for a duplicate.
    ///
    /// # Errors
    /// `UseAfterDispose`, `Serialization`, `Connection`
    pub async fn add(&self, value: &T) -> Result<bool, CollectionError> {
        match self.search(value).await? {
            Ok(_) => Ok(false),
            Err(position) => {
                self.list.insert(position, value).await?;
                debug!(key = self.list.key(), position, "sorted.add");
                Ok(true)
            }
        }
    }

    /// # Errors
    /// `UseAfterDispose`, `Serialization`, `Connection`
    pub async fn contains(&self, value: &T) -> Result<bool, CollectionError> {
        Ok(self.search(value).await?.is_ok())
    }

    /// Remove the value equal to `value`. Returns whether one was stored.
    ///
    /// # Errors
    /// `UseAfterDispose`, `Serialization`, `Connection`
    pub async fn remove(&self, value: &T) -> Result<bool, CollectionError> {
        match self.search(value).await? {
            Ok(position) => {
                self.list.remove_at(position).await?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Remove and return the value at `position`
    ///
    /// # Errors
    /// `IndexOutOfRange`, plus connection and codec errors
    pub async fn remove_at(&self, position: usize) -> Result<T, CollectionError> {
        self.list.remove_at(position).await
    }

    /// # Errors
    /// `IndexOutOfRange`, plus connection and codec errors
    pub async fn get(&self, position: usize) -> Result<T, CollectionError> {
        self.list.get(position).await
    }

    /// # Errors
    /// `UseAfterDispose`, `Connection`
    pub async fn count(&self) -> Result<usize, CollectionError> {
        self.list.count().await
    }

    /// # Errors
    /// `UseAfterDispose`, `Connection`
    pub async fn is_empty(&self) -> Result<bool, CollectionError> {
        self.list.is_empty().await
    }

    /// Smallest value, if any
    ///
    /// # Errors
    /// Connection and codec errors
    pub async fn first(&self) -> Result<Option<T>, CollectionError> {
        Ok(self.list.range(0, 1).await?.pop())
    }

    /// Largest value, if any
    ///
    /// # Errors
    /// Connection and codec errors
    pub async fn last(&self) -> Result<Option<T>, CollectionError> {
        match self.list.count().await? {
            0 => Ok(None),
            count => Ok(self.list.range(count - 1, 1).await?.pop()),
        }
    }

    /// Every value in order
    ///
    /// # Errors
    /// Connection and codec errors
    pub async fn values(&self) -> Result<Vec<T>, CollectionError> {
        self.list.values().await
    }

    /// Stream the values in order, `page_size` per round trip
    pub fn stream(&self, page_size: usize) -> impl Stream<Item = Result<T, CollectionError>> + '_ {
        self.list.stream(page_size)
    }

    /// # Errors
    /// `UseAfterDispose`, `Connection`
    pub async fn clear(&self) -> Result<bool, CollectionError> {
        self.list.clear().await
    }

    pub fn dispose(&self) {
        self.list.dispose();
    }
}
