//! Remote ordered list adapter
//!
//! Maps index-addressed list operations onto the value-addressed primitive
//! of a [`ListStore`]. Each public call is one or more round trips; nothing
//! is atomic across them.
//!
//! | operation   | round trips (`Positional`) | round trips (`ByValue`) |
//! |-------------|----------------------------|-------------------------|
//! | `count`     | 1                          | 1                       |
//! | `get`       | 1                          | 1                       |
//! | `add`       | 1                          | 1                       |
//! | `set`       | 2                          | 2                       |
//! | `insert`    | 5                          | 3                       |
//! | `remove_at` | 3                          | 2                       |
//! | `index_of`  | 1 + reads                  | 1 + reads               |
//! | `range`     | 1                          | 1                       |
//!
//! `insert` at the tail is two round trips in both modes. In `Positional`
//! mode a failed store call after the tombstone write costs one more round
//! trip to put the original value back.

use futures::stream::{self, Stream, TryStreamExt};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::codec::Codec;
use crate::config::{ListOptions, RemovalMode};
use crate::error::CollectionError;
use crate::gate::ConnectionGate;
use crate::idgen::next_tombstone;
use crate::io::{BlockPool, BufferArena, ListStore};

const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// Typed view of one remote list
///
/// Values are encoded with the injected codec into a pooled [`BufferArena`]
/// per call; the arena goes back to the pool when the call finishes.
pub struct RemoteList<T, S, C> {
    gate: Arc<ConnectionGate<S>>,
    key: String,
    codec: C,
    pool: Arc<BlockPool>,
    initial_capacity: usize,
    removal: RemovalMode,
    disposed: AtomicBool,
    _values: PhantomData<fn() -> T>,
}

impl<T, S, C> RemoteList<T, S, C>
where
    S: ListStore + 'static,
    C: Codec<T>,
{
    /// Create a list over `key`, sharing `gate` with other collections
    pub fn new(gate: Arc<ConnectionGate<S>>, key: impl Into<String>, codec: C) -> Self {
        Self {
            gate,
            key: key.into(),
            codec,
            pool: BlockPool::shared(),
            initial_capacity: DEFAULT_BUFFER_CAPACITY,
            removal: RemovalMode::default(),
            disposed: AtomicBool::new(false),
            _values: PhantomData,
        }
    }

    /// Create a list from validated options
    ///
    /// # Errors
    /// `InvalidArgument` when the options fail validation
    pub fn from_options(
        gate: Arc<ConnectionGate<S>>,
        options: &ListOptions,
        codec: C,
    ) -> Result<Self, CollectionError> {
        options.validate()?;
        Ok(Self::new(gate, options.list_key.clone(), codec)
            .with_removal(options.removal)
            .with_initial_capacity(options.initial_buffer_capacity))
    }

    /// Use a context-scoped pool instead of the process-wide one
    #[must_use]
    pub fn with_pool(mut self, pool: Arc<BlockPool>) -> Self {
        self.pool = pool;
        self
    }

    #[must_use]
    pub fn with_removal(mut self, removal: RemovalMode) -> Self {
        self.removal = removal;
        self
    }

    /// Initial arena size per encode; zero is rejected when encoding
    #[must_use]
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn removal(&self) -> RemovalMode {
        self.removal
    }

    #[must_use]
    pub fn gate(&self) -> &Arc<ConnectionGate<S>> {
        &self.gate
    }

    /// Stop using this list. The shared gate stays open.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Current length of the list
    ///
    /// # Errors
    /// `UseAfterDispose`, `Connection`
    pub async fn count(&self) -> Result<usize, CollectionError> {
        let store = self.store().await?;
        Ok(store.length(&self.key).await?)
    }

    /// # Errors
    /// `UseAfterDispose`, `Connection`
    pub async fn is_empty(&self) -> Result<bool, CollectionError> {
        Ok(self.count().await? == 0)
    }

    /// Value at `position`
    ///
    /// # Errors
    /// `IndexOutOfRange` when `position` is past the end, plus the
    /// connection and codec errors
    pub async fn get(&self, position: usize) -> Result<T, CollectionError> {
        let store = self.store().await?;
        match store.get_at(&self.key, position).await? {
            Some(bytes) => self.decode(&bytes),
            None => Err(self.out_of_range(&store, position).await),
        }
    }

    /// Append at the tail. Returns the new length.
    ///
    /// # Errors
    /// `UseAfterDispose`, `Serialization`, `Connection`
    pub async fn add(&self, value: &T) -> Result<usize, CollectionError> {
        let payload = self.encode(value)?;
        let store = self.store().await?;
        Ok(store.push_tail(&self.key, payload.written()).await?)
    }

    /// Overwrite the value at `position`
    ///
    /// # Errors
    /// `IndexOutOfRange` when `position` is past the end, plus the
    /// connection and codec errors
    pub async fn set(&self, position: usize, value: &T) -> Result<(), CollectionError> {
        let payload = self.encode(value)?;
        let store = self.store().await?;
        let count = store.length(&self.key).await?;
        if position >= count {
            return Err(CollectionError::IndexOutOfRange { position, count });
        }
        store.set_at(&self.key, position, payload.written()).await?;
        Ok(())
    }

    /// Insert so that the new value ends up at `position`
    ///
    /// `position == count` appends.
    ///
    /// # Errors
    /// `IndexOutOfRange` when `position > count`, plus the connection and
    /// codec errors
    pub async fn insert(&self, position: usize, value: &T) -> Result<(), CollectionError> {
        let payload = self.encode(value)?;
        let store = self.store().await?;
        let count = store.length(&self.key).await?;
        if position > count {
            return Err(CollectionError::IndexOutOfRange { position, count });
        }
        if position == count {
            store.push_tail(&self.key, payload.written()).await?;
            return Ok(());
        }

        let Some(marker) = store.get_at(&self.key, position).await? else {
            return Err(self.out_of_range(&store, position).await);
        };
        match self.removal {
            RemovalMode::ByValue => {
                let inserted = store
                    .insert_before(&self.key, &marker, payload.written())
                    .await?;
                if inserted.is_none() {
                    return Err(self.out_of_range(&store, position).await);
                }
            }
            RemovalMode::Positional => {
                let tombstone = next_tombstone();
                store.set_at(&self.key, position, &tombstone).await?;
                match store
                    .insert_before(&self.key, &tombstone, payload.written())
                    .await
                {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        warn!(key = %self.key, position, "list.insert: tombstone vanished");
                        return Err(self.out_of_range(&store, position).await);
                    }
                    Err(e) => {
                        self.restore(&store, position, &marker).await;
                        return Err(e.into());
                    }
                }
                if let Err(e) = store.set_at(&self.key, position + 1, &marker).await {
                    self.restore(&store, position + 1, &marker).await;
                    return Err(e.into());
                }
            }
        }
        debug!(key = %self.key, position, "list.insert");
        Ok(())
    }

    /// Remove the value at `position` and return it
    ///
    /// In `ByValue` mode the first entry equal to the value at `position` is
    /// removed, which is an earlier entry when the list holds duplicates.
    ///
    /// # Errors
    /// `IndexOutOfRange` when `position` is past the end, plus the
    /// connection and codec errors
    pub async fn remove_at(&self, position: usize) -> Result<T, CollectionError> {
        let store = self.store().await?;
        let Some(current) = store.get_at(&self.key, position).await? else {
            return Err(self.out_of_range(&store, position).await);
        };
        let value = self.decode(&current)?;
        let removed = match self.removal {
            RemovalMode::ByValue => store.remove_by_value(&self.key, &current, 1).await?,
            RemovalMode::Positional => {
                let tombstone = next_tombstone();
                store.set_at(&self.key, position, &tombstone).await?;
                match store.remove_by_value(&self.key, &tombstone, 1).await {
                    Ok(removed) => removed,
                    Err(e) => {
                        self.restore(&store, position, &current).await;
                        return Err(e.into());
                    }
                }
            }
        };
        if removed == 0 {
            warn!(key = %self.key, position, "list.remove_at: entry vanished before removal");
            return Err(self.out_of_range(&store, position).await);
        }
        debug!(key = %self.key, position, "list.remove_at");
        Ok(value)
    }

    /// Remove the first entry equal to `value`. Returns whether one was found.
    ///
    /// # Errors
    /// `UseAfterDispose`, `Serialization`, `Connection`
    pub async fn remove(&self, value: &T) -> Result<bool, CollectionError> {
        let payload = self.encode(value)?;
        let store = self.store().await?;
        Ok(store.remove_by_value(&self.key, payload.written(), 1).await? > 0)
    }

    /// Position of the first entry whose payload equals the encoded `value`
    ///
    /// Linear scan, one round trip per position read.
    ///
    /// # Errors
    /// `UseAfterDispose`, `Serialization`, `Connection`
    pub async fn index_of(&self, value: &T) -> Result<Option<usize>, CollectionError> {
        let payload = self.encode(value)?;
        let needle = payload.written();
        let store = self.store().await?;
        let count = store.length(&self.key).await?;
        for position in 0..count {
            match store.get_at(&self.key, position).await? {
                Some(bytes) if bytes.as_slice() == needle => return Ok(Some(position)),
                Some(_) => {}
                // The list shrank under us
                None => break,
            }
        }
        Ok(None)
    }

    /// # Errors
    /// `UseAfterDispose`, `Serialization`, `Connection`
    pub async fn contains(&self, value: &T) -> Result<bool, CollectionError> {
        Ok(self.index_of(value).await?.is_some())
    }

    /// Up to `length` values starting at `start`, in one round trip
    ///
    /// # Errors
    /// `InvalidArgument` when `start + length` overflows, plus the
    /// connection and codec errors
    pub async fn range(&self, start: usize, length: usize) -> Result<Vec<T>, CollectionError> {
        let stop = start.checked_add(length).ok_or_else(|| {
            CollectionError::InvalidArgument(format!(
                "range start {start} plus length {length} overflows"
            ))
        })?;
        let store = self.store().await?;
        if length == 0 {
            return Ok(Vec::new());
        }
        let payloads = store.range(&self.key, start, stop - 1).await?;
        payloads.iter().map(|bytes| self.decode(bytes)).collect()
    }

    /// Every value, in one round trip
    ///
    /// # Errors
    /// `UseAfterDispose`, `Serialization`, `Connection`
    pub async fn values(&self) -> Result<Vec<T>, CollectionError> {
        let store = self.store().await?;
        let payloads = store.range(&self.key, 0, usize::MAX).await?;
        payloads.iter().map(|bytes| self.decode(bytes)).collect()
    }

    /// Stream every value, reading `page_size` values per round trip
    pub fn stream(&self, page_size: usize) -> impl Stream<Item = Result<T, CollectionError>> + '_ {
        let page_size = page_size.max(1);
        stream::try_unfold(Some(0usize), move |next| async move {
            let Some(start) = next else {
                return Ok(None);
            };
            let page = self.range(start, page_size).await?;
            if page.is_empty() {
                return Ok(None);
            }
            // A short page is the last one
            let following = (page.len() == page_size).then_some(start + page_size);
            let items = stream::iter(page.into_iter().map(Ok::<T, CollectionError>));
            Ok::<_, CollectionError>(Some((items, following)))
        })
        .try_flatten()
    }

    /// Delete the whole list. Returns whether it existed.
    ///
    /// # Errors
    /// `UseAfterDispose`, `Connection`
    pub async fn clear(&self) -> Result<bool, CollectionError> {
        let store = self.store().await?;
        let existed = store.delete_key(&self.key).await?;
        debug!(key = %self.key, existed, "list.clear");
        Ok(existed)
    }

    async fn store(&self) -> Result<Arc<S>, CollectionError> {
        if self.is_disposed() {
            return Err(CollectionError::UseAfterDispose("remote list"));
        }
        self.gate.connect().await
    }

    fn encode(&self, value: &T) -> Result<BufferArena, CollectionError> {
        if self.is_disposed() {
            return Err(CollectionError::UseAfterDispose("remote list"));
        }
        let mut arena = BufferArena::acquire(&self.pool, self.initial_capacity)?;
        self.codec.serialize_into(&mut arena, value)?;
        Ok(arena)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CollectionError> {
        Ok(self.codec.deserialize(bytes)?)
    }

    /// Best effort: put `original` back over a tombstone left by a failed call.
    /// The caller reports the first error, not this one.
    async fn restore(&self, store: &S, position: usize, original: &[u8]) {
        if let Err(e) = store.set_at(&self.key, position, original).await {
            warn!(
                key = %self.key,
                position,
                error = %e,
                "list: could not restore the value under a tombstone"
            );
        }
    }

    /// Build the out-of-range error, asking the store for the current length
    async fn out_of_range(&self, store: &S, position: usize) -> CollectionError {
        match store.length(&self.key).await {
            Ok(count) => CollectionError::IndexOutOfRange { position, count },
            Err(e) => CollectionError::Connection(e),
        }
    }
}
