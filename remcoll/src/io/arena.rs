//! Pooled, growable write buffer
//!
//! `BufferArena` hands out writable regions backed by blocks rented from a
//! shared [`BlockPool`]. Serializers write into the region, commit with
//! `advance`, and the written prefix is either borrowed for a store call or
//! moved out with `to_owned_vec`.
//!
//! # Ownership
//!
//! - The arena owns at most one block at a time.
//! - Growth rents a bigger block, copies the written prefix and gives the old
//!   block back to the pool.
//! - `to_owned_vec` / `to_boxed_slice` move the block out to the caller; the
//!   arena is left empty and the next write rents a fresh block.
//! - `reset`, `dispose` and `Drop` give the block back to the pool.

use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Blocks kept on the free list of a pool before extra returns are dropped
const MAX_RETAINED_BLOCKS: usize = 64;

/// Smallest block a pool allocates
const MIN_BLOCK_LEN: usize = 16;

lazy_static! {
    static ref SHARED_BYTE_POOL: Arc<BlockPool<u8>> = Arc::new(BlockPool::new());
}

/// Error type for arena operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    /// Non-positive capacity or similar bad argument
    InvalidArgument(String),
    /// The arena was disposed
    UseAfterDispose,
    /// `advance` went past the end of the current block
    CapacityExceeded { requested: usize, remaining: usize },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "Invalid arena argument: {msg}"),
            Self::UseAfterDispose => write!(f, "Buffer arena used after dispose"),
            Self::CapacityExceeded {
                requested,
                remaining,
            } => write!(
                f,
                "Cannot advance by {requested}, only {remaining} elements remain"
            ),
        }
    }
}

impl std::error::Error for ArenaError {}

impl embedded_io::Error for ArenaError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::InvalidArgument(_) => embedded_io::ErrorKind::InvalidInput,
            Self::CapacityExceeded { .. } => embedded_io::ErrorKind::OutOfMemory,
            Self::UseAfterDispose => embedded_io::ErrorKind::Other,
        }
    }
}

/// Pool of reusable blocks
///
/// Thread-safe; share it through `Arc`. A block's usable size is its `len()`,
/// blocks are fully initialized so they can be handed out as `&mut [T]`.
pub struct BlockPool<T = u8> {
    free: Mutex<Vec<Vec<T>>>,
    max_retained: usize,
    rented: AtomicUsize,
    returned: AtomicUsize,
}

impl<T: Copy + Default> BlockPool<T> {
    /// Create an empty pool
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_retained(MAX_RETAINED_BLOCKS)
    }

    /// Create an empty pool that keeps at most `max_retained` idle blocks
    #[must_use]
    pub fn with_max_retained(max_retained: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_retained,
            rented: AtomicUsize::new(0),
            returned: AtomicUsize::new(0),
        }
    }

    /// Rent a block with at least `min_len` elements
    ///
    /// Contents of a reused block are unspecified.
    #[must_use]
    pub fn rent(&self, min_len: usize) -> Vec<T> {
        self.rented.fetch_add(1, Ordering::Relaxed);
        {
            let mut free = self.free.lock();
            if let Some(index) = free.iter().position(|block| block.len() >= min_len) {
                return free.swap_remove(index);
            }
        }
        vec![T::default(); min_len.max(MIN_BLOCK_LEN).next_power_of_two()]
    }

    /// Give a block back for reuse
    pub fn give_back(&self, block: Vec<T>) {
        self.returned.fetch_add(1, Ordering::Relaxed);
        let mut free = self.free.lock();
        if free.len() < self.max_retained && !block.is_empty() {
            free.push(block);
        }
    }

    /// Number of `rent` calls so far
    #[must_use]
    pub fn rented(&self) -> usize {
        self.rented.load(Ordering::Relaxed)
    }

    /// Number of `give_back` calls so far
    #[must_use]
    pub fn returned(&self) -> usize {
        self.returned.load(Ordering::Relaxed)
    }

    /// Number of idle blocks currently held
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

impl BlockPool<u8> {
    /// Process-wide byte pool
    #[must_use]
    pub fn shared() -> Arc<BlockPool<u8>> {
        Arc::clone(&SHARED_BYTE_POOL)
    }
}

impl<T: Copy + Default> Default for BlockPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Growable buffer backed by pooled blocks
///
/// Not shareable between concurrent writers; give each caller its own arena.
///
/// # Example
///
/// ```
/// use remcoll::io::{BlockPool, BufferArena};
///
/// let pool = BlockPool::shared();
/// let mut arena = BufferArena::acquire(&pool, 4).unwrap();
/// arena.write_slice(b"hello").unwrap();
///
/// assert_eq!(arena.written(), b"hello");
/// assert_eq!(arena.to_owned_vec().unwrap(), b"hello".to_vec());
/// assert!(arena.is_empty());
/// ```
pub struct BufferArena<T: Copy + Default = u8> {
    pool: Arc<BlockPool<T>>,
    block: Option<Vec<T>>,
    written: usize,
    initial_capacity: usize,
    disposed: bool,
}

impl<T: Copy + Default> BufferArena<T> {
    /// Rent an initial block of at least `initial_capacity` elements
    ///
    /// # Errors
    /// `InvalidArgument` when `initial_capacity` is zero
    pub fn acquire(pool: &Arc<BlockPool<T>>, initial_capacity: usize) -> Result<Self, ArenaError> {
        if initial_capacity == 0 {
            return Err(ArenaError::InvalidArgument(
                "initial capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            pool: Arc::clone(pool),
            block: Some(pool.rent(initial_capacity)),
            written: 0,
            initial_capacity,
            disposed: false,
        })
    }

    /// Number of committed elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.written
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Size of the current block, 0 when no block is held
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.block.as_ref().map_or(0, Vec::len)
    }

    /// Elements that can be committed without growing
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.written
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// The committed prefix
    #[must_use]
    pub fn written(&self) -> &[T] {
        match &self.block {
            Some(block) => &block[..self.written],
            None => &[],
        }
    }

    /// Writable region of at least `size_hint` elements (at least one)
    ///
    /// Grows the arena when the current block cannot fit the request. Nothing
    /// is committed until `advance` is called.
    ///
    /// # Errors
    /// `UseAfterDispose` after `dispose`
    pub fn writable_region(&mut self, size_hint: usize) -> Result<&mut [T], ArenaError> {
        self.ensure_live()?;
        let written = self.written;
        let block = self.reserve(size_hint.max(1));
        Ok(&mut block[written..])
    }

    /// Commit `n` elements of the last writable region
    ///
    /// # Errors
    /// - `CapacityExceeded` when `n` is larger than the remaining capacity
    /// - `UseAfterDispose` after `dispose`
    pub fn advance(&mut self, n: usize) -> Result<(), ArenaError> {
        self.ensure_live()?;
        let remaining = self.remaining();
        if n > remaining {
            return Err(ArenaError::CapacityExceeded {
                requested: n,
                remaining,
            });
        }
        self.written += n;
        Ok(())
    }

    /// Copy `data` in and commit it
    ///
    /// # Errors
    /// `UseAfterDispose` after `dispose`
    pub fn write_slice(&mut self, data: &[T]) -> Result<(), ArenaError> {
        self.ensure_live()?;
        let len = data.len();
        if len == 0 {
            return Ok(());
        }
        let region = self.writable_region(len)?;
        region[..len].copy_from_slice(data);
        self.advance(len)
    }

    /// Move the written prefix out as an owned vector
    ///
    /// The backing block leaves the pool for good. The arena is empty
    /// afterwards; the next write rents a fresh block.
    ///
    /// # Errors
    /// `UseAfterDispose` after `dispose`
    pub fn to_owned_vec(&mut self) -> Result<Vec<T>, ArenaError> {
        self.ensure_live()?;
        let mut block = self.block.take().unwrap_or_default();
        block.truncate(self.written);
        self.written = 0;
        Ok(block)
    }

    /// Like `to_owned_vec`, as an immutable boxed slice
    ///
    /// # Errors
    /// `UseAfterDispose` after `dispose`
    pub fn to_boxed_slice(&mut self) -> Result<Box<[T]>, ArenaError> {
        self.to_owned_vec().map(Vec::into_boxed_slice)
    }

    /// Give the block back to the pool and forget what was written
    ///
    /// # Errors
    /// `UseAfterDispose` after `dispose`
    pub fn reset(&mut self) -> Result<(), ArenaError> {
        self.ensure_live()?;
        self.release();
        Ok(())
    }

    /// Give the block back to the pool; every later call fails
    pub fn dispose(&mut self) {
        if !self.disposed {
            self.release();
            self.disposed = true;
        }
    }

    fn ensure_live(&self) -> Result<(), ArenaError> {
        if self.disposed {
            Err(ArenaError::UseAfterDispose)
        } else {
            Ok(())
        }
    }

    fn release(&mut self) {
        if let Some(block) = self.block.take() {
            self.pool.give_back(block);
        }
        self.written = 0;
    }

    /// Make room for `requested` more elements after the written prefix
    fn reserve(&mut self, requested: usize) -> &mut Vec<T> {
        let written = self.written;
        let block = match self.block.take() {
            None => self.pool.rent(requested.max(self.initial_capacity)),
            Some(block) if block.len() - written >= requested => block,
            Some(old) => {
                let wanted = (written + requested).max(old.len() * 2);
                let mut grown = self.pool.rent(wanted);
                grown[..written].copy_from_slice(&old[..written]);
                self.pool.give_back(old);
                grown
            }
        };
        self.block.insert(block)
    }
}

impl<T: Copy + Default> Drop for BufferArena<T> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            self.pool.give_back(block);
        }
    }
}

impl std::io::Write for BufferArena<u8> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_slice(buf).map_err(std::io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl embedded_io::ErrorType for BufferArena<u8> {
    type Error = ArenaError;
}

impl embedded_io::Write for BufferArena<u8> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.write_slice(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
