//! Typed collections over a remote list store
//!
//! ```
//! use remcoll::{ConnectionGate, JsonCodec, MemListStore, RemoteList, SortedList};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let gate = Arc::new(ConnectionGate::connected(MemListStore::new()));
//! let scores: SortedList<i64, _, _> =
//!     SortedList::new(RemoteList::new(Arc::clone(&gate), "scores", JsonCodec));
//!
//! for n in [3, 1, 2] {
//!     scores.add(&n).await.unwrap();
//! }
//! assert_eq!(scores.values().await.unwrap(), vec![1, 2, 3]);
//! # });
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod gate;
pub mod idgen;
pub mod indexed;
pub mod io;
pub mod list;
pub mod sorted;

// Re-export collection types for convenience
pub use indexed::IndexedMap;
pub use list::RemoteList;
pub use sorted::{Comparator, SortedList};

// Re-export connection and configuration types
pub use config::{ListOptions, RemovalMode, StoreEndpoint, StoreSource};
pub use gate::{ConnectionGate, ConnectionState};

pub use codec::{Codec, CodecError, JsonCodec, RawCodec};
pub use error::CollectionError;

// Re-export store and buffer types for convenience
pub use io::{ArenaError, BlockPool, BufferArena, ListStore, MemListStore, StoreError};

#[cfg(feature = "redis")]
pub use io::RedisListStore;
