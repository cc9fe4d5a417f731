//! I/O module for remcoll
//!
//! Contains the remote list abstraction, its backends and the pooled write
//! buffer used to produce payloads.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  RemoteList / SortedList / IndexedMap│
//! │  - collection semantics             │
//! └─────────────────────────────────────┘
//!          ▲                  ▲
//!          │ payload bytes    │ round trips
//!          ▼                  ▼
//! ┌──────────────────┐ ┌────────────────┐
//! │  BufferArena     │ │  ListStore     │
//! │  - pooled blocks │ │  - one list    │
//! │  - codec writes  │ │    per key     │
//! └──────────────────┘ └────────────────┘
//!                        ▲           ▲
//!                        │           │
//!                  MemListStore  RedisListStore
//! ```

pub mod arena;
pub mod memlist;
#[cfg(feature = "redis")]
pub mod redislist;
pub mod types;

pub use arena::{ArenaError, BlockPool, BufferArena};
pub use memlist::MemListStore;
#[cfg(feature = "redis")]
pub use redislist::RedisListStore;
pub use types::{ListStore, StoreError};
