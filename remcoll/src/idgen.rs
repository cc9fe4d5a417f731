use lazy_static::lazy_static;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

lazy_static! {
    static ref TOMBSTONES: TombstoneGen = TombstoneGen::new();
}

/// Thread-safe generator of unique placeholder payloads
///
/// A tombstone marks one exact slot of a remote list so that a value-based
/// primitive (remove-by-value, insert-before-marker) hits that slot and no
/// other. Payloads start with a NUL byte and embed the process id, the
/// generator's creation time and a counter.
#[derive(Debug)]
pub struct TombstoneGen {
    prefix: String,
    next_id: AtomicU64,
}

impl TombstoneGen {
    pub fn new() -> Self {
        let started = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_nanos());
        Self {
            prefix: format!("\u{0}remcoll:tombstone:{}:{started}:", std::process::id()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Get the next unique payload
    pub fn get_next(&self) -> Vec<u8> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{}{id}", self.prefix).into_bytes()
    }
}

impl Default for TombstoneGen {
    fn default() -> Self {
        Self::new()
    }
}

/// Next payload from the process-wide generator
pub fn next_tombstone() -> Vec<u8> {
    TOMBSTONES.get_next()
}
