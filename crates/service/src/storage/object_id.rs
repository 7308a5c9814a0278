//! 24-hex-digit object ids for the in-process backends.
//!
//! Layout: 8 hex digits of the process start time (seconds) followed by a
//! 16 hex digit counter, so ids sort in creation order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;

static EPOCH: Lazy<u32> = Lazy::new(|| {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or_default()
});

static COUNTER: AtomicU64 = AtomicU64::new(1);

pub fn new_object_id() -> String {
    format!("{:08x}{:016x}", *EPOCH, COUNTER.fetch_add(1, Ordering::Relaxed))
}

pub fn is_object_id(id: &str) -> bool {
    id.len() == 24 && id.bytes().all(|b| b.is_ascii_hexdigit())
}
