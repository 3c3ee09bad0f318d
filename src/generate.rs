//! Id and color generators for callers creating shapes.

use crate::types::ShapeId;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Per-process counter mixed into every generated value.
static COUNTER: AtomicU64 = AtomicU64::new(0);

fn millis_since_epoch() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// 32 bytes that differ on every call within a process.
fn entropy(tag: &[u8]) -> [u8; 32] {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update(nanos.to_le_bytes());
    hasher.update(count.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.finalize().into()
}

/// Generate a unique shape id of the form `shape-<millis>-<9 hex chars>`.
pub fn generate_id() -> ShapeId {
    let suffix = hex::encode(&entropy(b"id")[..5]);
    ShapeId(format!("shape-{}-{}", millis_since_epoch(), &suffix[..9]))
}

/// Generate a random `#RRGGBB` color with uppercase hex digits.
pub fn random_color() -> String {
    let bytes = entropy(b"color");
    format!("#{}", hex::encode_upper(&bytes[..3]))
}
