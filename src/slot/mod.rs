//! Durable storage slots.
//!
//! A slot is a string-keyed entry holding one serialized document. The
//! store reads its slot once when opened and overwrites it in full after
//! every mutation.
//!
//! Two backends are provided:
//! - [`FileSlot`]: one file per key inside a locked directory
//! - [`MemorySlot`]: an in-process map with an optional byte quota

mod file;
mod memory;

pub use file::FileSlot;
pub use memory::MemorySlot;

use crate::error::Result;

/// A string-keyed durable store of serialized documents.
pub trait StorageSlot: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value stored under `key`.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the value stored under `key`. Missing keys are not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
