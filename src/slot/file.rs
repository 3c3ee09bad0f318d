//! File-backed storage slot.

use crate::error::{Result, StoreError};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::StorageSlot;

/// Extension used for slot files.
const SLOT_EXTENSION: &str = "json";

/// Storage slot that keeps each key in its own file under a directory.
///
/// The directory is locked exclusively for as long as the slot is alive,
/// so two processes cannot write the same slot.
pub struct FileSlot {
    /// Base directory.
    path: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,
}

impl FileSlot {
    /// Open a slot directory, creating it if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        let lock_file = Self::acquire_lock(&path)?;

        Ok(Self {
            path,
            _lock_file: lock_file,
        })
    }

    /// Base directory of this slot.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File path used for `key`.
    ///
    /// Keys made only of ASCII alphanumerics, `-`, `_` and `.` map to
    /// `<key>.json`; anything else is hex-encoded as `x-<hex>.json`. Keys
    /// that already start with `x-` are always encoded so the two forms
    /// never collide.
    pub fn key_path(&self, key: &str) -> PathBuf {
        let plain = !key.is_empty()
            && !key.starts_with('.')
            && !key.starts_with("x-")
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        let stem = if plain {
            key.to_string()
        } else {
            format!("x-{}", hex::encode(key.as_bytes()))
        };

        self.path.join(format!("{}.{}", stem, SLOT_EXTENSION))
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_path = path.join("LOCK");
        let lock_file = File::create(lock_path)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;

        Ok(lock_file)
    }
}

impl StorageSlot for FileSlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let target = self.key_path(key);
        let tmp = target.with_extension("tmp");

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;

        // Same-directory rename replaces the target atomically.
        fs::rename(&tmp, &target)?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
