//! # Chain Persistence
//!
//! Whole-chain snapshots: every save rewrites the full block list. That is
//! wasteful and also exactly what makes the format trivially inspectable and
//! trivially correct.
//!
//! ## Atomic replace
//!
//! [`JsonFileStore::save`] writes to a temp file in the *same directory* as
//! the target, fsyncs it, then renames it over the target. Rename within a
//! filesystem is atomic, so a reader (or a restart after a crash) sees either
//! the old chain or the new one, never half of each.
//!
//! On Unix the containing directory is fsynced after the rename as well.
//! Until then the new directory entry may live only in the page cache, and a
//! power loss could bring back the previous, shorter chain.

use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use super::block::Block;

/// Errors that can occur while loading or saving a chain snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chain file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("chain file encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("persisted chain is invalid: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Whole-chain load/save. Implementations must make `save` all-or-nothing.
pub trait ChainStore: Send + Sync {
    /// The persisted chain, or `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<Vec<Block>>, StoreError>;

    /// Replace the persisted chain with `blocks`.
    fn save(&self, blocks: &[Block]) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Pretty-printed JSON array of blocks in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl ChainStore for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<Block>>, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let blocks: Vec<Block> = serde_json::from_str(&text)?;
        debug!(path = %self.path.display(), blocks = blocks.len(), "chain loaded");
        Ok(Some(blocks))
    }

    fn save(&self, blocks: &[Block]) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec_pretty(blocks)?;

        let mut tmp = NamedTempFile::new_in(self.directory())?;
        tmp.write_all(&encoded)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        sync_directory(self.directory())?;

        debug!(path = %self.path.display(), blocks = blocks.len(), "chain saved");
        Ok(())
    }
}

/// Flush a directory entry change (the rename in `save`) to disk.
#[cfg(unix)]
fn sync_directory(dir: &Path) -> Result<(), StoreError> {
    std::fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process store for tests and ephemeral nodes. Can be told to fail
/// saves, which is the only way to exercise persistence-failure paths
/// without a misbehaving filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blocks: Mutex<Option<Vec<Block>>>,
    fail_saves: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded with an existing chain.
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: Mutex::new(Some(blocks)),
            fail_saves: Mutex::new(false),
        }
    }

    /// Make every subsequent `save` fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }

    /// What a restart would load.
    pub fn snapshot(&self) -> Option<Vec<Block>> {
        self.blocks.lock().clone()
    }
}

impl ChainStore for MemoryStore {
    fn load(&self) -> Result<Option<Vec<Block>>, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, blocks: &[Block]) -> Result<(), StoreError> {
        if *self.fail_saves.lock() {
            return Err(StoreError::Unavailable("saves disabled".into()));
        }
        *self.blocks.lock() = Some(blocks.to_vec());
        Ok(())
    }
}
