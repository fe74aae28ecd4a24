//! Resume state for a dump ingest.
//!
//! A checkpoint records how many pages of one dump have been handed to one
//! index. It is only trusted when the dump file and target index are the same
//! ones it was written for.

use crate::config::CHECKPOINT_VERSION;
use crate::stats::IngestStats;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

const FILE_NAME: &str = "checkpoint.bin";

#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq, Eq)]
pub struct CheckpointStats {
    pub pages_processed: u64,
    pub documents_written: u64,
    pub redirects_skipped: u64,
    pub write_failures: u64,
}

/// Identifies the run a checkpoint belongs to: which dump (by path and
/// modification time) went into which index.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RunKey {
    pub input_path: String,
    pub input_mtime: u64,
    pub index_name: String,
}

impl RunKey {
    pub fn current(input_path: &str, index_name: &str) -> Result<Self> {
        let mtime = fs::metadata(input_path)
            .and_then(|m| m.modified())
            .with_context(|| format!("Failed to read modification time of {input_path}"))?
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Ok(Self {
            input_path: input_path.to_string(),
            input_mtime: mtime,
            index_name: index_name.to_string(),
        })
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Checkpoint {
    pub version: u32,
    pub key: RunKey,
    /// Pages fully handled, counted from the start of the dump
    pub pages_read: u64,
    pub stats: CheckpointStats,
}

pub fn checkpoint_path(checkpoint_dir: &str) -> PathBuf {
    Path::new(checkpoint_dir).join(FILE_NAME)
}

fn write_atomically(path: &Path, checkpoint: &Checkpoint) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create checkpoint directory {parent:?}"))?;
    }
    let bytes = bincode::serialize(checkpoint).context("Failed to encode checkpoint")?;
    let staging = path.with_extension("bin.tmp");
    fs::write(&staging, bytes).with_context(|| format!("Failed to write {staging:?}"))?;
    fs::rename(&staging, path).with_context(|| format!("Failed to move checkpoint into {path:?}"))
}

/// The stored checkpoint, if there is one and it was written for this dump
/// and index. Anything else means starting from the first page.
pub fn load_if_valid(
    input_path: &str,
    checkpoint_dir: &str,
    index_name: &str,
) -> Result<Option<Checkpoint>> {
    let path = checkpoint_path(checkpoint_dir);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {path:?}")),
    };

    let checkpoint: Checkpoint = match bincode::deserialize(&bytes) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, path = ?path, "Ignoring unreadable checkpoint");
            return Ok(None);
        }
    };

    let current = RunKey::current(input_path, index_name)?;
    if checkpoint.version != CHECKPOINT_VERSION || checkpoint.key != current {
        info!(
            stored = ?checkpoint.key,
            stored_version = checkpoint.version,
            current = ?current,
            "Checkpoint belongs to a different run; starting from the first page"
        );
        return Ok(None);
    }

    info!(
        pages_read = checkpoint.pages_read,
        documents = checkpoint.stats.documents_written,
        "Resuming from checkpoint"
    );
    Ok(Some(checkpoint))
}

pub fn clear(checkpoint_dir: &str) -> Result<()> {
    let path = checkpoint_path(checkpoint_dir);
    match fs::remove_file(&path) {
        Ok(()) => {
            info!("Checkpoint cleared");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {path:?}")),
    }
}

/// Writes the checkpoint for one run every `interval` pages.
pub struct CheckpointManager {
    dir: String,
    key: RunKey,
    interval: u64,
    pending: u64,
}

impl CheckpointManager {
    pub fn new(
        input_path: &str,
        checkpoint_dir: &str,
        index_name: &str,
        interval: u64,
    ) -> Result<Self> {
        Ok(Self {
            dir: checkpoint_dir.to_string(),
            key: RunKey::current(input_path, index_name)?,
            interval: interval.max(1),
            pending: 0,
        })
    }

    /// Counts one finished page; returns whether a save happened.
    pub fn maybe_save(&mut self, pages_read: u64, stats: &IngestStats) -> Result<bool> {
        self.pending += 1;
        if self.pending < self.interval {
            return Ok(false);
        }
        self.save(pages_read, stats)?;
        Ok(true)
    }

    pub fn save(&mut self, pages_read: u64, stats: &IngestStats) -> Result<()> {
        let checkpoint = Checkpoint {
            version: CHECKPOINT_VERSION,
            key: self.key.clone(),
            pages_read,
            stats: stats.to_checkpoint(),
        };
        write_atomically(&checkpoint_path(&self.dir), &checkpoint)?;
        self.pending = 0;
        debug!(pages_read, documents = stats.documents(), "Checkpoint saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        clear(&self.dir)
    }
}
