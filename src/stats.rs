use crate::checkpoint::CheckpointStats;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one ingest run
#[derive(Default)]
pub struct IngestStats {
    pub pages_processed: AtomicU64,
    pub documents_written: AtomicU64,
    pub redirects_skipped: AtomicU64,
    pub write_failures: AtomicU64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_pages(&self) {
        self.pages_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_documents(&self) {
        self.documents_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_redirects(&self) {
        self.redirects_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failures(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pages(&self) -> u64 {
        self.pages_processed.load(Ordering::Relaxed)
    }

    pub fn documents(&self) -> u64 {
        self.documents_written.load(Ordering::Relaxed)
    }

    pub fn redirects(&self) -> u64 {
        self.redirects_skipped.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    /// Create stats initialized from a checkpoint
    pub fn from_checkpoint(cp: &CheckpointStats) -> Self {
        Self {
            pages_processed: AtomicU64::new(cp.pages_processed),
            documents_written: AtomicU64::new(cp.documents_written),
            redirects_skipped: AtomicU64::new(cp.redirects_skipped),
            write_failures: AtomicU64::new(cp.write_failures),
        }
    }

    /// Convert to checkpoint stats for persistence
    pub fn to_checkpoint(&self) -> CheckpointStats {
        CheckpointStats {
            pages_processed: self.pages(),
            documents_written: self.documents(),
            redirects_skipped: self.redirects(),
            write_failures: self.failures(),
        }
    }
}
