//! Store Policy
//!
//! The seam where a storage strategy plugs into the generic store. A policy
//! sees every flushed snapshot before it is written, commits whatever side
//! files it produced, and may wrap every scan.

use std::fs;
use std::path::PathBuf;

use crate::cell::Cell;
use crate::error::Result;

use super::scan::{CellStream, Scan};

/// A file written during a flush that must be committed with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub temp_path: PathBuf,
    pub target_path: PathBuf,
}

/// Output of `StorePolicy::flush_cells`
#[derive(Debug, Default)]
pub struct PreparedFlush {
    /// Cells to write into the store file, still in key order
    pub cells: Vec<Cell>,
    /// Side files to commit before the store file is published
    pub pending: Vec<PendingFile>,
}

/// Storage strategy injected into a `Store`
pub trait StorePolicy: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Rewrite a snapshot (in key order) into the cells the store file keeps
    fn flush_cells(&self, snapshot: Vec<Cell>) -> Result<PreparedFlush>;

    /// Make side files durable at their targets; runs before the store file
    /// becomes visible
    fn commit_flush(&self, pending: &[PendingFile]) -> Result<()>;

    /// Clean up side files of a flush that will not be committed
    fn abort_flush(&self, pending: &[PendingFile]) {
        for file in pending {
            if let Err(e) = fs::remove_file(&file.temp_path) {
                tracing::warn!(path = %file.temp_path.display(), error = %e, "Failed to remove uncommitted file");
            }
        }
    }

    /// Wrap the merged scan stream
    fn wrap_scan<'a>(&'a self, cells: CellStream<'a>, scan: &Scan) -> CellStream<'a>;
}

/// Keeps every value inline and scans untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStorePolicy;

impl StorePolicy for DefaultStorePolicy {
    fn name(&self) -> &'static str {
        "default"
    }

    fn flush_cells(&self, snapshot: Vec<Cell>) -> Result<PreparedFlush> {
        Ok(PreparedFlush {
            cells: snapshot,
            pending: Vec::new(),
        })
    }

    fn commit_flush(&self, _pending: &[PendingFile]) -> Result<()> {
        Ok(())
    }

    fn wrap_scan<'a>(&'a self, cells: CellStream<'a>, _scan: &Scan) -> CellStream<'a> {
        cells
    }
}
