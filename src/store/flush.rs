//! Flush Pipeline
//!
//! ```text
//!   prepare()      freeze the memstore into a snapshot
//!   flush_cache()  policy rewrites the snapshot (MOB files written + sealed),
//!                  store file written to the temp directory
//!   commit()       policy commits its side files, then the store file is
//!                  moved into place and published, then the snapshot dropped
//! ```
//! Side files are committed before the store file is visible, so a visible
//! reference always points at a committed MOB file. A context dropped before
//! `commit()` removes what it wrote and leaves the snapshot for a retry.

use std::fs;
use std::path::PathBuf;

use parking_lot::MutexGuard;

use crate::cell::Cell;
use crate::error::Result;
use crate::storage::{CellFile, CellFileBuilder, FileKind};

use super::policy::PreparedFlush;
use super::state::StoreFile;
use super::Store;

struct WrittenFile {
    id: u64,
    temp_path: PathBuf,
    meta: CellFile,
}

/// One flush of one store; holds the store's flush lock until dropped
pub struct StoreFlushContext<'a> {
    store: &'a Store,
    _flush_guard: MutexGuard<'a, ()>,
    snapshot: Option<Vec<Cell>>,
    prepared: Option<PreparedFlush>,
    written: Option<WrittenFile>,
    committed: bool,
}

impl<'a> StoreFlushContext<'a> {
    pub(super) fn new(store: &'a Store, flush_guard: MutexGuard<'a, ()>) -> Self {
        Self {
            store,
            _flush_guard: flush_guard,
            snapshot: None,
            prepared: None,
            written: None,
            committed: false,
        }
    }

    /// Snapshot the memstore (keeps an earlier, unflushed snapshot)
    pub fn prepare(&mut self) -> Result<()> {
        self.store.state().snapshot();
        let cells = self.store.state().memstore().snapshot_cells();
        tracing::debug!(
            family = %self.store.family().name(),
            cells = cells.len(),
            "Prepared flush snapshot"
        );
        self.snapshot = Some(cells);
        Ok(())
    }

    /// Run the policy over the snapshot and write the store file to the temp directory
    pub fn flush_cache(&mut self) -> Result<()> {
        let snapshot = match self.snapshot.take() {
            Some(cells) => cells,
            None => {
                self.prepare()?;
                self.snapshot.take().unwrap_or_default()
            }
        };

        if snapshot.is_empty() {
            self.prepared = Some(PreparedFlush::default());
            return Ok(());
        }

        let prepared = self.store.policy().flush_cells(snapshot)?;
        // Owned from here on so a failure below still aborts the side files
        let prepared = self.prepared.insert(prepared);

        let id = self.store.state().allocate_file_id();
        let temp_dir = self.store.temp_dir();
        fs::create_dir_all(temp_dir)?;
        let temp_path = temp_dir.join(format!("storefile_{:06}.tmp", id));

        let mut builder = CellFileBuilder::create(
            &temp_path,
            FileKind::Store,
            crate::config::Compression::None,
            prepared.cells.len(),
        )?;
        let written = prepared
            .cells
            .iter()
            .try_for_each(|cell| builder.append(cell))
            .and_then(|()| builder.finish());

        match written {
            Ok(meta) => {
                self.written = Some(WrittenFile { id, temp_path, meta });
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }

    /// Commit side files, publish the store file, release the snapshot
    ///
    /// Returns the published file's metadata, or `None` when the snapshot was
    /// empty.
    pub fn commit(mut self) -> Result<Option<CellFile>> {
        if self.prepared.is_none() {
            self.flush_cache()?;
        }

        let mut side_files = 0;
        if let Some(prepared) = &mut self.prepared {
            self.store.policy().commit_flush(&prepared.pending)?;
            // Committed side files are no longer ours to clean up
            side_files = std::mem::take(&mut prepared.pending).len();
        }

        let written = match self.written.take() {
            Some(written) => written,
            None => {
                self.store.state().memstore().clear_snapshot();
                self.committed = true;
                return Ok(None);
            }
        };

        let final_path = self.store.state().file_path(written.id);
        if let Err(e) = fs::rename(&written.temp_path, &final_path) {
            // The snapshot stays, so a retry writes the store file again
            let _ = fs::remove_file(&written.temp_path);
            return Err(e.into());
        }
        let file = StoreFile::open(written.id, &final_path)?;
        self.store.state().commit(file);
        self.committed = true;

        tracing::info!(
            family = %self.store.family().name(),
            policy = self.store.policy().name(),
            file = %final_path.display(),
            cells = written.meta.entry_count,
            side_files,
            "Flush committed"
        );

        Ok(Some(CellFile {
            path: final_path,
            ..written.meta
        }))
    }
}

impl Drop for StoreFlushContext<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Some(prepared) = &self.prepared {
            self.store.policy().abort_flush(&prepared.pending);
        }
        if let Some(written) = &self.written {
            let _ = fs::remove_file(&written.temp_path);
        }
    }
}
