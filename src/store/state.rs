//! Store State
//!
//! The mutable state of one store: its memstore and its set of committed
//! store files.
//!
//! ## Responsibilities
//! - Discover existing store files on startup
//! - Hand out store file ids
//! - Publish newly committed files (newest first)
//! - Collect the sources of a scan

use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::cell::{Cell, CellKey};
use crate::error::{MobError, Result};
use crate::memstore::MemStore;
use crate::storage::{CellFileReader, FileKind};

/// A committed, immutable store file
pub struct StoreFile {
    id: u64,
    path: PathBuf,
    /// Reads seek the file handle, so they take the lock
    reader: Mutex<CellFileReader>,
}

impl StoreFile {
    pub fn open(id: u64, path: &Path) -> Result<Self> {
        let reader = CellFileReader::open(path)?;
        if reader.file_info().kind != FileKind::Store {
            return Err(MobError::Corruption(format!(
                "{} is not a store file",
                path.display()
            )));
        }
        Ok(Self {
            id,
            path: path.to_path_buf(),
            reader: Mutex::new(reader),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_count(&self) -> u64 {
        self.reader.lock().entry_count()
    }

    fn scan(&self, range: (Bound<CellKey>, Bound<CellKey>)) -> Result<Vec<Cell>> {
        self.reader.lock().scan(range)
    }
}

/// Memstore plus store file set, with controlled mutation entry points
///
/// ## Concurrency:
/// - `files`: RwLock (scans clone the list, commits replace it)
/// - `next_file_id`: Atomic counter (lock-free)
/// - All methods use `&self`
pub struct StoreState {
    /// Directory where committed store files live
    dir: PathBuf,

    memstore: MemStore,

    /// Committed files, ordered newest → oldest
    files: RwLock<Vec<Arc<StoreFile>>>,

    /// Next ID for creating new store files
    next_file_id: AtomicU64,
}

impl StoreState {
    const FILE_PREFIX: &'static str = "storefile_";
    const FILE_EXTENSION: &'static str = "cf";

    /// Open or create state over the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Discover existing store files
    /// 3. Open readers for each
    /// 4. Order by ID descending (newest first)
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let mut ids: Vec<u64> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                if let Some(id) = Self::parse_file_id(&path) {
                    ids.push(id);
                }
            }
        }

        // Newest first (highest ID first)
        ids.sort_unstable_by(|a, b| b.cmp(a));

        let mut files = Vec::with_capacity(ids.len());
        for &id in &ids {
            files.push(Arc::new(StoreFile::open(id, &Self::file_path_in(dir, id))?));
        }

        // Next ID = max + 1, or 1 if no files exist
        let next_id = ids.first().map(|&id| id + 1).unwrap_or(1);

        Ok(Self {
            dir: dir.to_path_buf(),
            memstore: MemStore::new(),
            files: RwLock::new(files),
            next_file_id: AtomicU64::new(next_id),
        })
    }

    pub fn memstore(&self) -> &MemStore {
        &self.memstore
    }

    /// Add a cell to the memstore; returns the active size afterwards
    pub fn add(&self, cell: Cell) -> usize {
        self.memstore.add(cell)
    }

    /// Freeze the memstore for flushing
    pub fn snapshot(&self) -> bool {
        self.memstore.snapshot()
    }

    pub fn allocate_file_id(&self) -> u64 {
        self.next_file_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Final location of the store file with `id`
    pub fn file_path(&self, id: u64) -> PathBuf {
        Self::file_path_in(&self.dir, id)
    }

    /// Publish a committed store file and drop the snapshot it was built from
    pub fn commit(&self, file: StoreFile) {
        let mut files = self.files.write();
        files.insert(0, Arc::new(file));
        self.memstore.clear_snapshot();
    }

    /// Sources of a scan over `range`, newest first:
    /// memstore (active over snapshot), then store files
    ///
    /// The memstore is read before the file list. A flush committing in
    /// between then shows up in both sources, and the merge keeps one copy.
    pub fn scan_sources(&self, range: (Bound<CellKey>, Bound<CellKey>)) -> Result<Vec<Vec<Cell>>> {
        let memstore_cells = self.memstore.scan(range.clone());
        let files: Vec<Arc<StoreFile>> = self.files.read().clone();

        let mut sources = Vec::with_capacity(files.len() + 1);
        sources.push(memstore_cells);
        for file in files {
            sources.push(file.scan(range.clone())?);
        }
        Ok(sources)
    }

    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path_in(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("{}{:06}.{}", Self::FILE_PREFIX, id, Self::FILE_EXTENSION))
    }

    /// "storefile_000042.cf" → Some(42)
    fn parse_file_id(path: &Path) -> Option<u64> {
        if path.extension()? != Self::FILE_EXTENSION {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        name.strip_prefix(Self::FILE_PREFIX)?.parse().ok()
    }
}
