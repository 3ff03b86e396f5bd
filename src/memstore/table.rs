//! MemStore implementation
//!
//! BTreeMap-based memstore with RwLock for concurrency.

use std::collections::BTreeMap;
use std::ops::RangeBounds;

use parking_lot::RwLock;

use crate::cell::{Cell, CellKey};

#[derive(Default)]
struct Segments {
    active: BTreeMap<CellKey, Cell>,
    active_size: usize,
    snapshot: BTreeMap<CellKey, Cell>,
    snapshot_size: usize,
}

/// In-memory buffer of cells not yet flushed
///
/// ## Concurrency:
/// - One RwLock over both segments so `snapshot()` swaps them atomically
///   with respect to readers
/// - All methods take `&self`
#[derive(Default)]
pub struct MemStore {
    segments: RwLock<Segments>,
}

impl MemStore {
    /// Create a new empty MemStore
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell, replacing any cell with the same key
    ///
    /// Returns the active segment's approximate size afterwards.
    pub fn add(&self, cell: Cell) -> usize {
        let mut segments = self.segments.write();
        let added = cell.heap_size();
        if let Some(old) = segments.active.insert(cell.key().clone(), cell) {
            segments.active_size -= old.heap_size();
        }
        segments.active_size += added;
        segments.active_size
    }

    /// Freeze the active segment into the snapshot
    ///
    /// Returns false (and changes nothing) while a previous snapshot is
    /// still waiting to be flushed.
    pub fn snapshot(&self) -> bool {
        let mut segments = self.segments.write();
        if !segments.snapshot.is_empty() {
            tracing::warn!(
                cells = segments.snapshot.len(),
                "Snapshot requested while previous snapshot is not flushed; ignoring"
            );
            return false;
        }

        let active = std::mem::take(&mut segments.active);
        let active_size = std::mem::take(&mut segments.active_size);
        segments.snapshot = active;
        segments.snapshot_size = active_size;
        true
    }

    /// Cells of the current snapshot, in key order
    pub fn snapshot_cells(&self) -> Vec<Cell> {
        self.segments.read().snapshot.values().cloned().collect()
    }

    /// Drop the snapshot once its cells are durable in a store file
    pub fn clear_snapshot(&self) {
        let mut segments = self.segments.write();
        segments.snapshot.clear();
        segments.snapshot_size = 0;
    }

    /// Cells in `range` from both segments, in key order
    ///
    /// On identical keys the active segment (newer write) wins.
    pub fn scan<R: RangeBounds<CellKey> + Clone>(&self, range: R) -> Vec<Cell> {
        let segments = self.segments.read();
        let mut merged: BTreeMap<&CellKey, &Cell> =
            segments.snapshot.range(range.clone()).collect();
        merged.extend(segments.active.range(range));
        merged.into_values().cloned().collect()
    }

    /// Approximate size of the active segment in bytes
    pub fn size(&self) -> usize {
        self.segments.read().active_size
    }

    /// Approximate size of the snapshot in bytes
    pub fn snapshot_size(&self) -> usize {
        self.segments.read().snapshot_size
    }

    /// Number of cells in the active segment
    pub fn cell_count(&self) -> usize {
        self.segments.read().active.len()
    }

    /// Number of cells in the snapshot
    pub fn snapshot_cell_count(&self) -> usize {
        self.segments.read().snapshot.len()
    }

    /// True if neither segment holds cells
    pub fn is_empty(&self) -> bool {
        let segments = self.segments.read();
        segments.active.is_empty() && segments.snapshot.is_empty()
    }
}
