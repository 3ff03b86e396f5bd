//! K-way merge of sorted cell sources
//!
//! Sources are ordered newest first. When several sources hold the same key,
//! the newest one's cell is emitted and the rest are skipped.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::vec;

use crate::cell::Cell;

struct HeapEntry {
    cell: Cell,
    /// Index into `sources`; lower is newer
    source: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cell
            .key()
            .cmp(other.cell.key())
            .then_with(|| self.source.cmp(&other.source))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lazily merges individually sorted sources into one sorted stream
pub struct MergingIterator {
    sources: Vec<vec::IntoIter<Cell>>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
}

impl MergingIterator {
    pub fn new(sources: Vec<Vec<Cell>>) -> Self {
        let mut sources: Vec<vec::IntoIter<Cell>> = sources.into_iter().map(Vec::into_iter).collect();
        let mut heap = BinaryHeap::with_capacity(sources.len());

        for (source, iter) in sources.iter_mut().enumerate() {
            if let Some(cell) = iter.next() {
                heap.push(Reverse(HeapEntry { cell, source }));
            }
        }

        Self { sources, heap }
    }

    fn refill(&mut self, source: usize) {
        if let Some(cell) = self.sources[source].next() {
            self.heap.push(Reverse(HeapEntry { cell, source }));
        }
    }
}

impl Iterator for MergingIterator {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        let Reverse(top) = self.heap.pop()?;
        self.refill(top.source);

        // Drop shadowed copies of the same key from older sources
        while let Some(Reverse(next)) = self.heap.peek() {
            if next.cell.key() != top.cell.key() {
                break;
            }
            let source = next.source;
            self.heap.pop();
            self.refill(source);
        }

        Some(top.cell)
    }
}
