//! Cell Module
//!
//! The unit of storage: a versioned value at (row, family, qualifier).
//!
//! ## Ordering
//! ```text
//!   row ASC → family ASC → qualifier ASC → timestamp DESC
//! ```
//! Newer versions of the same column sort first, so a forward seek to
//! `(row, family, qualifier, ts)` lands on the newest version at or below `ts`.

use std::cmp::Ordering;
use std::fmt;

use bytes::Bytes;

/// Timestamp that sorts before every real version of a column
pub const LATEST_TIMESTAMP: u64 = u64::MAX;

/// Coordinates of a cell, with the store's key ordering
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub row: Bytes,
    pub family: Bytes,
    pub qualifier: Bytes,
    pub timestamp: u64,
}

impl CellKey {
    pub fn new(
        row: impl Into<Bytes>,
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        timestamp: u64,
    ) -> Self {
        Self {
            row: row.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp,
        }
    }

    /// Same row, family and qualifier (timestamp ignored)
    pub fn same_column(&self, other: &CellKey) -> bool {
        self.row == other.row && self.family == other.family && self.qualifier == other.qualifier
    }

    /// Approximate heap footprint, used for memstore sizing
    pub fn heap_size(&self) -> usize {
        self.row.len() + self.family.len() + self.qualifier.len() + 8
    }
}

impl Ord for CellKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.family.cmp(&other.family))
            .then_with(|| self.qualifier.cmp(&other.qualifier))
            .then_with(|| other.timestamp.cmp(&self.timestamp))
    }
}

impl PartialOrd for CellKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}:{}/{}",
            String::from_utf8_lossy(&self.row),
            String::from_utf8_lossy(&self.family),
            String::from_utf8_lossy(&self.qualifier),
            self.timestamp
        )
    }
}

/// What a cell's value holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CellType {
    /// The value itself
    Put = 0,
    /// An encoded MOB reference (see `mob::reference`)
    MobReference = 1,
}

impl CellType {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(CellType::Put),
            1 => Some(CellType::MobReference),
            _ => None,
        }
    }
}

/// An immutable versioned value
#[derive(Clone, PartialEq, Eq)]
pub struct Cell {
    key: CellKey,
    cell_type: CellType,
    value: Bytes,
}

impl Cell {
    /// Create a plain `Put` cell
    pub fn new(
        row: impl Into<Bytes>,
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        timestamp: u64,
        value: impl Into<Bytes>,
    ) -> Self {
        Self::from_key(CellKey::new(row, family, qualifier, timestamp), value)
    }

    pub fn from_key(key: CellKey, value: impl Into<Bytes>) -> Self {
        Self::with_type(key, CellType::Put, value)
    }

    pub fn with_type(key: CellKey, cell_type: CellType, value: impl Into<Bytes>) -> Self {
        Self {
            key,
            cell_type,
            value: value.into(),
        }
    }

    pub fn key(&self) -> &CellKey {
        &self.key
    }

    pub fn row(&self) -> &[u8] {
        &self.key.row
    }

    pub fn family(&self) -> &[u8] {
        &self.key.family
    }

    pub fn qualifier(&self) -> &[u8] {
        &self.key.qualifier
    }

    pub fn timestamp(&self) -> u64 {
        self.key.timestamp
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub fn value_len(&self) -> usize {
        self.value.len()
    }

    /// Same coordinates, different value and type
    pub fn replace_value(&self, cell_type: CellType, value: impl Into<Bytes>) -> Cell {
        Cell::with_type(self.key.clone(), cell_type, value)
    }

    pub fn into_parts(self) -> (CellKey, CellType, Bytes) {
        (self.key, self.cell_type, self.value)
    }

    /// Approximate heap footprint, used for memstore sizing
    pub fn heap_size(&self) -> usize {
        self.key.heap_size() + 1 + self.value.len()
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("key", &self.key)
            .field("type", &self.cell_type)
            .field("value_len", &self.value.len())
            .finish()
    }
}
