//! Scan requests and the store's merged scan stream

use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;

use bytes::Bytes;

use crate::cell::{Cell, CellKey, LATEST_TIMESTAMP};
use crate::error::Result;

use super::merge::MergingIterator;

/// Boxed stream of scan results
pub type CellStream<'a> = Box<dyn Iterator<Item = Result<Cell>> + 'a>;

/// Attribute: return MOB references unresolved
pub const MOB_SCAN_RAW: &str = "MOB_SCAN_RAW";

/// Attribute: a missing MOB target yields an empty value instead of an error
pub const EMPTY_VALUE_ON_MOB_CELL_MISS: &str = "EMPTY_VALUE_ON_MOB_CELL_MISS";

/// Encoded boolean attribute value
pub fn bool_attribute(value: bool) -> Bytes {
    if value {
        Bytes::from_static(&[0xff])
    } else {
        Bytes::from_static(&[0x00])
    }
}

/// A scan (or get) over one family
///
/// Rows in `[start_row, stop_row)`; an empty `stop_row` means unbounded.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    start_row: Bytes,
    stop_row: Option<Bytes>,
    columns: Option<BTreeSet<Bytes>>,
    max_versions: Option<usize>,
    attributes: HashMap<String, Bytes>,
}

impl Scan {
    /// Scan every row
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan exactly one row (get semantics)
    pub fn for_row(row: impl Into<Bytes>) -> Self {
        let row = row.into();
        let mut stop = row.to_vec();
        stop.push(0);
        Self {
            start_row: row,
            stop_row: Some(Bytes::from(stop)),
            ..Self::default()
        }
    }

    pub fn with_start_row(mut self, row: impl Into<Bytes>) -> Self {
        self.start_row = row.into();
        self
    }

    pub fn with_stop_row(mut self, row: impl Into<Bytes>) -> Self {
        self.stop_row = Some(row.into());
        self
    }

    /// Restrict to a qualifier; may be called repeatedly
    pub fn add_column(mut self, qualifier: impl Into<Bytes>) -> Self {
        self.columns.get_or_insert_with(BTreeSet::new).insert(qualifier.into());
        self
    }

    pub fn with_max_versions(mut self, versions: usize) -> Self {
        self.max_versions = Some(versions.max(1));
        self
    }

    pub fn all_versions(mut self) -> Self {
        self.max_versions = Some(usize::MAX);
        self
    }

    pub fn set_attribute(mut self, name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Bytes> {
        self.attributes.get(name)
    }

    /// Shorthand for the `MOB_SCAN_RAW` attribute
    pub fn raw_mob(self, raw: bool) -> Self {
        self.set_attribute(MOB_SCAN_RAW, bool_attribute(raw))
    }

    /// Shorthand for the `EMPTY_VALUE_ON_MOB_CELL_MISS` attribute
    pub fn empty_value_on_miss(self, lenient: bool) -> Self {
        self.set_attribute(EMPTY_VALUE_ON_MOB_CELL_MISS, bool_attribute(lenient))
    }

    pub fn is_raw_mob(&self) -> bool {
        self.bool_attribute(MOB_SCAN_RAW)
    }

    pub fn empty_value_on_mob_miss(&self) -> bool {
        self.bool_attribute(EMPTY_VALUE_ON_MOB_CELL_MISS)
    }

    /// Any non-zero first byte is true
    fn bool_attribute(&self, name: &str) -> bool {
        self.attributes
            .get(name)
            .and_then(|v| v.first())
            .is_some_and(|b| *b != 0)
    }

    /// Versions per column, falling back to the family default
    pub fn max_versions_or(&self, family_default: usize) -> usize {
        self.max_versions.unwrap_or(family_default)
    }

    pub fn includes_column(&self, qualifier: &[u8]) -> bool {
        self.columns
            .as_ref()
            .map_or(true, |columns| columns.contains(qualifier))
    }

    /// Key range covering the scan's rows
    pub fn key_range(&self) -> (Bound<CellKey>, Bound<CellKey>) {
        let first = |row: &Bytes| CellKey::new(row.clone(), Bytes::new(), Bytes::new(), LATEST_TIMESTAMP);

        let start = Bound::Included(first(&self.start_row));
        let end = match &self.stop_row {
            Some(stop) if !stop.is_empty() => {
                // An inverted range would make BTreeMap::range panic
                let stop = if *stop < self.start_row { &self.start_row } else { stop };
                Bound::Excluded(first(stop))
            }
            _ => Bound::Unbounded,
        };
        (start, end)
    }
}

/// Merged, filtered stream over a store's sources
///
/// Applies the column set and the per-column version limit on top of the
/// newest-wins merge.
pub struct StoreScanner {
    merged: MergingIterator,
    scan: Scan,
    max_versions: usize,
    current_column: Option<CellKey>,
    versions_seen: usize,
}

impl StoreScanner {
    pub(crate) fn new(sources: Vec<Vec<Cell>>, scan: Scan, max_versions: usize) -> Self {
        Self {
            merged: MergingIterator::new(sources),
            scan,
            max_versions,
            current_column: None,
            versions_seen: 0,
        }
    }
}

impl Iterator for StoreScanner {
    type Item = Result<Cell>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let cell = self.merged.next()?;

            if !self.scan.includes_column(cell.qualifier()) {
                continue;
            }

            match &self.current_column {
                Some(column) if column.same_column(cell.key()) => self.versions_seen += 1,
                _ => {
                    self.current_column = Some(cell.key().clone());
                    self.versions_seen = 1;
                }
            }

            if self.versions_seen <= self.max_versions {
                return Some(Ok(cell));
            }
        }
    }
}
