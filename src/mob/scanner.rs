//! Scan Adapter
//!
//! Wraps a store scan and resolves reference cells one by one. Only values
//! change: order and membership of the wrapped stream are preserved.

use crate::cell::Cell;
use crate::error::Result;
use crate::store::{CellStream, Scan};

use super::reference::is_reference;
use super::resolver::MobResolver;

/// How a `MobScanner` treats reference cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Pass reference cells through untouched
    Raw,
    /// Resolve reference cells; `lenient` degrades misses to empty values
    Resolve { lenient: bool },
}

impl ScanMode {
    /// Mode requested by the scan's attributes
    pub fn from_scan(scan: &Scan) -> Self {
        if scan.is_raw_mob() {
            ScanMode::Raw
        } else {
            ScanMode::Resolve {
                lenient: scan.empty_value_on_mob_miss(),
            }
        }
    }
}

/// Resolving wrapper over a cell stream
pub struct MobScanner<'a> {
    inner: CellStream<'a>,
    resolver: &'a MobResolver,
    mode: ScanMode,
}

impl<'a> MobScanner<'a> {
    pub fn new(inner: CellStream<'a>, resolver: &'a MobResolver, mode: ScanMode) -> Self {
        Self {
            inner,
            resolver,
            mode,
        }
    }
}

impl<'a> Iterator for MobScanner<'a> {
    type Item = Result<Cell>;

    fn next(&mut self) -> Option<Self::Item> {
        let cell = match self.inner.next()? {
            Ok(cell) => cell,
            Err(e) => return Some(Err(e)),
        };

        match self.mode {
            ScanMode::Resolve { lenient } if is_reference(&cell) => {
                Some(self.resolver.resolve(&cell, lenient))
            }
            _ => Some(Ok(cell)),
        }
    }
}
