//! Cell File Iterator
//!
//! Sequential iteration over all cells in a cell file.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};

use crate::cell::Cell;
use crate::config::Compression;
use crate::error::Result;

use super::{read_entry, HEADER_SIZE};

/// Iterator over cell file entries in key order
pub struct CellFileIterator<'a> {
    file: &'a mut BufReader<File>,
    /// Stop reading when we reach this offset (start of index block)
    end_offset: u64,
    /// Current position in file
    current_offset: u64,
    compression: Compression,
    /// Stop after the first error
    failed: bool,
}

impl<'a> CellFileIterator<'a> {
    /// Create a new iterator starting from the data block
    pub(super) fn new(
        file: &'a mut BufReader<File>,
        end_offset: u64,
        compression: Compression,
    ) -> Result<Self> {
        // Seek to start of data (after header)
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        Ok(Self {
            file,
            end_offset,
            current_offset: HEADER_SIZE,
            compression,
            failed: false,
        })
    }
}

impl<'a> Iterator for CellFileIterator<'a> {
    type Item = Result<Cell>;

    fn next(&mut self) -> Option<Self::Item> {
        // Stop at index block
        if self.failed || self.current_offset >= self.end_offset {
            return None;
        }

        match read_entry(&mut *self.file, self.compression) {
            Ok((cell, consumed)) => {
                self.current_offset += consumed;
                Some(Ok(cell))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
