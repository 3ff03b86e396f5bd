//! Cell File Reader
//!
//! Opens cell files and provides O(log n) key lookups via in-memory index.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::{Bound, RangeBounds};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::cell::{Cell, CellKey};
use crate::error::{MobError, Result};

use super::iterator::CellFileIterator;
use super::{read_entry, u32_at, u64_at, FileInfo, FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// Reader for cell files with in-memory index for O(log n) lookups
pub struct CellFileReader {
    path: PathBuf,
    /// File handle for reading entries
    pub(super) file: BufReader<File>,
    /// In-memory index: key → file offset
    index: BTreeMap<CellKey, u64>,
    /// Metadata from the meta block
    info: FileInfo,
    /// Index block starting offset (end of data, for iteration)
    pub(super) index_offset: u64,
    /// CRC32 of the data block recorded in the footer
    data_crc: u32,
}

impl CellFileReader {
    /// Open a cell file for reading
    ///
    /// Loads the entire index and the file info into memory.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(MobError::Corruption(format!(
                "{} is too small to be a cell file ({} bytes)",
                path.display(),
                file_size
            )));
        }

        // Read and validate header
        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(MobError::Corruption(format!(
                "Invalid cell file magic in {}: expected ATCF, got {:?}",
                path.display(),
                &header[0..4]
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(MobError::Corruption(format!(
                "Unsupported cell file version: {}",
                version
            )));
        }

        let entry_count = u64_at(&header, 6);

        // Read footer to get block offsets
        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let index_offset = u64_at(&footer, 0);
        let meta_offset = u64_at(&footer, 8);
        let data_crc = u32_at(&footer, 16);

        let footer_start = file_size - FOOTER_SIZE;
        if index_offset < HEADER_SIZE || meta_offset < index_offset || meta_offset + 4 > footer_start {
            return Err(MobError::Corruption(format!(
                "Bad block offsets in {}: index={} meta={}",
                path.display(),
                index_offset,
                meta_offset
            )));
        }

        // Load index into memory
        file.seek(SeekFrom::Start(index_offset))?;
        let mut index_data = vec![0u8; (meta_offset - index_offset) as usize];
        file.read_exact(&mut index_data)?;
        let index = Self::parse_index(&index_data)?;

        if index.len() as u64 != entry_count {
            return Err(MobError::Corruption(format!(
                "{} header claims {} cells, index holds {}",
                path.display(),
                entry_count,
                index.len()
            )));
        }

        // Load file info
        let mut meta_data = vec![0u8; (footer_start - meta_offset) as usize];
        file.read_exact(&mut meta_data)?;
        let meta_len = u32_at(&meta_data, 0) as usize;
        if 4 + meta_len > meta_data.len() {
            return Err(MobError::Corruption(format!(
                "Truncated meta block in {}",
                path.display()
            )));
        }
        let info: FileInfo = bincode::deserialize(&meta_data[4..4 + meta_len])?;

        Ok(Self {
            path: path.to_path_buf(),
            file: BufReader::new(file),
            index,
            info,
            index_offset,
            data_crc,
        })
    }

    /// Parse index entries: [row_len(4)][fam_len(4)][qual_len(4)][ts(8)][offset(8)][coords]
    fn parse_index(data: &[u8]) -> Result<BTreeMap<CellKey, u64>> {
        let mut index = BTreeMap::new();
        let mut pos = 0;
        while pos < data.len() {
            if pos + 28 > data.len() {
                return Err(MobError::Corruption("Truncated index entry".to_string()));
            }
            let row_len = u32_at(data, pos) as usize;
            let fam_len = u32_at(data, pos + 4) as usize;
            let qual_len = u32_at(data, pos + 8) as usize;
            let timestamp = u64_at(data, pos + 12);
            let offset = u64_at(data, pos + 20);
            pos += 28;

            let end = pos + row_len + fam_len + qual_len;
            if end > data.len() {
                return Err(MobError::Corruption("Truncated index key".to_string()));
            }
            let row = Bytes::copy_from_slice(&data[pos..pos + row_len]);
            let family = Bytes::copy_from_slice(&data[pos + row_len..pos + row_len + fam_len]);
            let qualifier = Bytes::copy_from_slice(&data[pos + row_len + fam_len..end]);
            pos = end;

            index.insert(
                CellKey {
                    row,
                    family,
                    qualifier,
                    timestamp,
                },
                offset,
            );
        }
        Ok(index)
    }

    /// Exact lookup by full key (coordinates and timestamp)
    pub fn get(&mut self, key: &CellKey) -> Result<Option<Cell>> {
        match self.index.get(key) {
            Some(&offset) => self.read_at(offset).map(Some),
            None => Ok(None),
        }
    }

    /// Newest cell at `key`'s coordinates with timestamp <= `key.timestamp`
    ///
    /// Seeking with `LATEST_TIMESTAMP` returns the newest version.
    pub fn seek(&mut self, key: &CellKey) -> Result<Option<Cell>> {
        let found = self
            .index
            .range(key..)
            .next()
            .filter(|(candidate, _)| candidate.same_column(key))
            .map(|(_, &offset)| offset);

        match found {
            Some(offset) => self.read_at(offset).map(Some),
            None => Ok(None),
        }
    }

    /// All cells whose key falls in `range`, in key order
    pub fn scan<R: RangeBounds<CellKey>>(&mut self, range: R) -> Result<Vec<Cell>> {
        let bounds = (clone_bound(range.start_bound()), clone_bound(range.end_bound()));
        let offsets: Vec<u64> = self.index.range(bounds).map(|(_, &off)| off).collect();

        let mut cells = Vec::with_capacity(offsets.len());
        for offset in offsets {
            cells.push(self.read_at(offset)?);
        }
        Ok(cells)
    }

    /// Recompute the data block CRC and compare against the footer
    pub fn verify_checksum(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut remaining = self.index_offset - HEADER_SIZE;
        let mut hasher = crc32fast::Hasher::new();
        let mut buf = vec![0u8; 64 * 1024];

        while remaining > 0 {
            let chunk = remaining.min(buf.len() as u64) as usize;
            self.file.read_exact(&mut buf[..chunk])?;
            hasher.update(&buf[..chunk]);
            remaining -= chunk as u64;
        }

        let actual = hasher.finalize();
        if actual != self.data_crc {
            return Err(MobError::Corruption(format!(
                "Data CRC mismatch in {}: footer {:08x}, computed {:08x}",
                self.path.display(),
                self.data_crc,
                actual
            )));
        }
        Ok(())
    }

    fn read_at(&mut self, offset: u64) -> Result<Cell> {
        self.file.seek(SeekFrom::Start(offset))?;
        let (cell, _) = read_entry(&mut self.file, self.info.compression)?;
        Ok(cell)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_info(&self) -> &FileInfo {
        &self.info
    }

    pub fn entry_count(&self) -> u64 {
        self.index.len() as u64
    }

    /// Get the smallest key in this file (for range filtering)
    pub fn first_key(&self) -> Option<&CellKey> {
        self.index.keys().next()
    }

    /// Get the largest key in this file (for range filtering)
    pub fn last_key(&self) -> Option<&CellKey> {
        self.index.keys().next_back()
    }

    /// Create an iterator over all entries (for inspection, debugging)
    pub fn iter(&mut self) -> Result<CellFileIterator<'_>> {
        let compression = self.info.compression;
        CellFileIterator::new(&mut self.file, self.index_offset, compression)
    }
}

fn clone_bound(bound: Bound<&CellKey>) -> Bound<CellKey> {
    match bound {
        Bound::Included(k) => Bound::Included(k.clone()),
        Bound::Excluded(k) => Bound::Excluded(k.clone()),
        Bound::Unbounded => Bound::Unbounded,
    }
}
