//! Cell File Builder
//!
//! Writes sorted cells to a new cell file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::cell::{Cell, CellKey};
use crate::config::Compression;
use crate::error::{MobError, Result};

use super::{CellFile, FileInfo, FileKind, HEADER_SIZE, MAGIC, VERSION};

/// Builder for creating new cell files from sorted cells
pub struct CellFileBuilder {
    /// Output file path
    path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Current write position (for index)
    current_offset: u64,
    /// Index: key → file offset of entry
    index: Vec<(CellKey, u64)>,
    /// Track first/last keys for ordering and metadata
    first_key: Option<CellKey>,
    last_key: Option<CellKey>,
    /// Running CRC hasher for data section
    data_hasher: crc32fast::Hasher,
    /// Persisted in the meta block on finish
    info: FileInfo,
    /// Set once an append violated key order; the file can no longer finish
    poisoned: bool,
}

impl CellFileBuilder {
    /// Create a new cell file builder
    ///
    /// Writes header immediately; call `append()` in ascending key order,
    /// then `finish()` to write index, meta block and footer.
    /// `capacity_hint` pre-sizes the in-memory index.
    pub fn create(
        path: &Path,
        kind: FileKind,
        compression: Compression,
        capacity_hint: usize,
    ) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::new(file);

        // Write header (entry_count placeholder, will be updated in finish)
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&0u64.to_le_bytes())?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            current_offset: HEADER_SIZE,
            index: Vec::with_capacity(capacity_hint),
            first_key: None,
            last_key: None,
            data_hasher: crc32fast::Hasher::new(),
            info: FileInfo {
                kind,
                created_at_millis: chrono::Utc::now().timestamp_millis(),
                entry_count: 0,
                compression,
                region_start_key: Vec::new(),
                max_timestamp: 0,
            },
            poisoned: false,
        })
    }

    /// Record the start key of the region writing this file
    pub fn set_region_start_key(&mut self, start_key: &[u8]) {
        self.info.region_start_key = start_key.to_vec();
    }

    /// Append a cell; keys must be strictly ascending
    ///
    /// An out-of-order (or duplicate) key poisons the builder: the error is
    /// returned and every later `append`/`finish` fails too.
    pub fn append(&mut self, cell: &Cell) -> Result<()> {
        if self.poisoned {
            return Err(MobError::WriteOrderViolation(format!(
                "{} was abandoned after an out-of-order append",
                self.path.display()
            )));
        }

        if let Some(last) = &self.last_key {
            if cell.key() <= last {
                self.poisoned = true;
                return Err(MobError::WriteOrderViolation(format!(
                    "{:?} appended after {:?} in {}",
                    cell.key(),
                    last,
                    self.path.display()
                )));
            }
        }

        let stored = match self.info.compression {
            Compression::None => None,
            Compression::Lz4 => Some(lz4::block::compress(cell.value(), None, true)?),
        };
        let value: &[u8] = stored.as_deref().unwrap_or(&cell.value()[..]);

        // Entry: [row_len(4)][fam_len(4)][qual_len(4)][ts(8)][type(1)][val_len(8)]
        //        [row][family][qualifier][value]
        let mut header = Vec::with_capacity(super::ENTRY_HEADER_SIZE);
        header.extend_from_slice(&(cell.row().len() as u32).to_le_bytes());
        header.extend_from_slice(&(cell.family().len() as u32).to_le_bytes());
        header.extend_from_slice(&(cell.qualifier().len() as u32).to_le_bytes());
        header.extend_from_slice(&cell.timestamp().to_le_bytes());
        header.push(cell.cell_type() as u8);
        header.extend_from_slice(&(value.len() as u64).to_le_bytes());

        for chunk in [&header[..], cell.row(), cell.family(), cell.qualifier(), value] {
            self.writer.write_all(chunk)?;
            self.data_hasher.update(chunk);
        }

        // Record offset for index
        self.index.push((cell.key().clone(), self.current_offset));
        self.current_offset += (header.len()
            + cell.row().len()
            + cell.family().len()
            + cell.qualifier().len()
            + value.len()) as u64;

        if self.first_key.is_none() {
            self.first_key = Some(cell.key().clone());
        }
        self.last_key = Some(cell.key().clone());
        self.info.entry_count += 1;
        self.info.max_timestamp = self.info.max_timestamp.max(cell.timestamp());

        Ok(())
    }

    /// Number of cells appended so far
    pub fn entry_count(&self) -> u64 {
        self.info.entry_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Finish building: write index block, meta block, footer, and return metadata
    pub fn finish(mut self) -> Result<CellFile> {
        if self.poisoned {
            return Err(MobError::WriteOrderViolation(format!(
                "refusing to finish {} after an out-of-order append",
                self.path.display()
            )));
        }

        // Record where index block starts
        let index_offset = self.current_offset;

        // Write index block: [row_len(4)][fam_len(4)][qual_len(4)][ts(8)][offset(8)][coords]
        let mut index_len = 0u64;
        for (key, offset) in &self.index {
            self.writer.write_all(&(key.row.len() as u32).to_le_bytes())?;
            self.writer.write_all(&(key.family.len() as u32).to_le_bytes())?;
            self.writer.write_all(&(key.qualifier.len() as u32).to_le_bytes())?;
            self.writer.write_all(&key.timestamp.to_le_bytes())?;
            self.writer.write_all(&offset.to_le_bytes())?;
            self.writer.write_all(&key.row)?;
            self.writer.write_all(&key.family)?;
            self.writer.write_all(&key.qualifier)?;
            index_len += 28 + (key.row.len() + key.family.len() + key.qualifier.len()) as u64;
        }

        // Write meta block
        let meta_offset = index_offset + index_len;
        let meta = bincode::serialize(&self.info)?;
        self.writer.write_all(&(meta.len() as u32).to_le_bytes())?;
        self.writer.write_all(&meta)?;

        // Finalize CRC
        let data_crc = self.data_hasher.finalize();

        // Write footer: index_offset (8) + meta_offset (8) + data_crc (4) + padding (4)
        self.writer.write_all(&index_offset.to_le_bytes())?;
        self.writer.write_all(&meta_offset.to_le_bytes())?;
        self.writer.write_all(&data_crc.to_le_bytes())?;
        self.writer.write_all(&[0u8; 4])?;

        // Flush everything
        self.writer.flush()?;

        // Seek back and update entry count in header
        let mut file = self.writer.into_inner().map_err(|e| {
            MobError::Storage(format!("Failed to flush cell file: {}", e))
        })?;
        file.seek(SeekFrom::Start(6))?; // After magic + version
        file.write_all(&self.info.entry_count.to_le_bytes())?;
        file.sync_all()?;

        let file_size = file.metadata()?.len();

        Ok(CellFile {
            path: self.path,
            entry_count: self.info.entry_count,
            first_key: self.first_key,
            last_key: self.last_key,
            file_size,
        })
    }
}
