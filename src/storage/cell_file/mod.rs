//! Cell File Module
//!
//! Builder, reader and iterator for the sorted cell file format described in
//! the parent module.

mod builder;
mod iterator;
mod reader;

use std::io::Read;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellKey, CellType};
use crate::config::Compression;
use crate::error::{MobError, Result};

pub use builder::CellFileBuilder;
pub use iterator::CellFileIterator;
pub use reader::CellFileReader;

// =============================================================================
// Shared Constants (used by builder, reader, iterator)
// =============================================================================

/// Magic bytes identifying an AtlasMob cell file
pub(crate) const MAGIC: &[u8; 4] = b"ATCF";

/// Current cell file format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + EntryCount (8) = 14 bytes
pub(crate) const HEADER_SIZE: u64 = 14;

/// Footer size: IndexOffset (8) + MetaOffset (8) + DataCRC (4) + Padding (4)
pub(crate) const FOOTER_SIZE: u64 = 24;

/// Entry header: RowLen (4) + FamLen (4) + QualLen (4) + Ts (8) + Type (1) + ValLen (8)
pub(crate) const ENTRY_HEADER_SIZE: usize = 29;

// =============================================================================
// File Metadata
// =============================================================================

/// What a cell file is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// A flushed store file (may hold MOB references)
    Store,
    /// A MOB file holding externalized values
    Mob,
}

/// Metadata persisted in the meta block of every cell file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub kind: FileKind,
    /// Unix millis when the builder was created
    pub created_at_millis: i64,
    pub entry_count: u64,
    pub compression: Compression,
    /// Start key of the region that wrote the file (empty if unknown)
    pub region_start_key: Vec<u8>,
    /// Largest cell timestamp in the file (0 when empty)
    pub max_timestamp: u64,
}

/// Cell file metadata returned by `CellFileBuilder::finish`
#[derive(Debug, Clone)]
pub struct CellFile {
    /// Path to the cell file
    pub path: PathBuf,
    /// Number of cells in this file
    pub entry_count: u64,
    /// Smallest key (for range filtering)
    pub first_key: Option<CellKey>,
    /// Largest key (for range filtering)
    pub last_key: Option<CellKey>,
    /// File size in bytes
    pub file_size: u64,
}

impl CellFile {
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}

// =============================================================================
// Entry Decoding (shared by reader and iterator)
// =============================================================================

/// Read one data entry; returns the cell and the number of bytes consumed
pub(crate) fn read_entry<R: Read>(reader: &mut R, compression: Compression) -> Result<(Cell, u64)> {
    let mut header = [0u8; ENTRY_HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let row_len = u32_at(&header, 0) as usize;
    let fam_len = u32_at(&header, 4) as usize;
    let qual_len = u32_at(&header, 8) as usize;
    let timestamp = u64_at(&header, 12);
    let type_tag = header[20];
    let val_len = u64_at(&header, 21);

    let cell_type = CellType::from_u8(type_tag)
        .ok_or_else(|| MobError::Corruption(format!("Unknown cell type tag: {}", type_tag)))?;

    let mut coords = vec![0u8; row_len + fam_len + qual_len];
    reader.read_exact(&mut coords)?;
    let coords = Bytes::from(coords);

    let stored_len = usize::try_from(val_len)
        .map_err(|_| MobError::Corruption(format!("Value length {} overflows", val_len)))?;
    let mut stored = vec![0u8; stored_len];
    reader.read_exact(&mut stored)?;

    let value = match compression {
        Compression::None => Bytes::from(stored),
        Compression::Lz4 => Bytes::from(lz4::block::decompress(&stored, None).map_err(|e| {
            MobError::Corruption(format!("LZ4 block failed to decompress: {}", e))
        })?),
    };

    let key = CellKey {
        row: coords.slice(0..row_len),
        family: coords.slice(row_len..row_len + fam_len),
        qualifier: coords.slice(row_len + fam_len..),
        timestamp,
    };

    let consumed = ENTRY_HEADER_SIZE as u64 + coords.len() as u64 + val_len;
    Ok((Cell::with_type(key, cell_type, value), consumed))
}

pub(crate) fn u32_at(buf: &[u8], pos: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[pos..pos + 4]);
    u32::from_le_bytes(raw)
}

pub(crate) fn u64_at(buf: &[u8], pos: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[pos..pos + 8]);
    u64::from_le_bytes(raw)
}
