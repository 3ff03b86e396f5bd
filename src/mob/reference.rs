//! Reference Codec
//!
//! The value written to the store in place of an externalized value.
//!
//! ## Layout
//! ```text
//! ┌──────────────────────┬─────────────────────────────────────┐
//! │ OriginalLen u64 (BE) │ UTF-8 "{partitionName}/{fileName}"  │
//! └──────────────────────┴─────────────────────────────────────┘
//! ```
//!
//! A reference cell is also tagged `CellType::MobReference`. The tag, not
//! the shape of the value, is what marks a cell as a reference: an inline
//! value that happens to start with eight bytes and a slash is never
//! resolved.

use std::path::PathBuf;

use bytes::{BufMut, Bytes, BytesMut};

use crate::cell::{Cell, CellType};
use crate::error::{MobError, Result};

/// Size of the big-endian length prefix
pub const LENGTH_PREFIX_SIZE: usize = 8;

/// Decoded form of a reference value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Exact byte length of the externalized value
    pub original_length: u64,
    /// Date partition directory (`YYYYMMDD`)
    pub partition_name: String,
    /// MOB file inside the partition
    pub file_name: String,
}

impl Reference {
    pub fn new(
        original_length: u64,
        partition_name: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            original_length,
            partition_name: partition_name.into(),
            file_name: file_name.into(),
        }
    }

    pub fn encode(&self) -> Bytes {
        encode(self.original_length, &self.partition_name, &self.file_name)
    }

    /// `{partition}/{file}`, relative to a family's MOB directory
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.partition_name).join(&self.file_name)
    }
}

/// Encode a reference value
pub fn encode(original_length: u64, partition_name: &str, file_name: &str) -> Bytes {
    let mut buf =
        BytesMut::with_capacity(LENGTH_PREFIX_SIZE + partition_name.len() + 1 + file_name.len());
    buf.put_u64(original_length);
    buf.put_slice(partition_name.as_bytes());
    buf.put_u8(b'/');
    buf.put_slice(file_name.as_bytes());
    buf.freeze()
}

/// Decode a reference value
///
/// Fails when the value is shorter than the length prefix, the path is not
/// UTF-8, or the path is not exactly `partition/file` with two plain,
/// non-empty components.
pub fn decode(bytes: &[u8]) -> Result<Reference> {
    if bytes.len() < LENGTH_PREFIX_SIZE {
        return Err(MobError::Encoding(format!(
            "Reference needs at least {} bytes, got {}",
            LENGTH_PREFIX_SIZE,
            bytes.len()
        )));
    }

    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    prefix.copy_from_slice(&bytes[..LENGTH_PREFIX_SIZE]);
    let original_length = u64::from_be_bytes(prefix);

    let path = std::str::from_utf8(&bytes[LENGTH_PREFIX_SIZE..])
        .map_err(|e| MobError::Encoding(format!("Reference path is not UTF-8: {}", e)))?;

    let (partition_name, file_name) = path
        .split_once('/')
        .ok_or_else(|| MobError::Encoding(format!("Reference path {:?} has no partition", path)))?;

    for component in [partition_name, file_name] {
        if !is_plain_component(component) {
            return Err(MobError::Encoding(format!(
                "Reference path {:?} has an invalid component {:?}",
                path, component
            )));
        }
    }

    Ok(Reference::new(original_length, partition_name, file_name))
}

fn is_plain_component(component: &str) -> bool {
    !component.is_empty()
        && component != "."
        && component != ".."
        && !component.contains(['/', '\\'])
}

/// Whether `cell` holds a MOB reference
///
/// Decided by the cell's type tag alone. A tagged cell whose value does not
/// decode is still a reference; resolving it fails with `Encoding` rather
/// than handing the raw bytes back as if they were the value.
pub fn is_reference(cell: &Cell) -> bool {
    cell.cell_type() == CellType::MobReference
}

/// Build the reference cell that replaces `cell` in the store
pub fn reference_cell(cell: &Cell, partition_name: &str, file_name: &str) -> Cell {
    let value = encode(cell.value_len() as u64, partition_name, file_name);
    cell.replace_value(CellType::MobReference, value)
}
