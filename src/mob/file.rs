//! MOB File
//!
//! Append-only sorted cell files holding externalized values.
//!
//! ## Naming
//! ```text
//!   {crc32(start_key):08x}{YYYYMMDD}{random:032x}      e.g.
//!   1c291ca3 20240131 5f0c8a1e9b7d4c2a8e6f1b3d5a7c9e0f
//! ```
//! The date part doubles as the partition directory, so a reference's
//! `partition/file` path can be rebuilt from the name alone.
//!
//! ## Lifecycle
//! ```text
//!   create()  → {temp}/{name}.partial   (invisible, appends go here)
//!   close()   → {temp}/{name}           (sealed, immutable)
//!   commit    → {mob_root}/{family}/{YYYYMMDD}/{name}
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::cell::Cell;
use crate::config::Compression;
use crate::error::{MobError, Result};
use crate::storage::{CellFileBuilder, CellFileReader, FileKind};

/// Partition date format
pub const DATE_FORMAT: &str = "%Y%m%d";

const PARTIAL_SUFFIX: &str = "partial";
const DIGEST_LEN: usize = 8;
const DATE_LEN: usize = 8;
const ID_LEN: usize = 32;

/// Partition name for a creation date
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(partition_name: &str) -> Result<NaiveDate> {
    if partition_name.len() != DATE_LEN {
        return Err(MobError::Encoding(format!(
            "Partition {:?} is not a YYYYMMDD date",
            partition_name
        )));
    }
    NaiveDate::parse_from_str(partition_name, DATE_FORMAT).map_err(|e| {
        MobError::Encoding(format!("Partition {:?} is not a date: {}", partition_name, e))
    })
}

/// Target location of a committed MOB file
pub fn target_path(mob_family_dir: &Path, name: &MobFileName) -> PathBuf {
    mob_family_dir.join(name.partition_name()).join(name.to_string())
}

// =============================================================================
// File Name
// =============================================================================

/// Generated, collision-free MOB file name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MobFileName {
    start_key_digest: String,
    date: String,
    id: String,
}

impl MobFileName {
    /// New name for a file written by the region starting at `start_key`
    pub fn generate(start_key: &[u8], date: NaiveDate) -> Self {
        Self {
            start_key_digest: format!("{:08x}", crc32fast::hash(start_key)),
            date: format_date(date),
            id: format!("{:032x}", rand::random::<u128>()),
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        if name.len() != DIGEST_LEN + DATE_LEN + ID_LEN || !name.is_ascii() {
            return Err(MobError::Encoding(format!("{:?} is not a MOB file name", name)));
        }

        let (digest, rest) = name.split_at(DIGEST_LEN);
        let (date, id) = rest.split_at(DATE_LEN);
        let is_hex = |s: &str| s.bytes().all(|b| b.is_ascii_hexdigit());
        if !is_hex(digest) || !is_hex(id) {
            return Err(MobError::Encoding(format!("{:?} is not a MOB file name", name)));
        }
        parse_date(date)?;

        Ok(Self {
            start_key_digest: digest.to_string(),
            date: date.to_string(),
            id: id.to_string(),
        })
    }

    /// The `YYYYMMDD` partition this file belongs to
    pub fn partition_name(&self) -> &str {
        &self.date
    }

    pub fn date(&self) -> Result<NaiveDate> {
        parse_date(&self.date)
    }

    pub fn start_key_digest(&self) -> &str {
        &self.start_key_digest
    }
}

impl fmt::Display for MobFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.start_key_digest, self.date, self.id)
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Single-owner writer for one MOB file
///
/// Dropping a writer that was never closed removes its partial file.
pub struct MobFileWriter {
    builder: Option<CellFileBuilder>,
    name: MobFileName,
    partial_path: PathBuf,
    sealed_path: PathBuf,
}

impl MobFileWriter {
    /// Start a MOB file in `temp_dir`
    ///
    /// `max_cell_count_hint` pre-sizes the index; `region_start_key` is
    /// digested into the name and kept in the file info.
    pub fn create(
        temp_dir: &Path,
        creation_date: NaiveDate,
        max_cell_count_hint: usize,
        compression: Compression,
        region_start_key: &[u8],
    ) -> Result<Self> {
        fs::create_dir_all(temp_dir)?;

        let name = MobFileName::generate(region_start_key, creation_date);
        let sealed_path = temp_dir.join(name.to_string());
        let partial_path = sealed_path.with_extension(PARTIAL_SUFFIX);

        let mut builder =
            CellFileBuilder::create(&partial_path, FileKind::Mob, compression, max_cell_count_hint)?;
        builder.set_region_start_key(region_start_key);

        tracing::debug!(file = %name, dir = %temp_dir.display(), "Created MOB file writer");

        Ok(Self {
            builder: Some(builder),
            name,
            partial_path,
            sealed_path,
        })
    }

    /// Append a full cell; keys must be strictly ascending
    ///
    /// An out-of-order append discards the file immediately and fails every
    /// later call.
    pub fn append(&mut self, cell: &Cell) -> Result<()> {
        let builder = self.builder.as_mut().ok_or_else(|| {
            MobError::WriteOrderViolation(format!("MOB file {} was discarded", self.name))
        })?;

        if let Err(e) = builder.append(cell) {
            if matches!(e, MobError::WriteOrderViolation(_)) {
                tracing::error!(file = %self.name, error = %e, "Discarding misordered MOB file");
                self.discard();
            }
            return Err(e);
        }
        Ok(())
    }

    /// Seal the file and return its path in the temp directory
    pub fn close(mut self) -> Result<PathBuf> {
        let builder = self.builder.take().ok_or_else(|| {
            MobError::WriteOrderViolation(format!("MOB file {} was discarded", self.name))
        })?;

        let sealed = builder.finish().and_then(|meta| {
            fs::rename(&self.partial_path, &self.sealed_path)?;
            Ok(meta)
        });

        match sealed {
            Ok(meta) => {
                tracing::debug!(
                    file = %self.name,
                    cells = meta.entry_count,
                    bytes = meta.file_size,
                    "Sealed MOB file"
                );
                Ok(self.sealed_path.clone())
            }
            Err(e) => {
                let _ = fs::remove_file(&self.partial_path);
                Err(e)
            }
        }
    }

    pub fn name(&self) -> &MobFileName {
        &self.name
    }

    pub fn partition_name(&self) -> &str {
        self.name.partition_name()
    }

    /// Cells appended so far
    pub fn entry_count(&self) -> u64 {
        self.builder.as_ref().map_or(0, |b| b.entry_count())
    }

    fn discard(&mut self) {
        if self.builder.take().is_some() {
            if let Err(e) = fs::remove_file(&self.partial_path) {
                tracing::warn!(path = %self.partial_path.display(), error = %e, "Failed to remove partial MOB file");
            }
        }
    }
}

impl Drop for MobFileWriter {
    fn drop(&mut self) {
        self.discard();
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Open a committed (or sealed) MOB file for reading
pub fn open_mob_file(path: &Path) -> Result<CellFileReader> {
    let reader = CellFileReader::open(path)?;
    if reader.file_info().kind != FileKind::Mob {
        return Err(MobError::Corruption(format!(
            "{} is a {:?} file, not a MOB file",
            path.display(),
            reader.file_info().kind
        )));
    }
    Ok(reader)
}
