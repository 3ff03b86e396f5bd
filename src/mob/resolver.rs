//! Resolver
//!
//! Turns a reference cell back into the cell holding the real value.
//!
//! ## Steps
//! 1. Decode the reference from the cell value
//! 2. Look for `{partition}/{file}` in each location (MOB dir, then archive)
//! 3. Seek the file to the reference cell's coordinates
//! 4. Check the stored value is exactly `original_length` bytes
//! 5. Return the reference's coordinates with the real value
//!
//! Every call opens its own reader and drops it before returning, so
//! independent resolutions can run concurrently without coordination.

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::cell::{Cell, CellType};
use crate::config::Config;
use crate::error::{MobError, Result};

use super::file::open_mob_file;
use super::reference::{self, Reference};

/// Resolves reference cells of one family
#[derive(Debug, Clone)]
pub struct MobResolver {
    family: String,
    /// Searched in order
    locations: Vec<PathBuf>,
}

impl MobResolver {
    /// Resolver over the family's MOB directory and its archive
    pub fn new(config: &Config, family: &str) -> Self {
        Self::with_locations(
            family,
            vec![config.mob_family_dir(family), config.mob_archive_dir(family)],
        )
    }

    pub fn with_locations(family: impl Into<String>, locations: Vec<PathBuf>) -> Self {
        Self {
            family: family.into(),
            locations,
        }
    }

    pub fn locations(&self) -> &[PathBuf] {
        &self.locations
    }

    /// Resolve `reference_cell` into a cell carrying the real value
    ///
    /// A missing file or entry is `TargetNotFound`, unless
    /// `return_empty_on_miss` is set, in which case the reference's
    /// coordinates come back with an empty value. Decode failures, corrupt
    /// files and other I/O errors always fail.
    pub fn resolve(&self, reference_cell: &Cell, return_empty_on_miss: bool) -> Result<Cell> {
        let reference = reference::decode(reference_cell.value())?;

        match self.read_value(reference_cell, &reference) {
            Ok(value) => Ok(reference_cell.replace_value(CellType::Put, value)),
            Err(e) if return_empty_on_miss && e.is_not_found() => {
                tracing::warn!(
                    family = %self.family,
                    key = ?reference_cell.key(),
                    path = %reference.relative_path().display(),
                    error = %e,
                    "MOB target missing, returning empty value"
                );
                Ok(reference_cell.replace_value(CellType::Put, Bytes::new()))
            }
            Err(e) => Err(e),
        }
    }

    fn read_value(&self, reference_cell: &Cell, reference: &Reference) -> Result<Bytes> {
        let relative = reference.relative_path();

        for location in &self.locations {
            let path = location.join(&relative);
            match Self::read_from(&path, reference_cell, reference) {
                // The file may have moved to the next location meanwhile
                Err(MobError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => continue,
                other => return other,
            }
        }

        Err(MobError::TargetNotFound(format!(
            "MOB file {} not found in family {}",
            relative.display(),
            self.family
        )))
    }

    fn read_from(path: &Path, reference_cell: &Cell, reference: &Reference) -> Result<Bytes> {
        let mut reader = open_mob_file(path)?;

        // MOB cells keep the exact key of the cell they were moved out of
        let cell = reader.get(reference_cell.key())?.ok_or_else(|| {
            MobError::TargetNotFound(format!(
                "No cell for {:?} in MOB file {}",
                reference_cell.key(),
                path.display()
            ))
        })?;

        if cell.value_len() as u64 != reference.original_length {
            return Err(MobError::Corruption(format!(
                "Reference expects {} bytes for {:?}, {} holds {}",
                reference.original_length,
                reference_cell.key(),
                path.display(),
                cell.value_len()
            )));
        }

        let (_, _, value) = cell.into_parts();
        Ok(value)
    }
}
