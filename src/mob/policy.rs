//! MOB store policy
//!
//! Plugs MOB handling into a `Store`: on flush, values above the family
//! threshold go to a fresh MOB file and the store keeps reference cells; on
//! scan, references are resolved back into values.

use std::path::PathBuf;

use bytes::Bytes;
use chrono::Utc;

use crate::cell::Cell;
use crate::config::{Compression, Config, FamilyDescriptor};
use crate::error::Result;
use crate::store::{CellStream, PendingFile, PreparedFlush, Scan, StorePolicy};

use super::commit::commit_file;
use super::file::{self, MobFileWriter};
use super::reference::reference_cell;
use super::resolver::MobResolver;
use super::scanner::{MobScanner, ScanMode};
use super::threshold::{classify_cell, FamilyPolicy, Placement};

pub struct MobStorePolicy {
    family_policy: FamilyPolicy,
    compression: Compression,
    temp_dir: PathBuf,
    mob_family_dir: PathBuf,
    /// Digested into generated file names
    region_start_key: Bytes,
    resolver: MobResolver,
}

impl MobStorePolicy {
    pub fn new(config: &Config, family: &FamilyDescriptor) -> Self {
        Self {
            family_policy: FamilyPolicy::from_descriptor(family),
            compression: family.compression(),
            temp_dir: config.temp_dir(family.name()),
            mob_family_dir: config.mob_family_dir(family.name()),
            region_start_key: Bytes::new(),
            resolver: MobResolver::new(config, family.name()),
        }
    }

    pub fn with_region_start_key(mut self, start_key: impl Into<Bytes>) -> Self {
        self.region_start_key = start_key.into();
        self
    }

    pub fn resolver(&self) -> &MobResolver {
        &self.resolver
    }
}

impl StorePolicy for MobStorePolicy {
    fn name(&self) -> &'static str {
        "mob"
    }

    fn flush_cells(&self, snapshot: Vec<Cell>) -> Result<PreparedFlush> {
        let hint = snapshot.len();
        let mut writer: Option<MobFileWriter> = None;
        let mut cells = Vec::with_capacity(snapshot.len());

        for cell in snapshot {
            if classify_cell(&cell, &self.family_policy) == Placement::Inline {
                cells.push(cell);
                continue;
            }

            let w = match &mut writer {
                Some(w) => w,
                None => writer.insert(MobFileWriter::create(
                    &self.temp_dir,
                    Utc::now().date_naive(),
                    hint,
                    self.compression,
                    &self.region_start_key,
                )?),
            };
            w.append(&cell)?;
            let name = w.name().to_string();
            cells.push(reference_cell(&cell, w.partition_name(), &name));
        }

        let pending = match writer {
            Some(w) => {
                let target_path = file::target_path(&self.mob_family_dir, w.name());
                let externalized = w.entry_count();
                let temp_path = w.close()?;
                tracing::debug!(
                    file = %temp_path.display(),
                    cells = externalized,
                    "Externalized values into MOB file"
                );
                vec![PendingFile {
                    temp_path,
                    target_path,
                }]
            }
            None => Vec::new(),
        };

        Ok(PreparedFlush { cells, pending })
    }

    fn commit_flush(&self, pending: &[PendingFile]) -> Result<()> {
        for file in pending {
            commit_file(&file.temp_path, &file.target_path)?;
        }
        Ok(())
    }

    fn wrap_scan<'a>(&'a self, cells: CellStream<'a>, scan: &Scan) -> CellStream<'a> {
        Box::new(MobScanner::new(cells, &self.resolver, ScanMode::from_scan(scan)))
    }
}
