//! Store
//!
//! One column family's store. The write path, flush pipeline and scan path
//! are generic; everything MOB-specific comes in through the injected
//! `StorePolicy`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cell::Cell;
use crate::config::{Config, FamilyDescriptor};
use crate::error::{MobError, Result};
use crate::mob::MobStorePolicy;
use crate::storage::CellFile;

use super::flush::StoreFlushContext;
use super::policy::{DefaultStorePolicy, StorePolicy};
use super::scan::{CellStream, Scan, StoreScanner};
use super::state::StoreState;

/// A column family store with a pluggable storage policy
///
/// ## Concurrency:
/// - Writes and scans take `&self` and may run concurrently
/// - Flushes are serialized by `flush_lock`
pub struct Store {
    family: FamilyDescriptor,
    config: Config,
    temp_dir: PathBuf,
    state: StoreState,
    policy: Arc<dyn StorePolicy>,
    flush_lock: Mutex<()>,
}

impl Store {
    /// Open the store with an explicit policy
    pub fn open(config: Config, family: FamilyDescriptor, policy: Arc<dyn StorePolicy>) -> Result<Self> {
        let state = StoreState::open(&config.store_dir(family.name()))?;
        let temp_dir = config.temp_dir(family.name());

        tracing::info!(
            family = %family.name(),
            policy = policy.name(),
            files = state.file_count(),
            "Opened store"
        );

        Ok(Self {
            family,
            config,
            temp_dir,
            state,
            policy,
            flush_lock: Mutex::new(()),
        })
    }

    /// Open the store with the policy the family asks for
    pub fn open_for_family(config: Config, family: FamilyDescriptor) -> Result<Self> {
        let policy: Arc<dyn StorePolicy> = if family.is_mob() {
            Arc::new(MobStorePolicy::new(&config, &family))
        } else {
            Arc::new(DefaultStorePolicy)
        };
        Self::open(config, family, policy)
    }

    /// Add a cell to the memstore, flushing once it grows past the limit
    pub fn add(&self, cell: Cell) -> Result<()> {
        if cell.family() != self.family.name().as_bytes() {
            return Err(MobError::Storage(format!(
                "Cell of family {:?} added to store {:?}",
                String::from_utf8_lossy(cell.family()),
                self.family.name()
            )));
        }

        let size = self.state.add(cell);
        if size >= self.config.memstore_flush_size {
            tracing::debug!(family = %self.family.name(), size, "Memstore full, flushing");
            self.flush()?;
        }
        Ok(())
    }

    /// Freeze the memstore without flushing it
    pub fn snapshot(&self) -> bool {
        self.state.snapshot()
    }

    /// Begin a flush; blocks while another flush is in progress
    pub fn create_flush_context(&self) -> StoreFlushContext<'_> {
        StoreFlushContext::new(self, self.flush_lock.lock())
    }

    /// Snapshot, write and commit in one go
    pub fn flush(&self) -> Result<Option<CellFile>> {
        let mut ctx = self.create_flush_context();
        ctx.prepare()?;
        ctx.flush_cache()?;
        ctx.commit()
    }

    /// Stream the cells a scan selects, in key order
    pub fn scanner(&self, scan: &Scan) -> Result<CellStream<'_>> {
        let sources = self.state.scan_sources(scan.key_range())?;
        let max_versions = scan.max_versions_or(self.family.max_versions());
        let merged: CellStream<'_> = Box::new(StoreScanner::new(sources, scan.clone(), max_versions));
        Ok(self.policy.wrap_scan(merged, scan))
    }

    /// Collect a scan's cells
    pub fn get(&self, scan: &Scan) -> Result<Vec<Cell>> {
        self.scanner(scan)?.collect()
    }

    pub fn family(&self) -> &FamilyDescriptor {
        &self.family
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn storefile_count(&self) -> usize {
        self.state.file_count()
    }

    /// Cells in the active memstore segment
    pub fn memstore_cell_count(&self) -> usize {
        self.state.memstore().cell_count()
    }

    pub fn snapshot_cell_count(&self) -> usize {
        self.state.memstore().snapshot_cell_count()
    }

    pub fn memstore_size(&self) -> usize {
        self.state.memstore().size()
    }

    pub fn store_dir(&self) -> &Path {
        self.state.dir()
    }

    pub(super) fn state(&self) -> &StoreState {
        &self.state
    }

    pub(super) fn policy(&self) -> &dyn StorePolicy {
        self.policy.as_ref()
    }

    pub(super) fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }
}
