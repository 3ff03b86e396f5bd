//! Configuration for AtlasMob
//!
//! Centralized configuration with sensible defaults, plus the per-family
//! descriptor that carries the MOB policy.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{MobError, Result};

/// Default MOB threshold: values larger than 100 KB are externalized
pub const DEFAULT_MOB_THRESHOLD: u64 = 100 * 1024;

/// Family property: "true"/"false", whether the family stores MOB values
pub const IS_MOB: &str = "IS_MOB";

/// Family property: externalization threshold in bytes
pub const MOB_THRESHOLD: &str = "MOB_THRESHOLD";

/// Family property: value compression for MOB files ("NONE" or "LZ4")
pub const MOB_COMPRESSION: &str = "MOB_COMPRESSION";

/// Main configuration for an AtlasMob instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── data/{family}/                     (store files)
    ///     ├── mobdir/{family}/{YYYYMMDD}/{file}  (committed MOB files)
    ///     ├── archive/{family}/{YYYYMMDD}/{file} (archived MOB files)
    ///     └── .tmp/{family}/                     (files being written)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // MemStore Configuration
    // -------------------------------------------------------------------------
    /// Max size of the memstore before an automatic flush (in bytes)
    pub memstore_flush_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./atlasmob_data"),
            memstore_flush_size: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl Config {
    const STORE_DIR: &'static str = "data";
    const MOB_DIR: &'static str = "mobdir";
    const ARCHIVE_DIR: &'static str = "archive";
    const TEMP_DIR: &'static str = ".tmp";

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Directory holding a family's store files
    pub fn store_dir(&self, family: &str) -> PathBuf {
        self.data_dir.join(Self::STORE_DIR).join(family)
    }

    /// `{root}/{family}` for committed MOB files
    pub fn mob_family_dir(&self, family: &str) -> PathBuf {
        self.data_dir.join(Self::MOB_DIR).join(family)
    }

    /// Archive location searched after the MOB family directory
    pub fn mob_archive_dir(&self, family: &str) -> PathBuf {
        self.data_dir.join(Self::ARCHIVE_DIR).join(family)
    }

    /// Write location for files not yet committed
    pub fn temp_dir(&self, family: &str) -> PathBuf {
        self.data_dir.join(Self::TEMP_DIR).join(family)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the memstore flush size (in bytes)
    pub fn memstore_flush_size(mut self, size: usize) -> Self {
        self.config.memstore_flush_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// =============================================================================
// Family Descriptor
// =============================================================================

/// Value compression applied inside MOB files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

impl Compression {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Compression::None),
            "LZ4" => Ok(Compression::Lz4),
            other => Err(MobError::Config(format!("Unknown compression: {}", other))),
        }
    }
}

/// Immutable description of a column family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyDescriptor {
    name: String,
    is_mob: bool,
    mob_threshold: u64,
    max_versions: usize,
    compression: Compression,
}

impl FamilyDescriptor {
    /// A non-MOB family keeping one version
    ///
    /// The name becomes a directory component, so it must be non-empty and
    /// free of path separators.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(MobError::Config(format!("Invalid family name: {:?}", name)));
        }
        Ok(Self {
            name,
            is_mob: false,
            mob_threshold: DEFAULT_MOB_THRESHOLD,
            max_versions: 1,
            compression: Compression::None,
        })
    }

    /// Build a descriptor from string properties (`IS_MOB`, `MOB_THRESHOLD`,
    /// `MOB_COMPRESSION`); absent properties keep their defaults
    pub fn from_properties(name: impl Into<String>, props: &HashMap<String, String>) -> Result<Self> {
        let mut descriptor = Self::new(name)?;

        if let Some(v) = props.get(IS_MOB) {
            descriptor.is_mob = v.trim().parse::<bool>().map_err(|_| {
                MobError::Config(format!("{} must be true or false, got {:?}", IS_MOB, v))
            })?;
        }
        if let Some(v) = props.get(MOB_THRESHOLD) {
            descriptor.mob_threshold = v.trim().parse::<u64>().map_err(|_| {
                MobError::Config(format!("{} must be a byte count, got {:?}", MOB_THRESHOLD, v))
            })?;
        }
        if let Some(v) = props.get(MOB_COMPRESSION) {
            descriptor.compression = Compression::parse(v.trim())?;
        }

        Ok(descriptor)
    }

    pub fn with_mob(mut self, is_mob: bool) -> Self {
        self.is_mob = is_mob;
        self
    }

    pub fn with_mob_threshold(mut self, threshold: u64) -> Self {
        self.mob_threshold = threshold;
        self
    }

    /// Versions returned per column by default scans (at least 1)
    pub fn with_max_versions(mut self, versions: usize) -> Self {
        self.max_versions = versions.max(1);
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_mob(&self) -> bool {
        self.is_mob
    }

    pub fn mob_threshold(&self) -> u64 {
        self.mob_threshold
    }

    pub fn max_versions(&self) -> usize {
        self.max_versions
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }
}
