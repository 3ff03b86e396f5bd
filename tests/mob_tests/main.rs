//! MOB layer tests
//!
//! These tests verify:
//! - Reference encoding and the threshold gate
//! - MOB file naming, sealing and discard
//! - Atomic, retry-safe commit into partitions
//! - Reference resolution (MOB dir, archive, misses, corruption)
//! - The resolving scan adapter

mod file_tests;

use std::path::PathBuf;

use atlasmob::mob::{commit_file, file, MobFileName, MobFileWriter};
use atlasmob::{Cell, Compression, Config};
use chrono::NaiveDate;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

pub const FAMILY: &str = "family";

pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
}

pub fn setup_config() -> (TempDir, Config) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    (temp_dir, config)
}

/// Write `cells` (in key order) into a sealed MOB file in the temp directory
pub fn write_sealed(config: &Config, cells: &[Cell]) -> (MobFileName, PathBuf) {
    let mut writer = MobFileWriter::create(
        &config.temp_dir(FAMILY),
        test_date(),
        cells.len(),
        Compression::None,
        b"",
    )
    .unwrap();
    for cell in cells {
        writer.append(cell).unwrap();
    }
    let name = writer.name().clone();
    let sealed = writer.close().unwrap();
    (name, sealed)
}

/// Write and commit a MOB file into the family's MOB directory
pub fn write_committed(config: &Config, cells: &[Cell]) -> MobFileName {
    let (name, sealed) = write_sealed(config, cells);
    commit_file(&sealed, &file::target_path(&config.mob_family_dir(FAMILY), &name)).unwrap();
    name
}
