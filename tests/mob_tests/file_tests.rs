use std::fs;

use atlasmob::cell::LATEST_TIMESTAMP;
use atlasmob::mob::{file, open_mob_file, MobFileName, MobFileWriter};
use atlasmob::storage::{CellFileBuilder, FileKind};
use atlasmob::{Cell, CellKey, Compression, MobError};
use chrono::NaiveDate;
use tempfile::TempDir;

use crate::{setup_config, test_date, write_sealed, FAMILY};

fn temp_entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_sealed_file_is_named_after_its_partition() {
    let (_temp, config) = setup_config();
    let (name, sealed) = write_sealed(&config, &[Cell::new("r", FAMILY, "q", 1, "value")]);

    assert_eq!(name.partition_name(), "20240131");
    assert_eq!(sealed.file_name().unwrap().to_string_lossy(), name.to_string());

    // Only the sealed file remains; the partial name is gone
    assert_eq!(temp_entries(&config.temp_dir(FAMILY)), vec![name.to_string()]);
}

#[test]
fn test_sealed_file_reads_back() {
    let (_temp, config) = setup_config();
    let cells = vec![
        Cell::new("r1", FAMILY, "q", 2, "one"),
        Cell::new("r2", FAMILY, "q", 1, "two"),
    ];
    let (_, sealed) = write_sealed(&config, &cells);

    let mut reader = open_mob_file(&sealed).unwrap();
    assert_eq!(reader.entry_count(), 2);
    let cell = reader.seek(&CellKey::new("r2", FAMILY, "q", LATEST_TIMESTAMP)).unwrap().unwrap();
    assert_eq!(cell.value().as_ref(), b"two");
}

#[test]
fn test_unclosed_writer_leaves_nothing_behind() {
    let (_temp, config) = setup_config();
    let temp_dir = config.temp_dir(FAMILY);

    {
        let mut writer =
            MobFileWriter::create(&temp_dir, test_date(), 1, Compression::None, b"").unwrap();
        writer.append(&Cell::new("r", FAMILY, "q", 1, "v")).unwrap();
        assert_eq!(writer.entry_count(), 1);
    }

    assert!(temp_entries(&temp_dir).is_empty());
}

#[test]
fn test_out_of_order_append_discards_file() {
    let (_temp, config) = setup_config();
    let temp_dir = config.temp_dir(FAMILY);

    let mut writer = MobFileWriter::create(&temp_dir, test_date(), 2, Compression::None, b"").unwrap();
    writer.append(&Cell::new("b", FAMILY, "q", 1, "v")).unwrap();

    let err = writer.append(&Cell::new("a", FAMILY, "q", 1, "v")).unwrap_err();
    assert!(matches!(err, MobError::WriteOrderViolation(_)));
    assert!(temp_entries(&temp_dir).is_empty());

    assert!(writer.append(&Cell::new("c", FAMILY, "q", 1, "v")).is_err());
    assert!(matches!(writer.close(), Err(MobError::WriteOrderViolation(_))));
}

#[test]
fn test_lz4_mob_file_round_trips_values() {
    let (_temp, config) = setup_config();
    let temp_dir = config.temp_dir(FAMILY);
    let value = "abcdefgh".repeat(4096);

    let mut writer = MobFileWriter::create(&temp_dir, test_date(), 1, Compression::Lz4, b"").unwrap();
    writer.append(&Cell::new("r", FAMILY, "q", 1, value.clone())).unwrap();
    let sealed = writer.close().unwrap();

    let mut reader = open_mob_file(&sealed).unwrap();
    assert_eq!(reader.file_info().compression, Compression::Lz4);
    let cell = reader.get(&CellKey::new("r", FAMILY, "q", 1)).unwrap().unwrap();
    assert_eq!(cell.value().as_ref(), value.as_bytes());
}

#[test]
fn test_store_file_is_not_a_mob_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.cf");
    let builder = CellFileBuilder::create(&path, FileKind::Store, Compression::None, 0).unwrap();
    builder.finish().unwrap();

    assert!(matches!(open_mob_file(&path), Err(MobError::Corruption(_))));
}

// =============================================================================
// Naming
// =============================================================================

#[test]
fn test_generated_names_parse_back() {
    let name = MobFileName::generate(b"start", test_date());
    let text = name.to_string();

    assert_eq!(text.len(), 48);
    assert_eq!(&text[8..16], "20240131");
    assert_eq!(MobFileName::parse(&text).unwrap(), name);
    assert_eq!(name.date().unwrap(), test_date());
}

#[test]
fn test_generated_names_are_unique() {
    let a = MobFileName::generate(b"", test_date());
    let b = MobFileName::generate(b"", test_date());
    assert_eq!(a.start_key_digest(), b.start_key_digest());
    assert_ne!(a, b);
}

#[test]
fn test_malformed_names_are_rejected() {
    assert!(MobFileName::parse("short").is_err());
    let bad_date = format!("{:08x}20241340{:032x}", 0, 0);
    assert!(MobFileName::parse(&bad_date).is_err());
    let bad_hex = format!("zzzzzzzz20240131{:032x}", 0);
    assert!(MobFileName::parse(&bad_hex).is_err());
}

#[test]
fn test_partition_name_is_compact_date() {
    let date = NaiveDate::from_ymd_opt(2023, 7, 4).unwrap();
    assert_eq!(file::format_date(date), "20230704");
    assert_eq!(file::parse_date("20230704").unwrap(), date);
    assert!(file::parse_date("2023-07-04").is_err());
}
