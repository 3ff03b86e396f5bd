use std::fs;

use atlasmob::cell::LATEST_TIMESTAMP;
use atlasmob::mob::{file::MobFileName, is_reference, reference, MobResolver};
use atlasmob::store::{bool_attribute, MOB_SCAN_RAW};
use atlasmob::{Cell, CellKey, CellType, Config, FamilyDescriptor, MobError, Result, Scan, Store};

use crate::{cells, mob_files, open_mob_store, setup_config, FAMILY, ROW, VALUE};

fn get_qf135(store: &Store, scan: Scan) -> Vec<Cell> {
    store
        .get(&scan.add_column("qf1").add_column("qf3").add_column("qf5"))
        .unwrap()
}

// =============================================================================
// Reads
// =============================================================================

#[test]
fn test_get_from_memstore() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);

    for cell in cells(6, 1) {
        store.add(cell).unwrap();
    }

    let results = get_qf135(&store, Scan::for_row(ROW));
    let qualifiers: Vec<&[u8]> = results.iter().map(|c| c.qualifier()).collect();
    assert_eq!(qualifiers, vec![&b"qf1"[..], &b"qf3"[..], &b"qf5"[..]]);
    for cell in &results {
        assert_eq!(cell.value().as_ref(), VALUE.as_bytes());
        assert!(!is_reference(cell));
    }
}

#[test]
fn test_get_from_files() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);

    // One flush per cell
    for (i, cell) in cells(6, 1).into_iter().enumerate() {
        store.add(cell).unwrap();
        store.flush().unwrap();
        assert_eq!(store.storefile_count(), i + 1);
        assert_eq!(store.snapshot_cell_count(), 0);
    }
    assert_eq!(store.memstore_cell_count(), 0);
    assert_eq!(mob_files(&config).len(), 6);

    let results = get_qf135(&store, Scan::for_row(ROW));
    assert_eq!(results.len(), 3);
    for cell in &results {
        assert_eq!(cell.value().as_ref(), VALUE.as_bytes());
        assert_eq!(cell.cell_type(), CellType::Put);
    }
}

#[test]
fn test_get_references_from_files() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);

    for cell in cells(3, 1) {
        store.add(cell).unwrap();
    }
    store.flush().unwrap();

    let raw = Scan::for_row(ROW).set_attribute(MOB_SCAN_RAW, bool_attribute(true));
    let results = store.get(&raw).unwrap();
    assert_eq!(results.len(), 3);

    let committed = mob_files(&config);
    assert_eq!(committed.len(), 1);
    let file_name = committed[0].file_name().unwrap().to_string_lossy().into_owned();

    for cell in &results {
        assert!(is_reference(cell));
        let decoded = reference::decode(cell.value()).unwrap();
        assert_eq!(decoded.original_length, VALUE.len() as u64);
        assert_eq!(decoded.file_name, file_name);
        assert_eq!(
            decoded.partition_name,
            MobFileName::parse(&file_name).unwrap().partition_name()
        );
    }
}

#[test]
fn test_get_from_memstore_and_files() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);

    let all = cells(3, 1);
    store.add(all[0].clone()).unwrap();
    store.flush().unwrap();
    store.add(all[1].clone()).unwrap();
    store.flush().unwrap();
    store.add(all[2].clone()).unwrap();

    assert_eq!(store.storefile_count(), 2);
    assert_eq!(store.memstore_cell_count(), 1);

    let results = store.get(&Scan::for_row(ROW)).unwrap();
    assert_eq!(results, all);
}

#[test]
fn test_values_at_or_below_threshold_stay_inline() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 100);

    for cell in cells(3, 1) {
        store.add(cell).unwrap();
    }
    store.flush().unwrap();

    let raw = store.get(&Scan::for_row(ROW).raw_mob(true)).unwrap();
    assert_eq!(raw.len(), 3);
    assert!(raw.iter().all(|c| !is_reference(c)));
    assert!(mob_files(&config).is_empty());
}

#[test]
fn test_value_exactly_at_threshold_is_inline() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, VALUE.len() as u64);

    store.add(Cell::new(ROW, FAMILY, "exact", 1, VALUE)).unwrap();
    store.add(Cell::new(ROW, FAMILY, "over", 1, "value!")).unwrap();
    store.flush().unwrap();

    let raw = store.get(&Scan::for_row(ROW).raw_mob(true)).unwrap();
    let exact = raw.iter().find(|c| c.qualifier() == b"exact").unwrap();
    let over = raw.iter().find(|c| c.qualifier() == b"over").unwrap();
    assert!(!is_reference(exact));
    assert!(is_reference(over));
}

#[test]
fn test_non_mob_family_never_externalizes() {
    let (_temp, config) = setup_config();
    let family = FamilyDescriptor::new(FAMILY).unwrap().with_mob_threshold(1);
    let store = Store::open_for_family(config.clone(), family).unwrap();
    assert_eq!(store.policy_name(), "default");

    store.add(Cell::new(ROW, FAMILY, "q", 1, vec![7u8; 4096])).unwrap();
    store.flush().unwrap();

    let raw = store.get(&Scan::for_row(ROW).raw_mob(true)).unwrap();
    assert_eq!(raw[0].value_len(), 4096);
    assert!(!is_reference(&raw[0]));
    assert!(!config.mob_family_dir(FAMILY).exists());
}

#[test]
fn test_all_versions_resolve() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);

    for ts in 1..=3 {
        store.add(Cell::new(ROW, FAMILY, "qf1", ts, format!("value{}", ts))).unwrap();
        store.flush().unwrap();
    }

    let latest = store.get(&Scan::for_row(ROW)).unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].value().as_ref(), b"value3");

    let all = store.get(&Scan::for_row(ROW).all_versions()).unwrap();
    let values: Vec<&[u8]> = all.iter().map(|c| c.value().as_ref()).collect();
    assert_eq!(values, vec![&b"value3"[..], &b"value2"[..], &b"value1"[..]]);
}

#[test]
fn test_newer_memstore_cell_shadows_flushed_version() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);

    store.add(Cell::new(ROW, FAMILY, "qf1", 5, "flushed")).unwrap();
    store.flush().unwrap();
    store.add(Cell::new(ROW, FAMILY, "qf1", 5, "rewritten")).unwrap();

    let results = store.get(&Scan::for_row(ROW)).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].value().as_ref(), b"rewritten");
}

#[test]
fn test_scan_across_rows() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);

    for row in ["a", "b", "c", "d"] {
        store.add(Cell::new(row, FAMILY, "q", 1, format!("{}-value", row))).unwrap();
    }
    store.flush().unwrap();

    let scan = Scan::new().with_start_row("b").with_stop_row("d");
    let rows: Vec<Vec<u8>> = store
        .scanner(&scan)
        .unwrap()
        .map(|c| c.map(|c| c.row().to_vec()))
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(rows, vec![b"b".to_vec(), b"c".to_vec()]);
}

// =============================================================================
// Resolution
// =============================================================================

#[test]
fn test_committed_file_resolves_reference() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);

    for cell in cells(3, 1) {
        store.add(cell).unwrap();
    }
    store.flush().unwrap();

    let references = store.get(&Scan::for_row(ROW).raw_mob(true)).unwrap();
    let resolver = MobResolver::new(&config, FAMILY);

    for reference in &references {
        let resolved = resolver.resolve(reference, false).unwrap();
        assert_eq!(resolved.key(), reference.key());
        assert_eq!(resolved.value().as_ref(), VALUE.as_bytes());
    }

    // Partition directory is the flush date
    let decoded = reference::decode(references[0].value()).unwrap();
    let partition = config.mob_family_dir(FAMILY).join(&decoded.partition_name);
    assert!(partition.join(&decoded.file_name).is_file());

    // Seeking with the latest timestamp finds the same cell
    let mut reader = atlasmob::mob::open_mob_file(&partition.join(&decoded.file_name)).unwrap();
    let seek_key = CellKey::new(ROW, FAMILY, "qf1", LATEST_TIMESTAMP);
    let found = reader.seek(&seek_key).unwrap().unwrap();
    assert_eq!(found.value().as_ref(), VALUE.as_bytes());
}

#[test]
fn test_missing_mob_file_strict_and_lenient() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);

    store.add(Cell::new(ROW, FAMILY, "qf1", 1, VALUE)).unwrap();
    store.flush().unwrap();

    fs::remove_dir_all(config.mob_family_dir(FAMILY)).unwrap();

    let err = store.get(&Scan::for_row(ROW)).unwrap_err();
    assert!(matches!(err, MobError::TargetNotFound(_)));

    let lenient = store.get(&Scan::for_row(ROW).empty_value_on_miss(true)).unwrap();
    assert_eq!(lenient.len(), 1);
    assert_eq!(lenient[0].qualifier(), b"qf1");
    assert!(lenient[0].value().is_empty());

    // Raw scans never touch MOB files
    let raw = store.get(&Scan::for_row(ROW).raw_mob(true)).unwrap();
    assert!(is_reference(&raw[0]));
}

#[test]
fn test_archived_mob_file_still_resolves() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);

    store.add(Cell::new(ROW, FAMILY, "qf1", 1, VALUE)).unwrap();
    store.flush().unwrap();

    let archive = config.mob_archive_dir(FAMILY);
    fs::create_dir_all(archive.parent().unwrap()).unwrap();
    fs::rename(config.mob_family_dir(FAMILY), &archive).unwrap();

    let results = store.get(&Scan::for_row(ROW)).unwrap();
    assert_eq!(results[0].value().as_ref(), VALUE.as_bytes());
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_reopen_discovers_store_files() {
    let (_temp, config) = setup_config();

    {
        let store = open_mob_store(&config, 3);
        for cell in cells(3, 1) {
            store.add(cell).unwrap();
            store.flush().unwrap();
        }
    }

    let store = open_mob_store(&config, 3);
    assert_eq!(store.storefile_count(), 3);

    let results = store.get(&Scan::for_row(ROW)).unwrap();
    assert_eq!(results, cells(3, 1));

    // New files continue the id sequence
    store.add(Cell::new(ROW, FAMILY, "qf9", 1, VALUE)).unwrap();
    let flushed = store.flush().unwrap().unwrap();
    assert!(flushed.path.ends_with("storefile_000004.cf"));
}

#[test]
fn test_rejects_cell_of_other_family() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);

    let err = store.add(Cell::new(ROW, "other", "q", 1, VALUE)).unwrap_err();
    assert!(matches!(err, MobError::Storage(_)));
    assert_eq!(store.memstore_cell_count(), 0);
}

#[test]
fn test_memstore_full_triggers_flush() {
    let temp = tempfile::TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .memstore_flush_size(1024)
        .build();
    let store = open_mob_store(&config, 3);

    for i in 0..64 {
        store.add(Cell::new(format!("row{:03}", i), FAMILY, "q", 1, vec![1u8; 64])).unwrap();
    }

    assert!(store.storefile_count() > 0);
    let all = store.get(&Scan::new()).unwrap();
    assert_eq!(all.len(), 64);
    assert!(all.iter().all(|c| c.value_len() == 64));
}

#[test]
fn test_merge_across_flush_cycles() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);

    // Interleaved rows across batches, a mix of inline and externalized values
    let mut expected = Vec::new();
    for batch in 0..4u64 {
        for i in 0..5u64 {
            let row = format!("row{:02}", i * 4 + batch);
            let value = if i % 2 == 0 { "big-value".to_string() } else { "ab".to_string() };
            let cell = Cell::new(row, FAMILY, "q", batch + 1, value);
            store.add(cell.clone()).unwrap();
            expected.push(cell);
        }
        store.flush().unwrap();
    }
    expected.sort_by(|a, b| a.key().cmp(b.key()));

    assert_eq!(store.storefile_count(), 4);
    assert_eq!(mob_files(&config).len(), 4);
    assert_eq!(store.get(&Scan::new()).unwrap(), expected);
}
