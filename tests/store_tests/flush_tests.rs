use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use atlasmob::store::{DefaultStorePolicy, StorePolicy};
use atlasmob::{Cell, MobStorePolicy, Scan, Store};

use crate::{cells, dir_is_empty, mob_family, mob_files, open_mob_store, setup_config, FAMILY, ROW};

#[test]
fn test_flush_of_empty_memstore_writes_nothing() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);

    assert!(store.flush().unwrap().is_none());
    assert_eq!(store.storefile_count(), 0);
    assert!(mob_files(&config).is_empty());
}

#[test]
fn test_flush_context_steps() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);
    for cell in cells(3, 1) {
        store.add(cell).unwrap();
    }

    let mut ctx = store.create_flush_context();
    ctx.prepare().unwrap();
    assert_eq!(store.snapshot_cell_count(), 3);
    assert_eq!(store.memstore_cell_count(), 0);

    ctx.flush_cache().unwrap();
    // Nothing visible until commit
    assert_eq!(store.storefile_count(), 0);
    assert!(mob_files(&config).is_empty());

    let file = ctx.commit().unwrap().unwrap();
    assert_eq!(file.entry_count(), 3);
    assert_eq!(store.storefile_count(), 1);
    assert_eq!(store.snapshot_cell_count(), 0);
    assert_eq!(mob_files(&config).len(), 1);
    assert!(dir_is_empty(&config.temp_dir(FAMILY)));
}

#[test]
fn test_dropped_flush_context_keeps_snapshot_and_cleans_temp() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);
    for cell in cells(3, 1) {
        store.add(cell).unwrap();
    }

    {
        let mut ctx = store.create_flush_context();
        ctx.prepare().unwrap();
        ctx.flush_cache().unwrap();
    }

    assert!(dir_is_empty(&config.temp_dir(FAMILY)));
    assert!(mob_files(&config).is_empty());
    assert_eq!(store.storefile_count(), 0);
    assert_eq!(store.snapshot_cell_count(), 3);

    // Snapshot cells stay readable and the next flush picks them up
    assert_eq!(store.get(&Scan::for_row(ROW)).unwrap(), cells(3, 1));
    store.flush().unwrap();
    assert_eq!(store.storefile_count(), 1);
    assert_eq!(store.snapshot_cell_count(), 0);
    assert_eq!(store.get(&Scan::for_row(ROW)).unwrap(), cells(3, 1));
}

#[test]
fn test_writes_during_flush_land_in_active_memstore() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);
    store.add(Cell::new(ROW, FAMILY, "qf1", 1, "value")).unwrap();

    let mut ctx = store.create_flush_context();
    ctx.prepare().unwrap();
    store.add(Cell::new(ROW, FAMILY, "qf2", 1, "value")).unwrap();
    ctx.flush_cache().unwrap();
    ctx.commit().unwrap();

    assert_eq!(store.storefile_count(), 1);
    assert_eq!(store.memstore_cell_count(), 1);
    assert_eq!(store.get(&Scan::for_row(ROW)).unwrap().len(), 2);
}

#[test]
fn test_explicit_policy_injection() {
    let (_temp, config) = setup_config();
    let family = mob_family(3);

    let mob: Arc<dyn StorePolicy> = Arc::new(MobStorePolicy::new(&config, &family).with_region_start_key("region-a"));
    let store = Store::open(config.clone(), family.clone(), mob).unwrap();
    assert_eq!(store.policy_name(), "mob");

    store.add(Cell::new(ROW, FAMILY, "qf1", 1, "value")).unwrap();
    store.flush().unwrap();

    let files = mob_files(&config);
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(&name[..8], format!("{:08x}", crc32fast::hash(b"region-a")));
}

#[test]
fn test_default_policy_on_mob_family_keeps_values_inline() {
    let (_temp, config) = setup_config();
    let store = Store::open(config.clone(), mob_family(3), Arc::new(DefaultStorePolicy)).unwrap();

    store.add(Cell::new(ROW, FAMILY, "qf1", 1, "value")).unwrap();
    store.flush().unwrap();

    let raw = store.get(&Scan::for_row(ROW).raw_mob(true)).unwrap();
    assert_eq!(raw[0].value().as_ref(), b"value");
    assert!(mob_files(&config).is_empty());
}

#[test]
fn test_scans_never_lose_cells_while_flushes_commit() {
    let (_temp, config) = setup_config();
    let store = open_mob_store(&config, 3);
    let done = AtomicBool::new(false);

    crossbeam::scope(|s| {
        for _ in 0..4 {
            s.spawn(|_| {
                let mut seen = 0;
                while !done.load(Ordering::Acquire) {
                    let results = store.get(&Scan::for_row(ROW)).unwrap();
                    assert!(results.len() >= seen, "scan saw {} cells after {}", results.len(), seen);
                    seen = results.len();
                }
            });
        }

        for i in 0..200 {
            store
                .add(Cell::new(ROW, FAMILY, format!("qf{:04}", i), 1, "value"))
                .unwrap();
            store.flush().unwrap();
        }
        done.store(true, Ordering::Release);
    })
    .unwrap();

    assert_eq!(store.get(&Scan::for_row(ROW)).unwrap().len(), 200);
}
