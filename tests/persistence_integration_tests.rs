//! Integration tests for the protected-region file

use camino::Utf8PathBuf;
use proptest::prelude::*;
use region_file_updater::services::{JsonRegionStore, PROTECTED_REGION_FILE_NAME, ProtectedRegionStore};
use region_file_updater::{Dimension, Region, RegionSet};
use std::fs;
use tempfile::TempDir;

fn world_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let world = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, world)
}

fn arb_region() -> impl Strategy<Value = Region> {
    (
        any::<i32>(),
        any::<i32>(),
        prop_oneof![
            Just(Dimension::Lower),
            Just(Dimension::Overworld),
            Just(Dimension::Upper)
        ],
    )
        .prop_map(|(x, z, dim)| Region::new(x, z, dim))
}

#[test]
fn test_store_lives_in_destination_world() {
    let (_temp_dir, world) = world_dir();
    let store = JsonRegionStore::in_world(&world);

    assert_eq!(store.path(), world.join(PROTECTED_REGION_FILE_NAME));
}

#[test]
fn test_reads_file_written_by_hand() {
    let (_temp_dir, world) = world_dir();
    fs::write(
        world.join(PROTECTED_REGION_FILE_NAME),
        r#"[{"x": 0, "z": 0, "dim": 0}, {"x": -1, "z": 4, "dim": 1}]"#,
    )
    .unwrap();

    let loaded = JsonRegionStore::in_world(&world).load();

    assert_eq!(
        loaded.to_vec(),
        vec![
            Region::new(0, 0, Dimension::Overworld),
            Region::new(-1, 4, Dimension::Upper),
        ]
    );
}

#[test]
fn test_invalid_dimension_fails_open() {
    let (_temp_dir, world) = world_dir();
    fs::write(
        world.join(PROTECTED_REGION_FILE_NAME),
        r#"[{"x": 0, "z": 0, "dim": 7}]"#,
    )
    .unwrap();

    let store = JsonRegionStore::in_world(&world);
    assert!(store.try_load().is_err());
    assert!(store.load().is_empty());
}

#[test]
fn test_empty_set_is_written_as_empty_array() {
    let (_temp_dir, world) = world_dir();
    let store = JsonRegionStore::in_world(&world);

    store.save(&RegionSet::new()).unwrap();

    assert_eq!(fs::read_to_string(store.path()).unwrap().trim(), "[]");
}

proptest! {
    #[test]
    fn prop_load_returns_what_was_saved(regions in prop::collection::vec(arb_region(), 0..40)) {
        let (_temp_dir, world) = world_dir();
        let store = JsonRegionStore::in_world(&world);
        let set: RegionSet = regions.into_iter().collect();

        store.save(&set).unwrap();
        let loaded = store.load();

        prop_assert!(loaded.same_members(&set));
        prop_assert_eq!(loaded.to_vec(), set.to_vec());
    }
}
