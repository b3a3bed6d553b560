//! Integration tests for ConfigManager and the plugin config file
//!
//! These tests verify:
//! - Default config generation on first load
//! - Hand-written config files, including list-valued dimension folders
//! - Environment overrides layered over the file

use camino::Utf8PathBuf;
use region_file_updater::models::FolderSpec;
use region_file_updater::{ConfigManager, UpdaterConfig};
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

fn manager(dir: &Utf8PathBuf) -> ConfigManager {
    ConfigManager::new(dir).unwrap().with_env_overrides(Vec::new())
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = manager(&config_path);

    assert_eq!(manager.config_dir(), &config_path);
    assert_eq!(
        manager.config_path(),
        config_path.join("region_file_updater.json")
    );
}

#[test]
fn test_creates_missing_config_dir() {
    let (_temp_dir, root) = create_test_config_dir();
    let nested = root.join("config/plugins");

    let manager = manager(&nested);
    assert!(manager.config_dir().is_dir());
}

#[test]
fn test_default_config_file_contents() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = manager(&config_path);

    manager.load_config().unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(manager.config_path()).unwrap()).unwrap();
    assert_eq!(raw["enabled"], serde_json::json!(true));
    assert_eq!(
        raw["source_world_directory"],
        serde_json::json!("./qb_multi/slot1/world")
    );
    assert_eq!(
        raw["destination_world_directory"],
        serde_json::json!("./server/world")
    );
    assert_eq!(
        raw["dimension_region_folder"],
        serde_json::json!({"-1": "DIM-1/region", "0": "region", "1": "DIM1/region"})
    );
}

#[test]
fn test_hand_written_config() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = manager(&config_path);

    fs::write(
        manager.config_path(),
        r#"{
            "enabled": false,
            "source_world_directory": "/srv/mirror/world",
            "destination_world_directory": "/srv/survival/world",
            "dimension_region_folder": {
                "-1": ["DIM-1/region", "DIM-1/poi"],
                "0": "region"
            }
        }"#,
    )
    .unwrap();

    let config = manager.load_config().unwrap();

    assert!(!config.enabled);
    assert_eq!(config.source_world_directory, "/srv/mirror/world");
    assert_eq!(config.destination_world_directory, "/srv/survival/world");
    assert_eq!(
        config.dimension_region_folder.get("-1"),
        Some(&FolderSpec::Multiple(vec![
            "DIM-1/region".to_string(),
            "DIM-1/poi".to_string()
        ]))
    );
    assert!(config.dimension_region_folder.get("1").is_none());
    // Fields absent from the file keep their defaults
    assert_eq!(config.update_countdown_secs, 5);
    assert_eq!(config.position_query_timeout_ms, 10_000);
}

#[test]
fn test_env_overrides_numbers() {
    let (_temp_dir, config_path) = create_test_config_dir();
    manager(&config_path)
        .save_config(&UpdaterConfig::default())
        .unwrap();

    let manager = ConfigManager::new(&config_path)
        .unwrap()
        .with_env_overrides(vec![(
            "REGION_FILE_UPDATER__UPDATE_COUNTDOWN_SECS".to_string(),
            "30".to_string(),
        )]);

    let config = manager.load_config().unwrap();
    assert_eq!(config.update_countdown_secs, 30);
    assert!(config.enabled);
}

#[test]
fn test_wrong_type_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = manager(&config_path);

    fs::write(manager.config_path(), r#"{"update_countdown_secs": "soon"}"#).unwrap();

    let err = manager.load_config().unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config"));
}
