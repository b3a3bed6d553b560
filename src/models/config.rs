use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One or several region folders for a dimension, relative to a world root.
///
/// Several folders let the same region be mirrored into more than one subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FolderSpec {
    Single(String),
    Multiple(Vec<String>),
}

impl FolderSpec {
    /// Folders in configured order
    pub fn folders(&self) -> Vec<&str> {
        match self {
            FolderSpec::Single(folder) => vec![folder.as_str()],
            FolderSpec::Multiple(folders) => folders.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for FolderSpec {
    fn from(folder: &str) -> Self {
        FolderSpec::Single(folder.to_string())
    }
}

/// Plugin configuration from `config/region_file_updater.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Gates the `update` command
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// World the region files are pulled from
    #[serde(default = "default_source_world_directory")]
    pub source_world_directory: Utf8PathBuf,

    /// World the region files are written into
    #[serde(default = "default_destination_world_directory")]
    pub destination_world_directory: Utf8PathBuf,

    /// Dimension id (`"-1"`, `"0"`, `"1"`) to region folder(s)
    #[serde(default = "default_dimension_region_folder")]
    pub dimension_region_folder: IndexMap<String, FolderSpec>,

    /// Seconds of broadcast countdown before the server is stopped for an update
    #[serde(default = "default_update_countdown_secs")]
    pub update_countdown_secs: u64,

    /// How long to wait for the server to answer a player position query
    #[serde(default = "default_position_query_timeout_ms")]
    pub position_query_timeout_ms: u64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            source_world_directory: default_source_world_directory(),
            destination_world_directory: default_destination_world_directory(),
            dimension_region_folder: default_dimension_region_folder(),
            update_countdown_secs: default_update_countdown_secs(),
            position_query_timeout_ms: default_position_query_timeout_ms(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_source_world_directory() -> Utf8PathBuf {
    Utf8PathBuf::from("./qb_multi/slot1/world")
}

fn default_destination_world_directory() -> Utf8PathBuf {
    Utf8PathBuf::from("./server/world")
}

fn default_dimension_region_folder() -> IndexMap<String, FolderSpec> {
    let mut folders = IndexMap::new();
    folders.insert("-1".to_string(), FolderSpec::from("DIM-1/region"));
    folders.insert("0".to_string(), FolderSpec::from("region"));
    folders.insert("1".to_string(), FolderSpec::from("DIM1/region"));
    folders
}

fn default_update_countdown_secs() -> u64 {
    5
}

fn default_position_query_timeout_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UpdaterConfig::default();
        assert!(config.enabled);
        assert_eq!(config.update_countdown_secs, 5);
        assert_eq!(
            config.dimension_region_folder.get("-1"),
            Some(&FolderSpec::from("DIM-1/region"))
        );
    }

    #[test]
    fn test_folder_spec_accepts_string_or_list() {
        let single: FolderSpec = serde_json::from_str(r#""region""#).unwrap();
        assert_eq!(single.folders(), vec!["region"]);

        let multiple: FolderSpec =
            serde_json::from_str(r#"["region", "backup/region"]"#).unwrap();
        assert_eq!(multiple.folders(), vec!["region", "backup/region"]);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: UpdaterConfig =
            serde_json::from_str(r#"{"enabled": false, "dimension_region_folder": {"0": "world/region"}}"#)
                .unwrap();
        assert!(!config.enabled);
        assert_eq!(config.destination_world_directory, "./server/world");
        assert_eq!(config.dimension_region_folder.len(), 1);
    }
}
