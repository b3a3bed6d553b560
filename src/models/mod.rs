//! Data models for the region file updater.
//!
//! - [`Region`] / [`Dimension`]: a region file coordinate and the world it belongs to
//! - [`RegionSet`]: ordered, duplicate-free region collection used for the pending and protected sets
//! - [`WorklistState`]: pending + protected sets and the last update's history
//! - [`PluginState`]: versioned snapshot handed across a plugin hot-reload
//! - [`UpdaterConfig`]: settings loaded from `config/region_file_updater.json`

pub mod config;
pub mod region;
pub mod region_set;
pub mod worklist;

pub use config::{FolderSpec, UpdaterConfig};
pub use region::{Dimension, REGION_SIZE_BLOCKS, Region, RegionError};
pub use region_set::RegionSet;
pub use worklist::{HistoryEntry, PLUGIN_STATE_SCHEMA_VERSION, PluginState, WorklistState};
