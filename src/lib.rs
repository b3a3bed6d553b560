// Region File Updater - pulls Minecraft region files into a server world
//
// This is the library crate a server daemon host loads. The binary crate
// (main.rs) is a console host that drives it from stdin.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod plugin;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{Dimension, HistoryEntry, PluginState, Region, RegionSet, UpdaterConfig};
pub use plugin::{Command, CommandSource, RegionUpdaterPlugin, ServerControl};
pub use state::{WorklistChange, WorklistError, WorklistManager};

/// Plugin version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Plugin name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
