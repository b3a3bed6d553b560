use crate::models::UpdaterConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Name of the plugin config file inside the config directory
pub const CONFIG_FILE_NAME: &str = "region_file_updater.json";

/// Prefix of environment variables that override config values,
/// e.g. `REGION_FILE_UPDATER__ENABLED=false`
pub const ENV_PREFIX: &str = "REGION_FILE_UPDATER";

/// Configuration manager for the plugin's JSON config file.
///
/// Values are layered with the `config` crate: the JSON file first, then
/// environment overrides.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
    env_overrides: Option<config::Map<String, String>>,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing the config file (e.g., "config")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
            env_overrides: None,
        })
    }

    /// Read environment overrides from `vars` instead of the process environment
    pub fn with_env_overrides<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.env_overrides = Some(vars.into_iter().collect());
        self
    }

    /// Load the plugin configuration.
    ///
    /// A missing file is created with default values, which are returned.
    ///
    /// # Errors
    /// Fails if the file cannot be read or does not match [`UpdaterConfig`]
    pub fn load_config(&self) -> Result<UpdaterConfig> {
        if !self.config_path.exists() {
            tracing::warn!(
                "Config file not found at {}, writing defaults",
                self.config_path
            );
            let config = UpdaterConfig::default();
            self.save_config(&config)?;
            return Ok(config);
        }

        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .source(self.env_overrides.clone());

        let layered = config::Config::builder()
            .add_source(config::File::new(
                self.config_path.as_str(),
                config::FileFormat::Json,
            ))
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        let config: UpdaterConfig = layered
            .try_deserialize()
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        tracing::info!(
            "Loaded config from {}: enabled={}, source={}, destination={}",
            self.config_path,
            config.enabled,
            config.source_world_directory,
            config.destination_world_directory
        );
        Ok(config)
    }

    /// Save the plugin configuration as pretty-printed JSON.
    pub fn save_config(&self, config: &UpdaterConfig) -> Result<()> {
        let json =
            serde_json::to_string_pretty(config).context("Failed to serialize config to JSON")?;

        fs::write(&self.config_path, json)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Get the configuration file path.
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}
