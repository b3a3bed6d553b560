//! Plugin module - the `!!region` command surface.
//!
//! [`RegionUpdaterPlugin`] is what a host daemon loads. It owns the config, the
//! worklist and the host collaborators, turns command lines into worklist
//! operations, and runs update cycles:
//!
//! 1. Show the pending list and broadcast a countdown
//! 2. Stop the server and wait until it is down
//! 3. Copy the pending region files on a blocking thread
//! 4. Start the server again
//!
//! A failure in step 2 aborts the cycle with the worklist untouched.

pub mod command;
pub mod host;

pub use command::{Command, CommandError, PREFIX, RegionTarget};
pub use host::{BufferedSource, CommandSource, ServerControl};

use crate::config::ConfigManager;
use crate::logging::AUDIT_TARGET;
use crate::metrics::Metrics;
use crate::models::{HistoryEntry, PluginState, Region, UpdaterConfig};
use crate::services::{BatchApplier, JsonRegionStore, PositionProvider};
use crate::state::{WorklistError, WorklistManager, WorklistOutcome};
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Reasons an update cycle did not complete
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("Region file updates are disabled in the config")]
    Disabled,

    #[error("An update is already running")]
    AlreadyRunning,

    #[error("Failed to stop the server, nothing was copied: {0:#}")]
    Stop(anyhow::Error),

    #[error("Update worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("Region files were updated but the server failed to start: {0:#}")]
    Start(anyhow::Error),
}

/// Clears the running flag when an update cycle ends, however it ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct RegionUpdaterPlugin {
    config_manager: ConfigManager,
    config: RwLock<Arc<UpdaterConfig>>,
    worklist: WorklistManager,
    server: Arc<dyn ServerControl>,
    positions: Option<Arc<dyn PositionProvider>>,
    metrics: Arc<Metrics>,
    updating: AtomicBool,
}

impl RegionUpdaterPlugin {
    /// Load the config and the protected set, then take over `previous` if a
    /// prior instance handed its state over.
    ///
    /// A rejected hand-off is logged and the state read from disk is kept.
    pub fn load(
        config_manager: ConfigManager,
        server: Arc<dyn ServerControl>,
        previous: Option<PluginState>,
    ) -> Result<Self> {
        let config = config_manager
            .load_config()
            .context("Failed to load plugin config")?;

        let metrics = Arc::new(Metrics::new());
        let store = JsonRegionStore::in_world(&config.destination_world_directory);
        let worklist = WorklistManager::new(Arc::new(store), Arc::clone(&metrics));

        let protected = worklist.load_protected();
        tracing::info!("Loaded {} protected region file(s)", protected);

        if let Some(previous) = previous {
            if let Err(e) = worklist.import_state(previous) {
                tracing::warn!("Ignoring previous plugin state: {}", e);
            }
        }

        Ok(Self {
            config_manager,
            config: RwLock::new(Arc::new(config)),
            worklist,
            server,
            positions: None,
            metrics,
            updating: AtomicBool::new(false),
        })
    }

    /// Enable the player-position forms of `add`, `del`, `protect` and `deprotect`
    pub fn with_position_provider(mut self, provider: Arc<dyn PositionProvider>) -> Self {
        self.positions = Some(provider);
        self
    }

    pub fn config(&self) -> Arc<UpdaterConfig> {
        Arc::clone(&self.config.read().unwrap())
    }

    pub fn worklist(&self) -> &WorklistManager {
        &self.worklist
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::SeqCst)
    }

    /// State to hand to the next instance on hot reload
    pub fn export_state(&self) -> PluginState {
        self.worklist.export_state()
    }

    pub fn import_state(&self, state: PluginState) -> Result<(), WorklistError> {
        self.worklist.import_state(state)
    }

    /// Handle one line of chat or console input.
    ///
    /// Returns false if the line is not a `!!region` command.
    pub async fn handle_line(&self, source: &dyn CommandSource, line: &str) -> bool {
        let Some(parsed) = Command::parse_line(line) else {
            return false;
        };

        match parsed {
            Ok(command) => self.execute(source, command).await,
            Err(e) => source.reply(&format!("{}. Type {} for help", e, PREFIX)),
        }
        true
    }

    /// Run [`Self::handle_line`] on its own task so position lookups and update
    /// cycles do not hold up the host's dispatcher.
    pub fn spawn_line(
        self: &Arc<Self>,
        source: Arc<dyn CommandSource>,
        line: String,
    ) -> JoinHandle<bool> {
        let plugin = Arc::clone(self);
        tokio::spawn(async move { plugin.handle_line(source.as_ref(), &line).await })
    }

    pub async fn execute(&self, source: &dyn CommandSource, command: Command) {
        tracing::debug!("{} issued {:?}", source.name(), command);

        match command {
            Command::Help => source.reply(&help_message()),
            Command::Add(target) => {
                if let Some(region) = self.resolve(source, target).await {
                    report(source, self.worklist.add(region));
                }
            }
            Command::Del(target) => {
                if let Some(region) = self.resolve(source, target).await {
                    report(source, self.worklist.remove(region));
                }
            }
            Command::Protect(target) => {
                if let Some(region) = self.resolve(source, target).await {
                    report(source, self.worklist.protect(region));
                }
            }
            Command::Deprotect(target) => {
                if let Some(region) = self.resolve(source, target).await {
                    report(source, self.worklist.deprotect(region));
                }
            }
            Command::DelAll => report(source, Ok(self.worklist.clear_pending())),
            Command::DeprotectAll => report(source, self.worklist.clear_protected()),
            Command::List => source.reply(&format_region_list(
                "pending update",
                &self.worklist.pending(),
            )),
            Command::ListProtect => {
                source.reply(&format_region_list("protected", &self.worklist.protected()))
            }
            Command::History => source.reply(&format_history(&self.worklist.history())),
            Command::Update => {
                if let Err(e) = self.update(source).await {
                    tracing::error!("Update by {} failed: {}", source.name(), e);
                    source.reply(&e.to_string());
                }
            }
            Command::Reload => match self.reload() {
                Ok(_) => source.reply("Config reloaded"),
                Err(e) => {
                    tracing::error!("Reload failed: {:#}", e);
                    source.reply(&format!("Failed to reload config: {:#}", e));
                }
            },
        }
    }

    /// Run one update cycle and return the new history.
    pub async fn update(&self, source: &dyn CommandSource) -> Result<Vec<HistoryEntry>, UpdateError> {
        let config = self.config();
        if !config.enabled {
            return Err(UpdateError::Disabled);
        }
        if self.updating.swap(true, Ordering::SeqCst) {
            return Err(UpdateError::AlreadyRunning);
        }
        let _running = RunningGuard(&self.updating);

        source.reply(&format_region_list(
            "pending update",
            &self.worklist.pending(),
        ));
        self.countdown(source, config.update_countdown_secs).await;

        self.server.stop().await.map_err(UpdateError::Stop)?;
        self.server
            .wait_until_stopped()
            .await
            .map_err(UpdateError::Stop)?;

        tracing::info!(
            target: AUDIT_TARGET,
            "{} updated {} region file(s)",
            source.name(),
            self.worklist.pending().len()
        );

        let applier = BatchApplier::from_config(&config).with_metrics(Arc::clone(&self.metrics));
        let worklist = self.worklist.clone();
        let copied = tokio::task::spawn_blocking(move || worklist.apply_pending(&applier)).await;

        self.restart_after_copy(source, copied).await
    }

    /// Bring the server back whether or not the copy worker finished
    async fn restart_after_copy(
        &self,
        source: &dyn CommandSource,
        copied: Result<Vec<HistoryEntry>, tokio::task::JoinError>,
    ) -> Result<Vec<HistoryEntry>, UpdateError> {
        let history = match copied {
            Ok(history) => history,
            Err(e) => {
                tracing::error!("Copy worker failed, restarting the server anyway: {}", e);
                if let Err(start_error) = self.server.start().await {
                    tracing::error!("Failed to start the server: {:#}", start_error);
                }
                return Err(UpdateError::Worker(e));
            }
        };

        let succeeded = history.iter().filter(|entry| entry.success).count();
        source.reply(&format!(
            "Updated {} of {} region file(s)",
            succeeded,
            history.len()
        ));

        self.server.start().await.map_err(UpdateError::Start)?;
        Ok(history)
    }

    /// Re-read the config file and point the protected-set store at the
    /// (possibly new) destination world. The in-memory sets are kept.
    pub fn reload(&self) -> Result<Arc<UpdaterConfig>> {
        let config = Arc::new(
            self.config_manager
                .load_config()
                .context("Failed to reload plugin config")?,
        );

        let store = JsonRegionStore::in_world(&config.destination_world_directory);
        tracing::info!("Protected regions now stored at {}", store.path());
        self.worklist.set_store(Arc::new(store));

        *self.config.write().unwrap() = Arc::clone(&config);
        Ok(config)
    }

    async fn resolve(&self, source: &dyn CommandSource, target: RegionTarget) -> Option<Region> {
        let player = match target {
            RegionTarget::Explicit(region) => return Some(region),
            RegionTarget::Player => match source.player() {
                Some(player) => player.to_string(),
                None => {
                    source.reply("Only players can use this without coordinates");
                    return None;
                }
            },
        };

        let Some(provider) = &self.positions else {
            source.reply("Player positions are not available, give the coordinates instead");
            return None;
        };

        let limit = Duration::from_millis(self.config().position_query_timeout_ms);
        match tokio::time::timeout(limit, provider.query(&player)).await {
            Ok(Ok(position)) => Some(position.region()),
            Ok(Err(e)) => {
                tracing::warn!("Position query for {} failed: {}", player, e);
                source.reply(&format!("Could not get your position: {}", e));
                None
            }
            Err(_) => {
                tracing::warn!("Position query for {} timed out after {:?}", player, limit);
                source.reply("Timed out waiting for your position");
                None
            }
        }
    }

    async fn countdown(&self, source: &dyn CommandSource, secs: u64) {
        for remaining in (1..=secs).rev() {
            source.broadcast(&format!(
                "Restarting the server in {} second(s) to update region files",
                remaining
            ));
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

fn report(source: &dyn CommandSource, result: Result<WorklistOutcome, WorklistError>) {
    let message = match result {
        Ok(WorklistOutcome::Queued(region)) => format!("Added {} to the update list", region),
        Ok(WorklistOutcome::Unqueued(region)) => {
            format!("Removed {} from the update list", region)
        }
        Ok(WorklistOutcome::Protected {
            region,
            was_pending: true,
        }) => format!("Protected {} and removed it from the update list", region),
        Ok(WorklistOutcome::Protected { region, .. }) => format!("Protected {}", region),
        Ok(WorklistOutcome::Unprotected(region)) => format!("{} is no longer protected", region),
        Ok(WorklistOutcome::PendingCleared { removed }) => {
            format!("Cleared the update list, {} region file(s) removed", removed)
        }
        Ok(WorklistOutcome::ProtectedCleared { removed }) => {
            format!("Removed protection from {} region file(s)", removed)
        }
        Err(e) => e.to_string(),
    };
    source.reply(&message);
}

/// `N region file(s) <label>` followed by one line per region
pub fn format_region_list(label: &str, regions: &[Region]) -> String {
    let mut lines = vec![format!("{} region file(s) {}", regions.len(), label)];
    lines.extend(regions.iter().map(|region| format!("- {}", region)));
    lines.join("\n")
}

pub fn format_history(history: &[HistoryEntry]) -> String {
    let mut lines = vec![format!(
        "Last update attempted {} region file(s)",
        history.len()
    )];
    lines.extend(history.iter().map(|entry| {
        let status = if entry.success { "succeeded" } else { "failed" };
        format!("{}: {}", entry.region, status)
    }));
    lines.join("\n")
}

pub fn help_message() -> String {
    format!(
        "\
Region File Updater v{version}
Pulls region files from the source world into the server world
{p} - show this help
{p} add - queue the region you are standing in
{p} add <x> <z> <d> - queue a region by coordinates, d is -1, 0 or 1
{p} del - unqueue the region you are standing in
{p} del <x> <z> <d> - unqueue a region by coordinates
{p} del-all - empty the update list
{p} protect - protect the region you are standing in
{p} protect <x> <z> <d> - protect a region by coordinates
{p} deprotect - remove protection from the region you are standing in
{p} deprotect <x> <z> <d> - remove protection by coordinates
{p} deprotect-all - remove protection from every region
{p} list - show the update list
{p} list-protect - show protected regions
{p} history - show the result of the last update
{p} update - restart the server and copy the queued region files
{p} reload - reload the config file",
        version = crate::VERSION,
        p = PREFIX
    )
}
