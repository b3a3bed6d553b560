//! Region File Updater console host
//!
//! Runs the plugin without a server daemon. It:
//! - Sets up logging (daily log file, audit log, console output)
//! - Loads `config/region_file_updater.json`, writing defaults if missing
//! - Treats the destination world as offline, so stopping and starting the
//!   server are logged no-ops
//! - Reads `!!region ...` lines from stdin until EOF and prints the replies
//!
//! Player-position forms of the commands are unavailable here since the
//! console is not a player.

use anyhow::Result;
use async_trait::async_trait;
use region_file_updater::plugin::{
    Command, CommandSource, PREFIX, RegionUpdaterPlugin, ServerControl,
};
use region_file_updater::{APP_NAME, ConfigManager, VERSION};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

/// Replies go straight to stdout
struct ConsoleSource;

impl CommandSource for ConsoleSource {
    fn reply(&self, message: &str) {
        println!("{}", message);
    }

    fn broadcast(&self, message: &str) {
        println!("[broadcast] {}", message);
    }

    fn player(&self) -> Option<&str> {
        None
    }
}

/// The destination world is not owned by a running server
struct OfflineServer;

#[async_trait]
impl ServerControl for OfflineServer {
    async fn stop(&self) -> Result<()> {
        tracing::info!("No server attached, skipping stop");
        Ok(())
    }

    async fn wait_until_stopped(&self) -> Result<()> {
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        tracing::info!("No server attached, skipping start");
        Ok(())
    }
}

fn main() -> Result<()> {
    let _guards = region_file_updater::logging::setup_logging(
        "logs",
        "region_file_updater",
        false,
        true,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("region-updater-worker")
        .build()?;

    let result = runtime.block_on(run());

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    tracing::info!("Shutdown complete");

    result
}

async fn run() -> Result<()> {
    let config_manager = ConfigManager::new("config")?;
    let plugin = Arc::new(RegionUpdaterPlugin::load(
        config_manager,
        Arc::new(OfflineServer),
        None,
    )?);

    let config = plugin.config();
    tracing::info!(
        "Source world: {}, destination world: {}",
        config.source_world_directory,
        config.destination_world_directory
    );

    // Worklist change listener
    let mut changes = plugin.worklist().subscribe();
    tokio::spawn(async move {
        while let Ok(change) = changes.recv().await {
            tracing::debug!("Worklist change: {:?}", change);
        }
    });

    let source: Arc<dyn CommandSource> = Arc::new(ConsoleSource);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = Vec::new();

    // Each command runs on its own task so `list` still answers during an update
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if Command::parse_line(line).is_none() {
            println!("Not a region command, type {} for help", PREFIX);
            continue;
        }
        in_flight.retain(|handle: &JoinHandle<bool>| !handle.is_finished());
        in_flight.push(plugin.spawn_line(Arc::clone(&source), line.to_string()));
    }

    for handle in in_flight {
        if let Err(e) = handle.await {
            tracing::error!("Command task failed: {}", e);
        }
    }

    plugin.metrics().log_summary();
    Ok(())
}
