//! Interfaces the plugin needs from the hosting server daemon.

use async_trait::async_trait;
use std::sync::Mutex;

/// Whoever issued a command, and the channel to answer them on
pub trait CommandSource: Send + Sync {
    /// Send a message to the issuer only
    fn reply(&self, message: &str);

    /// Send a message to everyone on the server
    fn broadcast(&self, message: &str);

    /// Player name, or `None` for the console
    fn player(&self) -> Option<&str>;

    /// Name used in the audit log
    fn name(&self) -> String {
        self.player().unwrap_or("Console").to_string()
    }
}

/// Control over the server process that owns the destination world
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServerControl: Send + Sync {
    /// Ask the server to stop
    async fn stop(&self) -> anyhow::Result<()>;

    /// Resolve once the server has fully stopped and its world files are safe to overwrite
    async fn wait_until_stopped(&self) -> anyhow::Result<()>;

    /// Start the server again
    async fn start(&self) -> anyhow::Result<()>;
}

/// [`CommandSource`] that keeps every message in memory.
///
/// Useful for hosts that forward replies in bulk (RCON, web panels) and for tests.
#[derive(Debug, Default)]
pub struct BufferedSource {
    player: Option<String>,
    replies: Mutex<Vec<String>>,
    broadcasts: Mutex<Vec<String>>,
}

impl BufferedSource {
    pub fn console() -> Self {
        Self::default()
    }

    pub fn for_player(name: impl Into<String>) -> Self {
        Self {
            player: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }

    pub fn broadcasts(&self) -> Vec<String> {
        self.broadcasts.lock().unwrap().clone()
    }

    /// Drop everything received so far
    pub fn clear(&self) {
        self.replies.lock().unwrap().clear();
        self.broadcasts.lock().unwrap().clear();
    }
}

impl CommandSource for BufferedSource {
    fn reply(&self, message: &str) {
        self.replies.lock().unwrap().push(message.to_string());
    }

    fn broadcast(&self, message: &str) {
        self.broadcasts.lock().unwrap().push(message.to_string());
    }

    fn player(&self) -> Option<&str> {
        self.player.as_deref()
    }
}
