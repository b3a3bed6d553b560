//! Player position lookup.
//!
//! The worklist commands only need [`PositionProvider`]. Hosts that cannot ask
//! for a position directly can use [`ConsolePositionProvider`], which runs
//! `data get entity` on the server console and waits for the reply line.

use crate::models::{Dimension, Region, RegionError};
use async_trait::async_trait;
use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::timeout;

/// Where a player currently stands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub dimension: Dimension,
}

impl Position {
    /// Region containing this position
    pub fn region(&self) -> Region {
        Region::from_position(self.x, self.z, self.dimension)
    }
}

/// Errors that can occur while querying a player position
#[derive(Error, Debug)]
pub enum PositionError {
    #[error("Timed out after {timeout:?} waiting for entity data of {player}")]
    Timeout { player: String, timeout: Duration },

    #[error("Malformed entity data: {0}")]
    Malformed(String),

    #[error(transparent)]
    Dimension(#[from] RegionError),

    #[error("Server console unavailable: {0}")]
    Console(String),
}

/// Capability to look up a player's position and dimension
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn query(&self, player: &str) -> Result<Position, PositionError>;
}

/// Sink for commands typed into the server console
#[cfg_attr(test, mockall::automock)]
pub trait ServerConsole: Send + Sync {
    fn execute(&self, command: &str) -> anyhow::Result<()>;
}

/// Parse a `Pos` payload such as `[-12.5d, 64.0d, 300.25d]`
pub fn parse_pos(payload: &str) -> Result<[f64; 3], PositionError> {
    let malformed = || PositionError::Malformed(payload.to_string());

    let inner = payload
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(malformed)?;

    let values = inner
        .split(',')
        .map(|part| {
            part.trim()
                .strip_suffix('d')
                .and_then(|n| n.parse::<f64>().ok())
                .ok_or_else(malformed)
        })
        .collect::<Result<Vec<f64>, _>>()?;

    match values.as_slice() {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => Err(malformed()),
    }
}

/// Parse a `Dimension` payload: `"minecraft:the_nether"` on current servers, a
/// bare integer id on old ones
pub fn parse_dimension(payload: &str) -> Result<Dimension, PositionError> {
    let payload = payload.trim();

    if let Some(name) = payload
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    {
        return Ok(Dimension::from_resource_name(name)?);
    }

    let id: i32 = payload
        .parse()
        .map_err(|_| PositionError::Malformed(payload.to_string()))?;
    Ok(Dimension::from_id(id)?)
}

/// Entity data paths a position query asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntityPath {
    Pos,
    Dimension,
}

impl EntityPath {
    fn as_str(self) -> &'static str {
        match self {
            EntityPath::Pos => "Pos",
            EntityPath::Dimension => "Dimension",
        }
    }

    /// Whether `payload` has the shape of a reply to this path
    fn accepts(self, payload: &str) -> bool {
        match self {
            EntityPath::Pos => payload.starts_with('['),
            EntityPath::Dimension => payload.starts_with('"') || payload.parse::<i32>().is_ok(),
        }
    }
}

type Waiters = HashMap<String, VecDeque<(EntityPath, oneshot::Sender<String>)>>;

/// [`PositionProvider`] backed by the server console.
///
/// The host must forward every server output line to
/// [`on_server_output`](Self::on_server_output). A reply goes to the oldest
/// outstanding request of the same player whose path it answers, so a late
/// reply to a timed-out request cannot be taken for a different path.
pub struct ConsolePositionProvider {
    console: Arc<dyn ServerConsole>,
    timeout: Duration,
    waiters: Mutex<Waiters>,
    /// Keeps the Pos and Dimension requests of one query back to back
    query_lock: tokio::sync::Mutex<()>,
    reply_pattern: Regex,
}

impl ConsolePositionProvider {
    pub fn new(console: Arc<dyn ServerConsole>, timeout: Duration) -> Self {
        Self {
            console,
            timeout,
            waiters: Mutex::new(HashMap::new()),
            query_lock: tokio::sync::Mutex::new(()),
            reply_pattern: Regex::new(r"^(\w+) has the following entity data: (.+)$")
                .expect("Invalid entity data regex"),
        }
    }

    /// Offer one line of server output. Returns true if it answered a pending query.
    pub fn on_server_output(&self, line: &str) -> bool {
        let Some(caps) = self.reply_pattern.captures(line.trim()) else {
            return false;
        };
        let player = &caps[1];
        let payload = &caps[2];

        let mut waiters = self.waiters.lock().unwrap();
        let Some(queue) = waiters.get_mut(player) else {
            return false;
        };

        // Requests that already timed out have a closed receiver
        queue.retain(|(_, tx)| !tx.is_closed());

        let mut delivered = false;
        if let Some(index) = queue.iter().position(|(path, _)| path.accepts(payload)) {
            if let Some((_, tx)) = queue.remove(index) {
                delivered = tx.send(payload.to_string()).is_ok();
            }
        } else {
            tracing::debug!("Dropping entity data for {} nobody asked for: {}", player, payload);
        }

        if queue.is_empty() {
            waiters.remove(player);
        }
        delivered
    }

    async fn request(&self, player: &str, path: EntityPath) -> Result<String, PositionError> {
        let (tx, rx) = oneshot::channel();
        self.waiters
            .lock()
            .unwrap()
            .entry(player.to_string())
            .or_default()
            .push_back((path, tx));

        let command = format!("data get entity {} {}", player, path.as_str());
        tracing::debug!("Querying entity data: {}", command);
        if let Err(e) = self.console.execute(&command) {
            self.prune(player);
            return Err(PositionError::Console(e.to_string()));
        }

        match timeout(self.timeout, rx).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(PositionError::Console("reply channel closed".to_string())),
            Err(_) => {
                self.prune(player);
                tracing::warn!("No entity data for {} within {:?}", player, self.timeout);
                Err(PositionError::Timeout {
                    player: player.to_string(),
                    timeout: self.timeout,
                })
            }
        }
    }

    fn prune(&self, player: &str) {
        let mut waiters = self.waiters.lock().unwrap();
        if let Some(queue) = waiters.get_mut(player) {
            queue.retain(|(_, tx)| !tx.is_closed());
            if queue.is_empty() {
                waiters.remove(player);
            }
        }
    }

    /// Players with a query in flight
    pub fn waiting_players(&self) -> usize {
        self.waiters.lock().unwrap().len()
    }
}

#[async_trait]
impl PositionProvider for ConsolePositionProvider {
    async fn query(&self, player: &str) -> Result<Position, PositionError> {
        let _guard = self.query_lock.lock().await;

        let [x, y, z] = parse_pos(&self.request(player, EntityPath::Pos).await?)?;
        let dimension = parse_dimension(&self.request(player, EntityPath::Dimension).await?)?;

        Ok(Position { x, y, z, dimension })
    }
}
