//! Services module - region copying and its supporting lookups.
//!
//! Nothing here knows about commands or the hosting server daemon; the
//! plugin layer wires these together.
//!
//! # Components
//!
//! - [`CoordinateMapper`]: maps a [`Region`](crate::models::Region) to the
//!   relative `r.<x>.<z>.mca` paths configured for its dimension.
//! - [`BatchApplier`]: copies those files from the source world into the
//!   destination world and produces one history entry per region.
//! - [`JsonRegionStore`]: keeps the protected set in
//!   `<destination world>/protected-regions.json`.
//! - [`PositionProvider`]: looks up where a player stands, with
//!   [`ConsolePositionProvider`] as a console-backed implementation.
//!
//! # Usage Example
//!
//! ```ignore
//! use region_file_updater::services::BatchApplier;
//!
//! let applier = BatchApplier::from_config(&config);
//! let history = applier.apply_all(&regions);
//! ```

pub mod applier;
pub mod mapper;
pub mod persistence;
pub mod position;

pub use applier::{BatchApplier, CopyError, RegionOutcome};
pub use mapper::CoordinateMapper;
pub use persistence::{
    JsonRegionStore, PROTECTED_REGION_FILE_NAME, PersistenceError, ProtectedRegionStore,
};
pub use position::{
    ConsolePositionProvider, Position, PositionError, PositionProvider, ServerConsole,
};
