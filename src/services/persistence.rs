use crate::models::RegionSet;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use thiserror::Error;

/// File name of the protected-region list inside the destination world
pub const PROTECTED_REGION_FILE_NAME: &str = "protected-regions.json";

/// Errors reading or writing the protected-region file
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed protected region file {path}: {source}")]
    Malformed {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage for the protected set so protection survives restarts
#[cfg_attr(test, mockall::automock)]
pub trait ProtectedRegionStore: Send + Sync {
    /// Replace the stored set with `regions`
    fn save(&self, regions: &RegionSet) -> Result<(), PersistenceError>;

    /// Read the stored set. Never fails: a missing or unreadable file is an empty set.
    fn load(&self) -> RegionSet;
}

/// Stores the protected set as a JSON array of `{"x", "z", "dim"}` objects
#[derive(Debug, Clone)]
pub struct JsonRegionStore {
    path: Utf8PathBuf,
}

impl JsonRegionStore {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<world_dir>/protected-regions.json`
    pub fn in_world(world_dir: &Utf8Path) -> Self {
        Self::new(world_dir.join(PROTECTED_REGION_FILE_NAME))
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Strict load. A missing file is an empty set; anything else unreadable is an error.
    pub fn try_load(&self) -> Result<RegionSet, PersistenceError> {
        if !self.path.is_file() {
            return Ok(RegionSet::new());
        }

        let file = File::open(&self.path).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            PersistenceError::Malformed {
                path: self.path.clone(),
                source,
            }
        })
    }
}

impl ProtectedRegionStore for JsonRegionStore {
    fn save(&self, regions: &RegionSet) -> Result<(), PersistenceError> {
        let io_err = |source: std::io::Error| PersistenceError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let file = File::create(&self.path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, regions).map_err(|e| io_err(e.into()))?;
        writer.flush().map_err(io_err)?;

        tracing::debug!("Saved {} protected regions to {}", regions.len(), self.path);
        Ok(())
    }

    fn load(&self) -> RegionSet {
        match self.try_load() {
            Ok(regions) => {
                tracing::info!(
                    "Loaded {} protected regions from {}",
                    regions.len(),
                    self.path
                );
                regions
            }
            Err(e) => {
                tracing::error!("Fail to load protected regions: {}", e);
                RegionSet::new()
            }
        }
    }
}
