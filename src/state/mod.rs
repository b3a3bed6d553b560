// Worklist state management
//
// WorklistManager owns the pending and protected region sets plus the last
// update's history behind one RwLock, and emits change events for listeners.

use crate::metrics::Metrics;
use crate::models::{HistoryEntry, PLUGIN_STATE_SCHEMA_VERSION, PluginState, Region, RegionSet, WorklistState};
use crate::services::applier::BatchApplier;
use crate::services::persistence::{PersistenceError, ProtectedRegionStore};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::broadcast;

/// Change events emitted when the worklist is modified
#[derive(Clone, Debug, PartialEq)]
pub enum WorklistChange {
    /// A region was added to the pending set
    RegionQueued(Region),

    /// A region was removed from the pending set
    RegionUnqueued(Region),

    /// The pending set was emptied
    PendingCleared { removed: usize },

    /// A region was protected, possibly taking it out of the pending set
    RegionProtected { region: Region, was_pending: bool },

    /// A region lost its protection
    RegionUnprotected(Region),

    /// The protected set was emptied
    ProtectedCleared { removed: usize },

    /// An update run finished and replaced the history
    UpdateFinished { succeeded: usize, failed: usize },

    /// State was replaced from a previous plugin instance
    StateImported,
}

/// Successful worklist operations
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorklistOutcome {
    Queued(Region),
    Unqueued(Region),
    Protected { region: Region, was_pending: bool },
    Unprotected(Region),
    PendingCleared { removed: usize },
    ProtectedCleared { removed: usize },
}

/// Rejected worklist operations.
///
/// The precondition variants leave the state untouched. `Persistence` means the
/// in-memory change went through but the protected-region file was not written.
#[derive(Error, Debug)]
pub enum WorklistError {
    #[error("{0} is already in the update list")]
    AlreadyPending(Region),

    #[error("{0} is protected")]
    AlreadyProtected(Region),

    #[error("{0} is not in the update list")]
    NotPending(Region),

    #[error("{0} is not protected")]
    NotProtected(Region),

    #[error("Protection changed but could not be saved: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Unsupported plugin state schema version {found}, expected {expected}")]
    UnsupportedSchema { found: u32, expected: u32 },
}

/// Thread-safe owner of the region worklist
///
/// - `pending` and `protected` never share a member; every operation here
///   checks that before mutating
/// - Every change to `protected` is written through the
///   [`ProtectedRegionStore`] while the write lock is still held, so two
///   commands cannot interleave their file writes
/// - Change events go out on a tokio broadcast channel
///
/// Clones share the same state.
pub struct WorklistManager {
    state: Arc<RwLock<WorklistState>>,
    store: Arc<RwLock<Arc<dyn ProtectedRegionStore>>>,
    metrics: Arc<Metrics>,
    change_tx: broadcast::Sender<WorklistChange>,
}

impl WorklistManager {
    /// Create an empty worklist that persists protection through `store`
    pub fn new(store: Arc<dyn ProtectedRegionStore>, metrics: Arc<Metrics>) -> Self {
        let (change_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(WorklistState::default())),
            store: Arc::new(RwLock::new(store)),
            metrics,
            change_tx,
        }
    }

    /// Replace the protected set with what the store holds.
    ///
    /// Pending regions that turn out to be protected are dropped from pending.
    /// Returns the number of protected regions loaded.
    pub fn load_protected(&self) -> usize {
        let loaded = self.current_store().load();
        let mut state = self.state.write().unwrap();

        let overlapping: Vec<Region> = state
            .pending
            .iter()
            .filter(|r| loaded.contains(r))
            .copied()
            .collect();
        for region in overlapping {
            tracing::warn!("{} is protected on disk, dropping it from the update list", region);
            state.pending.remove(&region);
        }

        state.protected = loaded;
        state.protected.len()
    }

    /// Point persistence at a different store, e.g. after the destination world moved
    pub fn set_store(&self, store: Arc<dyn ProtectedRegionStore>) {
        *self.store.write().unwrap() = store;
    }

    /// Clone of the whole state
    pub fn snapshot(&self) -> WorklistState {
        self.state.read().unwrap().clone()
    }

    /// Execute a function with read access to the state
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&WorklistState) -> R,
    {
        let state = self.state.read().unwrap();
        f(&state)
    }

    pub fn pending(&self) -> Vec<Region> {
        self.read(|s| s.pending.to_vec())
    }

    pub fn protected(&self) -> Vec<Region> {
        self.read(|s| s.protected.to_vec())
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.read(|s| s.history.clone())
    }

    /// Subscribe to worklist change events
    pub fn subscribe(&self) -> broadcast::Receiver<WorklistChange> {
        self.change_tx.subscribe()
    }

    /// Queue a region for the next update
    pub fn add(&self, region: Region) -> Result<WorklistOutcome, WorklistError> {
        let mut state = self.state.write().unwrap();

        if state.protected.contains(&region) {
            return Err(WorklistError::AlreadyProtected(region));
        }
        if !state.pending.insert(region) {
            return Err(WorklistError::AlreadyPending(region));
        }
        if let Some(requeued) = state.requeued.as_mut() {
            requeued.insert(region);
        }

        self.emit(WorklistChange::RegionQueued(region));
        Ok(WorklistOutcome::Queued(region))
    }

    /// Take a region out of the update list
    pub fn remove(&self, region: Region) -> Result<WorklistOutcome, WorklistError> {
        let mut state = self.state.write().unwrap();

        if !state.pending.remove(&region) {
            return Err(WorklistError::NotPending(region));
        }

        self.emit(WorklistChange::RegionUnqueued(region));
        Ok(WorklistOutcome::Unqueued(region))
    }

    /// Protect a region, dropping it from the update list if it was queued
    pub fn protect(&self, region: Region) -> Result<WorklistOutcome, WorklistError> {
        let mut state = self.state.write().unwrap();

        if state.protected.contains(&region) {
            return Err(WorklistError::AlreadyProtected(region));
        }
        let was_pending = state.pending.remove(&region);
        state.protected.insert(region);

        self.emit(WorklistChange::RegionProtected {
            region,
            was_pending,
        });
        self.persist(&state.protected)?;
        Ok(WorklistOutcome::Protected {
            region,
            was_pending,
        })
    }

    /// Remove protection from a region
    pub fn deprotect(&self, region: Region) -> Result<WorklistOutcome, WorklistError> {
        let mut state = self.state.write().unwrap();

        if !state.protected.remove(&region) {
            return Err(WorklistError::NotProtected(region));
        }

        self.emit(WorklistChange::RegionUnprotected(region));
        self.persist(&state.protected)?;
        Ok(WorklistOutcome::Unprotected(region))
    }

    /// Empty the update list. Succeeds on an empty list too.
    pub fn clear_pending(&self) -> WorklistOutcome {
        let removed = self.state.write().unwrap().pending.clear();
        self.emit(WorklistChange::PendingCleared { removed });
        WorklistOutcome::PendingCleared { removed }
    }

    /// Remove protection from every region
    pub fn clear_protected(&self) -> Result<WorklistOutcome, WorklistError> {
        let mut state = self.state.write().unwrap();
        let removed = state.protected.clear();

        self.emit(WorklistChange::ProtectedCleared { removed });
        self.persist(&state.protected)?;
        Ok(WorklistOutcome::ProtectedCleared { removed })
    }

    /// Copy every pending region with `applier` and record the outcome.
    ///
    /// The pending list is snapshotted first and the copies run without holding
    /// the lock. Afterwards every snapshotted region leaves the pending list,
    /// failed ones included, and the result replaces the previous history.
    /// Regions queued while the copy was running stay queued, including ones
    /// that were in the snapshot, deleted and added again mid-run.
    ///
    /// Runs must not overlap; the plugin serializes them.
    pub fn apply_pending(&self, applier: &BatchApplier) -> Vec<HistoryEntry> {
        let batch = self.begin_run();
        let started = Instant::now();

        let history = applier.apply_all(&batch);

        self.finish_run(&batch, history, started)
    }

    fn begin_run(&self) -> Vec<Region> {
        let mut state = self.state.write().unwrap();
        state.requeued = Some(RegionSet::new());
        state.pending.to_vec()
    }

    fn finish_run(
        &self,
        batch: &[Region],
        history: Vec<HistoryEntry>,
        started: Instant,
    ) -> Vec<HistoryEntry> {
        let (succeeded, failed) = {
            let mut state = self.state.write().unwrap();
            let requeued = state.requeued.take().unwrap_or_default();
            for region in batch.iter().filter(|r| !requeued.contains(r)) {
                state.pending.remove(region);
            }
            state.history = history.clone();
            state.history_stats()
        };

        self.metrics.record_update_run(started.elapsed());
        tracing::info!(
            "Update finished: {} succeeded, {} failed in {:.2}s",
            succeeded,
            failed,
            started.elapsed().as_secs_f32()
        );
        self.emit(WorklistChange::UpdateFinished { succeeded, failed });

        history
    }

    /// Snapshot for handing over to a reloaded plugin instance
    pub fn export_state(&self) -> PluginState {
        self.read(|state| PluginState::from(state))
    }

    /// Take over the state of a previous plugin instance.
    ///
    /// Rejects snapshots from an unknown schema version without touching the
    /// current state. A region listed as both pending and protected stays
    /// protected.
    pub fn import_state(&self, imported: PluginState) -> Result<(), WorklistError> {
        if imported.schema_version != PLUGIN_STATE_SCHEMA_VERSION {
            return Err(WorklistError::UnsupportedSchema {
                found: imported.schema_version,
                expected: PLUGIN_STATE_SCHEMA_VERSION,
            });
        }

        let protected: RegionSet = imported.protected.into_iter().collect();
        let pending: RegionSet = imported
            .pending
            .into_iter()
            .filter(|r| !protected.contains(r))
            .collect();

        {
            let mut state = self.state.write().unwrap();
            tracing::info!(
                "Imported plugin state: {} pending, {} protected, {} history entries",
                pending.len(),
                protected.len(),
                imported.history.len()
            );
            state.pending = pending;
            state.protected = protected;
            state.history = imported.history;
        }

        self.emit(WorklistChange::StateImported);
        Ok(())
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    fn current_store(&self) -> Arc<dyn ProtectedRegionStore> {
        Arc::clone(&self.store.read().unwrap())
    }

    fn persist(&self, protected: &RegionSet) -> Result<(), PersistenceError> {
        match self.current_store().save(protected) {
            Ok(()) => {
                self.metrics.record_protected_write();
                Ok(())
            }
            Err(e) => {
                self.metrics.record_protected_write_error();
                tracing::error!("Failed to save protected regions: {}", e);
                Err(e)
            }
        }
    }

    fn emit(&self, change: WorklistChange) {
        // Ignore send errors - it's OK if no one is listening
        let _ = self.change_tx.send(change);
    }
}

impl Clone for WorklistManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            store: Arc::clone(&self.store),
            metrics: Arc::clone(&self.metrics),
            change_tx: self.change_tx.clone(),
        }
    }
}
