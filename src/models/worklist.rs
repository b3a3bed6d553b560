use super::region::Region;
use super::region_set::RegionSet;
use serde::{Deserialize, Serialize};

/// Current version of the [`PluginState`] hand-off format
pub const PLUGIN_STATE_SCHEMA_VERSION: u32 = 1;

/// Outcome of one region in an update run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub region: Region,
    pub success: bool,
}

impl HistoryEntry {
    pub fn new(region: Region, success: bool) -> Self {
        Self { region, success }
    }
}

/// Everything the worklist owns.
///
/// `pending` and `protected` never share a member. Only
/// [`WorklistManager`](crate::state::WorklistManager) mutates this, so the rule
/// is enforced in one place.
#[derive(Debug, Clone, Default)]
pub struct WorklistState {
    /// Regions waiting for the next update run
    pub pending: RegionSet,

    /// Regions excluded from updates, persisted to disk
    pub protected: RegionSet,

    /// Result of the most recent update run
    pub history: Vec<HistoryEntry>,

    /// Regions queued while an update run is copying, `None` outside a run
    pub requeued: Option<RegionSet>,
}

impl WorklistState {
    /// True when no region is both pending and protected
    pub fn is_exclusive(&self) -> bool {
        !self.pending.iter().any(|r| self.protected.contains(r))
    }

    /// Returns (succeeded, failed) counts for the last run
    pub fn history_stats(&self) -> (usize, usize) {
        let succeeded = self.history.iter().filter(|h| h.success).count();
        (succeeded, self.history.len() - succeeded)
    }
}

/// State handed from an unloading plugin instance to its replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginState {
    pub schema_version: u32,
    pub pending: Vec<Region>,
    pub protected: Vec<Region>,
    pub history: Vec<HistoryEntry>,
}

impl From<&WorklistState> for PluginState {
    fn from(state: &WorklistState) -> Self {
        Self {
            schema_version: PLUGIN_STATE_SCHEMA_VERSION,
            pending: state.pending.to_vec(),
            protected: state.protected.to_vec(),
            history: state.history.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dimension;

    #[test]
    fn test_is_exclusive() {
        let mut state = WorklistState::default();
        let region = Region::new(0, 0, Dimension::Overworld);

        state.pending.insert(region);
        assert!(state.is_exclusive());

        state.protected.insert(region);
        assert!(!state.is_exclusive());
    }

    #[test]
    fn test_history_stats() {
        let mut state = WorklistState::default();
        state.history = vec![
            HistoryEntry::new(Region::new(0, 0, Dimension::Overworld), true),
            HistoryEntry::new(Region::new(1, 0, Dimension::Overworld), false),
            HistoryEntry::new(Region::new(2, 0, Dimension::Overworld), true),
        ];
        assert_eq!(state.history_stats(), (2, 1));
    }

    #[test]
    fn test_plugin_state_snapshot() {
        let mut state = WorklistState::default();
        state.pending.insert(Region::new(1, 1, Dimension::Overworld));
        state.protected.insert(Region::new(2, 2, Dimension::Upper));

        let snapshot = PluginState::from(&state);
        assert_eq!(snapshot.schema_version, PLUGIN_STATE_SCHEMA_VERSION);
        assert_eq!(snapshot.pending.len(), 1);
        assert_eq!(snapshot.protected.len(), 1);
        assert!(snapshot.history.is_empty());
    }
}
