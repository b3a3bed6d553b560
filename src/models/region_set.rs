use super::region::Region;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Ordered collection of unique regions.
///
/// Insertion order is kept for display. Removal shifts later entries down so
/// the remaining order is unchanged. Duplicates are merged on deserialization.
///
/// `RegionSet` knows nothing about the pending/protected exclusivity rule;
/// that belongs to [`crate::state::WorklistManager`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionSet {
    regions: IndexSet<Region>,
}

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, region: &Region) -> bool {
        self.regions.contains(region)
    }

    /// Insert at the end. Returns false if the region was already present.
    pub fn insert(&mut self, region: Region) -> bool {
        self.regions.insert(region)
    }

    /// Remove a region. Returns false if it was not present.
    pub fn remove(&mut self, region: &Region) -> bool {
        self.regions.shift_remove(region)
    }

    /// Remove everything and return how many regions were dropped
    pub fn clear(&mut self) -> usize {
        let removed = self.regions.len();
        self.regions.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Snapshot in insertion order
    pub fn to_vec(&self) -> Vec<Region> {
        self.regions.iter().copied().collect()
    }

    /// Set equality, ignoring order
    pub fn same_members(&self, other: &RegionSet) -> bool {
        self.len() == other.len() && self.iter().all(|r| other.contains(r))
    }
}

impl FromIterator<Region> for RegionSet {
    fn from_iter<T: IntoIterator<Item = Region>>(iter: T) -> Self {
        Self {
            regions: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RegionSet {
    type Item = &'a Region;
    type IntoIter = indexmap::set::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}
