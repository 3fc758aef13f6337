//! Bidirectional mapping between external IDs and dense matrix indices
//!
//! Matrix rows and columns are positional; callers speak in catalog IDs.
//! An `IdIndex` is built once per model rebuild and frozen with it.

use std::collections::HashMap;

/// Frozen ID ↔ position mapping for one model snapshot
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    to_pos: HashMap<u64, usize>,
    to_id: Vec<u64>,
}

impl IdIndex {
    /// Build from an ID sequence, keeping first-seen order and dropping
    /// duplicates
    pub fn from_ids<I: IntoIterator<Item = u64>>(ids: I) -> Self {
        let mut index = Self::default();
        for id in ids {
            if !index.to_pos.contains_key(&id) {
                index.to_pos.insert(id, index.to_id.len());
                index.to_id.push(id);
            }
        }
        index
    }

    pub fn len(&self) -> usize {
        self.to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_id.is_empty()
    }

    /// Dense position of an external ID, if known
    #[inline]
    pub fn position(&self, id: u64) -> Option<usize> {
        self.to_pos.get(&id).copied()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.to_pos.contains_key(&id)
    }

    /// External ID at a dense position
    ///
    /// Positions always come from this index or from iterating a matrix row
    /// of matching width, so out-of-range access is a logic error.
    #[inline]
    pub fn id_at(&self, pos: usize) -> u64 {
        debug_assert!(pos < self.to_id.len());
        self.to_id[pos]
    }

    /// All known IDs in dense order
    pub fn ids(&self) -> &[u64] {
        &self.to_id
    }
}
