//! Per-query selectors with memoized cell counts.

use std::sync::Arc;

use indexmap::IndexMap;
use patchwork_core::{GridId, InputError};

use crate::predicate::Predicate;
use crate::tree::GridTree;

/// One boolean slot per grid, restricting which grids a selector visits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridMask(Vec<bool>);

impl GridMask {
    /// A mask of `len` slots, all cleared.
    pub fn new(len: usize) -> Self {
        Self(vec![false; len])
    }

    /// A mask of `len` slots with exactly `ids` set.
    pub fn from_ids(len: usize, ids: &[GridId]) -> Result<Self, InputError> {
        let mut mask = Self::new(len);
        for &id in ids {
            mask.insert(id)?;
        }
        Ok(mask)
    }

    /// Set the slot for `id`.
    pub fn insert(&mut self, id: GridId) -> Result<(), InputError> {
        match self.0.get_mut(id.index()) {
            Some(slot) => {
                *slot = true;
                Ok(())
            }
            None => Err(InputError::UnknownGrid { grid: id }),
        }
    }

    /// `true` if `id` is set.
    pub fn contains(&self, id: GridId) -> bool {
        self.0.get(id.index()).copied().unwrap_or(false)
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` for a zero-slot mask.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of set slots.
    pub fn count_set(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }
}

impl From<Vec<bool>> for GridMask {
    fn from(slots: Vec<bool>) -> Self {
        Self(slots)
    }
}

/// A predicate bound to a set of grids, with memoized per-grid counts.
///
/// Created by [`GridTree::selector`], which fixes both the predicate and
/// the grid restriction for the selector's lifetime. The first
/// [`count`](Self::count) records the cell count of every grid the
/// predicate touches; later calls return the memoized total. Selectors
/// are not shared between queries, so concurrent queries never contend
/// on the memo table.
#[derive(Debug)]
pub struct Selector {
    tree: Arc<GridTree>,
    predicate: Arc<dyn Predicate>,
    mask: Option<GridMask>,
    counts: IndexMap<GridId, u64>,
    total: Option<u64>,
}

impl Selector {
    pub(crate) fn new(
        tree: Arc<GridTree>,
        predicate: Arc<dyn Predicate>,
        mask: Option<GridMask>,
    ) -> Self {
        Self {
            tree,
            predicate,
            mask,
            counts: IndexMap::new(),
            total: None,
        }
    }

    /// Total selected cells across the visited grids.
    ///
    /// Grids are visited in ascending id order; each grid with a
    /// non-zero count is recorded.
    pub fn count(&mut self) -> u64 {
        if let Some(total) = self.total {
            return total;
        }
        let predicate = self.predicate.as_ref();
        let mut total = 0u64;
        for slot in 0..self.tree.num_grids() {
            let id = GridId(slot as u32);
            if self.mask.as_ref().is_some_and(|m| !m.contains(id)) {
                continue;
            }
            let cells = self.tree.count_cells(id, predicate);
            if cells > 0 {
                self.counts.insert(id, cells);
                total += cells;
            }
        }
        self.total = Some(total);
        total
    }

    /// The predicate this selector counts.
    pub fn predicate(&self) -> &Arc<dyn Predicate> {
        &self.predicate
    }

    /// `true` if this selector counts exactly `predicate` (same allocation).
    pub fn is_bound_to(&self, predicate: &Arc<dyn Predicate>) -> bool {
        Arc::ptr_eq(&self.predicate, predicate)
    }

    /// Memoized total, `None` before the first [`count`](Self::count).
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Memoized cell count of `grid`; zero for untouched grids.
    pub fn cell_count(&self, grid: GridId) -> u64 {
        self.counts.get(&grid).copied().unwrap_or(0)
    }

    /// Every touched grid and its cell count.
    pub fn cell_count_by_grid(&self) -> &IndexMap<GridId, u64> {
        &self.counts
    }

    /// `true` if `grid` has at least one selected cell.
    pub fn touches(&self, grid: GridId) -> bool {
        self.counts.contains_key(&grid)
    }

    /// Touched grid ids in ascending order.
    pub fn grid_order(&self) -> Vec<GridId> {
        let mut order: Vec<GridId> = self.counts.keys().copied().collect();
        order.sort_unstable();
        order
    }

    /// The grid restriction this selector was created with.
    pub fn mask(&self) -> Option<&GridMask> {
        self.mask.as_ref()
    }

    /// The tree this selector counts against.
    pub fn tree(&self) -> &Arc<GridTree> {
        &self.tree
    }
}
