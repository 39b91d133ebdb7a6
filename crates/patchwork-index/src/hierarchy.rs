//! Synchronized per-grid attribute arrays.
//!
//! [`HierarchyArrays`] is the arena every other structure indexes into.
//! It is built in a single pass from a [`GridSource`] and afterwards only
//! mutated by [`lock_grids_to_parents`](HierarchyArrays::lock_grids_to_parents).
//!
//! ```text
//! GridSource ──count──▶ allocate ──parse──▶ arrays ──link──▶ children ──widths──▶ LevelStats
//! ```

use std::sync::{Arc, OnceLock};

use patchwork_core::{Bounds, Domain, GridId, HierarchyError, InputError, Vec3};
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::source::{GridRecord, GridSource};
use crate::stats::LevelStats;
use crate::tree::GridTree;

/// Child list stored per grid; most grids have at most eight children.
pub type ChildList = SmallVec<[GridId; 8]>;

/// Relative slack allowed between a grid's cell width and its lattice.
const CELL_WIDTH_TOLERANCE: f64 = 1e-6;

/// Parallel per-grid arrays, one slot per grid, indexed by [`GridId`].
///
/// All arrays always have the same length. The [`GridTree`] built from
/// them is cached and dropped whenever the edges are relocked.
#[derive(Debug)]
pub struct HierarchyArrays {
    domain: Domain,
    pub(crate) left_edges: Vec<Vec3>,
    pub(crate) right_edges: Vec<Vec3>,
    pub(crate) dimensions: Vec<[u32; 3]>,
    pub(crate) levels: Vec<u32>,
    pub(crate) parents: Vec<Option<GridId>>,
    pub(crate) children: Vec<ChildList>,
    particle_counts: Vec<u64>,
    filenames: Vec<Option<Arc<str>>>,
    id_offsets: Vec<i64>,
    max_level: u32,
    level_stats: LevelStats,
    generation: u64,
    tree: OnceLock<Arc<GridTree>>,
}

impl HierarchyArrays {
    /// Build the arrays from a grid source.
    ///
    /// Stages run in a fixed order: count, allocate, parse, link grids to
    /// their parents, check cell widths against the domain lattice,
    /// compute level statistics. Any structural violation aborts the
    /// build; a partially built hierarchy is never returned.
    pub fn build(source: &dyn GridSource) -> Result<Self, HierarchyError> {
        debug!("counting grids");
        let num_grids = source.count_grids()?;
        if num_grids == 0 {
            return Err(HierarchyError::EmptyHierarchy);
        }

        debug!(num_grids, "allocating grid arrays");
        let mut arrays = Self::allocate(source.domain(), num_grids);

        debug!("parsing index");
        let records = source.parse_grids()?;
        if records.len() != num_grids {
            return Err(HierarchyError::CountMismatch {
                counted: num_grids,
                parsed: records.len(),
            });
        }
        for (slot, record) in records.into_iter().enumerate() {
            arrays.push_record(GridId(slot as u32), record)?;
        }

        debug!("constructing grid objects");
        arrays.link_children()?;
        arrays.check_cell_widths()?;

        debug!("re-examining index");
        arrays.refresh_level_stats();
        Ok(arrays)
    }

    fn allocate(domain: Domain, n: usize) -> Self {
        Self {
            domain,
            left_edges: Vec::with_capacity(n),
            right_edges: Vec::with_capacity(n),
            dimensions: Vec::with_capacity(n),
            levels: Vec::with_capacity(n),
            parents: Vec::with_capacity(n),
            children: Vec::with_capacity(n),
            particle_counts: Vec::with_capacity(n),
            filenames: Vec::with_capacity(n),
            id_offsets: Vec::with_capacity(n),
            max_level: 0,
            level_stats: LevelStats::default(),
            generation: 0,
            tree: OnceLock::new(),
        }
    }

    fn push_record(&mut self, id: GridId, record: GridRecord) -> Result<(), HierarchyError> {
        if record.dimensions.contains(&0) {
            return Err(HierarchyError::InvalidGrid {
                grid: id,
                reason: format!("dimensions {:?} contain a zero axis", record.dimensions),
            });
        }
        if record.parent.is_none() && record.level != 0 {
            return Err(HierarchyError::InvalidGrid {
                grid: id,
                reason: format!("grid at level {} has no parent", record.level),
            });
        }
        if !Bounds::new(record.left_edge, record.right_edge).is_ordered() {
            return Err(HierarchyError::InvalidGrid {
                grid: id,
                reason: format!(
                    "left edge {:?} exceeds right edge {:?}",
                    record.left_edge, record.right_edge
                ),
            });
        }
        self.max_level = self.max_level.max(record.level);
        self.left_edges.push(record.left_edge);
        self.right_edges.push(record.right_edge);
        self.dimensions.push(record.dimensions);
        self.levels.push(record.level);
        self.parents.push(record.parent);
        self.children.push(ChildList::new());
        self.particle_counts.push(record.particle_count);
        self.filenames.push(record.filename.map(Arc::from));
        self.id_offsets.push(record.id_offset);
        Ok(())
    }

    /// Validate parent links and fill in the child lists.
    fn link_children(&mut self) -> Result<(), HierarchyError> {
        let n = self.num_grids();
        for slot in 0..n {
            let id = GridId(slot as u32);
            let Some(parent) = self.parents[slot] else {
                continue;
            };
            let p = parent.index();
            if p >= n || p == slot {
                return Err(HierarchyError::InvalidGrid {
                    grid: id,
                    reason: format!("parent index {parent} is not a valid grid"),
                });
            }
            if self.levels[p].checked_add(1) != Some(self.levels[slot]) {
                return Err(HierarchyError::InvalidGrid {
                    grid: id,
                    reason: format!(
                        "level {} is not one below parent {parent} at level {}",
                        self.levels[slot], self.levels[p]
                    ),
                });
            }
            let child = self.grid(id).bounds();
            let dds = self.grid(id).cell_width();
            let tol = [0.5 * dds[0], 0.5 * dds[1], 0.5 * dds[2]];
            if !self.grid(parent).bounds().contains_within(&child, &tol) {
                return Err(HierarchyError::InvalidGrid {
                    grid: id,
                    reason: format!("box is not nested inside parent {parent}"),
                });
            }
            self.children[p].push(id);
        }
        Ok(())
    }

    /// Every grid's cell width must match the domain lattice at its level.
    fn check_cell_widths(&self) -> Result<(), HierarchyError> {
        for grid in self.grids() {
            let dds = grid.cell_width();
            let lattice = self.domain.cell_width(grid.level());
            let off_lattice = (0..3)
                .any(|a| (dds[a] - lattice[a]).abs() > CELL_WIDTH_TOLERANCE * lattice[a]);
            if off_lattice {
                return Err(HierarchyError::InvalidGrid {
                    grid: grid.id(),
                    reason: format!(
                        "cell width {dds:?} does not match the level {} lattice width {lattice:?}",
                        grid.level()
                    ),
                });
            }
        }
        Ok(())
    }

    fn refresh_level_stats(&mut self) {
        self.level_stats = LevelStats::compute(&self.levels, &self.dimensions);
    }

    /// Number of grids.
    pub fn num_grids(&self) -> usize {
        self.levels.len()
    }

    /// Deepest refinement level present.
    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// The root-level lattice.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Per-level grid and cell counts.
    pub fn level_stats(&self) -> &LevelStats {
        &self.level_stats
    }

    /// Incremented each time the edges are relocked.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// View of one grid.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range; use [`try_grid`](Self::try_grid)
    /// for ids from untrusted input.
    pub fn grid(&self, id: GridId) -> Grid<'_> {
        assert!(id.index() < self.num_grids(), "grid {id} out of range");
        Grid { arrays: self, id }
    }

    /// View of one grid, or an input error for an unknown id.
    pub fn try_grid(&self, id: GridId) -> Result<Grid<'_>, InputError> {
        if id.index() < self.num_grids() {
            Ok(Grid { arrays: self, id })
        } else {
            Err(InputError::UnknownGrid { grid: id })
        }
    }

    /// All grids in slot order.
    pub fn grids(&self) -> impl ExactSizeIterator<Item = Grid<'_>> + '_ {
        (0..self.num_grids()).map(move |slot| Grid {
            arrays: self,
            id: GridId(slot as u32),
        })
    }

    /// Every grid at exactly `level`, in slot order.
    pub fn select_grids(&self, level: u32) -> Vec<Grid<'_>> {
        self.grids().filter(|g| g.level() == level).collect()
    }

    /// Grid groups in increasing level order, from 0 to the max level.
    pub fn get_levels(&self) -> Levels<'_> {
        Levels {
            arrays: self,
            next: 0,
        }
    }

    /// Smallest cell width among the finest grids.
    pub fn smallest_dx(&self) -> f64 {
        self.select_grids(self.max_level)
            .iter()
            .flat_map(|g| g.cell_width())
            .fold(f64::INFINITY, f64::min)
    }

    /// Total particles across every grid.
    pub fn total_particle_count(&self) -> u64 {
        self.particle_counts.iter().sum()
    }

    /// The search tree for the current edges, built on first use.
    pub fn grid_tree(&self) -> Arc<GridTree> {
        Arc::clone(self.tree.get_or_init(|| Arc::new(GridTree::build(self))))
    }

    /// Owning grid of each point given as three coordinate sequences.
    ///
    /// Points outside every grid map to `None`.
    pub fn find_points(
        &self,
        x: &[f64],
        y: &[f64],
        z: &[f64],
    ) -> Result<Vec<Option<GridId>>, InputError> {
        self.grid_tree().find_points(x, y, z)
    }

    /// Owning grid and integer cell index of each point.
    ///
    /// The cell index is `floor((p - left) / dds)`, clamped so points on
    /// the right face land in the last cell.
    pub fn locate_cells(&self, points: &[Vec3]) -> Vec<Option<(GridId, [u32; 3])>> {
        let tree = self.grid_tree();
        points
            .iter()
            .map(|p| {
                let id = tree.find_point(p)?;
                Some((id, self.grid(id).cell_index(p)))
            })
            .collect()
    }

    /// Snap every grid's edges onto its parent's lattice.
    ///
    /// The start offset of a grid within its parent (or within the domain
    /// for roots) is rounded to an integer number of cells, and both
    /// edges are recomputed from it, removing accumulated floating-point
    /// drift. Parents are processed before children, so applying this
    /// twice yields identical edges. Drops the cached [`GridTree`].
    pub fn lock_grids_to_parents(&mut self) {
        info!(num_grids = self.num_grids(), "locking grids to parents");
        let mut order: Vec<usize> = (0..self.num_grids()).collect();
        order.sort_by_key(|&slot| self.levels[slot]);

        for slot in order {
            let dds = self.domain.cell_width(self.levels[slot]);
            let origin = match self.parents[slot] {
                Some(parent) => self.left_edges[parent.index()],
                None => self.domain.left,
            };
            let dims = self.dimensions[slot];
            let mut left = [0.0; 3];
            let mut right = [0.0; 3];
            for a in 0..3 {
                let offset = ((self.left_edges[slot][a] - origin[a]) / dds[a]).round();
                left[a] = origin[a] + dds[a] * offset;
                right[a] = left[a] + dds[a] * dims[a] as f64;
            }
            self.left_edges[slot] = left;
            self.right_edges[slot] = right;
        }

        self.generation += 1;
        self.tree = OnceLock::new();
        self.refresh_level_stats();
    }
}

/// A borrowed view of one slot of [`HierarchyArrays`].
///
/// Views never copy geometry, so they always agree with the arrays.
#[derive(Clone, Copy, Debug)]
pub struct Grid<'a> {
    arrays: &'a HierarchyArrays,
    id: GridId,
}

impl<'a> Grid<'a> {
    /// Slot of this grid.
    pub fn id(&self) -> GridId {
        self.id
    }

    /// The format's own id: slot plus the declared offset.
    pub fn global_id(&self) -> i64 {
        self.id.index() as i64 + self.arrays.id_offsets[self.id.index()]
    }

    /// Declared id offset.
    pub fn id_offset(&self) -> i64 {
        self.arrays.id_offsets[self.id.index()]
    }

    /// Refinement level.
    pub fn level(&self) -> u32 {
        self.arrays.levels[self.id.index()]
    }

    /// Active cells per axis.
    pub fn dimensions(&self) -> [u32; 3] {
        self.arrays.dimensions[self.id.index()]
    }

    /// Left edge.
    pub fn left_edge(&self) -> Vec3 {
        self.arrays.left_edges[self.id.index()]
    }

    /// Right edge.
    pub fn right_edge(&self) -> Vec3 {
        self.arrays.right_edges[self.id.index()]
    }

    /// Box spanned by the two edges.
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.left_edge(), self.right_edge())
    }

    /// Cell width along each axis.
    pub fn cell_width(&self) -> Vec3 {
        let (l, r, d) = (self.left_edge(), self.right_edge(), self.dimensions());
        [
            (r[0] - l[0]) / d[0] as f64,
            (r[1] - l[1]) / d[1] as f64,
            (r[2] - l[2]) / d[2] as f64,
        ]
    }

    /// Total active cells.
    pub fn cell_count(&self) -> u64 {
        self.dimensions().iter().map(|&d| d as u64).product()
    }

    /// Parent grid, `None` for roots.
    pub fn parent(&self) -> Option<Grid<'a>> {
        self.arrays.parents[self.id.index()].map(|id| self.arrays.grid(id))
    }

    /// Child slots in ascending order.
    pub fn children(&self) -> &'a [GridId] {
        &self.arrays.children[self.id.index()]
    }

    /// Number of children.
    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// Particles stored with this grid.
    pub fn particle_count(&self) -> u64 {
        self.arrays.particle_counts[self.id.index()]
    }

    /// Backing filename, if declared.
    pub fn filename(&self) -> Option<&'a Arc<str>> {
        self.arrays.filenames[self.id.index()].as_ref()
    }

    /// Integer cell containing `p`, clamped into the grid.
    pub fn cell_index(&self, p: &Vec3) -> [u32; 3] {
        let (l, dds, d) = (self.left_edge(), self.cell_width(), self.dimensions());
        let mut out = [0u32; 3];
        for a in 0..3 {
            let i = ((p[a] - l[a]) / dds[a]).floor().max(0.0) as u32;
            out[a] = i.min(d[a] - 1);
        }
        out
    }
}

/// Finite, single-use iterator over grid groups by increasing level.
///
/// Created by [`HierarchyArrays::get_levels`].
#[derive(Debug)]
pub struct Levels<'a> {
    arrays: &'a HierarchyArrays,
    next: u32,
}

impl<'a> Iterator for Levels<'a> {
    type Item = Vec<Grid<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.arrays.max_level {
            return None;
        }
        let level = self.next;
        self.next += 1;
        Some(self.arrays.select_grids(level))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.arrays.max_level + 1).saturating_sub(self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Levels<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    struct VecSource {
        domain: Domain,
        records: Vec<GridRecord>,
        claimed: Option<usize>,
    }

    impl GridSource for VecSource {
        fn domain(&self) -> Domain {
            self.domain
        }
        fn count_grids(&self) -> Result<usize, HierarchyError> {
            Ok(self.claimed.unwrap_or(self.records.len()))
        }
        fn parse_grids(&self) -> Result<Vec<GridRecord>, HierarchyError> {
            Ok(self.records.clone())
        }
    }

    /// Unit domain with 8^3 root cells: one root and one centred child.
    fn two_level() -> VecSource {
        let domain = Domain::new([0.0; 3], [1.0; 3], [8, 8, 8]);
        VecSource {
            domain,
            records: vec![
                GridRecord::new(0, [0.0; 3], [1.0; 3], [8, 8, 8]).with_filename("a.h5"),
                GridRecord::new(1, [0.25; 3], [0.75; 3], [8, 8, 8])
                    .with_parent(GridId(0))
                    .with_filename("a.h5")
                    .with_particles(17),
            ],
            claimed: None,
        }
    }

    #[test]
    fn build_links_children() {
        let h = HierarchyArrays::build(&two_level()).unwrap();
        assert_eq!(h.num_grids(), 2);
        assert_eq!(h.max_level(), 1);
        assert_eq!(h.grid(GridId(0)).children(), &[GridId(1)]);
        assert_eq!(h.grid(GridId(1)).parent().map(|p| p.id()), Some(GridId(0)));
        assert_eq!(h.total_particle_count(), 17);
    }

    #[test]
    fn count_mismatch_is_format_error() {
        let mut src = two_level();
        src.claimed = Some(3);
        let err = HierarchyArrays::build(&src).unwrap_err();
        assert_eq!(
            err,
            HierarchyError::CountMismatch {
                counted: 3,
                parsed: 2
            }
        );
    }

    #[test]
    fn empty_source_rejected() {
        let mut src = two_level();
        src.records.clear();
        assert_eq!(
            HierarchyArrays::build(&src).unwrap_err(),
            HierarchyError::EmptyHierarchy
        );
    }

    #[test]
    fn wrong_child_level_rejected() {
        let mut src = two_level();
        src.records[1].level = 2;
        let err = HierarchyArrays::build(&src).unwrap_err();
        assert!(matches!(err, HierarchyError::InvalidGrid { grid: GridId(1), .. }));
    }

    #[test]
    fn parentless_refined_grid_rejected() {
        let mut src = two_level();
        src.records[1].parent = None;
        src.records[1].level = u32::MAX;
        let err = HierarchyArrays::build(&src).unwrap_err();
        assert!(matches!(err, HierarchyError::InvalidGrid { grid: GridId(1), .. }));
    }

    #[test]
    fn grid_off_the_domain_lattice_rejected() {
        let mut src = two_level();
        src.domain = Domain::new([0.0; 3], [1.0; 3], [4, 4, 4]);
        let err = HierarchyArrays::build(&src).unwrap_err();
        assert!(matches!(err, HierarchyError::InvalidGrid { grid: GridId(0), .. }));
    }

    #[test]
    fn child_at_the_wrong_resolution_rejected() {
        let mut src = two_level();
        src.records[1].dimensions = [4, 4, 4];
        let err = HierarchyArrays::build(&src).unwrap_err();
        assert!(matches!(err, HierarchyError::InvalidGrid { grid: GridId(1), .. }));
    }

    #[test]
    fn child_outside_parent_rejected() {
        let mut src = two_level();
        src.records[1].left_edge = [0.75; 3];
        src.records[1].right_edge = [1.25; 3];
        assert!(HierarchyArrays::build(&src).is_err());
    }

    #[test]
    fn inverted_edges_rejected() {
        let mut src = two_level();
        src.records[0].left_edge = [1.0, 0.0, 0.0];
        src.records[0].right_edge = [0.0, 1.0, 1.0];
        assert!(matches!(
            HierarchyArrays::build(&src).unwrap_err(),
            HierarchyError::InvalidGrid { grid: GridId(0), .. }
        ));
    }

    #[test]
    fn levels_are_visited_in_order_once() {
        let h = HierarchyArrays::build(&two_level()).unwrap();
        let mut levels = h.get_levels();
        assert_eq!(levels.len(), 2);
        let ids: Vec<Vec<GridId>> = levels
            .by_ref()
            .map(|group| group.iter().map(|g| g.id()).collect())
            .collect();
        assert_eq!(ids, vec![vec![GridId(0)], vec![GridId(1)]]);
        assert!(levels.next().is_none());
    }

    #[test]
    fn smallest_dx_uses_finest_level() {
        let h = HierarchyArrays::build(&two_level()).unwrap();
        assert!((h.smallest_dx() - 0.0625).abs() < 1e-15);
    }

    #[test]
    fn cell_index_clamps_right_face() {
        let h = HierarchyArrays::build(&two_level()).unwrap();
        let root = h.grid(GridId(0));
        assert_eq!(root.cell_index(&[0.0, 0.5, 1.0]), [0, 4, 7]);
    }

    #[test]
    fn locking_removes_drift_and_invalidates_tree() {
        let mut src = two_level();
        src.records[1].left_edge = [0.25 + 1e-9, 0.25 - 1e-9, 0.25];
        src.records[1].right_edge = [0.75 - 3e-9, 0.75, 0.75 + 2e-9];
        let mut h = HierarchyArrays::build(&src).unwrap();
        let before = h.grid_tree();
        h.lock_grids_to_parents();
        assert_eq!(h.grid(GridId(1)).left_edge(), [0.25; 3]);
        assert_eq!(h.grid(GridId(1)).right_edge(), [0.75; 3]);
        assert_eq!(h.generation(), 1);
        let after = h.grid_tree();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.generation(), 1);
    }

    #[test]
    fn unknown_grid_is_input_error() {
        let h = HierarchyArrays::build(&two_level()).unwrap();
        assert_eq!(
            h.try_grid(GridId(9)).unwrap_err(),
            InputError::UnknownGrid { grid: GridId(9) }
        );
    }
}
