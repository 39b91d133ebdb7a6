//! Immutable search tree over the grid hierarchy.
//!
//! A [`GridTree`] is a snapshot of the hierarchy arrays taken when it
//! is built. It answers point-location queries and counts the cells a
//! [`Predicate`] selects in each grid, and it is the factory for
//! [`Selector`]s. Relocking the hierarchy edges produces a new tree;
//! an old one stays internally consistent and reports the generation it
//! was built from.

use std::sync::Arc;

use patchwork_core::{Bounds, GridId, InputError, Vec3};
use smallvec::SmallVec;
use tracing::debug;

use crate::hierarchy::{ChildList, HierarchyArrays};
use crate::predicate::Predicate;
use crate::selector::{GridMask, Selector};

#[derive(Clone, Debug)]
struct TreeNode {
    bounds: Bounds,
    level: u32,
    dimensions: [u32; 3],
    children: ChildList,
}

impl TreeNode {
    fn cell_width(&self) -> Vec3 {
        let w = self.bounds.width();
        [
            w[0] / self.dimensions[0] as f64,
            w[1] / self.dimensions[1] as f64,
            w[2] / self.dimensions[2] as f64,
        ]
    }

    fn cell_count(&self) -> u64 {
        self.dimensions.iter().map(|&d| d as u64).product()
    }
}

/// Spatial search structure over the grid hierarchy.
///
/// `Send + Sync`: any number of threads may query one tree, each with
/// its own [`Selector`].
#[derive(Debug)]
pub struct GridTree {
    nodes: Vec<TreeNode>,
    roots: Vec<GridId>,
    generation: u64,
}

impl GridTree {
    /// Snapshot the current edges, levels, dimensions and child lists.
    pub fn build(arrays: &HierarchyArrays) -> Self {
        let nodes: Vec<TreeNode> = (0..arrays.num_grids())
            .map(|slot| TreeNode {
                bounds: Bounds::new(arrays.left_edges[slot], arrays.right_edges[slot]),
                level: arrays.levels[slot],
                dimensions: arrays.dimensions[slot],
                children: arrays.children[slot].clone(),
            })
            .collect();
        let roots: Vec<GridId> = arrays
            .parents
            .iter()
            .enumerate()
            .filter(|(_, parent)| parent.is_none())
            .map(|(slot, _)| GridId(slot as u32))
            .collect();
        debug!(
            num_grids = nodes.len(),
            num_roots = roots.len(),
            generation = arrays.generation(),
            "built grid tree"
        );
        Self {
            nodes,
            roots,
            generation: arrays.generation(),
        }
    }

    /// Number of grids in the snapshot.
    pub fn num_grids(&self) -> usize {
        self.nodes.len()
    }

    /// Hierarchy generation this tree was built from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Root grid slots in ascending order.
    pub fn roots(&self) -> &[GridId] {
        &self.roots
    }

    /// Box of `grid` as captured at build time.
    pub fn bounds(&self, grid: GridId) -> Bounds {
        self.nodes[grid.index()].bounds
    }

    /// Level of `grid`.
    pub fn level(&self, grid: GridId) -> u32 {
        self.nodes[grid.index()].level
    }

    /// Deepest grid containing `p`, or `None` outside every grid.
    ///
    /// Every containing branch is followed down to the grid with no
    /// containing child. Among those candidates the deepest wins; on a
    /// face shared by grids at the same depth the later slot wins.
    pub fn find_point(&self, p: &Vec3) -> Option<GridId> {
        let mut stack: SmallVec<[GridId; 16]> = self
            .roots
            .iter()
            .copied()
            .filter(|&r| self.nodes[r.index()].bounds.contains_point(p))
            .collect();
        let mut best: Option<(u32, GridId)> = None;
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.index()];
            let before = stack.len();
            stack.extend(
                node.children
                    .iter()
                    .copied()
                    .filter(|c| self.nodes[c.index()].bounds.contains_point(p)),
            );
            if stack.len() == before {
                let candidate = (node.level, id);
                if best.is_none_or(|b| candidate > b) {
                    best = Some(candidate);
                }
            }
        }
        best.map(|(_, id)| id)
    }

    /// Locate each point given as three equal-length coordinate sequences.
    pub fn find_points(
        &self,
        x: &[f64],
        y: &[f64],
        z: &[f64],
    ) -> Result<Vec<Option<GridId>>, InputError> {
        if x.len() != y.len() || x.len() != z.len() {
            return Err(InputError::LengthMismatch {
                x: x.len(),
                y: y.len(),
                z: z.len(),
            });
        }
        Ok((0..x.len())
            .map(|i| self.find_point(&[x[i], y[i], z[i]]))
            .collect())
    }

    /// Cells of `grid` that `predicate` selects and no child covers.
    ///
    /// A cell is covered by a child when its centre lies inside the
    /// child's box, so every location is counted at exactly one level.
    pub fn count_cells(&self, grid: GridId, predicate: &dyn Predicate) -> u64 {
        let node = &self.nodes[grid.index()];
        if !predicate.intersects(&node.bounds) {
            return 0;
        }
        let mask = self.child_mask(node);
        if predicate.contains(&node.bounds) {
            let covered = mask.as_ref().map_or(0, |m| m.iter().filter(|&&c| c).count());
            return node.cell_count() - covered as u64;
        }

        let [nx, ny, nz] = node.dimensions.map(|d| d as usize);
        let dds = node.cell_width();
        let left = node.bounds.left;
        let mut count = 0u64;
        for i in 0..nx {
            let x = left[0] + (i as f64 + 0.5) * dds[0];
            for j in 0..ny {
                let y = left[1] + (j as f64 + 0.5) * dds[1];
                for k in 0..nz {
                    if mask.as_ref().is_some_and(|m| m[(i * ny + j) * nz + k]) {
                        continue;
                    }
                    let z = left[2] + (k as f64 + 0.5) * dds[2];
                    if predicate.selects(&[x, y, z]) {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// Cells of `grid` covered by its children, `None` for leaf grids.
    fn child_mask(&self, node: &TreeNode) -> Option<Vec<bool>> {
        if node.children.is_empty() {
            return None;
        }
        let [nx, ny, nz] = node.dimensions.map(|d| d as usize);
        let dds = node.cell_width();
        let mut mask = vec![false; nx * ny * nz];
        for child in &node.children {
            let cb = self.nodes[child.index()].bounds;
            let mut lo = [0usize; 3];
            let mut hi = [0usize; 3];
            for a in 0..3 {
                let n = node.dimensions[a] as f64;
                let origin = node.bounds.left[a];
                lo[a] = ((cb.left[a] - origin) / dds[a]).round().clamp(0.0, n) as usize;
                hi[a] = ((cb.right[a] - origin) / dds[a]).round().clamp(0.0, n) as usize;
            }
            for i in lo[0]..hi[0] {
                for j in lo[1]..hi[1] {
                    for k in lo[2]..hi[2] {
                        mask[(i * ny + j) * nz + k] = true;
                    }
                }
            }
        }
        Some(mask)
    }

    /// A fresh selector for `predicate` over every grid, or only the
    /// grids in `mask`.
    pub fn selector(
        self: &Arc<Self>,
        predicate: Arc<dyn Predicate>,
        mask: Option<GridMask>,
    ) -> Result<Selector, InputError> {
        if let Some(m) = &mask {
            if m.len() != self.num_grids() {
                return Err(InputError::MalformedMask {
                    expected: self.num_grids(),
                    actual: m.len(),
                });
            }
        }
        Ok(Selector::new(Arc::clone(self), predicate, mask))
    }
}
