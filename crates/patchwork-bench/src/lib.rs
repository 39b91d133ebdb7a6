//! Benchmark profiles for the patchwork grid index.
//!
//! - [`reference_profile`]: 8³ roots, each refined twice at its lower corner
//! - [`probe_points`]: deterministic points spread over the unit cube

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use patchwork_core::{Domain, GridId, HierarchyError, Vec3};
use patchwork_index::{GridRecord, GridSource, HierarchyArrays};

/// A nested hierarchy over the unit cube.
///
/// `roots³` level-0 grids of `cells³` cells tile the domain. Every root
/// has a level-1 child covering its lower corner octant, and every
/// child a level-2 grandchild covering its own lower corner octant.
/// Grids are spread round-robin over `files` backing files.
#[derive(Clone, Debug)]
pub struct ProfileSource {
    /// Roots per axis.
    pub roots: u32,
    /// Cells per axis in every grid.
    pub cells: u32,
    /// Number of backing files.
    pub files: u32,
}

impl GridSource for ProfileSource {
    fn domain(&self) -> Domain {
        Domain::new([0.0; 3], [1.0; 3], [self.roots * self.cells; 3])
    }

    fn count_grids(&self) -> Result<usize, HierarchyError> {
        Ok(3 * (self.roots as usize).pow(3))
    }

    fn parse_grids(&self) -> Result<Vec<GridRecord>, HierarchyError> {
        let n = self.roots;
        let per_level = (n * n * n) as usize;
        let w = 1.0 / n as f64;
        let mut records = Vec::with_capacity(3 * per_level);
        for level in 0..3u32 {
            let scale = w / f64::from(1u32 << level);
            let mut slot = 0usize;
            for i in 0..n {
                for j in 0..n {
                    for k in 0..n {
                        let left: Vec3 = [i as f64 * w, j as f64 * w, k as f64 * w];
                        let right = left.map(|l| l + scale);
                        let mut record = GridRecord::new(level, left, right, [self.cells; 3])
                            .with_filename(format!("profile.cpu{:04}", slot as u32 % self.files))
                            .with_particles(slot as u64);
                        if level > 0 {
                            let parent = (level as usize - 1) * per_level + slot;
                            record = record.with_parent(GridId(parent as u32));
                        }
                        records.push(record);
                        slot += 1;
                    }
                }
            }
        }
        Ok(records)
    }
}

/// 8³ roots of 16³ cells over 4 files: 1536 grids, ~6.3M cells.
pub fn reference_profile() -> HierarchyArrays {
    let source = ProfileSource {
        roots: 8,
        cells: 16,
        files: 4,
    };
    HierarchyArrays::build(&source).unwrap()
}

/// `n` deterministic points in the unit cube, as x, y, z sequences.
pub fn probe_points(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let coord = |i: usize, mul: u64| {
        let h = (i as u64).wrapping_mul(mul) >> 11;
        (h % 1_000_003) as f64 / 1_000_003.0
    };
    let xs = (0..n).map(|i| coord(i, 6364136223846793007)).collect();
    let ys = (0..n).map(|i| coord(i, 1442695040888963407)).collect();
    let zs = (0..n).map(|i| coord(i, 2862933555777941757)).collect();
    (xs, ys, zs)
}
