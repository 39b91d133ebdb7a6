//! Ghost-zone views of grids.
//!
//! Stencil-style consumers need a halo of cells around each grid. A
//! [`GhostGrid`] describes that halo as a new read-only box; the source
//! grid in the hierarchy arrays is never touched.

use std::io;

use patchwork_core::{Bounds, GridId};

use crate::hierarchy::Grid;

/// A grid grown by `ghost_width` cells on every face.
#[derive(Clone, Debug, PartialEq)]
pub struct GhostGrid {
    /// Grid the view was built from.
    pub source: GridId,
    /// Refinement level of the source grid.
    pub level: u32,
    /// Box including the ghost halo.
    pub bounds: Bounds,
    /// Cells per axis including the halo.
    pub dimensions: [u32; 3],
    /// Box of the source grid's active cells.
    pub active_bounds: Bounds,
    /// Active cells per axis of the source grid.
    pub active_dimensions: [u32; 3],
    /// Halo width in cells.
    pub ghost_width: u32,
    /// Whether halo values are interpolated from coarser data.
    pub smoothed: bool,
}

impl GhostGrid {
    /// Pure geometric expansion of `grid` by `width` cells per face.
    pub fn expand(grid: &Grid<'_>, width: u32) -> Self {
        let dds = grid.cell_width();
        let active = grid.bounds();
        let dims = grid.dimensions();
        let mut left = active.left;
        let mut right = active.right;
        for a in 0..3 {
            left[a] -= width as f64 * dds[a];
            right[a] += width as f64 * dds[a];
        }
        Self {
            source: grid.id(),
            level: grid.level(),
            bounds: Bounds::new(left, right),
            dimensions: dims.map(|d| d + 2 * width),
            active_bounds: active,
            active_dimensions: dims,
            ghost_width: width,
            smoothed: true,
        }
    }

    /// Cells including the halo.
    pub fn cell_count(&self) -> u64 {
        self.dimensions.iter().map(|&d| d as u64).product()
    }

    /// Cells of the source grid, excluding the halo.
    pub fn active_cell_count(&self) -> u64 {
        self.active_dimensions.iter().map(|&d| d as u64).product()
    }

    /// Halo cells only.
    pub fn ghost_cell_count(&self) -> u64 {
        self.cell_count() - self.active_cell_count()
    }
}

/// Builds ghost-zone views on behalf of the grid source.
///
/// Implementations backed by real data may need to read neighbouring
/// grids, so construction is fallible and may block.
pub trait GhostZoneBuilder: Send + Sync {
    /// Build a view of `grid` grown by `width` cells per face.
    fn retrieve_ghost_zones(&self, grid: &Grid<'_>, width: u32) -> io::Result<GhostGrid>;
}

/// The default builder: geometric expansion with smoothed halos.
#[derive(Clone, Copy, Debug, Default)]
pub struct SmoothedGhostZones;

impl GhostZoneBuilder for SmoothedGhostZones {
    fn retrieve_ghost_zones(&self, grid: &Grid<'_>, width: u32) -> io::Result<GhostGrid> {
        Ok(GhostGrid::expand(grid, width))
    }
}
