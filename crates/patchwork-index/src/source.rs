//! The grid source seam: where hierarchy geometry comes from.
//!
//! Dataset formats are parsed outside this crate. A [`GridSource`]
//! hands over the domain lattice and one [`GridRecord`] per grid, in a
//! count pass followed by a parse pass.

use patchwork_core::{Domain, GridId, HierarchyError, Vec3};

/// Supplies the raw hierarchy to [`HierarchyArrays::build`](crate::HierarchyArrays::build).
pub trait GridSource {
    /// The root-level lattice all grids align to.
    fn domain(&self) -> Domain;

    /// Number of grids the parse pass will produce.
    fn count_grids(&self) -> Result<usize, HierarchyError>;

    /// Per-grid records in slot order.
    ///
    /// Record `n` becomes `GridId(n)`; parent links refer to those ids.
    fn parse_grids(&self) -> Result<Vec<GridRecord>, HierarchyError>;
}

/// Geometry and bookkeeping for one grid, as declared by the source.
#[derive(Clone, Debug, PartialEq)]
pub struct GridRecord {
    /// Refinement level, 0 for root grids.
    pub level: u32,
    /// Active cells per axis.
    pub dimensions: [u32; 3],
    /// Left edge in code-length units.
    pub left_edge: Vec3,
    /// Right edge in code-length units.
    pub right_edge: Vec3,
    /// Slot of the parent grid, `None` for roots.
    pub parent: Option<GridId>,
    /// Particles stored with this grid.
    pub particle_count: u64,
    /// File holding this grid's field data, if the format declares one.
    pub filename: Option<String>,
    /// Offset between the slot index and the format's own grid id.
    pub id_offset: i64,
}

impl GridRecord {
    /// A root-less, particle-free record with the given geometry.
    pub fn new(level: u32, left_edge: Vec3, right_edge: Vec3, dimensions: [u32; 3]) -> Self {
        Self {
            level,
            dimensions,
            left_edge,
            right_edge,
            parent: None,
            particle_count: 0,
            filename: None,
            id_offset: 0,
        }
    }

    /// Set the parent slot.
    pub fn with_parent(mut self, parent: GridId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the backing filename.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the particle count.
    pub fn with_particles(mut self, count: u64) -> Self {
        self.particle_count = count;
        self
    }

    /// Set the format id offset.
    pub fn with_id_offset(mut self, offset: i64) -> Self {
        self.id_offset = offset;
        self
    }
}
