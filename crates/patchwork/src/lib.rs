//! Patchwork: a spatial index and chunk planner for AMR grid hierarchies.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all patchwork sub-crates. For most users, adding `patchwork` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use patchwork::prelude::*;
//!
//! // One 8³ root grid with a 8³ child covering its centre.
//! struct TwoGrids;
//! impl GridSource for TwoGrids {
//!     fn domain(&self) -> Domain {
//!         Domain::new([0.0; 3], [1.0; 3], [8, 8, 8])
//!     }
//!     fn count_grids(&self) -> Result<usize, HierarchyError> {
//!         Ok(2)
//!     }
//!     fn parse_grids(&self) -> Result<Vec<GridRecord>, HierarchyError> {
//!         Ok(vec![
//!             GridRecord::new(0, [0.0; 3], [1.0; 3], [8, 8, 8]),
//!             GridRecord::new(1, [0.25; 3], [0.75; 3], [8, 8, 8]).with_parent(GridId(0)),
//!         ])
//!     }
//! }
//!
//! let hierarchy = HierarchyArrays::build(&TwoGrids).unwrap();
//! assert_eq!(hierarchy.max_level(), 1);
//!
//! // The child wins inside its box; the root owns the rest.
//! let found = hierarchy.find_points(&[0.5, 0.1], &[0.5, 0.1], &[0.5, 0.1]).unwrap();
//! assert_eq!(found, vec![Some(GridId(1)), Some(GridId(0))]);
//!
//! // Every strategy reports the same total.
//! let planner = ChunkPlanner::new(&hierarchy, ChunkConfig::default()).unwrap();
//! let mut query = Query::new(Region::All);
//! let all = planner.chunk_all(&mut query, false).unwrap().next().unwrap();
//! let spatial: u64 = planner
//!     .chunk_spatial(&mut query, SpatialOptions::default())
//!     .unwrap()
//!     .map(|c| c.unwrap().cell_count())
//!     .sum();
//! assert_eq!(all.cell_count(), spatial);
//! assert_eq!(spatial, 512 - 64 + 512);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `patchwork-core` | ids, geometry, errors, chunk configuration |
//! | [`index`] | `patchwork-index` | hierarchy arrays, grid tree, selectors, backing files |
//! | [`chunk`] | `patchwork-chunk` | chunk planner, queries, preload seam |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Ids, geometry, errors and configuration (`patchwork-core`).
pub use patchwork_core as types;

/// Hierarchy arrays, point location and cell counting (`patchwork-index`).
///
/// Implement [`index::GridSource`] to feed grids in, then build
/// [`index::HierarchyArrays`].
pub use patchwork_index as index;

/// Chunk planning (`patchwork-chunk`).
///
/// [`chunk::ChunkPlanner`] yields all, spatial and io chunks; plug field
/// I/O in through [`chunk::IoHandler`].
pub use patchwork_chunk as chunk;

/// Common imports for typical patchwork usage.
///
/// ```rust
/// use patchwork::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use patchwork_core::{Bounds, ChunkConfig, ChunkSizing, Domain, FileIndex, GridId, Vec3};

    // Errors
    pub use patchwork_core::{ChunkError, ConfigError, HierarchyError, InputError};

    // Index
    pub use patchwork_index::{
        Grid, GridRecord, GridSource, GridTree, HierarchyArrays, LevelStats, Predicate, Region,
    };

    // Chunking
    pub use patchwork_chunk::{
        ChunkKind, ChunkPlanner, DataChunk, IoHandler, IoOptions, LevelOrder, Query,
        SpatialOptions,
    };
}
