//! Grid hierarchy index for patchwork.
//!
//! Turns the grids handed over by a [`GridSource`] into synchronized
//! [`HierarchyArrays`], and builds the read-only [`GridTree`] used for
//! point location and selector-based cell counting.
//!
//! # Components
//!
//! - [`HierarchyArrays`]: per-grid arrays plus [`LevelStats`]
//! - [`GridTree`]: point location and per-grid cell counting
//! - [`Selector`]: a [`Predicate`] bound to an optional [`GridMask`]
//! - [`BackingFile`]: storage-unit records from [`group_backing_files`]
//! - [`GhostGrid`]: read-only ghost-zone views

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod files;
pub mod ghost;
pub mod hierarchy;
pub mod predicate;
pub mod selector;
pub mod source;
pub mod stats;
pub mod tree;

pub use files::{group_backing_files, BackingFile};
pub use ghost::{GhostGrid, GhostZoneBuilder, SmoothedGhostZones};
pub use hierarchy::{Grid, HierarchyArrays, Levels};
pub use predicate::{Predicate, Region};
pub use selector::{GridMask, Selector};
pub use source::{GridRecord, GridSource};
pub use stats::{LevelStat, LevelStats};
pub use tree::GridTree;
