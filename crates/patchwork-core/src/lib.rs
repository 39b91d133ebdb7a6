//! Core types for the patchwork AMR grid index.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the rest of the workspace: grid and file
//! identifiers, box geometry, the domain lattice, error types, and the
//! chunk-planning configuration.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod geometry;
pub mod id;

pub use config::{ChunkConfig, ChunkSizing};
pub use error::{ChunkError, ConfigError, HierarchyError, InputError};
pub use geometry::{Bounds, Domain, Vec3};
pub use id::{FileIndex, GridId};
