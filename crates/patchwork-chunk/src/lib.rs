//! Chunk planning over a patchwork grid index.
//!
//! A [`ChunkPlanner`] turns a [`Query`] into lazy sequences of
//! [`DataChunk`]s under one of three strategies:
//!
//! - **all**: the whole selection in one chunk
//! - **spatial**: one chunk per grid, optionally ghost-extended
//! - **io**: per-file grid batches, each held under a preload
//!
//! Field I/O itself lives behind the [`IoHandler`] trait. Io chunks are
//! yielded as [`PreloadedChunk`] guards that release their preload when
//! dropped.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod chunk;
pub mod planner;
pub mod preload;
pub mod query;

pub use chunk::{ChunkKind, ChunkObject, DataChunk};
pub use planner::{ChunkPlanner, IoChunks, IoOptions, LevelOrder, SpatialChunks, SpatialOptions};
pub use preload::{BatchPreload, IoHandler, NoopIo, PreloadedChunk};
pub use query::Query;
