//! Grouping grids into backing-file records.
//!
//! The io chunking strategy works file by file. Very large single-file
//! datasets are split into several records of bounded size so they can
//! be consumed as independent units; physical storage is unchanged.

use std::sync::Arc;

use indexmap::IndexMap;
use patchwork_core::{FileIndex, GridId};
use tracing::debug;

use crate::hierarchy::HierarchyArrays;

/// A run of grids stored in one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackingFile {
    /// Declared filename; `None` for grids whose format names no file.
    pub filename: Option<Arc<str>>,
    /// Sequential record index.
    pub index: FileIndex,
    /// Grid slots in ascending order.
    pub grid_ids: Vec<GridId>,
}

impl BackingFile {
    /// Number of grids in this record.
    pub fn len(&self) -> usize {
        self.grid_ids.len()
    }

    /// `true` for a record holding no grids.
    pub fn is_empty(&self) -> bool {
        self.grid_ids.is_empty()
    }
}

/// Bucket grids by filename and split each bucket into bounded runs.
///
/// Buckets are visited in filename order (grids without a filename
/// first); each bucket's ids are sorted and cut into runs of at most
/// `max_grids_per_file` grids, numbered sequentially.
pub fn group_backing_files(arrays: &HierarchyArrays, max_grids_per_file: u64) -> Vec<BackingFile> {
    let mut buckets: IndexMap<Option<Arc<str>>, Vec<GridId>> = IndexMap::new();
    for grid in arrays.grids() {
        buckets
            .entry(grid.filename().cloned())
            .or_default()
            .push(grid.id());
    }
    buckets.sort_keys();

    let run = usize::try_from(max_grids_per_file).unwrap_or(usize::MAX).max(1);
    let mut files = Vec::new();
    for (filename, mut ids) in buckets {
        ids.sort_unstable();
        for chunk in ids.chunks(run) {
            files.push(BackingFile {
                filename: filename.clone(),
                index: FileIndex(files.len() as u32),
                grid_ids: chunk.to_vec(),
            });
        }
    }
    debug!(
        num_files = files.len(),
        max_grids_per_file, "grouped grids into backing files"
    );
    files
}
