//! Strongly-typed identifiers for grids and backing files.

use std::fmt;

/// Identifies a grid by its slot in the hierarchy arrays.
///
/// `GridId(n)` is the n-th grid handed over by the grid source. Parent
/// and child links are stored as `GridId`s, never as references, so the
/// hierarchy has no ownership cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridId(pub u32);

impl GridId {
    /// The slot index as a `usize`, for indexing the per-grid arrays.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for GridId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Sequential index of a backing-file record.
///
/// Assigned in filename order while grouping grids into files; a single
/// physical file may be split across several consecutive indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileIndex(pub u32);

impl FileIndex {
    /// The record index as a `usize`.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FileIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
