//! Chunk values handed to the field I/O layer.

use std::fmt;
use std::sync::Arc;

use patchwork_core::{FileIndex, GridId};
use patchwork_index::{GhostGrid, Selector};

/// Strategy that produced a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    /// The whole selection in one chunk.
    All,
    /// One grid per chunk.
    Spatial,
    /// A batch of grids from one backing file.
    Io,
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Spatial => "spatial",
            Self::Io => "io",
        })
    }
}

/// Something a chunk reads from.
#[derive(Clone, Debug, PartialEq)]
pub enum ChunkObject {
    /// A grid as stored.
    Grid(GridId),
    /// A ghost-extended view of a grid.
    Ghost(Arc<GhostGrid>),
    /// A backing-file record.
    File(FileIndex),
}

impl ChunkObject {
    /// The grid behind a grid or ghost object.
    pub fn grid(&self) -> Option<GridId> {
        match self {
            Self::Grid(id) => Some(*id),
            Self::Ghost(ghost) => Some(ghost.source),
            Self::File(_) => None,
        }
    }
}

/// An iteration unit: objects to read plus the selected cell count.
///
/// Chunks are read views. Cloning is cheap; ghost views and selectors
/// are shared.
#[derive(Clone, Debug)]
pub struct DataChunk {
    kind: ChunkKind,
    objs: Vec<ChunkObject>,
    cell_count: u64,
    cache: bool,
    selector: Option<Arc<Selector>>,
}

impl DataChunk {
    /// Assemble a chunk.
    pub fn new(
        kind: ChunkKind,
        objs: Vec<ChunkObject>,
        cell_count: u64,
        cache: bool,
        selector: Option<Arc<Selector>>,
    ) -> Self {
        Self {
            kind,
            objs,
            cell_count,
            cache,
            selector,
        }
    }

    /// Producing strategy.
    pub fn kind(&self) -> ChunkKind {
        self.kind
    }

    /// Owning grids or files.
    pub fn objs(&self) -> &[ChunkObject] {
        &self.objs
    }

    /// Selected cells across all objects.
    pub fn cell_count(&self) -> u64 {
        self.cell_count
    }

    /// Whether loaded data may be cached for reuse.
    pub fn cache(&self) -> bool {
        self.cache
    }

    /// Selector whose counts this chunk was sized from.
    pub fn selector(&self) -> Option<&Arc<Selector>> {
        self.selector.as_ref()
    }

    /// Grids referenced directly (grid and ghost objects).
    pub fn grids(&self) -> impl Iterator<Item = GridId> + '_ {
        self.objs.iter().filter_map(ChunkObject::grid)
    }

    /// Backing files referenced.
    pub fn files(&self) -> impl Iterator<Item = FileIndex> + '_ {
        self.objs.iter().filter_map(|o| match o {
            ChunkObject::File(f) => Some(*f),
            _ => None,
        })
    }

    /// Ghost views, if the chunk was ghost-extended.
    pub fn ghosts(&self) -> impl Iterator<Item = &GhostGrid> + '_ {
        self.objs.iter().filter_map(|o| match o {
            ChunkObject::Ghost(g) => Some(g.as_ref()),
            _ => None,
        })
    }
}
