//! The chunk planner: three strategies for iterating a selection.
//!
//! - [`ChunkPlanner::chunk_all`]: one chunk for the whole selection.
//! - [`ChunkPlanner::chunk_spatial`]: one chunk per grid with selected
//!   cells, optionally ghost-extended or ordered by level.
//! - [`ChunkPlanner::chunk_io`]: per-file batches of grids, each held
//!   under a preload for as long as the consumer keeps it.
//!
//! Every strategy starts from the query's base chunk, which is counted
//! once and cached on the [`Query`].

use std::cmp::Reverse;
use std::io;
use std::sync::Arc;

use indexmap::IndexMap;
use patchwork_core::{
    ChunkConfig, ChunkError, ChunkSizing, ConfigError, FileIndex, GridId, InputError,
};
use patchwork_index::{
    group_backing_files, BackingFile, GhostZoneBuilder, GridMask, GridTree, HierarchyArrays,
    Predicate, Selector, SmoothedGhostZones,
};
use tracing::{debug, trace};

use crate::chunk::{ChunkKind, ChunkObject, DataChunk};
use crate::preload::{BatchPreload, IoHandler, NoopIo, PreloadedChunk};
use crate::query::Query;

/// Level ordering for spatial chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelOrder {
    /// Coarsest grids first.
    Ascending,
    /// Finest grids first.
    Descending,
}

/// Options for [`ChunkPlanner::chunk_spatial`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpatialOptions {
    /// Ghost cells added on every face. Zero yields the grids as stored.
    pub ghost_width: u32,
    /// Optional level ordering; `None` keeps the base chunk's order.
    pub order: Option<LevelOrder>,
    /// Fields to batch-fetch for the whole grid group up front.
    pub preload_fields: Vec<String>,
    /// Whether loaded data may be cached. Forced off for ghost views.
    pub cache: bool,
}

/// Options for [`ChunkPlanner::chunk_io`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IoOptions {
    /// Whether loaded data may be cached. Default: `true`.
    pub cache: bool,
    /// Fields the preload should cover.
    pub preload_fields: Vec<String>,
}

impl Default for IoOptions {
    fn default() -> Self {
        Self {
            cache: true,
            preload_fields: Vec::new(),
        }
    }
}

/// Produces chunk sequences over one hierarchy.
///
/// Construction validates the [`ChunkConfig`] and groups grids into
/// backing files; both are fixed for the planner's lifetime. The
/// planner only reads the hierarchy, so any number of planners and
/// queries may run over it concurrently.
pub struct ChunkPlanner<'h> {
    hierarchy: &'h HierarchyArrays,
    tree: Arc<GridTree>,
    config: ChunkConfig,
    files: Vec<BackingFile>,
    file_of: Vec<FileIndex>,
    io: Arc<dyn IoHandler>,
    ghost: Arc<dyn GhostZoneBuilder>,
}

impl<'h> ChunkPlanner<'h> {
    /// Validate `config` and group the hierarchy's grids into files.
    pub fn new(hierarchy: &'h HierarchyArrays, config: ChunkConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let files = group_backing_files(hierarchy, config.grid_chunk_size());
        let mut file_of = vec![FileIndex(0); hierarchy.num_grids()];
        for file in &files {
            for &grid in &file.grid_ids {
                file_of[grid.index()] = file.index;
            }
        }
        debug!(
            num_grids = hierarchy.num_grids(),
            num_files = files.len(),
            chunk_sizing = %config.chunk_sizing,
            "chunk planner ready"
        );
        Ok(Self {
            hierarchy,
            tree: hierarchy.grid_tree(),
            config,
            files,
            file_of,
            io: Arc::new(NoopIo),
            ghost: Arc::new(SmoothedGhostZones),
        })
    }

    /// Use `io` for batch fetches and io-chunk preloads.
    pub fn with_io(mut self, io: Arc<dyn IoHandler>) -> Self {
        self.io = io;
        self
    }

    /// Use `ghost` to build ghost-extended grid views.
    pub fn with_ghost_zones(mut self, ghost: Arc<dyn GhostZoneBuilder>) -> Self {
        self.ghost = ghost;
        self
    }

    /// The validated configuration.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// The hierarchy being planned over.
    pub fn hierarchy(&self) -> &'h HierarchyArrays {
        self.hierarchy
    }

    /// The tree snapshot selectors are created from.
    pub fn tree(&self) -> &Arc<GridTree> {
        &self.tree
    }

    /// Backing-file records, in index order.
    pub fn backing_files(&self) -> &[BackingFile] {
        &self.files
    }

    /// Backing-file record holding `grid`.
    pub fn file_of(&self, grid: GridId) -> Result<FileIndex, InputError> {
        self.file_of
            .get(grid.index())
            .copied()
            .ok_or(InputError::UnknownGrid { grid })
    }

    /// Count the query's selection and cache its base chunk.
    ///
    /// The base chunk lists every backing file holding a grid with at
    /// least one selected cell. It carries the counted selector so
    /// later strategies never recount.
    ///
    /// A query that already has a chunk keeps it when the chunk was
    /// counted for this query's predicate. A chunk counted for another
    /// predicate (handed to [`Query::within`] from a different query)
    /// is recounted over its own grids before use.
    pub fn identify_base_chunk(&self, query: &mut Query) -> Result<DataChunk, ChunkError> {
        self.base(query).map(|(chunk, _)| chunk)
    }

    /// A single chunk covering the whole selection.
    pub fn chunk_all(
        &self,
        query: &mut Query,
        cache: bool,
    ) -> Result<std::iter::Once<DataChunk>, ChunkError> {
        let base = self.identify_base_chunk(query)?;
        let chunk = DataChunk::new(
            ChunkKind::All,
            base.objs().to_vec(),
            base.cell_count(),
            cache,
            base.selector().cloned(),
        );
        Ok(std::iter::once(chunk))
    }

    /// One chunk per grid with at least one selected cell.
    ///
    /// Ghost views are built before counting; a view's chunk reports the
    /// source grid's selected cell count. When no ghost zones are asked
    /// for, `preload_fields` is non-empty and the io handler supports
    /// it, the whole grid group is fetched once before the first chunk.
    pub fn chunk_spatial(
        &self,
        query: &mut Query,
        opts: SpatialOptions,
    ) -> Result<SpatialChunks<'_>, ChunkError> {
        let (base, selector) = self.base(query)?;

        let mut grids = self.object_grids(&base)?;
        if grids.is_empty() {
            for file in base.files() {
                grids.extend(self.file_grids(file, query.predicate())?);
            }
        }
        match opts.order {
            Some(LevelOrder::Ascending) => grids.sort_by_key(|&g| self.tree.level(g)),
            Some(LevelOrder::Descending) => grids.sort_by_key(|&g| Reverse(self.tree.level(g))),
            None => {}
        }

        let io = self.io.as_ref();
        let source = if opts.ghost_width == 0
            && !opts.preload_fields.is_empty()
            && io.preload_implemented()
        {
            GridFeed::Batched(BatchPreload::new(grids, opts.preload_fields, io))
        } else {
            GridFeed::Plain(grids.into_iter())
        };
        Ok(SpatialChunks {
            hierarchy: self.hierarchy,
            ghost: self.ghost.as_ref(),
            selector,
            source,
            ghost_width: opts.ghost_width,
            cache: opts.cache && opts.ghost_width == 0,
        })
    }

    /// Per-file batches of grids, sized by the configured mode.
    pub fn chunk_io(&self, query: &mut Query, opts: IoOptions) -> Result<IoChunks<'_>, ChunkError> {
        self.chunk_io_with(query, opts, self.config.chunk_sizing)
    }

    /// [`chunk_io`](Self::chunk_io) with an explicit sizing mode.
    ///
    /// Grids are grouped by backing file in file order. Each file's
    /// grids are cut into batches of
    /// [`ChunkConfig::batch_size`] grids; each batch is counted with its
    /// own restricted selector and preloaded with room for four batches.
    pub fn chunk_io_with(
        &self,
        query: &mut Query,
        opts: IoOptions,
        sizing: ChunkSizing,
    ) -> Result<IoChunks<'_>, ChunkError> {
        let (base, selector) = self.base(query)?;

        let grids = self.object_grids(&base)?;
        let scopes: Vec<(FileIndex, Vec<GridId>)> = if grids.is_empty() {
            base.files()
                .map(|file| -> Result<_, ChunkError> {
                    Ok((file, self.file_grids(file, query.predicate())?))
                })
                .collect::<Result<_, _>>()?
        } else {
            let mut by_file: IndexMap<FileIndex, Vec<GridId>> = IndexMap::new();
            for grid in grids {
                by_file.entry(self.file_of[grid.index()]).or_default().push(grid);
            }
            by_file.sort_keys();
            by_file.into_iter().collect()
        };

        let mut batches = Vec::new();
        for (file, grids) in scopes {
            let size = self.config.batch_size(sizing, grids.len());
            debug!(
                file = %file,
                grids = grids.len(),
                batch_size = size,
                chunk_sizing = %sizing,
                "sized io batches"
            );
            let run = usize::try_from(size).unwrap_or(usize::MAX).max(1);
            for batch in grids.chunks(run) {
                batches.push(IoBatch {
                    file,
                    grids: batch.to_vec(),
                    size,
                });
            }
        }

        Ok(IoChunks {
            tree: Arc::clone(&self.tree),
            selector,
            batches: batches.into_iter(),
            io: self.io.as_ref(),
            fields: opts.preload_fields,
            cache: opts.cache,
        })
    }

    // ── helpers ─────────────────────────────────────────────────

    /// The query's base chunk and a selector counted for its predicate.
    fn base(&self, query: &mut Query) -> Result<(DataChunk, Arc<Selector>), ChunkError> {
        let predicate = query.shared_predicate();
        let (chunk, selector) = match query.current_chunk() {
            Some(current) => {
                if let Some(selector) = current
                    .selector()
                    .filter(|s| s.total().is_some() && s.is_bound_to(&predicate))
                {
                    return Ok((current.clone(), Arc::clone(selector)));
                }
                self.rescope(current, predicate)?
            }
            None => self.fresh_base(predicate)?,
        };
        query.set_base(chunk.cell_count(), chunk.clone());
        Ok((chunk, selector))
    }

    fn fresh_base(
        &self,
        predicate: Arc<dyn Predicate>,
    ) -> Result<(DataChunk, Arc<Selector>), ChunkError> {
        let mut selector = self.tree.selector(predicate, None)?;
        let size = selector.count();

        let mut files: Vec<FileIndex> = (0..self.tree.num_grids())
            .map(|slot| GridId(slot as u32))
            .filter(|&g| selector.touches(g))
            .map(|g| self.file_of[g.index()])
            .collect();
        files.sort_unstable();
        files.dedup();
        debug!(cells = size, num_files = files.len(), "identified base chunk");

        let selector = Arc::new(selector);
        let objs = files.into_iter().map(ChunkObject::File).collect();
        let chunk = DataChunk::new(ChunkKind::All, objs, size, false, Some(Arc::clone(&selector)));
        Ok((chunk, selector))
    }

    /// Recount `chunk` for `predicate`, restricted to the chunk's grids.
    ///
    /// A chunk of file records covers every grid in those files.
    fn rescope(
        &self,
        chunk: &DataChunk,
        predicate: Arc<dyn Predicate>,
    ) -> Result<(DataChunk, Arc<Selector>), ChunkError> {
        let mut grids = self.object_grids(chunk)?;
        if grids.is_empty() {
            for file in chunk.files() {
                let record = self
                    .files
                    .get(file.index())
                    .ok_or(InputError::UnknownFile { file })?;
                grids.extend(record.grid_ids.iter().copied());
            }
        }
        let mask = GridMask::from_ids(self.tree.num_grids(), &grids)?;
        let mut selector = self.tree.selector(predicate, Some(mask))?;
        let size = selector.count();
        debug!(
            kind = %chunk.kind(),
            grids = grids.len(),
            cells = size,
            "recounted chunk for query predicate"
        );

        let selector = Arc::new(selector);
        let rescoped = DataChunk::new(
            chunk.kind(),
            chunk.objs().to_vec(),
            size,
            chunk.cache(),
            Some(Arc::clone(&selector)),
        );
        Ok((rescoped, selector))
    }

    /// Grid and ghost objects of `base`, validated, in object order.
    ///
    /// Grid-level objects take precedence over file records.
    fn object_grids(&self, base: &DataChunk) -> Result<Vec<GridId>, ChunkError> {
        base.grids()
            .map(|g| self.hierarchy.try_grid(g).map(|_| g).map_err(ChunkError::from))
            .collect()
    }

    /// Grids of `file` whose box the predicate intersects, ascending.
    fn file_grids(
        &self,
        file: FileIndex,
        predicate: &dyn Predicate,
    ) -> Result<Vec<GridId>, ChunkError> {
        let record = self
            .files
            .get(file.index())
            .ok_or(InputError::UnknownFile { file })?;
        Ok(record
            .grid_ids
            .iter()
            .copied()
            .filter(|&g| predicate.intersects(&self.tree.bounds(g)))
            .collect())
    }
}

impl std::fmt::Debug for ChunkPlanner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkPlanner")
            .field("num_grids", &self.hierarchy.num_grids())
            .field("num_files", &self.files.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ── spatial ─────────────────────────────────────────────────────

enum GridFeed<'p> {
    Plain(std::vec::IntoIter<GridId>),
    Batched(BatchPreload<'p>),
}

impl Iterator for GridFeed<'_> {
    type Item = io::Result<GridId>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Plain(grids) => grids.next().map(Ok),
            Self::Batched(grids) => grids.next(),
        }
    }
}

/// Lazy sequence of spatial chunks from [`ChunkPlanner::chunk_spatial`].
///
/// Ghost-zone construction and batch fetches happen inside `next`, so
/// their failures surface as `Err` items. Iteration can continue past
/// an error.
pub struct SpatialChunks<'p> {
    hierarchy: &'p HierarchyArrays,
    ghost: &'p dyn GhostZoneBuilder,
    selector: Arc<Selector>,
    source: GridFeed<'p>,
    ghost_width: u32,
    cache: bool,
}

impl Iterator for SpatialChunks<'_> {
    type Item = Result<DataChunk, ChunkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let grid = match self.source.next()? {
                Ok(grid) => grid,
                Err(e) => return Some(Err(e.into())),
            };
            let obj = if self.ghost_width > 0 {
                let view = match self.hierarchy.try_grid(grid) {
                    Ok(view) => view,
                    Err(e) => return Some(Err(e.into())),
                };
                match self.ghost.retrieve_ghost_zones(&view, self.ghost_width) {
                    Ok(ghost) => ChunkObject::Ghost(Arc::new(ghost)),
                    Err(e) => return Some(Err(e.into())),
                }
            } else {
                ChunkObject::Grid(grid)
            };
            let cells = self.selector.cell_count(grid);
            if cells == 0 {
                continue;
            }
            trace!(grid = %grid, cells, "spatial chunk");
            return Some(Ok(DataChunk::new(
                ChunkKind::Spatial,
                vec![obj],
                cells,
                self.cache,
                Some(Arc::clone(&self.selector)),
            )));
        }
    }
}

impl std::fmt::Debug for SpatialChunks<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialChunks")
            .field("ghost_width", &self.ghost_width)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

// ── io ──────────────────────────────────────────────────────────

#[derive(Debug)]
struct IoBatch {
    file: FileIndex,
    grids: Vec<GridId>,
    size: u64,
}

/// Lazy sequence of preloaded io chunks from [`ChunkPlanner::chunk_io`].
///
/// Each item holds its preload until dropped. A batch whose grids
/// intersect the predicate's box but contain no selected cell centre
/// is still yielded, with a zero count.
pub struct IoChunks<'p> {
    tree: Arc<GridTree>,
    selector: Arc<Selector>,
    batches: std::vec::IntoIter<IoBatch>,
    io: &'p dyn IoHandler,
    fields: Vec<String>,
    cache: bool,
}

impl<'p> IoChunks<'p> {
    /// Batches not yet yielded.
    pub fn remaining(&self) -> usize {
        self.batches.len()
    }

    fn restricted_count(&self, batch: &IoBatch) -> Result<(u64, Selector), ChunkError> {
        let ids: Vec<GridId> = match self.selector.mask() {
            Some(base) => batch.grids.iter().copied().filter(|&g| base.contains(g)).collect(),
            None => batch.grids.clone(),
        };
        let mask = GridMask::from_ids(self.tree.num_grids(), &ids)?;
        let predicate = Arc::clone(self.selector.predicate());
        let mut restricted = self.tree.selector(predicate, Some(mask))?;
        let cells = restricted.count();
        let expected: u64 = ids.iter().map(|&g| self.selector.cell_count(g)).sum();
        assert_eq!(
            cells, expected,
            "cell count divergence in io chunk for file {}",
            batch.file
        );
        Ok((cells, restricted))
    }
}

impl<'p> Iterator for IoChunks<'p> {
    type Item = Result<PreloadedChunk<'p>, ChunkError>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch = self.batches.next()?;
        let (cells, restricted) = match self.restricted_count(&batch) {
            Ok(counted) => counted,
            Err(e) => return Some(Err(e)),
        };
        let mut objs = Vec::with_capacity(batch.grids.len() + 1);
        objs.push(ChunkObject::File(batch.file));
        objs.extend(batch.grids.iter().copied().map(ChunkObject::Grid));
        let chunk = DataChunk::new(ChunkKind::Io, objs, cells, self.cache, Some(Arc::new(restricted)));

        if let Err(e) = self
            .io
            .preload(&chunk, &self.fields, batch.size.saturating_mul(4))
        {
            return Some(Err(e.into()));
        }
        trace!(file = %batch.file, grids = batch.grids.len(), cells, "io chunk");
        Some(Ok(PreloadedChunk::new(chunk, self.io)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.batches.size_hint()
    }
}

impl std::fmt::Debug for IoChunks<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoChunks")
            .field("remaining", &self.batches.len())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwork_core::{Bounds, Domain, HierarchyError};
    use patchwork_index::{GridRecord, GridSource, Region};

    struct VecSource(Domain, Vec<GridRecord>);

    impl GridSource for VecSource {
        fn domain(&self) -> Domain {
            self.0
        }
        fn count_grids(&self) -> Result<usize, HierarchyError> {
            Ok(self.1.len())
        }
        fn parse_grids(&self) -> Result<Vec<GridRecord>, HierarchyError> {
            Ok(self.1.clone())
        }
    }

    /// Four 4³ roots along x in two files, one 4³ child of root 1.
    fn row() -> HierarchyArrays {
        let domain = Domain::new([0.0; 3], [4.0, 1.0, 1.0], [16, 4, 4]);
        let mut records: Vec<GridRecord> = (0..4)
            .map(|i| {
                let x = i as f64;
                GridRecord::new(0, [x, 0.0, 0.0], [x + 1.0, 1.0, 1.0], [4, 4, 4])
                    .with_filename(if i < 2 { "a.bin" } else { "b.bin" })
            })
            .collect();
        records.push(
            GridRecord::new(1, [1.0, 0.0, 0.0], [1.5, 0.5, 0.5], [4, 4, 4])
                .with_parent(GridId(1))
                .with_filename("b.bin"),
        );
        HierarchyArrays::build(&VecSource(domain, records)).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected_at_setup() {
        let arrays = row();
        let config = ChunkConfig {
            parallel_worker_count: 0,
            ..ChunkConfig::default()
        };
        let err = ChunkPlanner::new(&arrays, config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { name: "parallel_worker_count", .. }
        ));
    }

    #[test]
    fn files_follow_filename_order() {
        let arrays = row();
        let planner = ChunkPlanner::new(&arrays, ChunkConfig::default()).unwrap();
        let files = planner.backing_files();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].grid_ids, vec![GridId(0), GridId(1)]);
        assert_eq!(files[1].grid_ids, vec![GridId(2), GridId(3), GridId(4)]);
        assert_eq!(planner.file_of(GridId(4)).unwrap(), FileIndex(1));
    }

    #[test]
    fn base_chunk_is_counted_once_and_cached() {
        let arrays = row();
        let planner = ChunkPlanner::new(&arrays, ChunkConfig::default()).unwrap();
        let mut query = Query::new(Region::Box(Bounds::new([0.0; 3], [0.9; 3])));
        let base = planner.identify_base_chunk(&mut query).unwrap();
        assert_eq!(base.kind(), ChunkKind::All);
        assert!(!base.cache());
        assert_eq!(query.size(), Some(64));
        let again = planner.identify_base_chunk(&mut query).unwrap();
        assert!(Arc::ptr_eq(
            base.selector().unwrap(),
            again.selector().unwrap()
        ));
        assert_eq!(base.files().collect::<Vec<_>>(), vec![FileIndex(0)]);
    }

    #[test]
    fn chunk_all_carries_cache_flag() {
        let arrays = row();
        let planner = ChunkPlanner::new(&arrays, ChunkConfig::default()).unwrap();
        let mut query = Query::new(Region::All);
        let chunks: Vec<DataChunk> = planner.chunk_all(&mut query, true).unwrap().collect();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].cache());
        // 4 roots of 64 cells, minus 8 root cells covered by the child, plus 64.
        assert_eq!(chunks[0].cell_count(), 4 * 64 - 8 + 64);
    }

    #[test]
    fn spatial_orders_by_level() {
        let arrays = row();
        let planner = ChunkPlanner::new(&arrays, ChunkConfig::default()).unwrap();
        let mut query = Query::new(Region::All);
        let opts = SpatialOptions {
            order: Some(LevelOrder::Descending),
            ..SpatialOptions::default()
        };
        let grids: Vec<GridId> = planner
            .chunk_spatial(&mut query, opts)
            .unwrap()
            .map(|c| c.unwrap().grids().next().unwrap())
            .collect();
        assert_eq!(grids[0], GridId(4));
        assert_eq!(grids.len(), 5);
    }

    #[test]
    fn ghost_views_disable_caching() {
        let arrays = row();
        let planner = ChunkPlanner::new(&arrays, ChunkConfig::default()).unwrap();
        let mut query = Query::new(Region::All);
        let opts = SpatialOptions {
            ghost_width: 1,
            cache: true,
            ..SpatialOptions::default()
        };
        for chunk in planner.chunk_spatial(&mut query, opts).unwrap() {
            let chunk = chunk.unwrap();
            assert!(!chunk.cache());
            let ghost = chunk.ghosts().next().unwrap();
            assert_eq!(ghost.dimensions, [6, 6, 6]);
        }
    }

    #[test]
    fn io_batches_respect_sizing() {
        let arrays = row();
        let planner = ChunkPlanner::new(&arrays, ChunkConfig::default()).unwrap();
        let mut query = Query::new(Region::All);
        let sizes: Vec<usize> = planner
            .chunk_io_with(&mut query, IoOptions::default(), ChunkSizing::JustOne)
            .unwrap()
            .map(|c| c.unwrap().grids().count())
            .collect();
        assert_eq!(sizes, vec![1; 5]);
    }

    #[test]
    fn nested_io_within_spatial_chunk() {
        let arrays = row();
        let planner = ChunkPlanner::new(&arrays, ChunkConfig::default()).unwrap();
        let mut query = Query::new(Region::All);
        let first = planner
            .chunk_spatial(&mut query, SpatialOptions::default())
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        let mut inner = query.within(first.clone());
        let io: Vec<u64> = planner
            .chunk_io(&mut inner, IoOptions::default())
            .unwrap()
            .map(|c| c.unwrap().cell_count())
            .collect();
        assert_eq!(io, vec![first.cell_count()]);
    }

    #[test]
    fn base_files_skip_grids_without_selected_cells() {
        let arrays = row();
        let planner = ChunkPlanner::new(&arrays, ChunkConfig::default()).unwrap();
        // Root 2 only shares the face at x = 2 with the box.
        let mut query = Query::new(Region::Box(Bounds::new([1.8, 0.0, 0.0], [2.0, 1.0, 1.0])));
        let base = planner.identify_base_chunk(&mut query).unwrap();
        assert_eq!(base.cell_count(), 16);
        assert_eq!(base.files().collect::<Vec<_>>(), vec![FileIndex(0)]);
    }

    #[test]
    fn chunk_from_another_query_is_recounted() {
        let arrays = row();
        let planner = ChunkPlanner::new(&arrays, ChunkConfig::default()).unwrap();
        let mut everything = Query::new(Region::All);
        let first = planner
            .chunk_spatial(&mut everything, SpatialOptions::default())
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(first.grids().collect::<Vec<_>>(), vec![GridId(0)]);
        assert_eq!(first.cell_count(), 64);

        let slab = Query::new(Region::Box(Bounds::new([0.3, 0.0, 0.0], [0.45, 0.4, 1.0])));
        let mut inner = slab.within(first.clone());
        assert_eq!(inner.size(), None);
        let all: Vec<DataChunk> = planner.chunk_all(&mut inner, false).unwrap().collect();
        // One x column, two y rows, every z.
        assert_eq!(all[0].cell_count(), 8);
        assert_eq!(inner.size(), Some(8));
        let io: u64 = planner
            .chunk_io(&mut inner, IoOptions::default())
            .unwrap()
            .map(|c| c.unwrap().cell_count())
            .sum();
        assert_eq!(io, 8);

        let corner = Query::new(Region::Box(Bounds::new([0.0; 3], [0.05; 3])));
        let mut inner = corner.within(first);
        let io: u64 = planner
            .chunk_io(&mut inner, IoOptions::default())
            .unwrap()
            .map(|c| c.unwrap().cell_count())
            .sum();
        assert_eq!(io, 0);
        assert_eq!(inner.size(), Some(0));
    }

    #[test]
    fn unknown_file_objects_are_input_errors() {
        let arrays = row();
        let planner = ChunkPlanner::new(&arrays, ChunkConfig::default()).unwrap();
        let bogus = DataChunk::new(
            ChunkKind::All,
            vec![ChunkObject::File(FileIndex(9))],
            0,
            false,
            None,
        );
        let mut query = Query::new(Region::All).within(bogus);
        let err = planner
            .chunk_spatial(&mut query, SpatialOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ChunkError::Input(InputError::UnknownFile { file: FileIndex(9) })
        ));
    }
}
