//! The field I/O seam and scoped preload acquisition.
//!
//! Reading field data is outside this crate. The planner talks to it
//! through [`IoHandler`] at two points: batch-fetching a group of grids
//! ahead of spatial iteration, and preloading each io chunk for as long
//! as the consumer holds it.

use std::io;
use std::ops::Deref;

use patchwork_core::GridId;

use crate::chunk::DataChunk;

/// The external field I/O layer, as seen by the planner.
///
/// Errors are passed through to the chunk consumer unmodified; the
/// planner never retries.
pub trait IoHandler: Send + Sync {
    /// Whether [`fetch_grids`](Self::fetch_grids) does anything useful.
    fn preload_implemented(&self) -> bool {
        false
    }

    /// Eagerly read `fields` for every grid in `grids` in one pass.
    fn fetch_grids(&self, grids: &[GridId], fields: &[String]) -> io::Result<()> {
        let _ = (grids, fields);
        Ok(())
    }

    /// Acquire a preload covering `chunk`, holding at most `max_grids` grids.
    fn preload(&self, chunk: &DataChunk, fields: &[String], max_grids: u64) -> io::Result<()>;

    /// Release the preload acquired for `chunk`.
    fn release(&self, chunk: &DataChunk);
}

/// Handler that preloads nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopIo;

impl IoHandler for NoopIo {
    fn preload(&self, _chunk: &DataChunk, _fields: &[String], _max_grids: u64) -> io::Result<()> {
        Ok(())
    }

    fn release(&self, _chunk: &DataChunk) {}
}

/// An io chunk whose preload is held until this value is dropped.
///
/// Release happens in `Drop`, so it runs whether the consumer finishes
/// normally, returns early with an error, or unwinds. Drop it before
/// requesting another chunk that touches the same grids.
pub struct PreloadedChunk<'a> {
    chunk: DataChunk,
    io: &'a dyn IoHandler,
}

impl<'a> PreloadedChunk<'a> {
    pub(crate) fn new(chunk: DataChunk, io: &'a dyn IoHandler) -> Self {
        Self { chunk, io }
    }

    /// The chunk being held.
    pub fn chunk(&self) -> &DataChunk {
        &self.chunk
    }
}

impl Deref for PreloadedChunk<'_> {
    type Target = DataChunk;

    fn deref(&self) -> &DataChunk {
        &self.chunk
    }
}

impl Drop for PreloadedChunk<'_> {
    fn drop(&mut self) {
        self.io.release(&self.chunk);
    }
}

impl std::fmt::Debug for PreloadedChunk<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PreloadedChunk").field(&self.chunk).finish()
    }
}

/// Iterator adapter that batch-fetches fields for a whole grid group.
///
/// The fetch is issued once, when the first grid is requested, for
/// every grid the adapter will yield. A failed fetch is reported as a
/// single error item; iteration then continues over the grids without
/// preloaded data.
pub struct BatchPreload<'a> {
    grids: std::vec::IntoIter<GridId>,
    pending: Option<Vec<GridId>>,
    fields: Vec<String>,
    io: &'a dyn IoHandler,
}

impl<'a> BatchPreload<'a> {
    /// Wrap `grids`, fetching `fields` for all of them on first use.
    pub fn new(grids: Vec<GridId>, fields: Vec<String>, io: &'a dyn IoHandler) -> Self {
        Self {
            pending: Some(grids.clone()),
            grids: grids.into_iter(),
            fields,
            io,
        }
    }
}

impl Iterator for BatchPreload<'_> {
    type Item = io::Result<GridId>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(group) = self.pending.take() {
            if let Err(e) = self.io.fetch_grids(&group, &self.fields) {
                return Some(Err(e));
            }
        }
        self.grids.next().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkKind;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Log(Mutex<Vec<String>>);

    impl IoHandler for Log {
        fn fetch_grids(&self, grids: &[GridId], fields: &[String]) -> io::Result<()> {
            self.0
                .lock()
                .unwrap()
                .push(format!("fetch {} {}", grids.len(), fields.join(",")));
            Ok(())
        }
        fn preload(&self, _: &DataChunk, _: &[String], max: u64) -> io::Result<()> {
            self.0.lock().unwrap().push(format!("preload {max}"));
            Ok(())
        }
        fn release(&self, chunk: &DataChunk) {
            self.0
                .lock()
                .unwrap()
                .push(format!("release {}", chunk.cell_count()));
        }
    }

    #[test]
    fn batch_fetch_happens_once_up_front() {
        let log = Log::default();
        let grids = vec![GridId(0), GridId(3), GridId(5)];
        let out: Vec<GridId> = BatchPreload::new(grids.clone(), vec!["density".into()], &log)
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(out, grids);
        assert_eq!(*log.0.lock().unwrap(), vec!["fetch 3 density".to_string()]);
    }

    #[test]
    fn release_runs_on_unwind() {
        let log = Log::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let chunk = DataChunk::new(ChunkKind::Io, vec![], 42, true, None);
            let held = PreloadedChunk::new(chunk, &log);
            assert_eq!(held.cell_count(), 42);
            panic!("consumer failed");
        }));
        assert!(result.is_err());
        assert_eq!(*log.0.lock().unwrap(), vec!["release 42".to_string()]);
    }
}
