//! Query objects: a predicate plus the chunk it is currently scoped to.

use std::fmt;
use std::sync::Arc;

use patchwork_index::Predicate;

use crate::chunk::DataChunk;

/// A selection to be chunked.
///
/// The first strategy run against a query counts the selection and
/// caches the resulting base chunk here, so later strategies reuse the
/// memoized selector instead of recounting.
#[derive(Clone)]
pub struct Query {
    predicate: Arc<dyn Predicate>,
    size: Option<u64>,
    current: Option<DataChunk>,
}

impl Query {
    /// A fresh query over `predicate`.
    pub fn new(predicate: impl Predicate + 'static) -> Self {
        Self::from_shared(Arc::new(predicate))
    }

    /// A fresh query over an already shared predicate.
    pub fn from_shared(predicate: Arc<dyn Predicate>) -> Self {
        Self {
            predicate,
            size: None,
            current: None,
        }
    }

    /// The same predicate, scoped to an existing chunk.
    ///
    /// Strategies run against the returned query only see the chunk's
    /// objects, which is how chunks are nested (for example io chunks
    /// of a single spatial chunk). The chunk's count is only taken over
    /// when it was counted for this predicate; otherwise
    /// [`size`](Self::size) stays unset until a strategy recounts it.
    pub fn within(&self, chunk: DataChunk) -> Self {
        let size = chunk
            .selector()
            .filter(|s| s.is_bound_to(&self.predicate))
            .map(|_| chunk.cell_count());
        Self {
            predicate: Arc::clone(&self.predicate),
            size,
            current: Some(chunk),
        }
    }

    /// The selection predicate.
    pub fn predicate(&self) -> &dyn Predicate {
        self.predicate.as_ref()
    }

    pub(crate) fn shared_predicate(&self) -> Arc<dyn Predicate> {
        Arc::clone(&self.predicate)
    }

    /// Selected cells, once counted.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// The chunk this query is scoped to, once identified.
    pub fn current_chunk(&self) -> Option<&DataChunk> {
        self.current.as_ref()
    }

    pub(crate) fn set_base(&mut self, size: u64, chunk: DataChunk) {
        self.size = Some(size);
        self.current = Some(chunk);
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("predicate", &self.predicate)
            .field("size", &self.size)
            .field("current", &self.current.as_ref().map(|c| c.kind()))
            .finish()
    }
}
