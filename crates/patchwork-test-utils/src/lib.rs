//! Test utilities and mock types for patchwork development.
//!
//! Provides an in-memory [`GridSource`] ([`MemorySource`]), a set of
//! standard hierarchies in [`fixtures`], and a [`RecordingIo`] handler
//! that logs every preload, fetch and release the planner issues.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use patchwork_chunk::{DataChunk, IoHandler};
use patchwork_core::{Domain, FileIndex, GridId, HierarchyError};
use patchwork_index::{GridRecord, GridSource, HierarchyArrays};

/// A [`GridSource`] backed by a record vector.
///
/// `claimed_count` lets tests make the count pass disagree with the
/// parse pass.
#[derive(Clone, Debug)]
pub struct MemorySource {
    pub domain: Domain,
    pub records: Vec<GridRecord>,
    pub claimed_count: Option<usize>,
}

impl MemorySource {
    pub fn new(domain: Domain, records: Vec<GridRecord>) -> Self {
        Self {
            domain,
            records,
            claimed_count: None,
        }
    }

    /// Build the hierarchy, panicking on fixture errors.
    pub fn build(&self) -> HierarchyArrays {
        HierarchyArrays::build(self).expect("fixture hierarchy must build")
    }

    /// Shift every edge by a small deterministic amount per grid.
    ///
    /// Stays well below half a cell so locking recovers the lattice.
    pub fn with_drift(mut self, amplitude: f64) -> Self {
        for (slot, record) in self.records.iter_mut().enumerate() {
            let s = ((slot * 7 + 3) % 5) as f64 - 2.0;
            for a in 0..3 {
                let sign = if (slot + a) % 2 == 0 { 1.0 } else { -1.0 };
                record.left_edge[a] += sign * s * amplitude;
                record.right_edge[a] -= sign * (s + 1.0) * amplitude;
            }
        }
        self
    }
}

impl GridSource for MemorySource {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn count_grids(&self) -> Result<usize, HierarchyError> {
        Ok(self.claimed_count.unwrap_or(self.records.len()))
    }

    fn parse_grids(&self) -> Result<Vec<GridRecord>, HierarchyError> {
        Ok(self.records.clone())
    }
}

/// One call observed by [`RecordingIo`].
#[derive(Clone, Debug, PartialEq)]
pub enum IoEvent {
    Fetch {
        grids: Vec<GridId>,
        fields: Vec<String>,
    },
    Preload {
        files: Vec<FileIndex>,
        cell_count: u64,
        max_grids: u64,
    },
    Release {
        files: Vec<FileIndex>,
        cell_count: u64,
    },
}

/// Mock [`IoHandler`] that records calls and can inject failures.
#[derive(Debug, Default)]
pub struct RecordingIo {
    events: Mutex<Vec<IoEvent>>,
    batch_preload: bool,
    fail_preload_at: Option<usize>,
    fail_fetch: bool,
    preload_calls: AtomicUsize,
}

impl RecordingIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise batch preloading support.
    pub fn with_batch_preload(mut self) -> Self {
        self.batch_preload = true;
        self
    }

    /// Fail the `n`-th preload call (0-based).
    pub fn failing_preload_at(mut self, n: usize) -> Self {
        self.fail_preload_at = Some(n);
        self
    }

    /// Fail every batch fetch.
    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn events(&self) -> Vec<IoEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Preloads acquired minus preloads released.
    pub fn outstanding(&self) -> usize {
        let events = self.events.lock().unwrap();
        let acquired = events
            .iter()
            .filter(|e| matches!(e, IoEvent::Preload { .. }))
            .count();
        let released = events
            .iter()
            .filter(|e| matches!(e, IoEvent::Release { .. }))
            .count();
        acquired - released
    }

    fn record(&self, event: IoEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl IoHandler for RecordingIo {
    fn preload_implemented(&self) -> bool {
        self.batch_preload
    }

    fn fetch_grids(&self, grids: &[GridId], fields: &[String]) -> io::Result<()> {
        if self.fail_fetch {
            return Err(io::Error::other("fetch failed"));
        }
        self.record(IoEvent::Fetch {
            grids: grids.to_vec(),
            fields: fields.to_vec(),
        });
        Ok(())
    }

    fn preload(&self, chunk: &DataChunk, _fields: &[String], max_grids: u64) -> io::Result<()> {
        let call = self.preload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_preload_at == Some(call) {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("truncated file in preload {call}"),
            ));
        }
        self.record(IoEvent::Preload {
            files: chunk.files().collect(),
            cell_count: chunk.cell_count(),
            max_grids,
        });
        Ok(())
    }

    fn release(&self, chunk: &DataChunk) {
        self.record(IoEvent::Release {
            files: chunk.files().collect(),
            cell_count: chunk.cell_count(),
        });
    }
}
