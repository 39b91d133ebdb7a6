//! Standard hierarchies for tests and benchmarks.
//!
//! - [`three_coarse_two_fine`]: three 8³ roots in a row, two 4³ children.
//! - [`ten_grid_three_level`]: 10 grids over 3 levels, spread over 3 files.
//! - [`adjacent_leaves`]: two roots sharing the face x = 0.5.
//! - [`uniform_roots`]: an n×n×n block of equal roots in one file.

use patchwork_core::{Domain, GridId};
use patchwork_index::GridRecord;

use crate::MemorySource;

/// Three level-0 grids of 8³ cells along x and two level-1 grids of 4³.
///
/// Domain `[0,3]×[0,1]×[0,1]` with 24×8×8 root cells.
pub fn three_coarse_two_fine() -> MemorySource {
    let domain = Domain::new([0.0; 3], [3.0, 1.0, 1.0], [24, 8, 8]);
    let mut records: Vec<GridRecord> = (0..3)
        .map(|i| {
            let x = i as f64;
            GridRecord::new(0, [x, 0.0, 0.0], [x + 1.0, 1.0, 1.0], [8, 8, 8])
                .with_filename("data.cpu0000")
                .with_particles(10 * (i + 1))
        })
        .collect();
    records.push(
        GridRecord::new(1, [0.0; 3], [0.25; 3], [4, 4, 4])
            .with_parent(GridId(0))
            .with_filename("data.cpu0001"),
    );
    records.push(
        GridRecord::new(1, [2.5, 0.5, 0.5], [2.75, 0.75, 0.75], [4, 4, 4])
            .with_parent(GridId(2))
            .with_filename("data.cpu0001"),
    );
    MemorySource::new(domain, records)
}

/// Ten grids over three levels of a unit domain with 16³ root cells.
///
/// Grid `n` is stored in `output.cpu000{n % 3}`.
pub fn ten_grid_three_level() -> MemorySource {
    let domain = Domain::new([0.0; 3], [1.0; 3], [16, 16, 16]);
    let raw: [(u32, [f64; 3], [f64; 3], [u32; 3], Option<u32>); 10] = [
        // Level 0: two halves along x.
        (0, [0.0, 0.0, 0.0], [0.5, 1.0, 1.0], [8, 16, 16], None),
        (0, [0.5, 0.0, 0.0], [1.0, 1.0, 1.0], [8, 16, 16], None),
        // Level 1: dds = 1/32.
        (1, [0.0, 0.0, 0.0], [0.25, 0.5, 0.5], [8, 16, 16], Some(0)),
        (1, [0.25, 0.5, 0.5], [0.5, 1.0, 1.0], [8, 16, 16], Some(0)),
        (1, [0.5, 0.0, 0.0], [0.75, 0.25, 0.25], [8, 8, 8], Some(1)),
        (1, [0.75, 0.75, 0.75], [1.0, 1.0, 1.0], [8, 8, 8], Some(1)),
        // Level 2: dds = 1/64.
        (2, [0.0, 0.0, 0.0], [0.125, 0.125, 0.125], [8, 8, 8], Some(2)),
        (2, [0.125, 0.25, 0.0], [0.25, 0.5, 0.125], [8, 16, 8], Some(2)),
        (2, [0.5, 0.0, 0.0], [0.625, 0.125, 0.125], [8, 8, 8], Some(4)),
        (2, [0.875, 0.875, 0.875], [1.0, 1.0, 1.0], [8, 8, 8], Some(5)),
    ];
    let records = raw
        .iter()
        .enumerate()
        .map(|(slot, &(level, left, right, dims, parent))| {
            let mut record = GridRecord::new(level, left, right, dims)
                .with_filename(format!("output.cpu{:04}", slot % 3))
                .with_particles(slot as u64)
                .with_id_offset(1);
            record.parent = parent.map(GridId);
            record
        })
        .collect();
    MemorySource::new(domain, records)
}

/// Two 4×8×8 roots meeting at x = 0.5, in separate files.
pub fn adjacent_leaves() -> MemorySource {
    let domain = Domain::new([0.0; 3], [1.0; 3], [8, 8, 8]);
    MemorySource::new(
        domain,
        vec![
            GridRecord::new(0, [0.0; 3], [0.5, 1.0, 1.0], [4, 8, 8]).with_filename("left.h5"),
            GridRecord::new(0, [0.5, 0.0, 0.0], [1.0; 3], [4, 8, 8]).with_filename("right.h5"),
        ],
    )
}

/// `n³` equal roots of `cells³` cells tiling the unit cube, all in one file.
pub fn uniform_roots(n: u32, cells: u32) -> MemorySource {
    let domain = Domain::new([0.0; 3], [1.0; 3], [n * cells; 3]);
    let w = 1.0 / n as f64;
    let mut records = Vec::with_capacity((n * n * n) as usize);
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                let left = [i as f64 * w, j as f64 * w, k as f64 * w];
                let right = [left[0] + w, left[1] + w, left[2] + w];
                records.push(
                    GridRecord::new(0, left, right, [cells; 3]).with_filename("snapshot.h5"),
                );
            }
        }
    }
    MemorySource::new(domain, records)
}
