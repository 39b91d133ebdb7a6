//! Integration test: concurrent read access to a built index.
//!
//! Several threads share one `GridTree`, each with its own selector,
//! and report their results over a channel. Every reader must see the
//! same counts and point locations as a single-threaded run.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::unbounded;
use patchwork_core::{Bounds, GridId};
use patchwork_index::{GridTree, Region};
use patchwork_test_utils::fixtures::ten_grid_three_level;

const READERS: usize = 8;

fn regions() -> Vec<Region> {
    vec![
        Region::All,
        Region::Box(Bounds::new([0.1, 0.2, 0.3], [0.7, 0.8, 0.9])),
        Region::Sphere {
            center: [0.5; 3],
            radius: 0.3,
        },
    ]
}

fn counts(tree: &Arc<GridTree>) -> Vec<u64> {
    regions()
        .iter()
        .map(|region| {
            tree.selector(Arc::new(region.clone()), None)
                .unwrap()
                .count()
        })
        .collect()
}

#[test]
fn readers_agree_with_a_single_threaded_run() {
    let arrays = ten_grid_three_level().build();
    let tree = arrays.grid_tree();
    let expected = counts(&tree);
    let xs: Vec<f64> = (0..64).map(|i| (i as f64 + 0.5) / 64.0).collect();
    let expected_points = tree.find_points(&xs, &xs, &xs).unwrap();

    let (tx, rx) = unbounded();
    thread::scope(|s| {
        for reader in 0..READERS {
            let tx = tx.clone();
            let tree = Arc::clone(&tree);
            let xs = &xs;
            s.spawn(move || {
                let points = tree.find_points(xs, xs, xs).unwrap();
                tx.send((reader, counts(&tree), points)).unwrap();
            });
        }
    });
    drop(tx);

    let mut seen = 0;
    for (_, got, points) in rx.iter() {
        assert_eq!(got, expected);
        assert_eq!(points, expected_points);
        seen += 1;
    }
    assert_eq!(seen, READERS);
}

#[test]
fn diagonal_points_descend_through_every_level() {
    let arrays = ten_grid_three_level().build();
    let tree = arrays.grid_tree();
    let found = tree
        .find_points(&[0.01, 0.99], &[0.01, 0.99], &[0.01, 0.99])
        .unwrap();
    assert_eq!(found, vec![Some(GridId(6)), Some(GridId(9))]);
}
