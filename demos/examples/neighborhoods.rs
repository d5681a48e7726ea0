// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Neighborhood join.
//!
//! Pair every well with the roads passing within a distance of it.
//!
//! Run:
//! - `cargo run -p tilebox_demos --example neighborhoods`

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tilebox_tree::{Aabb2D, BoxTree, BoxTreeOptions};

fn main() {
    env_logger::init();

    let mut rng = StdRng::seed_from_u64(1);
    let options = BoxTreeOptions::default().with_max_elements_per_tile(16);

    let wells = BoxTree::from_entries(
        (0..200).map(|i| {
            let x = rng.random_range(0.0..1000.0);
            let y = rng.random_range(0.0..1000.0);
            (Aabb2D::from_point([x, y]), format!("well-{i}"))
        }),
        options,
    )
    .unwrap();

    let roads = BoxTree::from_entries(
        (0..100).map(|i| {
            let x = rng.random_range(0.0..1000.0);
            let y = rng.random_range(0.0..1000.0);
            let bbox = if i % 2 == 0 {
                Aabb2D::new(x, y, x + rng.random_range(10.0..200.0), y + 2.0)
            } else {
                Aabb2D::new(x, y, x + 2.0, y + rng.random_range(10.0..200.0))
            };
            (bbox, i)
        }),
        options,
    )
    .unwrap();

    log::info!("joining {} wells with {} roads", wells.len(), roads.len());
    let distance = 15.0;
    let mut paired = 0;
    for n in wells.neighborhoods(&roads, distance, None).unwrap() {
        paired += 1;
        let mut ids: Vec<_> = n.neighbours.iter().map(|r| *r.value()).collect();
        ids.sort_unstable();
        println!("{} near roads {ids:?}", n.entry.value());
    }
    println!("{paired} of {} wells lie within {distance} of a road", wells.len());

    // Restrict the join to one quadrant.
    let quadrant = Aabb2D::new(0.0, 0.0, 500.0, 500.0);
    let count = wells
        .neighborhoods(&roads, distance, Some(&quadrant))
        .unwrap()
        .count();
    println!("{count} of them in the lower left quadrant");
}
