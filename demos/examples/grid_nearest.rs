// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grid hash index and nearest tiles.
//!
//! Index points in a grid, list the occupied tiles around a location in
//! order of distance, and compare the tile counts of both metrics.
//!
//! Run:
//! - `cargo run -p tilebox_demos --example grid_nearest`

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tilebox_grid::{
    Aabb2D, DistanceMetric, SpatialHashIndex, TilingDefinition, manhattan_ring,
};

fn main() {
    env_logger::init();

    let tiling = TilingDefinition::new(0.0, 0.0, 10.0, 10.0).unwrap();
    let mut index = SpatialHashIndex::new(tiling);
    let mut rng = StdRng::seed_from_u64(42);
    for id in 0..500_u32 {
        let x = rng.random_range(0.0..200.0);
        let y = rng.random_range(0.0..200.0);
        index.insert_point(id, x, y).unwrap();
    }
    log::info!("indexed 500 points in {} tiles", index.tile_count());
    println!("{} occupied tiles, envelope {:?}", index.tile_count(), index.envelope());

    let (x, y) = (101.0, 57.0);
    for metric in [DistanceMetric::Euclidean, DistanceMetric::Manhattan] {
        println!("nearest tiles around ({x}, {y}) by {metric:?}:");
        for group in index.find_tiles_around(x, y, metric, Some(20.0)).unwrap().take(5) {
            println!(
                "  tile {:?} at {:.2}: {:?}",
                group.tile, group.distance, group.identifiers
            );
        }
    }

    let center = tiling.tile_index_at(x, y);
    println!("manhattan ring 2 around {center:?}:");
    for tile in manhattan_ring(center, 2) {
        println!("  {tile:?} -> {} ids", index.identifiers_in(tile).len());
    }

    let window = Aabb2D::new(90.0, 40.0, 120.0, 70.0);
    println!(
        "window {window:?} touches {} tiles and {} ids",
        tiling.intersecting_tile_count(&window),
        index.find_identifiers(&window).count()
    );

    if let Err(e) = index.find_tiles_around(x, y, DistanceMetric::Chebyshev, None) {
        println!("chebyshev: {e}");
    }
}
