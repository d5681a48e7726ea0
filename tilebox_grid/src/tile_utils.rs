// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Distances between tiles.

use crate::error::{Error, Result};
use crate::tiling::{DistanceMetric, TileIndex, TilingDefinition};

/// Sum of the absolute east and north offsets between two tiles.
pub fn manhattan_tile_distance(a: TileIndex, b: TileIndex) -> u64 {
    axis_steps(a.east, b.east) + axis_steps(a.north, b.north)
}

/// Squared Euclidean distance between the centers of two tiles of size `tile_width x tile_height`.
pub fn euclidean_tile_distance2(
    a: TileIndex,
    b: TileIndex,
    tile_width: f64,
    tile_height: f64,
) -> f64 {
    let dx = (f64::from(a.east) - f64::from(b.east)) * tile_width;
    let dy = (f64::from(a.north) - f64::from(b.north)) * tile_height;
    dx * dx + dy * dy
}

/// Distance between two tiles of `tiling` under `metric`.
///
/// Manhattan distances are in tile steps, Euclidean distances in world units.
pub fn tile_distance(
    tiling: &TilingDefinition,
    a: TileIndex,
    b: TileIndex,
    metric: DistanceMetric,
) -> Result<f64> {
    match metric {
        #[allow(
            clippy::cast_precision_loss,
            reason = "ring distances stay far below 2^52"
        )]
        DistanceMetric::Manhattan => Ok(manhattan_tile_distance(a, b) as f64),
        DistanceMetric::Euclidean => Ok(euclidean_tile_distance2(
            a,
            b,
            tiling.tile_width(),
            tiling.tile_height(),
        )
        .sqrt()),
        DistanceMetric::Chebyshev => Err(Error::NotImplemented("Chebyshev tile distance")),
    }
}

fn axis_steps(a: i32, b: i32) -> u64 {
    (i64::from(a) - i64::from(b)).unsigned_abs()
}
