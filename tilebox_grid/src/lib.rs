// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tilebox Grid: uniform tiling and grid hash indexes over 2D boxes.
//!
//! - [`TilingDefinition`] maps points and boxes to integer [`TileIndex`] cells. A point on a
//!   tile's lower or left edge belongs to that tile.
//! - [`SpatialHashIndex`] and [`IntSpatialHashIndex`] record identifiers in every tile their
//!   box touches and answer range queries without duplicates.
//! - `ParallelSpatialHashIndex` (feature `parallel`, on by default) does the same behind a
//!   concurrent tile map so that loading and querying can happen from many threads.
//! - Nearest-tile searches walk the tiles around a point ring by ring, nearest first,
//!   under the Manhattan or Euclidean metric.
//!
//! The same [`Aabb`] type is shared with the box tree in `tilebox_tree`.
//!
//! # Example
//!
//! ```rust
//! use tilebox_grid::{Aabb2D, DistanceMetric, SpatialHashIndex};
//!
//! let mut index = SpatialHashIndex::with_tile_size(10.0).unwrap();
//! index.insert("A", &Aabb2D::new(2.0, 2.0, 12.0, 12.0)).unwrap();
//! index.insert("B", &Aabb2D::new(31.0, 1.0, 32.0, 2.0)).unwrap();
//!
//! // "A" spans four tiles but is reported once.
//! let hits: Vec<_> = index.find_identifiers(&Aabb2D::new(0.0, 0.0, 19.0, 19.0)).collect();
//! assert_eq!(hits, vec!["A"]);
//!
//! // Occupied tiles around a point, nearest first.
//! let nearest: Vec<_> = index
//!     .find_tiles_around(35.0, 5.0, DistanceMetric::Euclidean, None)
//!     .unwrap()
//!     .map(|group| group.tile)
//!     .collect();
//! assert_eq!(nearest.first().map(|t| (t.east, t.north)), Some((3, 0)));
//! ```

pub mod error;
pub mod grid_index;
pub mod index;
pub mod int_index;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod rings;
pub mod tile_utils;
pub mod tiling;
pub mod types;

pub use error::{Error, Result};
pub use grid_index::{GridIndex, TileGroup, TileKey};
pub use index::{HashGridIndex, Search, SpatialHashIndex};
pub use int_index::{IntSpatialHashIndex, PackedTile};
#[cfg(feature = "parallel")]
pub use parallel::ParallelSpatialHashIndex;
pub use rings::{ManhattanRing, TilesAround, manhattan_ring};
pub use tile_utils::{euclidean_tile_distance2, manhattan_tile_distance, tile_distance};
pub use tiling::{DistanceMetric, TileIndex, TileRange, TileRangeIter, TilingDefinition};
pub use types::{Aabb, Aabb2D};
