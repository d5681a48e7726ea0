// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer tile addressing over a continuous plane.

use core::fmt;

use crate::error::{Error, Result};
use crate::rings::TilesAround;
use crate::types::Aabb2D;

/// Identifies one cell of a [`TilingDefinition`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex {
    /// Column, counted from the origin towards positive x.
    pub east: i32,
    /// Row, counted from the origin towards positive y.
    pub north: i32,
}

impl TileIndex {
    /// Create a tile index.
    pub const fn new(east: i32, north: i32) -> Self {
        Self { east, north }
    }

    /// The index shifted by the given number of tiles.
    ///
    /// Saturates at the bounds of `i32`.
    #[must_use]
    pub const fn offset(self, d_east: i32, d_north: i32) -> Self {
        Self {
            east: self.east.saturating_add(d_east),
            north: self.north.saturating_add(d_north),
        }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}/N{}", self.east, self.north)
    }
}

/// An inclusive rectangle of tile indices.
///
/// Iteration walks east-major: all rows of the first column, then the next column.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TileRange {
    /// Lower-left tile (inclusive).
    pub min: TileIndex,
    /// Upper-right tile (inclusive).
    pub max: TileIndex,
}

impl TileRange {
    /// Create a range; returns `None` when `min` is not lower-left of `max`.
    pub fn new(min: TileIndex, max: TileIndex) -> Option<Self> {
        (min.east <= max.east && min.north <= max.north).then_some(Self { min, max })
    }

    /// A range covering exactly one tile.
    pub const fn from_tile(tile: TileIndex) -> Self {
        Self {
            min: tile,
            max: tile,
        }
    }

    /// Number of columns.
    pub fn columns(&self) -> u64 {
        span(self.min.east, self.max.east)
    }

    /// Number of rows.
    pub fn rows(&self) -> u64 {
        span(self.min.north, self.max.north)
    }

    /// Number of tiles in the range.
    pub fn len(&self) -> u64 {
        self.columns() * self.rows()
    }

    /// Always `false`; a range covers at least one tile.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `tile` lies in the range.
    pub fn contains(&self, tile: TileIndex) -> bool {
        (self.min.east..=self.max.east).contains(&tile.east)
            && (self.min.north..=self.max.north).contains(&tile.north)
    }

    /// Grow the range to cover `tile`.
    pub fn include(&mut self, tile: TileIndex) {
        self.min.east = self.min.east.min(tile.east);
        self.min.north = self.min.north.min(tile.north);
        self.max.east = self.max.east.max(tile.east);
        self.max.north = self.max.north.max(tile.north);
    }

    /// The part of this range that also lies in `other`.
    pub fn clamp(&self, other: &Self) -> Option<Self> {
        Self::new(
            TileIndex::new(
                self.min.east.max(other.min.east),
                self.min.north.max(other.min.north),
            ),
            TileIndex::new(
                self.max.east.min(other.max.east),
                self.max.north.min(other.max.north),
            ),
        )
    }

    /// The four corner tiles.
    pub fn corners(&self) -> [TileIndex; 4] {
        [
            self.min,
            TileIndex::new(self.max.east, self.min.north),
            TileIndex::new(self.min.east, self.max.north),
            self.max,
        ]
    }

    /// Iterate all tiles in the range.
    pub fn iter(&self) -> TileRangeIter {
        TileRangeIter {
            range: *self,
            next: Some(self.min),
        }
    }
}

impl IntoIterator for TileRange {
    type Item = TileIndex;
    type IntoIter = TileRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn span(lo: i32, hi: i32) -> u64 {
    (i64::from(hi) - i64::from(lo) + 1).unsigned_abs()
}

/// Iterator over the tiles of a [`TileRange`].
#[derive(Clone, Debug)]
pub struct TileRangeIter {
    range: TileRange,
    next: Option<TileIndex>,
}

impl Iterator for TileRangeIter {
    type Item = TileIndex;

    fn next(&mut self) -> Option<TileIndex> {
        let current = self.next?;
        self.next = if current.north < self.range.max.north {
            Some(TileIndex::new(current.east, current.north + 1))
        } else if current.east < self.range.max.east {
            Some(TileIndex::new(current.east + 1, self.range.min.north))
        } else {
            None
        };
        Some(current)
    }
}

/// Metric used to order tiles around a location.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DistanceMetric {
    /// Straight-line distance between tile centers, in world units.
    #[default]
    Euclidean,
    /// Sum of the east and north offsets, in tile steps.
    Manhattan,
    /// Largest of the east and north offsets. Not supported for tile traversal.
    Chebyshev,
}

/// A uniform grid anchored at an origin.
///
/// Tile `(e, n)` covers `[origin_x + e*w, origin_x + (e+1)*w) x [origin_y + n*h, origin_y + (n+1)*h)`,
/// so a point on a tile's lower or left edge belongs to that tile.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TilingDefinition {
    origin_x: f64,
    origin_y: f64,
    tile_width: f64,
    tile_height: f64,
}

impl TilingDefinition {
    /// Create a tiling.
    ///
    /// Fails when the tile size is not positive and finite, or the origin is not finite.
    pub fn new(origin_x: f64, origin_y: f64, tile_width: f64, tile_height: f64) -> Result<Self> {
        let size_ok = tile_width.is_finite()
            && tile_height.is_finite()
            && tile_width > 0.0
            && tile_height > 0.0;
        if !size_ok {
            return Err(Error::InvalidTileSize {
                width: tile_width,
                height: tile_height,
            });
        }
        if !origin_x.is_finite() || !origin_y.is_finite() {
            return Err(Error::InvalidBox);
        }
        Ok(Self {
            origin_x,
            origin_y,
            tile_width,
            tile_height,
        })
    }

    /// Square tiles anchored at `(0, 0)`.
    pub fn square(tile_size: f64) -> Result<Self> {
        Self::new(0.0, 0.0, tile_size, tile_size)
    }

    /// X of the grid origin.
    pub fn origin_x(&self) -> f64 {
        self.origin_x
    }

    /// Y of the grid origin.
    pub fn origin_y(&self) -> f64 {
        self.origin_y
    }

    /// Width of one tile.
    pub fn tile_width(&self) -> f64 {
        self.tile_width
    }

    /// Height of one tile.
    pub fn tile_height(&self) -> f64 {
        self.tile_height
    }

    /// The tile owning the point `(x, y)`.
    pub fn tile_index_at(&self, x: f64, y: f64) -> TileIndex {
        TileIndex::new(
            floor_to_i32((x - self.origin_x) / self.tile_width),
            floor_to_i32((y - self.origin_y) / self.tile_height),
        )
    }

    /// The inclusive range of tiles touched by `bbox`.
    pub fn tile_range(&self, bbox: &Aabb2D) -> TileRange {
        TileRange {
            min: self.tile_index_at(bbox.min_x(), bbox.min_y()),
            max: self.tile_index_at(bbox.max_x(), bbox.max_y()),
        }
    }

    /// All tiles touched by `bbox`.
    pub fn intersecting_tiles(&self, bbox: &Aabb2D) -> TileRangeIter {
        self.tile_range(bbox).iter()
    }

    /// Tiles touched by `bbox` that also lie within `[min, max]`.
    ///
    /// Yields nothing when the two ranges are disjoint.
    pub fn intersecting_tiles_within(
        &self,
        bbox: &Aabb2D,
        min: TileIndex,
        max: TileIndex,
    ) -> impl Iterator<Item = TileIndex> + use<> {
        let limit = TileRange { min, max };
        self.tile_range(bbox).clamp(&limit).into_iter().flatten()
    }

    /// Number of tiles touched by `bbox`, without enumerating them.
    pub fn intersecting_tile_count(&self, bbox: &Aabb2D) -> u64 {
        self.tile_range(bbox).len()
    }

    /// Like [`Self::intersecting_tile_count`] but limited to `[min, max]`.
    pub fn intersecting_tile_count_within(
        &self,
        bbox: &Aabb2D,
        min: TileIndex,
        max: TileIndex,
    ) -> u64 {
        self.tile_range(bbox)
            .clamp(&TileRange { min, max })
            .map_or(0, |r| r.len())
    }

    /// World-space extent of a tile.
    pub fn tile_bounds(&self, tile: TileIndex) -> Aabb2D {
        let min_x = self.origin_x + f64::from(tile.east) * self.tile_width;
        let min_y = self.origin_y + f64::from(tile.north) * self.tile_height;
        Aabb2D::new(min_x, min_y, min_x + self.tile_width, min_y + self.tile_height)
    }

    /// World-space center of a tile.
    pub fn tile_center(&self, tile: TileIndex) -> [f64; 2] {
        [
            self.origin_x + (f64::from(tile.east) + 0.5) * self.tile_width,
            self.origin_y + (f64::from(tile.north) + 0.5) * self.tile_height,
        ]
    }

    /// Tiles around `(x, y)`, nearest first, paired with their distance from the center tile.
    ///
    /// `max_distance` is in tile steps for [`DistanceMetric::Manhattan`] and in world
    /// units for [`DistanceMetric::Euclidean`]. Without a maximum the sequence is unbounded.
    /// [`DistanceMetric::Chebyshev`] is rejected with [`Error::NotImplemented`].
    pub fn tiles_around(
        &self,
        x: f64,
        y: f64,
        metric: DistanceMetric,
        max_distance: Option<f64>,
    ) -> Result<TilesAround> {
        TilesAround::new(self, self.tile_index_at(x, y), metric, max_distance, None)
    }
}

impl fmt::Display for TilingDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "origin ({}, {}), tile size {} x {}",
            self.origin_x, self.origin_y, self.tile_width, self.tile_height
        )
    }
}

#[inline]
#[allow(
    clippy::cast_possible_truncation,
    reason = "tile indices saturate at the i32 range"
)]
fn floor_to_i32(v: f64) -> i32 {
    v.floor() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_left_edge_is_inclusive() {
        let t = TilingDefinition::square(10.0).unwrap();
        assert_eq!(t.tile_index_at(0.0, 0.0), TileIndex::new(0, 0));
        assert_eq!(t.tile_index_at(10.0, 9.999), TileIndex::new(1, 0));
        assert_eq!(t.tile_index_at(-0.001, -10.0), TileIndex::new(-1, -1));
    }

    #[test]
    fn rejects_bad_tile_size() {
        assert!(matches!(
            TilingDefinition::new(0.0, 0.0, 0.0, 1.0),
            Err(Error::InvalidTileSize { .. })
        ));
        assert!(TilingDefinition::new(0.0, 0.0, 1.0, -2.0).is_err());
        assert!(TilingDefinition::new(0.0, 0.0, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn box_spanning_four_tiles() {
        let t = TilingDefinition::square(10.0).unwrap();
        let b = Aabb2D::new(2.0, 2.0, 12.0, 12.0);
        let tiles: Vec<_> = t.intersecting_tiles(&b).collect();
        assert_eq!(
            tiles,
            vec![
                TileIndex::new(0, 0),
                TileIndex::new(0, 1),
                TileIndex::new(1, 0),
                TileIndex::new(1, 1)
            ]
        );
        assert_eq!(t.intersecting_tile_count(&b), 4);
        assert_eq!(
            t.intersecting_tile_count_within(&b, TileIndex::new(1, 0), TileIndex::new(5, 5)),
            2
        );
        let within: Vec<_> = t
            .intersecting_tiles_within(&b, TileIndex::new(3, 3), TileIndex::new(5, 5))
            .collect();
        assert!(within.is_empty());
    }

    #[test]
    fn bounds_and_center() {
        let t = TilingDefinition::new(100.0, -50.0, 4.0, 2.0).unwrap();
        let tile = t.tile_index_at(105.0, -49.0);
        assert_eq!(tile, TileIndex::new(1, 0));
        assert_eq!(t.tile_bounds(tile), Aabb2D::new(104.0, -50.0, 108.0, -48.0));
        assert_eq!(t.tile_center(tile), [106.0, -49.0]);
    }

    #[test]
    fn range_include_and_clamp() {
        let mut r = TileRange::from_tile(TileIndex::new(0, 0));
        r.include(TileIndex::new(-2, 3));
        assert_eq!(r.len(), 12);
        assert!(r.contains(TileIndex::new(-1, 2)));
        let other = TileRange::new(TileIndex::new(0, 1), TileIndex::new(4, 4)).unwrap();
        assert_eq!(
            r.clamp(&other),
            TileRange::new(TileIndex::new(0, 1), TileIndex::new(0, 3))
        );
        assert_eq!(r.iter().count(), 12);
    }
}
