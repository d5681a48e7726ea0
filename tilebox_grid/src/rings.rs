// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ring-ordered traversal of the tiles around a center tile.
//!
//! Tiles are grouped into Manhattan rings: ring `k` holds every tile whose east and north
//! offsets from the center add up to `k`. Under the Manhattan metric the rings are already
//! in order. Under the Euclidean metric a tile in ring `k` can be closer than a tile in ring
//! `k - 1`, so tiles are buffered in a min-heap and only released once no later ring can
//! produce anything closer.

use core::cmp::{Ordering, Reverse};
use core::f64::consts::SQRT_2;
use std::collections::BinaryHeap;

use crate::error::{Error, Result};
use crate::tile_utils::{euclidean_tile_distance2, manhattan_tile_distance};
use crate::tiling::{DistanceMetric, TileIndex, TileRange, TilingDefinition};

/// Relative slack applied to the ring lower bound before releasing buffered tiles.
const BOUND_SLACK: f64 = 1.0 - 1e-9;

/// Tiles at Manhattan distance exactly `k` from `center`.
///
/// Each ring is walked from the north axis towards the east axis, emitting the four
/// quadrant images of every offset, and only two images for offsets on an axis.
pub fn manhattan_ring(center: TileIndex, k: u32) -> ManhattanRing {
    let k = i32::try_from(k).unwrap_or(i32::MAX);
    ManhattanRing {
        center,
        k,
        dx: 0,
        pending: [center; 4],
        len: 0,
        pos: 0,
        done: false,
    }
}

/// Iterator returned by [`manhattan_ring`].
#[derive(Clone, Debug)]
pub struct ManhattanRing {
    center: TileIndex,
    k: i32,
    dx: i32,
    pending: [TileIndex; 4],
    len: usize,
    pos: usize,
    done: bool,
}

impl ManhattanRing {
    fn refill(&mut self) -> bool {
        if self.done {
            return false;
        }
        let c = self.center;
        if self.k == 0 {
            self.pending[0] = c;
            self.len = 1;
            self.done = true;
        } else {
            let dx = self.dx;
            let dy = self.k - dx;
            if dx == 0 {
                self.pending[0] = c.offset(0, dy);
                self.pending[1] = c.offset(0, -dy);
                self.len = 2;
            } else if dy == 0 {
                self.pending[0] = c.offset(dx, 0);
                self.pending[1] = c.offset(-dx, 0);
                self.len = 2;
            } else {
                self.pending = [
                    c.offset(dx, dy),
                    c.offset(-dx, dy),
                    c.offset(dx, -dy),
                    c.offset(-dx, -dy),
                ];
                self.len = 4;
            }
            if dx == self.k {
                self.done = true;
            } else {
                self.dx += 1;
            }
        }
        self.pos = 0;
        true
    }
}

impl Iterator for ManhattanRing {
    type Item = TileIndex;

    fn next(&mut self) -> Option<TileIndex> {
        if self.pos == self.len && !self.refill() {
            return None;
        }
        let tile = self.pending[self.pos];
        self.pos += 1;
        Some(tile)
    }
}

#[derive(Copy, Clone, Debug)]
struct RingTile {
    distance: f64,
    tile: TileIndex,
}

impl PartialEq for RingTile {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RingTile {}

impl PartialOrd for RingTile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RingTile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.tile.east.cmp(&other.tile.east))
            .then_with(|| self.tile.north.cmp(&other.tile.north))
    }
}

/// The largest Manhattan ring around `center` that still reaches a tile of `envelope`.
pub fn last_ring_touching(center: TileIndex, envelope: &TileRange) -> u32 {
    envelope
        .corners()
        .into_iter()
        .map(|corner| manhattan_tile_distance(center, corner))
        .max()
        .map_or(0, |d| u32::try_from(d).unwrap_or(u32::MAX))
}

/// Tiles around a center tile, nearest first, paired with their distance.
///
/// Built by [`TilingDefinition::tiles_around`] and by the grid indexes.
#[derive(Clone, Debug)]
pub struct TilesAround {
    center: TileIndex,
    metric: DistanceMetric,
    tile_width: f64,
    tile_height: f64,
    max_distance: f64,
    next_ring: u32,
    last_ring: u32,
    rings_done: bool,
    current: Option<ManhattanRing>,
    heap: BinaryHeap<Reverse<RingTile>>,
}

impl TilesAround {
    /// Walk around `center`.
    ///
    /// Rings beyond `last_ring` are never visited, and neither are tiles farther than
    /// `max_distance`.
    pub fn new(
        tiling: &TilingDefinition,
        center: TileIndex,
        metric: DistanceMetric,
        max_distance: Option<f64>,
        last_ring: Option<u32>,
    ) -> Result<Self> {
        if metric == DistanceMetric::Chebyshev {
            return Err(Error::NotImplemented("Chebyshev ring traversal"));
        }
        let max_distance = match max_distance {
            Some(d) if d.is_nan() || d < 0.0 => return Err(Error::InvalidDistance(d)),
            Some(d) => d,
            None => f64::INFINITY,
        };
        let by_distance = ring_limit(
            metric,
            max_distance,
            tiling.tile_width().min(tiling.tile_height()),
        );
        let last_ring = last_ring
            .unwrap_or(u32::MAX)
            .min(by_distance)
            .min(i32::MAX.unsigned_abs());
        Ok(Self {
            center,
            metric,
            tile_width: tiling.tile_width(),
            tile_height: tiling.tile_height(),
            max_distance,
            next_ring: 0,
            last_ring,
            rings_done: false,
            current: None,
            heap: BinaryHeap::new(),
        })
    }

    /// The tile the walk started from.
    pub fn center(&self) -> TileIndex {
        self.center
    }

    fn euclidean(&self, tile: TileIndex) -> f64 {
        euclidean_tile_distance2(self.center, tile, self.tile_width, self.tile_height).sqrt()
    }

    /// Lower bound of the Euclidean distance of any tile in ring `k`.
    fn ring_lower_bound(&self, k: u32) -> f64 {
        self.tile_width.min(self.tile_height) * f64::from(k) / SQRT_2 * BOUND_SLACK
    }

    fn advance_ring(&mut self) -> Option<ManhattanRing> {
        if self.rings_done {
            return None;
        }
        let ring = manhattan_ring(self.center, self.next_ring);
        if self.next_ring >= self.last_ring {
            self.rings_done = true;
        } else {
            self.next_ring += 1;
        }
        Some(ring)
    }

    fn next_manhattan(&mut self) -> Option<(TileIndex, f64)> {
        loop {
            if let Some(ring) = self.current.as_mut() {
                if let Some(tile) = ring.next() {
                    #[allow(
                        clippy::cast_precision_loss,
                        reason = "ring distances stay far below 2^52"
                    )]
                    let d = manhattan_tile_distance(self.center, tile) as f64;
                    return Some((tile, d));
                }
            }
            self.current = Some(self.advance_ring()?);
        }
    }

    fn next_euclidean(&mut self) -> Option<(TileIndex, f64)> {
        loop {
            if let Some(Reverse(top)) = self.heap.peek() {
                if self.rings_done || top.distance < self.ring_lower_bound(self.next_ring) {
                    let top = *top;
                    self.heap.pop();
                    return Some((top.tile, top.distance));
                }
            } else if self.rings_done {
                return None;
            }
            let ring = self.advance_ring()?;
            for tile in ring {
                let distance = self.euclidean(tile);
                if distance <= self.max_distance {
                    self.heap.push(Reverse(RingTile { distance, tile }));
                }
            }
        }
    }
}

impl Iterator for TilesAround {
    type Item = (TileIndex, f64);

    fn next(&mut self) -> Option<Self::Item> {
        match self.metric {
            DistanceMetric::Manhattan => self.next_manhattan(),
            DistanceMetric::Euclidean => self.next_euclidean(),
            DistanceMetric::Chebyshev => None,
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "the ring count is clamped to the u32 range first"
)]
fn ring_limit(metric: DistanceMetric, max_distance: f64, min_tile_size: f64) -> u32 {
    let rings = match metric {
        DistanceMetric::Manhattan => max_distance.floor(),
        _ => (max_distance * SQRT_2 / min_tile_size).floor() + 1.0,
    };
    rings.min(f64::from(u32::MAX)) as u32
}
