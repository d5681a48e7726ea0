// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Common surface of the grid hash indexes.

use core::fmt::Debug;
use core::hash::Hash;
use std::borrow::Cow;

use crate::error::Result;
use crate::tiling::{DistanceMetric, TileIndex, TilingDefinition};
use crate::types::Aabb2D;

/// Grid index abstraction shared by the sequential and parallel hash indexes.
///
/// An identifier is recorded in every tile its box touches. Queries report each
/// identifier at most once.
pub trait GridIndex<T> {
    /// The tiling that maps boxes to tiles.
    fn tiling(&self) -> &TilingDefinition;

    /// Record `id` in every tile touched by `bbox`.
    fn insert(&mut self, id: T, bbox: &Aabb2D) -> Result<()>;

    /// Remove one occurrence of `id` from every tile touched by `bbox`.
    ///
    /// Returns `false` when `id` was not found in any of those tiles.
    fn remove(&mut self, id: &T, bbox: &Aabb2D) -> bool;

    /// Drop all tiles.
    fn clear(&mut self);

    /// Identifiers recorded in any tile touched by `rect`, without duplicates.
    fn query_rect<'a>(&'a self, rect: &Aabb2D) -> Box<dyn Iterator<Item = T> + 'a>
    where
        T: 'a;

    /// Occupied tiles around `(x, y)`, nearest first.
    fn tiles_around<'a>(
        &'a self,
        x: f64,
        y: f64,
        metric: DistanceMetric,
        max_distance: Option<f64>,
    ) -> Result<Box<dyn Iterator<Item = TileGroup<'a, T>> + 'a>>
    where
        T: Clone + 'a;
}

/// The identifiers of one occupied tile, as reported by a nearest-tile search.
#[derive(Clone, Debug, PartialEq)]
pub struct TileGroup<'a, T: Clone> {
    /// The tile.
    pub tile: TileIndex,
    /// Distance from the tile containing the query point.
    pub distance: f64,
    /// Identifiers recorded in the tile, in insertion order.
    pub identifiers: Cow<'a, [T]>,
}

/// Hash map key used to address a tile.
pub trait TileKey: Copy + Eq + Hash + Debug + 'static {
    /// Encode a tile.
    fn from_tile(tile: TileIndex) -> Self;
    /// Decode the tile.
    fn tile(self) -> TileIndex;
}

impl TileKey for TileIndex {
    #[inline]
    fn from_tile(tile: TileIndex) -> Self {
        tile
    }

    #[inline]
    fn tile(self) -> TileIndex {
        self
    }
}
