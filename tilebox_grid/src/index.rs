// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sequential grid hash index.

use core::borrow::BorrowMut;
use core::fmt::{self, Debug};
use core::hash::Hash;
use core::slice;
use std::borrow::Cow;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::grid_index::{GridIndex, TileGroup, TileKey};
use crate::rings::{TilesAround, last_ring_touching};
use crate::tiling::{DistanceMetric, TileIndex, TileRange, TileRangeIter, TilingDefinition};
use crate::types::Aabb2D;

/// Grid hash index keyed by [`TileIndex`].
pub type SpatialHashIndex<T> = HashGridIndex<T, TileIndex>;

/// A uniform grid mapping each tile to the identifiers whose boxes touch it.
///
/// The key type `K` controls how tiles are hashed; see [`SpatialHashIndex`] and
/// [`IntSpatialHashIndex`](crate::IntSpatialHashIndex).
///
/// Tiles emptied by removal stay in the map. The occupied-tile envelope only grows
/// until [`HashGridIndex::clear`].
pub struct HashGridIndex<T, K: TileKey = TileIndex> {
    tiling: TilingDefinition,
    tiles: FxHashMap<K, Vec<T>>,
    envelope: Option<TileRange>,
}

impl<T, K: TileKey> HashGridIndex<T, K>
where
    T: Clone + Eq + Hash,
{
    /// Create an empty index over `tiling`.
    pub fn new(tiling: TilingDefinition) -> Self {
        Self {
            tiling,
            tiles: FxHashMap::default(),
            envelope: None,
        }
    }

    /// Create an empty index with square tiles anchored at the origin.
    pub fn with_tile_size(tile_size: f64) -> Result<Self> {
        Ok(Self::new(TilingDefinition::square(tile_size)?))
    }

    /// The tiling used by this index.
    pub fn tiling(&self) -> &TilingDefinition {
        &self.tiling
    }

    /// Record `id` in every tile touched by `bbox`.
    pub fn insert(&mut self, id: T, bbox: &Aabb2D) -> Result<()> {
        if !bbox.is_valid() {
            log::warn!("rejected identifier with invalid box {bbox:?}");
            return Err(Error::InvalidBox);
        }
        let range = self.tiling.tile_range(bbox);
        for tile in range {
            self.tiles.entry(K::from_tile(tile)).or_default().push(id.clone());
        }
        self.grow_envelope(&range);
        Ok(())
    }

    /// Record `id` in the tile owning the point `(x, y)`.
    pub fn insert_point(&mut self, id: T, x: f64, y: f64) -> Result<()> {
        self.insert(id, &Aabb2D::new(x, y, x, y))
    }

    /// Remove one occurrence of `id` from every tile touched by `bbox`.
    ///
    /// Returns whether anything was removed.
    pub fn remove(&mut self, id: &T, bbox: &Aabb2D) -> bool {
        if !bbox.is_valid() {
            return false;
        }
        let mut found = false;
        for tile in self.tiling.tile_range(bbox) {
            if let Some(ids) = self.tiles.get_mut(&K::from_tile(tile)) {
                if let Some(pos) = ids.iter().position(|x| x == id) {
                    ids.remove(pos);
                    found = true;
                }
            }
        }
        found
    }

    /// Drop all tiles.
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.envelope = None;
    }

    /// Identifiers recorded in `tile`, in insertion order.
    pub fn identifiers_in(&self, tile: TileIndex) -> &[T] {
        self.tiles
            .get(&K::from_tile(tile))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of tiles present in the map, including tiles emptied by removal.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Range covering every tile that received an identifier.
    pub fn envelope(&self) -> Option<TileRange> {
        self.envelope
    }

    /// Identifiers recorded in the tiles touched by `bbox`, each reported once.
    pub fn find_identifiers(&self, bbox: &Aabb2D) -> Search<'_, T, K> {
        self.search_with(bbox, FxHashSet::default())
    }

    /// Like [`Self::find_identifiers`] but reuses a caller-owned de-duplication set.
    ///
    /// The set is cleared first. When the search is done it holds every reported identifier.
    pub fn find_identifiers_with<'a>(
        &'a self,
        bbox: &Aabb2D,
        seen: &'a mut FxHashSet<T>,
    ) -> Search<'a, T, K, &'a mut FxHashSet<T>> {
        seen.clear();
        self.search_with(bbox, seen)
    }

    fn search_with<S>(&self, bbox: &Aabb2D, seen: S) -> Search<'_, T, K, S>
    where
        S: BorrowMut<FxHashSet<T>>,
    {
        let range = match self.envelope {
            Some(envelope) if bbox.is_valid() => self.tiling.tile_range(bbox).clamp(&envelope),
            _ => None,
        };
        Search {
            tiles: &self.tiles,
            range: range.map(|r| r.iter()),
            current: slice::Iter::default(),
            seen,
        }
    }

    /// Occupied tiles around `(x, y)`, nearest first.
    ///
    /// The walk stops at the last ring that reaches the occupied envelope, or at
    /// `max_distance` when that comes first.
    pub fn find_tiles_around(
        &self,
        x: f64,
        y: f64,
        metric: DistanceMetric,
        max_distance: Option<f64>,
    ) -> Result<impl Iterator<Item = TileGroup<'_, T>> + '_> {
        let center = self.tiling.tile_index_at(x, y);
        let last_ring = self
            .envelope
            .map_or(0, |envelope| last_ring_touching(center, &envelope));
        let walk = TilesAround::new(&self.tiling, center, metric, max_distance, Some(last_ring))?;
        Ok(walk.filter_map(move |(tile, distance)| {
            let ids = self.tiles.get(&K::from_tile(tile))?;
            (!ids.is_empty()).then(|| TileGroup {
                tile,
                distance,
                identifiers: Cow::Borrowed(ids.as_slice()),
            })
        }))
    }

    fn grow_envelope(&mut self, range: &TileRange) {
        match self.envelope.as_mut() {
            Some(envelope) => {
                envelope.include(range.min);
                envelope.include(range.max);
            }
            None => self.envelope = Some(*range),
        }
    }
}

impl<T, K> GridIndex<T> for HashGridIndex<T, K>
where
    T: Clone + Eq + Hash,
    K: TileKey,
{
    fn tiling(&self) -> &TilingDefinition {
        &self.tiling
    }

    fn insert(&mut self, id: T, bbox: &Aabb2D) -> Result<()> {
        Self::insert(self, id, bbox)
    }

    fn remove(&mut self, id: &T, bbox: &Aabb2D) -> bool {
        Self::remove(self, id, bbox)
    }

    fn clear(&mut self) {
        Self::clear(self);
    }

    fn query_rect<'a>(&'a self, rect: &Aabb2D) -> Box<dyn Iterator<Item = T> + 'a>
    where
        T: 'a,
    {
        Box::new(self.find_identifiers(rect))
    }

    fn tiles_around<'a>(
        &'a self,
        x: f64,
        y: f64,
        metric: DistanceMetric,
        max_distance: Option<f64>,
    ) -> Result<Box<dyn Iterator<Item = TileGroup<'a, T>> + 'a>>
    where
        T: Clone + 'a,
    {
        Ok(Box::new(self.find_tiles_around(x, y, metric, max_distance)?))
    }
}

impl<T, K: TileKey> Debug for HashGridIndex<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: usize = self.tiles.values().map(Vec::len).sum();
        f.debug_struct("HashGridIndex")
            .field("tiling", &self.tiling)
            .field("tiles", &self.tiles.len())
            .field("entries", &entries)
            .field("envelope", &self.envelope)
            .finish_non_exhaustive()
    }
}

/// Lazy range query over a [`HashGridIndex`].
///
/// Walks the touched tiles one by one and skips identifiers already reported.
pub struct Search<'a, T, K: TileKey, S = FxHashSet<T>> {
    tiles: &'a FxHashMap<K, Vec<T>>,
    range: Option<TileRangeIter>,
    current: slice::Iter<'a, T>,
    seen: S,
}

impl<T, K, S> Iterator for Search<'_, T, K, S>
where
    T: Clone + Eq + Hash,
    K: TileKey,
    S: BorrowMut<FxHashSet<T>>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            for id in self.current.by_ref() {
                if self.seen.borrow_mut().insert(id.clone()) {
                    return Some(id.clone());
                }
            }
            let tile = self.range.as_mut()?.next()?;
            self.current = self
                .tiles
                .get(&K::from_tile(tile))
                .map_or_else(slice::Iter::default, |ids| ids.iter());
        }
    }
}

impl<T, K: TileKey, S> Debug for Search<'_, T, K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Search")
            .field("remaining_in_tile", &self.current.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> SpatialHashIndex<&'static str> {
        SpatialHashIndex::with_tile_size(10.0).unwrap()
    }

    #[test]
    fn spanning_identifier_reported_once() {
        let mut idx = index();
        idx.insert("A", &Aabb2D::new(2.0, 2.0, 12.0, 12.0)).unwrap();
        assert_eq!(idx.tile_count(), 4);
        let hits: Vec<_> = idx.find_identifiers(&Aabb2D::new(0.0, 0.0, 19.0, 19.0)).collect();
        assert_eq!(hits, vec!["A"]);
        let hits: Vec<_> = idx
            .find_identifiers(&Aabb2D::new(10.0, 10.0, 19.0, 19.0))
            .collect();
        assert_eq!(hits, vec!["A"]);
    }

    #[test]
    fn removal_leaves_empty_tiles() {
        let mut idx = index();
        let b = Aabb2D::new(2.0, 2.0, 12.0, 12.0);
        idx.insert("A", &b).unwrap();
        idx.insert("B", &Aabb2D::new(3.0, 3.0, 4.0, 4.0)).unwrap();
        assert!(idx.remove(&"A", &b));
        assert!(!idx.remove(&"A", &b));
        assert_eq!(idx.tile_count(), 4);
        assert!(idx.identifiers_in(TileIndex::new(1, 1)).is_empty());
        assert_eq!(idx.identifiers_in(TileIndex::new(0, 0)), &["B"]);
    }

    #[test]
    fn invalid_boxes() {
        let mut idx = index();
        assert_eq!(
            idx.insert("A", &Aabb2D::new(1.0, 0.0, 0.0, 1.0)),
            Err(Error::InvalidBox)
        );
        assert!(idx.envelope().is_none());
        idx.insert("A", &Aabb2D::new(0.0, 0.0, 1.0, 1.0)).unwrap();
        assert_eq!(
            idx.find_identifiers(&Aabb2D::new(f64::NAN, 0.0, 1.0, 1.0)).count(),
            0
        );
    }

    #[test]
    fn reused_set_is_cleared() {
        let mut idx = index();
        idx.insert_point("P", 1.0, 1.0).unwrap();
        idx.insert_point("Q", 25.0, 1.0).unwrap();
        let mut seen = FxHashSet::default();
        let first: Vec<_> = idx
            .find_identifiers_with(&Aabb2D::new(0.0, 0.0, 5.0, 5.0), &mut seen)
            .collect();
        assert_eq!(first, vec!["P"]);
        let second: Vec<_> = idx
            .find_identifiers_with(&Aabb2D::new(20.0, 0.0, 30.0, 5.0), &mut seen)
            .collect();
        assert_eq!(second, vec!["Q"]);
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn nearest_tiles_skip_empty_ones() {
        let mut idx = index();
        idx.insert_point("near", 15.0, 5.0).unwrap();
        idx.insert_point("far", 45.0, 35.0).unwrap();
        let groups: Vec<_> = idx
            .find_tiles_around(5.0, 5.0, DistanceMetric::Manhattan, None)
            .unwrap()
            .collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].tile, TileIndex::new(1, 0));
        assert_eq!(groups[0].distance, 1.0);
        assert_eq!(groups[0].identifiers.as_ref(), &["near"]);
        assert_eq!(groups[1].tile, TileIndex::new(4, 3));
        assert_eq!(groups[1].distance, 7.0);
    }

    #[test]
    fn nearest_tiles_on_empty_index() {
        let idx = index();
        let groups = idx
            .find_tiles_around(0.0, 0.0, DistanceMetric::Euclidean, None)
            .unwrap();
        assert_eq!(groups.count(), 0);
        assert!(
            idx.find_tiles_around(0.0, 0.0, DistanceMetric::Chebyshev, None)
                .is_err()
        );
    }
}
