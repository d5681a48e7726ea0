// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grid hash index that can be loaded and queried from several threads.

use core::fmt::{self, Debug};
use core::hash::Hash;
use std::borrow::Cow;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::{FxBuildHasher, FxHashSet};

use crate::error::{Error, Result};
use crate::grid_index::{GridIndex, TileGroup};
use crate::rings::{TilesAround, last_ring_touching};
use crate::tiling::{DistanceMetric, TileIndex, TileRange, TilingDefinition};
use crate::types::Aabb2D;

/// Ranges with at least this many tiles are processed with rayon.
const PARALLEL_TILE_THRESHOLD: u64 = 64;

type TileList<T> = Arc<Mutex<Vec<T>>>;

/// A grid hash index with a concurrent tile map and one lock per tile list.
///
/// All operations take `&self`. Queries copy each tile list under its lock, so they
/// never observe a half-written list, but identifiers inserted concurrently with a
/// query may or may not be reported.
pub struct ParallelSpatialHashIndex<T> {
    tiling: TilingDefinition,
    tiles: DashMap<TileIndex, TileList<T>, FxBuildHasher>,
    envelope: Mutex<Option<TileRange>>,
}

impl<T> ParallelSpatialHashIndex<T>
where
    T: Clone + Eq + Hash + Send + Sync,
{
    /// Create an empty index over `tiling`.
    pub fn new(tiling: TilingDefinition) -> Self {
        Self {
            tiling,
            tiles: DashMap::with_hasher(FxBuildHasher),
            envelope: Mutex::new(None),
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

    fn list(&self, tile: TileIndex) -> Option<TileList<T>> {
        self.tiles.get(&tile).map(|list| Arc::clone(list.value()))
    }

    fn list_or_create(&self, tile: TileIndex) -> TileList<T> {
        Arc::clone(self.tiles.entry(tile).or_default().value())
    }

    /// Record `id` in every tile touched by `bbox`.
    ///
    /// Boxes spanning many tiles are written column by column on the rayon pool.
    pub fn insert(&self, id: T, bbox: &Aabb2D) -> Result<()> {
        if !bbox.is_valid() {
            log::warn!("rejected identifier with invalid box {bbox:?}");
            return Err(Error::InvalidBox);
        }
        let range = self.tiling.tile_range(bbox);
        if range.len() >= PARALLEL_TILE_THRESHOLD {
            (range.min.east..=range.max.east)
                .into_par_iter()
                .for_each(|east| {
                    for north in range.min.north..=range.max.north {
                        self.list_or_create(TileIndex::new(east, north))
                            .lock()
                            .push(id.clone());
                    }
                });
        } else {
            for tile in range {
                self.list_or_create(tile).lock().push(id.clone());
            }
        }
        let mut envelope = self.envelope.lock();
        match envelope.as_mut() {
            Some(e) => {
                e.include(range.min);
                e.include(range.max);
            }
            None => *envelope = Some(range),
        }
        Ok(())
    }

    /// Insert many identifiers at once, spreading the work over the rayon pool.
    ///
    /// Stops at the first invalid box; identifiers inserted before it stay in the index.
    pub fn insert_all(&self, items: &[(T, Aabb2D)]) -> Result<()> {
        log::debug!("bulk loading {} identifiers", items.len());
        items
            .par_iter()
            .try_for_each(|(id, bbox)| self.insert(id.clone(), bbox))
    }

    /// Record `id` in the tile owning the point `(x, y)`.
    pub fn insert_point(&self, id: T, x: f64, y: f64) -> Result<()> {
        self.insert(id, &Aabb2D::new(x, y, x, y))
    }

    /// Remove one occurrence of `id` from every tile touched by `bbox`.
    pub fn remove(&self, id: &T, bbox: &Aabb2D) -> bool {
        if !bbox.is_valid() {
            return false;
        }
        let mut found = false;
        for tile in self.tiling.tile_range(bbox) {
            if let Some(list) = self.list(tile) {
                let mut ids = list.lock();
                if let Some(pos) = ids.iter().position(|x| x == id) {
                    ids.remove(pos);
                    found = true;
                }
            }
        }
        found
    }

    /// Drop all tiles.
    pub fn clear(&self) {
        self.tiles.clear();
        *self.envelope.lock() = None;
    }

    /// A snapshot of the identifiers recorded in `tile`.
    pub fn identifiers_in(&self, tile: TileIndex) -> Vec<T> {
        self.list(tile)
            .map(|list| list.lock().clone())
            .unwrap_or_default()
    }

    /// Number of tiles present in the map.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Range covering every tile that received an identifier.
    pub fn envelope(&self) -> Option<TileRange> {
        *self.envelope.lock()
    }

    fn collect_into(&self, bbox: &Aabb2D, out: &mut FxHashSet<T>) {
        let Some(range) = self
            .envelope()
            .filter(|_| bbox.is_valid())
            .and_then(|envelope| self.tiling.tile_range(bbox).clamp(&envelope))
        else {
            return;
        };
        let column = |mut set: FxHashSet<T>, east: i32| {
            for north in range.min.north..=range.max.north {
                if let Some(list) = self.list(TileIndex::new(east, north)) {
                    set.extend(list.lock().iter().cloned());
                }
            }
            set
        };
        if range.len() >= PARALLEL_TILE_THRESHOLD {
            let found = (range.min.east..=range.max.east)
                .into_par_iter()
                .fold(FxHashSet::default, column)
                .reduce(FxHashSet::default, |mut a, b| {
                    a.extend(b);
                    a
                });
            out.extend(found);
        } else {
            let taken = core::mem::take(out);
            *out = (range.min.east..=range.max.east).fold(taken, column);
        }
    }

    /// Identifiers recorded in the tiles touched by `bbox`, each reported once.
    pub fn find_identifiers(&self, bbox: &Aabb2D) -> impl Iterator<Item = T> + use<T> {
        let mut found = FxHashSet::default();
        self.collect_into(bbox, &mut found);
        found.into_iter()
    }

    /// Like [`Self::find_identifiers`] but fills a caller-owned set, which is cleared first.
    pub fn find_identifiers_with<'a>(
        &self,
        bbox: &Aabb2D,
        seen: &'a mut FxHashSet<T>,
    ) -> impl Iterator<Item = T> + use<'a, T> {
        seen.clear();
        self.collect_into(bbox, seen);
        seen.iter().cloned()
    }

    /// Occupied tiles around `(x, y)`, nearest first, with a snapshot of each tile's list.
    pub fn find_tiles_around(
        &self,
        x: f64,
        y: f64,
        metric: DistanceMetric,
        max_distance: Option<f64>,
    ) -> Result<impl Iterator<Item = TileGroup<'_, T>> + '_> {
        let center = self.tiling.tile_index_at(x, y);
        let last_ring = self
            .envelope()
            .map_or(0, |envelope| last_ring_touching(center, &envelope));
        let walk = TilesAround::new(&self.tiling, center, metric, max_distance, Some(last_ring))?;
        Ok(walk.filter_map(move |(tile, distance)| {
            let ids = self.identifiers_in(tile);
            (!ids.is_empty()).then(|| TileGroup {
                tile,
                distance,
                identifiers: Cow::Owned(ids),
            })
        }))
    }
}

impl<T> GridIndex<T> for ParallelSpatialHashIndex<T>
where
    T: Clone + Eq + Hash + Send + Sync,
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

impl<T> Debug for ParallelSpatialHashIndex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelSpatialHashIndex")
            .field("tiling", &self.tiling)
            .field("tiles", &self.tiles.len())
            .field("envelope", &*self.envelope.lock())
            .finish_non_exhaustive()
    }
}
