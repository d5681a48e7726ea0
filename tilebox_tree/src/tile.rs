// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tiles and entries stored in the tree arena.

use tilebox_grid::Aabb;

/// A stored value together with its bounding box.
///
/// Entries are immutable once inserted; remove and reinsert to move one.
#[derive(Clone, Debug, PartialEq)]
pub struct TileEntry<T, const D: usize = 2> {
    bbox: Aabb<D>,
    value: T,
}

impl<T, const D: usize> TileEntry<T, D> {
    pub(crate) fn new(bbox: Aabb<D>, value: T) -> Self {
        Self { bbox, value }
    }

    /// Bounding box of the entry.
    #[inline]
    pub fn bbox(&self) -> &Aabb<D> {
        &self.bbox
    }

    /// The stored value.
    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consume the entry and return the stored value.
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Slot of a tile in the tree arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct TileId(pub(crate) usize);

impl TileId {
    #[inline]
    pub(crate) const fn idx(self) -> usize {
        self.0
    }
}

/// One node of the box tree.
///
/// Children overlap: along `split_dim` the lower child covers the first half
/// of the tile and the upper child the centered half. Every entry lies inside
/// the extent of the tile holding it.
pub(crate) struct Tile<T, const D: usize> {
    pub(crate) parent: Option<TileId>,
    pub(crate) children: Option<[TileId; 2]>,
    pub(crate) split_dim: usize,
    /// Extent of this tile along its own `split_dim`.
    pub(crate) min_split: f64,
    pub(crate) max_split: f64,
    /// Extent of this tile along its parent's `split_dim`.
    pub(crate) min_in_parent: f64,
    pub(crate) max_in_parent: f64,
    /// Entries in the whole subtree.
    pub(crate) count: usize,
    pub(crate) entries: Vec<TileEntry<T, D>>,
}

impl<T, const D: usize> Tile<T, D> {
    pub(crate) const fn empty() -> Self {
        Self {
            parent: None,
            children: None,
            split_dim: 0,
            min_split: 0.0,
            max_split: 0.0,
            min_in_parent: 0.0,
            max_in_parent: 0.0,
            count: 0,
            entries: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    #[inline]
    pub(crate) fn size_in_parent(&self) -> f64 {
        self.max_in_parent - self.min_in_parent
    }
}

impl<T, const D: usize> core::fmt::Debug for Tile<T, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tile")
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("split_dim", &self.split_dim)
            .field("count", &self.count)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
