// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Range searches over a [`BoxTree`].
//!
//! Both enumerators walk the tree depth first and keep a running tile box, so
//! no extent is recomputed while walking. The search box of a running
//! enumerator may be narrowed between steps; tiles and entries already skipped
//! stay skipped, which is sound only because the new box lies inside the old one.

use core::slice;

use tilebox_grid::Aabb;

use crate::error::{Error, Result};
use crate::tile::{TileEntry, TileId};
use crate::tree::BoxTree;

/// Depth-first walk over the tiles whose extent intersects a search box.
pub(crate) struct TileWalk<'a, T, const D: usize> {
    pub(crate) tree: &'a BoxTree<T, D>,
    stop: Option<TileId>,
    current: Option<TileId>,
    current_box: Aabb<D>,
    pending: bool,
}

impl<'a, T, const D: usize> TileWalk<'a, T, D> {
    /// Walk the subtree of `start`, whose extent is `start_box`.
    pub(crate) fn new(
        tree: &'a BoxTree<T, D>,
        start: TileId,
        start_box: Aabb<D>,
        search: &Aabb<D>,
    ) -> Self {
        let hit = start_box.intersects(search);
        Self {
            tree,
            stop: tree.tiles[start.idx()].parent,
            current: hit.then_some(start),
            current_box: start_box,
            pending: hit,
        }
    }

    fn empty(tree: &'a BoxTree<T, D>) -> Self {
        Self {
            tree,
            stop: None,
            current: None,
            current_box: Aabb::from_point([0.0; D]),
            pending: false,
        }
    }

    /// Extent of the tile last returned by [`next_tile`](Self::next_tile).
    pub(crate) fn current_box(&self) -> &Aabb<D> {
        &self.current_box
    }

    pub(crate) fn next_tile(&mut self, search: &Aabb<D>) -> Option<TileId> {
        let current = self.current?;
        if self.pending {
            self.pending = false;
            return Some(current);
        }
        self.current = self
            .tree
            .next_selected_tile(current, &mut self.current_box, search, self.stop);
        self.current
    }
}

impl<T, const D: usize> BoxTree<T, D> {
    /// Entries whose box intersects `bbox`, each reported once.
    ///
    /// ```
    /// use tilebox_tree::{Aabb2D, BoxTree};
    ///
    /// let mut tree = BoxTree::new();
    /// tree.insert(Aabb2D::new(0.0, 0.0, 1.0, 1.0), "a").unwrap();
    /// tree.insert(Aabb2D::new(5.0, 5.0, 6.0, 6.0), "b").unwrap();
    ///
    /// let mut search = tree.search(&Aabb2D::new(-1.0, -1.0, 10.0, 10.0));
    /// search.narrow(Aabb2D::new(4.0, 4.0, 10.0, 10.0)).unwrap();
    /// let hits: Vec<_> = search.map(|e| *e.value()).collect();
    /// assert_eq!(hits, vec!["b"]);
    /// ```
    pub fn search(&self, bbox: &Aabb<D>) -> Search<'_, T, D> {
        Search {
            walk: self.tile_walk(bbox),
            search: *bbox,
            entries: slice::Iter::default(),
        }
    }

    /// Tiles whose extent intersects `bbox`, in depth-first order.
    pub fn tiles(&self, bbox: &Aabb<D>) -> Tiles<'_, T, D> {
        Tiles {
            walk: self.tile_walk(bbox),
            search: *bbox,
        }
    }

    pub(crate) fn tile_walk(&self, bbox: &Aabb<D>) -> TileWalk<'_, T, D> {
        match self.bounds() {
            Some(frame) => TileWalk::new(self, self.root, frame, bbox),
            None => TileWalk::empty(self),
        }
    }

    /// Entries of the subtree below `tile` intersecting `bbox`.
    pub(crate) fn search_from(
        &self,
        tile: TileId,
        tile_box: Aabb<D>,
        bbox: Aabb<D>,
    ) -> Search<'_, T, D> {
        Search {
            walk: TileWalk::new(self, tile, tile_box, &bbox),
            search: bbox,
            entries: slice::Iter::default(),
        }
    }

    /// Step from `current` to the next tile in depth-first order whose extent
    /// intersects `search`, never leaving the subtree below `stop`.
    ///
    /// `current_box` holds the extent of `current` on entry and of the returned
    /// tile on exit.
    fn next_selected_tile(
        &self,
        current: TileId,
        current_box: &mut Aabb<D>,
        search: &Aabb<D>,
        stop: Option<TileId>,
    ) -> Option<TileId> {
        let tiles = &self.tiles;
        let node = &tiles[current.idx()];
        let mut came_from = None;
        if let Some([lower, _]) = node.children {
            let l = &tiles[lower.idx()];
            current_box.min[node.split_dim] = l.min_in_parent;
            current_box.max[node.split_dim] = l.max_in_parent;
            if current_box.intersects(search) {
                return Some(lower);
            }
            came_from = Some(lower);
        }
        let mut cur = current;
        loop {
            if Some(cur) == stop {
                return None;
            }
            let node = &tiles[cur.idx()];
            if let Some([lower, upper]) = node.children {
                let dim = node.split_dim;
                if came_from == Some(lower) {
                    let u = &tiles[upper.idx()];
                    current_box.min[dim] = u.min_in_parent;
                    current_box.max[dim] = u.max_in_parent;
                    if current_box.intersects(search) {
                        return Some(upper);
                    }
                }
                current_box.min[dim] = node.min_split;
                current_box.max[dim] = node.max_split;
            }
            came_from = Some(cur);
            cur = node.parent?;
        }
    }
}

/// Entries intersecting a search box. See [`BoxTree::search`].
pub struct Search<'a, T, const D: usize = 2> {
    walk: TileWalk<'a, T, D>,
    search: Aabb<D>,
    entries: slice::Iter<'a, TileEntry<T, D>>,
}

impl<T, const D: usize> Search<'_, T, D> {
    /// The current search box.
    pub fn search_box(&self) -> &Aabb<D> {
        &self.search
    }

    /// Shrink the search box for the remaining steps.
    ///
    /// Fails with [`Error::SearchBoxWidened`] unless `bbox` lies inside the current box.
    pub fn narrow(&mut self, bbox: Aabb<D>) -> Result<()> {
        if !self.search.contains(&bbox) {
            return Err(Error::SearchBoxWidened);
        }
        self.search = bbox;
        Ok(())
    }
}

impl<T, const D: usize> core::fmt::Debug for Search<'_, T, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Search")
            .field("search", &self.search)
            .finish_non_exhaustive()
    }
}

impl<'a, T, const D: usize> Iterator for Search<'a, T, D> {
    type Item = &'a TileEntry<T, D>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            for entry in self.entries.by_ref() {
                if entry.bbox().intersects(&self.search) {
                    return Some(entry);
                }
            }
            let tile = self.walk.next_tile(&self.search)?;
            let tree = self.walk.tree;
            self.entries = tree.tiles[tile.idx()].entries.iter();
        }
    }
}

/// A tile reported by [`BoxTree::tiles`].
#[derive(Clone, Debug)]
pub struct TileRef<'a, T, const D: usize = 2> {
    /// Extent of the tile.
    pub extent: Aabb<D>,
    /// Entries held by the tile itself.
    pub entries: &'a [TileEntry<T, D>],
    /// Entries in the tile's whole subtree.
    pub count: usize,
    /// Whether the tile has no children.
    pub is_leaf: bool,
}

/// Tiles intersecting a search box. See [`BoxTree::tiles`].
pub struct Tiles<'a, T, const D: usize = 2> {
    walk: TileWalk<'a, T, D>,
    search: Aabb<D>,
}

impl<T, const D: usize> Tiles<'_, T, D> {
    /// The current search box.
    pub fn search_box(&self) -> &Aabb<D> {
        &self.search
    }

    /// Shrink the search box for the remaining steps.
    ///
    /// Fails with [`Error::SearchBoxWidened`] unless `bbox` lies inside the current box.
    pub fn narrow(&mut self, bbox: Aabb<D>) -> Result<()> {
        if !self.search.contains(&bbox) {
            return Err(Error::SearchBoxWidened);
        }
        self.search = bbox;
        Ok(())
    }
}

impl<T, const D: usize> core::fmt::Debug for Tiles<'_, T, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tiles")
            .field("search", &self.search)
            .finish_non_exhaustive()
    }
}

impl<'a, T, const D: usize> Iterator for Tiles<'a, T, D> {
    type Item = TileRef<'a, T, D>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.walk.next_tile(&self.search)?;
        let tree = self.walk.tree;
        let tile = &tree.tiles[id.idx()];
        Some(TileRef {
            extent: *self.walk.current_box(),
            entries: &tile.entries,
            count: tile.count,
            is_leaf: tile.is_leaf(),
        })
    }
}
