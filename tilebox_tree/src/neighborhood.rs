// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dual-tree neighborhood join.
//!
//! The searching tree is walked depth first. Every step keeps a frame with
//! the neighbour tiles that may still hold entries within the join distance
//! of anything below the searching tile. Frames are refined from their
//! parent's list: neighbour tiles that fall out of range along the searching
//! tile's split axis are dropped, and tiles much larger than the search range
//! are replaced by their children. Entries of the replaced tiles are kept on a
//! separate list so they are not lost. A searching subtree with no neighbour
//! tiles left is skipped as a whole.

use core::slice;

use tilebox_grid::Aabb;

use crate::error::{Error, Result};
use crate::tile::{TileEntry, TileId};
use crate::tree::BoxTree;

/// An entry of the searching tree and the entries of the other tree near it.
#[derive(Clone, Debug)]
pub struct Neighborhood<'a, T, U, const D: usize = 2> {
    /// Entry of the searching tree.
    pub entry: &'a TileEntry<T, D>,
    /// Entries of the neighbour tree within the join distance, never empty.
    pub neighbours: Vec<&'a TileEntry<U, D>>,
}

impl<T, const D: usize> BoxTree<T, D> {
    /// Pair every entry of this tree with the entries of `other` within `distance`.
    ///
    /// Two entries are neighbours when the Euclidean gap between their boxes is at
    /// most `distance`; touching boxes have a gap of zero. Entries without
    /// neighbours are not reported. When `common` is given, each entry's search range
    /// is clipped to `common` grown by `distance`.
    ///
    /// ```
    /// use tilebox_tree::{Aabb2D, BoxTree};
    ///
    /// let mut roads = BoxTree::new();
    /// roads.insert(Aabb2D::new(0.0, 0.0, 10.0, 0.5), "main street").unwrap();
    /// let mut shops = BoxTree::new();
    /// shops.insert(Aabb2D::new(2.0, 1.0, 3.0, 2.0), "bakery").unwrap();
    /// shops.insert(Aabb2D::new(2.0, 9.0, 3.0, 9.5), "kiosk").unwrap();
    ///
    /// let pairs: Vec<_> = roads.neighborhoods(&shops, 1.0, None).unwrap().collect();
    /// assert_eq!(pairs.len(), 1);
    /// assert_eq!(*pairs[0].neighbours[0].value(), "bakery");
    /// ```
    pub fn neighborhoods<'a, U>(
        &'a self,
        other: &'a BoxTree<U, D>,
        distance: f64,
        common: Option<&Aabb<D>>,
    ) -> Result<Neighborhoods<'a, T, U, D>> {
        if distance.is_nan() || distance < 0.0 {
            return Err(Error::InvalidDistance(distance));
        }
        if let Some(common) = common
            && !common.is_valid()
        {
            return Err(Error::InvalidBox);
        }
        let join = match (self.bounds(), other.bounds()) {
            (Some(searching_frame), Some(neighbour_frame)) => {
                common_box(&searching_frame, &neighbour_frame, common, distance).map(|common| {
                    log::debug!(
                        "joining {} entries against {} within {distance}",
                        self.len(),
                        other.len()
                    );
                    Join {
                        searching: self,
                        neighbours: other,
                        distance,
                        common,
                        searching_frame,
                        neighbour_frame,
                        stack: Vec::new(),
                        started: false,
                        entries: slice::Iter::default(),
                    }
                })
            }
            _ => None,
        };
        Ok(Neighborhoods { join })
    }
}

/// Overlap of both frames grown by `distance`, clipped to `common` grown likewise.
fn common_box<const D: usize>(
    a: &Aabb<D>,
    b: &Aabb<D>,
    common: Option<&Aabb<D>>,
    distance: f64,
) -> Option<Aabb<D>> {
    let mut out = *a;
    for i in 0..D {
        let mut lo = a.min[i].max(b.min[i]);
        let mut hi = a.max[i].min(b.max[i]);
        if let Some(c) = common {
            lo = lo.max(c.min[i]);
            hi = hi.min(c.max[i]);
        }
        out.min[i] = lo - distance;
        out.max[i] = hi + distance;
        if out.min[i] > out.max[i] {
            return None;
        }
    }
    Some(out)
}

/// Iterator over [`Neighborhood`]s. See [`BoxTree::neighborhoods`].
pub struct Neighborhoods<'a, T, U, const D: usize = 2> {
    join: Option<Join<'a, T, U, D>>,
}

impl<T, U, const D: usize> core::fmt::Debug for Neighborhoods<'_, T, U, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let depth = self.join.as_ref().map_or(0, |j| j.stack.len());
        f.debug_struct("Neighborhoods")
            .field("depth", &depth)
            .finish_non_exhaustive()
    }
}

impl<'a, T, U, const D: usize> Iterator for Neighborhoods<'a, T, U, D> {
    type Item = Neighborhood<'a, T, U, D>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.join.as_mut()?.next();
        if next.is_none() {
            self.join = None;
        }
        next
    }
}

struct Frame {
    searching: TileId,
    /// Axis along which the searching tile's parent splits; `None` at the root.
    search_dim: Option<usize>,
    /// Range along `search_dim` the searching tile reaches, grown by the distance.
    search_extent: (f64, f64),
    /// Neighbour tiles whose whole subtree must be searched.
    neighbour_tiles: Vec<TileId>,
    /// Neighbour tiles whose own entries must be searched, but not their children.
    with_entries: Vec<TileId>,
}

impl Frame {
    fn has_neighbours(&self) -> bool {
        !self.neighbour_tiles.is_empty() || !self.with_entries.is_empty()
    }
}

struct Join<'a, T, U, const D: usize> {
    searching: &'a BoxTree<T, D>,
    neighbours: &'a BoxTree<U, D>,
    distance: f64,
    common: Aabb<D>,
    searching_frame: Aabb<D>,
    neighbour_frame: Aabb<D>,
    stack: Vec<Frame>,
    started: bool,
    entries: slice::Iter<'a, TileEntry<T, D>>,
}

impl<'a, T, U, const D: usize> Join<'a, T, U, D> {
    fn next(&mut self) -> Option<Neighborhood<'a, T, U, D>> {
        loop {
            while let Some(entry) = self.entries.next() {
                if let Some(found) = self.neighbours_of(entry) {
                    return Some(found);
                }
            }
            if !self.advance() {
                return None;
            }
        }
    }

    /// Move to the next searching tile that may have neighbours.
    fn advance(&mut self) -> bool {
        let searching = self.searching;
        let frame = if self.stack.is_empty() {
            if self.started {
                return false;
            }
            self.started = true;
            Frame {
                searching: searching.root,
                search_dim: None,
                search_extent: (0.0, 0.0),
                neighbour_tiles: vec![self.neighbours.root],
                with_entries: Vec::new(),
            }
        } else {
            let top = self.stack.len() - 1;
            let tile = &searching.tiles[self.stack[top].searching.idx()];
            match tile.children {
                Some([lower, _]) if self.stack[top].has_neighbours() => {
                    self.child_frame(lower, top)
                }
                _ => {
                    let mut i = top;
                    while i > 0
                        && upper_child(searching, self.stack[i - 1].searching)
                            == Some(self.stack[i].searching)
                    {
                        i -= 1;
                    }
                    if i == 0 {
                        self.stack.clear();
                        return false;
                    }
                    let parent = i - 1;
                    let Some(upper) = upper_child(searching, self.stack[parent].searching) else {
                        self.stack.clear();
                        return false;
                    };
                    self.stack.truncate(i);
                    self.child_frame(upper, parent)
                }
            }
        };
        let tile = &searching.tiles[frame.searching.idx()];
        self.entries = if frame.has_neighbours() {
            tile.entries.iter()
        } else {
            slice::Iter::default()
        };
        log::trace!(
            "join frame at depth {}: {} neighbour tiles, {} with entries",
            self.stack.len(),
            frame.neighbour_tiles.len(),
            frame.with_entries.len()
        );
        self.stack.push(frame);
        true
    }

    /// Frame for searching `tile`, the child of the tile in `self.stack[parent]`.
    fn child_frame(&self, tile: TileId, parent: usize) -> Frame {
        let ancestors = &self.stack[..=parent];
        let p = &ancestors[parent];
        let dim = self.searching.tiles[p.searching.idx()].split_dim;
        let (lo, hi) = self
            .searching
            .extent_in_dim(tile, dim, &self.searching_frame);
        let extent = (
            (lo - self.distance).max(self.common.min[dim]),
            (hi + self.distance).min(self.common.max[dim]),
        );
        let mut frame = Frame {
            searching: tile,
            search_dim: Some(dim),
            search_extent: extent,
            neighbour_tiles: Vec::new(),
            with_entries: p
                .with_entries
                .iter()
                .copied()
                .filter(|&n| overlaps(self.neighbour_extent(n, dim), extent))
                .collect(),
        };
        let search_size = extent.1 - extent.0;
        if search_size < 0.0 {
            return frame;
        }
        for &n in &p.neighbour_tiles {
            let ne = self.neighbour_extent(n, dim);
            if !overlaps(ne, extent) {
                continue;
            }
            if ne.1 - ne.0 > search_size {
                self.refine(n, search_size, &mut frame, ancestors);
            } else {
                frame.neighbour_tiles.push(n);
            }
        }
        frame
    }

    /// Replace the neighbour tile `tile` by those of its children in range.
    fn refine(&self, tile: TileId, search_size: f64, frame: &mut Frame, ancestors: &[Frame]) {
        let node = &self.neighbours.tiles[tile.idx()];
        if let Some(children) = node.children {
            let dim = node.split_dim;
            let range = self.search_extent(dim, frame, ancestors);
            for child in children {
                let c = &self.neighbours.tiles[child.idx()];
                if !overlaps((c.min_in_parent, c.max_in_parent), range) {
                    continue;
                }
                if frame.search_dim != Some(dim) || c.size_in_parent() > search_size {
                    self.refine(child, search_size, frame, ancestors);
                } else {
                    frame.neighbour_tiles.push(child);
                }
            }
        }
        if !node.entries.is_empty() {
            frame.with_entries.push(tile);
        }
    }

    /// Search range along `dim` for the current searching tile.
    fn search_extent(&self, dim: usize, frame: &Frame, ancestors: &[Frame]) -> (f64, f64) {
        core::iter::once(frame)
            .chain(ancestors.iter().rev())
            .find(|f| f.search_dim == Some(dim))
            .map_or((self.common.min[dim], self.common.max[dim]), |f| f.search_extent)
    }

    fn neighbour_extent(&self, tile: TileId, dim: usize) -> (f64, f64) {
        self.neighbours
            .extent_in_dim(tile, dim, &self.neighbour_frame)
    }

    fn neighbours_of(&self, entry: &'a TileEntry<T, D>) -> Option<Neighborhood<'a, T, U, D>> {
        let search = entry
            .bbox()
            .expanded(self.distance)
            .intersection(&self.common)?;
        let frame = self.stack.last()?;
        let tree = self.neighbours;
        let near = |n: &&TileEntry<U, D>| entry.bbox().distance(n.bbox()) <= self.distance;
        let mut found = Vec::new();
        for &tile in &frame.with_entries {
            if !tree
                .tile_extent_in(tile, &self.neighbour_frame)
                .intersects(&search)
            {
                continue;
            }
            found.extend(
                tree.tiles[tile.idx()]
                    .entries
                    .iter()
                    .filter(|n| n.bbox().intersects(&search))
                    .filter(near),
            );
        }
        for &tile in &frame.neighbour_tiles {
            let tile_box = tree.tile_extent_in(tile, &self.neighbour_frame);
            found.extend(tree.search_from(tile, tile_box, search).filter(near));
        }
        (!found.is_empty()).then_some(Neighborhood {
            entry,
            neighbours: found,
        })
    }
}

fn upper_child<T, const D: usize>(tree: &BoxTree<T, D>, tile: TileId) -> Option<TileId> {
    tree.tiles[tile.idx()].children.map(|[_, upper]| upper)
}

#[inline]
fn overlaps(a: (f64, f64), b: (f64, f64)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BoxTreeOptions;
    use tilebox_grid::Aabb2D;

    fn tree_of(boxes: &[Aabb2D]) -> BoxTree<usize> {
        let options = BoxTreeOptions::default().with_max_elements_per_tile(2);
        let mut tree = BoxTree::with_options(options).unwrap();
        for (i, b) in boxes.iter().enumerate() {
            tree.insert(*b, i).unwrap();
        }
        tree
    }

    #[test]
    fn corner_contact_beyond_distance_is_not_a_pair() {
        let a = tree_of(&[Aabb2D::new(0.0, 0.0, 1.0, 1.0)]);
        let b = tree_of(&[Aabb2D::new(2.0, 2.0, 3.0, 3.0)]);
        assert_eq!(a.neighborhoods(&b, 1.0, None).unwrap().count(), 0);

        let c = tree_of(&[Aabb2D::new(1.5, 1.5, 2.5, 2.5)]);
        let pairs: Vec<_> = a.neighborhoods(&c, 1.0, None).unwrap().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].neighbours.len(), 1);
    }

    #[test]
    fn rejects_bad_distance() {
        let a = tree_of(&[Aabb2D::new(0.0, 0.0, 1.0, 1.0)]);
        assert!(matches!(
            a.neighborhoods(&a, -1.0, None),
            Err(Error::InvalidDistance(_))
        ));
        assert!(matches!(
            a.neighborhoods(&a, f64::NAN, None),
            Err(Error::InvalidDistance(_))
        ));
    }

    #[test]
    fn empty_trees_join_to_nothing() {
        let a = tree_of(&[Aabb2D::new(0.0, 0.0, 1.0, 1.0)]);
        let empty: BoxTree<usize> = BoxTree::new();
        assert_eq!(a.neighborhoods(&empty, 5.0, None).unwrap().count(), 0);
        assert_eq!(empty.neighborhoods(&a, 5.0, None).unwrap().count(), 0);
    }

    #[test]
    fn common_box_limits_the_join() {
        let a = tree_of(&[
            Aabb2D::new(0.0, 0.0, 1.0, 1.0),
            Aabb2D::new(10.0, 0.0, 11.0, 1.0),
        ]);
        let b = tree_of(&[
            Aabb2D::new(1.5, 0.0, 2.0, 1.0),
            Aabb2D::new(11.5, 0.0, 12.0, 1.0),
        ]);
        assert_eq!(a.neighborhoods(&b, 1.0, None).unwrap().count(), 2);
        let common = Aabb2D::new(-5.0, -5.0, 5.0, 5.0);
        let pairs: Vec<_> = a.neighborhoods(&b, 1.0, Some(&common)).unwrap().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(*pairs[0].entry.value(), 0);
    }
}
