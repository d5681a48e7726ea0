// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: placement, refinement, enlargement and removal.

use core::cmp::Ordering;

use tilebox_grid::Aabb;

use crate::error::{Error, Result};
use crate::options::{BoxTreeOptions, check_tile_levels};
use crate::position::{Cursor, position};
use crate::tile::{Tile, TileEntry, TileId};

/// Largest extent multiple the tree grows to, in unit box sizes.
///
/// Keeps every rational position representable in `i64` at the deepest level.
const MAX_MAIN_SIZE: i64 = 1 << 30;

/// Adaptive loose box tree over `D`-dimensional boxes.
///
/// The tree covers a *main box* derived from a *unit box*: the unit box doubled
/// along every axis. Each tile splits along one axis into two overlapping
/// halves, the lower half and the centered half, so a small entry always fits
/// in a tile at most about twice its size. Entries that straddle both halves
/// stay on the parent.
///
/// With [`BoxTreeOptions::dynamic`] set, a leaf holding
/// [`max_elements_per_tile`](BoxTreeOptions::max_elements_per_tile) entries is
/// split on the next insert, and a subtree whose count drops below
/// [`join_threshold`](BoxTreeOptions::join_threshold) is merged back into one leaf.
/// Inserting outside the main box enlarges the tree by adding a new root.
///
/// ```
/// use tilebox_tree::{Aabb2D, BoxTree, BoxTreeOptions};
///
/// let options = BoxTreeOptions::default().with_max_elements_per_tile(4);
/// let mut tree = BoxTree::with_options(options).unwrap();
/// for i in 0..5 {
///     let x = f64::from(i);
///     tree.insert(Aabb2D::new(x, 0.0, x + 1.0, 1.0), i).unwrap();
/// }
/// assert_eq!(tree.len(), 5);
/// assert!(tree.verify());
/// let hits = tree.search(&Aabb2D::new(0.0, 0.0, 4.0, 0.0)).count();
/// assert_eq!(hits, 5);
/// ```
pub struct BoxTree<T, const D: usize = 2> {
    pub(crate) tiles: Vec<Tile<T, D>>,
    free_list: Vec<usize>,
    pub(crate) root: TileId,
    unit: Option<Aabb<D>>,
    main: Option<Aabb<D>>,
    main_counter: [i64; D],
    main_size: [i64; D],
    options: BoxTreeOptions,
}

impl<T, const D: usize> core::fmt::Debug for BoxTree<T, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.tiles.len();
        let free = self.free_list.len();
        f.debug_struct("BoxTree")
            .field("len", &self.len())
            .field("tiles_total", &total)
            .field("tiles_free", &free)
            .field("unit", &self.unit)
            .field("main", &self.main)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<T, const D: usize> Default for BoxTree<T, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const D: usize> BoxTree<T, D> {
    /// Create an empty tree with default options.
    ///
    /// The extent is derived from the first entries once a split is needed.
    pub fn new() -> Self {
        Self::empty(BoxTreeOptions::default())
    }

    /// Create an empty tree with the given options.
    pub fn with_options(options: BoxTreeOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::empty(options))
    }

    /// Create an empty tree whose unit box is known up front.
    pub fn with_extent(unit: Aabb<D>, options: BoxTreeOptions) -> Result<Self> {
        options.validate()?;
        if !unit.is_valid() {
            return Err(Error::InvalidBox);
        }
        let mut tree = Self::empty(options);
        tree.set_unit(unit);
        Ok(tree)
    }

    /// Build a tree from entries, deriving the unit box from all of them.
    pub fn from_entries<I>(entries: I, options: BoxTreeOptions) -> Result<Self>
    where
        I: IntoIterator<Item = (Aabb<D>, T)>,
    {
        let entries: Vec<_> = entries.into_iter().collect();
        let mut tree = Self::with_options(options)?;
        tree.init_size(entries.iter().map(|(bbox, _)| bbox))?;
        for (bbox, value) in entries {
            tree.insert(bbox, value)?;
        }
        Ok(tree)
    }

    fn empty(options: BoxTreeOptions) -> Self {
        Self {
            tiles: vec![Tile::empty()],
            free_list: Vec::new(),
            root: TileId(0),
            unit: None,
            main: None,
            main_counter: [0; D],
            main_size: [2; D],
            options,
        }
    }

    /// Derive the unit box from `boxes` and lay the tree out again.
    ///
    /// Entries already stored are kept and also contribute to the unit box.
    pub fn init_size<'b, I>(&mut self, boxes: I) -> Result<()>
    where
        I: IntoIterator<Item = &'b Aabb<D>>,
    {
        let mut unit: Option<Aabb<D>> = None;
        for bbox in boxes {
            if !bbox.is_valid() {
                return Err(Error::InvalidBox);
            }
            unit = Some(unit.map_or(*bbox, |u| u.union(bbox)));
        }
        let mut unit = unit.ok_or(Error::EmptyData)?;
        let entries = self.drain_entries();
        for entry in &entries {
            unit.include(entry.bbox());
        }
        self.set_unit(unit);
        for entry in entries {
            self.insert_entry(entry)?;
        }
        Ok(())
    }

    fn set_unit(&mut self, unit: Aabb<D>) {
        let unit = normalized_unit(unit);
        let mut main = unit;
        for i in 0..D {
            main.max[i] = position(unit.min[i], unit.extent(i), 2, 1);
        }
        log::debug!("tree unit box {unit:?}, extent {main:?}");
        self.unit = Some(unit);
        self.main = Some(main);
        self.main_counter = [0; D];
        self.main_size = [2; D];
    }

    fn drain_entries(&mut self) -> Vec<TileEntry<T, D>> {
        let mut out = Vec::with_capacity(self.len());
        for tile in &mut self.tiles {
            out.append(&mut tile.entries);
        }
        self.tiles = vec![Tile::empty()];
        self.free_list.clear();
        self.root = TileId(0);
        out
    }

    /// Number of stored entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.tiles[self.root.idx()].count
    }

    /// Whether the tree holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The options this tree was built with.
    pub fn options(&self) -> &BoxTreeOptions {
        &self.options
    }

    /// The unit box, once known.
    pub fn unit_box(&self) -> Option<&Aabb<D>> {
        self.unit.as_ref()
    }

    /// The box covered by the root tile, once the unit box is known.
    pub fn extent(&self) -> Option<&Aabb<D>> {
        self.main.as_ref()
    }

    /// Maximum refinement depth per axis.
    pub fn max_tile_levels(&self) -> u32 {
        self.options.max_tile_levels
    }

    /// Change the maximum refinement depth. Existing tiles are kept.
    pub fn set_max_tile_levels(&mut self, levels: u32) -> Result<()> {
        check_tile_levels(levels)?;
        self.options.max_tile_levels = levels;
        Ok(())
    }

    /// Box covering everything stored: the main box, or the root entries while
    /// the tree has no extent yet.
    pub(crate) fn bounds(&self) -> Option<Aabb<D>> {
        self.main
            .or_else(|| union_of(self.tiles[self.root.idx()].entries.iter().map(TileEntry::bbox)))
    }

    /// Insert an entry and return its position in depth-first order at insertion
    /// time (own entries of a tile first, then the lower, then the upper subtree).
    pub fn insert(&mut self, bbox: Aabb<D>, value: T) -> Result<usize> {
        if !bbox.is_valid() {
            log::warn!("rejecting box with invalid coordinates {bbox:?}");
            return Err(Error::InvalidBox);
        }
        self.verify_extent(&bbox)?;
        self.insert_entry(TileEntry::new(bbox, value))?;
        Ok(self.len() - 1)
    }

    fn insert_entry(&mut self, entry: TileEntry<T, D>) -> Result<()> {
        let tile = self.start_find_add_tile(entry.bbox(), self.options.dynamic)?;
        self.tiles[tile.idx()].entries.push(entry);
        let mut cur = Some(tile);
        while let Some(id) = cur {
            let t = &mut self.tiles[id.idx()];
            t.count += 1;
            cur = t.parent;
        }
        Ok(())
    }

    /// Enlarge the tree until the main box covers `bbox`.
    fn verify_extent(&mut self, bbox: &Aabb<D>) -> Result<()> {
        while let Some((dim, upward)) = self.main.and_then(|main| exceeded_axis(&main, bbox)) {
            if self.main_size[dim] >= MAX_MAIN_SIZE {
                log::warn!("box {bbox:?} lies too far outside the tree extent");
                return Err(Error::InvalidBox);
            }
            self.enlarge(dim, upward);
        }
        Ok(())
    }

    /// Double the tree along `dim` by putting a new root above the current one.
    fn enlarge(&mut self, dim: usize, upward: bool) {
        let (Some(unit), Some(mut main)) = (self.unit, self.main) else {
            return;
        };
        let axis = (unit.min[dim], unit.extent(dim));
        let size = self.main_size[dim];
        self.main_size[dim] *= 2;
        let old_root = self.root;
        let sibling = self.alloc_tile();
        let new_root = self.alloc_tile();
        if upward {
            let mc = self.main_counter[dim];
            main.max[dim] = position(axis.0, axis.1, mc + 2 * size, 1);
            self.init_children(new_root, [old_root, sibling], axis, mc, size / 2, 1);
        } else {
            assert!(size % 2 == 0, "invalid program state: odd main size {size}");
            self.main_counter[dim] -= size / 2;
            let mc = self.main_counter[dim];
            main.min[dim] = position(axis.0, axis.1, mc, 1);
            main.max[dim] = position(axis.0, axis.1, mc + 2 * size, 1);
            self.init_children(new_root, [sibling, old_root], axis, mc, size / 2, 1);
        }
        let count = self.tiles[old_root.idx()].count;
        let root = &mut self.tiles[new_root.idx()];
        root.split_dim = dim;
        root.min_split = main.min[dim];
        root.max_split = main.max[dim];
        root.count = count;
        self.root = new_root;
        self.main = Some(main);
        log::debug!("enlarged tree along axis {dim} to {main:?}");
    }

    fn start_find_add_tile(&mut self, bbox: &Aabb<D>, dynamic: bool) -> Result<TileId> {
        let mut cursor = (dynamic && self.unit.is_some()).then(Cursor::root);
        self.find_add_tile(self.root, bbox, dynamic, &mut cursor)
    }

    /// Find the tile an entry with `bbox` belongs to, splitting a full leaf on the way
    /// when `dynamic` is set.
    fn find_add_tile(
        &mut self,
        start: TileId,
        bbox: &Aabb<D>,
        mut dynamic: bool,
        cursor: &mut Option<Cursor<D>>,
    ) -> Result<TileId> {
        let max_denominator = self.options.max_denominator();
        let mut capped = false;
        let mut tile = start;
        loop {
            if let Some((child, upper)) = self.child_for(tile, bbox) {
                if dynamic && let Some(c) = cursor.as_mut() {
                    let dim = self.tiles[tile.idx()].split_dim;
                    c.descend(dim, upper);
                    if c.denominator[dim] >= max_denominator {
                        dynamic = false;
                        capped = true;
                    }
                }
                tile = child;
                continue;
            }
            if !self.tiles[tile.idx()].is_leaf() {
                return Ok(tile);
            }
            let full = self.tiles[tile.idx()].entries.len() >= self.options.max_elements_per_tile;
            if !dynamic || !full {
                if capped && full {
                    log::warn!("maximum tile level reached; leaf keeps growing past the split threshold");
                }
                return Ok(tile);
            }
            if self.unit.is_none() {
                self.derive_unit_from_root()?;
                self.verify_extent(bbox)?;
                return self.start_find_add_tile(bbox, true);
            }
            let Some(c) = *cursor else {
                return Ok(tile);
            };
            self.split(tile, &c);
            dynamic = false;
        }
    }

    /// The child of `tile` that fully holds `bbox`, and whether it is the upper one.
    pub(crate) fn child_for(&self, tile: TileId, bbox: &Aabb<D>) -> Option<(TileId, bool)> {
        let t = &self.tiles[tile.idx()];
        let [lower, upper] = t.children?;
        let dim = t.split_dim;
        if bbox.min[dim] < self.tiles[upper.idx()].min_in_parent {
            (bbox.max[dim] < self.tiles[lower.idx()].max_in_parent).then_some((lower, false))
        } else {
            (bbox.max[dim] < self.tiles[upper.idx()].max_in_parent).then_some((upper, true))
        }
    }

    fn derive_unit_from_root(&mut self) -> Result<()> {
        let entries = &self.tiles[self.root.idx()].entries;
        let unit = union_of(entries.iter().map(TileEntry::bbox)).ok_or(Error::EmptyData)?;
        log::debug!("deriving unit box from {} entries", entries.len());
        self.set_unit(unit);
        Ok(())
    }

    /// Split a leaf along its longest axis and move entries that fit into the children.
    fn split(&mut self, tile: TileId, cursor: &Cursor<D>) {
        let Some(unit) = self.unit else {
            return;
        };
        assert!(
            self.tiles[tile.idx()].is_leaf(),
            "invalid program state: tile {tile:?} is already split"
        );
        let mut dim = 0;
        let mut longest = f64::NEG_INFINITY;
        for i in 0..D {
            #[allow(
                clippy::cast_precision_loss,
                reason = "sizes and denominators are powers of two below 2^62"
            )]
            let size = unit.extent(i) * self.main_size[i] as f64 / cursor.denominator[i] as f64;
            if size > longest {
                longest = size;
                dim = i;
            }
        }
        let axis = (unit.min[dim], unit.extent(dim));
        let size = self.main_size[dim];
        let den = cursor.denominator[dim];
        let c0 = 2 * size * cursor.counter[dim] + self.main_counter[dim] * den;

        let lower = self.alloc_tile();
        let upper = self.alloc_tile();
        {
            let t = &mut self.tiles[tile.idx()];
            t.split_dim = dim;
            t.min_split = position(axis.0, axis.1, c0, den);
            t.max_split = position(axis.0, axis.1, c0 + 4 * size, den);
        }
        self.init_children(tile, [lower, upper], axis, c0, size, den);

        let lower_max = self.tiles[lower.idx()].max_in_parent;
        let upper_min = self.tiles[upper.idx()].min_in_parent;
        let upper_max = self.tiles[upper.idx()].max_in_parent;
        let entries = core::mem::take(&mut self.tiles[tile.idx()].entries);
        let mut kept = Vec::new();
        for entry in entries {
            let b = entry.bbox();
            let target = if b.min[dim] < upper_min {
                (b.max[dim] < lower_max).then_some(lower)
            } else {
                (b.max[dim] < upper_max).then_some(upper)
            };
            match target {
                Some(child) => self.tiles[child.idx()].entries.push(entry),
                None => kept.push(entry),
            }
        }
        self.tiles[tile.idx()].entries = kept;
        for child in [lower, upper] {
            let t = &mut self.tiles[child.idx()];
            t.count = t.entries.len();
        }
        log::trace!(
            "split tile {} along axis {dim}: {} / {} / {} entries",
            tile.idx(),
            self.tiles[lower.idx()].count,
            self.tiles[upper.idx()].count,
            self.tiles[tile.idx()].entries.len()
        );
    }

    /// Attach two children covering `[c, c + 2s]` and `[c + s, c + 3s]` over `den`.
    fn init_children(
        &mut self,
        parent: TileId,
        children: [TileId; 2],
        axis: (f64, f64),
        counter: i64,
        size: i64,
        den: i64,
    ) {
        let (u0, u) = axis;
        let [lower, upper] = children;
        let t = &mut self.tiles[lower.idx()];
        t.parent = Some(parent);
        t.min_in_parent = position(u0, u, counter, den);
        t.max_in_parent = position(u0, u, counter + 2 * size, den);
        let t = &mut self.tiles[upper.idx()];
        t.parent = Some(parent);
        t.min_in_parent = position(u0, u, counter + size, den);
        t.max_in_parent = position(u0, u, counter + 3 * size, den);
        self.tiles[parent.idx()].children = Some(children);
    }

    fn alloc_tile(&mut self) -> TileId {
        if let Some(idx) = self.free_list.pop() {
            self.tiles[idx] = Tile::empty();
            TileId(idx)
        } else {
            self.tiles.push(Tile::empty());
            TileId(self.tiles.len() - 1)
        }
    }

    /// Remove one entry equal to `(bbox, value)`. Returns whether one was found.
    pub fn remove(&mut self, bbox: &Aabb<D>, value: &T) -> bool
    where
        T: PartialEq,
    {
        let Some((tile, slot)) = self.find_entry(bbox, value) else {
            return false;
        };
        self.tiles[tile.idx()].entries.remove(slot);
        let mut cur = Some(tile);
        while let Some(id) = cur {
            let t = &mut self.tiles[id.idx()];
            t.count -= 1;
            cur = t.parent;
        }
        if self.options.dynamic {
            self.join_sparse(tile);
        }
        true
    }

    /// Whether an entry equal to `(bbox, value)` is stored.
    pub fn contains(&self, bbox: &Aabb<D>, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.find_entry(bbox, value).is_some()
    }

    fn find_entry(&self, bbox: &Aabb<D>, value: &T) -> Option<(TileId, usize)>
    where
        T: PartialEq,
    {
        let mut walk = self.tile_walk(bbox);
        while let Some(tile) = walk.next_tile(bbox) {
            let slot = self.tiles[tile.idx()]
                .entries
                .iter()
                .position(|e| e.bbox() == bbox && e.value() == value);
            if let Some(slot) = slot {
                return Some((tile, slot));
            }
        }
        None
    }

    /// Merge the highest subtree above `tile` that fell below the join threshold.
    fn join_sparse(&mut self, tile: TileId) {
        let mut target = None;
        let mut cur = Some(tile);
        while let Some(id) = cur {
            let t = &self.tiles[id.idx()];
            if !t.is_leaf() && t.count < self.options.join_threshold {
                target = Some(id);
            }
            cur = t.parent;
        }
        if let Some(id) = target {
            self.collapse(id);
        }
    }

    /// Pull every entry of the subtree into `tile` and free its descendants.
    fn collapse(&mut self, tile: TileId) {
        let Some(children) = self.tiles[tile.idx()].children.take() else {
            return;
        };
        let mut pending = children.to_vec();
        let mut freed = 0_usize;
        while let Some(id) = pending.pop() {
            let mut child = core::mem::replace(&mut self.tiles[id.idx()], Tile::empty());
            if let Some(grand) = child.children {
                pending.extend(grand);
            }
            self.tiles[tile.idx()].entries.append(&mut child.entries);
            self.free_list.push(id.idx());
            freed += 1;
        }
        log::debug!(
            "joined {freed} tiles into tile {} holding {} entries",
            tile.idx(),
            self.tiles[tile.idx()].count
        );
    }

    /// Remove every entry. The extent is kept.
    pub fn clear(&mut self) {
        self.tiles = vec![Tile::empty()];
        self.free_list.clear();
        self.root = TileId(0);
    }

    /// Entry at `index` in depth-first order: own entries of a tile, then the lower
    /// subtree, then the upper subtree.
    pub fn get(&self, index: usize) -> Option<&TileEntry<T, D>> {
        let mut index = index;
        let mut tile = self.root;
        loop {
            let t = &self.tiles[tile.idx()];
            if index >= t.count {
                return None;
            }
            if index < t.entries.len() {
                return t.entries.get(index);
            }
            index -= t.entries.len();
            let [lower, upper] = t.children?;
            let below = self.tiles[lower.idx()].count;
            if index < below {
                tile = lower;
            } else {
                index -= below;
                tile = upper;
            }
        }
    }

    /// All entries in the order used by [`get`](Self::get).
    pub fn iter(&self) -> Iter<'_, T, D> {
        Iter {
            tree: self,
            pending: vec![self.root],
            entries: core::slice::Iter::default(),
        }
    }

    /// Sort the entries of every tile with `compare`.
    ///
    /// Only the order inside each tile changes, so this affects [`get`](Self::get)
    /// and [`iter`](Self::iter) but never which tile holds an entry.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&TileEntry<T, D>, &TileEntry<T, D>) -> Ordering,
    {
        for tile in &mut self.tiles {
            tile.entries.sort_by(&mut compare);
        }
    }

    /// Extent of the tile holding an entry with `bbox`, refined until it is no larger
    /// than `max_size` along its parent's split axis.
    ///
    /// Splits leaves on the way, so later inserts land in the refined tiles. Refinement
    /// stops early where `bbox` straddles both children or the level limit is reached.
    pub fn tile_box(&mut self, bbox: &Aabb<D>, max_size: f64) -> Result<Aabb<D>> {
        if !bbox.is_valid() {
            return Err(Error::InvalidBox);
        }
        if max_size.is_nan() || max_size < 0.0 {
            return Err(Error::InvalidDistance(max_size));
        }
        if self.unit.is_none() {
            return Err(Error::Uninitialized);
        }
        self.verify_extent(bbox)?;
        let max_denominator = self.options.max_denominator();
        let mut cursor = Cursor::root();
        let mut tile = self.root;
        while let Some((child, upper)) = self.child_for(tile, bbox) {
            cursor.descend(self.tiles[tile.idx()].split_dim, upper);
            tile = child;
        }
        while self.tile_size(tile) > max_size && self.tiles[tile.idx()].is_leaf() {
            if cursor.denominator.iter().any(|&d| d >= max_denominator) {
                break;
            }
            self.split(tile, &cursor);
            let Some((child, upper)) = self.child_for(tile, bbox) else {
                break;
            };
            cursor.descend(self.tiles[tile.idx()].split_dim, upper);
            tile = child;
        }
        Ok(self.tile_extent(tile))
    }

    fn tile_size(&self, tile: TileId) -> f64 {
        let t = &self.tiles[tile.idx()];
        match (t.parent, self.main) {
            (Some(_), _) => t.size_in_parent(),
            (None, Some(main)) => main.max_extent(),
            (None, None) => 0.0,
        }
    }

    /// Extent of `tile`, falling back to [`bounds`](Self::bounds) on unsplit axes.
    pub(crate) fn tile_extent(&self, tile: TileId) -> Aabb<D> {
        let frame = self
            .bounds()
            .unwrap_or_else(|| Aabb::from_point([0.0; D]));
        self.tile_extent_in(tile, &frame)
    }

    /// Extent of `tile` with `frame` supplying axes no ancestor splits.
    pub(crate) fn tile_extent_in(&self, tile: TileId, frame: &Aabb<D>) -> Aabb<D> {
        let mut out = *frame;
        let mut seen = [false; D];
        let mut cur = tile;
        while let Some(parent) = self.tiles[cur.idx()].parent {
            let dim = self.tiles[parent.idx()].split_dim;
            if !seen[dim] {
                seen[dim] = true;
                out.min[dim] = self.tiles[cur.idx()].min_in_parent;
                out.max[dim] = self.tiles[cur.idx()].max_in_parent;
            }
            cur = parent;
        }
        out
    }

    /// Extent of `tile` along `dim`.
    pub(crate) fn extent_in_dim(&self, tile: TileId, dim: usize, frame: &Aabb<D>) -> (f64, f64) {
        let mut cur = tile;
        while let Some(parent) = self.tiles[cur.idx()].parent {
            if self.tiles[parent.idx()].split_dim == dim {
                let t = &self.tiles[cur.idx()];
                return (t.min_in_parent, t.max_in_parent);
            }
            cur = parent;
        }
        (frame.min[dim], frame.max[dim])
    }

    /// Extents of the leaf tiles, optionally only those holding entries.
    pub fn leaves(&self, non_empty: bool) -> Vec<Aabb<D>> {
        let Some(frame) = self.bounds() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            let t = &self.tiles[id.idx()];
            match t.children {
                Some([lower, upper]) => pending.extend([upper, lower]),
                None if !non_empty || !t.entries.is_empty() => {
                    out.push(self.tile_extent_in(id, &frame));
                }
                None => {}
            }
        }
        out
    }

    /// Check the structural invariants: every entry lies inside its tile's extent,
    /// every count equals the entries of its subtree and child links are consistent.
    pub fn verify(&self) -> bool {
        let Some(frame) = self.bounds() else {
            return self.is_empty();
        };
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            let t = &self.tiles[id.idx()];
            let extent = self.tile_extent_in(id, &frame);
            if !t.entries.iter().all(|e| extent.contains(e.bbox())) {
                return false;
            }
            let mut count = t.entries.len();
            if let Some(children) = t.children {
                for child in children {
                    let c = &self.tiles[child.idx()];
                    if c.parent != Some(id) {
                        return false;
                    }
                    count += c.count;
                    pending.push(child);
                }
            }
            if count != t.count {
                return false;
            }
        }
        true
    }
}

/// Depth-first iterator over all entries of a [`BoxTree`].
pub struct Iter<'a, T, const D: usize = 2> {
    tree: &'a BoxTree<T, D>,
    pending: Vec<TileId>,
    entries: core::slice::Iter<'a, TileEntry<T, D>>,
}

impl<T, const D: usize> core::fmt::Debug for Iter<'_, T, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Iter")
            .field("pending_tiles", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl<'a, T, const D: usize> Iterator for Iter<'a, T, D> {
    type Item = &'a TileEntry<T, D>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.entries.next() {
                return Some(entry);
            }
            let tree = self.tree;
            let tile = &tree.tiles[self.pending.pop()?.idx()];
            if let Some([lower, upper]) = tile.children {
                self.pending.extend([upper, lower]);
            }
            self.entries = tile.entries.iter();
        }
    }
}

impl<'a, T, const D: usize> IntoIterator for &'a BoxTree<T, D> {
    type Item = &'a TileEntry<T, D>;
    type IntoIter = Iter<'a, T, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The first axis along which `bbox` leaves `main`, and whether it leaves upward.
fn exceeded_axis<const D: usize>(main: &Aabb<D>, bbox: &Aabb<D>) -> Option<(usize, bool)> {
    (0..D).find_map(|i| {
        if bbox.min[i] < main.min[i] {
            Some((i, false))
        } else if bbox.max[i] > main.max[i] {
            Some((i, true))
        } else {
            None
        }
    })
}

fn union_of<'b, const D: usize>(boxes: impl IntoIterator<Item = &'b Aabb<D>>) -> Option<Aabb<D>> {
    boxes
        .into_iter()
        .fold(None, |acc: Option<Aabb<D>>, b| Some(acc.map_or(*b, |a| a.union(b))))
}

/// Give degenerate axes of a unit box a usable width.
fn normalized_unit<const D: usize>(mut unit: Aabb<D>) -> Aabb<D> {
    let widest = unit.max_extent();
    for i in 0..D {
        if unit.extent(i) <= 0.0 {
            let width = if widest > 0.0 { widest } else { 1.0 };
            unit.max[i] = unit.min[i] + width.max(unit.min[i].abs() * 1e-9);
        }
    }
    unit
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilebox_grid::Aabb2D;

    fn small() -> BoxTreeOptions {
        BoxTreeOptions::default().with_max_elements_per_tile(4)
    }

    #[test]
    fn lazy_unit_box_and_first_split() {
        let mut tree = BoxTree::with_options(small()).unwrap();
        for i in 0..4 {
            let x = f64::from(i);
            tree.insert(Aabb2D::new(x, 0.0, x + 1.0, 1.0), i).unwrap();
        }
        assert!(tree.unit_box().is_none());
        assert!(tree.tiles[tree.root.idx()].is_leaf());

        tree.insert(Aabb2D::new(4.0, 0.0, 5.0, 1.0), 4).unwrap();
        assert_eq!(tree.unit_box(), Some(&Aabb2D::new(0.0, 0.0, 4.0, 1.0)));
        assert_eq!(tree.extent(), Some(&Aabb2D::new(0.0, 0.0, 8.0, 2.0)));
        let root = &tree.tiles[tree.root.idx()];
        assert_eq!(root.split_dim, 0);
        let [lower, upper] = root.children.unwrap();
        assert_eq!(tree.tiles[lower.idx()].count, 2);
        assert_eq!(tree.tiles[upper.idx()].count, 3);
        assert!(root.entries.is_empty());
        assert!(tree.verify());
    }

    #[test]
    fn child_extents_overlap_by_half() {
        let mut tree =
            BoxTree::with_extent(Aabb2D::new(0.0, 0.0, 8.0, 2.0), small()).unwrap();
        for i in 0..5 {
            let x = f64::from(i);
            tree.insert(Aabb2D::new(x, 0.0, x + 0.5, 0.5), i).unwrap();
        }
        let root = &tree.tiles[tree.root.idx()];
        let [lower, upper] = root.children.unwrap();
        let (l, u) = (&tree.tiles[lower.idx()], &tree.tiles[upper.idx()]);
        assert_eq!((root.min_split, root.max_split), (0.0, 16.0));
        assert_eq!((l.min_in_parent, l.max_in_parent), (0.0, 8.0));
        assert_eq!((u.min_in_parent, u.max_in_parent), (4.0, 12.0));
    }

    #[test]
    fn enlarges_in_both_directions() {
        let mut tree: BoxTree<u32> =
            BoxTree::with_extent(Aabb2D::new(0.0, 0.0, 1.0, 1.0), small()).unwrap();
        tree.insert(Aabb2D::new(0.5, 0.5, 0.6, 0.6), 0).unwrap();
        tree.insert(Aabb2D::new(2.5, 0.0, 3.0, 1.0), 1).unwrap();
        assert_eq!(tree.extent(), Some(&Aabb2D::new(0.0, 0.0, 4.0, 2.0)));
        tree.insert(Aabb2D::new(-3.0, 0.0, -2.0, 1.0), 2).unwrap();
        let main = *tree.extent().unwrap();
        assert!(main.min_x() <= -3.0, "{main:?}");
        assert!(main.max_x() >= 3.0, "{main:?}");
        assert_eq!(tree.len(), 3);
        assert!(tree.verify());
        let stored = [
            Aabb2D::new(0.5, 0.5, 0.6, 0.6),
            Aabb2D::new(2.5, 0.0, 3.0, 1.0),
            Aabb2D::new(-3.0, 0.0, -2.0, 1.0),
        ];
        for (i, b) in (0_u32..).zip(&stored) {
            assert!(tree.contains(b, &i), "entry {i} lost");
        }
    }

    #[test]
    fn depth_first_index_order() {
        let mut tree = BoxTree::with_options(small()).unwrap();
        for i in 0..12 {
            let x = f64::from(i);
            tree.insert(Aabb2D::new(x, 0.0, x + 0.5, 1.0), i).unwrap();
        }
        let by_iter: Vec<i32> = tree.iter().map(|e| *e.value()).collect();
        let by_index: Vec<i32> = (0..tree.len()).map(|i| *tree.get(i).unwrap().value()).collect();
        assert_eq!(by_iter, by_index);
        assert!(tree.get(tree.len()).is_none());
        let mut sorted = by_iter.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn sort_by_orders_each_tile() {
        let mut tree: BoxTree<i32> = BoxTree::new();
        for v in [3, 1, 2] {
            tree.insert(Aabb2D::new(0.0, 0.0, 1.0, 1.0), v).unwrap();
        }
        tree.sort_by(|a, b| a.value().cmp(b.value()));
        let values: Vec<i32> = tree.iter().map(|e| *e.value()).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn clear_keeps_extent() {
        let mut tree = BoxTree::with_extent(Aabb2D::new(0.0, 0.0, 1.0, 1.0), small()).unwrap();
        for i in 0..10 {
            tree.insert(Aabb2D::new(0.1, 0.1, 0.2, 0.2), i).unwrap();
        }
        let extent = *tree.extent().unwrap();
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.extent(), Some(&extent));
        assert_eq!(tree.iter().count(), 0);
        tree.insert(Aabb2D::new(0.1, 0.1, 0.2, 0.2), 99).unwrap();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn degenerate_unit_box_gets_width() {
        let tree: BoxTree<()> =
            BoxTree::with_extent(Aabb2D::new(1.0, 2.0, 1.0, 5.0), small()).unwrap();
        let unit = tree.unit_box().unwrap();
        assert_eq!(unit.width(), 3.0);
        let tree: BoxTree<()> = BoxTree::with_extent(Aabb2D::from_point([1.0, 2.0]), small()).unwrap();
        assert_eq!(tree.unit_box().unwrap().width(), 1.0);
    }

    #[test]
    fn rejects_invalid_boxes() {
        let mut tree = BoxTree::new();
        assert_eq!(
            tree.insert(Aabb2D::new(f64::NAN, 0.0, 1.0, 1.0), ()),
            Err(Error::InvalidBox)
        );
        assert_eq!(
            tree.insert(Aabb2D::new(2.0, 0.0, 1.0, 1.0), ()),
            Err(Error::InvalidBox)
        );
        assert!(tree.is_empty());
        assert!(matches!(
            BoxTree::<(), 2>::with_extent(Aabb2D::new(0.0, 0.0, f64::INFINITY, 1.0), small()),
            Err(Error::InvalidBox)
        ));
    }

    #[test]
    fn max_tile_levels_is_checked() {
        let mut tree: BoxTree<()> = BoxTree::new();
        assert_eq!(tree.max_tile_levels(), 30);
        assert!(tree.set_max_tile_levels(8).is_ok());
        assert_eq!(tree.max_tile_levels(), 8);
        assert!(matches!(
            tree.set_max_tile_levels(0),
            Err(Error::InvalidTileLevels { requested: 0, .. })
        ));
    }
}
