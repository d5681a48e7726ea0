// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Searcher backed by an adaptive box tree.

use core::fmt::{self, Debug};

use kurbo::{Line, Point, Rect};
use tilebox_grid::Aabb2D;
use tilebox_tree::{BoxTree, BoxTreeOptions};

use crate::convert::{line_aabb, point_aabb, query_box, rect_to_aabb};
use crate::error::Result;
use crate::searcher::SpatialSearcher;

/// A [`BoxTree`] behind the searcher interface. Hits are exact.
///
/// Suits data with widely varying sizes, where no single grid size fits.
pub struct BoxTreeSearcher<T> {
    tree: BoxTree<T>,
}

impl<T> Debug for BoxTreeSearcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxTreeSearcher")
            .field("len", &self.tree.len())
            .field("extent", &self.tree.extent())
            .finish_non_exhaustive()
    }
}

impl<T> BoxTreeSearcher<T> {
    /// Wrap an existing tree.
    pub fn new(tree: BoxTree<T>) -> Self {
        Self { tree }
    }

    /// Build a tree over `items` with the rectangles reported by `extent`.
    ///
    /// The tree extent is derived from the items; no items gives an empty tree
    /// that derives its extent from later inserts.
    pub fn from_items<It, F>(items: It, mut extent: F, options: BoxTreeOptions) -> Result<Self>
    where
        It: IntoIterator<Item = T>,
        F: FnMut(&T) -> Rect,
    {
        let entries: Vec<_> = items
            .into_iter()
            .map(|item| (rect_to_aabb(extent(&item)), item))
            .collect();
        Self::from_entries(entries, options)
    }

    fn from_entries(entries: Vec<(Aabb2D, T)>, options: BoxTreeOptions) -> Result<Self> {
        let tree = if entries.is_empty() {
            BoxTree::with_options(options)?
        } else {
            BoxTree::from_entries(entries, options)?
        };
        Ok(Self { tree })
    }

    /// Add a value; returns its index in the tree's depth order.
    pub fn insert(&mut self, bbox: Aabb2D, value: T) -> Result<usize> {
        Ok(self.tree.insert(bbox, value)?)
    }

    /// Remove one value equal to `value` stored with exactly `bbox`.
    pub fn remove(&mut self, bbox: &Aabb2D, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.tree.remove(bbox, value)
    }

    /// The underlying tree.
    pub fn tree(&self) -> &BoxTree<T> {
        &self.tree
    }

    /// Unwrap the underlying tree.
    pub fn into_tree(self) -> BoxTree<T> {
        self.tree
    }
}

impl BoxTreeSearcher<usize> {
    /// Tree over segment indices of `lines`.
    pub fn from_segments(lines: &[Line], options: BoxTreeOptions) -> Result<Self> {
        Self::from_entries(lines.iter().map(line_aabb).zip(0..).collect(), options)
    }

    /// Tree over point indices of `points`.
    pub fn from_points(points: &[Point], options: BoxTreeOptions) -> Result<Self> {
        Self::from_entries(
            points.iter().map(|p| point_aabb(*p)).zip(0..).collect(),
            options,
        )
    }
}

impl<T: Clone> SpatialSearcher<T> for BoxTreeSearcher<T> {
    fn search<'a>(&'a self, rect: Rect, tolerance: f64) -> Box<dyn Iterator<Item = T> + 'a>
    where
        T: 'a,
    {
        let Some(query) = query_box(rect, tolerance) else {
            return Box::new(core::iter::empty());
        };
        Box::new(self.tree.search(&query).map(|e| e.value().clone()))
    }

    fn len(&self) -> usize {
        self.tree.len()
    }
}
