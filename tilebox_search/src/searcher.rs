// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Searcher trait shared by every backing structure.

use kurbo::Rect;

/// Uniform box search over a set of values.
///
/// Every value whose box intersects `rect` grown by `tolerance` on each side is
/// reported exactly once, and no other value is. The order of hits depends on
/// the backing structure.
///
/// A query that is not finite, or that a negative tolerance inverts, reports
/// nothing.
pub trait SpatialSearcher<T> {
    /// Values near `rect`.
    fn search<'a>(&'a self, rect: Rect, tolerance: f64) -> Box<dyn Iterator<Item = T> + 'a>
    where
        T: 'a;

    /// Values near `rect` that also satisfy `predicate`.
    fn search_filtered<'a>(
        &'a self,
        rect: Rect,
        tolerance: f64,
        predicate: &'a dyn Fn(&T) -> bool,
    ) -> Box<dyn Iterator<Item = T> + 'a>
    where
        T: 'a,
    {
        Box::new(self.search(rect, tolerance).filter(move |v| predicate(v)))
    }

    /// Number of values held.
    fn len(&self) -> usize;

    /// Whether no value is held.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
