// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Brute-force searcher with linear scans. Small and simple; good for small sets.

use core::fmt::{self, Debug};

use kurbo::{Line, Point, Rect};
use tilebox_grid::Aabb2D;

use crate::convert::{line_aabb, point_aabb, query_box, rect_to_aabb};
use crate::error::Result;
use crate::searcher::SpatialSearcher;

/// Flat list of boxed values, scanned on every search. Hits are exact.
#[derive(Clone)]
pub struct LinearSearcher<T> {
    entries: Vec<(Aabb2D, T)>,
}

impl<T> Default for LinearSearcher<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Debug for LinearSearcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearSearcher")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl<T> LinearSearcher<T> {
    /// Create an empty searcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect `items` with the rectangles reported by `extent`.
    ///
    /// Fails on the first item whose rectangle is not finite.
    pub fn from_items<I, F>(items: I, mut extent: F) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(&T) -> Rect,
    {
        let mut searcher = Self::new();
        for item in items {
            let bbox = rect_to_aabb(extent(&item));
            searcher.push(bbox, item)?;
        }
        Ok(searcher)
    }

    /// Add a value. Boxes with non-finite or inverted coordinates are rejected.
    pub fn push(&mut self, bbox: Aabb2D, value: T) -> Result<()> {
        if !bbox.is_valid() {
            log::warn!("rejected value with invalid box {bbox:?}");
            return Err(tilebox_grid::Error::InvalidBox.into());
        }
        self.entries.push((bbox, value));
        Ok(())
    }

    /// Drop all values.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl LinearSearcher<usize> {
    /// Searcher over segment indices.
    pub fn from_segments(lines: &[Line]) -> Result<Self> {
        Self::from_boxes(lines.iter().map(line_aabb))
    }

    /// Searcher over point indices.
    pub fn from_points(points: &[Point]) -> Result<Self> {
        Self::from_boxes(points.iter().map(|p| point_aabb(*p)))
    }

    fn from_boxes(boxes: impl Iterator<Item = Aabb2D>) -> Result<Self> {
        let mut searcher = Self::new();
        for (i, bbox) in boxes.enumerate() {
            searcher.push(bbox, i)?;
        }
        Ok(searcher)
    }
}

impl<T: Clone> SpatialSearcher<T> for LinearSearcher<T> {
    fn search<'a>(&'a self, rect: Rect, tolerance: f64) -> Box<dyn Iterator<Item = T> + 'a>
    where
        T: 'a,
    {
        let Some(query) = query_box(rect, tolerance) else {
            return Box::new(core::iter::empty());
        };
        Box::new(
            self.entries
                .iter()
                .filter(move |(bbox, _)| bbox.intersects(&query))
                .map(|(_, value)| value.clone()),
        )
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn touching_and_tolerance() {
        let lines = [
            Line::new((0.0, 0.0), (1.0, 0.0)),
            Line::new((2.0, 2.0), (3.0, 3.0)),
            Line::new((10.0, 10.0), (11.0, 10.0)),
        ];
        let s = LinearSearcher::from_segments(&lines).unwrap();
        assert_eq!(s.len(), 3);

        let hits: Vec<_> = s.search(Rect::new(1.0, 0.0, 2.0, 2.0), 0.0).collect();
        assert_eq!(hits, vec![0, 1]);

        // Segment 2 is 2.5 away from the query along both axes; segment 1 is 4.5 away.
        let q = Rect::new(7.5, 7.5, 7.5, 7.5);
        let hits: Vec<_> = s.search(q, 2.5).collect();
        assert_eq!(hits, vec![2]);
        let hits: Vec<_> = s.search(q, 2.25).collect();
        assert!(hits.is_empty());
        let hits: Vec<_> = s.search(q, 4.5).collect();
        assert_eq!(hits, vec![1, 2]);
    }

    #[test]
    fn predicate_filters_hits() {
        let pts: Vec<Point> = (0..10).map(|i| Point::new(f64::from(i), 0.0)).collect();
        let s = LinearSearcher::from_points(&pts).unwrap();
        let even = |i: &usize| i % 2 == 0;
        let hits: Vec<_> = s
            .search_filtered(Rect::new(0.0, -1.0, 5.0, 1.0), 0.0, &even)
            .collect();
        assert_eq!(hits, vec![0, 2, 4]);
    }

    #[test]
    fn items_with_extent_function() {
        let mut s = LinearSearcher::from_items(["a", "bb", "ccc"], |w| {
            Rect::new(0.0, 0.0, w.len() as f64, 1.0)
        })
        .unwrap();
        assert!(!s.is_empty());
        let hits: Vec<_> = s.search(Rect::new(2.5, 0.5, 2.5, 0.5), 0.0).collect();
        assert_eq!(hits, vec!["ccc"]);
        s.clear();
        assert!(s.is_empty());
    }

    #[test]
    fn invalid_boxes_are_rejected() {
        let err = LinearSearcher::from_items([1.0, f64::NAN], |x| Rect::new(*x, 0.0, 1.0, 1.0))
            .unwrap_err();
        assert_eq!(err, Error::Grid(tilebox_grid::Error::InvalidBox));

        let lines = [Line::new((0.0, 0.0), (1.0, f64::INFINITY))];
        assert!(LinearSearcher::from_segments(&lines).is_err());

        let mut s = LinearSearcher::new();
        assert!(s.push(Aabb2D::new(1.0, 1.0, 0.0, 0.0), 'x').is_err());
        assert!(s.is_empty());
    }
}
