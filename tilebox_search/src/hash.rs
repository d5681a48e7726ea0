// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Searcher backed by a grid hash index.

use core::fmt::{self, Debug};

use kurbo::{Line, Point, Rect};
#[cfg(feature = "parallel")]
use tilebox_grid::ParallelSpatialHashIndex;
use tilebox_grid::{Aabb2D, GridIndex, SpatialHashIndex, TilingDefinition};

use crate::convert::{line_aabb, point_aabb, query_box, rect_to_aabb};
use crate::error::Result;
use crate::heuristics::{
    SearcherOptions, envelope, item_grid_size, point_grid_size, segment_grid_size, tiling_for,
};
use crate::searcher::SpatialSearcher;

/// Values in a slot arena, located through a grid index over slot numbers.
///
/// The grid narrows a search down to the tiles touching the query; each
/// candidate is then tested against its own box, so hits are exact. The order
/// of hits is unspecified.
///
/// The index type `I` defaults to the sequential [`SpatialHashIndex`]; any
/// [`GridIndex`] over `usize` works.
pub struct SpatialHashSearcher<T, I = SpatialHashIndex<usize>> {
    index: I,
    entries: Vec<Option<(Aabb2D, T)>>,
    len: usize,
}

impl<T, I: GridIndex<usize>> Debug for SpatialHashSearcher<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialHashSearcher")
            .field("tiling", self.index.tiling())
            .field("total_slots", &self.entries.len())
            .field("alive", &self.len)
            .finish_non_exhaustive()
    }
}

impl<T, I: GridIndex<usize>> SpatialHashSearcher<T, I> {
    /// Wrap `index`. Anything it already holds is dropped.
    pub fn with_index(mut index: I) -> Self {
        index.clear();
        Self {
            index,
            entries: Vec::new(),
            len: 0,
        }
    }

    /// The tiling of the underlying grid.
    pub fn tiling(&self) -> &TilingDefinition {
        self.index.tiling()
    }

    /// The underlying grid index.
    pub fn index(&self) -> &I {
        &self.index
    }

    /// Add a value and return its slot.
    pub fn insert(&mut self, bbox: Aabb2D, value: T) -> Result<usize> {
        let slot = self.entries.len();
        self.index.insert(slot, &bbox)?;
        self.entries.push(Some((bbox, value)));
        self.len += 1;
        Ok(slot)
    }

    /// Remove one value equal to `value` stored with exactly `bbox`.
    pub fn remove(&mut self, bbox: &Aabb2D, value: &T) -> bool
    where
        T: PartialEq,
    {
        if !bbox.is_valid() {
            return false;
        }
        let entries = &self.entries;
        let found = self.index.query_rect(bbox).find(|&slot| {
            matches!(entries.get(slot), Some(Some((b, v))) if b == bbox && v == value)
        });
        let Some(slot) = found else {
            return false;
        };
        self.index.remove(&slot, bbox);
        if let Some(entry) = self.entries.get_mut(slot) {
            *entry = None;
        }
        self.len -= 1;
        true
    }

    /// Drop all values. The tiling is kept.
    pub fn clear(&mut self) {
        self.index.clear();
        self.entries.clear();
        self.len = 0;
    }
}

impl<T> SpatialHashSearcher<T> {
    /// Create an empty searcher over `tiling`.
    pub fn new(tiling: TilingDefinition) -> Self {
        Self::with_index(SpatialHashIndex::new(tiling))
    }

    /// Index `items` with the rectangles reported by `extent`.
    ///
    /// The grid is anchored at the items' envelope and sized from their average
    /// larger side.
    pub fn from_items<It, F>(items: It, extent: F, options: &SearcherOptions) -> Result<Self>
    where
        It: IntoIterator<Item = T>,
        F: FnMut(&T) -> Rect,
    {
        let (entries, tiling) = prepare(items, extent, options)?;
        let mut searcher = Self::new(tiling);
        for (bbox, value) in entries {
            searcher.insert(bbox, value)?;
        }
        Ok(searcher)
    }
}

impl SpatialHashSearcher<usize> {
    /// Index segments by position in `lines`, sized from their average length.
    pub fn from_segments(lines: &[Line], options: &SearcherOptions) -> Result<Self> {
        options.validate()?;
        let boxes: Vec<_> = lines.iter().map(line_aabb).collect();
        let size = segment_grid_size(lines, options);
        Self::from_boxes(boxes, size)
    }

    /// Index points by position in `points`, sized from their density.
    pub fn from_points(points: &[Point], options: &SearcherOptions) -> Result<Self> {
        options.validate()?;
        let boxes: Vec<_> = points.iter().map(|p| point_aabb(*p)).collect();
        let size = point_grid_size(points, options);
        Self::from_boxes(boxes, size)
    }

    fn from_boxes(boxes: Vec<Aabb2D>, tile_size: f64) -> Result<Self> {
        let env = envelope(boxes.iter().copied().filter(Aabb2D::is_valid));
        let mut searcher = Self::new(tiling_for(env.as_ref(), tile_size)?);
        for (i, bbox) in boxes.into_iter().enumerate() {
            searcher.insert(bbox, i)?;
        }
        Ok(searcher)
    }
}

#[cfg(feature = "parallel")]
impl<T> SpatialHashSearcher<T, ParallelSpatialHashIndex<usize>> {
    /// Like [`SpatialHashSearcher::from_items`], loading the grid on the rayon pool.
    pub fn from_items_parallel<It, F>(
        items: It,
        extent: F,
        options: &SearcherOptions,
    ) -> Result<Self>
    where
        It: IntoIterator<Item = T>,
        F: FnMut(&T) -> Rect,
    {
        let (entries, tiling) = prepare(items, extent, options)?;
        let index = ParallelSpatialHashIndex::new(tiling);
        let slots: Vec<(usize, Aabb2D)> = entries.iter().map(|(b, _)| *b).enumerate().collect();
        index.insert_all(&slots)?;
        Ok(Self {
            index,
            len: entries.len(),
            entries: entries.into_iter().map(Some).collect(),
        })
    }
}

type Prepared<T> = (Vec<(Aabb2D, T)>, TilingDefinition);

fn prepare<T, It, F>(items: It, mut extent: F, options: &SearcherOptions) -> Result<Prepared<T>>
where
    It: IntoIterator<Item = T>,
    F: FnMut(&T) -> Rect,
{
    options.validate()?;
    let entries: Vec<_> = items
        .into_iter()
        .map(|item| (rect_to_aabb(extent(&item)), item))
        .collect();
    let size = item_grid_size(entries.iter().map(|(b, _)| b), options);
    let env = envelope(entries.iter().map(|(b, _)| *b).filter(Aabb2D::is_valid));
    let tiling = tiling_for(env.as_ref(), size)?;
    Ok((entries, tiling))
}

impl<T: Clone, I: GridIndex<usize>> SpatialSearcher<T> for SpatialHashSearcher<T, I> {
    fn search<'a>(&'a self, rect: Rect, tolerance: f64) -> Box<dyn Iterator<Item = T> + 'a>
    where
        T: 'a,
    {
        let Some(query) = query_box(rect, tolerance) else {
            return Box::new(core::iter::empty());
        };
        let entries = &self.entries;
        Box::new(
            self.index
                .query_rect(&query)
                .filter_map(move |slot| match entries.get(slot) {
                    Some(Some((bbox, value))) if bbox.intersects(&query) => Some(value.clone()),
                    _ => None,
                }),
        )
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn sorted(it: impl Iterator<Item = usize>) -> Vec<usize> {
        let mut v: Vec<_> = it.collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn segments_are_found_exactly() {
        let lines = [
            Line::new((0.0, 0.0), (1.0, 0.0)),
            Line::new((0.5, 0.5), (0.9, 0.9)),
            Line::new((20.0, 20.0), (21.0, 21.0)),
        ];
        let s = SpatialHashSearcher::from_segments(&lines, &SearcherOptions::default()).unwrap();
        assert_eq!(s.len(), 3);
        // Shares a tile with segment 1 but not its box.
        assert_eq!(sorted(s.search(Rect::new(0.0, -0.5, 0.4, 0.2), 0.0)), vec![0]);
        assert_eq!(sorted(s.search(Rect::new(0.0, -0.5, 0.4, 0.2), 0.3)), vec![0, 1]);
        assert_eq!(sorted(s.search(Rect::new(19.0, 19.0, 19.5, 19.5), 0.5)), vec![2]);
    }

    #[test]
    fn remove_and_reinsert() {
        let pts: Vec<_> = (0..20).map(|i| Point::new(f64::from(i), 0.0)).collect();
        let mut s = SpatialHashSearcher::from_points(&pts, &SearcherOptions::default()).unwrap();
        let bbox = Aabb2D::from_point([3.0, 0.0]);
        assert!(s.remove(&bbox, &3));
        assert!(!s.remove(&bbox, &3));
        assert_eq!(s.len(), 19);
        assert_eq!(sorted(s.search(Rect::new(2.0, 0.0, 4.0, 0.0), 0.0)), vec![2, 4]);

        let slot = s.insert(bbox, 3).unwrap();
        assert_eq!(slot, 20);
        assert_eq!(sorted(s.search(Rect::new(2.0, 0.0, 4.0, 0.0), 0.0)), vec![2, 3, 4]);

        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.search(Rect::new(-100.0, -100.0, 100.0, 100.0), 0.0).count(), 0);
    }

    #[test]
    fn invalid_items_are_rejected() {
        let items = [1.0, f64::NAN];
        let err = SpatialHashSearcher::from_items(
            items,
            |x| Rect::new(*x, *x, *x + 1.0, *x + 1.0),
            &SearcherOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, Error::Grid(tilebox_grid::Error::InvalidBox));
    }

    #[test]
    fn predicate_sees_candidates() {
        let pts: Vec<_> = (0..50).map(|i| Point::new(f64::from(i), f64::from(i))).collect();
        let s = SpatialHashSearcher::from_points(&pts, &SearcherOptions::default()).unwrap();
        let small = |i: &usize| *i < 12;
        let hits = sorted(s.search_filtered(Rect::new(10.0, 10.0, 20.0, 20.0), 0.0, &small));
        assert_eq!(hits, vec![10, 11]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_load_matches_sequential() {
        let items: Vec<_> = (0..300).map(|i| f64::from(i) * 0.37).collect();
        let extent = |x: &f64| Rect::new(*x, x.sin() * 10.0, *x + 0.5, x.sin() * 10.0 + 0.5);
        let opts = SearcherOptions::default();
        let seq = SpatialHashSearcher::from_items(items.iter().copied(), extent, &opts).unwrap();
        let par = SpatialHashSearcher::from_items_parallel(items.iter().copied(), extent, &opts)
            .unwrap();
        assert_eq!(seq.len(), par.len());
        let q = Rect::new(20.0, -3.0, 60.0, 4.0);
        let key = |v: f64| v.to_bits();
        let mut a: Vec<_> = seq.search(q, 0.25).map(key).collect();
        let mut b: Vec<_> = par.search(q, 0.25).map(key).collect();
        a.sort_unstable();
        b.sort_unstable();
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }
}
