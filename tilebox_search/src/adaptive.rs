// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Choosing between brute force and a grid index by data size.

use kurbo::{Line, Rect};

use crate::error::Result;
use crate::hash::SpatialHashSearcher;
use crate::heuristics::SearcherOptions;
use crate::linear::LinearSearcher;
use crate::searcher::SpatialSearcher;

/// A searcher picked by [`create_searcher`].
#[derive(Debug)]
pub enum AdaptiveSearcher<T> {
    /// Few values: scanned on every search.
    Linear(LinearSearcher<T>),
    /// Many values: located through a grid hash index.
    Hash(SpatialHashSearcher<T>),
}

impl<T> AdaptiveSearcher<T> {
    /// Whether the values went into a grid index.
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::Hash(_))
    }
}

/// Build a searcher over `items`, indexing them only when
/// [`SearcherOptions::should_index`] says the count is worth it.
pub fn create_searcher<T, It, F>(
    items: It,
    extent: F,
    options: &SearcherOptions,
) -> Result<AdaptiveSearcher<T>>
where
    It: IntoIterator<Item = T>,
    F: FnMut(&T) -> Rect,
{
    options.validate()?;
    let items: Vec<T> = items.into_iter().collect();
    if options.should_index(items.len()) {
        log::debug!("indexing {} items in a grid", items.len());
        Ok(AdaptiveSearcher::Hash(SpatialHashSearcher::from_items(
            items, extent, options,
        )?))
    } else {
        Ok(AdaptiveSearcher::Linear(LinearSearcher::from_items(
            items, extent,
        )?))
    }
}

/// Like [`create_searcher`] for segment indices, sizing the grid from the
/// average segment length.
pub fn create_segment_searcher(
    lines: &[Line],
    options: &SearcherOptions,
) -> Result<AdaptiveSearcher<usize>> {
    options.validate()?;
    if options.should_index(lines.len()) {
        log::debug!("indexing {} segments in a grid", lines.len());
        Ok(AdaptiveSearcher::Hash(SpatialHashSearcher::from_segments(
            lines, options,
        )?))
    } else {
        Ok(AdaptiveSearcher::Linear(LinearSearcher::from_segments(
            lines,
        )?))
    }
}

impl<T: Clone> SpatialSearcher<T> for AdaptiveSearcher<T> {
    fn search<'a>(&'a self, rect: Rect, tolerance: f64) -> Box<dyn Iterator<Item = T> + 'a>
    where
        T: 'a,
    {
        match self {
            Self::Linear(s) => s.search(rect, tolerance),
            Self::Hash(s) => s.search(rect, tolerance),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Linear(s) => s.len(),
            Self::Hash(s) => s.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_decides_the_backend() {
        let opts = SearcherOptions::default().with_min_indexing_count(10);
        let lines: Vec<_> = (0..10)
            .map(|i| Line::new((f64::from(i), 0.0), (f64::from(i) + 0.5, 1.0)))
            .collect();
        let small = create_segment_searcher(&lines, &opts).unwrap();
        assert!(!small.is_indexed());

        let more: Vec<_> = (0..11)
            .map(|i| Line::new((f64::from(i), 0.0), (f64::from(i) + 0.5, 1.0)))
            .collect();
        let large = create_segment_searcher(&more, &opts).unwrap();
        assert!(large.is_indexed());

        let q = Rect::new(2.2, 0.2, 3.2, 0.4);
        let mut a: Vec<_> = small.search(q, 0.0).collect();
        let mut b: Vec<_> = large.search(q, 0.0).collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, vec![2, 3]);
        assert_eq!(a, b);
    }

    #[test]
    fn bad_factor_is_reported_for_both_backends() {
        let opts = SearcherOptions::default().with_segment_grid_factor(f64::NAN);
        assert!(create_searcher([1_u8], |_| Rect::ZERO, &opts).is_err());
        assert!(create_segment_searcher(&[], &opts).is_err());
    }
}
