// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Heuristics deciding whether to index a geometry and how coarse the grid should be.

use kurbo::{Line, Point};
use tilebox_grid::{Aabb2D, TilingDefinition};

use crate::error::{Error, Result};

/// Grid size used when the data gives no usable estimate.
pub const FALLBACK_GRID_SIZE: f64 = 1.0;

/// Tuning for searcher construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearcherOptions {
    /// Brute force is used up to this many values; indexing pays off beyond it.
    pub min_indexing_count: usize,
    /// Grid size as a multiple of the average segment length (or item size).
    pub segment_grid_factor: f64,
    /// Grid size as a multiple of the expected spacing between points.
    pub point_grid_factor: f64,
}

impl Default for SearcherOptions {
    fn default() -> Self {
        Self {
            min_indexing_count: 200,
            segment_grid_factor: 2.5,
            point_grid_factor: 2.0,
        }
    }
}

impl SearcherOptions {
    /// Set the count up to which brute force is used.
    #[must_use]
    pub fn with_min_indexing_count(mut self, count: usize) -> Self {
        self.min_indexing_count = count;
        self
    }

    /// Set the multiple of the average segment length used as grid size.
    #[must_use]
    pub fn with_segment_grid_factor(mut self, factor: f64) -> Self {
        self.segment_grid_factor = factor;
        self
    }

    /// Set the multiple of the expected point spacing used as grid size.
    #[must_use]
    pub fn with_point_grid_factor(mut self, factor: f64) -> Self {
        self.point_grid_factor = factor;
        self
    }

    /// Check that both factors are positive and finite.
    pub fn validate(&self) -> Result<()> {
        for factor in [self.segment_grid_factor, self.point_grid_factor] {
            if !(factor.is_finite() && factor > 0.0) {
                return Err(Error::InvalidFactor(factor));
            }
        }
        Ok(())
    }

    /// Whether `count` values are worth indexing.
    pub fn should_index(&self, count: usize) -> bool {
        count > self.min_indexing_count
    }
}

/// Grid size for a set of segments: a multiple of their average length.
pub fn segment_grid_size(lines: &[Line], options: &SearcherOptions) -> f64 {
    let total: f64 = lines.iter().map(|l| l.p0.distance(l.p1)).sum();
    mean_based_size(total, lines.len(), options.segment_grid_factor)
}

/// Grid size for a set of items: a multiple of their average larger side.
pub fn item_grid_size<'a, I>(extents: I, options: &SearcherOptions) -> f64
where
    I: IntoIterator<Item = &'a Aabb2D>,
{
    let (total, count) = extents
        .into_iter()
        .fold((0.0, 0_usize), |(sum, n), b| (sum + b.max_extent(), n + 1));
    mean_based_size(total, count, options.segment_grid_factor)
}

/// Grid size for a set of points: a multiple of the expected spacing
/// `sqrt(area / n)` over their envelope.
///
/// Collinear points use the envelope length divided by the count instead.
pub fn point_grid_size(points: &[Point], options: &SearcherOptions) -> f64 {
    let Some(envelope) = envelope(points.iter().map(|p| Aabb2D::from_point([p.x, p.y]))) else {
        return FALLBACK_GRID_SIZE;
    };
    #[allow(clippy::cast_precision_loss, reason = "counts far below 2^52")]
    let n = points.len() as f64;
    let area = envelope.width() * envelope.height();
    let spacing = if area > 0.0 {
        (area / n).sqrt()
    } else {
        envelope.max_extent() / n
    };
    checked_size(options.point_grid_factor * spacing)
}

/// A tiling with square tiles of `tile_size`, anchored at the lower corner of `envelope`.
pub fn tiling_for(envelope: Option<&Aabb2D>, tile_size: f64) -> Result<TilingDefinition> {
    let (x, y) = envelope.map_or((0.0, 0.0), |e| (e.min_x(), e.min_y()));
    Ok(TilingDefinition::new(x, y, tile_size, tile_size)?)
}

/// Union of `boxes`, or `None` when there are none.
pub fn envelope<I>(boxes: I) -> Option<Aabb2D>
where
    I: IntoIterator<Item = Aabb2D>,
{
    boxes.into_iter().reduce(|acc, b| acc.union(&b))
}

fn mean_based_size(total: f64, count: usize, factor: f64) -> f64 {
    if count == 0 {
        return FALLBACK_GRID_SIZE;
    }
    #[allow(clippy::cast_precision_loss, reason = "counts far below 2^52")]
    let n = count as f64;
    checked_size(factor * total / n)
}

fn checked_size(size: f64) -> f64 {
    if size.is_finite() && size > 0.0 {
        size
    } else {
        log::debug!("grid size estimate {size} unusable, using {FALLBACK_GRID_SIZE}");
        FALLBACK_GRID_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_exclusive() {
        let o = SearcherOptions::default();
        assert!(!o.should_index(200));
        assert!(o.should_index(201));
        assert!(SearcherOptions::default().with_min_indexing_count(0).should_index(1));
    }

    #[test]
    fn factors_are_validated() {
        assert!(SearcherOptions::default().validate().is_ok());
        let bad = SearcherOptions::default().with_segment_grid_factor(0.0);
        assert_eq!(bad.validate(), Err(Error::InvalidFactor(0.0)));
        let bad = SearcherOptions::default().with_point_grid_factor(-1.0);
        assert_eq!(bad.validate(), Err(Error::InvalidFactor(-1.0)));
    }

    #[test]
    fn segment_size_follows_average_length() {
        let lines = [
            Line::new((0.0, 0.0), (3.0, 4.0)),
            Line::new((0.0, 0.0), (1.0, 0.0)),
        ];
        let size = segment_grid_size(&lines, &SearcherOptions::default());
        assert!((size - 7.5).abs() < 1e-12);
        assert_eq!(segment_grid_size(&[], &SearcherOptions::default()), FALLBACK_GRID_SIZE);
    }

    #[test]
    fn degenerate_segments_fall_back() {
        let lines = [Line::new((1.0, 1.0), (1.0, 1.0))];
        assert_eq!(
            segment_grid_size(&lines, &SearcherOptions::default()),
            FALLBACK_GRID_SIZE
        );
    }

    #[test]
    fn point_size_follows_density() {
        // 100 points on a 10 x 10 square: spacing 1.
        let pts: Vec<_> = (0..100)
            .map(|i| Point::new(f64::from(i % 10) * 10.0 / 9.0, f64::from(i / 10) * 10.0 / 9.0))
            .collect();
        let size = point_grid_size(&pts, &SearcherOptions::default());
        assert!((size - 2.0).abs() < 1e-9);

        let line: Vec<_> = (0..5).map(|i| Point::new(f64::from(i), 0.0)).collect();
        let size = point_grid_size(&line, &SearcherOptions::default());
        assert!((size - 2.0 * 4.0 / 5.0).abs() < 1e-12);

        assert_eq!(point_grid_size(&[], &SearcherOptions::default()), FALLBACK_GRID_SIZE);
    }

    #[test]
    fn item_size_uses_larger_side() {
        let boxes = [Aabb2D::new(0.0, 0.0, 2.0, 1.0), Aabb2D::new(0.0, 0.0, 1.0, 4.0)];
        let size = item_grid_size(&boxes, &SearcherOptions::default());
        assert!((size - 7.5).abs() < 1e-12);
    }

    #[test]
    fn tiling_is_anchored_at_envelope() {
        let env = envelope([Aabb2D::new(3.0, 4.0, 5.0, 6.0), Aabb2D::new(-1.0, 8.0, 0.0, 9.0)]);
        assert_eq!(env, Some(Aabb2D::new(-1.0, 4.0, 5.0, 9.0)));
        let t = tiling_for(env.as_ref(), 2.0).unwrap();
        assert_eq!(t.origin_x(), -1.0);
        assert_eq!(t.origin_y(), 4.0);
        assert!(tiling_for(None, 0.0).is_err());
    }
}
