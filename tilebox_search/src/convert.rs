// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conversions between Kurbo shapes and index boxes.

use kurbo::{Line, Point, Rect};
use tilebox_grid::Aabb2D;

/// The box covered by `rect`, with its corners ordered.
///
/// A rectangle with a non-finite coordinate maps to an invalid box as is, so
/// that it is rejected downstream instead of collapsing onto its finite corners.
pub fn rect_to_aabb(rect: Rect) -> Aabb2D {
    let r = if rect.is_finite() { rect.abs() } else { rect };
    Aabb2D::new(r.x0, r.y0, r.x1, r.y1)
}

/// The rectangle covered by `bbox`.
pub fn aabb_to_rect(bbox: &Aabb2D) -> Rect {
    Rect::new(bbox.min_x(), bbox.min_y(), bbox.max_x(), bbox.max_y())
}

/// Bounding box of a segment.
pub fn line_aabb(line: &Line) -> Aabb2D {
    rect_to_aabb(Rect::new(line.p0.x, line.p0.y, line.p1.x, line.p1.y))
}

/// Degenerate box at a point.
pub fn point_aabb(p: Point) -> Aabb2D {
    Aabb2D::from_point([p.x, p.y])
}

/// The query box for `rect` grown by `tolerance`, or `None` when nothing can match.
///
/// A negative tolerance shrinks the query; once it inverts, or when any input
/// is not finite, the query is empty.
pub(crate) fn query_box(rect: Rect, tolerance: f64) -> Option<Aabb2D> {
    if !rect.is_finite() {
        return None;
    }
    let query = rect_to_aabb(rect).expanded(tolerance);
    query.is_valid().then_some(query)
}
