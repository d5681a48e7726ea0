// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and helpers.

/// Axis-aligned bounding box in `D` dimensions.
///
/// Boxes are closed: two boxes that only touch along an edge or at a corner
/// intersect. A box is *valid* when every coordinate is finite and
/// `min[i] <= max[i]` on every axis. Boxes may be grown in place with
/// [`Aabb::include`] but are never shrunk except by reassignment.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb<const D: usize> {
    /// Minimum corner.
    pub min: [f64; D],
    /// Maximum corner.
    pub max: [f64; D],
}

/// Axis-aligned bounding box in 2D.
pub type Aabb2D = Aabb<2>;

impl<const D: usize> Aabb<D> {
    /// Create a box from its corners.
    pub const fn from_corners(min: [f64; D], max: [f64; D]) -> Self {
        Self { min, max }
    }

    /// A degenerate box covering exactly one point.
    pub const fn from_point(p: [f64; D]) -> Self {
        Self { min: p, max: p }
    }

    /// The number of dimensions.
    pub const fn dimension(&self) -> usize {
        D
    }

    /// Whether all coordinates are finite and the corners are ordered.
    pub fn is_valid(&self) -> bool {
        (0..D).all(|i| {
            self.min[i].is_finite() && self.max[i].is_finite() && self.min[i] <= self.max[i]
        })
    }

    /// Size of the box along `dim`.
    #[inline]
    pub fn extent(&self, dim: usize) -> f64 {
        self.max[dim] - self.min[dim]
    }

    /// The largest size over all axes.
    pub fn max_extent(&self) -> f64 {
        (0..D).map(|i| self.extent(i)).fold(0.0, f64::max)
    }

    /// Grow this box so that it also covers `other`.
    pub fn include(&mut self, other: &Self) {
        for i in 0..D {
            if other.min[i] < self.min[i] {
                self.min[i] = other.min[i];
            }
            if other.max[i] > self.max[i] {
                self.max[i] = other.max[i];
            }
        }
    }

    /// The smallest box covering both boxes.
    #[must_use]
    pub fn union(mut self, other: &Self) -> Self {
        self.include(other);
        self
    }

    /// Whether the two (closed) boxes share at least one point.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        (0..D).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }

    /// Whether `other` lies completely inside this box (boundaries included).
    pub fn contains(&self, other: &Self) -> bool {
        (0..D).all(|i| self.min[i] <= other.min[i] && other.max[i] <= self.max[i])
    }

    /// Whether the point lies inside this box (boundaries included).
    pub fn contains_point(&self, p: &[f64; D]) -> bool {
        (0..D).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }

    /// The common part of both boxes, or `None` when they are disjoint.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let mut out = *self;
        for i in 0..D {
            out.min[i] = self.min[i].max(other.min[i]);
            out.max[i] = self.max[i].min(other.max[i]);
            if out.min[i] > out.max[i] {
                return None;
            }
        }
        Some(out)
    }

    /// This box grown by `distance` on every side.
    #[must_use]
    pub fn expanded(&self, distance: f64) -> Self {
        let mut out = *self;
        for i in 0..D {
            out.min[i] -= distance;
            out.max[i] += distance;
        }
        out
    }

    /// Euclidean distance between the closest points of both boxes; zero when they intersect.
    pub fn distance(&self, other: &Self) -> f64 {
        let mut sum = 0.0;
        for i in 0..D {
            let gap = (other.min[i] - self.max[i]).max(self.min[i] - other.max[i]);
            if gap > 0.0 {
                sum += gap * gap;
            }
        }
        sum.sqrt()
    }

    /// Center point of the box.
    pub fn center(&self) -> [f64; D] {
        let mut c = self.min;
        for (i, v) in c.iter_mut().enumerate() {
            *v = 0.5 * (self.min[i] + self.max[i]);
        }
        c
    }
}

impl Aabb<2> {
    /// Create a 2D box from min/max coordinates.
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min: [min_x, min_y],
            max: [max_x, max_y],
        }
    }

    /// Create a 2D box from origin and size.
    pub const fn from_xywh(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::new(x, y, x + w, y + h)
    }

    /// Minimum x (left).
    #[inline]
    pub const fn min_x(&self) -> f64 {
        self.min[0]
    }

    /// Minimum y (bottom).
    #[inline]
    pub const fn min_y(&self) -> f64 {
        self.min[1]
    }

    /// Maximum x (right).
    #[inline]
    pub const fn max_x(&self) -> f64 {
        self.max[0]
    }

    /// Maximum y (top).
    #[inline]
    pub const fn max_y(&self) -> f64 {
        self.max[1]
    }

    /// Width along x.
    pub fn width(&self) -> f64 {
        self.extent(0)
    }

    /// Height along y.
    pub fn height(&self) -> f64 {
        self.extent(1)
    }
}
