// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tilebox Search: one box-search interface over several index structures.
//!
//! [`SpatialSearcher`] answers "which values lie near this rectangle" the same
//! way for every backend:
//!
//! - [`LinearSearcher`]: a flat list scanned on every search.
//! - [`SpatialHashSearcher`]: a uniform grid hash index over slot numbers.
//! - [`BoxTreeSearcher`]: an adaptive [`BoxTree`](tilebox_tree::BoxTree).
//!
//! Queries are [`kurbo::Rect`]s grown by a tolerance, optionally filtered by a
//! predicate. Below a size threshold brute force is cheaper than any index;
//! [`create_searcher`] and [`create_segment_searcher`] make that call and pick a
//! grid size from the data, see [`SearcherOptions`].
//!
//! # Example
//!
//! ```rust
//! use kurbo::{Line, Rect};
//! use tilebox_search::{SearcherOptions, SpatialSearcher, create_segment_searcher};
//!
//! let lines: Vec<Line> = (0..1000)
//!     .map(|i| {
//!         let x = f64::from(i % 40);
//!         let y = f64::from(i / 40);
//!         Line::new((x, y), (x + 0.5, y + 0.5))
//!     })
//!     .collect();
//!
//! let searcher = create_segment_searcher(&lines, &SearcherOptions::default()).unwrap();
//! assert!(searcher.is_indexed());
//!
//! let mut hits: Vec<usize> = searcher.search(Rect::new(10.6, 3.6, 10.8, 3.8), 0.15).collect();
//! hits.sort_unstable();
//! assert_eq!(hits, vec![130]);
//! ```

mod adaptive;
mod convert;
mod error;
mod hash;
mod heuristics;
mod linear;
mod searcher;
mod tree;

pub use adaptive::{AdaptiveSearcher, create_searcher, create_segment_searcher};
pub use convert::{aabb_to_rect, line_aabb, point_aabb, rect_to_aabb};
pub use error::{Error, Result};
pub use hash::SpatialHashSearcher;
pub use heuristics::{
    FALLBACK_GRID_SIZE, SearcherOptions, envelope, item_grid_size, point_grid_size,
    segment_grid_size, tiling_for,
};
pub use linear::LinearSearcher;
pub use searcher::SpatialSearcher;
pub use tree::BoxTreeSearcher;
