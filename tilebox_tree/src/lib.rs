// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tilebox Tree: an adaptive loose box tree over `D`-dimensional boxes.
//!
//! [`BoxTree`] stores values with bounding boxes in a binary tree of tiles.
//! Each tile splits along one axis into two overlapping halves so that every
//! entry can sit in a tile not much larger than itself. The tree refines full
//! leaves as entries arrive, merges sparse subtrees as they leave, and grows
//! its extent when an entry lands outside it.
//!
//! - [`BoxTree::search`] and [`BoxTree::tiles`] enumerate entries and tiles
//!   intersecting a box. Both can be narrowed while running.
//! - [`BoxTree::neighborhoods`] joins two trees, pairing every entry of one
//!   with the entries of the other within a distance.
//! - [`BoxTree::tile_box`] hands out refined tile extents, useful to batch work
//!   by region.
//!
//! Tile boundaries are exact rational positions of the unit box, so shared
//! boundaries compare equal however deep they were computed.
//!
//! # Example
//!
//! ```rust
//! use tilebox_tree::{Aabb2D, BoxTree, BoxTreeOptions};
//!
//! let mut tree = BoxTree::with_options(BoxTreeOptions::default().with_max_elements_per_tile(8))
//!     .unwrap();
//! for i in 0..100 {
//!     let x = f64::from(i % 10);
//!     let y = f64::from(i / 10);
//!     tree.insert(Aabb2D::new(x, y, x + 0.5, y + 0.5), i).unwrap();
//! }
//! assert!(tree.verify());
//!
//! let mut hits: Vec<_> = tree
//!     .search(&Aabb2D::new(2.0, 2.0, 3.0, 3.0))
//!     .map(|e| *e.value())
//!     .collect();
//! hits.sort_unstable();
//! assert_eq!(hits, vec![22, 23, 32, 33]);
//!
//! assert!(tree.remove(&Aabb2D::new(2.0, 2.0, 2.5, 2.5), &22));
//! assert_eq!(tree.len(), 99);
//! ```

mod error;
mod neighborhood;
mod options;
mod position;
mod search;
mod tile;
mod tree;

pub use error::{Error, Result};
pub use neighborhood::{Neighborhood, Neighborhoods};
pub use options::{BoxTreeOptions, MAX_TILE_LEVELS};
pub use search::{Search, TileRef, Tiles};
pub use tile::TileEntry;
pub use tilebox_grid::{Aabb, Aabb2D};
pub use tree::{BoxTree, Iter};
