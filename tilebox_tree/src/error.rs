// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type for box tree operations.

/// Errors reported by [`BoxTree`](crate::BoxTree) and its enumerators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The unit box had to be derived from data, but no data was given.
    #[error("cannot derive a unit box from empty data")]
    EmptyData,
    /// A box had non-finite coordinates or inverted corners.
    #[error("box coordinates must be finite with min <= max")]
    InvalidBox,
    /// The operation needs a tree whose extent is known.
    #[error("the tree has no extent yet")]
    Uninitialized,
    /// A running search may only be narrowed, never widened.
    #[error("a running search box may only shrink")]
    SearchBoxWidened,
    /// The maximum refinement depth is out of range.
    #[error("max tile levels must be in 1..={max}, got {requested}")]
    InvalidTileLevels {
        /// Requested level count.
        requested: u32,
        /// Largest supported level count.
        max: u32,
    },
    /// Tree options are inconsistent.
    #[error("invalid tree options: {0}")]
    InvalidOptions(&'static str),
    /// A join distance was negative or not a number.
    #[error("distance must be non-negative, got {0}")]
    InvalidDistance(f64),
}

/// Result alias for box tree operations.
pub type Result<T> = core::result::Result<T, Error>;
