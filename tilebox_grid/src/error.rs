// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type for tiling and grid index operations.

/// Errors reported by tiling definitions and grid indexes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Tile width and height must be positive and finite.
    #[error("tile size must be positive and finite, got {width} x {height}")]
    InvalidTileSize {
        /// Requested tile width.
        width: f64,
        /// Requested tile height.
        height: f64,
    },
    /// A box had non-finite coordinates or inverted corners.
    #[error("box coordinates must be finite with min <= max")]
    InvalidBox,
    /// A search distance was negative or not a number.
    #[error("distance must be non-negative, got {0}")]
    InvalidDistance(f64),
    /// The requested operation exists in the API but has no implementation.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

/// Result alias for grid operations.
pub type Result<T> = core::result::Result<T, Error>;
