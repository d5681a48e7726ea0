// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type for searcher construction.

/// Errors reported while building a searcher.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The grid index or its tiling rejected the input.
    #[error(transparent)]
    Grid(#[from] tilebox_grid::Error),
    /// The box tree rejected the input.
    #[error(transparent)]
    Tree(#[from] tilebox_tree::Error),
    /// A heuristic factor was not positive and finite.
    #[error("grid factor must be positive and finite, got {0}")]
    InvalidFactor(f64),
}

/// Result alias for searcher operations.
pub type Result<T> = core::result::Result<T, Error>;
