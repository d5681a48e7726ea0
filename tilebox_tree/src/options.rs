// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tuning knobs for [`BoxTree`](crate::BoxTree).

use crate::error::{Error, Result};

/// Largest supported refinement depth.
pub const MAX_TILE_LEVELS: u32 = 30;

/// Options controlling how a [`BoxTree`](crate::BoxTree) refines and coarsens.
///
/// ```
/// use tilebox_tree::BoxTreeOptions;
///
/// let options = BoxTreeOptions::default()
///     .with_max_elements_per_tile(16)
///     .with_max_tile_levels(12);
/// assert_eq!(options.join_threshold, 8);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoxTreeOptions {
    /// A leaf holding this many entries is split on the next dynamic insert.
    pub max_elements_per_tile: usize,
    /// A subtree whose count drops below this after a removal is merged into one leaf.
    pub join_threshold: usize,
    /// Whether inserts split full leaves and removals merge sparse subtrees.
    pub dynamic: bool,
    /// Maximum refinement depth per axis, counted in halvings of the tree extent.
    pub max_tile_levels: u32,
}

impl Default for BoxTreeOptions {
    fn default() -> Self {
        Self {
            max_elements_per_tile: 64,
            join_threshold: 32,
            dynamic: true,
            max_tile_levels: MAX_TILE_LEVELS,
        }
    }
}

impl BoxTreeOptions {
    /// Set the split threshold. The join threshold follows at half of it.
    #[must_use]
    pub fn with_max_elements_per_tile(mut self, max: usize) -> Self {
        self.max_elements_per_tile = max;
        self.join_threshold = max / 2;
        self
    }

    /// Set the join threshold.
    #[must_use]
    pub fn with_join_threshold(mut self, join: usize) -> Self {
        self.join_threshold = join;
        self
    }

    /// Enable or disable dynamic splitting and merging.
    #[must_use]
    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Set the maximum refinement depth.
    #[must_use]
    pub fn with_max_tile_levels(mut self, levels: u32) -> Self {
        self.max_tile_levels = levels;
        self
    }

    /// Check that the options describe a usable tree.
    pub fn validate(&self) -> Result<()> {
        if self.max_elements_per_tile == 0 {
            return Err(Error::InvalidOptions("max_elements_per_tile must be at least 1"));
        }
        if self.join_threshold > self.max_elements_per_tile {
            return Err(Error::InvalidOptions(
                "join_threshold must not exceed max_elements_per_tile",
            ));
        }
        check_tile_levels(self.max_tile_levels)
    }

    /// The largest position denominator refinement may reach.
    pub(crate) fn max_denominator(&self) -> i64 {
        1_i64 << self.max_tile_levels.min(MAX_TILE_LEVELS)
    }
}

pub(crate) fn check_tile_levels(levels: u32) -> Result<()> {
    if (1..=MAX_TILE_LEVELS).contains(&levels) {
        Ok(())
    } else {
        Err(Error::InvalidTileLevels {
            requested: levels,
            max: MAX_TILE_LEVELS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let o = BoxTreeOptions::default();
        assert_eq!(o.max_elements_per_tile, 64);
        assert_eq!(o.join_threshold, 32);
        assert!(o.dynamic);
        assert!(o.validate().is_ok());
        assert_eq!(o.max_denominator(), 1 << 30);
    }

    #[test]
    fn rejects_bad_options() {
        let zero = BoxTreeOptions::default().with_max_elements_per_tile(0);
        assert!(matches!(zero.validate(), Err(Error::InvalidOptions(_))));
        let join = BoxTreeOptions::default().with_join_threshold(65);
        assert!(matches!(join.validate(), Err(Error::InvalidOptions(_))));
        for levels in [0, 31] {
            let o = BoxTreeOptions::default().with_max_tile_levels(levels);
            assert_eq!(
                o.validate(),
                Err(Error::InvalidTileLevels {
                    requested: levels,
                    max: 30
                })
            );
        }
    }
}
