// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exact rational tile positions.
//!
//! Every tile boundary is `u0 + counter * u / denominator` for the unit box
//! origin `u0` and size `u` along an axis. Denominators are powers of two, so
//! reducing the fraction first keeps boundaries shared by neighbouring tiles
//! bit-identical however deep they were computed.

/// Map the rational position `counter / denominator` (in unit box sizes) to a coordinate.
pub(crate) fn position(u0: f64, u: f64, counter: i64, denominator: i64) -> f64 {
    let (mut c, mut d) = (counter, denominator);
    while d > 1 && c & 1 == 0 {
        c >>= 1;
        d >>= 1;
    }
    #[allow(
        clippy::cast_precision_loss,
        reason = "counters stay far below 2^53 for supported depths"
    )]
    let (c, d) = (c as f64, d as f64);
    u0 + c * u / d
}

/// Per-axis cursor tracking the rational position of the tile reached while descending.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Cursor<const D: usize> {
    pub(crate) counter: [i64; D],
    pub(crate) denominator: [i64; D],
}

impl<const D: usize> Cursor<D> {
    /// Cursor positioned at the root tile.
    pub(crate) fn root() -> Self {
        Self {
            counter: [0; D],
            denominator: [4; D],
        }
    }

    /// Step into the lower (`upper == false`) or upper child along `dim`.
    pub(crate) fn descend(&mut self, dim: usize, upper: bool) {
        self.counter[dim] = 2 * self.counter[dim] + i64::from(upper);
        self.denominator[dim] *= 2;
    }
}
