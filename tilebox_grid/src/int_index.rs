// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grid hash index keyed by packed integers.

use crate::grid_index::TileKey;
use crate::index::HashGridIndex;
use crate::tiling::TileIndex;

/// A tile index packed into one `u64`: east in the high half, north in the low half.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackedTile(pub u64);

impl TileKey for PackedTile {
    #[inline]
    fn from_tile(tile: TileIndex) -> Self {
        Self((u64::from(tile.east.cast_unsigned()) << 32) | u64::from(tile.north.cast_unsigned()))
    }

    #[inline]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "each half holds exactly one i32"
    )]
    fn tile(self) -> TileIndex {
        TileIndex::new(
            ((self.0 >> 32) as u32).cast_signed(),
            (self.0 as u32).cast_signed(),
        )
    }
}

/// Grid hash index that hashes tiles as single integers.
///
/// Same behavior as [`SpatialHashIndex`](crate::SpatialHashIndex) with a cheaper key.
pub type IntSpatialHashIndex<T> = HashGridIndex<T, PackedTile>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Aabb2D;

    #[test]
    fn packing_keeps_sign() {
        for tile in [
            TileIndex::new(0, 0),
            TileIndex::new(-1, 1),
            TileIndex::new(i32::MIN, i32::MAX),
            TileIndex::new(7, -300_000),
        ] {
            assert_eq!(PackedTile::from_tile(tile).tile(), tile);
        }
        assert_ne!(
            PackedTile::from_tile(TileIndex::new(1, 0)),
            PackedTile::from_tile(TileIndex::new(0, 1))
        );
    }

    #[test]
    fn behaves_like_tile_keyed_index() {
        let mut idx: IntSpatialHashIndex<u32> = IntSpatialHashIndex::with_tile_size(10.0).unwrap();
        idx.insert(1, &Aabb2D::new(-5.0, -5.0, 5.0, 5.0)).unwrap();
        idx.insert(2, &Aabb2D::new(6.0, 6.0, 8.0, 8.0)).unwrap();
        let mut hits: Vec<_> = idx
            .find_identifiers(&Aabb2D::new(0.0, 0.0, 1.0, 1.0))
            .collect();
        hits.sort_unstable();
        assert_eq!(hits, vec![1, 2]);
        assert_eq!(idx.identifiers_in(TileIndex::new(-1, -1)), &[1]);
    }
}
