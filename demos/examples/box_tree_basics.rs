// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Box tree basics.
//!
//! Fill a tree, watch it split, search it, narrow a running search, and
//! remove entries until the tree joins back up.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p tilebox_demos --example box_tree_basics`

use tilebox_tree::{Aabb2D, BoxTree, BoxTreeOptions};

fn main() {
    env_logger::init();

    let options = BoxTreeOptions::default().with_max_elements_per_tile(4);
    let mut tree = BoxTree::with_options(options).unwrap();
    for i in 0..32 {
        let x = f64::from(i % 8) * 2.0;
        let y = f64::from(i / 8) * 2.0;
        tree.insert(Aabb2D::new(x, y, x + 1.0, y + 1.0), i).unwrap();
    }
    log::info!("filled tree with {} entries", tree.len());
    println!("entries: {}, extent: {:?}", tree.len(), tree.extent());

    let everything = Aabb2D::new(-1e9, -1e9, 1e9, 1e9);
    for tile in tree.tiles(&everything) {
        println!(
            "tile {:?} count {} own {} leaf {}",
            tile.extent,
            tile.count,
            tile.entries.len(),
            tile.is_leaf
        );
    }

    let query = Aabb2D::new(3.0, 3.0, 7.0, 5.0);
    let mut hits: Vec<_> = tree.search(&query).map(|e| *e.value()).collect();
    hits.sort_unstable();
    println!("search {query:?}: {hits:?}");

    // Narrow a running search after its first hit.
    let mut search = tree.search(&everything);
    let first = search.next().map(|e| *e.value());
    search.narrow(query).unwrap();
    let rest = search.count();
    println!("first {first:?}, then {rest} more inside the narrowed box");

    // Far away entries grow the tree.
    tree.insert(Aabb2D::new(100.0, 100.0, 101.0, 101.0), 99).unwrap();
    println!("after growing: {:?}", tree.extent());

    for i in 0..32 {
        let x = f64::from(i % 8) * 2.0;
        let y = f64::from(i / 8) * 2.0;
        assert!(tree.remove(&Aabb2D::new(x, y, x + 1.0, y + 1.0), &i));
    }
    println!(
        "after removal: {} entries in {} leaves",
        tree.len(),
        tree.leaves(false).len()
    );
    assert!(tree.verify());
}
