// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tilebox_grid::{Aabb2D, SpatialHashIndex};
use tilebox_tree::{BoxTree, BoxTreeOptions};

use rstar::primitives::Rectangle;
use rstar::{AABB, RTree};

fn gen_grid_rects(n: usize, cell: f64) -> Vec<Aabb2D> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let x0 = x as f64 * cell;
            let y0 = y as f64 * cell;
            out.push(Aabb2D::from_xywh(x0, y0, cell, cell));
        }
    }
    out
}

fn to_rstar_rects(v: &[Aabb2D]) -> Vec<Rectangle<[f64; 2]>> {
    v.iter()
        .map(|r| Rectangle::from_corners(r.min, r.max))
        .collect()
}

fn bench_rtree_external_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_external_compare");
    for &n in &[64usize, 128] {
        let rects = gen_grid_rects(n, 10.0);
        let query = Aabb2D::from_xywh(100.0, 100.0, 400.0, 400.0);
        group.throughput(Throughput::Elements((n * n) as u64));

        group.bench_function(format!("box_tree_build_query_n{n}"), |b| {
            b.iter_batched(
                || BoxTree::with_options(BoxTreeOptions::default()).unwrap(),
                |mut tree| {
                    for (i, r) in rects.iter().enumerate() {
                        let _ = tree.insert(*r, i as u32);
                    }
                    black_box(tree.search(&query).count());
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("box_tree_build_query_bulk_n{n}"), |b| {
            b.iter_batched(
                || rects.iter().copied().zip(0_u32..).collect::<Vec<_>>(),
                |entries| {
                    let tree = BoxTree::from_entries(entries, BoxTreeOptions::default()).unwrap();
                    black_box(tree.search(&query).count());
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("grid_build_query_n{n}"), |b| {
            b.iter_batched(
                || SpatialHashIndex::<u32>::with_tile_size(40.0).unwrap(),
                |mut idx| {
                    for (i, r) in rects.iter().enumerate() {
                        let _ = idx.insert(i as u32, r);
                    }
                    black_box(idx.find_identifiers(&query).count());
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("rstar_build_query_bulk_n{n}"), |b| {
            b.iter_batched(
                || to_rstar_rects(&rects),
                |rectangles| {
                    let tree = RTree::bulk_load(rectangles);
                    let aabb = AABB::from_corners(query.min, query.max);
                    let hits: usize = tree.locate_in_envelope_intersecting(&aabb).count();
                    black_box(hits);
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rtree_external_compare);
criterion_main!(benches);
