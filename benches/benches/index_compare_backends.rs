// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Line, Point, Rect, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tilebox_grid::{
    Aabb2D, DistanceMetric, GridIndex, IntSpatialHashIndex, ParallelSpatialHashIndex,
    SpatialHashIndex,
};
use tilebox_search::{
    BoxTreeSearcher, LinearSearcher, SearcherOptions, SpatialHashSearcher, SpatialSearcher,
};
use tilebox_tree::{BoxTree, BoxTreeOptions};

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

fn gen_mixed_rects(count: usize, extent: f64, seed: u64) -> Vec<Aabb2D> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            // Every 50th box is large; the rest are small.
            let size = if i % 50 == 0 { extent / 10.0 } else { extent / 500.0 };
            let x = rng.random_range(0.0..extent);
            let y = rng.random_range(0.0..extent);
            Aabb2D::from_xywh(x, y, rng.random_range(0.0..size), rng.random_range(0.0..size))
        })
        .collect()
}

fn gen_polyline(count: usize, seed: u64) -> Vec<Line> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut p = Point::ZERO;
    (0..count)
        .map(|_| {
            let q = p + Vec2::new(rng.random_range(-1.0..1.5), rng.random_range(-1.0..1.5));
            let line = Line::new(p, q);
            p = q;
            line
        })
        .collect()
}

fn bench_grid_variants(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_variants");
    for &n in &[64usize, 128] {
        let rects = gen_grid_rects(n, 10.0);
        let query = Aabb2D::from_xywh(100.0, 100.0, 200.0, 200.0);
        group.throughput(Throughput::Elements((n * n) as u64));

        group.bench_function(format!("tile_index_build_query_n{n}"), |b| {
            b.iter_batched(
                || SpatialHashIndex::<u32>::with_tile_size(25.0).unwrap(),
                |mut idx| {
                    for (i, r) in rects.iter().enumerate() {
                        let _ = idx.insert(i as u32, r);
                    }
                    black_box(idx.find_identifiers(&query).count());
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("packed_index_build_query_n{n}"), |b| {
            b.iter_batched(
                || IntSpatialHashIndex::<u32>::with_tile_size(25.0).unwrap(),
                |mut idx| {
                    for (i, r) in rects.iter().enumerate() {
                        let _ = idx.insert(i as u32, r);
                    }
                    black_box(idx.find_identifiers(&query).count());
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("parallel_index_bulk_query_n{n}"), |b| {
            b.iter_batched(
                || {
                    let items: Vec<_> = rects
                        .iter()
                        .enumerate()
                        .map(|(i, r)| (i as u32, *r))
                        .collect();
                    (ParallelSpatialHashIndex::<u32>::with_tile_size(25.0).unwrap(), items)
                },
                |(idx, items)| {
                    let _ = idx.insert_all(&items);
                    black_box(idx.find_identifiers(&query).count());
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_nearest_tiles(c: &mut Criterion) {
    let rects = gen_mixed_rects(20_000, 1000.0, 5);
    let mut idx = SpatialHashIndex::<u32>::with_tile_size(10.0).unwrap();
    for (i, r) in rects.iter().enumerate() {
        let _ = idx.insert(i as u32, r);
    }
    let mut group = c.benchmark_group("nearest_tiles");
    for metric in [DistanceMetric::Manhattan, DistanceMetric::Euclidean] {
        group.bench_function(format!("first_32_tiles_{metric:?}"), |b| {
            b.iter(|| {
                let tiles = GridIndex::tiles_around(&idx, 500.0, 500.0, metric, None).unwrap();
                black_box(tiles.take(32).map(|t| t.identifiers.len()).sum::<usize>())
            });
        });
    }
    group.finish();
}

fn bench_box_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("box_tree");
    let rects = gen_mixed_rects(20_000, 1000.0, 9);
    group.throughput(Throughput::Elements(rects.len() as u64));

    for &max in &[16usize, 64] {
        let options = BoxTreeOptions::default().with_max_elements_per_tile(max);
        group.bench_function(format!("build_incremental_m{max}"), |b| {
            b.iter(|| {
                let mut tree = BoxTree::with_options(options).unwrap();
                for (i, r) in rects.iter().enumerate() {
                    let _ = tree.insert(*r, i);
                }
                black_box(tree.len())
            });
        });
        group.bench_function(format!("build_from_entries_m{max}"), |b| {
            b.iter(|| {
                let entries = rects.iter().copied().zip(0_usize..);
                black_box(BoxTree::from_entries(entries, options).unwrap().len())
            });
        });

        let tree = BoxTree::from_entries(rects.iter().copied().zip(0_usize..), options).unwrap();
        let query = Aabb2D::from_xywh(400.0, 400.0, 100.0, 100.0);
        group.bench_function(format!("search_m{max}"), |b| {
            b.iter(|| black_box(tree.search(&query).count()));
        });
        group.bench_function(format!("self_neighborhoods_m{max}"), |b| {
            b.iter(|| {
                let pairs = tree.neighborhoods(&tree, 0.5, None).unwrap();
                black_box(pairs.map(|n| n.neighbours.len()).sum::<usize>())
            });
        });
    }
    group.finish();
}

fn bench_searchers(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment_searchers");
    let queries: Vec<Rect> = (0..100)
        .map(|i| {
            let x = f64::from(i) * 2.0;
            Rect::new(x, x * 0.5, x + 3.0, x * 0.5 + 3.0)
        })
        .collect();
    for &count in &[100usize, 1_000, 10_000] {
        let lines = gen_polyline(count, 17);
        let linear = LinearSearcher::from_segments(&lines).unwrap();
        let hash = SpatialHashSearcher::from_segments(&lines, &SearcherOptions::default()).unwrap();
        let tree = BoxTreeSearcher::from_segments(&lines, BoxTreeOptions::default()).unwrap();
        let searchers: [(&str, &dyn SpatialSearcher<usize>); 3] =
            [("linear", &linear), ("hash", &hash), ("tree", &tree)];
        for (name, searcher) in searchers {
            group.bench_function(format!("{name}_n{count}"), |b| {
                b.iter(|| {
                    let hits: usize =
                        queries.iter().map(|q| searcher.search(*q, 0.1).count()).sum();
                    black_box(hits)
                });
            });
        }
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_grid_variants,
    bench_nearest_tiles,
    bench_box_tree,
    bench_searchers
);
criterion_main!(benches);
