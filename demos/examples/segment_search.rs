// Copyright 2025 the Tilebox Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Searching the segments of a long polyline.
//!
//! Let the heuristics decide whether and how to index, then look for the
//! segments near a point with a tolerance.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p tilebox_demos --example segment_search`

use kurbo::{Line, Point, Rect};
use tilebox_search::{
    BoxTreeSearcher, SearcherOptions, SpatialSearcher, create_segment_searcher,
    segment_grid_size,
};
use tilebox_tree::BoxTreeOptions;

fn spiral(count: usize) -> Vec<Line> {
    let points: Vec<Point> = (0..=count)
        .map(|i| {
            let t = i as f64 * 0.05;
            Point::new(t.cos() * t, t.sin() * t)
        })
        .collect();
    points.windows(2).map(|w| Line::new(w[0], w[1])).collect()
}

fn main() {
    env_logger::init();

    let options = SearcherOptions::default();
    for count in [50, 5_000] {
        let lines = spiral(count);
        log::info!("searching a spiral of {} segments", lines.len());
        let searcher = create_segment_searcher(&lines, &options).unwrap();
        println!(
            "{count} segments: indexed {}, grid size estimate {:.3}",
            searcher.is_indexed(),
            segment_grid_size(&lines, &options)
        );

        let probe = Point::new(10.0, 0.0);
        let rect = Rect::from_points(probe, probe);
        let odd = |i: &usize| i % 2 == 1;
        let hits: Vec<_> = searcher.search(rect, 1.0).collect();
        let odd_hits: Vec<_> = searcher.search_filtered(rect, 1.0, &odd).collect();
        println!("  near {probe:?}: {} segments, {} odd", hits.len(), odd_hits.len());

        let tree = BoxTreeSearcher::from_segments(&lines, BoxTreeOptions::default()).unwrap();
        assert_eq!(tree.search(rect, 1.0).count(), hits.len());
    }
}
