// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::Vec3;
use overstory_octree::PointOctree;
use rstar::RTree;

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f32(&mut self) -> f32 {
        let v = self.next_u64() >> 40;
        (v as f32) / ((1_u64 << 24) as f32)
    }
}

fn gen_random_points(count: usize, extent: f32) -> Vec<[f32; 3]> {
    let mut rng = Rng::new(0xFACE_FEED_CAFE_BABE);
    (0..count)
        .map(|_| {
            [
                (rng.next_f32() - 0.5) * extent,
                (rng.next_f32() - 0.5) * extent,
                (rng.next_f32() - 0.5) * extent,
            ]
        })
        .collect()
}

fn bench_point_external_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("point_external_compare");
    for &count in &[4096_usize, 16384] {
        let points = gen_random_points(count, 2000.0);
        let radius = 250.0_f32;
        group.throughput(Throughput::Elements(count as u64));

        group.bench_function(format!("overstory_build_query_n{count}"), |b| {
            b.iter_batched(
                || PointOctree::new(2000.0, Vec3::ZERO, 4.0).unwrap(),
                |mut tree| {
                    for (i, p) in points.iter().enumerate() {
                        tree.add(i as u32, Vec3::from_array(*p));
                    }
                    let hits = tree.nearby(Vec3::ZERO, radius).count();
                    black_box(hits);
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("rstar_build_query_n{count}"), |b| {
            b.iter_batched(
                || points.clone(),
                |points| {
                    let tree = RTree::bulk_load(points);
                    let hits = tree
                        .locate_within_distance([0.0, 0.0, 0.0], radius * radius)
                        .count();
                    black_box(hits);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_point_external_compare);
criterion_main!(benches);
