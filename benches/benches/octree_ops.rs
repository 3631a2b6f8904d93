// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::Vec3;
use overstory_octree::{Aabb, BoundsOctree, PointOctree, Ray};

fn gen_grid_boxes(n: usize, cell: f32) -> Vec<Aabb> {
    let mut out = Vec::with_capacity(n * n * n);
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let center = Vec3::new(x as f32, y as f32, z as f32) * cell;
                out.push(Aabb::new(center, Vec3::splat(cell * 0.5)));
            }
        }
    }
    out
}

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
    fn next_vec3(&mut self, extent: f32) -> Vec3 {
        Vec3::new(
            (self.next_f32() - 0.5) * extent,
            (self.next_f32() - 0.5) * extent,
            (self.next_f32() - 0.5) * extent,
        )
    }
}

fn gen_random_boxes(count: usize, extent: f32, side: f32) -> Vec<Aabb> {
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    (0..count)
        .map(|_| Aabb::new(rng.next_vec3(extent), Vec3::splat(side)))
        .collect()
}

fn gen_clustered_points(n_clusters: usize, per_cluster: usize, spread: f32) -> Vec<Vec3> {
    let mut rng = Rng::new(0xC1A5_7E55_9999_ABCD);
    let centers: Vec<Vec3> = (0..n_clusters).map(|_| rng.next_vec3(2000.0)).collect();
    let mut out = Vec::with_capacity(n_clusters * per_cluster);
    for c in centers {
        for _ in 0..per_cluster {
            out.push(c + rng.next_vec3(spread));
        }
    }
    out
}

fn bench_bounds_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("bounds_grid");
    for &n in &[8_usize, 12, 16] {
        let boxes = gen_grid_boxes(n, 10.0);
        group.throughput(Throughput::Elements((n * n * n) as u64));
        group.bench_function(format!("insert_query_n{n}"), |b| {
            b.iter_batched(
                || BoundsOctree::new(n as f32 * 10.0, Vec3::splat(n as f32 * 5.0), 1.0, 1.0).unwrap(),
                |mut tree| {
                    for (i, bb) in boxes.iter().copied().enumerate() {
                        tree.add(i as u32, bb);
                    }
                    let query = Aabb::new(Vec3::splat(40.0), Vec3::splat(40.0));
                    let hits = tree.colliding(query).count();
                    black_box(hits);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_bounds_random(c: &mut Criterion) {
    let mut group = c.benchmark_group("bounds_random");
    let boxes = gen_random_boxes(4096, 2000.0, 12.0);
    group.throughput(Throughput::Elements(boxes.len() as u64));
    group.bench_function("insert_query", |b| {
        b.iter_batched(
            || BoundsOctree::new(2000.0, Vec3::ZERO, 4.0, 1.25).unwrap(),
            |mut tree| {
                for (i, bb) in boxes.iter().copied().enumerate() {
                    tree.add(i as u32, bb);
                }
                let query = Aabb::new(Vec3::splat(100.0), Vec3::splat(400.0));
                let hits = tree.colliding(query).count();
                black_box(hits);
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_bounds_ray(c: &mut Criterion) {
    let mut group = c.benchmark_group("bounds_ray");
    let boxes = gen_random_boxes(4096, 2000.0, 12.0);
    group.bench_function("build_then_raycasts", |b| {
        b.iter_batched(
            || {
                let mut tree = BoundsOctree::new(2000.0, Vec3::ZERO, 4.0, 1.25).unwrap();
                for (i, bb) in boxes.iter().copied().enumerate() {
                    tree.add(i as u32, bb);
                }
                tree
            },
            |tree| {
                let mut total = 0_usize;
                for k in 0..64 {
                    let origin = Vec3::new(-1100.0, k as f32 * 30.0 - 960.0, -1100.0);
                    let ray = Ray::new(origin, Vec3::ONE);
                    total += tree.colliding_ray(ray, f32::INFINITY).count();
                }
                black_box(total);
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_point_clustered(c: &mut Criterion) {
    let mut group = c.benchmark_group("point_clustered");
    let points = gen_clustered_points(16, 256, 128.0);
    group.throughput(Throughput::Elements(points.len() as u64));
    group.bench_function("insert_nearby", |b| {
        b.iter_batched(
            || PointOctree::new(2000.0, Vec3::ZERO, 4.0).unwrap(),
            |mut tree| {
                for (i, p) in points.iter().copied().enumerate() {
                    tree.add(i as u32, p);
                }
                let hits = tree.nearby(Vec3::ZERO, 300.0).count();
                black_box(hits);
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_point_remove_heavy(c: &mut Criterion) {
    let mut group = c.benchmark_group("point_remove_heavy");
    let points = gen_clustered_points(16, 256, 128.0);
    group.bench_function("add_then_remove_at", |b| {
        b.iter_batched(
            || {
                let mut tree = PointOctree::new(2000.0, Vec3::ZERO, 4.0).unwrap();
                for (i, p) in points.iter().copied().enumerate() {
                    tree.add(i as u32, p);
                }
                tree
            },
            |mut tree| {
                for (i, p) in points.iter().copied().enumerate() {
                    tree.remove_at(&(i as u32), p);
                }
                black_box(tree.len());
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_bounds_grid,
    bench_bounds_random,
    bench_bounds_ray,
    bench_point_clustered,
    bench_point_remove_heavy,
);
criterion_main!(benches);
