// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point octree proximity queries.
//!
//! Index a particle cloud, then ask for neighbors of a point and of a ray.
//!
//! Run:
//! - `cargo run -p overstory_demos --example point_octree_nearby`

use glam::Vec3;
use overstory_octree::{PointOctree, Ray};

fn main() {
    let mut tree = PointOctree::new(100.0, Vec3::ZERO, 1.0).unwrap();

    // A small diagonal cloud plus a few outliers.
    for i in 0..50 {
        tree.add(i, Vec3::splat(i as f32));
    }
    tree.add(100, Vec3::new(-30.0, 5.0, 0.0));
    tree.add(101, Vec3::new(0.0, -42.0, 17.0));

    println!("tree: {tree:?}");

    // Neighborhood of a point.
    let around = tree.nearby(Vec3::splat(25.0), 4.0).count();
    println!("within 4 of (25, 25, 25): {around}");

    // Everything within 2 units of a ray through the cloud.
    let ray = Ray::new(Vec3::ZERO, Vec3::ONE);
    let along: Vec<_> = tree.nearby_ray(ray, 2.0).collect();
    println!("within 2 of the diagonal ray: {} points", along.len());
    assert_eq!(along.len(), 50);

    // Exact on-ray matches only.
    let exact = tree.nearby_ray(ray, 0.0).count();
    println!("exactly on the ray: {exact} points");
}
