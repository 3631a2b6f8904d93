// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounds octree basics.
//!
//! Insert a few boxes, run a box query and a ray pick, then remove.
//!
//! Run:
//! - `cargo run -p overstory_demos --example bounds_octree_basics`

use glam::Vec3;
use overstory_octree::{Aabb, BoundsOctree, Ray};

fn main() {
    let mut tree = BoundsOctree::new(64.0, Vec3::ZERO, 1.0, 1.25).unwrap();

    tree.add("floor", Aabb::new(Vec3::new(0.0, -0.5, 0.0), Vec3::new(40.0, 1.0, 40.0)));
    tree.add("player", Aabb::new(Vec3::new(2.0, 1.0, 0.0), Vec3::splat(2.0)));
    tree.add("crate", Aabb::new(Vec3::new(-6.0, 0.5, 3.0), Vec3::ONE));
    tree.add("far tower", Aabb::new(Vec3::new(150.0, 10.0, 0.0), Vec3::new(4.0, 20.0, 4.0)));

    // The tower grew the root; everything is still reachable.
    println!("tree: {tree:?}");
    println!("live cells: {}", tree.leaf_bounds().len());

    // What overlaps the area around the origin?
    let around_origin = Aabb::new(Vec3::ZERO, Vec3::splat(8.0));
    let overlapping: Vec<_> = tree.colliding(around_origin).collect();
    println!("overlapping {:?}: {:?}", around_origin, overlapping);

    // Pick along a camera ray, limited to 30 units.
    let ray = Ray::new(Vec3::new(2.0, 1.0, -20.0), Vec3::Z);
    let picked: Vec<_> = tree.colliding_ray(ray, 30.0).collect();
    println!("ray pick: {picked:?}");
    assert!(picked.contains(&&"player"));

    // Remove by payload; the root shrinks back once content allows it.
    for name in ["floor", "player", "crate", "far tower"] {
        assert!(tree.remove(&name));
    }
    println!("after removal: {tree:?}");
    assert!(tree.is_empty());
}
