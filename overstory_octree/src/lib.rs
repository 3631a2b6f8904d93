// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=overstory_octree --heading-base-level=0

//! Overstory Octree: dynamic loose octrees for 3D spatial indexing.
//!
//! Overstory Octree is a reusable building block for games, simulations, and
//! editors that need fast "what is here?" answers over moving 3D content.
//!
//! - [`BoundsOctree`]: payloads tagged by an axis-aligned bounding box, with
//!   collision queries against a box or a ray.
//! - [`PointOctree`]: payloads tagged by a single position, with proximity
//!   queries around a point or along a ray.
//!
//! Both trees are *dynamic*: the root doubles away from its center whenever
//! an insertion lands outside it, and steps back down once removals leave all
//! remaining content in a single octant. There is no rebuild step and no
//! up-front world size to get exactly right; the initial cell is just a hint.
//!
//! The bounds tree is *loose*: every cell's effective bounds can be inflated
//! by a looseness factor in `[1, 2]`, so a small box sitting on a cell
//! boundary still fits a deep cell instead of clogging the root. A factor of
//! `1.0` gives a strict octree; `1.25` is a reasonable default for moving
//! content.
//!
//! Geometry comes from [`glam`]: positions and directions are `Vec3`, and the
//! crate's own [`Aabb`] and [`Ray`] carry the intersection predicates the
//! trees prune with. Configuration problems surface as [`OctreeError`];
//! noteworthy runtime events (clamped configuration, abandoned oversized
//! insertions) go to the [`log`] facade and are discarded if no logger is
//! installed.
//!
//! # Example
//!
//! ```rust
//! use glam::Vec3;
//! use overstory_octree::{Aabb, BoundsOctree, Ray};
//!
//! // A 32-unit world about the origin; cells never split below one unit.
//! let mut tree = BoundsOctree::new(32.0, Vec3::ZERO, 1.0, 1.25).unwrap();
//!
//! tree.add("player", Aabb::new(Vec3::new(2.0, 1.0, 0.0), Vec3::splat(2.0)));
//! tree.add("crate", Aabb::new(Vec3::new(-6.0, 0.5, 3.0), Vec3::ONE));
//!
//! // Box overlap query.
//! let near_origin = Aabb::new(Vec3::ZERO, Vec3::splat(6.0));
//! assert!(tree.is_colliding(near_origin));
//!
//! // Ray pick with a maximum distance.
//! let ray = Ray::new(Vec3::new(2.0, 1.0, -10.0), Vec3::Z);
//! let hit: Vec<_> = tree.colliding_ray(ray, 20.0).collect();
//! assert_eq!(hit, [&"player"]);
//!
//! // Items far outside the initial cell just grow the tree.
//! tree.add("far", Aabb::new(Vec3::splat(500.0), Vec3::ONE));
//! assert_eq!(tree.len(), 3);
//! ```
//!
//! Proximity queries on the point tree:
//!
//! ```rust
//! use glam::Vec3;
//! use overstory_octree::PointOctree;
//!
//! let mut tree = PointOctree::new(64.0, Vec3::ZERO, 1.0).unwrap();
//! for (id, x) in [(1_u32, -20.0), (2, 0.5), (3, 21.0)] {
//!     tree.add(id, Vec3::new(x, 0.0, 0.0));
//! }
//!
//! let close: Vec<_> = tree.nearby(Vec3::ZERO, 5.0).collect();
//! assert_eq!(close, [&2]);
//! assert_eq!(tree.nearby(Vec3::ZERO, 25.0).count(), 3);
//! ```
//!
//! ## Choosing parameters
//!
//! - `initial_size`: roughly the world size you expect. Too small only costs
//!   a few grow steps; too large only costs tree depth.
//! - `min_node_size`: the cell side below which subdivision stops. Pick the
//!   typical size of your smallest objects; smaller values deepen the tree
//!   without improving pruning.
//! - `looseness` (bounds tree): `1.0` for strict cells, up to `2.0` for
//!   cells that overlap their neighbors by a full half. Looser cells push
//!   boundary-straddling boxes deeper at the cost of fuzzier pruning.
//!
//! ## Semantics
//!
//! - All containment and intersection tests are inclusive: touching counts.
//! - A query radius of `0` is valid and means exact-point (or on-ray) tests.
//! - Mutation is single-threaded; share a tree freely across threads for
//!   concurrent reads only.
//! - Query results come in no particular order.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod bounds;
pub mod error;
pub mod point;
pub mod types;

pub use bounds::BoundsOctree;
pub use error::OctreeError;
pub use point::PointOctree;
pub use types::{Aabb, Ray};

/// Items a leaf holds before it subdivides (when subdivision is allowed).
pub(crate) const NODE_CAPACITY: usize = 8;

/// Root-doubling attempts before an insertion is rejected as unplaceable.
pub(crate) const MAX_GROW_ATTEMPTS: usize = 20;
