// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point octree: payloads tagged by a single position.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::mem;

use glam::Vec3;

use crate::error::OctreeError;
use crate::types::{Aabb, Ray, distance_to_ray, octant_index, octant_offset};
use crate::{MAX_GROW_ATTEMPTS, NODE_CAPACITY};

/// A dynamic octree over payloads tagged with positions.
///
/// Structurally the point sibling of [`BoundsOctree`](crate::BoundsOctree),
/// minus looseness: a point can never straddle an octant boundary, so cells
/// are exact and every item sinks to a leaf. Supports proximity queries
/// around a point or along a ray; `radius = 0` asks for exact matches.
///
/// Queries emit matches in unspecified order.
///
/// # Example
///
/// ```
/// use glam::Vec3;
/// use overstory_octree::{PointOctree, Ray};
///
/// let mut tree = PointOctree::new(32.0, Vec3::ZERO, 1.0).unwrap();
/// tree.add("a", Vec3::splat(1.0));
/// tree.add("b", Vec3::new(4.0, 0.0, 0.0));
///
/// assert_eq!(tree.nearby(Vec3::splat(1.0), 0.5).count(), 1);
/// let hits: Vec<_> = tree.nearby_ray(Ray::new(Vec3::ZERO, Vec3::X), 0.5).collect();
/// assert_eq!(hits, [&"b"]);
/// ```
pub struct PointOctree<P> {
    root: Node<P>,
    initial_size: f32,
    initial_center: Vec3,
    min_node_size: f32,
    len: usize,
}

impl<P> PointOctree<P> {
    /// Create a tree with a root cell of side `initial_size` at
    /// `initial_center`, never subdividing below `min_node_size`.
    ///
    /// A `min_node_size` above `initial_size` is clamped down with a warning.
    pub fn new(
        initial_size: f32,
        initial_center: Vec3,
        min_node_size: f32,
    ) -> Result<Self, OctreeError> {
        if !initial_size.is_finite() || initial_size <= 0.0 {
            return Err(OctreeError::invalid("initial size must be positive and finite"));
        }
        if !min_node_size.is_finite() || min_node_size <= 0.0 {
            return Err(OctreeError::invalid(
                "minimum node size must be positive and finite",
            ));
        }
        let min_node_size = if min_node_size > initial_size {
            log::warn!(
                "minimum node size {min_node_size} exceeds initial size {initial_size}; clamping"
            );
            initial_size
        } else {
            min_node_size
        };
        Ok(Self {
            root: Node::new(initial_size, min_node_size, initial_center),
            initial_size,
            initial_center,
            min_node_size,
            len: 0,
        })
    }

    /// Insert `payload` at `position`, doubling the root toward the item
    /// until it fits.
    ///
    /// Returns `false` and logs an error if the position still does not fit
    /// after 20 grow attempts (or is not finite); the tree stays valid and
    /// the count unchanged.
    pub fn add(&mut self, payload: P, position: Vec3) -> bool {
        if !position.is_finite() {
            log::error!("dropping insertion tagged with non-finite position {position}");
            return false;
        }
        let mut attempts = 0;
        while !self.root.fits(position) {
            if attempts == MAX_GROW_ATTEMPTS {
                log::error!(
                    "dropping insertion: {attempts} grow attempts did not fit {position}"
                );
                return false;
            }
            self.grow(position - self.root.center);
            attempts += 1;
        }
        self.root.insert(payload, position);
        self.len += 1;
        true
    }

    /// Payloads within Euclidean `radius` of `position`.
    pub fn nearby(&self, position: Vec3, radius: f32) -> impl Iterator<Item = &P> {
        let mut out = Vec::new();
        self.root.nearby_into(position, radius, &mut out);
        out.into_iter()
    }

    /// Payloads within `radius` of `ray` (its origin counts for points
    /// projecting behind it).
    pub fn nearby_ray(&self, ray: Ray, radius: f32) -> impl Iterator<Item = &P> {
        let mut out = Vec::new();
        self.root.nearby_ray_into(&ray, radius, &mut out);
        out.into_iter()
    }

    /// Number of stored items.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no items.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bounds of the current root cell.
    pub const fn max_bounds(&self) -> Aabb {
        self.root.bounds
    }

    /// Cells of every leaf, depth-first: the live partition of space.
    pub fn leaf_bounds(&self) -> Vec<Aabb> {
        let mut out = Vec::new();
        self.root.leaf_bounds_into(&mut out);
        out
    }

    /// All stored payloads, depth-first.
    pub fn iter(&self) -> impl Iterator<Item = &P> {
        let mut out = Vec::new();
        self.root.payloads_into(&mut out);
        out.into_iter()
    }

    /// Drop every item and reset the root to the initial cell.
    pub fn clear(&mut self) {
        self.root = self.initial_root();
        self.len = 0;
    }

    /// Double the root cell toward `direction`. The old root is re-attached
    /// at the octant it occupies; the other seven octants always get fresh
    /// leaves, even when the old root was empty.
    fn grow(&mut self, direction: Vec3) {
        let step = direction.signum();
        let half = self.root.base_side / 2.0;
        let center = self.root.center + step * half;
        let side = self.root.base_side * 2.0;
        let min_side = self.min_node_size;
        let old = mem::replace(&mut self.root, Node::new(side, min_side, center));
        let attach_at = octant_index(center, old.center);
        let mut old = Some(old);
        self.root.children = Some(Box::new(core::array::from_fn(|index| {
            if index == attach_at {
                old.take().expect("each octant is visited once")
            } else {
                Node::new(side / 2.0, min_side, center + octant_offset(index, side))
            }
        })));
    }

    /// Step the root back down while all content fits a single octant. An
    /// emptied tree snaps back to the initial cell.
    fn shrink_root(&mut self) {
        if self.len == 0 {
            self.root = self.initial_root();
            return;
        }
        loop {
            let placeholder = self.initial_root();
            let root = mem::replace(&mut self.root, placeholder);
            let (root, shrunk) = root.shrink(self.initial_size);
            self.root = root;
            if !shrunk {
                break;
            }
        }
    }

    fn initial_root(&self) -> Node<P> {
        Node::new(self.initial_size, self.min_node_size, self.initial_center)
    }
}

impl<P: PartialEq> PointOctree<P> {
    /// Remove the first item whose payload equals `payload`, searching the
    /// whole tree. Returns whether anything was removed.
    pub fn remove(&mut self, payload: &P) -> bool {
        let removed = self.root.remove(payload);
        if removed {
            self.len -= 1;
            self.shrink_root();
        }
        removed
    }

    /// Remove an item by payload, descending only through the octant chain
    /// holding `position`. Faster than [`remove`](Self::remove) but requires
    /// the position the item was added with.
    pub fn remove_at(&mut self, payload: &P, position: Vec3) -> bool {
        let removed = self.root.remove_at(payload, position);
        if removed {
            self.len -= 1;
            self.shrink_root();
        }
        removed
    }
}

impl<P> core::fmt::Debug for PointOctree<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PointOctree")
            .field("len", &self.len)
            .field("root_side", &self.root.base_side)
            .field("root_center", &self.root.center)
            .finish_non_exhaustive()
    }
}

struct Entry<P> {
    payload: P,
    position: Vec3,
}

struct Node<P> {
    center: Vec3,
    base_side: f32,
    min_side: f32,
    /// Cached cell: side `base_side` about `center`.
    bounds: Aabb,
    entries: Vec<Entry<P>>,
    children: Option<Box<[Node<P>; 8]>>,
}

impl<P> Node<P> {
    fn new(base_side: f32, min_side: f32, center: Vec3) -> Self {
        Self {
            center,
            base_side,
            min_side,
            bounds: Aabb::new(center, Vec3::splat(base_side)),
            entries: Vec::new(),
            children: None,
        }
    }

    fn fits(&self, position: Vec3) -> bool {
        self.bounds.contains(position)
    }

    /// Insert an item known to fit this node's cell. Internal nodes always
    /// delegate to the best-fit child, so only leaves hold entries.
    fn insert(&mut self, payload: P, position: Vec3) {
        if self.children.is_none() {
            if self.entries.len() < NODE_CAPACITY || self.base_side / 2.0 < self.min_side {
                self.entries.push(Entry { payload, position });
                return;
            }
            self.split();
        }
        let best = octant_index(self.center, position);
        let children = self.children.as_mut().expect("split leaves children in place");
        children[best].insert(payload, position);
    }

    /// Subdivide into eight children and re-home every entry.
    fn split(&mut self) {
        let side = self.base_side;
        let (min_side, center) = (self.min_side, self.center);
        let children = self.children.insert(Box::new(core::array::from_fn(|index| {
            Node::new(side / 2.0, min_side, center + octant_offset(index, side))
        })));
        for entry in mem::take(&mut self.entries) {
            let best = octant_index(center, entry.position);
            children[best].insert(entry.payload, entry.position);
        }
    }

    fn has_any_entries(&self) -> bool {
        if !self.entries.is_empty() {
            return true;
        }
        self.children
            .as_ref()
            .is_some_and(|children| children.iter().any(Node::has_any_entries))
    }

    fn nearby_into<'t>(&'t self, position: Vec3, radius: f32, out: &mut Vec<&'t P>) {
        let query = Aabb::new(position, Vec3::splat(2.0 * radius));
        if !self.bounds.intersects(&query) {
            return;
        }
        for entry in &self.entries {
            if entry.position.distance_squared(position) <= radius * radius {
                out.push(&entry.payload);
            }
        }
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.nearby_into(position, radius, out);
            }
        }
    }

    fn nearby_ray_into<'t>(&'t self, ray: &Ray, radius: f32, out: &mut Vec<&'t P>) {
        let mut reach = self.bounds;
        reach.expand(2.0 * radius);
        if !reach.intersect_ray(ray) {
            return;
        }
        for entry in &self.entries {
            if distance_to_ray(ray, entry.position) <= radius {
                out.push(&entry.payload);
            }
        }
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.nearby_ray_into(ray, radius, out);
            }
        }
    }

    fn leaf_bounds_into(&self, out: &mut Vec<Aabb>) {
        match self.children.as_ref() {
            Some(children) => {
                for child in children.iter() {
                    child.leaf_bounds_into(out);
                }
            }
            None => out.push(self.bounds),
        }
    }

    fn payloads_into<'t>(&'t self, out: &mut Vec<&'t P>) {
        out.extend(self.entries.iter().map(|e| &e.payload));
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.payloads_into(out);
            }
        }
    }

    /// True when this node plus its children hold few enough items to
    /// collapse back into a single leaf. All children must be leaves.
    fn should_merge(&self) -> bool {
        let mut total = self.entries.len();
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                if child.children.is_some() {
                    return false;
                }
                total += child.entries.len();
            }
        }
        total <= NODE_CAPACITY
    }

    /// Pull all child items up and drop the children.
    fn merge(&mut self) {
        if let Some(children) = self.children.take() {
            for mut child in *children {
                self.entries.append(&mut child.entries);
            }
        }
    }

    /// One shrink step; a point always fits its best-fit octant, so only the
    /// single-occupied-octant condition matters. Never shrinks below
    /// `size_limit`.
    fn shrink(mut self, size_limit: f32) -> (Self, bool) {
        if self.base_side < 2.0 * size_limit {
            return (self, false);
        }
        if self.entries.is_empty() && self.children.is_none() {
            return (self, false);
        }

        let mut best: Option<usize> = None;
        for entry in &self.entries {
            let octant = octant_index(self.center, entry.position);
            if best.is_some_and(|b| b != octant) {
                return (self, false);
            }
            best = Some(octant);
        }
        if let Some(children) = self.children.as_ref() {
            for (index, child) in children.iter().enumerate() {
                if child.has_any_entries() {
                    if best.is_some_and(|b| b != index) {
                        return (self, false);
                    }
                    best = Some(index);
                }
            }
        }
        let Some(best) = best else {
            return (self, false);
        };

        match self.children.take() {
            None => {
                self.center += octant_offset(best, self.base_side);
                self.base_side /= 2.0;
                self.bounds = Aabb::new(self.center, Vec3::splat(self.base_side));
                (self, true)
            }
            Some(children) => {
                let child = (*children)
                    .into_iter()
                    .nth(best)
                    .expect("octant index in range");
                (child, true)
            }
        }
    }
}

impl<P: PartialEq> Node<P> {
    /// Remove by payload equality, scanning the whole subtree. Merges on the
    /// way back up.
    fn remove(&mut self, payload: &P) -> bool {
        let mut removed = false;
        if let Some(at) = self.entries.iter().position(|e| e.payload == *payload) {
            self.entries.swap_remove(at);
            removed = true;
        }
        if !removed && let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                if child.remove(payload) {
                    removed = true;
                    break;
                }
            }
        }
        if removed && self.children.is_some() && self.should_merge() {
            self.merge();
        }
        removed
    }

    /// Remove by payload equality, descending only through the best-fit
    /// octant for `position`.
    fn remove_at(&mut self, payload: &P, position: Vec3) -> bool {
        let mut removed = false;
        if let Some(at) = self.entries.iter().position(|e| e.payload == *payload) {
            self.entries.swap_remove(at);
            removed = true;
        } else if let Some(children) = self.children.as_mut() {
            let best = octant_index(self.center, position);
            removed = children[best].remove_at(payload, position);
        }
        if removed && self.children.is_some() && self.should_merge() {
            self.merge();
        }
        removed
    }
}
