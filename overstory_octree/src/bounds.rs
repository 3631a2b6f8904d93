// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Loose bounds octree: payloads tagged by world-space AABBs.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::mem;

use glam::Vec3;

use crate::error::OctreeError;
use crate::types::{Aabb, Ray, octant_index, octant_offset};
use crate::{MAX_GROW_ATTEMPTS, NODE_CAPACITY};

const MIN_LOOSENESS: f32 = 1.0;
const MAX_LOOSENESS: f32 = 2.0;

/// A dynamic loose octree over payloads tagged with bounding boxes.
///
/// The root doubles away from its center whenever an insertion falls outside
/// it, and steps back down as removals empty all but one octant. Cells may be
/// *loose*: each cell's effective bounds are its nominal side multiplied by a
/// looseness factor in `[1, 2]`, so that small boxes near a cell boundary
/// still sink below the root instead of piling up on it.
///
/// Queries emit matches in unspecified order.
///
/// # Example
///
/// ```
/// use glam::Vec3;
/// use overstory_octree::{Aabb, BoundsOctree, Ray};
///
/// let mut tree = BoundsOctree::new(32.0, Vec3::ZERO, 1.0, 1.25).unwrap();
/// tree.add("crate", Aabb::new(Vec3::new(2.0, 0.0, 0.0), Vec3::splat(2.0)));
///
/// assert!(tree.is_colliding(Aabb::new(Vec3::ZERO, Vec3::splat(4.0))));
/// let hits: Vec<_> = tree
///     .colliding_ray(Ray::new(Vec3::new(-8.0, 0.0, 0.0), Vec3::X), 20.0)
///     .collect();
/// assert_eq!(hits, [&"crate"]);
///
/// assert!(tree.remove(&"crate"));
/// assert!(tree.is_empty());
/// ```
pub struct BoundsOctree<P> {
    root: Node<P>,
    initial_size: f32,
    initial_center: Vec3,
    min_node_size: f32,
    looseness: f32,
    len: usize,
}

impl<P> BoundsOctree<P> {
    /// Create a tree with a root cell of side `initial_size` at
    /// `initial_center`, never subdividing below `min_node_size`.
    ///
    /// `looseness` is clamped into `[1, 2]`. A `min_node_size` above
    /// `initial_size` is clamped down with a warning while the loose slack
    /// still covers it; beyond `initial_size * looseness` the configuration
    /// is rejected.
    pub fn new(
        initial_size: f32,
        initial_center: Vec3,
        min_node_size: f32,
        looseness: f32,
    ) -> Result<Self, OctreeError> {
        if !initial_size.is_finite() || initial_size <= 0.0 {
            return Err(OctreeError::invalid("initial size must be positive and finite"));
        }
        if !min_node_size.is_finite() || min_node_size <= 0.0 {
            return Err(OctreeError::invalid(
                "minimum node size must be positive and finite",
            ));
        }
        if !looseness.is_finite() {
            return Err(OctreeError::invalid("looseness must be finite"));
        }
        let looseness = looseness.clamp(MIN_LOOSENESS, MAX_LOOSENESS);
        let min_node_size = if min_node_size > initial_size {
            if min_node_size > initial_size * looseness {
                return Err(OctreeError::invalid(
                    "minimum node size exceeds even the loose initial cell",
                ));
            }
            log::warn!(
                "minimum node size {min_node_size} exceeds initial size {initial_size}; clamping"
            );
            initial_size
        } else {
            min_node_size
        };
        Ok(Self {
            root: Node::new(initial_size, min_node_size, looseness, initial_center),
            initial_size,
            initial_center,
            min_node_size,
            looseness,
            len: 0,
        })
    }

    /// Insert `payload` tagged with `bounds`, doubling the root toward the
    /// item until it fits.
    ///
    /// Returns `false` and logs an error if the item still does not fit
    /// after 20 grow attempts (or its bounds are not finite); the tree stays
    /// valid and the count unchanged.
    pub fn add(&mut self, payload: P, bounds: Aabb) -> bool {
        if !bounds.min().is_finite() || !bounds.max().is_finite() {
            log::error!("dropping insertion tagged with non-finite bounds {bounds:?}");
            return false;
        }
        let mut attempts = 0;
        while !self.root.fits(&bounds) {
            if attempts == MAX_GROW_ATTEMPTS {
                log::error!("dropping insertion: {attempts} grow attempts did not fit {bounds:?}");
                return false;
            }
            self.grow(bounds.center() - self.root.center);
            attempts += 1;
        }
        self.root.insert(payload, bounds);
        self.len += 1;
        true
    }

    /// Whether any stored box intersects `query`. Early-exits on first hit.
    pub fn is_colliding(&self, query: Aabb) -> bool {
        self.root.is_colliding(&query)
    }

    /// Whether any stored box is hit by `ray` within `max_distance`.
    pub fn is_colliding_ray(&self, ray: Ray, max_distance: f32) -> bool {
        self.root.is_colliding_ray(&ray, max_distance)
    }

    /// Payloads whose boxes intersect `query`.
    pub fn colliding(&self, query: Aabb) -> impl Iterator<Item = &P> {
        let mut out = Vec::new();
        self.root.colliding_into(&query, &mut out);
        out.into_iter()
    }

    /// Payloads whose boxes are hit by `ray` within `max_distance`.
    pub fn colliding_ray(&self, ray: Ray, max_distance: f32) -> impl Iterator<Item = &P> {
        let mut out = Vec::new();
        self.root.colliding_ray_into(&ray, max_distance, &mut out);
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

    /// Effective bounds of the current root cell.
    pub const fn max_bounds(&self) -> Aabb {
        self.root.bounds
    }

    /// Effective cells of every leaf, depth-first: the live partition of
    /// space. Useful for debug drawing.
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

    /// Double the root cell toward `direction`. The old root becomes the
    /// child octant it geometrically occupies; seven fresh leaves fill the
    /// rest. An old root with no items anywhere is discarded instead.
    fn grow(&mut self, direction: Vec3) {
        let step = direction.signum();
        let half = self.root.base_side / 2.0;
        let center = self.root.center + step * half;
        let side = self.root.base_side * 2.0;
        let old = mem::replace(
            &mut self.root,
            Node::new(side, self.min_node_size, self.looseness, center),
        );
        if old.has_any_entries() {
            let (min_side, looseness) = (self.min_node_size, self.looseness);
            let attach_at = octant_index(center, old.center);
            let mut old = Some(old);
            self.root.children = Some(Box::new(core::array::from_fn(|index| {
                if index == attach_at {
                    old.take().expect("each octant is visited once")
                } else {
                    Node::new(
                        side / 2.0,
                        min_side,
                        looseness,
                        center + octant_offset(index, side),
                    )
                }
            })));
        }
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
        Node::new(
            self.initial_size,
            self.min_node_size,
            self.looseness,
            self.initial_center,
        )
    }
}

impl<P: PartialEq> BoundsOctree<P> {
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

    /// Remove an item by payload, descending only through the octants that
    /// could hold `bounds`. Faster than [`remove`](Self::remove) but requires
    /// the bounds the item was added with.
    pub fn remove_at(&mut self, payload: &P, bounds: Aabb) -> bool {
        let removed = self.root.remove_at(payload, &bounds);
        if removed {
            self.len -= 1;
            self.shrink_root();
        }
        removed
    }
}

impl<P> core::fmt::Debug for BoundsOctree<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BoundsOctree")
            .field("len", &self.len)
            .field("root_side", &self.root.base_side)
            .field("root_center", &self.root.center)
            .field("looseness", &self.looseness)
            .finish_non_exhaustive()
    }
}

struct Entry<P> {
    payload: P,
    bounds: Aabb,
}

struct Node<P> {
    center: Vec3,
    base_side: f32,
    min_side: f32,
    looseness: f32,
    /// Cached effective cell: side `base_side * looseness` about `center`.
    bounds: Aabb,
    entries: Vec<Entry<P>>,
    children: Option<Box<[Node<P>; 8]>>,
}

impl<P> Node<P> {
    fn new(base_side: f32, min_side: f32, looseness: f32, center: Vec3) -> Self {
        Self {
            center,
            base_side,
            min_side,
            looseness,
            bounds: cell(center, base_side * looseness),
            entries: Vec::new(),
            children: None,
        }
    }

    fn fits(&self, bounds: &Aabb) -> bool {
        self.bounds.contains_aabb(bounds)
    }

    /// Insert an item known to fit this node's effective cell.
    ///
    /// Items are pushed to the deepest child whose cell fully contains them;
    /// an item straddling its best-fit octant stays here.
    fn insert(&mut self, payload: P, bounds: Aabb) {
        if self.children.is_none() {
            if self.entries.len() < NODE_CAPACITY || self.base_side / 2.0 < self.min_side {
                self.entries.push(Entry { payload, bounds });
                return;
            }
            self.split();
        }
        let best = octant_index(self.center, bounds.center());
        let children = self.children.as_mut().expect("split leaves children in place");
        if children[best].fits(&bounds) {
            children[best].insert(payload, bounds);
        } else {
            self.entries.push(Entry { payload, bounds });
        }
    }

    /// Subdivide into eight children and re-home every entry whose best-fit
    /// octant fully contains it.
    fn split(&mut self) {
        let side = self.base_side;
        let (min_side, looseness, center) = (self.min_side, self.looseness, self.center);
        let children = self.children.insert(Box::new(core::array::from_fn(|index| {
            Node::new(
                side / 2.0,
                min_side,
                looseness,
                center + octant_offset(index, side),
            )
        })));
        for entry in mem::take(&mut self.entries) {
            let best = octant_index(center, entry.bounds.center());
            if children[best].fits(&entry.bounds) {
                children[best].insert(entry.payload, entry.bounds);
            } else {
                self.entries.push(entry);
            }
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

    fn is_colliding(&self, query: &Aabb) -> bool {
        if !self.bounds.intersects(query) {
            return false;
        }
        if self.entries.iter().any(|e| e.bounds.intersects(query)) {
            return true;
        }
        self.children
            .as_ref()
            .is_some_and(|children| children.iter().any(|child| child.is_colliding(query)))
    }

    fn is_colliding_ray(&self, ray: &Ray, max_distance: f32) -> bool {
        if !self
            .bounds
            .intersect_ray_t(ray)
            .is_some_and(|t| t <= max_distance)
        {
            return false;
        }
        if self.entries.iter().any(|e| {
            e.bounds
                .intersect_ray_t(ray)
                .is_some_and(|t| t <= max_distance)
        }) {
            return true;
        }
        self.children.as_ref().is_some_and(|children| {
            children
                .iter()
                .any(|child| child.is_colliding_ray(ray, max_distance))
        })
    }

    fn colliding_into<'t>(&'t self, query: &Aabb, out: &mut Vec<&'t P>) {
        if !self.bounds.intersects(query) {
            return;
        }
        for entry in &self.entries {
            if entry.bounds.intersects(query) {
                out.push(&entry.payload);
            }
        }
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.colliding_into(query, out);
            }
        }
    }

    fn colliding_ray_into<'t>(&'t self, ray: &Ray, max_distance: f32, out: &mut Vec<&'t P>) {
        if !self
            .bounds
            .intersect_ray_t(ray)
            .is_some_and(|t| t <= max_distance)
        {
            return;
        }
        for entry in &self.entries {
            if entry
                .bounds
                .intersect_ray_t(ray)
                .is_some_and(|t| t <= max_distance)
            {
                out.push(&entry.payload);
            }
        }
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.colliding_ray_into(ray, max_distance, out);
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

    /// One shrink step. When all content sits in a single octant, a leaf
    /// moves down onto that octant's cell in place, and an internal node is
    /// replaced by the child itself. Never shrinks below `size_limit`.
    fn shrink(mut self, size_limit: f32) -> (Self, bool) {
        if self.base_side < 2.0 * size_limit {
            return (self, false);
        }
        if self.entries.is_empty() && self.children.is_none() {
            return (self, false);
        }

        let mut best: Option<usize> = None;
        for entry in &self.entries {
            let octant = octant_index(self.center, entry.bounds.center());
            if best.is_some_and(|b| b != octant) {
                return (self, false);
            }
            let target = cell(
                self.center + octant_offset(octant, self.base_side),
                self.base_side / 2.0 * self.looseness,
            );
            if !target.contains_aabb(&entry.bounds) {
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
                self.bounds = cell(self.center, self.base_side * self.looseness);
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

    /// Remove by payload equality, descending only through best-fit octants
    /// for `bounds`.
    fn remove_at(&mut self, payload: &P, bounds: &Aabb) -> bool {
        let mut removed = false;
        if let Some(at) = self.entries.iter().position(|e| e.payload == *payload) {
            self.entries.swap_remove(at);
            removed = true;
        } else if let Some(children) = self.children.as_mut() {
            let best = octant_index(self.center, bounds.center());
            removed = children[best].remove_at(payload, bounds);
        }
        if removed && self.children.is_some() && self.should_merge() {
            self.merge();
        }
        removed
    }
}

fn cell(center: Vec3, side: f32) -> Aabb {
    Aabb::new(center, Vec3::splat(side))
}
