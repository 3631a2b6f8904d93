// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types: axis-aligned boxes, rays, and the intersection
//! predicates the trees prune with.

use glam::Vec3;

/// Directions shorter than this normalize to the zero vector.
const MIN_DIRECTION_LENGTH_SQUARED: f32 = 1e-10;

/// An axis-aligned bounding box, stored as a center and a size.
///
/// All containment and intersection tests are inclusive: a point on a face is
/// contained, and two boxes sharing a face intersect.
///
/// # Example
///
/// ```
/// use glam::Vec3;
/// use overstory_octree::Aabb;
///
/// let b = Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 2.0, 3.0));
/// assert_eq!(b.min(), Vec3::new(0.5, 0.0, -0.5));
/// assert_eq!(b.max(), Vec3::new(1.5, 2.0, 2.5));
/// assert!(b.contains(Vec3::new(1.0, 0.0, 2.5)));
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    center: Vec3,
    size: Vec3,
}

impl Aabb {
    /// Create a box from its center and size. Size components must be
    /// non-negative and finite.
    pub const fn new(center: Vec3, size: Vec3) -> Self {
        Self { center, size }
    }

    /// Create a box from its corner points.
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            center: (min + max) * 0.5,
            size: max - min,
        }
    }

    /// The center point.
    pub const fn center(&self) -> Vec3 {
        self.center
    }

    /// The full extent along each axis.
    pub const fn size(&self) -> Vec3 {
        self.size
    }

    /// Half the size.
    pub fn extents(&self) -> Vec3 {
        self.size * 0.5
    }

    /// The corner with the smallest coordinates.
    pub fn min(&self) -> Vec3 {
        self.center - self.extents()
    }

    /// The corner with the largest coordinates.
    pub fn max(&self) -> Vec3 {
        self.center + self.extents()
    }

    /// Reposition the box onto the given corners.
    pub fn set_min_max(&mut self, min: Vec3, max: Vec3) {
        self.center = (min + max) * 0.5;
        self.size = max - min;
    }

    /// Whether `point` lies inside the box, faces included.
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min()).all() && point.cmple(self.max()).all()
    }

    /// Whether `other` lies entirely inside the box, faces included.
    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        self.contains(other.min()) && self.contains(other.max())
    }

    /// Whether the boxes overlap. Touching faces count.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min().cmple(other.max()).all() && other.min().cmple(self.max()).all()
    }

    /// Grow the box so that it includes `point`.
    pub fn encapsulate(&mut self, point: Vec3) {
        let min = self.min().min(point);
        let max = self.max().max(point);
        self.set_min_max(min, max);
    }

    /// Grow the size by `amount` along every axis (the extents by half that).
    pub fn expand(&mut self, amount: f32) {
        self.size += Vec3::splat(amount);
    }

    /// Slab-method ray test. A ray tangent to a face counts as a hit.
    pub fn intersect_ray(&self, ray: &Ray) -> bool {
        self.intersect_ray_t(ray).is_some()
    }

    /// Slab-method ray test returning the entry parameter along `ray`,
    /// clamped to zero when the origin starts inside the box.
    ///
    /// An axis with a zero direction component degenerates to an interval
    /// test on the ray origin, so no division by zero occurs.
    pub fn intersect_ray_t(&self, ray: &Ray) -> Option<f32> {
        let min = self.min().to_array();
        let max = self.max().to_array();
        let origin = ray.origin().to_array();
        let direction = ray.direction().to_array();

        let mut entry = f32::NEG_INFINITY;
        let mut exit = f32::INFINITY;
        for axis in 0..3 {
            if direction[axis] == 0.0 {
                if origin[axis] < min[axis] || origin[axis] > max[axis] {
                    return None;
                }
            } else {
                let inv = 1.0 / direction[axis];
                let t0 = (min[axis] - origin[axis]) * inv;
                let t1 = (max[axis] - origin[axis]) * inv;
                let (near, far) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
                entry = entry.max(near);
                exit = exit.min(far);
            }
        }
        (entry <= exit && exit >= 0.0).then(|| entry.max(0.0))
    }
}

/// A ray with a unit-length direction.
///
/// The direction is re-normalized on every construction and assignment; a
/// direction of magnitude below 1e-5 becomes the zero vector, which makes ray
/// queries degenerate to tests against the origin point.
///
/// # Example
///
/// ```
/// use glam::Vec3;
/// use overstory_octree::Ray;
///
/// let ray = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
/// assert_eq!(ray.direction(), Vec3::new(1.0, 0.0, 0.0));
/// assert_eq!(ray.point_at(3.0), Vec3::new(4.0, 0.0, 0.0));
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
}

impl Ray {
    /// Create a ray; `direction` need not be unit length.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: normalize_or_zero(direction),
        }
    }

    /// The ray origin.
    pub const fn origin(&self) -> Vec3 {
        self.origin
    }

    /// The unit-length (or zero) direction.
    pub const fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Move the origin.
    pub fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
    }

    /// Replace the direction; it is normalized on assignment.
    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = normalize_or_zero(direction);
    }

    /// The point at parameter `t` along the ray.
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Distance from `point` to the nearest point on `ray`.
///
/// Points whose projection falls behind the origin measure to the origin
/// itself. The perpendicular case uses the cross-product form, which is exact
/// for points lying on the ray and so supports zero-radius queries.
pub fn distance_to_ray(ray: &Ray, point: Vec3) -> f32 {
    let v = point - ray.origin();
    if v.dot(ray.direction()) <= 0.0 {
        v.length()
    } else {
        ray.direction().cross(v).length()
    }
}

fn normalize_or_zero(v: Vec3) -> Vec3 {
    if v.length_squared() < MIN_DIRECTION_LENGTH_SQUARED {
        Vec3::ZERO
    } else {
        v / v.length()
    }
}

/// Octant numbering shared by both trees: bit 0 set toward +X, bit 1 toward
/// +Z, bit 2 toward −Y. Points on a boundary plane resolve to the cleared
/// bit, matching [`octant_offset`].
#[inline]
pub(crate) fn octant_index(center: Vec3, point: Vec3) -> usize {
    let mut index = 0;
    if point.x > center.x {
        index |= 1;
    }
    if point.z > center.z {
        index |= 2;
    }
    if point.y < center.y {
        index |= 4;
    }
    index
}

/// Offset from the center of a cell of side `side` to the center of its
/// child octant `index`.
#[inline]
pub(crate) fn octant_offset(index: usize, side: f32) -> Vec3 {
    let quarter = side / 4.0;
    Vec3::new(
        if index & 1 == 0 { -quarter } else { quarter },
        if index & 4 == 0 { quarter } else { -quarter },
        if index & 2 == 0 { -quarter } else { quarter },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        a.distance_squared(b) < 1e-10
    }

    #[test]
    fn ray_normalizes_direction() {
        let ray = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        assert!(close(ray.direction(), Vec3::ONE.normalize()));
        assert!(close(
            ray.point_at(2.0),
            Vec3::new(1.0, 0.0, 0.0) + Vec3::ONE.normalize() * 2.0
        ));

        let mut ray = ray;
        ray.set_direction(Vec3::new(0.0, -3.0, 0.0));
        assert_eq!(ray.direction(), Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn degenerate_direction_becomes_zero() {
        let ray = Ray::new(Vec3::ZERO, Vec3::splat(1e-6));
        assert_eq!(ray.direction(), Vec3::ZERO);
        assert_eq!(ray.point_at(5.0), Vec3::ZERO);
    }

    #[test]
    fn aabb_derived_fields() {
        let b = Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.extents(), Vec3::new(0.5, 1.0, 1.5));
        assert_eq!(b.min(), Vec3::new(0.5, 0.0, -0.5));
        assert_eq!(b.max(), Vec3::new(1.5, 2.0, 2.5));
    }

    #[test]
    fn encapsulate_then_expand() {
        let mut b = Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 2.0, 3.0));
        b.encapsulate(Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(b.center(), Vec3::new(2.75, 1.0, 1.0));
        assert_eq!(b.extents(), Vec3::new(2.25, 1.0, 1.5));

        b.expand(1.0);
        assert_eq!(b.extents(), Vec3::new(2.75, 1.5, 2.0));
    }

    #[test]
    fn containment_is_inclusive() {
        let mut b = Aabb::new(Vec3::ZERO, Vec3::ZERO);
        b.set_min_max(Vec3::splat(-1.0), Vec3::splat(3.0));
        assert!(b.contains(Vec3::ZERO));
        assert!(b.contains(Vec3::splat(3.0)));
        assert!(!b.contains(Vec3::splat(4.0)));
        assert!(!b.contains(Vec3::new(3.0, 3.0, 3.1)));
    }

    #[test]
    fn intersection_is_inclusive() {
        let mut b = Aabb::new(Vec3::ZERO, Vec3::ZERO);
        b.set_min_max(Vec3::splat(-1.0), Vec3::splat(3.0));
        let far = Aabb::new(Vec3::splat(4.0), Vec3::splat(1.0));
        assert!(!b.intersects(&far));
        let touching = Aabb::new(Vec3::splat(4.0), Vec3::splat(2.0));
        assert!(b.intersects(&touching));
        let overlapping = Aabb::new(Vec3::splat(4.0), Vec3::splat(3.0));
        assert!(b.intersects(&overlapping));
    }

    #[test]
    fn slab_test_tangent_counts_as_hit() {
        let ray = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::ONE);
        for (scale, hit) in [(0.5, false), (0.9, false), (1.0, true), (2.0, true)] {
            let b = Aabb::new(Vec3::splat(3.0), Vec3::splat(scale));
            assert_eq!(b.intersect_ray(&ray), hit, "scale {scale}");
        }
    }

    #[test]
    fn slab_test_zero_direction_component() {
        // Parallel to the x axis; y and z slabs reduce to origin checks.
        let ray = Ray::new(Vec3::new(-5.0, 1.0, 1.0), Vec3::new(1.0, 0.0, 0.0));
        let b = Aabb::new(Vec3::splat(1.0), Vec3::splat(2.0));
        assert_eq!(b.intersect_ray_t(&ray), Some(5.0));

        let off = Ray::new(Vec3::new(-5.0, 3.0, 1.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(!b.intersect_ray(&off));
    }

    #[test]
    fn slab_test_behind_origin_misses() {
        let ray = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let b = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::splat(2.0));
        assert!(!b.intersect_ray(&ray));
    }

    #[test]
    fn slab_test_origin_inside_clamps_to_zero() {
        let ray = Ray::new(Vec3::splat(1.0), Vec3::new(0.0, 1.0, 0.0));
        let b = Aabb::new(Vec3::splat(1.0), Vec3::splat(4.0));
        assert_eq!(b.intersect_ray_t(&ray), Some(0.0));
    }

    #[test]
    fn distance_to_ray_cases() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        // On the ray.
        assert_eq!(distance_to_ray(&ray, Vec3::new(7.0, 0.0, 0.0)), 0.0);
        // Perpendicular offset.
        assert_eq!(distance_to_ray(&ray, Vec3::new(7.0, 2.0, 0.0)), 2.0);
        // Behind the origin: distance to the origin itself.
        assert_eq!(distance_to_ray(&ray, Vec3::new(-3.0, 4.0, 0.0)), 5.0);
    }

    #[test]
    fn octant_numbering_round_trips() {
        let center = Vec3::ZERO;
        for index in 0..8 {
            let offset = octant_offset(index, 4.0);
            assert_eq!(octant_index(center, offset), index);
        }
    }
}
