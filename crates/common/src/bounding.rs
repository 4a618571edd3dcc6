use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::frustum::Frustum;

/// Axis-aligned box in local space plus its world-space image.
///
/// The world box is the axis-aligned hull of the eight transformed local
/// corners, so it stays conservative under rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub minimum: Vec3,
    pub maximum: Vec3,
    pub minimum_world: Vec3,
    pub maximum_world: Vec3,
}

impl BoundingBox {
    pub fn new(minimum: Vec3, maximum: Vec3) -> Self {
        Self {
            minimum,
            maximum,
            minimum_world: minimum,
            maximum_world: maximum,
        }
    }

    /// Smallest box containing every point. Empty input yields a zero box.
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some(first) = points.first() else {
            return Self::new(Vec3::ZERO, Vec3::ZERO);
        };
        let (min, max) = points
            .iter()
            .fold((*first, *first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        Self::new(min, max)
    }

    pub fn center(&self) -> Vec3 {
        (self.minimum + self.maximum) * 0.5
    }

    pub fn center_world(&self) -> Vec3 {
        (self.minimum_world + self.maximum_world) * 0.5
    }

    pub fn extend_size_world(&self) -> Vec3 {
        (self.maximum_world - self.minimum_world) * 0.5
    }

    /// The eight local-space corners.
    pub fn corners(&self) -> [Vec3; 8] {
        corners_of(self.minimum, self.maximum)
    }

    pub fn corners_world(&self) -> [Vec3; 8] {
        corners_of(self.minimum_world, self.maximum_world)
    }

    /// Recompute the world box for a new world matrix.
    pub fn update(&mut self, world: &Mat4) {
        let corners = self.corners();
        let mut lo = Vec3::splat(f32::MAX);
        let mut hi = Vec3::splat(f32::MIN);
        for c in corners {
            let p = world.transform_point3(c);
            lo = lo.min(p);
            hi = hi.max(p);
        }
        self.minimum_world = lo;
        self.maximum_world = hi;
    }

    /// Copy with the world box recomputed for `world`.
    pub fn transformed(&self, world: &Mat4) -> Self {
        let mut b = *self;
        b.update(world);
        b
    }

    pub fn intersects_point(&self, point: Vec3) -> bool {
        point.cmpge(self.minimum_world).all() && point.cmple(self.maximum_world).all()
    }

    pub fn intersects_min_max(&self, min: Vec3, max: Vec3) -> bool {
        intersects_min_max(self.minimum_world, self.maximum_world, min, max)
    }

    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        let closest = center.clamp(self.minimum_world, self.maximum_world);
        closest.distance_squared(center) <= radius * radius
    }

    pub fn is_in_frustum(&self, frustum: &Frustum) -> bool {
        frustum.intersects_min_max(self.minimum_world, self.maximum_world)
    }

    pub fn is_completely_in_frustum(&self, frustum: &Frustum) -> bool {
        frustum.contains_min_max(self.minimum_world, self.maximum_world)
    }
}

/// Overlap test between two world-space boxes given by their extremes.
pub fn intersects_min_max(min_a: Vec3, max_a: Vec3, min_b: Vec3, max_b: Vec3) -> bool {
    max_a.cmpge(min_b).all() && min_a.cmple(max_b).all()
}

pub(crate) fn corners_of(min: Vec3, max: Vec3) -> [Vec3; 8] {
    [
        Vec3::new(min.x, min.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(max.x, max.y, min.z),
        Vec3::new(min.x, min.y, max.z),
        Vec3::new(max.x, min.y, max.z),
        Vec3::new(min.x, max.y, max.z),
        Vec3::new(max.x, max.y, max.z),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
    pub center_world: Vec3,
    pub radius_world: f32,
}

impl BoundingSphere {
    /// Sphere enclosing the box `[min, max]`.
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        let center = (min + max) * 0.5;
        let radius = min.distance(max) * 0.5;
        Self {
            center,
            radius,
            center_world: center,
            radius_world: radius,
        }
    }

    pub fn update(&mut self, world: &Mat4) {
        self.center_world = world.transform_point3(self.center);
        let scale = world
            .x_axis
            .truncate()
            .length()
            .max(world.y_axis.truncate().length())
            .max(world.z_axis.truncate().length());
        self.radius_world = self.radius * scale;
    }

    pub fn intersects_point(&self, point: Vec3) -> bool {
        self.center_world.distance_squared(point) <= self.radius_world * self.radius_world
    }
}

/// Box and sphere kept in sync for one object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingInfo {
    pub bounding_box: BoundingBox,
    pub bounding_sphere: BoundingSphere,
}

impl BoundingInfo {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            bounding_box: BoundingBox::new(min, max),
            bounding_sphere: BoundingSphere::from_min_max(min, max),
        }
    }

    pub fn update(&mut self, world: &Mat4) {
        self.bounding_box.update(world);
        self.bounding_sphere.update(world);
    }

    pub fn transformed(&self, world: &Mat4) -> Self {
        let mut info = *self;
        info.update(world);
        info
    }

    /// Sphere test first, box test only when the sphere straddles a plane.
    pub fn is_in_frustum(&self, frustum: &Frustum) -> bool {
        let s = &self.bounding_sphere;
        if !frustum.intersects_sphere(s.center_world, s.radius_world) {
            return false;
        }
        if frustum.contains_sphere(s.center_world, s.radius_world) {
            return true;
        }
        self.bounding_box.is_in_frustum(frustum)
    }
}

impl Default for BoundingInfo {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn from_points_spans_all() {
        let b = BoundingBox::from_points(&[
            Vec3::new(-1.0, 0.0, 2.0),
            Vec3::new(3.0, -2.0, 0.0),
            Vec3::new(0.0, 5.0, 1.0),
        ]);
        assert_eq!(b.minimum, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.maximum, Vec3::new(3.0, 5.0, 2.0));
    }

    #[test]
    fn from_no_points_is_zero_box() {
        let b = BoundingBox::from_points(&[]);
        assert_eq!(b.minimum, Vec3::ZERO);
        assert_eq!(b.maximum, Vec3::ZERO);
    }

    #[test]
    fn update_translates_world_box() {
        let mut b = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        b.update(&Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        assert_eq!(b.minimum_world, Vec3::new(9.0, -1.0, -1.0));
        assert_eq!(b.maximum_world, Vec3::new(11.0, 1.0, 1.0));
        assert!(b.intersects_point(Vec3::new(10.0, 0.0, 0.0)));
        assert!(!b.intersects_point(Vec3::ZERO));
    }

    #[test]
    fn rotated_box_grows_conservatively() {
        let mut b = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        b.update(&Mat4::from_quat(Quat::from_rotation_y(std::f32::consts::FRAC_PI_4)));
        assert!(b.maximum_world.x > 1.4);
        assert!((b.maximum_world.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn sphere_world_radius_follows_scale() {
        let mut s = BoundingSphere::from_min_max(Vec3::splat(-1.0), Vec3::splat(1.0));
        s.update(&Mat4::from_scale(Vec3::new(1.0, 3.0, 2.0)));
        assert!((s.radius_world - 3.0f32.sqrt() * 3.0).abs() < 1e-4);
    }

    #[test]
    fn box_sphere_overlap() {
        let b = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        assert!(b.intersects_sphere(Vec3::new(1.5, 0.5, 0.5), 0.6));
        assert!(!b.intersects_sphere(Vec3::new(3.0, 0.5, 0.5), 0.6));
    }

    #[test]
    fn min_max_overlap_touching_counts() {
        assert!(intersects_min_max(
            Vec3::ZERO,
            Vec3::ONE,
            Vec3::ONE,
            Vec3::splat(2.0)
        ));
        assert!(!intersects_min_max(
            Vec3::ZERO,
            Vec3::ONE,
            Vec3::splat(1.5),
            Vec3::splat(2.0)
        ));
    }
}
