use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::bounding::{BoundingBox, BoundingSphere};
use crate::types::is_matrix_usable;

/// Barycentric hit data from a ray/triangle test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionInfo {
    pub bu: f32,
    pub bv: f32,
    pub distance: f32,
}

/// Half-line with an optional maximum length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub length: f32,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            length: f32::MAX,
        }
    }

    pub fn with_length(origin: Vec3, direction: Vec3, length: f32) -> Self {
        Self {
            origin,
            direction,
            length,
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Map the ray through `m`. The direction is not renormalized, so a
    /// distance measured on the result still addresses the same point.
    pub fn transform(&self, m: &Mat4) -> Ray {
        Ray {
            origin: m.transform_point3(self.origin),
            direction: m.transform_vector3(self.direction),
            length: self.length,
        }
    }

    /// Unproject screen coordinates `(x, y)` inside a viewport of the given
    /// size. Falls back to the identity when the combined matrix cannot be
    /// inverted.
    pub fn from_screen(
        x: f32,
        y: f32,
        viewport_width: f32,
        viewport_height: f32,
        world: &Mat4,
        view: &Mat4,
        projection: &Mat4,
    ) -> Ray {
        let combined = *projection * *view * *world;
        let inverse = if is_matrix_usable(&combined) {
            combined.inverse()
        } else {
            tracing::warn!("picking ray built from a degenerate matrix, using identity");
            Mat4::IDENTITY
        };
        let w = viewport_width.max(1.0);
        let h = viewport_height.max(1.0);
        let ndc_x = x / w * 2.0 - 1.0;
        let ndc_y = -(y / h * 2.0 - 1.0);
        let near = unproject(&inverse, Vec3::new(ndc_x, ndc_y, 0.0));
        let far = unproject(&inverse, Vec3::new(ndc_x, ndc_y, 1.0));
        let direction = (far - near).normalize_or_zero();
        Ray::new(near, direction)
    }

    /// Entry distance into the box `[min, max]`, or `None` on a miss.
    pub fn intersects_box_min_max(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = self.length;
        for axis in 0..3 {
            let o = self.origin[axis];
            let d = self.direction[axis];
            if d.abs() < 1e-7 {
                if o < min[axis] || o > max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t1 = (min[axis] - o) * inv;
            let mut t2 = (max[axis] - o) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }

    /// Test against the world-space box.
    pub fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        self.intersects_box_min_max(bbox.minimum_world, bbox.maximum_world)
            .is_some()
    }

    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        let to_center = sphere.center_world - self.origin;
        let r2 = sphere.radius_world * sphere.radius_world;
        let dir_len2 = self.direction.length_squared();
        if dir_len2 <= f32::EPSILON {
            return to_center.length_squared() <= r2;
        }
        let proj = to_center.dot(self.direction) / dir_len2;
        if proj < 0.0 {
            return to_center.length_squared() <= r2;
        }
        let closest = self.origin + self.direction * proj;
        closest.distance_squared(sphere.center_world) <= r2
    }

    /// Möller–Trumbore. Back faces count as hits.
    pub fn intersects_triangle(&self, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<IntersectionInfo> {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let pvec = self.direction.cross(edge2);
        let det = edge1.dot(pvec);
        if det.abs() < 1e-9 {
            return None;
        }
        let inv_det = 1.0 / det;
        let tvec = self.origin - v0;
        let bu = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&bu) {
            return None;
        }
        let qvec = tvec.cross(edge1);
        let bv = self.direction.dot(qvec) * inv_det;
        if bv < 0.0 || bu + bv > 1.0 {
            return None;
        }
        let distance = edge2.dot(qvec) * inv_det;
        if distance < 0.0 || distance > self.length {
            return None;
        }
        Some(IntersectionInfo { bu, bv, distance })
    }
}

fn unproject(inverse: &Mat4, ndc: Vec3) -> Vec3 {
    let v = *inverse * Vec4::new(ndc.x, ndc.y, ndc.z, 1.0);
    if v.w.abs() <= f32::EPSILON {
        v.truncate()
    } else {
        v.truncate() / v.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slab_hit_and_miss() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let t = ray.intersects_box_min_max(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(t, Some(9.0));

        let off = Ray::new(Vec3::new(5.0, 0.0, 10.0), Vec3::NEG_Z);
        assert!(off
            .intersects_box_min_max(Vec3::splat(-1.0), Vec3::splat(1.0))
            .is_none());
    }

    #[test]
    fn box_behind_origin_is_missed() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::Z);
        assert!(ray
            .intersects_box_min_max(Vec3::splat(-1.0), Vec3::splat(1.0))
            .is_none());
    }

    #[test]
    fn origin_inside_box_hits_at_zero() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(
            ray.intersects_box_min_max(Vec3::splat(-1.0), Vec3::splat(1.0)),
            Some(0.0)
        );
    }

    #[test]
    fn triangle_hit_reports_distance_and_barycentrics() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, 5.0), Vec3::NEG_Z);
        let hit = ray
            .intersects_triangle(Vec3::ZERO, Vec3::X, Vec3::Y)
            .unwrap();
        assert!((hit.distance - 5.0).abs() < 1e-5);
        assert!((hit.bu - 0.25).abs() < 1e-5);
        assert!((hit.bv - 0.25).abs() < 1e-5);
    }

    #[test]
    fn triangle_miss_outside_edges() {
        let ray = Ray::new(Vec3::new(0.9, 0.9, 5.0), Vec3::NEG_Z);
        assert!(ray
            .intersects_triangle(Vec3::ZERO, Vec3::X, Vec3::Y)
            .is_none());
    }

    #[test]
    fn sphere_test() {
        let mut s = BoundingSphere::from_min_max(Vec3::splat(-1.0), Vec3::splat(1.0));
        s.update(&Mat4::IDENTITY);
        assert!(Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z).intersects_sphere(&s));
        assert!(!Ray::new(Vec3::new(0.0, 5.0, 10.0), Vec3::NEG_Z).intersects_sphere(&s));
    }

    #[test]
    fn screen_center_ray_points_forward() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
        let ray = Ray::from_screen(50.0, 50.0, 100.0, 100.0, &Mat4::IDENTITY, &view, &proj);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-3);
        assert!((ray.origin.z - 9.9).abs() < 1e-2);
    }

    #[test]
    fn degenerate_matrices_fall_back_to_identity() {
        let ray = Ray::from_screen(
            0.0,
            0.0,
            100.0,
            100.0,
            &Mat4::IDENTITY,
            &Mat4::ZERO,
            &Mat4::IDENTITY,
        );
        assert!(ray.origin.is_finite());
        assert!(ray.direction.is_finite());
    }

    #[test]
    fn transform_keeps_distance_meaning() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let m = Mat4::from_scale(Vec3::splat(2.0));
        let t = ray.transform(&m);
        assert_eq!(t.at(1.0), m.transform_point3(ray.at(1.0)));
    }
}
