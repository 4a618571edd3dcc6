use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Plane `normal · p + d = 0`. Points with a positive distance are in front.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    pub fn new(normal: Vec3, d: f32) -> Self {
        Self { normal, d }
    }

    pub fn from_vec4(v: Vec4) -> Self {
        Self {
            normal: v.truncate(),
            d: v.w,
        }
    }

    /// Plane through `point` facing along `normal`.
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let n = normal.normalize_or_zero();
        Self {
            normal: n,
            d: -n.dot(point),
        }
    }

    pub fn normalized(self) -> Self {
        let len = self.normal.length();
        if len <= f32::EPSILON {
            return self;
        }
        Self {
            normal: self.normal / len,
            d: self.d / len,
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// Six clip planes extracted from a view-projection matrix.
///
/// Assumes a `[0, 1]` clip-space depth range, which is what glam's
/// `perspective_rh` and `orthographic_rh` produce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    pub fn from_matrix(view_projection: &Mat4) -> Self {
        let r0 = view_projection.row(0);
        let r1 = view_projection.row(1);
        let r2 = view_projection.row(2);
        let r3 = view_projection.row(3);
        let planes = [
            Plane::from_vec4(r3 + r0).normalized(), // left
            Plane::from_vec4(r3 - r0).normalized(), // right
            Plane::from_vec4(r3 + r1).normalized(), // bottom
            Plane::from_vec4(r3 - r1).normalized(), // top
            Plane::from_vec4(r2).normalized(),      // near
            Plane::from_vec4(r3 - r2).normalized(), // far
        ];
        Self { planes }
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|p| p.signed_distance(point) >= 0.0)
    }

    /// True unless the box lies entirely behind one plane.
    pub fn intersects_min_max(&self, min: Vec3, max: Vec3) -> bool {
        self.planes.iter().all(|plane| {
            let positive = Vec3::select(plane.normal.cmpge(Vec3::ZERO), max, min);
            plane.signed_distance(positive) >= 0.0
        })
    }

    pub fn contains_min_max(&self, min: Vec3, max: Vec3) -> bool {
        self.planes.iter().all(|plane| {
            let negative = Vec3::select(plane.normal.cmpge(Vec3::ZERO), min, max);
            plane.signed_distance(negative) >= 0.0
        })
    }

    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|p| p.signed_distance(center) > -radius)
    }

    pub fn contains_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|p| p.signed_distance(center) >= radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_frustum() -> Frustum {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
        Frustum::from_matrix(&(proj * view))
    }

    #[test]
    fn origin_is_visible() {
        let f = camera_frustum();
        assert!(f.contains_point(Vec3::ZERO));
        assert!(f.intersects_min_max(Vec3::splat(-1.0), Vec3::splat(1.0)));
        assert!(f.contains_min_max(Vec3::splat(-1.0), Vec3::splat(1.0)));
    }

    #[test]
    fn behind_camera_is_culled() {
        let f = camera_frustum();
        assert!(!f.contains_point(Vec3::new(0.0, 0.0, 20.0)));
        assert!(!f.intersects_min_max(Vec3::new(-1.0, -1.0, 15.0), Vec3::new(1.0, 1.0, 16.0)));
    }

    #[test]
    fn beyond_far_plane_is_culled() {
        let f = camera_frustum();
        assert!(!f.intersects_sphere(Vec3::new(0.0, 0.0, -200.0), 1.0));
    }

    #[test]
    fn straddling_box_intersects_but_is_not_contained() {
        let f = camera_frustum();
        let min = Vec3::new(-100.0, -1.0, -1.0);
        let max = Vec3::new(100.0, 1.0, 1.0);
        assert!(f.intersects_min_max(min, max));
        assert!(!f.contains_min_max(min, max));
    }

    #[test]
    fn plane_distance_sign() {
        let p = Plane::from_point_normal(Vec3::ZERO, Vec3::Y);
        assert!(p.signed_distance(Vec3::new(0.0, 2.0, 0.0)) > 0.0);
        assert!(p.signed_distance(Vec3::new(0.0, -2.0, 0.0)) < 0.0);
    }
}
