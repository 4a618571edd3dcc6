//! Ray construction and mesh/sprite picking.
//!
//! # Invariants
//! - `fast_check` accepts the first bounding-box hit in insertion order.
//! - Exact picks test triangles in mesh space and report world distances.
//! - `pick` returns the head of `multi_pick` for the same predicate.

use glam::{Mat4, Vec3};
use tracing::{trace, warn};
use vista_common::{CameraId, MeshId, Ray, SpriteManagerId};

use crate::mesh::Mesh;
use crate::scene::Scene;
use crate::sprites::Sprite;

/// Sprite hit by a pick: its manager and index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteRef {
    pub manager: SpriteManagerId,
    pub index: usize,
}

/// Result of a pick. `hit == false` leaves every other field empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickingInfo {
    pub hit: bool,
    pub distance: f32,
    pub picked_point: Option<Vec3>,
    pub picked_mesh: Option<MeshId>,
    pub picked_sprite: Option<SpriteRef>,
    /// Barycentric coordinates of the hit inside the face.
    pub bu: f32,
    pub bv: f32,
    pub face_id: Option<usize>,
    pub sub_mesh_id: Option<usize>,
    pub ray: Option<Ray>,
}

impl PickingInfo {
    fn miss(ray: Ray) -> Self {
        Self {
            ray: Some(ray),
            ..Self::default()
        }
    }
}

/// Borrowed mesh filter used by the picking calls.
pub type PickPredicate<'a> = &'a dyn Fn(&Mesh) -> bool;

/// Enabled, visible and pickable.
pub fn default_pick_predicate(mesh: &Mesh) -> bool {
    mesh.is_enabled && mesh.is_visible && mesh.is_pickable
}

impl Scene {
    /// World-space ray through the pixel `(x, y)` of `camera`, or of the
    /// active camera. `world` maps the result into another space, e.g. a
    /// mesh's local space. With `camera_view_space` the view matrix is
    /// skipped and the ray stays in camera space.
    pub fn create_picking_ray(
        &self,
        x: f32,
        y: f32,
        world: &Mat4,
        camera: Option<CameraId>,
        camera_view_space: bool,
    ) -> Ray {
        let (width, height) = self.backend.render_size();
        let camera = camera
            .or(self.active_camera())
            .and_then(|id| self.cameras.iter().find(|c| c.unique_id == id));
        let Some(camera) = camera else {
            warn!("create_picking_ray: no camera, using identity matrices");
            return Ray::from_screen(
                x,
                y,
                width as f32,
                height as f32,
                world,
                &Mat4::IDENTITY,
                &Mat4::IDENTITY,
            );
        };
        let (vx, vy, vw, vh) = camera.viewport.to_global(width, height);
        let local_x = x - vx;
        let local_y = y - (height as f32 - vy - vh);
        let view = if camera_view_space {
            Mat4::IDENTITY
        } else {
            camera.view_matrix()
        };
        let projection = camera.projection_matrix(camera.aspect_ratio(width, height));
        Ray::from_screen(local_x, local_y, vw, vh, world, &view, &projection)
    }

    pub fn create_picking_ray_in_camera_space(
        &self,
        x: f32,
        y: f32,
        camera: Option<CameraId>,
    ) -> Ray {
        self.create_picking_ray(x, y, &Mat4::IDENTITY, camera, true)
    }

    /// Pick the mesh under the screen point `(x, y)`.
    pub fn pick(
        &self,
        x: f32,
        y: f32,
        predicate: Option<PickPredicate<'_>>,
        fast_check: bool,
        camera: Option<CameraId>,
    ) -> PickingInfo {
        let ray = self.create_picking_ray(x, y, &Mat4::IDENTITY, camera, false);
        self.pick_with_ray(&ray, predicate, fast_check)
    }

    pub fn pick_with_ray(
        &self,
        ray: &Ray,
        predicate: Option<PickPredicate<'_>>,
        fast_check: bool,
    ) -> PickingInfo {
        let predicate = predicate.unwrap_or(&default_pick_predicate);
        let mut best: Option<PickingInfo> = None;
        for mesh in self.meshes.iter().filter(|m| predicate(m)) {
            let Some(hit) = self.intersect_mesh(mesh, ray, fast_check) else {
                continue;
            };
            if fast_check {
                trace!(mesh = %mesh.unique_id, "fast pick hit");
                return hit;
            }
            if best.as_ref().is_none_or(|b| hit.distance < b.distance) {
                best = Some(hit);
            }
        }
        best.unwrap_or_else(|| PickingInfo::miss(*ray))
    }

    /// Every mesh under `(x, y)`, nearest first.
    pub fn multi_pick(
        &self,
        x: f32,
        y: f32,
        predicate: Option<PickPredicate<'_>>,
        camera: Option<CameraId>,
    ) -> Vec<PickingInfo> {
        let ray = self.create_picking_ray(x, y, &Mat4::IDENTITY, camera, false);
        self.multi_pick_with_ray(&ray, predicate)
    }

    pub fn multi_pick_with_ray(
        &self,
        ray: &Ray,
        predicate: Option<PickPredicate<'_>>,
    ) -> Vec<PickingInfo> {
        let predicate = predicate.unwrap_or(&default_pick_predicate);
        let mut hits: Vec<PickingInfo> = self
            .meshes
            .iter()
            .filter(|m| predicate(m))
            .filter_map(|m| self.intersect_mesh(m, ray, false))
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Nearest pickable sprite under `(x, y)`.
    pub fn pick_sprite(
        &self,
        x: f32,
        y: f32,
        predicate: Option<&dyn Fn(&Sprite) -> bool>,
        fast_check: bool,
        camera: Option<CameraId>,
    ) -> PickingInfo {
        let ray = self.create_picking_ray(x, y, &Mat4::IDENTITY, camera, false);
        self.pick_sprite_with_ray(&ray, predicate, fast_check)
    }

    pub fn pick_sprite_with_ray(
        &self,
        ray: &Ray,
        predicate: Option<&dyn Fn(&Sprite) -> bool>,
        fast_check: bool,
    ) -> PickingInfo {
        let mut best: Option<PickingInfo> = None;
        for manager in self.sprite_managers.iter().filter(|m| m.is_pickable) {
            for (index, sprite) in manager.sprites().iter().enumerate() {
                if !sprite.is_visible || !sprite.is_pickable {
                    continue;
                }
                if predicate.is_some_and(|p| !p(sprite)) {
                    continue;
                }
                let (min, max) = sprite.pick_bounds();
                let Some(distance) = ray.intersects_box_min_max(min, max) else {
                    continue;
                };
                if best.as_ref().is_some_and(|b| b.distance <= distance) {
                    continue;
                }
                best = Some(PickingInfo {
                    hit: true,
                    distance,
                    picked_point: Some(ray.at(distance)),
                    picked_sprite: Some(SpriteRef {
                        manager: manager.unique_id,
                        index,
                    }),
                    ray: Some(*ray),
                    ..PickingInfo::default()
                });
                if fast_check {
                    return best.unwrap_or_else(|| PickingInfo::miss(*ray));
                }
            }
        }
        best.unwrap_or_else(|| PickingInfo::miss(*ray))
    }

    fn intersect_mesh(&self, mesh: &Mesh, ray: &Ray, fast_check: bool) -> Option<PickingInfo> {
        if !mesh.is_world_matrix_usable() || mesh.sub_meshes.is_empty() {
            return None;
        }
        let info = mesh.bounding_info();
        if !ray.intersects_sphere(&info.bounding_sphere) {
            return None;
        }
        let box_distance = ray.intersects_box_min_max(
            info.bounding_box.minimum_world,
            info.bounding_box.maximum_world,
        )?;
        if fast_check {
            return Some(PickingInfo {
                hit: true,
                distance: box_distance,
                picked_point: Some(ray.at(box_distance)),
                picked_mesh: Some(mesh.unique_id),
                ray: Some(*ray),
                ..PickingInfo::default()
            });
        }

        let geometry = self
            .geometries
            .iter()
            .find(|g| Some(g.unique_id) == mesh.geometry)?;
        let data = &geometry.vertex_data;
        let world = *mesh.world_matrix();
        let local_ray = ray.transform(&world.inverse());

        let mut best: Option<PickingInfo> = None;
        for (sub_index, sub) in mesh.sub_meshes.iter().enumerate() {
            let start = sub.index_start as usize;
            let end = start.saturating_add(sub.index_count as usize).min(data.indices.len());
            let Some(indices) = data.indices.get(start..end) else {
                trace!(mesh = %mesh.unique_id, sub_mesh = sub_index, "sub-mesh outside index buffer");
                continue;
            };
            for (face, tri) in indices.chunks_exact(3).enumerate() {
                let fetch = |i: u32| data.positions.get(i as usize).copied();
                let (Some(v0), Some(v1), Some(v2)) = (fetch(tri[0]), fetch(tri[1]), fetch(tri[2]))
                else {
                    continue;
                };
                let Some(hit) = local_ray.intersects_triangle(v0, v1, v2) else {
                    continue;
                };
                let point = world.transform_point3(local_ray.at(hit.distance));
                let distance = point.distance(ray.origin);
                if best.as_ref().is_some_and(|b| b.distance <= distance) {
                    continue;
                }
                best = Some(PickingInfo {
                    hit: true,
                    distance,
                    picked_point: Some(point),
                    picked_mesh: Some(mesh.unique_id),
                    bu: hit.bu,
                    bv: hit.bv,
                    face_id: Some(start / 3 + face),
                    sub_mesh_id: Some(sub_index),
                    ray: Some(*ray),
                    ..PickingInfo::default()
                });
            }
        }
        best
    }
}
