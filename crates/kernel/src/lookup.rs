//! Linear-scan lookups over the scene collections.
//!
//! `get_*_by_id` returns the first inserted match, `get_last_*_by_id` the
//! most recently inserted one.

use glam::Vec3;
use tracing::warn;
use vista_animation::AnimationGroup;
use vista_common::{CameraId, LightId, MeshId, ParticleSystemId, TagQuery, Tags};

use crate::camera::Camera;
use crate::light::Light;
use crate::material::{Material, ProceduralTexture, Texture};
use crate::mesh::{Geometry, Mesh};
use crate::particles::ParticleSystem;
use crate::probe::ReflectionProbe;
use crate::scene::Scene;
use crate::skeleton::{Bone, Skeleton};
use crate::sound::Sound;
use crate::sprites::SpriteManager;

/// Anything `get_node_by_*` can return.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Mesh(&'a Mesh),
    Light(&'a Light),
    Camera(&'a Camera),
    Bone { skeleton: &'a Skeleton, bone: &'a Bone },
}

impl NodeRef<'_> {
    pub fn name(&self) -> &str {
        match self {
            NodeRef::Mesh(m) => &m.name,
            NodeRef::Light(l) => &l.name,
            NodeRef::Camera(c) => &c.name,
            NodeRef::Bone { bone, .. } => &bone.name,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            NodeRef::Mesh(m) => &m.id,
            NodeRef::Light(l) => &l.id,
            NodeRef::Camera(c) => &c.id,
            NodeRef::Bone { bone, .. } => &bone.id,
        }
    }
}

fn filter_by_tags<'a, T>(
    items: &'a [T],
    query: &str,
    tags: impl Fn(&T) -> &Tags,
) -> Vec<&'a T> {
    match TagQuery::parse(query) {
        Ok(q) => items.iter().filter(|i| q.matches(tags(i))).collect(),
        Err(err) => {
            warn!(%err, query, "invalid tag query");
            Vec::new()
        }
    }
}

impl Scene {
    pub fn get_mesh_by_id(&self, id: &str) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.id == id)
    }

    pub fn get_last_mesh_by_id(&self, id: &str) -> Option<&Mesh> {
        self.meshes.iter().rev().find(|m| m.id == id)
    }

    pub fn get_meshes_by_id(&self, id: &str) -> Vec<&Mesh> {
        self.meshes.iter().filter(|m| m.id == id).collect()
    }

    pub fn get_mesh_by_unique_id(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.unique_id == id)
    }

    pub fn get_mesh_by_name(&self, name: &str) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.name == name)
    }

    pub fn get_camera_by_id(&self, id: &str) -> Option<&Camera> {
        self.cameras.iter().find(|c| c.id == id)
    }

    pub fn get_camera_by_name(&self, name: &str) -> Option<&Camera> {
        self.cameras.iter().find(|c| c.name == name)
    }

    pub fn get_camera_by_unique_id(&self, id: CameraId) -> Option<&Camera> {
        self.cameras.iter().find(|c| c.unique_id == id)
    }

    pub fn get_light_by_id(&self, id: &str) -> Option<&Light> {
        self.lights.iter().find(|l| l.id == id)
    }

    pub fn get_light_by_name(&self, name: &str) -> Option<&Light> {
        self.lights.iter().find(|l| l.name == name)
    }

    pub fn get_light_by_unique_id(&self, id: LightId) -> Option<&Light> {
        self.lights.iter().find(|l| l.unique_id == id)
    }

    pub fn get_material_by_id(&self, id: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.id == id)
    }

    pub fn get_material_by_name(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name == name)
    }

    pub fn get_texture_by_name(&self, name: &str) -> Option<&Texture> {
        self.textures.iter().find(|t| t.name == name)
    }

    pub fn get_geometry_by_id(&self, id: &str) -> Option<&Geometry> {
        self.geometries.iter().find(|g| g.id == id)
    }

    pub fn get_skeleton_by_id(&self, id: &str) -> Option<&Skeleton> {
        self.skeletons.iter().find(|s| s.id == id)
    }

    pub fn get_last_skeleton_by_id(&self, id: &str) -> Option<&Skeleton> {
        self.skeletons.iter().rev().find(|s| s.id == id)
    }

    pub fn get_skeleton_by_name(&self, name: &str) -> Option<&Skeleton> {
        self.skeletons.iter().find(|s| s.name == name)
    }

    /// First bone with this id across all skeletons.
    pub fn get_bone_by_id(&self, id: &str) -> Option<&Bone> {
        self.skeletons.iter().find_map(|s| s.bone_by_id(id))
    }

    pub fn get_bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.skeletons.iter().find_map(|s| s.bone_by_name(name))
    }

    pub fn get_particle_system_by_id(&self, id: &str) -> Option<&ParticleSystem> {
        self.particle_systems.iter().find(|p| p.id == id)
    }

    pub fn get_particle_system_by_unique_id(&self, id: ParticleSystemId) -> Option<&ParticleSystem> {
        self.particle_systems.iter().find(|p| p.unique_id == id)
    }

    /// Searches the main track first, then the additional tracks.
    pub fn get_sound_by_name(&self, name: &str) -> Option<&Sound> {
        self.main_sound_track
            .sound_by_name(name)
            .or_else(|| self.sound_tracks.iter().find_map(|t| t.sound_by_name(name)))
    }

    /// Meshes, then lights, then cameras, then bones.
    pub fn get_node_by_id(&self, id: &str) -> Option<NodeRef<'_>> {
        if let Some(mesh) = self.get_mesh_by_id(id) {
            return Some(NodeRef::Mesh(mesh));
        }
        if let Some(light) = self.get_light_by_id(id) {
            return Some(NodeRef::Light(light));
        }
        if let Some(camera) = self.get_camera_by_id(id) {
            return Some(NodeRef::Camera(camera));
        }
        self.skeletons.iter().find_map(|skeleton| {
            skeleton
                .bone_by_id(id)
                .map(|bone| NodeRef::Bone { skeleton, bone })
        })
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<NodeRef<'_>> {
        if let Some(mesh) = self.get_mesh_by_name(name) {
            return Some(NodeRef::Mesh(mesh));
        }
        if let Some(light) = self.get_light_by_name(name) {
            return Some(NodeRef::Light(light));
        }
        if let Some(camera) = self.get_camera_by_name(name) {
            return Some(NodeRef::Camera(camera));
        }
        self.skeletons.iter().find_map(|skeleton| {
            skeleton
                .bone_by_name(name)
                .map(|bone| NodeRef::Bone { skeleton, bone })
        })
    }

    /// Most recently added mesh, camera or light with this id, searched in
    /// that order.
    pub fn get_last_entry_by_id(&self, id: &str) -> Option<NodeRef<'_>> {
        if let Some(mesh) = self.get_last_mesh_by_id(id) {
            return Some(NodeRef::Mesh(mesh));
        }
        if let Some(camera) = self.cameras.iter().rev().find(|c| c.id == id) {
            return Some(NodeRef::Camera(camera));
        }
        self.lights
            .iter()
            .rev()
            .find(|l| l.id == id)
            .map(NodeRef::Light)
    }

    pub fn get_sprite_manager_by_name(&self, name: &str) -> Option<&SpriteManager> {
        self.sprite_managers.iter().find(|s| s.name == name)
    }

    pub fn get_reflection_probe_by_name(&self, name: &str) -> Option<&ReflectionProbe> {
        self.reflection_probes.iter().find(|p| p.name == name)
    }

    pub fn get_procedural_texture_by_name(&self, name: &str) -> Option<&ProceduralTexture> {
        self.procedural_textures.iter().find(|p| p.name == name)
    }

    pub fn get_animation_group_by_name(&self, name: &str) -> Option<&AnimationGroup> {
        self.animation_groups.iter().find(|g| g.name == name)
    }

    /// Meshes whose tags satisfy `query`, e.g. `"enemy && !boss"`.
    /// An unparsable query matches nothing.
    pub fn get_meshes_by_tags(&self, query: &str) -> Vec<&Mesh> {
        filter_by_tags(&self.meshes, query, |m| &m.tags)
    }

    pub fn get_cameras_by_tags(&self, query: &str) -> Vec<&Camera> {
        filter_by_tags(&self.cameras, query, |c| &c.tags)
    }

    pub fn get_lights_by_tags(&self, query: &str) -> Vec<&Light> {
        filter_by_tags(&self.lights, query, |l| &l.tags)
    }

    pub fn get_materials_by_tags(&self, query: &str) -> Vec<&Material> {
        filter_by_tags(&self.materials, query, |m| &m.tags)
    }

    /// World-space AABB over every mesh with geometry and a usable world
    /// matrix. `None` when there is no such mesh.
    pub fn get_world_extends(&self) -> Option<(Vec3, Vec3)> {
        self.meshes
            .iter()
            .filter(|m| m.geometry.is_some() && m.is_world_matrix_usable())
            .map(|m| {
                let b = &m.bounding_info().bounding_box;
                (b.minimum_world, b.maximum_world)
            })
            .reduce(|(min_a, max_a), (min_b, max_b)| (min_a.min(min_b), max_a.max(max_b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::{Emitter, splitmix64};
    use vista_render::RecordingBackend;

    fn scene() -> Scene {
        Scene::new(Box::new(RecordingBackend::new(800, 600)))
    }

    #[test]
    fn first_and_last_mesh_by_id() {
        let mut s = scene();
        let a = s.add_mesh(Mesh::new("A").with_id("m1"));
        let b = s.add_mesh(Mesh::new("B").with_id("m1"));
        assert_eq!(s.get_mesh_by_id("m1").unwrap().unique_id(), a);
        assert_eq!(s.get_last_mesh_by_id("m1").unwrap().unique_id(), b);
        assert_eq!(s.get_meshes_by_id("m1").len(), 2);
        s.remove_mesh(a);
        assert_eq!(s.get_mesh_by_id("m1").unwrap().unique_id(), b);
        assert_eq!(s.get_last_mesh_by_id("m1").unwrap().unique_id(), b);
    }

    #[test]
    fn first_and_last_hold_under_random_churn() {
        let mut s = scene();
        let mut alive: Vec<(MeshId, String)> = Vec::new();
        let mut rng = 7u64;
        for step in 0..300 {
            rng = splitmix64(rng);
            let id = format!("m{}", rng % 4);
            if rng % 3 == 0 && !alive.is_empty() {
                let victim = (rng >> 8) as usize % alive.len();
                let (unique, _) = alive.remove(victim);
                assert!(s.remove_mesh(unique).is_some());
            } else {
                let unique = s.add_mesh(Mesh::new(format!("mesh{step}")).with_id(id.clone()));
                alive.push((unique, id));
            }
            for key in ["m0", "m1", "m2", "m3"] {
                let first = alive.iter().find(|(_, i)| i == key).map(|(u, _)| *u);
                let last = alive.iter().rev().find(|(_, i)| i == key).map(|(u, _)| *u);
                assert_eq!(s.get_mesh_by_id(key).map(Mesh::unique_id), first);
                assert_eq!(s.get_last_mesh_by_id(key).map(Mesh::unique_id), last);
            }
        }
    }

    #[test]
    fn node_lookup_order() {
        let mut s = scene();
        s.add_light(Light::point("shared", Vec3::ZERO).with_id("n"));
        s.add_camera(Camera::new("cam", Vec3::Z, Vec3::ZERO).with_id("n"));
        assert!(matches!(s.get_node_by_id("n"), Some(NodeRef::Light(_))));
        assert!(matches!(s.get_last_entry_by_id("n"), Some(NodeRef::Camera(_))));
        s.add_mesh(Mesh::new("shared").with_id("n"));
        assert!(matches!(s.get_node_by_name("shared"), Some(NodeRef::Mesh(_))));

        let mut skeleton = Skeleton::new("rig");
        skeleton.add_bone(Bone::new("hip", None, glam::Mat4::IDENTITY));
        s.add_skeleton(skeleton);
        let node = s.get_node_by_name("hip").unwrap();
        assert!(matches!(node, NodeRef::Bone { .. }));
        assert_eq!(node.name(), "hip");
        assert!(s.get_bone_by_name("hip").is_some());
        assert!(s.get_node_by_id("missing").is_none());
    }

    #[test]
    fn tag_queries() {
        let mut s = scene();
        let mut a = Mesh::new("a");
        a.tags.add_tags("enemy boss");
        let mut b = Mesh::new("b");
        b.tags.add_tags("enemy");
        s.add_mesh(a);
        s.add_mesh(b);
        let names = |v: Vec<&Mesh>| v.iter().map(|m| m.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(s.get_meshes_by_tags("enemy && !boss")), vec!["b"]);
        assert_eq!(names(s.get_meshes_by_tags("boss || enemy")), vec!["a", "b"]);
        assert!(s.get_meshes_by_tags("(enemy").is_empty());
    }

    #[test]
    fn world_extents_cover_geometry_meshes() {
        let mut s = scene();
        assert!(s.get_world_extends().is_none());
        let a = s.create_box("a", 2.0);
        let b = s.create_box("b", 2.0);
        s.mesh_mut(b).unwrap().set_position(Vec3::new(10.0, 0.0, 0.0));
        s.mesh_mut(b).unwrap().compute_world_matrix();
        s.add_mesh(Mesh::new("empty").with_position(Vec3::splat(100.0)));
        let (min, max) = s.get_world_extends().unwrap();
        assert!(min.abs_diff_eq(Vec3::splat(-1.0), 1e-5));
        assert!(max.abs_diff_eq(Vec3::new(11.0, 1.0, 1.0), 1e-5));
        assert!(s.get_mesh_by_unique_id(a).is_some());
    }

    #[test]
    fn misc_lookups() {
        let mut s = scene();
        s.add_particle_system(ParticleSystem::new("fx", 4, Emitter::Point(Vec3::ZERO)).with_id("p"));
        assert!(s.get_particle_system_by_id("p").is_some());
        s.main_sound_track_mut().add_sound(Sound::new("music"));
        assert!(s.get_sound_by_name("music").is_some());
        s.add_sprite_manager(SpriteManager::new("sprites", 8, 64));
        assert!(s.get_sprite_manager_by_name("sprites").is_some());
        s.add_reflection_probe(ReflectionProbe::new("probe", 128));
        assert!(s.get_reflection_probe_by_name("probe").is_some());
        s.add_animation_group(AnimationGroup::new("walk"));
        assert!(s.get_animation_group_by_name("walk").is_some());
        s.add_material(Material::new("mat").with_id("m"));
        assert!(s.get_material_by_id("m").is_some());
        assert!(s.get_texture_by_name("none").is_none());
    }
}
