use tracing::{debug, info_span, warn};
use vista_animation::{Animation, AnimationGroup};
use vista_common::{
    AnimationGroupId, CameraId, LightId, MaterialId, MeshId, ParticleSystemId, SkeletonId,
};
use vista_kernel::{
    Camera, Emitter, Light, Material, Mesh, ParticleSystem, Scene, Skeleton, VertexData,
};

/// A mesh waiting to be added. Cross references point into the sibling
/// vectors of the same container.
#[derive(Debug, Clone)]
pub struct ContainerMesh {
    pub mesh: Mesh,
    pub vertex_data: Option<VertexData>,
    pub material: Option<usize>,
    pub skeleton: Option<usize>,
}

impl ContainerMesh {
    pub fn new(mesh: Mesh) -> Self {
        Self {
            mesh,
            vertex_data: None,
            material: None,
            skeleton: None,
        }
    }

    pub fn with_vertex_data(mut self, data: VertexData) -> Self {
        self.vertex_data = Some(data);
        self
    }

    pub fn with_material(mut self, index: usize) -> Self {
        self.material = Some(index);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ContainerParticles {
    pub system: ParticleSystem,
    /// Index of the container mesh to emit from; overrides `system.emitter`.
    pub emitter_mesh: Option<usize>,
}

/// Animation group whose targets are container mesh indices.
#[derive(Debug, Clone, Default)]
pub struct ContainerGroup {
    pub name: String,
    pub animations: Vec<(Animation, usize)>,
}

/// Entities produced by a load, not yet owned by any scene.
#[derive(Debug, Clone, Default)]
pub struct AssetContainer {
    pub meshes: Vec<ContainerMesh>,
    pub materials: Vec<Material>,
    pub lights: Vec<Light>,
    pub cameras: Vec<Camera>,
    pub skeletons: Vec<Skeleton>,
    pub particle_systems: Vec<ContainerParticles>,
    pub animation_groups: Vec<ContainerGroup>,
}

/// Handles of everything `add_all_to_scene` inserted, in container order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddedAssets {
    pub meshes: Vec<MeshId>,
    pub materials: Vec<MaterialId>,
    pub lights: Vec<LightId>,
    pub cameras: Vec<CameraId>,
    pub skeletons: Vec<SkeletonId>,
    pub particle_systems: Vec<ParticleSystemId>,
    pub animation_groups: Vec<AnimationGroupId>,
}

impl AssetContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
            && self.materials.is_empty()
            && self.lights.is_empty()
            && self.cameras.is_empty()
            && self.skeletons.is_empty()
            && self.particle_systems.is_empty()
            && self.animation_groups.is_empty()
    }

    /// Move every entity into `scene`, resolving index references to the
    /// handles the scene assigns. Dangling indices are dropped with a warning.
    pub fn add_all_to_scene(self, scene: &mut Scene) -> AddedAssets {
        let _span = info_span!("container_add", meshes = self.meshes.len()).entered();
        let mut added = AddedAssets::default();

        for material in self.materials {
            added.materials.push(scene.add_material(material));
        }
        for skeleton in self.skeletons {
            added.skeletons.push(scene.add_skeleton(skeleton));
        }

        for entry in self.meshes {
            let mut mesh = entry.mesh;
            mesh.material = resolve(&added.materials, entry.material, &mesh.name, "material");
            mesh.skeleton = resolve(&added.skeletons, entry.skeleton, &mesh.name, "skeleton");
            let id = match entry.vertex_data {
                Some(data) => scene.add_mesh_with_data(mesh, data),
                None => scene.add_mesh(mesh),
            };
            added.meshes.push(id);
        }

        for light in self.lights {
            added.lights.push(scene.add_light(light));
        }
        for camera in self.cameras {
            added.cameras.push(scene.add_camera(camera));
        }

        for entry in self.particle_systems {
            let mut system = entry.system;
            if let Some(mesh) = resolve(&added.meshes, entry.emitter_mesh, &system.name, "emitter") {
                system.emitter = Emitter::Mesh(mesh);
            }
            added.particle_systems.push(scene.add_particle_system(system));
        }

        for entry in self.animation_groups {
            let mut group = AnimationGroup::new(entry.name);
            for (animation, index) in entry.animations {
                match added.meshes.get(index) {
                    Some(mesh) => group.add_targeted_animation(animation, *mesh),
                    None => warn!(group = %group.name, index, "animation target out of range"),
                }
            }
            added.animation_groups.push(scene.add_animation_group(group));
        }

        debug!(
            meshes = added.meshes.len(),
            materials = added.materials.len(),
            groups = added.animation_groups.len(),
            "container added to scene"
        );
        added
    }
}

fn resolve<T: Copy>(ids: &[T], index: Option<usize>, owner: &str, what: &str) -> Option<T> {
    let index = index?;
    let id = ids.get(index).copied();
    if id.is_none() {
        warn!(owner, what, index, "container reference out of range");
    }
    id
}
