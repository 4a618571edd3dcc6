use std::time::{Duration, Instant};

use glam::{Mat4, Vec3};
use tracing::{debug, info_span, trace, warn};
use vista_animation::{AnimationGroup, AnimationScheduler};
use vista_common::{
    ActionManagerId, AnimationGroupId, CameraId, FrameHistory, Frustum, GeometryId, LightId,
    MASK_ALL, MaterialId, MeshId, ParticleSystemId, PerfCounter, Plane, ProceduralTextureId,
    ReflectionProbeId, SceneUid, SkeletonId, SoundTrackId, SpriteManagerId, TargetId, TextureId,
};
use vista_physics::{
    EulerPlugin, ImpostorShape, PhysicsEngine, PhysicsEnginePlugin, PhysicsError, PhysicsImpostor,
    PhysicsImpostorParameters,
};
use vista_render::{RenderBackend, RenderItem, RenderPass, RenderingManager, SortCompare};
use vista_spatial::{Octree, OctreeConfig, OctreeEntry};

use crate::actions::{ActionEvent, ActionManager, ActionSource, ActionTrigger};
use crate::animation::SceneTargets;
use crate::camera::Camera;
use crate::config::SceneConfig;
use crate::deferred::{DeferredQueue, SceneCommand};
use crate::light::Light;
use crate::material::{Material, ProceduralTexture, Texture};
use crate::mesh::{Geometry, Mesh, SubMesh, VertexData};
use crate::observables::{FrameInfo, SceneObservables};
use crate::particles::{Emitter, ParticleSystem};
use crate::pointer::{MeshPredicate, PointerTracker};
use crate::probe::ReflectionProbe;
use crate::skeleton::Skeleton;
use crate::sound::SoundTrack;
use crate::sprites::{Sprite, SpriteManager};

/// Root aggregate of the scene core.
///
/// Owns every entity, drives the frame pipeline and dispatches input.
/// Entities are added by value and referenced by handle everywhere else;
/// removing one purges every handle the scene's collaborators hold.
pub struct Scene {
    uid: SceneUid,
    pub(crate) config: SceneConfig,
    pub(crate) backend: Box<dyn RenderBackend>,
    next_unique_id: u32,

    pub(crate) meshes: Vec<Mesh>,
    pub(crate) cameras: Vec<Camera>,
    pub(crate) lights: Vec<Light>,
    pub(crate) materials: Vec<Material>,
    pub(crate) textures: Vec<Texture>,
    pub(crate) procedural_textures: Vec<ProceduralTexture>,
    pub(crate) geometries: Vec<Geometry>,
    pub(crate) skeletons: Vec<Skeleton>,
    pub(crate) particle_systems: Vec<ParticleSystem>,
    pub(crate) sprite_managers: Vec<SpriteManager>,
    pub(crate) sound_tracks: Vec<SoundTrack>,
    pub(crate) main_sound_track: SoundTrack,
    pub(crate) reflection_probes: Vec<ReflectionProbe>,
    pub(crate) action_managers: Vec<ActionManager>,
    pub(crate) animation_groups: Vec<AnimationGroup>,
    /// Scene-level actions (`OnEveryFrame`, key triggers).
    pub action_manager: Option<ActionManagerId>,

    active_camera: Option<CameraId>,
    active_cameras: Vec<CameraId>,
    active_meshes: Vec<MeshId>,
    camera_active_meshes: Vec<(CameraId, Vec<MeshId>)>,
    active_skeletons: Vec<SkeletonId>,
    active_particle_systems: Vec<ParticleSystemId>,

    pub(crate) scheduler: AnimationScheduler,
    rendering_manager: RenderingManager,
    selection_octree: Option<Octree<MeshId>>,
    physics: Option<PhysicsEngine>,
    pub observables: SceneObservables,
    deferred: DeferredQueue,

    pub(crate) pointer: PointerTracker,
    /// Eligibility for picks on pointer move. `None` uses the default:
    /// enabled, visible, pickable and carrying pointer actions.
    pub pointer_move_predicate: Option<MeshPredicate>,
    pub pointer_down_predicate: Option<MeshPredicate>,
    pub pointer_up_predicate: Option<MeshPredicate>,

    clip_plane: Option<Plane>,
    pending_data: Vec<String>,
    render_id: u64,
    frame_id: u64,
    delta_time_ms: f64,
    animation_ratio: f64,
    last_frame_instant: Option<Instant>,
    disposed: bool,

    active_indices: PerfCounter,
    active_particles: PerfCounter,
    active_bones: PerfCounter,
    last_frame_duration: PerfCounter,
    evaluate_active_meshes_duration: PerfCounter,
    render_duration: PerfCounter,
    particles_duration: PerfCounter,
    sprites_duration: PerfCounter,
    frame_history: FrameHistory,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("uid", &self.uid)
            .field("meshes", &self.meshes.len())
            .field("cameras", &self.cameras.len())
            .field("lights", &self.lights.len())
            .field("materials", &self.materials.len())
            .field("active_camera", &self.active_camera)
            .field("render_id", &self.render_id)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl Scene {
    pub fn new(backend: Box<dyn RenderBackend>) -> Self {
        Self::with_config(backend, SceneConfig::default())
    }

    pub fn with_config(backend: Box<dyn RenderBackend>, config: SceneConfig) -> Self {
        let physics_by_default = config.physics_enabled_by_default;
        let mut scene = Self {
            uid: SceneUid::new(),
            config,
            backend,
            next_unique_id: 1,
            meshes: Vec::new(),
            cameras: Vec::new(),
            lights: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            procedural_textures: Vec::new(),
            geometries: Vec::new(),
            skeletons: Vec::new(),
            particle_systems: Vec::new(),
            sprite_managers: Vec::new(),
            sound_tracks: Vec::new(),
            main_sound_track: SoundTrack::new("main"),
            reflection_probes: Vec::new(),
            action_managers: Vec::new(),
            animation_groups: Vec::new(),
            action_manager: None,
            active_camera: None,
            active_cameras: Vec::new(),
            active_meshes: Vec::new(),
            camera_active_meshes: Vec::new(),
            active_skeletons: Vec::new(),
            active_particle_systems: Vec::new(),
            scheduler: AnimationScheduler::new(),
            rendering_manager: RenderingManager::new(),
            selection_octree: None,
            physics: None,
            observables: SceneObservables::default(),
            deferred: DeferredQueue::new(),
            pointer: PointerTracker::default(),
            pointer_move_predicate: None,
            pointer_down_predicate: None,
            pointer_up_predicate: None,
            clip_plane: None,
            pending_data: Vec::new(),
            render_id: 0,
            frame_id: 0,
            delta_time_ms: 0.0,
            animation_ratio: 1.0,
            last_frame_instant: None,
            disposed: false,
            active_indices: PerfCounter::new(),
            active_particles: PerfCounter::new(),
            active_bones: PerfCounter::new(),
            last_frame_duration: PerfCounter::new(),
            evaluate_active_meshes_duration: PerfCounter::new(),
            render_duration: PerfCounter::new(),
            particles_duration: PerfCounter::new(),
            sprites_duration: PerfCounter::new(),
            frame_history: FrameHistory::default(),
        };
        scene.main_sound_track.scene_uid = Some(scene.uid);
        if physics_by_default {
            if let Err(err) = scene.enable_physics(None, None) {
                warn!(%err, "default physics engine rejected");
            }
        }
        debug!(uid = %scene.uid, "scene created");
        scene
    }

    pub fn uid(&self) -> SceneUid {
        self.uid
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Swap the configuration. Pointer thresholds apply from the next event.
    pub fn set_config(&mut self, config: SceneConfig) {
        self.config = config;
    }

    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    /// Handle for queuing mutations from observers and callbacks.
    pub fn deferred(&self) -> DeferredQueue {
        self.deferred.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn next_unique_id(&mut self) -> u32 {
        let id = self.next_unique_id;
        self.next_unique_id += 1;
        id
    }

    // ---- collections -------------------------------------------------

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    pub fn procedural_textures(&self) -> &[ProceduralTexture] {
        &self.procedural_textures
    }

    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    pub fn skeletons(&self) -> &[Skeleton] {
        &self.skeletons
    }

    pub fn particle_systems(&self) -> &[ParticleSystem] {
        &self.particle_systems
    }

    pub fn sprite_managers(&self) -> &[SpriteManager] {
        &self.sprite_managers
    }

    pub fn sound_tracks(&self) -> &[SoundTrack] {
        &self.sound_tracks
    }

    pub fn main_sound_track(&self) -> &SoundTrack {
        &self.main_sound_track
    }

    pub fn main_sound_track_mut(&mut self) -> &mut SoundTrack {
        &mut self.main_sound_track
    }

    pub fn reflection_probes(&self) -> &[ReflectionProbe] {
        &self.reflection_probes
    }

    pub fn action_managers(&self) -> &[ActionManager] {
        &self.action_managers
    }

    pub fn animation_groups(&self) -> &[AnimationGroup] {
        &self.animation_groups
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.iter_mut().find(|m| m.unique_id == id)
    }

    pub fn camera_mut(&mut self, id: CameraId) -> Option<&mut Camera> {
        self.cameras.iter_mut().find(|c| c.unique_id == id)
    }

    pub fn light_mut(&mut self, id: LightId) -> Option<&mut Light> {
        self.lights.iter_mut().find(|l| l.unique_id == id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.iter_mut().find(|m| m.unique_id == id)
    }

    pub fn texture_mut(&mut self, id: TextureId) -> Option<&mut Texture> {
        self.textures.iter_mut().find(|t| t.unique_id == id)
    }

    pub fn geometry_mut(&mut self, id: GeometryId) -> Option<&mut Geometry> {
        self.geometries.iter_mut().find(|g| g.unique_id == id)
    }

    pub fn skeleton_mut(&mut self, id: SkeletonId) -> Option<&mut Skeleton> {
        self.skeletons.iter_mut().find(|s| s.unique_id == id)
    }

    pub fn particle_system_mut(&mut self, id: ParticleSystemId) -> Option<&mut ParticleSystem> {
        self.particle_systems.iter_mut().find(|p| p.unique_id == id)
    }

    pub fn sprite_manager_mut(&mut self, id: SpriteManagerId) -> Option<&mut SpriteManager> {
        self.sprite_managers.iter_mut().find(|s| s.unique_id == id)
    }

    pub fn sound_track_mut(&mut self, id: SoundTrackId) -> Option<&mut SoundTrack> {
        self.sound_tracks.iter_mut().find(|s| s.unique_id == id)
    }

    pub fn reflection_probe_mut(&mut self, id: ReflectionProbeId) -> Option<&mut ReflectionProbe> {
        self.reflection_probes.iter_mut().find(|p| p.unique_id == id)
    }

    pub fn procedural_texture_mut(
        &mut self,
        id: ProceduralTextureId,
    ) -> Option<&mut ProceduralTexture> {
        self.procedural_textures.iter_mut().find(|p| p.unique_id == id)
    }

    pub fn action_manager_mut(&mut self, id: ActionManagerId) -> Option<&mut ActionManager> {
        self.action_managers.iter_mut().find(|a| a.unique_id == id)
    }

    // ---- add / remove ------------------------------------------------

    pub fn add_mesh(&mut self, mut mesh: Mesh) -> MeshId {
        let id = MeshId(self.next_unique_id());
        mesh.unique_id = id;
        mesh.scene_uid = Some(self.uid);
        mesh.render_id = 0;
        debug!(mesh = %id, name = %mesh.name, "mesh added");
        self.meshes.push(mesh);
        self.sync_octree_entry(id);
        let mut event = id;
        self.observables
            .on_new_mesh_added
            .notify_observers(&mut event, MASK_ALL);
        id
    }

    /// Unlink the mesh from every collaborator and hand it back.
    pub fn remove_mesh(&mut self, id: MeshId) -> Option<Mesh> {
        let Some(index) = self.meshes.iter().position(|m| m.unique_id == id) else {
            warn!(mesh = %id, "remove_mesh: not owned by this scene");
            return None;
        };
        self.forget_target(TargetId::Mesh(id));
        let mut mesh = self.meshes.remove(index);

        if let Some(octree) = self.selection_octree.as_mut() {
            octree.remove_entry(id);
        }
        self.rendering_manager.purge_mesh(id);
        self.active_meshes.retain(|m| *m != id);
        for (_, list) in &mut self.camera_active_meshes {
            list.retain(|m| *m != id);
        }
        self.pointer.forget_mesh(id);
        if let Some(physics) = self.physics.as_mut() {
            physics.remove_impostor(id);
        }
        for probe in &mut self.reflection_probes {
            probe.forget_mesh(id);
        }
        for light in &mut self.lights {
            light.forget_mesh(id);
        }
        let last_position = mesh.world_matrix().w_axis.truncate();
        for ps in &mut self.particle_systems {
            if ps.emitter == Emitter::Mesh(id) {
                ps.emitter = Emitter::Point(last_position);
            }
        }
        self.main_sound_track.detach_mesh(id);
        for track in &mut self.sound_tracks {
            track.detach_mesh(id);
        }

        mesh.scene_uid = None;
        debug!(mesh = %id, name = %mesh.name, "mesh removed");
        let mut event = id;
        self.observables
            .on_mesh_removed
            .notify_observers(&mut event, MASK_ALL);
        Some(mesh)
    }

    /// The first camera added becomes the active one.
    pub fn add_camera(&mut self, mut camera: Camera) -> CameraId {
        let id = CameraId(self.next_unique_id());
        camera.unique_id = id;
        camera.scene_uid = Some(self.uid);
        debug!(camera = %id, name = %camera.name, "camera added");
        self.cameras.push(camera);
        let mut event = id;
        self.observables
            .on_new_camera_added
            .notify_observers(&mut event, MASK_ALL);
        if self.active_camera.is_none() {
            self.set_active_camera(Some(id));
        }
        id
    }

    /// Removing the active camera activates the first remaining one.
    pub fn remove_camera(&mut self, id: CameraId) -> Option<Camera> {
        let Some(index) = self.cameras.iter().position(|c| c.unique_id == id) else {
            warn!(camera = %id, "remove_camera: not owned by this scene");
            return None;
        };
        self.forget_target(TargetId::Camera(id));
        let mut camera = self.cameras.remove(index);
        self.active_cameras.retain(|c| *c != id);
        self.camera_active_meshes.retain(|(c, _)| *c != id);
        camera.scene_uid = None;
        debug!(camera = %id, name = %camera.name, "camera removed");
        let mut event = id;
        self.observables
            .on_camera_removed
            .notify_observers(&mut event, MASK_ALL);
        if self.active_camera == Some(id) {
            let next = self.cameras.first().map(|c| c.unique_id);
            self.set_active_camera(next);
        }
        Some(camera)
    }

    pub fn add_light(&mut self, mut light: Light) -> LightId {
        let id = LightId(self.next_unique_id());
        light.unique_id = id;
        light.scene_uid = Some(self.uid);
        debug!(light = %id, name = %light.name, "light added");
        self.lights.push(light);
        let mut event = id;
        self.observables
            .on_new_light_added
            .notify_observers(&mut event, MASK_ALL);
        id
    }

    pub fn remove_light(&mut self, id: LightId) -> Option<Light> {
        let Some(index) = self.lights.iter().position(|l| l.unique_id == id) else {
            warn!(light = %id, "remove_light: not owned by this scene");
            return None;
        };
        self.forget_target(TargetId::Light(id));
        let mut light = self.lights.remove(index);
        light.scene_uid = None;
        debug!(light = %id, name = %light.name, "light removed");
        let mut event = id;
        self.observables
            .on_light_removed
            .notify_observers(&mut event, MASK_ALL);
        Some(light)
    }

    pub fn add_material(&mut self, mut material: Material) -> MaterialId {
        let id = MaterialId(self.next_unique_id());
        material.unique_id = id;
        material.scene_uid = Some(self.uid);
        debug!(material = %id, name = %material.name, "material added");
        self.materials.push(material);
        let mut event = id;
        self.observables
            .on_new_material_added
            .notify_observers(&mut event, MASK_ALL);
        id
    }

    /// Meshes and sub-meshes using the material fall back to none.
    pub fn remove_material(&mut self, id: MaterialId) -> Option<Material> {
        let Some(index) = self.materials.iter().position(|m| m.unique_id == id) else {
            warn!(material = %id, "remove_material: not owned by this scene");
            return None;
        };
        self.forget_target(TargetId::Material(id));
        let mut material = self.materials.remove(index);
        for mesh in &mut self.meshes {
            if mesh.material == Some(id) {
                mesh.material = None;
            }
            for sub in &mut mesh.sub_meshes {
                if sub.material == Some(id) {
                    sub.material = None;
                }
            }
        }
        material.scene_uid = None;
        debug!(material = %id, name = %material.name, "material removed");
        let mut event = id;
        self.observables
            .on_material_removed
            .notify_observers(&mut event, MASK_ALL);
        Some(material)
    }

    pub fn add_texture(&mut self, mut texture: Texture) -> TextureId {
        let id = TextureId(self.next_unique_id());
        texture.unique_id = id;
        texture.scene_uid = Some(self.uid);
        debug!(texture = %id, name = %texture.name, "texture added");
        self.textures.push(texture);
        let mut event = id;
        self.observables
            .on_new_texture_added
            .notify_observers(&mut event, MASK_ALL);
        id
    }

    pub fn remove_texture(&mut self, id: TextureId) -> Option<Texture> {
        let Some(index) = self.textures.iter().position(|t| t.unique_id == id) else {
            warn!(texture = %id, "remove_texture: not owned by this scene");
            return None;
        };
        let mut texture = self.textures.remove(index);
        for material in &mut self.materials {
            material.textures.retain(|t| *t != id);
        }
        texture.scene_uid = None;
        debug!(texture = %id, name = %texture.name, "texture removed");
        let mut event = id;
        self.observables
            .on_texture_removed
            .notify_observers(&mut event, MASK_ALL);
        Some(texture)
    }

    pub fn add_procedural_texture(&mut self, mut texture: ProceduralTexture) -> ProceduralTextureId {
        let id = ProceduralTextureId(self.next_unique_id());
        texture.unique_id = id;
        texture.scene_uid = Some(self.uid);
        debug!(texture = %id, name = %texture.name, "procedural texture added");
        self.procedural_textures.push(texture);
        id
    }

    pub fn remove_procedural_texture(
        &mut self,
        id: ProceduralTextureId,
    ) -> Option<ProceduralTexture> {
        let Some(index) = self.procedural_textures.iter().position(|t| t.unique_id == id) else {
            warn!(texture = %id, "remove_procedural_texture: not owned by this scene");
            return None;
        };
        let mut texture = self.procedural_textures.remove(index);
        texture.scene_uid = None;
        debug!(texture = %id, "procedural texture removed");
        Some(texture)
    }

    /// Add a geometry. A geometry whose string id is already taken is
    /// refused unless `force` is set.
    pub fn push_geometry(&mut self, mut geometry: Geometry, force: bool) -> Option<GeometryId> {
        if !force && self.geometries.iter().any(|g| g.id == geometry.id) {
            warn!(id = %geometry.id, "push_geometry: id already in use");
            return None;
        }
        let id = GeometryId(self.next_unique_id());
        geometry.unique_id = id;
        geometry.scene_uid = Some(self.uid);
        debug!(geometry = %id, id = %geometry.id, "geometry added");
        self.geometries.push(geometry);
        let mut event = id;
        self.observables
            .on_new_geometry_added
            .notify_observers(&mut event, MASK_ALL);
        Some(id)
    }

    /// Meshes built on the geometry lose their vertex data and sub-meshes.
    pub fn remove_geometry(&mut self, id: GeometryId) -> Option<Geometry> {
        let Some(index) = self.geometries.iter().position(|g| g.unique_id == id) else {
            warn!(geometry = %id, "remove_geometry: not owned by this scene");
            return None;
        };
        let mut geometry = self.geometries.remove(index);
        let mut orphaned = Vec::new();
        for mesh in self.meshes.iter_mut().filter(|m| m.geometry == Some(id)) {
            mesh.geometry = None;
            mesh.sub_meshes.clear();
            mesh.set_bounding_info(Default::default());
            orphaned.push(mesh.unique_id);
        }
        for mesh in orphaned {
            self.sync_octree_entry(mesh);
        }
        geometry.scene_uid = None;
        debug!(geometry = %id, "geometry removed");
        let mut event = id;
        self.observables
            .on_geometry_removed
            .notify_observers(&mut event, MASK_ALL);
        Some(geometry)
    }

    /// Bind a geometry to a mesh: bounds follow the vertex data and the mesh
    /// gets a single sub-mesh spanning it.
    pub fn assign_geometry(&mut self, mesh: MeshId, geometry: GeometryId) -> bool {
        let Some(geom) = self.geometries.iter().find(|g| g.unique_id == geometry) else {
            return false;
        };
        let info = geom.vertex_data.bounding_info();
        let vertices = geom.vertex_data.total_vertices() as u32;
        let indices = geom.vertex_data.total_indices() as u32;
        let Some(target) = self.meshes.iter_mut().find(|m| m.unique_id == mesh) else {
            return false;
        };
        target.geometry = Some(geometry);
        target.sub_meshes = vec![SubMesh::new(0, vertices, 0, indices)];
        target.set_bounding_info(info);
        target.compute_world_matrix();
        self.sync_octree_entry(mesh);
        true
    }

    /// Add `mesh` built on a fresh geometry holding `data`.
    pub fn add_mesh_with_data(&mut self, mesh: Mesh, data: VertexData) -> MeshId {
        let geometry_id = format!("{}_geometry", mesh.id);
        let mesh = self.add_mesh(mesh);
        if let Some(geometry) = self.push_geometry(Geometry::new(geometry_id, data), true) {
            self.assign_geometry(mesh, geometry);
        }
        mesh
    }

    pub fn create_box(&mut self, name: &str, size: f32) -> MeshId {
        self.add_mesh_with_data(Mesh::new(name), VertexData::create_box(size))
    }

    pub fn create_sphere(&mut self, name: &str, segments: u32, diameter: f32) -> MeshId {
        self.add_mesh_with_data(Mesh::new(name), VertexData::create_sphere(segments, diameter))
    }

    pub fn create_ground(&mut self, name: &str, width: f32, height: f32, subdivisions: u32) -> MeshId {
        self.add_mesh_with_data(
            Mesh::new(name),
            VertexData::create_ground(width, height, subdivisions),
        )
    }

    pub fn create_plane(&mut self, name: &str, size: f32) -> MeshId {
        self.add_mesh_with_data(Mesh::new(name), VertexData::create_plane(size))
    }

    pub fn add_skeleton(&mut self, mut skeleton: Skeleton) -> SkeletonId {
        let id = SkeletonId(self.next_unique_id());
        skeleton.unique_id = id;
        skeleton.scene_uid = Some(self.uid);
        debug!(skeleton = %id, name = %skeleton.name, "skeleton added");
        self.skeletons.push(skeleton);
        let mut event = id;
        self.observables
            .on_new_skeleton_added
            .notify_observers(&mut event, MASK_ALL);
        id
    }

    pub fn remove_skeleton(&mut self, id: SkeletonId) -> Option<Skeleton> {
        let Some(index) = self.skeletons.iter().position(|s| s.unique_id == id) else {
            warn!(skeleton = %id, "remove_skeleton: not owned by this scene");
            return None;
        };
        let mut skeleton = self.skeletons.remove(index);
        for mesh in self.meshes.iter_mut().filter(|m| m.skeleton == Some(id)) {
            mesh.skeleton = None;
        }
        self.active_skeletons.retain(|s| *s != id);
        skeleton.scene_uid = None;
        debug!(skeleton = %id, "skeleton removed");
        let mut event = id;
        self.observables
            .on_skeleton_removed
            .notify_observers(&mut event, MASK_ALL);
        Some(skeleton)
    }

    pub fn add_particle_system(&mut self, mut system: ParticleSystem) -> ParticleSystemId {
        let id = ParticleSystemId(self.next_unique_id());
        system.unique_id = id;
        system.scene_uid = Some(self.uid);
        debug!(particle_system = %id, name = %system.name, "particle system added");
        self.particle_systems.push(system);
        let mut event = id;
        self.observables
            .on_new_particle_system_added
            .notify_observers(&mut event, MASK_ALL);
        id
    }

    pub fn remove_particle_system(&mut self, id: ParticleSystemId) -> Option<ParticleSystem> {
        let Some(index) = self.particle_systems.iter().position(|p| p.unique_id == id) else {
            warn!(particle_system = %id, "remove_particle_system: not owned by this scene");
            return None;
        };
        let mut system = self.particle_systems.remove(index);
        self.active_particle_systems.retain(|p| *p != id);
        system.scene_uid = None;
        debug!(particle_system = %id, "particle system removed");
        let mut event = id;
        self.observables
            .on_particle_system_removed
            .notify_observers(&mut event, MASK_ALL);
        Some(system)
    }

    pub fn add_sprite_manager(&mut self, mut manager: SpriteManager) -> SpriteManagerId {
        let id = SpriteManagerId(self.next_unique_id());
        manager.unique_id = id;
        manager.scene_uid = Some(self.uid);
        debug!(sprite_manager = %id, name = %manager.name, "sprite manager added");
        self.sprite_managers.push(manager);
        id
    }

    pub fn remove_sprite_manager(&mut self, id: SpriteManagerId) -> Option<SpriteManager> {
        let Some(index) = self.sprite_managers.iter().position(|s| s.unique_id == id) else {
            warn!(sprite_manager = %id, "remove_sprite_manager: not owned by this scene");
            return None;
        };
        let mut manager = self.sprite_managers.remove(index);
        self.pointer.forget_sprite_manager(id);
        manager.scene_uid = None;
        debug!(sprite_manager = %id, "sprite manager removed");
        Some(manager)
    }

    /// Remove sprite `index` from an owned manager. Hovered or pressed
    /// sprites past it keep pointing at the same sprite.
    pub fn remove_sprite(&mut self, manager: SpriteManagerId, index: usize) -> Option<Sprite> {
        let owner = self.sprite_managers.iter_mut().find(|s| s.unique_id == manager)?;
        let sprite = owner.take_sprite(index)?;
        self.pointer.forget_sprite(manager, index);
        debug!(sprite_manager = %manager, index, "sprite removed");
        Some(sprite)
    }

    pub fn add_sound_track(&mut self, mut track: SoundTrack) -> SoundTrackId {
        let id = SoundTrackId(self.next_unique_id());
        track.unique_id = id;
        track.scene_uid = Some(self.uid);
        debug!(sound_track = %id, name = %track.name, "sound track added");
        self.sound_tracks.push(track);
        id
    }

    /// The track's sounds stop playing.
    pub fn remove_sound_track(&mut self, id: SoundTrackId) -> Option<SoundTrack> {
        let Some(index) = self.sound_tracks.iter().position(|s| s.unique_id == id) else {
            warn!(sound_track = %id, "remove_sound_track: not owned by this scene");
            return None;
        };
        let mut track = self.sound_tracks.remove(index);
        track.stop_all();
        track.scene_uid = None;
        debug!(sound_track = %id, "sound track removed");
        Some(track)
    }

    pub fn add_reflection_probe(&mut self, mut probe: ReflectionProbe) -> ReflectionProbeId {
        let id = ReflectionProbeId(self.next_unique_id());
        probe.unique_id = id;
        probe.scene_uid = Some(self.uid);
        debug!(probe = %id, name = %probe.name, "reflection probe added");
        self.reflection_probes.push(probe);
        id
    }

    pub fn remove_reflection_probe(&mut self, id: ReflectionProbeId) -> Option<ReflectionProbe> {
        let Some(index) = self.reflection_probes.iter().position(|p| p.unique_id == id) else {
            warn!(probe = %id, "remove_reflection_probe: not owned by this scene");
            return None;
        };
        let mut probe = self.reflection_probes.remove(index);
        probe.scene_uid = None;
        debug!(probe = %id, "reflection probe removed");
        Some(probe)
    }

    pub fn add_action_manager(&mut self, mut manager: ActionManager) -> ActionManagerId {
        let id = ActionManagerId(self.next_unique_id());
        manager.unique_id = id;
        manager.scene_uid = Some(self.uid);
        debug!(action_manager = %id, "action manager added");
        self.action_managers.push(manager);
        id
    }

    /// Meshes, sprites and the scene drop their reference to it.
    pub fn remove_action_manager(&mut self, id: ActionManagerId) -> Option<ActionManager> {
        let Some(index) = self.action_managers.iter().position(|a| a.unique_id == id) else {
            warn!(action_manager = %id, "remove_action_manager: not owned by this scene");
            return None;
        };
        let mut manager = self.action_managers.remove(index);
        for mesh in self.meshes.iter_mut().filter(|m| m.action_manager == Some(id)) {
            mesh.action_manager = None;
        }
        for sprite in self
            .sprite_managers
            .iter_mut()
            .flat_map(|m| m.sprites_mut().iter_mut())
            .filter(|s| s.action_manager == Some(id))
        {
            sprite.action_manager = None;
        }
        if self.action_manager == Some(id) {
            self.action_manager = None;
        }
        manager.scene_uid = None;
        debug!(action_manager = %id, "action manager removed");
        Some(manager)
    }

    pub fn add_animation_group(&mut self, mut group: AnimationGroup) -> AnimationGroupId {
        let id = AnimationGroupId(self.next_unique_id());
        group.set_unique_id(id);
        debug!(group = %id, name = %group.name, "animation group added");
        self.animation_groups.push(group);
        let mut event = id;
        self.observables
            .on_new_animation_group_added
            .notify_observers(&mut event, MASK_ALL);
        id
    }

    /// A running group is stopped first.
    pub fn remove_animation_group(&mut self, id: AnimationGroupId) -> Option<AnimationGroup> {
        let Some(index) = self.animation_groups.iter().position(|g| g.unique_id() == id) else {
            warn!(group = %id, "remove_animation_group: not owned by this scene");
            return None;
        };
        let mut group = self.animation_groups.remove(index);
        group.stop(&mut self.scheduler);
        debug!(group = %id, "animation group removed");
        let mut event = id;
        self.observables
            .on_animation_group_removed
            .notify_observers(&mut event, MASK_ALL);
        Some(group)
    }

    /// Stop animations on a target that is leaving the scene.
    fn forget_target(&mut self, target: TargetId) {
        self.scheduler.stop(target, None);
        for group in &mut self.animation_groups {
            group.remove_target(target);
        }
    }

    // ---- cameras -----------------------------------------------------

    pub fn active_camera(&self) -> Option<CameraId> {
        self.active_camera
    }

    fn set_active_camera(&mut self, id: Option<CameraId>) {
        if self.active_camera == id {
            return;
        }
        self.active_camera = id;
        debug!(camera = ?id, "active camera changed");
        let mut event = id;
        self.observables
            .on_active_camera_changed
            .notify_observers(&mut event, MASK_ALL);
    }

    /// Activate the first camera with this string id.
    pub fn set_active_camera_by_id(&mut self, id: &str) -> Option<CameraId> {
        let found = self.cameras.iter().find(|c| c.id == id)?.unique_id;
        self.set_active_camera(Some(found));
        Some(found)
    }

    pub fn set_active_camera_by_name(&mut self, name: &str) -> Option<CameraId> {
        let found = self.cameras.iter().find(|c| c.name == name)?.unique_id;
        self.set_active_camera(Some(found));
        Some(found)
    }

    /// Make `id` the active camera. False when the scene does not own it.
    pub fn switch_active_camera(&mut self, id: CameraId) -> bool {
        if !self.cameras.iter().any(|c| c.unique_id == id) {
            return false;
        }
        self.set_active_camera(Some(id));
        true
    }

    /// Cameras rendered each frame when non-empty, in order. Otherwise the
    /// single active camera renders.
    pub fn active_cameras(&self) -> &[CameraId] {
        &self.active_cameras
    }

    /// Unknown ids are dropped.
    pub fn set_active_cameras(&mut self, cameras: Vec<CameraId>) {
        self.active_cameras = cameras
            .into_iter()
            .filter(|id| self.cameras.iter().any(|c| c.unique_id == *id))
            .collect();
    }

    pub(crate) fn rendering_cameras(&self) -> Vec<CameraId> {
        if self.active_cameras.is_empty() {
            self.active_camera.into_iter().collect()
        } else {
            self.active_cameras.clone()
        }
    }

    /// Camera framing the world extents. With `replace` the current active
    /// camera is removed first.
    pub fn create_default_camera(&mut self, replace: bool) -> CameraId {
        if replace {
            if let Some(active) = self.active_camera {
                self.remove_camera(active);
            }
        }
        let (min, max) = self
            .get_world_extends()
            .unwrap_or((Vec3::splat(-1.0), Vec3::splat(1.0)));
        let center = (min + max) * 0.5;
        let size = (max - min).length();
        let radius = if size > 0.0 { size * 1.5 } else { 1.0 };
        let mut camera = Camera::new(
            "default camera",
            center + Vec3::new(0.0, radius * 0.5, -radius),
            center,
        );
        camera.min_z = radius * 0.01;
        camera.max_z = radius * 1000.0;
        let id = self.add_camera(camera);
        self.set_active_camera(Some(id));
        id
    }

    /// Hemispheric light pointing up. Skipped when lights exist, unless
    /// `replace` removes them first.
    pub fn create_default_light(&mut self, replace: bool) -> Option<LightId> {
        if replace {
            while let Some(id) = self.lights.last().map(|l| l.unique_id) {
                self.remove_light(id);
            }
        }
        if !self.lights.is_empty() {
            return None;
        }
        Some(self.add_light(Light::hemispheric("default light", Vec3::Y)))
    }

    /// Ensure the scene has a light and an active camera.
    pub fn create_default_camera_or_light(&mut self, replace: bool) {
        self.create_default_light(replace);
        if replace || self.active_camera.is_none() {
            self.create_default_camera(replace);
        }
    }

    // ---- clip plane --------------------------------------------------

    pub fn clip_plane(&self) -> Option<Plane> {
        self.clip_plane
    }

    pub fn set_clip_plane(&mut self, plane: Plane) {
        self.clip_plane = Some(plane);
    }

    pub fn reset_clip_plane(&mut self) {
        self.clip_plane = None;
    }

    // ---- rendering manager -------------------------------------------

    pub fn rendering_manager(&self) -> &RenderingManager {
        &self.rendering_manager
    }

    pub fn rendering_manager_mut(&mut self) -> &mut RenderingManager {
        &mut self.rendering_manager
    }

    pub fn set_rendering_order(
        &mut self,
        group_id: u8,
        opaque: Option<SortCompare>,
        alpha_test: Option<SortCompare>,
        transparent: Option<SortCompare>,
    ) -> bool {
        self.rendering_manager
            .set_rendering_order(group_id, opaque, alpha_test, transparent)
    }

    pub fn set_rendering_auto_clear_depth_stencil(&mut self, group_id: u8, flag: bool) -> bool {
        self.rendering_manager
            .set_rendering_auto_clear_depth_stencil(group_id, flag)
    }

    // ---- octree ------------------------------------------------------

    /// Build, or rebuild, the octree used to select active meshes. `None`
    /// arguments fall back to the scene config.
    pub fn create_or_update_selection_octree(
        &mut self,
        max_capacity: Option<usize>,
        max_depth: Option<usize>,
    ) -> &Octree<MeshId> {
        let defaults = self.config.octree_config();
        let config = OctreeConfig {
            max_block_capacity: max_capacity.unwrap_or(defaults.max_block_capacity),
            max_depth: max_depth.unwrap_or(defaults.max_depth),
        };
        for mesh in &mut self.meshes {
            mesh.compute_world_matrix();
        }
        let (min, max) = self.get_world_extends().unwrap_or((Vec3::ZERO, Vec3::ZERO));
        let entries: Vec<_> = self
            .meshes
            .iter()
            .filter(|m| m.is_world_matrix_usable())
            .map(|m| {
                let b = &m.bounding_info().bounding_box;
                OctreeEntry::new(m.unique_id, b.minimum_world, b.maximum_world)
            })
            .collect();
        let octree = self
            .selection_octree
            .get_or_insert_with(|| Octree::new(config));
        if octree.config() != &config {
            *octree = Octree::new(config);
        }
        octree.update(min, max, entries);
        octree
    }

    /// Re-file the mesh in the selection octree under its current world
    /// bounds. Meshes that moved are re-filed by `evaluate_active_meshes`.
    pub fn sync_octree_entry(&mut self, id: MeshId) {
        let Some(octree) = self.selection_octree.as_mut() else {
            return;
        };
        octree.remove_entry(id);
        let Some(mesh) = self.meshes.iter_mut().find(|m| m.unique_id == id) else {
            return;
        };
        if mesh.compute_world_matrix().is_none() {
            return;
        }
        let b = &mesh.bounding_info().bounding_box;
        octree.add_entry_or_dynamic(OctreeEntry::new(id, b.minimum_world, b.maximum_world));
    }

    pub fn selection_octree(&self) -> Option<&Octree<MeshId>> {
        self.selection_octree.as_ref()
    }

    /// Back to linear active mesh selection.
    pub fn clear_selection_octree(&mut self) {
        self.selection_octree = None;
    }

    // ---- physics -----------------------------------------------------

    /// Attach a physics engine. `None` plugin uses the built-in Euler
    /// integrator; `None` gravity uses earth gravity.
    pub fn enable_physics(
        &mut self,
        gravity: Option<Vec3>,
        plugin: Option<Box<dyn PhysicsEnginePlugin>>,
    ) -> Result<(), PhysicsError> {
        let plugin = plugin.unwrap_or_else(|| Box::new(EulerPlugin::new()));
        let engine = PhysicsEngine::new(gravity, plugin)?;
        if let Some(mut old) = self.physics.replace(engine) {
            old.dispose();
        }
        debug!("physics enabled");
        Ok(())
    }

    pub fn disable_physics_engine(&mut self) {
        if let Some(mut engine) = self.physics.take() {
            engine.dispose();
            debug!("physics disabled");
        }
    }

    pub fn is_physics_enabled(&self) -> bool {
        self.physics.is_some()
    }

    pub fn physics_engine(&self) -> Option<&PhysicsEngine> {
        self.physics.as_ref()
    }

    pub fn physics_engine_mut(&mut self) -> Option<&mut PhysicsEngine> {
        self.physics.as_mut()
    }

    /// Give a mesh a physics body sized from its bounds. False without a
    /// physics engine or for an unknown mesh.
    pub fn set_physics_impostor(
        &mut self,
        mesh: MeshId,
        shape: ImpostorShape,
        params: PhysicsImpostorParameters,
    ) -> bool {
        let Some(target) = self.meshes.iter().find(|m| m.unique_id == mesh) else {
            return false;
        };
        let Some(engine) = self.physics.as_mut() else {
            warn!(%mesh, "set_physics_impostor: physics is not enabled");
            return false;
        };
        let b = &target.bounding_info().bounding_box;
        let mut half = ((b.maximum - b.minimum) * 0.5 * target.scaling()).abs();
        if shape == ImpostorShape::Sphere {
            half = Vec3::splat(half.max_element());
        }
        let mut impostor = PhysicsImpostor::new(mesh, shape, params).with_half_extents(half);
        impostor.position = target.position();
        impostor.rotation = target.rotation();
        engine.add_impostor(impostor);
        true
    }

    // ---- readiness ---------------------------------------------------

    /// Mark an external load as in flight; the scene is not ready until it
    /// is removed again.
    pub fn add_pending_data(&mut self, key: impl Into<String>) {
        self.pending_data.push(key.into());
    }

    pub fn remove_pending_data(&mut self, key: &str) -> bool {
        match self.pending_data.iter().position(|k| k == key) {
            Some(index) => {
                self.pending_data.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn pending_data_count(&self) -> usize {
        self.pending_data.len()
    }

    /// True when no load is pending and everything enabled meshes draw with
    /// has finished loading.
    pub fn is_ready(&self) -> bool {
        if !self.pending_data.is_empty() {
            return false;
        }
        if self.geometries.iter().any(|g| !g.ready) {
            return false;
        }
        self.meshes.iter().filter(|m| m.is_enabled).all(|mesh| {
            (0..mesh.sub_meshes.len().max(1)).all(|i| {
                mesh.sub_mesh_material(i).is_none_or(|id| {
                    self.materials
                        .iter()
                        .find(|m| m.unique_id == id)
                        .is_none_or(|m| m.is_ready(&self.textures))
                })
            })
        })
    }

    /// Run `f` once the scene is ready; immediately when it already is.
    pub fn execute_when_ready(&mut self, f: impl FnOnce() + 'static) {
        let mut f = Some(f);
        self.observables.on_ready.add_once(move |_, _| {
            if let Some(f) = f.take() {
                f();
            }
        });
        self.check_is_ready();
    }

    fn check_is_ready(&mut self) {
        if self.observables.on_ready.has_observers() && self.is_ready() {
            self.observables.on_ready.notify_observers(&mut (), MASK_ALL);
            self.observables.on_ready.clear();
        }
    }

    // ---- frame -------------------------------------------------------

    pub fn render_id(&self) -> u64 {
        self.render_id
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    /// Clamped delta of the last frame in milliseconds.
    pub fn delta_time_ms(&self) -> f64 {
        self.delta_time_ms
    }

    /// Last frame delta relative to a 60 fps frame.
    pub fn animation_ratio(&self) -> f64 {
        self.animation_ratio
    }

    pub fn active_meshes(&self) -> &[MeshId] {
        &self.active_meshes
    }

    /// Meshes selected for `camera` during the last evaluation.
    pub fn active_meshes_for_camera(&self, camera: CameraId) -> &[MeshId] {
        self.camera_active_meshes
            .iter()
            .find(|(c, _)| *c == camera)
            .map_or(&[], |(_, list)| list.as_slice())
    }

    pub fn active_skeletons(&self) -> &[SkeletonId] {
        &self.active_skeletons
    }

    pub fn active_particle_systems(&self) -> &[ParticleSystemId] {
        &self.active_particle_systems
    }

    pub fn total_vertices(&self) -> usize {
        self.geometries
            .iter()
            .map(|g| g.vertex_data.total_vertices())
            .sum()
    }

    pub fn active_indices(&self) -> &PerfCounter {
        &self.active_indices
    }

    pub fn active_particles(&self) -> &PerfCounter {
        &self.active_particles
    }

    pub fn active_bones(&self) -> &PerfCounter {
        &self.active_bones
    }

    pub fn last_frame_duration(&self) -> &PerfCounter {
        &self.last_frame_duration
    }

    pub fn evaluate_active_meshes_duration(&self) -> &PerfCounter {
        &self.evaluate_active_meshes_duration
    }

    pub fn render_duration(&self) -> &PerfCounter {
        &self.render_duration
    }

    pub fn particles_duration(&self) -> &PerfCounter {
        &self.particles_duration
    }

    pub fn sprites_duration(&self) -> &PerfCounter {
        &self.sprites_duration
    }

    pub fn frame_history(&self) -> &FrameHistory {
        &self.frame_history
    }

    pub(crate) fn frame_info(&self) -> FrameInfo {
        FrameInfo {
            render_id: self.render_id,
            frame_id: self.frame_id,
            delta_ms: self.delta_time_ms,
        }
    }

    /// Render a frame, measuring the delta from the previous call.
    pub fn render(&mut self) {
        let now = Instant::now();
        let delta = match self.last_frame_instant {
            Some(previous) => now - previous,
            None => Duration::from_secs_f64(1.0 / 60.0),
        };
        self.last_frame_instant = Some(now);
        self.render_with_delta(delta);
    }

    /// Run the whole frame pipeline with an explicit delta.
    pub fn render_with_delta(&mut self, delta: Duration) {
        let _span = info_span!("scene_render", render_id = self.render_id + 1).entered();
        if self.disposed {
            warn!("render called on a disposed scene");
            return;
        }
        let frame_start = Instant::now();
        self.render_id += 1;
        self.frame_id += 1;
        self.delta_time_ms = self.config.clamp_delta_ms(delta.as_secs_f64() * 1000.0);

        let mut info = self.frame_info();
        self.observables
            .on_before_render
            .notify_observers(&mut info, MASK_ALL);
        self.process_scene_trigger(ActionTrigger::OnEveryFrame, None);
        for texture in &mut self.procedural_textures {
            if texture.should_render() {
                texture.render();
            }
        }

        if self.rendering_cameras().is_empty() {
            trace!("no active camera, skipping mesh evaluation");
        } else {
            self.evaluate_active_meshes();
        }
        self.animate();
        self.render_cameras();
        self.apply_deferred();

        let mut info = self.frame_info();
        self.observables
            .on_after_render
            .notify_observers(&mut info, MASK_ALL);
        self.check_is_ready();

        let elapsed = frame_start.elapsed();
        self.last_frame_duration.record_duration(elapsed, true);
        self.frame_history.record(elapsed);
        trace!(
            render_id = self.render_id,
            active_meshes = self.active_meshes.len(),
            ms = elapsed.as_secs_f64() * 1000.0,
            "frame done"
        );
    }

    pub(crate) fn process_scene_trigger(&mut self, trigger: ActionTrigger, key: Option<&str>) {
        let Some(id) = self.action_manager else {
            return;
        };
        let position = self.pointer.state.position();
        let Some(manager) = self.action_managers.iter_mut().find(|a| a.unique_id == id) else {
            return;
        };
        let mut event = ActionEvent::new(ActionSource::Scene, position.x, position.y);
        event.key = key.map(str::to_string);
        event.mesh_under_pointer = self.pointer.mesh_under_pointer;
        manager.process_trigger(trigger, &event);
    }

    /// Select the meshes every rendering camera sees this frame.
    pub fn evaluate_active_meshes(&mut self) {
        let _span = info_span!("evaluate_active_meshes").entered();
        let started = Instant::now();
        self.active_meshes.clear();
        self.camera_active_meshes.clear();
        self.active_skeletons.clear();
        self.active_indices.fetch_new_frame();

        let track_moves = self.selection_octree.is_some();
        let mut moved = Vec::new();
        for mesh in &mut self.meshes {
            let b = &mesh.bounding_info().bounding_box;
            let before = (b.minimum_world, b.maximum_world);
            mesh.compute_world_matrix();
            let b = &mesh.bounding_info().bounding_box;
            if track_moves && before != (b.minimum_world, b.maximum_world) {
                moved.push(mesh.unique_id);
            }
        }
        for id in moved {
            self.sync_octree_entry(id);
        }

        let (width, height) = self.backend.render_size();
        for camera_id in self.rendering_cameras() {
            let Some(camera) = self.cameras.iter().find(|c| c.unique_id == camera_id) else {
                continue;
            };
            let frustum = match camera.frustum(camera.aspect_ratio(width, height)) {
                Some(f) => f,
                None => {
                    warn!(camera = %camera_id, "degenerate view projection, using identity frustum");
                    Frustum::from_matrix(&Mat4::IDENTITY)
                }
            };
            let layer_mask = camera.layer_mask;

            let selected = self
                .selection_octree
                .as_ref()
                .map(|o| o.select(&frustum, false));
            let mut list = Vec::new();
            for mesh in &mut self.meshes {
                if let Some(selected) = &selected {
                    if !mesh.always_select_as_active_mesh && !selected.contains(&mesh.unique_id) {
                        continue;
                    }
                }
                if !mesh.is_renderable()
                    || !mesh.is_world_matrix_usable()
                    || mesh.layer_mask & layer_mask == 0
                {
                    continue;
                }
                if !mesh.always_select_as_active_mesh && !mesh.bounding_info().is_in_frustum(&frustum) {
                    continue;
                }
                list.push(mesh.unique_id);
                if mesh.render_id != self.render_id {
                    mesh.render_id = self.render_id;
                    self.active_meshes.push(mesh.unique_id);
                    self.active_indices.add_count(f64::from(mesh.total_indices()), false);
                    if let Some(skeleton) = mesh.skeleton {
                        if !self.active_skeletons.contains(&skeleton) {
                            self.active_skeletons.push(skeleton);
                        }
                    }
                }
            }
            self.camera_active_meshes.push((camera_id, list));
        }
        self.active_indices.add_count(0.0, true);
        self.evaluate_active_meshes_duration
            .record_duration(started.elapsed(), true);
    }

    fn animate(&mut self) {
        let _span = info_span!("animate").entered();
        let delta_ms = self.delta_time_ms;
        self.animation_ratio = delta_ms * 60.0 / 1000.0;
        let mut info = self.frame_info();
        self.observables
            .on_before_animations
            .notify_observers(&mut info, MASK_ALL);

        if self.config.animations_enabled {
            let mut targets = SceneTargets::new(
                &mut self.meshes,
                &mut self.cameras,
                &mut self.lights,
                &mut self.materials,
            );
            self.scheduler.tick(delta_ms, &mut targets);
            let ended: Vec<AnimationGroupId> = self
                .animation_groups
                .iter_mut()
                .filter_map(|g| g.refresh(&self.scheduler).then(|| g.unique_id()))
                .collect();
            for mut id in ended {
                self.observables
                    .on_animation_group_end
                    .notify_observers(&mut id, MASK_ALL);
            }
        }

        self.step_physics(info);

        self.active_particle_systems.clear();
        if self.config.particles_enabled {
            self.particles_duration.begin_monitoring();
            let meshes = &self.meshes;
            let mut count = 0usize;
            for system in &mut self.particle_systems {
                let origin = match system.emitter {
                    Emitter::Point(p) => Some(p),
                    Emitter::Mesh(id) => meshes
                        .iter()
                        .find(|m| m.unique_id == id && m.is_enabled)
                        .map(|m| m.world_matrix().w_axis.truncate()),
                };
                let Some(origin) = origin else {
                    continue;
                };
                if !system.is_alive() {
                    continue;
                }
                system.animate(delta_ms, origin);
                count += system.active_count();
                self.active_particle_systems.push(system.unique_id);
            }
            self.active_particles.fetch_new_frame();
            self.active_particles.add_count(count as f64, true);
            self.particles_duration.end_monitoring(true);
        }

        if self.config.sprites_enabled {
            self.sprites_duration.begin_monitoring();
            for manager in &mut self.sprite_managers {
                manager.animate(delta_ms);
            }
            self.sprites_duration.end_monitoring(true);
        }

        if self.config.skeletons_enabled {
            let mut bones = 0usize;
            for skeleton in &mut self.skeletons {
                if self.active_skeletons.contains(&skeleton.unique_id) {
                    skeleton.prepare();
                    bones += skeleton.bones().len();
                }
            }
            self.active_bones.fetch_new_frame();
            self.active_bones.add_count(bones as f64, true);
        }
    }

    fn step_physics(&mut self, mut info: FrameInfo) {
        let Some(engine) = self.physics.as_mut() else {
            return;
        };
        self.observables
            .on_before_physics
            .notify_observers(&mut info, MASK_ALL);
        for impostor in engine.impostors_mut().iter_mut().filter(|i| i.is_static()) {
            if let Some(mesh) = self.meshes.iter().find(|m| m.unique_id == impostor.mesh) {
                impostor.position = mesh.position();
                impostor.rotation = mesh.rotation();
            }
        }
        engine.step((info.delta_ms / 1000.0) as f32);
        for impostor in engine.impostors().iter().filter(|i| !i.is_static()) {
            if let Some(mesh) = self.meshes.iter_mut().find(|m| m.unique_id == impostor.mesh) {
                mesh.transform.position = impostor.position;
                mesh.transform.rotation = impostor.rotation;
            }
        }
        self.observables
            .on_after_physics
            .notify_observers(&mut info, MASK_ALL);
    }

    fn render_cameras(&mut self) {
        let cameras = self.rendering_cameras();
        if cameras.is_empty() {
            return;
        }
        let started = Instant::now();
        self.backend.begin_frame();
        if self.config.auto_clear {
            self.backend
                .clear(Some(self.config.clear_color), true, true);
        }
        for camera in cameras {
            self.render_camera(camera);
        }
        self.backend.end_frame();
        self.render_duration.record_duration(started.elapsed(), true);
    }

    fn render_camera(&mut self, camera_id: CameraId) {
        let _span = info_span!("render_camera", camera = %camera_id).entered();
        let Some(camera) = self.cameras.iter().find(|c| c.unique_id == camera_id) else {
            return;
        };
        let viewport = camera.viewport;
        let eye = camera.position;

        let mut event = camera_id;
        self.observables
            .on_before_camera_render
            .notify_observers(&mut event, MASK_ALL);
        self.backend.set_viewport(&viewport);

        self.rendering_manager.reset();
        let active = self
            .camera_active_meshes
            .iter()
            .find(|(c, _)| *c == camera_id)
            .map(|(_, list)| list.as_slice())
            .unwrap_or(&[]);
        for mesh_id in active {
            let Some(mesh) = self.meshes.iter().find(|m| m.unique_id == *mesh_id) else {
                continue;
            };
            let geometry_ready = mesh.geometry.is_none_or(|g| {
                self.geometries
                    .iter()
                    .find(|x| x.unique_id == g)
                    .is_none_or(|x| x.ready)
            });
            let distance = eye.distance(mesh.bounding_info().bounding_box.center_world());
            for (index, sub) in mesh.sub_meshes.iter().enumerate() {
                let material_id = mesh.sub_mesh_material(index);
                let material = material_id.and_then(|id| self.materials.iter().find(|m| m.unique_id == id));
                let mut item = RenderItem::new(mesh.unique_id, index);
                item.material = material_id;
                item.rendering_group = mesh.rendering_group_id;
                item.pass = match material {
                    Some(m) => m.render_pass(mesh.visibility),
                    None if mesh.visibility < 1.0 => RenderPass::Transparent,
                    None => RenderPass::Opaque,
                };
                item.alpha_index = mesh.alpha_index;
                item.distance = distance;
                item.ready = geometry_ready && material.is_none_or(|m| m.is_ready(&self.textures));
                item.index_start = sub.index_start;
                item.index_count = sub.index_count;
                item.world = *mesh.world_matrix();
                self.rendering_manager.dispatch(item);
            }
        }
        self.rendering_manager
            .render(camera_id, self.backend.as_mut());

        let mut event = camera_id;
        self.observables
            .on_after_camera_render
            .notify_observers(&mut event, MASK_ALL);
    }

    /// Apply the commands queued so far. Commands queued while applying
    /// wait for the next call. Returns how many were applied.
    pub fn apply_deferred(&mut self) -> usize {
        let pending = self.deferred.len();
        for _ in 0..pending {
            let Some(command) = self.deferred.pop() else {
                break;
            };
            match command {
                SceneCommand::RemoveMesh(id) => {
                    self.remove_mesh(id);
                }
                SceneCommand::RemoveCamera(id) => {
                    self.remove_camera(id);
                }
                SceneCommand::RemoveLight(id) => {
                    self.remove_light(id);
                }
                SceneCommand::RemoveMaterial(id) => {
                    self.remove_material(id);
                }
                SceneCommand::RemoveTexture(id) => {
                    self.remove_texture(id);
                }
                SceneCommand::StopAnimation { target, name } => {
                    self.stop_animation(target, name.as_deref());
                }
                SceneCommand::SetActiveCamera(id) => {
                    self.switch_active_camera(id);
                }
                SceneCommand::Custom(f) => f(self),
            }
        }
        if pending > 0 {
            debug!(applied = pending, "deferred commands applied");
        }
        pending
    }

    /// Tear everything down in reverse dependency order. Calling it again
    /// does nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let _span = info_span!("scene_dispose").entered();
        self.observables.on_dispose.notify_observers(&mut (), MASK_ALL);
        self.disposed = true;

        for group in &mut self.animation_groups {
            group.stop(&mut self.scheduler);
        }
        self.scheduler.stop_all();
        self.rendering_manager.dispose();
        self.disable_physics_engine();
        while let Some(id) = self.particle_systems.last().map(|p| p.unique_id) {
            self.remove_particle_system(id);
        }
        while let Some(id) = self.sprite_managers.last().map(|s| s.unique_id) {
            self.remove_sprite_manager(id);
        }
        while let Some(id) = self.reflection_probes.last().map(|p| p.unique_id) {
            self.remove_reflection_probe(id);
        }
        while let Some(id) = self.meshes.last().map(|m| m.unique_id) {
            self.remove_mesh(id);
        }
        while let Some(id) = self.cameras.last().map(|c| c.unique_id) {
            self.remove_camera(id);
        }
        while let Some(id) = self.lights.last().map(|l| l.unique_id) {
            self.remove_light(id);
        }
        while let Some(id) = self.materials.last().map(|m| m.unique_id) {
            self.remove_material(id);
        }
        while let Some(id) = self.procedural_textures.last().map(|t| t.unique_id) {
            self.remove_procedural_texture(id);
        }
        while let Some(id) = self.textures.last().map(|t| t.unique_id) {
            self.remove_texture(id);
        }
        while let Some(id) = self.geometries.last().map(|g| g.unique_id) {
            self.remove_geometry(id);
        }
        while let Some(id) = self.skeletons.last().map(|s| s.unique_id) {
            self.remove_skeleton(id);
        }
        while let Some(id) = self.sound_tracks.last().map(|s| s.unique_id) {
            self.remove_sound_track(id);
        }
        self.main_sound_track.stop_all();
        while let Some(id) = self.animation_groups.last().map(|g| g.unique_id()) {
            self.remove_animation_group(id);
        }
        while let Some(id) = self.action_managers.last().map(|a| a.unique_id) {
            self.remove_action_manager(id);
        }

        self.selection_octree = None;
        self.active_meshes.clear();
        self.camera_active_meshes.clear();
        self.active_skeletons.clear();
        self.active_particle_systems.clear();
        self.pointer.reset();
        self.pending_data.clear();
        self.deferred.clear();
        self.observables.clear_all();
        debug!(uid = %self.uid, "scene disposed");
    }
}
