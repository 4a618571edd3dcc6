//! Scene-side animation API: starting and stopping animatables, driving
//! animation groups, and the property bindings that let meshes, cameras,
//! lights and materials be animated by name.

use glam::Vec3;
use tracing::{debug, warn};
use vista_animation::{
    Animatable, Animation, AnimationGroup, AnimationTarget, AnimationValue, TargetResolver,
};
use vista_common::{AnimatableId, AnimationGroupId, Color3, TargetId};

use crate::camera::{Camera, CameraMode};
use crate::light::Light;
use crate::material::Material;
use crate::mesh::Mesh;
use crate::scene::Scene;

fn set_vec3(slot: &mut Vec3, property: &str, value: &AnimationValue) -> bool {
    match (property, value) {
        ("", AnimationValue::Vector3(v)) => *slot = *v,
        ("x", AnimationValue::Float(v)) => slot.x = *v,
        ("y", AnimationValue::Float(v)) => slot.y = *v,
        ("z", AnimationValue::Float(v)) => slot.z = *v,
        _ => return false,
    }
    true
}

fn get_vec3(v: Vec3, component: &str) -> Option<AnimationValue> {
    match component {
        "" => Some(AnimationValue::Vector3(v)),
        "x" => Some(AnimationValue::Float(v.x)),
        "y" => Some(AnimationValue::Float(v.y)),
        "z" => Some(AnimationValue::Float(v.z)),
        _ => None,
    }
}

/// `"position.x"` -> `("position", "x")`, `"position"` -> `("position", "")`.
fn split_property(property: &str) -> (&str, &str) {
    property.split_once('.').unwrap_or((property, ""))
}

fn set_color(slot: &mut Color3, value: &AnimationValue) -> bool {
    match value {
        AnimationValue::Color3(c) => {
            *slot = *c;
            true
        }
        _ => false,
    }
}

fn set_float(slot: &mut f32, value: &AnimationValue) -> bool {
    match value {
        AnimationValue::Float(v) => {
            *slot = *v;
            true
        }
        _ => false,
    }
}

impl AnimationTarget for Mesh {
    fn set_animated_value(&mut self, property: &str, value: &AnimationValue) -> bool {
        match (split_property(property), value) {
            (("position", c), _) => set_vec3(&mut self.transform.position, c, value),
            (("scaling", c), _) => set_vec3(&mut self.transform.scale, c, value),
            (("rotation", ""), AnimationValue::Quaternion(q)) => {
                self.transform.rotation = *q;
                true
            }
            (("visibility", ""), _) => set_float(&mut self.visibility, value),
            _ => false,
        }
    }

    fn animated_value(&self, property: &str) -> Option<AnimationValue> {
        match split_property(property) {
            ("position", c) => get_vec3(self.transform.position, c),
            ("scaling", c) => get_vec3(self.transform.scale, c),
            ("rotation", "") => Some(AnimationValue::Quaternion(self.transform.rotation)),
            ("visibility", "") => Some(AnimationValue::Float(self.visibility)),
            _ => None,
        }
    }
}

impl AnimationTarget for Camera {
    fn set_animated_value(&mut self, property: &str, value: &AnimationValue) -> bool {
        match split_property(property) {
            ("position", c) => set_vec3(&mut self.position, c, value),
            ("target", c) => set_vec3(&mut self.target, c, value),
            ("fov", "") => match &mut self.mode {
                CameraMode::Perspective { fov } => set_float(fov, value),
                CameraMode::Orthographic { .. } => false,
            },
            _ => false,
        }
    }

    fn animated_value(&self, property: &str) -> Option<AnimationValue> {
        match split_property(property) {
            ("position", c) => get_vec3(self.position, c),
            ("target", c) => get_vec3(self.target, c),
            ("fov", "") => self.fov().map(AnimationValue::Float),
            _ => None,
        }
    }
}

impl AnimationTarget for Light {
    fn set_animated_value(&mut self, property: &str, value: &AnimationValue) -> bool {
        match split_property(property) {
            ("position", c) => set_vec3(&mut self.position, c, value),
            ("intensity", "") => set_float(&mut self.intensity, value),
            ("diffuse", "") => set_color(&mut self.diffuse, value),
            ("specular", "") => set_color(&mut self.specular, value),
            _ => false,
        }
    }

    fn animated_value(&self, property: &str) -> Option<AnimationValue> {
        match split_property(property) {
            ("position", c) => get_vec3(self.position, c),
            ("intensity", "") => Some(AnimationValue::Float(self.intensity)),
            ("diffuse", "") => Some(AnimationValue::Color3(self.diffuse)),
            ("specular", "") => Some(AnimationValue::Color3(self.specular)),
            _ => None,
        }
    }
}

impl AnimationTarget for Material {
    fn set_animated_value(&mut self, property: &str, value: &AnimationValue) -> bool {
        match property {
            "alpha" => set_float(&mut self.alpha, value),
            "diffuse_color" => set_color(&mut self.diffuse_color, value),
            _ => false,
        }
    }

    fn animated_value(&self, property: &str) -> Option<AnimationValue> {
        match property {
            "alpha" => Some(AnimationValue::Float(self.alpha)),
            "diffuse_color" => Some(AnimationValue::Color3(self.diffuse_color)),
            _ => None,
        }
    }
}

/// Resolves animation targets against the scene collections for one tick.
pub(crate) struct SceneTargets<'a> {
    meshes: &'a mut [Mesh],
    cameras: &'a mut [Camera],
    lights: &'a mut [Light],
    materials: &'a mut [Material],
}

impl<'a> SceneTargets<'a> {
    pub(crate) fn new(
        meshes: &'a mut [Mesh],
        cameras: &'a mut [Camera],
        lights: &'a mut [Light],
        materials: &'a mut [Material],
    ) -> Self {
        Self {
            meshes,
            cameras,
            lights,
            materials,
        }
    }
}

impl TargetResolver for SceneTargets<'_> {
    fn resolve(&mut self, target: TargetId) -> Option<&mut dyn AnimationTarget> {
        match target {
            TargetId::Mesh(id) => self
                .meshes
                .iter_mut()
                .find(|m| m.unique_id == id)
                .map(|m| m as &mut dyn AnimationTarget),
            TargetId::Camera(id) => self
                .cameras
                .iter_mut()
                .find(|c| c.unique_id == id)
                .map(|c| c as &mut dyn AnimationTarget),
            TargetId::Light(id) => self
                .lights
                .iter_mut()
                .find(|l| l.unique_id == id)
                .map(|l| l as &mut dyn AnimationTarget),
            TargetId::Material(id) => self
                .materials
                .iter_mut()
                .find(|m| m.unique_id == id)
                .map(|m| m as &mut dyn AnimationTarget),
        }
    }
}

impl Scene {
    fn target_animations(&self, target: TargetId) -> Option<Vec<Animation>> {
        match target {
            TargetId::Mesh(id) => self.get_mesh_by_unique_id(id).map(|m| m.animations.clone()),
            TargetId::Camera(id) => self.get_camera_by_unique_id(id).map(|c| c.animations.clone()),
            TargetId::Light(id) => self.get_light_by_unique_id(id).map(|l| l.animations.clone()),
            TargetId::Material(id) => self
                .materials
                .iter()
                .find(|m| m.unique_id == id)
                .map(|m| m.animations.clone()),
        }
    }

    /// Run the animations attached to `target` between `from` and `to`.
    /// Animations already running on the target are stopped first. `None`
    /// when the target is unknown or carries no animation.
    pub fn begin_animation(
        &mut self,
        target: impl Into<TargetId>,
        from: f32,
        to: f32,
        loop_animation: bool,
        speed_ratio: f32,
        on_end: Option<Box<dyn FnOnce()>>,
    ) -> Option<AnimatableId> {
        let target = target.into();
        let Some(animations) = self.target_animations(target) else {
            warn!(?target, "begin_animation: unknown target");
            return None;
        };
        if animations.is_empty() {
            return None;
        }
        self.scheduler.stop(target, None);
        Some(
            self.scheduler
                .begin(target, animations, from, to, loop_animation, speed_ratio, on_end),
        )
    }

    /// Run `animations` on `target` without attaching them to it.
    #[allow(clippy::too_many_arguments)]
    pub fn begin_direct_animation(
        &mut self,
        target: impl Into<TargetId>,
        animations: Vec<Animation>,
        from: f32,
        to: f32,
        loop_animation: bool,
        speed_ratio: f32,
        on_end: Option<Box<dyn FnOnce()>>,
    ) -> AnimatableId {
        self.scheduler.begin(
            target.into(),
            animations,
            from,
            to,
            loop_animation,
            speed_ratio,
            on_end,
        )
    }

    /// Stop every animation on `target`, or only the one called `name`.
    /// Returns how many animatables ended.
    pub fn stop_animation(&mut self, target: impl Into<TargetId>, name: Option<&str>) -> usize {
        self.scheduler.stop(target.into(), name)
    }

    pub fn stop_all_animations(&mut self) {
        for group in &mut self.animation_groups {
            group.stop(&mut self.scheduler);
        }
        self.scheduler.stop_all();
        debug!("all animations stopped");
    }

    pub fn get_animatable_by_target(&self, target: impl Into<TargetId>) -> Option<&Animatable> {
        self.scheduler.by_target(target.into())
    }

    pub fn get_all_animatables_by_target(&self, target: impl Into<TargetId>) -> Vec<&Animatable> {
        self.scheduler.all_by_target(target.into())
    }

    /// Pause, restart, reset or seek a running animatable.
    pub fn animatable_mut(&mut self, id: AnimatableId) -> Option<&mut Animatable> {
        self.scheduler.get_mut(id)
    }

    pub fn active_animatable_count(&self) -> usize {
        self.scheduler.len()
    }

    /// Scene animation clock in milliseconds.
    pub fn animation_time(&self) -> f64 {
        self.scheduler.animation_time()
    }

    /// Multiplier applied to the frame delta before animations see it.
    pub fn set_animation_time_scale(&mut self, scale: f64) {
        self.scheduler.time_scale = scale;
    }

    pub fn animation_group_mut(&mut self, id: AnimationGroupId) -> Option<&mut AnimationGroup> {
        self.animation_groups.iter_mut().find(|g| g.unique_id() == id)
    }

    pub fn start_animation_group(
        &mut self,
        id: AnimationGroupId,
        loop_animation: bool,
        speed_ratio: f32,
    ) -> bool {
        let Some(group) = self.animation_groups.iter_mut().find(|g| g.unique_id() == id) else {
            return false;
        };
        group.start(&mut self.scheduler, loop_animation, speed_ratio)
    }

    pub fn stop_animation_group(&mut self, id: AnimationGroupId) -> bool {
        let Some(group) = self.animation_groups.iter_mut().find(|g| g.unique_id() == id) else {
            return false;
        };
        group.stop(&mut self.scheduler);
        true
    }

    pub fn pause_animation_group(&mut self, id: AnimationGroupId) -> bool {
        let Some(group) = self.animation_groups.iter().find(|g| g.unique_id() == id) else {
            return false;
        };
        group.pause(&mut self.scheduler);
        true
    }

    /// Resume a paused group or start an idle one.
    pub fn play_animation_group(&mut self, id: AnimationGroupId, loop_animation: Option<bool>) -> bool {
        let Some(group) = self.animation_groups.iter_mut().find(|g| g.unique_id() == id) else {
            return false;
        };
        group.play(&mut self.scheduler, loop_animation);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;
    use vista_animation::{AnimationKey, AnimationLoopMode};
    use vista_common::{MASK_ALL, MeshId};
    use vista_render::RecordingBackend;

    const STEP: Duration = Duration::from_millis(100);

    fn scene() -> Scene {
        Scene::new(Box::new(RecordingBackend::new(320, 240)))
    }

    fn slide_x(name: &str) -> Animation {
        Animation::new(name, "position.x", 60.0, AnimationLoopMode::Cycle).with_keys(vec![
            AnimationKey::new(0.0, AnimationValue::Float(0.0)),
            AnimationKey::new(60.0, AnimationValue::Float(6.0)),
        ])
    }

    fn counter() -> (Rc<Cell<u32>>, Option<Box<dyn FnOnce()>>) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, Some(Box::new(move || c.set(c.get() + 1))))
    }

    fn mesh_with_slide(scene: &mut Scene) -> MeshId {
        let mut mesh = Mesh::new("mover");
        mesh.animations.push(slide_x("slide"));
        scene.add_mesh(mesh)
    }

    #[test]
    fn property_paths_resolve() {
        let mut mesh = Mesh::new("m");
        assert!(mesh.set_animated_value("position.y", &AnimationValue::Float(2.0)));
        assert!(mesh.set_animated_value("scaling", &AnimationValue::Vector3(Vec3::splat(3.0))));
        assert!(!mesh.set_animated_value("position.w", &AnimationValue::Float(1.0)));
        assert!(!mesh.set_animated_value("visibility", &AnimationValue::Vector3(Vec3::ONE)));
        assert_eq!(mesh.position().y, 2.0);
        assert_eq!(mesh.animated_value("scaling.z"), Some(AnimationValue::Float(3.0)));

        let mut camera = Camera::new("c", Vec3::Z, Vec3::ZERO);
        assert!(camera.set_animated_value("fov", &AnimationValue::Float(1.2)));
        assert_eq!(camera.fov(), Some(1.2));

        let mut material = Material::new("mat");
        assert!(material.set_animated_value("diffuse_color", &AnimationValue::Color3(Color3::WHITE)));
        assert_eq!(material.animated_value("alpha"), Some(AnimationValue::Float(1.0)));
    }

    #[test]
    fn non_looping_animation_ends_once() {
        let mut scene = scene();
        let mesh = mesh_with_slide(&mut scene);
        let (ended, on_end) = counter();
        scene.begin_animation(mesh, 0.0, 60.0, false, 1.0, on_end).unwrap();
        for _ in 0..15 {
            scene.render_with_delta(STEP);
        }
        assert_eq!(ended.get(), 1);
        assert!(scene.get_animatable_by_target(mesh).is_none());
        let x = scene.get_mesh_by_unique_id(mesh).unwrap().position().x;
        assert!((x - 6.0).abs() < 1e-4, "{x}");
    }

    #[test]
    fn looping_animation_keeps_running() {
        let mut scene = scene();
        let mesh = mesh_with_slide(&mut scene);
        let (ended, on_end) = counter();
        scene.begin_animation(mesh, 0.0, 60.0, true, 1.0, on_end).unwrap();
        for _ in 0..40 {
            scene.render_with_delta(STEP);
        }
        assert_eq!(ended.get(), 0);
        assert_eq!(scene.get_all_animatables_by_target(mesh).len(), 1);
        scene.stop_animation(mesh, None);
        assert_eq!(ended.get(), 1);
        assert_eq!(scene.active_animatable_count(), 0);
    }

    #[test]
    fn begin_animation_replaces_running_ones() {
        let mut scene = scene();
        let mesh = mesh_with_slide(&mut scene);
        let first = scene.begin_animation(mesh, 0.0, 60.0, true, 1.0, None).unwrap();
        let second = scene.begin_animation(mesh, 0.0, 60.0, true, 1.0, None).unwrap();
        assert_ne!(first, second);
        assert_eq!(scene.get_animatable_by_target(mesh).map(|a| a.id()), Some(second));
        let bare = scene.add_mesh(Mesh::new("bare"));
        assert!(scene.begin_animation(bare, 0.0, 1.0, false, 1.0, None).is_none());
    }

    #[test]
    fn named_stop_keeps_other_animations() {
        let mut scene = scene();
        let mesh = scene.add_mesh(Mesh::new("m"));
        let fade = Animation::new("fade", "visibility", 60.0, AnimationLoopMode::Cycle).with_keys(vec![
            AnimationKey::new(0.0, AnimationValue::Float(1.0)),
            AnimationKey::new(60.0, AnimationValue::Float(0.0)),
        ]);
        scene.begin_direct_animation(mesh, vec![slide_x("slide"), fade], 0.0, 60.0, true, 1.0, None);
        assert_eq!(scene.stop_animation(mesh, Some("slide")), 0);
        assert_eq!(scene.active_animatable_count(), 1);
        assert_eq!(scene.stop_animation(mesh, Some("fade")), 1);
        assert_eq!(scene.active_animatable_count(), 0);
    }

    #[test]
    fn removing_the_target_stops_its_animations() {
        let mut scene = scene();
        let mesh = mesh_with_slide(&mut scene);
        let (ended, on_end) = counter();
        scene.begin_animation(mesh, 0.0, 60.0, true, 1.0, on_end);
        scene.remove_mesh(mesh);
        assert_eq!(ended.get(), 1);
        assert_eq!(scene.active_animatable_count(), 0);
    }

    #[test]
    fn paused_animation_holds_its_frame() {
        let mut scene = scene();
        let mesh = mesh_with_slide(&mut scene);
        let id = scene.begin_animation(mesh, 0.0, 60.0, false, 1.0, None).unwrap();
        for _ in 0..4 {
            scene.render_with_delta(STEP);
        }
        scene.animatable_mut(id).unwrap().pause();
        let held = scene.get_mesh_by_unique_id(mesh).unwrap().position().x;
        for _ in 0..20 {
            scene.render_with_delta(STEP);
        }
        assert_eq!(scene.get_mesh_by_unique_id(mesh).unwrap().position().x, held);
        scene.animatable_mut(id).unwrap().restart();
        scene.render_with_delta(STEP);
        assert!(scene.get_mesh_by_unique_id(mesh).unwrap().position().x > held);
    }

    #[test]
    fn group_end_is_observable() {
        let mut scene = scene();
        let mesh = scene.add_mesh(Mesh::new("m"));
        let light = scene.add_light(Light::point("l", Vec3::ZERO));
        let mut group = AnimationGroup::new("intro");
        group.add_targeted_animation(slide_x("slide"), mesh);
        group.add_targeted_animation(
            Animation::new("dim", "intensity", 60.0, AnimationLoopMode::Cycle).with_keys(vec![
                AnimationKey::new(0.0, AnimationValue::Float(1.0)),
                AnimationKey::new(30.0, AnimationValue::Float(0.0)),
            ]),
            light,
        );
        let id = scene.add_animation_group(group);
        let ended = Rc::new(Cell::new(0));
        let e = ended.clone();
        scene
            .observables
            .on_animation_group_end
            .add_with_mask(MASK_ALL, move |_, _| e.set(e.get() + 1));
        assert!(scene.start_animation_group(id, false, 1.0));
        assert!(!scene.start_animation_group(id, false, 1.0));
        for _ in 0..15 {
            scene.render_with_delta(STEP);
        }
        assert_eq!(ended.get(), 1);
        assert_eq!(scene.get_light_by_unique_id(light).unwrap().intensity, 0.0);
        assert!(!scene.animation_groups()[0].is_started());
    }
}
