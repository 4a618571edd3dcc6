//! Scene kernel: owns every entity of a scene and runs the per-frame pipeline
//! (active-mesh evaluation, animation, physics, rendering) plus picking and
//! pointer dispatch.
//!
//! # Invariants
//! - Entities live in the scene collections and are addressed by unique id.
//! - Removing an entity clears every reference the scene holds to it.
//! - Work queued from inside callbacks runs after the current frame phase.
//! - A disposed scene ignores further renders and input.

mod actions;
mod animation;
mod camera;
mod config;
mod deferred;
mod light;
mod lookup;
mod material;
mod mesh;
mod observables;
mod particles;
mod picking;
mod pointer;
mod probe;
mod scene;
mod skeleton;
mod sound;
mod sprites;

pub use actions::{Action, ActionCallback, ActionEvent, ActionManager, ActionSource, ActionTrigger};
pub use camera::{Camera, CameraMode};
pub use config::{ConfigError, SceneConfig};
pub use deferred::{DeferredQueue, SceneCommand};
pub use light::{Light, LightKind};
pub use lookup::NodeRef;
pub use material::{Material, ProceduralTexture, Texture};
pub use mesh::{Geometry, Mesh, SubMesh, VertexData};
pub use observables::{
    FrameInfo, KeyboardInfo, KeyboardInfoPre, PointerInfo, PointerInfoPre, SceneObservables,
};
pub use particles::{Emitter, Particle, ParticleSystem};
pub use picking::{PickPredicate, PickingInfo, SpriteRef, default_pick_predicate};
pub use pointer::MeshPredicate;
pub use probe::ReflectionProbe;
pub use scene::Scene;
pub use skeleton::{Bone, Skeleton};
pub use sound::{Sound, SoundTrack};
pub use sprites::{Sprite, SpriteManager};

pub fn crate_info() -> &'static str {
    "vista-kernel v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("kernel"));
    }
}
