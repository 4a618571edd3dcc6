//! Physics for the vista scene core.
//!
//! The scene drives at most one [`PhysicsEngine`]; the simulation itself
//! lives behind [`PhysicsEnginePlugin`]. [`EulerPlugin`] is a small built-in
//! integrator for headless runs and tests.
//!
//! # Invariants
//! - Impostors refer to meshes by handle; the scene copies poses both ways.
//! - A step never exceeds the configured max delta.

mod engine;
mod euler;
mod impostor;

pub use engine::{PhysicsConfig, PhysicsEngine, PhysicsEnginePlugin, PhysicsError};
pub use euler::EulerPlugin;
pub use impostor::{ImpostorShape, PhysicsImpostor, PhysicsImpostorParameters};

pub fn crate_info() -> &'static str {
    "vista-physics v0.1.0"
}
