use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};
use vista_common::MeshId;

use crate::impostor::PhysicsImpostor;

#[derive(Debug, Error, PartialEq)]
pub enum PhysicsError {
    #[error("invalid physics time step: {0}")]
    InvalidTimeStep(f32),
    #[error("physics plugin {0} is not supported")]
    PluginRejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    /// Fixed step handed to the plugin, in seconds.
    pub time_step: f32,
    /// Longest frame delta a single step may consume, in seconds.
    pub max_step_delta: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.807, 0.0),
            time_step: 1.0 / 60.0,
            max_step_delta: 0.1,
        }
    }
}

/// Capability interface of a physics simulation.
pub trait PhysicsEnginePlugin {
    fn name(&self) -> &str;

    fn is_supported(&self) -> bool {
        true
    }

    fn set_gravity(&mut self, gravity: Vec3);

    fn set_time_step(&mut self, time_step: f32);

    fn register_impostor(&mut self, _impostor: &PhysicsImpostor) {}

    fn remove_impostor(&mut self, _mesh: MeshId) {}

    /// Advance the simulation by `delta` seconds, updating impostor poses.
    fn execute_step(&mut self, delta: f32, impostors: &mut [PhysicsImpostor]);

    fn dispose(&mut self) {}
}

/// The scene's physics world: impostors plus the plugin simulating them.
pub struct PhysicsEngine {
    plugin: Box<dyn PhysicsEnginePlugin>,
    config: PhysicsConfig,
    impostors: Vec<PhysicsImpostor>,
}

impl std::fmt::Debug for PhysicsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsEngine")
            .field("plugin", &self.plugin.name())
            .field("config", &self.config)
            .field("impostors", &self.impostors.len())
            .finish()
    }
}

impl PhysicsEngine {
    /// `None` gravity means standard earth gravity.
    pub fn new(
        gravity: Option<Vec3>,
        plugin: Box<dyn PhysicsEnginePlugin>,
    ) -> Result<Self, PhysicsError> {
        let mut config = PhysicsConfig::default();
        if let Some(g) = gravity {
            config.gravity = g;
        }
        Self::with_config(config, plugin)
    }

    pub fn with_config(
        config: PhysicsConfig,
        mut plugin: Box<dyn PhysicsEnginePlugin>,
    ) -> Result<Self, PhysicsError> {
        if !plugin.is_supported() {
            return Err(PhysicsError::PluginRejected(plugin.name().to_string()));
        }
        if !(config.time_step > 0.0 && config.time_step.is_finite()) {
            return Err(PhysicsError::InvalidTimeStep(config.time_step));
        }
        plugin.set_gravity(config.gravity);
        plugin.set_time_step(config.time_step);
        debug!(plugin = plugin.name(), gravity = ?config.gravity, "physics engine created");
        Ok(Self {
            plugin,
            config,
            impostors: Vec::new(),
        })
    }

    pub fn plugin_name(&self) -> &str {
        self.plugin.name()
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
        self.plugin.set_gravity(gravity);
    }

    pub fn time_step(&self) -> f32 {
        self.config.time_step
    }

    pub fn set_time_step(&mut self, time_step: f32) -> Result<(), PhysicsError> {
        if !(time_step > 0.0 && time_step.is_finite()) {
            return Err(PhysicsError::InvalidTimeStep(time_step));
        }
        self.config.time_step = time_step;
        self.plugin.set_time_step(time_step);
        Ok(())
    }

    /// Register an impostor, replacing any previous one of the same mesh.
    pub fn add_impostor(&mut self, impostor: PhysicsImpostor) {
        self.remove_impostor(impostor.mesh);
        self.plugin.register_impostor(&impostor);
        self.impostors.push(impostor);
    }

    pub fn remove_impostor(&mut self, mesh: MeshId) -> Option<PhysicsImpostor> {
        let index = self.impostors.iter().position(|i| i.mesh == mesh)?;
        self.plugin.remove_impostor(mesh);
        Some(self.impostors.remove(index))
    }

    pub fn impostor(&self, mesh: MeshId) -> Option<&PhysicsImpostor> {
        self.impostors.iter().find(|i| i.mesh == mesh)
    }

    pub fn impostor_mut(&mut self, mesh: MeshId) -> Option<&mut PhysicsImpostor> {
        self.impostors.iter_mut().find(|i| i.mesh == mesh)
    }

    pub fn impostors(&self) -> &[PhysicsImpostor] {
        &self.impostors
    }

    pub fn impostors_mut(&mut self) -> &mut [PhysicsImpostor] {
        &mut self.impostors
    }

    /// Advance by `delta` seconds. Deltas above the max are clamped and
    /// non-positive ones fall back to one fixed time step.
    pub fn step(&mut self, delta: f32) {
        let delta = if delta > self.config.max_step_delta {
            self.config.max_step_delta
        } else if delta <= 0.0 || !delta.is_finite() {
            self.config.time_step
        } else {
            delta
        };
        trace!(delta, impostors = self.impostors.len(), "physics step");
        self.plugin.execute_step(delta, &mut self.impostors);
    }

    pub fn dispose(&mut self) {
        for impostor in self.impostors.drain(..) {
            self.plugin.remove_impostor(impostor.mesh);
        }
        self.plugin.dispose();
        debug!(plugin = self.plugin.name(), "physics engine disposed");
    }
}
