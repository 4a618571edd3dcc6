use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use vista_common::MeshId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpostorShape {
    Box,
    Sphere,
    Plane,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsImpostorParameters {
    /// Zero makes the body static.
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for PhysicsImpostorParameters {
    fn default() -> Self {
        Self {
            mass: 0.0,
            friction: 0.2,
            restitution: 0.2,
        }
    }
}

/// Physics body proxy of a mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsImpostor {
    pub mesh: MeshId,
    pub shape: ImpostorShape,
    pub params: PhysicsImpostorParameters,
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Half size of the body along each axis; x holds the radius for spheres.
    pub half_extents: Vec3,
}

impl PhysicsImpostor {
    pub fn new(mesh: MeshId, shape: ImpostorShape, params: PhysicsImpostorParameters) -> Self {
        Self {
            mesh,
            shape,
            params,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            half_extents: Vec3::splat(0.5),
        }
    }

    pub fn with_half_extents(mut self, half_extents: Vec3) -> Self {
        self.half_extents = half_extents;
        self
    }

    pub fn is_static(&self) -> bool {
        self.params.mass <= 0.0
    }

    /// Distance from the center to the lowest point along -Y.
    pub fn bottom_offset(&self) -> f32 {
        match self.shape {
            ImpostorShape::Sphere => self.half_extents.x,
            ImpostorShape::Box => self.half_extents.y,
            ImpostorShape::Plane => 0.0,
        }
    }

    pub fn apply_impulse(&mut self, impulse: Vec3) {
        if !self.is_static() {
            self.linear_velocity += impulse / self.params.mass;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mass_zero_is_static_and_ignores_impulse() {
        let mut imp = PhysicsImpostor::new(
            MeshId(1),
            ImpostorShape::Box,
            PhysicsImpostorParameters::default(),
        );
        assert!(imp.is_static());
        imp.apply_impulse(Vec3::X);
        assert_eq!(imp.linear_velocity, Vec3::ZERO);
    }

    #[test]
    fn impulse_scales_by_mass() {
        let mut imp = PhysicsImpostor::new(
            MeshId(1),
            ImpostorShape::Sphere,
            PhysicsImpostorParameters {
                mass: 2.0,
                ..Default::default()
            },
        )
        .with_half_extents(Vec3::splat(1.5));
        imp.apply_impulse(Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(imp.linear_velocity, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(imp.bottom_offset(), 1.5);
    }
}
