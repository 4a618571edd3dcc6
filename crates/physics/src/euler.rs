use glam::{Quat, Vec3};

use crate::engine::PhysicsEnginePlugin;
use crate::impostor::{ImpostorShape, PhysicsImpostor};

/// Semi-implicit Euler integrator with an optional infinite ground plane.
///
/// Static plane impostors also act as ground; the highest one wins.
#[derive(Debug, Clone)]
pub struct EulerPlugin {
    gravity: Vec3,
    time_step: f32,
    ground_height: Option<f32>,
}

impl Default for EulerPlugin {
    fn default() -> Self {
        Self {
            gravity: Vec3::ZERO,
            time_step: 1.0 / 60.0,
            ground_height: None,
        }
    }
}

impl EulerPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ground(mut self, height: f32) -> Self {
        self.ground_height = Some(height);
        self
    }

    pub fn time_step(&self) -> f32 {
        self.time_step
    }

    fn ground(&self, impostors: &[PhysicsImpostor]) -> Option<f32> {
        impostors
            .iter()
            .filter(|i| i.shape == ImpostorShape::Plane && i.is_static())
            .map(|i| i.position.y)
            .chain(self.ground_height)
            .reduce(f32::max)
    }
}

impl PhysicsEnginePlugin for EulerPlugin {
    fn name(&self) -> &str {
        "euler"
    }

    fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    fn set_time_step(&mut self, time_step: f32) {
        self.time_step = time_step;
    }

    fn execute_step(&mut self, delta: f32, impostors: &mut [PhysicsImpostor]) {
        let ground = self.ground(impostors);
        for body in impostors.iter_mut().filter(|i| !i.is_static()) {
            body.linear_velocity += self.gravity * delta;
            body.position += body.linear_velocity * delta;
            let spin = body.angular_velocity * delta;
            if spin.length_squared() > 0.0 {
                body.rotation = (Quat::from_scaled_axis(spin) * body.rotation).normalize();
            }

            if let Some(ground) = ground {
                let bottom = body.position.y - body.bottom_offset();
                if bottom < ground {
                    body.position.y = ground + body.bottom_offset();
                    if body.linear_velocity.y < 0.0 {
                        body.linear_velocity.y = -body.linear_velocity.y * body.params.restitution;
                    }
                    let keep = (1.0 - body.params.friction).clamp(0.0, 1.0);
                    body.linear_velocity.x *= keep;
                    body.linear_velocity.z *= keep;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impostor::PhysicsImpostorParameters;
    use vista_common::MeshId;

    fn ball(y: f32) -> PhysicsImpostor {
        let mut b = PhysicsImpostor::new(
            MeshId(1),
            ImpostorShape::Sphere,
            PhysicsImpostorParameters {
                mass: 1.0,
                friction: 0.0,
                restitution: 0.5,
            },
        );
        b.position.y = y;
        b
    }

    #[test]
    fn free_fall_accelerates() {
        let mut plugin = EulerPlugin::new();
        plugin.set_gravity(Vec3::new(0.0, -10.0, 0.0));
        let mut bodies = [ball(100.0)];
        plugin.execute_step(0.1, &mut bodies);
        assert!((bodies[0].linear_velocity.y + 1.0).abs() < 1e-5);
        assert!((bodies[0].position.y - 99.9).abs() < 1e-4);
    }

    #[test]
    fn ground_stops_and_bounces() {
        let mut plugin = EulerPlugin::new().with_ground(0.0);
        plugin.set_gravity(Vec3::new(0.0, -10.0, 0.0));
        let mut bodies = [ball(0.55)];
        bodies[0].linear_velocity.y = -2.0;
        plugin.execute_step(0.1, &mut bodies);
        assert_eq!(bodies[0].position.y, 0.5);
        assert!((bodies[0].linear_velocity.y - 1.5).abs() < 1e-5);
    }

    #[test]
    fn static_plane_acts_as_ground() {
        let mut plugin = EulerPlugin::new();
        plugin.set_gravity(Vec3::new(0.0, -10.0, 0.0));
        let mut floor = PhysicsImpostor::new(
            MeshId(2),
            ImpostorShape::Plane,
            PhysicsImpostorParameters::default(),
        );
        floor.position.y = 2.0;
        let mut bodies = [floor, ball(2.4)];
        plugin.execute_step(0.1, &mut bodies);
        assert_eq!(bodies[1].position.y, 2.5);
        assert_eq!(bodies[0].position.y, 2.0);
    }
}
