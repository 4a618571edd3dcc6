use glam::Vec3;
use vista_common::{Color4, MeshId, ParticleSystemId, SceneUid};

/// Where new particles spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Emitter {
    Mesh(MeshId),
    Point(Vec3),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub color: Color4,
    pub size: f32,
    /// Seconds since birth.
    pub age: f32,
    pub lifetime: f32,
}

/// CPU particle system. Emission and integration run in the scene's
/// animate phase while the system is active.
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    pub(crate) unique_id: ParticleSystemId,
    pub id: String,
    pub name: String,
    pub emitter: Emitter,
    pub capacity: usize,
    /// Particles per second.
    pub emit_rate: f32,
    pub min_life_time: f32,
    pub max_life_time: f32,
    pub min_size: f32,
    pub max_size: f32,
    pub min_emit_power: f32,
    pub max_emit_power: f32,
    /// Emission directions are drawn between these two vectors.
    pub direction1: Vec3,
    pub direction2: Vec3,
    pub gravity: Vec3,
    pub color1: Color4,
    pub color2: Color4,
    pub rendering_group_id: u8,
    pub layer_mask: u32,
    particles: Vec<Particle>,
    started: bool,
    emit_carry: f32,
    rng: u64,
    pub(crate) scene_uid: Option<SceneUid>,
}

impl ParticleSystem {
    pub fn new(name: impl Into<String>, capacity: usize, emitter: Emitter) -> Self {
        let name = name.into();
        Self {
            unique_id: ParticleSystemId(0),
            id: name.clone(),
            name,
            emitter,
            capacity,
            emit_rate: 10.0,
            min_life_time: 1.0,
            max_life_time: 1.0,
            min_size: 1.0,
            max_size: 1.0,
            min_emit_power: 1.0,
            max_emit_power: 1.0,
            direction1: Vec3::Y,
            direction2: Vec3::Y,
            gravity: Vec3::ZERO,
            color1: Color4::new(1.0, 1.0, 1.0, 1.0),
            color2: Color4::new(1.0, 1.0, 1.0, 1.0),
            rendering_group_id: 0,
            layer_mask: 0x0FFF_FFFF,
            particles: Vec::with_capacity(capacity),
            started: false,
            emit_carry: 0.0,
            rng: 0x5eed,
            scene_uid: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Reseed the emission jitter for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = seed;
        self
    }

    pub fn unique_id(&self) -> ParticleSystemId {
        self.unique_id
    }

    pub fn scene_uid(&self) -> Option<SceneUid> {
        self.scene_uid
    }

    pub fn start(&mut self) {
        self.started = true;
    }

    /// Stop emitting; live particles finish their lifetime.
    pub fn stop(&mut self) {
        self.started = false;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Kill every particle.
    pub fn reset(&mut self) {
        self.particles.clear();
        self.emit_carry = 0.0;
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn active_count(&self) -> usize {
        self.particles.len()
    }

    /// True while emitting or while particles are still alive.
    pub fn is_alive(&self) -> bool {
        self.started || !self.particles.is_empty()
    }

    pub(crate) fn emitter_mesh(&self) -> Option<MeshId> {
        match self.emitter {
            Emitter::Mesh(id) => Some(id),
            Emitter::Point(_) => None,
        }
    }

    /// Age, integrate and emit over `delta_ms`. `origin` is the emitter's
    /// world position this frame.
    pub fn animate(&mut self, delta_ms: f64, origin: Vec3) {
        let dt = (delta_ms / 1000.0) as f32;
        let gravity = self.gravity;
        self.particles.retain_mut(|p| {
            p.age += dt;
            if p.age >= p.lifetime {
                return false;
            }
            p.velocity += gravity * dt;
            p.position += p.velocity * dt;
            true
        });

        if !self.started {
            return;
        }
        self.emit_carry += self.emit_rate * dt;
        let wanted = self.emit_carry.floor();
        self.emit_carry -= wanted;
        let room = self.capacity.saturating_sub(self.particles.len());
        for _ in 0..(wanted as usize).min(room) {
            let particle = self.spawn(origin);
            self.particles.push(particle);
        }
    }

    fn spawn(&mut self, origin: Vec3) -> Particle {
        let direction = self.direction1.lerp(self.direction2, self.next_unit());
        let power = lerp(self.min_emit_power, self.max_emit_power, self.next_unit());
        let t = self.next_unit();
        let c1 = self.color1;
        let c2 = self.color2;
        Particle {
            position: origin,
            velocity: direction * power,
            color: Color4::new(
                lerp(c1.r, c2.r, t),
                lerp(c1.g, c2.g, t),
                lerp(c1.b, c2.b, t),
                lerp(c1.a, c2.a, t),
            ),
            size: lerp(self.min_size, self.max_size, self.next_unit()),
            age: 0.0,
            lifetime: lerp(self.min_life_time, self.max_life_time, self.next_unit()),
        }
    }

    fn next_unit(&mut self) -> f32 {
        self.rng = splitmix64(self.rng);
        (self.rng >> 40) as f32 / (1u64 << 24) as f32
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// SplitMix64 step; deterministic across platforms.
pub(crate) fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_at_rate_up_to_capacity() {
        let mut ps = ParticleSystem::new("p", 5, Emitter::Point(Vec3::ZERO));
        ps.emit_rate = 12.0;
        ps.max_life_time = 10.0;
        ps.min_life_time = 10.0;
        ps.animate(16.0, Vec3::ZERO);
        assert_eq!(ps.active_count(), 0);
        ps.start();
        ps.animate(250.0, Vec3::ZERO);
        assert_eq!(ps.active_count(), 3);
        ps.animate(1000.0, Vec3::ZERO);
        assert_eq!(ps.active_count(), 5);
    }

    #[test]
    fn particles_die_after_lifetime() {
        let mut ps = ParticleSystem::new("p", 10, Emitter::Point(Vec3::ZERO));
        ps.emit_rate = 4.0;
        ps.start();
        ps.animate(250.0, Vec3::ZERO);
        assert_eq!(ps.active_count(), 1);
        ps.stop();
        assert!(ps.is_alive());
        ps.animate(1500.0, Vec3::ZERO);
        assert_eq!(ps.active_count(), 0);
        assert!(!ps.is_alive());
    }

    #[test]
    fn gravity_bends_velocity() {
        let mut ps = ParticleSystem::new("p", 1, Emitter::Point(Vec3::ZERO));
        ps.emit_rate = 4.0;
        ps.gravity = Vec3::new(0.0, -10.0, 0.0);
        ps.direction1 = Vec3::X;
        ps.direction2 = Vec3::X;
        ps.start();
        ps.animate(250.0, Vec3::new(0.0, 5.0, 0.0));
        ps.stop();
        ps.animate(100.0, Vec3::ZERO);
        let p = ps.particles()[0];
        assert!(p.velocity.y < 0.0);
        assert!(p.position.x > 0.0);
    }

    #[test]
    fn same_seed_same_particles() {
        let run = || {
            let mut ps = ParticleSystem::new("p", 4, Emitter::Point(Vec3::ZERO)).with_seed(9);
            ps.emit_rate = 1000.0;
            ps.min_size = 0.5;
            ps.max_size = 2.0;
            ps.start();
            ps.animate(4.0, Vec3::ZERO);
            ps.particles().iter().map(|p| p.size).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn splitmix_known_value() {
        assert_eq!(splitmix64(0), 0xe220_a839_7b1d_cdaf);
    }
}
