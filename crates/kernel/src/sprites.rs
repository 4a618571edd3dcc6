use glam::Vec3;
use tracing::warn;
use vista_common::{ActionManagerId, Color4, SceneUid, SpriteManagerId};

/// Camera-facing quad drawn from a cell of its manager's sprite sheet.
#[derive(Debug, Clone)]
pub struct Sprite {
    pub name: String,
    pub position: Vec3,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
    pub color: Color4,
    pub cell_index: u32,
    pub is_visible: bool,
    pub is_pickable: bool,
    pub action_manager: Option<ActionManagerId>,
    animation: Option<CellAnimation>,
}

#[derive(Debug, Clone, Copy)]
struct CellAnimation {
    from: u32,
    to: u32,
    looping: bool,
    delay_ms: f64,
    elapsed_ms: f64,
}

impl Sprite {
    pub fn new(name: impl Into<String>, position: Vec3) -> Self {
        Self {
            name: name.into(),
            position,
            width: 1.0,
            height: 1.0,
            angle: 0.0,
            color: Color4::new(1.0, 1.0, 1.0, 1.0),
            cell_index: 0,
            is_visible: true,
            is_pickable: false,
            action_manager: None,
            animation: None,
        }
    }

    /// Step through cells `from..=to`, one every `delay_ms`.
    pub fn play_animation(&mut self, from: u32, to: u32, looping: bool, delay_ms: f64) {
        self.cell_index = from;
        self.animation = Some(CellAnimation {
            from,
            to,
            looping,
            delay_ms: delay_ms.max(f64::EPSILON),
            elapsed_ms: 0.0,
        });
    }

    pub fn stop_animation(&mut self) {
        self.animation = None;
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub(crate) fn animate(&mut self, delta_ms: f64) {
        let Some(anim) = self.animation.as_mut() else {
            return;
        };
        anim.elapsed_ms += delta_ms;
        while anim.elapsed_ms >= anim.delay_ms {
            anim.elapsed_ms -= anim.delay_ms;
            if self.cell_index < anim.to {
                self.cell_index += 1;
            } else if anim.looping {
                self.cell_index = anim.from;
            } else {
                self.animation = None;
                return;
            }
        }
    }

    /// Picking volume: the quad's half extents, thickened to a cube so the
    /// sprite can be hit from any side.
    pub(crate) fn pick_bounds(&self) -> (Vec3, Vec3) {
        let depth = self.width.max(self.height) * 0.5;
        let half = Vec3::new(self.width * 0.5, self.height * 0.5, depth);
        (self.position - half, self.position + half)
    }
}

#[derive(Debug, Clone)]
pub struct SpriteManager {
    pub(crate) unique_id: SpriteManagerId,
    pub name: String,
    pub capacity: usize,
    pub cell_width: u32,
    pub cell_height: u32,
    pub is_pickable: bool,
    pub layer_mask: u32,
    pub rendering_group_id: u8,
    sprites: Vec<Sprite>,
    pub(crate) scene_uid: Option<SceneUid>,
}

impl SpriteManager {
    pub fn new(name: impl Into<String>, capacity: usize, cell_size: u32) -> Self {
        Self {
            unique_id: SpriteManagerId(0),
            name: name.into(),
            capacity,
            cell_width: cell_size,
            cell_height: cell_size,
            is_pickable: false,
            layer_mask: 0x0FFF_FFFF,
            rendering_group_id: 0,
            sprites: Vec::new(),
            scene_uid: None,
        }
    }

    pub fn unique_id(&self) -> SpriteManagerId {
        self.unique_id
    }

    pub fn scene_uid(&self) -> Option<SceneUid> {
        self.scene_uid
    }

    /// Returns the sprite index, or `None` when the manager is full.
    pub fn add_sprite(&mut self, sprite: Sprite) -> Option<usize> {
        if self.sprites.len() >= self.capacity {
            return None;
        }
        self.sprites.push(sprite);
        Some(self.sprites.len() - 1)
    }

    /// Remove a sprite from a manager no scene owns yet. Later sprites shift
    /// down one index. Owned managers go through `Scene::remove_sprite` so
    /// hover and press state follow the shift.
    pub fn remove_sprite(&mut self, index: usize) -> Option<Sprite> {
        if self.scene_uid.is_some() {
            warn!(sprite_manager = %self.unique_id, index, "remove_sprite on a scene-owned manager ignored");
            return None;
        }
        self.take_sprite(index)
    }

    pub(crate) fn take_sprite(&mut self, index: usize) -> Option<Sprite> {
        (index < self.sprites.len()).then(|| self.sprites.remove(index))
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn sprite_mut(&mut self, index: usize) -> Option<&mut Sprite> {
        self.sprites.get_mut(index)
    }

    pub(crate) fn sprites_mut(&mut self) -> &mut [Sprite] {
        &mut self.sprites
    }

    pub(crate) fn animate(&mut self, delta_ms: f64) {
        for sprite in &mut self.sprites {
            sprite.animate(delta_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_enforced() {
        let mut mgr = SpriteManager::new("trees", 1, 64);
        assert_eq!(mgr.add_sprite(Sprite::new("a", Vec3::ZERO)), Some(0));
        assert_eq!(mgr.add_sprite(Sprite::new("b", Vec3::ZERO)), None);
        assert!(mgr.remove_sprite(0).is_some());
        assert!(mgr.remove_sprite(0).is_none());
    }

    #[test]
    fn scene_owned_manager_refuses_direct_removal() {
        let mut mgr = SpriteManager::new("trees", 2, 64);
        mgr.add_sprite(Sprite::new("a", Vec3::ZERO));
        mgr.scene_uid = Some(SceneUid::new());
        assert!(mgr.remove_sprite(0).is_none());
        assert_eq!(mgr.sprites().len(), 1);
        assert!(mgr.take_sprite(0).is_some());
    }

    #[test]
    fn cell_animation_loops_and_ends() {
        let mut s = Sprite::new("s", Vec3::ZERO);
        s.play_animation(2, 4, true, 100.0);
        s.animate(250.0);
        assert_eq!(s.cell_index, 4);
        s.animate(100.0);
        assert_eq!(s.cell_index, 2);

        s.play_animation(0, 1, false, 10.0);
        s.animate(30.0);
        assert_eq!(s.cell_index, 1);
        assert!(!s.is_animating());
    }

    #[test]
    fn pick_bounds_follow_size() {
        let mut s = Sprite::new("s", Vec3::new(1.0, 0.0, 0.0));
        s.width = 2.0;
        s.height = 4.0;
        let (min, max) = s.pick_bounds();
        assert_eq!(min, Vec3::new(0.0, -2.0, -2.0));
        assert_eq!(max, Vec3::new(2.0, 2.0, 2.0));
    }
}
