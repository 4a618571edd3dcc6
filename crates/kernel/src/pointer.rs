//! Pointer and keyboard dispatch: hover tracking, pick actions and the
//! pointer/keyboard observables.
//!
//! # Invariants
//! - `on_pre_pointer` runs before any pick; setting
//!   `skip_on_pointer_observable` drops the event entirely.
//! - A removed mesh, sprite or sprite manager never stays hovered or
//!   pressed. Sprite refs shift down when an earlier sprite is removed.
//! - On release, `on_pointer` fires PICK, then TAP or DOUBLE_TAP, then UP.

use glam::Vec2;
use tracing::{debug, trace};
use vista_common::{MASK_ALL, MeshId, SpriteManagerId};
use vista_input::{
    ClickKind, KeyboardEvent, KeyboardEventKind, PointerButton, PointerEvent, PointerEventKind,
    PointerEventTypes, PointerState,
};

use crate::actions::{ActionEvent, ActionSource, ActionTrigger};
use crate::mesh::Mesh;
use crate::observables::{KeyboardInfo, KeyboardInfoPre, PointerInfo, PointerInfoPre};
use crate::picking::{PickingInfo, SpriteRef, default_pick_predicate};
use crate::scene::Scene;

/// Owned mesh filter installed on the scene for pointer picks.
pub type MeshPredicate = Box<dyn Fn(&Mesh) -> bool>;

#[derive(Debug, Default)]
pub(crate) struct PointerTracker {
    pub(crate) state: PointerState,
    pub(crate) pointer_over_mesh: Option<MeshId>,
    pub(crate) pointer_over_sprite: Option<SpriteRef>,
    pub(crate) picked_down_mesh: Option<MeshId>,
    pub(crate) picked_down_sprite: Option<SpriteRef>,
    pub(crate) mesh_under_pointer: Option<MeshId>,
    /// Timestamp of the latest event; simulated input reuses it.
    pub(crate) clock_ms: f64,
}

impl PointerTracker {
    pub(crate) fn forget_mesh(&mut self, mesh: MeshId) {
        for slot in [
            &mut self.pointer_over_mesh,
            &mut self.picked_down_mesh,
            &mut self.mesh_under_pointer,
        ] {
            if *slot == Some(mesh) {
                *slot = None;
            }
        }
    }

    pub(crate) fn forget_sprite_manager(&mut self, manager: SpriteManagerId) {
        for slot in [&mut self.pointer_over_sprite, &mut self.picked_down_sprite] {
            if slot.is_some_and(|s| s.manager == manager) {
                *slot = None;
            }
        }
    }

    /// Sprite `index` of `manager` is gone: refs to it clear, refs past it
    /// shift down with the manager's list.
    pub(crate) fn forget_sprite(&mut self, manager: SpriteManagerId, index: usize) {
        for slot in [&mut self.pointer_over_sprite, &mut self.picked_down_sprite] {
            let Some(held) = slot.filter(|s| s.manager == manager) else {
                continue;
            };
            if held.index == index {
                *slot = None;
            } else if held.index > index {
                *slot = Some(SpriteRef {
                    index: held.index - 1,
                    ..held
                });
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        self.state.reset();
        self.pointer_over_mesh = None;
        self.pointer_over_sprite = None;
        self.picked_down_mesh = None;
        self.picked_down_sprite = None;
        self.mesh_under_pointer = None;
    }
}

impl Scene {
    /// Pointer position relative to the render surface.
    pub fn pointer_position(&self) -> Vec2 {
        self.pointer.state.position()
    }

    pub fn untranslated_pointer_position(&self) -> Vec2 {
        self.pointer.state.untranslated_position()
    }

    /// Offset of the render surface inside the event coordinates.
    pub fn set_pointer_surface_offset(&mut self, offset: Vec2) {
        self.pointer.state.set_surface_offset(offset);
    }

    pub fn pointer_over_mesh(&self) -> Option<MeshId> {
        self.pointer.pointer_over_mesh
    }

    pub fn pointer_over_sprite(&self) -> Option<SpriteRef> {
        self.pointer.pointer_over_sprite
    }

    pub fn picked_down_mesh(&self) -> Option<MeshId> {
        self.pointer.picked_down_mesh
    }

    /// Mesh hit by the last move pick.
    pub fn mesh_under_pointer(&self) -> Option<MeshId> {
        self.pointer.mesh_under_pointer
    }

    pub fn is_pointer_captured(&self) -> bool {
        self.pointer.state.pressed_button().is_some()
    }

    /// Change the hovered mesh, firing `OnPointerOut` on the old one and
    /// `OnPointerOver` on the new one.
    pub fn set_pointer_over_mesh(&mut self, mesh: Option<MeshId>) {
        if self.pointer.pointer_over_mesh == mesh {
            return;
        }
        if let Some(old) = self.pointer.pointer_over_mesh.take() {
            self.process_mesh_trigger(old, ActionTrigger::OnPointerOut);
        }
        self.pointer.pointer_over_mesh = mesh;
        if let Some(new) = mesh {
            self.process_mesh_trigger(new, ActionTrigger::OnPointerOver);
        }
        trace!(?mesh, "pointer over changed");
    }

    fn set_pointer_over_sprite(&mut self, sprite: Option<SpriteRef>) {
        if self.pointer.pointer_over_sprite == sprite {
            return;
        }
        if let Some(old) = self.pointer.pointer_over_sprite.take() {
            self.process_sprite_trigger(old, ActionTrigger::OnPointerOut);
        }
        self.pointer.pointer_over_sprite = sprite;
        if let Some(new) = sprite {
            self.process_sprite_trigger(new, ActionTrigger::OnPointerOver);
        }
    }

    fn action_event(&self, source: ActionSource) -> ActionEvent {
        let position = self.pointer.state.position();
        let mut event = ActionEvent::new(source, position.x, position.y);
        event.mesh_under_pointer = self.pointer.mesh_under_pointer;
        event
    }

    pub(crate) fn process_mesh_trigger(&mut self, mesh: MeshId, trigger: ActionTrigger) -> usize {
        let Some(manager_id) = self
            .meshes
            .iter()
            .find(|m| m.unique_id == mesh)
            .and_then(|m| m.action_manager)
        else {
            return 0;
        };
        let event = self.action_event(ActionSource::Mesh(mesh));
        self.action_managers
            .iter_mut()
            .find(|a| a.unique_id == manager_id)
            .map_or(0, |a| a.process_trigger(trigger, &event))
    }

    fn process_sprite_trigger(&mut self, sprite: SpriteRef, trigger: ActionTrigger) -> usize {
        let Some(manager_id) = self
            .sprite_managers
            .iter()
            .find(|m| m.unique_id == sprite.manager)
            .and_then(|m| m.sprites().get(sprite.index))
            .and_then(|s| s.action_manager)
        else {
            return 0;
        };
        let event = self.action_event(ActionSource::Sprite {
            manager: sprite.manager,
            index: sprite.index,
        });
        self.action_managers
            .iter_mut()
            .find(|a| a.unique_id == manager_id)
            .map_or(0, |a| a.process_trigger(trigger, &event))
    }

    fn mesh_has_pointer_triggers(&self, mesh: &Mesh) -> bool {
        mesh.action_manager.is_some_and(|id| {
            self.action_managers
                .iter()
                .any(|a| a.unique_id == id && a.has_pointer_triggers())
        })
    }

    fn sprite_has_pick_triggers(&self, sprite: SpriteRef) -> bool {
        self.sprite_managers
            .iter()
            .find(|m| m.unique_id == sprite.manager)
            .and_then(|m| m.sprites().get(sprite.index))
            .and_then(|s| s.action_manager)
            .is_some_and(|id| self.action_managers.iter().any(|a| a.unique_id == id))
    }

    fn pick_for(&self, kind: PointerEventKind) -> PickingInfo {
        let position = self.pointer.state.position();
        let installed = match kind {
            PointerEventKind::Move => self.pointer_move_predicate.as_deref(),
            PointerEventKind::Down => self.pointer_down_predicate.as_deref(),
            PointerEventKind::Up => self.pointer_up_predicate.as_deref(),
            PointerEventKind::Wheel => None,
        };
        let constantly = self.config.constantly_update_mesh_under_pointer;
        let default_move =
            |m: &Mesh| default_pick_predicate(m) && (constantly || self.mesh_has_pointer_triggers(m));
        let predicate: &dyn Fn(&Mesh) -> bool = match (installed, kind) {
            (Some(p), _) => p,
            (None, PointerEventKind::Move) => &default_move,
            (None, _) => &default_pick_predicate,
        };
        self.pick(position.x, position.y, Some(predicate), false, None)
    }

    fn pick_sprite_at_pointer(&self) -> PickingInfo {
        let position = self.pointer.state.position();
        self.pick_sprite(position.x, position.y, None, false, None)
    }

    fn notify_pointer(&mut self, kind: u32, event: PointerEvent, pick_info: Option<PickingInfo>) {
        if !self.observables.on_pointer.has_specific_mask(kind) {
            return;
        }
        let mut info = PointerInfo {
            kind,
            event,
            pick_info,
        };
        self.observables.on_pointer.notify_observers(&mut info, kind);
    }

    /// Feed a raw pointer event through pre-observers, picking, actions and
    /// `on_pointer`.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) {
        self.pointer.clock_ms = self.pointer.clock_ms.max(event.timestamp_ms);
        self.pointer.state.update_position(event.x, event.y);
        let kind = event.kind.mask();

        if self.observables.on_pre_pointer.has_specific_mask(kind) {
            let mut pre = PointerInfoPre {
                kind,
                event,
                local_position: self.pointer.state.position(),
                skip_on_pointer_observable: false,
                ray: None,
            };
            self.observables.on_pre_pointer.notify_observers(&mut pre, kind);
            if pre.skip_on_pointer_observable {
                trace!(kind, "pointer event skipped by pre-observer");
                return;
            }
        }

        match event.kind {
            PointerEventKind::Move => self.on_pointer_move(event),
            PointerEventKind::Down => self.on_pointer_down(event),
            PointerEventKind::Up => self.on_pointer_up(event),
            PointerEventKind::Wheel => {
                let info = self.pick_for(PointerEventKind::Wheel);
                self.notify_pointer(PointerEventTypes::WHEEL, event, Some(info));
            }
        }
    }

    fn on_pointer_move(&mut self, event: PointerEvent) {
        let info = self.pick_for(PointerEventKind::Move);
        self.pointer.mesh_under_pointer = info.picked_mesh;
        self.set_pointer_over_mesh(info.picked_mesh);

        let info = if info.hit {
            self.set_pointer_over_sprite(None);
            info
        } else {
            let sprite_info = self.pick_sprite_at_pointer();
            let hovered = sprite_info
                .picked_sprite
                .filter(|s| self.sprite_has_pick_triggers(*s));
            self.set_pointer_over_sprite(hovered);
            if sprite_info.hit { sprite_info } else { info }
        };
        self.notify_pointer(PointerEventTypes::MOVE, event, Some(info));
    }

    fn on_pointer_down(&mut self, event: PointerEvent) {
        let untranslated = self.pointer.state.untranslated_position();
        self.pointer
            .state
            .begin_press(untranslated.x, untranslated.y, event.button, event.timestamp_ms);

        let mut info = self.pick_for(PointerEventKind::Down);
        self.pointer.picked_down_mesh = info.picked_mesh;
        self.pointer.picked_down_sprite = None;
        if let Some(mesh) = info.picked_mesh {
            self.process_mesh_trigger(mesh, ActionTrigger::OnPickDown);
            let button_trigger = match event.button {
                PointerButton::Left => ActionTrigger::OnLeftPick,
                PointerButton::Right => ActionTrigger::OnRightPick,
                PointerButton::Middle => ActionTrigger::OnCenterPick,
            };
            self.process_mesh_trigger(mesh, button_trigger);
        } else {
            let sprite_info = self.pick_sprite_at_pointer();
            if let Some(sprite) = sprite_info.picked_sprite {
                self.pointer.picked_down_sprite = Some(sprite);
                self.process_sprite_trigger(sprite, ActionTrigger::OnPickDown);
                info = sprite_info;
            }
        }
        self.notify_pointer(PointerEventTypes::DOWN, event, Some(info));
    }

    fn on_pointer_up(&mut self, event: PointerEvent) {
        let untranslated = self.pointer.state.untranslated_position();
        let config = self.config.pointer_config();
        let click = self.pointer.state.end_press(
            untranslated.x,
            untranslated.y,
            event.button,
            event.timestamp_ms,
            &config,
        );
        let mut info = self.pick_for(PointerEventKind::Up);
        let picked_down = self.pointer.picked_down_mesh.take();
        let is_click = matches!(click, ClickKind::Tap | ClickKind::DoubleTap);

        if let Some(mesh) = info.picked_mesh {
            if click == ClickKind::LongPress && picked_down == Some(mesh) {
                self.process_mesh_trigger(mesh, ActionTrigger::OnLongPress);
            }
            self.process_mesh_trigger(mesh, ActionTrigger::OnPickUp);
            if is_click && picked_down == Some(mesh) {
                self.process_mesh_trigger(mesh, ActionTrigger::OnPick);
                if click == ClickKind::DoubleTap {
                    self.process_mesh_trigger(mesh, ActionTrigger::OnDoublePick);
                }
            }
        }
        if let Some(down) = picked_down {
            if info.picked_mesh != Some(down) {
                self.process_mesh_trigger(down, ActionTrigger::OnPickOut);
            }
        }

        let sprite_down = self.pointer.picked_down_sprite.take();
        if !info.hit {
            let sprite_info = self.pick_sprite_at_pointer();
            if let Some(sprite) = sprite_info.picked_sprite {
                self.process_sprite_trigger(sprite, ActionTrigger::OnPickUp);
                if is_click && sprite_down == Some(sprite) {
                    self.process_sprite_trigger(sprite, ActionTrigger::OnPick);
                }
                info = sprite_info;
            }
        }
        if let Some(down) = sprite_down {
            if info.picked_sprite != Some(down) {
                self.process_sprite_trigger(down, ActionTrigger::OnPickOut);
            }
        }

        debug!(?click, mesh = ?info.picked_mesh, "pointer released");
        if is_click {
            if info.hit {
                self.notify_pointer(PointerEventTypes::PICK, event, Some(info.clone()));
            }
            let tap = if click == ClickKind::DoubleTap {
                PointerEventTypes::DOUBLE_TAP
            } else {
                PointerEventTypes::TAP
            };
            self.notify_pointer(tap, event, Some(info.clone()));
        }
        self.notify_pointer(PointerEventTypes::UP, event, Some(info));
    }

    pub fn simulate_pointer_move(&mut self, x: f32, y: f32) {
        let event = PointerEvent::moved(x, y, self.pointer.clock_ms);
        self.handle_pointer_event(event);
    }

    pub fn simulate_pointer_down(&mut self, x: f32, y: f32, button: PointerButton) {
        let event = PointerEvent::down(x, y, self.pointer.clock_ms).with_button(button);
        self.handle_pointer_event(event);
    }

    pub fn simulate_pointer_up(&mut self, x: f32, y: f32, button: PointerButton) {
        let event = PointerEvent::up(x, y, self.pointer.clock_ms).with_button(button);
        self.handle_pointer_event(event);
    }

    /// Feed a key event: `on_pre_keyboard`, the scene's key actions, then
    /// `on_keyboard` unless a pre-observer skipped it.
    pub fn handle_keyboard_event(&mut self, event: KeyboardEvent) {
        let kind = event.kind.mask();
        let mut pre = KeyboardInfoPre {
            kind,
            event: event.clone(),
            skip_on_keyboard_observable: false,
        };
        self.observables.on_pre_keyboard.notify_observers(&mut pre, kind);

        let trigger = match event.kind {
            KeyboardEventKind::KeyDown => ActionTrigger::OnKeyDown,
            KeyboardEventKind::KeyUp => ActionTrigger::OnKeyUp,
        };
        self.process_scene_trigger(trigger, Some(&event.key));

        if !pre.skip_on_keyboard_observable {
            let mut info = KeyboardInfo { kind, event };
            self.observables.on_keyboard.notify_observers(&mut info, MASK_ALL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Action, ActionManager};
    use crate::camera::Camera;
    use crate::sprites::{Sprite, SpriteManager};
    use glam::Vec3;
    use std::cell::RefCell;
    use std::rc::Rc;
    use vista_render::RecordingBackend;

    type Log = Rc<RefCell<Vec<String>>>;

    fn scene() -> Scene {
        let mut scene = Scene::new(Box::new(RecordingBackend::new(800, 600)));
        scene.add_camera(Camera::new("cam", Vec3::new(0.0, 0.0, -10.0), Vec3::ZERO));
        scene
    }

    fn logging_manager(log: &Log, triggers: &[ActionTrigger]) -> ActionManager {
        let mut manager = ActionManager::new();
        for trigger in triggers {
            let log = log.clone();
            let name = format!("{trigger:?}");
            manager.register_action(Action::new(*trigger, move |_| log.borrow_mut().push(name.clone())));
        }
        manager
    }

    fn box_with_actions(scene: &mut Scene, log: &Log, triggers: &[ActionTrigger]) -> MeshId {
        let mesh = scene.create_box("box", 2.0);
        let manager = scene.add_action_manager(logging_manager(log, triggers));
        scene.mesh_mut(mesh).unwrap().action_manager = Some(manager);
        mesh
    }

    #[test]
    fn hover_fires_over_and_out() {
        let mut scene = scene();
        let log = Log::default();
        let mesh = box_with_actions(
            &mut scene,
            &log,
            &[ActionTrigger::OnPointerOver, ActionTrigger::OnPointerOut],
        );
        scene.simulate_pointer_move(400.0, 300.0);
        assert_eq!(scene.pointer_over_mesh(), Some(mesh));
        scene.simulate_pointer_move(400.0, 300.0);
        scene.simulate_pointer_move(10.0, 10.0);
        assert_eq!(scene.pointer_over_mesh(), None);
        assert_eq!(*log.borrow(), vec!["OnPointerOver", "OnPointerOut"]);
    }

    #[test]
    fn meshes_without_pointer_actions_are_not_hovered() {
        let mut scene = scene();
        scene.create_box("plain", 2.0);
        scene.simulate_pointer_move(400.0, 300.0);
        assert_eq!(scene.pointer_over_mesh(), None);

        let mut config = scene.config().clone();
        config.constantly_update_mesh_under_pointer = true;
        scene.set_config(config);
        scene.simulate_pointer_move(400.0, 300.0);
        assert!(scene.pointer_over_mesh().is_some());
        assert_eq!(scene.mesh_under_pointer(), scene.pointer_over_mesh());
    }

    #[test]
    fn removing_the_hovered_mesh_clears_pointer_state() {
        let mut scene = scene();
        let log = Log::default();
        let mesh = box_with_actions(&mut scene, &log, &[ActionTrigger::OnPointerOver]);
        scene.simulate_pointer_move(400.0, 300.0);
        scene.simulate_pointer_down(400.0, 300.0, PointerButton::Left);
        assert_eq!(scene.pointer_over_mesh(), Some(mesh));
        assert_eq!(scene.picked_down_mesh(), Some(mesh));
        scene.remove_mesh(mesh);
        assert_eq!(scene.pointer_over_mesh(), None);
        assert_eq!(scene.picked_down_mesh(), None);
        assert_eq!(scene.mesh_under_pointer(), None);
    }

    #[test]
    fn click_fires_pick_actions_in_order() {
        let mut scene = scene();
        let log = Log::default();
        box_with_actions(
            &mut scene,
            &log,
            &[
                ActionTrigger::OnPickDown,
                ActionTrigger::OnLeftPick,
                ActionTrigger::OnPickUp,
                ActionTrigger::OnPick,
                ActionTrigger::OnPickOut,
            ],
        );
        scene.handle_pointer_event(PointerEvent::down(400.0, 300.0, 0.0));
        scene.handle_pointer_event(PointerEvent::up(401.0, 300.0, 50.0));
        assert_eq!(
            *log.borrow(),
            vec!["OnPickDown", "OnLeftPick", "OnPickUp", "OnPick"]
        );
    }

    #[test]
    fn release_elsewhere_is_pick_out() {
        let mut scene = scene();
        let log = Log::default();
        box_with_actions(&mut scene, &log, &[ActionTrigger::OnPick, ActionTrigger::OnPickOut]);
        scene.handle_pointer_event(PointerEvent::down(400.0, 300.0, 0.0));
        scene.handle_pointer_event(PointerEvent::moved(10.0, 10.0, 20.0));
        scene.handle_pointer_event(PointerEvent::up(10.0, 10.0, 40.0));
        assert_eq!(*log.borrow(), vec!["OnPickOut"]);
    }

    #[test]
    fn double_tap_and_long_press() {
        let mut scene = scene();
        let log = Log::default();
        box_with_actions(
            &mut scene,
            &log,
            &[ActionTrigger::OnDoublePick, ActionTrigger::OnLongPress],
        );
        for (down, up) in [(0.0, 40.0), (100.0, 140.0)] {
            scene.handle_pointer_event(PointerEvent::down(400.0, 300.0, down));
            scene.handle_pointer_event(PointerEvent::up(400.0, 300.0, up));
        }
        scene.handle_pointer_event(PointerEvent::down(400.0, 300.0, 1000.0));
        scene.handle_pointer_event(PointerEvent::up(400.0, 300.0, 1700.0));
        assert_eq!(*log.borrow(), vec!["OnDoublePick", "OnLongPress"]);
    }

    #[test]
    fn pointer_observable_order_on_release() {
        let mut scene = scene();
        scene.create_box("box", 2.0);
        let kinds = Rc::new(RefCell::new(Vec::new()));
        let k = kinds.clone();
        scene.observables.on_pointer.add(move |info, _| k.borrow_mut().push(info.kind));
        scene.handle_pointer_event(PointerEvent::down(400.0, 300.0, 0.0));
        scene.handle_pointer_event(PointerEvent::up(400.0, 300.0, 10.0));
        assert_eq!(
            *kinds.borrow(),
            vec![
                PointerEventTypes::DOWN,
                PointerEventTypes::PICK,
                PointerEventTypes::TAP,
                PointerEventTypes::UP
            ]
        );
    }

    #[test]
    fn pick_info_reaches_observers() {
        let mut scene = scene();
        let mesh = scene.create_box("box", 2.0);
        let picked = Rc::new(RefCell::new(None));
        let p = picked.clone();
        scene
            .observables
            .on_pointer
            .add_with_mask(PointerEventTypes::DOWN, move |info, _| {
                *p.borrow_mut() = info.pick_info.as_ref().and_then(|i| i.picked_mesh)
            });
        scene.simulate_pointer_down(400.0, 300.0, PointerButton::Right);
        assert_eq!(*picked.borrow(), Some(mesh));
    }

    #[test]
    fn pre_pointer_skip_suppresses_everything() {
        let mut scene = scene();
        let log = Log::default();
        box_with_actions(&mut scene, &log, &[ActionTrigger::OnPickDown]);
        let seen = Rc::new(RefCell::new(0));
        let s = seen.clone();
        scene.observables.on_pointer.add(move |_, _| *s.borrow_mut() += 1);
        scene
            .observables
            .on_pre_pointer
            .add(|pre, _| pre.skip_on_pointer_observable = true);
        scene.simulate_pointer_down(400.0, 300.0, PointerButton::Left);
        assert!(log.borrow().is_empty());
        assert_eq!(*seen.borrow(), 0);
        assert_eq!(scene.pointer_position(), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn sprite_pick_actions() {
        let mut scene = scene();
        let log = Log::default();
        let manager_id = scene.add_action_manager(logging_manager(
            &log,
            &[ActionTrigger::OnPointerOver, ActionTrigger::OnPick],
        ));
        let mut sprites = SpriteManager::new("sprites", 4, 32);
        sprites.is_pickable = true;
        let mut sprite = Sprite::new("coin", Vec3::ZERO);
        sprite.is_pickable = true;
        sprite.action_manager = Some(manager_id);
        sprites.add_sprite(sprite);
        let sprites_id = scene.add_sprite_manager(sprites);
        scene.simulate_pointer_move(400.0, 300.0);
        assert_eq!(
            scene.pointer_over_sprite(),
            Some(SpriteRef { manager: sprites_id, index: 0 })
        );
        scene.simulate_pointer_down(400.0, 300.0, PointerButton::Left);
        scene.simulate_pointer_up(400.0, 300.0, PointerButton::Left);
        assert_eq!(*log.borrow(), vec!["OnPointerOver", "OnPick"]);
        scene.remove_sprite_manager(sprites_id);
        assert!(scene.pointer_over_sprite().is_none());
    }

    #[test]
    fn removing_an_earlier_sprite_keeps_hover_on_the_same_sprite() {
        let mut scene = scene();
        let log = Log::default();
        let actions = scene.add_action_manager(logging_manager(&log, &[ActionTrigger::OnPointerOver]));
        let mut sprites = SpriteManager::new("sprites", 4, 32);
        sprites.is_pickable = true;
        for (name, x) in [("left", 3.0), ("center", 0.0)] {
            let mut sprite = Sprite::new(name, Vec3::new(x, 0.0, 0.0));
            sprite.is_pickable = true;
            sprite.action_manager = Some(actions);
            sprites.add_sprite(sprite);
        }
        let sprites_id = scene.add_sprite_manager(sprites);
        scene.simulate_pointer_move(400.0, 300.0);
        scene.simulate_pointer_down(400.0, 300.0, PointerButton::Left);
        let center = SpriteRef { manager: sprites_id, index: 1 };
        assert_eq!(scene.pointer_over_sprite(), Some(center));
        assert_eq!(scene.pointer.picked_down_sprite, Some(center));

        assert!(scene.sprite_manager_mut(sprites_id).unwrap().remove_sprite(0).is_none());
        assert_eq!(scene.remove_sprite(sprites_id, 0).unwrap().name, "left");
        let shifted = SpriteRef { manager: sprites_id, index: 0 };
        assert_eq!(scene.pointer_over_sprite(), Some(shifted));
        assert_eq!(scene.pointer.picked_down_sprite, Some(shifted));
        let manager = scene.get_sprite_manager_by_name("sprites").unwrap();
        assert_eq!(manager.sprites()[0].name, "center");

        assert!(scene.remove_sprite(sprites_id, 0).is_some());
        assert!(scene.pointer_over_sprite().is_none());
        assert!(scene.pointer.picked_down_sprite.is_none());
        assert!(scene.remove_sprite(sprites_id, 0).is_none());
    }

    #[test]
    fn keyboard_flows_through_actions_and_observers() {
        let mut scene = scene();
        let log = Log::default();
        let mut manager = ActionManager::new();
        let l = log.clone();
        manager.register_action(
            Action::new(ActionTrigger::OnKeyDown, move |e| {
                l.borrow_mut().push(format!("action {}", e.key.clone().unwrap_or_default()))
            })
            .with_parameter("r"),
        );
        let id = scene.add_action_manager(manager);
        scene.action_manager = Some(id);
        let l = log.clone();
        scene
            .observables
            .on_keyboard
            .add(move |info, _| l.borrow_mut().push(format!("observer {}", info.event.key)));
        let l = log.clone();
        scene.observables.on_pre_keyboard.add(move |pre, _| {
            l.borrow_mut().push("pre".into());
            pre.skip_on_keyboard_observable = pre.event.key == "q";
        });
        scene.handle_keyboard_event(KeyboardEvent::new(KeyboardEventKind::KeyDown, "r"));
        scene.handle_keyboard_event(KeyboardEvent::new(KeyboardEventKind::KeyDown, "q"));
        assert_eq!(*log.borrow(), vec!["pre", "action r", "observer r", "pre"]);
    }
}
