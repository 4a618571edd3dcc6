use tracing::trace;
use vista_common::{ActionManagerId, MeshId, SceneUid, SpriteManagerId};

/// What fires an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionTrigger {
    OnPick,
    OnLeftPick,
    OnRightPick,
    OnCenterPick,
    OnPickDown,
    OnDoublePick,
    OnPickUp,
    /// Released outside the mesh that was pressed.
    OnPickOut,
    OnLongPress,
    OnPointerOver,
    OnPointerOut,
    OnEveryFrame,
    OnKeyDown,
    OnKeyUp,
}

impl ActionTrigger {
    /// Triggers that need the mesh under the pointer tracked on every move.
    pub fn is_pointer_trigger(self) -> bool {
        matches!(self, Self::OnPointerOver | Self::OnPointerOut) || self.is_pick_trigger()
    }

    pub fn is_pick_trigger(self) -> bool {
        matches!(
            self,
            Self::OnPick
                | Self::OnLeftPick
                | Self::OnRightPick
                | Self::OnCenterPick
                | Self::OnPickDown
                | Self::OnDoublePick
                | Self::OnPickUp
                | Self::OnPickOut
                | Self::OnLongPress
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSource {
    Mesh(MeshId),
    Sprite {
        manager: SpriteManagerId,
        index: usize,
    },
    Scene,
}

/// Context handed to an action callback.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEvent {
    pub source: ActionSource,
    pub pointer_x: f32,
    pub pointer_y: f32,
    pub mesh_under_pointer: Option<MeshId>,
    pub key: Option<String>,
}

impl ActionEvent {
    pub fn new(source: ActionSource, pointer_x: f32, pointer_y: f32) -> Self {
        Self {
            source,
            pointer_x,
            pointer_y,
            mesh_under_pointer: None,
            key: None,
        }
    }
}

pub type ActionCallback = Box<dyn FnMut(&ActionEvent)>;

pub struct Action {
    pub trigger: ActionTrigger,
    /// For key triggers: only this key fires the action.
    pub parameter: Option<String>,
    callback: ActionCallback,
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("trigger", &self.trigger)
            .field("parameter", &self.parameter)
            .finish()
    }
}

impl Action {
    pub fn new(trigger: ActionTrigger, callback: impl FnMut(&ActionEvent) + 'static) -> Self {
        Self {
            trigger,
            parameter: None,
            callback: Box::new(callback),
        }
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    fn accepts(&self, event: &ActionEvent) -> bool {
        match (&self.parameter, self.trigger) {
            (Some(p), ActionTrigger::OnKeyDown | ActionTrigger::OnKeyUp) => {
                event.key.as_deref() == Some(p.as_str())
            }
            _ => true,
        }
    }
}

/// Trigger to callback table owned by the scene and referenced by meshes
/// and sprites through their `action_manager` handle.
#[derive(Debug)]
pub struct ActionManager {
    pub(crate) unique_id: ActionManagerId,
    actions: Vec<Action>,
    pub(crate) scene_uid: Option<SceneUid>,
}

impl Default for ActionManager {
    fn default() -> Self {
        Self {
            unique_id: ActionManagerId(0),
            actions: Vec::new(),
            scene_uid: None,
        }
    }
}

impl ActionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unique_id(&self) -> ActionManagerId {
        self.unique_id
    }

    pub fn scene_uid(&self) -> Option<SceneUid> {
        self.scene_uid
    }

    pub fn register_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn has_pointer_triggers(&self) -> bool {
        self.actions.iter().any(|a| a.trigger.is_pointer_trigger())
    }

    pub fn has_pick_triggers(&self) -> bool {
        self.actions.iter().any(|a| a.trigger.is_pick_trigger())
    }

    pub fn has_specific_trigger(&self, trigger: ActionTrigger) -> bool {
        self.actions.iter().any(|a| a.trigger == trigger)
    }

    /// Run every action registered for `trigger`. Returns how many ran.
    pub fn process_trigger(&mut self, trigger: ActionTrigger, event: &ActionEvent) -> usize {
        let mut count = 0;
        for action in self.actions.iter_mut().filter(|a| a.trigger == trigger) {
            if action.accepts(event) {
                (action.callback)(event);
                count += 1;
            }
        }
        if count > 0 {
            trace!(manager = %self.unique_id, ?trigger, count, "actions processed");
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn trigger_classes() {
        assert!(ActionTrigger::OnPointerOver.is_pointer_trigger());
        assert!(!ActionTrigger::OnPointerOver.is_pick_trigger());
        assert!(ActionTrigger::OnPickUp.is_pointer_trigger());
        assert!(!ActionTrigger::OnEveryFrame.is_pointer_trigger());
        assert!(!ActionTrigger::OnKeyDown.is_pick_trigger());
    }

    #[test]
    fn process_runs_matching_actions_only() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut mgr = ActionManager::new();
        let l = log.clone();
        mgr.register_action(Action::new(ActionTrigger::OnPick, move |e| {
            l.borrow_mut().push(("pick", e.source));
        }));
        let l = log.clone();
        mgr.register_action(Action::new(ActionTrigger::OnPointerOver, move |e| {
            l.borrow_mut().push(("over", e.source));
        }));
        assert!(mgr.has_pick_triggers());
        let event = ActionEvent::new(ActionSource::Mesh(MeshId(4)), 1.0, 2.0);
        assert_eq!(mgr.process_trigger(ActionTrigger::OnPick, &event), 1);
        assert_eq!(mgr.process_trigger(ActionTrigger::OnPickUp, &event), 0);
        assert_eq!(*log.borrow(), vec![("pick", ActionSource::Mesh(MeshId(4)))]);
    }

    #[test]
    fn key_parameter_filters() {
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        let mut mgr = ActionManager::new();
        mgr.register_action(
            Action::new(ActionTrigger::OnKeyDown, move |_| *h.borrow_mut() += 1).with_parameter("r"),
        );
        let mut event = ActionEvent::new(ActionSource::Scene, 0.0, 0.0);
        event.key = Some("q".into());
        mgr.process_trigger(ActionTrigger::OnKeyDown, &event);
        event.key = Some("r".into());
        mgr.process_trigger(ActionTrigger::OnKeyDown, &event);
        assert_eq!(*hits.borrow(), 1);
    }
}
