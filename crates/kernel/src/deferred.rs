use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use vista_common::{CameraId, LightId, MaterialId, MeshId, TargetId, TextureId};

use crate::scene::Scene;

/// A scene mutation requested while the scene is borrowed, typically from an
/// observer or an action callback.
pub enum SceneCommand {
    RemoveMesh(MeshId),
    RemoveCamera(CameraId),
    RemoveLight(LightId),
    RemoveMaterial(MaterialId),
    RemoveTexture(TextureId),
    StopAnimation {
        target: TargetId,
        name: Option<String>,
    },
    SetActiveCamera(CameraId),
    Custom(Box<dyn FnOnce(&mut Scene)>),
}

impl std::fmt::Debug for SceneCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RemoveMesh(id) => f.debug_tuple("RemoveMesh").field(id).finish(),
            Self::RemoveCamera(id) => f.debug_tuple("RemoveCamera").field(id).finish(),
            Self::RemoveLight(id) => f.debug_tuple("RemoveLight").field(id).finish(),
            Self::RemoveMaterial(id) => f.debug_tuple("RemoveMaterial").field(id).finish(),
            Self::RemoveTexture(id) => f.debug_tuple("RemoveTexture").field(id).finish(),
            Self::StopAnimation { target, name } => f
                .debug_struct("StopAnimation")
                .field("target", target)
                .field("name", name)
                .finish(),
            Self::SetActiveCamera(id) => f.debug_tuple("SetActiveCamera").field(id).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Shared handle onto the scene's command queue. Clones push into the same
/// queue; the scene drains it at the end of every frame.
#[derive(Clone, Default)]
pub struct DeferredQueue(Rc<RefCell<VecDeque<SceneCommand>>>);

impl std::fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredQueue").field("len", &self.len()).finish()
    }
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: SceneCommand) {
        self.0.borrow_mut().push_back(command);
    }

    pub fn run(&self, f: impl FnOnce(&mut Scene) + 'static) {
        self.push(SceneCommand::Custom(Box::new(f)));
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Next queued command. The borrow ends before the caller applies it,
    /// so commands may enqueue more commands.
    pub(crate) fn pop(&self) -> Option<SceneCommand> {
        self.0.borrow_mut().pop_front()
    }

    pub(crate) fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_queue() {
        let q = DeferredQueue::new();
        let handle = q.clone();
        handle.push(SceneCommand::RemoveMesh(MeshId(1)));
        handle.run(|_| {});
        assert_eq!(q.len(), 2);
        assert!(matches!(q.pop(), Some(SceneCommand::RemoveMesh(MeshId(1)))));
        assert!(matches!(q.pop(), Some(SceneCommand::Custom(_))));
        assert!(q.is_empty());
    }
}
