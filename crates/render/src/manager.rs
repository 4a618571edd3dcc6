use tracing::{trace, warn};
use vista_common::{CameraId, MeshId, Observable};

use crate::backend::{DrawCall, RenderBackend};
use crate::group::{RenderItem, RenderingGroup, SortCompare};

/// Rendering group ids run from 0 to `MAX_RENDERING_GROUPS - 1`.
pub const MAX_RENDERING_GROUPS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderingGroupStage {
    PreClear,
    PreOpaque,
    PreTransparent,
    PostTransparent,
}

/// Payload of [`RenderingManager::on_rendering_group`]. Dispatches use the
/// mask `1 << group_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderingGroupInfo {
    pub group_id: u8,
    pub stage: RenderingGroupStage,
    pub camera: CameraId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub draw_calls: usize,
    pub skipped_not_ready: usize,
    pub groups_rendered: usize,
}

pub struct RenderingManager {
    groups: Vec<RenderingGroup>,
    auto_clear_depth_stencil: [bool; MAX_RENDERING_GROUPS],
    pub on_rendering_group: Observable<RenderingGroupInfo>,
}

impl std::fmt::Debug for RenderingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderingManager")
            .field("groups", &self.groups)
            .field("auto_clear_depth_stencil", &self.auto_clear_depth_stencil)
            .finish()
    }
}

impl Default for RenderingManager {
    fn default() -> Self {
        Self {
            groups: (0..MAX_RENDERING_GROUPS as u8)
                .map(RenderingGroup::new)
                .collect(),
            auto_clear_depth_stencil: [true; MAX_RENDERING_GROUPS],
            on_rendering_group: Observable::new(),
        }
    }
}

impl RenderingManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(&self, id: u8) -> Option<&RenderingGroup> {
        self.groups.get(id as usize)
    }

    /// Number of items queued across every group.
    pub fn queued(&self) -> usize {
        self.groups.iter().map(RenderingGroup::len).sum()
    }

    /// Empty every queue. Comparators and clear flags persist.
    pub fn reset(&mut self) {
        for group in &mut self.groups {
            group.clear();
        }
    }

    /// Queue an item in its rendering group. Returns false for an
    /// out-of-range group id.
    pub fn dispatch(&mut self, item: RenderItem) -> bool {
        match self.groups.get_mut(item.rendering_group as usize) {
            Some(group) => {
                group.dispatch(item);
                true
            }
            None => {
                warn!(
                    mesh = %item.mesh,
                    group = item.rendering_group,
                    "rendering group out of range"
                );
                false
            }
        }
    }

    pub fn set_rendering_order(
        &mut self,
        group_id: u8,
        opaque: Option<SortCompare>,
        alpha_test: Option<SortCompare>,
        transparent: Option<SortCompare>,
    ) -> bool {
        match self.groups.get_mut(group_id as usize) {
            Some(group) => {
                group.set_rendering_order(opaque, alpha_test, transparent);
                true
            }
            None => false,
        }
    }

    /// Whether depth and stencil are cleared before `group_id` renders.
    /// Group 0 is never cleared here; the scene clears it with the frame.
    pub fn set_rendering_auto_clear_depth_stencil(&mut self, group_id: u8, flag: bool) -> bool {
        match self.auto_clear_depth_stencil.get_mut(group_id as usize) {
            Some(slot) => {
                *slot = flag;
                true
            }
            None => false,
        }
    }

    pub fn rendering_auto_clear_depth_stencil(&self, group_id: u8) -> bool {
        self.auto_clear_depth_stencil
            .get(group_id as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Drop every queued item that references `mesh`.
    pub fn purge_mesh(&mut self, mesh: MeshId) {
        for group in &mut self.groups {
            group.purge_mesh(mesh);
        }
    }

    fn notify(&mut self, group_id: u8, stage: RenderingGroupStage, camera: CameraId) {
        let mut info = RenderingGroupInfo {
            group_id,
            stage,
            camera,
        };
        self.on_rendering_group
            .notify_observers(&mut info, 1 << group_id);
    }

    /// Draw every queued item for `camera`.
    pub fn render(&mut self, camera: CameraId, backend: &mut dyn RenderBackend) -> RenderStats {
        let mut stats = RenderStats::default();
        for index in 0..self.groups.len() {
            if self.groups[index].is_empty() {
                continue;
            }
            let id = index as u8;
            self.notify(id, RenderingGroupStage::PreClear, camera);
            if id > 0 && self.auto_clear_depth_stencil[index] {
                backend.clear(None, true, true);
            }
            self.groups[index].sort();

            self.notify(id, RenderingGroupStage::PreOpaque, camera);
            let group = &self.groups[index];
            for item in group.opaque().iter().chain(group.alpha_test()) {
                draw(item, camera, backend, &mut stats);
            }

            self.notify(id, RenderingGroupStage::PreTransparent, camera);
            let group = &self.groups[index];
            for item in group.transparent() {
                draw(item, camera, backend, &mut stats);
            }

            self.notify(id, RenderingGroupStage::PostTransparent, camera);
            stats.groups_rendered += 1;
        }
        trace!(
            %camera,
            draw_calls = stats.draw_calls,
            skipped = stats.skipped_not_ready,
            groups = stats.groups_rendered,
            "camera rendered"
        );
        stats
    }

    pub fn dispose(&mut self) {
        self.reset();
        self.on_rendering_group.clear();
    }
}

fn draw(item: &RenderItem, camera: CameraId, backend: &mut dyn RenderBackend, stats: &mut RenderStats) {
    if !item.ready {
        stats.skipped_not_ready += 1;
        return;
    }
    backend.draw(&DrawCall {
        camera,
        mesh: item.mesh,
        sub_mesh: item.sub_mesh,
        material: item.material,
        rendering_group: item.rendering_group,
        index_start: item.index_start,
        index_count: item.index_count,
        world: item.world,
    });
    stats.draw_calls += 1;
}
