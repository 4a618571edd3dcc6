//! Rendering manager: partitions active sub-meshes into rendering groups and
//! drives a backend through them in a fixed order.
//!
//! # Invariants
//! - Render queues hold handles only and are rebuilt every frame.
//! - Groups render in ascending id order; empty groups are skipped.
//! - The manager never mutates scene state; it only reads queued items.
//!
//! The GPU sits behind [`RenderBackend`]. [`RecordingBackend`] records
//! commands instead of drawing and backs headless runs and tests.

mod backend;
mod group;
mod manager;

pub use backend::{
    BackendCommand, CommandLog, DrawCall, RecordingBackend, RenderBackend, draw_calls,
};
pub use group::{RenderItem, RenderPass, RenderingGroup, SortCompare};
pub use manager::{
    MAX_RENDERING_GROUPS, RenderStats, RenderingGroupInfo, RenderingGroupStage, RenderingManager,
};

pub fn crate_info() -> &'static str {
    "vista-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
