//! Developer tooling: a read-only scene inspector with summaries, per-mesh
//! details, performance snapshots and JSON export.
//!
//! # Invariants
//! - Tools never mutate the scene they inspect.

mod inspector;

pub use inspector::{InspectorError, MeshInfo, PerfSnapshot, SceneInspector, SceneReport, SceneSummary};

pub fn crate_info() -> &'static str {
    "vista-tools v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("tools"));
    }
}
