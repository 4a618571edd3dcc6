//! Asset pipeline: containers of scene entities built off-scene, a JSON
//! scene description loader, and a queue that runs loads on worker threads
//! and applies their results between frames.
//!
//! # Invariants
//! - Containers never touch a scene until `add_all_to_scene` runs on the
//!   scene's thread.
//! - Every queued import resolves exactly once: success, error, or abandoned.
//! - A scene is not ready while any of its imports is in flight.

mod container;
mod description;
mod queue;

pub use container::{AddedAssets, AssetContainer, ContainerGroup, ContainerMesh, ContainerParticles};
pub use description::{
    CameraDescription, LightDescription, MaterialDescription, MeshDescription, SceneDescription,
    ShapeDescription,
};
pub use queue::{ImportConfig, ImportFailure, ImportQueue, ImportSender, ImportSuccess};

/// Errors from asset loading and the import queue.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("mesh `{mesh}` references unknown material `{material}`")]
    UnknownMaterial { mesh: String, material: String },
    #[error("loader for `{name}` failed: {reason}")]
    Loader { name: String, reason: String },
    #[error("import `{0}` ended without a result")]
    Abandoned(String),
    #[error("import queue disconnected")]
    Disconnected,
}

pub fn crate_info() -> &'static str {
    "vista-assets v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("assets"));
    }

    #[test]
    fn errors_render() {
        let err = ImportError::UnknownMaterial {
            mesh: "crate".into(),
            material: "wood".into(),
        };
        assert_eq!(err.to_string(), "mesh `crate` references unknown material `wood`");
    }
}
