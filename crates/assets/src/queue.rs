//! Background imports. Loaders run on worker threads and post their
//! containers to a channel; the scene thread drains it between frames.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::{debug, info_span, warn};
use vista_common::{AnimationGroupId, MeshId, ParticleSystemId, SkeletonId};
use vista_kernel::Scene;

use crate::ImportError;
use crate::container::AssetContainer;

/// Called with the handles of the meshes, particle systems, skeletons and
/// animation groups a finished import added.
pub type ImportSuccess =
    Box<dyn FnOnce(&[MeshId], &[ParticleSystemId], &[SkeletonId], &[AnimationGroupId])>;
pub type ImportFailure = Box<dyn FnOnce(&ImportError)>;

#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Maximum number of finished imports applied per drain.
    pub load_budget: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { load_budget: 4 }
    }
}

struct Completed {
    request: u64,
    result: Result<AssetContainer, ImportError>,
}

struct PendingImport {
    name: String,
    pending_key: String,
    on_success: Option<ImportSuccess>,
    on_error: Option<ImportFailure>,
}

/// Delivers the result of one import to its queue from any thread.
///
/// Dropping it unsent (including while a loader unwinds) reports the import
/// as abandoned.
pub struct ImportSender {
    request: u64,
    name: String,
    tx: Option<Sender<Completed>>,
}

impl ImportSender {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn send(mut self, result: Result<AssetContainer, ImportError>) -> Result<(), ImportError> {
        let tx = self.tx.take().ok_or(ImportError::Disconnected)?;
        tx.send(Completed {
            request: self.request,
            result,
        })
        .map_err(|_| ImportError::Disconnected)
    }
}

impl Drop for ImportSender {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Completed {
                request: self.request,
                result: Err(ImportError::Abandoned(self.name.clone())),
            });
        }
    }
}

/// Queue of in-flight imports for one scene.
pub struct ImportQueue {
    pub config: ImportConfig,
    tx: Sender<Completed>,
    rx: Receiver<Completed>,
    pending: BTreeMap<u64, PendingImport>,
    next_request: u64,
}

impl Default for ImportQueue {
    fn default() -> Self {
        Self::new(ImportConfig::default())
    }
}

impl ImportQueue {
    pub fn new(config: ImportConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            config,
            tx,
            rx,
            pending: BTreeMap::new(),
            next_request: 0,
        }
    }

    /// Number of imports that have not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Register an import and return the sender its producer must use.
    /// The scene stays not-ready until the result is drained.
    pub fn begin(
        &mut self,
        scene: &mut Scene,
        name: impl Into<String>,
        on_success: Option<ImportSuccess>,
        on_error: Option<ImportFailure>,
    ) -> ImportSender {
        let name = name.into();
        self.next_request += 1;
        let request = self.next_request;
        let pending_key = format!("import:{request}:{name}");
        scene.add_pending_data(pending_key.clone());
        self.pending.insert(
            request,
            PendingImport {
                name: name.clone(),
                pending_key,
                on_success,
                on_error,
            },
        );
        debug!(import = %name, request, "import queued");
        ImportSender {
            request,
            name,
            tx: Some(self.tx.clone()),
        }
    }

    /// Run `loader` on a worker thread.
    pub fn load<F>(
        &mut self,
        scene: &mut Scene,
        name: impl Into<String>,
        loader: F,
        on_success: Option<ImportSuccess>,
        on_error: Option<ImportFailure>,
    ) -> Result<(), ImportError>
    where
        F: FnOnce() -> Result<AssetContainer, ImportError> + Send + 'static,
    {
        let sender = self.begin(scene, name, on_success, on_error);
        let thread_name = format!("import-{}", sender.name());
        thread::Builder::new().name(thread_name).spawn(move || {
            let result = loader();
            if sender.send(result).is_err() {
                debug!("import queue dropped before the load finished");
            }
        })?;
        Ok(())
    }

    /// Apply up to `load_budget` finished imports to `scene`. Returns how many
    /// were applied, failures included.
    pub fn drain(&mut self, scene: &mut Scene) -> usize {
        let _span = info_span!("import_drain", in_flight = self.pending.len()).entered();
        let mut applied = 0;
        while applied < self.config.load_budget {
            let Ok(done) = self.rx.try_recv() else {
                break;
            };
            let Some(pending) = self.pending.remove(&done.request) else {
                warn!(request = done.request, "result for an unknown import");
                continue;
            };
            Self::apply(scene, pending, done.result);
            applied += 1;
        }
        applied
    }

    fn apply(scene: &mut Scene, pending: PendingImport, result: Result<AssetContainer, ImportError>) {
        scene.remove_pending_data(&pending.pending_key);
        if scene.is_disposed() {
            warn!(import = %pending.name, "scene disposed, import discarded");
            return;
        }
        match result {
            Ok(container) => {
                let added = container.add_all_to_scene(scene);
                debug!(import = %pending.name, meshes = added.meshes.len(), "import applied");
                if let Some(cb) = pending.on_success {
                    cb(
                        &added.meshes,
                        &added.particle_systems,
                        &added.skeletons,
                        &added.animation_groups,
                    );
                }
            }
            Err(err) => {
                warn!(import = %pending.name, error = %err, "import failed");
                if let Some(cb) = pending.on_error {
                    cb(&err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;
    use vista_kernel::{Mesh, VertexData};
    use vista_render::RecordingBackend;

    use crate::container::ContainerMesh;

    fn scene() -> Scene {
        Scene::new(Box::new(RecordingBackend::new(64, 64)))
    }

    fn one_box(name: &str) -> AssetContainer {
        let mut container = AssetContainer::new();
        container
            .meshes
            .push(ContainerMesh::new(Mesh::new(name)).with_vertex_data(VertexData::create_box(1.0)));
        container
    }

    fn drain_until_applied(queue: &mut ImportQueue, scene: &mut Scene) -> usize {
        for _ in 0..400 {
            let n = queue.drain(scene);
            if n > 0 {
                return n;
            }
            thread::sleep(Duration::from_millis(5));
        }
        0
    }

    #[test]
    fn threaded_load_reaches_the_scene() {
        let mut scene = scene();
        let mut queue = ImportQueue::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        queue
            .load(
                &mut scene,
                "crate",
                || Ok(one_box("crate")),
                Some(Box::new(move |meshes, particles, skeletons, groups| {
                    s.borrow_mut().extend_from_slice(meshes);
                    assert!(particles.is_empty() && skeletons.is_empty() && groups.is_empty());
                })),
                None,
            )
            .unwrap();
        assert!(!scene.is_ready());
        assert_eq!(drain_until_applied(&mut queue, &mut scene), 1);
        assert!(queue.is_idle());
        assert!(scene.is_ready());
        let ids = seen.borrow();
        assert_eq!(ids.len(), 1);
        assert_eq!(scene.get_mesh_by_unique_id(ids[0]).unwrap().name, "crate");
    }

    #[test]
    fn loader_errors_reach_on_error() {
        let mut scene = scene();
        let mut queue = ImportQueue::default();
        let failed = Rc::new(RefCell::new(None));
        let f = failed.clone();
        queue
            .load(
                &mut scene,
                "broken",
                || {
                    Err(ImportError::Loader {
                        name: "broken".into(),
                        reason: "truncated".into(),
                    })
                },
                None,
                Some(Box::new(move |err| *f.borrow_mut() = Some(err.to_string()))),
            )
            .unwrap();
        assert_eq!(drain_until_applied(&mut queue, &mut scene), 1);
        assert_eq!(
            failed.borrow().as_deref(),
            Some("loader for `broken` failed: truncated")
        );
        assert!(scene.meshes().is_empty());
        assert_eq!(scene.pending_data_count(), 0);
    }

    #[test]
    fn dropped_sender_is_abandoned() {
        let mut scene = scene();
        let mut queue = ImportQueue::default();
        let abandoned = Rc::new(RefCell::new(false));
        let a = abandoned.clone();
        let sender = queue.begin(
            &mut scene,
            "ghost",
            None,
            Some(Box::new(move |err| {
                *a.borrow_mut() = matches!(err, ImportError::Abandoned(name) if name == "ghost");
            })),
        );
        drop(sender);
        assert_eq!(queue.drain(&mut scene), 1);
        assert!(*abandoned.borrow());
    }

    #[test]
    fn drain_respects_the_budget() {
        let mut scene = scene();
        let mut queue = ImportQueue::new(ImportConfig { load_budget: 4 });
        for i in 0..6 {
            let sender = queue.begin(&mut scene, format!("m{i}"), None, None);
            sender.send(Ok(one_box(&format!("m{i}")))).unwrap();
        }
        assert_eq!(queue.in_flight(), 6);
        assert_eq!(queue.drain(&mut scene), 4);
        assert_eq!(scene.meshes().len(), 4);
        assert_eq!(queue.drain(&mut scene), 2);
        assert_eq!(queue.drain(&mut scene), 0);
        assert_eq!(scene.meshes().len(), 6);
    }

    #[test]
    fn disposed_scene_discards_results() {
        let mut scene = scene();
        let mut queue = ImportQueue::default();
        let sender = queue.begin(&mut scene, "late", None, None);
        scene.dispose();
        sender.send(Ok(one_box("late"))).unwrap();
        assert_eq!(queue.drain(&mut scene), 1);
        assert!(scene.meshes().is_empty());
    }

    #[test]
    fn sending_after_the_queue_is_gone_fails() {
        let mut scene = scene();
        let mut queue = ImportQueue::default();
        let sender = queue.begin(&mut scene, "orphan", None, None);
        drop(queue);
        assert!(matches!(sender.send(Ok(AssetContainer::new())), Err(ImportError::Disconnected)));
    }
}
