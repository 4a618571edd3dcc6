use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec3;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vista_animation::{Animation, AnimationKey, AnimationLoopMode, AnimationValue};
use vista_assets::{ImportQueue, SceneDescription};
use vista_common::MeshId;
use vista_input::{PointerButton, PointerEventTypes};
use vista_kernel::{Scene, SceneConfig};
use vista_physics::{ImpostorShape, PhysicsImpostorParameters};
use vista_render::{CommandLog, RecordingBackend, draw_calls};
use vista_tools::SceneInspector;

#[derive(Parser)]
#[command(name = "vista-cli", about = "Headless driver for vista scenes")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene configuration file (JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version and crate info
    Info,
    /// Render frames into the recording backend and print statistics
    Run {
        /// Number of frames to render
        #[arg(short, long, default_value = "60")]
        frames: u32,
        /// Simulated frame time in milliseconds
        #[arg(long, default_value = "16")]
        frame_ms: u64,
        /// Scene description to import instead of the demo scene
        #[arg(short, long)]
        scene: Option<PathBuf>,
        /// Drop the demo boxes under physics
        #[arg(long)]
        physics: bool,
        /// Write the inspector report as JSON
        #[arg(short, long)]
        report: Option<PathBuf>,
    },
    /// Pick at a pixel and simulate a click there
    Pick {
        x: f32,
        y: f32,
        /// Scene description to import instead of the demo scene
        #[arg(short, long)]
        scene: Option<PathBuf>,
    },
}

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("loading scene config {}", path.display()))?,
        None => SceneConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("vista-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", vista_common::crate_info());
            println!("spatial: {}", vista_spatial::crate_info());
            println!("animation: {}", vista_animation::crate_info());
            println!("render: {}", vista_render::crate_info());
            println!("input: {}", vista_input::crate_info());
            println!("physics: {}", vista_physics::crate_info());
            println!("kernel: {}", vista_kernel::crate_info());
            println!("assets: {}", vista_assets::crate_info());
            println!("tools: {}", vista_tools::crate_info());
        }
        Commands::Run {
            frames,
            frame_ms,
            scene: scene_path,
            physics,
            report,
        } => {
            let (mut scene, log) = build_scene(config, scene_path.as_deref())?;
            if physics {
                enable_demo_physics(&mut scene)?;
            }
            let ended = Rc::new(Cell::new(0u32));
            let e = ended.clone();
            scene
                .observables
                .on_animation_group_end
                .add(move |_, _| e.set(e.get() + 1));

            let started = Instant::now();
            let mut last_draws = 0;
            for _ in 0..frames {
                log.borrow_mut().clear();
                scene.render_with_delta(Duration::from_millis(frame_ms));
                last_draws = draw_calls(&log).len();
            }
            info!(
                frames,
                wall_ms = started.elapsed().as_secs_f64() * 1000.0,
                "run finished"
            );

            println!("{}", SceneInspector::summary(&scene));
            println!("{}", SceneInspector::perf(&scene));
            println!("draw calls (last frame): {last_draws}");
            println!("animation groups ended: {}", ended.get());
            for mesh in SceneInspector::list_meshes(&scene) {
                println!("  {mesh}");
            }
            if let Some(path) = report {
                SceneInspector::save_json(&scene, &path)
                    .with_context(|| format!("writing report {}", path.display()))?;
                println!("report written to {}", path.display());
            }
        }
        Commands::Pick {
            x,
            y,
            scene: scene_path,
        } => {
            let (mut scene, _log) = build_scene(config, scene_path.as_deref())?;
            scene.render_with_delta(Duration::from_millis(16));

            let hit = scene.pick(x, y, None, false, None);
            match hit.picked_mesh.and_then(|id| scene.get_mesh_by_unique_id(id)) {
                Some(mesh) if hit.hit => println!(
                    "hit '{}' at distance {:.3}, point ({:.2}, {:.2}, {:.2}), face {:?}",
                    mesh.name,
                    hit.distance,
                    hit.picked_point.unwrap_or_default().x,
                    hit.picked_point.unwrap_or_default().y,
                    hit.picked_point.unwrap_or_default().z,
                    hit.face_id
                ),
                _ => println!("no hit at ({x}, {y})"),
            }
            for info in scene.multi_pick(x, y, None, None) {
                if let Some(mesh) = info.picked_mesh.and_then(|id| scene.get_mesh_by_unique_id(id)) {
                    println!("  through '{}' at {:.3}", mesh.name, info.distance);
                }
            }

            let taps = Rc::new(Cell::new(0u32));
            let t = taps.clone();
            scene
                .observables
                .on_pointer
                .add_with_mask(PointerEventTypes::TAP, move |_, _| t.set(t.get() + 1));
            scene.simulate_pointer_move(x, y);
            scene.simulate_pointer_down(x, y, PointerButton::Left);
            scene.simulate_pointer_up(x, y, PointerButton::Left);
            println!(
                "pointer over: {}, taps: {}",
                scene
                    .pointer_over_mesh()
                    .and_then(|id| scene.get_mesh_by_unique_id(id))
                    .map_or("none", |m| m.name.as_str()),
                taps.get()
            );
        }
    }

    Ok(())
}

/// Scene on a recording backend, filled from `description` or the demo.
fn build_scene(config: SceneConfig, description: Option<&Path>) -> anyhow::Result<(Scene, CommandLog)> {
    config.validate().context("invalid scene config")?;
    let backend = RecordingBackend::new(WIDTH, HEIGHT);
    let log = backend.log();
    let mut scene = Scene::with_config(Box::new(backend), config);

    match description {
        Some(path) => import_description(&mut scene, path)?,
        None => populate_demo(&mut scene),
    }
    scene.create_default_camera_or_light(false);
    Ok((scene, log))
}

fn import_description(scene: &mut Scene, path: &Path) -> anyhow::Result<()> {
    let mut queue = ImportQueue::default();
    let owned = path.to_path_buf();
    let failure = Rc::new(Cell::new(false));
    let f = failure.clone();
    queue.load(
        scene,
        path.display().to_string(),
        move || SceneDescription::load(&owned)?.into_container(),
        Some(Box::new(|meshes, _, _, _| {
            info!(meshes = meshes.len(), "scene description imported");
        })),
        Some(Box::new(move |err| {
            warn!(error = %err, "scene description import failed");
            f.set(true);
        })),
    )?;

    let deadline = Instant::now() + Duration::from_secs(10);
    while !queue.is_idle() {
        queue.drain(scene);
        if Instant::now() > deadline {
            anyhow::bail!("timed out importing {}", path.display());
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    if failure.get() {
        anyhow::bail!("could not import {}", path.display());
    }
    Ok(())
}

/// Ground plus a row of boxes bobbing on a looping animation.
fn populate_demo(scene: &mut Scene) {
    scene.create_ground("ground", 20.0, 20.0, 4);
    let bob = Animation::new("bob", "position.y", 30.0, AnimationLoopMode::Cycle).with_keys(vec![
        AnimationKey::new(0.0, AnimationValue::Float(0.5)),
        AnimationKey::new(15.0, AnimationValue::Float(2.0)),
        AnimationKey::new(30.0, AnimationValue::Float(0.5)),
    ]);
    for i in 0..5 {
        let id = scene.create_box(&format!("box{i}"), 1.0);
        if let Some(mesh) = scene.mesh_mut(id) {
            mesh.set_position(Vec3::new(i as f32 * 2.0 - 4.0, 0.5, 0.0));
            mesh.tags.add_tags("demo box");
        }
        scene.begin_direct_animation(id, vec![bob.clone()], 0.0, 30.0, true, 1.0 + i as f32 * 0.25, None);
    }
}

fn enable_demo_physics(scene: &mut Scene) -> anyhow::Result<()> {
    scene.enable_physics(None, None)?;
    let boxes: Vec<MeshId> = scene
        .get_meshes_by_tags("box")
        .iter()
        .map(|m| m.unique_id())
        .collect();
    for id in boxes {
        scene.stop_animation(id, None);
        scene.set_physics_impostor(id, ImpostorShape::Box, PhysicsImpostorParameters::default());
    }
    if let Some(ground) = scene.get_mesh_by_name("ground").map(|m| m.unique_id()) {
        scene.set_physics_impostor(
            ground,
            ImpostorShape::Plane,
            PhysicsImpostorParameters {
                mass: 0.0,
                ..PhysicsImpostorParameters::default()
            },
        );
    }
    Ok(())
}
