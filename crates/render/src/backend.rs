use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use glam::Mat4;
use vista_common::{CameraId, Color4, MaterialId, MeshId, Viewport};

/// One indexed draw of a sub-mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub camera: CameraId,
    pub mesh: MeshId,
    pub sub_mesh: usize,
    pub material: Option<MaterialId>,
    pub rendering_group: u8,
    pub index_start: u32,
    pub index_count: u32,
    pub world: Mat4,
}

/// GPU seam. Implementations own every device resource; the scene only
/// issues commands.
pub trait RenderBackend {
    fn begin_frame(&mut self);

    fn end_frame(&mut self);

    /// Clear the bound target. `None` leaves the color buffer untouched.
    fn clear(&mut self, color: Option<Color4>, depth: bool, stencil: bool);

    fn set_viewport(&mut self, viewport: &Viewport);

    fn draw(&mut self, call: &DrawCall);

    /// Size of the render target in pixels.
    fn render_size(&self) -> (u32, u32);
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    BeginFrame,
    EndFrame,
    Clear {
        color: Option<Color4>,
        depth: bool,
        stencil: bool,
    },
    SetViewport(Viewport),
    Draw(DrawCall),
}

/// Shared view of the commands a [`RecordingBackend`] received.
pub type CommandLog = Rc<RefCell<Vec<BackendCommand>>>;

/// Backend that records commands instead of drawing.
///
/// Grab [`RecordingBackend::log`] before handing the backend to a scene to
/// keep reading what it receives.
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    log: CommandLog,
    width: u32,
    height: u32,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            width,
            height,
        }
    }

    pub fn log(&self) -> CommandLog {
        Rc::clone(&self.log)
    }

    pub fn commands(&self) -> Vec<BackendCommand> {
        self.log.borrow().clone()
    }

    pub fn draw_calls(&self) -> Vec<DrawCall> {
        draw_calls(&self.log)
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    /// Human-readable listing of the recorded commands.
    pub fn dump(&self) -> String {
        dump(&self.log)
    }
}

/// Draw calls recorded in `log`, in submission order.
pub fn draw_calls(log: &CommandLog) -> Vec<DrawCall> {
    log.borrow()
        .iter()
        .filter_map(|c| match c {
            BackendCommand::Draw(d) => Some(*d),
            _ => None,
        })
        .collect()
}

pub(crate) fn dump(log: &CommandLog) -> String {
    let commands = log.borrow();
    let mut out = String::new();
    let _ = writeln!(out, "=== Backend commands ({}) ===", commands.len());
    for command in commands.iter() {
        let _ = match command {
            BackendCommand::BeginFrame => writeln!(out, "begin_frame"),
            BackendCommand::EndFrame => writeln!(out, "end_frame"),
            BackendCommand::Clear {
                color,
                depth,
                stencil,
            } => match color {
                Some(c) => writeln!(
                    out,
                    "  clear color=({:.2}, {:.2}, {:.2}, {:.2}) depth={depth} stencil={stencil}",
                    c.r, c.g, c.b, c.a
                ),
                None => writeln!(out, "  clear depth={depth} stencil={stencil}"),
            },
            BackendCommand::SetViewport(v) => writeln!(
                out,
                "  viewport ({:.2}, {:.2}, {:.2}, {:.2})",
                v.x, v.y, v.width, v.height
            ),
            BackendCommand::Draw(d) => writeln!(
                out,
                "  draw camera={} mesh={} sub={} group={} indices={}+{}",
                d.camera, d.mesh, d.sub_mesh, d.rendering_group, d.index_start, d.index_count
            ),
        };
    }
    out
}

impl RenderBackend for RecordingBackend {
    fn begin_frame(&mut self) {
        self.log.borrow_mut().push(BackendCommand::BeginFrame);
    }

    fn end_frame(&mut self) {
        self.log.borrow_mut().push(BackendCommand::EndFrame);
    }

    fn clear(&mut self, color: Option<Color4>, depth: bool, stencil: bool) {
        self.log.borrow_mut().push(BackendCommand::Clear {
            color,
            depth,
            stencil,
        });
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.log
            .borrow_mut()
            .push(BackendCommand::SetViewport(*viewport));
    }

    fn draw(&mut self, call: &DrawCall) {
        self.log.borrow_mut().push(BackendCommand::Draw(*call));
    }

    fn render_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(mesh: u32) -> DrawCall {
        DrawCall {
            camera: CameraId(1),
            mesh: MeshId(mesh),
            sub_mesh: 0,
            material: None,
            rendering_group: 0,
            index_start: 0,
            index_count: 36,
            world: Mat4::IDENTITY,
        }
    }

    #[test]
    fn log_handle_sees_commands_after_boxing() {
        let backend = RecordingBackend::new(640, 480);
        let log = backend.log();
        let mut boxed: Box<dyn RenderBackend> = Box::new(backend);
        boxed.begin_frame();
        boxed.draw(&call(3));
        boxed.end_frame();
        assert_eq!(log.borrow().len(), 3);
        assert_eq!(draw_calls(&log), vec![call(3)]);
        assert_eq!(boxed.render_size(), (640, 480));
    }

    #[test]
    fn dump_lists_commands() {
        let mut backend = RecordingBackend::default();
        backend.clear(Some(Color4::default()), true, true);
        backend.set_viewport(&Viewport::default());
        backend.draw(&call(7));
        let text = backend.dump();
        assert!(text.contains("commands (3)"));
        assert!(text.contains("clear color="));
        assert!(text.contains("mesh=#7"));
    }

    #[test]
    fn clear_log_empties_history() {
        let mut backend = RecordingBackend::default();
        backend.begin_frame();
        backend.clear_log();
        assert!(backend.commands().is_empty());
    }
}
