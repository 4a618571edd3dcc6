use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::event::PointerButton;

/// Thresholds used to tell taps, double taps, drags and long presses apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerConfig {
    /// Pixels the pointer may travel between press and release and still tap.
    pub drag_movement_threshold: f32,
    /// Max gap between two taps of the same button for a double tap.
    pub double_click_delay_ms: f64,
    /// Min hold time for a long press.
    pub long_press_delay_ms: f64,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            drag_movement_threshold: 10.0,
            double_click_delay_ms: 300.0,
            long_press_delay_ms: 500.0,
        }
    }
}

/// How a press ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    Tap,
    DoubleTap,
    /// Moved further than the drag threshold.
    Drag,
    LongPress,
}

/// Pointer position and the state of the current press.
#[derive(Debug, Clone, Default)]
pub struct PointerState {
    untranslated: Vec2,
    surface_offset: Vec2,
    pressed: Option<PointerButton>,
    starting_position: Option<Vec2>,
    starting_time_ms: f64,
    previous_tap: Option<(f64, PointerButton)>,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position relative to the render surface.
    pub fn position(&self) -> Vec2 {
        self.untranslated - self.surface_offset
    }

    /// Position as reported by the event source.
    pub fn untranslated_position(&self) -> Vec2 {
        self.untranslated
    }

    /// Top-left of the render surface inside the event source coordinates.
    pub fn set_surface_offset(&mut self, offset: Vec2) {
        self.surface_offset = offset;
    }

    pub fn surface_offset(&self) -> Vec2 {
        self.surface_offset
    }

    pub fn update_position(&mut self, x: f32, y: f32) {
        self.untranslated = Vec2::new(x, y);
    }

    pub fn pressed_button(&self) -> Option<PointerButton> {
        self.pressed
    }

    pub fn starting_position(&self) -> Option<Vec2> {
        self.starting_position
    }

    pub fn starting_time_ms(&self) -> f64 {
        self.starting_time_ms
    }

    pub fn begin_press(&mut self, x: f32, y: f32, button: PointerButton, timestamp_ms: f64) {
        self.update_position(x, y);
        self.pressed = Some(button);
        self.starting_position = Some(self.position());
        self.starting_time_ms = timestamp_ms;
    }

    /// True while pressed and moved past the drag threshold.
    pub fn is_pointer_swiping(&self, config: &PointerConfig) -> bool {
        match self.starting_position {
            Some(start) if self.pressed.is_some() => {
                start.distance(self.position()) > config.drag_movement_threshold
            }
            _ => false,
        }
    }

    /// Classify the press that ends at (`x`, `y`). A release without a
    /// matching press counts as a drag.
    pub fn end_press(
        &mut self,
        x: f32,
        y: f32,
        button: PointerButton,
        timestamp_ms: f64,
        config: &PointerConfig,
    ) -> ClickKind {
        self.update_position(x, y);
        let kind = if self.pressed.is_none() || self.is_pointer_swiping(config) {
            ClickKind::Drag
        } else if timestamp_ms - self.starting_time_ms >= config.long_press_delay_ms {
            ClickKind::LongPress
        } else {
            match self.previous_tap {
                Some((t, b))
                    if b == button && timestamp_ms - t <= config.double_click_delay_ms =>
                {
                    ClickKind::DoubleTap
                }
                _ => ClickKind::Tap,
            }
        };
        self.previous_tap = match kind {
            ClickKind::Tap => Some((timestamp_ms, button)),
            _ => None,
        };
        self.pressed = None;
        self.starting_position = None;
        trace!(?kind, ?button, "press classified");
        kind
    }

    pub fn reset(&mut self) {
        *self = Self {
            surface_offset: self.surface_offset,
            ..Self::default()
        };
    }
}
