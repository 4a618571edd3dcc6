use serde::{Deserialize, Serialize};

/// Bit values used as observer masks for pointer notifications.
#[derive(Debug, Clone, Copy)]
pub struct PointerEventTypes;

impl PointerEventTypes {
    pub const DOWN: u32 = 0x01;
    pub const UP: u32 = 0x02;
    pub const MOVE: u32 = 0x04;
    pub const WHEEL: u32 = 0x08;
    pub const PICK: u32 = 0x10;
    pub const TAP: u32 = 0x20;
    pub const DOUBLE_TAP: u32 = 0x40;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PointerButton {
    #[default]
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerEventKind {
    Down,
    Up,
    Move,
    Wheel,
}

impl PointerEventKind {
    /// The [`PointerEventTypes`] bit of this kind.
    pub fn mask(self) -> u32 {
        match self {
            PointerEventKind::Down => PointerEventTypes::DOWN,
            PointerEventKind::Up => PointerEventTypes::UP,
            PointerEventKind::Move => PointerEventTypes::MOVE,
            PointerEventKind::Wheel => PointerEventTypes::WHEEL,
        }
    }
}

/// A raw pointer event in render-surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub x: f32,
    pub y: f32,
    pub button: PointerButton,
    pub pointer_id: u32,
    pub timestamp_ms: f64,
    pub wheel_delta: f32,
}

impl PointerEvent {
    pub fn new(kind: PointerEventKind, x: f32, y: f32, timestamp_ms: f64) -> Self {
        Self {
            kind,
            x,
            y,
            button: PointerButton::Left,
            pointer_id: 0,
            timestamp_ms,
            wheel_delta: 0.0,
        }
    }

    pub fn down(x: f32, y: f32, timestamp_ms: f64) -> Self {
        Self::new(PointerEventKind::Down, x, y, timestamp_ms)
    }

    pub fn up(x: f32, y: f32, timestamp_ms: f64) -> Self {
        Self::new(PointerEventKind::Up, x, y, timestamp_ms)
    }

    pub fn moved(x: f32, y: f32, timestamp_ms: f64) -> Self {
        Self::new(PointerEventKind::Move, x, y, timestamp_ms)
    }

    pub fn wheel(x: f32, y: f32, delta: f32, timestamp_ms: f64) -> Self {
        Self {
            wheel_delta: delta,
            ..Self::new(PointerEventKind::Wheel, x, y, timestamp_ms)
        }
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KeyboardEventTypes;

impl KeyboardEventTypes {
    pub const KEY_DOWN: u32 = 0x01;
    pub const KEY_UP: u32 = 0x02;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyboardEventKind {
    KeyDown,
    KeyUp,
}

impl KeyboardEventKind {
    pub fn mask(self) -> u32 {
        match self {
            KeyboardEventKind::KeyDown => KeyboardEventTypes::KEY_DOWN,
            KeyboardEventKind::KeyUp => KeyboardEventTypes::KEY_UP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardEvent {
    pub kind: KeyboardEventKind,
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyboardEvent {
    pub fn new(kind: KeyboardEventKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            ctrl: false,
            shift: false,
            alt: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_are_distinct_bits() {
        let all = [
            PointerEventTypes::DOWN,
            PointerEventTypes::UP,
            PointerEventTypes::MOVE,
            PointerEventTypes::WHEEL,
            PointerEventTypes::PICK,
            PointerEventTypes::TAP,
            PointerEventTypes::DOUBLE_TAP,
        ];
        let combined = all.iter().fold(0, |acc, m| {
            assert_eq!(acc & m, 0);
            acc | m
        });
        assert_eq!(combined, 0x7f);
    }

    #[test]
    fn kind_masks_match_types() {
        assert_eq!(PointerEventKind::Wheel.mask(), PointerEventTypes::WHEEL);
        assert_eq!(KeyboardEventKind::KeyUp.mask(), KeyboardEventTypes::KEY_UP);
    }

    #[test]
    fn constructors_fill_defaults() {
        let e = PointerEvent::wheel(1.0, 2.0, -3.0, 10.0).with_button(PointerButton::Middle);
        assert_eq!(e.kind, PointerEventKind::Wheel);
        assert_eq!(e.wheel_delta, -3.0);
        assert_eq!(e.button, PointerButton::Middle);
        let k = KeyboardEvent::new(KeyboardEventKind::KeyDown, "a");
        assert!(!k.ctrl);
    }
}
