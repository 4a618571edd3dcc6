//! Input events for the vista scene core.
//!
//! # Invariants
//! - Events are plain values; the scene decides what they hit.
//! - Click classification depends only on positions, timestamps and the
//!   configured thresholds, never on wall-clock reads.

pub mod event;
pub mod pointer;

pub use event::{
    KeyboardEvent, KeyboardEventKind, KeyboardEventTypes, PointerButton, PointerEvent,
    PointerEventKind, PointerEventTypes,
};
pub use pointer::{ClickKind, PointerConfig, PointerState};

pub fn crate_info() -> &'static str {
    "vista-input v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("input"));
    }
}
