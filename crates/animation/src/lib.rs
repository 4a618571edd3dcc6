//! Keyframe animation for the vista scene core: animation curves, easing
//! functions, the animatable state machine and animation groups.
//!
//! # Invariants
//! - An animatable moves Running -> Paused -> Running freely; Stopped is
//!   terminal.
//! - End callbacks fire exactly once, after the tick that ended them.
//! - Targets are resolved through handles each tick; nothing here holds a
//!   reference to a scene object between ticks.

mod animatable;
mod animation;
mod easing;
mod group;
mod scheduler;

pub use animatable::{
    Animatable, AnimatableState, AnimationTarget, RuntimeAnimation, TargetResolver,
};
pub use animation::{Animation, AnimationKey, AnimationLoopMode, AnimationValue};
pub use easing::{EasingFunction, EasingKind, EasingMode, bezier_interpolate};
pub use group::{AnimationGroup, TargetedAnimation};
pub use scheduler::AnimationScheduler;

pub fn crate_info() -> &'static str {
    "vista-animation v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("animation"));
    }
}
