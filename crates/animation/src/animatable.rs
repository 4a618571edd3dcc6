use vista_common::{AnimatableId, TargetId};

use crate::animation::{Animation, AnimationLoopMode, AnimationValue};

/// Anything whose properties an animation can write.
pub trait AnimationTarget {
    /// Write `value` to `property`. Returns false for unknown properties.
    fn set_animated_value(&mut self, property: &str, value: &AnimationValue) -> bool;

    fn animated_value(&self, property: &str) -> Option<AnimationValue>;
}

/// Maps target handles to live objects during a scheduler tick.
pub trait TargetResolver {
    fn resolve(&mut self, target: TargetId) -> Option<&mut dyn AnimationTarget>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatableState {
    Running,
    Paused,
    /// Terminal.
    Stopped,
}

/// One animation curve inside an animatable run.
#[derive(Debug, Clone)]
pub struct RuntimeAnimation {
    animation: Animation,
    current_frame: f32,
    current_value: Option<AnimationValue>,
}

impl RuntimeAnimation {
    pub fn new(animation: Animation) -> Self {
        Self {
            animation,
            current_frame: 0.0,
            current_value: None,
        }
    }

    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    pub fn current_frame(&self) -> f32 {
        self.current_frame
    }

    pub fn current_value(&self) -> Option<AnimationValue> {
        self.current_value
    }

    /// Advance to `elapsed_ms` after the run started and write the value.
    /// Returns false once a non-looping run has passed its end frame.
    fn animate(
        &mut self,
        elapsed_ms: f64,
        from: f32,
        to: f32,
        looping: bool,
        speed_ratio: f32,
        target: &mut dyn AnimationTarget,
    ) -> bool {
        let anim = &self.animation;
        if anim.keys().is_empty() {
            return false;
        }
        let first = anim.first_frame();
        let last = anim.last_frame();
        let from = if from < first || from > last { first } else { from };
        let to = if to < first || to > last { last } else { to };
        // A negative speed ratio runs the range from its end back to its start.
        let (from, to) = if speed_ratio < 0.0 { (to, from) } else { (from, to) };
        let forward = to >= from;
        let range = (to - from).abs();
        let ratio = (elapsed_ms * f64::from(anim.frames_per_second * speed_ratio.abs()) / 1000.0) as f32;

        let mut running = true;
        let mut repeat_count = 0u32;
        let mut offset = None;
        let mut high_limit = None;
        let frame;

        if range <= 0.0 {
            frame = from;
            running = looping;
        } else if ratio > range && !looping {
            running = false;
            frame = to;
        } else {
            if anim.loop_mode != AnimationLoopMode::Cycle {
                let from_value = anim.evaluate(from);
                let to_value = anim.evaluate(to);
                if let (Some(fv), Some(tv)) = (from_value, to_value) {
                    match anim.loop_mode {
                        AnimationLoopMode::Relative => offset = Some(tv.subtract(&fv)),
                        AnimationLoopMode::Constant => high_limit = Some(tv),
                        AnimationLoopMode::Cycle => {}
                    }
                }
            }
            repeat_count = (ratio / range).floor() as u32;
            let progress = ratio % range;
            frame = if forward { from + progress } else { from - progress };
        }

        let value = anim.interpolate(frame, repeat_count, offset.as_ref(), high_limit.as_ref());
        if let Some(v) = value {
            target.set_animated_value(&anim.target_property, &v);
        }
        self.current_frame = frame;
        self.current_value = value;
        running
    }
}

/// A running instance of one or more animations bound to a target.
pub struct Animatable {
    id: AnimatableId,
    target: TargetId,
    from_frame: f32,
    to_frame: f32,
    pub loop_animation: bool,
    speed_ratio: f32,
    state: AnimatableState,
    runtime_animations: Vec<RuntimeAnimation>,
    local_delay_offset: Option<f64>,
    paused_delay: Option<f64>,
    on_animation_end: Option<Box<dyn FnOnce()>>,
}

impl std::fmt::Debug for Animatable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animatable")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("from_frame", &self.from_frame)
            .field("to_frame", &self.to_frame)
            .field("loop_animation", &self.loop_animation)
            .field("speed_ratio", &self.speed_ratio)
            .field("state", &self.state)
            .field("animations", &self.runtime_animations.len())
            .finish()
    }
}

impl Animatable {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: AnimatableId,
        target: TargetId,
        animations: Vec<Animation>,
        from_frame: f32,
        to_frame: f32,
        loop_animation: bool,
        speed_ratio: f32,
        on_animation_end: Option<Box<dyn FnOnce()>>,
    ) -> Self {
        let runtime_animations = animations
            .into_iter()
            .map(|a| {
                let mut rt = RuntimeAnimation::new(a);
                rt.current_frame = from_frame;
                rt
            })
            .collect();
        Self {
            id,
            target,
            from_frame,
            to_frame,
            loop_animation,
            speed_ratio,
            state: AnimatableState::Running,
            runtime_animations,
            local_delay_offset: None,
            paused_delay: None,
            on_animation_end,
        }
    }

    pub fn id(&self) -> AnimatableId {
        self.id
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn state(&self) -> AnimatableState {
        self.state
    }

    pub fn from_frame(&self) -> f32 {
        self.from_frame
    }

    pub fn to_frame(&self) -> f32 {
        self.to_frame
    }

    pub fn speed_ratio(&self) -> f32 {
        self.speed_ratio
    }

    /// Takes effect on the next tick. The frame is recomputed from the new
    /// ratio, so large changes jump.
    pub fn set_speed_ratio(&mut self, speed_ratio: f32) {
        self.speed_ratio = speed_ratio;
    }

    pub fn runtime_animations(&self) -> &[RuntimeAnimation] {
        &self.runtime_animations
    }

    pub fn has_animation(&self, name: &str) -> bool {
        self.runtime_animations
            .iter()
            .any(|rt| rt.animation.name == name)
    }

    /// Frame of the first animation, or the start frame when empty.
    pub fn master_frame(&self) -> f32 {
        self.runtime_animations
            .first()
            .map_or(self.from_frame, |rt| rt.current_frame)
    }

    pub fn pause(&mut self) {
        if self.state == AnimatableState::Running {
            self.state = AnimatableState::Paused;
        }
    }

    /// Resume after `pause`. Time spent paused is not counted.
    pub fn restart(&mut self) {
        if self.state == AnimatableState::Paused {
            self.state = AnimatableState::Running;
        }
    }

    /// Start over from the first frame on the next tick.
    pub fn reset(&mut self) {
        self.local_delay_offset = None;
        self.paused_delay = None;
        for rt in &mut self.runtime_animations {
            rt.current_frame = self.from_frame;
            rt.current_value = None;
        }
    }

    /// Jump to `frame`; later ticks continue from there.
    pub fn go_to_frame(&mut self, frame: f32) {
        if let Some(rt) = self.runtime_animations.first() {
            let rate = rt.animation.frames_per_second * self.speed_ratio.abs();
            if rate > 0.0 {
                let delta_frames = if self.speed_ratio < 0.0 {
                    rt.current_frame - frame
                } else {
                    frame - rt.current_frame
                };
                let delay = f64::from(delta_frames) * 1000.0 / f64::from(rate);
                if let Some(offset) = self.local_delay_offset.as_mut() {
                    *offset -= delay;
                }
            }
        }
        for rt in &mut self.runtime_animations {
            rt.current_frame = frame;
        }
    }

    /// Drop the animations called `name`. Returns true when none remain.
    pub(crate) fn remove_animations_named(&mut self, name: &str) -> bool {
        self.runtime_animations.retain(|rt| rt.animation.name != name);
        self.runtime_animations.is_empty()
    }

    pub(crate) fn take_on_end(&mut self) -> Option<Box<dyn FnOnce()>> {
        self.on_animation_end.take()
    }

    pub(crate) fn mark_stopped(&mut self) {
        self.state = AnimatableState::Stopped;
    }

    /// Advance to the scene animation clock `delay_ms`.
    /// Returns false once every animation has finished.
    pub(crate) fn animate(&mut self, delay_ms: f64, target: &mut dyn AnimationTarget) -> bool {
        match self.state {
            AnimatableState::Stopped => return false,
            AnimatableState::Paused => {
                if self.paused_delay.is_none() {
                    self.paused_delay = Some(delay_ms);
                }
                return true;
            }
            AnimatableState::Running => {}
        }
        match (self.local_delay_offset, self.paused_delay.take()) {
            (None, _) => self.local_delay_offset = Some(delay_ms),
            (Some(offset), Some(paused)) => {
                self.local_delay_offset = Some(offset + (delay_ms - paused));
            }
            (Some(_), None) => {}
        }
        let elapsed = delay_ms - self.local_delay_offset.unwrap_or(delay_ms);

        let mut running = false;
        for rt in &mut self.runtime_animations {
            running |= rt.animate(
                elapsed,
                self.from_frame,
                self.to_frame,
                self.loop_animation,
                self.speed_ratio,
                target,
            );
        }
        if !running {
            self.state = AnimatableState::Stopped;
        }
        running
    }
}
