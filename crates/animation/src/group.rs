use tracing::debug;
use vista_common::{AnimatableId, AnimationGroupId, TargetId};

use crate::animation::Animation;
use crate::scheduler::AnimationScheduler;

#[derive(Debug, Clone)]
pub struct TargetedAnimation {
    pub animation: Animation,
    pub target: TargetId,
}

/// A set of animations on different targets started and stopped together.
#[derive(Debug, Clone)]
pub struct AnimationGroup {
    unique_id: AnimationGroupId,
    pub name: String,
    targeted: Vec<TargetedAnimation>,
    from: f32,
    to: f32,
    is_started: bool,
    speed_ratio: f32,
    loop_animation: bool,
    animatables: Vec<AnimatableId>,
}

impl AnimationGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            unique_id: AnimationGroupId(0),
            name: name.into(),
            targeted: Vec::new(),
            from: f32::MAX,
            to: f32::MIN,
            is_started: false,
            speed_ratio: 1.0,
            loop_animation: false,
            animatables: Vec::new(),
        }
    }

    pub fn unique_id(&self) -> AnimationGroupId {
        self.unique_id
    }

    /// Assigned by the owning scene.
    pub fn set_unique_id(&mut self, id: AnimationGroupId) {
        self.unique_id = id;
    }

    /// Add an animation; the group range widens to cover its keys.
    pub fn add_targeted_animation(&mut self, animation: Animation, target: impl Into<TargetId>) {
        self.from = self.from.min(animation.first_frame());
        self.to = self.to.max(animation.last_frame());
        self.targeted.push(TargetedAnimation {
            animation,
            target: target.into(),
        });
    }

    pub fn targeted_animations(&self) -> &[TargetedAnimation] {
        &self.targeted
    }

    pub fn targeted_animations_mut(&mut self) -> &mut Vec<TargetedAnimation> {
        &mut self.targeted
    }

    pub fn from_frame(&self) -> f32 {
        if self.targeted.is_empty() { 0.0 } else { self.from }
    }

    pub fn to_frame(&self) -> f32 {
        if self.targeted.is_empty() { 0.0 } else { self.to }
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }

    pub fn speed_ratio(&self) -> f32 {
        self.speed_ratio
    }

    pub fn loop_animation(&self) -> bool {
        self.loop_animation
    }

    pub fn animatables(&self) -> &[AnimatableId] {
        &self.animatables
    }

    /// Start every targeted animation. Returns false when already started or
    /// empty.
    pub fn start(
        &mut self,
        scheduler: &mut AnimationScheduler,
        loop_animation: bool,
        speed_ratio: f32,
    ) -> bool {
        if self.is_started || self.targeted.is_empty() {
            return false;
        }
        self.loop_animation = loop_animation;
        self.speed_ratio = speed_ratio;
        let (from, to) = (self.from_frame(), self.to_frame());
        self.animatables = self
            .targeted
            .iter()
            .map(|t| {
                scheduler.begin(
                    t.target,
                    vec![t.animation.clone()],
                    from,
                    to,
                    loop_animation,
                    speed_ratio,
                    None,
                )
            })
            .collect();
        self.is_started = true;
        debug!(group = %self.name, count = self.animatables.len(), "animation group started");
        true
    }

    pub fn pause(&self, scheduler: &mut AnimationScheduler) {
        for id in &self.animatables {
            if let Some(a) = scheduler.get_mut(*id) {
                a.pause();
            }
        }
    }

    /// Resume a paused group, or start it when idle.
    pub fn play(&mut self, scheduler: &mut AnimationScheduler, loop_animation: Option<bool>) {
        if self.is_started {
            if let Some(l) = loop_animation {
                self.loop_animation = l;
            }
            for id in &self.animatables {
                if let Some(a) = scheduler.get_mut(*id) {
                    if let Some(l) = loop_animation {
                        a.loop_animation = l;
                    }
                    a.restart();
                }
            }
        } else {
            let l = loop_animation.unwrap_or(self.loop_animation);
            self.start(scheduler, l, self.speed_ratio);
        }
    }

    pub fn stop(&mut self, scheduler: &mut AnimationScheduler) {
        for id in self.animatables.drain(..) {
            scheduler.stop_animatable(id);
        }
        self.is_started = false;
    }

    pub fn reset(&self, scheduler: &mut AnimationScheduler) {
        for id in &self.animatables {
            if let Some(a) = scheduler.get_mut(*id) {
                a.reset();
            }
        }
    }

    pub fn go_to_frame(&self, scheduler: &mut AnimationScheduler, frame: f32) {
        for id in &self.animatables {
            if let Some(a) = scheduler.get_mut(*id) {
                a.go_to_frame(frame);
            }
        }
    }

    pub fn set_speed_ratio(&mut self, scheduler: &mut AnimationScheduler, speed_ratio: f32) {
        self.speed_ratio = speed_ratio;
        for id in &self.animatables {
            if let Some(a) = scheduler.get_mut(*id) {
                a.set_speed_ratio(speed_ratio);
            }
        }
    }

    /// Forget animatables the scheduler no longer runs. Returns true when
    /// this call observed the group ending.
    pub fn refresh(&mut self, scheduler: &AnimationScheduler) -> bool {
        if !self.is_started {
            return false;
        }
        self.animatables.retain(|id| scheduler.get(*id).is_some());
        if self.animatables.is_empty() {
            self.is_started = false;
            debug!(group = %self.name, "animation group ended");
            return true;
        }
        false
    }

    /// Drop every targeted animation bound to `target`.
    pub fn remove_target(&mut self, target: TargetId) {
        self.targeted.retain(|t| t.target != target);
    }
}
