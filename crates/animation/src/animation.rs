use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use vista_common::Color3;

use crate::easing::EasingFunction;

/// A value an animation can drive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AnimationValue {
    Float(f32),
    Vector3(Vec3),
    Quaternion(Quat),
    Color3(Color3),
}

impl AnimationValue {
    /// Blend toward `to`. Mismatched variants hold the start value.
    pub fn interpolate(&self, to: &AnimationValue, t: f32) -> AnimationValue {
        match (self, to) {
            (Self::Float(a), Self::Float(b)) => Self::Float(a + (b - a) * t),
            (Self::Vector3(a), Self::Vector3(b)) => Self::Vector3(a.lerp(*b, t)),
            (Self::Quaternion(a), Self::Quaternion(b)) => Self::Quaternion(a.slerp(*b, t)),
            (Self::Color3(a), Self::Color3(b)) => Self::Color3(a.lerp(*b, t)),
            _ => *self,
        }
    }

    /// `self + offset * times`, used to accumulate relative loops.
    pub fn add_scaled(&self, offset: &AnimationValue, times: f32) -> AnimationValue {
        match (self, offset) {
            (Self::Float(a), Self::Float(o)) => Self::Float(a + o * times),
            (Self::Vector3(a), Self::Vector3(o)) => Self::Vector3(*a + *o * times),
            (Self::Quaternion(a), Self::Quaternion(o)) => {
                Self::Quaternion((*a + *o * times).normalize())
            }
            (Self::Color3(a), Self::Color3(o)) => Self::Color3(*a + *o * times),
            _ => *self,
        }
    }

    /// `self - other`, component-wise.
    pub fn subtract(&self, other: &AnimationValue) -> AnimationValue {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => Self::Float(a - b),
            (Self::Vector3(a), Self::Vector3(b)) => Self::Vector3(*a - *b),
            (Self::Quaternion(a), Self::Quaternion(b)) => Self::Quaternion(*a - *b),
            (Self::Color3(a), Self::Color3(b)) => Self::Color3(*a - *b),
            _ => *self,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationKey {
    pub frame: f32,
    pub value: AnimationValue,
}

impl AnimationKey {
    pub fn new(frame: f32, value: AnimationValue) -> Self {
        Self { frame, value }
    }
}

/// What happens when a looping run passes its last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnimationLoopMode {
    /// Each lap adds the net change of one lap to the value.
    Relative,
    /// Wrap to the start frame.
    #[default]
    Cycle,
    /// Hold the end value once the first lap is over.
    Constant,
}

/// Keyframed curve driving one named property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animation {
    pub name: String,
    pub target_property: String,
    pub frames_per_second: f32,
    pub loop_mode: AnimationLoopMode,
    pub easing: Option<EasingFunction>,
    keys: Vec<AnimationKey>,
}

impl Animation {
    pub fn new(
        name: impl Into<String>,
        target_property: impl Into<String>,
        frames_per_second: f32,
        loop_mode: AnimationLoopMode,
    ) -> Self {
        Self {
            name: name.into(),
            target_property: target_property.into(),
            frames_per_second,
            loop_mode,
            easing: None,
            keys: Vec::new(),
        }
    }

    pub fn with_keys(mut self, keys: Vec<AnimationKey>) -> Self {
        self.set_keys(keys);
        self
    }

    pub fn with_easing(mut self, easing: EasingFunction) -> Self {
        self.easing = Some(easing);
        self
    }

    /// Keys are kept sorted by frame. A curve that does not start at frame 0
    /// gets a copy of its first key there.
    pub fn set_keys(&mut self, mut keys: Vec<AnimationKey>) {
        keys.sort_by(|a, b| a.frame.total_cmp(&b.frame));
        if let Some(first) = keys.first().copied() {
            if first.frame != 0.0 {
                keys.insert(0, AnimationKey::new(0.0, first.value));
            }
        }
        self.keys = keys;
    }

    pub fn keys(&self) -> &[AnimationKey] {
        &self.keys
    }

    pub fn first_frame(&self) -> f32 {
        self.keys.first().map_or(0.0, |k| k.frame)
    }

    pub fn last_frame(&self) -> f32 {
        self.keys.last().map_or(0.0, |k| k.frame)
    }

    /// Curve value at `frame`, clamped to the key range.
    pub fn evaluate(&self, frame: f32) -> Option<AnimationValue> {
        self.interpolate(frame, 0, None, None)
    }

    pub(crate) fn interpolate(
        &self,
        frame: f32,
        repeat_count: u32,
        offset: Option<&AnimationValue>,
        high_limit: Option<&AnimationValue>,
    ) -> Option<AnimationValue> {
        if self.loop_mode == AnimationLoopMode::Constant && repeat_count > 0 {
            if let Some(v) = high_limit {
                return Some(*v);
            }
        }
        let first = self.keys.first()?;
        let relative = |v: AnimationValue| match (self.loop_mode, offset) {
            (AnimationLoopMode::Relative, Some(o)) => v.add_scaled(o, repeat_count as f32),
            _ => v,
        };
        if frame <= first.frame || self.keys.len() == 1 {
            return Some(relative(first.value));
        }
        for pair in self.keys.windows(2) {
            let (start, end) = (&pair[0], &pair[1]);
            if end.frame >= frame {
                let span = end.frame - start.frame;
                let mut gradient = if span <= 0.0 {
                    1.0
                } else {
                    (frame - start.frame) / span
                };
                if let Some(easing) = &self.easing {
                    gradient = easing.ease(gradient);
                }
                return Some(relative(start.value.interpolate(&end.value, gradient)));
            }
        }
        self.keys.last().map(|k| relative(k.value))
    }
}
