use tracing::{debug, warn};
use vista_common::{AnimatableId, TargetId};

use crate::animatable::{Animatable, TargetResolver};
use crate::animation::Animation;

/// Owns the active animatables and advances them once per frame.
///
/// Animatables that finish during a tick are removed after the pass and
/// their end callbacks run once every animatable has been evaluated.
#[derive(Debug)]
pub struct AnimationScheduler {
    animatables: Vec<Animatable>,
    animation_time: f64,
    next_id: u32,
    /// Multiplier applied to every tick delta.
    pub time_scale: f64,
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self {
            animatables: Vec::new(),
            animation_time: 0.0,
            next_id: 1,
            time_scale: 1.0,
        }
    }
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start running `animations` on `target` between `from` and `to`.
    #[allow(clippy::too_many_arguments)]
    pub fn begin(
        &mut self,
        target: TargetId,
        animations: Vec<Animation>,
        from: f32,
        to: f32,
        loop_animation: bool,
        speed_ratio: f32,
        on_end: Option<Box<dyn FnOnce()>>,
    ) -> AnimatableId {
        let id = AnimatableId(self.next_id);
        self.next_id += 1;
        debug!(%id, ?target, from, to, loop_animation, "animation started");
        self.animatables.push(Animatable::new(
            id,
            target,
            animations,
            from,
            to,
            loop_animation,
            speed_ratio,
            on_end,
        ));
        id
    }

    /// Scene animation clock in milliseconds.
    pub fn animation_time(&self) -> f64 {
        self.animation_time
    }

    pub fn len(&self) -> usize {
        self.animatables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animatables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Animatable> {
        self.animatables.iter()
    }

    pub fn get(&self, id: AnimatableId) -> Option<&Animatable> {
        self.animatables.iter().find(|a| a.id() == id)
    }

    pub fn get_mut(&mut self, id: AnimatableId) -> Option<&mut Animatable> {
        self.animatables.iter_mut().find(|a| a.id() == id)
    }

    /// First animatable running on `target`.
    pub fn by_target(&self, target: TargetId) -> Option<&Animatable> {
        self.animatables.iter().find(|a| a.target() == target)
    }

    pub fn all_by_target(&self, target: TargetId) -> Vec<&Animatable> {
        self.animatables
            .iter()
            .filter(|a| a.target() == target)
            .collect()
    }

    /// Advance the clock by `delta_ms` and evaluate every animatable.
    /// Returns the number of animatables that ended during this tick.
    pub fn tick(&mut self, delta_ms: f64, resolver: &mut dyn TargetResolver) -> usize {
        self.animation_time += delta_ms * self.time_scale;
        let now = self.animation_time;

        let mut ended = Vec::new();
        for (index, animatable) in self.animatables.iter_mut().enumerate() {
            let running = match resolver.resolve(animatable.target()) {
                Some(target) => animatable.animate(now, target),
                None => {
                    warn!(id = %animatable.id(), target = ?animatable.target(), "animation target missing");
                    false
                }
            };
            if !running {
                ended.push(index);
            }
        }

        let count = ended.len();
        let mut callbacks = Vec::with_capacity(count);
        for index in ended.into_iter().rev() {
            let mut animatable = self.animatables.remove(index);
            animatable.mark_stopped();
            debug!(id = %animatable.id(), "animation ended");
            if let Some(cb) = animatable.take_on_end() {
                callbacks.push(cb);
            }
        }
        for cb in callbacks.into_iter().rev() {
            cb();
        }
        count
    }

    /// Stop animations on `target`. With a name only that animation stops and
    /// the animatable survives while it still runs others.
    /// Returns the number of animatables removed.
    pub fn stop(&mut self, target: TargetId, name: Option<&str>) -> usize {
        let mut removed = Vec::new();
        let mut index = 0;
        while index < self.animatables.len() {
            let animatable = &mut self.animatables[index];
            let remove = animatable.target() == target
                && match name {
                    None => true,
                    Some(n) => animatable.remove_animations_named(n),
                };
            if remove {
                removed.push(self.animatables.remove(index));
            } else {
                index += 1;
            }
        }
        let count = removed.len();
        Self::finish(removed);
        count
    }

    pub fn stop_animatable(&mut self, id: AnimatableId) -> bool {
        match self.animatables.iter().position(|a| a.id() == id) {
            Some(index) => {
                let animatable = self.animatables.remove(index);
                Self::finish(vec![animatable]);
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        let all = std::mem::take(&mut self.animatables);
        Self::finish(all);
    }

    fn finish(animatables: Vec<Animatable>) {
        let mut callbacks = Vec::new();
        for mut animatable in animatables {
            animatable.mark_stopped();
            debug!(id = %animatable.id(), "animation stopped");
            if let Some(cb) = animatable.take_on_end() {
                callbacks.push(cb);
            }
        }
        for cb in callbacks {
            cb();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animatable::AnimationTarget;
    use crate::animation::{AnimationKey, AnimationLoopMode, AnimationValue};
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use vista_common::MeshId;

    #[derive(Default)]
    struct Node {
        x: f32,
    }

    impl AnimationTarget for Node {
        fn set_animated_value(&mut self, property: &str, value: &AnimationValue) -> bool {
            match (property, value) {
                ("x", AnimationValue::Float(v)) => {
                    self.x = *v;
                    true
                }
                _ => false,
            }
        }

        fn animated_value(&self, property: &str) -> Option<AnimationValue> {
            (property == "x").then_some(AnimationValue::Float(self.x))
        }
    }

    #[derive(Default)]
    struct Nodes(HashMap<TargetId, Node>);

    impl TargetResolver for Nodes {
        fn resolve(&mut self, target: TargetId) -> Option<&mut dyn AnimationTarget> {
            self.0.get_mut(&target).map(|n| n as &mut dyn AnimationTarget)
        }
    }

    fn slide(name: &str) -> Animation {
        Animation::new(name, "x", 10.0, AnimationLoopMode::Cycle).with_keys(vec![
            AnimationKey::new(0.0, AnimationValue::Float(0.0)),
            AnimationKey::new(10.0, AnimationValue::Float(10.0)),
        ])
    }

    fn target(n: u32) -> TargetId {
        TargetId::Mesh(MeshId(n))
    }

    fn counter() -> (Rc<Cell<u32>>, Box<dyn FnOnce()>) {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        (hits, Box::new(move || h.set(h.get() + 1)))
    }

    #[test]
    fn non_looping_fires_end_once_and_leaves() {
        let mut nodes = Nodes::default();
        nodes.0.insert(target(1), Node::default());
        let mut scheduler = AnimationScheduler::new();
        let (hits, cb) = counter();
        scheduler.begin(target(1), vec![slide("a")], 0.0, 10.0, false, 1.0, Some(cb));

        scheduler.tick(16.0, &mut nodes);
        assert_eq!(scheduler.len(), 1);
        for _ in 0..100 {
            scheduler.tick(16.0, &mut nodes);
        }
        assert!(scheduler.is_empty());
        assert_eq!(hits.get(), 1);
        assert_eq!(nodes.0[&target(1)].x, 10.0);
    }

    #[test]
    fn looping_never_ends_on_its_own() {
        let mut nodes = Nodes::default();
        nodes.0.insert(target(1), Node::default());
        let mut scheduler = AnimationScheduler::new();
        let (hits, cb) = counter();
        scheduler.begin(target(1), vec![slide("a")], 0.0, 10.0, true, 1.0, Some(cb));
        for _ in 0..500 {
            assert_eq!(scheduler.tick(33.0, &mut nodes), 0);
        }
        assert_eq!(scheduler.len(), 1);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn stop_by_name_keeps_other_animations() {
        let mut scheduler = AnimationScheduler::new();
        let (hits, cb) = counter();
        let id = scheduler.begin(
            target(1),
            vec![slide("a"), slide("b")],
            0.0,
            10.0,
            true,
            1.0,
            Some(cb),
        );
        assert_eq!(scheduler.stop(target(1), Some("a")), 0);
        assert!(scheduler.get(id).is_some_and(|a| !a.has_animation("a")));
        assert_eq!(scheduler.stop(target(1), Some("b")), 1);
        assert!(scheduler.get(id).is_none());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn stop_without_name_removes_every_animatable_of_target() {
        let mut scheduler = AnimationScheduler::new();
        scheduler.begin(target(1), vec![slide("a")], 0.0, 10.0, true, 1.0, None);
        scheduler.begin(target(1), vec![slide("b")], 0.0, 10.0, true, 1.0, None);
        scheduler.begin(target(2), vec![slide("c")], 0.0, 10.0, true, 1.0, None);
        assert_eq!(scheduler.all_by_target(target(1)).len(), 2);
        assert_eq!(scheduler.stop(target(1), None), 2);
        assert!(scheduler.by_target(target(1)).is_none());
        assert!(scheduler.by_target(target(2)).is_some());
    }

    #[test]
    fn missing_target_ends_animatable() {
        let mut nodes = Nodes::default();
        let mut scheduler = AnimationScheduler::new();
        let (hits, cb) = counter();
        scheduler.begin(target(9), vec![slide("a")], 0.0, 10.0, true, 1.0, Some(cb));
        assert_eq!(scheduler.tick(16.0, &mut nodes), 1);
        assert!(scheduler.is_empty());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn callbacks_run_after_pass() {
        // Both animatables end in the same tick; each sees a consistent pass.
        let mut nodes = Nodes::default();
        nodes.0.insert(target(1), Node::default());
        nodes.0.insert(target(2), Node::default());
        let mut scheduler = AnimationScheduler::new();
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        for n in [1u32, 2] {
            let o = order.clone();
            scheduler.begin(
                target(n),
                vec![slide("a")],
                0.0,
                10.0,
                false,
                1.0,
                Some(Box::new(move || o.borrow_mut().push(n))),
            );
        }
        scheduler.tick(0.0, &mut nodes);
        assert_eq!(scheduler.tick(5000.0, &mut nodes), 2);
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[test]
    fn time_scale_speeds_up_clock() {
        let mut nodes = Nodes::default();
        nodes.0.insert(target(1), Node::default());
        let mut scheduler = AnimationScheduler::new();
        scheduler.time_scale = 2.0;
        scheduler.begin(target(1), vec![slide("a")], 0.0, 10.0, true, 1.0, None);
        scheduler.tick(0.0, &mut nodes);
        scheduler.tick(100.0, &mut nodes);
        assert!((nodes.0[&target(1)].x - 2.0).abs() < 1e-4);
        assert_eq!(scheduler.animation_time(), 200.0);
    }

    #[test]
    fn stop_all_fires_every_callback() {
        let mut scheduler = AnimationScheduler::new();
        let (a, cb_a) = counter();
        let (b, cb_b) = counter();
        scheduler.begin(target(1), vec![slide("a")], 0.0, 10.0, true, 1.0, Some(cb_a));
        scheduler.begin(target(2), vec![slide("a")], 0.0, 10.0, true, 1.0, Some(cb_b));
        scheduler.stop_all();
        assert!(scheduler.is_empty());
        assert_eq!((a.get(), b.get()), (1, 1));
    }
}
