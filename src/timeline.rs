pub use animation::{Animation, Easing, Particle, ParticleSystem, UNBOUNDED};

mod animation;

use std::rc::Rc;

use tracing::debug;

use crate::motion::SharedOrientation;

struct Entry {
    start_tick: i64,
    animation: Animation,
}

/// Time-ordered list of independent animations, advanced one tick per
/// frame. Every tick runs two phases: a prepare pass that collapses each
/// shared orientation exactly once, then a step pass over the active
/// entries in insertion order, after which finished entries are retired or
/// rewound for repetition.
pub struct Timeline {
    entries: Vec<Entry>,
    tick: i64,
}

impl Timeline {
    pub fn new() -> Self {
        Timeline {
            entries: Vec::new(),
            tick: 0,
        }
    }

    pub fn tick(&self) -> i64 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Schedules an animation to start on the current tick.
    pub fn schedule(&mut self, animation: Animation) {
        self.schedule_at(self.tick, animation);
    }

    /// Schedules an animation to start once the tick counter reaches
    /// `start_tick`. Entries stay sorted by start tick, with insertion
    /// order preserved among equal ticks.
    pub fn schedule_at(&mut self, start_tick: i64, animation: Animation) {
        let position = self
            .entries
            .partition_point(|entry| entry.start_tick <= start_tick);
        self.entries.insert(
            position,
            Entry {
                start_tick,
                animation,
            },
        );
    }

    /// Advances simulated time by one tick.
    pub fn advance(&mut self) {
        let now = self.tick;

        // prepare pass: every orientation shared by the active animations
        // is collapsed once, before any of them steps
        let mut prepared: Vec<SharedOrientation> = Vec::new();
        for entry in &self.entries {
            if entry.start_tick > now {
                continue;
            }
            if let Some(orientation) = entry.animation.orientation() {
                if !prepared.iter().any(|seen| Rc::ptr_eq(seen, orientation)) {
                    orientation.borrow_mut().collapse();
                    prepared.push(orientation.clone());
                }
            }
        }

        // step pass, in insertion order
        for entry in &mut self.entries {
            if entry.start_tick <= now {
                entry.animation.step();
            }
        }

        // retire or rewind finished animations
        self.entries.retain_mut(|entry| {
            if entry.start_tick > now || !entry.animation.done() {
                return true;
            }
            if entry.animation.repeats() {
                entry.animation.rewind();
                entry.animation.fire_completion();
                true
            } else {
                entry.animation.fire_completion();
                debug!(start_tick = entry.start_tick, tick = now, "animation retired");
                false
            }
        });

        self.tick += 1;
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Timeline::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Quaternion, Vec3};
    use crate::motion::shared_orientation;
    use std::cell::{Cell, RefCell};

    #[test]
    fn repeating_timer_fires_on_its_period_only() {
        let fired_at = Rc::new(RefCell::new(Vec::new()));
        let now = Rc::new(Cell::new(0i64));
        let log = fired_at.clone();
        let clock = now.clone();
        let mut timeline = Timeline::new();
        timeline.schedule_at(
            0,
            Animation::timer(10, move || {
                log.borrow_mut().push(clock.get() + 1);
            })
            .repeating(),
        );
        for i in 0..25 {
            now.set(i);
            timeline.advance();
        }
        assert_eq!(*fired_at.borrow(), vec![10, 20]);
        assert_eq!(timeline.len(), 1, "repeating timer must stay scheduled");
    }

    #[test]
    fn one_shot_timer_is_retired_after_firing() {
        let fired = Rc::new(Cell::new(0));
        let count = fired.clone();
        let mut timeline = Timeline::new();
        timeline.schedule(Animation::timer(3, move || {
            count.set(count.get() + 1);
        }));
        for _ in 0..6 {
            timeline.advance();
        }
        assert_eq!(fired.get(), 1);
        assert!(timeline.is_empty());
    }

    #[test]
    fn animations_do_not_step_before_their_start_tick() {
        let steps = Rc::new(Cell::new(0));
        let count = steps.clone();
        let mut timeline = Timeline::new();
        timeline.schedule_at(
            5,
            Animation::mutation(UNBOUNDED, move |_| {
                count.set(count.get() + 1);
            }),
        );
        for _ in 0..8 {
            timeline.advance();
        }
        // active on ticks 5, 6, 7
        assert_eq!(steps.get(), 3);
    }

    #[test]
    fn entries_stay_sorted_by_start_tick() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut timeline = Timeline::new();
        for (start, label) in [(4, "late"), (1, "early"), (4, "late2")] {
            let log = order.clone();
            timeline.schedule_at(
                start,
                Animation::mutation(1, move |_| {
                    log.borrow_mut().push(label);
                }),
            );
        }
        for _ in 0..6 {
            timeline.advance();
        }
        assert_eq!(*order.borrow(), vec!["early", "late", "late2"]);
    }

    #[test]
    fn shared_orientation_is_collapsed_once_before_either_animation_steps() {
        let orientation = shared_orientation();
        // two rotations share one orientation; the prepare pass must leave
        // exactly the sub-steps of the current tick in the history
        let mut timeline = Timeline::new();
        timeline.schedule(Animation::rotation(
            orientation.clone(),
            Vec3::Y,
            0.02,
            UNBOUNDED,
            1.0,
        ));
        timeline.schedule(Animation::rotation(
            orientation.clone(),
            Vec3::X,
            0.03,
            UNBOUNDED,
            1.0,
        ));
        for _ in 0..10 {
            timeline.advance();
        }
        // without the prepare pass the history would grow by two every tick
        assert_eq!(orientation.borrow().len(), 3);
        // both rotations composed onto the shared value
        let v = orientation.borrow().orient(Vec3::Z);
        let only_y = Quaternion::from_axis_angle(Vec3::Y, 0.2).rotate(Vec3::Z);
        assert!((v - only_y).norm() > 1e-3, "second rotation had no effect");
    }

    #[test]
    fn fade_wrapped_rotation_is_collapsed_by_the_prepare_pass() {
        let orientation = shared_orientation();
        let mut timeline = Timeline::new();
        timeline.schedule(Animation::fade(
            Animation::rotation(orientation.clone(), Vec3::Y, 0.02, 20, 1.0),
            |_| {},
        ));
        for _ in 0..10 {
            timeline.advance();
        }
        // without recursing into the fade's child the history would hold
        // one entry per elapsed tick
        let len = orientation.borrow().len();
        assert!(len <= 2, "history grew unbounded: len = {len}");
    }

    #[test]
    fn canceled_animation_is_removed_without_completion_suppression() {
        let completed = Rc::new(Cell::new(false));
        let seen = completed.clone();
        let animation = Animation::mutation(UNBOUNDED, |_| {}).on_complete(move || {
            seen.set(true);
        });
        let flag = animation.cancel_flag();
        let mut timeline = Timeline::new();
        timeline.schedule(animation);
        timeline.advance();
        assert_eq!(timeline.len(), 1);
        flag.set(true);
        timeline.advance();
        assert!(timeline.is_empty());
        assert!(completed.get(), "completion callback must run on retire");
    }
}
