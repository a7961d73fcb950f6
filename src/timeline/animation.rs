use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::{Interpolable, Quaternion, Vec3};
use crate::motion::{Orientation, OrientationTrail, SharedOrientation};

/// Duration marker for animations that run until canceled.
pub const UNBOUNDED: i64 = -1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Easing {
    Linear,
    SmoothStep,
    EaseIn,
    EaseOut,
}

impl Easing {
    fn apply(self, t: f32) -> f32 {
        match self {
            Easing::Linear => t,
            Easing::SmoothStep => t * t * (3.0 - 2.0 * t),
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

/// One stateful animation: common lifecycle (tick count, duration, repeat,
/// cancellation, completion callback) around a closed set of behaviors.
pub struct Animation {
    t: i64,
    duration: i64,
    repeat: bool,
    canceled: Rc<Cell<bool>>,
    on_complete: Option<Box<dyn FnMut()>>,
    kind: Kind,
}

enum Kind {
    /// Pure schedule pulse; the completion callback carries the payload.
    Timer,
    Transition(Transition),
    /// Arbitrary per-tick mutation; also serves palette modulation, mesh
    /// morphing and other parameter flows.
    Mutation(Box<dyn FnMut(i64)>),
    Fade(Fade),
    PathMotion(PathMotion),
    Rotation(Rotation),
    RandomWalk(RandomWalk),
    Particles(Rc<RefCell<ParticleSystem>>),
}

struct Transition {
    easing: Easing,
    apply: Box<dyn FnMut(f32)>,
}

struct Fade {
    child: Box<Animation>,
    apply_alpha: Box<dyn FnMut(f32)>,
}

struct PathMotion {
    orientation: SharedOrientation,
    anchor: Vec3,
    path: Box<dyn Fn(f32) -> Vec3>,
    substeps: usize,
}

struct Rotation {
    orientation: SharedOrientation,
    axis: Vec3,
    velocity: f32,
    max_step: f32,
}

struct RandomWalk {
    orientation: SharedOrientation,
    axis: Vec3,
    step_angle: f32,
    wander: f32,
    rng: StdRng,
}

impl Animation {
    fn with_kind(kind: Kind, duration: i64) -> Self {
        Animation {
            t: 0,
            duration,
            repeat: false,
            canceled: Rc::new(Cell::new(false)),
            on_complete: None,
            kind,
        }
    }

    /// Fires its completion callback every `period` ticks when repeating,
    /// or once after `period` ticks otherwise.
    pub fn timer(period: i64, on_fire: impl FnMut() + 'static) -> Self {
        let mut animation = Animation::with_kind(Kind::Timer, period);
        animation.on_complete = Some(Box::new(on_fire));
        animation
    }

    /// Interpolates from one value to another over `duration` ticks,
    /// handing each eased sample to `apply`. The final step applies the
    /// exact target value.
    pub fn transition<T: Interpolable + Copy + 'static>(
        from: T,
        to: T,
        duration: i64,
        easing: Easing,
        mut apply: impl FnMut(T) + 'static,
    ) -> Self {
        assert!(duration > 0, "transition duration must be positive");
        let tween = Box::new(move |alpha: f32| {
            apply(from.linear_interpolation(to, alpha));
        });
        Animation::with_kind(
            Kind::Transition(Transition {
                easing,
                apply: tween,
            }),
            duration,
        )
    }

    /// Runs `mutate` once per tick with the elapsed tick count.
    pub fn mutation(duration: i64, mutate: impl FnMut(i64) + 'static) -> Self {
        Animation::with_kind(Kind::Mutation(Box::new(mutate)), duration)
    }

    /// Wraps a child animation with a triangular alpha envelope (ramp in,
    /// ramp out over the child's duration). Rewinding rewinds the child.
    /// The child must be bounded or the envelope has no ramp to follow.
    pub fn fade(child: Animation, apply_alpha: impl FnMut(f32) + 'static) -> Self {
        assert!(child.duration > 0, "fade child duration must be positive");
        let duration = child.duration;
        Animation::with_kind(
            Kind::Fade(Fade {
                child: Box::new(child),
                apply_alpha: Box::new(apply_alpha),
            }),
            duration,
        )
    }

    /// Drives an orientation so that `anchor` travels along `path`
    /// (a map from progress in [0, 1] to a sphere point), appending
    /// `substeps` sub-orientations per tick.
    pub fn path_motion(
        orientation: SharedOrientation,
        anchor: Vec3,
        path: impl Fn(f32) -> Vec3 + 'static,
        duration: i64,
        substeps: usize,
    ) -> Self {
        assert!(duration > 0, "path motion duration must be positive");
        Animation::with_kind(
            Kind::PathMotion(PathMotion {
                orientation,
                anchor: anchor.normalize(),
                path: Box::new(path),
                substeps: substeps.max(1),
            }),
            duration,
        )
    }

    /// Spins an orientation around a fixed axis at `velocity` radians per
    /// tick, upsampling the history whenever one tick's rotation exceeds
    /// `max_step` so trail drawing stays continuous.
    pub fn rotation(
        orientation: SharedOrientation,
        axis: Vec3,
        velocity: f32,
        duration: i64,
        max_step: f32,
    ) -> Self {
        assert!(max_step > 0.0, "rotation max step must be positive");
        Animation::with_kind(
            Kind::Rotation(Rotation {
                orientation,
                axis: axis.normalize(),
                velocity,
                max_step,
            }),
            duration,
        )
    }

    /// Unbounded orientation drift: the rotation axis wanders randomly
    /// while the step angle stays fixed.
    pub fn random_walk(
        orientation: SharedOrientation,
        step_angle: f32,
        wander: f32,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let axis = random_direction(&mut rng);
        Animation::with_kind(
            Kind::RandomWalk(RandomWalk {
                orientation,
                axis,
                step_angle,
                wander,
                rng,
            }),
            UNBOUNDED,
        )
    }

    /// Integrates a shared particle system once per tick.
    pub fn particles(system: Rc<RefCell<ParticleSystem>>) -> Self {
        Animation::with_kind(Kind::Particles(system), UNBOUNDED)
    }

    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    pub fn on_complete(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Cooperative cancellation flag: setting it marks the animation done
    /// at its next `done` check; an in-flight step still runs.
    pub fn cancel_flag(&self) -> Rc<Cell<bool>> {
        self.canceled.clone()
    }

    pub fn done(&self) -> bool {
        self.canceled.get() || (self.duration >= 0 && self.t >= self.duration)
    }

    pub fn repeats(&self) -> bool {
        self.repeat
    }

    /// The shared orientation this animation mutates, if any; the timeline
    /// collapses each one exactly once per tick before stepping.
    pub(crate) fn orientation(&self) -> Option<&SharedOrientation> {
        match &self.kind {
            Kind::Fade(fade) => fade.child.orientation(),
            Kind::PathMotion(motion) => Some(&motion.orientation),
            Kind::Rotation(rotation) => Some(&rotation.orientation),
            Kind::RandomWalk(walk) => Some(&walk.orientation),
            _ => None,
        }
    }

    pub(crate) fn step(&mut self) {
        self.t += 1;
        let progress = if self.duration > 0 {
            (self.t as f32 / self.duration as f32).min(1.0)
        } else {
            0.0
        };
        match &mut self.kind {
            Kind::Timer => {}
            Kind::Transition(transition) => {
                (transition.apply)(transition.easing.apply(progress));
            }
            Kind::Mutation(mutate) => mutate(self.t),
            Kind::Fade(fade) => {
                fade.child.step();
                let envelope = 1.0 - (1.0 - 2.0 * progress).abs();
                (fade.apply_alpha)(envelope.clamp(0.0, 1.0));
            }
            Kind::PathMotion(motion) => {
                let previous = (self.t - 1) as f32 / self.duration as f32;
                let mut orientation = motion.orientation.borrow_mut();
                for k in 1..=motion.substeps {
                    let sub = previous
                        + (progress - previous) * k as f32 / motion.substeps as f32;
                    let target = (motion.path)(sub).normalize();
                    orientation.append(Quaternion::between(motion.anchor, target));
                }
            }
            Kind::Rotation(rotation) => {
                let mut orientation = rotation.orientation.borrow_mut();
                let q = Quaternion::from_axis_angle(rotation.axis, rotation.velocity)
                    * orientation.latest();
                orientation.append(q.normalize());
                let needed = (rotation.velocity.abs() / rotation.max_step).ceil() as usize + 1;
                orientation.upsample(needed);
            }
            Kind::RandomWalk(walk) => {
                let jitter = random_direction(&mut walk.rng) * walk.wander;
                walk.axis = (walk.axis + jitter).normalize();
                let mut orientation = walk.orientation.borrow_mut();
                let q = Quaternion::from_axis_angle(walk.axis, walk.step_angle)
                    * orientation.latest();
                orientation.append(q.normalize());
            }
            Kind::Particles(system) => system.borrow_mut().step(),
        }
    }

    pub(crate) fn rewind(&mut self) {
        self.t = 0;
        if let Kind::Fade(fade) = &mut self.kind {
            fade.child.rewind();
        }
    }

    pub(crate) fn fire_completion(&mut self) {
        if let Some(callback) = &mut self.on_complete {
            callback();
        }
    }
}

fn random_direction(rng: &mut StdRng) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        let norm = v.norm();
        if norm > 1e-3 && norm <= 1.0 {
            return v * (1.0 / norm);
        }
    }
}

/// One free-flying particle: its own orientation history plus a rolling
/// trail of per-tick snapshots for second-order trail effects.
pub struct Particle {
    pub orientation: Orientation,
    pub trail: OrientationTrail,
    axis: Vec3,
    pub speed: f32,
}

/// Velocity-integrated particles on the sphere. Each tick every particle's
/// axis wanders, its speed decays, its orientation advances and the result
/// is recorded into its trail.
pub struct ParticleSystem {
    pub particles: Vec<Particle>,
    wander: f32,
    drag: f32,
    rng: StdRng,
}

impl ParticleSystem {
    pub fn new(count: usize, trail_frames: usize, wander: f32, drag: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let particles = (0..count)
            .map(|_| Particle {
                orientation: Orientation::new(),
                trail: OrientationTrail::new(trail_frames),
                axis: random_direction(&mut rng),
                speed: rng.random_range(0.01..0.05),
            })
            .collect();
        ParticleSystem {
            particles,
            wander,
            drag,
            rng,
        }
    }

    fn step(&mut self) {
        for particle in &mut self.particles {
            particle.orientation.collapse();
            let jitter = random_direction(&mut self.rng) * self.wander;
            particle.axis = (particle.axis + jitter).normalize();
            particle.speed *= 1.0 - self.drag;
            let q = Quaternion::from_axis_angle(particle.axis, particle.speed)
                * particle.orientation.latest();
            particle.orientation.append(q.normalize());
            particle.trail.record(&particle.orientation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::shared_orientation;

    #[test]
    fn transition_final_step_applies_the_exact_target() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let mut animation =
            Animation::transition(0.0f32, 10.0, 4, Easing::Linear, move |value| {
                log.borrow_mut().push(value);
            });
        while !animation.done() {
            animation.step();
        }
        let values = seen.borrow();
        assert_eq!(values.len(), 4);
        assert!((values[values.len() - 1] - 10.0).abs() < 1e-6);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn cancellation_is_observed_at_the_next_done_check() {
        let mut animation = Animation::mutation(UNBOUNDED, |_| {});
        assert!(!animation.done());
        let flag = animation.cancel_flag();
        flag.set(true);
        assert!(animation.done());
    }

    #[test]
    fn fade_rewind_resets_the_child_too() {
        let fired = Rc::new(Cell::new(0));
        let count = fired.clone();
        let child = Animation::transition(0.0f32, 1.0, 3, Easing::Linear, move |_| {
            count.set(count.get() + 1);
        });
        let mut fade = Animation::fade(child, |_| {});
        fade.step();
        fade.step();
        fade.step();
        assert!(fade.done());
        fade.rewind();
        assert!(!fade.done());
        fade.step();
        // child stepped again after rewind
        assert_eq!(fired.get(), 4);
    }

    #[test]
    #[should_panic(expected = "fade child duration must be positive")]
    fn fade_rejects_an_unbounded_child() {
        let _fade = Animation::fade(Animation::mutation(UNBOUNDED, |_| {}), |_| {});
    }

    #[test]
    fn rotation_upsamples_fast_spins_into_fine_history() {
        let orientation = shared_orientation();
        let mut animation =
            Animation::rotation(orientation.clone(), Vec3::Y, 0.5, UNBOUNDED, 0.1);
        animation.step();
        let history = orientation.borrow();
        // 0.5 rad at a 0.1 rad ceiling needs at least 6 entries
        assert!(history.len() >= 6, "history too coarse: {}", history.len());
        let final_angle = history.latest().rotate(Vec3::X).angle_to(Vec3::X);
        assert!((final_angle - 0.5).abs() < 1e-3);
    }

    #[test]
    fn random_walk_is_deterministic_for_a_seed() {
        let a = shared_orientation();
        let b = shared_orientation();
        let mut walk_a = Animation::random_walk(a.clone(), 0.05, 0.2, 7);
        let mut walk_b = Animation::random_walk(b.clone(), 0.05, 0.2, 7);
        for _ in 0..10 {
            walk_a.step();
            walk_b.step();
        }
        assert_eq!(a.borrow().latest(), b.borrow().latest());
    }

    #[test]
    fn particle_system_records_one_trail_frame_per_tick() {
        let system = Rc::new(RefCell::new(ParticleSystem::new(
            3, 5, 0.1, 0.01, 42,
        )));
        let mut animation = Animation::particles(system.clone());
        for _ in 0..4 {
            animation.step();
        }
        for particle in &system.borrow().particles {
            assert_eq!(particle.trail.len(), 4);
        }
    }
}
