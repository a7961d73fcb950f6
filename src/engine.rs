use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;

use crate::arena::FragmentArena;
use crate::raster::Pipeline;
use crate::timeline::Timeline;

pub mod arena;
pub mod geometry;
pub mod motion;
pub mod raster;
pub mod shapes;
pub mod timeline;

const TICKS_PER_SECOND: u128 = 60;

/// Sampling parameters of the target display's projection.
#[derive(Clone, Copy, Debug)]
pub struct DisplayConfig {
    /// Angular distance between emitted samples at the display equator.
    pub base_step: f32,
    /// Lower bound on the pole compensation factor.
    pub pole_step_floor: f32,
    /// Threshold for degenerate-geometry fallbacks.
    pub epsilon: f32,
}

impl DisplayConfig {
    pub fn new(base_step: f32, pole_step_floor: f32, epsilon: f32) -> Result<Self, ConfigError> {
        if !(base_step.is_finite() && base_step > 0.0) {
            return Err(ConfigError::BadBaseStep(base_step));
        }
        if !(pole_step_floor > 0.0 && pole_step_floor <= 1.0) {
            return Err(ConfigError::BadPoleFloor(pole_step_floor));
        }
        if !(epsilon > 0.0 && epsilon <= 1e-2) {
            return Err(ConfigError::BadEpsilon(epsilon));
        }
        Ok(DisplayConfig {
            base_step,
            pole_step_floor,
            epsilon,
        })
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            base_step: 0.02,
            pole_step_floor: 0.05,
            epsilon: 1e-5,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("base step must be positive and finite, got {0}")]
    BadBaseStep(f32),
    #[error("pole step floor must be in (0, 1], got {0}")]
    BadPoleFloor(f32),
    #[error("epsilon must be in (0, 0.01], got {0}")]
    BadEpsilon(f32),
}

pub enum EffectState {
    Continue,
    Stop,
}

/// One running effect: schedules animations onto the timeline and turns
/// the resulting state into shaded samples each frame.
pub trait Effect {
    fn update(&mut self, timeline: &mut Timeline) -> EffectState;
    fn render(&mut self, pipeline: &mut dyn Pipeline, arena: &mut FragmentArena);
}

struct FrameLoop {
    effect: Box<dyn Effect>,
    timeline: Timeline,
    arena: FragmentArena,
    frame_count: u128,
    start_time: Instant,
}

impl FrameLoop {
    fn new(effect: Box<dyn Effect>) -> Self {
        FrameLoop {
            effect,
            timeline: Timeline::new(),
            arena: FragmentArena::new(),
            frame_count: 0,
            start_time: Instant::now(),
        }
    }

    /// Catches the simulation up to wall-clock time, one tick at a time.
    fn update_effect(&mut self) -> bool {
        let target_frame_count = Instant::now()
            .duration_since(self.start_time)
            .as_millis()
            * TICKS_PER_SECOND
            / 1000;
        let frame_delta = (target_frame_count - self.frame_count) as i128;
        for _ in 0..frame_delta {
            match self.effect.update(&mut self.timeline) {
                EffectState::Continue => self.frame_count += 1,
                EffectState::Stop => return false,
            }
            self.timeline.advance();
        }
        true
    }

    fn render(&mut self, pipeline: &mut dyn Pipeline) {
        // pooled fragments from the previous frame die here
        self.arena.reset();
        self.effect.render(pipeline, &mut self.arena);
    }
}

/// Runs an effect against a pipeline until it stops, at 60 ticks per
/// second of wall-clock time.
pub fn run(effect: Box<dyn Effect>, pipeline: &mut dyn Pipeline) {
    let mut frame_loop = FrameLoop::new(effect);
    let mut frames = 0u32;
    let mut fps_window = Instant::now();
    loop {
        if !frame_loop.update_effect() {
            break;
        }
        frame_loop.render(pipeline);
        frames += 1;
        if frames >= 60 {
            let now = Instant::now();
            let duration = now.duration_since(fps_window).as_secs_f32();
            info!(fps = frames as f32 / duration, "frame rate");
            frames = 0;
            fps_window = now;
        }
        std::thread::sleep(Duration::from_millis(1000 / TICKS_PER_SECOND as u64 / 2));
    }
}

/// Drives an effect for a fixed number of ticks without wall-clock pacing,
/// rendering every frame. For headless consumers and tests.
pub fn run_frames(effect: &mut dyn Effect, pipeline: &mut dyn Pipeline, frames: u64) {
    let mut timeline = Timeline::new();
    let mut arena = FragmentArena::new();
    for _ in 0..frames {
        match effect.update(&mut timeline) {
            EffectState::Continue => {}
            EffectState::Stop => break,
        }
        timeline.advance();
        arena.reset();
        effect.render(pipeline, &mut arena);
    }
}
