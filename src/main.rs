use std::cell::{Cell, RefCell};
use std::f32::consts::PI;
use std::rc::Rc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use orb_engine::{
    arena::FragmentArena,
    geometry::{Basis, Vec3},
    motion::{shared_orientation, OrientationTrail, SharedOrientation},
    raster::{Fragment, Pipeline, Rasterizer, Shading},
    run_frames,
    shapes::ShapeSampler,
    timeline::{Animation, Easing, ParticleSystem, Timeline, UNBOUNDED},
    DisplayConfig, Effect, EffectState,
};

/// Stand-in for the hardware driver: bins samples into an
/// equirectangular grid and renders it as ASCII at the end of the run.
struct GridPipeline {
    width: usize,
    height: usize,
    cells: Vec<f32>,
    samples: u64,
}

impl GridPipeline {
    fn new(width: usize, height: usize) -> Self {
        GridPipeline {
            width,
            height,
            cells: vec![0.0; width * height],
            samples: 0,
        }
    }

    fn print(&self) {
        let ramp: &[u8] = b" .:-=+*#%@";
        let peak = self.cells.iter().cloned().fold(1e-6f32, f32::max);
        for row in 0..self.height {
            let line: String = (0..self.width)
                .map(|col| {
                    let value = self.cells[row * self.width + col] / peak;
                    let index = (value * (ramp.len() - 1) as f32).round() as usize;
                    ramp[index.min(ramp.len() - 1)] as char
                })
                .collect();
            println!("{line}");
        }
    }
}

impl Pipeline for GridPipeline {
    fn plot(&mut self, position: Vec3, shading: Shading, age: f32) {
        let longitude = position.z.atan2(position.x);
        let latitude = position.y.clamp(-1.0, 1.0).asin();
        let col = (((longitude + PI) / (2.0 * PI)) * self.width as f32) as usize;
        let row = (((latitude + PI / 2.0) / PI) * self.height as f32) as usize;
        let col = col.min(self.width - 1);
        let row = (self.height - 1).saturating_sub(row.min(self.height - 1));
        self.cells[row * self.width + col] += shading.alpha * (1.0 - age).max(0.0);
        self.samples += 1;
    }
}

struct Scene {
    ticks: i64,
    scheduled: bool,
    orientation: SharedOrientation,
    trail: Rc<RefCell<OrientationTrail>>,
    system: Rc<RefCell<ParticleSystem>>,
    polygon_radius: Rc<Cell<f32>>,
    rasterizer: Rasterizer,
}

impl Scene {
    fn new() -> Self {
        Scene {
            ticks: 0,
            scheduled: false,
            orientation: shared_orientation(),
            trail: Rc::new(RefCell::new(OrientationTrail::new(24))),
            system: Rc::new(RefCell::new(ParticleSystem::new(8, 16, 0.15, 0.002, 11))),
            polygon_radius: Rc::new(Cell::new(0.2)),
            rasterizer: Rasterizer::new(DisplayConfig::default()),
        }
    }
}

impl Effect for Scene {
    fn update(&mut self, timeline: &mut Timeline) -> EffectState {
        if !self.scheduled {
            self.scheduled = true;
            timeline.schedule(Animation::rotation(
                self.orientation.clone(),
                Vec3::new(0.3, 1.0, 0.1).normalize(),
                0.09,
                UNBOUNDED,
                0.02,
            ));
            // snapshot the rotation's sub-step history into the trail
            // after it has stepped (insertion order guarantees this)
            let orientation = self.orientation.clone();
            let trail = self.trail.clone();
            timeline.schedule(Animation::mutation(UNBOUNDED, move |_| {
                trail.borrow_mut().record(&orientation.borrow());
            }));
            let radius = self.polygon_radius.clone();
            timeline.schedule(
                Animation::transition(0.2f32, 1.8, 300, Easing::SmoothStep, move |value| {
                    radius.set(value);
                })
                .repeating(),
            );
            timeline.schedule(Animation::particles(self.system.clone()));
            timeline.schedule(
                Animation::timer(120, || info!("palette cycle"))
                    .repeating(),
            );
        }
        self.ticks += 1;
        if self.ticks > 600 {
            EffectState::Stop
        } else {
            EffectState::Continue
        }
    }

    fn render(&mut self, pipeline: &mut dyn Pipeline, arena: &mut FragmentArena) {
        let mut sampler = ShapeSampler::new(arena, &self.rasterizer);

        // ring riding the rotating orientation
        let basis = Basis::from_normal(self.orientation.borrow().orient(Vec3::Y));
        let mut ring_shader = |fragment: &Fragment| Shading {
            color: [fragment.registers[0], 1.0 - fragment.registers[0], 0.6],
            alpha: 1.0,
            tag: 0,
        };
        sampler.ring(&basis, 0.5, 48, 0.0, &mut ring_shader, pipeline, 0.0);

        // trail of the ring's anchor point across recent frames
        let mut trail_points = Vec::new();
        self.trail.borrow().deep_tween(|t, frame, j| {
            trail_points.push((t, frame.orient_at(Vec3::X, j)));
        });
        for pair in trail_points.windows(2) {
            let (t, from) = pair[0];
            let (_, to) = pair[1];
            let mut shader = |_: &Fragment| Shading {
                color: [1.0, 0.8, 0.2],
                alpha: t,
                tag: 1,
            };
            sampler.line(from, to, &mut shader, pipeline, 1.0 - t);
        }

        // breathing polygon crossing into the back hemisphere
        let polygon_basis = Basis::from_normal(Vec3::Z);
        let mut polygon_shader = |_: &Fragment| Shading {
            color: [0.4, 0.6, 1.0],
            alpha: 0.8,
            tag: 2,
        };
        sampler.polygon(
            &polygon_basis,
            self.polygon_radius.get(),
            6,
            &mut polygon_shader,
            pipeline,
            0.0,
        );

        // particle trails
        for particle in &self.system.borrow().particles {
            let mut points = Vec::new();
            particle.trail.deep_tween(|t, frame, j| {
                points.push((t, frame.orient_at(Vec3::Z, j)));
            });
            for pair in points.windows(2) {
                let (t, from) = pair[0];
                let (_, to) = pair[1];
                let mut shader = |_: &Fragment| Shading {
                    color: [0.9, 0.3, 0.7],
                    alpha: t,
                    tag: 3,
                };
                sampler.line(from, to, &mut shader, pipeline, 1.0 - t);
            }
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut scene = Scene::new();
    let mut grid = GridPipeline::new(96, 32);
    run_frames(&mut scene, &mut grid, 600);
    info!(samples = grid.samples, "run finished");
    grid.print();
}
