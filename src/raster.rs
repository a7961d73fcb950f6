use crate::geometry::{Basis, Interpolable, Quaternion, Vec3, PARALLEL_LIMIT};
use crate::DisplayConfig;

pub type Color = [f32; 3];

/// One sample flowing through the rasterizer: a position on the unit sphere
/// plus four interpolation registers carrying shape-specific attributes
/// (by convention: v0 normalized progress, v1 cumulative arc estimate,
/// v2 point index, v3 free).
#[derive(Clone, Copy, Debug, Default)]
pub struct Fragment {
    pub position: Vec3,
    pub registers: [f32; 4],
}

impl Fragment {
    pub fn at(position: Vec3) -> Self {
        Fragment {
            position,
            registers: [0.0; 4],
        }
    }

    pub fn with_registers(position: Vec3, registers: [f32; 4]) -> Self {
        Fragment {
            position,
            registers,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Shading {
    pub color: Color,
    pub alpha: f32,
    pub tag: i32,
}

/// Output sink for shaded samples. The core never writes pixels itself;
/// the sink owns any further transforms and the physical buffer.
pub trait Pipeline {
    fn plot(&mut self, position: Vec3, shading: Shading, age: f32);
}

/// How positions between two fragments are generated.
pub enum Interpolation {
    /// Shortest great-circle arc between the endpoints.
    Geodesic,
    /// Project into the tangent plane of the basis (azimuthal-equidistant),
    /// interpolate linearly there, unproject. Per-segment distance is the
    /// planar chord, an approximation of geodesic length that diverges near
    /// the basis antipode.
    Planar(Basis),
}

enum SegmentMap {
    Geodesic {
        origin: Vec3,
        axis: Vec3,
        angle: f32,
    },
    Planar {
        basis: Basis,
        from: (f32, f32),
        to: (f32, f32),
    },
}

impl SegmentMap {
    fn at(&self, t: f32) -> Vec3 {
        match self {
            SegmentMap::Geodesic {
                origin,
                axis,
                angle,
            } => Quaternion::from_axis_angle(*axis, angle * t).rotate(*origin),
            SegmentMap::Planar { basis, from, to } => basis.unproject(
                from.0.linear_interpolation(to.0, t),
                from.1.linear_interpolation(to.1, t),
            ),
        }
    }
}

impl Interpolation {
    /// Builds the per-segment map and its total distance.
    fn segment(&self, from: Vec3, to: Vec3, epsilon: f32) -> (SegmentMap, f32) {
        match self {
            Interpolation::Geodesic => {
                let angle = from.angle_to(to);
                let axis = if angle < epsilon {
                    // degenerate arc, any axis works
                    Vec3::Y
                } else if angle > std::f32::consts::PI - epsilon {
                    // antipodal endpoints: pick a deterministic
                    // perpendicular through a non-parallel reference
                    let reference = if from.dot(Vec3::Z).abs() > 1.0 - PARALLEL_LIMIT {
                        Vec3::X
                    } else {
                        Vec3::Z
                    };
                    from.cross(reference).normalize()
                } else {
                    from.cross(to).normalize()
                };
                (
                    SegmentMap::Geodesic {
                        origin: from,
                        axis,
                        angle,
                    },
                    angle,
                )
            }
            Interpolation::Planar(basis) => {
                let from_plane = basis.project(from);
                let to_plane = basis.project(to);
                let distance = (to_plane.0 - from_plane.0).hypot(to_plane.1 - from_plane.1);
                (
                    SegmentMap::Planar {
                        basis: *basis,
                        from: from_plane,
                        to: to_plane,
                    },
                    distance,
                )
            }
        }
    }
}

/// Walks fragment lists segment by segment with adaptively sized angular
/// steps and hands one shaded sample per step to the pipeline.
pub struct Rasterizer {
    config: DisplayConfig,
}

impl Rasterizer {
    pub fn new(config: DisplayConfig) -> Self {
        Rasterizer { config }
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// Rasterizes an ordered fragment list. With `closed` the seam segment
    /// from the last fragment back to the first is drawn too, and the seam
    /// point is emitted exactly once.
    pub fn rasterize(
        &self,
        fragments: &[Fragment],
        closed: bool,
        strategy: &Interpolation,
        shader: &mut dyn FnMut(&Fragment) -> Shading,
        pipeline: &mut dyn Pipeline,
        age: f32,
    ) {
        if fragments.is_empty() {
            return;
        }
        if fragments.len() == 1 {
            emit(&fragments[0], shader, pipeline, age);
            return;
        }
        let segment_count = if closed {
            fragments.len()
        } else {
            fragments.len() - 1
        };
        let mut steps = Vec::new();
        for s in 0..segment_count {
            let from = &fragments[s];
            let to = &fragments[(s + 1) % fragments.len()];
            // the endpoint belongs to the next segment except at the open end
            let emit_end = !closed && s == segment_count - 1;
            self.segment(from, to, strategy, emit_end, &mut steps, shader, pipeline, age);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn segment(
        &self,
        from: &Fragment,
        to: &Fragment,
        strategy: &Interpolation,
        emit_end: bool,
        steps: &mut Vec<f32>,
        shader: &mut dyn FnMut(&Fragment) -> Shading,
        pipeline: &mut dyn Pipeline,
        age: f32,
    ) {
        let epsilon = self.config.epsilon;
        let (map, total) = strategy.segment(from.position, to.position, epsilon);
        // degenerate input (non-finite positions) would never cover the
        // distance; drop the segment instead of spinning
        if !total.is_finite() {
            return;
        }
        if total < epsilon {
            emit(from, shader, pipeline, age);
            return;
        }

        // simulation pass: accumulate pole-compensated steps until the
        // segment's distance is covered
        steps.clear();
        let mut simulated = 0.0;
        let mut position = from.position;
        loop {
            let step = self.config.base_step * pole_factor(position.y, self.config.pole_step_floor);
            steps.push(step);
            simulated += step;
            if simulated >= total {
                break;
            }
            position = map.at(simulated / total);
        }
        // uniform correction so the accumulated steps land exactly on the
        // true endpoint
        let scale = total / simulated;

        // replay pass
        emit(from, shader, pipeline, age);
        let mut travelled = 0.0;
        let last = steps.len() - 1;
        for (k, step) in steps.iter().enumerate() {
            travelled += step * scale;
            let t = (travelled / total).min(1.0);
            if k == last {
                if emit_end {
                    emit(to, shader, pipeline, age);
                }
                break;
            }
            let fragment = Fragment {
                position: map.at(t),
                registers: [
                    from.registers[0].linear_interpolation(to.registers[0], t),
                    from.registers[1].linear_interpolation(to.registers[1], t),
                    from.registers[2].linear_interpolation(to.registers[2], t),
                    from.registers[3].linear_interpolation(to.registers[3], t),
                ],
            };
            emit(&fragment, shader, pipeline, age);
        }
    }
}

/// Shrinks steps near the display's poles so per-pixel angular spacing
/// stays visually uniform despite projection distortion there.
fn pole_factor(y: f32, floor: f32) -> f32 {
    (1.0 - y * y).max(0.0).sqrt().max(floor)
}

fn emit(
    fragment: &Fragment,
    shader: &mut dyn FnMut(&Fragment) -> Shading,
    pipeline: &mut dyn Pipeline,
    age: f32,
) {
    let shading = shader(fragment);
    pipeline.plot(fragment.position, shading, age);
}
