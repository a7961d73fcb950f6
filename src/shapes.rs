use std::collections::BTreeSet;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use thiserror::Error;

use crate::arena::FragmentArena;
use crate::geometry::{Basis, Vec3};
use crate::raster::{Fragment, Interpolation, Pipeline, Rasterizer, Shading};

/// Externally supplied solid: the core only reads vertex positions and face
/// index lists to build wireframes, it never constructs solids itself.
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<Vec<usize>>,
}

#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("face {face} references vertex {index} but the mesh has {vertex_count} vertices")]
    BadIndex {
        face: usize,
        index: usize,
        vertex_count: usize,
    },
}

pub type Shader<'s> = dyn FnMut(&Fragment) -> Shading + 's;

/// Radius convention shared by all samplers: `1.0` is the equator of the
/// basis hemisphere; values above `1.0` address the back hemisphere by
/// flipping the basis normal and complementing the radius.
fn oriented(basis: &Basis, radius: f32) -> (Basis, f32) {
    let radius = radius.clamp(0.0, 2.0);
    if radius > 1.0 {
        (basis.flipped(), 2.0 - radius)
    } else {
        (*basis, radius)
    }
}

/// Builds ordered fragment lists for parametric shapes and hands them to
/// the rasterizer. Fragments live in the per-frame arena.
pub struct ShapeSampler<'a> {
    arena: &'a mut FragmentArena,
    rasterizer: &'a Rasterizer,
}

impl<'a> ShapeSampler<'a> {
    pub fn new(arena: &'a mut FragmentArena, rasterizer: &'a Rasterizer) -> Self {
        ShapeSampler { arena, rasterizer }
    }

    /// Geodesic segment between two points.
    pub fn line(
        &mut self,
        from: Vec3,
        to: Vec3,
        shader: &mut Shader,
        pipeline: &mut dyn Pipeline,
        age: f32,
    ) {
        let mark = self.arena.mark();
        self.arena
            .push(Fragment::with_registers(from.normalize(), [0.0, 0.0, 0.0, 0.0]));
        let arc = from.angle_to(to);
        self.arena
            .push(Fragment::with_registers(to.normalize(), [1.0, arc, 1.0, 0.0]));
        self.flush(mark, false, &Interpolation::Geodesic, shader, pipeline, age);
    }

    /// Open or closed chain of geodesic segments through the given points.
    pub fn polyline(
        &mut self,
        points: &[Vec3],
        closed: bool,
        shader: &mut Shader,
        pipeline: &mut dyn Pipeline,
        age: f32,
    ) {
        if points.is_empty() {
            return;
        }
        let mark = self.arena.mark();
        let span = if closed {
            points.len()
        } else {
            points.len() - 1
        };
        let mut arc = 0.0;
        let mut previous = points[0];
        for (i, point) in points.iter().enumerate() {
            arc += previous.angle_to(*point);
            previous = *point;
            let progress = if span > 0 { i as f32 / span as f32 } else { 0.0 };
            self.arena.push(Fragment::with_registers(
                point.normalize(),
                [progress, arc, i as f32, 0.0],
            ));
        }
        self.flush(mark, closed, &Interpolation::Geodesic, shader, pipeline, age);
    }

    /// Circle of constant radius around the basis normal.
    pub fn ring(
        &mut self,
        basis: &Basis,
        radius: f32,
        samples: usize,
        phase: f32,
        shader: &mut Shader,
        pipeline: &mut dyn Pipeline,
        age: f32,
    ) {
        self.ring_distorted(basis, radius, samples, phase, &mut |_| 0.0, shader, pipeline, age);
    }

    /// Ring with a per-azimuth distortion added to the radial angle.
    #[allow(clippy::too_many_arguments)]
    pub fn ring_distorted(
        &mut self,
        basis: &Basis,
        radius: f32,
        samples: usize,
        phase: f32,
        distort: &mut dyn FnMut(f32) -> f32,
        shader: &mut Shader,
        pipeline: &mut dyn Pipeline,
        age: f32,
    ) {
        if samples == 0 {
            return;
        }
        let (basis, radius) = oriented(basis, radius);
        let base_angle = radius * FRAC_PI_2;
        let mark = self.arena.mark();
        let mut arc = 0.0;
        let mut previous: Option<Vec3> = None;
        for i in 0..samples {
            let azimuth = phase + TAU * i as f32 / samples as f32;
            let angle = (base_angle + distort(azimuth)).clamp(0.0, PI);
            let position = basis.point_at(angle, azimuth);
            if let Some(prev) = previous {
                arc += prev.angle_to(position);
            }
            previous = Some(position);
            self.arena.push(Fragment::with_registers(
                position,
                [i as f32 / samples as f32, arc, i as f32, 0.0],
            ));
        }
        self.flush(mark, true, &Interpolation::Geodesic, shader, pipeline, age);
    }

    /// Regular polygon: the ring sampler at the corner count with a phase
    /// offset of pi over the side count, drawn with planar edges.
    pub fn polygon(
        &mut self,
        basis: &Basis,
        radius: f32,
        sides: usize,
        shader: &mut Shader,
        pipeline: &mut dyn Pipeline,
        age: f32,
    ) {
        if sides < 3 {
            return;
        }
        let (oriented_basis, radius) = oriented(basis, radius);
        let base_angle = radius * FRAC_PI_2;
        let phase = PI / sides as f32;
        let mark = self.arena.mark();
        for i in 0..sides {
            let azimuth = phase + TAU * i as f32 / sides as f32;
            let position = oriented_basis.point_at(base_angle, azimuth);
            self.arena.push(Fragment::with_registers(
                position,
                [i as f32 / sides as f32, 0.0, i as f32, 0.0],
            ));
        }
        self.flush(
            mark,
            true,
            &Interpolation::Planar(oriented_basis),
            shader,
            pipeline,
            age,
        );
    }

    /// Star with alternating outer and inner corner radii.
    #[allow(clippy::too_many_arguments)]
    pub fn star(
        &mut self,
        basis: &Basis,
        outer: f32,
        inner: f32,
        points: usize,
        shader: &mut Shader,
        pipeline: &mut dyn Pipeline,
        age: f32,
    ) {
        if points < 2 {
            return;
        }
        let (outer_basis, outer) = oriented(basis, outer);
        let (_, inner) = oriented(basis, inner.min(outer.min(1.0)));
        let corners = points * 2;
        let mark = self.arena.mark();
        for i in 0..corners {
            let azimuth = TAU * i as f32 / corners as f32;
            let radius = if i % 2 == 0 { outer } else { inner };
            let position = outer_basis.point_at(radius * FRAC_PI_2, azimuth);
            self.arena.push(Fragment::with_registers(
                position,
                [i as f32 / corners as f32, 0.0, i as f32, 0.0],
            ));
        }
        self.flush(
            mark,
            true,
            &Interpolation::Planar(outer_basis),
            shader,
            pipeline,
            age,
        );
    }

    /// Petaled boundary: per sector, the radial angle follows the polygon
    /// apothem formula, with `depth` scaling how far the valleys dip.
    #[allow(clippy::too_many_arguments)]
    pub fn flower(
        &mut self,
        basis: &Basis,
        radius: f32,
        petals: usize,
        depth: f32,
        samples: usize,
        shader: &mut Shader,
        pipeline: &mut dyn Pipeline,
        age: f32,
    ) {
        if petals == 0 || samples == 0 {
            return;
        }
        let sector = TAU / petals as f32;
        let apothem_ratio = (sector / 2.0).cos();
        let (oriented_basis, radius) = oriented(basis, radius);
        let base_angle = radius * FRAC_PI_2;
        let mark = self.arena.mark();
        for i in 0..samples {
            let azimuth = TAU * i as f32 / samples as f32;
            // clamp keeps the cosine away from zero for very wide sectors
            let local = ((azimuth % sector) - sector / 2.0).clamp(-1.4, 1.4);
            let boundary = (1.0 - depth) + depth * apothem_ratio / local.cos();
            let angle = (base_angle * boundary).clamp(0.0, PI);
            let position = oriented_basis.point_at(angle, azimuth);
            self.arena.push(Fragment::with_registers(
                position,
                [i as f32 / samples as f32, 0.0, i as f32, 0.0],
            ));
        }
        self.flush(
            mark,
            true,
            &Interpolation::Planar(oriented_basis),
            shader,
            pipeline,
            age,
        );
    }

    /// Open spiral from the basis normal out to `radius`, over `turns`
    /// revolutions.
    #[allow(clippy::too_many_arguments)]
    pub fn spiral(
        &mut self,
        basis: &Basis,
        radius: f32,
        turns: f32,
        samples: usize,
        shader: &mut Shader,
        pipeline: &mut dyn Pipeline,
        age: f32,
    ) {
        if samples < 2 {
            return;
        }
        let (oriented_basis, radius) = oriented(basis, radius);
        let max_angle = radius * FRAC_PI_2;
        let mark = self.arena.mark();
        let mut arc = 0.0;
        let mut previous: Option<Vec3> = None;
        for i in 0..samples {
            let t = i as f32 / (samples - 1) as f32;
            let position = oriented_basis.point_at(max_angle * t, TAU * turns * t);
            if let Some(prev) = previous {
                arc += prev.angle_to(position);
            }
            previous = Some(position);
            self.arena
                .push(Fragment::with_registers(position, [t, arc, i as f32, 0.0]));
        }
        self.flush(mark, false, &Interpolation::Geodesic, shader, pipeline, age);
    }

    /// Rasterizes the deduplicated edge list of an externally supplied mesh
    /// as geodesic segments.
    pub fn wireframe(
        &mut self,
        mesh: &Mesh,
        shader: &mut Shader,
        pipeline: &mut dyn Pipeline,
        age: f32,
    ) -> Result<(), ShapeError> {
        let vertex_count = mesh.vertices.len();
        let mut edges = BTreeSet::new();
        for (face_index, face) in mesh.faces.iter().enumerate() {
            for (k, &index) in face.iter().enumerate() {
                if index >= vertex_count {
                    return Err(ShapeError::BadIndex {
                        face: face_index,
                        index,
                        vertex_count,
                    });
                }
                let next = face[(k + 1) % face.len()];
                if next >= vertex_count {
                    return Err(ShapeError::BadIndex {
                        face: face_index,
                        index: next,
                        vertex_count,
                    });
                }
                if index != next {
                    edges.insert((index.min(next), index.max(next)));
                }
            }
        }
        for (edge_index, (a, b)) in edges.iter().enumerate() {
            let from = mesh.vertices[*a].normalize();
            let to = mesh.vertices[*b].normalize();
            let mark = self.arena.mark();
            self.arena.push(Fragment::with_registers(
                from,
                [0.0, 0.0, edge_index as f32, 0.0],
            ));
            self.arena.push(Fragment::with_registers(
                to,
                [1.0, from.angle_to(to), edge_index as f32, 0.0],
            ));
            self.flush(mark, false, &Interpolation::Geodesic, shader, pipeline, age);
        }
        Ok(())
    }

    fn flush(
        &mut self,
        mark: usize,
        closed: bool,
        strategy: &Interpolation,
        shader: &mut Shader,
        pipeline: &mut dyn Pipeline,
        age: f32,
    ) {
        self.rasterizer
            .rasterize(self.arena.slice(mark), closed, strategy, shader, pipeline, age);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DisplayConfig;

    struct Collector {
        positions: Vec<Vec3>,
    }

    impl Pipeline for Collector {
        fn plot(&mut self, position: Vec3, _shading: Shading, _age: f32) {
            self.positions.push(position);
        }
    }

    fn context() -> (FragmentArena, Rasterizer, Collector) {
        (
            FragmentArena::new(),
            Rasterizer::new(DisplayConfig::default()),
            Collector {
                positions: Vec::new(),
            },
        )
    }

    fn flat(fragment: &Fragment) -> Shading {
        Shading {
            color: [1.0; 3],
            alpha: 1.0,
            tag: fragment.registers[2] as i32,
        }
    }

    #[test]
    fn ring_samples_stay_on_the_sphere_at_constant_angle() {
        let (mut arena, rasterizer, mut sink) = context();
        let basis = Basis::from_normal(Vec3::Y);
        let mut sampler = ShapeSampler::new(&mut arena, &rasterizer);
        sampler.ring(&basis, 0.6, 24, 0.0, &mut flat, &mut sink, 0.0);
        assert!(!sink.positions.is_empty());
        let expected = 0.6 * FRAC_PI_2;
        for p in &sink.positions {
            assert!((p.norm() - 1.0).abs() < 1e-6);
            // geodesic edges between dense ring samples sag below the
            // circle only marginally
            assert!((basis.normal.angle_to(*p) - expected).abs() < 0.02);
        }
    }

    #[test]
    fn back_hemisphere_radius_flips_the_normal() {
        let (mut arena, rasterizer, mut sink) = context();
        let basis = Basis::from_normal(Vec3::Y);
        let mut sampler = ShapeSampler::new(&mut arena, &rasterizer);
        // radius 1.6 means 0.4 on the back hemisphere
        sampler.ring(&basis, 1.6, 24, 0.0, &mut flat, &mut sink, 0.0);
        for p in &sink.positions {
            assert!(p.y < 0.0, "sample {p:?} not on the back hemisphere");
            assert!(((-basis.normal).angle_to(*p) - 0.4 * FRAC_PI_2).abs() < 0.02);
        }
    }

    #[test]
    fn polygon_corners_sit_at_the_requested_radius() {
        let (mut arena, rasterizer, mut sink) = context();
        let basis = Basis::from_normal(Vec3::Y);
        let mut sampler = ShapeSampler::new(&mut arena, &rasterizer);
        sampler.polygon(&basis, 0.8, 5, &mut flat, &mut sink, 0.0);
        let target = 0.8 * FRAC_PI_2;
        let corner_hits = sink
            .positions
            .iter()
            .filter(|p| (basis.normal.angle_to(**p) - target).abs() < 1e-4)
            .count();
        assert!(corner_hits >= 5, "only {corner_hits} corner samples found");
        // planar edges pull towards the center between corners
        for p in &sink.positions {
            assert!(basis.normal.angle_to(*p) <= target + 1e-4);
        }
    }

    #[test]
    fn star_corners_alternate_between_outer_and_inner_radii() {
        let (mut arena, rasterizer, mut sink) = context();
        let basis = Basis::from_normal(Vec3::Y);
        let mut sampler = ShapeSampler::new(&mut arena, &rasterizer);
        sampler.star(&basis, 0.9, 0.4, 5, &mut flat, &mut sink, 0.0);
        let outer_target = 0.9 * FRAC_PI_2;
        let inner_target = 0.4 * FRAC_PI_2;
        let outer_hits = sink
            .positions
            .iter()
            .filter(|p| (basis.normal.angle_to(**p) - outer_target).abs() < 1e-4)
            .count();
        let inner_hits = sink
            .positions
            .iter()
            .filter(|p| (basis.normal.angle_to(**p) - inner_target).abs() < 1e-4)
            .count();
        assert!(outer_hits >= 5, "only {outer_hits} outer corner samples");
        assert!(inner_hits >= 5, "only {inner_hits} inner corner samples");
        // planar edges never bulge past the outer corners
        for p in &sink.positions {
            assert!(basis.normal.angle_to(*p) <= outer_target + 1e-4);
        }
    }

    #[test]
    fn flower_boundary_peaks_at_petal_tips_and_dips_at_valleys() {
        let (mut arena, rasterizer, mut sink) = context();
        let basis = Basis::from_normal(Vec3::Y);
        let mut sampler = ShapeSampler::new(&mut arena, &rasterizer);
        // 48 samples over 6 petals put samples exactly on tips and valleys
        sampler.flower(&basis, 0.8, 6, 0.5, 48, &mut flat, &mut sink, 0.0);
        let base = 0.8 * FRAC_PI_2;
        let apothem = (PI / 6.0).cos();
        let valley = base * (0.5 + 0.5 * apothem);
        let angles: Vec<f32> = sink
            .positions
            .iter()
            .map(|p| basis.normal.angle_to(*p))
            .collect();
        let max = angles.iter().cloned().fold(0.0f32, f32::max);
        let min = angles.iter().cloned().fold(PI, f32::min);
        assert!((max - base).abs() < 1e-3, "petal tip at {max}, wanted {base}");
        assert!(
            (min - valley).abs() < 0.02,
            "valley at {min}, wanted {valley}"
        );
    }

    #[test]
    fn wireframe_draws_each_shared_edge_once() {
        let (mut arena, rasterizer, mut sink) = context();
        // two triangles sharing one edge
        let mesh = Mesh {
            vertices: vec![
                Vec3::X,
                Vec3::Y,
                Vec3::Z,
                Vec3::new(-1.0, 0.0, 0.0),
            ],
            faces: vec![vec![0, 1, 2], vec![1, 3, 2]],
        };
        let mut tags = Vec::new();
        let mut shader = |fragment: &Fragment| {
            tags.push(fragment.registers[2] as i32);
            flat(fragment)
        };
        let mut sampler = ShapeSampler::new(&mut arena, &rasterizer);
        sampler
            .wireframe(&mesh, &mut shader, &mut sink, 0.0)
            .expect("valid mesh");
        tags.sort_unstable();
        tags.dedup();
        // 3 + 3 face edges with one shared: 5 distinct drawn edges
        assert_eq!(tags.len(), 5);
    }

    #[test]
    fn wireframe_rejects_out_of_range_indices() {
        let (mut arena, rasterizer, mut sink) = context();
        let mesh = Mesh {
            vertices: vec![Vec3::X, Vec3::Y],
            faces: vec![vec![0, 1, 7]],
        };
        let mut sampler = ShapeSampler::new(&mut arena, &rasterizer);
        let result = sampler.wireframe(&mesh, &mut flat, &mut sink, 0.0);
        match result {
            Err(ShapeError::BadIndex {
                index, vertex_count, ..
            }) => {
                assert_eq!(index, 7);
                assert_eq!(vertex_count, 2);
            }
            other => panic!("expected BadIndex, got {other:?}"),
        }
    }

    #[test]
    fn spiral_progress_register_runs_zero_to_one() {
        let (mut arena, rasterizer, mut sink) = context();
        let basis = Basis::from_normal(Vec3::Y);
        let mut progress = Vec::new();
        let mut shader = |fragment: &Fragment| {
            progress.push(fragment.registers[0]);
            flat(fragment)
        };
        let mut sampler = ShapeSampler::new(&mut arena, &rasterizer);
        sampler.spiral(&basis, 0.9, 2.0, 64, &mut shader, &mut sink, 0.0);
        assert!((progress[0] - 0.0).abs() < 1e-6);
        assert!((progress[progress.len() - 1] - 1.0).abs() < 1e-6);
        assert!(progress.windows(2).all(|w| w[0] <= w[1] + 1e-6));
    }
}
