use crate::geometry::{Vec3, PARALLEL_LIMIT};

/// Orthonormal frame on the unit sphere: a center direction plus two
/// tangent directions spanning the tangent plane at that center.
#[derive(Clone, Copy, Debug)]
pub struct Basis {
    pub normal: Vec3,
    pub east: Vec3,
    pub north: Vec3,
}

impl Basis {
    pub fn from_normal(normal: Vec3) -> Self {
        let normal = normal.normalize();
        let reference = if normal.dot(Vec3::Z).abs() > 1.0 - PARALLEL_LIMIT {
            Vec3::X
        } else {
            Vec3::Z
        };
        let east = reference.cross(normal).normalize();
        let north = normal.cross(east);
        Basis {
            normal,
            east,
            north,
        }
    }

    /// Frame centered on the opposite hemisphere, keeping the east axis.
    pub fn flipped(&self) -> Self {
        Basis {
            normal: -self.normal,
            east: self.east,
            north: -self.normal.cross(self.east),
        }
    }

    /// Point at a central angle from the normal, at an azimuth measured
    /// from east towards north.
    pub fn point_at(&self, angle: f32, azimuth: f32) -> Vec3 {
        let tangent = self.east * azimuth.cos() + self.north * azimuth.sin();
        (self.normal * angle.cos() + tangent * angle.sin()).normalize()
    }

    /// Azimuthal-equidistant projection into tangent-plane coordinates.
    /// Radius in the plane equals the central angle on the sphere.
    pub fn project(&self, v: Vec3) -> (f32, f32) {
        let radius = self.normal.angle_to(v);
        if radius < PARALLEL_LIMIT {
            return (0.0, 0.0);
        }
        let tangential = v - self.normal * v.dot(self.normal);
        if tangential.norm() < PARALLEL_LIMIT {
            // antipode of the center: every azimuth is equally valid
            return (radius, 0.0);
        }
        let direction = tangential.normalize();
        (
            radius * direction.dot(self.east),
            radius * direction.dot(self.north),
        )
    }

    /// Inverse of `project`.
    pub fn unproject(&self, x: f32, y: f32) -> Vec3 {
        let radius = x.hypot(y);
        if radius < PARALLEL_LIMIT {
            return self.normal;
        }
        let tangent = self.east * (x / radius) + self.north * (y / radius);
        (self.normal * radius.cos() + tangent * radius.sin()).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn basis_is_orthonormal_for_generic_normal() {
        let basis = Basis::from_normal(Vec3::new(0.3, -0.8, 0.5));
        assert!(basis.normal.dot(basis.east).abs() < 1e-6);
        assert!(basis.normal.dot(basis.north).abs() < 1e-6);
        assert!(basis.east.dot(basis.north).abs() < 1e-6);
        assert!((basis.east.norm() - 1.0).abs() < 1e-6);
        assert!((basis.north.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn basis_falls_back_when_normal_is_the_reference_axis() {
        let basis = Basis::from_normal(Vec3::Z);
        assert!(basis.east.norm().is_finite());
        assert!((basis.east.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn project_unproject_round_trips_within_the_front_hemisphere() {
        let basis = Basis::from_normal(Vec3::Y);
        let point = basis.point_at(1.2, 0.7);
        let (x, y) = basis.project(point);
        let back = basis.unproject(x, y);
        assert!((back - point).norm() < 1e-5, "got {back:?}");
    }

    #[test]
    fn projected_radius_equals_central_angle() {
        let basis = Basis::from_normal(Vec3::Y);
        let point = basis.point_at(FRAC_PI_2, 0.0);
        let (x, y) = basis.project(point);
        assert!((x.hypot(y) - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn antipode_projects_without_nan() {
        let basis = Basis::from_normal(Vec3::Y);
        let (x, y) = basis.project(-Vec3::Y);
        assert!(x.is_finite() && y.is_finite());
        assert!((x.hypot(y) - PI).abs() < 1e-3);
    }
}
