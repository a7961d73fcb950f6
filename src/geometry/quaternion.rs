use std::ops::{Add, Div, Mul, Sub};

use crate::geometry::{Interpolable, Vec3, PARALLEL_LIMIT};

const SPERICAL_INTERPOLATION_LIMIT: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let half = angle / 2.0;
        let s = half.sin();
        Quaternion {
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
            w: half.cos(),
        }
    }

    /// Rotation carrying unit vector `from` onto unit vector `to` along
    /// the shorter arc. Antipodal inputs rotate around a deterministic
    /// perpendicular axis.
    pub fn between(from: Vec3, to: Vec3) -> Self {
        let angle = from.angle_to(to);
        if angle < PARALLEL_LIMIT {
            return Quaternion::IDENTITY;
        }
        let axis = if angle > std::f32::consts::PI - PARALLEL_LIMIT {
            let reference = if from.dot(Vec3::Z).abs() > 1.0 - PARALLEL_LIMIT {
                Vec3::X
            } else {
                Vec3::Z
            };
            from.cross(reference).normalize()
        } else {
            from.cross(to).normalize()
        };
        Quaternion::from_axis_angle(axis, angle)
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    pub fn normalize(self) -> Self {
        self / self.dot(self).sqrt()
    }

    pub fn conjugate(self) -> Self {
        Quaternion {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: self.w,
        }
    }

    /// Rotates a unit vector, renormalizing the result.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Quaternion {
            x: v.x,
            y: v.y,
            z: v.z,
            w: 0.0,
        };
        let rotated = self * p * self.conjugate();
        Vec3::new(rotated.x, rotated.y, rotated.z).normalize()
    }

    pub fn real_linear_interpolation(self, other: Self, alpha: f32) -> Self {
        self * (1.0 - alpha) + other * alpha
    }
}

impl Interpolable for Quaternion {
    fn linear_interpolation(self, other: Self, alpha: f32) -> Self {
        let d = self.dot(other);
        // rounding can push the dot of two unit quaternions past 1
        let angle = d.abs().min(1.0).acos();
        let target = other * d.signum();
        let norm = angle.sin();
        if norm < SPERICAL_INTERPOLATION_LIMIT {
            // avoid dividing by a very small number
            return self.real_linear_interpolation(target, alpha).normalize();
        }
        (self * (((1.0 - alpha) * angle).sin() / norm) + target * ((alpha * angle).sin() / norm))
            .normalize()
    }
}

impl Add for Quaternion {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
            w: self.w + other.w,
        }
    }
}

impl Sub for Quaternion {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
            w: self.w - other.w,
        }
    }
}

impl Mul for Quaternion {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Self {
            x: self.x * other.w + self.w * other.x + self.y * other.z - self.z * other.y,
            y: self.y * other.w + self.w * other.y + self.z * other.x - self.x * other.z,
            z: self.z * other.w + self.w * other.z + self.x * other.y - self.y * other.x,
            w: self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
        }
    }
}

impl Mul<f32> for Quaternion {
    type Output = Self;

    fn mul(self, other: f32) -> Self {
        Self {
            x: self.x * other,
            y: self.y * other,
            z: self.z * other,
            w: self.w * other,
        }
    }
}

impl Div<f32> for Quaternion {
    type Output = Self;

    fn div(self, other: f32) -> Self {
        Self {
            x: self.x / other,
            y: self.y / other,
            z: self.z / other,
            w: self.w / other,
        }
    }
}

impl From<[f32; 4]> for Quaternion {
    fn from(value: [f32; 4]) -> Self {
        Self {
            x: value[0],
            y: value[1],
            z: value[2],
            w: value[3],
        }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::IDENTITY
    }
}
