pub use basis::Basis;
pub use quaternion::Quaternion;
pub use vec3::Vec3;

mod basis;
mod quaternion;
mod vec3;

/// Dot-product threshold below which two directions are treated as parallel.
pub const PARALLEL_LIMIT: f32 = 1e-4;

pub trait Interpolable {
    fn linear_interpolation(self, other: Self, alpha: f32) -> Self;
}

impl Interpolable for f32 {
    fn linear_interpolation(self, other: Self, alpha: f32) -> Self {
        self * (1.0 - alpha) + other * alpha
    }
}
