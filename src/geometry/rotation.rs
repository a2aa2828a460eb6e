//! Rotations as 3x3 matrices.

use std::ops::Mul;

use super::{Direction3, Vector2, Vector3};
use crate::error::Result;

/// Axis of an elementary rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Proper rotation in three dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation3 {
    m: [[f64; 3]; 3],
}

impl Rotation3 {
    pub const IDENTITY: Rotation3 = Rotation3 {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Right-handed rotation by `angle` about a coordinate axis
    pub fn about(axis: Axis, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let m = match axis {
            Axis::X => [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]],
            Axis::Y => [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]],
            Axis::Z => [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]],
        };
        Self { m }
    }

    /// Rodrigues rotation about an arbitrary direction
    pub fn axis_angle(axis: &Direction3, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.x(), axis.y(), axis.z());
        Self {
            m: [
                [t * x * x + c, t * x * y - s * z, t * x * z + s * y],
                [t * x * y + s * z, t * y * y + c, t * y * z - s * x],
                [t * x * z - s * y, t * y * z + s * x, t * z * z + c],
            ],
        }
    }

    /// Intrinsic z-x-z Euler angles
    pub fn euler_zxz(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self::about(Axis::Z, alpha) * Self::about(Axis::X, beta) * Self::about(Axis::Z, gamma)
    }

    /// Intrinsic z-y-z Euler angles
    pub fn euler_zyz(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self::about(Axis::Z, alpha) * Self::about(Axis::Y, beta) * Self::about(Axis::Z, gamma)
    }

    pub fn inverse(&self) -> Self {
        let mut m = [[0.0; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = self.m[j][i];
            }
        }
        Self { m }
    }

    pub fn apply(&self, v: &Vector3) -> Vector3 {
        let m = &self.m;
        Vector3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    pub fn apply_direction(&self, d: &Direction3) -> Result<Direction3> {
        Direction3::from_vector(&self.apply(&d.to_vector()))
    }
}

impl Mul for Rotation3 {
    type Output = Rotation3;
    fn mul(self, rhs: Rotation3) -> Rotation3 {
        let mut m = [[0.0; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (0..3).map(|k| self.m[i][k] * rhs.m[k][j]).sum();
            }
        }
        Rotation3 { m }
    }
}

impl Mul<Vector3> for Rotation3 {
    type Output = Vector3;
    fn mul(self, rhs: Vector3) -> Vector3 {
        self.apply(&rhs)
    }
}

/// Rotation in the plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation2 {
    pub angle: f64,
}

impl Rotation2 {
    pub fn new(angle: f64) -> Self {
        Self { angle }
    }

    pub fn apply(&self, v: &Vector2) -> Vector2 {
        v.rotated(self.angle)
    }
}
