//! Euclidean vectors in two and three dimensions.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use super::TOLERANCE;

/// A point or displacement in three dimensions
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Build from spherical coordinates `(r, phi, theta)`
    pub fn from_spherical(r: f64, phi: f64, theta: f64) -> Self {
        let (sin_t, cos_t) = theta.sin_cos();
        let (sin_p, cos_p) = phi.sin_cos();
        Self::new(r * sin_t * cos_p, r * sin_t * sin_p, r * cos_t)
    }

    pub fn r2(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn r(&self) -> f64 {
        self.r2().sqrt()
    }

    /// Distance from the z axis
    pub fn rho(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn costheta(&self) -> f64 {
        let r = self.r();
        if r < 2.0 * TOLERANCE { 1.0 } else { self.z / r }
    }

    pub fn theta(&self) -> f64 {
        self.costheta().clamp(-1.0, 1.0).acos()
    }

    pub fn set_r(&mut self, r: f64) {
        *self = Self::from_spherical(r, self.phi(), self.theta());
    }

    pub fn set_phi(&mut self, phi: f64) {
        *self = Self::from_spherical(self.r(), phi, self.theta());
    }

    pub fn set_theta(&mut self, theta: f64) {
        *self = Self::from_spherical(self.r(), self.phi(), theta);
    }

    /// Copy of this vector with its azimuthal angle shifted by `dphi`
    pub fn rotated_phi(&self, dphi: f64) -> Self {
        let (s, c) = dphi.sin_cos();
        Self::new(self.x * c - self.y * s, self.x * s + self.y * c, self.z)
    }

    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vector3) -> Vector3 {
        Vector3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Component of this vector along `onto`
    pub fn projection(&self, onto: &Vector3) -> Vector3 {
        let denom = onto.r2();
        if denom < TOLERANCE {
            return Vector3::ZERO;
        }
        *onto * (self.dot(onto) / denom)
    }

    /// Angle between two vectors in radians
    pub fn angle(&self, other: &Vector3) -> f64 {
        let denom = self.r() * other.r();
        if denom < TOLERANCE {
            return 0.0;
        }
        let c = self.dot(other) / denom;
        if c > 1.0 - 10.0 * TOLERANCE {
            0.0
        } else if c < -1.0 + 10.0 * TOLERANCE {
            std::f64::consts::PI
        } else {
            c.acos()
        }
    }

    pub fn is_parallel(&self, other: &Vector3) -> bool {
        let a = self.angle(other);
        a < TOLERANCE.sqrt() || (std::f64::consts::PI - a) < TOLERANCE.sqrt()
    }

    pub fn midpoint(&self, other: &Vector3) -> Vector3 {
        (*self + *other) * 0.5
    }
}

impl Add for Vector3 {
    type Output = Vector3;
    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, rhs: Vector3) {
        *self = *self + rhs;
    }
}

impl Sub for Vector3 {
    type Output = Vector3;
    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vector3 {
    fn sub_assign(&mut self, rhs: Vector3) {
        *self = *self - rhs;
    }
}

impl Neg for Vector3 {
    type Output = Vector3;
    fn neg(self) -> Vector3 {
        Vector3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Vector3;
    fn mul(self, rhs: f64) -> Vector3 {
        Vector3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Vector3> for f64 {
    type Output = Vector3;
    fn mul(self, rhs: Vector3) -> Vector3 {
        rhs * self
    }
}

impl Div<f64> for Vector3 {
    type Output = Vector3;
    fn div(self, rhs: f64) -> Vector3 {
        Vector3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

/// A point or displacement in the plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn r(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn dot(&self, other: &Vector2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the three dimensional cross product
    pub fn cross(&self, other: &Vector2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn rotated(&self, angle: f64) -> Vector2 {
        let (s, c) = angle.sin_cos();
        Vector2::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }
}

impl Add for Vector2 {
    type Output = Vector2;
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Vector2;
    fn mul(self, rhs: f64) -> Vector2 {
        Vector2::new(self.x * rhs, self.y * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_spherical_accessors() {
        let v = Vector3::new(0.0, 3.0, 4.0);
        assert!(close(v.r(), 5.0));
        assert!(close(v.rho(), 3.0));
        assert!(close(v.phi(), FRAC_PI_2));
        assert!(close(v.costheta(), 0.8));
        assert!(close(Vector3::ZERO.costheta(), 1.0));
    }

    #[test]
    fn test_setters_keep_other_components() {
        let mut v = Vector3::from_spherical(2.0, 0.3, 1.1);
        v.set_r(5.0);
        assert!(close(v.r(), 5.0));
        assert!(close(v.phi(), 0.3));
        assert!(close(v.theta(), 1.1));

        v.set_phi(-1.0);
        assert!(close(v.phi(), -1.0));
        assert!(close(v.r(), 5.0));
    }

    #[test]
    fn test_cross_and_angle() {
        let x = Vector3::new(1.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(&y), Vector3::new(0.0, 0.0, 1.0));
        assert!(close(x.angle(&y), FRAC_PI_2));
        assert!(close(x.angle(&-x), PI));
        assert_eq!(x.angle(&(x * 3.0)), 0.0);
        assert!(x.is_parallel(&(x * -2.0)));
        assert!(!x.is_parallel(&y));
    }

    #[test]
    fn test_projection() {
        let v = Vector3::new(2.0, 3.0, 0.0);
        let p = v.projection(&Vector3::new(5.0, 0.0, 0.0));
        assert_eq!(p, Vector3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_vector2_rotation() {
        let v = Vector2::new(1.0, 0.0).rotated(FRAC_PI_2);
        assert!(close(v.x, 0.0));
        assert!(close(v.y, 1.0));
        assert!(close(Vector2::new(1.0, 0.0).cross(&Vector2::new(0.0, 1.0)), 1.0));
    }
}
