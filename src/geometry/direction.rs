//! Unit direction vectors stored by their angles.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::{TOLERANCE, Vector2, Vector3};
use crate::error::{GeometryError, Result};

/// Wrap an angle into (-pi, pi], snapping tiny values to zero
fn wrap_phi(phi: f64) -> f64 {
    let mut p = phi % (2.0 * PI);
    if p > PI {
        p -= 2.0 * PI;
    } else if p <= -PI {
        p += 2.0 * PI;
    }
    if p.abs() < 100.0 * TOLERANCE { 0.0 } else { p }
}

/// A unit vector in three dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction3 {
    phi: f64,
    theta: f64,
}

impl Direction3 {
    /// Build from azimuthal and polar angles, folding theta into [0, pi]
    pub fn new(phi: f64, theta: f64) -> Self {
        let mut phi = phi;
        let mut theta = theta % (2.0 * PI);
        if theta > PI {
            theta -= 2.0 * PI;
        } else if theta < -PI {
            theta += 2.0 * PI;
        }
        if theta < 0.0 {
            theta = -theta;
            phi += PI;
        }
        if theta < TOLERANCE {
            return Self {
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            phi: wrap_phi(phi),
            theta,
        }
    }

    /// Normalise an arbitrary vector
    pub fn from_components(x: f64, y: f64, z: f64) -> Result<Self> {
        Self::from_vector(&Vector3::new(x, y, z))
    }

    pub fn from_vector(v: &Vector3) -> Result<Self> {
        if v.r() < TOLERANCE {
            return Err(GeometryError::math(
                "can not build a direction from a zero-length vector",
            ));
        }
        Ok(Self::new(v.phi(), v.theta()))
    }

    pub fn phi(&self) -> f64 {
        self.phi
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn x(&self) -> f64 {
        self.theta.sin() * self.phi.cos()
    }

    pub fn y(&self) -> f64 {
        self.theta.sin() * self.phi.sin()
    }

    pub fn z(&self) -> f64 {
        self.theta.cos()
    }

    pub fn to_vector(&self) -> Vector3 {
        Vector3::new(self.x(), self.y(), self.z())
    }

    /// Vector of length `len` along this direction
    pub fn scaled(&self, len: f64) -> Vector3 {
        self.to_vector() * len
    }

    pub fn dot(&self, other: &Direction3) -> f64 {
        self.to_vector().dot(&other.to_vector())
    }

    pub fn cross(&self, other: &Direction3) -> Result<Direction3> {
        let c = self.to_vector().cross(&other.to_vector());
        if c.r() < TOLERANCE {
            return Err(GeometryError::math("cross product of parallel directions"));
        }
        Direction3::from_vector(&c)
    }

    pub fn angle(&self, other: &Direction3) -> f64 {
        self.to_vector().angle(&other.to_vector())
    }

    pub fn rotated_phi(&self, dphi: f64) -> Direction3 {
        Direction3::new(self.phi + dphi, self.theta)
    }
}

impl std::ops::Neg for Direction3 {
    type Output = Direction3;
    fn neg(self) -> Direction3 {
        Direction3::new(self.phi + PI, PI - self.theta)
    }
}

/// A unit vector in the plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction2 {
    phi: f64,
}

impl Direction2 {
    pub fn new(phi: f64) -> Self {
        Self {
            phi: wrap_phi(phi),
        }
    }

    pub fn from_vector(v: &Vector2) -> Result<Self> {
        if v.r() < TOLERANCE {
            return Err(GeometryError::math(
                "can not build a direction from a zero-length vector",
            ));
        }
        Ok(Self::new(v.phi()))
    }

    pub fn phi(&self) -> f64 {
        self.phi
    }

    pub fn x(&self) -> f64 {
        self.phi.cos()
    }

    pub fn y(&self) -> f64 {
        self.phi.sin()
    }

    pub fn to_vector(&self) -> Vector2 {
        Vector2::new(self.x(), self.y())
    }
}
