//! Euclidean geometry primitives used by every detector.
//!
//! All quantities are `f64`; lengths carry whatever unit the caller uses
//! (the detectors work in centimetres) and angles are radians.

mod direction;
mod line;
mod plane;
mod rotation;
mod vector;

pub use direction::{Direction2, Direction3};
pub use line::{Line2, Line3, LineSegment3, line_line_intersection, projection, shortest_connection};
pub use plane::Plane;
pub use rotation::{Axis, Rotation2, Rotation3};
pub use vector::{Vector2, Vector3};

/// Comparison tolerance for degenerate cases
pub const TOLERANCE: f64 = f64::EPSILON;

/// Degrees to radians, with the precision the CCDB constants were tuned with
#[allow(clippy::approx_constant)]
pub const DEG2RAD: f64 = 3.14159265358979 / 180.0;

/// Radians to degrees for gemc output
pub const RAD2DEG: f64 = 180.0 / std::f64::consts::PI;

/// Millimetres to centimetres
pub const MM2CM: f64 = 0.1;
