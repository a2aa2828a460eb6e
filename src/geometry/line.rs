//! Infinite lines and line segments.

use serde::{Deserialize, Serialize};

use super::{Direction2, Direction3, Plane, TOLERANCE, Vector2, Vector3};
use crate::error::{GeometryError, Result};

/// An infinite line through `point` along `direction`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line3 {
    pub point: Vector3,
    pub direction: Direction3,
}

impl Line3 {
    pub fn new(point: Vector3, direction: Direction3) -> Self {
        Self { point, direction }
    }

    /// Line through two distinct points
    pub fn through(p1: Vector3, p2: Vector3) -> Result<Self> {
        Ok(Self::new(p1, Direction3::from_vector(&(p2 - p1))?))
    }

    pub fn point_at(&self, t: f64) -> Vector3 {
        self.point + self.direction.scaled(t)
    }

    /// Foot of the perpendicular from `p` onto this line
    pub fn closest_point(&self, p: &Vector3) -> Vector3 {
        let d = self.direction.to_vector();
        self.point + d * (*p - self.point).dot(&d)
    }

    /// Distance of closest approach to a point
    pub fn doca(&self, p: &Vector3) -> f64 {
        let d = self.direction.to_vector();
        let c = *p - self.point;
        (c - d * c.dot(&d)).r()
    }

    /// Distance of closest approach between two lines
    pub fn doca_line(&self, other: &Line3) -> f64 {
        let c = other.point - self.point;
        let n = self
            .direction
            .to_vector()
            .cross(&other.direction.to_vector());
        if n.r() < TOLERANCE {
            // parallel: perpendicular distance between the two lines
            return c.r() * c.angle(&self.direction.to_vector()).sin();
        }
        c.dot(&n).abs() / n.r()
    }
}

/// A finite segment between two points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment3 {
    begin: Vector3,
    end: Vector3,
}

impl LineSegment3 {
    pub fn new(begin: Vector3, end: Vector3) -> Self {
        Self { begin, end }
    }

    pub fn from_direction(begin: Vector3, direction: Direction3, length: f64) -> Self {
        Self::new(begin, begin + direction.scaled(length))
    }

    pub fn begin_point(&self) -> Vector3 {
        self.begin
    }

    pub fn end_point(&self) -> Vector3 {
        self.end
    }

    pub fn mid_point(&self) -> Vector3 {
        self.begin.midpoint(&self.end)
    }

    pub fn length(&self) -> f64 {
        (self.end - self.begin).r()
    }

    pub fn direction(&self) -> Result<Direction3> {
        Direction3::from_vector(&(self.end - self.begin))
    }

    /// The infinite line containing this segment
    pub fn line(&self) -> Result<Line3> {
        Ok(Line3::new(self.begin, self.direction()?))
    }

    pub(crate) fn map(&self, f: impl Fn(Vector3) -> Vector3) -> Self {
        Self::new(f(self.begin), f(self.end))
    }
}

/// An infinite line in the plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line2 {
    pub point: Vector2,
    pub direction: Direction2,
}

impl Line2 {
    pub fn new(point: Vector2, direction: Direction2) -> Self {
        Self { point, direction }
    }

    pub fn point_at(&self, t: f64) -> Vector2 {
        self.point + self.direction.to_vector() * t
    }

    /// Crossing point of two lines, solved with Cramer's rule
    pub fn intersection(&self, other: &Line2) -> Result<Vector2> {
        let d1 = self.direction.to_vector();
        let d2 = other.direction.to_vector();
        let det = d1.cross(&d2);
        if det.abs() < TOLERANCE {
            return Err(GeometryError::math("lines are parallel"));
        }
        let c = other.point - self.point;
        let t = c.cross(&d2) / det;
        Ok(self.point_at(t))
    }
}

/// Foot of the perpendicular from `point` onto `line`
pub fn projection(point: &Vector3, line: &Line3) -> Result<Vector3> {
    Plane::new(*point, line.direction).intersection(line)
}

/// Shortest segment joining two skew lines, from `l1` to `l2`
pub fn shortest_connection(l1: &Line3, l2: &Line3) -> Result<LineSegment3> {
    let d1 = l1.direction.to_vector();
    let d2 = l2.direction.to_vector();
    let w = l1.point - l2.point;
    let b = d1.dot(&d2);
    let denom = 1.0 - b * b;
    if denom.abs() < TOLERANCE {
        return Err(GeometryError::math("lines are parallel"));
    }
    let d = d1.dot(&w);
    let e = d2.dot(&w);
    let s = (b * e - d) / denom;
    let t = (e - b * d) / denom;
    Ok(LineSegment3::new(l1.point_at(s), l2.point_at(t)))
}

/// Midpoint of the shortest connection between two lines
pub fn line_line_intersection(l1: &Line3, l2: &Line3) -> Result<Vector3> {
    Ok(shortest_connection(l1, l2)?.mid_point())
}
