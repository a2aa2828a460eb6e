use serde::{Deserialize, Serialize};

use super::{Direction3, Line3, TOLERANCE, Vector3};
use crate::error::{GeometryError, Result};

/// A plane given by one of its points and its unit normal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub point: Vector3,
    pub normal: Direction3,
}

impl Plane {
    pub fn new(point: Vector3, normal: Direction3) -> Self {
        Self { point, normal }
    }

    /// Signed distance from the plane, positive on the normal's side
    pub fn distance(&self, p: &Vector3) -> f64 {
        (*p - self.point).dot(&self.normal.to_vector())
    }

    pub fn projection(&self, p: &Vector3) -> Vector3 {
        *p - self.normal.scaled(self.distance(p))
    }

    /// Project a line onto this plane. Fails for lines along the normal.
    pub fn projection_line(&self, line: &Line3) -> Result<Line3> {
        let d = line.direction.to_vector();
        let n = self.normal.to_vector();
        let in_plane = d - n * d.dot(&n);
        Ok(Line3::new(
            self.projection(&line.point),
            Direction3::from_vector(&in_plane)?,
        ))
    }

    /// Crossing point of a line with this plane
    pub fn intersection(&self, line: &Line3) -> Result<Vector3> {
        let n = self.normal.to_vector();
        let denom = n.dot(&line.direction.to_vector());
        if denom.abs() < TOLERANCE {
            return Err(GeometryError::math("line is parallel to plane"));
        }
        let t = n.dot(&(self.point - line.point)) / denom;
        Ok(line.point_at(t))
    }

    /// Line common to two planes
    pub fn intersection_plane(&self, other: &Plane) -> Result<Line3> {
        let n1 = self.normal.to_vector();
        let n2 = other.normal.to_vector();
        let dir = n1.cross(&n2);
        if dir.r() < TOLERANCE {
            return Err(GeometryError::math("planes are parallel"));
        }
        let h1 = n1.dot(&self.point);
        let h2 = n2.dot(&other.point);
        let b = n1.dot(&n2);
        let denom = 1.0 - b * b;
        let c1 = (h1 - h2 * b) / denom;
        let c2 = (h2 - h1 * b) / denom;
        Ok(Line3::new(n1 * c1 + n2 * c2, Direction3::from_vector(&dir)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn xy_plane_at(z: f64) -> Plane {
        Plane::new(Vector3::new(0.0, 0.0, z), Direction3::new(0.0, 0.0))
    }

    #[test]
    fn test_line_intersection() {
        let line = Line3::new(
            Vector3::new(1.0, 2.0, 0.0),
            Direction3::from_components(0.0, 1.0, 1.0).unwrap(),
        );
        let p = xy_plane_at(3.0).intersection(&line).unwrap();
        assert!(close(p.x, 1.0));
        assert!(close(p.y, 5.0));
        assert!(close(p.z, 3.0));

        let flat = Line3::new(Vector3::ZERO, Direction3::new(0.0, FRAC_PI_2));
        assert!(xy_plane_at(3.0).intersection(&flat).is_err());
    }

    #[test]
    fn test_plane_plane_intersection() {
        let a = xy_plane_at(2.0);
        let b = Plane::new(Vector3::new(5.0, 0.0, 0.0), Direction3::new(0.0, FRAC_PI_2));
        let line = a.intersection_plane(&b).unwrap();
        assert!(close(line.point.x, 5.0));
        assert!(close(line.point.z, 2.0));
        assert!(close(line.direction.y().abs(), 1.0));
        assert!(a.intersection_plane(&xy_plane_at(7.0)).is_err());
    }

    #[test]
    fn test_distance_and_projection() {
        let plane = xy_plane_at(1.0);
        assert!(close(plane.distance(&Vector3::new(3.0, 3.0, -1.0)), -2.0));
        let p = plane.projection(&Vector3::new(3.0, 3.0, -1.0));
        assert!(close(p.z, 1.0));

        let line = Line3::new(
            Vector3::new(0.0, 0.0, 5.0),
            Direction3::from_components(1.0, 0.0, 1.0).unwrap(),
        );
        let proj = plane.projection_line(&line).unwrap();
        assert!(close(proj.point.z, 1.0));
        assert!(close(proj.direction.x(), 1.0));
    }
}
