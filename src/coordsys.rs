//! Coordinate systems and the sector to lab transform.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};
use crate::geometry::{Direction3, Line3, LineSegment3, Plane, Vector3};

/// Azimuthal width of one sector. The truncated pi matches the
/// historical CLAS12 reconstruction and is kept for bit-compatibility.
#[allow(clippy::approx_constant)]
pub const SECTOR_PHI_STEP: f64 = 3.14159 / 3.0;

/// Frame a quantity is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordSys {
    /// Lab frame
    Clas,
    /// x through the middle of the sector, z along the beam
    Sector,
    /// Local to a single detector layer
    Layer,
}

impl CoordSys {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordSys::Clas => "clas",
            CoordSys::Sector => "sector",
            CoordSys::Layer => "layer",
        }
    }

    /// Fail unless this is SECTOR or CLAS
    pub(crate) fn require_sector_or_clas(self, what: &'static str) -> Result<Self> {
        match self {
            CoordSys::Clas | CoordSys::Sector => Ok(self),
            other => Err(GeometryError::UnsupportedCoordSys {
                what,
                coordsys: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for CoordSys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoordSys {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "clas" => Ok(CoordSys::Clas),
            "sector" => Ok(CoordSys::Sector),
            "layer" => Ok(CoordSys::Layer),
            _ => Err(GeometryError::CoordSys(s.to_string())),
        }
    }
}

/// Moves sector-frame quantities of one sector into the lab frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorFrame {
    pub sector: usize,
}

impl SectorFrame {
    pub fn new(sector: usize) -> Self {
        Self { sector }
    }

    pub fn phi(&self) -> f64 {
        self.sector as f64 * SECTOR_PHI_STEP
    }

    pub fn vector(&self, v: Vector3) -> Vector3 {
        v.rotated_phi(self.phi())
    }

    pub fn direction(&self, d: Direction3) -> Direction3 {
        d.rotated_phi(self.phi())
    }

    pub fn line(&self, l: Line3) -> Line3 {
        Line3::new(self.vector(l.point), self.direction(l.direction))
    }

    pub fn segment(&self, s: LineSegment3) -> LineSegment3 {
        s.map(|p| self.vector(p))
    }

    pub fn plane(&self, p: Plane) -> Plane {
        Plane::new(self.vector(p.point), self.direction(p.normal))
    }

    /// Apply the transform only when `coordsys` is CLAS
    pub fn vector_in(&self, v: Vector3, coordsys: CoordSys) -> Vector3 {
        if coordsys == CoordSys::Clas { self.vector(v) } else { v }
    }

    pub fn direction_in(&self, d: Direction3, coordsys: CoordSys) -> Direction3 {
        if coordsys == CoordSys::Clas { self.direction(d) } else { d }
    }

    pub fn segment_in(&self, s: LineSegment3, coordsys: CoordSys) -> LineSegment3 {
        if coordsys == CoordSys::Clas { self.segment(s) } else { s }
    }

    pub fn plane_in(&self, p: Plane, coordsys: CoordSys) -> Plane {
        if coordsys == CoordSys::Clas { self.plane(p) } else { p }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordsys() {
        assert_eq!("CLAS".parse::<CoordSys>().unwrap(), CoordSys::Clas);
        assert_eq!("sector".parse::<CoordSys>().unwrap(), CoordSys::Sector);
        assert_eq!("Layer".parse::<CoordSys>().unwrap(), CoordSys::Layer);
        assert!("lab".parse::<CoordSys>().is_err());
        assert_eq!(CoordSys::Sector.to_string(), "sector");
    }

    #[test]
    fn test_sector_to_clas_rotates_phi() {
        let frame = SectorFrame::new(2);
        let v = frame.vector(Vector3::new(10.0, 0.0, 5.0));
        assert!((v.phi() - 2.0 * SECTOR_PHI_STEP).abs() < 1e-12);
        assert!((v.rho() - 10.0).abs() < 1e-12);
        assert_eq!(v.z, 5.0);

        let same = frame.vector_in(Vector3::new(1.0, 2.0, 3.0), CoordSys::Sector);
        assert_eq!(same, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_sector_zero_is_identity() {
        let frame = SectorFrame::new(0);
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(frame.vector(v), v);
    }

    #[test]
    fn test_require_sector_or_clas() {
        assert!(CoordSys::Clas.require_sector_or_clas("wire").is_ok());
        let err = CoordSys::Layer.require_sector_or_clas("wire").unwrap_err();
        assert_eq!(err.to_string(), "wire not defined in layer coordinates");
    }
}
