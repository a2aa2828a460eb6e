use crate::coordsys::{CoordSys, SectorFrame};
use crate::error::{Result, normalize_index};
use crate::geometry::{Direction3, Plane, Vector3};

use super::superlayer::Superlayer;

/// Region quantities shared with its superlayers and layers
#[derive(Debug, Clone, Copy)]
pub(crate) struct RegionFrame {
    pub sector: usize,
    pub thopen: f64,
    pub thtilt: f64,
    pub xdist: f64,
}

impl RegionFrame {
    /// Left end plate in sector coordinates
    pub fn left_end_plate(&self) -> Plane {
        let half = 0.5 * self.thopen;
        Plane::new(
            Vector3::new(self.xdist, 0.0, 0.0),
            Direction3::new(half.cos().atan2(half.sin()), std::f64::consts::FRAC_PI_2),
        )
    }

    /// Right end plate in sector coordinates
    pub fn right_end_plate(&self) -> Plane {
        let half = 0.5 * self.thopen;
        Plane::new(
            Vector3::new(self.xdist, 0.0, 0.0),
            Direction3::new((-half.cos()).atan2(half.sin()), std::f64::consts::FRAC_PI_2),
        )
    }
}

/// One of the three drift chamber regions of a sector
#[derive(Debug, Clone)]
pub struct Region {
    pub(super) index: usize,
    pub(super) frame: RegionFrame,
    pub(super) dist2tgt: f64,
    pub(super) frontgap: f64,
    pub(super) midgap: f64,
    pub(super) backgap: f64,
    pub(super) superlayers: Vec<Superlayer>,
}

impl Region {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn sector_index(&self) -> usize {
        self.frame.sector
    }

    pub fn superlayers(&self) -> &[Superlayer] {
        &self.superlayers
    }

    pub fn superlayer(&self, idx: isize) -> Result<&Superlayer> {
        let i = normalize_index("superlayer", idx, self.superlayers.len())?;
        Ok(&self.superlayers[i])
    }

    pub fn dist2tgt(&self) -> f64 {
        self.dist2tgt
    }

    pub fn frontgap(&self) -> f64 {
        self.frontgap
    }

    pub fn midgap(&self) -> f64 {
        self.midgap
    }

    pub fn backgap(&self) -> f64 {
        self.backgap
    }

    pub fn thopen(&self) -> f64 {
        self.frame.thopen
    }

    pub fn thtilt(&self) -> f64 {
        self.frame.thtilt
    }

    pub fn xdist(&self) -> f64 {
        self.frame.xdist
    }

    /// Gaps plus every superlayer
    pub fn thickness(&self) -> f64 {
        self.frontgap
            + self.midgap
            + self.backgap
            + self.superlayers.iter().map(Superlayer::thickness).sum::<f64>()
    }

    pub fn left_end_plate(&self, coordsys: CoordSys) -> Result<Plane> {
        let coordsys = coordsys.require_sector_or_clas("end plate")?;
        Ok(SectorFrame::new(self.frame.sector).plane_in(self.frame.left_end_plate(), coordsys))
    }

    pub fn right_end_plate(&self, coordsys: CoordSys) -> Result<Plane> {
        let coordsys = coordsys.require_sector_or_clas("end plate")?;
        Ok(SectorFrame::new(self.frame.sector).plane_in(self.frame.right_end_plate(), coordsys))
    }

    /// Midpoint between the first and last guard wire endpoints, in the
    /// sector's y = 0 plane
    pub fn center(&self, coordsys: CoordSys) -> Result<Vector3> {
        let coordsys = coordsys.require_sector_or_clas("region center")?;
        let first = self
            .superlayer(0)?
            .guardlayer(0)?
            .wire(0, CoordSys::Sector)?
            .end_point();
        let last = self
            .superlayer(-1)?
            .guardlayer(-1)?
            .wire(-1, CoordSys::Sector)?
            .end_point();
        let mut center = first.midpoint(&last);
        center.y = 0.0;
        Ok(SectorFrame::new(self.frame.sector).vector_in(center, coordsys))
    }
}
