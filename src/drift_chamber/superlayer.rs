use std::f64::consts::PI;

use crate::coordsys::{CoordSys, SectorFrame};
use crate::error::{Result, normalize_index};
use crate::geometry::Direction3;

use super::layer::{Guardlayer, Senselayer};
use super::region::RegionFrame;

/// Superlayer quantities every wire layer needs
#[derive(Debug, Clone, Copy)]
pub(crate) struct SuperlayerFrame {
    pub region: RegionFrame,
    pub thster: f64,
    pub thmin: f64,
    pub wpdist: f64,
    pub cellthickness: f64,
    /// Distance from the target to the first guard wire plane
    pub dist2tgt: f64,
    pub thickness: f64,
}

impl SuperlayerFrame {
    pub fn layer_thickness(&self) -> f64 {
        self.cellthickness * self.wpdist
    }

    pub fn first_wire_mid_dist2tgt(&self) -> f64 {
        self.dist2tgt / (self.region.thtilt - self.thmin).cos()
    }

    pub fn first_wire_mid_x(&self) -> f64 {
        self.first_wire_mid_dist2tgt() * self.thmin.sin()
    }

    pub fn first_wire_mid_z(&self) -> f64 {
        self.first_wire_mid_dist2tgt() * self.thmin.cos()
    }

    /// Spacing between neighbouring wire midpoints along the layer
    pub fn wire_mid_spacing(&self) -> f64 {
        self.wpdist * 4.0 * (PI / 6.0).cos() / self.thster.cos()
    }

    /// Stereo wire direction in sector coordinates
    pub fn wire_direction(&self) -> Direction3 {
        let (st, ct) = self.thster.sin_cos();
        let tilt = self.region.thtilt;
        unit_direction(-st * tilt.cos(), ct, st * tilt.sin())
    }
}

/// Direction from the components of an already normalised vector
fn unit_direction(x: f64, y: f64, z: f64) -> Direction3 {
    Direction3::new(y.atan2(x), z.clamp(-1.0, 1.0).acos())
}

/// A group of wire layers sharing one stereo angle
#[derive(Debug, Clone)]
pub struct Superlayer {
    pub(super) index: usize,
    pub(super) region_index: usize,
    pub(super) nfieldlayers: usize,
    pub(super) frame: SuperlayerFrame,
    pub(super) senselayers: Vec<Senselayer>,
    pub(super) guardlayers: Vec<Guardlayer>,
}

impl Superlayer {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn region_index(&self) -> usize {
        self.region_index
    }

    pub fn sector_index(&self) -> usize {
        self.frame.region.sector
    }

    pub fn senselayers(&self) -> &[Senselayer] {
        &self.senselayers
    }

    pub fn senselayer(&self, idx: isize) -> Result<&Senselayer> {
        let i = normalize_index("senselayer", idx, self.senselayers.len())?;
        Ok(&self.senselayers[i])
    }

    pub fn guardlayers(&self) -> &[Guardlayer] {
        &self.guardlayers
    }

    pub fn guardlayer(&self, idx: isize) -> Result<&Guardlayer> {
        let i = normalize_index("guardlayer", idx, self.guardlayers.len())?;
        Ok(&self.guardlayers[i])
    }

    pub fn nfieldlayers(&self) -> usize {
        self.nfieldlayers
    }

    pub fn thster(&self) -> f64 {
        self.frame.thster
    }

    pub fn thmin(&self) -> f64 {
        self.frame.thmin
    }

    pub fn wpdist(&self) -> f64 {
        self.frame.wpdist
    }

    pub fn cellthickness(&self) -> f64 {
        self.frame.cellthickness
    }

    /// Sense plus guard layers
    pub fn nlayers(&self) -> usize {
        self.senselayers.len() + self.guardlayers.len()
    }

    pub fn nwireplanes(&self) -> usize {
        let n = self.nlayers();
        n + n.saturating_sub(1) * self.nfieldlayers
    }

    pub fn layer_thickness(&self) -> f64 {
        self.frame.layer_thickness()
    }

    pub fn thickness(&self) -> f64 {
        self.frame.thickness
    }

    pub fn dist2tgt(&self) -> f64 {
        self.frame.dist2tgt
    }

    pub fn first_wire_mid_dist2tgt(&self) -> f64 {
        self.frame.first_wire_mid_dist2tgt()
    }

    pub fn first_wire_mid_x(&self) -> f64 {
        self.frame.first_wire_mid_x()
    }

    pub fn first_wire_mid_z(&self) -> f64 {
        self.frame.first_wire_mid_z()
    }

    pub fn wire_mid_spacing(&self) -> f64 {
        self.frame.wire_mid_spacing()
    }

    pub fn wire_direction(&self, coordsys: CoordSys) -> Result<Direction3> {
        let coordsys = coordsys.require_sector_or_clas("wire direction")?;
        Ok(SectorFrame::new(self.sector_index()).direction_in(self.frame.wire_direction(), coordsys))
    }
}
