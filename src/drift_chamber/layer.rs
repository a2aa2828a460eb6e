//! Sense and guard wire layers.

use crate::coordsys::{CoordSys, SectorFrame};
use crate::error::{Result, normalize_index};
use crate::geometry::{Direction3, Line3, LineSegment3, Plane, Vector3};

use super::superlayer::SuperlayerFrame;

/// Wire endpoints on the region's end plates, in sector coordinates
fn wire_between_plates(frame: &SuperlayerFrame, mid: Vector3) -> Result<LineSegment3> {
    let line = Line3::new(mid, frame.wire_direction());
    let left = frame.region.left_end_plate().intersection(&line)?;
    let right = frame.region.right_end_plate().intersection(&line)?;
    Ok(LineSegment3::new(left, right))
}

/// A plane of sense wires
#[derive(Debug, Clone)]
pub struct Senselayer {
    pub(super) index: usize,
    pub(super) frame: SuperlayerFrame,
    pub(super) sensewires: Vec<bool>,
    pub(super) nguardwires: usize,
}

impl Senselayer {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn sensewires(&self) -> &[bool] {
        &self.sensewires
    }

    pub fn sensewire(&self, w: isize) -> Result<bool> {
        let w = self.wire_index(w)?;
        Ok(self.sensewires.get(w).copied().unwrap_or(false))
    }

    pub fn nguardwires(&self) -> usize {
        self.nguardwires
    }

    pub fn nwires(&self) -> usize {
        self.sensewires.len() + self.nguardwires
    }

    pub fn wire_index(&self, w: isize) -> Result<usize> {
        normalize_index("wire", w, self.nwires())
    }

    fn sector_frame(&self) -> SectorFrame {
        SectorFrame::new(self.frame.region.sector)
    }

    pub fn wire_mid_x(&self, w: isize) -> Result<f64> {
        let f = &self.frame;
        let r = (self.index + 1) as f64 * f.layer_thickness();
        let tilt = f.region.thtilt;
        Ok(f.first_wire_mid_x() + r * tilt.sin() + self.stagger(w)? * f.wire_mid_spacing() * tilt.cos())
    }

    pub fn wire_mid_y(&self) -> f64 {
        0.0
    }

    pub fn wire_mid_z(&self, w: isize) -> Result<f64> {
        let f = &self.frame;
        let r = (self.index + 1) as f64 * f.layer_thickness();
        let tilt = f.region.thtilt;
        Ok(f.first_wire_mid_z() + r * tilt.cos() - self.stagger(w)? * f.wire_mid_spacing() * tilt.sin())
    }

    /// Wire position along the layer, staggered by half a cell on even layers
    fn stagger(&self, w: isize) -> Result<f64> {
        let offset = if self.index % 2 == 1 { 0.0 } else { -0.5 };
        Ok(self.wire_index(w)? as f64 + offset)
    }

    pub fn wire_mid(&self, w: isize, coordsys: CoordSys) -> Result<Vector3> {
        let coordsys = coordsys.require_sector_or_clas("wire midpoint")?;
        let mid = Vector3::new(self.wire_mid_x(w)?, self.wire_mid_y(), self.wire_mid_z(w)?);
        Ok(self.sector_frame().vector_in(mid, coordsys))
    }

    pub fn wires_mid(&self, coordsys: CoordSys) -> Result<Vec<Vector3>> {
        (0..self.nwires() as isize)
            .map(|w| self.wire_mid(w, coordsys))
            .collect()
    }

    pub fn wire(&self, w: isize, coordsys: CoordSys) -> Result<LineSegment3> {
        let coordsys = coordsys.require_sector_or_clas("wire")?;
        let seg = wire_between_plates(&self.frame, self.wire_mid(w, CoordSys::Sector)?)?;
        Ok(self.sector_frame().segment_in(seg, coordsys))
    }

    pub fn wires(&self, coordsys: CoordSys) -> Result<Vec<LineSegment3>> {
        (0..self.nwires() as isize)
            .map(|w| self.wire(w, coordsys))
            .collect()
    }

    pub fn wire_length(&self, w: isize) -> Result<f64> {
        Ok(self.wire(w, CoordSys::Sector)?.length())
    }

    pub fn wire_center(&self, w: isize, coordsys: CoordSys) -> Result<Vector3> {
        Ok(self.wire(w, coordsys)?.mid_point())
    }

    /// Mean of the first and last wire centers
    pub fn center(&self, coordsys: CoordSys) -> Result<Vector3> {
        Ok(self.wire_center(0, coordsys)?.midpoint(&self.wire_center(-1, coordsys)?))
    }

    pub fn dist2tgt(&self) -> f64 {
        self.frame.dist2tgt + self.index as f64 * self.frame.layer_thickness()
    }

    /// Plane containing the wires, normal to the layer stack
    pub fn wire_plane(&self, coordsys: CoordSys) -> Result<Plane> {
        let tilt = self.frame.region.thtilt;
        let normal = Direction3::from_components(tilt.sin(), 0.0, tilt.cos())?;
        let plane = Plane::new(self.wire_mid(0, CoordSys::Sector)?, normal);
        let coordsys = coordsys.require_sector_or_clas("wire plane")?;
        Ok(self.sector_frame().plane_in(plane, coordsys))
    }
}

/// A plane of guard wires bounding a superlayer
#[derive(Debug, Clone)]
pub struct Guardlayer {
    pub(super) index: usize,
    pub(super) frame: SuperlayerFrame,
    pub(super) nwires: usize,
}

impl Guardlayer {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn nwires(&self) -> usize {
        self.nwires
    }

    pub fn wire_index(&self, w: isize) -> Result<usize> {
        normalize_index("wire", w, self.nwires)
    }

    fn sector_frame(&self) -> SectorFrame {
        SectorFrame::new(self.frame.region.sector)
    }

    /// Guard layer 0 sits at the first wire plane, layer 1 at the last
    fn base(&self) -> (f64, f64) {
        let f = &self.frame;
        let tilt = f.region.thtilt;
        let (mut x, mut z) = (f.first_wire_mid_x(), f.first_wire_mid_z());
        if self.index == 1 {
            x += f.thickness * tilt.sin();
            z += f.thickness * tilt.cos();
        }
        (x, z)
    }

    fn stagger(&self, w: isize) -> Result<f64> {
        let offset = if self.index % 2 == 1 { -0.5 } else { 0.0 };
        Ok(self.wire_index(w)? as f64 + offset)
    }

    pub fn wire_mid_x(&self, w: isize) -> Result<f64> {
        let f = &self.frame;
        Ok(self.base().0 + self.stagger(w)? * f.wire_mid_spacing() * f.region.thtilt.cos())
    }

    pub fn wire_mid_y(&self) -> f64 {
        0.0
    }

    pub fn wire_mid_z(&self, w: isize) -> Result<f64> {
        let f = &self.frame;
        Ok(self.base().1 - self.stagger(w)? * f.wire_mid_spacing() * f.region.thtilt.sin())
    }

    pub fn wire_mid(&self, w: isize, coordsys: CoordSys) -> Result<Vector3> {
        let coordsys = coordsys.require_sector_or_clas("wire midpoint")?;
        let mid = Vector3::new(self.wire_mid_x(w)?, self.wire_mid_y(), self.wire_mid_z(w)?);
        Ok(self.sector_frame().vector_in(mid, coordsys))
    }

    pub fn wires_mid(&self, coordsys: CoordSys) -> Result<Vec<Vector3>> {
        (0..self.nwires as isize)
            .map(|w| self.wire_mid(w, coordsys))
            .collect()
    }

    pub fn wire(&self, w: isize, coordsys: CoordSys) -> Result<LineSegment3> {
        let coordsys = coordsys.require_sector_or_clas("wire")?;
        let seg = wire_between_plates(&self.frame, self.wire_mid(w, CoordSys::Sector)?)?;
        Ok(self.sector_frame().segment_in(seg, coordsys))
    }

    pub fn wires(&self, coordsys: CoordSys) -> Result<Vec<LineSegment3>> {
        (0..self.nwires as isize)
            .map(|w| self.wire(w, coordsys))
            .collect()
    }

    pub fn wire_length(&self, w: isize) -> Result<f64> {
        Ok(self.wire(w, CoordSys::Sector)?.length())
    }

    pub fn wire_center(&self, w: isize, coordsys: CoordSys) -> Result<Vector3> {
        Ok(self.wire(w, coordsys)?.mid_point())
    }

    pub fn dist2tgt(&self) -> f64 {
        self.frame.dist2tgt + self.index as f64 * self.frame.thickness
    }
}
