use crate::coordsys::{CoordSys, SectorFrame};
use crate::error::{GeometryError, Result, normalize_index};
use crate::geometry::{Direction3, Plane, Vector3};

/// Panel names in table order
pub const PANEL_NAMES: [&str; 3] = ["1a", "1b", "2"];

/// Index of the panel whose paddles are glued in pairs
const PAIRED_PANEL: usize = 1;

/// A plane of scintillator paddles
#[derive(Debug, Clone)]
pub struct Panel {
    pub(super) sector: usize,
    pub(super) index: usize,
    pub(super) paddle_width: f64,
    pub(super) paddle_thickness: f64,
    pub(super) thtilt: f64,
    pub(super) thmin: f64,
    pub(super) dist2edge: f64,
    pub(super) paddle_gap: f64,
    pub(super) paddle_pairgap: f64,
    pub(super) wrapper_thickness: f64,
    pub(super) paddle_meas_lengths: Vec<f64>,
    pub(super) paddle_slopes: Vec<f64>,
    pub(super) paddle_intercepts: Vec<f64>,
}

impl Panel {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn sector_index(&self) -> usize {
        self.sector
    }

    /// "1a", "1b" or "2"
    pub fn name(&self) -> &'static str {
        PANEL_NAMES.get(self.index).copied().unwrap_or("?")
    }

    pub fn npaddles(&self) -> usize {
        self.paddle_meas_lengths.len()
    }

    pub fn paddle_index(&self, p: isize) -> Result<usize> {
        normalize_index("paddle", p, self.npaddles())
    }

    pub fn paddle_width(&self) -> f64 {
        self.paddle_width
    }

    pub fn paddle_thickness(&self) -> f64 {
        self.paddle_thickness
    }

    pub fn thtilt(&self) -> f64 {
        self.thtilt
    }

    pub fn thmin(&self) -> f64 {
        self.thmin
    }

    pub fn dist2edge(&self) -> f64 {
        self.dist2edge
    }

    pub fn paddle_gap(&self) -> f64 {
        self.paddle_gap
    }

    pub fn paddle_pairgap(&self) -> f64 {
        self.paddle_pairgap
    }

    pub fn wrapper_thickness(&self) -> f64 {
        self.wrapper_thickness
    }

    fn sector_frame(&self) -> SectorFrame {
        SectorFrame::new(self.sector)
    }

    /// Distance along the panel from the first paddle's center to paddle `p`
    fn offset_along(&self, p: usize) -> f64 {
        let w = self.paddle_width + 2.0 * self.wrapper_thickness;
        if self.index == PAIRED_PANEL {
            let gaps = ((p + 1) / 2) as f64 * self.paddle_gap + (p / 2) as f64 * self.paddle_pairgap;
            p as f64 * w + gaps
        } else {
            p as f64 * (w + self.paddle_gap)
        }
    }

    fn first_edge_offset(&self) -> f64 {
        0.5 * self.paddle_width + self.wrapper_thickness
    }

    pub fn paddle_center_x(&self, p: isize) -> Result<f64> {
        let p = self.paddle_index(p)?;
        Ok(self.dist2edge * self.thmin.sin()
            + (self.first_edge_offset() + self.offset_along(p)) * self.thtilt.cos())
    }

    pub fn paddle_center_y(&self, p: isize) -> Result<f64> {
        self.paddle_index(p)?;
        Ok(0.0)
    }

    pub fn paddle_center_z(&self, p: isize) -> Result<f64> {
        let p = self.paddle_index(p)?;
        Ok(self.dist2edge * self.thmin.cos()
            - (self.first_edge_offset() + self.offset_along(p)) * self.thtilt.sin())
    }

    pub fn paddle_center(&self, p: isize, coordsys: CoordSys) -> Result<Vector3> {
        let coordsys = coordsys.require_sector_or_clas("paddle center")?;
        let c = Vector3::new(
            self.paddle_center_x(p)?,
            self.paddle_center_y(p)?,
            self.paddle_center_z(p)?,
        );
        Ok(self.sector_frame().vector_in(c, coordsys))
    }

    pub fn paddle_centers(&self, coordsys: CoordSys) -> Result<Vec<Vector3>> {
        (0..self.npaddles() as isize)
            .map(|p| self.paddle_center(p, coordsys))
            .collect()
    }

    /// Paddle length from the linear fit of measured lengths
    pub fn paddle_length(&self, p: isize) -> Result<f64> {
        let p = self.paddle_index(p)?;
        Ok(self.paddle_slopes[p] * (p + 1) as f64 + self.paddle_intercepts[p])
    }

    pub fn paddle_lengths(&self) -> Result<Vec<f64>> {
        (0..self.npaddles() as isize)
            .map(|p| self.paddle_length(p))
            .collect()
    }

    pub fn paddle_meas_length(&self, p: isize) -> Result<f64> {
        Ok(self.paddle_meas_lengths[self.paddle_index(p)?])
    }

    pub fn panel_normal(&self, coordsys: CoordSys) -> Result<Direction3> {
        let coordsys = coordsys.require_sector_or_clas("panel normal")?;
        Ok(self
            .sector_frame()
            .direction_in(Direction3::new(0.0, self.thtilt), coordsys))
    }

    pub fn panel_plane(&self, coordsys: CoordSys) -> Result<Plane> {
        let coordsys = coordsys.require_sector_or_clas("panel plane")?;
        let plane = Plane::new(
            self.paddle_center(0, CoordSys::Sector)?,
            self.panel_normal(CoordSys::Sector)?,
        );
        Ok(self.sector_frame().plane_in(plane, coordsys))
    }

    /// Perpendicular distance from the target to the panel
    pub fn dist2tgt(&self) -> f64 {
        self.dist2edge * (self.thtilt - self.thmin).cos()
    }

    /// Width of the panel across all paddles
    pub fn radial_extent(&self) -> f64 {
        let np = self.npaddles() as f64;
        let base = np * self.paddle_width + 2.0 * self.wrapper_thickness * np;
        if self.npaddles() == 62 {
            // paired paddles only leave a gap between pairs
            base + (np / 2.0 - 1.0) * self.paddle_gap
        } else {
            base + (np - 1.0) * self.paddle_gap
        }
    }

    /// Midpoint of the first and last paddle centers
    pub fn center(&self, coordsys: CoordSys) -> Result<Vector3> {
        let first = self.paddle_center(0, coordsys)?;
        let last = self.paddle_center(-1, coordsys)?;
        Ok(first.midpoint(&last))
    }

    pub fn paddle_direction(&self, coordsys: CoordSys) -> Result<Direction3> {
        let coordsys = coordsys.require_sector_or_clas("paddle direction")?;
        let dir = Direction3::from_components(0.0, 1.0, 0.0)?;
        Ok(self.sector_frame().direction_in(dir, coordsys))
    }

    /// Paddle cross-section (width, 0, thickness) in the requested frame
    pub fn paddle_extent(&self, coordsys: CoordSys) -> Result<Vector3> {
        let (w, t) = (self.paddle_width, self.paddle_thickness);
        match coordsys {
            CoordSys::Layer => Ok(Vector3::new(w, 0.0, t)),
            CoordSys::Sector => {
                let (sa, ca) = self.thtilt.sin_cos();
                Ok(Vector3::new(w * ca + t * sa, 0.0, w * sa + t * ca))
            }
            CoordSys::Clas => Err(GeometryError::UnsupportedCoordSys {
                what: "paddle extent",
                coordsys: coordsys.to_string(),
            }),
        }
    }
}
