//! Barrel silicon vertex tracker.
//!
//! Regions of flat double-sided modules arranged around the beam line.
//! Layer 0 is the bottom (inner) sensor and layer 1 the top (outer) one;
//! top strips fan out from 0 to `endAngle`, bottom strips mirror them.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::error::{Result, normalize_index};
use crate::geometry::{Direction3, LineSegment3, Plane, Vector3};

/// Sensor dimensions shared by every module, in cm (angles in degrees)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorParams {
    pub readout_pitch: f64,
    pub silicon_width: f64,
    pub phys_sen_len: f64,
    pub phys_sen_wid: f64,
    pub active_sen_len: f64,
    pub active_sen_wid: f64,
    pub dead_zn_sen_len: [f64; 3],
    pub dead_zn_sen_wid: f64,
    pub start_angle: f64,
    pub end_angle: f64,
}

impl SensorParams {
    /// Length over which strips run: three sensors and the two joints between them
    pub fn center_length(&self) -> f64 {
        3.0 * self.active_sen_len + self.dead_zn_sen_len[1] + self.dead_zn_sen_len[2]
    }
}

/// Placement of one module around the beam line
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ModuleFrame {
    pub radius: f64,
    pub zstart: f64,
    pub phi: f64,
    pub layergap: f64,
}

/// One silicon sensor plane of a module
#[derive(Debug, Clone)]
pub struct Layer {
    index: usize,
    strips: Vec<bool>,
    sensor: SensorParams,
    module: ModuleFrame,
}

impl Layer {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_top(&self) -> bool {
        self.index == 1
    }

    pub fn nstrips(&self) -> usize {
        self.strips.len()
    }

    pub fn strips(&self) -> &[bool] {
        &self.strips
    }

    pub fn sensor(&self) -> &SensorParams {
        &self.sensor
    }

    pub fn strip_index(&self, s: isize) -> Result<usize> {
        normalize_index("strip", s, self.nstrips())
    }

    /// Distance of the sensor mid-plane from the beam line
    pub fn radius(&self) -> f64 {
        let half = 0.5 * self.sensor.silicon_width;
        if self.index == 0 {
            self.module.radius - half
        } else {
            self.module.radius + half
        }
    }

    /// Readout end of strip `s`, in sensor coordinates
    pub fn strip_first_point(&self, s: isize) -> Result<Vector3> {
        let mut b = self.strip_index(s)? as f64 * self.sensor.readout_pitch;
        if self.index == 0 {
            b = self.sensor.active_sen_wid - b;
        }
        Ok(Vector3::new(b, 0.0, 0.0))
    }

    /// Far end of strip `s`, clipped to the active area
    pub fn strip_second_point(&self, s: isize) -> Result<Vector3> {
        let s = self.strip_index(s)?;
        let sensor = &self.sensor;
        let nsteps = self.nstrips().saturating_sub(1).max(1) as f64;
        let angle = (s as f64 * sensor.end_angle / nsteps) * PI / 180.0;
        let intercept = s as f64 * sensor.readout_pitch;
        let length = sensor.center_length();

        let (x, z) = if self.is_top() {
            let m = angle.tan();
            let b = intercept;
            if length * m + b > sensor.active_sen_wid {
                let x = sensor.active_sen_wid;
                (x, (x - b) / m)
            } else {
                (m * length + b, length)
            }
        } else {
            let m = -angle.tan();
            let b = sensor.active_sen_wid - intercept;
            if length * m + b < 0.0 {
                (0.0, -b / m)
            } else {
                (m * length + b, length)
            }
        };
        Ok(Vector3::new(x, 0.0, z))
    }

    /// Sensor coordinates to the lab frame
    pub fn to_lab(&self, point: &Vector3) -> Vector3 {
        let local_x = point.x - 0.5 * self.sensor.active_sen_wid;
        let phi = self.module.phi;
        let (sa, ca) = (phi + FRAC_PI_2).sin_cos();
        let r = self.radius();
        Vector3::new(
            local_x * ca - point.y * sa + r * phi.cos(),
            local_x * sa + point.y * ca + r * phi.sin(),
            point.z + self.module.zstart + 0.5 * self.sensor.dead_zn_sen_len[1],
        )
    }

    /// Strip `s` in the lab frame
    pub fn strip(&self, s: isize) -> Result<LineSegment3> {
        Ok(LineSegment3::new(
            self.to_lab(&self.strip_first_point(s)?),
            self.to_lab(&self.strip_second_point(s)?),
        ))
    }

    pub fn strips_lab(&self) -> Result<Vec<LineSegment3>> {
        (0..self.nstrips() as isize).map(|s| self.strip(s)).collect()
    }
}

/// One double-sided module
#[derive(Debug, Clone)]
pub struct Sector {
    index: usize,
    module: ModuleFrame,
    fillerthick: f64,
    layers: Vec<Layer>,
}

impl Sector {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, idx: isize) -> Result<&Layer> {
        let i = normalize_index("layer", idx, self.layers.len())?;
        Ok(&self.layers[i])
    }

    /// Azimuth of the module's outward normal
    pub fn phi(&self) -> f64 {
        self.module.phi
    }

    pub fn layergap(&self) -> f64 {
        self.module.layergap
    }

    pub fn fillerthick(&self) -> f64 {
        self.fillerthick
    }

    /// Plane through the module center, normal pointing away from the beam
    pub fn detector_plane(&self) -> Plane {
        let phi = self.phi();
        Plane::new(
            Vector3::from_spherical(self.module.radius, phi, FRAC_PI_2),
            Direction3::new(phi, FRAC_PI_2),
        )
    }
}

/// A ring of modules at one radius
#[derive(Debug, Clone)]
pub struct Region {
    index: usize,
    radius: f64,
    zstart: f64,
    phi: f64,
    sectors: Vec<Sector>,
}

impl Region {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn zstart(&self) -> f64 {
        self.zstart
    }

    /// Azimuthal offset of the first module
    pub fn phi(&self) -> f64 {
        self.phi
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn sector(&self, idx: isize) -> Result<&Sector> {
        let i = normalize_index("sector", idx, self.sectors.len())?;
        Ok(&self.sectors[i])
    }
}

/// Row of `/geometry/bst/region`, converted to cm and radians
#[derive(Debug, Clone, Copy)]
pub(crate) struct RegionParams {
    pub status: bool,
    pub nsectors: usize,
    pub nlayers: usize,
    pub radius: f64,
    pub zstart: f64,
    pub phi: f64,
    pub layergap: f64,
}

/// The barrel SVT
#[derive(Debug, Clone, Default)]
pub struct BarrelSVT {
    regions: Vec<Region>,
}

impl BarrelSVT {
    pub(crate) fn build(
        regions: &[RegionParams],
        sensor: SensorParams,
        nstrips: usize,
        fillerthick: f64,
    ) -> Self {
        let regions = regions
            .iter()
            .filter(|r| r.status)
            .enumerate()
            .map(|(index, r)| Region {
                index,
                radius: r.radius,
                zstart: r.zstart,
                phi: r.phi,
                sectors: (0..r.nsectors)
                    .map(|sec| {
                        let module = ModuleFrame {
                            radius: r.radius,
                            zstart: r.zstart,
                            phi: 2.0 * PI / r.nsectors as f64 * sec as f64 + r.phi,
                            layergap: r.layergap,
                        };
                        Sector {
                            index: sec,
                            module,
                            fillerthick,
                            layers: (0..r.nlayers)
                                .map(|lyr| Layer {
                                    index: lyr,
                                    strips: vec![true; nstrips],
                                    sensor,
                                    module,
                                })
                                .collect(),
                        }
                    })
                    .collect(),
            })
            .collect();
        Self { regions }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, idx: isize) -> Result<&Region> {
        let i = normalize_index("region", idx, self.regions.len())?;
        Ok(&self.regions[i])
    }
}
