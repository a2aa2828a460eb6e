//! Preshower calorimeter (PCAL).
//!
//! Triangular modules of scintillator strips in three views interleaved
//! with lead, sandwiched between steel and foam windows. The CCDB tables
//! store lengths in millimetres; everything here is centimetres.

use std::f64::consts::FRAC_PI_2;

use tracing::debug;

use crate::calorimeter::{self, view_index};
use crate::ccdb::{self, ConstantSetInfo, ConstantsProvider};
use crate::coordsys::{CoordSys, SectorFrame};
use crate::error::{Result, normalize_index};
use crate::geometry::{DEG2RAD, Direction3, MM2CM, Vector3};

/// Strips of one orientation within a layer
#[derive(Debug, Clone)]
pub struct View {
    index: usize,
    strips: Vec<bool>,
    max_length: f64,
    view_angle: f64,
    strip_width: f64,
}

impl View {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &'static str {
        calorimeter::view_name(self.index)
    }

    pub fn nstrips(&self) -> usize {
        self.strips.len()
    }

    pub fn strips(&self) -> &[bool] {
        &self.strips
    }

    pub fn max_length(&self) -> f64 {
        self.max_length
    }

    pub fn strip_index(&self, s: isize) -> Result<usize> {
        normalize_index("strip", s, self.nstrips())
    }

    /// Strip length; strips shorten toward the apex of the module
    pub fn strip_length(&self, s: isize) -> Result<f64> {
        let s = self.strip_index(s)?;
        let ns = (self.nstrips() - (s + 1)) as f64;
        let a = self.view_angle;
        let shrink = if self.index == 0 {
            2.0 * (FRAC_PI_2 - a).tan()
        } else {
            (FRAC_PI_2 - a).tan() + (2.0 * a - FRAC_PI_2).tan()
        };
        Ok(self.max_length - ns * self.strip_width * shrink)
    }
}

/// One u/v/w triplet of scintillator planes
#[derive(Debug, Clone)]
pub struct Layer {
    index: usize,
    view_angle: f64,
    wrapper_thick: f64,
    strip_thick: f64,
    lead_thick: f64,
    strip_width: f64,
    views: Vec<View>,
}

impl Layer {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn nviews(&self) -> usize {
        self.views.len()
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn view(&self, idx: isize) -> Result<&View> {
        let i = normalize_index("view", idx, self.views.len())?;
        Ok(&self.views[i])
    }

    pub fn view_by_name(&self, name: &str) -> Result<&View> {
        self.view(view_index(name)? as isize)
    }

    pub fn view_angle(&self) -> f64 {
        self.view_angle
    }

    pub fn wrapper_thick(&self) -> f64 {
        self.wrapper_thick
    }

    pub fn strip_thick(&self) -> f64 {
        self.strip_thick
    }

    pub fn lead_thick(&self) -> f64 {
        self.lead_thick
    }

    pub fn strip_width(&self) -> f64 {
        self.strip_width
    }
}

/// One PCAL module
#[derive(Debug, Clone)]
pub struct Sector {
    index: usize,
    nsteel: usize,
    nfoam: usize,
    steel_thick: f64,
    foam_thick: f64,
    thtilt: f64,
    dist2tgt: f64,
    yhigh: f64,
    layers: Vec<Layer>,
}

impl Sector {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn nlayers(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, idx: isize) -> Result<&Layer> {
        let i = normalize_index("layer", idx, self.layers.len())?;
        Ok(&self.layers[i])
    }

    pub fn nsteel(&self) -> usize {
        self.nsteel
    }

    pub fn nfoam(&self) -> usize {
        self.nfoam
    }

    pub fn steel_thick(&self) -> f64 {
        self.steel_thick
    }

    pub fn foam_thick(&self) -> f64 {
        self.foam_thick
    }

    pub fn thtilt(&self) -> f64 {
        self.thtilt
    }

    pub fn dist2tgt(&self) -> f64 {
        self.dist2tgt
    }

    pub fn yhigh(&self) -> f64 {
        self.yhigh
    }

    /// Scintillator planes across all layers and views
    pub fn total_layers(&self) -> usize {
        self.layers.first().map_or(0, |l| self.nlayers() * l.nviews())
    }

    /// Full depth including steel and foam windows
    pub fn thickness(&self) -> Result<f64> {
        let l = self.layer(0)?;
        let n = self.total_layers() as f64;
        Ok(n * l.strip_thick
            + (n - 1.0) * l.lead_thick
            + (2.0 * n + 1.0) * l.wrapper_thick
            + self.nsteel as f64 * self.steel_thick
            + self.nfoam as f64 * self.foam_thick)
    }

    /// Depth of the steel, foam and outer wrapper in front of the first strip
    pub fn window_thick(&self) -> Result<f64> {
        let l = self.layer(0)?;
        Ok(0.5
            * (self.nsteel as f64 * self.steel_thick
                + self.nfoam as f64 * self.foam_thick
                + l.wrapper_thick))
    }

    /// Height of the triangle, from the apex to the longest V strip
    pub fn height(&self) -> Result<f64> {
        let l = self.layer(0)?;
        Ok(l.view_by_name("v")?.strip_length(-1)? * l.view_angle.sin())
    }

    pub fn normal(&self, coordsys: CoordSys) -> Result<Direction3> {
        let coordsys = coordsys.require_sector_or_clas("PCAL normal")?;
        Ok(SectorFrame::new(self.index).direction_in(Direction3::new(0.0, self.thtilt), coordsys))
    }

    /// Center of the module volume
    pub fn center(&self, coordsys: CoordSys) -> Result<Vector3> {
        let coordsys = coordsys.require_sector_or_clas("PCAL center")?;
        let (st, ct) = self.thtilt.sin_cos();
        let normal = Vector3::new(st, 0.0, ct);
        let in_plane = Vector3::new(ct, 0.0, -st);
        let c = normal * (self.dist2tgt + 0.5 * self.thickness()?)
            + in_plane * (self.yhigh - 0.5 * self.height()?);
        Ok(SectorFrame::new(self.index).vector_in(c, coordsys))
    }

    /// Offset of scintillator plane `k` from the module center, along the normal
    pub fn scint_layer_z(&self, k: usize) -> Result<f64> {
        let l = self.layer(0)?;
        let pitch = l.strip_thick + 2.0 * l.wrapper_thick + l.lead_thick;
        Ok(-0.5 * self.thickness()?
            + self.window_thick()?
            + k as f64 * pitch
            + l.wrapper_thick
            + 0.5 * l.strip_thick)
    }

    /// Offset of lead sheet `k`, which follows scintillator plane `k`
    pub fn lead_layer_z(&self, k: usize) -> Result<f64> {
        let l = self.layer(0)?;
        Ok(-0.5 * self.thickness()?
            + self.window_thick()?
            + (k + 1) as f64 * (l.strip_thick + 2.0 * l.wrapper_thick)
            + k as f64 * l.lead_thick
            + 0.5 * l.lead_thick)
    }
}

/// The preshower calorimeter
#[derive(Debug, Clone, Default)]
pub struct PreshowerCal {
    sectors: Vec<Sector>,
}

impl PreshowerCal {
    pub fn from_provider(provider: &dyn ConstantsProvider, set: &ConstantSetInfo) -> Result<Self> {
        let t = ccdb::fetch(provider, set, "/geometry/pcal/pcal")?;
        let nsectors: usize = t.elem("nsectors", 0)?;
        let nviews: usize = t.elem("nviews", 0)?;
        let nlayers: usize = t.elem("nlayers", 0)?;
        let mm = |col: &str| -> Result<f64> { Ok(t.elem::<f64>(col, 0)? * MM2CM) };

        let view_params = (0..nviews)
            .map(|v| -> Result<(usize, f64)> {
                let tv = ccdb::fetch(provider, set, &calorimeter::view_table("pcal", v))?;
                Ok((tv.elem("nstrips", 0)?, tv.elem::<f64>("max_length", 0)? * MM2CM))
            })
            .collect::<Result<Vec<_>>>()?;

        let view_angle = t.elem::<f64>("view_angle", 0)? * DEG2RAD;
        let strip_width = mm("strip_width")?;
        let (wrapper_thick, strip_thick, lead_thick) =
            (mm("wrapper_thick")?, mm("strip_thick")?, mm("lead_thick")?);
        let layer = |index: usize| Layer {
            index,
            view_angle,
            wrapper_thick,
            strip_thick,
            lead_thick,
            strip_width,
            views: view_params
                .iter()
                .enumerate()
                .map(|(v, &(nstrips, max_length))| View {
                    index: v,
                    strips: vec![true; nstrips],
                    max_length,
                    view_angle,
                    strip_width,
                })
                .collect(),
        };

        debug!(nsectors, nlayers, nviews, "building preshower calorimeter");

        let mut sectors = Vec::with_capacity(nsectors);
        for sec in 0..nsectors {
            sectors.push(Sector {
                index: sec,
                nsteel: t.elem("nsteel", 0)?,
                nfoam: t.elem("nfoam", 0)?,
                steel_thick: mm("steel_thick")?,
                foam_thick: mm("foam_thick")?,
                thtilt: t.elem::<f64>("thtilt", 0)? * DEG2RAD,
                dist2tgt: mm("dist2tgt")?,
                yhigh: mm("yhigh")?,
                layers: (0..nlayers).map(&layer).collect(),
            });
        }
        Ok(Self { sectors })
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn sector(&self, idx: isize) -> Result<&Sector> {
        let i = normalize_index("sector", idx, self.sectors.len())?;
        Ok(&self.sectors[i])
    }
}
