//! Electromagnetic calorimeter (EC).
//!
//! Thirteen u/v/w layer triplets of scintillator interleaved with lead.
//! Each successive plane grows by `a3` in half-height and shifts by `a1`
//! along the module. CCDB lengths are millimetres; stored values are
//! centimetres.

use tracing::debug;

use crate::calorimeter::{self, view_index};
use crate::ccdb::{self, ConstantSetInfo, ConstantsProvider};
use crate::coordsys::{CoordSys, SectorFrame};
use crate::error::{GeometryError, Result, normalize_index};
use crate::geometry::{DEG2RAD, Direction3, MM2CM, Vector3};

/// Lead sheets cut short at the module apex, in mm
const LEAD_VERTEX_CUTS: [(usize, f64); 4] = [(2, 1.440), (5, 1.448), (8, 1.445), (11, 1.462)];

/// Strips of one orientation within a layer
#[derive(Debug, Clone)]
pub struct View {
    index: usize,
    strips: Vec<bool>,
    shift: f64,
    halfwidth: f64,
    deltahw: f64,
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

    /// Offset of the first strip; zero except for the u view
    pub fn shift(&self) -> f64 {
        self.shift
    }

    pub fn halfwidth(&self) -> f64 {
        self.halfwidth
    }

    pub fn deltahw(&self) -> f64 {
        self.deltahw
    }
}

#[derive(Debug, Clone)]
pub struct Layer {
    index: usize,
    view_angle: f64,
    wrapper_thick: f64,
    strip_thick: f64,
    lead_thick: f64,
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
}

/// One EC module
#[derive(Debug, Clone)]
pub struct Sector {
    index: usize,
    alum_thick: f64,
    thtilt: f64,
    dist2tgt: f64,
    dist2cnt: f64,
    a1: f64,
    a2: f64,
    a3: f64,
    d2: f64,
    d2prime: f64,
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

    pub fn alum_thick(&self) -> f64 {
        self.alum_thick
    }

    pub fn thtilt(&self) -> f64 {
        self.thtilt
    }

    pub fn dist2tgt(&self) -> f64 {
        self.dist2tgt
    }

    pub fn dist2cnt(&self) -> f64 {
        self.dist2cnt
    }

    /// Shift per plane along the module
    pub fn a1(&self) -> f64 {
        self.a1
    }

    /// Half-height of the first plane
    pub fn a2(&self) -> f64 {
        self.a2
    }

    /// Growth in half-height per plane
    pub fn a3(&self) -> f64 {
        self.a3
    }

    pub fn d2(&self) -> f64 {
        self.d2
    }

    pub fn d2prime(&self) -> f64 {
        self.d2prime
    }

    pub fn total_layers(&self) -> usize {
        self.layers.first().map_or(0, |l| self.nlayers() * l.nviews())
    }

    pub fn thickness(&self) -> Result<f64> {
        let l = self.layer(0)?;
        let n = self.total_layers() as f64;
        Ok(n * l.strip_thick + (n - 1.0) * l.lead_thick + 2.0 * n * l.wrapper_thick)
    }

    pub fn normal(&self, coordsys: CoordSys) -> Result<Direction3> {
        let coordsys = coordsys.require_sector_or_clas("EC normal")?;
        Ok(SectorFrame::new(self.index).direction_in(Direction3::new(0.0, self.thtilt), coordsys))
    }

    /// Center of the module volume
    pub fn center(&self, coordsys: CoordSys) -> Result<Vector3> {
        let coordsys = coordsys.require_sector_or_clas("EC center")?;
        let (st, ct) = self.thtilt.sin_cos();
        let normal = Vector3::new(st, 0.0, ct);
        let along = Vector3::new(-ct, 0.0, st);
        let c = normal * (self.dist2tgt + 0.5 * self.thickness()?) + along * self.dist2cnt;
        Ok(SectorFrame::new(self.index).vector_in(c, coordsys))
    }

    fn check_scint_layer(&self, k: usize) -> Result<()> {
        let n = self.total_layers();
        if k < n {
            Ok(())
        } else {
            Err(GeometryError::Index {
                what: "scintillator layer",
                index: k as isize,
                len: n,
            })
        }
    }

    fn check_lead_layer(&self, k: usize) -> Result<()> {
        let n = self.total_layers().saturating_sub(1);
        if k < n {
            Ok(())
        } else {
            Err(GeometryError::Index {
                what: "lead layer",
                index: k as isize,
                len: n,
            })
        }
    }

    /// View of scintillator plane `k`
    pub fn scint_layer_view(&self, k: usize) -> Result<&View> {
        self.check_scint_layer(k)?;
        let nviews = self.layer(0)?.nviews();
        self.layer((k / nviews) as isize)?.view((k % nviews) as isize)
    }

    pub fn scint_half_height(&self, k: usize) -> Result<f64> {
        self.check_scint_layer(k)?;
        Ok(self.a2 + self.a3 * k as f64)
    }

    pub fn scint_y_offset(&self, k: usize) -> Result<f64> {
        self.check_scint_layer(k)?;
        Ok(self.a1 * k as f64)
    }

    /// Offset of scintillator plane `k` from the module center, along the normal
    pub fn scint_layer_z(&self, k: usize) -> Result<f64> {
        self.check_scint_layer(k)?;
        let l = self.layer(0)?;
        Ok(-0.5 * self.thickness()?
            + k as f64 * (l.strip_thick + 2.0 * l.wrapper_thick + l.lead_thick)
            + l.wrapper_thick
            + 0.5 * l.strip_thick)
    }

    /// Amount cut off lead sheet `k` at the apex
    pub fn lead_vertex_cut(&self, k: usize) -> Result<f64> {
        self.check_lead_layer(k)?;
        let mm = match LEAD_VERTEX_CUTS.iter().find(|(layer, _)| *layer == k) {
            Some(&(_, cut)) => cut,
            None if k >= 14 && (k - 14) % 3 == 0 => 1.0,
            None => 1e-5,
        };
        Ok(mm * MM2CM)
    }

    pub fn lead_layer_z(&self, k: usize) -> Result<f64> {
        self.check_lead_layer(k)?;
        let l = self.layer(0)?;
        Ok(-0.5 * self.thickness()?
            + (k + 1) as f64 * (l.strip_thick + 2.0 * l.wrapper_thick)
            + k as f64 * l.lead_thick
            + 0.5 * l.lead_thick)
    }

    pub fn lead_layer_y(&self, k: usize) -> Result<f64> {
        Ok(self.a1 * k as f64 + 0.5 * self.lead_vertex_cut(k)?)
    }
}

/// The electromagnetic calorimeter
#[derive(Debug, Clone, Default)]
pub struct ElectromagneticCal {
    sectors: Vec<Sector>,
}

impl ElectromagneticCal {
    pub fn from_provider(provider: &dyn ConstantsProvider, set: &ConstantSetInfo) -> Result<Self> {
        let t = ccdb::fetch(provider, set, "/geometry/ec/ec")?;
        let nsectors: usize = t.elem("nsectors", 0)?;
        let nviews: usize = t.elem("nviews", 0)?;
        let nlayers: usize = t.elem("nlayers", 0)?;
        let mm = |col: &str| -> Result<f64> { Ok(t.elem::<f64>(col, 0)? * MM2CM) };

        let views = (0..nviews)
            .map(|v| -> Result<View> {
                let tv = ccdb::fetch(provider, set, &calorimeter::view_table("ec", v))?;
                // only the u view is shifted
                let shift = if tv.has_column("a4") {
                    tv.elem::<f64>("a4", 0)? * MM2CM
                } else {
                    0.0
                };
                Ok(View {
                    index: v,
                    strips: vec![true; tv.elem("nstrips", 0)?],
                    shift,
                    halfwidth: tv.elem::<f64>("a5", 0)? * MM2CM,
                    deltahw: tv.elem::<f64>("a6", 0)? * MM2CM,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let view_angle = t.elem::<f64>("view_angle", 0)? * DEG2RAD;
        let (wrapper_thick, strip_thick, lead_thick) =
            (mm("wrapper_thick")?, mm("strip_thick")?, mm("lead_thick")?);
        let layer = |index: usize| Layer {
            index,
            view_angle,
            wrapper_thick,
            strip_thick,
            lead_thick,
            views: views.clone(),
        };

        debug!(nsectors, nlayers, nviews, "building electromagnetic calorimeter");

        let mut sectors = Vec::with_capacity(nsectors);
        for sec in 0..nsectors {
            sectors.push(Sector {
                index: sec,
                alum_thick: mm("alum_thick")?,
                thtilt: t.elem::<f64>("thtilt", 0)? * DEG2RAD,
                dist2tgt: mm("dist2tgt")?,
                dist2cnt: mm("dist2cnt")?,
                a1: mm("a1")?,
                a2: mm("a2")?,
                a3: mm("a3")?,
                d2: mm("d2")?,
                d2prime: mm("d2prime")?,
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
