//! Forward time-of-flight scintillator panels.
//!
//! Each sector carries panels 1a, 1b and 2. Paddle lengths come from a
//! linear fit stored alongside the measured lengths.

mod panel;

pub use panel::{PANEL_NAMES, Panel};

use tracing::debug;

use crate::ccdb::{self, ConstantSetInfo, ConstantsProvider};
use crate::error::{GeometryError, Result, normalize_index};
use crate::geometry::DEG2RAD;

/// One azimuthal sector of the forward TOF
#[derive(Debug, Clone)]
pub struct Sector {
    index: usize,
    panels: Vec<Panel>,
}

impl Sector {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn panel(&self, idx: isize) -> Result<&Panel> {
        let i = normalize_index("panel", idx, self.panels.len())?;
        Ok(&self.panels[i])
    }

    /// Look up a panel by name: "1a", "panel1b", "2", ...
    pub fn panel_by_name(&self, name: &str) -> Result<&Panel> {
        let lower = name.to_ascii_lowercase();
        let short = lower.strip_prefix("panel").unwrap_or(&lower);
        self.panels
            .iter()
            .find(|p| p.name() == short)
            .ok_or_else(|| GeometryError::request(format!("unknown FTOF panel: {name}")))
    }

    pub fn panel_name(&self, idx: isize) -> Result<&'static str> {
        Ok(self.panel(idx)?.name())
    }
}

/// The forward TOF system
#[derive(Debug, Clone, Default)]
pub struct ForwardTOF {
    sectors: Vec<Sector>,
}

/// Per-panel constants shared by all sectors
struct PanelParams {
    width: f64,
    thickness: f64,
    thtilt: f64,
    thmin: f64,
    dist2edge: f64,
    gap: f64,
    pairgap: f64,
    wrapper: f64,
    meas_lengths: Vec<f64>,
    slopes: Vec<f64>,
    intercepts: Vec<f64>,
}

impl PanelParams {
    fn fetch(provider: &dyn ConstantsProvider, set: &ConstantSetInfo, name: &str) -> Result<Self> {
        let panel = ccdb::fetch(provider, set, &format!("/geometry/ftof/panel{name}/panel"))?;
        let paddles = ccdb::fetch(provider, set, &format!("/geometry/ftof/panel{name}/paddles"))?;
        // only panel 1b has paired paddles
        let pairgap = if panel.has_column("pairgap") {
            panel.elem("pairgap", 0)?
        } else {
            0.0
        };
        Ok(Self {
            width: panel.elem("paddlewidth", 0)?,
            thickness: panel.elem("paddlethickness", 0)?,
            thtilt: panel.elem::<f64>("thtilt", 0)? * DEG2RAD,
            thmin: panel.elem::<f64>("thmin", 0)? * DEG2RAD,
            dist2edge: panel.elem("dist2edge", 0)?,
            gap: panel.elem("gap", 0)?,
            pairgap,
            wrapper: panel.elem("wrapperthickness", 0)?,
            meas_lengths: paddles.col("Length")?,
            slopes: paddles.col("Slope")?,
            intercepts: paddles.col("Intercept")?,
        })
    }
}

impl ForwardTOF {
    pub fn from_provider(provider: &dyn ConstantsProvider, set: &ConstantSetInfo) -> Result<Self> {
        let t_ftof = ccdb::fetch(provider, set, "/geometry/ftof/ftof")?;
        let nsectors: usize = t_ftof.elem("nsectors", 0)?;
        let npanels: usize = t_ftof.elem("npanels", 0)?;
        if npanels > PANEL_NAMES.len() {
            return Err(GeometryError::Ccdb(format!(
                "FTOF has {npanels} panels, at most {} are known",
                PANEL_NAMES.len()
            )));
        }

        let params = PANEL_NAMES[..npanels]
            .iter()
            .map(|name| PanelParams::fetch(provider, set, name))
            .collect::<Result<Vec<_>>>()?;
        debug!(nsectors, npanels, "building forward TOF");

        let sectors = (0..nsectors)
            .map(|sec| Sector {
                index: sec,
                panels: params
                    .iter()
                    .enumerate()
                    .map(|(pan, p)| Panel {
                        sector: sec,
                        index: pan,
                        paddle_width: p.width,
                        paddle_thickness: p.thickness,
                        thtilt: p.thtilt,
                        thmin: p.thmin,
                        dist2edge: p.dist2edge,
                        paddle_gap: p.gap,
                        paddle_pairgap: if pan == 1 { p.pairgap } else { 0.0 },
                        wrapper_thickness: p.wrapper,
                        paddle_meas_lengths: p.meas_lengths.clone(),
                        paddle_slopes: p.slopes.clone(),
                        paddle_intercepts: p.intercepts.clone(),
                    })
                    .collect(),
            })
            .collect();

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
