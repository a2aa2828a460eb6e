use rayon::prelude::*;
use serde_json::Value;

use crate::coordsys::CoordSys;
use crate::error::Result;
use crate::forward_tof::{ForwardTOF, Panel, Sector};

use super::{
    FORWARD_TOF, Volume, VolumeMap, cm, insert_item, merge_volumes, pos_cm, sector_rotation,
    volumes_value,
};

/// Clearance between the paddles and the panel mother volume
const MOTHERGAP: f64 = 0.4;

fn panel_mother(panel: &Panel) -> Result<Volume> {
    let len_first = panel.paddle_length(0)?;
    let len_last = panel.paddle_length(-1)?;
    let len_prev = panel.paddle_length(-2)?;

    let dx1 = 0.5 * len_first + MOTHERGAP;
    let dx2 = 0.5 * len_last + MOTHERGAP + 0.5 * (len_last - len_prev);
    let dy = 0.5 * panel.paddle_thickness() + MOTHERGAP;
    let dz = 0.5 * panel.radial_extent() + MOTHERGAP;
    let center = panel.center(CoordSys::Clas)?;

    let dimensions = [cm(dx1), cm(dx2), cm(dy), cm(dy), cm(dz)].join(" ");
    let description = format!(
        "Forward Time Of Flight Sector {} Panel {}",
        panel.sector_index() + 1,
        panel.name()
    );
    Ok(Volume::new("root", description, "Trd", dimensions)
        .set("pos", pos_cm(center.x, center.y, center.z))
        .set("rotation", sector_rotation(panel.sector_index(), panel.thtilt()))
        .set("color", "ff11aa5")
        .set("visible", "0")
        .set("style", "0"))
}

fn panel_volumes(panel: &Panel, vols: &mut VolumeMap) -> Result<()> {
    let s = panel.sector_index() + 1;
    let mother_name = format!("sec{s}_pan{}", panel.name());
    vols.insert(mother_name.clone(), panel_mother(panel)?.into_params());

    let panel_x = panel.center(CoordSys::Sector)?.x;
    let cos_tilt = panel.thtilt().cos();
    let half_thick = 0.5 * panel.paddle_thickness();
    let half_width = 0.5 * panel.paddle_width();

    for (p, length) in panel.paddle_lengths()?.into_iter().enumerate() {
        let k = p + 1;
        // distance from the panel center measured along the tilted panel
        let posz = (panel.paddle_center_x(p as isize)? - panel_x) / cos_tilt;
        let dimensions = [cm(0.5 * length), cm(half_thick), cm(half_width)].join(" ");
        let vol = Volume::new(
            &mother_name,
            format!(
                "paddle {k} of Forward Time Of Flight Sector {s} Panel {}",
                panel.name()
            ),
            "Box",
            dimensions,
        )
        .set("pos", pos_cm(0.0, 0.0, posz))
        .set("color", "ff11aa")
        .set("material", "scintillator")
        .sensitive(&format!("FTOF_{}", panel.name()))
        .set("identifiers", format!("sector ncopy 0 paddle manual {k}"));
        vols.insert(format!("{mother_name}_pad{k}"), vol.into_params());
    }
    Ok(())
}

fn sector_volumes(sector: &Sector) -> Result<VolumeMap> {
    let mut vols = VolumeMap::new();
    for panel in sector.panels() {
        panel_volumes(panel, &mut vols)?;
    }
    Ok(vols)
}

/// Panel mother volumes and their paddles for gemc
pub fn ftof_volumes_map(ftof: &ForwardTOF) -> Result<VolumeMap> {
    let parts = ftof
        .sectors()
        .par_iter()
        .map(sector_volumes)
        .collect::<Result<Vec<_>>>()?;
    Ok(merge_volumes(parts))
}

pub fn ftof_volumes(doc: &mut Value, ftof: &ForwardTOF) -> Result<VolumeMap> {
    let vols = ftof_volumes_map(ftof)?;
    insert_item(doc, FORWARD_TOF, "volumes", volumes_value(&vols));
    Ok(vols)
}
