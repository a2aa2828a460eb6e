use rayon::prelude::*;
use serde_json::Value;

use crate::coordsys::CoordSys;
use crate::electromagnetic_cal::{ElectromagneticCal, Sector};
use crate::error::Result;

use super::{
    ELECTROMAGNETIC_CAL, Trap, Volume, VolumeMap, insert_item, merge_volumes, pos_cm,
    sector_rotation, volumes_value,
};

const APEX_HALF_WIDTH: f64 = 1e-5;

fn sector_volumes(sector: &Sector) -> Result<VolumeMap> {
    let mut vols = VolumeMap::new();
    let s = sector.index() + 1;
    let mother_name = format!("EC_S{s}");
    let first = sector.layer(0)?;
    let view_angle = first.view_angle();
    let last = sector.total_layers().saturating_sub(1);
    let center = sector.center(CoordSys::Clas)?;
    // half width at the base of a triangle with half height `h`
    let base = |h: f64| 2.0 * h / view_angle.tan();

    let mother = Trap::prism(
        0.5 * sector.thickness()?,
        sector.scint_y_offset(last)? + sector.scint_half_height(last)?,
        APEX_HALF_WIDTH,
        base(sector.scint_half_height(last)?),
    );
    let vol = Volume::new(
        "root",
        format!("Electromagnetic Calorimeter Sector {s}"),
        "G4Trap",
        mother.dimensions(),
    )
    .set("pos", pos_cm(center.x, center.y, center.z))
    .set("rotation", sector_rotation(sector.index(), sector.thtilt()))
    .set("color", "ff1111")
    .set("visible", "0")
    .set("style", "0");
    vols.insert(mother_name.clone(), vol.into_params());

    let scint_dz = 0.5 * first.strip_thick() + first.wrapper_thick();
    for k in 0..sector.total_layers() {
        let view = sector.scint_layer_view(k)?;
        let name = view.name().to_ascii_uppercase();
        let l = k / first.nviews() + 1;
        let half_height = sector.scint_half_height(k)?;
        let trap = Trap::prism(scint_dz, half_height, APEX_HALF_WIDTH, base(half_height));
        let vol = Volume::new(
            &mother_name,
            format!("Electromagnetic Calorimeter Sector {s} {name} view, Layer {l}"),
            "G4Trap",
            trap.dimensions(),
        )
        .set("pos", pos_cm(0.0, sector.scint_y_offset(k)?, sector.scint_layer_z(k)?))
        .set("color", "ff6633")
        .set("material", "scintillator")
        .sensitive("EC")
        .set(
            "identifiers",
            format!("sector ncopy 0 view manual {} layer manual {l}", view.index() + 1),
        );
        vols.insert(format!("{mother_name}_{name}{l}"), vol.into_params());
    }

    for k in 0..last {
        // the sheet is trimmed by `cut` at the apex
        let cut = sector.lead_vertex_cut(k)?;
        let half_height = sector.scint_half_height(k)?;
        let trap = Trap::prism(
            0.5 * first.lead_thick(),
            half_height - 0.5 * cut,
            base(0.5 * cut),
            base(half_height),
        );
        let vol = Volume::new(
            &mother_name,
            format!("Electromagnetic Calorimeter Sector {s} lead, Layer {}", k + 1),
            "G4Trap",
            trap.dimensions(),
        )
        .set("pos", pos_cm(0.0, sector.lead_layer_y(k)?, sector.lead_layer_z(k)?))
        .set("color", "ff6633")
        .set("material", "Lead")
        .set("identifiers", format!("sector ncopy 0 lead manual {}", k + 1));
        vols.insert(format!("{mother_name}_lead{}", k + 1), vol.into_params());
    }
    Ok(vols)
}

/// Module mother volumes with their scintillator and lead layers
pub fn ec_volumes_map(ec: &ElectromagneticCal) -> Result<VolumeMap> {
    let parts = ec
        .sectors()
        .par_iter()
        .map(sector_volumes)
        .collect::<Result<Vec<_>>>()?;
    Ok(merge_volumes(parts))
}

pub fn ec_volumes(doc: &mut Value, ec: &ElectromagneticCal) -> Result<VolumeMap> {
    let vols = ec_volumes_map(ec)?;
    insert_item(doc, ELECTROMAGNETIC_CAL, "volumes", volumes_value(&vols));
    Ok(vols)
}
