use rayon::prelude::*;
use serde_json::Value;

use crate::coordsys::CoordSys;
use crate::error::Result;
use crate::preshower_cal::{PreshowerCal, Sector};

use super::{
    PRESHOWER_CAL, Volume, VolumeMap, cm, insert_item, merge_volumes, pos_cm, sector_rotation,
    volumes_value,
};

/// Half width at the apex; gemc rejects a zero-length side
const APEX_HALF_WIDTH: f64 = 1e-5;

/// Triangular Trd cross-section shared by the mother and every layer
struct Outline {
    dx2: f64,
    dy: f64,
}

impl Outline {
    fn dimensions(&self, dz: f64) -> String {
        [cm(APEX_HALF_WIDTH), cm(self.dx2), cm(self.dy), cm(self.dy), cm(dz)].join(" ")
    }
}

fn sector_volumes(sector: &Sector) -> Result<VolumeMap> {
    let mut vols = VolumeMap::new();
    let s = sector.index() + 1;
    let mother_name = format!("PCAL_S{s}");
    let first = sector.layer(0)?;
    let outline = Outline {
        dx2: 0.5 * first.view_by_name("u")?.strip_length(-1)?,
        dy: 0.5 * sector.height()?,
    };
    let center = sector.center(CoordSys::Clas)?;

    let mother = Volume::new(
        "root",
        format!("Preshower Calorimeter Sector {s}"),
        "Trd",
        outline.dimensions(0.5 * sector.thickness()?),
    )
    .set("pos", pos_cm(center.x, center.y, center.z))
    .set("rotation", sector_rotation(sector.index(), sector.thtilt()))
    .set("color", "ff11aa5")
    .set("visible", "0")
    .set("style", "0");
    vols.insert(mother_name.clone(), mother.into_params());

    let mut k = 0;
    for layer in sector.layers() {
        let l = layer.index() + 1;
        for view in layer.views() {
            let name = view.name().to_ascii_uppercase();
            let vol = Volume::new(
                &mother_name,
                format!("Preshower Calorimeter Sector {s} {name} view, Layer {l}"),
                "Trd",
                outline.dimensions(0.5 * layer.strip_thick()),
            )
            .set("pos", pos_cm(0.0, 0.0, sector.scint_layer_z(k)?))
            .set("color", "ff11aa")
            .set("material", "scintillator")
            .sensitive("PCAL")
            .set(
                "identifiers",
                format!("sector ncopy 0 view manual {} layer manual {l}", view.index() + 1),
            );
            vols.insert(format!("{mother_name}_{name}{l}"), vol.into_params());
            k += 1;
        }
    }

    for lead in 0..sector.total_layers().saturating_sub(1) {
        let vol = Volume::new(
            &mother_name,
            format!("Preshower Calorimeter Sector {s} lead, Layer {}", lead + 1),
            "Trd",
            outline.dimensions(0.5 * first.lead_thick()),
        )
        .set("pos", pos_cm(0.0, 0.0, sector.lead_layer_z(lead)?))
        .set("color", "ff6633")
        .set("material", "Lead");
        vols.insert(format!("{mother_name}_lead{}", lead + 1), vol.into_params());
    }
    Ok(vols)
}

/// Module mother volumes with their scintillator and lead layers
pub fn pcal_volumes_map(pcal: &PreshowerCal) -> Result<VolumeMap> {
    let parts = pcal
        .sectors()
        .par_iter()
        .map(sector_volumes)
        .collect::<Result<Vec<_>>>()?;
    Ok(merge_volumes(parts))
}

pub fn pcal_volumes(doc: &mut Value, pcal: &PreshowerCal) -> Result<VolumeMap> {
    let vols = pcal_volumes_map(pcal)?;
    insert_item(doc, PRESHOWER_CAL, "volumes", volumes_value(&vols));
    Ok(vols)
}
