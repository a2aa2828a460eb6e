use std::f64::consts::FRAC_PI_2;

use rayon::prelude::*;
use serde_json::Value;

use crate::coordsys::CoordSys;
use crate::drift_chamber::{DriftChamber, Region, Sector, Senselayer, Superlayer};
use crate::error::Result;
use crate::geometry::{Direction3, Line3, LineSegment3, RAD2DEG, Vector3, projection};

use super::{DRIFT_CHAMBER, Trap, Volume, VolumeMap, insert_item, merge_volumes, pos_cm, volumes_value};

/// Clearance between neighbouring layer volumes
const MICROGAP: f64 = 0.01;

fn region_volume(sector: &Sector, region: &Region) -> Result<Volume> {
    let tilt = region.thtilt();
    let g0 = region
        .superlayer(0)?
        .guardlayer(0)?
        .wire(0, CoordSys::Sector)?
        .end_point();
    let g1 = region
        .superlayer(-1)?
        .guardlayer(-1)?
        .wire(-1, CoordSys::Sector)?
        .end_point();
    let center = region.center(CoordSys::Sector)?;

    let dy = 0.5 * (g1.x - g0.x) / tilt.cos();
    let trap = Trap {
        dz: 0.5 * region.thickness(),
        theta: -tilt,
        phi: FRAC_PI_2,
        dy1: dy,
        dx1: g0.y,
        dx2: g1.y,
        alp1: 0.0,
        dy2: dy,
        dx3: g0.y,
        dx4: g1.y,
        alp2: 0.0,
    };
    let description = format!(
        "Drift Chamber Sector {} Region {}",
        sector.index() + 1,
        region.index() + 1
    );

    // gemc swaps x and y
    Ok(Volume::new("root", description, "G4Trap", trap.dimensions())
        .set("pos", pos_cm(center.y, center.x, center.z))
        .set(
            "rotation",
            format!(
                "ordered: zxy {}*deg {}*deg 0*deg",
                90.0 + tilt * RAD2DEG,
                -90.0 - 60.0 * sector.index() as f64
            ),
        )
        .set("color", "aa0000")
        .set("material", "DCgas")
        .set("style", "0"))
}

/// Trapezoid spanned by a sense layer's outermost wires, half a layer thick
/// on either side of the wire plane
fn senselayer_trap(region: &Region, superlayer: &Superlayer, layer: &Senselayer) -> Result<Trap> {
    let tilt = region.thtilt();
    let half = 0.5 * superlayer.layer_thickness();
    let offset = Vector3::new(half * tilt.sin(), 0.0, half * tilt.cos());
    let dir = superlayer.wire_direction(CoordSys::Sector)?;
    let lplate = region.left_end_plate(CoordSys::Sector)?;
    let rplate = region.right_end_plate(CoordSys::Sector)?;

    let first = layer.wire_mid(0, CoordSys::Sector)?;
    let last = layer.wire_mid(-1, CoordSys::Sector)?;
    let lines = [
        Line3::new(first - offset, dir),
        Line3::new(last - offset, dir),
        Line3::new(first + offset, dir),
        Line3::new(last + offset, dir),
    ];
    let edge = |line: &Line3| -> Result<LineSegment3> {
        Ok(LineSegment3::new(lplate.intersection(line)?, rplate.intersection(line)?))
    };
    let (e00, e01, e10, e11) = (edge(&lines[0])?, edge(&lines[1])?, edge(&lines[2])?, edge(&lines[3])?);

    let p0 = projection(&e00.mid_point(), &lines[1])?;
    let p1 = projection(&e10.mid_point(), &lines[3])?;
    let d00 = Direction3::from_vector(&(p0 - e00.mid_point()))?;
    let d01 = Direction3::from_vector(&(e01.mid_point() - e00.mid_point()))?;
    let sign = if e01.mid_point().y - p0.y < 0.0 { -1.0 } else { 1.0 };
    let alp = sign * d00.angle(&d01);

    Ok(Trap {
        dz: half - MICROGAP,
        theta: -tilt,
        phi: FRAC_PI_2,
        dy1: 0.5 * (e00.mid_point() - p0).r(),
        dx1: 0.5 * e00.length(),
        dx2: 0.5 * e01.length(),
        alp1: alp,
        dy2: 0.5 * (e10.mid_point() - p1).r(),
        dx3: 0.5 * e10.length(),
        dx4: 0.5 * e11.length(),
        alp2: alp,
    })
}

fn sector_volumes(sector: &Sector) -> Result<VolumeMap> {
    let mut vols = VolumeMap::new();
    let s = sector.index() + 1;

    for region in sector.regions() {
        let r = region.index() + 1;
        let region_name = format!("R{r}_S{s}");
        let mother = region_volume(sector, region)?;
        vols.insert(region_name.clone(), mother.into_params());

        let region_center = region.center(CoordSys::Sector)?;
        let (st, ct) = region.thtilt().sin_cos();

        for superlayer in region.superlayers() {
            let sl = superlayer.index() + 1;
            for layer in superlayer.senselayers() {
                let l = layer.index() + 1;
                let trap = senselayer_trap(region, superlayer, layer)?;

                // offset from the region center, in the tilted frame
                let d = layer.center(CoordSys::Sector)? - region_center;
                let d = Vector3::new(ct * d.x - st * d.z, d.y, ct * d.z + st * d.x);

                let vol = Volume::new(
                    &region_name,
                    format!("Drift Chamber Sector {s} Region {r} Superlayer {sl} Senselayer {l}"),
                    "G4Trap",
                    trap.dimensions(),
                )
                .set("pos", pos_cm(d.y, d.x, d.z))
                .set("rotation", format!("0*deg 0*deg {}*deg", superlayer.thster() * RAD2DEG))
                .set("color", "66aadd")
                .set("material", "DCgas")
                .sensitive("DC")
                .set(
                    "identifiers",
                    format!("sector ncopy 0 superlayer manual {sl} layer manual {l} wire manual 1"),
                );
                vols.insert(format!("L{l}_SL{sl}_R{r}_S{s}"), vol.into_params());
            }
        }
    }
    Ok(vols)
}

/// Region mother volumes and sense layer volumes for gemc
pub fn dc_volumes_map(dc: &DriftChamber) -> Result<VolumeMap> {
    let parts = dc
        .sectors()
        .par_iter()
        .map(sector_volumes)
        .collect::<Result<Vec<_>>>()?;
    Ok(merge_volumes(parts))
}

pub fn dc_volumes(doc: &mut Value, dc: &DriftChamber) -> Result<VolumeMap> {
    let vols = dc_volumes_map(dc)?;
    insert_item(doc, DRIFT_CHAMBER, "volumes", volumes_value(&vols));
    Ok(vols)
}
