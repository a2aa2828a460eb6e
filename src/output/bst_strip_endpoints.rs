use serde_json::{Value, json};

use crate::central_tracker::BarrelSVT;
use crate::coordsys::CoordSys;
use crate::error::Result;
use crate::geometry::{LineSegment3, Vector3};

use super::{BARREL_SVT, insert_item, length_conversion, point_lists, require_coordsys};

/// Lab-frame endpoints of every barrel SVT strip
pub fn bst_strip_endpoints(
    doc: &mut Value,
    bst: &BarrelSVT,
    coordsys: CoordSys,
    units: &str,
) -> Result<()> {
    let lconv = length_conversion(units)?;
    require_coordsys(coordsys, &[CoordSys::Clas])?;

    let mut layers = Vec::new();
    for region in bst.regions() {
        for sector in region.sectors() {
            for layer in sector.layers() {
                let strips = layer.strips_lab()?;
                let first: Vec<Vector3> = strips.iter().map(LineSegment3::begin_point).collect();
                let second: Vec<Vector3> = strips.iter().map(LineSegment3::end_point).collect();
                layers.push(json!({
                    "region": region.index(),
                    "sector": sector.index(),
                    "layer": layer.index(),
                    "first": point_lists(&first, lconv),
                    "second": point_lists(&second, lconv),
                }));
            }
        }
    }

    insert_item(
        doc,
        BARREL_SVT,
        "strip_endpoints",
        json!({
            "length_units": units,
            "coordinate_system": coordsys.as_str(),
            "layers": layers,
        }),
    );
    Ok(())
}
