use rayon::prelude::*;
use serde_json::{Value, json};

use crate::coordsys::CoordSys;
use crate::drift_chamber::{DriftChamber, Sector};
use crate::error::Result;
use crate::geometry::{LineSegment3, Vector3};

use super::{DRIFT_CHAMBER, insert_item, length_conversion, point_lists, require_coordsys};

fn layer_entry(ids: Value, wires: &[LineSegment3], lconv: f64) -> Value {
    let left: Vec<Vector3> = wires.iter().map(LineSegment3::begin_point).collect();
    let right: Vec<Vector3> = wires.iter().map(LineSegment3::end_point).collect();
    let mut entry = ids;
    entry["left"] = point_lists(&left, lconv);
    entry["right"] = point_lists(&right, lconv);
    entry
}

fn sector_layers(sector: &Sector, coordsys: CoordSys, lconv: f64) -> Result<Vec<Value>> {
    let mut layers = Vec::new();
    for region in sector.regions() {
        for superlayer in region.superlayers() {
            let ids = |kind: &str, idx: usize| {
                json!({
                    "sector": sector.index(),
                    "region": region.index(),
                    "superlayer": superlayer.index(),
                    kind: idx,
                })
            };
            for layer in superlayer.senselayers() {
                let wires = layer.wires(coordsys)?;
                layers.push(layer_entry(ids("senselayer", layer.index()), &wires, lconv));
            }
            for layer in superlayer.guardlayers() {
                let wires = layer.wires(coordsys)?;
                layers.push(layer_entry(ids("guardlayer", layer.index()), &wires, lconv));
            }
        }
    }
    Ok(layers)
}

/// Left and right endpoints of every sense and guard wire
pub fn dc_wire_endpoints(
    doc: &mut Value,
    dc: &DriftChamber,
    coordsys: CoordSys,
    units: &str,
) -> Result<()> {
    let lconv = length_conversion(units)?;
    require_coordsys(coordsys, &[CoordSys::Sector, CoordSys::Clas])?;

    let per_sector = dc
        .sectors()
        .par_iter()
        .map(|sector| sector_layers(sector, coordsys, lconv))
        .collect::<Result<Vec<_>>>()?;
    let layers: Vec<Value> = per_sector.into_iter().flatten().collect();

    insert_item(
        doc,
        DRIFT_CHAMBER,
        "wire_endpoints",
        json!({
            "length_units": units,
            "coordinate_system": coordsys.as_str(),
            "layers": layers,
        }),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccdb::ConstantSetInfo;
    use crate::output::new_document;
    use crate::test_support::nominal;

    fn dc() -> DriftChamber {
        DriftChamber::from_provider(&nominal(), &ConstantSetInfo::default()).unwrap()
    }

    #[test]
    fn test_layers_in_order() {
        let dc = dc();
        let mut doc = new_document();
        dc_wire_endpoints(&mut doc, &dc, CoordSys::Sector, "cm").unwrap();
        let node = &doc["geometry"]["drift_chamber"]["wire_endpoints"];
        assert_eq!(node["length_units"], "cm");
        assert_eq!(node["coordinate_system"], "sector");
        let layers = node["layers"].as_array().unwrap();
        // 6 sectors x 3 regions x 2 superlayers x (6 sense + 2 guard)
        assert_eq!(layers.len(), 6 * 3 * 2 * 8);
        assert_eq!(layers[0]["senselayer"], 0);
        assert_eq!(layers[6]["guardlayer"], 0);
        assert_eq!(layers[8]["superlayer"], 1);
        assert_eq!(layers.last().unwrap()["sector"], 5);
        assert_eq!(layers[0]["left"]["x"].as_array().unwrap().len(), 113);
    }

    #[test]
    fn test_units_scale_endpoints() {
        let dc = dc();
        let mut cm = new_document();
        let mut mm = new_document();
        dc_wire_endpoints(&mut cm, &dc, CoordSys::Clas, "cm").unwrap();
        dc_wire_endpoints(&mut mm, &dc, CoordSys::Clas, "mm").unwrap();
        let x = |doc: &Value| {
            doc["geometry"]["drift_chamber"]["wire_endpoints"]["layers"][10]["right"]["z"][7]
                .as_f64()
                .unwrap()
        };
        assert!((x(&mm) - 10.0 * x(&cm)).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_layer_coordinates() {
        let dc = dc();
        let mut doc = new_document();
        let err = dc_wire_endpoints(&mut doc, &dc, CoordSys::Layer, "cm").unwrap_err();
        assert_eq!(err.to_string(), "can not generate data in layer coordinates");
        assert!(dc_wire_endpoints(&mut doc, &dc, CoordSys::Sector, "ft").is_err());
    }
}
