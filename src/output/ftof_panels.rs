use serde_json::{Value, json};

use crate::coordsys::CoordSys;
use crate::error::Result;
use crate::forward_tof::{ForwardTOF, Panel};

use super::{FORWARD_TOF, insert_item, length_conversion, point_lists, require_coordsys};

fn panel_entry(panel: &Panel, coordsys: CoordSys, lconv: f64) -> Result<Value> {
    let normal = panel.panel_normal(coordsys)?;
    let paddle_dir = panel.paddle_direction(coordsys)?;
    let extent = panel.paddle_extent(CoordSys::Sector)?;
    let centers = panel.paddle_centers(coordsys)?;
    let lengths: Vec<f64> = panel
        .paddle_lengths()?
        .into_iter()
        .map(|l| l * lconv)
        .collect();

    Ok(json!({
        "sector": panel.sector_index(),
        "panel": panel.index(),
        "npaddles": panel.npaddles(),
        "dist2tgt": panel.dist2tgt() * lconv,
        "norm_phi": normal.phi(),
        "norm_theta": normal.theta(),
        "paddle_phi": paddle_dir.phi(),
        "paddle_theta": paddle_dir.theta(),
        "paddle_width": panel.paddle_width() * lconv,
        "paddle_thickness": panel.paddle_thickness() * lconv,
        "paddle_extent_x": extent.x * lconv,
        "paddle_extent_z": extent.z * lconv,
        "paddle_centers": point_lists(&centers, lconv),
        "paddle_lengths": lengths,
    }))
}

/// Placement parameters of every panel, as used by reconstruction
pub fn ftof_panels_parms(
    doc: &mut Value,
    ftof: &ForwardTOF,
    coordsys: CoordSys,
    units: &str,
) -> Result<()> {
    let lconv = length_conversion(units)?;
    require_coordsys(coordsys, &[CoordSys::Sector, CoordSys::Clas])?;

    let mut panels = Vec::new();
    for sector in ftof.sectors() {
        for panel in sector.panels() {
            panels.push(panel_entry(panel, coordsys, lconv)?);
        }
    }

    insert_item(
        doc,
        FORWARD_TOF,
        "panels_parms",
        json!({
            "length_units": units,
            "coordinate_system": coordsys.as_str(),
            "panels": panels,
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

    fn ftof() -> ForwardTOF {
        ForwardTOF::from_provider(&nominal(), &ConstantSetInfo::default()).unwrap()
    }

    #[test]
    fn test_panels_parms_layout() {
        let ftof = ftof();
        let mut doc = new_document();
        ftof_panels_parms(&mut doc, &ftof, CoordSys::Clas, "cm").unwrap();
        let item = &doc["geometry"]["forward_tof"]["panels_parms"];
        assert_eq!(item["length_units"], "cm");
        assert_eq!(item["coordinate_system"], "clas");
        let panels = item["panels"].as_array().unwrap();
        assert_eq!(panels.len(), 6 * 3);

        let p1b = &panels[1];
        assert_eq!(p1b["sector"], 0);
        assert_eq!(p1b["panel"], 1);
        assert_eq!(p1b["npaddles"], 62);
        assert_eq!(p1b["paddle_centers"]["x"].as_array().unwrap().len(), 62);
        assert_eq!(p1b["paddle_lengths"].as_array().unwrap().len(), 62);
    }

    #[test]
    fn test_lengths_are_scaled() {
        let ftof = ftof();
        let mut cm_doc = new_document();
        let mut mm_doc = new_document();
        ftof_panels_parms(&mut cm_doc, &ftof, CoordSys::Sector, "cm").unwrap();
        ftof_panels_parms(&mut mm_doc, &ftof, CoordSys::Sector, "mm").unwrap();
        let a = &cm_doc["geometry"]["forward_tof"]["panels_parms"]["panels"][0];
        let b = &mm_doc["geometry"]["forward_tof"]["panels_parms"]["panels"][0];
        for key in ["dist2tgt", "paddle_width", "paddle_extent_x"] {
            let (a, b) = (a[key].as_f64().unwrap(), b[key].as_f64().unwrap());
            assert!((b - 10.0 * a).abs() < 1e-9, "{key}");
        }
        let la = a["paddle_lengths"][3].as_f64().unwrap();
        let lb = b["paddle_lengths"][3].as_f64().unwrap();
        assert!((lb - 10.0 * la).abs() < 1e-9);
        assert_eq!(a["norm_theta"], b["norm_theta"]);
    }

    #[test]
    fn test_layer_coordinates_rejected() {
        let mut doc = new_document();
        let err = ftof_panels_parms(&mut doc, &ftof(), CoordSys::Layer, "cm").unwrap_err();
        assert_eq!(err.to_string(), "can not generate data in layer coordinates");
        assert!(doc["geometry"].get("forward_tof").is_none());
    }
}
