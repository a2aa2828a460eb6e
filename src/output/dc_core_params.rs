use serde_json::{Value, json};

use crate::drift_chamber::DriftChamber;
use crate::error::Result;

use super::{DRIFT_CHAMBER, insert_item, length_conversion};

/// Wire-plane spacing per region and superlayer, taken from the first sector
pub fn dc_core_params(doc: &mut Value, dc: &DriftChamber, units: &str) -> Result<()> {
    let lconv = length_conversion(units)?;
    let sector = dc.sector(0)?;

    let regions: Vec<Value> = sector
        .regions()
        .iter()
        .map(|region| {
            let superlayers: Vec<Value> = region
                .superlayers()
                .iter()
                .map(|sl| json!({ "index": sl.index(), "wpdist": sl.wpdist() * lconv }))
                .collect();
            json!({ "index": region.index(), "superlayers": superlayers })
        })
        .collect();

    insert_item(
        doc,
        DRIFT_CHAMBER,
        "core_params",
        json!({ "length_units": units, "regions": regions }),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccdb::ConstantSetInfo;
    use crate::output::new_document;
    use crate::test_support::nominal;

    #[test]
    fn test_core_params() {
        let dc = DriftChamber::from_provider(&nominal(), &ConstantSetInfo::default()).unwrap();
        let mut doc = new_document();
        dc_core_params(&mut doc, &dc, "mm").unwrap();
        let regions = doc["geometry"]["drift_chamber"]["core_params"]["regions"]
            .as_array()
            .unwrap();
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[2]["index"], 2);
        let wpdist = regions[0]["superlayers"][0]["wpdist"].as_f64().unwrap();
        assert!((wpdist - 3.861).abs() < 1e-9);
    }

    #[test]
    fn test_empty_detector_is_an_error() {
        let mut doc = new_document();
        assert!(dc_core_params(&mut doc, &DriftChamber::default(), "cm").is_err());
    }
}
