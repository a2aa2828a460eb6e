//! Result documents built from detector geometry.
//!
//! Every generator adds one item under `geometry.<system>` of a shared JSON
//! document, so several requests can be answered in a single tree:
//!
//! ```text
//! {"geometry": {"drift_chamber": {"wire_endpoints": {...}, "volumes": {...}}}}
//! ```
//!
//! Volume generators also return a [`VolumeMap`] for gemc.

mod bst_strip_endpoints;
mod dc_core_params;
mod dc_volumes;
mod dc_wire_endpoints;
mod ec_volumes;
mod ftof_panels;
mod ftof_volumes;
mod pcal_volumes;
mod print;

pub use bst_strip_endpoints::bst_strip_endpoints;
pub use dc_core_params::dc_core_params;
pub use dc_volumes::{dc_volumes, dc_volumes_map};
pub use dc_wire_endpoints::dc_wire_endpoints;
pub use ec_volumes::{ec_volumes, ec_volumes_map};
pub use ftof_panels::ftof_panels_parms;
pub use ftof_volumes::{ftof_volumes, ftof_volumes_map};
pub use pcal_volumes::{pcal_volumes, pcal_volumes_map};
pub use print::print_volumes;

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::coordsys::CoordSys;
use crate::error::{GeometryError, Result};
use crate::geometry::{RAD2DEG, Vector3};

/// gemc volume parameters: `volumes[name][key] = value`
pub type VolumeMap = BTreeMap<String, BTreeMap<String, String>>;

/// Document node names for each system
pub const DRIFT_CHAMBER: &str = "drift_chamber";
pub const FORWARD_TOF: &str = "forward_tof";
pub const PRESHOWER_CAL: &str = "preshower_cal";
pub const ELECTROMAGNETIC_CAL: &str = "electromagnetic_cal";
pub const BARREL_SVT: &str = "barrel_svt";

/// Factor from centimetres to `units`
pub fn length_conversion(units: &str) -> Result<f64> {
    match units {
        "cm" => Ok(1.0),
        "mm" => Ok(10.0),
        "m" => Ok(0.01),
        other => Err(GeometryError::Units(other.to_string())),
    }
}

/// An empty document
pub fn new_document() -> Value {
    json!({ "geometry": {} })
}

/// Put `value` at `geometry.<system>.<item>`, creating parents as needed
pub fn insert_item(doc: &mut Value, system: &str, item: &str, value: Value) {
    if !doc.is_object() || !doc["geometry"].is_object() && !doc["geometry"].is_null() {
        *doc = new_document();
    }
    if !doc["geometry"][system].is_object() {
        doc["geometry"][system] = Value::Object(Map::new());
    }
    doc["geometry"][system][item] = value;
}

/// Fail unless data can be produced in `coordsys`
pub(crate) fn require_coordsys(coordsys: CoordSys, allowed: &[CoordSys]) -> Result<()> {
    if allowed.contains(&coordsys) {
        Ok(())
    } else {
        Err(GeometryError::request(format!(
            "can not generate data in {coordsys} coordinates"
        )))
    }
}

/// Endpoint lists `{x: [...], y: [...], z: [...]}` scaled by `lconv`
pub(crate) fn point_lists<'a>(points: impl IntoIterator<Item = &'a Vector3>, lconv: f64) -> Value {
    let (mut xs, mut ys, mut zs) = (Vec::new(), Vec::new(), Vec::new());
    for p in points {
        xs.push(p.x * lconv);
        ys.push(p.y * lconv);
        zs.push(p.z * lconv);
    }
    json!({ "x": xs, "y": ys, "z": zs })
}

/// Volume maps of independent sectors, combined in sector order
pub(crate) fn merge_volumes(parts: Vec<VolumeMap>) -> VolumeMap {
    parts.into_iter().flatten().collect()
}

pub(crate) fn volumes_value(vols: &VolumeMap) -> Value {
    serde_json::to_value(vols).unwrap_or(Value::Null)
}

pub(crate) fn cm(v: f64) -> String {
    format!("{v}*cm")
}

pub(crate) fn deg(radians: f64) -> String {
    format!("{}*deg", radians * RAD2DEG)
}

/// Space separated `*cm` triplet
pub(crate) fn pos_cm(x: f64, y: f64, z: f64) -> String {
    format!("{} {} {}", cm(x), cm(y), cm(z))
}

/// gemc G4Trap dimension string
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Trap {
    pub dz: f64,
    pub theta: f64,
    pub phi: f64,
    pub dy1: f64,
    pub dx1: f64,
    pub dx2: f64,
    pub alp1: f64,
    pub dy2: f64,
    pub dx3: f64,
    pub dx4: f64,
    pub alp2: f64,
}

impl Trap {
    /// Symmetric trapezoid with identical faces and no skew
    pub fn prism(dz: f64, dy: f64, dx1: f64, dx2: f64) -> Self {
        Self {
            dz,
            dy1: dy,
            dx1,
            dx2,
            dy2: dy,
            dx3: dx1,
            dx4: dx2,
            ..Default::default()
        }
    }

    pub fn dimensions(&self) -> String {
        [
            cm(self.dz),
            deg(self.theta),
            deg(self.phi),
            cm(self.dy1),
            cm(self.dx1),
            cm(self.dx2),
            deg(self.alp1),
            cm(self.dy2),
            cm(self.dx3),
            cm(self.dx4),
            deg(self.alp2),
        ]
        .join(" ")
    }
}

/// Builder for one gemc volume entry
#[derive(Debug, Clone)]
pub(crate) struct Volume {
    params: BTreeMap<String, String>,
}

impl Volume {
    pub fn new(mother: &str, description: String, solid: &str, dimensions: String) -> Self {
        let mut params = BTreeMap::new();
        for (key, value) in [
            ("mother", mother),
            ("type", solid),
            ("mfield", "no"),
            ("ncopy", "1"),
            ("pMany", "1"),
            ("exist", "1"),
            ("visible", "1"),
            ("style", "1"),
            ("sensitivity", "no"),
            ("hit_type", ""),
            ("identifiers", ""),
            ("rotation", "0*deg 0*deg 0*deg"),
            ("pos", "0*cm 0*cm 0*cm"),
            ("material", "G4_AIR"),
            ("color", "ffffff"),
        ] {
            params.insert(key.to_string(), value.to_string());
        }
        params.insert("description".to_string(), description);
        params.insert("dimensions".to_string(), dimensions);
        Self { params }
    }

    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Sensitive detector name, used for both sensitivity and hit type
    pub fn sensitive(self, name: &str) -> Self {
        self.set("sensitivity", name).set("hit_type", name)
    }

    pub fn into_params(self) -> BTreeMap<String, String> {
        self.params
    }
}

/// gemc rotation of a sector-aligned mother volume
pub(crate) fn sector_rotation(sector: usize, tilt: f64) -> String {
    format!(
        "ordered: zxy {}*deg {}*deg 0*deg",
        -90.0 - 60.0 * sector as f64,
        -90.0 - tilt * RAD2DEG
    )
}
