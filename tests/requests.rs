//! End-to-end geometry requests against the SQLite and JSON sources.

mod common;

use clas12_geometry::ccdb::{ConstantSetInfo, SqliteProvider};
use clas12_geometry::drift_chamber::DriftChamber;
use clas12_geometry::request::{GeometryRequest, is_error};
use common::{build_sqlite, nominal_json, options};
use serde_json::Value;

const ALL_ITEMS: &str = "dc/wire_endpoints dc/core_params dc/volumes ftof/panels_parms \
                         ftof/volumes pcal/volumes ec/volumes bst/strip_endpoints";

fn generate(pairs: &[(&str, &str)]) -> Value {
    let req = GeometryRequest::from_options(&options(pairs)).unwrap();
    let provider = req.open_source().unwrap();
    req.generate(provider.as_ref()).unwrap()
}

#[test]
fn test_sqlite_and_json_sources_agree() {
    let dir = tempfile::tempdir().unwrap();
    let sqlite = build_sqlite(dir.path());
    let json = nominal_json();

    let from_sqlite = generate(&[
        ("request", ALL_ITEMS),
        ("sqlite", sqlite.to_str().unwrap()),
    ]);
    let from_json = generate(&[("request", ALL_ITEMS), ("json", json.to_str().unwrap())]);

    assert_eq!(from_sqlite, from_json);
    let geometry = from_sqlite["geometry"].as_object().unwrap();
    assert_eq!(geometry.len(), 5);
}

#[test]
fn test_run_range_override() {
    let dir = tempfile::tempdir().unwrap();
    let sqlite = build_sqlite(dir.path());
    let path = sqlite.to_str().unwrap();

    let volumes = |extra: &[(&str, &str)]| {
        let mut pairs = vec![("request", "dc/volumes"), ("sqlite", path)];
        pairs.extend_from_slice(extra);
        let req = GeometryRequest::from_options(&options(&pairs)).unwrap();
        let provider = req.open_source().unwrap();
        req.generate_volumes(provider.as_ref()).unwrap()
    };

    // 3 region mothers and 36 sense layers per sector
    assert_eq!(volumes(&[]).len(), 6 * 39);
    assert_eq!(volumes(&[("run", "150")]).len(), 2 * 39);
    assert_eq!(volumes(&[("run", "201")]).len(), 6 * 39);
    // before the override was created
    assert_eq!(
        volumes(&[("run", "150"), ("timestamp", "2014-12")]).len(),
        6 * 39
    );
}

#[test]
fn test_variation_falls_back_to_parent() {
    let dir = tempfile::tempdir().unwrap();
    let sqlite = build_sqlite(dir.path());
    let provider = SqliteProvider::open(&sqlite).unwrap();

    let set = ConstantSetInfo {
        variation: "mc".to_string(),
        ..ConstantSetInfo::default()
    };
    let dc = DriftChamber::from_provider(&provider, &set).unwrap();
    assert_eq!(dc.sectors().len(), 6);

    let set = ConstantSetInfo {
        variation: "nosuch".to_string(),
        ..ConstantSetInfo::default()
    };
    let err = DriftChamber::from_provider(&provider, &set).unwrap_err();
    assert_eq!(err.to_string(), "no such variation: nosuch");
}

#[test]
fn test_units_scale_documents() {
    let json = nominal_json();
    let path = json.to_str().unwrap();
    let cm = generate(&[("request", "bst/strip_endpoints"), ("json", path)]);
    let mm = generate(&[
        ("request", "bst/strip_endpoints"),
        ("json", path),
        ("units", "mm"),
    ]);

    let first = |doc: &Value| doc["geometry"]["barrel_svt"]["strip_endpoints"]["layers"][0].clone();
    assert_eq!(first(&cm)["region"], first(&mm)["region"]);
    assert_eq!(mm["geometry"]["barrel_svt"]["strip_endpoints"]["length_units"], "mm");
    let z_cm = first(&cm)["first"]["z"][0].as_f64().unwrap();
    let z_mm = first(&mm)["first"]["z"][0].as_f64().unwrap();
    assert!(z_cm.abs() > 1.0);
    assert!((z_mm - 10.0 * z_cm).abs() < 1e-9);
}

#[test]
fn test_render_reports_errors() {
    let json = nominal_json();
    let path = json.to_str().unwrap();

    let req = GeometryRequest::from_options(&options(&[
        ("request", "dc/wire_endpoints"),
        ("json", path),
        ("coordsys", "layer"),
    ]))
    .unwrap();
    let provider = req.open_source().unwrap();
    let rendered = req.render(provider.as_ref());
    assert!(is_error(&rendered), "{rendered}");

    let req = GeometryRequest::from_options(&options(&[
        ("request", "dc/core_params"),
        ("json", path),
    ]))
    .unwrap();
    let rendered = req.render(provider.as_ref());
    assert!(!is_error(&rendered));
    let doc: Value = serde_json::from_str(&rendered).unwrap();
    assert!(doc["geometry"]["drift_chamber"]["core_params"].is_object());
}

#[test]
fn test_missing_source_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.sqlite");
    let req = GeometryRequest::from_options(&options(&[
        ("request", "dc/core_params"),
        ("sqlite", missing.to_str().unwrap()),
    ]))
    .unwrap();
    let err = req.open_source().err().unwrap();
    assert!(err.to_string().contains("could not be found"));
}
