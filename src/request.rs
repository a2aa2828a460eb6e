//! Geometry requests: parse a flat option map, build the detectors it names
//! and render their outputs into one document.
//!
//! ```ignore
//! let options = BTreeMap::from([
//!     ("request".to_string(), "dc/wire_endpoints, ftof/panels_parms".to_string()),
//!     ("sqlite".to_string(), "clas12.sqlite".to_string()),
//! ]);
//! let req = GeometryRequest::from_options(&options)?;
//! let provider = req.open_source()?;
//! println!("{}", req.render(provider.as_ref()));
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{Local, TimeZone};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::ccdb::{
    ConnectionInfo, ConstantSetInfo, ConstantsProvider, DEFAULT_MYSQL_DATABASE,
    DEFAULT_MYSQL_HOST, DEFAULT_MYSQL_PORT, DEFAULT_MYSQL_USER, open_provider, parse_timestamp,
};
use crate::central_tracker::CentralTracker;
use crate::coordsys::CoordSys;
use crate::drift_chamber::DriftChamber;
use crate::electromagnetic_cal::ElectromagneticCal;
use crate::error::{GeometryError, Result};
use crate::forward_tof::ForwardTOF;
use crate::output::{self, VolumeMap};
use crate::preshower_cal::PreshowerCal;

pub const SERVICE_NAME: &str = "CLAS12GeometryService";
pub const SERVICE_VERSION: &str = "0.6.0";

/// Items each system can produce
const SYSTEMS: &[(&str, &[&str])] = &[
    ("bst", &["strip_endpoints"]),
    ("dc", &["wire_endpoints", "core_params", "volumes"]),
    ("ec", &["volumes"]),
    ("ftof", &["panels_parms", "volumes"]),
    ("pcal", &["volumes"]),
];

/// Options whose values are kept verbatim
const CASE_SENSITIVE: &[&str] = &["sqlite", "json", "mysql-password"];

/// Separators between items of the `request` option
const ITEM_SEPARATORS: &[char] = &[' ', ',', ';', ':', '|'];

/// Help text describing the accepted options
pub const DESCRIPTION: &str = "\
Returns the expanded geometry parameters as a JSON document.
The request is a list (separated by any of ' ,;:|') of the items
listed below.

Volumes are always in CLAS coordinates and in cm; the units and
coordsys options are ignored for */volumes items.

Options:
    units:     (m|cm|mm)        [default: cm]
    coordsys:  (clas|sector)    [default: clas]
    request:
               dc/wire_endpoints
               dc/core_params
               dc/volumes
               ftof/panels_parms
               ftof/volumes
               pcal/volumes
               ec/volumes
               bst/strip_endpoints
    run:       <int>            [default: latest]
    variation: <string>         [default: default]
    timestamp: <string>         [default: now]
    sqlite:    /path/to/file
    json:      /path/to/file
    mysql-host, mysql-user, mysql-password, mysql-database, mysql-port

sqlite, json and the mysql options are mutually exclusive.
";

/// A parsed geometry request
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRequest {
    pub units: String,
    pub coordsys: CoordSys,
    /// Requested items per system, in system order
    pub items: BTreeMap<String, Vec<String>>,
    pub source: ConnectionInfo,
    pub constant_set: ConstantSetInfo,
}

impl Default for GeometryRequest {
    fn default() -> Self {
        Self {
            units: "cm".to_string(),
            coordsys: CoordSys::Clas,
            items: BTreeMap::new(),
            source: ConnectionInfo::mysql_default(),
            constant_set: ConstantSetInfo::default(),
        }
    }
}

fn parse_items(spec: &str) -> Result<BTreeMap<String, Vec<String>>> {
    let mut items: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in spec.split(ITEM_SEPARATORS).filter(|s| !s.is_empty()) {
        match entry.split_once(['/', '.']) {
            Some((sys, item)) if !sys.is_empty() && !item.is_empty() => {
                items.entry(sys.to_string()).or_default().push(item.to_string());
            }
            _ => {
                return Err(GeometryError::request(format!(
                    "bad request item: {entry} (expected <system>/<item>)"
                )));
            }
        }
    }
    Ok(items)
}

impl GeometryRequest {
    /// Interpret a flat option map. Keys are case-insensitive.
    pub fn from_options(options: &BTreeMap<String, String>) -> Result<Self> {
        let mut req = Self::default();
        let mut sqlite: Option<PathBuf> = None;
        let mut json: Option<PathBuf> = None;
        let mut mysql = false;
        let mut user = DEFAULT_MYSQL_USER.to_string();
        let mut password = String::new();
        let mut host = DEFAULT_MYSQL_HOST.to_string();
        let mut port = DEFAULT_MYSQL_PORT;
        let mut database = DEFAULT_MYSQL_DATABASE.to_string();

        for (key, value) in options {
            let key = key.to_ascii_lowercase();
            let value = if CASE_SENSITIVE.contains(&key.as_str()) {
                value.clone()
            } else {
                value.to_lowercase()
            };

            match key.as_str() {
                "units" => req.units = value,
                "coordsys" => req.coordsys = CoordSys::from_str(&value)?,
                "request" => {
                    for (sys, items) in parse_items(&value)? {
                        req.items.entry(sys).or_default().extend(items);
                    }
                }
                "run" => {
                    let run = value.trim().parse::<i32>().map_err(|_| {
                        GeometryError::request("could not convert run number to integer.")
                    })?;
                    req.constant_set.run = Some(run);
                }
                "variation" => req.constant_set.variation = value,
                "timestamp" => {
                    let ts = parse_timestamp(value.trim());
                    if ts == 0 && !value.trim().is_empty() {
                        return Err(GeometryError::request("could not interpret timestamp."));
                    }
                    req.constant_set.timestamp = ts;
                }
                "sqlite" => sqlite = Some(PathBuf::from(value)),
                "json" => json = Some(PathBuf::from(value)),
                "mysql-user" => {
                    mysql = true;
                    user = value;
                }
                "mysql-password" => {
                    mysql = true;
                    password = value;
                }
                "mysql-host" => {
                    mysql = true;
                    host = value;
                }
                "mysql-database" => {
                    mysql = true;
                    database = value;
                }
                "mysql-port" => {
                    mysql = true;
                    port = value.trim().parse::<u16>().map_err(|_| {
                        GeometryError::request("could not convert mysql port number to integer.")
                    })?;
                }
                _ => warn!(option = %key, "ignoring unknown request option"),
            }
        }

        req.source = match (sqlite, json, mysql) {
            (Some(_), _, true) => {
                return Err(GeometryError::request(
                    "mysql and sqlite options are mutually exclusive.",
                ));
            }
            (_, Some(_), true) => {
                return Err(GeometryError::request(
                    "mysql and json options are mutually exclusive.",
                ));
            }
            (Some(_), Some(_), false) => {
                return Err(GeometryError::request(
                    "sqlite and json options are mutually exclusive.",
                ));
            }
            (Some(filepath), None, false) => ConnectionInfo::Sqlite { filepath },
            (None, Some(filepath), false) => ConnectionInfo::Json { filepath },
            (None, None, _) => ConnectionInfo::Mysql {
                user,
                password,
                host,
                port,
                database,
            },
        };

        debug!(
            units = %req.units,
            coordsys = %req.coordsys,
            constant_set = %req.constant_set,
            "parsed geometry request"
        );
        Ok(req)
    }

    /// Open the constants source this request reads from
    pub fn open_source(&self) -> Result<Box<dyn ConstantsProvider>> {
        open_provider(&self.source)
    }

    fn bad_item(&self, sys: &str, item: &str) -> GeometryError {
        GeometryError::request(format!(
            "Bad request for {} geometry: {sys}/{item}, {} coordinates, {}",
            sys.to_ascii_uppercase(),
            self.coordsys,
            self.units
        ))
    }

    /// Fail on the first system or item that can not be produced
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(GeometryError::request("request is empty."));
        }
        for (sys, items) in &self.items {
            let known = SYSTEMS
                .iter()
                .find(|(name, _)| name == sys)
                .map(|(_, items)| *items)
                .ok_or_else(|| {
                    GeometryError::request(format!(
                        "Bad request for geometry: unknown system: {sys}"
                    ))
                })?;
            if let Some(item) = items.iter().find(|i| !known.contains(&i.as_str())) {
                return Err(self.bad_item(sys, item));
            }
        }
        Ok(())
    }

    /// Build every requested output into a single document
    pub fn generate(&self, provider: &dyn ConstantsProvider) -> Result<Value> {
        self.validate()?;
        let set = &self.constant_set;
        let mut doc = output::new_document();

        for (sys, items) in &self.items {
            debug!(system = %sys, items = ?items, "generating geometry");
            match sys.as_str() {
                "dc" => {
                    let dc = DriftChamber::from_provider(provider, set)?;
                    for item in items {
                        match item.as_str() {
                            "wire_endpoints" => {
                                output::dc_wire_endpoints(&mut doc, &dc, self.coordsys, &self.units)?
                            }
                            "core_params" => output::dc_core_params(&mut doc, &dc, &self.units)?,
                            "volumes" => {
                                output::dc_volumes(&mut doc, &dc)?;
                            }
                            _ => return Err(self.bad_item(sys, item)),
                        }
                    }
                }
                "ftof" => {
                    let ftof = ForwardTOF::from_provider(provider, set)?;
                    for item in items {
                        match item.as_str() {
                            "panels_parms" => output::ftof_panels_parms(
                                &mut doc,
                                &ftof,
                                self.coordsys,
                                &self.units,
                            )?,
                            "volumes" => {
                                output::ftof_volumes(&mut doc, &ftof)?;
                            }
                            _ => return Err(self.bad_item(sys, item)),
                        }
                    }
                }
                "pcal" => {
                    let pcal = PreshowerCal::from_provider(provider, set)?;
                    for item in items {
                        match item.as_str() {
                            "volumes" => {
                                output::pcal_volumes(&mut doc, &pcal)?;
                            }
                            _ => return Err(self.bad_item(sys, item)),
                        }
                    }
                }
                "ec" => {
                    let ec = ElectromagneticCal::from_provider(provider, set)?;
                    for item in items {
                        match item.as_str() {
                            "volumes" => {
                                output::ec_volumes(&mut doc, &ec)?;
                            }
                            _ => return Err(self.bad_item(sys, item)),
                        }
                    }
                }
                "bst" => {
                    let ct = CentralTracker::from_provider(provider, set)?;
                    for item in items {
                        match item.as_str() {
                            "strip_endpoints" => output::bst_strip_endpoints(
                                &mut doc,
                                ct.barrel_svt(),
                                self.coordsys,
                                &self.units,
                            )?,
                            _ => return Err(self.bad_item(sys, item)),
                        }
                    }
                }
                other => {
                    return Err(GeometryError::request(format!(
                        "Bad request for geometry: unknown system: {other}"
                    )));
                }
            }
        }
        Ok(doc)
    }

    /// Combined gemc volume map of every `*/volumes` item
    pub fn generate_volumes(&self, provider: &dyn ConstantsProvider) -> Result<VolumeMap> {
        self.validate()?;
        let set = &self.constant_set;
        let mut vols = VolumeMap::new();

        for (sys, items) in &self.items {
            if let Some(item) = items.iter().find(|i| *i != "volumes") {
                return Err(GeometryError::request(format!(
                    "only volumes can be listed as a volume map, got {sys}/{item}"
                )));
            }
            let part = match sys.as_str() {
                "dc" => output::dc_volumes_map(&DriftChamber::from_provider(provider, set)?)?,
                "ftof" => output::ftof_volumes_map(&ForwardTOF::from_provider(provider, set)?)?,
                "pcal" => output::pcal_volumes_map(&PreshowerCal::from_provider(provider, set)?)?,
                "ec" => output::ec_volumes_map(&ElectromagneticCal::from_provider(provider, set)?)?,
                _ => return Err(self.bad_item(sys, "volumes")),
            };
            vols.extend(part);
        }
        Ok(vols)
    }

    /// Human readable summary of the request
    pub fn info(&self) -> String {
        let mut s = String::from("Request:\n");
        let _ = writeln!(s, "  coords: {}", self.coordsys);
        let _ = writeln!(s, "  units: {}", self.units);
        for (sys, items) in &self.items {
            let _ = writeln!(s, "  system: {sys}");
            for item in items {
                let _ = writeln!(s, "    {item}");
            }
        }
        let run = self
            .constant_set
            .run
            .map_or_else(|| "latest".to_string(), |r| r.to_string());
        let _ = writeln!(s, "  run: {run}");
        let _ = writeln!(s, "  variation: {}", self.constant_set.variation);
        let timestamp = match self.constant_set.timestamp {
            0 => "now".to_string(),
            ts => Local
                .timestamp_opt(ts, 0)
                .single()
                .map_or_else(|| ts.to_string(), |t| t.to_rfc3339()),
        };
        let _ = writeln!(s, "  timestamp: {timestamp}");
        s
    }

    /// Pretty JSON of the document, or `Error: ...` with the error chain
    pub fn render(&self, provider: &dyn ConstantsProvider) -> String {
        let rendered = self
            .generate(provider)
            .and_then(|doc| serde_json::to_string_pretty(&doc).map_err(GeometryError::from));
        match rendered {
            Ok(text) => text,
            Err(err) => error_text(&err),
        }
    }

    /// Key identifying the constants source, for caching providers
    pub fn source_key(&self) -> String {
        serde_json::to_string(&self.source).unwrap_or_default()
    }

    /// Key identifying the full request, for caching documents
    pub fn cache_key(&self) -> String {
        json!({
            "source": self.source,
            "constant_set": self.constant_set,
            "items": self.items,
            "units": self.units,
            "coordsys": self.coordsys,
        })
        .to_string()
    }
}

/// `Error: <message>: <source>: ...`
pub fn error_text(err: &dyn std::error::Error) -> String {
    let mut text = format!("Error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(text, ": {cause}");
        source = cause.source();
    }
    text
}

/// Whether `render` output reports a failure
pub fn is_error(rendered: &str) -> bool {
    rendered.starts_with("Error")
}
