//! Magnetic field maps.
//!
//! The torus and solenoid field maps are binary files produced by the
//! magnet groups. Nothing here interprets them: a request names one of the
//! two fields and gets the file's bytes back.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GeometryError, Result};

pub const SERVICE_NAME: &str = "CLAS12MagFieldService";
pub const SERVICE_VERSION: &str = "0.0.1";

/// Where the field maps live on the JLab farm
pub const DEFAULT_MAGFIELD_DIR: &str = "/group/clas12/clara_services/data/magfield";

pub const DESCRIPTION: &str = "\
Returns the magnetic field map as a byte array.

Input options:
    request (only one of the following per request):
              solenoid
              torus

Output type:
    Byte array of magnetic field
";

/// One of the CLAS12 magnets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldMap {
    Torus,
    Solenoid,
}

impl FieldMap {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldMap::Torus => "torus",
            FieldMap::Solenoid => "solenoid",
        }
    }

    /// File name of the map inside the field map directory
    pub fn file_name(&self) -> &'static str {
        match self {
            FieldMap::Torus => "clas12_torus_fieldmap_binary.dat",
            FieldMap::Solenoid => "solenoid-srr.dat",
        }
    }
}

impl fmt::Display for FieldMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldMap {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "torus" => Ok(FieldMap::Torus),
            "solenoid" => Ok(FieldMap::Solenoid),
            other => Err(GeometryError::request(format!("no magnetic field: {}", other))),
        }
    }
}

/// A field map request resolved to a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagFieldRequest {
    pub field: FieldMap,
    pub path: PathBuf,
}

impl MagFieldRequest {
    /// Resolve `request` against the directory holding the maps
    pub fn new(request: &str, dir: &Path) -> Result<Self> {
        let field: FieldMap = request.parse()?;
        Ok(Self {
            field,
            path: dir.join(field.file_name()),
        })
    }

    pub fn info(&self) -> String {
        format!("Request: {}", self.field)
    }

    /// Read the whole map
    pub fn read(&self) -> Result<Vec<u8>> {
        let data = fs::read(&self.path).map_err(|source| GeometryError::FieldMap {
            path: self.path.clone(),
            source,
        })?;
        debug!(field = %self.field, bytes = data.len(), "field map read");
        Ok(data)
    }
}
