//! Error type shared by the geometry library.

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, GeometryError>;

/// Errors raised while fetching constants, building detectors or
/// rendering outputs
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Generic constants database failure
    #[error("{0}")]
    Ccdb(String),

    /// A table cell could not be parsed into the requested type
    #[error("Could not convert: '{value}' to a numeric type.")]
    Conversion { value: String },

    #[error("No such column: {0}")]
    NoSuchColumn(String),

    #[error("No such value: {value} in column {column}")]
    NoSuchValue { value: String, column: String },

    /// Index out of range after negative-index normalisation
    #[error("{what} index {index} out of range (size {len})")]
    Index {
        what: &'static str,
        index: isize,
        len: usize,
    },

    #[error("unknown coordinate system: {0}")]
    CoordSys(String),

    #[error("{what} not defined in {coordsys} coordinates")]
    UnsupportedCoordSys { what: &'static str, coordsys: String },

    #[error("can not convert to units: {0}")]
    Units(String),

    /// Degenerate geometry (parallel lines, zero vectors)
    #[error("{0}")]
    Math(String),

    #[error("{0}")]
    Request(String),

    #[error("{0}")]
    Backend(String),

    /// A field map file could not be read
    #[error("could not open file: {}", path.display())]
    FieldMap {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GeometryError {
    pub(crate) fn math(msg: impl Into<String>) -> Self {
        GeometryError::Math(msg.into())
    }

    pub(crate) fn request(msg: impl Into<String>) -> Self {
        GeometryError::Request(msg.into())
    }
}

/// Resolve a possibly negative index against a collection length.
///
/// Negative values count from the end, so `-1` is the last element.
pub fn normalize_index(what: &'static str, index: isize, len: usize) -> Result<usize> {
    let resolved = if index < 0 {
        len as isize + index
    } else {
        index
    };
    if resolved < 0 || resolved as usize >= len {
        return Err(GeometryError::Index { what, index, len });
    }
    Ok(resolved as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_index() {
        assert_eq!(normalize_index("wire", 0, 3).unwrap(), 0);
        assert_eq!(normalize_index("wire", -1, 3).unwrap(), 2);
        assert_eq!(normalize_index("wire", -3, 3).unwrap(), 0);
        assert!(normalize_index("wire", 3, 3).is_err());
        assert!(normalize_index("wire", -4, 3).is_err());
        assert!(normalize_index("wire", 0, 0).is_err());
    }

    #[test]
    fn test_error_messages() {
        let e = GeometryError::Conversion {
            value: "abc".to_string(),
        };
        assert_eq!(e.to_string(), "Could not convert: 'abc' to a numeric type.");

        let e = GeometryError::NoSuchValue {
            value: "7".to_string(),
            column: "nstrips".to_string(),
        };
        assert_eq!(e.to_string(), "No such value: 7 in column nstrips");

        let e = GeometryError::Units("ft".to_string());
        assert_eq!(e.to_string(), "can not convert to units: ft");
    }
}
