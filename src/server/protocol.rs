//! Protocol messages for client-server communication
//!
//! Uses a simple length-prefixed JSON protocol:
//! - 4 bytes (little-endian u32): message length
//! - N bytes: JSON-encoded message

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::PathBuf;

use crate::magfield::FieldMap;
use crate::output::VolumeMap;

/// Largest message either side will accept
pub const MAX_MESSAGE_LEN: usize = 100 * 1024 * 1024;

/// Request from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Generate a geometry document
    Geometry {
        /// Request options, as accepted by `GeometryRequest::from_options`
        options: BTreeMap<String, String>,
    },

    /// Generate a gemc volume map
    Volumes { options: BTreeMap<String, String> },

    /// Read a field map; `path` must be absolute
    MagField { field: FieldMap, path: PathBuf },

    /// Check server health and get stats
    Status,

    /// Drop every cached source and document
    Reload,

    /// Graceful shutdown request
    Shutdown,

    /// Ping for connection testing
    Ping,
}

/// Response from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Geometry(GeometryResponse),

    Volumes(VolumesResponse),

    MagField(MagFieldResponse),

    /// Server status
    Status(StatusResponse),

    /// Caches cleared
    Reloaded { message: String },

    /// Shutdown acknowledged
    ShuttingDown,

    /// Pong response
    Pong,

    /// Error response
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryResponse {
    pub document: Value,
    /// Time taken in milliseconds
    pub duration_ms: f64,
    /// Whether the document came from cache
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumesResponse {
    pub volumes: VolumeMap,
    pub duration_ms: f64,
    pub cached: bool,
}

/// Raw field map bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagFieldResponse {
    pub field: FieldMap,
    pub data: Vec<u8>,
    pub duration_ms: f64,
    pub cached: bool,
}

/// Server status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server uptime in seconds
    pub uptime_secs: u64,
    /// Total requests served
    pub requests_served: u64,
    /// Cache hit rate (0.0 - 1.0)
    pub cache_hit_rate: f32,
    /// Documents and volume maps currently cached
    pub cached_documents: usize,
    /// Constants sources currently open
    pub sources_opened: usize,
}

/// Write a message to a stream with length prefix
pub fn write_message<W: Write>(writer: &mut W, msg: &impl Serialize) -> std::io::Result<()> {
    let json = serde_json::to_vec(msg)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    if json.len() > MAX_MESSAGE_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Message too large",
        ));
    }

    let len = json.len() as u32;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&json)?;
    writer.flush()?;

    Ok(())
}

/// Read a message from a stream with length prefix
pub fn read_message<R: Read, T: for<'de> Deserialize<'de>>(reader: &mut R) -> std::io::Result<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    // Sanity check: don't allocate more than 100MB
    if len > MAX_MESSAGE_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Message too large",
        ));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    serde_json::from_slice(&buf)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_geometry_request_over_the_wire() {
        let options = BTreeMap::from([
            ("request".to_string(), "dc/volumes".to_string()),
            ("sqlite".to_string(), "/data/ccdb.sqlite".to_string()),
        ]);
        let req = Request::Geometry {
            options: options.clone(),
        };

        let mut buf = Vec::new();
        write_message(&mut buf, &req).unwrap();
        assert_eq!(
            u32::from_le_bytes(buf[..4].try_into().unwrap()) as usize,
            buf.len() - 4
        );

        let mut cursor = Cursor::new(buf);
        match read_message(&mut cursor).unwrap() {
            Request::Geometry { options: decoded } => assert_eq!(decoded, options),
            other => panic!("Wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_geometry_response_over_the_wire() {
        let resp = Response::Geometry(GeometryResponse {
            document: json!({"geometry": {"drift_chamber": {}}}),
            duration_ms: 12.5,
            cached: true,
        });

        let mut buf = Vec::new();
        write_message(&mut buf, &resp).unwrap();

        let mut cursor = Cursor::new(buf);
        match read_message(&mut cursor).unwrap() {
            Response::Geometry(g) => {
                assert!(g.cached);
                assert!(g.document["geometry"]["drift_chamber"].is_object());
            }
            other => panic!("Wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_magfield_messages() {
        let req = Request::MagField {
            field: FieldMap::Torus,
            path: PathBuf::from("/maps/clas12_torus_fieldmap_binary.dat"),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "MagField");
        assert_eq!(json["field"], "torus");

        let resp = Response::MagField(MagFieldResponse {
            field: FieldMap::Solenoid,
            data: vec![0, 7, 255],
            duration_ms: 0.5,
            cached: false,
        });
        let mut buf = Vec::new();
        write_message(&mut buf, &resp).unwrap();
        match read_message(&mut Cursor::new(buf)).unwrap() {
            Response::MagField(m) => {
                assert_eq!(m.field, FieldMap::Solenoid);
                assert_eq!(m.data, vec![0, 7, 255]);
            }
            other => panic!("Wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut buf = ((MAX_MESSAGE_LEN + 1) as u32).to_le_bytes().to_vec();
        buf.extend_from_slice(b"{}");
        let err = read_message::<_, Request>(&mut Cursor::new(buf)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
