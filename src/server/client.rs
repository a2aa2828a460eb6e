//! Client for connecting to the geometry daemon

use crate::magfield::FieldMap;
use crate::output::VolumeMap;
use crate::server::get_socket_path;
use crate::server::protocol::{
    GeometryResponse, MagFieldResponse, Request, Response, StatusResponse, read_message,
    write_message,
};
use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

/// Read/write timeout
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in client operations
#[derive(Debug)]
pub enum ClientError {
    /// Server is not running
    NotRunning,
    /// Communication error
    IoError(std::io::Error),
    /// Server returned an error
    ServerError(String),
    /// Invalid response
    InvalidResponse,
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::NotRunning => write!(f, "Geometry daemon is not running"),
            ClientError::IoError(e) => write!(f, "I/O error: {}", e),
            ClientError::ServerError(msg) => write!(f, "Server error: {}", msg),
            ClientError::InvalidResponse => write!(f, "Invalid response from server"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::IoError(e)
    }
}

/// Client for the geometry daemon
pub struct GeometryClient {
    reader: BufReader<UnixStream>,
    writer: BufWriter<UnixStream>,
}

impl GeometryClient {
    /// Try to connect to the running daemon
    /// Returns None if daemon is not running (allowing fallback to direct mode)
    pub fn connect() -> Option<Self> {
        Self::connect_to(&get_socket_path())
    }

    /// Connect to a daemon listening on `socket_path`
    pub fn connect_to(socket_path: &Path) -> Option<Self> {
        // Quick check if socket exists
        if !socket_path.exists() {
            return None;
        }

        let stream = UnixStream::connect(socket_path).ok()?;

        // Set timeouts
        let _ = stream.set_read_timeout(Some(IO_TIMEOUT));
        let _ = stream.set_write_timeout(Some(IO_TIMEOUT));

        let reader = BufReader::new(stream.try_clone().ok()?);
        let writer = BufWriter::new(stream);

        Some(Self { reader, writer })
    }

    /// Connect or return an error (for when daemon is required)
    pub fn connect_required() -> ClientResult<Self> {
        Self::connect().ok_or(ClientError::NotRunning)
    }

    fn call(&mut self, request: &Request) -> ClientResult<Response> {
        write_message(&mut self.writer, request)?;
        match read_message(&mut self.reader)? {
            Response::Error { message } => Err(ClientError::ServerError(message)),
            response => Ok(response),
        }
    }

    /// Generate a geometry document
    pub fn geometry(&mut self, options: &BTreeMap<String, String>) -> ClientResult<GeometryResponse> {
        let request = Request::Geometry {
            options: options.clone(),
        };
        match self.call(&request)? {
            Response::Geometry(g) => Ok(g),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Generate a gemc volume map
    pub fn volumes(&mut self, options: &BTreeMap<String, String>) -> ClientResult<VolumeMap> {
        let request = Request::Volumes {
            options: options.clone(),
        };
        match self.call(&request)? {
            Response::Volumes(v) => Ok(v.volumes),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Fetch a field map read by the daemon
    pub fn magfield(&mut self, field: FieldMap, path: &Path) -> ClientResult<MagFieldResponse> {
        let request = Request::MagField {
            field,
            path: path.to_path_buf(),
        };
        match self.call(&request)? {
            Response::MagField(m) => Ok(m),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Get server status
    pub fn status(&mut self) -> ClientResult<StatusResponse> {
        match self.call(&Request::Status)? {
            Response::Status(status) => Ok(status),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Clear the daemon's caches
    pub fn reload(&mut self) -> ClientResult<String> {
        match self.call(&Request::Reload)? {
            Response::Reloaded { message } => Ok(message),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Request graceful shutdown
    pub fn shutdown(&mut self) -> ClientResult<()> {
        match self.call(&Request::Shutdown)? {
            Response::ShuttingDown => Ok(()),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Ping the server
    pub fn ping(&mut self) -> ClientResult<()> {
        match self.call(&Request::Ping)? {
            Response::Pong => Ok(()),
            _ => Err(ClientError::InvalidResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_to_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GeometryClient::connect_to(&dir.path().join("none.sock")).is_none());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ClientError::NotRunning.to_string(), "Geometry daemon is not running");
        assert_eq!(
            ClientError::ServerError("request is empty.".into()).to_string(),
            "Server error: request is empty."
        );
    }
}
