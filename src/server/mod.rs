//! Geometry daemon
//!
//! Building a full detector from the constants database takes a noticeable
//! fraction of a second, most of it spent in the database. The daemon keeps
//! sources open and finished documents cached so repeated requests (a
//! simulation farm asking for the same geometry) are answered from memory.
//!
//! - `clas12geom daemon start`: fork the server, listen on a Unix socket
//! - `clas12geom --via-daemon ...`: send the request options to the socket
//! - If the daemon is not running the CLI builds the geometry itself

mod client;
pub mod daemon;
pub mod protocol;

pub use client::{ClientError, GeometryClient};

use std::path::PathBuf;

const SOCKET_NAME: &str = "clas12geom.sock";
const PID_NAME: &str = "clas12geom.pid";

fn runtime_path(name: &str, suffix: &str) -> PathBuf {
    // Try XDG_RUNTIME_DIR first (most secure, tmpfs-backed)
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(name);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".local").join("run").join(name);
    }

    // Last resort: /tmp with user ID
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/tmp/clas12geom-{}.{}", uid, suffix))
}

/// Socket path of the per-user geometry daemon
pub fn get_socket_path() -> PathBuf {
    runtime_path(SOCKET_NAME, "sock")
}

/// PID file of the per-user geometry daemon
pub fn get_pid_path() -> PathBuf {
    runtime_path(PID_NAME, "pid")
}

/// Check if the daemon is running
pub fn is_daemon_running() -> bool {
    let Ok(pid_str) = std::fs::read_to_string(get_pid_path()) else {
        return false;
    };
    match pid_str.trim().parse::<i32>() {
        // kill(pid, 0) only checks that the process exists
        Ok(pid) => unsafe { libc::kill(pid, 0) == 0 },
        Err(_) => false,
    }
}
