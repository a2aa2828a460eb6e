//! Unix geometry daemon
//!
//! Keeps constants sources open and built documents cached, and serves
//! geometry requests over a Unix socket.

use crate::ccdb::{ConstantsProvider, open_provider};
use crate::error::GeometryError;
use crate::magfield::{FieldMap, MagFieldRequest};
use crate::output::VolumeMap;
use crate::request::GeometryRequest;
use crate::server::protocol::{
    GeometryResponse, MagFieldResponse, Request, Response, StatusResponse, VolumesResponse,
    read_message, write_message,
};
use crate::server::{get_pid_path, get_socket_path};
use anyhow::{Context, Result};
use lru::LruCache;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::num::NonZeroUsize;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Open constants sources kept around
const SOURCE_CACHE_SIZE: usize = 8;

/// One torus and one solenoid map
const FIELD_MAP_CACHE_SIZE: usize = 2;

/// Connection timeout
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Statistics for the server
struct ServerStats {
    start_time: Instant,
    requests_served: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl ServerStats {
    fn new() -> Self {
        Self {
            start_time: Instant::now(),
            requests_served: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    fn cache_hit_rate(&self) -> f32 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f32 / total as f32
        }
    }
}

fn new_cache<K: std::hash::Hash + Eq, V>(size: usize) -> Mutex<LruCache<K, V>> {
    Mutex::new(LruCache::new(NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN)))
}

/// The geometry daemon
pub struct GeometryServer {
    socket_path: PathBuf,
    pid_path: PathBuf,
    /// Open constants sources by connection
    sources: Mutex<LruCache<String, Arc<dyn ConstantsProvider>>>,
    /// Rendered documents by normalised request
    documents: Mutex<LruCache<String, Arc<Value>>>,
    volumes: Mutex<LruCache<String, Arc<VolumeMap>>>,
    /// Field map bytes by file
    field_maps: Mutex<LruCache<String, Arc<Vec<u8>>>>,
    /// Server statistics
    stats: ServerStats,
    /// Shutdown flag
    shutdown: AtomicBool,
}

impl GeometryServer {
    /// Create a server on the per-user socket, wrapped in Arc
    pub fn new(cache_size: usize) -> Arc<Self> {
        Self::with_paths(get_socket_path(), get_pid_path(), cache_size)
    }

    pub fn with_paths(socket_path: PathBuf, pid_path: PathBuf, cache_size: usize) -> Arc<Self> {
        Arc::new(Self {
            socket_path,
            pid_path,
            sources: new_cache(SOURCE_CACHE_SIZE),
            documents: new_cache(cache_size),
            volumes: new_cache(cache_size),
            field_maps: new_cache(FIELD_MAP_CACHE_SIZE),
            stats: ServerStats::new(),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Start the server (blocking)
    pub fn run(self: &Arc<Self>) -> Result<()> {
        let socket_path = &self.socket_path;

        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Remove stale socket file
        if socket_path.exists() {
            fs::remove_file(socket_path)?;
        }

        fs::write(&self.pid_path, format!("{}", std::process::id()))
            .with_context(|| format!("Failed to write {}", self.pid_path.display()))?;

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind to {}", socket_path.display()))?;

        // Set socket permissions (user only)
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(socket_path, fs::Permissions::from_mode(0o600))?;
        }

        info!(socket = %socket_path.display(), "geometry daemon listening");

        for stream in listener.incoming() {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            match stream {
                Ok(stream) => {
                    let _ = stream.set_read_timeout(Some(CONNECTION_TIMEOUT));
                    let _ = stream.set_write_timeout(Some(CONNECTION_TIMEOUT));

                    let server = Arc::clone(self);
                    thread::spawn(move || {
                        if let Err(e) = server.handle_connection(stream) {
                            warn!(error = %e, "connection error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept error");
                }
            }
        }

        // Cleanup
        let _ = fs::remove_file(socket_path);
        let _ = fs::remove_file(&self.pid_path);
        info!("geometry daemon stopped");

        Ok(())
    }

    /// Handle a single client connection
    fn handle_connection(&self, stream: UnixStream) -> Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);

        loop {
            let request: Request = match read_message(&mut reader) {
                Ok(req) => req,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    // Client disconnected
                    break;
                }
                Err(e) => {
                    let resp = Response::Error {
                        message: format!("Invalid request: {}", e),
                    };
                    write_message(&mut writer, &resp)?;
                    continue;
                }
            };

            let response = self.handle_request(request);
            write_message(&mut writer, &response)?;

            if matches!(response, Response::ShuttingDown) {
                // Wake the accept loop so it sees the flag
                let _ = UnixStream::connect(&self.socket_path);
                break;
            }
        }

        Ok(())
    }

    fn handle_request(&self, request: Request) -> Response {
        match request {
            Request::Geometry { options } => self.handle_geometry(&options),
            Request::Volumes { options } => self.handle_volumes(&options),
            Request::MagField { field, path } => self.handle_magfield(field, path),
            Request::Status => self.handle_status(),
            Request::Reload => self.handle_reload(),
            Request::Shutdown => {
                info!("shutdown requested");
                self.shutdown.store(true, Ordering::Relaxed);
                Response::ShuttingDown
            }
            Request::Ping => Response::Pong,
        }
    }

    /// Parse request options.
    ///
    /// The daemon runs from `/`, so a relative source path would name a
    /// different file than the client meant.
    fn parse(options: &BTreeMap<String, String>) -> crate::error::Result<GeometryRequest> {
        let req = GeometryRequest::from_options(options)?;
        if let Some(path) = req.source.filepath()
            && path.is_relative()
        {
            return Err(GeometryError::request(format!(
                "source path must be absolute: {}",
                path.display()
            )));
        }
        Ok(req)
    }

    /// Open (or reuse) the constants source named by a request
    fn source(&self, req: &GeometryRequest) -> crate::error::Result<Arc<dyn ConstantsProvider>> {
        let key = req.source_key();
        if let Ok(mut sources) = self.sources.lock()
            && let Some(provider) = sources.get(&key)
        {
            return Ok(Arc::clone(provider));
        }

        let provider: Arc<dyn ConstantsProvider> = Arc::from(open_provider(&req.source)?);
        info!(source = %provider.describe(), "opened constants source");
        if let Ok(mut sources) = self.sources.lock() {
            sources.put(key, Arc::clone(&provider));
        }
        Ok(provider)
    }

    /// Look up `key`, building and caching the value on a miss
    fn cached<T>(
        &self,
        cache: &Mutex<LruCache<String, Arc<T>>>,
        key: String,
        build: impl FnOnce() -> crate::error::Result<T>,
    ) -> crate::error::Result<(Arc<T>, bool)> {
        self.stats.requests_served.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut cache) = cache.lock()
            && let Some(hit) = cache.get(&key)
        {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok((Arc::clone(hit), true));
        }
        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);

        let value = Arc::new(build()?);
        if let Ok(mut cache) = cache.lock() {
            cache.put(key, Arc::clone(&value));
        }
        Ok((value, false))
    }

    fn handle_geometry(&self, options: &BTreeMap<String, String>) -> Response {
        let start = Instant::now();
        let result = Self::parse(options).and_then(|req| {
            debug!(request = %req.cache_key(), "geometry request");
            self.cached(&self.documents, req.cache_key(), || {
                let provider = self.source(&req)?;
                req.generate(provider.as_ref())
            })
        });

        match result {
            Ok((document, cached)) => Response::Geometry(GeometryResponse {
                document: (*document).clone(),
                duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                cached,
            }),
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        }
    }

    fn handle_volumes(&self, options: &BTreeMap<String, String>) -> Response {
        let start = Instant::now();
        let result = Self::parse(options).and_then(|req| {
            self.cached(&self.volumes, req.cache_key(), || {
                let provider = self.source(&req)?;
                req.generate_volumes(provider.as_ref())
            })
        });

        match result {
            Ok((volumes, cached)) => Response::Volumes(VolumesResponse {
                volumes: (*volumes).clone(),
                duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                cached,
            }),
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        }
    }

    fn handle_magfield(&self, field: FieldMap, path: PathBuf) -> Response {
        let start = Instant::now();
        if path.is_relative() {
            return Response::Error {
                message: format!("field map path must be absolute: {}", path.display()),
            };
        }

        let req = MagFieldRequest { field, path };
        debug!(field = %req.field, path = %req.path.display(), "field map request");
        match self.cached(&self.field_maps, req.path.display().to_string(), || req.read()) {
            Ok((data, cached)) => Response::MagField(MagFieldResponse {
                field,
                data: (*data).clone(),
                duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                cached,
            }),
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        }
    }

    fn handle_status(&self) -> Response {
        let cached_documents = self.documents.lock().map(|c| c.len()).unwrap_or(0)
            + self.volumes.lock().map(|c| c.len()).unwrap_or(0)
            + self.field_maps.lock().map(|c| c.len()).unwrap_or(0);
        let sources_opened = self.sources.lock().map(|c| c.len()).unwrap_or(0);

        Response::Status(StatusResponse {
            uptime_secs: self.stats.start_time.elapsed().as_secs(),
            requests_served: self.stats.requests_served.load(Ordering::Relaxed),
            cache_hit_rate: self.stats.cache_hit_rate(),
            cached_documents,
            sources_opened,
        })
    }

    fn handle_reload(&self) -> Response {
        let mut dropped = 0;
        if let Ok(mut docs) = self.documents.lock() {
            dropped += docs.len();
            docs.clear();
        }
        if let Ok(mut vols) = self.volumes.lock() {
            dropped += vols.len();
            vols.clear();
        }
        if let Ok(mut maps) = self.field_maps.lock() {
            dropped += maps.len();
            maps.clear();
        }
        if let Ok(mut sources) = self.sources.lock() {
            sources.clear();
        }
        info!(dropped, "caches cleared");
        Response::Reloaded {
            message: format!("Dropped {} cached documents", dropped),
        }
    }
}

/// Daemonize the current process
pub fn daemonize(cache_size: usize) -> Result<()> {
    // Fork using double-fork technique for proper daemonization
    match unsafe { libc::fork() } {
        -1 => anyhow::bail!("First fork failed"),
        0 => {
            // Child process
            // Create new session
            if unsafe { libc::setsid() } == -1 {
                anyhow::bail!("setsid failed");
            }

            // Second fork to prevent acquiring a controlling terminal
            match unsafe { libc::fork() } {
                -1 => anyhow::bail!("Second fork failed"),
                0 => {
                    // Grandchild - this becomes the daemon
                    unsafe {
                        libc::close(0);
                        libc::close(1);
                        libc::close(2);

                        // Redirect to /dev/null
                        let null = libc::open(c"/dev/null".as_ptr(), libc::O_RDWR);
                        if null != -1 {
                            libc::dup2(null, 0);
                            libc::dup2(null, 1);
                            libc::dup2(null, 2);
                            if null > 2 {
                                libc::close(null);
                            }
                        }
                    }

                    // Change to root directory to avoid holding mounts
                    let _ = std::env::set_current_dir("/");

                    let server = GeometryServer::new(cache_size);
                    if let Err(e) = server.run() {
                        // Can't really report this since stderr is closed
                        let log = get_pid_path().with_extension("error.log");
                        let _ = fs::write(log, format!("{:#}", e));
                    }
                    std::process::exit(0);
                }
                _ => {
                    // First child exits immediately
                    std::process::exit(0);
                }
            }
        }
        _ => {
            // Parent process - wait for first child then exit
            unsafe {
                let mut status: libc::c_int = 0;
                libc::wait(&mut status);
            }
            Ok(())
        }
    }
}

/// Start the daemon in foreground (for debugging)
pub fn run_foreground(cache_size: usize) -> Result<()> {
    GeometryServer::new(cache_size).run()
}

/// Stop the running daemon
pub fn stop_daemon() -> Result<bool> {
    let pid_path = get_pid_path();

    if !pid_path.exists() {
        return Ok(false);
    }

    let pid_str = fs::read_to_string(&pid_path)?;
    let pid: i32 = pid_str
        .trim()
        .parse()
        .with_context(|| format!("Bad pid file {}", pid_path.display()))?;

    // Send SIGTERM
    unsafe {
        if libc::kill(pid, libc::SIGTERM) == 0 {
            // Wait a bit for graceful shutdown
            thread::sleep(Duration::from_millis(500));

            // Check if still running, send SIGKILL if needed
            if libc::kill(pid, 0) == 0 {
                thread::sleep(Duration::from_secs(1));
                if libc::kill(pid, 0) == 0 {
                    libc::kill(pid, libc::SIGKILL);
                }
            }
        }
    }

    // Clean up socket and pid files
    let _ = fs::remove_file(get_socket_path());
    let _ = fs::remove_file(&pid_path);
    info!(pid, "daemon stopped");

    Ok(true)
}
