use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use clas12_geometry::magfield::{self, MagFieldRequest};
use clas12_geometry::output::{VolumeMap, print_volumes};
use clas12_geometry::request::{self, GeometryRequest, error_text, is_error};
use clas12_geometry::utils::{AppConfig, get_config_path};
use clas12_geometry::logging;

#[cfg(all(unix, feature = "daemon"))]
use clas12_geometry::server::{self, ClientError, GeometryClient};

/// Every volume map the tool knows how to build
const ALL_VOLUMES: &str = "dc/volumes ftof/volumes pcal/volumes ec/volumes";

#[derive(Parser)]
#[command(name = "clas12geom", version)]
#[command(about = "CLAS12 detector geometry from nominal CCDB constants")]
#[command(after_help = request::DESCRIPTION)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    request: RequestArgs,

    /// Log filter (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log: Option<String>,
}

/// Options of a geometry request
#[derive(Args, Debug, Default)]
struct RequestArgs {
    /// Length units (m, cm, mm)
    #[arg(short, long)]
    units: Option<String>,

    /// Coordinate system (clas, sector)
    #[arg(short, long)]
    coordsys: Option<String>,

    /// Items to build, e.g. "dc/wire_endpoints ftof/panels_parms"
    #[arg(short = 'q', long)]
    request: Option<String>,

    /// Run number
    #[arg(short, long)]
    run: Option<String>,

    /// Constants variation
    #[arg(short, long)]
    variation: Option<String>,

    /// Constants valid at this time (YYYY-MM-DD HH:MM:SS)
    #[arg(short, long)]
    timestamp: Option<String>,

    /// SQLite snapshot of the constants database
    #[arg(short = 'f', long)]
    sqlite: Option<PathBuf>,

    /// JSON dump of the constants database
    #[arg(long)]
    json: Option<PathBuf>,

    #[arg(long)]
    mysql_host: Option<String>,

    #[arg(long)]
    mysql_user: Option<String>,

    #[arg(long)]
    mysql_password: Option<String>,

    #[arg(long)]
    mysql_database: Option<String>,

    #[arg(long)]
    mysql_port: Option<String>,

    /// Ask the running daemon instead of building locally
    #[arg(long)]
    via_daemon: bool,
}

impl RequestArgs {
    /// Flat option map, with config defaults for anything left out
    fn options(&self, config: &AppConfig) -> BTreeMap<String, String> {
        let mut options = BTreeMap::new();
        let mut set = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                options.insert(key.to_string(), value);
            }
        };
        set("units", self.units.clone());
        set("coordsys", self.coordsys.clone());
        set("request", self.request.clone());
        set("run", self.run.clone());
        set("variation", self.variation.clone());
        set("timestamp", self.timestamp.clone());
        set("sqlite", self.sqlite.as_ref().map(|p| p.display().to_string()));
        set("json", self.json.as_ref().map(|p| p.display().to_string()));
        set("mysql-host", self.mysql_host.clone());
        set("mysql-user", self.mysql_user.clone());
        set("mysql-password", self.mysql_password.clone());
        set("mysql-database", self.mysql_database.clone());
        set("mysql-port", self.mysql_port.clone());

        // sqlite wins over any mysql option
        if options.contains_key("sqlite") {
            options.retain(|key, _| !key.starts_with("mysql-"));
        }

        config.apply_defaults(&mut options);

        for key in ["sqlite", "json"] {
            if let Some(value) = options.get_mut(key) {
                *value = absolute_path(Path::new(value.as_str()))
                    .display()
                    .to_string();
            }
        }
        options
    }
}

/// Resolve a path against the working directory.
///
/// The daemon opens files from `/`, so relative paths are never sent.
fn absolute_path(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[derive(Subcommand)]
enum Commands {
    /// Print the gemc volume map
    Volumes {
        #[command(flatten)]
        request: RequestArgs,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Write the torus or solenoid field map to a file
    #[command(after_help = magfield::DESCRIPTION)]
    Magfield {
        /// Field map to fetch (torus, solenoid)
        #[arg(short, long)]
        request: Option<String>,

        /// Output file for the field map
        #[arg(short, long, default_value = "out.dat")]
        output: PathBuf,

        /// Directory holding the field maps (default from config)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Ask the running daemon instead of reading locally
        #[arg(long)]
        via_daemon: bool,
    },
    /// Control the geometry daemon (keeps sources open and documents cached)
    #[cfg(all(unix, feature = "daemon"))]
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
    /// Show the user configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[cfg(all(unix, feature = "daemon"))]
#[derive(Subcommand)]
enum DaemonAction {
    /// Start the daemon in background
    Start,
    /// Stop the running daemon
    Stop,
    /// Check daemon status
    Status,
    /// Run daemon in foreground (for debugging)
    Foreground,
    /// Drop every cached document and source
    Reload,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Ignoring config: {:#}", e);
        AppConfig::default()
    });

    let level = cli.log.as_deref().unwrap_or(&config.log_level);
    if let Err(e) = logging::init(level) {
        eprintln!("Failed to set up logging: {}", e);
    }

    match cli.command {
        None => run_request(&cli.request, &config),
        Some(Commands::Volumes { request, no_color }) => {
            run_volumes(&request, &config, !no_color)
        }
        Some(Commands::Magfield {
            request,
            output,
            dir,
            via_daemon,
        }) => {
            let dir = dir.unwrap_or_else(|| config.magfield_dir.clone());
            run_magfield(request.as_deref(), &dir, &output, via_daemon)
        }
        #[cfg(all(unix, feature = "daemon"))]
        Some(Commands::Daemon { action }) => {
            handle_daemon_command(action, &config)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config { action }) => {
            match action {
                ConfigAction::Show => {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                }
                ConfigAction::Path => {
                    println!("{}", get_config_path()?.display());
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Build the document locally, returning either JSON or `Error: ...`
fn render_locally(options: &BTreeMap<String, String>) -> String {
    let req = match GeometryRequest::from_options(options) {
        Ok(req) => req,
        Err(e) => return error_text(&e),
    };
    eprint!("{}", req.info());
    match req.open_source() {
        Ok(provider) => req.render(provider.as_ref()),
        Err(e) => error_text(&e),
    }
}

#[cfg(all(unix, feature = "daemon"))]
fn render_via_daemon(options: &BTreeMap<String, String>) -> Result<String> {
    let Some(mut client) = GeometryClient::connect() else {
        warn!("geometry daemon is not running, building locally");
        return Ok(render_locally(options));
    };
    match client.geometry(options) {
        Ok(resp) => {
            info!(duration_ms = resp.duration_ms, cached = resp.cached, "served by daemon");
            Ok(serde_json::to_string_pretty(&resp.document)?)
        }
        Err(ClientError::ServerError(message)) => Ok(format!("Error: {}", message)),
        Err(e) => Err(e).context("Daemon request failed"),
    }
}

fn run_request(args: &RequestArgs, config: &AppConfig) -> Result<ExitCode> {
    let options = args.options(config);

    #[cfg(all(unix, feature = "daemon"))]
    let output = if args.via_daemon {
        render_via_daemon(&options)?
    } else {
        render_locally(&options)
    };
    #[cfg(not(all(unix, feature = "daemon")))]
    let output = render_locally(&options);

    if is_error(&output) {
        eprintln!("{}\n", output);
        eprintln!("{}", Cli::command().render_help());
        return Ok(ExitCode::FAILURE);
    }
    println!("{}", output);
    Ok(ExitCode::SUCCESS)
}

fn build_volumes(options: &BTreeMap<String, String>, via_daemon: bool) -> Result<VolumeMap> {
    #[cfg(all(unix, feature = "daemon"))]
    if via_daemon {
        if let Some(mut client) = GeometryClient::connect() {
            return client.volumes(options).context("Daemon request failed");
        }
        warn!("geometry daemon is not running, building locally");
    }
    #[cfg(not(all(unix, feature = "daemon")))]
    let _ = via_daemon;

    let req = GeometryRequest::from_options(options)?;
    let provider = req.open_source()?;
    Ok(req.generate_volumes(provider.as_ref())?)
}

fn run_volumes(args: &RequestArgs, config: &AppConfig, color: bool) -> Result<ExitCode> {
    let mut options = args.options(config);
    options
        .entry("request".to_string())
        .or_insert_with(|| ALL_VOLUMES.to_string());

    match build_volumes(&options, args.via_daemon) {
        Ok(vols) => {
            print_volumes(&vols, color)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {:#}\n", e);
            eprintln!("{}", Cli::command().render_help());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn read_field_map(req: &MagFieldRequest, via_daemon: bool) -> Result<Vec<u8>> {
    #[cfg(all(unix, feature = "daemon"))]
    if via_daemon {
        if let Some(mut client) = GeometryClient::connect() {
            return match client.magfield(req.field, &req.path) {
                Ok(resp) => {
                    info!(duration_ms = resp.duration_ms, cached = resp.cached, "served by daemon");
                    Ok(resp.data)
                }
                Err(ClientError::ServerError(message)) => Err(anyhow::anyhow!(message)),
                Err(e) => Err(e).context("Daemon request failed"),
            };
        }
        warn!("geometry daemon is not running, reading locally");
    }
    #[cfg(not(all(unix, feature = "daemon")))]
    let _ = via_daemon;

    Ok(req.read()?)
}

fn run_magfield(
    request: Option<&str>,
    dir: &Path,
    output: &Path,
    via_daemon: bool,
) -> Result<ExitCode> {
    let Some(request) = request.filter(|r| !r.trim().is_empty()) else {
        let mut cmd = Cli::command();
        if let Some(sub) = cmd.find_subcommand_mut("magfield") {
            eprintln!("{}", sub.render_help());
        }
        return Ok(ExitCode::SUCCESS);
    };

    let result = MagFieldRequest::new(request, &absolute_path(dir))
        .map_err(anyhow::Error::from)
        .and_then(|req| {
            eprintln!("{}", req.info());
            read_field_map(&req, via_daemon)
        });

    match result {
        Ok(data) => {
            std::fs::write(output, &data)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            eprintln!("Wrote {} bytes to {}", data.len(), output.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {:#}\n", e);
            eprintln!("{}", magfield::DESCRIPTION);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(all(unix, feature = "daemon"))]
fn handle_daemon_command(action: DaemonAction, config: &AppConfig) -> Result<()> {
    use server::{get_pid_path, get_socket_path, is_daemon_running};

    match action {
        DaemonAction::Start => {
            if is_daemon_running() {
                println!("Daemon is already running");
                return Ok(());
            }

            println!("Starting geometry daemon...");
            server::daemon::daemonize(config.cache_size)?;

            // Wait a moment for daemon to start
            std::thread::sleep(std::time::Duration::from_millis(500));

            if is_daemon_running() {
                println!("Daemon started (socket: {})", get_socket_path().display());
            } else {
                println!(
                    "Daemon may have failed to start. Check {}",
                    get_pid_path().with_extension("error.log").display()
                );
            }
        }

        DaemonAction::Stop => {
            if !is_daemon_running() {
                println!("Daemon is not running");
                return Ok(());
            }

            println!("Stopping daemon...");

            // Try graceful shutdown via client first
            if let Some(mut client) = GeometryClient::connect() {
                let _ = client.shutdown();
                std::thread::sleep(std::time::Duration::from_millis(500));
            }

            // Force stop if still running
            if is_daemon_running() {
                server::daemon::stop_daemon()?;
            }

            println!("Daemon stopped");
        }

        DaemonAction::Status => {
            if !is_daemon_running() {
                println!("Daemon is not running");
                return Ok(());
            }

            match GeometryClient::connect() {
                Some(mut client) => match client.status() {
                    Ok(status) => {
                        println!("clas12geom daemon status:");
                        println!("  Uptime: {}s", status.uptime_secs);
                        println!("  Requests served: {}", status.requests_served);
                        println!("  Cache hit rate: {:.1}%", status.cache_hit_rate * 100.0);
                        println!("  Cached documents: {}", status.cached_documents);
                        println!("  Sources opened: {}", status.sources_opened);
                    }
                    Err(e) => {
                        println!("Failed to get status: {}", e);
                    }
                },
                None => {
                    println!("Daemon is running but not responding");
                }
            }
        }

        DaemonAction::Foreground => {
            if is_daemon_running() {
                println!(
                    "Daemon is already running in background. Stop it first with 'clas12geom daemon stop'"
                );
                return Ok(());
            }

            println!("Running daemon in foreground (Ctrl+C to stop)...");
            server::daemon::run_foreground(config.cache_size)?;
        }

        DaemonAction::Reload => {
            let mut client = GeometryClient::connect_required()?;
            let message = client.reload()?;
            println!("Reloaded: {}", message);
        }
    }

    Ok(())
}
