//! Command line behaviour of `clas12geom`.

mod common;

use common::nominal_json;
use serde_json::Value;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::Duration;

/// The binary with an isolated home so no user config or daemon leaks in
fn command(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_clas12geom"));
    cmd.env("HOME", home)
        .env("XDG_DATA_HOME", home.join("data"))
        .env("XDG_RUNTIME_DIR", home.join("run"))
        .env_remove("RUST_LOG");
    cmd
}

fn clas12geom(home: &Path, args: &[&str]) -> Output {
    command(home)
        .args(args)
        .output()
        .expect("Failed to run clas12geom")
}

/// Foreground daemon, killed on drop if a test fails before stopping it
struct Daemon(Child);

impl Daemon {
    fn start(home: &Path) -> Self {
        let child = command(home)
            .args(["daemon", "foreground"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to start daemon");
        let daemon = Daemon(child);

        let socket = home.join("run").join("clas12geom.sock");
        for _ in 0..500 {
            if socket.exists() {
                return daemon;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("daemon socket never appeared");
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn test_document_on_stdout_info_on_stderr() {
    let home = tempfile::tempdir().unwrap();
    let json = nominal_json();
    let out = clas12geom(
        home.path(),
        &["--json", json.to_str().unwrap(), "-q", "dc/wire_endpoints", "-u", "mm"],
    );
    assert!(out.status.success(), "{}", stderr(&out));

    let doc: Value = serde_json::from_str(&stdout(&out)).unwrap();
    let node = &doc["geometry"]["drift_chamber"]["wire_endpoints"];
    assert_eq!(node["length_units"], "mm");
    // the command line tool defaults to sector coordinates
    assert_eq!(node["coordinate_system"], "sector");

    let info = stderr(&out);
    assert!(info.contains("Request:"));
    assert!(info.contains("coords: sector"));
    assert!(info.contains("units: mm"));
}

#[test]
fn test_error_exits_with_usage() {
    let home = tempfile::tempdir().unwrap();
    let json = nominal_json();
    let out = clas12geom(home.path(), &["--json", json.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).is_empty());

    let err = stderr(&out);
    assert!(err.contains("Error: request is empty."));
    assert!(err.contains("Usage:"));
}

#[test]
fn test_unknown_item() {
    let home = tempfile::tempdir().unwrap();
    let json = nominal_json();
    let out = clas12geom(
        home.path(),
        &["--json", json.to_str().unwrap(), "-q", "dc/nonsense"],
    );
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Error"));
}

#[test]
fn test_volumes_listing() {
    let home = tempfile::tempdir().unwrap();
    let json = nominal_json();
    let out = clas12geom(
        home.path(),
        &["volumes", "--json", json.to_str().unwrap(), "-q", "ftof/volumes", "--no-color"],
    );
    assert!(out.status.success(), "{}", stderr(&out));

    let text = stdout(&out);
    assert!(text.contains("sec1_pan1a | mother | root"));
    assert!(text.contains("sec1_pan1a_pad1 | mother | sec1_pan1a"));
    assert!(text.contains("sec6_pan2_pad5 | type | Box"));
    assert!(text.lines().all(|l| l.is_empty() || l.split(" | ").count() == 3));
}

#[test]
fn test_config_defaults_apply() {
    let home = tempfile::tempdir().unwrap();
    let out = clas12geom(home.path(), &["config", "path"]);
    assert!(out.status.success());
    let path = stdout(&out).trim().to_string();
    assert!(path.ends_with("config.json"));

    std::fs::write(
        &path,
        r#"{"default_units": "m", "default_coordsys": "clas", "default_sqlite": null}"#,
    )
    .unwrap();

    let json = nominal_json();
    let out = clas12geom(
        home.path(),
        &["--json", json.to_str().unwrap(), "-q", "dc/wire_endpoints"],
    );
    assert!(out.status.success(), "{}", stderr(&out));
    let doc: Value = serde_json::from_str(&stdout(&out)).unwrap();
    let node = &doc["geometry"]["drift_chamber"]["wire_endpoints"];
    assert_eq!(node["length_units"], "m");
    assert_eq!(node["coordinate_system"], "clas");

    let out = clas12geom(home.path(), &["config", "show"]);
    let shown: Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(shown["default_units"], "m");
    assert_eq!(shown["cache_size"], 64);
}

#[test]
fn test_via_daemon_falls_back_to_local() {
    let home = tempfile::tempdir().unwrap();
    let json = nominal_json();
    let out = clas12geom(
        home.path(),
        &["--via-daemon", "--json", json.to_str().unwrap(), "-q", "dc/core_params"],
    );
    assert!(out.status.success(), "{}", stderr(&out));

    let doc: Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert!(doc["geometry"]["drift_chamber"]["core_params"].is_object());
    let err = stderr(&out);
    assert!(err.contains("building locally"), "{}", err);
    assert!(err.contains("Request:"));
}

#[test]
fn test_via_daemon_with_relative_source() {
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    std::fs::copy(nominal_json(), work.path().join("nominal.json")).unwrap();

    let daemon = Daemon::start(home.path());
    let ask = |args: &[&str]| {
        command(home.path())
            .current_dir(work.path())
            .args(["--log", "info", "--via-daemon", "--json", "nominal.json"])
            .args(args)
            .output()
            .expect("Failed to run clas12geom")
    };

    let local: Value = {
        let out = command(home.path())
            .current_dir(work.path())
            .args(["--json", "nominal.json", "-q", "dc/core_params"])
            .output()
            .unwrap();
        serde_json::from_str(&stdout(&out)).unwrap()
    };

    let out = ask(&["-q", "dc/core_params"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let served: Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(served, local);
    let err = stderr(&out);
    assert!(err.contains("served by daemon"), "{}", err);
    assert!(!err.contains("Request:"));

    let out = ask(&["-q", "dc/core_params"]);
    assert!(stderr(&out).contains("cached=true"), "{}", stderr(&out));

    // request errors come back from the daemon with the usual prefix
    let out = ask(&[]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("Error: request is empty."), "{}", err);
    assert!(err.contains("Usage:"));

    let out = command(home.path())
        .current_dir(work.path())
        .args(["volumes", "--via-daemon", "--json", "nominal.json", "-q", "ftof/volumes"])
        .arg("--no-color")
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains("sec1_pan1a | mother | root"));

    let out = clas12geom(home.path(), &["daemon", "status"]);
    assert!(stdout(&out).contains("Requests served: 3"), "{}", stdout(&out));

    let out = clas12geom(home.path(), &["daemon", "stop"]);
    assert!(stdout(&out).contains("Daemon stopped"));
    drop(daemon);
}

#[test]
fn test_magfield_writes_map() {
    let home = tempfile::tempdir().unwrap();
    let maps = tempfile::tempdir().unwrap();
    let bytes: Vec<u8> = (0..=255).collect();
    std::fs::write(maps.path().join("solenoid-srr.dat"), &bytes).unwrap();
    let output = maps.path().join("field.dat");

    let out = clas12geom(
        home.path(),
        &[
            "magfield",
            "-r",
            "Solenoid",
            "--dir",
            maps.path().to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ],
    );
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(std::fs::read(&output).unwrap(), bytes);
    let err = stderr(&out);
    assert!(err.contains("Request: solenoid"));
    assert!(err.contains("Wrote 256 bytes"));
}

#[test]
fn test_magfield_errors() {
    let home = tempfile::tempdir().unwrap();
    let maps = tempfile::tempdir().unwrap();
    let dir = maps.path().to_str().unwrap();

    let out = clas12geom(home.path(), &["magfield", "-r", "dipole", "--dir", dir]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Error: no magnetic field: dipole"));

    let out = clas12geom(home.path(), &["magfield", "-r", "torus", "--dir", dir]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("could not open file:"));
    assert!(stderr(&out).contains("clas12_torus_fieldmap_binary.dat"));

    // without a request only the usage is shown
    let out = clas12geom(home.path(), &["magfield"]);
    assert!(out.status.success());
    assert!(stderr(&out).contains("solenoid"));
}
