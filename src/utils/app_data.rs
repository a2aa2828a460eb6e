use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::magfield::DEFAULT_MAGFIELD_DIR;

const APP_NAME: &str = "clas12geom";
const CONFIG_FILE: &str = "config.json";

/// Default number of documents the daemon caches
pub const DEFAULT_CACHE_SIZE: usize = 64;

/// User configuration stored in the app data directory
///
/// Every field is a fallback: options given on the command line or in a
/// daemon request always win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite snapshot used when no source option is given
    #[serde(default)]
    pub default_sqlite: Option<PathBuf>,

    #[serde(default = "default_units")]
    pub default_units: String,

    #[serde(default = "default_coordsys")]
    pub default_coordsys: String,

    #[serde(default = "default_variation")]
    pub default_variation: String,

    /// Directory holding the torus and solenoid field maps
    #[serde(default = "default_magfield_dir")]
    pub magfield_dir: PathBuf,

    /// Documents kept by the daemon
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Log filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_units() -> String {
    "cm".to_string()
}

fn default_coordsys() -> String {
    "sector".to_string()
}

fn default_variation() -> String {
    "default".to_string()
}

fn default_magfield_dir() -> PathBuf {
    PathBuf::from(DEFAULT_MAGFIELD_DIR)
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_sqlite: None,
            default_units: default_units(),
            default_coordsys: default_coordsys(),
            default_variation: default_variation(),
            magfield_dir: default_magfield_dir(),
            cache_size: default_cache_size(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            let config: AppConfig = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the app data directory
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Fill request options the caller left out
    ///
    /// The sqlite default only applies when no source option was given.
    pub fn apply_defaults(&self, options: &mut BTreeMap<String, String>) {
        options
            .entry("units".to_string())
            .or_insert_with(|| self.default_units.clone());
        options
            .entry("coordsys".to_string())
            .or_insert_with(|| self.default_coordsys.clone());
        options
            .entry("variation".to_string())
            .or_insert_with(|| self.default_variation.clone());

        let has_source = options
            .keys()
            .any(|k| k == "sqlite" || k == "json" || k.starts_with("mysql-"));
        if let Some(path) = &self.default_sqlite
            && !has_source
        {
            options.insert("sqlite".to_string(), path.display().to_string());
        }
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}
