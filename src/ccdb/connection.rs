//! Where constants come from and which constant set to select.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};

pub const DEFAULT_MYSQL_USER: &str = "clas12reader";
pub const DEFAULT_MYSQL_HOST: &str = "clasdb.jlab.org";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_MYSQL_DATABASE: &str = "clas12";
pub const DEFAULT_SQLITE_FILE: &str = "clas12_ccdb.sqlite";

/// Location of a constants database
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConnectionInfo {
    Mysql {
        user: String,
        password: String,
        host: String,
        port: u16,
        database: String,
    },
    Sqlite {
        filepath: PathBuf,
    },
    /// Table dump in JSON, one entry per table path
    Json {
        filepath: PathBuf,
    },
}

impl ConnectionInfo {
    pub fn mysql_default() -> Self {
        ConnectionInfo::Mysql {
            user: DEFAULT_MYSQL_USER.to_string(),
            password: String::new(),
            host: DEFAULT_MYSQL_HOST.to_string(),
            port: DEFAULT_MYSQL_PORT,
            database: DEFAULT_MYSQL_DATABASE.to_string(),
        }
    }

    pub fn sqlite_default() -> Self {
        ConnectionInfo::Sqlite {
            filepath: PathBuf::from(DEFAULT_SQLITE_FILE),
        }
    }

    /// File backing a SQLite or JSON source
    pub fn filepath(&self) -> Option<&Path> {
        match self {
            ConnectionInfo::Sqlite { filepath } | ConnectionInfo::Json { filepath } => {
                Some(filepath)
            }
            ConnectionInfo::Mysql { .. } => None,
        }
    }

    /// Connection string in CCDB's URL form.
    ///
    /// File based sources are checked for existence first.
    pub fn connection_string(&self) -> Result<String> {
        match self {
            ConnectionInfo::Mysql {
                user,
                password,
                host,
                port,
                database,
            } => {
                let mut s = format!("mysql://{}", user);
                if !password.is_empty() {
                    s.push(':');
                    s.push_str(password);
                }
                s.push_str(&format!("@{}:{}/{}", host, port, database));
                Ok(s)
            }
            ConnectionInfo::Sqlite { filepath } => {
                check_regular_file(filepath)?;
                Ok(format!("sqlite:///{}", filepath.display()))
            }
            ConnectionInfo::Json { filepath } => {
                check_regular_file(filepath)?;
                Ok(format!("json:///{}", filepath.display()))
            }
        }
    }
}

fn check_regular_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(GeometryError::Ccdb(format!(
            "ERROR: file '{}' could not be found.",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(GeometryError::Ccdb(format!(
            "ERROR: file '{}' is not a regular file.",
            path.display()
        )));
    }
    Ok(())
}

/// Selects one assignment of a table: run, variation and a
/// "no later than" timestamp
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstantSetInfo {
    pub table_path: String,
    /// `None` selects the latest run
    pub run: Option<i32>,
    pub variation: String,
    /// Seconds since the epoch, 0 for "now"
    pub timestamp: i64,
}

impl Default for ConstantSetInfo {
    fn default() -> Self {
        Self {
            table_path: String::new(),
            run: None,
            variation: "default".to_string(),
            timestamp: 0,
        }
    }
}

impl ConstantSetInfo {
    /// Same selection, different table
    pub fn with_table(&self, table_path: &str) -> Self {
        Self {
            table_path: table_path.to_string(),
            ..self.clone()
        }
    }

    /// `path[:run][:variation][:timestamp]`, keeping empty slots when a
    /// later field is present
    pub fn constant_set_string(&self) -> String {
        let has_variation = self.variation != "default";
        let has_timestamp = self.timestamp != 0;

        let mut s = self.table_path.clone();
        match self.run {
            Some(run) => s.push_str(&format!(":{}", run)),
            None if has_variation || has_timestamp => s.push(':'),
            None => {}
        }
        if has_variation {
            s.push(':');
            s.push_str(&self.variation);
        } else if has_timestamp {
            s.push(':');
        }
        if has_timestamp {
            s.push_str(&format!(":{}", self.timestamp));
        }
        s
    }
}

impl fmt::Display for ConstantSetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.constant_set_string())
    }
}
