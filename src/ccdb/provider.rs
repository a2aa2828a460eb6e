//! Constants backends.
//!
//! A [`ConstantsProvider`] turns a table path plus a constant set selection
//! into a [`ConstantsTable`]. The SQLite backend reads a CCDB database file
//! directly; the JSON and in-memory backends serve fixed tables and ignore
//! run, variation and timestamp.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::Deserialize;
use tracing::{debug, trace};

use super::{ConnectionInfo, ConstantSetInfo, ConstantsTable};
use crate::error::{GeometryError, Result};

/// Escape CCDB uses for `|` inside vault cells
const VAULT_DELIMITER_ESCAPE: &str = "&delimeter;";

/// Source of constants tables
pub trait ConstantsProvider: Send + Sync {
    /// Fetch `path` (e.g. `/geometry/dc/region`) for the given selection
    fn table(&self, path: &str, set: &ConstantSetInfo) -> Result<ConstantsTable>;

    /// Short human readable description
    fn describe(&self) -> String;
}

/// Open the backend named by a connection
pub fn open_provider(conn: &ConnectionInfo) -> Result<Box<dyn ConstantsProvider>> {
    let connstr = conn.connection_string()?;
    debug!(connection = %connstr, "opening constants source");
    match conn {
        ConnectionInfo::Sqlite { filepath } => Ok(Box::new(SqliteProvider::open(filepath)?)),
        ConnectionInfo::Json { filepath } => Ok(Box::new(JsonProvider::from_path(filepath)?)),
        ConnectionInfo::Mysql { .. } => Err(GeometryError::Backend(format!(
            "MySQL backend is not available ({}); export the database to SQLite and use --sqlite",
            connstr
        ))),
    }
}

/// Reads a CCDB SQLite file
pub struct SqliteProvider {
    conn: Mutex<Connection>,
    label: String,
}

impl SqliteProvider {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self::from_connection(conn, path.display().to_string()))
    }

    /// Wrap an already open connection
    pub fn from_connection(conn: Connection, label: impl Into<String>) -> Self {
        Self {
            conn: Mutex::new(conn),
            label: label.into(),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| GeometryError::Ccdb("constants connection poisoned".to_string()))
    }
}

/// Type table row: id and shape
struct TypeTable {
    id: i64,
    nrows: usize,
    ncols: usize,
}

fn find_directory(conn: &Connection, dirs: &[&str]) -> Result<i64> {
    let mut parent = 0i64;
    for name in dirs {
        parent = conn
            .query_row(
                "SELECT id FROM directories WHERE name = ?1 AND parentId = ?2",
                params![name, parent],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| GeometryError::Ccdb(format!("no such directory: {}", name)))?;
    }
    Ok(parent)
}

fn find_type_table(conn: &Connection, path: &str) -> Result<TypeTable> {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    let Some((name, dirs)) = parts.split_last() else {
        return Err(GeometryError::Ccdb(format!("bad table path: '{}'", path)));
    };
    let dir_id = find_directory(conn, dirs)?;
    conn.query_row(
        "SELECT id, nRows, nColumns FROM typeTables WHERE name = ?1 AND directoryId = ?2",
        params![name, dir_id],
        |row| {
            Ok(TypeTable {
                id: row.get(0)?,
                nrows: row.get::<_, i64>(1)? as usize,
                ncols: row.get::<_, i64>(2)? as usize,
            })
        },
    )
    .optional()?
    .ok_or_else(|| GeometryError::Ccdb(format!("no such table: {}", path)))
}

fn read_columns(conn: &Connection, type_id: i64) -> Result<(Vec<String>, Vec<String>)> {
    let mut stmt = conn.prepare(
        "SELECT name, columnType FROM columns WHERE typeId = ?1 ORDER BY \"order\"",
    )?;
    let rows = stmt.query_map(params![type_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut names = Vec::new();
    let mut types = Vec::new();
    for r in rows {
        let (n, t) = r?;
        names.push(n);
        types.push(t);
    }
    Ok((names, types))
}

/// Newest matching assignment. Without a run the range reaching furthest
/// (the latest run) wins before creation time.
fn find_vault(
    conn: &Connection,
    type_id: i64,
    variation_id: i64,
    run: Option<i32>,
    timestamp: i64,
) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT cs.vault FROM assignments a \
             JOIN runRanges rr ON a.runRangeId = rr.id \
             JOIN constantSets cs ON a.constantSetId = cs.id \
             WHERE cs.constantTypeId = ?1 AND a.variationId = ?2 \
               AND (?3 IS NULL OR (rr.runMin <= ?3 AND rr.runMax >= ?3)) \
               AND (?4 = 0 OR CAST(strftime('%s', a.created) AS INTEGER) <= ?4) \
             ORDER BY CASE WHEN ?3 IS NULL THEN rr.runMax ELSE 0 END DESC, \
                      a.created DESC, a.id DESC LIMIT 1",
            params![type_id, variation_id, run, timestamp],
            |row| row.get(0),
        )
        .optional()?)
}

/// Split a vault blob into `nrows` rows of `ncols` cells
fn decode_vault(vault: &str, nrows: usize, ncols: usize) -> Result<Vec<Vec<String>>> {
    let cells: Vec<String> = vault
        .split('|')
        .map(|c| c.replace(VAULT_DELIMITER_ESCAPE, "|"))
        .collect();
    if cells.len() != nrows * ncols {
        return Err(GeometryError::Ccdb(format!(
            "vault holds {} cells, expected {} x {}",
            cells.len(),
            nrows,
            ncols
        )));
    }
    if ncols == 0 {
        return Ok(Vec::new());
    }
    Ok(cells.chunks(ncols).map(<[String]>::to_vec).collect())
}

impl ConstantsProvider for SqliteProvider {
    fn table(&self, path: &str, set: &ConstantSetInfo) -> Result<ConstantsTable> {
        let conn = self.lock()?;
        let tt = find_type_table(&conn, path)?;
        let (columns, column_types) = read_columns(&conn, tt.id)?;

        let mut variation = set.variation.clone();
        loop {
            let found: Option<(i64, i64)> = conn
                .query_row(
                    "SELECT id, parentId FROM variations WHERE name = ?1",
                    params![variation],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((variation_id, parent_id)) = found else {
                return Err(GeometryError::Ccdb(format!(
                    "no such variation: {}",
                    variation
                )));
            };

            if let Some(vault) = find_vault(&conn, tt.id, variation_id, set.run, set.timestamp)? {
                trace!(table = path, variation = %variation, "assignment found");
                let values = decode_vault(&vault, tt.nrows, tt.ncols)?;
                return Ok(ConstantsTable::new(values, columns, column_types));
            }

            if parent_id == 0 || variation_id == parent_id {
                break;
            }
            variation = conn.query_row(
                "SELECT name FROM variations WHERE id = ?1",
                params![parent_id],
                |row| row.get(0),
            )?;
            debug!(table = path, fallback = %variation, "no assignment, trying parent variation");
        }

        Err(GeometryError::Ccdb(format!(
            "no assignment for {}",
            set.with_table(path)
        )))
    }

    fn describe(&self) -> String {
        format!("sqlite:///{}", self.label)
    }
}

#[derive(Deserialize)]
struct JsonTable {
    columns: Vec<String>,
    #[serde(default)]
    types: Vec<String>,
    rows: Vec<Vec<serde_json::Value>>,
}

fn json_cell(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Serves tables from a JSON dump keyed by table path
pub struct JsonProvider {
    inner: MemoryProvider,
}

impl JsonProvider {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut provider: Self = content.parse()?;
        provider.inner.label = format!("json:///{}", path.display());
        Ok(provider)
    }
}

impl FromStr for JsonProvider {
    type Err = GeometryError;

    fn from_str(content: &str) -> Result<Self> {
        let raw: HashMap<String, JsonTable> = serde_json::from_str(content)?;
        let mut inner = MemoryProvider::new();
        for (path, t) in raw {
            let values = t
                .rows
                .iter()
                .map(|row| row.iter().map(json_cell).collect())
                .collect();
            let types = if t.types.is_empty() {
                vec!["double".to_string(); t.columns.len()]
            } else {
                t.types
            };
            inner.insert(&path, ConstantsTable::new(values, t.columns, types));
        }
        inner.label = "json".to_string();
        Ok(Self { inner })
    }
}

impl ConstantsProvider for JsonProvider {
    fn table(&self, path: &str, set: &ConstantSetInfo) -> Result<ConstantsTable> {
        self.inner.table(path, set)
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

/// Tables held in memory, mostly for tests and embedding
#[derive(Default)]
pub struct MemoryProvider {
    tables: HashMap<String, ConstantsTable>,
    label: String,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            label: "memory".to_string(),
        }
    }

    pub fn insert(&mut self, path: &str, table: ConstantsTable) {
        self.tables.insert(path.to_string(), table);
    }

    /// Convenience for building a table from column names and numeric rows
    pub fn insert_rows(&mut self, path: &str, columns: &[&str], rows: &[&[f64]]) {
        let values = rows
            .iter()
            .map(|r| r.iter().map(|v| v.to_string()).collect())
            .collect();
        let columns = columns.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        let types = vec!["double".to_string(); columns.len()];
        self.insert(path, ConstantsTable::new(values, columns, types));
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl ConstantsProvider for MemoryProvider {
    fn table(&self, path: &str, _set: &ConstantSetInfo) -> Result<ConstantsTable> {
        self.tables
            .get(path)
            .cloned()
            .ok_or_else(|| GeometryError::Ccdb(format!("no such table: {}", path)))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "
        CREATE TABLE directories (id INTEGER PRIMARY KEY, name TEXT, parentId INTEGER);
        CREATE TABLE typeTables (id INTEGER PRIMARY KEY, name TEXT, directoryId INTEGER,
                                 nRows INTEGER, nColumns INTEGER);
        CREATE TABLE columns (id INTEGER PRIMARY KEY, name TEXT, typeId INTEGER,
                              columnType TEXT, \"order\" INTEGER);
        CREATE TABLE variations (id INTEGER PRIMARY KEY, name TEXT, parentId INTEGER);
        CREATE TABLE runRanges (id INTEGER PRIMARY KEY, runMin INTEGER, runMax INTEGER);
        CREATE TABLE constantSets (id INTEGER PRIMARY KEY, vault TEXT, constantTypeId INTEGER);
        CREATE TABLE assignments (id INTEGER PRIMARY KEY, created TEXT, variationId INTEGER,
                                  runRangeId INTEGER, constantSetId INTEGER);

        INSERT INTO directories VALUES (1, 'geometry', 0), (2, 'dc', 1);
        INSERT INTO typeTables VALUES (1, 'dc', 2, 1, 2);
        INSERT INTO columns VALUES (1, 'nsectors', 1, 'int', 0), (2, 'nregions', 1, 'int', 1);
        INSERT INTO variations VALUES (1, 'default', 0), (2, 'mc', 1), (3, 'calib', 1);
        INSERT INTO runRanges VALUES (1, 0, 2147483647), (2, 100, 200);
        INSERT INTO constantSets VALUES (1, '6|3', 1), (2, '6|4', 1), (3, '5|3', 1);
        INSERT INTO assignments VALUES
            (1, '2013-01-01 00:00:00', 1, 1, 1),
            (2, '2014-01-01 00:00:00', 1, 1, 2),
            (3, '2013-06-01 00:00:00', 3, 2, 3);
    ";

    fn provider() -> SqliteProvider {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        SqliteProvider::from_connection(conn, "memory")
    }

    fn set() -> ConstantSetInfo {
        ConstantSetInfo::default()
    }

    #[test]
    fn test_latest_assignment_wins() {
        let t = provider().table("/geometry/dc/dc", &set()).unwrap();
        assert_eq!(t.columns, vec!["nsectors", "nregions"]);
        assert_eq!(t.elem::<i32>("nregions", 0).unwrap(), 4);
    }

    #[test]
    fn test_timestamp_selects_older_assignment() {
        // 2013-07-01 UTC
        let s = ConstantSetInfo {
            timestamp: 1_372_636_800,
            ..set()
        };
        let t = provider().table("/geometry/dc/dc", &s).unwrap();
        assert_eq!(t.elem::<i32>("nregions", 0).unwrap(), 3);
    }

    #[test]
    fn test_variation_falls_back_to_parent() {
        let s = ConstantSetInfo {
            variation: "mc".into(),
            ..set()
        };
        let t = provider().table("/geometry/dc/dc", &s).unwrap();
        assert_eq!(t.elem::<i32>("nregions", 0).unwrap(), 4);
    }

    #[test]
    fn test_variation_respects_run_range() {
        let in_range = ConstantSetInfo {
            variation: "calib".into(),
            run: Some(150),
            ..set()
        };
        let t = provider().table("/geometry/dc/dc", &in_range).unwrap();
        assert_eq!(t.elem::<i32>("nsectors", 0).unwrap(), 5);

        let out_of_range = ConstantSetInfo {
            run: Some(500),
            ..in_range
        };
        let t = provider().table("/geometry/dc/dc", &out_of_range).unwrap();
        assert_eq!(t.elem::<i32>("nsectors", 0).unwrap(), 6);
    }

    #[test]
    fn test_missing_table_and_variation() {
        assert!(provider().table("/geometry/dc/nope", &set()).is_err());
        assert!(provider().table("/geometry/ec/ec", &set()).is_err());
        let s = ConstantSetInfo {
            variation: "unknown".into(),
            ..set()
        };
        assert!(provider().table("/geometry/dc/dc", &s).is_err());
    }

    #[test]
    fn test_unset_run_uses_latest_bounded_range() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE directories (id INTEGER PRIMARY KEY, name TEXT, parentId INTEGER);
            CREATE TABLE typeTables (id INTEGER PRIMARY KEY, name TEXT, directoryId INTEGER,
                                     nRows INTEGER, nColumns INTEGER);
            CREATE TABLE columns (id INTEGER PRIMARY KEY, name TEXT, typeId INTEGER,
                                  columnType TEXT, \"order\" INTEGER);
            CREATE TABLE variations (id INTEGER PRIMARY KEY, name TEXT, parentId INTEGER);
            CREATE TABLE runRanges (id INTEGER PRIMARY KEY, runMin INTEGER, runMax INTEGER);
            CREATE TABLE constantSets (id INTEGER PRIMARY KEY, vault TEXT, constantTypeId INTEGER);
            CREATE TABLE assignments (id INTEGER PRIMARY KEY, created TEXT, variationId INTEGER,
                                      runRangeId INTEGER, constantSetId INTEGER);

            INSERT INTO directories VALUES (1, 'geometry', 0), (2, 'dc', 1);
            INSERT INTO typeTables VALUES (1, 'dc', 2, 1, 2);
            INSERT INTO columns VALUES (1, 'nsectors', 1, 'int', 0), (2, 'nregions', 1, 'int', 1);
            INSERT INTO variations VALUES (1, 'default', 0);
            INSERT INTO runRanges VALUES (1, 0, 100), (2, 101, 5000);
            INSERT INTO constantSets VALUES (1, '6|3', 1), (2, '6|4', 1), (3, '5|4', 1);
            -- the early range was assigned after the first late one
            INSERT INTO assignments VALUES
                (1, '2013-01-01 00:00:00', 1, 2, 2),
                (2, '2014-01-01 00:00:00', 1, 1, 1),
                (3, '2015-01-01 00:00:00', 1, 2, 3);
            ",
        )
        .unwrap();
        let p = SqliteProvider::from_connection(conn, "memory");

        let t = p.table("/geometry/dc/dc", &set()).unwrap();
        assert_eq!(t.elem::<i32>("nsectors", 0).unwrap(), 5);
        assert_eq!(t.elem::<i32>("nregions", 0).unwrap(), 4);

        // 2014-06-01 UTC: the early range is newer but the late one still wins
        let mid = ConstantSetInfo {
            timestamp: 1_401_580_800,
            ..set()
        };
        let t = p.table("/geometry/dc/dc", &mid).unwrap();
        assert_eq!(t.elem::<i32>("nsectors", 0).unwrap(), 6);
        assert_eq!(t.elem::<i32>("nregions", 0).unwrap(), 4);

        let early = ConstantSetInfo {
            run: Some(50),
            ..set()
        };
        let t = p.table("/geometry/dc/dc", &early).unwrap();
        assert_eq!(t.elem::<i32>("nregions", 0).unwrap(), 3);

        // before anything was assigned
        let old = ConstantSetInfo {
            timestamp: 1_300_000_000,
            ..set()
        };
        assert!(p.table("/geometry/dc/dc", &old).is_err());
    }

    #[test]
    fn test_decode_vault() {
        let rows = decode_vault("a|b&delimeter;c|d|e", 2, 2).unwrap();
        assert_eq!(rows[0], vec!["a", "b|c"]);
        assert_eq!(rows[1], vec!["d", "e"]);
        assert!(decode_vault("a|b|c", 2, 2).is_err());
    }

    #[test]
    fn test_json_provider() {
        let p: JsonProvider =
            r#"{"/geometry/ftof/ftof": {"columns": ["nsectors", "npanels"], "rows": [[6, "3"]]}}"#
                .parse()
                .unwrap();
        let t = p.table("/geometry/ftof/ftof", &set()).unwrap();
        assert_eq!(t.elem::<usize>("nsectors", 0).unwrap(), 6);
        assert_eq!(t.elem::<usize>("npanels", 0).unwrap(), 3);
        assert_eq!(t.coltype(0), Some("double"));
        assert!(p.table("/geometry/dc/dc", &set()).is_err());
    }

    #[test]
    fn test_mysql_is_reported_unavailable() {
        let err = open_provider(&ConnectionInfo::mysql_default())
            .err()
            .unwrap()
            .to_string();
        assert!(err.contains("mysql://clas12reader@clasdb.jlab.org:3306/clas12"));
    }
}
