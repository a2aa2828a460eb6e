//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use rusqlite::{Connection, params};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Creation date of the nominal assignments
pub const NOMINAL_CREATED: &str = "2013-01-01 00:00:00";

/// A later assignment for runs 100..=200 that keeps only two DC sectors
pub const OVERRIDE_CREATED: &str = "2015-06-01 00:00:00";
pub const OVERRIDE_RUNS: (i32, i32) = (100, 200);

pub fn nominal_json() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("nominal.json")
}

fn cell(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Write the nominal constants into a CCDB-layout SQLite file
///
/// Variations: `default`, and `mc` inheriting from it with no
/// assignments of its own.
pub fn build_sqlite(dir: &Path) -> PathBuf {
    let path = dir.join("clas12.sqlite");
    let conn = Connection::open(&path).unwrap();
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

        INSERT INTO variations VALUES (1, 'default', 0), (2, 'mc', 1);
        INSERT INTO runRanges VALUES (1, 0, 2147483647);
        ",
    )
    .unwrap();
    conn.execute(
        "INSERT INTO runRanges VALUES (2, ?1, ?2)",
        params![OVERRIDE_RUNS.0, OVERRIDE_RUNS.1],
    )
    .unwrap();

    let content = std::fs::read_to_string(nominal_json()).unwrap();
    let tables: HashMap<String, Value> = serde_json::from_str(&content).unwrap();

    let mut dirs: HashMap<(i64, String), i64> = HashMap::new();
    let mut type_ids: HashMap<String, i64> = HashMap::new();
    let mut next_column = 1i64;

    for (type_id, (table_path, table)) in (1i64..).zip(tables.iter()) {
        let parts: Vec<&str> = table_path.split('/').filter(|p| !p.is_empty()).collect();
        let (name, dir_names) = parts.split_last().unwrap();

        let mut parent = 0i64;
        for d in dir_names {
            let next_id = dirs.len() as i64 + 1;
            parent = *dirs.entry((parent, d.to_string())).or_insert_with(|| {
                conn.execute(
                    "INSERT INTO directories VALUES (?1, ?2, ?3)",
                    params![next_id, d, parent],
                )
                .unwrap();
                next_id
            });
        }

        let columns: Vec<String> = table["columns"]
            .as_array()
            .unwrap()
            .iter()
            .map(cell)
            .collect();
        let types: Vec<String> = match table.get("types").and_then(Value::as_array) {
            Some(t) => t.iter().map(cell).collect(),
            None => vec!["double".to_string(); columns.len()],
        };
        let rows = table["rows"].as_array().unwrap();

        conn.execute(
            "INSERT INTO typeTables VALUES (?1, ?2, ?3, ?4, ?5)",
            params![type_id, name, parent, rows.len() as i64, columns.len() as i64],
        )
        .unwrap();
        for (order, (col, ty)) in columns.iter().zip(&types).enumerate() {
            conn.execute(
                "INSERT INTO columns VALUES (?1, ?2, ?3, ?4, ?5)",
                params![next_column, col, type_id, ty, order as i64],
            )
            .unwrap();
            next_column += 1;
        }

        let vault = rows
            .iter()
            .flat_map(|r| r.as_array().unwrap().iter().map(cell))
            .collect::<Vec<_>>()
            .join("|");
        conn.execute(
            "INSERT INTO constantSets VALUES (?1, ?2, ?3)",
            params![type_id, vault, type_id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO assignments VALUES (?1, ?2, 1, 1, ?3)",
            params![type_id, NOMINAL_CREATED, type_id],
        )
        .unwrap();
        type_ids.insert(table_path.clone(), type_id);
    }

    // run-range override: two DC sectors
    let dc_type = type_ids["/geometry/dc/dc"];
    let id = tables.len() as i64 + 1;
    conn.execute(
        "INSERT INTO constantSets VALUES (?1, '2|3', ?2)",
        params![id, dc_type],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO assignments VALUES (?1, ?2, 1, 2, ?3)",
        params![id, OVERRIDE_CREATED, id],
    )
    .unwrap();

    path
}

pub fn options(pairs: &[(&str, &str)]) -> std::collections::BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
