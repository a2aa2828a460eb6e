//! Access to the CLAS12 calibration constants database (CCDB).
//!
//! - [`ConstantsTable`] - rows of string cells with typed column access
//! - [`ConnectionInfo`] / [`ConstantSetInfo`] - where to read and what to select
//! - [`ConstantsProvider`] - pluggable backends (SQLite, JSON dump, in-memory)
//! - [`parse_timestamp`] - loose "no later than" timestamp parsing

mod connection;
mod provider;
mod table;
mod timestamp;

pub use connection::{
    ConnectionInfo, ConstantSetInfo, DEFAULT_MYSQL_DATABASE, DEFAULT_MYSQL_HOST,
    DEFAULT_MYSQL_PORT, DEFAULT_MYSQL_USER, DEFAULT_SQLITE_FILE,
};
pub use provider::{ConstantsProvider, JsonProvider, MemoryProvider, SqliteProvider, open_provider};
pub use table::{CellValue, ConstantsTable};
pub use timestamp::parse_timestamp;

use tracing::debug;

use crate::error::Result;

/// Fetch one table, logging the constant set being read
pub fn fetch(
    provider: &dyn ConstantsProvider,
    set: &ConstantSetInfo,
    path: &str,
) -> Result<ConstantsTable> {
    let selection = set.with_table(path);
    debug!(constant_set = %selection, source = %provider.describe(), "fetching constants");
    let table = provider.table(path, &selection)?;
    debug!(
        table = path,
        rows = table.nrows(),
        cols = table.ncols(),
        "constants loaded"
    );
    Ok(table)
}
