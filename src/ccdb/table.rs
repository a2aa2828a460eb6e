//! In-memory constants table with typed column access.

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};

/// Types that can be read out of a table cell
pub trait CellValue: Sized {
    fn parse_cell(cell: &str) -> Option<Self>;
}

macro_rules! cell_from_str {
    ($($t:ty),*) => {
        $(impl CellValue for $t {
            fn parse_cell(cell: &str) -> Option<Self> {
                cell.trim().parse().ok()
            }
        })*
    };
}

cell_from_str!(f64, f32, i32, i64, u32, u64, usize);

impl CellValue for bool {
    fn parse_cell(cell: &str) -> Option<Self> {
        match cell.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        }
    }
}

impl CellValue for String {
    fn parse_cell(cell: &str) -> Option<Self> {
        Some(cell.to_string())
    }
}

fn convert<T: CellValue>(cell: &str) -> Result<T> {
    T::parse_cell(cell).ok_or_else(|| GeometryError::Conversion {
        value: cell.to_string(),
    })
}

/// One constant set: rows of string cells plus column metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstantsTable {
    pub values: Vec<Vec<String>>,
    pub columns: Vec<String>,
    pub column_types: Vec<String>,
}

impl ConstantsTable {
    pub fn new(values: Vec<Vec<String>>, columns: Vec<String>, column_types: Vec<String>) -> Self {
        Self {
            values,
            columns,
            column_types,
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.columns.clear();
        self.column_types.clear();
    }

    pub fn nrows(&self) -> usize {
        self.values.len()
    }

    pub fn ncols(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }

    pub fn colname(&self, i: usize) -> Option<&str> {
        self.columns.get(i).map(String::as_str)
    }

    pub fn coltype(&self, i: usize) -> Option<&str> {
        self.column_types.get(i).map(String::as_str)
    }

    pub fn coltype_of(&self, colname: &str) -> Result<&str> {
        let i = self.find_column(colname)?;
        self.coltype(i)
            .ok_or_else(|| GeometryError::NoSuchColumn(colname.to_string()))
    }

    pub fn has_column(&self, colname: &str) -> bool {
        self.columns.iter().any(|c| c == colname)
    }

    fn find_column(&self, colname: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == colname)
            .ok_or_else(|| GeometryError::NoSuchColumn(colname.to_string()))
    }

    fn cell(&self, col: usize, row: usize) -> Result<&str> {
        self.values
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .ok_or(GeometryError::Index {
                what: "row",
                index: row as isize,
                len: self.nrows(),
            })
    }

    /// Whole column converted to `T`
    pub fn col<T: CellValue>(&self, colname: &str) -> Result<Vec<T>> {
        let c = self.find_column(colname)?;
        (0..self.nrows())
            .map(|r| convert(self.cell(c, r)?))
            .collect()
    }

    /// Single element at `row` of the named column
    pub fn elem<T: CellValue>(&self, colname: &str, row: usize) -> Result<T> {
        let c = self.find_column(colname)?;
        convert(self.cell(c, row)?)
    }

    /// Index of the first row whose `colname` cell equals `value`
    pub fn row<T: CellValue + PartialEq + ToString>(&self, colname: &str, value: &T) -> Result<usize> {
        let c = self.find_column(colname)?;
        for r in 0..self.nrows() {
            if convert::<T>(self.cell(c, r)?)? == *value {
                return Ok(r);
            }
        }
        Err(GeometryError::NoSuchValue {
            value: value.to_string(),
            column: colname.to_string(),
        })
    }
}
