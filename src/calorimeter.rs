//! View naming shared by the preshower and electromagnetic calorimeters.

use crate::error::{GeometryError, Result};

/// Strip orientations in table order
pub const VIEW_NAMES: [&str; 3] = ["u", "v", "w"];

/// Index of a view given "u", "V", "viewW", ...
pub fn view_index(name: &str) -> Result<usize> {
    let lower = name.to_ascii_lowercase();
    let short = lower
        .strip_prefix("view")
        .or_else(|| lower.strip_suffix("view"))
        .unwrap_or(&lower);
    VIEW_NAMES
        .iter()
        .position(|v| *v == short)
        .ok_or_else(|| GeometryError::request(format!("unknown calorimeter view: {name}")))
}

pub fn view_name(index: usize) -> &'static str {
    VIEW_NAMES.get(index).copied().unwrap_or("?")
}

/// CCDB table holding the per-view constants
pub(crate) fn view_table(system: &str, index: usize) -> String {
    format!("/geometry/{system}/{}view", view_name(index).to_ascii_uppercase())
}
