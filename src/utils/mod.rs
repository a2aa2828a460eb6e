//! Shared utilities.
//!
//! - [`app_data`] - Application data directory and user configuration

pub mod app_data;

pub use app_data::*;
