//! # clas12-geometry - CLAS12 detector geometry
//!
//! Builds the nominal geometry of the CLAS12 detectors from constants
//! stored in the CCDB calibration database and renders it for the
//! reconstruction (wire and strip end points, panel parameters) and for
//! gemc simulation (volume maps).
//!
//! ## Architecture
//!
//! - [`geometry`] - Vectors, directions, lines, planes and rotations
//! - [`ccdb`] - Constants tables and the SQLite / JSON / in-memory sources
//! - [`coordsys`] - CLAS, sector and layer frames
//! - [`drift_chamber`], [`forward_tof`], [`preshower_cal`],
//!   [`electromagnetic_cal`], [`central_tracker`] - Detector models
//! - [`output`] - JSON items and gemc volume maps
//! - [`magfield`] - Torus and solenoid field map files
//! - [`request`] - Option parsing and document assembly
//! - [`server`] - Daemon keeping sources open and documents cached
//!
//! ## Quick Start
//!
//! ```ignore
//! use clas12_geometry::ccdb::{ConnectionInfo, ConstantSetInfo, open_provider};
//! use clas12_geometry::coordsys::CoordSys;
//! use clas12_geometry::drift_chamber::DriftChamber;
//!
//! let provider = open_provider(&ConnectionInfo::Sqlite { filepath: "clas12.sqlite".into() })?;
//! let dc = DriftChamber::from_provider(provider.as_ref(), &ConstantSetInfo::default())?;
//!
//! let layer = dc.sector(0)?.region(0)?.superlayer(0)?.senselayer(0)?;
//! let wire = layer.wire(0, CoordSys::Clas)?;
//! println!("{:?} -> {:?}", wire.begin_point(), wire.end_point());
//! ```

pub mod calorimeter;
pub mod ccdb;
pub mod central_tracker;
pub mod coordsys;
pub mod drift_chamber;
pub mod electromagnetic_cal;
pub mod error;
pub mod forward_tof;
pub mod geometry;
pub mod logging;
pub mod magfield;
pub mod output;
pub mod preshower_cal;
pub mod request;
#[cfg(all(unix, feature = "daemon"))]
pub mod server;
pub mod utils;

pub use error::{GeometryError, Result};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::ccdb::JsonProvider;

    /// Nominal constants shared by the unit tests
    pub fn nominal() -> JsonProvider {
        include_str!("../tests/fixtures/nominal.json")
            .parse::<JsonProvider>()
            .expect("nominal fixture parses")
    }
}
