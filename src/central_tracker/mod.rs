//! Central tracker. Only the barrel SVT carries geometry.

mod barrel_svt;

pub use barrel_svt::{BarrelSVT, Layer, Region, Sector, SensorParams};

use tracing::debug;

use crate::ccdb::{self, ConstantSetInfo, ConstantsProvider};
use crate::error::Result;
use crate::geometry::{DEG2RAD, MM2CM};

use barrel_svt::RegionParams;

#[derive(Debug, Clone, Default)]
pub struct CentralTracker {
    barrel_svt: BarrelSVT,
}

impl CentralTracker {
    pub fn from_provider(provider: &dyn ConstantsProvider, set: &ConstantSetInfo) -> Result<Self> {
        let t_bst = ccdb::fetch(provider, set, "/geometry/bst/bst")?;
        let t_region = ccdb::fetch(provider, set, "/geometry/bst/region")?;
        let t_sector = ccdb::fetch(provider, set, "/geometry/bst/sector")?;

        let nregions: usize = t_bst.elem("nregions", 0)?;
        let mm = |col: &str| -> Result<f64> { Ok(t_sector.elem::<f64>(col, 0)? * MM2CM) };

        let sensor = SensorParams {
            readout_pitch: t_bst.elem::<f64>("readoutPitch", 0)? * MM2CM,
            silicon_width: t_bst.elem::<f64>("siliconWidth", 0)? * MM2CM,
            phys_sen_len: mm("physSenLen")?,
            phys_sen_wid: mm("physSenWid")?,
            active_sen_len: mm("activeSenLen")?,
            active_sen_wid: mm("activeSenWid")?,
            dead_zn_sen_len: [mm("deadZnSenLen1")?, mm("deadZnSenLen2")?, mm("deadZnSenLen3")?],
            dead_zn_sen_wid: mm("deadZnSenWid")?,
            start_angle: t_sector.elem("startAngle", 0)?,
            end_angle: t_sector.elem("endAngle", 0)?,
        };
        let nstrips: usize = t_sector.elem("nstrips", 0)?;

        let regions = (0..nregions)
            .map(|reg| -> Result<RegionParams> {
                Ok(RegionParams {
                    status: t_region.elem("status", reg)?,
                    nsectors: t_region.elem("nsectors", reg)?,
                    nlayers: t_region.elem("nlayers", reg)?,
                    radius: t_region.elem::<f64>("radius", reg)? * MM2CM,
                    zstart: t_region.elem::<f64>("zstart", reg)? * MM2CM,
                    phi: t_region.elem::<f64>("theta", reg)? * DEG2RAD,
                    layergap: t_region.elem::<f64>("layergap", reg)? * MM2CM,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let active = regions.iter().filter(|r| r.status).count();
        debug!(nregions, active, nstrips, "building barrel SVT");

        Ok(Self {
            barrel_svt: BarrelSVT::build(&regions, sensor, nstrips, mm("fillerthick")?),
        })
    }

    pub fn barrel_svt(&self) -> &BarrelSVT {
        &self.barrel_svt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccdb::{ConstantsTable, MemoryProvider};
    use crate::geometry::Vector3;
    use crate::test_support::nominal;
    use std::f64::consts::PI;

    fn bst() -> BarrelSVT {
        CentralTracker::from_provider(&nominal(), &ConstantSetInfo::default())
            .unwrap()
            .barrel_svt()
            .clone()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_structure() {
        let bst = bst();
        assert_eq!(bst.regions().len(), 4);
        let region = bst.region(0).unwrap();
        assert_eq!(region.sectors().len(), 10);
        assert!(close(region.radius(), 6.5285));
        let layer = region.sector(0).unwrap().layer(1).unwrap();
        assert_eq!(layer.nstrips(), 256);
        assert!(close(layer.radius(), 6.5285 + 0.016));
        assert_eq!(bst.region(-1).unwrap().sectors().len(), 24);
    }

    #[test]
    fn test_sector_phi_and_plane() {
        let bst = bst();
        let region = bst.region(1).unwrap();
        let sector = region.sector(3).unwrap();
        assert!(close(sector.phi(), 2.0 * PI / 14.0 * 3.0 + region.phi()));
        let plane = sector.detector_plane();
        assert!(close(plane.point.rho(), region.radius()));
        assert!(close(plane.normal.phi(), sector.phi()));
    }

    #[test]
    fn test_strip_points_in_sensor_frame() {
        let bst = bst();
        let sector = bst.region(0).unwrap().sector(0).unwrap();
        let bottom = sector.layer(0).unwrap();
        let top = sector.layer(1).unwrap();
        let s = top.sensor();

        // strip 0 runs straight down the sensor
        assert_eq!(top.strip_first_point(0).unwrap(), Vector3::ZERO);
        let p = top.strip_second_point(0).unwrap();
        assert!(close(p.x, 0.0));
        assert!(close(p.z, s.center_length()));
        let p = bottom.strip_first_point(0).unwrap();
        assert!(close(p.x, s.active_sen_wid));

        // the last top strip is clipped by the sensor edge
        let p = top.strip_second_point(-1).unwrap();
        assert!(close(p.x, s.active_sen_wid));
        assert!(p.z < s.center_length());
        let p = bottom.strip_second_point(-1).unwrap();
        assert!(close(p.x, 0.0));
    }

    #[test]
    fn test_strip_in_lab_frame() {
        let bst = bst();
        let sector = bst.region(0).unwrap().sector(2).unwrap();
        let top = sector.layer(1).unwrap();
        let strip = top.strip(100).unwrap();
        // both ends sit on the sensor plane
        let normal = Vector3::new(sector.phi().cos(), sector.phi().sin(), 0.0);
        assert!(close(strip.begin_point().dot(&normal), top.radius()));
        assert!(close(strip.end_point().dot(&normal), top.radius()));
        let s = top.sensor();
        let z0 = bst.region(0).unwrap().zstart() + 0.5 * s.dead_zn_sen_len[1];
        assert!(close(strip.begin_point().z, z0));
        assert_eq!(top.strips_lab().unwrap().len(), 256);
    }

    #[test]
    fn test_disabled_regions_are_skipped() {
        let source = nominal();
        let set = ConstantSetInfo::default();
        let mut provider = MemoryProvider::new();
        for path in ["/geometry/bst/bst", "/geometry/bst/sector"] {
            provider.insert(path, source_table(&source, &set, path));
        }
        let mut region = source_table(&source, &set, "/geometry/bst/region");
        region.values[1][1] = "0".into();
        provider.insert("/geometry/bst/region", region);

        let bst = CentralTracker::from_provider(&provider, &set).unwrap();
        let regions = bst.barrel_svt().regions();
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[1].sectors().len(), 18);
        assert_eq!(regions[1].index(), 1);
    }

    fn source_table(
        source: &dyn ConstantsProvider,
        set: &ConstantSetInfo,
        path: &str,
    ) -> ConstantsTable {
        source.table(path, &set.with_table(path)).unwrap()
    }
}
