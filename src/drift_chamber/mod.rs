//! Forward drift chambers.
//!
//! Six sectors, each with three regions of two superlayers. A superlayer
//! holds six sense wire layers between two guard wire layers; every wire is
//! a straight segment between the region's two end plates.
//!
//! Nominal parameters come from `/geometry/dc/{dc,region,superlayer,layer}`.
//! Angles are stored in radians, lengths in centimetres.

mod layer;
mod region;
mod superlayer;

pub use layer::{Guardlayer, Senselayer};
pub use region::Region;
pub use superlayer::Superlayer;

use tracing::debug;

use crate::ccdb::{self, ConstantSetInfo, ConstantsProvider};
use crate::error::{Result, normalize_index};
use crate::geometry::DEG2RAD;

use region::RegionFrame;
use superlayer::SuperlayerFrame;

/// One azimuthal sector of the drift chamber
#[derive(Debug, Clone)]
pub struct Sector {
    index: usize,
    regions: Vec<Region>,
}

impl Sector {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, idx: isize) -> Result<&Region> {
        let i = normalize_index("region", idx, self.regions.len())?;
        Ok(&self.regions[i])
    }
}

/// The complete drift chamber system
#[derive(Debug, Clone, Default)]
pub struct DriftChamber {
    sectors: Vec<Sector>,
}

impl DriftChamber {
    /// Build the nominal geometry from the constants database
    pub fn from_provider(provider: &dyn ConstantsProvider, set: &ConstantSetInfo) -> Result<Self> {
        let t_dc = ccdb::fetch(provider, set, "/geometry/dc/dc")?;
        let t_region = ccdb::fetch(provider, set, "/geometry/dc/region")?;
        let t_sl = ccdb::fetch(provider, set, "/geometry/dc/superlayer")?;
        let t_layer = ccdb::fetch(provider, set, "/geometry/dc/layer")?;

        let nsectors: usize = t_dc.elem("nsectors", 0)?;
        let nregions: usize = t_dc.elem("nregions", 0)?;
        let nsensewires: usize = t_layer.elem("nsensewires", 0)?;
        let nguardwires: usize = t_layer.elem("nguardwires", 0)?;

        debug!(nsectors, nregions, nsensewires, nguardwires, "building drift chamber");

        let mut sectors = Vec::with_capacity(nsectors);
        for sec in 0..nsectors {
            let mut regions = Vec::with_capacity(nregions);
            // superlayer rows are numbered across regions
            let mut sl_row = 0usize;

            for reg in 0..nregions {
                let frame = RegionFrame {
                    sector: sec,
                    thopen: t_region.elem::<f64>("thopen", reg)? * DEG2RAD,
                    thtilt: t_region.elem::<f64>("thtilt", reg)? * DEG2RAD,
                    xdist: t_region.elem("xdist", reg)?,
                };
                let dist2tgt: f64 = t_region.elem("dist2tgt", reg)?;
                let midgap: f64 = t_region.elem("midgap", reg)?;
                let nsuperlayers: usize = t_region.elem("nsuperlayers", reg)?;

                let mut superlayers = Vec::with_capacity(nsuperlayers);
                let mut sl_dist2tgt = dist2tgt;

                for slyr in 0..nsuperlayers {
                    let row = sl_row + slyr;
                    let nsense: usize = t_sl.elem("nsenselayers", row)?;
                    let nguard: usize = t_sl.elem("nguardlayers", row)?;
                    let wpdist: f64 = t_sl.elem("wpdist", row)?;
                    let cellthickness: f64 = t_sl.elem("cellthickness", row)?;
                    let nlayers = nsense + nguard;
                    let thickness =
                        nlayers.saturating_sub(1) as f64 * cellthickness * wpdist;

                    let sl_frame = SuperlayerFrame {
                        region: frame,
                        thster: t_sl.elem::<f64>("thster", row)? * DEG2RAD,
                        thmin: t_sl.elem::<f64>("thmin", row)? * DEG2RAD,
                        wpdist,
                        cellthickness,
                        dist2tgt: sl_dist2tgt,
                        thickness,
                    };

                    let senselayers = (0..nsense)
                        .map(|index| Senselayer {
                            index,
                            frame: sl_frame,
                            sensewires: vec![true; nsensewires],
                            nguardwires,
                        })
                        .collect();
                    let guardlayers = (0..nguard)
                        .map(|index| Guardlayer {
                            index,
                            frame: sl_frame,
                            nwires: nsensewires + nguardwires,
                        })
                        .collect();

                    superlayers.push(Superlayer {
                        index: slyr,
                        region_index: reg,
                        nfieldlayers: t_sl.elem("nfieldlayers", row)?,
                        frame: sl_frame,
                        senselayers,
                        guardlayers,
                    });

                    sl_dist2tgt += thickness + midgap;
                }
                sl_row += nsuperlayers;

                regions.push(Region {
                    index: reg,
                    frame,
                    dist2tgt,
                    frontgap: t_region.elem("frontgap", reg)?,
                    midgap,
                    backgap: t_region.elem("backgap", reg)?,
                    superlayers,
                });
            }
            sectors.push(Sector {
                index: sec,
                regions,
            });
        }

        Ok(Self { sectors })
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn sector(&self, idx: isize) -> Result<&Sector> {
        let i = normalize_index("sector", idx, self.sectors.len())?;
        Ok(&self.sectors[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordsys::CoordSys;
    use crate::test_support::nominal;

    fn dc() -> DriftChamber {
        DriftChamber::from_provider(&nominal(), &ConstantSetInfo::default()).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_structure() {
        let dc = dc();
        assert_eq!(dc.sectors().len(), 6);
        let sector = dc.sector(0).unwrap();
        assert_eq!(sector.regions().len(), 3);
        let sl = sector.region(0).unwrap().superlayer(0).unwrap();
        assert_eq!(sl.senselayers().len(), 6);
        assert_eq!(sl.guardlayers().len(), 2);
        assert_eq!(sl.nlayers(), 8);
        assert_eq!(sl.nwireplanes(), 8 + 7 * 2);
        assert_eq!(sl.senselayer(0).unwrap().nwires(), 113);
        assert_eq!(sl.guardlayer(0).unwrap().nwires(), 113);
        assert_eq!(dc.sector(-1).unwrap().index(), 5);
        assert!(dc.sector(6).is_err());
    }

    #[test]
    fn test_superlayer_rows_are_global() {
        let dc = dc();
        let region = dc.sector(0).unwrap().region(2).unwrap();
        let sl = region.superlayer(1).unwrap();
        assert!(close(sl.wpdist(), 0.9780));
        assert!(close(sl.thster(), -6.0 * DEG2RAD));
    }

    #[test]
    fn test_superlayer_distances() {
        let dc = dc();
        let region = dc.sector(0).unwrap().region(0).unwrap();
        let sl0 = region.superlayer(0).unwrap();
        let sl1 = region.superlayer(1).unwrap();
        assert!(close(sl0.layer_thickness(), 6.0 * 0.3861));
        assert!(close(sl0.thickness(), 7.0 * 6.0 * 0.3861));
        assert!(close(sl0.dist2tgt(), 228.078));
        assert!(close(sl1.dist2tgt(), 228.078 + sl0.thickness() + 1.5));
        assert!(close(
            region.thickness(),
            1.1 + 1.5 + 1.0 + sl0.thickness() + sl1.thickness()
        ));
    }

    #[test]
    fn test_wire_direction_is_unit_and_stereo() {
        let dc = dc();
        let sl = dc.sector(0).unwrap().region(0).unwrap().superlayer(0).unwrap();
        let d = sl.wire_direction(CoordSys::Sector).unwrap();
        assert!(close(d.to_vector().r(), 1.0));
        assert!(close(d.y(), (6.0 * DEG2RAD).cos()));
        assert!(sl.wire_direction(CoordSys::Layer).is_err());
    }

    #[test]
    fn test_wires_end_on_plates() {
        let dc = dc();
        let region = dc.sector(0).unwrap().region(1).unwrap();
        let layer = region.superlayer(0).unwrap().senselayer(3).unwrap();
        let wire = layer.wire(10, CoordSys::Sector).unwrap();
        let left = region.left_end_plate(CoordSys::Sector).unwrap();
        let right = region.right_end_plate(CoordSys::Sector).unwrap();
        assert!(left.distance(&wire.begin_point()).abs() < 1e-9);
        assert!(right.distance(&wire.end_point()).abs() < 1e-9);
        assert!(wire.length() > 0.0);
        assert!(close(layer.wire_length(10).unwrap(), wire.length()));
    }

    #[test]
    fn test_wire_midpoints_stagger() {
        let dc = dc();
        let sl = dc.sector(0).unwrap().region(0).unwrap().superlayer(0).unwrap();
        let even = sl.senselayer(0).unwrap();
        let odd = sl.senselayer(1).unwrap();
        let tilt = 25.0 * DEG2RAD;
        let dx = odd.wire_mid_x(0).unwrap() - even.wire_mid_x(0).unwrap();
        let expected = sl.layer_thickness() * tilt.sin() + 0.5 * sl.wire_mid_spacing() * tilt.cos();
        assert!(close(dx, expected));
        assert_eq!(even.wire_mid_y(), 0.0);
        assert!(even.wire_mid_x(113).is_err());
        assert!(close(
            even.wire_mid_x(-1).unwrap(),
            even.wire_mid_x(112).unwrap()
        ));
    }

    #[test]
    fn test_guardlayers_bound_superlayer() {
        let dc = dc();
        let sl = dc.sector(0).unwrap().region(0).unwrap().superlayer(0).unwrap();
        let g0 = sl.guardlayer(0).unwrap();
        let g1 = sl.guardlayer(1).unwrap();
        assert!(close(g0.wire_mid_x(0).unwrap(), sl.first_wire_mid_x()));
        assert!(close(g0.dist2tgt(), sl.dist2tgt()));
        assert!(close(g1.dist2tgt(), sl.dist2tgt() + sl.thickness()));
        let s5 = sl.senselayer(5).unwrap();
        assert!(close(s5.dist2tgt(), sl.dist2tgt() + 5.0 * sl.layer_thickness()));
    }

    #[test]
    fn test_clas_coordinates_rotate_with_sector() {
        let dc = dc();
        let sector = dc.sector(1).unwrap();
        let layer = sector.region(0).unwrap().superlayer(0).unwrap().senselayer(0).unwrap();
        let s = layer.wire_mid(5, CoordSys::Sector).unwrap();
        let c = layer.wire_mid(5, CoordSys::Clas).unwrap();
        assert!(close(s.r(), c.r()));
        assert!(close(c.phi() - s.phi(), crate::coordsys::SECTOR_PHI_STEP));
        assert!(layer.wire(0, CoordSys::Layer).is_err());
    }

    #[test]
    fn test_region_center_in_midplane() {
        let dc = dc();
        let region = dc.sector(0).unwrap().region(0).unwrap();
        let c = region.center(CoordSys::Sector).unwrap();
        assert_eq!(c.y, 0.0);
        assert!(c.z > region.dist2tgt() * 0.5);
        let layer = region.superlayer(0).unwrap().senselayer(0).unwrap();
        let plane = layer.wire_plane(CoordSys::Sector).unwrap();
        assert!(plane.distance(&layer.wire_mid(50, CoordSys::Sector).unwrap()).abs() < 1e-9);
    }
}
