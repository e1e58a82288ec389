// SPDX-License-Identifier: MIT

use crate::cta861::vic::{get_cea861_timing_index, vic_aspect};
use crate::timing::{is_exact_equal, ColorFormats, Timing, TimingType, MAX_TOTAL_TIMING};
use log::{debug, trace, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Deref;

/// Append-only list of the timings collected from every block of an EDID. Capacity is capped
/// at [`MAX_TOTAL_TIMING`]; once full, further timings are dropped and the current source
/// stops decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TimingTable {
    timings: Vec<Timing>,
}

impl TimingTable {
    pub fn new() -> Self {
        Self {
            timings: Vec::with_capacity(MAX_TOTAL_TIMING),
        }
    }

    /// Appends `timing`, returns false when the table was already full.
    pub fn assign_next_available(&mut self, timing: Timing) -> bool {
        if self.is_full() {
            warn!("Timing table is full, dropping {}", timing.name);
            return false;
        }
        debug!("Timing {}: {}", self.timings.len(), timing.name);
        self.timings.push(timing);
        true
    }

    pub fn is_full(&self) -> bool {
        self.timings.len() >= MAX_TOTAL_TIMING
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Timing> {
        self.timings.get_mut(index)
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Timing> {
        self.timings.iter_mut()
    }

    /// Tags every timing that has a CTA-861 raster with its VIC and gives every timing of a VIC
    /// the union of their color formats. A detailed timing only takes the VIC when a CTA-861
    /// timing with the exact same raster exists. Zero aspect ratios are taken from the VIC
    /// table. DisplayID timings keep their own formats.
    pub fn reconcile_cta_formats(&mut self) {
        let vics = self
            .timings
            .iter()
            .map(|timing| self.reconciled_vic(timing))
            .collect::<Vec<_>>();

        let mut formats = BTreeMap::<u8, ColorFormats>::new();
        for (timing, vic) in self.timings.iter().zip(&vics).filter(|(_, vic)| **vic != 0) {
            formats.entry(*vic).or_default().union(&timing.color);
        }

        for (timing, vic) in self.timings.iter_mut().zip(vics) {
            if let Some(color) = formats.get(&vic) {
                timing.color = *color;
                if timing.status.cea_format() == 0 {
                    timing.status.set_cea_format(vic);
                    trace!("{} is VIC {}", timing.name, vic);
                }
            }
            if timing.aspect.is_zero() && !is_displayid_timing(timing) {
                let vic = get_cea861_timing_index(timing);
                if vic != 0 {
                    timing.aspect = vic_aspect(vic);
                }
            }
        }
    }

    /// VIC `timing` shares its color formats with, or 0.
    fn reconciled_vic(&self, timing: &Timing) -> u8 {
        if is_displayid_timing(timing) {
            return 0;
        }
        if timing.status.cea_format() != 0 {
            return timing.status.cea_format();
        }
        let vic = get_cea861_timing_index(timing);
        let has_cta_twin = || {
            self.timings
                .iter()
                .any(|other| other.status.cea_format() != 0 && is_exact_equal(other, timing))
        };
        if vic != 0 && timing.status.is_type(TimingType::EdidDtd) && !has_cta_twin() {
            return 0;
        }
        vic
    }
}

fn is_displayid_timing(timing: &Timing) -> bool {
    matches!(
        timing.status.timing_type(),
        TimingType::DisplayId1
            | TimingType::DisplayId2
            | TimingType::DisplayId7
            | TimingType::DisplayId8
            | TimingType::DisplayId9
            | TimingType::DisplayId10
    )
}

impl Deref for TimingTable {
    type Target = [Timing];

    fn deref(&self) -> &Self::Target {
        &self.timings
    }
}

impl<'a> IntoIterator for &'a TimingTable {
    type Item = &'a Timing;
    type IntoIter = std::slice::Iter<'a, Timing>;

    fn into_iter(self) -> Self::IntoIter {
        self.timings.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::cta861::vic::enum_cea861_timing;
    use crate::formula::calc_dmt;
    use crate::table::*;
    use crate::timing::{AspectRatio, ColorDepth, ColorFormats, TimingStatus};
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    #[test]
    fn test_capacity() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut table = TimingTable::new();
        let timing = calc_dmt(640, 480, 60, false).unwrap();
        for _ in 0..MAX_TOTAL_TIMING {
            assert!(table.assign_next_available(timing.clone()));
        }
        assert!(table.is_full());
        assert!(!table.assign_next_available(timing));
        assert_eq!(MAX_TOTAL_TIMING, table.len());
    }

    #[test]
    fn test_reconcile_cta_formats() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut table = TimingTable::new();

        let mut vic16 = enum_cea861_timing(16).unwrap();
        vic16.color.rgb444 = ColorDepth::Bpc8;
        vic16.color.yuv420 = ColorDepth::Bpc8 | ColorDepth::Bpc10;

        // same raster as VIC 16, decoded as DMT 0x52
        let mut standard = calc_dmt(1920, 1080, 60, false).unwrap();
        standard.status = TimingStatus::of(TimingType::EdidStd, 1);
        standard.aspect = AspectRatio::default();

        let mut detailed = vic16.clone();
        detailed.status = TimingStatus::of(TimingType::EdidDtd, 1);
        detailed.color = Default::default();

        let mut displayid = vic16.clone();
        displayid.status = TimingStatus::of(TimingType::DisplayId1, 1);
        displayid.color = Default::default();

        table.assign_next_available(detailed);
        table.assign_next_available(vic16);
        table.assign_next_available(standard);
        table.assign_next_available(displayid);
        table.reconcile_cta_formats();

        assert_eq!(16, table[0].status.cea_format());
        assert_eq!(ColorDepth::Bpc8 | ColorDepth::Bpc10, table[0].color.yuv420);
        assert_eq!(16, table[2].status.cea_format());
        assert_eq!(ColorDepth::Bpc8 | ColorDepth::Bpc10, table[2].color.yuv420);
        assert_eq!(AspectRatio::new(16, 9), table[2].aspect);
        assert_eq!(0, table[3].status.cea_format());
        assert!(table[3].color.yuv420.is_empty());
    }

    #[test]
    fn test_formats_are_unioned_per_vic() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut table = TimingTable::new();

        // VIC 16 from the SVD list, the 4:2:0 list and a DisplayID embedded CTA block
        let mut svd = enum_cea861_timing(16).unwrap();
        svd.color = ColorFormats {
            rgb444: ColorDepth::Bpc8,
            ..Default::default()
        };
        let mut y420 = enum_cea861_timing(16).unwrap();
        y420.color = ColorFormats {
            yuv420: ColorDepth::Bpc8 | ColorDepth::Bpc10,
            ..Default::default()
        };
        let mut embedded = enum_cea861_timing(16).unwrap();
        embedded.color = ColorFormats {
            yuv444: ColorDepth::Bpc8 | ColorDepth::Bpc12,
            ..Default::default()
        };
        let mut standard = calc_dmt(1920, 1080, 60, false).unwrap();
        standard.status = TimingStatus::of(TimingType::EdidStd, 1);
        standard.color = ColorFormats::default();
        let mut vic4 = enum_cea861_timing(4).unwrap();
        vic4.color = ColorFormats {
            yuv422: ColorDepth::Bpc12,
            ..Default::default()
        };

        table.assign_next_available(svd);
        table.assign_next_available(y420);
        table.assign_next_available(embedded);
        table.assign_next_available(standard);
        table.assign_next_available(vic4);
        table.reconcile_cta_formats();

        let expected = ColorFormats {
            rgb444: ColorDepth::Bpc8,
            yuv444: ColorDepth::Bpc8 | ColorDepth::Bpc12,
            yuv422: ColorDepth::empty(),
            yuv420: ColorDepth::Bpc8 | ColorDepth::Bpc10,
        };
        for timing in &table[..4] {
            assert_eq!(16, timing.status.cea_format());
            assert_eq!(expected, timing.color);
        }
        assert_eq!(4, table[4].status.cea_format());
        assert_eq!(ColorDepth::Bpc12, table[4].color.yuv422);
        assert!(table[4].color.rgb444.is_empty());
    }

    #[test]
    fn test_detailed_timing_without_cta_twin() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut table = TimingTable::new();
        let mut detailed = enum_cea861_timing(4).unwrap();
        detailed.status = TimingStatus::of(TimingType::EdidDtd, 1);
        table.assign_next_available(detailed);
        table.reconcile_cta_formats();
        assert_eq!(0, table[0].status.cea_format());
    }
}
