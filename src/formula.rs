// SPDX-License-Identifier: MIT

use crate::timing::{Timing, TimingStatus, TimingType};
use crate::Result;
use clap::ValueEnum;
use log::debug;
use serde::Serialize;

pub mod cvt;
pub mod dmt;
pub mod gtf;
pub mod monitor;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Serialize)]
pub enum Formula {
    Dmt,
    Gtf,
    Cvt,
    CvtRb,
    CvtRb2,
}

/// GTF timing. A raster the DMT table defines at the same refresh rate is returned
/// from the table instead, with a GTF status.
pub fn calc_gtf(width: u32, height: u32, rr: u32, interlaced: bool) -> Result<Timing> {
    if let Ok(mut timing) = dmt::calc_dmt(width, height, rr, interlaced) {
        debug!("GTF {}x{}@{} resolved to {}", width, height, rr, timing.name);
        timing.status = TimingStatus::of(TimingType::Gtf, 0);
        return Ok(timing);
    }
    gtf::gtf(width, height, rr, interlaced)
}

/// CVT timing, taken from the DMT table with a CVT status when DMT defines the raster at the
/// same refresh rate. Codes a block declares as CVT go through [`cvt::cvt`] directly.
pub fn calc_cvt(width: u32, height: u32, rr: u32, interlaced: bool) -> Result<Timing> {
    if let Ok(mut timing) = dmt::calc_dmt(width, height, rr, interlaced) {
        debug!("CVT {}x{}@{} resolved to {}", width, height, rr, timing.name);
        timing.status = TimingStatus::of(TimingType::Cvt, 0);
        return Ok(timing);
    }
    cvt::cvt(width, height, rr, interlaced)
}

pub fn calc_cvt_rb(width: u32, height: u32, rr: u32, interlaced: bool) -> Result<Timing> {
    cvt::cvt_rb(width, height, rr, interlaced)
}

pub fn calc_cvt_rb2(width: u32, height: u32, rr: u32, video_optimized: bool) -> Result<Timing> {
    cvt::cvt_rb2(width, height, rr, video_optimized)
}

pub fn calc_dmt(width: u32, height: u32, rr: u32, interlaced: bool) -> Result<Timing> {
    dmt::calc_dmt(width, height, rr, interlaced)
}

/// Timing for a raster by the requested formula.
pub fn synthesize(
    formula: Formula,
    width: u32,
    height: u32,
    rr: u32,
    interlaced: bool,
) -> Result<Timing> {
    match formula {
        Formula::Dmt => calc_dmt(width, height, rr, interlaced),
        Formula::Gtf => calc_gtf(width, height, rr, interlaced),
        Formula::Cvt => calc_cvt(width, height, rr, interlaced),
        Formula::CvtRb => calc_cvt_rb(width, height, rr, interlaced),
        Formula::CvtRb2 => calc_cvt_rb2(width, height, rr, false),
    }
}

#[cfg(test)]
mod tests {
    use crate::formula::*;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    #[test]
    fn test_gtf_prefers_dmt_raster() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let timing = calc_gtf(640, 480, 60, false).unwrap();
        assert_eq!(800, timing.h_total);
        assert_eq!(525, timing.v_total);
        assert_eq!(2518, timing.pclk);
        assert_eq!(TimingType::Gtf, timing.status.timing_type());

        let timing = calc_gtf(1000, 700, 60, false).unwrap();
        assert_eq!(1000, timing.h_visible);
        assert_eq!(60, timing.refresh_rate);
    }

    #[test]
    fn test_cvt_prefers_dmt_raster() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let timing = calc_cvt(1920, 1080, 60, false).unwrap();
        assert_eq!((2200, 1125), (timing.h_total, timing.v_total));
        assert_eq!(14850, timing.pclk);
        assert_eq!(TimingType::Cvt, timing.status.timing_type());

        // the raw formula stays reachable
        assert_eq!(2576, cvt::cvt(1920, 1080, 60, false).unwrap().h_total);

        // no DMT entry for this raster
        let timing = calc_cvt(1000, 700, 60, false).unwrap();
        assert_eq!(1000, timing.h_visible);
        assert_eq!(TimingType::Cvt, timing.status.timing_type());
    }

    #[test]
    fn test_synthesize() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        assert_eq!(2200, synthesize(Formula::Cvt, 1920, 1080, 60, false).unwrap().h_total);
        assert_eq!(2080, synthesize(Formula::CvtRb, 1920, 1080, 60, false).unwrap().h_total);
        assert_eq!(2000, synthesize(Formula::CvtRb2, 1920, 1080, 60, false).unwrap().h_total);
        assert_eq!(2200, synthesize(Formula::Dmt, 1920, 1080, 60, false).unwrap().h_total);
        assert!(synthesize(Formula::Dmt, 1921, 1080, 60, false).is_err());
    }
}
