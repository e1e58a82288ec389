// SPDX-License-Identifier: MIT

use crate::edid::descriptor::RangeLimits;
use crate::formula::gtf::GtfTimings;
use crate::timing::Timing;
use crate::{Error, Result};
use log::{debug, warn};
use serde::Serialize;

/// Monitor operating limits. Frequencies in Hz, pixel clock in Hz.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorLimits {
    pub h_freq_min: u32,
    pub h_freq_max: u32,
    pub v_freq_min: u32,
    pub v_freq_max: u32,
    pub dclk_min: u32,
    pub dclk_max: u32,
}

impl Default for MonitorLimits {
    /// Just enough for 640x480@60.
    fn default() -> Self {
        Self {
            h_freq_min: 29000,
            h_freq_max: 30000,
            v_freq_min: 60,
            v_freq_max: 60,
            dclk_min: 0,
            dclk_max: 25_000_000,
        }
    }
}

impl MonitorLimits {
    pub fn is_valid(&self) -> bool {
        self.h_freq_max != 0
            && self.v_freq_max != 0
            && self.dclk_max != 0
            && self.h_freq_max >= self.h_freq_min
            && self.v_freq_max >= self.v_freq_min
            && self.dclk_max >= self.dclk_min
    }

    /// Limits declared by an EDID display range limits descriptor.
    pub fn from_range_limits(range: &RangeLimits) -> Self {
        Self {
            h_freq_min: range.min_h_rate_khz as u32 * 1000,
            h_freq_max: range.max_h_rate_khz as u32 * 1000,
            v_freq_min: range.min_v_rate as u32,
            v_freq_max: range.max_v_rate as u32,
            dclk_min: 0,
            dclk_max: range.max_pclk_mhz as u32 * 1_000_000,
        }
    }

    fn accepts(&self, timings: &GtfTimings) -> bool {
        timings.v_freq >= self.v_freq_min
            && timings.v_freq <= self.v_freq_max
            && timings.h_freq >= self.h_freq_min
            && timings.h_freq <= self.h_freq_max
            && timings.dclk >= self.dclk_min
            && timings.dclk <= self.dclk_max
    }
}

/// How the GTF raster is driven.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum DrivingMode {
    /// Highest refresh rate the monitor limits allow.
    MaxTimings,
    /// Vertical refresh rate in Hz.
    VSync(u32),
    /// Horizontal scan rate in Hz.
    HSync(u32),
    /// Pixel clock period in picoseconds.
    PixelClock(u32),
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModeRequest {
    pub width: u32,
    pub height: u32,
    pub interlaced: bool,
    pub double_scan: bool,
}

fn picos_to_khz(picos: u32) -> u32 {
    if picos == 0 {
        0
    } else {
        1_000_000_000 / picos
    }
}

/// Solves a GTF raster for `request` under `limits`.
///
/// Falls back to [`MonitorLimits::default`] when `limits` are missing or inconsistent and
/// fails with [`Error::OutOfRange`] when the solved raster is outside them, unless
/// `ignore_limits` is set.
pub fn get_mode(
    mode: DrivingMode,
    request: &ModeRequest,
    limits: Option<&MonitorLimits>,
    ignore_limits: bool,
) -> Result<Timing> {
    let limits = match limits {
        Some(limits) if limits.is_valid() => *limits,
        Some(limits) => {
            warn!("Ignoring inconsistent monitor limits {:?}", limits);
            MonitorLimits::default()
        }
        None => MonitorLimits::default(),
    };

    let mut v_active = request.height;
    if request.interlaced {
        v_active /= 2;
    }
    if request.double_scan {
        v_active *= 2;
    }
    let timings = GtfTimings::new(request.width, v_active);

    let timings = match mode {
        DrivingMode::MaxTimings => {
            let mut timings = timings.clone().from_hfreq(limits.h_freq_max)?;
            if timings.v_freq > limits.v_freq_max {
                timings = GtfTimings::new(request.width, v_active).from_vfreq(limits.v_freq_max)?;
            }
            if timings.dclk > limits.dclk_max {
                timings = GtfTimings::new(request.width, v_active).from_dclk(limits.dclk_max)?;
            }
            timings
        }
        DrivingMode::VSync(v_freq) => timings.from_vfreq(v_freq)?,
        DrivingMode::HSync(h_freq) => timings.from_hfreq(h_freq)?,
        DrivingMode::PixelClock(picos) => timings.from_dclk(picos_to_khz(picos) * 1000)?,
    };
    debug!("Solved {:?} for {:?}: {:?}", mode, request, timings);

    if !ignore_limits && !limits.accepts(&timings) {
        return Err(Error::OutOfRange(format!(
            "{}x{} at {} Hz / {} Hz / {} Hz is outside {:?}",
            request.width, request.height, timings.v_freq, timings.h_freq, timings.dclk, limits
        )));
    }
    timings.to_timing(request.interlaced, request.double_scan)
}

#[cfg(test)]
mod tests {
    use crate::formula::monitor::*;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    fn limits() -> MonitorLimits {
        MonitorLimits {
            h_freq_min: 30000,
            h_freq_max: 83000,
            v_freq_min: 56,
            v_freq_max: 76,
            dclk_min: 0,
            dclk_max: 170_000_000,
        }
    }

    #[test]
    fn test_vsync_driven() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let request = ModeRequest {
            width: 1024,
            height: 768,
            ..ModeRequest::default()
        };
        let timing = get_mode(DrivingMode::VSync(75), &request, Some(&limits()), false).unwrap();
        assert_eq!(1365, timing.h_total);
        assert_eq!(75, timing.refresh_rate);
        assert!(get_mode(DrivingMode::VSync(85), &request, Some(&limits()), false).is_err());
        assert!(get_mode(DrivingMode::VSync(85), &request, Some(&limits()), true).is_ok());
    }

    #[test]
    fn test_max_timings_clamps_refresh() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let request = ModeRequest {
            width: 1280,
            height: 1024,
            ..ModeRequest::default()
        };
        let timing = get_mode(DrivingMode::MaxTimings, &request, Some(&limits()), false).unwrap();
        assert!(timing.refresh_rate <= 76);
        assert!(timing.pclk <= 17000);
    }

    #[test]
    fn test_default_limits_when_missing() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let request = ModeRequest {
            width: 640,
            height: 480,
            ..ModeRequest::default()
        };
        let timing = get_mode(DrivingMode::VSync(60), &request, None, false).unwrap();
        assert_eq!(640, timing.h_visible);
        let broken = MonitorLimits {
            h_freq_max: 0,
            ..limits()
        };
        assert!(get_mode(DrivingMode::VSync(75), &request, Some(&broken), false).is_err());
    }
}
