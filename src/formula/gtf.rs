// SPDX-License-Identifier: MIT

// VESA Generalized Timing Formula, integer form.
// https://glenwing.github.io/docs/VESA-GTF-1.1.pdf

use crate::timing::{calc_rrx1k, Polarity, Timing, TimingFlags, TimingStatus, TimingType};
use crate::{Error, Result};
use log::trace;
use serde::Serialize;

const FLYBACK_US: u32 = 550;
const V_FRONT_PORCH: u32 = 1;
const V_SYNC: u32 = 3;
const H_OFFSET: u32 = 40;
const H_SCALE_FACTOR: u32 = 20;
const H_BLANK_SCALE: u32 = 128;
const H_GRADIENT: u32 = 600;
const C_VAL: u32 = (H_OFFSET - H_SCALE_FACTOR) * H_BLANK_SCALE / 256 + H_SCALE_FACTOR;
const M_VAL: u32 = H_BLANK_SCALE * H_GRADIENT / 256;

/// Intermediate GTF values. Frequencies are in Hz, `dclk` is the pixel clock in Hz.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GtfTimings {
    pub h_active: u32,
    pub v_active: u32,
    pub h_blank: u32,
    pub v_blank: u32,
    pub h_total: u32,
    pub v_total: u32,
    pub h_freq: u32,
    pub v_freq: u32,
    pub dclk: u32,
}

fn int_sqrt(value: u64) -> u64 {
    if value < 2 {
        return value;
    }
    let mut x = value;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + value / x) / 2;
    }
    x
}

/// Vertical blanking in lines: flyback time rounded to lines plus the front porch.
pub fn vblank(h_freq: u32) -> u32 {
    let vblank = h_freq as u64 * FLYBACK_US as u64 / 1000;
    ((vblank + 500) / 1000) as u32 + V_FRONT_PORCH
}

pub fn hblank_by_hfreq(h_freq: u32, x_res: u32) -> Result<u32> {
    if h_freq == 0 {
        return Err(Error::InvalidTiming("Horizontal frequency is zero".to_string()));
    }
    let c_val = C_VAL as i64 * 1000;
    let m_val = M_VAL as i64 * 1_000_000 / h_freq as i64;
    let duty_cycle = c_val - m_val;
    if duty_cycle <= 0 {
        return Err(Error::OutOfRange(format!(
            "Horizontal frequency {} leaves no blanking",
            h_freq
        )));
    }
    Ok((x_res as i64 * duty_cycle / (100_000 - duty_cycle)) as u32)
}

pub fn hblank_by_dclk(dclk: u32, x_res: u32) -> Result<u32> {
    let dclk_khz = dclk as u64 / 1000;
    if dclk_khz == 0 {
        return Err(Error::InvalidTiming("Pixel clock is zero".to_string()));
    }
    let mut h_period = (100 - C_VAL) as u64;
    h_period *= h_period;
    h_period += M_VAL as u64 * x_res as u64 * 2 * 1000 / (5 * dclk_khz);
    h_period *= 10000;
    h_period = int_sqrt(h_period);
    h_period -= (100 - C_VAL) as u64 * 100;
    h_period *= 1000;
    h_period /= 2 * M_VAL as u64;
    let duty_cycle = (C_VAL as i64 * 1000) - (M_VAL as u64 * h_period / 100) as i64;
    if duty_cycle <= 0 {
        return Err(Error::OutOfRange(format!("Pixel clock {} leaves no blanking", dclk)));
    }
    let hblank = x_res as i64 * duty_cycle / (100_000 - duty_cycle) + 8;
    Ok((hblank & !15) as u32)
}

pub fn hfreq(v_freq: u32, y_res: u32) -> Result<u32> {
    let divisor = 1_000_000i64 - v_freq as i64 * FLYBACK_US as i64;
    if divisor < 1000 {
        return Err(Error::OutOfRange(format!("Vertical frequency {} is too high", v_freq)));
    }
    let divisor = (divisor / 1000) as u64;
    let h_freq = (y_res as u64 + V_FRONT_PORCH as u64) * v_freq as u64 * 1000;
    Ok((h_freq / divisor) as u32)
}

impl GtfTimings {
    pub fn new(h_active: u32, v_active: u32) -> Self {
        Self {
            h_active,
            v_active,
            ..Self::default()
        }
    }

    /// Solves the raster from `v_freq`.
    pub fn from_vfreq(mut self, v_freq: u32) -> Result<Self> {
        self.v_freq = v_freq;
        self.h_freq = hfreq(v_freq, self.v_active)?;
        self.v_blank = vblank(self.h_freq);
        self.v_total = self.v_active + self.v_blank;
        self.h_blank = hblank_by_hfreq(self.h_freq, self.h_active)?;
        self.h_total = self.h_active + self.h_blank;
        self.dclk = self.h_total.saturating_mul(self.h_freq);
        Ok(self)
    }

    /// Solves the raster from `h_freq`.
    pub fn from_hfreq(mut self, h_freq: u32) -> Result<Self> {
        self.h_freq = h_freq;
        self.v_blank = vblank(h_freq);
        self.v_total = self.v_active + self.v_blank;
        self.v_freq = h_freq / self.v_total.max(1);
        self.h_blank = hblank_by_hfreq(h_freq, self.h_active)?;
        self.h_total = self.h_active + self.h_blank;
        self.dclk = self.h_total.saturating_mul(h_freq);
        Ok(self)
    }

    /// Solves the raster from the pixel clock `dclk`.
    pub fn from_dclk(mut self, dclk: u32) -> Result<Self> {
        self.dclk = dclk;
        self.h_blank = hblank_by_dclk(dclk, self.h_active)?;
        self.h_total = self.h_active + self.h_blank;
        self.h_freq = dclk / self.h_total.max(1);
        self.v_blank = vblank(self.h_freq);
        self.v_total = self.v_active + self.v_blank;
        self.v_freq = self.h_freq / self.v_total.max(1);
        Ok(self)
    }

    /// Lays the blanking out as the frame buffer layer does: 8% sync centred in the
    /// horizontal blank, 1 line front porch and 3 lines of vertical sync.
    pub fn to_timing(&self, interlaced: bool, double_scan: bool) -> Result<Timing> {
        let dscan = if double_scan { 2 } else { 1 };
        let h_sync = self.h_total * 8 / 100;
        let h_front_porch = (self.h_blank / 2).checked_sub(h_sync).ok_or_else(|| {
            Error::InvalidTiming(format!("Horizontal blank {} is narrower than sync", self.h_blank))
        })?;
        let mut timing = Timing {
            h_visible: self.h_active as u16,
            h_front_porch: h_front_porch as u16,
            h_sync_width: h_sync as u16,
            h_total: self.h_total as u16,
            h_sync_polarity: Polarity::Negative,
            v_visible: (self.v_active / dscan) as u16,
            v_front_porch: (V_FRONT_PORCH / dscan) as u16,
            v_sync_width: (V_SYNC / dscan) as u16,
            v_total: (self.v_total / dscan) as u16,
            v_sync_polarity: Polarity::Positive,
            interlaced,
            pclk: self.dclk / 10_000,
            refresh_rate: self.v_freq as u16,
            pixel_repetition: 1,
            status: TimingStatus::of(TimingType::Gtf, 0),
            ..Timing::default()
        };
        if double_scan {
            timing.flags |= TimingFlags::DoubleScan;
        }
        if timing.pclk == 0 || timing.h_visible == 0 || timing.v_visible == 0 {
            return Err(Error::InvalidTiming(format!("Degenerate GTF raster {:?}", self)));
        }
        timing.refresh_rate_x1k =
            calc_rrx1k(timing.pclk, timing.interlaced, timing.h_total, timing.v_total);
        timing.set_name(format!(
            "GTF:{}x{}x{}Hz{}",
            timing.h_visible,
            self.v_active * if interlaced { 2 } else { 1 },
            self.v_freq,
            if interlaced { "/i" } else { "" }
        ));
        Ok(timing)
    }
}

/// Plain GTF, driven by the vertical refresh rate.
pub fn gtf(width: u32, height: u32, rr: u32, interlaced: bool) -> Result<Timing> {
    if width == 0 || height == 0 || rr == 0 {
        return Err(Error::InvalidTiming(format!(
            "Can't synthesize GTF timing for {}x{}@{}",
            width, height, rr
        )));
    }
    let (v_active, v_freq) = if interlaced {
        (height / 2, rr * 2)
    } else {
        (height, rr)
    };
    let timings = GtfTimings::new(width, v_active).from_vfreq(v_freq)?;
    trace!("GTF intermediate values: {:?}", timings);
    let mut timing = timings.to_timing(interlaced, false)?;
    timing.refresh_rate = rr as u16;
    Ok(timing)
}

#[cfg(test)]
mod tests {
    use crate::formula::gtf::*;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    #[test]
    fn test_constants() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        assert_eq!(30, C_VAL);
        assert_eq!(300, M_VAL);
        assert_eq!(17, vblank(29844));
        assert_eq!(4, int_sqrt(17));
    }

    #[test]
    fn test_gtf_640x480() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let timings = GtfTimings::new(640, 480).from_vfreq(60).unwrap();
        assert_eq!(29844, timings.h_freq);
        assert_eq!(497, timings.v_total);
        assert_eq!(159, timings.h_blank);
        assert_eq!(799, timings.h_total);

        let timing = gtf(640, 480, 60, false).unwrap();
        assert_eq!(63, timing.h_sync_width);
        assert_eq!(16, timing.h_front_porch);
        assert_eq!(2384, timing.pclk);
        assert_eq!(60, timing.refresh_rate);
        assert_eq!(TimingType::Gtf, timing.status.timing_type());
    }

    #[test]
    fn test_gtf_round_trip_through_dclk() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let timings = GtfTimings::new(1024, 768).from_vfreq(75).unwrap();
        let back = GtfTimings::new(1024, 768).from_dclk(timings.dclk).unwrap();
        assert!(back.v_freq.abs_diff(75) <= 1);
        assert_eq!(0, back.h_blank % 16);
    }

    #[test]
    fn test_gtf_rejects_bad_input() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        assert!(gtf(640, 0, 60, false).is_err());
        assert!(hfreq(2000, 480).is_err());
        assert!(hblank_by_hfreq(0, 640).is_err());
    }
}
