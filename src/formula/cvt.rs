// SPDX-License-Identifier: MIT

// https://glenwing.github.io/docs/VESA-CVT-1.2.pdf

use crate::timing::{calc_rr, calc_rrx1k, Polarity, Timing, TimingFlags, TimingStatus, TimingType};
use crate::{Error, Result};
use log::trace;

const CELL_GRANULARITY: u64 = 8;
const MIN_VSYNC_BP_US: u64 = 550;
const MIN_V_PORCH: u64 = 3;
const MIN_V_BACK_PORCH: u64 = 6;
const C_PRIME: u64 = 30;
const M_PRIME: u64 = 300;
const H_SYNC_PERCENT: u64 = 8;
const CLOCK_STEP_HZ: u64 = 250_000;

const RB_MIN_V_BLANK_US: u64 = 460;
const RB_H_BLANK: u64 = 160;
const RB_H_SYNC: u64 = 32;
const RB_H_FRONT_PORCH: u64 = 48;
const RB_V_FRONT_PORCH: u64 = 3;

const RB2_H_BLANK: u64 = 80;
const RB2_H_SYNC: u64 = 32;
const RB2_H_FRONT_PORCH: u64 = 8;
const RB2_V_SYNC: u64 = 8;
const RB2_MIN_V_FRONT_PORCH: u64 = 1;
const RB2_V_BACK_PORCH: u64 = 6;
const RB2_CLOCK_STEP_HZ: u64 = 1_000;

const PICOS_PER_SECOND: u64 = 1_000_000_000_000;
const PICOS_PER_MICRO: u64 = 1_000_000;

/// Vertical sync width keyed by the aspect ratio the raster resolves to.
pub fn vsync_width(width: u32, height: u32) -> u64 {
    let width = (width as u64 / CELL_GRANULARITY) * CELL_GRANULARITY;
    let height = height as u64;
    [(4, 3, 4), (16, 9, 5), (16, 10, 6), (5, 4, 7), (15, 9, 7)]
        .iter()
        .find(|(a, b, _)| (height * a / b) & !(CELL_GRANULARITY - 1) == width)
        .map(|(_, _, vsync)| *vsync)
        .unwrap_or(10)
}

fn check_input(width: u32, height: u32, rr: u32) -> Result<()> {
    if width == 0 || height == 0 || rr == 0 {
        return Err(Error::InvalidTiming(format!(
            "Can't synthesize timing for {}x{}@{}",
            width, height, rr
        )));
    }
    Ok(())
}

fn to_u16(value: u64, what: &str) -> Result<u16> {
    u16::try_from(value).map_err(|_| Error::OutOfRange(format!("{} {} doesn't fit", what, value)))
}

fn finish(mut timing: Timing, rr: u32, timing_type: TimingType, name: &str) -> Result<Timing> {
    if timing.pclk == 0 {
        return Err(Error::InvalidTiming(format!(
            "{} produced a zero pixel clock for {}x{}",
            name, timing.h_visible, timing.v_visible
        )));
    }
    timing.refresh_rate = rr as u16;
    timing.refresh_rate_x1k = calc_rrx1k(timing.pclk, timing.interlaced, timing.h_total, timing.v_total);
    if timing.pclk_1khz != 0 {
        let total = timing.h_total as u64 * timing.v_total as u64;
        timing.refresh_rate_x1k = (timing.pclk_1khz as u64 * 1_000_000 / total) as u32;
    }
    timing.status = TimingStatus::of(timing_type, 0);
    timing.set_name(format!(
        "{}:{}x{}x{}Hz{}",
        name,
        timing.h_visible,
        timing.v_visible * if timing.interlaced { 2 } else { 1 },
        rr,
        if timing.interlaced { "/i" } else { "" }
    ));
    trace!("Synthesized {:?}", timing);
    Ok(timing)
}

/// CVT with standard blanking.
pub fn cvt(width: u32, height: u32, rr: u32, interlaced: bool) -> Result<Timing> {
    check_input(width, height, rr)?;
    let h_pixels = (width as u64 / CELL_GRANULARITY) * CELL_GRANULARITY;
    let v_lines = if interlaced { height as u64 / 2 } else { height as u64 };
    let field_rate = if interlaced { rr as u64 * 2 } else { rr as u64 };
    let vsync = vsync_width(width, height);

    // Doubled so the half line of an interlaced field stays integral.
    let numerator = (PICOS_PER_SECOND / field_rate)
        .checked_sub(MIN_VSYNC_BP_US * PICOS_PER_MICRO)
        .ok_or_else(|| Error::OutOfRange(format!("Refresh rate {} is too high for CVT", rr)))?
        * 2;
    let denominator = (v_lines + MIN_V_PORCH) * 2 + interlaced as u64;
    let h_period_ps = numerator / denominator;
    if h_period_ps == 0 {
        return Err(Error::OutOfRange(format!("Raster {}x{} is too tall for CVT", width, height)));
    }

    let vsync_bp = (MIN_VSYNC_BP_US * PICOS_PER_MICRO / h_period_ps + 1).max(vsync + MIN_V_BACK_PORCH);
    let v_total = v_lines + vsync_bp + MIN_V_PORCH;

    let duty_cycle = (C_PRIME * 1000)
        .saturating_sub(M_PRIME * h_period_ps / PICOS_PER_MICRO)
        .max(20_000);
    let h_blank = (h_pixels * duty_cycle / (100_000 - duty_cycle)) / (2 * CELL_GRANULARITY)
        * (2 * CELL_GRANULARITY);
    let h_total = h_pixels + h_blank;
    let pclk_hz = h_total * PICOS_PER_SECOND / h_period_ps / CLOCK_STEP_HZ * CLOCK_STEP_HZ;
    let h_sync = (H_SYNC_PERCENT * h_total / 100) / CELL_GRANULARITY * CELL_GRANULARITY;
    let h_back_porch = h_blank / 2;
    let h_front_porch = h_blank
        .checked_sub(h_sync + h_back_porch)
        .ok_or_else(|| Error::OutOfRange(format!("Raster {}x{} is too narrow for CVT", width, height)))?;

    let timing = Timing {
        h_visible: to_u16(h_pixels, "HVisible")?,
        h_front_porch: to_u16(h_front_porch, "HFrontPorch")?,
        h_sync_width: to_u16(h_sync, "HSyncWidth")?,
        h_total: to_u16(h_total, "HTotal")?,
        h_sync_polarity: Polarity::Negative,
        v_visible: to_u16(v_lines, "VVisible")?,
        v_front_porch: MIN_V_PORCH as u16,
        v_sync_width: vsync as u16,
        v_total: to_u16(v_total, "VTotal")?,
        v_sync_polarity: Polarity::Positive,
        interlaced,
        pclk: (pclk_hz / 10_000) as u32,
        pixel_repetition: 1,
        ..Timing::default()
    };
    finish(timing, rr, TimingType::Cvt, "CVT")
}

/// CVT reduced blanking, version 1.
pub fn cvt_rb(width: u32, height: u32, rr: u32, interlaced: bool) -> Result<Timing> {
    check_input(width, height, rr)?;
    let h_pixels = (width as u64 / CELL_GRANULARITY) * CELL_GRANULARITY;
    let v_lines = if interlaced { height as u64 / 2 } else { height as u64 };
    let field_rate = if interlaced { rr as u64 * 2 } else { rr as u64 };
    let vsync = vsync_width(width, height);

    let h_period_ps = (PICOS_PER_SECOND / field_rate)
        .checked_sub(RB_MIN_V_BLANK_US * PICOS_PER_MICRO)
        .ok_or_else(|| Error::OutOfRange(format!("Refresh rate {} is too high for CVT-RB", rr)))?
        / v_lines.max(1);
    if h_period_ps == 0 {
        return Err(Error::OutOfRange(format!("Raster {}x{} is too tall for CVT-RB", width, height)));
    }
    let vbi_lines = (RB_MIN_V_BLANK_US * PICOS_PER_MICRO / h_period_ps + 1)
        .max(RB_V_FRONT_PORCH + vsync + MIN_V_BACK_PORCH);
    let v_total = v_lines + vbi_lines;
    let h_total = h_pixels + RB_H_BLANK;
    let pclk_hz = field_rate * v_total * h_total / CLOCK_STEP_HZ * CLOCK_STEP_HZ;

    let timing = Timing {
        h_visible: to_u16(h_pixels, "HVisible")?,
        h_front_porch: RB_H_FRONT_PORCH as u16,
        h_sync_width: RB_H_SYNC as u16,
        h_total: to_u16(h_total, "HTotal")?,
        h_sync_polarity: Polarity::Positive,
        v_visible: to_u16(v_lines, "VVisible")?,
        v_front_porch: RB_V_FRONT_PORCH as u16,
        v_sync_width: vsync as u16,
        v_total: to_u16(v_total, "VTotal")?,
        v_sync_polarity: Polarity::Negative,
        interlaced,
        pclk: (pclk_hz / 10_000) as u32,
        flags: TimingFlags::ReducedBlanking,
        pixel_repetition: 1,
        ..Timing::default()
    };
    finish(timing, rr, TimingType::CvtRb, "CVT-RB")
}

/// CVT reduced blanking, version 2. `video_optimized` applies the 1000/1001 rate multiplier.
pub fn cvt_rb2(width: u32, height: u32, rr: u32, video_optimized: bool) -> Result<Timing> {
    check_input(width, height, rr)?;
    let h_pixels = width as u64;
    let v_lines = height as u64;

    let h_period_ps = (PICOS_PER_SECOND / rr as u64)
        .checked_sub(RB_MIN_V_BLANK_US * PICOS_PER_MICRO)
        .ok_or_else(|| Error::OutOfRange(format!("Refresh rate {} is too high for CVT-RB2", rr)))?
        / v_lines.max(1);
    if h_period_ps == 0 {
        return Err(Error::OutOfRange(format!("Raster {}x{} is too tall for CVT-RB2", width, height)));
    }
    let vbi_lines = (RB_MIN_V_BLANK_US * PICOS_PER_MICRO / h_period_ps + 1)
        .max(RB2_MIN_V_FRONT_PORCH + RB2_V_SYNC + RB2_V_BACK_PORCH);
    let v_total = v_lines + vbi_lines;
    let h_total = h_pixels + RB2_H_BLANK;
    let mut pclk_hz = rr as u64 * v_total * h_total;
    if video_optimized {
        pclk_hz = pclk_hz * 1000 / 1001;
    }
    pclk_hz = pclk_hz / RB2_CLOCK_STEP_HZ * RB2_CLOCK_STEP_HZ;

    let timing = Timing {
        h_visible: to_u16(h_pixels, "HVisible")?,
        h_front_porch: RB2_H_FRONT_PORCH as u16,
        h_sync_width: RB2_H_SYNC as u16,
        h_total: to_u16(h_total, "HTotal")?,
        h_sync_polarity: Polarity::Positive,
        v_visible: to_u16(v_lines, "VVisible")?,
        v_front_porch: to_u16(vbi_lines - RB2_V_SYNC - RB2_V_BACK_PORCH, "VFrontPorch")?,
        v_sync_width: RB2_V_SYNC as u16,
        v_total: to_u16(v_total, "VTotal")?,
        v_sync_polarity: Polarity::Negative,
        interlaced: false,
        pclk: ((pclk_hz + 5_000) / 10_000) as u32,
        pclk_1khz: (pclk_hz / 1_000) as u32,
        flags: TimingFlags::ReducedBlanking,
        pixel_repetition: 1,
        ..Timing::default()
    };
    let mut timing = finish(timing, rr, TimingType::CvtRb2, "CVT-RB2")?;
    if video_optimized {
        timing.refresh_rate = calc_rr(timing.pclk, false, timing.h_total, timing.v_total);
    }
    Ok(timing)
}
