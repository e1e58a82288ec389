// SPDX-License-Identifier: MIT

use crate::cta861::vsdb::{hdmi_stereo_timing, Stereo3dStructure};
use crate::edid::descriptor::{CvtAspects, CvtBlanking, CvtScaling, LongDisplayDescriptor, RangeLimits};
use crate::edid::{FeatureSupport, MonitorInfo, EDID_VERSION_1_4};
use crate::formula::calc_cvt_rb;
use crate::timing::{
    is_rounded_rr_equal, rrx1k_to_pclk, AspectRatio, Mismatch, Timing, TimingFlags, TimingStatus,
    TimingType,
};
use crate::{Error, Result};
use log::{debug, trace};

const ASPECT_4X3: AspectRatio = AspectRatio::new(4, 3);
const ASPECT_16X9: AspectRatio = AspectRatio::new(16, 9);

fn abs_delta(a: u32, b: u32) -> u32 {
    a.abs_diff(b)
}

fn area(timing: &Timing) -> u32 {
    timing.h_visible as u32 * timing.v_visible as u32
}

/// 16:10 and wider.
fn is_wide_aspect(width: u32, height: u32) -> bool {
    width * 5 >= height * 8
}

#[derive(Debug, Copy, Clone)]
struct Request {
    width: u32,
    height: u32,
    rr: u32,
    rrx1k: u32,
    flags: TimingFlags,
}

impl Request {
    fn interlaced(&self) -> bool {
        self.flags.intersects(TimingFlags::interlace_mask())
    }

    fn is_exact(&self, timing: &Timing) -> bool {
        !self.flags.contains(TimingFlags::MaxEdidTiming)
            && self.width == timing.h_visible as u32
            && self.height == timing.frame_height()
            && self.rr == timing.refresh_rate as u32
            && (self.rrx1k == 0 || self.rrx1k == timing.refresh_rate_x1k)
            && self.interlaced() == timing.interlaced
    }

    fn is_same_mode(&self, timing: &Timing) -> bool {
        self.width == timing.h_visible as u32
            && self.height == timing.frame_height()
            && self.rr == timing.refresh_rate as u32
    }

    fn fits(&self, timing: &Timing) -> bool {
        self.width <= timing.h_visible as u32 && self.height <= timing.frame_height()
    }

    fn prefers_aspect(&self, aspect: AspectRatio) -> bool {
        (self.flags.contains(TimingFlags::Cea4x3) && aspect == ASPECT_4X3)
            || (self.flags.contains(TimingFlags::Cea16x9) && aspect == ASPECT_16X9)
    }

    /// Whether `candidate`, which fits the request, is at least as close as `best`. Between
    /// two timings of the same size the closer refresh rate wins.
    fn is_closer(&self, candidate: &Timing, best: &Timing) -> bool {
        let closer = abs_delta(candidate.h_visible as u32, self.width)
            <= abs_delta(best.h_visible as u32, self.width)
            && abs_delta(candidate.frame_height(), self.height)
                <= abs_delta(best.frame_height(), self.height);
        if !closer {
            return false;
        }
        if candidate.h_visible == best.h_visible && candidate.frame_height() == best.frame_height() {
            abs_delta(candidate.refresh_rate as u32, self.rr) < abs_delta(best.refresh_rate as u32, self.rr)
        } else {
            true
        }
    }

    fn mismatch(&self, timing: &Timing) -> Mismatch {
        let mut mismatch = Mismatch::empty();
        if timing.h_visible as u32 != self.width || timing.frame_height() != self.height {
            mismatch |= Mismatch::Size;
        }
        if !is_rounded_rr_equal(timing.refresh_rate, timing.refresh_rate_x1k, self.rr as u16) {
            mismatch |= Mismatch::RefreshRate;
        }
        if timing.interlaced != self.interlaced() {
            mismatch |= Mismatch::Format;
        }
        mismatch
    }
}

/// Best candidate indices collected in a single pass over the table.
#[derive(Debug, Default)]
struct Candidates {
    exact: Option<usize>,
    cea: Option<usize>,
    same_scan: Option<usize>,
    any_scan: Option<usize>,
    native: Option<usize>,
    same_refresh: Option<usize>,
    preferred_cea: Option<usize>,
    preferred_displayid: Option<usize>,
    preferred_dtd1: Option<usize>,
    dtd1: Option<usize>,
    max: usize,
}

impl Candidates {
    fn nothing_fits(&self) -> bool {
        self.preferred_displayid.is_none()
            && self.preferred_dtd1.is_none()
            && self.dtd1.is_none()
            && self.exact.is_none()
            && self.same_scan.is_none()
            && self.any_scan.is_none()
            && self.native.is_none()
            && self.same_refresh.is_none()
    }
}

enum Scan {
    Preferred(usize),
    Ranked(Candidates),
}

fn closest(timings: &[Timing], request: &Request, best: Option<usize>, index: usize) -> Option<usize> {
    match best {
        Some(best) if !request.is_closer(&timings[index], &timings[best]) => Some(best),
        _ => Some(index),
    }
}

fn scan(timings: &[Timing], request: &Request) -> Scan {
    let mut c = Candidates::default();
    for (i, timing) in timings.iter().enumerate() {
        let cust_entry = timing.status.cust_entry();
        if cust_entry && request.flags.intersects(TimingFlags::Native | TimingFlags::EdidTiming) {
            continue;
        }

        if request.is_exact(timing) {
            c.exact.get_or_insert(i);
            if timing.is_preferred_cta()
                || (!request.flags.contains(TimingFlags::Edid861St) && timing.is_preferred_dtd1())
                || timing.is_preferred_displayid()
                || timing.is_native()
            {
                trace!("Preferred exact match {}", timing.name);
                return Scan::Preferred(i);
            }
            if timing.status.is_cta861() {
                match c.cea {
                    None => c.cea = Some(i),
                    Some(_) if request.prefers_aspect(timing.aspect) => c.cea = Some(i),
                    _ => {}
                }
            }
        }

        if (timing.status.is_type(TimingType::Cust) || cust_entry) && !request.is_same_mode(timing) {
            continue;
        }

        if c.preferred_cea.is_none() && timing.is_preferred_cta() {
            c.preferred_cea = Some(i);
        }
        // a request at 1 Hz asks for the first DisplayID preferred timing at any rate
        if request.rr != 1 {
            if timing.refresh_rate as u32 == request.rr && timing.is_preferred_displayid() {
                c.preferred_displayid = Some(i);
            }
        } else if c.preferred_displayid.is_none() && timing.is_preferred_displayid() {
            c.preferred_displayid = Some(i);
        }
        if timing.is_preferred_dtd1() {
            c.preferred_dtd1 = Some(i);
        }
        if timing.status.is_dtd1() {
            c.dtd1 = Some(i);
        }
        if area(timing) > area(&timings[c.max]) {
            c.max = i;
        }

        if request.fits(timing) {
            if request.interlaced() == timing.interlaced {
                c.same_scan = closest(timings, request, c.same_scan, i);
            }
            c.any_scan = closest(timings, request, c.any_scan, i);
        }

        if (timing.is_native() || timing.status.is_dtd1()) && request.fits(timing) {
            c.native = match c.native {
                Some(best)
                    if abs_delta(timing.h_visible as u32, request.width)
                        > abs_delta(timings[best].h_visible as u32, request.width)
                        || abs_delta(timing.frame_height(), request.height)
                            > abs_delta(timings[best].frame_height(), request.height) =>
                {
                    Some(best)
                }
                _ => Some(i),
            };
        }

        if request.rr == timing.refresh_rate as u32
            && request.width <= timing.h_visible as u32
            && request.height <= timing.v_visible as u32
        {
            c.same_refresh = match c.same_refresh {
                Some(best)
                    if abs_delta(timing.h_visible as u32, request.width)
                        > abs_delta(timings[best].h_visible as u32, request.width)
                        || abs_delta(timing.v_visible as u32, request.height)
                            > abs_delta(timings[best].v_visible as u32, request.height) =>
                {
                    Some(best)
                }
                _ => Some(i),
            };
        }
    }
    Scan::Ranked(c)
}

fn cvt_aspect(aspect: CvtAspects) -> Option<(u32, u32)> {
    match aspect {
        CvtAspects::Aspect15x9 => Some((15, 9)),
        CvtAspects::Aspect5x4 => Some((5, 4)),
        CvtAspects::Aspect16x10 => Some((16, 10)),
        CvtAspects::Aspect16x9 => Some((16, 9)),
        CvtAspects::Aspect4x3 => Some((4, 3)),
        _ => None,
    }
}

/// First CVT range-limits descriptor whose aspect ratios or scaling support cover the request.
fn cvt_range_limits<'a>(info: &'a MonitorInfo, request: &Request) -> Option<&'a RangeLimits> {
    let mut min_height = u32::MAX;
    let mut max_height = 0;
    let range_limits = info.descriptors.iter().filter_map(|descriptor| match &descriptor.descriptor {
        LongDisplayDescriptor::RangeLimits(limits) => Some(limits),
        _ => None,
    });
    for limits in range_limits {
        let Some(cvt) = limits.cvt() else {
            continue;
        };
        let mut supported = false;
        if request.width <= cvt.max_active_pixels || cvt.scaling.contains(CvtScaling::HorizontalShrink) {
            for (horizontal, vertical) in cvt.aspects.iter().filter_map(cvt_aspect) {
                let height = request.width * vertical / horizontal;
                supported = request.width * vertical / request.height == horizontal;
                min_height = min_height.min(height);
                max_height = max_height.max(height);
                if supported {
                    break;
                }
            }
        }
        if (min_height < request.height && cvt.scaling.contains(CvtScaling::VerticalShrink))
            || (max_height > request.height && cvt.scaling.contains(CvtScaling::VerticalStretch))
        {
            supported = true;
        }
        if supported {
            return Some(limits);
        }
    }
    None
}

/// Synthesizes a progressive CVT timing within the monitor's CVT range limits, reduced
/// blanking first.
fn cvt_fallback(info: &MonitorInfo, request: &Request) -> Option<Timing> {
    let limits = cvt_range_limits(info, request)?;
    let cvt = limits.cvt()?;
    let reduced = if cvt.blanking.contains(CvtBlanking::Reduced) {
        calc_cvt_rb(request.width, request.height, request.rr, false).ok()
    } else {
        None
    };
    let timing = match reduced {
        Some(timing) => timing,
        None if cvt.blanking.contains(CvtBlanking::Standard) => {
            crate::formula::cvt::cvt(request.width, request.height, request.rr, false).ok()?
        }
        None => return None,
    };
    if timing.pclk > limits.max_pclk_10khz() {
        debug!(
            "{} exceeds the maximum pixel clock of {} MHz",
            timing.name, limits.max_pclk_mhz
        );
        return None;
    }
    Some(timing)
}

fn pick(info: &MonitorInfo, request: &Request, c: &Candidates) -> Timing {
    let timings = &info.timings;
    let flags = request.flags;
    let first = || timings[0].clone();
    let at = |index: usize| timings[index].clone();

    if flags.contains(TimingFlags::NvPreferred) {
        return c
            .preferred_displayid
            .or(c.preferred_cea)
            .or(c.preferred_dtd1)
            .or(c.dtd1)
            .map_or_else(first, at);
    }
    if flags.contains(TimingFlags::Dtd1Timing) {
        return c.dtd1.map_or_else(first, at);
    }
    if flags.contains(TimingFlags::MaxEdidTiming) && !flags.contains(TimingFlags::Edid861St) {
        return at(c.max);
    }
    if flags.intersects(TimingFlags::Cea4x3 | TimingFlags::Cea16x9 | TimingFlags::Edid861St) {
        if let Some(cea) = c.cea {
            return at(cea);
        }
    }
    if flags.contains(TimingFlags::Native) {
        if let Some(native) = c.native {
            // another rate of the native size
            return match c.exact {
                Some(exact)
                    if timings[exact].h_visible == timings[native].h_visible
                        && timings[exact].v_visible == timings[native].v_visible =>
                {
                    at(exact)
                }
                _ => at(native),
            };
        }
    }
    if let Some(exact) = c.exact {
        return at(exact);
    }
    if flags.contains(TimingFlags::EdidTimingRrMatch) {
        if let Some(same_refresh) = c.same_refresh {
            return at(same_refresh);
        }
    }
    if let Some(index) = c.same_scan.or(c.any_scan) {
        return at(index);
    }
    if let Some(dtd1) = c.dtd1 {
        let timing = &timings[dtd1];
        if request.width <= timing.h_visible as u32 && request.height <= timing.v_visible as u32 {
            return timing.clone();
        }
    }
    if c.nothing_fits()
        && info.version >= EDID_VERSION_1_4
        && info.features.contains(FeatureSupport::ContinuousFrequency)
        && !request.interlaced()
    {
        if let Some(timing) = cvt_fallback(info, request) {
            return timing;
        }
    }
    at(c.max)
}

/// [`get_timing_ex`] without a fractional refresh rate.
pub fn get_timing(
    info: &MonitorInfo,
    width: u32,
    height: u32,
    rr: u32,
    flags: TimingFlags,
) -> Result<Timing> {
    get_timing_ex(info, width, height, rr, flags, 0)
}

/// Picks the table entry that serves a `width`x`height` mode at `rr` Hz best. `rrx1k` narrows
/// exact matches to one fractional rate when non-zero.
///
/// An exact match that is preferred or native is returned as soon as the scan reaches it.
/// Otherwise the closest candidate is chosen following `flags`, falling back to a CVT timing
/// inside the monitor's range limits and finally to the largest timing. The result always
/// carries mismatch bits describing how it differs from the request.
pub fn get_timing_ex(
    info: &MonitorInfo,
    width: u32,
    height: u32,
    rr: u32,
    flags: TimingFlags,
    rrx1k: u32,
) -> Result<Timing> {
    if info.timings.is_empty() {
        return Err(Error::ErrorMessage("Monitor has no timings".to_string()));
    }
    if width == 0 || height == 0 || rr == 0 {
        return Err(Error::OutOfRange(format!(
            "Mode {}x{}x{}Hz can't be selected",
            width, height, rr
        )));
    }
    let request = Request {
        width,
        height,
        rr,
        rrx1k,
        flags,
    };
    let mut timing = match scan(&info.timings, &request) {
        Scan::Preferred(index) => info.timings[index].clone(),
        Scan::Ranked(candidates) => {
            trace!("Selector candidates {:?}", candidates);
            pick(info, &request, &candidates)
        }
    };
    let mismatch = request.mismatch(&timing);
    timing.status.set_mismatch(timing.status.mismatch() | mismatch);
    debug!("Selected {} for {}x{}x{}Hz, mismatch {:?}", timing.name, width, height, rr, mismatch);
    Ok(timing)
}

/// 3D frame of an exactly matching CTA-861 timing whose VIC lists `structure` in the HDMI
/// 3D map. Side-by-side half also needs the matching subsampling detail.
pub fn get_hdmi_stereo_timing(
    info: &MonitorInfo,
    width: u32,
    height: u32,
    rr: u32,
    structure: Stereo3dStructure,
    side_by_side_half_detail: u8,
    flags: TimingFlags,
) -> Result<Timing> {
    let flags = (flags | TimingFlags::EdidTiming | TimingFlags::EdidTimingRrMatch | TimingFlags::Edid861St)
        - TimingFlags::MaxEdidTiming;
    let timing = get_timing(info, width, height, rr, flags)?;
    if !timing.status.mismatch().is_empty() || !timing.status.is_cta861() {
        return Err(Error::ErrorMessage(format!(
            "No CTA-861 timing for {}x{}x{}Hz",
            width, height, rr
        )));
    }
    let vic = timing.status.cea_format();
    let supported = info.hdmi_3d.find(vic).map_or(false, |entry| {
        entry.structures.contains(structure.into())
            && (structure != Stereo3dStructure::SideBySideHalf
                || entry.side_by_side_half_detail == side_by_side_half_detail)
    });
    if !supported {
        return Err(Error::ErrorMessage(format!(
            "VIC {} has no 3D structure {}",
            vic, structure
        )));
    }
    Ok(hdmi_stereo_timing(&timing, structure))
}

/// Letterboxes the closest timing when the requested mode differs in aspect ratio from the
/// native one in exactly one dimension. The blanking grows by the removed active area and the
/// pixel clock follows a different refresh rate.
pub fn aspect_corrected_timing(info: &MonitorInfo, width: u16, height: u16, rr: u16) -> Result<Timing> {
    if info.timings.is_empty() || width == 0 || height == 0 {
        return Err(Error::OutOfRange(format!(
            "No aspect corrected timing for {}x{}",
            width, height
        )));
    }
    let mut timing = get_timing(info, width as u32, height as u32, rr as u32, TimingFlags::empty())?;
    if !timing.status.mismatch().contains(Mismatch::Size) {
        return Ok(timing);
    }

    let native = info
        .timings
        .iter()
        .find(|t| t.is_native() || t.status.is_dtd1())
        .ok_or_else(|| Error::ErrorMessage("Monitor has no native timing".to_string()))?;
    if is_wide_aspect(width as u32, height as u32)
        == is_wide_aspect(native.h_visible as u32, native.v_visible as u32)
    {
        return Err(Error::ErrorMessage(format!(
            "{}x{} has the aspect class of the native {}x{}",
            width, height, native.h_visible, native.v_visible
        )));
    }

    if !timing.interlaced
        && native.h_visible as u32 * height as u32 != native.v_visible as u32 * width as u32
        && (width == timing.h_visible || height == timing.v_visible)
    {
        timing.h_front_porch += timing.h_visible.saturating_sub(width) / 2;
        timing.v_front_porch += timing.v_visible.saturating_sub(height) / 2;
        timing.h_visible = width;
        timing.v_visible = height;
        if rr != timing.refresh_rate {
            timing.refresh_rate_x1k = rr as u32 * 1000;
            timing.pclk = rrx1k_to_pclk(&timing);
        }
        timing.status = TimingStatus::of(TimingType::Aspr, 0);
        timing.set_name(format!("ASPR:{}x{}x{}Hz", width, height, rr));
        return Ok(timing);
    }
    Err(Error::ErrorMessage(format!(
        "{}x{} can't be letterboxed into {}",
        width, height, timing.name
    )))
}
