// SPDX-License-Identifier: MIT

use crate::edid::descriptor::{Cvt3ByteCode, CvtRates, RangeLimits};
use crate::formula::{calc_cvt_rb, calc_dmt, calc_gtf, cvt};
use crate::timing::{Timing, TimingStatus, TimingType};
use crate::{Error, Result};
use log::{debug, trace};

const ASPECT_MASK: u16 = 0xC0;
const ASPECT_16X10: u16 = 0x00;
const ASPECT_4X3: u16 = 0x40;
const ASPECT_5X4: u16 = 0x80;

/// Standard timing code as stored in the EDID: byte 0 in the low half, byte 1 in the high half.
pub fn is_unused_code(code: u16) -> bool {
    code == 0 || code & 0xFF == 0x01
}

/// Raster and refresh rate of a standard timing code. Before EDID 1.3 the 16:10 aspect
/// code meant 1:1.
pub fn decode_standard_code(code: u16, version: u16) -> (u32, u32, u32) {
    let width = ((code & 0xFF) as u32 + 31) * 8;
    let rr = ((code >> 8) & 0x3F) as u32 + 60;
    let height = match (code >> 8) & ASPECT_MASK {
        ASPECT_16X10 if version < 0x103 => width,
        ASPECT_16X10 => width * 5 / 8,
        ASPECT_4X3 => width * 3 / 4,
        ASPECT_5X4 => width * 4 / 5,
        _ => width * 9 / 16,
    };
    (width, height, rr)
}

/// Resolves a standard timing code: the DMT raster when there is one, otherwise CVT for
/// EDID 1.4 and GTF before it. Synthesized rasters above the range limits pixel clock
/// are rejected.
pub fn parse_standard_timing(
    code: u16,
    version: u16,
    seq: u8,
    range_limits: Option<&RangeLimits>,
) -> Result<Timing> {
    if is_unused_code(code) {
        return Err(Error::InvalidDescriptor(format!("Standard timing code 0x{:04X} is unused", code)));
    }
    let (width, height, rr) = decode_standard_code(code, version);
    if width <= 256 {
        return Err(Error::InvalidDescriptor(format!("Standard timing width {} is too small", width)));
    }
    trace!("Standard timing 0x{:04X}: {}x{}@{}", code, width, height, rr);

    let (mut timing, formula) = match calc_dmt(width, height, rr, false) {
        Ok(timing) => (timing, "DMT"),
        Err(_) if version >= 0x104 => (cvt::cvt(width, height, rr, false)?, "CVT"),
        Err(_) => (calc_gtf(width, height, rr, false)?, "GTF"),
    };
    if formula != "DMT" {
        check_max_pclk(&timing, range_limits)?;
    }
    timing.status = TimingStatus::of(TimingType::EdidStd, seq);
    timing.set_name(format!("EDID-STD({}):{}x{}x{}Hz", formula, width, height, rr));
    debug!("Standard timing {}", timing.name);
    Ok(timing)
}

fn check_max_pclk(timing: &Timing, range_limits: Option<&RangeLimits>) -> Result<()> {
    match range_limits {
        Some(limits) if limits.max_pclk_mhz != 0 && timing.pclk > limits.max_pclk_mhz as u32 * 100 => {
            Err(Error::OutOfRange(format!(
                "{} needs {} MHz, limit is {} MHz",
                timing.name,
                timing.pclk / 100,
                limits.max_pclk_mhz
            )))
        }
        _ => Ok(()),
    }
}

/// Timings of one 3-byte CVT code, one per supported rate bit in ascending bit order.
/// The 60 Hz reduced blanking bit uses CVT-RB, the others standard CVT.
pub fn cvt_3byte_timings(code: &Cvt3ByteCode) -> Vec<Timing> {
    if code.lines == 0 {
        return Vec::new();
    }
    let height = code.lines as u32;
    let width = code.width();
    [
        (CvtRates::Rate60Reduced, 60),
        (CvtRates::Rate85, 85),
        (CvtRates::Rate75, 75),
        (CvtRates::Rate60, 60),
        (CvtRates::Rate50, 50),
    ]
    .into_iter()
    .filter(|(rate, _)| code.rates.contains(*rate))
    .filter_map(|(rate, rr)| {
        let timing = if rate == CvtRates::Rate60Reduced {
            calc_cvt_rb(width, height, rr, false)
        } else {
            cvt::cvt(width, height, rr, false)
        };
        match timing {
            Ok(timing) => Some(timing),
            Err(e) => {
                debug!("CVT 3-byte code {}x{}@{} dropped: {}", width, height, rr, e);
                None
            }
        }
    })
    .collect()
}
