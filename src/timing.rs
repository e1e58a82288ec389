// SPDX-License-Identifier: MIT

use bitflags::bitflags;
use modular_bitfield::prelude::*;
use serde::Serialize;
use std::fmt::{Debug, Display, Formatter};
use strum::FromRepr;

/// Upper bound of entries kept in a [`crate::table::TimingTable`].
pub const MAX_TOTAL_TIMING: usize = 128;

/// Length of the diagnostic name kept with every timing, including the terminator slot.
pub const TIMING_NAME_LENGTH: usize = 51;

/// Sync polarity as stored by the display hardware: 0 is positive, 1 is negative.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub enum Polarity {
    #[default]
    Positive = 0,
    Negative = 1,
}

impl Polarity {
    pub fn from_positive(positive: bool) -> Self {
        if positive {
            Polarity::Positive
        } else {
            Polarity::Negative
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, FromRepr, strum::Display)]
#[repr(u8)]
pub enum TimingType {
    Unknown = 0,
    Dmt = 1,
    Gtf = 2,
    Aspr = 3,
    NtscTv = 4,
    PalTv = 5,
    Cvt = 6,
    CvtRb = 7,
    Cust = 8,
    EdidDtd = 9,
    EdidStd = 10,
    EdidEst = 11,
    EdidCvt = 12,
    Edid861St = 13,
    NvPredefined = 14,
    DmtRb = 15,
    EdidExtDtd = 16,
    Sdtv = 17,
    Hdtv = 18,
    Smpte = 19,
    VtbExt = 20,
    VtbExtStd = 21,
    VtbExtDtd = 22,
    VtbExtCvt = 23,
    HdmiStereo = 24,
    DisplayId1 = 25,
    DisplayId2 = 26,
    HdmiExt = 27,
    CustAuto = 28,
    CustManual = 29,
    CvtRb2 = 30,
    DmtRb2 = 31,
    DisplayId7 = 32,
    DisplayId8 = 33,
    DisplayId9 = 34,
    DisplayId10 = 35,
    CvtRb3 = 36,
    Cta861DidT7 = 37,
    Cta861DidT8 = 38,
    Cta861DidT10 = 39,
}

bitflags! {
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
    pub struct Mismatch: u8 {
        const Size = 0x1;
        const RefreshRate = 0x2;
        const Format = 0x4;
        const Alignment = 0x8;
    }
}

/// Packed 32-bit status word: origin of a timing, its sequence number inside that origin,
/// mismatch bits set by the selector, the CTA-861 VIC it is known as and two marker bits.
#[bitfield]
#[derive(Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimingStatus {
    pub seq: u8,
    pub raw_type: u8,
    pub raw_mismatch: B5,
    pub cea_dmt_dual_standard: bool,
    pub cea_format: u8,
    pub cust_entry: bool,
    pub native: bool,
}

impl TimingStatus {
    pub fn of(timing_type: TimingType, seq: u8) -> Self {
        Self::new()
            .with_raw_type(timing_type as u8)
            .with_seq(seq)
    }

    pub fn from_u32(value: u32) -> Self {
        Self::from_bytes(value.to_le_bytes())
    }

    pub fn to_u32(&self) -> u32 {
        u32::from_le_bytes(self.into_bytes())
    }

    pub fn timing_type(&self) -> TimingType {
        TimingType::from_repr(self.raw_type()).unwrap_or(TimingType::Unknown)
    }

    pub fn mismatch(&self) -> Mismatch {
        Mismatch::from_bits_truncate(self.raw_mismatch())
    }

    pub fn set_mismatch(&mut self, mismatch: Mismatch) {
        self.set_raw_mismatch(mismatch.bits() & 0x1F);
    }

    pub fn is_type(&self, timing_type: TimingType) -> bool {
        self.raw_type() == timing_type as u8
    }

    pub fn is_dtd1(&self) -> bool {
        self.is_type(TimingType::EdidDtd) && self.seq() == 1
    }

    pub fn is_cta861(&self) -> bool {
        self.is_type(TimingType::Edid861St)
    }
}

impl Debug for TimingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingStatus")
            .field("type", &self.timing_type())
            .field("seq", &self.seq())
            .field("mismatch", &self.mismatch())
            .field("cea_format", &self.cea_format())
            .field("cust_entry", &self.cust_entry())
            .field("native", &self.native())
            .finish()
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimingFlags(u32);
bitflags! {
    impl TimingFlags: u32 {
        const Interlaced = 0x00000001;
        const InterlacedNoExtraVblank = 0x00000002;
        const DoubleScan = 0x00000010;
        const ReducedBlanking = 0x00000020;
        const MaxEdidTiming = 0x00000040;
        const NvDoubleScan = 0x00000080;
        const Native = 0x00000100;
        const EdidTiming = 0x00000200;
        const Cea4x3 = 0x00000400;
        const Cea16x9 = 0x00000800;
        const OsAdded = 0x00001000;
        const SpectrumSpread = 0x00002000;
        const EdidTimingRrMatch = 0x00004000;
        const Edid861St = 0x00008000;
        const EdidDtdEizoSplit = 0x00010000;
        const Dtd1Timing = 0x00020000;
        const NvPreferred = 0x00040000;
        const Dtd1Preferred = 0x00080000;
        const DisplayIdDtdPreferred = 0x00100000;
        const CtaPreferred = 0x00200000;
        const DisplayIdT7DscPassthrough = 0x00400000;
        const DisplayId20Timing = 0x00800000;
        const ExplicitYuv420 = 0x01000000;
        const CtaNative = 0x02000000;
        const CtaOvt = 0x04000000;
        const CtaOvtFrr = 0x08000000;
    }
}

impl TimingFlags {
    pub fn interlace_mask() -> Self {
        Self::Interlaced | Self::InterlacedNoExtraVblank
    }
}

/// One bit per supported bits-per-component value.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColorDepth(u8);
bitflags! {
    impl ColorDepth: u8 {
        const Bpc6 = 0b00000001;
        const Bpc8 = 0b00000010;
        const Bpc10 = 0b00000100;
        const Bpc12 = 0b00001000;
        const Bpc14 = 0b00010000;
        const Bpc16 = 0b00100000;
    }
}

impl ColorDepth {
    /// Builds a depth set from a bitmap laid out bpc6 at bit 0 through bpc16 at bit 5.
    pub fn from_bitmap(bitmap: u8) -> Self {
        Self::from_bits_truncate(bitmap)
    }

    /// Depths of `bpc` and everything below it down to 8.
    pub fn up_to(bpc: u8) -> Self {
        let mut depth = Self::Bpc8;
        if bpc >= 10 {
            depth |= Self::Bpc10;
        }
        if bpc >= 12 {
            depth |= Self::Bpc12;
        }
        if bpc >= 14 {
            depth |= Self::Bpc14;
        }
        if bpc >= 16 {
            depth |= Self::Bpc16;
        }
        depth
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColorFormats {
    pub rgb444: ColorDepth,
    pub yuv444: ColorDepth,
    pub yuv422: ColorDepth,
    pub yuv420: ColorDepth,
}

impl ColorFormats {
    pub fn rgb8() -> Self {
        Self {
            rgb444: ColorDepth::Bpc8,
            ..Self::default()
        }
    }

    pub fn union(&mut self, other: &ColorFormats) {
        self.rgb444 |= other.rgb444;
        self.yuv444 |= other.yuv444;
        self.yuv422 |= other.yuv422;
        self.yuv420 |= other.yuv420;
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AspectRatio {
    pub horizontal: u16,
    pub vertical: u16,
}

impl AspectRatio {
    pub const fn new(horizontal: u16, vertical: u16) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    pub fn from_packed(packed: u32) -> Self {
        Self::new((packed >> 16) as u16, packed as u16)
    }

    pub fn packed(&self) -> u32 {
        (self.horizontal as u32) << 16 | self.vertical as u32
    }

    pub fn is_zero(&self) -> bool {
        self.horizontal == 0 && self.vertical == 0
    }
}

impl Display for AspectRatio {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.horizontal, self.vertical)
    }
}

/// A normalized video timing. Pixel clock is in 10 kHz units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timing {
    pub h_visible: u16,
    pub h_border: u16,
    pub h_front_porch: u16,
    pub h_sync_width: u16,
    pub h_total: u16,
    pub h_sync_polarity: Polarity,

    pub v_visible: u16,
    pub v_border: u16,
    pub v_front_porch: u16,
    pub v_sync_width: u16,
    pub v_total: u16,
    pub v_sync_polarity: Polarity,

    pub interlaced: bool,
    pub pclk: u32,
    pub pclk_1khz: u32,

    pub flags: TimingFlags,
    pub refresh_rate: u16,
    pub refresh_rate_x1k: u32,
    pub aspect: AspectRatio,
    pub pixel_repetition: u16,
    pub color: ColorFormats,
    pub status: TimingStatus,
    pub name: String,
}

impl Timing {
    pub fn frame_height(&self) -> u32 {
        frame_height(self.v_visible, self.interlaced)
    }

    pub fn set_name(&mut self, name: String) {
        let mut name = name;
        name.truncate(TIMING_NAME_LENGTH - 1);
        self.name = name;
    }

    /// Refresh rates recomputed from the raster.
    pub fn update_refresh_rates(&mut self) {
        self.refresh_rate = calc_rr(self.pclk, self.interlaced, self.h_total, self.v_total);
        self.refresh_rate_x1k = calc_rrx1k(self.pclk, self.interlaced, self.h_total, self.v_total);
    }

    pub fn is_preferred_dtd1(&self) -> bool {
        self.status.is_dtd1() && self.flags.contains(TimingFlags::Dtd1Preferred)
    }

    pub fn is_preferred_displayid(&self) -> bool {
        self.flags.contains(TimingFlags::DisplayIdDtdPreferred)
    }

    pub fn is_preferred_cta(&self) -> bool {
        self.flags.contains(TimingFlags::CtaPreferred)
    }

    pub fn is_native(&self) -> bool {
        self.status.native()
    }

    /// The hardware form of the pixel clock, in 1 kHz units.
    pub fn pclk_khz(&self) -> u32 {
        if self.pclk_1khz != 0 {
            self.pclk_1khz
        } else {
            self.pclk * 10
        }
    }
}

pub fn frame_height(v_visible: u16, interlaced: bool) -> u32 {
    v_visible as u32 * if interlaced { 2 } else { 1 }
}

fn total_pixels_in_two_fields(interlaced: bool, h_total: u16, v_total: u16) -> u64 {
    let h_total = h_total as u64;
    let v_total = v_total as u64;
    if interlaced {
        h_total * (v_total * 2 + 1)
    } else {
        h_total * v_total * 2
    }
}

/// Integer refresh rate in Hz, rounded to nearest.
pub fn calc_rr(pclk: u32, interlaced: bool, h_total: u16, v_total: u16) -> u16 {
    let total = total_pixels_in_two_fields(interlaced, h_total, v_total);
    if total == 0 {
        return 0;
    }
    ((pclk as u64 * 10000 * 2 + total / 2) / total) as u16
}

/// Refresh rate in 0.001 Hz, truncated.
pub fn calc_rrx1k(pclk: u32, interlaced: bool, h_total: u16, v_total: u16) -> u32 {
    let total = total_pixels_in_two_fields(interlaced, h_total, v_total);
    if total == 0 {
        return 0;
    }
    (pclk as u64 * 10_000_000 * 2 / total) as u32
}

/// Pixel clock in 10 kHz units for the raster of `timing` at its `refresh_rate_x1k`.
pub fn rrx1k_to_pclk(timing: &Timing) -> u32 {
    let total = total_pixels_in_two_fields(timing.interlaced, timing.h_total, timing.v_total);
    (total * timing.refresh_rate_x1k as u64 / 2 / 10_000_000) as u32
}

/// Both refresh rates round to the same integer band `[rrx1k / 1000, (rrx1k + 500) / 1000]`.
pub fn is_rounded_rr_equal(rr1: u16, rr1x1k: u32, rr2: u16) -> bool {
    let low = rr1x1k / 1000;
    let high = (rr1x1k + 500) / 1000;
    (rr1 as u32) >= low && (rr1 as u32) <= high && (rr2 as u32) >= low && (rr2 as u32) <= high
}

fn is_raster_equal(t1: &Timing, t2: &Timing) -> bool {
    t1.h_visible == t2.h_visible
        && t1.h_border == t2.h_border
        && t1.h_front_porch == t2.h_front_porch
        && t1.h_sync_width == t2.h_sync_width
        && t1.h_total == t2.h_total
        && t1.v_visible == t2.v_visible
        && t1.v_border == t2.v_border
        && t1.v_front_porch == t2.v_front_porch
        && t1.v_sync_width == t2.v_sync_width
        && t1.v_total == t2.v_total
        && t1.interlaced == t2.interlaced
}

/// Same raster, polarity and pixel clock.
pub fn is_exact_equal(t1: &Timing, t2: &Timing) -> bool {
    is_raster_equal(t1, t2)
        && t1.h_sync_polarity == t2.h_sync_polarity
        && t1.v_sync_polarity == t2.v_sync_polarity
        && t1.pclk == t2.pclk
}

/// [`is_exact_equal`] that also requires the same fractional refresh rate.
pub fn is_exact_equal_ex(t1: &Timing, t2: &Timing) -> bool {
    is_exact_equal(t1, t2) && t1.refresh_rate_x1k == t2.refresh_rate_x1k
}

/// Same raster and refresh rate, sync polarity and small clock differences are ignored.
pub fn is_relaxed_equal(t1: &Timing, t2: &Timing) -> bool {
    is_raster_equal(t1, t2) && t1.refresh_rate == t2.refresh_rate
}

#[cfg(test)]
mod tests {
    use crate::timing::*;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    #[test]
    fn test_status_word_layout() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut status = TimingStatus::of(TimingType::EdidDtd, 1);
        assert_eq!(0x0000_0901, status.to_u32());
        status.set_native(true);
        status.set_cea_format(16);
        status.set_mismatch(Mismatch::Size | Mismatch::RefreshRate);
        assert_eq!(0x8000_0000 | 16 << 22 | 0x3 << 16 | 0x0901, status.to_u32());
        assert!(status.is_dtd1());
        assert_eq!(TimingType::EdidDtd, status.timing_type());
        assert_eq!(status, TimingStatus::from_u32(status.to_u32()));
    }

    #[test]
    fn test_refresh_rates() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        assert_eq!(60, calc_rr(14850, false, 2200, 1125));
        assert_eq!(60000, calc_rrx1k(14850, false, 2200, 1125));
        assert_eq!(60, calc_rr(2518, false, 800, 525));
        assert_eq!(59952, calc_rrx1k(2518, false, 800, 525));
        assert_eq!(60, calc_rr(7425, true, 2200, 562));
        assert_eq!(0, calc_rr(7425, false, 0, 562));
    }

    #[test]
    fn test_rounded_rr_equal() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        assert!(is_rounded_rr_equal(60, 59940, 60));
        assert!(is_rounded_rr_equal(59, 59940, 60));
        assert!(!is_rounded_rr_equal(60, 59940, 61));
        assert!(!is_rounded_rr_equal(75, 60000, 60));
    }

    #[test]
    fn test_rrx1k_to_pclk() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let timing = Timing {
            h_total: 2200,
            v_total: 1125,
            refresh_rate_x1k: 60000,
            ..Timing::default()
        };
        assert_eq!(14850, rrx1k_to_pclk(&timing));
        let interlaced = Timing {
            h_total: 2200,
            v_total: 562,
            interlaced: true,
            refresh_rate_x1k: 60000,
            ..Timing::default()
        };
        assert_eq!(7425, rrx1k_to_pclk(&interlaced));
    }

    #[test]
    fn test_color_depth_up_to() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        assert_eq!(ColorDepth::Bpc8 | ColorDepth::Bpc10 | ColorDepth::Bpc12, ColorDepth::up_to(12));
        assert_eq!(ColorDepth::Bpc8, ColorDepth::up_to(8));
        assert_eq!(AspectRatio::new(16, 9), AspectRatio::from_packed(0x0010_0009));
    }
}
