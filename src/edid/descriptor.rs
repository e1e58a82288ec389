// SPDX-License-Identifier: MIT

use crate::timing::{AspectRatio, Polarity, Timing, TimingFlags, TimingStatus, TimingType};
use crate::{read_region, read_region_args, Error, Result};
use binread::BinRead;
use bitflags::bitflags;
use log::{trace, warn};
use serde::Serialize;
use std::io::Cursor;

pub const DESCRIPTOR_SIZE: usize = 18;
pub const DESCRIPTOR_PAYLOAD_SIZE: usize = 13;

pub const TAG_SERIAL_NUMBER: u8 = 0xFF;
pub const TAG_ASCII_STRING: u8 = 0xFE;
pub const TAG_RANGE_LIMITS: u8 = 0xFD;
pub const TAG_PRODUCT_NAME: u8 = 0xFC;
pub const TAG_COLOR_POINT: u8 = 0xFB;
pub const TAG_STANDARD_TIMINGS: u8 = 0xFA;
pub const TAG_COLOR_MANAGEMENT: u8 = 0xF9;
pub const TAG_CVT_3BYTE: u8 = 0xF8;
pub const TAG_ESTABLISHED_TIMINGS_III: u8 = 0xF7;
pub const TAG_DUMMY: u8 = 0x10;

#[derive(BinRead, Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetailedTimingFlags(u8);
bitflags! {
    impl DetailedTimingFlags: u8 {
        const StereoInterleaved = 0b00000001;
        const HSyncPositive = 0b00000010;
        const VSyncPositive = 0b00000100;
        const SeparateSync = 0b00001000;
        const DigitalSync = 0b00010000;
        const StereoRight = 0b00100000;
        const StereoLeft = 0b01000000;
        const Interlaced = 0b10000000;
    }
}

/// 18-byte detailed timing descriptor as stored in the EDID, fields split into their
/// low bytes and shared high nibbles.
#[derive(BinRead, Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetailedTiming {
    pub pixel_clock: u16,
    pub h_active_lo: u8,
    pub h_blank_lo: u8,
    pub h_active_blank_hi: u8,
    pub v_active_lo: u8,
    pub v_blank_lo: u8,
    pub v_active_blank_hi: u8,
    pub h_sync_offset_lo: u8,
    pub h_sync_width_lo: u8,
    pub v_sync_offset_width_lo: u8,
    pub sync_hi: u8,
    pub h_image_size_lo: u8,
    pub v_image_size_lo: u8,
    pub image_size_hi: u8,
    pub h_border: u8,
    pub v_border: u8,
    pub flags: DetailedTimingFlags,
}

impl DetailedTiming {
    pub fn read(bytes: &[u8]) -> Result<Self> {
        read_region::<Self>(&mut Cursor::new(bytes), 0)
    }

    /// Unused slot: zero clock and width, or the all-ones filler of EDID 1.1/1.2.
    pub fn is_empty(&self) -> bool {
        (self.pixel_clock == 0 && self.h_active_lo == 0)
            || (self.pixel_clock == 0x0101
                && self.h_active_lo == 1
                && self.h_blank_lo == 1
                && self.h_active_blank_hi == 1)
    }

    pub fn h_active(&self) -> u16 {
        self.h_active_lo as u16 | ((self.h_active_blank_hi as u16 & 0xF0) << 4)
    }

    pub fn h_blank(&self) -> u16 {
        self.h_blank_lo as u16 | ((self.h_active_blank_hi as u16 & 0x0F) << 8)
    }

    pub fn v_active(&self) -> u16 {
        self.v_active_lo as u16 | ((self.v_active_blank_hi as u16 & 0xF0) << 4)
    }

    pub fn v_blank(&self) -> u16 {
        self.v_blank_lo as u16 | ((self.v_active_blank_hi as u16 & 0x0F) << 8)
    }

    pub fn h_sync_offset(&self) -> u16 {
        self.h_sync_offset_lo as u16 | ((self.sync_hi as u16 & 0xC0) << 2)
    }

    pub fn h_sync_width(&self) -> u16 {
        self.h_sync_width_lo as u16 | ((self.sync_hi as u16 & 0x30) << 4)
    }

    pub fn v_sync_offset(&self) -> u16 {
        (self.v_sync_offset_width_lo as u16 >> 4) | ((self.sync_hi as u16 & 0x0C) << 2)
    }

    pub fn v_sync_width(&self) -> u16 {
        (self.v_sync_offset_width_lo as u16 & 0x0F) | ((self.sync_hi as u16 & 0x03) << 4)
    }

    /// Physical image size in millimeters.
    pub fn image_size(&self) -> AspectRatio {
        AspectRatio::new(
            self.h_image_size_lo as u16 | ((self.image_size_hi as u16 & 0xF0) << 4),
            self.v_image_size_lo as u16 | ((self.image_size_hi as u16 & 0x0F) << 8),
        )
    }

    fn polarities(&self) -> (Polarity, Polarity) {
        let sync = self.flags & (DetailedTimingFlags::DigitalSync | DetailedTimingFlags::SeparateSync);
        let h_positive = self.flags.contains(DetailedTimingFlags::HSyncPositive);
        if sync == DetailedTimingFlags::DigitalSync | DetailedTimingFlags::SeparateSync {
            (
                Polarity::from_positive(h_positive),
                Polarity::from_positive(self.flags.contains(DetailedTimingFlags::VSyncPositive)),
            )
        } else if sync == DetailedTimingFlags::DigitalSync {
            (Polarity::from_positive(h_positive), Polarity::Positive)
        } else {
            (Polarity::Negative, Polarity::Positive)
        }
    }

    fn is_eizo_split(&self) -> bool {
        self.flags.contains(DetailedTimingFlags::StereoInterleaved)
            && !self
                .flags
                .intersects(DetailedTimingFlags::StereoRight | DetailedTimingFlags::StereoLeft)
    }

    /// Decodes the descriptor. The returned timing carries an `EdidDtd` status with sequence
    /// number 0, callers renumber it by slot.
    pub fn to_timing(&self) -> Result<Timing> {
        if self.is_empty() {
            return Err(Error::InvalidDescriptor("Detailed timing slot is empty".to_string()));
        }
        let h_visible = self.h_active() as i32 - 2 * self.h_border as i32;
        let v_visible = self.v_active() as i32 - 2 * self.v_border as i32;
        if h_visible <= 0 || v_visible <= 0 || self.pixel_clock == 0 {
            return Err(Error::InvalidDescriptor(format!(
                "Detailed timing {}x{} with pixel clock {} is not a raster",
                h_visible, v_visible, self.pixel_clock
            )));
        }

        let (h_sync_polarity, v_sync_polarity) = self.polarities();
        let mut timing = Timing {
            h_visible: h_visible as u16,
            h_border: self.h_border as u16,
            h_total: h_visible as u16 + self.h_blank() + 2 * self.h_border as u16,
            h_front_porch: self.h_sync_offset(),
            h_sync_width: self.h_sync_width(),
            h_sync_polarity,
            v_visible: v_visible as u16,
            v_border: self.v_border as u16,
            v_total: v_visible as u16 + self.v_blank() + 2 * self.v_border as u16,
            v_front_porch: self.v_sync_offset(),
            v_sync_width: self.v_sync_width(),
            v_sync_polarity,
            interlaced: self.flags.contains(DetailedTimingFlags::Interlaced),
            pclk: self.pixel_clock as u32,
            aspect: self.image_size(),
            pixel_repetition: 1,
            status: TimingStatus::of(TimingType::EdidDtd, 0),
            ..Timing::default()
        };
        if self.is_eizo_split() {
            timing.flags |= TimingFlags::EdidDtdEizoSplit;
        }

        // one extra blank line every other field
        let h_total = timing.h_total as u64;
        let v_total = timing.v_total as u64;
        let total_pixels = if timing.interlaced {
            (h_total * v_total + h_total * (v_total + 1)) / 2
        } else {
            h_total * v_total
        };
        let pclk = self.pixel_clock as u64;
        timing.refresh_rate = ((pclk * 10000 + total_pixels / 2) / total_pixels) as u16;
        timing.refresh_rate_x1k = (pclk * 10_000_000 / total_pixels) as u32;
        timing.set_name(format!(
            "EDID-Detailed:{}x{}x{}.{:03}Hz{}",
            timing.h_visible,
            timing.frame_height(),
            timing.refresh_rate_x1k / 1000,
            timing.refresh_rate_x1k % 1000,
            if timing.interlaced { "/i" } else { "" }
        ));
        Ok(timing)
    }

    /// Packs a timing back into descriptor fields. Sync is always encoded as digital separate.
    pub fn from_timing(timing: &Timing) -> Result<Self> {
        let h_active = timing.h_visible as u32 + 2 * timing.h_border as u32;
        let v_active = timing.v_visible as u32 + 2 * timing.v_border as u32;
        let h_blank = (timing.h_total as u32).checked_sub(h_active);
        let v_blank = (timing.v_total as u32).checked_sub(v_active);
        let fits = |value: u32, bits: u32| value < 1 << bits;
        let (h_blank, v_blank) = match (h_blank, v_blank) {
            (Some(h_blank), Some(v_blank))
                if timing.pclk <= u16::MAX as u32
                    && fits(h_active, 12)
                    && fits(v_active, 12)
                    && fits(h_blank, 12)
                    && fits(v_blank, 12)
                    && fits(timing.h_front_porch as u32, 10)
                    && fits(timing.h_sync_width as u32, 10)
                    && fits(timing.v_front_porch as u32, 6)
                    && fits(timing.v_sync_width as u32, 6)
                    && fits(timing.h_border as u32, 8)
                    && fits(timing.v_border as u32, 8)
                    && fits(timing.aspect.horizontal as u32, 12)
                    && fits(timing.aspect.vertical as u32, 12) =>
            {
                (h_blank, v_blank)
            }
            _ => {
                return Err(Error::OutOfRange(format!(
                    "{} does not fit a detailed timing descriptor",
                    timing.name
                )))
            }
        };

        let mut flags = DetailedTimingFlags::DigitalSync | DetailedTimingFlags::SeparateSync;
        flags.set(
            DetailedTimingFlags::HSyncPositive,
            timing.h_sync_polarity == Polarity::Positive,
        );
        flags.set(
            DetailedTimingFlags::VSyncPositive,
            timing.v_sync_polarity == Polarity::Positive,
        );
        flags.set(DetailedTimingFlags::Interlaced, timing.interlaced);
        flags.set(
            DetailedTimingFlags::StereoInterleaved,
            timing.flags.contains(TimingFlags::EdidDtdEizoSplit),
        );

        let h_front_porch = timing.h_front_porch as u32;
        let h_sync_width = timing.h_sync_width as u32;
        let v_front_porch = timing.v_front_porch as u32;
        let v_sync_width = timing.v_sync_width as u32;
        let h_image = timing.aspect.horizontal as u32;
        let v_image = timing.aspect.vertical as u32;
        Ok(Self {
            pixel_clock: timing.pclk as u16,
            h_active_lo: h_active as u8,
            h_blank_lo: h_blank as u8,
            h_active_blank_hi: ((h_active >> 4) & 0xF0 | (h_blank >> 8) & 0x0F) as u8,
            v_active_lo: v_active as u8,
            v_blank_lo: v_blank as u8,
            v_active_blank_hi: ((v_active >> 4) & 0xF0 | (v_blank >> 8) & 0x0F) as u8,
            h_sync_offset_lo: h_front_porch as u8,
            h_sync_width_lo: h_sync_width as u8,
            v_sync_offset_width_lo: ((v_front_porch & 0x0F) << 4 | v_sync_width & 0x0F) as u8,
            sync_hi: ((h_front_porch >> 2) & 0xC0
                | (h_sync_width >> 4) & 0x30
                | (v_front_porch >> 2) & 0x0C
                | (v_sync_width >> 4) & 0x03) as u8,
            h_image_size_lo: h_image as u8,
            v_image_size_lo: v_image as u8,
            image_size_hi: ((h_image >> 4) & 0xF0 | (v_image >> 8) & 0x0F) as u8,
            h_border: timing.h_border as u8,
            v_border: timing.v_border as u8,
            flags,
        })
    }

    pub fn encode(&self) -> [u8; DESCRIPTOR_SIZE] {
        let clock = self.pixel_clock.to_le_bytes();
        [
            clock[0],
            clock[1],
            self.h_active_lo,
            self.h_blank_lo,
            self.h_active_blank_hi,
            self.v_active_lo,
            self.v_blank_lo,
            self.v_active_blank_hi,
            self.h_sync_offset_lo,
            self.h_sync_width_lo,
            self.v_sync_offset_width_lo,
            self.sync_hi,
            self.h_image_size_lo,
            self.v_image_size_lo,
            self.image_size_hi,
            self.h_border,
            self.v_border,
            self.flags.bits(),
        ]
    }
}

/// Decodes an 18-byte detailed timing descriptor.
pub fn parse_detailed_timing(bytes: &[u8]) -> Result<Timing> {
    DetailedTiming::read(bytes)?.to_timing()
}

/// Text payload of a descriptor, cut at the 0x0A terminator.
#[derive(BinRead, Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[br(map = |bytes: [u8; DESCRIPTOR_PAYLOAD_SIZE]| Self::from_bytes(&bytes))]
pub struct DescriptorString(pub String);

impl DescriptorString {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let text = bytes
            .iter()
            .take_while(|byte| **byte != 0x0A && **byte != 0x00)
            .map(|byte| {
                if (b' '..=b'~').contains(byte) {
                    *byte as char
                } else {
                    '?'
                }
            })
            .collect::<String>();
        Self(text.trim_end().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RateOffsets(u8);
bitflags! {
    impl RateOffsets: u8 {
        const MinVertical = 0b00000001;
        const MaxVertical = 0b00000010;
        const MinHorizontal = 0b00000100;
        const MaxHorizontal = 0b00001000;
    }
}

impl RateOffsets {
    const AMOUNT: u16 = 255;

    fn max_v(&self) -> u16 {
        if self.contains(Self::MaxVertical) {
            Self::AMOUNT
        } else {
            0
        }
    }

    fn min_v(&self) -> u16 {
        if self.contains(Self::MaxVertical | Self::MinVertical) {
            Self::AMOUNT
        } else {
            0
        }
    }

    fn max_h(&self) -> u16 {
        if self.contains(Self::MaxHorizontal) {
            Self::AMOUNT
        } else {
            0
        }
    }

    fn min_h(&self) -> u16 {
        if self.contains(Self::MaxHorizontal | Self::MinHorizontal) {
            Self::AMOUNT
        } else {
            0
        }
    }
}

pub const RANGE_SUPPORT_DEFAULT_GTF: u8 = 0x00;
pub const RANGE_SUPPORT_LIMITS_ONLY: u8 = 0x01;
pub const RANGE_SUPPORT_SECONDARY_GTF: u8 = 0x02;
pub const RANGE_SUPPORT_CVT: u8 = 0x04;

/// Display range limits. Rates include the EDID 1.4 +255 offsets.
#[derive(BinRead, Debug, Clone, PartialEq, Eq, Serialize)]
#[br(import(offsets: RateOffsets))]
pub struct RangeLimits {
    #[br(map = |rate: u8| rate as u16 + offsets.min_v())]
    pub min_v_rate: u16,
    #[br(map = |rate: u8| rate as u16 + offsets.max_v())]
    pub max_v_rate: u16,
    #[br(map = |rate: u8| rate as u16 + offsets.min_h())]
    pub min_h_rate_khz: u16,
    #[br(map = |rate: u8| rate as u16 + offsets.max_h())]
    pub max_h_rate_khz: u16,
    #[br(map = |clock: u8| clock as u16 * 10)]
    pub max_pclk_mhz: u16,
    pub timing_support: u8,
    #[br(args(timing_support))]
    pub formula: RangeFormula,
}

impl RangeLimits {
    /// Maximum pixel clock in 10 kHz units, lowered by the CVT quarter-MHz adjustment.
    pub fn max_pclk_10khz(&self) -> u32 {
        let max = self.max_pclk_mhz as u32 * 100;
        match &self.formula {
            RangeFormula::Cvt(cvt) => max.saturating_sub(cvt.pclk_adjustment as u32 * 25),
            _ => max,
        }
    }

    pub fn cvt(&self) -> Option<&CvtSupport> {
        match &self.formula {
            RangeFormula::Cvt(cvt) => Some(cvt),
            _ => None,
        }
    }

    /// Rates are ordered and both maxima are set.
    pub fn is_consistent(&self) -> bool {
        self.min_v_rate <= self.max_v_rate
            && self.min_h_rate_khz <= self.max_h_rate_khz
            && self.max_v_rate != 0
            && self.max_h_rate_khz != 0
    }
}

#[derive(BinRead, Debug, Clone, PartialEq, Eq, Serialize)]
#[br(import(timing_support: u8))]
pub enum RangeFormula {
    #[br(pre_assert(timing_support == RANGE_SUPPORT_SECONDARY_GTF))]
    SecondaryGtf(SecondaryGtf),
    #[br(pre_assert(timing_support == RANGE_SUPPORT_CVT))]
    Cvt(CvtSupport),
    Plain([u8; 7]),
}

#[derive(BinRead, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecondaryGtf {
    pub reserved: u8,
    #[br(map = |frequency: u8| frequency as u16 * 2)]
    pub start_break_khz: u16,
    #[br(map = |c: u8| c / 2)]
    pub c: u8,
    pub m: u16,
    pub k: u8,
    #[br(map = |j: u8| j / 2)]
    pub j: u8,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CvtAspects(u8);
bitflags! {
    impl CvtAspects: u8 {
        const Aspect15x9 = 0b00000001;
        const Aspect5x4 = 0b00000010;
        const Aspect16x10 = 0b00000100;
        const Aspect16x9 = 0b00001000;
        const Aspect4x3 = 0b00010000;
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CvtBlanking(u8);
bitflags! {
    impl CvtBlanking: u8 {
        const Standard = 0b00000001;
        const Reduced = 0b00000010;
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CvtScaling(u8);
bitflags! {
    impl CvtScaling: u8 {
        const VerticalStretch = 0b00000001;
        const VerticalShrink = 0b00000010;
        const HorizontalStretch = 0b00000100;
        const HorizontalShrink = 0b00001000;
    }
}

#[derive(BinRead, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CvtSupport {
    pub version: u8,
    /// Pixel clock reduction in 0.25 MHz steps.
    #[br(restore_position, map = |byte: u8| (byte >> 2) & 0x3F)]
    pub pclk_adjustment: u8,
    #[br(map = |bytes: [u8; 2]| ((bytes[0] as u32 & 0x03) << 8 | bytes[1] as u32) << 3)]
    pub max_active_pixels: u32,
    #[br(map = |byte: u8| CvtAspects::from_bits_truncate(byte >> 3))]
    pub aspects: CvtAspects,
    #[br(restore_position, map = |byte: u8| byte >> 5)]
    pub preferred_aspect: u8,
    #[br(map = |byte: u8| CvtBlanking::from_bits_truncate((byte >> 3) & 0x03))]
    pub blanking: CvtBlanking,
    #[br(map = |byte: u8| CvtScaling::from_bits_truncate(byte >> 4))]
    pub scaling: CvtScaling,
    pub preferred_refresh: u8,
}

#[derive(BinRead, Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
#[br(map = |bytes: [u8; 5]| Self::from_bytes(&bytes))]
pub struct WhitePoint {
    pub index: u8,
    pub x: u16,
    pub y: u16,
    pub gamma: u16,
}

impl WhitePoint {
    fn from_bytes(bytes: &[u8; 5]) -> Self {
        Self {
            index: bytes[0],
            x: (bytes[2] as u16) << 2 | (bytes[1] as u16 >> 2) & 0x03,
            y: (bytes[3] as u16) << 2 | bytes[1] as u16 & 0x03,
            gamma: bytes[4] as u16 + 100,
        }
    }
}

#[derive(BinRead, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorPoints {
    pub points: [WhitePoint; 2],
    pub padding: [u8; 3],
}

#[derive(BinRead, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandardTimingIds {
    pub codes: [u16; 6],
    pub padding: u8,
}

#[derive(BinRead, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorManagement {
    pub version: u8,
    pub red_a3: u16,
    pub red_a2: u16,
    pub green_a3: u16,
    pub green_a2: u16,
    pub blue_a3: u16,
    pub blue_a2: u16,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CvtRates(u8);
bitflags! {
    impl CvtRates: u8 {
        const Rate60Reduced = 0b00000001;
        const Rate85 = 0b00000010;
        const Rate75 = 0b00000100;
        const Rate60 = 0b00001000;
        const Rate50 = 0b00010000;
    }
}

pub const CVT3_ASPECT_4X3: u8 = 0;
pub const CVT3_ASPECT_16X9: u8 = 1;
pub const CVT3_ASPECT_16X10: u8 = 2;
pub const CVT3_ASPECT_15X9: u8 = 3;

/// One 3-byte CVT timing code.
#[derive(BinRead, Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
#[br(map = |bytes: [u8; 3]| Self::from_bytes(&bytes))]
pub struct Cvt3ByteCode {
    /// Zero marks an unused code.
    pub lines: u16,
    pub aspect: u8,
    pub preferred_rate: u8,
    pub rates: CvtRates,
}

impl Cvt3ByteCode {
    pub fn from_bytes(bytes: &[u8; 3]) -> Self {
        let addressable = bytes[0] as u16 | (bytes[1] as u16 & 0xF0) << 4;
        Self {
            lines: if addressable == 0 { 0 } else { (addressable + 1) * 2 },
            aspect: (bytes[1] >> 2) & 0x03,
            preferred_rate: (bytes[2] >> 5) & 0x03,
            rates: CvtRates::from_bits_truncate(bytes[2] & 0x1F),
        }
    }

    pub fn width(&self) -> u32 {
        let height = self.lines as u32;
        let width = match self.aspect {
            CVT3_ASPECT_4X3 => height * 4 / 3,
            CVT3_ASPECT_16X9 => height * 16 / 9,
            CVT3_ASPECT_16X10 => height * 16 / 10,
            _ => height * 15 / 9,
        };
        width & !7
    }
}

#[derive(BinRead, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cvt3ByteCodes {
    pub version: u8,
    pub codes: [Cvt3ByteCode; 4],
}

#[derive(BinRead, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EstablishedTimingsIII {
    pub version: u8,
    pub bitmap: [u8; 6],
    pub reserved: [u8; 6],
}

/// Payload of a display descriptor, selected by its tag byte.
#[derive(BinRead, Debug, Clone, PartialEq, Eq, Serialize)]
#[br(import(tag: u8, offsets: RateOffsets))]
pub enum LongDisplayDescriptor {
    #[br(pre_assert(tag == TAG_SERIAL_NUMBER))]
    SerialNumber(DescriptorString),
    #[br(pre_assert(tag == TAG_ASCII_STRING))]
    AsciiString(DescriptorString),
    #[br(pre_assert(tag == TAG_RANGE_LIMITS))]
    RangeLimits(#[br(args(offsets))] RangeLimits),
    #[br(pre_assert(tag == TAG_PRODUCT_NAME))]
    ProductName(DescriptorString),
    #[br(pre_assert(tag == TAG_COLOR_POINT))]
    ColorPoint(ColorPoints),
    #[br(pre_assert(tag == TAG_STANDARD_TIMINGS))]
    StandardTimingIds(StandardTimingIds),
    #[br(pre_assert(tag == TAG_COLOR_MANAGEMENT))]
    ColorManagement(ColorManagement),
    #[br(pre_assert(tag == TAG_CVT_3BYTE))]
    Cvt3Byte(Cvt3ByteCodes),
    #[br(pre_assert(tag == TAG_ESTABLISHED_TIMINGS_III))]
    EstablishedTimingsIII(EstablishedTimingsIII),
    #[br(pre_assert(tag == TAG_DUMMY))]
    Dummy([u8; DESCRIPTOR_PAYLOAD_SIZE]),
    Other {
        #[br(calc = tag)]
        tag: u8,
        data: [u8; DESCRIPTOR_PAYLOAD_SIZE],
    },
}

/// Display descriptor slot: a zero pixel clock followed by the tag and its payload.
#[derive(BinRead, Debug, Clone, PartialEq, Eq, Serialize)]
#[br(import(version: u16))]
pub struct DisplayDescriptor {
    #[br(assert(prefix == 0))]
    pub prefix: u16,
    #[br(assert(reserved == 0))]
    pub reserved: u8,
    pub tag: u8,
    pub flags: u8,
    #[br(calc = if version >= 0x104 { RateOffsets::from_bits_truncate(flags) } else { RateOffsets::empty() })]
    pub range_offsets: RateOffsets,
    #[br(args(tag, range_offsets))]
    pub descriptor: LongDisplayDescriptor,
}

impl DisplayDescriptor {
    pub fn read(bytes: &[u8], version: u16) -> Result<Self> {
        let descriptor = read_region_args::<Self>(&mut Cursor::new(bytes), 0, (version,))?;
        trace!("Display descriptor 0x{:02X}: {:?}", descriptor.tag, descriptor.descriptor);
        if let LongDisplayDescriptor::Dummy(data) = &descriptor.descriptor {
            if data.iter().any(|byte| *byte != 0) {
                warn!("Dummy display descriptor carries data {:02X?}", data);
            }
        }
        Ok(descriptor)
    }
}

/// Slot holds a display descriptor rather than a detailed timing.
pub fn is_display_descriptor(bytes: &[u8]) -> bool {
    bytes.len() >= DESCRIPTOR_SIZE && bytes[0] == 0 && bytes[1] == 0
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::edid::descriptor::*;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    pub const DTD_1080P: [u8; DESCRIPTOR_SIZE] = [
        0x02, 0x3A, 0x80, 0x18, 0x71, 0x38, 0x2D, 0x40, 0x58, 0x2C, 0x45, 0x00, 0x50, 0x2D, 0x21,
        0x00, 0x00, 0x1E,
    ];

    #[test]
    fn test_detailed_timing_1080p() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let timing = parse_detailed_timing(&DTD_1080P).unwrap();
        assert_eq!(1920, timing.h_visible);
        assert_eq!(2200, timing.h_total);
        assert_eq!(88, timing.h_front_porch);
        assert_eq!(44, timing.h_sync_width);
        assert_eq!(1080, timing.v_visible);
        assert_eq!(1125, timing.v_total);
        assert_eq!(4, timing.v_front_porch);
        assert_eq!(5, timing.v_sync_width);
        assert_eq!(14850, timing.pclk);
        assert_eq!(Polarity::Positive, timing.h_sync_polarity);
        assert_eq!(Polarity::Positive, timing.v_sync_polarity);
        assert_eq!(60, timing.refresh_rate);
        assert_eq!(60000, timing.refresh_rate_x1k);
        assert_eq!(AspectRatio::new(592, 301), timing.aspect);
        assert_eq!("EDID-Detailed:1920x1080x60.000Hz", timing.name);
        assert_eq!(TimingType::EdidDtd, timing.status.timing_type());
    }

    #[test]
    fn test_detailed_timing_rejects_empty_slots() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut zero_clock = DTD_1080P;
        zero_clock[0] = 0;
        zero_clock[1] = 0;
        assert!(matches!(
            parse_detailed_timing(&zero_clock),
            Err(Error::InvalidDescriptor(_))
        ));
        let mut filler = [0x01u8; DESCRIPTOR_SIZE];
        filler[5] = 0x20;
        assert!(DetailedTiming::read(&filler).unwrap().is_empty());
        let mut borders = DTD_1080P;
        borders[15] = 0xFF;
        borders[2] = 0x10;
        borders[4] = 0x01;
        assert!(parse_detailed_timing(&borders).is_err());
    }

    #[test]
    fn test_detailed_timing_interlaced_and_polarity() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        // 1920x1080i, 74.25 MHz
        let bytes: [u8; DESCRIPTOR_SIZE] = [
            0x01, 0x1D, 0x80, 0x18, 0x71, 0x1C, 0x16, 0x20, 0x58, 0x2C, 0x25, 0x00, 0x50, 0x2D,
            0x21, 0x00, 0x00, 0x9A,
        ];
        let timing = parse_detailed_timing(&bytes).unwrap();
        assert!(timing.interlaced);
        assert_eq!(540, timing.v_visible);
        assert_eq!(562, timing.v_total);
        assert_eq!(1080, timing.frame_height());
        assert_eq!(60, timing.refresh_rate);
        assert_eq!(Polarity::Positive, timing.h_sync_polarity);
        assert_eq!(Polarity::Negative, timing.v_sync_polarity);
        assert!(timing.name.ends_with("/i"));
    }

    #[test]
    fn test_detailed_timing_encode_round_trip() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let timing = parse_detailed_timing(&DTD_1080P).unwrap();
        let encoded = DetailedTiming::from_timing(&timing).unwrap().encode();
        assert_eq!(DTD_1080P, encoded);

        for (width, height, porch, sync) in [(640u16, 480u16, 16u16, 96u16), (3840, 2160, 176, 88), (1366, 768, 70, 143)] {
            let raster = Timing {
                h_visible: width,
                h_front_porch: porch,
                h_sync_width: sync,
                h_total: width + porch + sync + 48,
                v_visible: height,
                v_front_porch: 3,
                v_sync_width: 5,
                v_total: height + 40,
                h_sync_polarity: Polarity::Negative,
                pclk: 30000,
                ..Timing::default()
            };
            let decoded = parse_detailed_timing(&DetailedTiming::from_timing(&raster).unwrap().encode()).unwrap();
            assert!(crate::timing::is_exact_equal(&raster, &decoded));
        }

        let too_wide = Timing {
            h_visible: 5000,
            h_total: 5200,
            v_visible: 100,
            v_total: 110,
            pclk: 100,
            ..Timing::default()
        };
        assert!(matches!(DetailedTiming::from_timing(&too_wide), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn test_range_limits_with_offsets() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let bytes: [u8; DESCRIPTOR_SIZE] = [
            0x00, 0x00, 0x00, 0xFD, 0x0A, 0x30, 0x5A, 0x1E, 0xA0, 0x3C, 0x04, 0x11, 0x05, 0x20,
            0xF8, 0x3C, 0x28, 0x3C,
        ];
        let descriptor = DisplayDescriptor::read(&bytes, 0x104).unwrap();
        let LongDisplayDescriptor::RangeLimits(range) = descriptor.descriptor else {
            panic!("not a range limits descriptor");
        };
        assert_eq!(48, range.min_v_rate);
        assert_eq!(90 + 255, range.max_v_rate);
        assert_eq!(30, range.min_h_rate_khz);
        assert_eq!(160 + 255, range.max_h_rate_khz);
        assert_eq!(600, range.max_pclk_mhz);
        let cvt = range.cvt().unwrap();
        assert_eq!(0x11, cvt.version);
        assert_eq!(1, cvt.pclk_adjustment);
        assert_eq!(0x120 << 3, cvt.max_active_pixels);
        assert_eq!(CvtAspects::all(), cvt.aspects);
        assert_eq!(CvtBlanking::Reduced | CvtBlanking::Standard, cvt.blanking);
        assert_eq!(CvtScaling::VerticalShrink, cvt.scaling);
        assert_eq!(60, cvt.preferred_refresh);
        assert_eq!(60000 - 25, range.max_pclk_10khz());

        // EDID 1.3 ignores the offset flags
        let descriptor = DisplayDescriptor::read(&bytes, 0x103).unwrap();
        let LongDisplayDescriptor::RangeLimits(range) = descriptor.descriptor else {
            panic!("not a range limits descriptor");
        };
        assert_eq!(90, range.max_v_rate);
    }

    #[test]
    fn test_string_and_cvt_descriptors() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut bytes = [0u8; DESCRIPTOR_SIZE];
        bytes[3] = TAG_PRODUCT_NAME;
        bytes[5..18].copy_from_slice(b"DELL U2720Q\n ");
        let descriptor = DisplayDescriptor::read(&bytes, 0x104).unwrap();
        assert_eq!(
            LongDisplayDescriptor::ProductName(DescriptorString("DELL U2720Q".to_string())),
            descriptor.descriptor
        );

        let mut bytes = [0u8; DESCRIPTOR_SIZE];
        bytes[3] = TAG_CVT_3BYTE;
        bytes[5] = 0x01;
        // 1080 lines, 16:9, 60 Hz and 60 Hz reduced blanking
        bytes[6..9].copy_from_slice(&[0x1B, 0x24, 0x09]);
        let descriptor = DisplayDescriptor::read(&bytes, 0x104).unwrap();
        let LongDisplayDescriptor::Cvt3Byte(cvt) = descriptor.descriptor else {
            panic!("not a CVT descriptor");
        };
        assert_eq!(1080, cvt.codes[0].lines);
        assert_eq!(1920, cvt.codes[0].width());
        assert_eq!(CvtRates::Rate60 | CvtRates::Rate60Reduced, cvt.codes[0].rates);
        assert_eq!(0, cvt.codes[1].lines);

        let mut bytes = [0u8; DESCRIPTOR_SIZE];
        bytes[3] = 0x05;
        bytes[5] = 0xAB;
        let descriptor = DisplayDescriptor::read(&bytes, 0x103).unwrap();
        assert!(matches!(descriptor.descriptor, LongDisplayDescriptor::Other { tag: 0x05, .. }));

        let mut timing_slot = [0u8; DESCRIPTOR_SIZE];
        timing_slot[0] = 1;
        assert!(DisplayDescriptor::read(&timing_slot, 0x103).is_err());
        assert!(!is_display_descriptor(&timing_slot));
    }
}
