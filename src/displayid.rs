// SPDX-License-Identifier: MIT

use crate::checksum::{checksum, EDID_BLOCK_SIZE};
use crate::cta861::vic::enum_cea861_timing;
use crate::cta861::vsdb::VendorInfo;
use crate::cta861::{
    merge_cta_info, parse_native_or_preferred, parse_short_timings, parse_y420_timings, CeaInfo,
    CtaOrigin, Precedence,
};
use crate::displayid20::InterfaceFeatures;
use crate::formula::dmt::enum_dmt;
use crate::formula::{calc_cvt_rb, calc_cvt_rb2, cvt};
use crate::table::TimingTable;
use crate::timing::{
    AspectRatio, ColorDepth, Polarity, Timing, TimingFlags, TimingStatus, TimingType,
};
use crate::{read_region, Error, Result};
use binread::BinRead;
use bitflags::bitflags;
use log::{debug, trace, warn};
use serde::Serialize;
use std::io::Cursor;
use strum::FromRepr;

pub const DISPLAYID_EXTENSION_TAG: u8 = 0x70;

pub const SECTION_HEADER_SIZE: usize = 4;
pub const BLOCK_HEADER_SIZE: usize = 3;
pub const MAX_BLOCK_PAYLOAD: usize = 248;

const PRODUCT_IDENTITY_MIN_SIZE: usize = 12;
const DISPLAY_PARAMS_SIZE: usize = 12;
const COLOR_POINT_SIZE: usize = 3;
const TYPE1_DESCRIPTOR_SIZE: usize = 20;
const TYPE2_DESCRIPTOR_SIZE: usize = 11;
const TYPE3_DESCRIPTOR_SIZE: usize = 3;
const TYPE5_DESCRIPTOR_SIZE: usize = 7;
const VESA_TIMINGS_SIZE: usize = 10;
const CEA_TIMINGS_SIZE: usize = 8;
const RANGE_LIMITS_SIZE: usize = 15;
const DEVICE_DATA_SIZE: usize = 13;
const INTERFACE_POWER_SIZE: usize = 6;
const DISPLAY_INTERFACE_SIZE: usize = 10;
pub(crate) const TILED_DISPLAY_SIZE: usize = 22;
const MAX_RANGE_LIMITS: usize = 2;

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromRepr, strum::Display)]
#[repr(u8)]
pub enum BlockType {
    ProductIdentification = 0x00,
    DisplayParameters = 0x01,
    ColorCharacteristics = 0x02,
    TimingType1 = 0x03,
    TimingType2 = 0x04,
    TimingType3 = 0x05,
    TimingType4 = 0x06,
    VesaTimings = 0x07,
    CeaTimings = 0x08,
    RangeLimits = 0x09,
    SerialNumber = 0x0A,
    AsciiString = 0x0B,
    DeviceData = 0x0C,
    InterfacePower = 0x0D,
    TransferCharacteristics = 0x0E,
    DisplayInterface = 0x0F,
    Stereo = 0x10,
    TimingType5 = 0x11,
    TiledDisplay = 0x12,
    InterfaceFeatures = 0x26,
    Cta = 0x81,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, FromRepr, Serialize)]
#[repr(u8)]
pub enum ProductType {
    #[default]
    Extension = 0,
    TestStructure = 1,
    DisplayPanel = 2,
    StandaloneDisplay = 3,
    TelevisionReceiver = 4,
    Repeater = 5,
    DirectDrive = 6,
}

/// Header shared by every DisplayID data block.
#[derive(BinRead, Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockHeader {
    pub block_type: u8,
    pub revision: u8,
    pub data_bytes: u8,
}

impl BlockHeader {
    pub fn read(bytes: &[u8]) -> Result<Self> {
        read_region::<Self>(&mut Cursor::new(bytes), 0)
    }
}

/// Header of a DisplayID section, the same four bytes in 1.3 and 2.0.
#[derive(BinRead, Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionHeader {
    pub version: u8,
    pub section_bytes: u8,
    pub product_type: u8,
    pub extension_count: u8,
}

impl SectionHeader {
    pub fn read(bytes: &[u8]) -> Result<Self> {
        read_region::<Self>(&mut Cursor::new(bytes), 0)
    }

    pub fn major(&self) -> u8 {
        self.version >> 4
    }

    pub fn minor(&self) -> u8 {
        self.version & 0x0F
    }

    /// The section including its header and checksum byte.
    pub fn total_size(&self) -> usize {
        SECTION_HEADER_SIZE + self.section_bytes as usize + 1
    }
}

/// Little-endian 24-bit field.
pub(crate) fn u24(bytes: &[u8]) -> u32 {
    bytes[0] as u32 | (bytes[1] as u32) << 8 | (bytes[2] as u32) << 16
}

pub(crate) fn u16_le(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

pub(crate) fn u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

pub(crate) fn ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|byte| **byte != 0)
        .map(|byte| if byte.is_ascii_graphic() || *byte == b' ' { *byte as char } else { '?' })
        .collect::<String>()
        .trim_end()
        .to_string()
}

pub(crate) fn length_error(what: &str, length: usize) -> Error {
    Error::InvalidDataBlock(format!("{} block with {} payload bytes", what, length))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductIdentity {
    /// IEEE OUI or PNP ID, first byte most significant.
    pub vendor_id: u32,
    pub product_code: u16,
    pub serial_number: u32,
    pub week: u8,
    pub year: u16,
    /// Year is a model year rather than the year of manufacture.
    pub model_year: bool,
    pub product_string: String,
}

impl ProductIdentity {
    /// Vendor, product code, serial, week, year and a counted string. Both DisplayID versions
    /// store the year as an offset from 2000.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < PRODUCT_IDENTITY_MIN_SIZE
            || payload.len() - PRODUCT_IDENTITY_MIN_SIZE != payload[11] as usize
        {
            return Err(length_error("Product identification", payload.len()));
        }
        let week = payload[9];
        Ok(Self {
            vendor_id: (payload[0] as u32) << 16 | (payload[1] as u32) << 8 | payload[2] as u32,
            product_code: u16_le(&payload[3..5]),
            serial_number: u32_le(&payload[5..9]),
            week: if (1..=52).contains(&week) { week } else { 0 },
            year: payload[10] as u16 + 2000,
            model_year: week == 0xFF,
            product_string: ascii(&payload[PRODUCT_IDENTITY_MIN_SIZE..]),
        })
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayFeatures(u8);
bitflags! {
    impl DisplayFeatures: u8 {
        const Deinterlacing = 0b00000010;
        const FixedPixelFormat = 0b00000100;
        const FixedTiming = 0b00001000;
        const PowerManagement = 0b00010000;
        const AudioInputOverride = 0b00100000;
        const SeparateAudioInputs = 0b01000000;
        const AudioSupport = 0b10000000;
    }
}

#[derive(BinRead, Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
struct RawDisplayParams {
    h_image_size: u16,
    v_image_size: u16,
    h_pixels: u16,
    v_pixels: u16,
    features: u8,
    gamma: u8,
    aspect: u8,
    depth: u8,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayParams {
    /// Image size in 0.1 mm.
    pub h_image_size: u16,
    pub v_image_size: u16,
    pub h_pixels: u16,
    pub v_pixels: u16,
    pub features: DisplayFeatures,
    /// Transfer gamma times 100, `None` when the gamma is defined elsewhere.
    pub gamma_x100: Option<u16>,
    /// Aspect ratio times 100.
    pub aspect_x100: u16,
    pub native_bpc: u8,
    pub overall_bpc: u8,
}

impl DisplayParams {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() != DISPLAY_PARAMS_SIZE {
            return Err(length_error("Display parameters", payload.len()));
        }
        let raw = read_region::<RawDisplayParams>(&mut Cursor::new(payload), 0)?;
        Ok(Self {
            h_image_size: raw.h_image_size,
            v_image_size: raw.v_image_size,
            h_pixels: raw.h_pixels,
            v_pixels: raw.v_pixels,
            features: DisplayFeatures::from_bits_truncate(raw.features),
            gamma_x100: (raw.gamma != 0xFF).then_some(raw.gamma as u16 + 100),
            aspect_x100: raw.aspect as u16 + 100,
            native_bpc: (raw.depth >> 4) + 1,
            overall_bpc: (raw.depth & 0x0F) + 1,
        })
    }
}

/// CIE 1931 coordinate with 12-bit fields, in 1/4096.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChromaPoint {
    pub x: u16,
    pub y: u16,
}

impl ChromaPoint {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            x: bytes[0] as u16 | (bytes[1] as u16 & 0x0F) << 8,
            y: (bytes[1] as u16) >> 4 | (bytes[2] as u16) << 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColorCharacteristics {
    pub temporal: bool,
    pub primaries: Vec<ChromaPoint>,
    pub white_points: Vec<ChromaPoint>,
}

impl ColorCharacteristics {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let Some(&info) = payload.first() else {
            return Err(length_error("Color characteristics", 0));
        };
        let primaries = (info & 0x0F) as usize;
        let white_points = ((info >> 4) & 0x07) as usize;
        if (primaries + white_points) * COLOR_POINT_SIZE + 1 != payload.len() {
            return Err(length_error("Color characteristics", payload.len()));
        }
        let mut points = payload[1..].chunks_exact(COLOR_POINT_SIZE).map(ChromaPoint::from_bytes);
        Ok(Self {
            temporal: info & 0x80 != 0,
            primaries: points.by_ref().take(primaries).collect(),
            white_points: points.collect(),
        })
    }
}

pub(crate) fn descriptor_aspect(code: u8) -> Option<AspectRatio> {
    let (horizontal, vertical) = match code {
        0 => (1, 1),
        1 => (5, 4),
        2 => (4, 3),
        3 => (15, 9),
        4 => (16, 9),
        5 => (16, 10),
        6 => (64, 27),
        7 => (256, 135),
        _ => return None,
    };
    Some(AspectRatio::new(horizontal, vertical))
}

pub(crate) fn timing_name(prefix: &str, timing: &Timing) -> String {
    format!(
        "{}:{}x{}x{}.{:03}Hz/{}",
        prefix,
        timing.h_visible,
        timing.frame_height(),
        timing.refresh_rate_x1k / 1000,
        timing.refresh_rate_x1k % 1000,
        if timing.interlaced { "I" } else { "P" }
    )
}

/// 20-byte detailed timing of type I blocks, reused by DisplayID 2.0 type VII. Every field is
/// stored minus one, bit 15 of the front porch is the sync polarity.
#[derive(BinRead, Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DidDetailedTiming {
    pub pixel_clock: [u8; 3],
    pub options: u8,
    pub h_active: u16,
    pub h_blank: u16,
    pub h_front_porch: u16,
    pub h_sync_width: u16,
    pub v_active: u16,
    pub v_blank: u16,
    pub v_front_porch: u16,
    pub v_sync_width: u16,
}

impl DidDetailedTiming {
    pub fn read(bytes: &[u8]) -> Result<Self> {
        read_region::<Self>(&mut Cursor::new(bytes), 0)
    }

    pub fn pixel_clock(&self) -> u32 {
        u24(&self.pixel_clock) + 1
    }

    pub fn aspect_code(&self) -> u8 {
        self.options & 0x0F
    }

    pub fn is_interlaced(&self) -> bool {
        self.options & 0x10 != 0
    }

    pub fn bit7(&self) -> bool {
        self.options & 0x80 != 0
    }

    /// Raster of the descriptor without clock and refresh rate. Rejects a total that can't
    /// hold the front porch and the sync pulse.
    pub fn raster(&self) -> Result<Timing> {
        let field = |value: u16| (value & 0x7FFF) as u32 + 1;
        let h_visible = self.h_active as u32 + 1;
        let h_total = h_visible + self.h_blank as u32 + 1;
        let v_visible = self.v_active as u32 + 1;
        let v_total = v_visible + self.v_blank as u32 + 1;
        let h_front_porch = field(self.h_front_porch);
        let h_sync_width = self.h_sync_width as u32 + 1;
        if h_total < h_visible + h_front_porch + h_sync_width {
            return Err(Error::InvalidDescriptor(format!(
                "Horizontal total {} can't hold {} active, {} porch and {} sync",
                h_total, h_visible, h_front_porch, h_sync_width
            )));
        }
        let to_u16 = |value: u32| {
            u16::try_from(value)
                .map_err(|_| Error::OutOfRange(format!("Timing field {} doesn't fit", value)))
        };
        Ok(Timing {
            h_visible: to_u16(h_visible)?,
            h_total: to_u16(h_total)?,
            h_front_porch: to_u16(h_front_porch)?,
            h_sync_width: to_u16(h_sync_width)?,
            h_sync_polarity: Polarity::from_positive(self.h_front_porch & 0x8000 != 0),
            v_visible: to_u16(v_visible)?,
            v_total: to_u16(v_total)?,
            v_front_porch: to_u16(field(self.v_front_porch))?,
            v_sync_width: to_u16(self.v_sync_width as u32 + 1)?,
            v_sync_polarity: Polarity::from_positive(self.v_front_porch & 0x8000 != 0),
            interlaced: self.is_interlaced(),
            pixel_repetition: 1,
            ..Timing::default()
        })
    }
}

/// Type I detailed timing, pixel clock in 10 kHz units.
pub fn type1_timing(bytes: &[u8]) -> Result<Timing> {
    let descriptor = DidDetailedTiming::read(bytes)?;
    let mut timing = descriptor.raster()?;
    timing.pclk = descriptor.pixel_clock();
    timing.aspect = descriptor_aspect(descriptor.aspect_code())
        .filter(|_| descriptor.aspect_code() <= 5)
        .unwrap_or_default();
    timing.update_refresh_rates();
    timing.status = TimingStatus::of(TimingType::DisplayId1, 0);
    if descriptor.bit7() {
        timing.flags |= TimingFlags::DisplayIdDtdPreferred;
    }
    timing.set_name(timing_name("DID-Type1", &timing));
    Ok(timing)
}

/// Type II timing: horizontal values in 8-pixel cells, vertical values in lines.
pub fn type2_timing(bytes: &[u8]) -> Result<Timing> {
    if bytes.len() < TYPE2_DESCRIPTOR_SIZE {
        return Err(Error::InvalidDescriptor(format!(
            "Type II descriptor of {} bytes",
            bytes.len()
        )));
    }
    let options = bytes[3];
    let h_visible = ((bytes[4] as u16 | (bytes[5] as u16 & 0x01) << 8) + 1) * 8;
    let h_blank = ((bytes[5] >> 1) as u16 + 1) * 8;
    let h_front_porch = ((bytes[6] & 0x0F) as u16 + 1) * 8;
    let h_sync_width = ((bytes[6] >> 4) as u16 + 1) * 8;
    let v_visible = (bytes[7] as u16 | (bytes[8] as u16 & 0x0F) << 8) + 1;
    let v_blank = bytes[9] as u16 + 1;
    if h_blank < h_front_porch + h_sync_width {
        return Err(Error::InvalidDescriptor(format!(
            "Horizontal blank {} can't hold {} porch and {} sync",
            h_blank, h_front_porch, h_sync_width
        )));
    }
    let mut timing = Timing {
        h_visible,
        h_total: h_visible + h_blank,
        h_front_porch,
        h_sync_width,
        h_sync_polarity: Polarity::from_positive(options & 0x08 != 0),
        v_visible,
        v_total: v_visible + v_blank,
        v_front_porch: (bytes[10] & 0x0F) as u16 + 1,
        v_sync_width: (bytes[10] >> 4) as u16 + 1,
        v_sync_polarity: Polarity::from_positive(options & 0x04 != 0),
        interlaced: options & 0x10 != 0,
        pclk: u24(&bytes[0..3]) + 1,
        pixel_repetition: 1,
        status: TimingStatus::of(TimingType::DisplayId2, 0),
        ..Timing::default()
    };
    timing.update_refresh_rates();
    if options & 0x80 != 0 {
        timing.flags |= TimingFlags::DisplayIdDtdPreferred;
    }
    timing.set_name(timing_name("DID-Type2", &timing));
    Ok(timing)
}

/// Type III short descriptor: a CVT formula, the width in cells and an aspect ratio.
pub fn type3_timing(bytes: &[u8]) -> Result<Timing> {
    let options = bytes[0];
    let width = (bytes[1] as u32 + 1) * 8;
    let rr = (bytes[2] & 0x7F) as u32 + 1;
    let interlaced = bytes[2] & 0x80 != 0;
    let height = match options & 0x0F {
        0 => width,
        1 => width * 4 / 5,
        2 => width * 3 / 4,
        3 => width * 9 / 15,
        4 => width * 9 / 16,
        5 => width * 10 / 16,
        code => {
            return Err(Error::InvalidDescriptor(format!(
                "Type III aspect ratio code {}",
                code
            )))
        }
    };
    let mut timing = match (options >> 4) & 0x07 {
        0 => cvt::cvt(width, height, rr, interlaced)?,
        1 => calc_cvt_rb(width, height, rr, interlaced)?,
        formula => {
            return Err(Error::InvalidDescriptor(format!(
                "Type III formula {}",
                formula
            )))
        }
    };
    timing.set_name(timing_name("DID-Type3", &timing));
    Ok(timing)
}

/// Type V short descriptor, synthesized with CVT-RB2.
pub fn type5_timing(bytes: &[u8]) -> Result<Timing> {
    let options = bytes[0];
    let width = u16_le(&bytes[1..3]) as u32 + 1;
    let height = u16_le(&bytes[3..5]) as u32 + 1;
    let rr = bytes[5] as u32 + 1;
    let mut timing = calc_cvt_rb2(width, height, rr, options & 0x10 != 0)?;
    timing.set_name(timing_name("DID-Type5", &timing));
    Ok(timing)
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RangeLimits {
    /// Pixel clock bounds in 10 kHz.
    pub pclk_min: u32,
    pub pclk_max: u32,
    pub interlaced: bool,
    pub cvt: bool,
    pub cvt_reduced: bool,
    pub dfd: bool,
    /// kHz
    pub hfreq_min: u8,
    pub hfreq_max: u8,
    pub hblank_min: u16,
    /// Hz
    pub vfreq_min: u8,
    pub vfreq_max: u8,
    pub vblank_min: u16,
}

impl RangeLimits {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() != RANGE_LIMITS_SIZE {
            return Err(length_error("Range limits", payload.len()));
        }
        let options = payload[6];
        let limits = Self {
            pclk_min: u24(&payload[0..3]),
            pclk_max: u24(&payload[3..6]),
            interlaced: options & 0x80 != 0,
            cvt: options & 0x40 != 0,
            cvt_reduced: options & 0x20 != 0,
            dfd: options & 0x10 != 0,
            hfreq_min: payload[7],
            hfreq_max: payload[8],
            hblank_min: u16_le(&payload[9..11]),
            vfreq_min: payload[11],
            vfreq_max: payload[12],
            vblank_min: u16_le(&payload[13..15]),
        };
        if limits.vfreq_min == 0
            || limits.vfreq_max == 0
            || limits.vfreq_min > limits.vfreq_max
            || limits.pclk_min > limits.pclk_max
        {
            return Err(Error::InvalidDataBlock(format!(
                "Range limits {}-{} Hz, {}-{} pixel clock are inconsistent",
                limits.vfreq_min, limits.vfreq_max, limits.pclk_min, limits.pclk_max
            )));
        }
        Ok(limits)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceData {
    pub technology: u8,
    pub operating_mode: u8,
    pub backlight: bool,
    pub intensity: bool,
    pub h_pixel_count: u16,
    pub v_pixel_count: u16,
    pub aspect: u8,
    pub orientation: u8,
    pub rotation: u8,
    pub zero_pixel: u8,
    pub scan_direction: u8,
    pub subpixel: u8,
    pub h_pitch: u8,
    pub v_pitch: u8,
    pub bpc: u8,
    pub white_to_black: bool,
    /// ms
    pub response_time: u8,
}

impl DeviceData {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() != DEVICE_DATA_SIZE {
            return Err(length_error("Device data", payload.len()));
        }
        Ok(Self {
            technology: payload[0],
            operating_mode: payload[1] >> 4,
            backlight: payload[1] & 0x08 != 0,
            intensity: payload[1] & 0x04 != 0,
            h_pixel_count: u16_le(&payload[2..4]),
            v_pixel_count: u16_le(&payload[4..6]),
            aspect: payload[6],
            orientation: payload[7] >> 6,
            rotation: (payload[7] >> 4) & 0x03,
            zero_pixel: (payload[7] >> 2) & 0x03,
            scan_direction: payload[7] & 0x03,
            subpixel: payload[8],
            h_pitch: payload[9],
            v_pitch: payload[10],
            bpc: payload[11] & 0x0F,
            white_to_black: payload[12] & 0x80 != 0,
            response_time: payload[12] & 0x7F,
        })
    }
}

/// Power sequencing delays, in the 2 ms or 10 ms steps of each field.
#[derive(BinRead, Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterfacePowerSequencing {
    pub t1: u8,
    pub t2: u8,
    pub t3: u8,
    pub t4_min: u8,
    pub t5_min: u8,
    pub t6_min: u8,
}

impl InterfacePowerSequencing {
    pub fn t1_min(&self) -> u8 {
        self.t1 >> 4
    }

    pub fn t1_max(&self) -> u8 {
        self.t1 & 0x0F
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, FromRepr, Serialize)]
#[repr(u8)]
pub enum InterfaceType {
    #[default]
    Analog = 0,
    Lvds = 1,
    Tmds = 2,
    Rsds = 3,
    DviD = 4,
    DviIAnalog = 5,
    DviIDigital = 6,
    HdmiA = 7,
    HdmiB = 8,
    Mddi = 9,
    DisplayPort = 10,
    Proprietary = 11,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignalAttributes {
    pub de_mode: bool,
    pub polarity: bool,
    pub data_strobe: bool,
}

impl SignalAttributes {
    fn from_byte(byte: u8) -> Self {
        Self {
            de_mode: byte & 0x04 != 0,
            polarity: byte & 0x02 != 0,
            data_strobe: byte & 0x01 != 0,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LvdsAttributes {
    pub color_map: bool,
    pub support_2_8v: bool,
    pub support_12v: bool,
    pub support_5v: bool,
    pub support_3_3v: bool,
    pub signal: SignalAttributes,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayInterface {
    pub interface_type: InterfaceType,
    pub links: u8,
    pub version: u8,
    pub rgb444: ColorDepth,
    pub yuv444: ColorDepth,
    pub yuv422: ColorDepth,
    pub content_protection: u8,
    pub content_protection_version: u8,
    pub spread_type: u8,
    pub spread_percent: u8,
    pub lvds: Option<LvdsAttributes>,
    pub proprietary: Option<SignalAttributes>,
}

impl DisplayInterface {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() != DISPLAY_INTERFACE_SIZE {
            return Err(length_error("Display interface", payload.len()));
        }
        let interface_type = InterfaceType::from_repr(payload[0] >> 4).ok_or_else(|| {
            Error::InvalidDataBlock(format!("Display interface type {}", payload[0] >> 4))
        })?;
        let mut interface = Self {
            interface_type,
            links: payload[0] & 0x0F,
            version: payload[1],
            rgb444: ColorDepth::from_bitmap(payload[2]),
            yuv444: ColorDepth::from_bitmap(payload[3]),
            // 4:2:2 starts at 8 bpc
            yuv422: ColorDepth::from_bitmap(payload[4] << 1),
            content_protection: payload[5] & 0x07,
            content_protection_version: payload[6],
            spread_type: payload[7] >> 6,
            spread_percent: payload[7] & 0x0F,
            ..Self::default()
        };
        match interface_type {
            InterfaceType::Lvds => {
                interface.lvds = Some(LvdsAttributes {
                    color_map: payload[8] & 0x10 != 0,
                    support_2_8v: payload[8] & 0x08 != 0,
                    support_12v: payload[8] & 0x04 != 0,
                    support_5v: payload[8] & 0x02 != 0,
                    support_3_3v: payload[8] & 0x01 != 0,
                    signal: SignalAttributes::from_byte(payload[9]),
                })
            }
            InterfaceType::Proprietary => {
                interface.proprietary = Some(SignalAttributes::from_byte(payload[8]))
            }
            _ => {}
        }
        Ok(interface)
    }

    pub fn is_hdmi(&self) -> bool {
        matches!(self.interface_type, InterfaceType::HdmiA | InterfaceType::HdmiB)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StereoMethod {
    FieldSequential { left_on_high: bool },
    SideBySide { left_on_left: bool },
    PixelInterleaved { pattern: [u8; 8] },
    DualInterface { mirroring: u8, right_on_high: bool },
    MultiView { views: u8, interleaving: u8 },
    Proprietary(Vec<u8>),
}

impl StereoMethod {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let Some((&code, params)) = payload.split_first() else {
            return Err(length_error("Stereo interface", 0));
        };
        let need = |count: usize| {
            if params.len() < count {
                Err(Error::InvalidDataBlock(format!(
                    "Stereo method {} with {} parameter bytes",
                    code,
                    params.len()
                )))
            } else {
                Ok(())
            }
        };
        let method = match code {
            0 => {
                need(1)?;
                StereoMethod::FieldSequential {
                    left_on_high: params[0] & 0x01 != 0,
                }
            }
            1 => {
                need(1)?;
                StereoMethod::SideBySide {
                    left_on_left: params[0] & 0x01 != 0,
                }
            }
            2 => {
                need(8)?;
                let mut pattern = [0u8; 8];
                pattern.copy_from_slice(&params[..8]);
                StereoMethod::PixelInterleaved { pattern }
            }
            3 => {
                need(1)?;
                StereoMethod::DualInterface {
                    mirroring: (params[0] >> 1) & 0x03,
                    right_on_high: params[0] & 0x01 != 0,
                }
            }
            4 => {
                need(2)?;
                StereoMethod::MultiView {
                    views: params[0],
                    interleaving: params[1],
                }
            }
            0xFF => StereoMethod::Proprietary(params.to_vec()),
            _ => {
                return Err(Error::InvalidDataBlock(format!(
                    "Unknown stereo method {}",
                    code
                )))
            }
        };
        Ok(method)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bezel {
    pub pixel_density: u8,
    pub top: u16,
    pub bottom: u16,
    pub right: u16,
    pub left: u16,
}

/// Byte order of the topology vendor ID, which differs between DisplayID versions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum VendorOrder {
    LittleEndian,
    BigEndian,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TiledDisplay {
    pub revision: u8,
    pub single_enclosure: bool,
    pub has_bezel_info: bool,
    pub multi_tile_behavior: u8,
    pub single_tile_behavior: u8,
    pub rows: u8,
    pub columns: u8,
    pub x: u8,
    pub y: u8,
    pub native_width: u32,
    pub native_height: u32,
    pub bezel: Bezel,
    pub vendor_id: u32,
    pub product_code: u16,
    pub serial_number: u32,
}

impl TiledDisplay {
    pub(crate) fn parse(revision: u8, payload: &[u8], order: VendorOrder) -> Result<Self> {
        if payload.len() != TILED_DISPLAY_SIZE {
            return Err(length_error("Tiled display topology", payload.len()));
        }
        let capability = payload[0];
        let high = payload[3];
        let density = payload[8];
        let scaled = |value: u8| value as u16 * density as u16 / 10;
        let vendor = &payload[13..16];
        Ok(Self {
            revision,
            single_enclosure: capability & 0x80 != 0,
            has_bezel_info: capability & 0x40 != 0,
            multi_tile_behavior: (capability >> 3) & 0x03,
            single_tile_behavior: capability & 0x07,
            rows: ((high >> 4 & 0x03) << 5 | (payload[1] & 0x0F)) + 1,
            columns: ((high >> 6) << 5 | (payload[1] >> 4)) + 1,
            x: (high >> 2 & 0x03) << 5 | (payload[2] >> 4),
            y: (high & 0x03) << 5 | (payload[2] & 0x0F),
            native_width: u16_le(&payload[4..6]) as u32 + 1,
            native_height: u16_le(&payload[6..8]) as u32 + 1,
            bezel: Bezel {
                pixel_density: density,
                top: scaled(payload[9]),
                bottom: scaled(payload[10]),
                right: scaled(payload[11]),
                left: scaled(payload[12]),
            },
            vendor_id: match order {
                VendorOrder::LittleEndian => u24(vendor),
                VendorOrder::BigEndian => {
                    (vendor[0] as u32) << 16 | (vendor[1] as u32) << 8 | vendor[2] as u32
                }
            },
            product_code: u16_le(&payload[16..18]),
            serial_number: u32_le(&payload[18..22]),
        })
    }
}

/// Decoded DisplayID 1.3 section found in an EDID extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayIdInfo {
    pub version: u8,
    pub revision: u8,
    pub product_type: ProductType,
    pub extension_count: u8,
    pub product_identity: Option<ProductIdentity>,
    pub display_params: Option<DisplayParams>,
    pub color: Option<ColorCharacteristics>,
    pub range_limits: Vec<RangeLimits>,
    pub serial_number: Option<String>,
    pub ascii_strings: Vec<String>,
    pub device: Option<DeviceData>,
    pub power_sequencing: Option<InterfacePowerSequencing>,
    pub interface: Option<DisplayInterface>,
    pub interface_features: Option<InterfaceFeatures>,
    pub stereo: Option<StereoMethod>,
    pub tiled: Option<TiledDisplay>,
    pub cta: Option<CeaInfo>,
    pub vendor: VendorInfo,
}

impl DisplayIdInfo {
    /// Depths the sink declares per color format, from the interface features block when
    /// present, else from the display interface block.
    pub fn interface_depths(&self) -> Option<(ColorDepth, ColorDepth, ColorDepth)> {
        if let Some(features) = &self.interface_features {
            return Some((features.rgb444, features.yuv444, features.yuv422));
        }
        self.interface
            .as_ref()
            .map(|interface| (interface.rgb444, interface.yuv444, interface.yuv422))
    }

    /// Adds 8 bpc to the 4:4:4 and 4:2:2 depths of whichever interface block is present.
    pub fn add_ycbcr_8bpc(&mut self, yuv444: bool, yuv422: bool) {
        let depths = if let Some(features) = self.interface_features.as_mut() {
            Some((&mut features.yuv444, &mut features.yuv422))
        } else {
            self.interface
                .as_mut()
                .map(|interface| (&mut interface.yuv444, &mut interface.yuv422))
        };
        if let Some((depth444, depth422)) = depths {
            if yuv444 {
                *depth444 |= ColorDepth::Bpc8;
            }
            if yuv422 {
                *depth422 |= ColorDepth::Bpc8;
            }
        }
    }
}

fn push_all(
    table: &mut TimingTable,
    descriptors: impl Iterator<Item = Result<Timing>>,
    strict: bool,
    what: &str,
) -> Result<()> {
    for timing in descriptors {
        match timing {
            Ok(timing) => {
                debug!("{}: {}", what, timing.name);
                if !table.assign_next_available(timing) {
                    break;
                }
            }
            Err(e) if strict => return Err(e),
            Err(e) => warn!("Skipping {} descriptor: {}", what, e),
        }
    }
    Ok(())
}

fn descriptors<'a>(
    payload: &'a [u8],
    size: usize,
    what: &str,
) -> Result<std::slice::ChunksExact<'a, u8>> {
    if payload.len() % size != 0 {
        return Err(length_error(what, payload.len()));
    }
    Ok(payload.chunks_exact(size))
}

fn bitmap_codes(bitmap: &[u8]) -> impl Iterator<Item = u8> + '_ {
    bitmap.iter().enumerate().flat_map(|(i, byte)| {
        (0..8usize)
            .filter(move |bit| byte & (1u8 << bit) != 0)
            .map(move |bit| (i * 8 + bit + 1) as u8)
    })
}

fn parse_block(
    header: &BlockHeader,
    payload: &[u8],
    info: &mut DisplayIdInfo,
    table: &mut TimingTable,
    strict: bool,
) -> Result<()> {
    let block_type = BlockType::from_repr(header.block_type).ok_or_else(|| {
        Error::InvalidDataBlock(format!("Unknown DisplayID block 0x{:02X}", header.block_type))
    })?;
    trace!("DisplayID {} block with {} bytes", block_type, payload.len());
    match block_type {
        BlockType::ProductIdentification => {
            info.product_identity = Some(ProductIdentity::parse(payload)?)
        }
        BlockType::DisplayParameters => info.display_params = Some(DisplayParams::parse(payload)?),
        BlockType::ColorCharacteristics => {
            info.color = Some(ColorCharacteristics::parse(payload)?)
        }
        BlockType::TimingType1 => push_all(
            table,
            descriptors(payload, TYPE1_DESCRIPTOR_SIZE, "Type I")?.map(type1_timing),
            strict,
            "Type I",
        )?,
        BlockType::TimingType2 => push_all(
            table,
            descriptors(payload, TYPE2_DESCRIPTOR_SIZE, "Type II")?.map(type2_timing),
            strict,
            "Type II",
        )?,
        BlockType::TimingType3 => push_all(
            table,
            descriptors(payload, TYPE3_DESCRIPTOR_SIZE, "Type III")?.map(type3_timing),
            strict,
            "Type III",
        )?,
        BlockType::TimingType4 => {
            if payload.is_empty() || payload.len() > MAX_BLOCK_PAYLOAD {
                return Err(length_error("Type IV", payload.len()));
            }
            push_all(table, payload.iter().map(|id| enum_dmt(*id)), strict, "Type IV")?
        }
        BlockType::TimingType5 => push_all(
            table,
            descriptors(payload, TYPE5_DESCRIPTOR_SIZE, "Type V")?.map(type5_timing),
            strict,
            "Type V",
        )?,
        BlockType::VesaTimings => {
            if payload.len() != VESA_TIMINGS_SIZE {
                return Err(length_error("VESA timings", payload.len()));
            }
            push_all(table, bitmap_codes(payload).map(enum_dmt), strict, "VESA timing")?
        }
        BlockType::CeaTimings => {
            if payload.len() != CEA_TIMINGS_SIZE {
                return Err(length_error("CEA timings", payload.len()));
            }
            push_all(
                table,
                bitmap_codes(payload).map(enum_cea861_timing),
                strict,
                "CEA timing",
            )?
        }
        BlockType::RangeLimits => {
            let limits = RangeLimits::parse(payload)?;
            if info.range_limits.len() >= MAX_RANGE_LIMITS {
                return Err(Error::InvalidDataBlock(format!(
                    "More than {} range limits blocks",
                    MAX_RANGE_LIMITS
                )));
            }
            info.range_limits.push(limits);
        }
        BlockType::SerialNumber => info.serial_number = Some(ascii(payload)),
        BlockType::AsciiString => info.ascii_strings.push(ascii(payload)),
        BlockType::DeviceData => info.device = Some(DeviceData::parse(payload)?),
        BlockType::InterfacePower => {
            if payload.len() != INTERFACE_POWER_SIZE {
                return Err(length_error("Interface power sequencing", payload.len()));
            }
            info.power_sequencing = Some(read_region(&mut Cursor::new(payload), 0)?);
        }
        BlockType::TransferCharacteristics => {
            debug!("Transfer characteristics block is not decoded")
        }
        BlockType::DisplayInterface => {
            info.interface = Some(DisplayInterface::parse(payload)?);
            info.interface_features = None;
        }
        BlockType::InterfaceFeatures => {
            info.interface_features = Some(InterfaceFeatures::parse(payload)?);
        }
        BlockType::Stereo => info.stereo = Some(StereoMethod::parse(payload)?),
        BlockType::TiledDisplay => {
            let tiled = TiledDisplay::parse(header.revision, payload, VendorOrder::LittleEndian)?;
            if header.revision == 0 && info.tiled.is_some() {
                debug!("Ignoring another revision 0 tiled display block");
            } else {
                info.tiled = Some(tiled);
            }
        }
        BlockType::Cta => parse_cta_block(header, payload, info, table),
    }
    Ok(())
}

fn parse_cta_block(
    header: &BlockHeader,
    payload: &[u8],
    info: &mut DisplayIdInfo,
    table: &mut TimingTable,
) {
    let cta = CeaInfo::from_data_blocks(header.revision & 0x07, payload);
    info.vendor.update(&cta.vsdbs, cta.hf_scdb.as_deref());
    info.vendor.update_video(&cta.vsvdbs);
    let hf = info.vendor.hdmi_forum.as_ref();
    parse_short_timings(&cta, CtaOrigin::DisplayId13, hf, table);
    parse_y420_timings(&cta, CtaOrigin::DisplayId13, hf, table);
    if !cta.preferred_svrs.is_empty() || cta.native_video.is_some() {
        parse_native_or_preferred(&cta, CtaOrigin::DisplayId13, table);
    }
    match info.cta.as_mut() {
        Some(existing) => merge_cta_info(existing, &cta, Precedence::Replace),
        None => info.cta = Some(cta),
    }
}

/// Walks the data blocks of a 1.3 section. Padding must be all zero and a block must not
/// run past the section. A malformed block is skipped unless `strict` is set.
fn parse_blocks(
    data: &[u8],
    info: &mut DisplayIdInfo,
    table: &mut TimingTable,
    strict: bool,
) -> Result<()> {
    let mut offset = 0;
    while offset < data.len() {
        let remaining = &data[offset..];
        let is_product_id = offset == 0
            && remaining.len() > BLOCK_HEADER_SIZE
            && remaining[0] == BlockType::ProductIdentification as u8
            && remaining[2] > 0;
        if remaining[0] == 0 && !is_product_id {
            if remaining.iter().skip(1).any(|byte| *byte != 0) {
                return Err(Error::InvalidDataBlock(format!(
                    "DisplayID padding at {} carries data",
                    offset
                )));
            }
            break;
        }
        if remaining.len() <= BLOCK_HEADER_SIZE {
            return Err(Error::InvalidDataBlock(format!(
                "Truncated DisplayID block header at {}",
                offset
            )));
        }
        let header = BlockHeader::read(remaining)?;
        let end = BLOCK_HEADER_SIZE + header.data_bytes as usize;
        if end > remaining.len() {
            return Err(Error::InvalidDataBlock(format!(
                "DisplayID block 0x{:02X} at {} runs past the section",
                header.block_type, offset
            )));
        }
        if let Err(e) = parse_block(&header, &remaining[BLOCK_HEADER_SIZE..end], info, table, strict)
        {
            if strict {
                return Err(e);
            }
            warn!(
                "Skipping DisplayID block 0x{:02X} at {}: {}",
                header.block_type, offset, e
            );
        }
        offset += end;
    }
    Ok(())
}

/// Checks a section header against the bytes that follow it and returns the header.
pub(crate) fn read_section_header(section: &[u8]) -> Result<SectionHeader> {
    if section.len() <= SECTION_HEADER_SIZE {
        return Err(Error::InvalidEdid(format!(
            "DisplayID section of {} bytes",
            section.len()
        )));
    }
    let header = SectionHeader::read(section)?;
    if header.total_size() > section.len() {
        return Err(Error::InvalidEdid(format!(
            "DisplayID section of {} bytes doesn't fit in {} bytes",
            header.section_bytes,
            section.len()
        )));
    }
    Ok(header)
}

fn parse_section(
    section: &[u8],
    info: &mut DisplayIdInfo,
    table: &mut TimingTable,
    strict: bool,
) -> Result<()> {
    let header = read_section_header(section)?;
    if header.major() != 1 {
        return Err(Error::InvalidEdid(format!(
            "DisplayID version 0x{:02X} is no 1.x section",
            header.version
        )));
    }
    let product_type = ProductType::from_repr(header.product_type).ok_or_else(|| {
        Error::InvalidEdid(format!("DisplayID product type {}", header.product_type))
    })?;
    if checksum(&section[..header.total_size()]) != 0 {
        if strict {
            return Err(Error::InvalidEdid("DisplayID section checksum mismatch".to_string()));
        }
        warn!("DisplayID section checksum mismatch");
    }

    info.version = header.major();
    info.revision = header.minor();
    info.product_type = product_type;
    info.extension_count = header.extension_count;
    let data = &section[SECTION_HEADER_SIZE..SECTION_HEADER_SIZE + header.section_bytes as usize];
    parse_blocks(data, info, table, strict)
}

fn extension_section(block: &[u8]) -> Result<&[u8]> {
    if block.len() < EDID_BLOCK_SIZE || block[0] != DISPLAYID_EXTENSION_TAG {
        return Err(Error::InvalidEdid(
            "Block is no DisplayID extension".to_string(),
        ));
    }
    Ok(&block[1..EDID_BLOCK_SIZE - 1])
}

/// Version nibble of the section embedded in a DisplayID extension block.
pub fn extension_version(block: &[u8]) -> Option<u8> {
    extension_section(block).ok().map(|section| section[0] >> 4)
}

/// Decodes a DisplayID 1.3 extension block. Its timings are appended to `table`, malformed
/// data blocks are skipped.
pub fn parse_displayid_extension(
    block: &[u8],
    info: &mut DisplayIdInfo,
    table: &mut TimingTable,
) -> Result<()> {
    parse_section(extension_section(block)?, info, table, false)
}

/// Same walk as [`parse_displayid_extension`] on scratch state, failing on the first
/// malformed block or descriptor.
pub fn validate_displayid_extension(block: &[u8]) -> Result<()> {
    let mut info = DisplayIdInfo::default();
    let mut table = TimingTable::new();
    parse_section(extension_section(block)?, &mut info, &mut table, true)
}
