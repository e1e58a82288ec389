// SPDX-License-Identifier: MIT

use crate::checksum::{checksum, EDID_BLOCK_SIZE};
use crate::cta861::vic::{enum_cea861_timing, enum_hdmi_ext_timing};
use crate::cta861::vsdb::VendorInfo;
use crate::cta861::{
    merge_cta_info, parse_native_or_preferred, parse_short_timings, parse_y420_timings, BasicCaps,
    CeaInfo, CtaOrigin, Precedence,
};
use crate::displayid::{
    descriptor_aspect, length_error, read_section_header, u16_le, u24, BlockHeader, ChromaPoint,
    DidDetailedTiming, ProductIdentity, StereoMethod, TiledDisplay, VendorOrder,
    BLOCK_HEADER_SIZE, DISPLAYID_EXTENSION_TAG, SECTION_HEADER_SIZE,
};
use crate::formula::dmt::enum_dmt;
use crate::formula::{calc_cvt_rb, calc_cvt_rb2, cvt};
use crate::table::TimingTable;
use crate::timing::{AspectRatio, ColorDepth, Timing, TimingFlags, TimingStatus, TimingType};
use crate::{Error, Result};
use bitflags::bitflags;
use log::{debug, trace, warn};
use serde::Serialize;
use strum::FromRepr;

pub const DISPLAYID20_VERSION: u8 = 2;

const DISPLAY_PARAMS_SIZE: usize = 29;
const RANGE_LIMITS_SIZE: usize = 9;
const INTERFACE_FEATURES_MIN_SIZE: usize = 9;
const CONTAINER_ID_SIZE: usize = 16;
const VESA_VENDOR_SPECIFIC_SIZE: usize = 7;
const TYPE7_DESCRIPTOR_SIZE: usize = 20;
const TYPE9_DESCRIPTOR_SIZE: usize = 6;
const TYPE10_DESCRIPTOR_SIZE: usize = 6;
const ADAPTIVE_SYNC_DESCRIPTOR_SIZE: usize = 6;

const TYPE7_DSC_PASSTHROUGH_REVISION: u8 = 1;
const TYPE7_YCC420_REVISION: u8 = 2;

pub const VESA_IEEE_ID: u32 = 0x3A0292;

/// 4:2:0 minimum pixel rate step, 74.25 MP/s in 10 kHz units.
const YUV420_MIN_PCLK_UNIT: u32 = 7425;

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromRepr, strum::Display)]
#[repr(u8)]
pub enum BlockType {
    ProductIdentity = 0x20,
    DisplayParameters = 0x21,
    TimingType7 = 0x22,
    TimingType8 = 0x23,
    TimingType9 = 0x24,
    RangeLimits = 0x25,
    InterfaceFeatures = 0x26,
    Stereo = 0x27,
    TiledDisplay = 0x28,
    ContainerId = 0x29,
    TimingType10 = 0x2A,
    AdaptiveSync = 0x2B,
    VendorSpecific = 0x7E,
    Cta = 0x81,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, FromRepr, Serialize)]
#[repr(u8)]
pub enum PrimaryUseCase {
    #[default]
    Extension = 0,
    TestEquipment = 1,
    GenericDisplay = 2,
    Television = 3,
    DesktopProductivity = 4,
    DesktopGaming = 5,
    Presentation = 6,
    HeadMountVirtualReality = 7,
    HeadMountAugmentedReality = 8,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidBlocks(u16);
bitflags! {
    impl ValidBlocks: u16 {
        const ProductId = 0x0001;
        const Parameters = 0x0002;
        const Type7Timing = 0x0004;
        const Type8Timing = 0x0008;
        const Type9Timing = 0x0010;
        const DynamicRangeLimit = 0x0020;
        const InterfaceFeature = 0x0040;
        const StereoInterface = 0x0080;
        const TiledDisplay = 0x0100;
        const ContainerId = 0x0200;
        const Type10Timing = 0x0400;
        const AdaptiveSync = 0x0800;
        const VendorSpecific = 0x1000;
        const CtaData = 0x2000;
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Did20ValidationErrors(u8);
bitflags! {
    impl Did20ValidationErrors: u8 {
        const Version = 0x01;
        const ProductId = 0x02;
        const NoDataBlock = 0x04;
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub enum LuminanceInfo {
    #[default]
    MinimumGuaranteed,
    SourceDeviceGuidance,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayParams {
    pub revision: u8,
    /// Image size in micrometers.
    pub h_image_size_um: u32,
    pub v_image_size_um: u32,
    pub h_pixels: u16,
    pub v_pixels: u16,
    pub scan_orientation: u8,
    pub luminance_info: LuminanceInfo,
    pub audio_speakers_integrated: bool,
    /// Chromaticities are CIE 1976 rather than CIE 1931.
    pub cie_1976: bool,
    pub primaries: [ChromaPoint; 3],
    pub white: ChromaPoint,
    /// IEEE 754 half precision, cd/m2.
    pub max_luminance_full_coverage: u16,
    pub max_luminance_1_percent: u16,
    pub min_luminance: u16,
    pub native_depth: ColorDepth,
    pub device_technology: u8,
    pub device_theme_preference: u8,
    pub gamma_x100: u16,
}

impl DisplayParams {
    pub fn parse(header: &BlockHeader, payload: &[u8]) -> Result<Self> {
        if payload.len() != DISPLAY_PARAMS_SIZE {
            return Err(length_error("Display parameters", payload.len()));
        }
        let revision = header.revision & 0x07;
        let unit = if header.revision & 0x80 != 0 { 1000 } else { 100 };
        let features = payload[8];
        let luminance_info = match (features >> 3) & 0x03 {
            0 => LuminanceInfo::MinimumGuaranteed,
            1 => LuminanceInfo::SourceDeviceGuidance,
            code => {
                return Err(Error::InvalidDataBlock(format!(
                    "Display parameters luminance information {}",
                    code
                )))
            }
        };
        let native_depth = match payload[27] & 0x07 {
            1 => ColorDepth::Bpc6,
            2 => ColorDepth::Bpc8,
            3 => ColorDepth::Bpc10,
            4 => ColorDepth::Bpc12,
            5 => ColorDepth::Bpc16,
            _ => ColorDepth::empty(),
        };
        Ok(Self {
            revision,
            h_image_size_um: u16_le(&payload[0..2]) as u32 * unit,
            v_image_size_um: u16_le(&payload[2..4]) as u32 * unit,
            h_pixels: u16_le(&payload[4..6]),
            v_pixels: u16_le(&payload[6..8]),
            scan_orientation: features & 0x07,
            luminance_info,
            audio_speakers_integrated: features & 0x80 == 0,
            cie_1976: features & 0x40 != 0,
            primaries: [
                ChromaPoint::from_bytes(&payload[9..12]),
                ChromaPoint::from_bytes(&payload[12..15]),
                ChromaPoint::from_bytes(&payload[15..18]),
            ],
            white: ChromaPoint::from_bytes(&payload[18..21]),
            max_luminance_full_coverage: u16_le(&payload[21..23]),
            max_luminance_1_percent: u16_le(&payload[23..25]),
            min_luminance: u16_le(&payload[25..27]),
            native_depth,
            device_technology: (payload[27] >> 4) & 0x07,
            device_theme_preference: if revision == 1 { payload[27] >> 7 } else { 0 },
            gamma_x100: payload[28] as u16 + 100,
        })
    }
}

/// Dynamic video timing range.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RangeLimits {
    pub revision: u8,
    /// kHz
    pub pclk_min: u32,
    pub pclk_max: u32,
    /// Hz
    pub vfreq_min: u8,
    pub vfreq_max: u16,
    pub seamless_change: bool,
}

impl RangeLimits {
    pub fn parse(header: &BlockHeader, payload: &[u8]) -> Result<Self> {
        if payload.len() != RANGE_LIMITS_SIZE {
            return Err(length_error("Dynamic video timing range", payload.len()));
        }
        let revision = header.revision & 0x07;
        let high = payload[8];
        Ok(Self {
            revision,
            pclk_min: u24(&payload[0..3]) + 1,
            pclk_max: u24(&payload[3..6]) + 1,
            vfreq_min: payload[6],
            vfreq_max: if revision == 1 {
                ((high & 0x03) as u16) << 8 | payload[7] as u16
            } else {
                payload[7] as u16
            },
            seamless_change: high & 0x80 != 0,
        })
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AudioRates(u8);
bitflags! {
    impl AudioRates: u8 {
        const Khz48 = 0b00100000;
        const Khz44_1 = 0b01000000;
        const Khz32 = 0b10000000;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromRepr, Serialize)]
#[repr(u8)]
pub enum ColorSpace {
    NotDefined = 0,
    Srgb = 1,
    Bt601 = 2,
    Bt709 = 3,
    AdobeRgb = 4,
    DciP3 = 5,
    Bt2020 = 6,
    Custom = 7,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromRepr, Serialize)]
#[repr(u8)]
pub enum Eotf {
    NotDefined = 0,
    Srgb = 1,
    Bt601 = 2,
    Bt1886 = 3,
    AdobeRgb = 4,
    DciP3 = 5,
    Bt2020 = 6,
    Gamma = 7,
    SmpteSt2084 = 8,
    HybridLogGamma = 9,
    Custom = 10,
}

const STANDARD_COMBINATIONS: [(ColorSpace, Eotf); 7] = [
    (ColorSpace::Srgb, Eotf::Srgb),
    (ColorSpace::Bt601, Eotf::Bt601),
    (ColorSpace::Bt709, Eotf::Bt1886),
    (ColorSpace::AdobeRgb, Eotf::AdobeRgb),
    (ColorSpace::DciP3, Eotf::DciP3),
    (ColorSpace::Bt2020, Eotf::Bt2020),
    (ColorSpace::Bt2020, Eotf::SmpteSt2084),
];

/// Display interface features, shared by DisplayID 2.0 and the 1.3 block of the same tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterfaceFeatures {
    pub rgb444: ColorDepth,
    pub yuv444: ColorDepth,
    pub yuv422: ColorDepth,
    pub yuv420: ColorDepth,
    /// Lowest pixel clock, in 10 kHz units, at which 4:2:0 is offered.
    pub yuv420_min_pclk: u32,
    pub audio: AudioRates,
    pub color_spaces: Vec<(ColorSpace, Eotf)>,
}

impl InterfaceFeatures {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < INTERFACE_FEATURES_MIN_SIZE {
            return Err(length_error("Display interface features", payload.len()));
        }
        let additional = (payload[8] & 0x07) as usize;
        if payload.len() < INTERFACE_FEATURES_MIN_SIZE + additional {
            return Err(length_error("Display interface features", payload.len()));
        }
        let mut color_spaces = STANDARD_COMBINATIONS
            .iter()
            .enumerate()
            .filter(|(bit, _)| payload[6] & (1u8 << bit) != 0)
            .map(|(_, combination)| *combination)
            .collect::<Vec<_>>();
        for byte in &payload[INTERFACE_FEATURES_MIN_SIZE..INTERFACE_FEATURES_MIN_SIZE + additional] {
            match (ColorSpace::from_repr(byte >> 4), Eotf::from_repr(byte & 0x0F)) {
                (Some(space), Some(eotf)) => color_spaces.push((space, eotf)),
                _ => warn!("Skipping color space and EOTF combination 0x{:02X}", byte),
            }
        }
        Ok(Self {
            rgb444: ColorDepth::from_bitmap(payload[0]),
            yuv444: ColorDepth::from_bitmap(payload[1]),
            // 4:2:2 and 4:2:0 start at 8 bpc
            yuv422: ColorDepth::from_bitmap(payload[2] << 1),
            yuv420: ColorDepth::from_bitmap(payload[3] << 1),
            yuv420_min_pclk: payload[4] as u32 * YUV420_MIN_PCLK_UNIT,
            audio: AudioRates::from_bits_truncate(payload[5]),
            color_spaces,
        })
    }

    /// Folds the declared depths into `timing`. RGB 6 and 8 bpc are always offered, 4:2:0 is
    /// left alone on CTA-861 formats, which declare it themselves.
    pub fn apply_to(&self, timing: &mut Timing) {
        timing.color.rgb444 |= ColorDepth::Bpc6 | ColorDepth::Bpc8 | self.rgb444;
        timing.color.yuv444 |= self.yuv444 - ColorDepth::Bpc6;
        timing.color.yuv422 |= self.yuv422 - ColorDepth::Bpc6;
        let from_cta =
            timing.flags.contains(TimingFlags::DisplayId20Timing) && timing.status.is_cta861();
        if !from_cta {
            timing.color.yuv420 |= self.yuv420 - ColorDepth::Bpc6;
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VesaVendorSpecific {
    pub data_struct_type: u8,
    pub color_space_and_eotf: u8,
    pub pixels_overlapping: u8,
    pub multi_sst: u8,
    pub pass_through_integer: u8,
    pub pass_through_fraction: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VendorSpecific {
    pub ieee_id: u32,
    pub data: Vec<u8>,
    pub vesa: Option<VesaVendorSpecific>,
}

impl VendorSpecific {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < 3 {
            return Err(length_error("Vendor specific", payload.len()));
        }
        let ieee_id = (payload[0] as u32) << 16 | (payload[1] as u32) << 8 | payload[2] as u32;
        let vesa = if ieee_id == VESA_IEEE_ID {
            if payload.len() != VESA_VENDOR_SPECIFIC_SIZE {
                return Err(length_error("VESA vendor specific", payload.len()));
            }
            Some(VesaVendorSpecific {
                data_struct_type: payload[3] & 0x07,
                color_space_and_eotf: payload[3] >> 7,
                pixels_overlapping: payload[4] & 0x0F,
                multi_sst: (payload[4] >> 5) & 0x03,
                pass_through_integer: payload[5] & 0x3F,
                pass_through_fraction: payload[6] & 0x0F,
            })
        } else {
            None
        };
        Ok(Self {
            ieee_id,
            data: payload[3..].to_vec(),
            vesa,
        })
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdaptiveSync {
    pub fixed_average_range: bool,
    pub successive_increase: bool,
    pub successive_decrease: bool,
    /// Max single frame duration increase, in 0.25 ms.
    pub max_duration_increase: u8,
    pub min_refresh_rate: u8,
    pub max_refresh_rate: u16,
    pub max_duration_decrease: u8,
}

impl AdaptiveSync {
    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            fixed_average_range: bytes[0] & 0x01 != 0,
            successive_increase: bytes[0] & 0x02 != 0,
            successive_decrease: bytes[0] & 0x04 != 0,
            max_duration_increase: bytes[1],
            min_refresh_rate: bytes[2],
            max_refresh_rate: (u16_le(&bytes[3..5]) & 0x03FF) + 1,
            max_duration_decrease: bytes[5],
        }
    }
}

/// Decoded DisplayID 2.0 structure, standalone or carried by EDID extension blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayId20Info {
    pub version: u8,
    pub revision: u8,
    pub primary_use_case: PrimaryUseCase,
    pub extension_count: u8,
    pub as_edid_extension: bool,
    pub valid_blocks: ValidBlocks,
    pub basic_caps: BasicCaps,
    pub product_identity: Option<ProductIdentity>,
    pub display_params: Option<DisplayParams>,
    pub range_limits: Option<RangeLimits>,
    pub interface_features: InterfaceFeatures,
    pub stereo: Option<StereoMethod>,
    pub tiled: Option<TiledDisplay>,
    pub container_id: Option<[u8; CONTAINER_ID_SIZE]>,
    pub vendor_specific: Vec<VendorSpecific>,
    pub adaptive_sync: Vec<AdaptiveSync>,
    pub cta: Option<CeaInfo>,
    pub vendor: VendorInfo,
    pub timings: TimingTable,
}

impl DisplayId20Info {
    /// Container ID in the usual 8-4-4-4-12 form.
    pub fn container_id_string(&self) -> Option<String> {
        self.container_id.map(|id| {
            let hex = |bytes: &[u8]| bytes.iter().map(|b| format!("{:02X}", b)).collect::<String>();
            format!(
                "{}-{}-{}-{}-{}",
                hex(&id[0..4]),
                hex(&id[4..6]),
                hex(&id[6..8]),
                hex(&id[8..10]),
                hex(&id[10..16])
            )
        })
    }

    /// Applies the interface features depths to every timing collected so far.
    pub fn update_timing_colors(&mut self) {
        let features = self.interface_features.clone();
        for timing in self.timings.iter_mut() {
            features.apply_to(timing);
        }
    }

    fn count_type(&self, timing_type: TimingType) -> u8 {
        self.timings
            .iter()
            .filter(|timing| timing.status.is_type(timing_type))
            .count() as u8
    }
}

fn gcd(mut x: u32, mut y: u32) -> u32 {
    while x > 0 {
        let g = x;
        x = y % x;
        y = g;
    }
    y
}

/// `prefix:#seq:WxHxR.mmmHz/P`, height per frame when `frame` is set.
pub(crate) fn descriptor_name(prefix: &str, timing: &Timing, frame: bool) -> String {
    format!(
        "{}:#{:3}:{}x{}x{}.{:03}Hz/{}",
        prefix,
        timing.status.seq(),
        timing.h_visible,
        if frame { timing.frame_height() } else { timing.v_visible as u32 },
        timing.refresh_rate_x1k / 1000,
        timing.refresh_rate_x1k % 1000,
        if timing.interlaced { "I" } else { "P" }
    )
}

/// Type VII detailed timing. The pixel clock is stored in kHz. From revision 2 on, bit 7 of
/// the options flags 4:2:0 support instead of the preferred timing.
pub(crate) fn type7_timing(bytes: &[u8], revision: u8, dsc_passthrough: bool) -> Result<Timing> {
    let descriptor = DidDetailedTiming::read(bytes)?;
    let mut timing = descriptor.raster()?;
    let pclk_khz = descriptor.pixel_clock();
    timing.pclk = pclk_khz / 10;
    timing.pclk_1khz = pclk_khz;
    timing.aspect = match descriptor.aspect_code() {
        8 => {
            let divisor = gcd(timing.h_visible as u32, timing.v_visible as u32);
            if divisor == 0 {
                AspectRatio::default()
            } else {
                AspectRatio::new(
                    (timing.h_visible as u32 / divisor) as u16,
                    (timing.v_visible as u32 / divisor) as u16,
                )
            }
        }
        code => descriptor_aspect(code).unwrap_or_default(),
    };
    timing.update_refresh_rates();

    if dsc_passthrough && revision >= TYPE7_DSC_PASSTHROUGH_REVISION {
        timing.flags |= TimingFlags::DisplayIdT7DscPassthrough;
    }
    if revision >= TYPE7_YCC420_REVISION {
        if descriptor.bit7() {
            timing.flags |= TimingFlags::ExplicitYuv420;
            timing.color.yuv420 |=
                ColorDepth::Bpc8 | ColorDepth::Bpc10 | ColorDepth::Bpc12 | ColorDepth::Bpc16;
        }
    } else if descriptor.bit7() {
        timing.flags |= TimingFlags::DisplayIdDtdPreferred;
    }
    Ok(timing)
}

/// Type VIII timing code of `code_type`: 0 is a DMT ID, 1 a CTA-861 VIC, 2 an HDMI VIC.
pub(crate) fn type8_timing(code: u16, code_type: u8) -> Result<Timing> {
    let code = u8::try_from(code)
        .map_err(|_| Error::OutOfRange(format!("Type VIII timing code {}", code)))?;
    match code_type {
        0 => enum_dmt(code),
        1 => enum_cea861_timing(code),
        2 => enum_hdmi_ext_timing(code),
        _ => Err(Error::InvalidDescriptor(format!(
            "Type VIII code type {}",
            code_type
        ))),
    }
}

/// CVT formula selector of the type IX and type X descriptors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromRepr, Serialize)]
#[repr(u8)]
pub enum CvtFormula {
    Standard = 0,
    ReducedBlanking1 = 1,
    ReducedBlanking2 = 2,
    ReducedBlanking3 = 3,
}

impl CvtFormula {
    fn suffix(&self) -> &'static str {
        match self {
            CvtFormula::Standard => "",
            CvtFormula::ReducedBlanking1 => "RB1",
            CvtFormula::ReducedBlanking2 => "RB2",
            CvtFormula::ReducedBlanking3 => "RB3",
        }
    }

    fn calc(&self, width: u32, height: u32, rr: u32, video_optimized: bool) -> Result<Timing> {
        match self {
            CvtFormula::Standard => cvt::cvt(width, height, rr, false),
            CvtFormula::ReducedBlanking1 => calc_cvt_rb(width, height, rr, false),
            CvtFormula::ReducedBlanking2 => calc_cvt_rb2(width, height, rr, video_optimized),
            CvtFormula::ReducedBlanking3 => Err(Error::InvalidDescriptor(format!(
                "CVT-RB3 {}x{}@{} can't be synthesized",
                width, height, rr
            ))),
        }
    }
}

/// Formula-based descriptor of the type IX (6 bytes) and type X (6 or 7 bytes) blocks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct FormulaDescriptor {
    pub formula: CvtFormula,
    pub width: u32,
    pub height: u32,
    pub rr: u32,
    /// Fractional refresh rate for RB2, or the RB3 blanking variant.
    pub video_optimized: bool,
    pub yuv420: bool,
}

impl FormulaDescriptor {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < TYPE9_DESCRIPTOR_SIZE {
            return Err(Error::InvalidDescriptor(format!(
                "Formula descriptor of {} bytes",
                bytes.len()
            )));
        }
        let options = bytes[0];
        let formula = CvtFormula::from_repr(options & 0x07).ok_or_else(|| {
            Error::InvalidDescriptor(format!("Timing formula {}", options & 0x07))
        })?;
        let rr = match bytes.get(6) {
            Some(high) => ((*high as u32 & 0x03) << 8 | bytes[5] as u32) + 1,
            None => bytes[5] as u32 + 1,
        };
        Ok(Self {
            formula,
            width: u16_le(&bytes[1..3]) as u32 + 1,
            height: u16_le(&bytes[3..5]) as u32 + 1,
            rr,
            video_optimized: options & 0x10 != 0,
            yuv420: options & 0x80 != 0,
        })
    }

    pub fn timing(&self) -> Result<Timing> {
        self.formula
            .calc(self.width, self.height, self.rr, self.video_optimized)
    }

    pub fn name_suffix(&self) -> &'static str {
        self.formula.suffix()
    }
}

fn push_timing(info: &mut DisplayId20Info, timing: Timing) -> bool {
    debug!("DisplayID 2.0 timing {}", timing.name);
    info.timings.assign_next_available(timing)
}

fn parse_type7_block(header: &BlockHeader, payload: &[u8], info: &mut DisplayId20Info) -> Result<()> {
    let extra = ((header.revision >> 4) & 0x07) as usize;
    if extra != 0 {
        debug!("Type VII descriptors with {} extra bytes are not decoded", extra);
        return Ok(());
    }
    if payload.is_empty() || payload.len() % TYPE7_DESCRIPTOR_SIZE != 0 {
        return Err(length_error("Type VII", payload.len()));
    }
    let revision = header.revision & 0x07;
    let dsc = header.revision & 0x08 != 0;
    let start = info.count_type(TimingType::DisplayId7);
    for (i, bytes) in payload.chunks_exact(TYPE7_DESCRIPTOR_SIZE).enumerate() {
        match type7_timing(bytes, revision, dsc) {
            Ok(mut timing) => {
                timing.status = TimingStatus::of(TimingType::DisplayId7, start + i as u8 + 1);
                timing.set_name(descriptor_name("DID20-Type7", &timing, true));
                if !push_timing(info, timing) {
                    break;
                }
            }
            Err(e) => warn!("Skipping type VII descriptor {}: {}", i, e),
        }
    }
    Ok(())
}

/// Codes of a type VIII payload, one or two bytes each.
pub(crate) fn type8_codes(payload: &[u8], two_bytes: bool) -> Vec<u16> {
    if two_bytes {
        payload.chunks_exact(2).map(u16_le).collect()
    } else {
        payload.iter().map(|code| *code as u16).collect()
    }
}

fn parse_type8_block(header: &BlockHeader, payload: &[u8], info: &mut DisplayId20Info) -> Result<()> {
    let two_bytes = header.revision & 0x08 != 0;
    if payload.is_empty() || (two_bytes && payload.len() % 2 != 0) {
        return Err(length_error("Type VIII", payload.len()));
    }
    let revision = header.revision & 0x07;
    let yuv420 = revision >= 1 && header.revision & 0x20 != 0;
    let code_type = header.revision >> 6;
    let mut seq = info.count_type(TimingType::DisplayId8);
    for code in type8_codes(payload, two_bytes) {
        let mut timing = match type8_timing(code, code_type) {
            Ok(timing) => timing,
            Err(e) => {
                warn!("Stopping at type VIII code {}: {}", code, e);
                break;
            }
        };
        if yuv420 {
            timing.flags |= TimingFlags::ExplicitYuv420;
        }
        seq += 1;
        timing.status = TimingStatus::of(TimingType::DisplayId8, seq);
        timing.set_name(descriptor_name("DID20-Type8", &timing, false));
        if !push_timing(info, timing) {
            break;
        }
    }
    Ok(())
}

fn parse_type9_block(payload: &[u8], info: &mut DisplayId20Info) -> Result<()> {
    if payload.len() < TYPE9_DESCRIPTOR_SIZE {
        return Err(length_error("Type IX", payload.len()));
    }
    let start = info.count_type(TimingType::DisplayId9);
    for (i, bytes) in payload.chunks_exact(TYPE9_DESCRIPTOR_SIZE).enumerate() {
        let timing = FormulaDescriptor::parse(bytes).and_then(|descriptor| {
            let mut timing = descriptor.timing()?;
            timing.status = TimingStatus::of(TimingType::DisplayId9, start + i as u8 + 1);
            let prefix = match descriptor.formula {
                CvtFormula::Standard => "DID20-Type9".to_string(),
                formula => format!("DID20-Type9-{}", formula.suffix()),
            };
            timing.set_name(descriptor_name(&prefix, &timing, false));
            Ok(timing)
        });
        match timing {
            Ok(timing) => {
                if !push_timing(info, timing) {
                    break;
                }
            }
            Err(e) => warn!("Skipping type IX descriptor {}: {}", i, e),
        }
    }
    Ok(())
}

fn parse_type10_block(header: &BlockHeader, payload: &[u8], info: &mut DisplayId20Info) -> Result<()> {
    let size = TYPE10_DESCRIPTOR_SIZE + ((header.revision >> 4) & 0x07) as usize;
    if size > TYPE10_DESCRIPTOR_SIZE + 1 || payload.len() < size {
        return Err(length_error("Type X", payload.len()));
    }
    let start = info.count_type(TimingType::DisplayId10);
    for (i, bytes) in payload.chunks_exact(size).enumerate() {
        let timing = FormulaDescriptor::parse(bytes).and_then(|descriptor| {
            let mut timing = descriptor.timing()?;
            timing.status = TimingStatus::of(TimingType::DisplayId10, start + i as u8 + 1);
            if descriptor.yuv420 {
                timing.color.yuv420 |=
                    ColorDepth::Bpc8 | ColorDepth::Bpc10 | ColorDepth::Bpc12 | ColorDepth::Bpc16;
            }
            let prefix = format!("DID20-Type10{}", descriptor.name_suffix());
            timing.set_name(descriptor_name(&prefix, &timing, false));
            Ok(timing)
        });
        match timing {
            Ok(timing) => {
                if !push_timing(info, timing) {
                    break;
                }
            }
            Err(e) => warn!("Skipping type X descriptor {}: {}", i, e),
        }
    }
    Ok(())
}

fn parse_adaptive_sync(header: &BlockHeader, payload: &[u8]) -> Result<Vec<AdaptiveSync>> {
    let size = ADAPTIVE_SYNC_DESCRIPTOR_SIZE + ((header.revision >> 4) & 0x07) as usize;
    if payload.is_empty() || payload.len() % size != 0 {
        return Err(length_error("Adaptive sync", payload.len()));
    }
    Ok(payload.chunks_exact(size).map(AdaptiveSync::from_bytes).collect())
}

fn parse_stereo(payload: &[u8]) -> Result<StereoMethod> {
    let Some((&length, method)) = payload.split_first() else {
        return Err(length_error("Stereo display interface", 0));
    };
    if method.len() != length as usize + 1 {
        return Err(length_error("Stereo display interface", payload.len()));
    }
    StereoMethod::parse(method)
}

fn parse_cta_block(header: &BlockHeader, payload: &[u8], info: &mut DisplayId20Info) {
    let cta = CeaInfo::from_data_blocks(header.revision & 0x07, payload);
    info.vendor.update(&cta.vsdbs, cta.hf_scdb.as_deref());
    info.vendor.update_video(&cta.vsvdbs);
    let hf = info.vendor.hdmi_forum.as_ref();
    parse_short_timings(&cta, CtaOrigin::DisplayId20, hf, &mut info.timings);
    parse_y420_timings(&cta, CtaOrigin::DisplayId20, hf, &mut info.timings);
    if !cta.preferred_svrs.is_empty() || cta.native_video.is_some() {
        parse_native_or_preferred(&cta, CtaOrigin::DisplayId20, &mut info.timings);
    }
    match info.cta.as_mut() {
        Some(existing) => merge_cta_info(existing, &cta, Precedence::Replace),
        None => info.cta = Some(cta),
    }
}

fn parse_block(header: &BlockHeader, payload: &[u8], info: &mut DisplayId20Info) -> Result<()> {
    let block_type = BlockType::from_repr(header.block_type).ok_or_else(|| {
        Error::InvalidDataBlock(format!(
            "Unknown DisplayID 2.0 block 0x{:02X}",
            header.block_type
        ))
    })?;
    trace!("DisplayID 2.0 {} block with {} bytes", block_type, payload.len());
    let valid = match block_type {
        BlockType::ProductIdentity => {
            info.product_identity = Some(ProductIdentity::parse(payload)?);
            ValidBlocks::ProductId
        }
        BlockType::DisplayParameters => {
            let params = DisplayParams::parse(header, payload)?;
            if params.audio_speakers_integrated {
                info.basic_caps |= BasicCaps::BasicAudio;
            }
            info.display_params = Some(params);
            ValidBlocks::Parameters
        }
        BlockType::TimingType7 => {
            parse_type7_block(header, payload, info)?;
            ValidBlocks::Type7Timing
        }
        BlockType::TimingType8 => {
            parse_type8_block(header, payload, info)?;
            ValidBlocks::Type8Timing
        }
        BlockType::TimingType9 => {
            parse_type9_block(payload, info)?;
            ValidBlocks::Type9Timing
        }
        BlockType::TimingType10 => {
            parse_type10_block(header, payload, info)?;
            ValidBlocks::Type10Timing
        }
        BlockType::RangeLimits => {
            info.range_limits = Some(RangeLimits::parse(header, payload)?);
            ValidBlocks::DynamicRangeLimit
        }
        BlockType::InterfaceFeatures => {
            let features = InterfaceFeatures::parse(payload)?;
            if !features.yuv444.is_empty() {
                info.basic_caps |= BasicCaps::YCbCr444;
            }
            if !features.yuv422.is_empty() {
                info.basic_caps |= BasicCaps::YCbCr422;
            }
            if !features.audio.is_empty() {
                info.basic_caps |= BasicCaps::BasicAudio;
            }
            info.interface_features = features;
            ValidBlocks::InterfaceFeature
        }
        BlockType::Stereo => {
            info.stereo = Some(parse_stereo(payload)?);
            ValidBlocks::StereoInterface
        }
        BlockType::TiledDisplay => {
            info.tiled = Some(TiledDisplay::parse(
                header.revision & 0x07,
                payload,
                VendorOrder::BigEndian,
            )?);
            ValidBlocks::TiledDisplay
        }
        BlockType::ContainerId => {
            let id: [u8; CONTAINER_ID_SIZE] = payload
                .try_into()
                .map_err(|_| length_error("Container ID", payload.len()))?;
            info.container_id = Some(id);
            ValidBlocks::ContainerId
        }
        BlockType::AdaptiveSync => {
            info.adaptive_sync = parse_adaptive_sync(header, payload)?;
            ValidBlocks::AdaptiveSync
        }
        BlockType::VendorSpecific => {
            info.vendor_specific.push(VendorSpecific::parse(payload)?);
            ValidBlocks::VendorSpecific
        }
        BlockType::Cta => {
            parse_cta_block(header, payload, info);
            ValidBlocks::CtaData
        }
    };
    info.valid_blocks |= valid;
    Ok(())
}

/// Walks the data blocks of one section. A zero tag starts the padding, a block running
/// past the section is an error. A malformed block is skipped unless `strict` is set.
fn parse_blocks(data: &[u8], info: &mut DisplayId20Info, strict: bool) -> Result<()> {
    let mut offset = 0;
    while offset < data.len() {
        let remaining = &data[offset..];
        if remaining[0] == 0 {
            break;
        }
        if remaining.len() < BLOCK_HEADER_SIZE {
            return Err(Error::InvalidDataBlock(format!(
                "Truncated DisplayID 2.0 block header at {}",
                offset
            )));
        }
        let header = BlockHeader::read(remaining)?;
        let end = BLOCK_HEADER_SIZE + header.data_bytes as usize;
        if end > remaining.len() {
            return Err(Error::InvalidDataBlock(format!(
                "DisplayID 2.0 block 0x{:02X} at {} runs past the section",
                header.block_type, offset
            )));
        }
        if let Err(e) = parse_block(&header, &remaining[BLOCK_HEADER_SIZE..end], info) {
            if strict {
                return Err(e);
            }
            warn!(
                "Skipping DisplayID 2.0 block 0x{:02X} at {}: {}",
                header.block_type, offset, e
            );
        }
        offset += end;
    }
    Ok(())
}

/// Parses one section and returns its total size. The first section carries the primary use
/// case, the others are extension sections. A checksum mismatch aborts the section.
fn parse_section(section: &[u8], info: &mut DisplayId20Info, strict: bool) -> Result<usize> {
    let header = read_section_header(section)?;
    if header.major() != DISPLAYID20_VERSION {
        return Err(Error::InvalidEdid(format!(
            "DisplayID version 0x{:02X} is no 2.x section",
            header.version
        )));
    }
    let total = header.total_size();
    if checksum(&section[..total]) != 0 {
        return Err(Error::InvalidEdid(
            "DisplayID 2.0 section checksum mismatch".to_string(),
        ));
    }

    if info.version == 0 {
        let use_case = PrimaryUseCase::from_repr(header.product_type)
            .filter(|use_case| *use_case != PrimaryUseCase::Extension)
            .ok_or_else(|| {
                Error::InvalidEdid(format!(
                    "DisplayID 2.0 primary use case {}",
                    header.product_type
                ))
            })?;
        info.version = header.major();
        info.revision = header.minor();
        info.primary_use_case = use_case;
        info.extension_count = header.extension_count;
    }
    let data = &section[SECTION_HEADER_SIZE..SECTION_HEADER_SIZE + header.section_bytes as usize];
    parse_blocks(data, info, strict)?;
    Ok(total)
}

fn parse_structure(data: &[u8], strict: bool) -> Result<DisplayId20Info> {
    let mut info = DisplayId20Info::default();
    let mut offset = parse_section(data, &mut info, strict)?;
    for index in 0..info.extension_count {
        let section = data.get(offset..).filter(|rest| !rest.is_empty()).ok_or_else(|| {
            Error::InvalidEdid(format!("DisplayID 2.0 extension section {} is missing", index))
        })?;
        offset += parse_section(section, &mut info, strict)?;
    }
    info.update_timing_colors();
    Ok(info)
}

/// Decodes a standalone DisplayID 2.0 structure: the base section followed by its extension
/// sections.
pub fn parse_displayid20(data: &[u8]) -> Result<DisplayId20Info> {
    parse_structure(data, false)
}

/// Decodes the DisplayID 2.0 section carried by an EDID extension block into `info`. Timings
/// stay in `info.timings` until the caller moves them to the EDID table.
pub fn parse_displayid20_extension(block: &[u8], info: &mut DisplayId20Info) -> Result<()> {
    if block.len() < EDID_BLOCK_SIZE || block[0] != DISPLAYID_EXTENSION_TAG {
        return Err(Error::InvalidEdid("Block is no DisplayID extension".to_string()));
    }
    info.as_edid_extension = true;
    parse_section(&block[1..EDID_BLOCK_SIZE - 1], info, false)?;
    Ok(())
}

/// Defects of a decoded structure. Strong validation also checks the preferred timings
/// against the native pixel format.
pub fn validation_mask(info: &DisplayId20Info, strong: bool) -> Did20ValidationErrors {
    let mut errors = Did20ValidationErrors::empty();
    if info.version != DISPLAYID20_VERSION {
        errors |= Did20ValidationErrors::Version;
    }
    if !info.valid_blocks.contains(ValidBlocks::ProductId) {
        errors |= Did20ValidationErrors::ProductId;
    }
    let mandatory = ValidBlocks::Parameters | ValidBlocks::InterfaceFeature | ValidBlocks::Type7Timing;
    if (PrimaryUseCase::GenericDisplay..=PrimaryUseCase::HeadMountAugmentedReality)
        .contains(&info.primary_use_case)
        && (!info.valid_blocks.contains(mandatory) || info.timings.is_empty())
    {
        errors |= Did20ValidationErrors::NoDataBlock;
    }
    if strong {
        if let Some(params) = info.display_params.filter(|p| p.h_pixels != 0 && p.v_pixels != 0) {
            let mismatch = info.timings.iter().any(|timing| {
                timing.is_preferred_displayid()
                    && (timing.h_visible != params.h_pixels || timing.v_visible != params.v_pixels)
            });
            if mismatch {
                errors |= Did20ValidationErrors::NoDataBlock;
            }
        }
    }
    errors
}

/// Parses `data` strictly and reports its defects. A structure that can't be walked at all
/// is a version defect.
pub fn validate_displayid20(data: &[u8], strong: bool) -> Did20ValidationErrors {
    match parse_structure(data, true) {
        Ok(info) => validation_mask(&info, strong),
        Err(e) => {
            debug!("DisplayID 2.0 structure rejected: {}", e);
            Did20ValidationErrors::Version
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::displayid20::*;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    /// Standalone section with `blocks` and a fixed checksum.
    pub fn section(use_case: u8, extension_count: u8, blocks: &[u8]) -> Vec<u8> {
        let mut section = vec![0x20, blocks.len() as u8, use_case, extension_count];
        section.extend_from_slice(blocks);
        section.push(0u8.wrapping_sub(checksum(&section)));
        section
    }

    /// 3840x2160 at 60 Hz, 594 MHz, 16:9.
    pub const TYPE7_2160P: [u8; 20] = [
        0x4F, 0x0F, 0x09, 0x04, 0xFF, 0x0E, 0x2F, 0x02, 0xAF, 0x80, 0x57, 0x00, 0x6F, 0x08,
        0x59, 0x00, 0x07, 0x80, 0x09, 0x00,
    ];

    pub fn block(block_type: u8, revision: u8, payload: &[u8]) -> Vec<u8> {
        let mut block = vec![block_type, revision, payload.len() as u8];
        block.extend_from_slice(payload);
        block
    }

    fn product_block() -> Vec<u8> {
        let mut payload = vec![0x00, 0x04, 0x4B, 0x34, 0x12, 0x01, 0x00, 0x00, 0x00, 10, 23, 4];
        payload.extend_from_slice(b"NV4K");
        block(0x20, 0, &payload)
    }

    fn params_block(h_pixels: u16, v_pixels: u16) -> Vec<u8> {
        let mut payload = vec![0u8; 29];
        payload[0..2].copy_from_slice(&6000u16.to_le_bytes());
        payload[2..4].copy_from_slice(&3400u16.to_le_bytes());
        payload[4..6].copy_from_slice(&h_pixels.to_le_bytes());
        payload[6..8].copy_from_slice(&v_pixels.to_le_bytes());
        payload[8] = 0x80;
        payload[27] = 0x03;
        payload[28] = 120;
        block(0x21, 0, &payload)
    }

    fn features_block() -> Vec<u8> {
        // RGB 8/10 bpc, 4:4:4 8 bpc, 4:2:2 8 bpc, 4:2:0 8/10 bpc, 48 kHz, sRGB and BT.2020 PQ
        block(0x26, 0, &[0x06, 0x02, 0x01, 0x03, 0x08, 0x20, 0x41, 0x00, 0x00])
    }

    #[test]
    fn test_type7_timing() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let timing = type7_timing(&TYPE7_2160P, 0, false).unwrap();
        assert_eq!(3840, timing.h_visible);
        assert_eq!(4400, timing.h_total);
        assert_eq!(2160, timing.v_visible);
        assert_eq!(2250, timing.v_total);
        assert_eq!(59400, timing.pclk);
        assert_eq!(594000, timing.pclk_1khz);
        assert_eq!(60, timing.refresh_rate);
        assert_eq!(60000, timing.refresh_rate_x1k);
        assert_eq!(AspectRatio::new(16, 9), timing.aspect);

        let mut bytes = TYPE7_2160P;
        bytes[3] = 0x88;
        let preferred = type7_timing(&bytes, 0, false).unwrap();
        assert!(preferred.is_preferred_displayid());
        assert_eq!(AspectRatio::new(16, 9), preferred.aspect);

        let yuv420 = type7_timing(&bytes, 2, true).unwrap();
        assert!(!yuv420.is_preferred_displayid());
        assert!(yuv420.flags.contains(TimingFlags::ExplicitYuv420));
        assert!(yuv420.flags.contains(TimingFlags::DisplayIdT7DscPassthrough));
        assert!(yuv420.color.yuv420.contains(ColorDepth::Bpc10));
    }

    #[test]
    fn test_parse_structure() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut blocks = product_block();
        blocks.extend(params_block(3840, 2160));
        blocks.extend(block(0x22, 0, &TYPE7_2160P));
        blocks.extend(features_block());
        blocks.extend(block(0x23, 0, &[0x52, 0x55]));
        let data = section(4, 0, &blocks);

        let info = parse_displayid20(&data).unwrap();
        assert_eq!(2, info.version);
        assert_eq!(PrimaryUseCase::DesktopProductivity, info.primary_use_case);
        assert!(info.valid_blocks.contains(
            ValidBlocks::ProductId
                | ValidBlocks::Parameters
                | ValidBlocks::Type7Timing
                | ValidBlocks::Type8Timing
                | ValidBlocks::InterfaceFeature
        ));
        let product = info.product_identity.as_ref().unwrap();
        assert_eq!(0x00044B, product.vendor_id);
        assert_eq!(0x1234, product.product_code);
        assert_eq!("NV4K", product.product_string);
        assert_eq!(2023, product.year);

        let params = info.display_params.unwrap();
        assert_eq!(600_000, params.h_image_size_um);
        assert!(!params.audio_speakers_integrated);
        assert_eq!(ColorDepth::Bpc10, params.native_depth);
        assert_eq!(220, params.gamma_x100);

        assert_eq!(59400, info.interface_features.yuv420_min_pclk);
        assert_eq!(
            vec![(ColorSpace::Srgb, Eotf::Srgb), (ColorSpace::Bt2020, Eotf::SmpteSt2084)],
            info.interface_features.color_spaces
        );
        assert!(info.basic_caps.contains(BasicCaps::YCbCr444 | BasicCaps::YCbCr422 | BasicCaps::BasicAudio));

        assert_eq!(3, info.timings.len());
        let t7 = &info.timings[0];
        assert!(t7.status.is_type(TimingType::DisplayId7));
        assert_eq!(1, t7.status.seq());
        assert!(t7.name.starts_with("DID20-Type7:#  1:3840x2160x60.000Hz/P"));
        assert_eq!(ColorDepth::Bpc6 | ColorDepth::Bpc8 | ColorDepth::Bpc10, t7.color.rgb444);
        assert_eq!(ColorDepth::Bpc8 | ColorDepth::Bpc10, t7.color.yuv420);

        let dmt = &info.timings[2];
        assert!(dmt.status.is_type(TimingType::DisplayId8));
        assert_eq!(2, dmt.status.seq());
        assert_eq!(1280, dmt.h_visible);

        assert!(validation_mask(&info, true).is_empty());
    }

    #[test]
    fn test_formula_blocks() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut blocks = block(0x24, 0, &[0x01, 0x7F, 0x07, 0x37, 0x04, 59]);
        blocks.extend(block(0x2A, 0, &[0x02, 0x7F, 0x07, 0x37, 0x04, 59, 0x03, 0x7F, 0x07, 0x37, 0x04, 59]));
        blocks.extend(block(0x2A, 0x10, &[0x80, 0x7F, 0x07, 0x37, 0x04, 0x77, 0x00]));
        let info = parse_displayid20(&section(2, 0, &blocks)).unwrap();

        // the RB3 descriptor is skipped
        assert_eq!(3, info.timings.len());
        assert_eq!(2080, info.timings[0].h_total);
        assert!(info.timings[0].name.starts_with("DID20-Type9-RB1:#  1:1920x1080"));
        assert_eq!(2000, info.timings[1].h_total);
        assert!(info.timings[1].name.starts_with("DID20-Type10RB2:#  1:"));
        assert_eq!(120, info.timings[2].refresh_rate);
        assert_eq!(2, info.timings[2].status.seq());
        assert!(info.timings[2].color.yuv420.contains(ColorDepth::Bpc16));
        assert_eq!(
            Did20ValidationErrors::ProductId | Did20ValidationErrors::NoDataBlock,
            validation_mask(&info, false)
        );
    }

    #[test]
    fn test_checksum_and_overrun() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut data = section(2, 0, &product_block());
        let last = data.len() - 1;
        data[last] = data[last].wrapping_add(1);
        assert!(parse_displayid20(&data).is_err());
        assert_eq!(Did20ValidationErrors::Version, validate_displayid20(&data, false));

        let mut blocks = product_block();
        blocks.extend([0x22, 0x00, 40]);
        blocks.extend(TYPE7_2160P);
        assert!(parse_displayid20(&section(2, 0, &blocks)).is_err());

        // extension_count promises a section that is not there
        assert!(parse_displayid20(&section(2, 1, &product_block())).is_err());
        assert!(parse_displayid20(&section(0, 0, &product_block())).is_err());
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut blocks = block(0x25, 0, &[0x00, 0x00]);
        blocks.extend(product_block());
        let data = section(2, 0, &blocks);
        let info = parse_displayid20(&data).unwrap();
        assert!(info.range_limits.is_none());
        assert!(info.valid_blocks.contains(ValidBlocks::ProductId));
        assert_eq!(Did20ValidationErrors::Version, validate_displayid20(&data, false));
    }

    #[test]
    fn test_extension_sections() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut data = section(2, 1, &product_block());
        let extension = section(0, 0, &block(0x29, 0, &[0x11; 16]));
        data.extend(extension);
        let info = parse_displayid20(&data).unwrap();
        assert_eq!(1, info.extension_count);
        assert_eq!(
            Some("11111111-1111-1111-1111-111111111111".to_string()),
            info.container_id_string()
        );
    }

    #[test]
    fn test_cta_block_and_strong_validation() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut blocks = product_block();
        blocks.extend(params_block(1920, 1080));
        let mut preferred = TYPE7_2160P;
        preferred[3] = 0x84;
        blocks.extend(block(0x22, 0, &preferred));
        blocks.extend(features_block());
        blocks.extend(block(0x81, 0, &[0x42, 16, 4]));
        let data = section(3, 0, &blocks);
        let info = parse_displayid20(&data).unwrap();

        assert!(info.valid_blocks.contains(ValidBlocks::CtaData));
        assert_eq!(vec![16, 4], info.cta.as_ref().unwrap().svds);
        let vic16 = &info.timings[1];
        assert!(vic16.status.is_cta861());
        assert!(vic16.flags.contains(TimingFlags::DisplayId20Timing));
        assert!(vic16.color.yuv420.is_empty());
        assert!(vic16.color.rgb444.contains(ColorDepth::Bpc10));

        assert!(validation_mask(&info, false).is_empty());
        assert_eq!(Did20ValidationErrors::NoDataBlock, validation_mask(&info, true));
    }

    #[test]
    fn test_edid_extension() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut blocks = product_block();
        blocks.extend(block(0x22, 0, &TYPE7_2160P));
        let extension = crate::displayid::tests::displayid_extension(0x20, 2, &blocks);
        let mut info = DisplayId20Info::default();
        parse_displayid20_extension(&extension, &mut info).unwrap();
        assert!(info.as_edid_extension);
        assert_eq!(1, info.timings.len());
        assert!(info.timings[0].color.rgb444.is_empty());
    }
}
