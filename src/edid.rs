// SPDX-License-Identifier: MIT

use crate::checksum::{crc32, is_checksum_valid, FixKind, EDID_BLOCK_SIZE, EDID_HEADER};
use crate::cta861::vsdb::{
    hdmi_stereo_timing, parse_hdmi_llc_timing, Hdmi3dSupport, HdmiLlcInfo, Stereo3dStructure, VendorInfo,
    HDMI_LLC_IEEE_ID,
};
use crate::cta861::{BasicCaps, CeaInfo, REVISION_A};
use crate::displayid::DisplayIdInfo;
use crate::displayid20::{DisplayId20Info, ValidBlocks};
use crate::edid::descriptor::{
    is_display_descriptor, parse_detailed_timing, DisplayDescriptor, LongDisplayDescriptor, RangeLimits,
    DESCRIPTOR_SIZE,
};
use crate::edid::established::{parse_established_timings, parse_established_timings_iii};
use crate::edid::standard::{cvt_3byte_timings, is_unused_code, parse_standard_timing};
use crate::table::TimingTable;
use crate::timing::{AspectRatio, ColorDepth, ColorFormats, Timing, TimingFlags, TimingStatus, TimingType};
use crate::{read_region, Result};
use binread::BinRead;
use bitflags::bitflags;
use derivative::Derivative;
use log::{debug, trace, warn};
use serde::Serialize;
use std::io::Cursor;
use strum::FromRepr;

pub mod descriptor;
pub mod established;
pub mod standard;
pub mod vtb;

pub const EDID_VERSION_1_3: u16 = 0x103;
pub const EDID_VERSION_1_4: u16 = 0x104;

const DESCRIPTOR_COUNT: usize = 4;
const STANDARD_TIMING_COUNT: usize = 8;

/// Three letter PNP ID from the manufacturer field as read little-endian. The letters are
/// packed big-endian, 5 bits each, 'A' being 1.
pub fn manufacturer_name(id: u16) -> String {
    let id = id.swap_bytes();
    [(id >> 10) & 0x1F, (id >> 5) & 0x1F, id & 0x1F]
        .iter()
        .map(|letter| (*letter as u8 + b'@') as char)
        .collect()
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureSupport(u8);
bitflags! {
    impl FeatureSupport: u8 {
        const ContinuousFrequency = 0b00000001;
        const PreferredTimingMode = 0b00000010;
        const SrgbDefault = 0b00000100;
        const YCbCr444 = 0b00001000;
        const YCbCr422 = 0b00010000;
        const ActiveOff = 0b00100000;
        const Suspend = 0b01000000;
        const Standby = 0b10000000;
    }
}

/// Interface of an EDID 1.4 digital input.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, FromRepr)]
#[repr(u8)]
pub enum DigitalInterface {
    #[default]
    Undefined = 0,
    Dvi = 1,
    HdmiA = 2,
    HdmiB = 3,
    Mddi = 4,
    DisplayPort = 5,
    Reserved = 0x0F,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum VideoInput {
    /// Signal level and sync bits 6:0 of the input byte.
    Analog { signal: u8 },
    /// Bits per color component, 0 when undefined.
    Digital { bpc: u8, interface: DigitalInterface },
}

impl Default for VideoInput {
    fn default() -> Self {
        VideoInput::Analog { signal: 0 }
    }
}

impl VideoInput {
    /// Before EDID 1.4 a digital input carries no depth or interface.
    pub fn from_byte(byte: u8, version: u16) -> Self {
        if byte & 0x80 == 0 {
            return VideoInput::Analog { signal: byte & 0x7F };
        }
        if version < EDID_VERSION_1_4 {
            return VideoInput::Digital {
                bpc: 0,
                interface: DigitalInterface::Undefined,
            };
        }
        let bpc = match (byte >> 4) & 0x07 {
            1 => 6,
            2 => 8,
            3 => 10,
            4 => 12,
            5 => 14,
            6 => 16,
            _ => 0,
        };
        let interface = DigitalInterface::from_repr(byte & 0x0F).unwrap_or(DigitalInterface::Reserved);
        VideoInput::Digital { bpc, interface }
    }

    pub fn is_digital(&self) -> bool {
        matches!(self, VideoInput::Digital { .. })
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub enum ScreenSize {
    #[default]
    Undefined,
    Size { width_cm: u8, height_cm: u8 },
    /// Only one dimension is given, it encodes the aspect ratio instead.
    Aspect(AspectRatio),
}

impl ScreenSize {
    pub fn from_bytes(h_size: u8, v_size: u8) -> Self {
        match (h_size, v_size) {
            (0, 0) => ScreenSize::Undefined,
            (h, 0) => ScreenSize::Aspect(AspectRatio::new(h as u16 + 99, 100)),
            (0, v) => ScreenSize::Aspect(AspectRatio::new(100, v as u16 + 99)),
            (h, v) => ScreenSize::Size {
                width_cm: h,
                height_cm: v,
            },
        }
    }
}

/// CIE 1931 coordinates as 10-bit binary fractions.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Chromaticity {
    pub red_x: u16,
    pub red_y: u16,
    pub green_x: u16,
    pub green_y: u16,
    pub blue_x: u16,
    pub blue_y: u16,
    pub white_x: u16,
    pub white_y: u16,
}

impl Chromaticity {
    pub fn from_bytes(bytes: &[u8; 10]) -> Self {
        let coordinate = |high: u8, low: u8, shift: u8| (high as u16) << 2 | ((low >> shift) & 0x03) as u16;
        Self {
            red_x: coordinate(bytes[2], bytes[0], 6),
            red_y: coordinate(bytes[3], bytes[0], 4),
            green_x: coordinate(bytes[4], bytes[0], 2),
            green_y: coordinate(bytes[5], bytes[0], 0),
            blue_x: coordinate(bytes[6], bytes[1], 6),
            blue_y: coordinate(bytes[7], bytes[1], 4),
            white_x: coordinate(bytes[8], bytes[1], 2),
            white_y: coordinate(bytes[9], bytes[1], 0),
        }
    }

    /// Same coordinates in thousandths.
    pub fn in_thousandths(&self) -> Self {
        let convert = |value: u16| ((value as u32 * 1000 + 512) / 1024) as u16;
        Self {
            red_x: convert(self.red_x),
            red_y: convert(self.red_y),
            green_x: convert(self.green_x),
            green_y: convert(self.green_y),
            blue_x: convert(self.blue_x),
            blue_y: convert(self.blue_y),
            white_x: convert(self.white_x),
            white_y: convert(self.white_y),
        }
    }
}

/// Fixed layout of the first 128 bytes.
#[derive(BinRead, Derivative, Clone, Serialize)]
#[derivative(Debug)]
pub struct EdidBaseBlock {
    #[br(assert(header[..] == *EDID_HEADER))]
    #[derivative(Debug = "ignore")]
    #[serde(skip)]
    pub header: [u8; 8],
    pub manufacturer_id: u16,
    pub product_code: u16,
    pub serial_number: u32,
    pub week: u8,
    #[br(map = |year: u8| year as u16 + 1990)]
    pub year: u16,
    pub version: u8,
    pub revision: u8,
    pub video_input: u8,
    pub h_size_cm: u8,
    pub v_size_cm: u8,
    pub gamma: u8,
    #[br(map = |bits: u8| FeatureSupport::from_bits_retain(bits))]
    pub features: FeatureSupport,
    #[br(map = |bytes: [u8; 10]| Chromaticity::from_bytes(&bytes))]
    pub chromaticity: Chromaticity,
    #[br(map = |bytes: [u8; 2]| u16::from_be_bytes(bytes))]
    pub established_timings: u16,
    pub manufacturer_timings: u8,
    pub standard_timings: [u16; STANDARD_TIMING_COUNT],
    #[derivative(Debug = "ignore")]
    #[serde(skip)]
    pub descriptors: [[u8; DESCRIPTOR_SIZE]; DESCRIPTOR_COUNT],
    pub extension_count: u8,
    pub checksum: u8,
}

impl EdidBaseBlock {
    /// `0x0103` style version word.
    pub fn version(&self) -> u16 {
        (self.version as u16) << 8 | self.revision as u16
    }
}

/// Everything decoded from an EDID and its extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorInfo {
    pub version: u16,
    pub manufacturer: String,
    pub manufacturer_id: u16,
    pub product_code: u16,
    pub serial_number: u32,
    pub week: u8,
    pub year: u16,
    pub input: VideoInput,
    pub screen_size: ScreenSize,
    /// Gamma times 100, `None` when defined by an extension.
    pub gamma: Option<u16>,
    pub features: FeatureSupport,
    pub chromaticity: Chromaticity,
    pub established_timings: u16,
    pub manufacturer_timings: u8,
    pub standard_timings: [u16; STANDARD_TIMING_COUNT],
    pub descriptors: Vec<DisplayDescriptor>,
    pub extension_count: u8,
    /// Every block present holds its checksum.
    pub checksum_ok: bool,
    pub checksum: u8,
    pub crc32: u32,
    pub fix: Option<FixKind>,
    /// CTA-861 extensions, the first one being the primary.
    pub cta: Vec<CeaInfo>,
    pub vendor: VendorInfo,
    pub hdmi_3d: Hdmi3dSupport,
    pub displayid: Option<DisplayIdInfo>,
    pub displayid20: Option<DisplayId20Info>,
    pub timings: TimingTable,
}

impl MonitorInfo {
    /// Decodes the base block of `data` and collects its detailed timings. Extension blocks
    /// and the remaining base block timings are left to the caller.
    pub fn read(data: &[u8]) -> Result<Self> {
        let base = read_region::<EdidBaseBlock>(&mut Cursor::new(data), 0)?;
        trace!("EDID base block: {:?}", base);
        let version = base.version();
        let mut info = Self {
            version,
            manufacturer: manufacturer_name(base.manufacturer_id),
            manufacturer_id: base.manufacturer_id,
            product_code: base.product_code,
            serial_number: base.serial_number,
            week: base.week,
            year: base.year,
            input: VideoInput::from_byte(base.video_input, version),
            screen_size: ScreenSize::from_bytes(base.h_size_cm, base.v_size_cm),
            gamma: (base.gamma != 0xFF).then_some(base.gamma as u16 + 100),
            features: base.features,
            chromaticity: base.chromaticity,
            established_timings: base.established_timings,
            manufacturer_timings: base.manufacturer_timings,
            standard_timings: base.standard_timings,
            extension_count: base.extension_count,
            checksum: base.checksum,
            checksum_ok: data.chunks(EDID_BLOCK_SIZE).all(is_checksum_valid),
            crc32: crc32(data),
            ..Self::default()
        };

        for (index, slot) in base.descriptors.iter().enumerate() {
            if is_display_descriptor(slot) {
                match DisplayDescriptor::read(slot, version) {
                    Ok(descriptor) => info.descriptors.push(descriptor),
                    Err(e) => warn!("Skipping display descriptor {}: {}", index, e),
                }
                continue;
            }
            match parse_detailed_timing(slot) {
                Ok(mut timing) => {
                    timing.status = TimingStatus::of(TimingType::EdidDtd, index as u8 + 1);
                    debug!("Detailed timing {}: {}", index, timing.name);
                    info.timings.assign_next_available(timing);
                }
                Err(e) => warn!("Skipping detailed timing {}: {}", index, e),
            }
        }
        if info.features.contains(FeatureSupport::PreferredTimingMode) {
            if let Some(first) = info.timings.get_mut(0) {
                first.flags |= TimingFlags::Dtd1Preferred;
            }
        }
        Ok(info)
    }

    pub fn range_limits(&self) -> Option<&RangeLimits> {
        self.descriptors.iter().find_map(|descriptor| match &descriptor.descriptor {
            LongDisplayDescriptor::RangeLimits(limits) => Some(limits),
            _ => None,
        })
    }

    /// Product name descriptor, else the DisplayID product string, else manufacturer and
    /// product code.
    pub fn monitor_name(&self) -> String {
        let product_name = self.descriptors.iter().find_map(|descriptor| match &descriptor.descriptor {
            LongDisplayDescriptor::ProductName(name) => Some(name.as_str().trim_end().to_string()),
            _ => None,
        });
        let displayid_name = || {
            let did13 = self
                .displayid
                .as_ref()
                .and_then(|did| did.product_identity.as_ref());
            let did20 = self
                .displayid20
                .as_ref()
                .and_then(|did| did.product_identity.as_ref());
            did13
                .or(did20)
                .map(|identity| identity.product_string.trim_end().to_string())
        };
        product_name
            .filter(|name| !name.is_empty())
            .or_else(|| displayid_name().filter(|name| !name.is_empty()))
            .unwrap_or_else(|| format!("{} {:04X}", self.manufacturer, self.product_code))
    }

    pub fn preferred_timing(&self) -> Option<&Timing> {
        self.timings
            .iter()
            .find(|t| t.is_preferred_dtd1() || t.is_preferred_displayid() || t.is_preferred_cta())
    }

    pub fn native_timing(&self) -> Option<&Timing> {
        self.timings
            .iter()
            .find(|t| t.is_native() || t.flags.contains(TimingFlags::CtaNative))
    }

    /// CVT 3-byte, standard and established timings of the base block, in that order.
    pub fn parse_base_timings(&mut self) {
        let range_limits = self.range_limits().cloned();

        if self.version > EDID_VERSION_1_3 {
            let mut count = 0u8;
            'cvt: for descriptor in &self.descriptors {
                let LongDisplayDescriptor::Cvt3Byte(codes) = &descriptor.descriptor else {
                    continue;
                };
                for code in &codes.codes {
                    for mut timing in cvt_3byte_timings(code) {
                        count += 1;
                        timing.status = TimingStatus::of(TimingType::EdidCvt, count);
                        if !self.timings.assign_next_available(timing) {
                            break 'cvt;
                        }
                    }
                }
            }
        }

        let mut codes = self.standard_timings.to_vec();
        if self.version >= EDID_VERSION_1_4 {
            for descriptor in &self.descriptors {
                if let LongDisplayDescriptor::StandardTimingIds(ids) = &descriptor.descriptor {
                    codes.extend_from_slice(&ids.codes);
                }
            }
        }
        let mut count = 0u8;
        for code in codes.into_iter().filter(|code| !is_unused_code(*code)) {
            match parse_standard_timing(code, self.version, count + 1, range_limits.as_ref()) {
                Ok(timing) => {
                    count += 1;
                    if !self.timings.assign_next_available(timing) {
                        break;
                    }
                }
                Err(e) => debug!("Standard timing 0x{:04X} dropped: {}", code, e),
            }
        }

        let count = parse_established_timings(self.established_timings, &mut self.timings);
        if self.version >= EDID_VERSION_1_4 {
            let bitmap = self.descriptors.iter().find_map(|descriptor| match &descriptor.descriptor {
                LongDisplayDescriptor::EstablishedTimingsIII(established) => Some(established.bitmap),
                _ => None,
            });
            if let Some(bitmap) = bitmap {
                parse_established_timings_iii(&bitmap, count, &mut self.timings);
            }
        }
    }

    /// HDMI 4k timings and 3D map of every HDMI LLC vendor block, then one stereo timing per
    /// frame packing or side-by-side full format.
    pub fn parse_hdmi_timings(&mut self) {
        let llc_blocks = self
            .cta
            .iter()
            .filter_map(|cta| cta.vsdbs.iter().find(|vsdb| vsdb.ieee_id == HDMI_LLC_IEEE_ID))
            .cloned()
            .collect::<Vec<_>>();
        for vsdb in &llc_blocks {
            let support = parse_hdmi_llc_timing(vsdb, &mut self.timings);
            if self.hdmi_3d.is_empty() {
                self.hdmi_3d = support;
            }
        }

        let mut stereo = Vec::new();
        for entry in self.hdmi_3d.entries.iter().filter(|entry| entry.vic != 0) {
            for structure in [Stereo3dStructure::FramePacking, Stereo3dStructure::SideBySideFull] {
                if !entry.structures.contains(structure.into()) {
                    continue;
                }
                let Some(timing) = self
                    .timings
                    .iter()
                    .find(|timing| timing.status.is_cta861() && timing.status.seq() == entry.vic)
                else {
                    continue;
                };
                let mut timing = hdmi_stereo_timing(timing, structure);
                timing.set_name(format!(
                    "HDMI-3D({}):{}x{}x{}Hz",
                    structure, timing.h_visible, timing.v_visible, timing.refresh_rate
                ));
                stereo.push(timing);
            }
        }
        for timing in stereo {
            if !self.timings.assign_next_available(timing) {
                break;
            }
        }
    }

    /// Derives the color formats and depths of every timing from the input definition, the
    /// CTA-861 capabilities and the DisplayID interface blocks.
    pub fn update_color_formats(&mut self) {
        let mut timings = std::mem::take(&mut self.timings);
        {
            let sink = SinkColorCaps::new(self);
            for timing in timings.iter_mut() {
                sink.apply(timing);
            }
        }
        self.timings = timings;
    }
}

/// What the sink declares about color, gathered once for the color pass.
struct SinkColorCaps<'a> {
    version: u16,
    input: VideoInput,
    features: FeatureSupport,
    cta_revision: u8,
    cta_caps: BasicCaps,
    llc: Option<&'a HdmiLlcInfo>,
    hdmi_vsdb: bool,
    displayid: Option<&'a DisplayIdInfo>,
    displayid20: Option<&'a DisplayId20Info>,
}

impl<'a> SinkColorCaps<'a> {
    fn new(info: &'a MonitorInfo) -> Self {
        Self {
            version: info.version,
            input: info.input,
            features: info.features,
            cta_revision: info.cta.iter().map(|cta| cta.revision).max().unwrap_or(0),
            cta_caps: info
                .cta
                .iter()
                .fold(BasicCaps::empty(), |caps, cta| caps | cta.basic_caps),
            llc: info.vendor.hdmi_llc.as_ref(),
            hdmi_vsdb: info.vendor.hdmi_llc.is_some() || info.vendor.hdmi_forum.is_some(),
            displayid: info.displayid.as_ref(),
            displayid20: info.displayid20.as_ref(),
        }
    }

    fn apply(&self, timing: &mut Timing) {
        match timing.status.timing_type() {
            TimingType::HdmiStereo
            | TimingType::HdmiExt
            | TimingType::VtbExt
            | TimingType::VtbExtStd
            | TimingType::VtbExtDtd
            | TimingType::VtbExtCvt => timing.color.rgb444 |= ColorDepth::Bpc8,
            TimingType::Edid861St | TimingType::EdidExtDtd => {
                if let Some(did20) = self
                    .displayid20
                    .filter(|did| did.as_edid_extension && did.valid_blocks.contains(ValidBlocks::CtaData))
                {
                    did20.interface_features.apply_to(timing);
                }
                self.update_bpc(&mut timing.color);
            }
            _ => self.update_bpc(&mut timing.color),
        }

        match (self.displayid, self.displayid20) {
            (Some(did), _) if did.version == 1 && matches!(did.revision, 2 | 3) => {
                self.apply_displayid13(did, &mut timing.color)
            }
            (_, Some(did20)) if did20.valid_blocks.contains(ValidBlocks::InterfaceFeature) => {
                did20.interface_features.apply_to(timing)
            }
            _ => {}
        }
    }

    fn update_bpc(&self, color: &mut ColorFormats) {
        color.rgb444 |= ColorDepth::Bpc8;
        match self.input {
            VideoInput::Digital { bpc, interface } if self.version >= EDID_VERSION_1_4 => {
                let yuv444 = self.features.contains(FeatureSupport::YCbCr444);
                let yuv422 = self.features.contains(FeatureSupport::YCbCr422);
                if yuv444 {
                    color.yuv444 |= ColorDepth::Bpc8;
                }
                if yuv422 {
                    color.yuv422 |= ColorDepth::Bpc8;
                }
                match interface {
                    DigitalInterface::DisplayPort | DigitalInterface::Undefined => {
                        color.rgb444 |= ColorDepth::Bpc6;
                        let deep_444 = yuv444 || self.cta_caps.contains(BasicCaps::YCbCr444);
                        let deep_422 = yuv422 || self.cta_caps.contains(BasicCaps::YCbCr422);
                        for (min_bpc, depth) in [
                            (10, ColorDepth::Bpc10),
                            (12, ColorDepth::Bpc12),
                            (16, ColorDepth::Bpc16),
                        ] {
                            if bpc < min_bpc {
                                break;
                            }
                            color.rgb444 |= depth;
                            if deep_444 {
                                color.yuv444 |= depth;
                            }
                            if deep_422 {
                                color.yuv422 |= depth;
                            }
                        }
                    }
                    DigitalInterface::HdmiA | DigitalInterface::HdmiB if self.cta_revision >= REVISION_A => {
                        self.apply_hdmi_deep_color(color)
                    }
                    _ => {}
                }
            }
            _ if self.cta_revision >= REVISION_A => self.apply_hdmi_deep_color(color),
            _ => {}
        }
    }

    fn apply_hdmi_deep_color(&self, color: &mut ColorFormats) {
        let mut deep = ColorDepth::empty();
        if let Some(llc) = self.llc {
            deep.set(ColorDepth::Bpc10, llc.dc_30_bit);
            deep.set(ColorDepth::Bpc12, llc.dc_36_bit);
            deep.set(ColorDepth::Bpc16, llc.dc_48_bit);
        }
        color.rgb444 |= ColorDepth::Bpc8 | deep;
        if self.cta_caps.contains(BasicCaps::YCbCr444) {
            color.yuv444 |= ColorDepth::Bpc8;
            if self.llc.map_or(false, |llc| llc.dc_y444) {
                color.yuv444 |= deep;
            }
        }
        if self.cta_caps.contains(BasicCaps::YCbCr422) {
            color.yuv422 |= ColorDepth::Bpc8 | ColorDepth::Bpc10 | ColorDepth::Bpc12;
        }
    }

    /// HDMI sinks get their interface depths on top of 8 bpc, DisplayPort sinks on top of 6
    /// and 8 bpc.
    fn apply_displayid13(&self, did: &DisplayIdInfo, color: &mut ColorFormats) {
        let Some((rgb444, yuv444, yuv422)) = did.interface_depths() else {
            return;
        };
        let deep = ColorDepth::Bpc10 | ColorDepth::Bpc12 | ColorDepth::Bpc14 | ColorDepth::Bpc16;
        let hdmi = did.interface.map_or(false, |interface| interface.is_hdmi()) || self.hdmi_vsdb;
        color.rgb444 |= ColorDepth::Bpc8 | (rgb444 & deep);
        if !(hdmi && self.cta_revision >= REVISION_A) {
            color.rgb444 |= ColorDepth::Bpc6;
        }
        color.yuv444 |= yuv444 - ColorDepth::Bpc6;
        color.yuv422 |= yuv422 - ColorDepth::Bpc6;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::checksum::{checksum, EDID_HEADER};
    use crate::cta861::tests::cta_block;
    use crate::edid::descriptor::tests::DTD_1080P;
    use crate::edid::*;
    use crate::parse_edid;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    pub const PRODUCT_NAME: [u8; DESCRIPTOR_SIZE] = [
        0x00, 0x00, 0x00, 0xFC, 0x00, b'S', b'A', b'M', b'P', b'L', b'E', 0x0A, 0x20, 0x20, 0x20,
        0x20, 0x20, 0x20,
    ];

    /// 56-76 Hz, 30-83 kHz, 170 MHz, default GTF.
    pub const RANGE_LIMITS: [u8; DESCRIPTOR_SIZE] = [
        0x00, 0x00, 0x00, 0xFD, 0x00, 56, 76, 30, 83, 17, 0x00, 0x0A, 0x20, 0x20, 0x20, 0x20, 0x20,
        0x20,
    ];

    pub const DUMMY: [u8; DESCRIPTOR_SIZE] = [
        0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00,
    ];

    pub fn fix_checksum(block: &mut [u8]) {
        block[EDID_BLOCK_SIZE - 1] = 0u8.wrapping_sub(checksum(&block[..EDID_BLOCK_SIZE - 1]));
    }

    /// Base block of manufacturer "NVD", product 0x1234, built year 2020, with the given
    /// version revision, input byte, established bytes, standard codes and descriptor slots.
    pub fn base_block(
        revision: u8,
        input: u8,
        established: [u8; 2],
        standard: &[[u8; 2]],
        slots: [[u8; DESCRIPTOR_SIZE]; DESCRIPTOR_COUNT],
        extension_count: u8,
    ) -> Vec<u8> {
        let mut block = vec![0u8; EDID_BLOCK_SIZE];
        block[..8].copy_from_slice(EDID_HEADER);
        block[8..10].copy_from_slice(&[0x3A, 0xC4]);
        block[10..12].copy_from_slice(&0x1234u16.to_le_bytes());
        block[12..16].copy_from_slice(&1u32.to_le_bytes());
        block[16] = 10;
        block[17] = 30;
        block[18] = 1;
        block[19] = revision;
        block[20] = input;
        block[21] = 60;
        block[22] = 34;
        block[23] = 120;
        block[24] = 0x0A;
        block[25..35].copy_from_slice(&[0xEE, 0x91, 0xA3, 0x54, 0x4C, 0x99, 0x26, 0x0F, 0x50, 0x54]);
        block[35] = established[0];
        block[36] = established[1];
        for i in 0..STANDARD_TIMING_COUNT {
            let code = standard.get(i).copied().unwrap_or([0x01, 0x01]);
            block[38 + i * 2..40 + i * 2].copy_from_slice(&code);
        }
        for (i, slot) in slots.iter().enumerate() {
            block[54 + i * DESCRIPTOR_SIZE..54 + (i + 1) * DESCRIPTOR_SIZE].copy_from_slice(slot);
        }
        block[126] = extension_count;
        fix_checksum(&mut block);
        block
    }

    /// EDID 1.3 digital monitor: 1080p preferred DTD, product name and range limits, three
    /// established timings, one standard timing and a CTA-861 extension with VIC 16 and 4.
    pub fn sample_edid() -> Vec<u8> {
        let mut edid = base_block(
            3,
            0x80,
            [0x21, 0x08],
            &[[0xD1, 0xC0]],
            [DTD_1080P, PRODUCT_NAME, RANGE_LIMITS, DUMMY],
            1,
        );
        edid.extend(cta_block(&[0x42, 0x10, 0x04], &[]));
        edid
    }

    #[test]
    fn test_manufacturer_name() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        assert_eq!("NVD", manufacturer_name(u16::from_le_bytes([0x3A, 0xC4])));
        assert_eq!("DEC", manufacturer_name(u16::from_le_bytes([0x10, 0xA3])));
    }

    #[test]
    fn test_base_fields() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let info = MonitorInfo::read(&sample_edid()).unwrap();
        assert_eq!(EDID_VERSION_1_3, info.version);
        assert_eq!("NVD", info.manufacturer);
        assert_eq!(0x1234, info.product_code);
        assert_eq!(2020, info.year);
        assert_eq!(Some(220), info.gamma);
        assert_eq!(
            ScreenSize::Size {
                width_cm: 60,
                height_cm: 34
            },
            info.screen_size
        );
        assert_eq!(
            VideoInput::Digital {
                bpc: 0,
                interface: DigitalInterface::Undefined
            },
            info.input
        );
        assert_eq!(0x2108, info.established_timings);
        assert_eq!(3, info.descriptors.len());
        assert!(info.range_limits().is_some());
        assert!(info.checksum_ok);

        // only the detailed timing so far
        assert_eq!(1, info.timings.len());
        assert!(info.timings[0].is_preferred_dtd1());
    }

    #[test]
    fn test_chromaticity() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let raw = Chromaticity::from_bytes(&[0xEE, 0x91, 0xA3, 0x54, 0x4C, 0x99, 0x26, 0x0F, 0x50, 0x54]);
        assert_eq!(0xA3 << 2 | 0x03, raw.red_x);
        assert_eq!(0x54 << 2 | 0x02, raw.red_y);
        assert_eq!(0x50 << 2, raw.white_x);
        let thousandths = raw.in_thousandths();
        assert_eq!(640, thousandths.red_x);
        assert_eq!(330, thousandths.red_y);
        assert_eq!(313, thousandths.white_x);
    }

    #[test]
    fn test_video_input() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        assert_eq!(
            VideoInput::Digital {
                bpc: 10,
                interface: DigitalInterface::DisplayPort
            },
            VideoInput::from_byte(0xB5, EDID_VERSION_1_4)
        );
        assert_eq!(
            VideoInput::Digital {
                bpc: 0,
                interface: DigitalInterface::Undefined
            },
            VideoInput::from_byte(0xB5, EDID_VERSION_1_3)
        );
        assert_eq!(VideoInput::Analog { signal: 0x0E }, VideoInput::from_byte(0x0E, EDID_VERSION_1_3));
        assert_eq!(
            ScreenSize::Aspect(AspectRatio::new(178, 100)),
            ScreenSize::from_bytes(79, 0)
        );
    }

    #[test]
    fn test_parse_sample() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let info = parse_edid(&sample_edid()).unwrap();

        // DTD, two SVDs, standard, three established
        assert_eq!(7, info.timings.len());
        assert!(info.timings[0].status.is_dtd1());
        assert!(info.timings[1].status.is_cta861());
        assert_eq!(16, info.timings[1].status.seq());
        assert!(info.timings[3].status.is_type(TimingType::EdidStd));
        assert!(info.timings[4..].iter().all(|t| t.status.is_type(TimingType::EdidEst)));

        // DTD 1 and VIC 16 share the raster, so both are known as VIC 16
        assert_eq!(16, info.timings[0].status.cea_format());
        assert_eq!(AspectRatio::new(16, 9), info.timings[1].aspect);

        assert_eq!("SAMPLE", info.monitor_name());
        assert_eq!(Some(&info.timings[0]), info.preferred_timing());
        assert_eq!(1, info.cta.len());
        assert!(info.timings.iter().all(|t| t.color.rgb444.contains(ColorDepth::Bpc8)));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let edid = sample_edid();
        assert_eq!(parse_edid(&edid).unwrap(), parse_edid(&edid).unwrap());
    }

    #[test]
    fn test_single_established_timing() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let edid = base_block(3, 0x80, [0x20, 0x00], &[], [DUMMY; 4], 0);
        let info = parse_edid(&edid).unwrap();
        assert_eq!(1, info.timings.len());
        let timing = &info.timings[0];
        assert_eq!((640, 480), (timing.h_visible, timing.v_visible));
        assert_eq!((800, 525), (timing.h_total, timing.v_total));
        assert_eq!(60, timing.refresh_rate);
        assert!(!timing.interlaced);
        assert_eq!(2518, timing.pclk);
    }

    #[test]
    fn test_short_video_descriptor_vic16() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut edid = base_block(3, 0x80, [0x00, 0x00], &[], [DUMMY; 4], 1);
        edid.extend(cta_block(&[0x41, 0x10], &[]));
        let info = parse_edid(&edid).unwrap();
        assert_eq!(1, info.timings.len());
        let timing = &info.timings[0];
        assert_eq!((1920, 1080), (timing.h_visible, timing.v_visible));
        assert_eq!((2200, 1125), (timing.h_total, timing.v_total));
        assert_eq!(60, timing.refresh_rate);
        assert_eq!(AspectRatio::new(16, 9), timing.aspect);
        assert!(!timing.is_native());
    }

    #[test]
    fn test_zero_pixel_clock_dtd() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut broken = DTD_1080P;
        broken[0] = 0;
        broken[1] = 0;
        let edid = base_block(3, 0x80, [0x21, 0x00], &[[0xD1, 0xC0]], [broken, PRODUCT_NAME, DUMMY, DUMMY], 0);
        let info = parse_edid(&edid).unwrap();
        assert!(!info.timings.iter().any(|t| t.status.is_type(TimingType::EdidDtd)));
        assert_eq!(1, info.timings.iter().filter(|t| t.status.is_type(TimingType::EdidStd)).count());
        assert_eq!(2, info.timings.iter().filter(|t| t.status.is_type(TimingType::EdidEst)).count());
    }

    #[test]
    fn test_repaired_header() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut edid = base_block(3, 0x80, [0x20, 0x00], &[], [DUMMY; 4], 0);
        edid[8..12].copy_from_slice(&[0x10, 0xA3, 0x3A, 0x07]);
        fix_checksum(&mut edid);
        edid[..8].copy_from_slice(&[0x00, 0xFF, 0xFF, 0x7F, 0xFF, 0xFF, 0xFF, 0x00]);

        let info = parse_edid(&edid).unwrap();
        assert_eq!(Some(FixKind::Header), info.fix);
        assert_eq!("DEC", info.manufacturer);

        let mut repaired = edid.clone();
        crate::checksum::repair(&mut repaired);
        assert_eq!(EDID_HEADER, &repaired[..8]);
        assert!(is_checksum_valid(&repaired));
    }

    #[test]
    fn test_invalid_base_block() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut edid = sample_edid();
        edid[20] ^= 0x01;
        assert!(parse_edid(&edid).is_err());
        assert!(parse_edid(&edid[..100]).is_err());
    }

    #[test]
    fn test_edid14_colors() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        // 10 bpc DisplayPort, YCbCr 4:4:4 in the feature byte
        let edid = base_block(4, 0xB5, [0x20, 0x00], &[], [DTD_1080P, DUMMY, DUMMY, DUMMY], 0);
        let info = parse_edid(&edid).unwrap();
        assert_eq!(FeatureSupport::PreferredTimingMode | FeatureSupport::YCbCr444, info.features);
        let color = info.timings[0].color;
        assert_eq!(ColorDepth::Bpc6 | ColorDepth::Bpc8 | ColorDepth::Bpc10, color.rgb444);
        assert_eq!(ColorDepth::Bpc8 | ColorDepth::Bpc10, color.yuv444);
        assert!(color.yuv422.is_empty());
    }

    #[test]
    fn test_hdmi_deep_color() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut edid = base_block(3, 0x80, [0x00, 0x00], &[], [DUMMY; 4], 1);
        // VIC 16, HDMI LLC block with 30 and 36 bit deep color for RGB and 4:4:4
        edid.extend(cta_block(
            &[0x41, 0x10, 0x67, 0x03, 0x0C, 0x00, 0x10, 0x00, 0x38, 0x3C],
            &[],
        ));
        let info = parse_edid(&edid).unwrap();
        assert!(info.vendor.hdmi_llc.is_some());
        let color = info.timings[0].color;
        assert_eq!(ColorDepth::Bpc8 | ColorDepth::Bpc10 | ColorDepth::Bpc12, color.rgb444);
        assert_eq!(ColorDepth::Bpc8 | ColorDepth::Bpc10 | ColorDepth::Bpc12, color.yuv444);
        assert_eq!(ColorDepth::Bpc8 | ColorDepth::Bpc10 | ColorDepth::Bpc12, color.yuv422);
    }
}
