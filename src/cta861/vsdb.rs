// SPDX-License-Identifier: MIT

use crate::cta861::hdr::{DolbyVision, Hdr10Plus, DOLBY_VISION_IEEE_ID, HDR10_PLUS_IEEE_ID};
use crate::cta861::vic::enum_hdmi_ext_timing;
use crate::table::TimingTable;
use crate::timing::{rrx1k_to_pclk, Timing, TimingType};
use crate::{Error, Result};
use bitflags::bitflags;
use log::{debug, trace, warn};
use serde::Serialize;
use strum::FromRepr;

pub const HDMI_LLC_IEEE_ID: u32 = 0x000C03;
pub const HDMI_FORUM_IEEE_ID: u32 = 0xC45DD8;
pub const NVIDIA_IEEE_ID: u32 = 0x00044B;
pub const MSFT_IEEE_ID: u32 = 0xCA125C;

pub const VSDB_MAX_DATA_SIZE: usize = 28;
pub const MAX_EDID_ADDRESSABLE_3D_VICS: usize = 16;
pub const MAX_3D_VICS_SUPPORTED: usize = 24;

const HDMI_LLC_FIXED_SIZE: usize = 5;
const HDMI_LLC_MAX_VIDEO_DATA: usize = 23;
const LATENCY_SIZE: usize = 2;
const MSFT_VSDB_SIZE: usize = 18;
const MSFT_CONTAINER_ID_SIZE: usize = 16;
const NVIDIA_VSDB_SIZE: usize = 2;
const HDMI_FORUM_MIN_SIZE: usize = 4;

/// Vendor specific block: the 24-bit IEEE OUI and whatever follows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VendorBlock {
    pub ieee_id: u32,
    pub data: Vec<u8>,
}

impl VendorBlock {
    /// Splits a payload starting with a little-endian OUI, keeping at most `max_data` bytes.
    pub fn from_payload(payload: &[u8], max_data: usize) -> Result<Self> {
        if payload.len() < 3 {
            return Err(Error::InvalidDataBlock(format!(
                "Vendor specific block of {} bytes has no IEEE OUI",
                payload.len()
            )));
        }
        let data = &payload[3..];
        Ok(Self {
            ieee_id: u32::from_le_bytes([payload[0], payload[1], payload[2], 0]),
            data: data[..data.len().min(max_data)].to_vec(),
        })
    }
}

/// HDMI Licensing vendor block (HDMI 1.x).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HdmiLlcInfo {
    pub physical_address: [u8; 4],
    pub supports_ai: bool,
    pub dc_48_bit: bool,
    pub dc_36_bit: bool,
    pub dc_30_bit: bool,
    pub dc_y444: bool,
    pub dual_dvi: bool,
    /// In 5 MHz units.
    pub max_tmds_clock: u8,
    pub latency_fields_present: bool,
    pub i_latency_fields_present: bool,
    pub hdmi_video_present: bool,
    pub content_types: u8,
    /// Max TMDS clock after folding in the HDMI Forum blocks, 5 MHz units.
    pub effective_tmds_clock: u8,
}

impl HdmiLlcInfo {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(Error::InvalidDataBlock(
                "HDMI LLC block lacks the physical address".to_string(),
            ));
        }
        let mut info = Self {
            physical_address: [data[0] >> 4, data[0] & 0x0F, data[1] >> 4, data[1] & 0x0F],
            ..Self::default()
        };
        if let Some(&flags) = data.get(2) {
            info.dual_dvi = flags & 0x01 != 0;
            info.dc_y444 = flags & 0x08 != 0;
            info.dc_30_bit = flags & 0x10 != 0;
            info.dc_36_bit = flags & 0x20 != 0;
            info.dc_48_bit = flags & 0x40 != 0;
            info.supports_ai = flags & 0x80 != 0;
        }
        if let Some(&clock) = data.get(3) {
            info.max_tmds_clock = clock;
        }
        if let Some(&flags) = data.get(4) {
            info.content_types = flags & 0x0F;
            info.hdmi_video_present = flags & 0x20 != 0;
            info.i_latency_fields_present = flags & 0x40 != 0;
            info.latency_fields_present = flags & 0x80 != 0;
        }
        Ok(info)
    }
}

/// HDMI Forum vendor block, also used for the sink capability data block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HdmiForumInfo {
    pub max_tmds_char_rate: u8,
    pub threed_osd_disparity: bool,
    pub dual_view: bool,
    pub independent_view: bool,
    pub lte_340mcsc_scramble: bool,
    pub ccbpci: bool,
    pub cable_status: bool,
    pub rr_capable: bool,
    pub scdc_present: bool,
    pub dc_30bit_420: bool,
    pub dc_36bit_420: bool,
    pub dc_48bit_420: bool,
    pub uhd_vic: bool,
    pub max_frl_rate: u8,
    pub fapa_start_location: bool,
    pub allm: bool,
    pub fva: bool,
    pub cnmvrr: bool,
    pub cinema_vrr: bool,
    pub m_delta: bool,
    pub qms: bool,
    pub fapa_end_extended: bool,
    pub vrr_min: u8,
    pub vrr_max: u16,
    pub dsc_10bpc: bool,
    pub dsc_12bpc: bool,
    pub dsc_16bpc: bool,
    pub dsc_all_bpp: bool,
    pub qms_tfr_min: bool,
    pub qms_tfr_max: bool,
    pub dsc_native_420: bool,
    pub dsc_1p2: bool,
    pub dsc_max_slices: u8,
    pub dsc_max_pclk_per_slice_mhz: u16,
    pub dsc_max_frl_rate: u8,
    pub dsc_total_chunk_kbytes: u8,
}

impl HdmiForumInfo {
    /// Decodes a version 1 payload. Optional bytes are read one at a time while the payload
    /// lasts.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HDMI_FORUM_MIN_SIZE {
            return Err(Error::InvalidDataBlock(format!(
                "HDMI Forum block of {} bytes is too short",
                data.len()
            )));
        }
        if data[0] != 1 {
            return Err(Error::InvalidDataBlock(format!(
                "HDMI Forum block version {} is not supported",
                data[0]
            )));
        }
        let bit = |byte: u8, bit: u8| byte & (1 << bit) != 0;
        let mut info = Self {
            max_tmds_char_rate: data[1],
            threed_osd_disparity: bit(data[2], 0),
            dual_view: bit(data[2], 1),
            independent_view: bit(data[2], 2),
            lte_340mcsc_scramble: bit(data[2], 3),
            ccbpci: bit(data[2], 4),
            cable_status: bit(data[2], 5),
            rr_capable: bit(data[2], 6),
            scdc_present: bit(data[2], 7),
            dc_30bit_420: bit(data[3], 0),
            dc_36bit_420: bit(data[3], 1),
            dc_48bit_420: bit(data[3], 2),
            uhd_vic: bit(data[3], 3),
            max_frl_rate: data[3] >> 4,
            ..Self::default()
        };

        let Some(&byte) = data.get(4) else { return Ok(info) };
        info.fapa_start_location = bit(byte, 0);
        info.allm = bit(byte, 1);
        info.fva = bit(byte, 2);
        info.cnmvrr = bit(byte, 3);
        info.cinema_vrr = bit(byte, 4);
        info.m_delta = bit(byte, 5);
        info.qms = bit(byte, 6);
        info.fapa_end_extended = bit(byte, 7);

        let Some(&byte) = data.get(5) else { return Ok(info) };
        info.vrr_min = byte & 0x3F;
        info.vrr_max = ((byte >> 6) as u16) << 8;

        let Some(&byte) = data.get(6) else { return Ok(info) };
        info.vrr_max |= byte as u16;

        let Some(&byte) = data.get(7) else { return Ok(info) };
        info.dsc_10bpc = bit(byte, 0);
        info.dsc_12bpc = bit(byte, 1);
        info.dsc_16bpc = bit(byte, 2);
        info.dsc_all_bpp = bit(byte, 3);
        info.qms_tfr_min = bit(byte, 4);
        info.qms_tfr_max = bit(byte, 5);
        info.dsc_native_420 = bit(byte, 6);
        info.dsc_1p2 = bit(byte, 7);

        let Some(&byte) = data.get(8) else { return Ok(info) };
        (info.dsc_max_slices, info.dsc_max_pclk_per_slice_mhz) = match byte & 0x0F {
            1 => (1, 340),
            2 => (2, 340),
            3 => (4, 340),
            4 => (8, 340),
            5 => (8, 400),
            6 => (12, 400),
            7 => (16, 400),
            _ => (0, 0),
        };
        info.dsc_max_frl_rate = byte >> 4;

        let Some(&byte) = data.get(9) else { return Ok(info) };
        // the block codes the chunk size minus one
        info.dsc_total_chunk_kbytes = match byte & 0x3F {
            0 => 0,
            chunk => chunk + 1,
        };
        Ok(info)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NvidiaVsdb {
    pub version: u8,
    pub supports_vrr: bool,
    pub vrr_min_refresh_rate: u8,
}

impl NvidiaVsdb {
    pub fn parse(data: &[u8]) -> Result<Self> {
        match data {
            [1, min_refresh, ..] => Ok(Self {
                version: 1,
                supports_vrr: true,
                vrr_min_refresh_rate: *min_refresh,
            }),
            _ if data.len() < NVIDIA_VSDB_SIZE => Err(Error::InvalidDataBlock(format!(
                "NVIDIA block of {} bytes is too short",
                data.len()
            ))),
            _ => Err(Error::InvalidDataBlock(format!(
                "NVIDIA block opcode {} is not supported",
                data[0]
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MsftVsdb {
    pub version: u8,
    pub desktop_usage: bool,
    pub third_party_usage: bool,
    pub primary_use_case: u8,
    pub container_id: [u8; MSFT_CONTAINER_ID_SIZE],
}

impl MsftVsdb {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < MSFT_VSDB_SIZE || data[0] < 1 {
            return Err(Error::InvalidDataBlock(format!(
                "Microsoft block of {} bytes is not usable",
                data.len()
            )));
        }
        let mut container_id = [0u8; MSFT_CONTAINER_ID_SIZE];
        container_id.copy_from_slice(&data[2..2 + MSFT_CONTAINER_ID_SIZE]);
        Ok(Self {
            version: data[0],
            third_party_usage: data[1] & 0x20 != 0,
            desktop_usage: data[1] & 0x40 != 0,
            // defined since version 3
            primary_use_case: if data[0] >= 3 { data[1] & 0x1F } else { 0 },
            container_id,
        })
    }
}

/// Decoded vendor specific blocks of all CTA-861 sources. When a vendor shows up twice the
/// later block wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VendorInfo {
    pub hdmi_llc: Option<HdmiLlcInfo>,
    pub hdmi_forum: Option<HdmiForumInfo>,
    pub nvidia: Option<NvidiaVsdb>,
    pub msft: Option<MsftVsdb>,
    pub dolby_vision: Option<DolbyVision>,
    pub hdr10_plus: Option<Hdr10Plus>,
}

impl VendorInfo {
    /// Folds in the vendor blocks of one CTA-861 source. A sink capability block stands in for
    /// a missing HDMI Forum vendor block.
    pub fn update(&mut self, vsdbs: &[VendorBlock], hf_scdb: Option<&[u8]>) {
        let has_hf_vsdb = vsdbs.iter().any(|vsdb| vsdb.ieee_id == HDMI_FORUM_IEEE_ID);
        if let (Some(scdb), false) = (hf_scdb, has_hf_vsdb) {
            match HdmiForumInfo::parse(scdb) {
                Ok(info) => self.hdmi_forum = Some(info),
                Err(e) => warn!("Skipping HDMI Forum sink capability block: {}", e),
            }
        }

        let mut llc_present = false;
        let mut hf_present = false;
        for vsdb in vsdbs {
            trace!("Vendor block 0x{:06X}: {:02X?}", vsdb.ieee_id, vsdb.data);
            let result = match vsdb.ieee_id {
                HDMI_LLC_IEEE_ID => HdmiLlcInfo::parse(&vsdb.data).map(|info| {
                    llc_present = true;
                    self.hdmi_llc = Some(info);
                }),
                HDMI_FORUM_IEEE_ID => HdmiForumInfo::parse(&vsdb.data).map(|info| {
                    hf_present = true;
                    self.hdmi_forum = Some(info);
                }),
                NVIDIA_IEEE_ID => NvidiaVsdb::parse(&vsdb.data).map(|info| self.nvidia = Some(info)),
                MSFT_IEEE_ID => MsftVsdb::parse(&vsdb.data).map(|info| self.msft = Some(info)),
                _ => {
                    debug!("Unknown vendor block 0x{:06X}", vsdb.ieee_id);
                    Ok(())
                }
            };
            if let Err(e) = result {
                warn!("Skipping vendor block 0x{:06X}: {}", vsdb.ieee_id, e);
            }
        }

        let hf_rate = self.hdmi_forum.as_ref().map(|hf| hf.max_tmds_char_rate).unwrap_or(0);
        if let Some(llc) = self.hdmi_llc.as_mut() {
            if let Some(scdb) = hf_scdb.filter(|scdb| scdb.len() > 1) {
                llc.effective_tmds_clock = scdb[1];
            } else if llc_present {
                // 340 MHz is the ceiling without an HDMI Forum block
                llc.effective_tmds_clock = if hf_present {
                    llc.max_tmds_clock.max(hf_rate)
                } else {
                    llc.max_tmds_clock.min(0x44)
                };
            }
        }
    }

    /// Folds in the vendor specific video blocks of one CTA-861 source.
    pub fn update_video(&mut self, vsvdbs: &[VendorBlock]) {
        for vsvdb in vsvdbs {
            let result = match vsvdb.ieee_id {
                DOLBY_VISION_IEEE_ID => {
                    DolbyVision::parse(&vsvdb.data).map(|info| self.dolby_vision = Some(info))
                }
                HDR10_PLUS_IEEE_ID => {
                    Hdr10Plus::parse(&vsvdb.data).map(|info| self.hdr10_plus = Some(info))
                }
                _ => Ok(()),
            };
            if let Err(e) = result {
                warn!("Skipping vendor video block 0x{:06X}: {}", vsvdb.ieee_id, e);
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, FromRepr, strum::Display)]
#[repr(u8)]
pub enum Stereo3dStructure {
    FramePacking = 0,
    FieldAlternative = 1,
    LineAlternative = 2,
    SideBySideFull = 3,
    LDepth = 4,
    LDepthGraphics = 5,
    TopBottom = 6,
    SideBySideHalf = 8,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stereo3dStructures(u16);
bitflags! {
    impl Stereo3dStructures: u16 {
        const FramePacking = 1 << 0;
        const FieldAlternative = 1 << 1;
        const LineAlternative = 1 << 2;
        const SideBySideFull = 1 << 3;
        const LDepth = 1 << 4;
        const LDepthGraphics = 1 << 5;
        const TopBottom = 1 << 6;
        const SideBySideHalf = 1 << 8;
    }
}

impl Stereo3dStructures {
    pub fn from_code(code: u8) -> Self {
        if code < 16 {
            Self::from_bits_truncate(1 << code)
        } else {
            Self::empty()
        }
    }

    /// Structures the "all VICs" masks of the HDMI vendor block may name.
    fn all_vic_mask() -> Self {
        Self::FramePacking | Self::TopBottom | Self::SideBySideHalf
    }
}

impl From<Stereo3dStructure> for Stereo3dStructures {
    fn from(structure: Stereo3dStructure) -> Self {
        Self::from_code(structure as u8)
    }
}

pub const SIDE_BY_SIDE_HALF_HORIZONTAL: u8 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stereo3dVic {
    pub vic: u8,
    pub structures: Stereo3dStructures,
    pub side_by_side_half_detail: u8,
}

/// 3D formats per VIC. The first 16 slots mirror the order of the short video descriptors so
/// the optional structure lists can address them by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Hdmi3dSupport {
    pub entries: Vec<Stereo3dVic>,
}

impl Hdmi3dSupport {
    fn add_mode(&mut self, vic: u8, structure: Stereo3dStructure, detail: u8) {
        if vic == 0 {
            return;
        }
        let index = match self.entries.iter().position(|entry| entry.vic == vic) {
            Some(index) => index,
            None => {
                let index = self.entries.len().max(MAX_EDID_ADDRESSABLE_3D_VICS);
                if index >= MAX_3D_VICS_SUPPORTED {
                    return;
                }
                self.entries.resize(index + 1, Stereo3dVic::default());
                self.entries[index].vic = vic;
                index
            }
        };
        let entry = &mut self.entries[index];
        entry.structures |= structure.into();
        if structure == Stereo3dStructure::SideBySideHalf {
            entry.side_by_side_half_detail = detail;
        }
    }

    pub fn find(&self, vic: u8) -> Option<&Stereo3dVic> {
        self.entries.iter().find(|entry| entry.vic == vic)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads the HDMI video section of an HDMI LLC vendor block. HDMI 4k VICs are appended to the
/// table, the returned map lists every VIC with at least one 3D structure.
pub fn parse_hdmi_llc_timing(vsdb: &VendorBlock, table: &mut TimingTable) -> Hdmi3dSupport {
    let mut support = Hdmi3dSupport::default();
    let mut supports_50hz = false;
    let mut supports_60hz = false;
    for timing in table.iter().filter(|timing| timing.status.is_cta861()) {
        if support.entries.len() < MAX_EDID_ADDRESSABLE_3D_VICS {
            support.entries.push(Stereo3dVic {
                vic: timing.status.seq(),
                ..Stereo3dVic::default()
            });
        }
        match timing.refresh_rate {
            50 => supports_50hz = true,
            60 => supports_60hz = true,
            _ => {}
        }
    }

    if vsdb.ieee_id == HDMI_LLC_IEEE_ID && vsdb.data.len() > HDMI_LLC_FIXED_SIZE {
        let flags = vsdb.data[4];
        let data = &vsdb.data[HDMI_LLC_FIXED_SIZE..];
        let data = &data[..data.len().min(HDMI_LLC_MAX_VIDEO_DATA)];
        let mut offset = 0;
        if flags & 0x80 != 0 {
            offset += LATENCY_SIZE;
            if flags & 0x40 != 0 {
                offset += LATENCY_SIZE;
            }
        }
        if flags & 0x20 != 0 && data.len() >= offset + 2 {
            parse_hdmi_video(&data[offset..], supports_50hz, supports_60hz, &mut support, table);
        }
    }

    support.entries.retain(|entry| !entry.structures.is_empty());
    debug!("HDMI 3D support: {:?}", support);
    support
}

fn parse_hdmi_video(
    data: &[u8],
    supports_50hz: bool,
    supports_60hz: bool,
    support: &mut Hdmi3dSupport,
    table: &mut TimingTable,
) {
    let present_3d = data[0] & 0x80 != 0;
    let multi_3d = (data[0] >> 5) & 0x03;
    let len_3d = (data[1] & 0x1F) as usize;
    let len_vic = (data[1] >> 5) as usize;
    let mut offset = 2;

    if present_3d && (supports_50hz || supports_60hz) {
        support.add_mode(32, Stereo3dStructure::FramePacking, 0);
        support.add_mode(32, Stereo3dStructure::TopBottom, 0);
        if supports_50hz {
            support.add_mode(19, Stereo3dStructure::FramePacking, 0);
            support.add_mode(19, Stereo3dStructure::TopBottom, 0);
            support.add_mode(20, Stereo3dStructure::SideBySideHalf, SIDE_BY_SIDE_HALF_HORIZONTAL);
        }
        if supports_60hz {
            support.add_mode(4, Stereo3dStructure::FramePacking, 0);
            support.add_mode(4, Stereo3dStructure::TopBottom, 0);
            support.add_mode(5, Stereo3dStructure::SideBySideHalf, SIDE_BY_SIDE_HALF_HORIZONTAL);
        }
    }

    if data.len() > offset && data.len() - offset >= len_vic {
        for &hdmi_vic in &data[offset..offset + len_vic] {
            if let Ok(timing) = enum_hdmi_ext_timing(hdmi_vic) {
                if !table.assign_next_available(timing) {
                    break;
                }
            }
        }
        offset += len_vic;
    }

    if present_3d
        && (multi_3d == 1 || multi_3d == 2)
        && len_3d > 0
        && data.len() > offset + 1
        && data.len() - offset >= len_3d
    {
        let structures = Stereo3dStructures::from_bits_truncate(
            u16::from_be_bytes([data[offset], data[offset + 1]]),
        ) & Stereo3dStructures::all_vic_mask();
        offset += 2;
        let vic_mask = if multi_3d == 2 && data.len() > offset + 1 {
            let mask = u16::from_be_bytes([data[offset], data[offset + 1]]);
            offset += 2;
            mask
        } else {
            0xFFFF
        };
        let detail = if structures.contains(Stereo3dStructures::SideBySideHalf) {
            SIDE_BY_SIDE_HALF_HORIZONTAL
        } else {
            0
        };
        let addressable = support.entries.len().min(MAX_EDID_ADDRESSABLE_3D_VICS);
        for (index, entry) in support.entries[..addressable].iter_mut().enumerate() {
            if vic_mask & (1 << index) != 0 && entry.vic != 0 {
                entry.structures |= structures;
                entry.side_by_side_half_detail = detail;
            }
        }
    }

    while offset < data.len() {
        let structure = data[offset] & 0x0F;
        let order = (data[offset] >> 4) as usize;
        let side_by_side_half = structure >= Stereo3dStructure::SideBySideHalf as u8;
        let detail = if side_by_side_half {
            data.get(offset + 1).map(|byte| byte >> 4).unwrap_or(0)
        } else {
            0
        };
        if let Some(entry) = support.entries.get_mut(order) {
            entry.structures |= Stereo3dStructures::from_code(structure);
            entry.side_by_side_half_detail = detail;
        }
        offset += if side_by_side_half { 2 } else { 1 };
    }
}

/// Derives the frame of a 3D format from its 2D timing. Frame packing stacks both eyes with
/// the vertical blank as active space, side-by-side full doubles the width. The other
/// structures keep the 2D raster.
pub fn hdmi_stereo_timing(timing: &Timing, structure: Stereo3dStructure) -> Timing {
    let mut stereo = timing.clone();
    match structure {
        Stereo3dStructure::FramePacking => {
            let v_blank = timing.v_total - timing.v_visible;
            stereo.v_visible = if timing.interlaced {
                timing.v_visible * 4 + (v_blank + 1) * 2 + (v_blank - 1)
            } else {
                timing.v_visible * 2 + v_blank
            };
            stereo.v_total = stereo.v_visible + v_blank;
            stereo.status.set_raw_type(TimingType::HdmiStereo as u8);
        }
        Stereo3dStructure::SideBySideFull => {
            let h_blank = timing.h_total - timing.h_visible;
            stereo.h_visible = timing.h_visible * 2;
            stereo.h_total = stereo.h_visible + h_blank;
            stereo.status.set_raw_type(TimingType::HdmiStereo as u8);
        }
        _ => {}
    }
    stereo.pclk = rrx1k_to_pclk(&stereo);
    stereo
}

#[cfg(test)]
mod tests {
    use crate::cta861::vic::enum_cea861_timing;
    use crate::cta861::vsdb::*;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    fn cta_table(vics: &[u8]) -> TimingTable {
        let mut table = TimingTable::new();
        for vic in vics {
            table.assign_next_available(enum_cea861_timing(*vic).unwrap());
        }
        table
    }

    #[test]
    fn test_vendor_block_split() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let vsdb = VendorBlock::from_payload(&[0x03, 0x0C, 0x00, 0x10, 0x00], 28).unwrap();
        assert_eq!(HDMI_LLC_IEEE_ID, vsdb.ieee_id);
        assert_eq!(vec![0x10, 0x00], vsdb.data);
        assert!(VendorBlock::from_payload(&[0x03, 0x0C], 28).is_err());
    }

    #[test]
    fn test_hdmi_llc_progressive_fields() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let llc = HdmiLlcInfo::parse(&[0x12, 0x34]).unwrap();
        assert_eq!([1, 2, 3, 4], llc.physical_address);
        assert_eq!(0, llc.max_tmds_clock);

        let llc = HdmiLlcInfo::parse(&[0x10, 0x00, 0xB8, 0x3C, 0xA0]).unwrap();
        assert!(llc.supports_ai && llc.dc_36_bit && llc.dc_30_bit && llc.dc_y444);
        assert!(!llc.dc_48_bit && !llc.dual_dvi);
        assert_eq!(0x3C, llc.max_tmds_clock);
        assert!(llc.latency_fields_present && llc.hdmi_video_present);
        assert!(!llc.i_latency_fields_present);
    }

    #[test]
    fn test_hdmi_forum_fields() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let hf = HdmiForumInfo::parse(&[0x01, 0x78, 0x80, 0x33]).unwrap();
        assert_eq!(0x78, hf.max_tmds_char_rate);
        assert!(hf.scdc_present && hf.dc_30bit_420 && hf.dc_36bit_420);
        assert_eq!(3, hf.max_frl_rate);
        assert_eq!(0, hf.vrr_max);

        let hf = HdmiForumInfo::parse(&[0x01, 0x78, 0x80, 0x03, 0x02, 0x70, 0x20, 0x81, 0x36, 0x0F])
            .unwrap();
        assert!(hf.allm);
        assert_eq!(0x30, hf.vrr_min);
        assert_eq!(0x120, hf.vrr_max);
        assert!(hf.dsc_10bpc && hf.dsc_1p2);
        assert_eq!((12, 400), (hf.dsc_max_slices, hf.dsc_max_pclk_per_slice_mhz));
        assert_eq!(3, hf.dsc_max_frl_rate);
        assert_eq!(16, hf.dsc_total_chunk_kbytes);

        assert!(HdmiForumInfo::parse(&[0x02, 0x78, 0x80, 0x03]).is_err());
        assert!(HdmiForumInfo::parse(&[0x01, 0x78]).is_err());
    }

    #[test]
    fn test_nvidia_and_msft_blocks() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let nvidia = NvidiaVsdb::parse(&[0x01, 0x30]).unwrap();
        assert!(nvidia.supports_vrr);
        assert_eq!(0x30, nvidia.vrr_min_refresh_rate);
        assert!(NvidiaVsdb::parse(&[0x02, 0x30]).is_err());
        assert!(NvidiaVsdb::parse(&[0x01]).is_err());

        let mut data = [0u8; 18];
        data[0] = 3;
        data[1] = 0x45;
        data[2] = 0xAA;
        let msft = MsftVsdb::parse(&data).unwrap();
        assert!(msft.desktop_usage && !msft.third_party_usage);
        assert_eq!(5, msft.primary_use_case);
        assert_eq!(0xAA, msft.container_id[0]);
        data[0] = 2;
        assert_eq!(0, MsftVsdb::parse(&data).unwrap().primary_use_case);
        assert!(MsftVsdb::parse(&data[..17]).is_err());
    }

    #[test]
    fn test_effective_tmds_clock() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let llc = VendorBlock {
            ieee_id: HDMI_LLC_IEEE_ID,
            data: vec![0x10, 0x00, 0x00, 0x78],
        };
        let mut vendor = VendorInfo::default();
        vendor.update(&[llc.clone()], None);
        assert_eq!(0x44, vendor.hdmi_llc.as_ref().unwrap().effective_tmds_clock);

        let hf = VendorBlock {
            ieee_id: HDMI_FORUM_IEEE_ID,
            data: vec![0x01, 0x8C, 0x00, 0x00],
        };
        let mut vendor = VendorInfo::default();
        vendor.update(&[llc.clone(), hf], None);
        assert_eq!(0x8C, vendor.hdmi_llc.as_ref().unwrap().effective_tmds_clock);

        let mut vendor = VendorInfo::default();
        vendor.update(&[llc], Some(&[0x01, 0x64, 0x00, 0x00]));
        assert_eq!(0x64, vendor.hdmi_llc.as_ref().unwrap().effective_tmds_clock);
        assert_eq!(0x64, vendor.hdmi_forum.as_ref().unwrap().max_tmds_char_rate);
    }

    #[test]
    fn test_hdmi_3d_mandatory_and_vics() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut table = cta_table(&[16, 4, 5, 32]);
        // no latency, HDMI video present, 3D present, 1 HDMI VIC, 2D VIC 0 side-by-side half
        let vsdb = VendorBlock {
            ieee_id: HDMI_LLC_IEEE_ID,
            data: vec![0x10, 0x00, 0x00, 0x00, 0x20, 0x80, 0x22, 0x01, 0x08, 0x10],
        };
        let support = parse_hdmi_llc_timing(&vsdb, &mut table);
        assert_eq!(5, table.len());
        assert_eq!(TimingType::HdmiExt, table[4].status.timing_type());

        let vic16 = support.find(16).unwrap();
        assert_eq!(Stereo3dStructures::SideBySideHalf, vic16.structures);
        assert_eq!(1, vic16.side_by_side_half_detail);
        let vic4 = support.find(4).unwrap();
        assert_eq!(Stereo3dStructures::FramePacking | Stereo3dStructures::TopBottom, vic4.structures);
        assert!(support.find(5).unwrap().structures.contains(Stereo3dStructures::SideBySideHalf));
        assert!(support.find(32).is_some());
        assert!(support.find(19).is_none());
    }

    #[test]
    fn test_hdmi_3d_all_vic_mask() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut table = cta_table(&[16, 31]);
        // 3D multi present = 2, 3D len 4: top-bottom for the second VIC only
        let vsdb = VendorBlock {
            ieee_id: HDMI_LLC_IEEE_ID,
            data: vec![0x10, 0x00, 0x00, 0x00, 0x20, 0xC0, 0x04, 0x00, 0x40, 0x00, 0x02],
        };
        let support = parse_hdmi_llc_timing(&vsdb, &mut table);
        assert!(support.find(16).is_none());
        assert_eq!(Stereo3dStructures::TopBottom, support.find(31).unwrap().structures);
        assert!(support.find(32).unwrap().structures.contains(Stereo3dStructures::FramePacking));
        assert_eq!(1, support.find(20).unwrap().side_by_side_half_detail);
    }

    #[test]
    fn test_stereo_timing_from_2d() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let timing = enum_cea861_timing(4).unwrap();
        let packed = hdmi_stereo_timing(&timing, Stereo3dStructure::FramePacking);
        assert_eq!(1470, packed.v_visible);
        assert_eq!(1500, packed.v_total);
        assert_eq!(14835, packed.pclk);
        assert_eq!(TimingType::HdmiStereo, packed.status.timing_type());

        let full = hdmi_stereo_timing(&timing, Stereo3dStructure::SideBySideFull);
        assert_eq!(2560, full.h_visible);
        assert_eq!(2930, full.h_total);

        let half = hdmi_stereo_timing(&timing, Stereo3dStructure::SideBySideHalf);
        assert_eq!(timing.h_visible, half.h_visible);
        assert_eq!(TimingType::Edid861St, half.status.timing_type());
    }
}
