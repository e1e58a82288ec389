// SPDX-License-Identifier: MIT

use crate::checksum::EDID_BLOCK_SIZE;
use crate::cta861::block::{
    collect_data_blocks, Colorimetry, DidTimingBlock, NativeVideoResolution, ShortAudioDescriptor,
    VideoCapability,
};
use crate::cta861::hdr::HdrStaticMetadata;
use crate::cta861::vic::{enum_cea861_timing, svd_is_native, svd_vic, MAX_VIC};
use crate::cta861::vsdb::{HdmiForumInfo, VendorBlock};
use crate::edid::descriptor::{parse_detailed_timing, DESCRIPTOR_SIZE};
use crate::table::TimingTable;
use crate::timing::{is_exact_equal, ColorDepth, Timing, TimingFlags, TimingStatus, TimingType};
use crate::{Error, Result};
use bitflags::bitflags;
use log::{debug, trace, warn};
use serde::Serialize;

pub mod block;
pub mod did_timing;
pub mod hdr;
pub mod vic;
pub mod vsdb;

pub const CTA861_TAG: u8 = 0x02;

pub const REVISION_ORIGINAL: u8 = 1;
pub const REVISION_A: u8 = 2;
pub const REVISION_B: u8 = 3;
pub const REVISION_F: u8 = 3;

/// Lowest pixel clock, in 10 kHz units, for which HDMI allows YCbCr 4:2:0.
pub const HDMI_YUV420_PCLK_MIN: u32 = 59000;

const DATA_BLOCK_COLLECTION_OFFSET: usize = 4;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BasicCaps(u8);
bitflags! {
    impl BasicCaps: u8 {
        const YCbCr422 = 0b00010000;
        const YCbCr444 = 0b00100000;
        const BasicAudio = 0b01000000;
        const Underscan = 0b10000000;
    }
}

/// Where a CTA-861 data block collection was found. Decides the table its timings go to and
/// the flags they carry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum CtaOrigin {
    Extension,
    DisplayId13,
    DisplayId20,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Precedence {
    /// Only fills fields the target has not populated yet.
    KeepExisting,
    /// Overwrites every field the source has populated.
    Replace,
}

/// Meaning of a short video reference byte, selected by its range.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Svr {
    Vic(u8),
    /// K-th 18-byte descriptor of the base block and the CTA extensions, from 1.
    Dtd(u8),
    /// N-th 20-byte type VII descriptor, then the type X descriptors, from 1.
    DidDescriptor(u8),
    /// First format of the first video format block with rate index N.
    RateIndexed(u8),
    FirstType8,
    Reserved,
}

impl Svr {
    pub fn classify(svr: u8) -> Self {
        match svr {
            0 | 128 | 176..=192 | 255 => Svr::Reserved,
            129..=144 => Svr::Dtd(svr - 128),
            145..=160 => Svr::DidDescriptor(svr - 144),
            161..=175 => Svr::RateIndexed(svr - 160),
            254 => Svr::FirstType8,
            _ => Svr::Vic(svr),
        }
    }
}

/// Decoded CTA-861 extension, or a CTA data block collection embedded in DisplayID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CeaInfo {
    pub revision: u8,
    pub basic_caps: BasicCaps,
    pub dtd_offset: u8,
    pub svds: Vec<u8>,
    pub sads: Vec<ShortAudioDescriptor>,
    pub speakers: Vec<[u8; 3]>,
    pub vsdbs: Vec<VendorBlock>,
    pub vsvdbs: Vec<VendorBlock>,
    pub video_capability: Option<VideoCapability>,
    pub colorimetry: Option<Colorimetry>,
    pub preferred_svrs: Vec<u8>,
    pub y420_svds: Vec<u8>,
    pub y420_cmdb: Option<Vec<u8>>,
    pub hdr_static: Option<HdrStaticMetadata>,
    pub native_video: Option<NativeVideoResolution>,
    pub did_type7: Vec<DidTimingBlock>,
    pub did_type8: Vec<DidTimingBlock>,
    pub did_type10: Vec<DidTimingBlock>,
    pub hf_scdb: Option<Vec<u8>>,
    pub hf_eeodb: Option<u8>,
}

impl CeaInfo {
    /// Decodes the header and the data block collection of a 128-byte CTA-861 extension.
    pub fn read(block: &[u8]) -> Result<Self> {
        if block.len() < EDID_BLOCK_SIZE {
            return Err(Error::InvalidEdid(format!(
                "CTA-861 extension of {} bytes",
                block.len()
            )));
        }
        if block[0] != CTA861_TAG || block[1] < REVISION_ORIGINAL {
            return Err(Error::InvalidEdid(format!(
                "Block with tag 0x{:02X} revision {} is no CTA-861 extension",
                block[0], block[1]
            )));
        }
        if (1..DATA_BLOCK_COLLECTION_OFFSET as u8).contains(&block[2]) {
            return Err(Error::InvalidEdid(format!(
                "CTA-861 detailed timing offset {} points into the header",
                block[2]
            )));
        }

        let mut info = Self {
            revision: block[1],
            dtd_offset: block[2],
            ..Self::default()
        };
        if info.revision == REVISION_ORIGINAL {
            return Ok(info);
        }
        info.basic_caps = BasicCaps::from_bits_truncate(block[3]);
        if info.revision == REVISION_A {
            return Ok(info);
        }
        let end = (info.dtd_offset as usize).min(EDID_BLOCK_SIZE);
        if end > DATA_BLOCK_COLLECTION_OFFSET {
            collect_data_blocks(&block[DATA_BLOCK_COLLECTION_OFFSET..end], &mut info);
        }
        trace!("CTA-861 revision {}: {:?}", info.revision, info);
        Ok(info)
    }

    /// Collection embedded in a DisplayID data block.
    pub fn from_data_blocks(revision: u8, data: &[u8]) -> Self {
        let mut info = Self {
            revision,
            ..Self::default()
        };
        collect_data_blocks(data, &mut info);
        info
    }

    /// Y420 capability map bit of the `index`-th SVD. A map without payload covers every SVD.
    pub fn is_y420_capable(&self, index: usize) -> bool {
        match &self.y420_cmdb {
            Some(map) if map.is_empty() => true,
            Some(map) => map
                .get(index / 8)
                .map(|byte| byte & (1 << (index % 8)) != 0)
                .unwrap_or(false),
            None => false,
        }
    }

    pub fn has_y420(&self) -> bool {
        !self.y420_svds.is_empty() || self.y420_cmdb.as_ref().is_some_and(|map| !map.is_empty())
    }
}

fn merge_vec<T: Clone>(into: &mut Vec<T>, from: &[T], precedence: Precedence) {
    if !from.is_empty() && (precedence == Precedence::Replace || into.is_empty()) {
        *into = from.to_vec();
    }
}

fn merge_option<T: Clone>(into: &mut Option<T>, from: &Option<T>, precedence: Precedence) {
    if from.is_some() && (precedence == Precedence::Replace || into.is_none()) {
        *into = from.clone();
    }
}

/// Folds `from` into `into`. With [`Precedence::KeepExisting`] a field already populated by a
/// dedicated CTA-861 extension is never overwritten by DisplayID-embedded data.
pub fn merge_cta_info(into: &mut CeaInfo, from: &CeaInfo, precedence: Precedence) {
    let replace = precedence == Precedence::Replace;
    if from.revision != 0 && (replace || into.revision == 0) {
        into.revision = from.revision;
    }
    if !from.basic_caps.is_empty() && (replace || into.basic_caps.is_empty()) {
        into.basic_caps = from.basic_caps;
    }
    merge_vec(&mut into.svds, &from.svds, precedence);
    merge_vec(&mut into.sads, &from.sads, precedence);
    merge_vec(&mut into.speakers, &from.speakers, precedence);
    merge_vec(&mut into.vsdbs, &from.vsdbs, precedence);
    merge_vec(&mut into.vsvdbs, &from.vsvdbs, precedence);
    merge_option(&mut into.video_capability, &from.video_capability, precedence);
    merge_option(&mut into.colorimetry, &from.colorimetry, precedence);
    merge_vec(&mut into.preferred_svrs, &from.preferred_svrs, precedence);
    merge_vec(&mut into.y420_svds, &from.y420_svds, precedence);
    merge_option(&mut into.y420_cmdb, &from.y420_cmdb, precedence);
    merge_option(&mut into.hdr_static, &from.hdr_static, precedence);
    merge_option(&mut into.native_video, &from.native_video, precedence);
    merge_vec(&mut into.did_type7, &from.did_type7, precedence);
    merge_vec(&mut into.did_type8, &from.did_type8, precedence);
    merge_vec(&mut into.did_type10, &from.did_type10, precedence);
    merge_option(&mut into.hf_scdb, &from.hf_scdb, precedence);
    merge_option(&mut into.hf_eeodb, &from.hf_eeodb, precedence);
}

/// YCbCr 4:2:0 depths of a sink: 8 bpc always, deeper ones as the HDMI Forum block declares.
pub fn hdmi_forum_420_depth(hf: Option<&HdmiForumInfo>) -> ColorDepth {
    let mut depth = ColorDepth::Bpc8;
    if let Some(hf) = hf {
        depth.set(ColorDepth::Bpc10, hf.dc_30bit_420);
        depth.set(ColorDepth::Bpc12, hf.dc_36bit_420);
        depth.set(ColorDepth::Bpc16, hf.dc_48bit_420);
    }
    depth
}

fn short_timing(vic: u8) -> Option<Timing> {
    if vic == 0 || vic > MAX_VIC {
        return None;
    }
    enum_cea861_timing(vic).ok()
}

/// Appends one timing per short video descriptor. Formats flagged in the 4:2:0 capability
/// map also get YCbCr 4:2:0 depths.
pub fn parse_short_timings(
    info: &CeaInfo,
    origin: CtaOrigin,
    hf: Option<&HdmiForumInfo>,
    table: &mut TimingTable,
) {
    for (index, &svd) in info.svds.iter().enumerate() {
        let vic = svd_vic(svd);
        let Some(mut timing) = short_timing(vic) else {
            debug!("Skipping SVD 0x{:02X}", svd);
            continue;
        };
        if vic <= 64 && svd_is_native(svd) {
            timing.status.set_native(true);
        }
        if info.is_y420_capable(index) {
            timing.color.yuv420 |= hdmi_forum_420_depth(hf);
        }
        if origin == CtaOrigin::DisplayId20 {
            timing.flags |= TimingFlags::DisplayId20Timing;
        }
        if !table.assign_next_available(timing) {
            break;
        }
    }
}

/// Handles the 4:2:0 video data block. A VIC that also has an SVD only gains 4:2:0 depths on
/// the existing timing, any other VIC is added as a 4:2:0-only timing.
pub fn parse_y420_timings(
    info: &CeaInfo,
    origin: CtaOrigin,
    hf: Option<&HdmiForumInfo>,
    table: &mut TimingTable,
) {
    if table.is_empty() {
        return;
    }
    let depth = hdmi_forum_420_depth(hf);
    for &svd in &info.y420_svds {
        let vic = svd_vic(svd);
        let Some(mut timing) = short_timing(vic) else {
            debug!("Skipping 4:2:0 SVD 0x{:02X}", svd);
            continue;
        };

        if info.svds.contains(&vic) {
            if let Some(existing) = table.iter_mut().find(|t| is_exact_equal(t, &timing)) {
                existing.color.yuv420 |= depth;
                continue;
            }
        }

        // 4:2:0-only formats rank below every regular SVD, no native flag
        timing.color.yuv420 |= depth;
        if origin == CtaOrigin::DisplayId20 {
            timing.flags |= TimingFlags::DisplayId20Timing;
        }
        if !table.assign_next_available(timing) {
            break;
        }
    }
}

/// Appends the 18-byte detailed timings that follow the data block collection.
pub fn parse_ext_detailed_timings(block: &[u8], table: &mut TimingTable) {
    if block.len() < EDID_BLOCK_SIZE || block[0] != CTA861_TAG || block[1] == 0 || block[2] == 0 {
        return;
    }
    let mut count = 0u8;
    let mut offset = block[2] as usize;
    while offset + DESCRIPTOR_SIZE < EDID_BLOCK_SIZE {
        let bytes = &block[offset..offset + DESCRIPTOR_SIZE];
        if bytes[0] == 0 && bytes[1] == 0 {
            break;
        }
        match parse_detailed_timing(bytes) {
            Ok(mut timing) => {
                count += 1;
                timing.status = TimingStatus::of(TimingType::EdidExtDtd, count);
                timing.set_name(format!(
                    "CTA-861Long:{:5}x{:4}x{:3}.{:03}Hz/{}",
                    timing.h_visible,
                    timing.frame_height(),
                    timing.refresh_rate_x1k / 1000,
                    timing.refresh_rate_x1k % 1000,
                    if timing.interlaced { "I" } else { "P" }
                ));
                if !table.assign_next_available(timing) {
                    break;
                }
            }
            Err(e) => warn!("Skipping CTA-861 detailed timing at {}: {}", offset, e),
        }
        offset += DESCRIPTOR_SIZE;
    }
}

fn find_timing(table: &TimingTable, timing_type: TimingType, seq: u8) -> Option<usize> {
    table
        .iter()
        .position(|t| t.status.is_type(timing_type) && t.status.seq() == seq)
}

fn count_type(table: &TimingTable, timing_type: TimingType) -> u8 {
    table.iter().filter(|t| t.status.is_type(timing_type)).count() as u8
}

/// Resolves the native video resolution block, or else the video format preference block,
/// against timings already in `table` and flags them. Nothing is added to the table.
pub fn parse_native_or_preferred(info: &CeaInfo, origin: CtaOrigin, table: &mut TimingTable) {
    let (svrs, native) = match &info.native_video {
        Some(native) => (vec![native.native_svr], true),
        None => (info.preferred_svrs.clone(), false),
    };
    let mut flag = if native {
        TimingFlags::CtaNative
    } else {
        TimingFlags::CtaPreferred
    };
    if origin == CtaOrigin::DisplayId20 {
        flag |= TimingFlags::DisplayId20Timing;
    }

    let dtd_count = count_type(table, TimingType::EdidDtd);
    let did_t7_count = count_type(table, TimingType::Cta861DidT7);

    for svr in svrs {
        let index = match Svr::classify(svr) {
            Svr::Reserved => continue,
            Svr::Dtd(kth) if origin == CtaOrigin::Extension => {
                if kth <= dtd_count {
                    find_timing(table, TimingType::EdidDtd, kth)
                } else {
                    find_timing(table, TimingType::EdidExtDtd, kth - dtd_count)
                }
            }
            Svr::DidDescriptor(kth) if origin == CtaOrigin::Extension => {
                if kth <= did_t7_count {
                    find_timing(table, TimingType::Cta861DidT7, kth)
                } else {
                    find_timing(table, TimingType::Cta861DidT10, kth - did_t7_count)
                }
            }
            Svr::Dtd(_) | Svr::DidDescriptor(_) => None,
            Svr::RateIndexed(rate_index) => {
                debug!("SVR {} refers to rate index {}, not resolved", svr, rate_index);
                break;
            }
            Svr::FirstType8 => {
                if origin == CtaOrigin::Extension {
                    if let Some(index) = find_timing(table, TimingType::Cta861DidT8, 1) {
                        flag_timing(table, index, flag, svr);
                    }
                }
                break;
            }
            Svr::Vic(vic) => short_timing(svd_vic(vic)).and_then(|preferred| {
                table
                    .iter()
                    .position(|t| t.status.is_cta861() && is_exact_equal(t, &preferred))
            }),
        };
        match index {
            Some(index) => flag_timing(table, index, flag, svr),
            None => debug!("SVR {} does not match any timing", svr),
        }
    }
}

fn flag_timing(table: &mut TimingTable, index: usize, flag: TimingFlags, svr: u8) {
    if let Some(timing) = table.get_mut(index) {
        debug!("SVR {} selects {}", svr, timing.name);
        timing.flags |= flag;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::cta861::*;
    use crate::edid::descriptor::tests::DTD_1080P;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    pub fn cta_block(data_blocks: &[u8], dtds: &[[u8; 18]]) -> Vec<u8> {
        let mut block = vec![0u8; EDID_BLOCK_SIZE];
        block[0] = CTA861_TAG;
        block[1] = 3;
        block[2] = (DATA_BLOCK_COLLECTION_OFFSET + data_blocks.len()) as u8;
        block[3] = 0xF0;
        block[4..4 + data_blocks.len()].copy_from_slice(data_blocks);
        let mut offset = block[2] as usize;
        for dtd in dtds {
            block[offset..offset + 18].copy_from_slice(dtd);
            offset += 18;
        }
        let sum = block[..127].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        block[127] = 0u8.wrapping_sub(sum);
        block
    }

    #[test]
    fn test_read_header() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let block = cta_block(&[0x42, 0x90, 0x04], &[]);
        let info = CeaInfo::read(&block).unwrap();
        assert_eq!(3, info.revision);
        assert_eq!(7, info.dtd_offset);
        assert!(info.basic_caps.contains(BasicCaps::Underscan | BasicCaps::YCbCr422));
        assert_eq!(vec![0x90, 0x04], info.svds);

        let mut block = cta_block(&[], &[]);
        block[2] = 2;
        assert!(CeaInfo::read(&block).is_err());
        block[0] = 0x10;
        assert!(CeaInfo::read(&block).is_err());

        let mut block = cta_block(&[0x42, 0x90, 0x04], &[]);
        block[1] = REVISION_A;
        let info = CeaInfo::read(&block).unwrap();
        assert!(info.svds.is_empty());
        assert!(!info.basic_caps.is_empty());
    }

    #[test]
    fn test_svr_ranges() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        assert_eq!(Svr::Reserved, Svr::classify(0));
        assert_eq!(Svr::Vic(16), Svr::classify(16));
        assert_eq!(Svr::Vic(127), Svr::classify(127));
        assert_eq!(Svr::Reserved, Svr::classify(128));
        assert_eq!(Svr::Dtd(1), Svr::classify(129));
        assert_eq!(Svr::Dtd(16), Svr::classify(144));
        assert_eq!(Svr::DidDescriptor(1), Svr::classify(145));
        assert_eq!(Svr::DidDescriptor(16), Svr::classify(160));
        assert_eq!(Svr::RateIndexed(1), Svr::classify(161));
        assert_eq!(Svr::RateIndexed(15), Svr::classify(175));
        assert_eq!(Svr::Reserved, Svr::classify(176));
        assert_eq!(Svr::Reserved, Svr::classify(192));
        assert_eq!(Svr::Vic(193), Svr::classify(193));
        assert_eq!(Svr::Vic(253), Svr::classify(253));
        assert_eq!(Svr::FirstType8, Svr::classify(254));
        assert_eq!(Svr::Reserved, Svr::classify(255));
    }

    #[test]
    fn test_short_timings() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let info = CeaInfo {
            svds: vec![0x10, 0x90, 0x00, 0xFF, 0x04],
            ..CeaInfo::default()
        };
        let mut table = TimingTable::new();
        parse_short_timings(&info, CtaOrigin::Extension, None, &mut table);
        assert_eq!(3, table.len());
        let timing = &table[0];
        assert_eq!((1920, 1080), (timing.h_visible, timing.v_visible));
        assert_eq!((2200, 1125), (timing.h_total, timing.v_total));
        assert!(!timing.is_native());
        assert!(table[1].is_native());
        assert_eq!(4, table[2].status.seq());
        assert!(table[2].color.yuv420.is_empty());
    }

    #[test]
    fn test_y420_capability_map() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let hf = HdmiForumInfo {
            dc_30bit_420: true,
            ..HdmiForumInfo::default()
        };
        let info = CeaInfo {
            svds: vec![0x10, 0x61],
            y420_cmdb: Some(vec![0x02]),
            ..CeaInfo::default()
        };
        let mut table = TimingTable::new();
        parse_short_timings(&info, CtaOrigin::DisplayId20, Some(&hf), &mut table);
        assert!(table[0].color.yuv420.is_empty());
        assert_eq!(ColorDepth::Bpc8 | ColorDepth::Bpc10, table[1].color.yuv420);
        assert!(table[1].flags.contains(TimingFlags::DisplayId20Timing));

        let info = CeaInfo {
            svds: vec![0x10, 0x61],
            y420_cmdb: Some(vec![]),
            ..CeaInfo::default()
        };
        let mut table = TimingTable::new();
        parse_short_timings(&info, CtaOrigin::Extension, None, &mut table);
        assert!(table.iter().all(|t| t.color.yuv420 == ColorDepth::Bpc8));
    }

    #[test]
    fn test_y420_video_block() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let info = CeaInfo {
            svds: vec![0x61],
            y420_svds: vec![0x61, 0x60],
            ..CeaInfo::default()
        };
        let mut table = TimingTable::new();
        parse_y420_timings(&info, CtaOrigin::Extension, None, &mut table);
        assert!(table.is_empty());

        parse_short_timings(&info, CtaOrigin::Extension, None, &mut table);
        parse_y420_timings(&info, CtaOrigin::Extension, None, &mut table);
        assert_eq!(2, table.len());
        assert_eq!(97, table[0].status.seq());
        assert_eq!(ColorDepth::Bpc8, table[0].color.yuv420);
        assert_eq!(96, table[1].status.seq());
        assert_eq!(ColorDepth::Bpc8, table[1].color.yuv420);
        assert!(!table[1].is_native());
    }

    #[test]
    fn test_ext_detailed_timings() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let block = cta_block(&[0x41, 0x10], &[DTD_1080P, DTD_1080P]);
        let mut table = TimingTable::new();
        parse_ext_detailed_timings(&block, &mut table);
        assert_eq!(2, table.len());
        assert_eq!(TimingType::EdidExtDtd, table[1].status.timing_type());
        assert_eq!(2, table[1].status.seq());
        assert!(table[0].name.starts_with("CTA-861Long: 1920x1080x 60"));
    }

    #[test]
    fn test_preferred_vic() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let info = CeaInfo {
            svds: vec![0x04, 0x10],
            preferred_svrs: vec![0x10],
            ..CeaInfo::default()
        };
        let mut table = TimingTable::new();
        parse_short_timings(&info, CtaOrigin::Extension, None, &mut table);
        parse_native_or_preferred(&info, CtaOrigin::Extension, &mut table);
        assert!(!table[0].is_preferred_cta());
        assert!(table[1].is_preferred_cta());
    }

    #[test]
    fn test_native_resolution_wins_over_preference() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let block = cta_block(&[], &[DTD_1080P, DTD_1080P]);
        let mut table = TimingTable::new();
        let mut dtd = parse_detailed_timing(&DTD_1080P).unwrap();
        dtd.status = TimingStatus::of(TimingType::EdidDtd, 1);
        table.assign_next_available(dtd);
        parse_ext_detailed_timings(&block, &mut table);

        let info = CeaInfo {
            preferred_svrs: vec![0x10],
            native_video: Some(NativeVideoResolution {
                native_svr: 131,
                ..NativeVideoResolution::default()
            }),
            ..CeaInfo::default()
        };
        parse_native_or_preferred(&info, CtaOrigin::Extension, &mut table);
        assert!(!table[0].flags.contains(TimingFlags::CtaNative));
        assert!(!table[1].flags.contains(TimingFlags::CtaNative));
        assert!(table[2].flags.contains(TimingFlags::CtaNative));
        assert!(table.iter().all(|t| !t.is_preferred_cta()));
    }

    #[test]
    fn test_rate_indexed_stops() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let info = CeaInfo {
            svds: vec![0x10],
            preferred_svrs: vec![161, 0x10],
            ..CeaInfo::default()
        };
        let mut table = TimingTable::new();
        parse_short_timings(&info, CtaOrigin::Extension, None, &mut table);
        parse_native_or_preferred(&info, CtaOrigin::Extension, &mut table);
        assert!(!table[0].is_preferred_cta());
    }

    #[test]
    fn test_merge_keeps_existing() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut into = CeaInfo {
            revision: 3,
            svds: vec![0x10],
            ..CeaInfo::default()
        };
        let from = CeaInfo {
            revision: 4,
            basic_caps: BasicCaps::YCbCr444,
            svds: vec![0x04],
            y420_svds: vec![0x61],
            hf_eeodb: Some(2),
            ..CeaInfo::default()
        };
        merge_cta_info(&mut into, &from, Precedence::KeepExisting);
        assert_eq!(3, into.revision);
        assert_eq!(vec![0x10], into.svds);
        assert_eq!(BasicCaps::YCbCr444, into.basic_caps);
        assert_eq!(vec![0x61], into.y420_svds);
        assert_eq!(Some(2), into.hf_eeodb);

        merge_cta_info(&mut into, &from, Precedence::Replace);
        assert_eq!(4, into.revision);
        assert_eq!(vec![0x04], into.svds);
    }

    #[test]
    fn test_hdmi_forum_depth() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        assert_eq!(ColorDepth::Bpc8, hdmi_forum_420_depth(None));
        let hf = HdmiForumInfo {
            dc_36bit_420: true,
            dc_48bit_420: true,
            ..HdmiForumInfo::default()
        };
        assert_eq!(
            ColorDepth::Bpc8 | ColorDepth::Bpc12 | ColorDepth::Bpc16,
            hdmi_forum_420_depth(Some(&hf))
        );
    }
}
