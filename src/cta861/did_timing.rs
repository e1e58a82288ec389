// SPDX-License-Identifier: MIT

use crate::cta861::vsdb::HdmiForumInfo;
use crate::cta861::{hdmi_forum_420_depth, CeaInfo, HDMI_YUV420_PCLK_MIN};
use crate::displayid20::{descriptor_name, type7_timing, type8_codes, type8_timing, FormulaDescriptor};
use crate::table::TimingTable;
use crate::timing::{ColorDepth, Timing, TimingFlags, TimingStatus, TimingType};
use log::{debug, warn};

const TYPE7_DESCRIPTOR_SIZE: usize = 20;
const TYPE10_DESCRIPTOR_SIZE: usize = 6;
const TYPE7_EXPECTED_REVISION: u8 = 2;
const MAX_TYPE10_DESCRIPTORS: u8 = 4;

/// Type VIII code type for DMT IDs, the only one a CTA-861 extension may use.
const CODE_TYPE_DMT: u8 = 0;

fn count_type(table: &TimingTable, timing_type: TimingType) -> u8 {
    table.iter().filter(|t| t.status.is_type(timing_type)).count() as u8
}

/// Fits the 18-byte detailed timing descriptor, so it must not be sent as type VII.
fn fits_detailed_timing(timing: &Timing) -> bool {
    timing.h_visible < 4096 && timing.v_visible < 4096 && timing.pclk < 65536
}

fn yuv420_depth(timing: &Timing, hf: Option<&HdmiForumInfo>) -> ColorDepth {
    if timing.pclk > HDMI_YUV420_PCLK_MIN {
        hdmi_forum_420_depth(hf)
    } else {
        ColorDepth::empty()
    }
}

/// Type VII timings of the extension, one descriptor per block. Rasters a regular detailed
/// timing could carry are ignored.
pub fn parse_did_type7_timings(
    info: &CeaInfo,
    hf: Option<&HdmiForumInfo>,
    table: &mut TimingTable,
) {
    let start = count_type(table, TimingType::Cta861DidT7);
    for (i, block) in info.did_type7.iter().enumerate() {
        if block.revision() != TYPE7_EXPECTED_REVISION {
            debug!("Type VII block with revision {}", block.revision());
        }
        if block.total != 1 {
            warn!("Skipping type VII block with {} descriptors", block.total);
            continue;
        }
        let bytes = &block.descriptors[..TYPE7_DESCRIPTOR_SIZE];
        let mut timing = match type7_timing(bytes, block.revision(), block.bit3()) {
            Ok(timing) => timing,
            Err(e) => {
                warn!("Skipping type VII descriptor: {}", e);
                continue;
            }
        };
        if fits_detailed_timing(&timing) {
            debug!(
                "Type VII {}x{} fits a detailed timing descriptor",
                timing.h_visible, timing.v_visible
            );
            continue;
        }
        if timing.flags.contains(TimingFlags::ExplicitYuv420) {
            timing.color.yuv420 = yuv420_depth(&timing, hf);
        }
        timing.status = TimingStatus::of(TimingType::Cta861DidT7, start + i as u8 + 1);
        timing.set_name(descriptor_name("CTA861-T7", &timing, true));
        if !table.assign_next_available(timing) {
            break;
        }
    }
}

/// Type VIII DMT codes of the extension.
pub fn parse_did_type8_timings(
    info: &CeaInfo,
    hf: Option<&HdmiForumInfo>,
    table: &mut TimingTable,
) {
    let mut seq = count_type(table, TimingType::Cta861DidT8);
    for block in &info.did_type8 {
        if block.code_type() != CODE_TYPE_DMT {
            warn!("Skipping type VIII block with code type {}", block.code_type());
            continue;
        }
        for code in type8_codes(&block.descriptors, block.bit3()) {
            let mut timing = match type8_timing(code, CODE_TYPE_DMT) {
                Ok(timing) => timing,
                Err(e) => {
                    warn!("Skipping type VIII code {}: {}", code, e);
                    continue;
                }
            };
            if block.y420() {
                timing.color.yuv420 |= yuv420_depth(&timing, hf);
            }
            seq += 1;
            timing.status = TimingStatus::of(TimingType::Cta861DidT8, seq);
            timing.set_name(descriptor_name("CTA861-T8", &timing, false));
            if !table.assign_next_available(timing) {
                return;
            }
        }
    }
}

/// Type X formula timings of the extension, up to four per block.
pub fn parse_did_type10_timings(
    info: &CeaInfo,
    hf: Option<&HdmiForumInfo>,
    table: &mut TimingTable,
) {
    let mut seq = count_type(table, TimingType::Cta861DidT10);
    for block in &info.did_type10 {
        if !(1..=MAX_TYPE10_DESCRIPTORS).contains(&block.total) {
            warn!("Skipping type X block with {} descriptors", block.total);
            continue;
        }
        let size = TYPE10_DESCRIPTOR_SIZE + block.extra_bytes();
        for bytes in block.descriptors.chunks_exact(size) {
            let timing = FormulaDescriptor::parse(bytes).and_then(|descriptor| {
                let mut timing = descriptor.timing()?;
                if descriptor.yuv420 {
                    timing.color.yuv420 |= yuv420_depth(&timing, hf);
                }
                Ok((descriptor, timing))
            });
            let (descriptor, mut timing) = match timing {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!("Skipping type X descriptor: {}", e);
                    continue;
                }
            };
            seq += 1;
            timing.status = TimingStatus::of(TimingType::Cta861DidT10, seq);
            let prefix = format!("CTA861-T10{}", descriptor.name_suffix());
            timing.set_name(descriptor_name(&prefix, &timing, false));
            if !table.assign_next_available(timing) {
                return;
            }
        }
    }
}

/// All DisplayID timing blocks of a CTA-861 extension, type VII first so that short video
/// references into type VII and type X descriptors resolve in order.
pub fn parse_did_timings(info: &CeaInfo, hf: Option<&HdmiForumInfo>, table: &mut TimingTable) {
    parse_did_type7_timings(info, hf, table);
    parse_did_type8_timings(info, hf, table);
    parse_did_type10_timings(info, hf, table);
}

#[cfg(test)]
mod tests {
    use crate::cta861::did_timing::*;
    use crate::displayid20::tests::TYPE7_2160P;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    /// 3840x2160 at 120 Hz, 1188 MHz, 4:2:0 flagged.
    fn type7_2160p120() -> [u8; 20] {
        let mut bytes = TYPE7_2160P;
        bytes[0..3].copy_from_slice(&[0x9F, 0x20, 0x12]);
        bytes[3] |= 0x80;
        bytes
    }

    fn extended(tag: u8, header: u8, descriptors: &[u8]) -> Vec<u8> {
        let mut block = vec![0xE0 | (descriptors.len() + 3) as u8, tag, header, 0x00];
        block.extend_from_slice(descriptors);
        block
    }

    #[test]
    fn test_type7() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut data = extended(0x22, 0x02, &type7_2160p120());
        data.extend(extended(0x22, 0x02, &TYPE7_2160P));
        let info = CeaInfo::from_data_blocks(3, &data);
        let mut table = TimingTable::new();
        parse_did_timings(&info, None, &mut table);

        // the 594 MHz descriptor fits an 18-byte DTD
        assert_eq!(1, table.len());
        let timing = &table[0];
        assert!(timing.status.is_type(TimingType::Cta861DidT7));
        assert_eq!(1, timing.status.seq());
        assert_eq!(120, timing.refresh_rate);
        assert_eq!(118800, timing.pclk);
        assert!(timing.flags.contains(TimingFlags::ExplicitYuv420));
        assert_eq!(ColorDepth::Bpc8, timing.color.yuv420);
        assert_eq!("CTA861-T7:#  1:3840x2160x120.000Hz/P", timing.name);
    }

    #[test]
    fn test_type8_and_type10() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut data = extended(0x23, 0x00, &[0x52, 0x55]);
        data.extend(extended(0x23, 0x40, &[0x10]));
        data.extend(extended(0x2A, 0x00, &[0x82, 0xFF, 0x0E, 0x6F, 0x08, 119]));
        let info = CeaInfo::from_data_blocks(3, &data);
        let mut table = TimingTable::new();
        parse_did_timings(&info, None, &mut table);

        assert_eq!(3, table.len());
        assert!(table[0].name.starts_with("CTA861-T8:#  1:1920x1080x60."));
        assert_eq!(2, table[1].status.seq());
        assert!(table[1].color.yuv420.is_empty());

        let rb2 = &table[2];
        assert!(rb2.status.is_type(TimingType::Cta861DidT10));
        assert_eq!(3840, rb2.h_visible);
        assert!(rb2.name.starts_with("CTA861-T10RB2:#  1:3840x2160x"));
        assert_eq!(ColorDepth::Bpc8, rb2.color.yuv420);
    }
}
