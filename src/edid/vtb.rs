// SPDX-License-Identifier: MIT

use crate::edid::descriptor::{Cvt3ByteCode, DetailedTiming, RangeLimits, DESCRIPTOR_SIZE};
use crate::edid::standard::{cvt_3byte_timings, parse_standard_timing};
use crate::table::TimingTable;
use crate::timing::{TimingStatus, TimingType};
use crate::{read_region, Result};
use binread::BinRead;
use log::{debug, warn};
use serde::Serialize;
use std::io::Cursor;

pub const VTB_TAG: u8 = 0x10;
pub const VTB_MAX_PAYLOAD: usize = 122;

const CVT_CODE_SIZE: usize = 3;
const STANDARD_CODE_SIZE: usize = 2;

/// Video timing block extension: detailed timings, then 3-byte CVT codes, then standard
/// timing codes, packed back to back.
#[derive(BinRead, Debug, Clone, Serialize)]
pub struct VtbExtension {
    #[br(assert(tag == VTB_TAG))]
    pub tag: u8,
    #[br(assert(revision != 0))]
    pub revision: u8,
    pub detailed_count: u8,
    pub cvt_count: u8,
    #[br(assert(
        detailed_count as usize * DESCRIPTOR_SIZE
            + cvt_count as usize * CVT_CODE_SIZE
            + standard_count as usize * STANDARD_CODE_SIZE
            <= VTB_MAX_PAYLOAD
    ))]
    pub standard_count: u8,
    #[br(count = VTB_MAX_PAYLOAD)]
    pub payload: Vec<u8>,
    pub checksum: u8,
}

impl VtbExtension {
    pub fn read(block: &[u8]) -> Result<Self> {
        read_region::<Self>(&mut Cursor::new(block), 0)
    }
}

/// Appends the timings of a VTB extension block. Each section keeps its own slot size,
/// so a malformed detailed timing does not shift the sections behind it.
pub fn parse_vtb_extension(
    block: &[u8],
    version: u16,
    range_limits: Option<&RangeLimits>,
    table: &mut TimingTable,
) -> Result<()> {
    let vtb = VtbExtension::read(block)?;
    let mut count = 0u8;
    let mut offset = 0usize;

    for _ in 0..vtb.detailed_count {
        let slot = &vtb.payload[offset..offset + DESCRIPTOR_SIZE];
        offset += DESCRIPTOR_SIZE;
        match DetailedTiming::read(slot).and_then(|dtd| dtd.to_timing()) {
            Ok(mut timing) => {
                count += 1;
                timing.status = TimingStatus::of(TimingType::VtbExtDtd, count);
                debug!("VTB detailed timing {}", timing.name);
                if !table.assign_next_available(timing) {
                    return Ok(());
                }
            }
            Err(e) => warn!("Skipping VTB detailed timing: {}", e),
        }
    }

    for _ in 0..vtb.cvt_count {
        let code = Cvt3ByteCode::from_bytes(&[
            vtb.payload[offset],
            vtb.payload[offset + 1],
            vtb.payload[offset + 2],
        ]);
        offset += CVT_CODE_SIZE;
        for mut timing in cvt_3byte_timings(&code) {
            count += 1;
            timing.status = TimingStatus::of(TimingType::VtbExtCvt, count);
            if !table.assign_next_available(timing) {
                return Ok(());
            }
        }
    }

    for _ in 0..vtb.standard_count {
        let code = u16::from_le_bytes([vtb.payload[offset], vtb.payload[offset + 1]]);
        offset += STANDARD_CODE_SIZE;
        match parse_standard_timing(code, version, 0, range_limits) {
            Ok(mut timing) => {
                count += 1;
                timing.status = TimingStatus::of(TimingType::VtbExtStd, count);
                if !table.assign_next_available(timing) {
                    return Ok(());
                }
            }
            Err(e) => debug!("Skipping VTB standard timing 0x{:04X}: {}", code, e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::edid::vtb::*;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    fn vtb_block(detailed: &[[u8; DESCRIPTOR_SIZE]], cvt: &[[u8; 3]], standard: &[u16]) -> Vec<u8> {
        let mut block = vec![VTB_TAG, 0x01, detailed.len() as u8, cvt.len() as u8, standard.len() as u8];
        detailed.iter().for_each(|dtd| block.extend_from_slice(dtd));
        cvt.iter().for_each(|code| block.extend_from_slice(code));
        standard.iter().for_each(|code| block.extend_from_slice(&code.to_le_bytes()));
        block.resize(128, 0);
        block
    }

    const DTD_720P: [u8; DESCRIPTOR_SIZE] = [
        0x01, 0x1D, 0x00, 0x72, 0x51, 0xD0, 0x1E, 0x20, 0x6E, 0x28, 0x55, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x1E,
    ];

    #[test]
    fn test_vtb_sections() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let block = vtb_block(&[DTD_720P], &[[0x1B, 0x24, 0x08]], &[0x8081]);
        let mut table = TimingTable::new();
        parse_vtb_extension(&block, 0x103, None, &mut table).unwrap();
        assert_eq!(3, table.len());
        assert_eq!((1280, 720), (table[0].h_visible, table[0].v_visible));
        assert_eq!(TimingType::VtbExtDtd, table[0].status.timing_type());
        assert_eq!(1, table[0].status.seq());
        assert_eq!(TimingType::VtbExtCvt, table[1].status.timing_type());
        assert_eq!(1920, table[1].h_visible);
        assert_eq!(TimingType::VtbExtStd, table[2].status.timing_type());
        assert_eq!(3, table[2].status.seq());
    }

    #[test]
    fn test_bad_detailed_timing_keeps_alignment() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let block = vtb_block(&[[0u8; DESCRIPTOR_SIZE], DTD_720P], &[], &[0x8081]);
        let mut table = TimingTable::new();
        parse_vtb_extension(&block, 0x103, None, &mut table).unwrap();
        assert_eq!(2, table.len());
        assert_eq!(1280, table[0].h_visible);
        assert_eq!(1024, table[1].v_visible);
    }

    #[test]
    fn test_vtb_rejects_bad_header() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut table = TimingTable::new();
        let mut block = vtb_block(&[], &[], &[]);
        block[1] = 0;
        assert!(parse_vtb_extension(&block, 0x103, None, &mut table).is_err());
        let mut block = vtb_block(&[], &[], &[]);
        block[2] = 7;
        assert!(parse_vtb_extension(&block, 0x103, None, &mut table).is_err());
        assert!(table.is_empty());
    }
}
