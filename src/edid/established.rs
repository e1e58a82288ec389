// SPDX-License-Identifier: MIT

use crate::formula::dmt::enum_dmt;
use crate::table::TimingTable;
use crate::timing::{calc_rrx1k, Timing, TimingFlags, TimingStatus, TimingType};
use crate::{Error, Result};
use log::debug;

/// Established timings I and II, most significant bit of byte 0x23 first. Entries without
/// a VESA raster (IBM and Apple legacy modes) are never reported.
const ESTABLISHED_DMT_IDS: [Option<u8>; 16] = [
    None,       // 720x400@70
    None,       // 720x400@88
    Some(0x04), // 640x480@60
    None,       // 640x480@67
    Some(0x05), // 640x480@72
    Some(0x06), // 640x480@75
    Some(0x08), // 800x600@56
    Some(0x09), // 800x600@60
    Some(0x0A), // 800x600@72
    Some(0x0B), // 800x600@75
    None,       // 832x624@75
    None,       // 1024x768i@87
    Some(0x10), // 1024x768@60
    Some(0x11), // 1024x768@70
    Some(0x12), // 1024x768@75
    Some(0x24), // 1280x1024@75
];

/// Established timings III, bit 7 of the first byte first.
const ESTABLISHED_III_DMT_IDS: [u8; 44] = [
    0x01, 0x02, 0x03, 0x07, 0x0E, 0x0C, 0x13, 0x15, //
    0x16, 0x17, 0x18, 0x19, 0x20, 0x21, 0x23, 0x25, //
    0x27, 0x2E, 0x2F, 0x30, 0x31, 0x29, 0x2A, 0x2B, //
    0x2C, 0x39, 0x3A, 0x3B, 0x3C, 0x33, 0x34, 0x35, //
    0x36, 0x37, 0x3E, 0x3F, 0x41, 0x42, 0x44, 0x45, //
    0x46, 0x47, 0x49, 0x4A,
];

fn established_timing(dmt_id: u8, seq: u8, label: &str) -> Result<Timing> {
    let mut timing = enum_dmt(dmt_id)?;
    timing.flags = TimingFlags::empty();
    timing.refresh_rate_x1k = calc_rrx1k(timing.pclk, timing.interlaced, timing.h_total, timing.v_total);
    timing.status = TimingStatus::of(TimingType::EdidEst, seq);
    timing.set_name(format!(
        "EDID-EST({}):{}x{}x{}Hz",
        label, timing.h_visible, timing.v_visible, timing.refresh_rate
    ));
    Ok(timing)
}

/// Established timing I/II by bit index, 0 being bit 7 of byte 0x23.
pub fn enum_established_timing(index: usize) -> Result<Timing> {
    ESTABLISHED_DMT_IDS
        .get(index)
        .copied()
        .flatten()
        .ok_or_else(|| Error::OutOfRange(format!("No established timing {}", index)))
        .and_then(|id| established_timing(id, 0, "VESA"))
}

/// Established timing III by bit index, 0 being bit 7 of the first bitmap byte.
pub fn enum_established_timing_iii(index: usize) -> Result<Timing> {
    ESTABLISHED_III_DMT_IDS
        .get(index)
        .ok_or_else(|| Error::OutOfRange(format!("No established timing III {}", index)))
        .and_then(|id| established_timing(*id, 0, "III"))
}

/// Appends the established timings I/II set in `established`. Returns the running count
/// used to number established timings.
pub fn parse_established_timings(established: u16, table: &mut TimingTable) -> u8 {
    let mut count = 0u8;
    for (index, dmt_id) in ESTABLISHED_DMT_IDS.iter().enumerate() {
        let Some(dmt_id) = dmt_id else {
            continue;
        };
        if established & (0x8000 >> index) == 0 {
            continue;
        }
        count += 1;
        if let Ok(timing) = established_timing(*dmt_id, count, "VESA") {
            debug!("Established timing {}: {}", index, timing.name);
            if !table.assign_next_available(timing) {
                break;
            }
        }
    }
    count
}

/// Appends the timings of an established timings III bitmap, numbering them after `count`.
pub fn parse_established_timings_iii(bitmap: &[u8; 6], count: u8, table: &mut TimingTable) -> u8 {
    let mut count = count;
    for (byte_index, byte) in bitmap.iter().enumerate() {
        for bit in (0..8).rev() {
            let index = byte_index * 8 + (7 - bit);
            if byte & (1 << bit) == 0 {
                continue;
            }
            let Some(dmt_id) = ESTABLISHED_III_DMT_IDS.get(index) else {
                continue;
            };
            count += 1;
            if let Ok(timing) = established_timing(*dmt_id, count, "III") {
                debug!("Established timing III {}: {}", index, timing.name);
                if !table.assign_next_available(timing) {
                    return count;
                }
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use crate::edid::established::*;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    #[test]
    fn test_single_established_timing() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut table = TimingTable::new();
        // byte 0x23 = 0x20
        assert_eq!(1, parse_established_timings(0x2000, &mut table));
        assert_eq!(1, table.len());
        let timing = &table[0];
        assert_eq!((640, 480), (timing.h_visible, timing.v_visible));
        assert_eq!((800, 525), (timing.h_total, timing.v_total));
        assert_eq!(2518, timing.pclk);
        assert_eq!(60, timing.refresh_rate);
        assert!(!timing.interlaced);
        assert_eq!(TimingType::EdidEst, timing.status.timing_type());
        assert_eq!(1, timing.status.seq());
        assert_eq!("EDID-EST(VESA):640x480x60Hz", timing.name);
    }

    #[test]
    fn test_legacy_bits_are_skipped() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut table = TimingTable::new();
        // 720x400@70, 720x400@88, 640x480@67, 832x624 and 1024x768i
        assert_eq!(0, parse_established_timings(0xC000 | 0x1000 | 0x0020 | 0x0010, &mut table));
        assert!(table.is_empty());
        assert!(enum_established_timing(0).is_err());
        assert_eq!(1280, enum_established_timing(15).unwrap().h_visible);
    }

    #[test]
    fn test_established_timings_iii_continue_numbering() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut table = TimingTable::new();
        let count = parse_established_timings(0x0001, &mut table);
        let count = parse_established_timings_iii(&[0x80, 0x00, 0x00, 0x00, 0x00, 0x0F], count, &mut table);
        assert_eq!(2, count);
        assert_eq!(2, table.len());
        assert_eq!((640, 350), (table[1].h_visible, table[1].v_visible));
        assert_eq!(2, table[1].status.seq());
        assert!(table[1].name.starts_with("EDID-EST(III)"));
        assert!(table[1].flags.is_empty());
        assert_eq!(1920, enum_established_timing_iii(43).unwrap().h_visible);
        assert!(enum_established_timing_iii(44).is_err());
    }
}
