// SPDX-License-Identifier: MIT

use crate::edid::manufacturer_name;
use log::{info, trace};
use serde::Serialize;

pub const EDID_BLOCK_SIZE: usize = 128;
pub const EDID_HEADER: &[u8] = b"\x00\xff\xff\xff\xff\xff\xff\x00";

const MANUFACTURER_OFFSET: usize = 0x08;
const INPUT_OFFSET: usize = 0x14;
const FEATURE_OFFSET: usize = 0x18;
const DESCRIPTOR_OFFSET: usize = 0x36;
const DESCRIPTOR_SIZE: usize = 18;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, strum::Display)]
pub enum FixKind {
    /// The 8 byte magic header is corrupted.
    Header,
    /// A GTF capable analog monitor claiming a digital input.
    Input,
    /// No usable range limits descriptor.
    Timings,
}

struct BrokenEdid {
    manufacturer: &'static str,
    model: u16,
    fix: FixKind,
}

static BROKEN_EDIDS: &[BrokenEdid] = &[
    // DEC FR-PCXAV-YZ
    BrokenEdid {
        manufacturer: "DEC",
        model: 0x073a,
        fix: FixKind::Header,
    },
    // ViewSonic PF775a
    BrokenEdid {
        manufacturer: "VSC",
        model: 0x5a44,
        fix: FixKind::Input,
    },
    // Sharp UXGA
    BrokenEdid {
        manufacturer: "SHP",
        model: 0x138e,
        fix: FixKind::Timings,
    },
];

/// Sum of the first 128 bytes is zero modulo 256.
pub fn is_checksum_valid(block: &[u8]) -> bool {
    block.len() >= EDID_BLOCK_SIZE && checksum(&block[..EDID_BLOCK_SIZE]) == 0
}

pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte))
}

pub fn check_header(block: &[u8]) -> bool {
    block.len() >= EDID_HEADER.len() && &block[..EDID_HEADER.len()] == EDID_HEADER
}

/// Checksum holds and the block is not all zeroes.
pub fn is_block_valid(block: &[u8]) -> bool {
    is_checksum_valid(block) && block[..EDID_BLOCK_SIZE].iter().any(|byte| *byte != 0)
}

fn descriptor_tag(descriptor: &[u8]) -> Option<u8> {
    if descriptor[0] == 0 && descriptor[1] == 0 && descriptor[2] == 0 && descriptor[4] == 0 {
        Some(descriptor[3])
    } else {
        None
    }
}

fn descriptor_offsets() -> impl Iterator<Item = usize> {
    (0..4).map(|i| DESCRIPTOR_OFFSET + i * DESCRIPTOR_SIZE)
}

/// Fix a known-broken EDID base block needs, if any.
pub fn detect_fix(block: &[u8]) -> Option<FixKind> {
    if block.len() < EDID_BLOCK_SIZE {
        return None;
    }
    let manufacturer = manufacturer_name(u16::from_le_bytes([
        block[MANUFACTURER_OFFSET],
        block[MANUFACTURER_OFFSET + 1],
    ]));
    let model = u16::from_le_bytes([block[MANUFACTURER_OFFSET + 2], block[MANUFACTURER_OFFSET + 3]]);
    let broken = BROKEN_EDIDS
        .iter()
        .find(|broken| broken.manufacturer == manufacturer && broken.model == model)?;
    trace!("{} 0x{:04x} is listed as {} broken", manufacturer, model, broken.fix);

    let needed = match broken.fix {
        FixKind::Header => !check_header(block),
        FixKind::Input => block[FEATURE_OFFSET] & 0x01 != 0 && block[INPUT_OFFSET] & 0x80 != 0,
        FixKind::Timings => !descriptor_offsets().any(|offset| {
            descriptor_tag(&block[offset..offset + DESCRIPTOR_SIZE]) == Some(0xFD)
        }),
    };
    if needed {
        info!(
            "The EDID block of manufacturer {} model 0x{:04x} is known to be broken",
            manufacturer, model
        );
        Some(broken.fix)
    } else {
        None
    }
}

/// Patches a known-broken EDID base block in place and returns the fix applied.
pub fn repair(block: &mut [u8]) -> Option<FixKind> {
    let fix = detect_fix(block)?;
    match fix {
        FixKind::Header => {
            info!("Reconstructing EDID header");
            block[..EDID_HEADER.len()].copy_from_slice(EDID_HEADER);
        }
        FixKind::Input => {
            info!("Resetting EDID input type to analog");
            block[INPUT_OFFSET] &= !0x80;
            block[EDID_BLOCK_SIZE - 1] = block[EDID_BLOCK_SIZE - 1].wrapping_add(0x80);
        }
        FixKind::Timings => {
            info!("Inserting EDID range limits");
            let replaced = descriptor_offsets().find(|offset| {
                let descriptor = &block[*offset..*offset + DESCRIPTOR_SIZE];
                let is_timing = descriptor[0] != 0 || descriptor[1] != 0;
                !is_timing && !matches!(descriptor_tag(descriptor), Some(0xFF | 0xFE | 0xFC))
            });
            if let Some(offset) = replaced {
                // 60-60 Hz, 30-75 kHz, 170 MHz, GTF
                block[offset..offset + 11]
                    .copy_from_slice(&[0x00, 0x00, 0x00, 0xFD, 0x00, 60, 60, 30, 75, 17, 0x00]);
            }
            let sum = checksum(&block[..EDID_BLOCK_SIZE - 1]);
            block[EDID_BLOCK_SIZE - 1] = 0u8.wrapping_sub(sum);
        }
    }
    Some(fix)
}

/// CRC-32 (IEEE 802.3, reflected) over a whole EDID blob.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for byte in bytes {
        crc ^= *byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

#[cfg(test)]
mod tests {
    use crate::checksum::*;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    fn block_for(manufacturer: [u8; 2], model: u16) -> Vec<u8> {
        let mut block = vec![0u8; EDID_BLOCK_SIZE];
        block[..8].copy_from_slice(EDID_HEADER);
        block[8..10].copy_from_slice(&manufacturer);
        block[10..12].copy_from_slice(&model.to_le_bytes());
        block[18] = 1;
        block[19] = 3;
        let sum = checksum(&block[..127]);
        block[127] = 0u8.wrapping_sub(sum);
        block
    }

    #[test]
    fn test_checksum_and_header() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let block = block_for([0x10, 0xAC], 0x1234);
        assert!(is_checksum_valid(&block));
        assert!(check_header(&block));
        assert!(is_block_valid(&block));
        assert!(!is_block_valid(&[0u8; EDID_BLOCK_SIZE]));
        assert!(!is_checksum_valid(&block[..64]));
    }

    #[test]
    fn test_repair_dec_header() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        // "DEC" packs to 0x10A3, stored big-endian
        let mut block = block_for([0x10, 0xA3], 0x073a);
        let good = block.clone();
        block[1] = 0x00;
        assert!(!is_checksum_valid(&block));
        assert!(!check_header(&block));

        assert_eq!(Some(FixKind::Header), repair(&mut block));
        assert_eq!(EDID_HEADER, &block[..8]);
        assert_eq!(good, block);
        assert!(is_checksum_valid(&block));
        assert_eq!(None, repair(&mut block));
    }

    #[test]
    fn test_repair_input_type() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        // "VSC"
        let mut block = block_for([0x5A, 0x63], 0x5a44);
        block[INPUT_OFFSET] = 0x80;
        block[FEATURE_OFFSET] = 0x01;
        block[127] = block[127].wrapping_sub(0x81);
        assert!(is_checksum_valid(&block));
        assert_eq!(Some(FixKind::Input), repair(&mut block));
        assert_eq!(0, block[INPUT_OFFSET] & 0x80);
        assert!(is_checksum_valid(&block));
    }

    #[test]
    fn test_repair_timings() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        // "SHP"
        let mut block = block_for([0x4D, 0x10], 0x138e);
        block[DESCRIPTOR_OFFSET] = 0x01;
        let sum = checksum(&block[..127]);
        block[127] = 0u8.wrapping_sub(sum);
        assert_eq!(Some(FixKind::Timings), repair(&mut block));
        let limits = DESCRIPTOR_OFFSET + DESCRIPTOR_SIZE;
        assert_eq!(0xFD, block[limits + 3]);
        assert_eq!(17, block[limits + 9]);
        assert!(is_checksum_valid(&block));
        assert_eq!(None, detect_fix(&block));
    }

    #[test]
    fn test_unlisted_monitor_is_untouched() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut block = block_for([0x10, 0xAC], 0x073a);
        block[0] = 0xAA;
        let copy = block.clone();
        assert_eq!(None, repair(&mut block));
        assert_eq!(copy, block);
    }

    #[test]
    fn test_crc32() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        assert_eq!(0xCBF43926, crc32(b"123456789"));
        assert_eq!(0, crc32(&[]));
    }
}
