// SPDX-License-Identifier: MIT

use crate::checksum::{check_header, is_checksum_valid, EDID_BLOCK_SIZE};
use crate::cta861::{CeaInfo, CTA861_TAG};
use crate::displayid::{extension_version, validate_displayid_extension, DISPLAYID_EXTENSION_TAG};
use crate::displayid20::{parse_displayid20_extension, validation_mask, DisplayId20Info, Did20ValidationErrors};
use crate::edid::descriptor::{
    is_display_descriptor, parse_detailed_timing, DisplayDescriptor, LongDisplayDescriptor, DESCRIPTOR_SIZE,
};
use crate::edid::vtb::VTB_TAG;
use crate::edid::{FeatureSupport, EDID_VERSION_1_3, EDID_VERSION_1_4};
use bitflags::bitflags;
use log::{debug, trace};
use serde::Serialize;

const VERSION_OFFSET: usize = 0x12;
const FEATURE_OFFSET: usize = 0x18;
const DESCRIPTOR_OFFSET: usize = 0x36;
const DESCRIPTOR_COUNT: usize = 4;
const EXTENSION_COUNT_OFFSET: usize = 0x7E;

/// Independent defects found by [`validate_edid`]. Bit positions follow the driver's
/// validation mask so a mask can be compared with logs of other tools.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(u32);
bitflags! {
    impl ValidationErrors: u32 {
        const Ext = 1 << 0;
        const Version = 1 << 1;
        const Size = 1 << 2;
        const Checksum = 1 << 3;
        const RangeLimit = 1 << 4;
        const Dtd = 1 << 5;
        const ExtDtd = 1 << 7;
        const ExtDidVersion = 1 << 17;
        const ExtDid13Tag = 1 << 21;
        const ExtDid2MandatoryBlocks = 1 << 25;
    }
}

/// EDID version from the magic header, or the DisplayID 2.0 version of a structure that
/// replaces the EDID.
fn edid_version(bytes: &[u8]) -> Option<u16> {
    if bytes[0] == 0x00 {
        check_header(bytes).then(|| (bytes[VERSION_OFFSET] as u16) << 8 | bytes[VERSION_OFFSET + 1] as u16)
    } else if bytes[0] & 0xF0 == 0x20 {
        Some(((bytes[0] & 0xF0) as u16) << 4 | (bytes[0] & 0x0F) as u16)
    } else {
        None
    }
}

fn descriptor_slots(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    (0..DESCRIPTOR_COUNT).map(move |i| {
        let offset = DESCRIPTOR_OFFSET + i * DESCRIPTOR_SIZE;
        &bytes[offset..offset + DESCRIPTOR_SIZE]
    })
}

/// The first range limits descriptor must have ordered rates and non-zero maxima. Only
/// checked where the limits are binding: EDID 1.3, and 1.4 with continuous frequency.
fn validate_range_limits(bytes: &[u8], version: u16) -> ValidationErrors {
    let continuous = FeatureSupport::from_bits_truncate(bytes[FEATURE_OFFSET])
        .contains(FeatureSupport::ContinuousFrequency);
    if !(version == EDID_VERSION_1_3 || (version == EDID_VERSION_1_4 && continuous)) {
        return ValidationErrors::empty();
    }
    let limits = descriptor_slots(bytes)
        .filter(|slot| is_display_descriptor(slot))
        .filter_map(|slot| DisplayDescriptor::read(slot, version).ok())
        .find_map(|descriptor| match descriptor.descriptor {
            LongDisplayDescriptor::RangeLimits(limits) => Some(limits),
            _ => None,
        });
    match limits {
        Some(limits) if !limits.is_consistent() => {
            debug!("Inconsistent range limits {:?}", limits);
            ValidationErrors::RangeLimit
        }
        _ => ValidationErrors::empty(),
    }
}

/// Detailed timing slots must decode, display descriptor slots must keep their reserved
/// byte clear.
fn validate_descriptors(bytes: &[u8]) -> ValidationErrors {
    let mut errors = ValidationErrors::empty();
    for (i, slot) in descriptor_slots(bytes).enumerate() {
        let valid = if is_display_descriptor(slot) {
            slot[2] == 0
        } else {
            parse_detailed_timing(slot).is_ok()
        };
        if !valid {
            debug!("Descriptor slot {} is malformed", i);
            errors |= ValidationErrors::Dtd;
        }
    }
    errors
}

fn validate_cta_extension(block: &[u8]) -> ValidationErrors {
    let mut errors = ValidationErrors::empty();
    if let Err(e) = CeaInfo::read(block) {
        debug!("CTA-861 extension rejected: {}", e);
        errors |= ValidationErrors::Ext;
    }
    if !is_checksum_valid(block) {
        errors |= ValidationErrors::Checksum;
    }
    let mut offset = block[2] as usize;
    if offset == 0 {
        return errors;
    }
    while offset + DESCRIPTOR_SIZE <= EDID_BLOCK_SIZE && (block[offset] != 0 || block[offset + 1] != 0) {
        if parse_detailed_timing(&block[offset..offset + DESCRIPTOR_SIZE]).is_err() {
            debug!("CTA-861 detailed timing at {} is malformed", offset);
            errors |= ValidationErrors::ExtDtd;
        }
        offset += DESCRIPTOR_SIZE;
    }
    errors
}

fn validate_displayid(block: &[u8], strong: bool) -> ValidationErrors {
    let mut errors = ValidationErrors::empty();
    if !is_checksum_valid(block) {
        errors |= ValidationErrors::Checksum;
    }
    match extension_version(block) {
        Some(2) => {
            let mut info = DisplayId20Info::default();
            match parse_displayid20_extension(block, &mut info) {
                Ok(()) => {
                    let mask = validation_mask(&info, strong);
                    if mask.contains(Did20ValidationErrors::Version) {
                        errors |= ValidationErrors::ExtDidVersion;
                    }
                    if mask.intersects(Did20ValidationErrors::ProductId | Did20ValidationErrors::NoDataBlock) {
                        errors |= ValidationErrors::ExtDid2MandatoryBlocks;
                    }
                }
                Err(e) => {
                    debug!("DisplayID 2.0 extension rejected: {}", e);
                    errors |= ValidationErrors::ExtDidVersion;
                }
            }
        }
        Some(1) => {
            if let Err(e) = validate_displayid_extension(block) {
                debug!("DisplayID extension rejected: {}", e);
                errors |= ValidationErrors::ExtDid13Tag;
            }
        }
        version => {
            debug!("DisplayID extension of version {:?}", version);
            errors |= ValidationErrors::ExtDidVersion;
        }
    }
    errors
}

/// Checks `bytes` without modifying or repairing them and reports every defect found.
///
/// Size, version and base block checksum defects end the check. Strong validation goes on
/// with the range limits, the descriptor slots and every extension block.
pub fn validate_edid(bytes: &[u8], strong: bool) -> ValidationErrors {
    if bytes.len() < EDID_BLOCK_SIZE {
        return ValidationErrors::Size;
    }
    let Some(version) = edid_version(bytes) else {
        return ValidationErrors::Version;
    };
    if !is_checksum_valid(bytes) {
        return ValidationErrors::Checksum;
    }
    if !strong {
        return ValidationErrors::empty();
    }

    let mut errors = validate_range_limits(bytes, version);
    let extension_count = bytes[EXTENSION_COUNT_OFFSET] as usize;
    if (extension_count + 1) * EDID_BLOCK_SIZE > bytes.len() {
        return errors | ValidationErrors::Size;
    }
    errors |= validate_descriptors(bytes);

    for index in 1..=extension_count {
        let block = &bytes[index * EDID_BLOCK_SIZE..(index + 1) * EDID_BLOCK_SIZE];
        trace!("Validating extension {} with tag 0x{:02X}", index, block[0]);
        errors |= match block[0] {
            CTA861_TAG => validate_cta_extension(block),
            VTB_TAG if !is_checksum_valid(block) => ValidationErrors::Checksum,
            DISPLAYID_EXTENSION_TAG => validate_displayid(block, strong),
            _ => ValidationErrors::empty(),
        };
    }
    errors
}
