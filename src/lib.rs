// SPDX-License-Identifier: MIT

use crate::checksum::{check_header, is_checksum_valid, EDID_BLOCK_SIZE};
use crate::cta861::did_timing::parse_did_timings;
use crate::cta861::vsdb::VendorInfo;
use crate::cta861::{
    merge_cta_info, parse_ext_detailed_timings, parse_native_or_preferred, parse_short_timings,
    parse_y420_timings, CeaInfo, CtaOrigin, Precedence, CTA861_TAG, REVISION_B, REVISION_F,
};
use crate::displayid::{
    extension_version, parse_displayid_extension, DisplayIdInfo, DISPLAYID_EXTENSION_TAG,
};
use crate::displayid20::parse_displayid20_extension;
use crate::edid::vtb::{parse_vtb_extension, VTB_TAG};
use crate::edid::{FeatureSupport, MonitorInfo, EDID_VERSION_1_3, EDID_VERSION_1_4};
use binread::{BinRead, BinReaderExt};
use log::{debug, trace, warn};
use std::any::type_name;
use std::fmt::Debug;
use std::io::{Read, Seek, SeekFrom};

pub mod checksum;
pub mod cta861;
pub mod displayid;
pub mod displayid20;
pub mod edid;
pub mod formula;
pub mod selector;
pub mod table;
pub mod timing;
pub mod validation;

/// Only the first two CTA-861 extensions are kept.
const MAX_CTA_EXTENSIONS: usize = 2;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO Error: `{0}`")]
    IOError(#[from] std::io::Error),
    #[error("Binary format parsing Error: `{0}`")]
    BinReadError(#[from] binread::Error),
    #[error("EDID has invalid format: `{0}`")]
    InvalidEdid(String),
    #[error("Invalid timing: `{0}`")]
    InvalidTiming(String),
    #[error("Value out of range: `{0}`")]
    OutOfRange(String),
    #[error("Invalid display descriptor: `{0}`")]
    InvalidDescriptor(String),
    #[error("Invalid data block: `{0}`")]
    InvalidDataBlock(String),
    #[error("Error: `{0}`")]
    ErrorMessage(String),
}

pub(crate) fn read_region<B: BinRead + Debug>(
    source: &mut (impl Seek + Read),
    offset: u64,
) -> Result<B> {
    source.seek(SeekFrom::Start(offset))?;
    trace!("Trying to parse {} at {}", type_name::<B>(), offset);
    let region = source.read_le::<B>();
    if region.is_err() {
        trace!("Failed to parse region at {}: {:?}", offset, region);
        source.seek(SeekFrom::Start(offset))?;
    }
    Ok(region?)
}

pub(crate) fn read_region_args<B: BinRead + Debug>(
    source: &mut (impl Seek + Read),
    offset: u64,
    args: B::Args,
) -> Result<B> {
    source.seek(SeekFrom::Start(offset))?;
    trace!("Trying to parse {} at {}", type_name::<B>(), offset);
    let region = source.read_le_args::<B>(args);
    if region.is_err() {
        trace!("Failed to parse region at {}: {:?}", offset, region);
        source.seek(SeekFrom::Start(offset))?;
    }
    Ok(region?)
}

/// Decodes an EDID with all of its extension blocks into one timing table.
///
/// Known broken base blocks are patched on a private copy before decoding. The base block
/// must carry the magic header and a valid checksum, extension blocks are best effort:
/// one that fails to decode is skipped with a warning.
pub fn parse_edid(bytes: &[u8]) -> Result<MonitorInfo> {
    if bytes.len() < EDID_BLOCK_SIZE {
        return Err(Error::InvalidEdid(format!(
            "EDID of {} bytes is shorter than one block",
            bytes.len()
        )));
    }
    let mut data = bytes.to_vec();
    let fix = checksum::repair(&mut data[..EDID_BLOCK_SIZE]);
    if !check_header(&data) {
        return Err(Error::InvalidEdid("Missing EDID header".to_string()));
    }
    if !is_checksum_valid(&data) {
        return Err(Error::InvalidEdid("Base block checksum mismatch".to_string()));
    }

    let mut info = MonitorInfo::read(&data)?;
    info.fix = fix;
    parse_extensions(&data, &mut info);

    let did20_timings = info
        .displayid20
        .as_ref()
        .map(|did| did.timings.to_vec())
        .unwrap_or_default();
    for timing in did20_timings {
        if !info.timings.assign_next_available(timing) {
            break;
        }
    }

    info.parse_base_timings();
    info.parse_hdmi_timings();
    info.update_color_formats();
    info.timings.reconcile_cta_formats();
    debug!("{} timings in {}", info.timings.len(), info.monitor_name());
    Ok(info)
}

fn parse_extensions(data: &[u8], info: &mut MonitorInfo) {
    let mut count = info.extension_count as usize;
    let mut index = 1;
    while index <= count && (index + 1) * EDID_BLOCK_SIZE <= data.len() {
        let block = &data[index * EDID_BLOCK_SIZE..(index + 1) * EDID_BLOCK_SIZE];
        trace!("Extension block {} tag 0x{:02X}", index, block[0]);
        let result = match block[0] {
            CTA861_TAG => parse_cta_extension(block, index, &mut count, info),
            VTB_TAG => {
                let range_limits = info.range_limits().cloned();
                parse_vtb_extension(block, info.version, range_limits.as_ref(), &mut info.timings)
            }
            DISPLAYID_EXTENSION_TAG if extension_version(block) == Some(2) => {
                parse_displayid20_block(block, info)
            }
            DISPLAYID_EXTENSION_TAG => parse_displayid13_block(block, info),
            tag => {
                debug!("Skipping extension block {} with tag 0x{:02X}", index, tag);
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!("Skipping extension block {}: {}", index, e);
        }
        index += 1;
    }
}

fn parse_cta_extension(
    block: &[u8],
    index: usize,
    count: &mut usize,
    info: &mut MonitorInfo,
) -> Result<()> {
    if info.cta.len() >= MAX_CTA_EXTENSIONS {
        warn!("Ignoring CTA-861 extension {} past the first {}", index, MAX_CTA_EXTENSIONS);
        return Ok(());
    }
    let cta = CeaInfo::read(block)?;

    // an EEODB only counts in the first extension of an EDID 1.3
    if index == 1 && info.version == EDID_VERSION_1_3 {
        if let Some(eeodb) = cta.hf_eeodb {
            debug!("EEODB overrides extension count {} with {}", count, eeodb);
            *count = eeodb as usize;
        }
    }

    info.vendor.update(&cta.vsdbs, cta.hf_scdb.as_deref());
    info.vendor.update_video(&cta.vsvdbs);
    let hf = info.vendor.hdmi_forum.clone();
    if cta.revision >= REVISION_B {
        parse_short_timings(&cta, CtaOrigin::Extension, hf.as_ref(), &mut info.timings);
        parse_y420_timings(&cta, CtaOrigin::Extension, hf.as_ref(), &mut info.timings);
    }
    parse_ext_detailed_timings(block, &mut info.timings);
    parse_did_timings(&cta, hf.as_ref(), &mut info.timings);
    if cta.revision >= REVISION_F && (!cta.preferred_svrs.is_empty() || cta.native_video.is_some()) {
        parse_native_or_preferred(&cta, CtaOrigin::Extension, &mut info.timings);
    }
    info.cta.push(cta);
    Ok(())
}

fn parse_displayid20_block(block: &[u8], info: &mut MonitorInfo) -> Result<()> {
    let mut did = info.displayid20.take().unwrap_or_default();
    let result = parse_displayid20_extension(block, &mut did);
    if result.is_ok() {
        if let Some(primary) = info.cta.first_mut() {
            if primary.has_y420() {
                did.interface_features.yuv420_min_pclk = 0;
            }
            if primary.basic_caps.is_empty() {
                primary.basic_caps = did.basic_caps;
            }
        }
        if let Some(cta) = &did.cta {
            merge_embedded_cta(info, cta);
        }
        merge_vendor_info(&mut info.vendor, &did.vendor);
    }
    info.displayid20 = Some(did);
    result
}

fn parse_displayid13_block(block: &[u8], info: &mut MonitorInfo) -> Result<()> {
    let mut did = info.displayid.take().unwrap_or_else(DisplayIdInfo::default);
    let result = parse_displayid_extension(block, &mut did, &mut info.timings);
    if result.is_ok() {
        // YCbCr in the base block implies 8 bpc on every DisplayID interface
        if info.version >= EDID_VERSION_1_4 && info.input.is_digital() {
            did.add_ycbcr_8bpc(
                info.features.contains(FeatureSupport::YCbCr444),
                info.features.contains(FeatureSupport::YCbCr422),
            );
        }
        if let Some(cta) = &did.cta {
            merge_embedded_cta(info, cta);
        }
        merge_vendor_info(&mut info.vendor, &did.vendor);
    }
    info.displayid = Some(did);
    result
}

/// Data blocks embedded in DisplayID never replace what a CTA-861 extension declared.
fn merge_embedded_cta(info: &mut MonitorInfo, cta: &CeaInfo) {
    match info.cta.first_mut() {
        Some(primary) => merge_cta_info(primary, cta, Precedence::KeepExisting),
        None => info.cta.push(cta.clone()),
    }
}

fn merge_vendor_info(into: &mut VendorInfo, from: &VendorInfo) {
    if into.hdmi_llc.is_none() {
        into.hdmi_llc = from.hdmi_llc.clone();
    }
    if into.hdmi_forum.is_none() {
        into.hdmi_forum = from.hdmi_forum.clone();
    }
    if into.nvidia.is_none() {
        into.nvidia = from.nvidia.clone();
    }
    if into.msft.is_none() {
        into.msft = from.msft.clone();
    }
    if into.dolby_vision.is_none() {
        into.dolby_vision = from.dolby_vision.clone();
    }
    if into.hdr10_plus.is_none() {
        into.hdr10_plus = from.hdr10_plus.clone();
    }
}
