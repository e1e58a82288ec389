// SPDX-License-Identifier: MIT

use crate::cta861::hdr::{HdrStaticMetadata, DOLBY_VISION_IEEE_ID, HDR10_PLUS_IEEE_ID};
use crate::cta861::vsdb::{VendorBlock, VSDB_MAX_DATA_SIZE};
use crate::cta861::CeaInfo;
use crate::{Error, Result};
use log::{debug, trace, warn};
use modular_bitfield::prelude::*;
use serde::Serialize;
use strum::FromRepr;

pub const MAX_PAYLOAD: usize = 122;
pub const MAX_SVD: usize = 119;
pub const MAX_SAD: usize = 38;
pub const MAX_SPEAKER: usize = 38;
pub const MAX_VSDB: usize = 4;
pub const MAX_VSVDB: usize = 2;
pub const VSVDB_MAX_DATA_SIZE: usize = 25;
pub const MAX_VFPDB_SVR: usize = 16;
pub const MAX_Y420_SVD: usize = 60;
pub const MAX_DID_TIMING_BLOCKS: usize = 4;
pub const HF_SCDB_MAX_SIZE: usize = 28;

const SAD_SIZE: usize = 3;
const SPEAKER_SIZE: usize = 3;
const DID_TYPE7_DESCRIPTOR_SIZE: usize = 20;
const DID_TYPE10_DESCRIPTOR_SIZE: usize = 6;

/// First byte of every data block: payload length in the low 5 bits, tag in the top 3.
#[bitfield(bits = 8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DataBlockHeader {
    pub length: B5,
    pub tag: B3,
}

impl DataBlockHeader {
    pub fn of(byte: u8) -> Self {
        Self::from_bytes([byte])
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, FromRepr, strum::Display)]
#[repr(u8)]
pub enum DataBlockTag {
    Reserved = 0,
    Audio = 1,
    Video = 2,
    Vendor = 3,
    Speaker = 4,
    VesaDisplayTransfer = 5,
    Reserved6 = 6,
    Extended = 7,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, FromRepr, strum::Display)]
#[repr(u8)]
pub enum ExtendedTag {
    VideoCapability = 0,
    VendorSpecificVideo = 1,
    VesaDisplayDevice = 2,
    VesaVideoTiming = 3,
    Colorimetry = 5,
    HdrStaticMetadata = 6,
    HdrDynamicMetadata = 7,
    NativeVideoResolution = 8,
    VideoFormatPreference = 13,
    Y420Video = 14,
    Y420CapabilityMap = 15,
    VendorSpecificAudio = 17,
    RoomConfiguration = 19,
    SpeakerLocation = 20,
    InfoFrame = 32,
    DisplayIdType7 = 34,
    DisplayIdType8 = 35,
    DisplayIdType10 = 42,
    HfEeodb = 0x78,
    HfScdb = 0x79,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShortAudioDescriptor {
    pub format: u8,
    pub max_channels: u8,
    pub sample_rates: u8,
    pub detail: u8,
}

impl ShortAudioDescriptor {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            format: (bytes[0] >> 3) & 0x0F,
            max_channels: (bytes[0] & 0x07) + 1,
            sample_rates: bytes[1] & 0x7F,
            detail: bytes[2],
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VideoCapability {
    pub quantization_ycc: bool,
    pub quantization_rgb: bool,
    pub preferred_scan: u8,
    pub it_scan: u8,
    pub ce_scan: u8,
}

impl VideoCapability {
    pub fn from_byte(byte: u8) -> Self {
        Self {
            quantization_ycc: byte & 0x80 != 0,
            quantization_rgb: byte & 0x40 != 0,
            preferred_scan: (byte >> 4) & 0x03,
            it_scan: (byte >> 2) & 0x03,
            ce_scan: byte & 0x03,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColorimetryFormats(u8);
bitflags::bitflags! {
    impl ColorimetryFormats: u8 {
        const XvYcc601 = 0b00000001;
        const XvYcc709 = 0b00000010;
        const SYcc601 = 0b00000100;
        const OpYcc601 = 0b00001000;
        const OpRgb = 0b00010000;
        const Bt2020Cycc = 0b00100000;
        const Bt2020Ycc = 0b01000000;
        const Bt2020Rgb = 0b10000000;
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Colorimetry {
    pub formats: ColorimetryFormats,
    /// Gamut metadata profiles in bits 0 to 3, DCI-P3 in bit 7.
    pub metadata: u8,
}

/// Native video resolution block: the SVR of the native format and an optional image size.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NativeVideoResolution {
    pub native_svr: u8,
    pub size_precision: bool,
    pub image_size: Option<(u16, u16)>,
}

/// DisplayID timing block embedded in a CTA-861 extension, kept raw until the table pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DidTimingBlock {
    pub header: u8,
    pub total: u8,
    pub descriptors: Vec<u8>,
}

impl DidTimingBlock {
    pub fn revision(&self) -> u8 {
        self.header & 0x07
    }

    /// Type VII descriptors carry DSC pass-through, type VIII blocks use 2-byte codes.
    pub fn bit3(&self) -> bool {
        self.header & 0x08 != 0
    }

    pub fn y420(&self) -> bool {
        self.header & 0x20 != 0
    }

    pub fn code_type(&self) -> u8 {
        self.header >> 6
    }

    /// Bytes each descriptor carries beyond the base size.
    pub fn extra_bytes(&self) -> usize {
        ((self.header >> 4) & 0x07) as usize
    }
}

fn too_short(what: &str, length: usize) -> Error {
    Error::InvalidDataBlock(format!("{} block with {} payload bytes", what, length))
}

/// Walks the data block collection `data` and stores every recognised block into `info`.
/// A block with a malformed payload is skipped, the walk stops at the first block running
/// past the end of the collection.
pub fn collect_data_blocks(data: &[u8], info: &mut CeaInfo) {
    let data = &data[..data.len().min(MAX_PAYLOAD)];
    let mut offset = 0;
    while offset < data.len() {
        let header = DataBlockHeader::of(data[offset]);
        let length = header.length() as usize;
        if offset + 1 + length > data.len() {
            warn!(
                "Data block at {} with {} bytes runs past the collection",
                offset, length
            );
            break;
        }
        let payload = &data[offset + 1..offset + 1 + length];
        if let Err(e) = collect_data_block(header.tag(), payload, info) {
            warn!("Skipping data block at {}: {}", offset, e);
        }
        offset += 1 + length;
    }
}

/// Checks the header and payload size of the first block of a collection.
pub fn validate_first_block(data: &[u8]) -> Result<()> {
    let Some(&first) = data.first() else {
        return Ok(());
    };
    let header = DataBlockHeader::of(first);
    let length = header.length() as usize;
    if 1 + length > data.len().min(MAX_PAYLOAD) {
        return Err(Error::InvalidDataBlock(format!(
            "First data block with {} bytes runs past the collection",
            length
        )));
    }
    collect_data_block(header.tag(), &data[1..1 + length], &mut CeaInfo::default())
}

fn collect_data_block(tag: u8, payload: &[u8], info: &mut CeaInfo) -> Result<()> {
    let tag = DataBlockTag::from_repr(tag).unwrap_or(DataBlockTag::Reserved);
    trace!("Data block {} with {} bytes", tag, payload.len());
    match tag {
        DataBlockTag::Video => {
            let room = MAX_SVD.saturating_sub(info.svds.len());
            info.svds.extend(payload.iter().take(room));
        }
        DataBlockTag::Audio => {
            let room = MAX_SAD.saturating_sub(info.sads.len());
            info.sads.extend(
                payload
                    .chunks_exact(SAD_SIZE)
                    .take(room)
                    .map(ShortAudioDescriptor::from_bytes),
            );
        }
        DataBlockTag::Speaker => {
            let room = MAX_SPEAKER.saturating_sub(info.speakers.len());
            info.speakers.extend(
                payload
                    .chunks_exact(SPEAKER_SIZE)
                    .take(room)
                    .map(|chunk| [chunk[0], chunk[1], chunk[2]]),
            );
        }
        DataBlockTag::Vendor => {
            let vsdb = VendorBlock::from_payload(payload, VSDB_MAX_DATA_SIZE)?;
            if info.vsdbs.len() < MAX_VSDB {
                info.vsdbs.push(vsdb);
            } else {
                debug!("Dropping vendor block 0x{:06X}, table is full", vsdb.ieee_id);
            }
        }
        DataBlockTag::Extended => {
            let (&extended, body) = payload
                .split_first()
                .ok_or_else(|| too_short("Extended", 0))?;
            collect_extended_block(extended, body, info)?;
        }
        _ => debug!("Ignoring data block {}", tag),
    }
    Ok(())
}

fn collect_extended_block(extended: u8, body: &[u8], info: &mut CeaInfo) -> Result<()> {
    let Some(tag) = ExtendedTag::from_repr(extended) else {
        debug!("Ignoring extended data block {}", extended);
        return Ok(());
    };
    // the size checks count the extended tag byte
    let payload_length = body.len() + 1;
    match tag {
        ExtendedTag::VideoCapability => {
            let byte = body.first().ok_or_else(|| too_short("Video capability", payload_length))?;
            info.video_capability = Some(VideoCapability::from_byte(*byte));
        }
        ExtendedTag::Colorimetry => {
            if body.len() < 2 {
                return Err(too_short("Colorimetry", payload_length));
            }
            info.colorimetry = Some(Colorimetry {
                formats: ColorimetryFormats::from_bits_truncate(body[0]),
                metadata: body[1] & 0x8F,
            });
        }
        ExtendedTag::VideoFormatPreference => {
            if body.is_empty() {
                return Err(too_short("Video format preference", payload_length));
            }
            info.preferred_svrs = body.iter().take(MAX_VFPDB_SVR).copied().collect();
        }
        ExtendedTag::Y420Video => {
            if body.is_empty() {
                return Err(too_short("YCbCr 4:2:0 video", payload_length));
            }
            let room = MAX_Y420_SVD.saturating_sub(info.y420_svds.len());
            info.y420_svds.extend(body.iter().take(room));
        }
        ExtendedTag::Y420CapabilityMap => {
            // an empty map covers every SVD
            info.y420_cmdb = Some(body.iter().take(MAX_Y420_SVD).copied().collect());
        }
        ExtendedTag::HdrStaticMetadata => {
            info.hdr_static = Some(HdrStaticMetadata::from_payload(body)?);
        }
        ExtendedTag::VendorSpecificVideo => {
            if body.len() < 3 {
                return Err(too_short("Vendor specific video", payload_length));
            }
            let vsvdb = VendorBlock::from_payload(body, VSVDB_MAX_DATA_SIZE)?;
            match vsvdb.ieee_id {
                DOLBY_VISION_IEEE_ID | HDR10_PLUS_IEEE_ID if info.vsvdbs.len() < MAX_VSVDB => {
                    info.vsvdbs.push(vsvdb)
                }
                id => debug!("Ignoring vendor specific video block 0x{:06X}", id),
            }
        }
        ExtendedTag::NativeVideoResolution => {
            if !matches!(payload_length, 2 | 3 | 7) {
                return Err(too_short("Native video resolution", payload_length));
            }
            let options = body.get(1).copied().unwrap_or(0);
            info.native_video = Some(NativeVideoResolution {
                native_svr: body[0],
                size_precision: options & 0x80 != 0,
                image_size: match body {
                    [_, _, h0, h1, v0, v1] if options & 0x01 != 0 => {
                        Some((u16::from_le_bytes([*h0, *h1]), u16::from_le_bytes([*v0, *v1])))
                    }
                    _ => None,
                },
            });
        }
        ExtendedTag::DisplayIdType7 => {
            let block = did_timing_block(body, DID_TYPE7_DESCRIPTOR_SIZE, "DisplayID type VII")?;
            push_did_block(&mut info.did_type7, block);
        }
        ExtendedTag::DisplayIdType8 => {
            if body.len() < 2 {
                return Err(too_short("DisplayID type VIII", payload_length));
            }
            let mut block = DidTimingBlock {
                header: body[0],
                descriptors: body[2..].to_vec(),
                ..DidTimingBlock::default()
            };
            let code_size = if block.bit3() { 2 } else { 1 };
            block.total = (block.descriptors.len() / code_size) as u8;
            push_did_block(&mut info.did_type8, block);
        }
        ExtendedTag::DisplayIdType10 => {
            let block = did_timing_block(body, DID_TYPE10_DESCRIPTOR_SIZE, "DisplayID type X")?;
            push_did_block(&mut info.did_type10, block);
        }
        ExtendedTag::HfScdb => {
            if body.len() < 6 {
                return Err(too_short("HDMI Forum sink capability", payload_length));
            }
            let scdb = &body[2..];
            info.hf_scdb = Some(scdb[..scdb.len().min(HF_SCDB_MAX_SIZE)].to_vec());
        }
        ExtendedTag::HfEeodb => {
            if body.len() != 1 {
                return Err(too_short("HDMI Forum extension override", payload_length));
            }
            info.hf_eeodb = Some(body[0]);
        }
        _ => debug!("Ignoring extended data block {}", tag),
    }
    Ok(())
}

/// Splits a type VII or X block into its revision header and whole descriptors.
fn did_timing_block(body: &[u8], base_size: usize, what: &str) -> Result<DidTimingBlock> {
    if body.len() < 2 + base_size {
        return Err(too_short(what, body.len() + 1));
    }
    let mut block = DidTimingBlock {
        header: body[0],
        descriptors: body[2..].to_vec(),
        ..DidTimingBlock::default()
    };
    let descriptor_size = base_size + block.extra_bytes();
    if block.descriptors.len() % descriptor_size != 0 {
        return Err(Error::InvalidDataBlock(format!(
            "{} block with {} bytes does not hold whole {}-byte descriptors",
            what,
            block.descriptors.len(),
            descriptor_size
        )));
    }
    block.total = (block.descriptors.len() / descriptor_size) as u8;
    Ok(block)
}

fn push_did_block(blocks: &mut Vec<DidTimingBlock>, block: DidTimingBlock) {
    if blocks.len() < MAX_DID_TIMING_BLOCKS {
        blocks.push(block);
    } else {
        debug!("Dropping DisplayID timing block, table is full");
    }
}

#[cfg(test)]
mod tests {
    use crate::cta861::block::*;
    use crate::cta861::vsdb::HDMI_LLC_IEEE_ID;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    fn collect(data: &[u8]) -> CeaInfo {
        let mut info = CeaInfo::default();
        collect_data_blocks(data, &mut info);
        info
    }

    #[test]
    fn test_header_split() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let header = DataBlockHeader::of(0x47);
        assert_eq!(2, header.tag());
        assert_eq!(7, header.length());
        assert_eq!(Some(DataBlockTag::Extended), DataBlockTag::from_repr(DataBlockHeader::of(0xE3).tag()));
    }

    #[test]
    fn test_collect_short_descriptors() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let info = collect(&[
            0x43, 0x90, 0x04, 0x03, // video: 16 native, 4, 3
            0x23, 0x09, 0x07, 0x07, // audio: LPCM 2ch
            0x83, 0x01, 0x00, 0x00, // speakers
            0x65, 0x03, 0x0C, 0x00, 0x10, 0x00, // HDMI LLC
        ]);
        assert_eq!(vec![0x90, 0x04, 0x03], info.svds);
        assert_eq!(1, info.sads.len());
        assert_eq!(1, info.sads[0].format);
        assert_eq!(2, info.sads[0].max_channels);
        assert_eq!(vec![[0x01, 0x00, 0x00]], info.speakers);
        assert_eq!(HDMI_LLC_IEEE_ID, info.vsdbs[0].ieee_id);
        assert_eq!(vec![0x10, 0x00], info.vsdbs[0].data);
    }

    #[test]
    fn test_collect_extended_blocks() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let info = collect(&[
            0xE2, 0x00, 0xC0, // video capability
            0xE3, 0x05, 0xC1, 0xFF, // colorimetry
            0xE3, 0x0D, 0x81, 0x10, // video format preference
            0xE3, 0x0E, 0x61, 0x62, // 4:2:0 video
            0xE1, 0x0F, // 4:2:0 capability map, all SVDs
            0xE3, 0x06, 0x05, 0x01, // HDR static metadata
            0xE3, 0x08, 0x90, 0x00, // native video resolution
            0xE2, 0x78, 0x03, // extension override
        ]);
        assert!(info.video_capability.unwrap().quantization_ycc);
        let colorimetry = info.colorimetry.unwrap();
        assert!(colorimetry.formats.contains(ColorimetryFormats::Bt2020Rgb));
        assert_eq!(0x8F, colorimetry.metadata);
        assert_eq!(vec![0x81, 0x10], info.preferred_svrs);
        assert_eq!(vec![0x61, 0x62], info.y420_svds);
        assert_eq!(Some(vec![]), info.y420_cmdb);
        assert!(info.hdr_static.is_some());
        assert_eq!(0x90, info.native_video.unwrap().native_svr);
        assert_eq!(None, info.native_video.unwrap().image_size);
        assert_eq!(Some(3), info.hf_eeodb);
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let info = collect(&[
            0xE2, 0x05, 0xC1, // colorimetry, one byte short
            0xE2, 0x78, 0x03, // extension override
        ]);
        assert!(info.colorimetry.is_none());
        assert_eq!(Some(3), info.hf_eeodb);

        // the second block claims more bytes than the collection holds
        let info = collect(&[0x41, 0x10, 0x45, 0x04]);
        assert_eq!(vec![0x10], info.svds);

        assert!(validate_first_block(&[0xE2, 0x05, 0xC1]).is_err());
        assert!(validate_first_block(&[0x45, 0x10]).is_err());
        assert!(validate_first_block(&[0x41, 0x10, 0xE2, 0x05]).is_ok());
    }

    #[test]
    fn test_did_type7_block() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut data = vec![0xF7, 0x22, 0x0A, 0x00];
        data.extend_from_slice(&[0u8; 20]);
        let info = collect(&data);
        assert_eq!(1, info.did_type7.len());
        let block = &info.did_type7[0];
        assert_eq!(2, block.revision());
        assert!(block.bit3());
        assert_eq!(1, block.total);

        let mut data = vec![0xF6, 0x22, 0x02, 0x00];
        data.extend_from_slice(&[0u8; 19]);
        assert!(collect(&data).did_type7.is_empty());
    }

    #[test]
    fn test_vsvdb_filters_vendors() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let info = collect(&[
            0xE5, 0x01, 0x8B, 0x84, 0x90, 0x01, // HDR10+
            0xE5, 0x01, 0x03, 0x0C, 0x00, 0x01, // unknown vendor
        ]);
        assert_eq!(1, info.vsvdbs.len());
        assert_eq!(HDR10_PLUS_IEEE_ID, info.vsvdbs[0].ieee_id);
        assert_eq!(vec![0x01], info.vsvdbs[0].data);
    }
}
