// SPDX-License-Identifier: MIT

use crate::{Error, Result};
use bitflags::bitflags;
use log::{debug, trace};
use serde::Serialize;

pub const DOLBY_VISION_IEEE_ID: u32 = 0x00D046;
pub const HDR10_PLUS_IEEE_ID: u32 = 0x90848B;

const DV_TYPE0_SIZE: usize = 21;
const DV_TYPE1_SIZE: usize = 10;
const DV_TYPE1_1_SIZE: usize = 7;
const DV_TYPE2_SIZE: usize = 7;

const DV_MSB_GREEN_X: u16 = 0x00;
const DV_MSB_GREEN_Y: u16 = 0x80;
const DV_MSB_BLUE_X: u16 = 0x20;
const DV_MSB_BLUE_Y: u16 = 0x08;
const DV_MSB_RED_X: u16 = 0xA0;
const DV_MSB_RED_Y: u16 = 0x40;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Eotf(u8);
bitflags! {
    impl Eotf: u8 {
        const TraditionalSdr = 0b00000001;
        const TraditionalHdr = 0b00000010;
        const SmpteSt2084 = 0b00000100;
        const Future = 0b00001000;
    }
}

/// HDR static metadata data block. Luminance values are the coded CTA bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HdrStaticMetadata {
    pub eotf: Eotf,
    pub static_metadata_type1: bool,
    pub max_cll: u8,
    pub max_fall: u8,
    pub min_cll: u8,
}

impl HdrStaticMetadata {
    /// Decodes the payload that follows the extended tag byte.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() < 2 {
            return Err(Error::InvalidDataBlock(format!(
                "HDR static metadata block is {} bytes long",
                payload.len()
            )));
        }
        let byte = |index: usize| payload.get(index).copied().unwrap_or(0);
        Ok(Self {
            eotf: Eotf::from_bits_truncate(payload[0] & 0x3F),
            static_metadata_type1: payload[1] & 0x01 != 0,
            max_cll: byte(2),
            max_fall: byte(3),
            min_cll: byte(4),
        })
    }
}

/// Dolby Vision capabilities normalised across the vendor block versions. Chromaticity and
/// luminance keep the width their version encodes them with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DolbyVision {
    pub version: u8,
    pub dm_version: u8,
    pub supports_2160p60hz: bool,
    pub supports_yuv422_12bit: bool,
    pub supports_global_dimming: bool,
    pub supports_backlight_control: bool,
    pub colorimetry: bool,
    pub target_min_luminance: u16,
    pub target_max_luminance: u16,
    pub red: (u16, u16),
    pub green: (u16, u16),
    pub blue: (u16, u16),
    pub white: (u16, u16),
    pub interface_supported_by_sink: u8,
    pub parity: u8,
    pub supports_10b_12b_444: u8,
}

impl DolbyVision {
    /// Decodes the vendor data that follows the OUI of a Dolby Vision video block.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let version = data.first().map(|byte| byte >> 5).ok_or_else(|| {
            Error::InvalidDataBlock("Dolby Vision block carries no data".to_string())
        })?;
        trace!("Dolby Vision block version {} with {} bytes", version, data.len());
        let vision = match (version, data.len()) {
            (0, len) if len >= DV_TYPE0_SIZE => Self::type0(data),
            (1, DV_TYPE1_SIZE) => Self::type1(data),
            (1, DV_TYPE1_1_SIZE) => Self::type1_1(data),
            (2, len) if len >= DV_TYPE2_SIZE => Self::type2(data),
            (version, len) => {
                return Err(Error::InvalidDataBlock(format!(
                    "Dolby Vision block version {} cannot be {} bytes long",
                    version, len
                )))
            }
        };
        debug!("Dolby Vision: {:?}", vision);
        Ok(vision)
    }

    fn type0(data: &[u8]) -> Self {
        // 12-bit values: high byte in its own field, low nibbles packed two per byte
        let pair = |offset: usize| {
            (
                (data[offset + 1] as u16) << 4 | (data[offset] >> 4) as u16,
                (data[offset + 2] as u16) << 4 | (data[offset] & 0x0F) as u16,
            )
        };
        let luminance = pair(13);
        Self {
            version: 0,
            supports_yuv422_12bit: data[0] & 0x01 != 0,
            supports_2160p60hz: data[0] & 0x02 != 0,
            supports_global_dimming: data[0] & 0x04 != 0,
            red: pair(1),
            green: pair(4),
            blue: pair(7),
            white: pair(10),
            target_min_luminance: luminance.0,
            target_max_luminance: luminance.1,
            dm_version: data[16],
            ..Self::default()
        }
    }

    fn type1_common(data: &[u8]) -> Self {
        Self {
            version: 1,
            supports_yuv422_12bit: data[0] & 0x01 != 0,
            supports_2160p60hz: data[0] & 0x02 != 0,
            dm_version: (data[0] >> 2) & 0x07,
            supports_global_dimming: data[1] & 0x01 != 0,
            target_max_luminance: (data[1] >> 1) as u16,
            colorimetry: data[2] & 0x01 != 0,
            target_min_luminance: (data[2] >> 1) as u16,
            ..Self::default()
        }
    }

    fn type1(data: &[u8]) -> Self {
        Self {
            red: (data[4] as u16, data[5] as u16),
            green: (data[6] as u16, data[7] as u16),
            blue: (data[8] as u16, data[9] as u16),
            ..Self::type1_common(data)
        }
    }

    fn type1_1(data: &[u8]) -> Self {
        let red_y = (data[4] & 0x01) | (data[5] & 0x01) << 1 | (data[6] >> 5) << 2;
        Self {
            interface_supported_by_sink: data[3] & 0x03,
            blue: (
                DV_MSB_BLUE_X | (data[3] >> 5) as u16,
                DV_MSB_BLUE_Y | ((data[3] >> 2) & 0x07) as u16,
            ),
            green: (
                DV_MSB_GREEN_X | (data[4] >> 1) as u16,
                DV_MSB_GREEN_Y | (data[5] >> 1) as u16,
            ),
            red: (
                DV_MSB_RED_X | (data[6] & 0x1F) as u16,
                DV_MSB_RED_Y | red_y as u16,
            ),
            ..Self::type1_common(data)
        }
    }

    fn type2(data: &[u8]) -> Self {
        Self {
            version: 2,
            supports_yuv422_12bit: data[0] & 0x01 != 0,
            supports_backlight_control: data[0] & 0x02 != 0,
            dm_version: (data[0] >> 2) & 0x07,
            supports_global_dimming: data[1] & 0x04 != 0,
            target_min_luminance: (data[1] >> 3) as u16,
            interface_supported_by_sink: data[2] & 0x03,
            parity: (data[2] >> 2) & 0x01,
            target_max_luminance: (data[2] >> 3) as u16,
            supports_10b_12b_444: (data[4] & 0x01) | (data[3] & 0x01) << 1,
            green: (
                DV_MSB_GREEN_X | (data[3] >> 1) as u16,
                DV_MSB_GREEN_Y | (data[4] >> 1) as u16,
            ),
            blue: (
                DV_MSB_BLUE_X | (data[5] & 0x07) as u16,
                DV_MSB_BLUE_Y | (data[6] & 0x07) as u16,
            ),
            red: (
                DV_MSB_RED_X | (data[5] >> 3) as u16,
                DV_MSB_RED_Y | (data[6] >> 3) as u16,
            ),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Hdr10Plus {
    pub application_version: u8,
    pub full_frame_peak_luminance_index: u8,
    pub peak_luminance_index: u8,
}

impl Hdr10Plus {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let byte = data
            .first()
            .ok_or_else(|| Error::InvalidDataBlock("HDR10+ block carries no data".to_string()))?;
        Ok(Self {
            application_version: byte & 0x03,
            full_frame_peak_luminance_index: (byte >> 2) & 0x03,
            peak_luminance_index: byte >> 4,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::cta861::hdr::*;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    #[test]
    fn test_hdr_static_metadata() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let hdr = HdrStaticMetadata::from_payload(&[0xC5, 0x01, 0x78, 0x50, 0x10]).unwrap();
        assert_eq!(Eotf::TraditionalSdr | Eotf::SmpteSt2084, hdr.eotf);
        assert!(hdr.static_metadata_type1);
        assert_eq!((0x78, 0x50, 0x10), (hdr.max_cll, hdr.max_fall, hdr.min_cll));

        let short = HdrStaticMetadata::from_payload(&[0x04, 0x00]).unwrap();
        assert!(!short.static_metadata_type1);
        assert_eq!(0, short.max_cll);
        assert!(HdrStaticMetadata::from_payload(&[0x04]).is_err());
    }

    #[test]
    fn test_dolby_vision_type1_1() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        // version 1, dm 2, 2160p60, global dimming, max 0x40, min 0x10
        let data = [0x2A, 0x81, 0x20, 0b101_011_01, 0b0101010_1, 0b0010101_0, 0b011_10001];
        let vision = DolbyVision::parse(&data).unwrap();
        assert_eq!(1, vision.version);
        assert_eq!(2, vision.dm_version);
        assert!(vision.supports_2160p60hz);
        assert!(!vision.supports_yuv422_12bit);
        assert!(vision.supports_global_dimming);
        assert_eq!(0x40, vision.target_max_luminance);
        assert_eq!(0x10, vision.target_min_luminance);
        assert_eq!(1, vision.interface_supported_by_sink);
        assert_eq!((0x20 | 0b101, 0x08 | 0b011), vision.blue);
        assert_eq!((0x2A, 0x80 | 0x15), vision.green);
        assert_eq!((0xA0 | 0x11, 0x40 | 0b01101), vision.red);
    }

    #[test]
    fn test_dolby_vision_type0() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let mut data = [0u8; 21];
        data[0] = 0x03;
        data[1] = 0xA5;
        data[2] = 0xB4;
        data[3] = 0x4F;
        data[16] = 0x21;
        let vision = DolbyVision::parse(&data).unwrap();
        assert_eq!(0, vision.version);
        assert_eq!((0xB4A, 0x4F5), vision.red);
        assert_eq!(0x21, vision.dm_version);
        assert!(DolbyVision::parse(&data[..20]).is_err());
    }

    #[test]
    fn test_dolby_vision_rejects_unknown_layout() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        assert!(DolbyVision::parse(&[0x20; 8]).is_err());
        assert!(DolbyVision::parse(&[0x60; 10]).is_err());
        assert!(DolbyVision::parse(&[]).is_err());
    }

    #[test]
    fn test_hdr10_plus() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let info = Hdr10Plus::parse(&[0x97]).unwrap();
        assert_eq!(3, info.application_version);
        assert_eq!(1, info.full_frame_peak_luminance_index);
        assert_eq!(9, info.peak_luminance_index);
    }
}
