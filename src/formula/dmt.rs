// SPDX-License-Identifier: MIT

// VESA Display Monitor Timing standard, version 1.0 rev 13.
// https://glenwing.github.io/docs/VESA-DMT-1.13.pdf

use crate::timing::{Polarity, Timing, TimingFlags, TimingStatus, TimingType};
use crate::{Error, Result};
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum DmtKind {
    Standard,
    ReducedBlanking,
    ReducedBlanking2,
}

/// One DMT raster. `h` and `v` hold visible, border, front porch, sync width and total.
#[derive(Debug, Clone, Serialize)]
pub struct DmtEntry {
    pub id: u8,
    pub h: [u16; 5],
    pub h_sync_polarity: Polarity,
    pub v: [u16; 5],
    pub v_sync_polarity: Polarity,
    pub interlaced: bool,
    pub rr: u16,
    pub pclk_khz: u32,
    pub kind: DmtKind,
}

const P: Polarity = Polarity::Positive;
const N: Polarity = Polarity::Negative;
const STD: DmtKind = DmtKind::Standard;
const RB: DmtKind = DmtKind::ReducedBlanking;
const RB2: DmtKind = DmtKind::ReducedBlanking2;

#[allow(clippy::too_many_arguments)]
const fn dmt(
    id: u8,
    h: [u16; 5],
    h_sync_polarity: Polarity,
    v: [u16; 5],
    v_sync_polarity: Polarity,
    interlaced: bool,
    rr: u16,
    pclk_khz: u32,
    kind: DmtKind,
) -> DmtEntry {
    DmtEntry {
        id,
        h,
        h_sync_polarity,
        v,
        v_sync_polarity,
        interlaced,
        rr,
        pclk_khz,
        kind,
    }
}

pub static DMT_TABLE: &[DmtEntry] = &[
    dmt(0x01, [640, 0, 32, 64, 832], P, [350, 0, 32, 3, 445], N, false, 85, 31500, STD),
    dmt(0x02, [640, 0, 32, 64, 832], N, [400, 0, 1, 3, 445], P, false, 85, 31500, STD),
    dmt(0x03, [720, 0, 36, 72, 936], N, [400, 0, 1, 3, 446], P, false, 85, 35500, STD),
    dmt(0x04, [640, 0, 16, 96, 800], N, [480, 0, 10, 2, 525], N, false, 60, 25175, STD),
    dmt(0x05, [640, 8, 16, 40, 832], N, [480, 8, 1, 3, 520], N, false, 72, 31500, STD),
    dmt(0x06, [640, 0, 16, 64, 840], N, [480, 0, 1, 3, 500], N, false, 75, 31500, STD),
    dmt(0x07, [640, 0, 56, 56, 832], N, [480, 0, 1, 3, 509], N, false, 85, 36000, STD),
    dmt(0x08, [800, 0, 24, 72, 1024], P, [600, 0, 1, 2, 625], P, false, 56, 36000, STD),
    dmt(0x09, [800, 0, 40, 128, 1056], P, [600, 0, 1, 4, 628], P, false, 60, 40000, STD),
    dmt(0x0A, [800, 0, 56, 120, 1040], P, [600, 0, 37, 6, 666], P, false, 72, 50000, STD),
    dmt(0x0B, [800, 0, 16, 80, 1056], P, [600, 0, 1, 3, 625], P, false, 75, 49500, STD),
    dmt(0x0C, [800, 0, 32, 64, 1048], P, [600, 0, 1, 3, 631], P, false, 85, 56250, STD),
    dmt(0x0D, [800, 0, 48, 32, 960], P, [600, 0, 3, 4, 636], N, false, 120, 73250, RB),
    dmt(0x0E, [848, 0, 16, 112, 1088], P, [480, 0, 6, 8, 517], P, false, 60, 33750, STD),
    dmt(0x0F, [1024, 0, 8, 176, 1264], P, [384, 0, 0, 4, 408], P, true, 87, 44900, STD),
    dmt(0x10, [1024, 0, 24, 136, 1344], N, [768, 0, 3, 6, 806], N, false, 60, 65000, STD),
    dmt(0x11, [1024, 0, 24, 136, 1328], N, [768, 0, 3, 6, 806], N, false, 70, 75000, STD),
    dmt(0x12, [1024, 0, 16, 96, 1312], P, [768, 0, 1, 3, 800], P, false, 75, 78750, STD),
    dmt(0x13, [1024, 0, 48, 96, 1376], P, [768, 0, 1, 3, 808], P, false, 85, 94500, STD),
    dmt(0x14, [1024, 0, 48, 32, 1184], P, [768, 0, 3, 4, 813], N, false, 120, 115500, RB),
    dmt(0x15, [1152, 0, 64, 128, 1600], P, [864, 0, 1, 3, 900], P, false, 75, 108000, STD),
    dmt(0x16, [1280, 0, 48, 32, 1440], P, [768, 0, 3, 7, 790], N, false, 60, 68250, RB),
    dmt(0x17, [1280, 0, 64, 128, 1664], N, [768, 0, 3, 7, 798], P, false, 60, 79500, STD),
    dmt(0x18, [1280, 0, 80, 128, 1696], N, [768, 0, 3, 7, 805], P, false, 75, 102250, STD),
    dmt(0x19, [1280, 0, 80, 136, 1712], N, [768, 0, 3, 7, 809], P, false, 85, 117500, STD),
    dmt(0x1A, [1280, 0, 48, 32, 1440], P, [768, 0, 3, 7, 813], N, false, 120, 140250, RB),
    dmt(0x1B, [1280, 0, 48, 32, 1440], P, [800, 0, 3, 6, 823], N, false, 60, 71000, RB),
    dmt(0x1C, [1280, 0, 72, 128, 1680], N, [800, 0, 3, 6, 831], P, false, 60, 83500, STD),
    dmt(0x1D, [1280, 0, 80, 128, 1696], N, [800, 0, 3, 6, 838], P, false, 75, 106500, STD),
    dmt(0x1E, [1280, 0, 80, 136, 1712], N, [800, 0, 3, 6, 843], P, false, 85, 122500, STD),
    dmt(0x1F, [1280, 0, 48, 32, 1440], P, [800, 0, 3, 6, 847], N, false, 120, 146250, RB),
    dmt(0x20, [1280, 0, 96, 112, 1800], P, [960, 0, 1, 3, 1000], P, false, 60, 108000, STD),
    dmt(0x21, [1280, 0, 64, 160, 1728], P, [960, 0, 1, 3, 1011], P, false, 85, 148500, STD),
    dmt(0x22, [1280, 0, 48, 32, 1440], P, [960, 0, 3, 4, 1017], N, false, 120, 175500, RB),
    dmt(0x23, [1280, 0, 48, 112, 1688], P, [1024, 0, 1, 3, 1066], P, false, 60, 108000, STD),
    dmt(0x24, [1280, 0, 16, 144, 1688], P, [1024, 0, 1, 3, 1066], P, false, 75, 135000, STD),
    dmt(0x25, [1280, 0, 64, 160, 1728], P, [1024, 0, 1, 3, 1072], P, false, 85, 157500, STD),
    dmt(0x26, [1280, 0, 48, 32, 1440], P, [1024, 0, 3, 7, 1084], N, false, 120, 187250, RB),
    dmt(0x27, [1360, 0, 64, 112, 1792], P, [768, 0, 3, 6, 795], P, false, 60, 85500, STD),
    dmt(0x28, [1360, 0, 48, 32, 1520], P, [768, 0, 3, 5, 813], N, false, 120, 148250, RB),
    dmt(0x29, [1400, 0, 48, 32, 1560], P, [1050, 0, 3, 4, 1080], N, false, 60, 101000, RB),
    dmt(0x2A, [1400, 0, 88, 144, 1864], N, [1050, 0, 3, 4, 1089], P, false, 60, 121750, STD),
    dmt(0x2B, [1400, 0, 104, 144, 1896], N, [1050, 0, 3, 4, 1099], P, false, 75, 156000, STD),
    dmt(0x2C, [1400, 0, 104, 152, 1912], N, [1050, 0, 3, 4, 1105], P, false, 85, 179500, STD),
    dmt(0x2D, [1400, 0, 48, 32, 1560], P, [1050, 0, 3, 4, 1112], N, false, 120, 208000, RB),
    dmt(0x2E, [1440, 0, 48, 32, 1600], P, [900, 0, 3, 6, 926], N, false, 60, 88750, RB),
    dmt(0x2F, [1440, 0, 80, 152, 1904], N, [900, 0, 3, 6, 934], P, false, 60, 106500, STD),
    dmt(0x30, [1440, 0, 96, 152, 1936], N, [900, 0, 3, 6, 942], P, false, 75, 136750, STD),
    dmt(0x31, [1440, 0, 104, 152, 1952], N, [900, 0, 3, 6, 948], P, false, 85, 157000, STD),
    dmt(0x32, [1440, 0, 48, 32, 1600], P, [900, 0, 3, 6, 953], N, false, 120, 182750, RB),
    dmt(0x33, [1600, 0, 64, 192, 2160], P, [1200, 0, 1, 3, 1250], P, false, 60, 162000, STD),
    dmt(0x34, [1600, 0, 64, 192, 2160], P, [1200, 0, 1, 3, 1250], P, false, 65, 175500, STD),
    dmt(0x35, [1600, 0, 64, 192, 2160], P, [1200, 0, 1, 3, 1250], P, false, 70, 189000, STD),
    dmt(0x36, [1600, 0, 64, 192, 2160], P, [1200, 0, 1, 3, 1250], P, false, 75, 202500, STD),
    dmt(0x37, [1600, 0, 64, 192, 2160], P, [1200, 0, 1, 3, 1250], P, false, 85, 229500, STD),
    dmt(0x38, [1600, 0, 48, 32, 1760], P, [1200, 0, 3, 4, 1271], N, false, 120, 268250, RB),
    dmt(0x39, [1680, 0, 48, 32, 1840], P, [1050, 0, 3, 6, 1080], N, false, 60, 119000, RB),
    dmt(0x3A, [1680, 0, 104, 176, 2240], N, [1050, 0, 3, 6, 1089], P, false, 60, 146250, STD),
    dmt(0x3B, [1680, 0, 120, 176, 2272], N, [1050, 0, 3, 6, 1099], P, false, 75, 187000, STD),
    dmt(0x3C, [1680, 0, 128, 176, 2288], N, [1050, 0, 3, 6, 1105], P, false, 85, 214750, STD),
    dmt(0x3D, [1680, 0, 48, 32, 1840], P, [1050, 0, 3, 6, 1112], N, false, 120, 245500, RB),
    dmt(0x3E, [1792, 0, 128, 200, 2448], N, [1344, 0, 1, 3, 1394], P, false, 60, 204750, STD),
    dmt(0x3F, [1792, 0, 96, 216, 2456], N, [1344, 0, 1, 3, 1417], P, false, 75, 261000, STD),
    dmt(0x40, [1792, 0, 48, 32, 1952], P, [1344, 0, 3, 4, 1423], N, false, 120, 333250, RB),
    dmt(0x41, [1856, 0, 96, 224, 2528], N, [1392, 0, 1, 3, 1439], P, false, 60, 218250, STD),
    dmt(0x42, [1856, 0, 128, 224, 2560], N, [1392, 0, 1, 3, 1500], P, false, 75, 288000, STD),
    dmt(0x43, [1856, 0, 48, 32, 2016], P, [1392, 0, 3, 4, 1474], N, false, 120, 356500, RB),
    dmt(0x44, [1920, 0, 48, 32, 2080], P, [1200, 0, 3, 6, 1235], N, false, 60, 154000, RB),
    dmt(0x45, [1920, 0, 136, 200, 2592], N, [1200, 0, 3, 6, 1245], P, false, 60, 193250, STD),
    dmt(0x46, [1920, 0, 136, 208, 2608], N, [1200, 0, 3, 6, 1255], P, false, 75, 245250, STD),
    dmt(0x47, [1920, 0, 144, 208, 2624], N, [1200, 0, 3, 6, 1262], P, false, 85, 281250, STD),
    dmt(0x48, [1920, 0, 48, 32, 2080], P, [1200, 0, 3, 6, 1271], N, false, 120, 317000, RB),
    dmt(0x49, [1920, 0, 128, 208, 2600], N, [1440, 0, 1, 3, 1500], P, false, 60, 234000, STD),
    dmt(0x4A, [1920, 0, 144, 224, 2640], N, [1440, 0, 1, 3, 1500], P, false, 75, 297000, STD),
    dmt(0x4B, [1920, 0, 48, 32, 2080], P, [1440, 0, 3, 4, 1525], N, false, 120, 380500, RB),
    dmt(0x4C, [2560, 0, 48, 32, 2720], P, [1600, 0, 3, 6, 1646], N, false, 60, 268500, RB),
    dmt(0x4D, [2560, 0, 192, 280, 3504], N, [1600, 0, 3, 6, 1658], P, false, 60, 348500, STD),
    dmt(0x4E, [2560, 0, 208, 280, 3536], N, [1600, 0, 3, 6, 1672], P, false, 75, 443250, STD),
    dmt(0x4F, [2560, 0, 208, 280, 3536], N, [1600, 0, 3, 6, 1682], P, false, 85, 505250, STD),
    dmt(0x50, [2560, 0, 48, 32, 2720], P, [1600, 0, 3, 6, 1694], N, false, 120, 552750, RB),
    dmt(0x51, [1366, 0, 70, 143, 1792], P, [768, 0, 3, 3, 798], P, false, 60, 85500, STD),
    dmt(0x52, [1920, 0, 88, 44, 2200], P, [1080, 0, 4, 5, 1125], P, false, 60, 148500, STD),
    dmt(0x53, [1600, 0, 24, 80, 1800], P, [900, 0, 1, 3, 1000], P, false, 60, 108000, RB),
    dmt(0x54, [2048, 0, 26, 80, 2250], P, [1152, 0, 1, 3, 1200], P, false, 60, 162000, RB),
    dmt(0x55, [1280, 0, 110, 40, 1650], P, [720, 0, 5, 5, 750], P, false, 60, 74250, STD),
    dmt(0x56, [1366, 0, 14, 56, 1500], P, [768, 0, 1, 3, 800], P, false, 60, 72000, RB),
    dmt(0x57, [4096, 0, 8, 32, 4176], P, [2160, 0, 48, 8, 2222], N, false, 60, 556744, RB2),
    dmt(0x58, [4096, 0, 8, 32, 4176], P, [2160, 0, 48, 8, 2222], N, false, 60, 556188, RB2),
];

impl DmtEntry {
    pub fn to_timing(&self) -> Timing {
        let (timing_type, prefix) = match self.kind {
            DmtKind::Standard => (TimingType::Dmt, "DMT"),
            DmtKind::ReducedBlanking => (TimingType::DmtRb, "DMT-RB"),
            DmtKind::ReducedBlanking2 => (TimingType::DmtRb2, "DMT-RB2"),
        };
        let mut timing = Timing {
            h_visible: self.h[0],
            h_border: self.h[1],
            h_front_porch: self.h[2],
            h_sync_width: self.h[3],
            h_total: self.h[4],
            h_sync_polarity: self.h_sync_polarity,
            v_visible: self.v[0],
            v_border: self.v[1],
            v_front_porch: self.v[2],
            v_sync_width: self.v[3],
            v_total: self.v[4],
            v_sync_polarity: self.v_sync_polarity,
            interlaced: self.interlaced,
            pclk: (self.pclk_khz + 5) / 10,
            pclk_1khz: self.pclk_khz,
            refresh_rate: self.rr,
            pixel_repetition: 1,
            status: TimingStatus::of(timing_type, 0),
            ..Timing::default()
        };
        if self.kind != DmtKind::Standard {
            timing.flags |= TimingFlags::ReducedBlanking;
        }
        let lines = if self.interlaced {
            self.v[4] as u64 * 2 + 1
        } else {
            self.v[4] as u64 * 2
        };
        timing.refresh_rate_x1k =
            (self.pclk_khz as u64 * 1_000_000 * 2 / (self.h[4] as u64 * lines)) as u32;
        timing.set_name(format!(
            "{}:#{:02X}:{}x{}x{}Hz{}",
            prefix,
            self.id,
            timing.h_visible,
            timing.frame_height(),
            self.rr,
            if self.interlaced { "/i" } else { "" }
        ));
        timing
    }

    fn matches(&self, width: u32, height: u32, rr: u32, interlaced: bool) -> bool {
        self.h[0] as u32 == width
            && self.v[0] as u32 * if self.interlaced { 2 } else { 1 } == height
            && self.rr as u32 == rr
            && self.interlaced == interlaced
    }
}

/// DMT timing by its DMT ID.
pub fn enum_dmt(id: u8) -> Result<Timing> {
    DMT_TABLE
        .iter()
        .find(|entry| entry.id == id)
        .map(DmtEntry::to_timing)
        .ok_or_else(|| Error::OutOfRange(format!("Unknown DMT ID 0x{:02X}", id)))
}

fn find(width: u32, height: u32, rr: u32, interlaced: bool, reduced: bool) -> Option<&'static DmtEntry> {
    DMT_TABLE.iter().find(|entry| {
        (entry.kind != DmtKind::Standard) == reduced && entry.matches(width, height, rr, interlaced)
    })
}

/// DMT timing with standard blanking for a raster and integer refresh rate.
pub fn calc_dmt(width: u32, height: u32, rr: u32, interlaced: bool) -> Result<Timing> {
    find(width, height, rr, interlaced, false)
        .map(DmtEntry::to_timing)
        .ok_or_else(|| {
            Error::InvalidTiming(format!("No DMT timing for {}x{}@{}", width, height, rr))
        })
}

/// DMT timing with reduced blanking for a raster and integer refresh rate.
pub fn calc_dmt_rb(width: u32, height: u32, rr: u32) -> Result<Timing> {
    find(width, height, rr, false, true)
        .map(DmtEntry::to_timing)
        .ok_or_else(|| {
            Error::InvalidTiming(format!("No DMT-RB timing for {}x{}@{}", width, height, rr))
        })
}
