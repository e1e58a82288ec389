// SPDX-License-Identifier: MIT

// CTA-861-G video identification codes, forbidden codes 128 to 192 left out.
// https://glenwing.github.io/docs/CTA-861-G.pdf

use crate::timing::{rrx1k_to_pclk, AspectRatio, Polarity, Timing, TimingStatus, TimingType};
use crate::{Error, Result};
use log::trace;
use serde::Serialize;

/// Short video descriptors at or below this value carry a native flag in bit 7.
pub const VIC_7BIT_8BIT_SEPARATE_VALUE: u8 = 192;
pub const MAX_VIC: u8 = 219;

/// One VIC raster. `h` and `v` hold visible, front porch, sync width and total; interlaced
/// formats hold field lines.
#[derive(Debug, Clone, Serialize)]
pub struct VicFormat {
    pub vic: u8,
    pub h: [u16; 4],
    pub h_sync_polarity: Polarity,
    pub v: [u16; 4],
    pub v_sync_polarity: Polarity,
    pub rrx1k: u32,
    pub interlaced: bool,
    pub aspect: AspectRatio,
    pub pixel_repetition: u16,
}

const P: Polarity = Polarity::Positive;
const N: Polarity = Polarity::Negative;
const PR: bool = false;
const I: bool = true;

#[allow(clippy::too_many_arguments)]
const fn vic(
    vic: u8,
    h: [u16; 4],
    h_sync_polarity: Polarity,
    v: [u16; 4],
    v_sync_polarity: Polarity,
    rrx1k: u32,
    interlaced: bool,
    aspect: (u16, u16),
    pixel_repetition: u16,
) -> VicFormat {
    VicFormat {
        vic,
        h,
        h_sync_polarity,
        v,
        v_sync_polarity,
        rrx1k,
        interlaced,
        aspect: AspectRatio::new(aspect.0, aspect.1),
        pixel_repetition,
    }
}

pub static CTA861_VIC_TABLE: &[VicFormat] = &[
    vic(1, [640, 16, 96, 800], N, [480, 10, 2, 525], N, 59940, PR, (4, 3), 0x1),
    vic(2, [720, 16, 62, 858], N, [480, 9, 6, 525], N, 59940, PR, (4, 3), 0x1),
    vic(3, [720, 16, 62, 858], N, [480, 9, 6, 525], N, 59940, PR, (16, 9), 0x1),
    vic(4, [1280, 110, 40, 1650], P, [720, 5, 5, 750], P, 59940, PR, (16, 9), 0x1),
    vic(5, [1920, 88, 44, 2200], P, [540, 2, 5, 562], P, 59940, I, (16, 9), 0x1),
    vic(6, [1440, 38, 124, 1716], N, [240, 4, 3, 262], N, 59940, I, (4, 3), 0x2),
    vic(7, [1440, 38, 124, 1716], N, [240, 4, 3, 262], N, 59940, I, (16, 9), 0x2),
    vic(8, [1440, 38, 124, 1716], N, [240, 4, 3, 263], N, 59940, PR, (4, 3), 0x2),
    vic(9, [1440, 38, 124, 1716], N, [240, 4, 3, 263], N, 59940, PR, (16, 9), 0x2),
    vic(10, [2880, 76, 248, 3432], N, [240, 4, 3, 262], N, 59940, I, (4, 3), 0x3ff),
    vic(11, [2880, 76, 248, 3432], N, [240, 4, 3, 262], N, 59940, I, (16, 9), 0x3ff),
    vic(12, [2880, 76, 248, 3432], N, [240, 5, 3, 263], N, 59940, PR, (4, 3), 0x3ff),
    vic(13, [2880, 76, 248, 3432], N, [240, 5, 3, 263], N, 59940, PR, (16, 9), 0x3ff),
    vic(14, [1440, 32, 124, 1716], N, [480, 9, 6, 525], N, 59940, PR, (4, 3), 0x3),
    vic(15, [1440, 32, 124, 1716], N, [480, 9, 6, 525], N, 59940, PR, (16, 9), 0x3),
    vic(16, [1920, 88, 44, 2200], P, [1080, 4, 5, 1125], P, 59940, PR, (16, 9), 0x1),
    vic(17, [720, 12, 64, 864], N, [576, 5, 5, 625], N, 50000, PR, (4, 3), 0x1),
    vic(18, [720, 12, 64, 864], N, [576, 5, 5, 625], N, 50000, PR, (16, 9), 0x1),
    vic(19, [1280, 440, 40, 1980], P, [720, 5, 5, 750], P, 50000, PR, (16, 9), 0x1),
    vic(20, [1920, 528, 44, 2640], P, [540, 2, 5, 562], P, 50000, I, (16, 9), 0x1),
    vic(21, [1440, 24, 126, 1728], N, [288, 2, 3, 312], N, 50000, I, (4, 3), 0x2),
    vic(22, [1440, 24, 126, 1728], N, [288, 2, 3, 312], N, 50000, I, (16, 9), 0x2),
    vic(23, [1440, 24, 126, 1728], N, [288, 2, 3, 312], N, 50000, PR, (4, 3), 0x2),
    vic(24, [1440, 24, 126, 1728], N, [288, 2, 3, 312], N, 50000, PR, (16, 9), 0x2),
    vic(25, [2880, 48, 252, 3456], N, [288, 2, 3, 312], N, 50000, I, (4, 3), 0x3ff),
    vic(26, [2880, 48, 252, 3456], N, [288, 2, 3, 312], N, 50000, I, (16, 9), 0x3ff),
    vic(27, [2880, 48, 252, 3456], N, [288, 2, 3, 312], N, 50000, PR, (4, 3), 0x3ff),
    vic(28, [2880, 48, 252, 3456], N, [288, 2, 3, 312], N, 50000, PR, (16, 9), 0x3ff),
    vic(29, [1440, 24, 128, 1728], N, [576, 5, 5, 625], N, 50000, PR, (4, 3), 0x3),
    vic(30, [1440, 24, 128, 1728], N, [576, 5, 5, 625], N, 50000, PR, (16, 9), 0x3),
    vic(31, [1920, 528, 44, 2640], P, [1080, 4, 5, 1125], P, 50000, PR, (16, 9), 0x1),
    vic(32, [1920, 638, 44, 2750], P, [1080, 4, 5, 1125], P, 23976, PR, (16, 9), 0x1),
    vic(33, [1920, 528, 44, 2640], P, [1080, 4, 5, 1125], P, 25000, PR, (16, 9), 0x1),
    vic(34, [1920, 88, 44, 2200], P, [1080, 4, 5, 1125], P, 29970, PR, (16, 9), 0x1),
    vic(35, [2880, 64, 248, 3432], N, [480, 9, 6, 525], N, 59940, PR, (4, 3), 0x7),
    vic(36, [2880, 64, 248, 3432], N, [480, 9, 6, 525], N, 59940, PR, (16, 9), 0x7),
    vic(37, [2880, 48, 256, 3456], N, [576, 5, 5, 625], N, 50000, PR, (4, 3), 0x7),
    vic(38, [2880, 48, 256, 3456], N, [576, 5, 5, 625], N, 50000, PR, (16, 9), 0x7),
    vic(39, [1920, 32, 168, 2304], P, [540, 23, 5, 625], N, 50000, I, (16, 9), 0x1),
    vic(40, [1920, 528, 44, 2640], P, [540, 2, 5, 562], P, 100000, I, (16, 9), 0x1),
    vic(41, [1280, 440, 40, 1980], P, [720, 5, 5, 750], P, 100000, PR, (16, 9), 0x1),
    vic(42, [720, 12, 64, 864], N, [576, 5, 5, 625], N, 100000, PR, (4, 3), 0x1),
    vic(43, [720, 12, 64, 864], N, [576, 5, 5, 625], N, 100000, PR, (16, 9), 0x1),
    vic(44, [1440, 24, 126, 1728], N, [288, 2, 3, 312], N, 100000, I, (4, 3), 0x2),
    vic(45, [1440, 24, 126, 1728], N, [288, 2, 3, 312], N, 100000, I, (16, 9), 0x2),
    vic(46, [1920, 88, 44, 2200], P, [540, 2, 5, 562], P, 119880, I, (16, 9), 0x1),
    vic(47, [1280, 110, 40, 1650], P, [720, 5, 5, 750], P, 119880, PR, (16, 9), 0x1),
    vic(48, [720, 16, 62, 858], N, [480, 9, 6, 525], N, 119880, PR, (4, 3), 0x1),
    vic(49, [720, 16, 62, 858], N, [480, 9, 6, 525], N, 119880, PR, (16, 9), 0x1),
    vic(50, [1440, 38, 124, 1716], N, [240, 4, 3, 262], N, 119880, I, (4, 3), 0x2),
    vic(51, [1440, 38, 124, 1716], N, [240, 4, 3, 262], N, 119880, I, (16, 9), 0x2),
    vic(52, [720, 12, 64, 864], N, [576, 5, 5, 625], N, 200000, PR, (4, 3), 0x1),
    vic(53, [720, 12, 64, 864], N, [576, 5, 5, 625], N, 200000, PR, (16, 9), 0x1),
    vic(54, [1440, 24, 126, 1728], N, [288, 2, 3, 312], N, 200000, I, (4, 3), 0x2),
    vic(55, [1440, 24, 126, 1728], N, [288, 2, 3, 312], N, 200000, I, (16, 9), 0x2),
    vic(56, [720, 16, 62, 858], N, [480, 9, 6, 525], N, 239760, PR, (4, 3), 0x1),
    vic(57, [720, 16, 62, 858], N, [480, 9, 6, 525], N, 239760, PR, (16, 9), 0x1),
    vic(58, [1440, 38, 124, 1716], N, [240, 4, 3, 262], N, 239760, I, (4, 3), 0x2),
    vic(59, [1440, 38, 124, 1716], N, [240, 4, 3, 262], N, 239760, I, (16, 9), 0x2),
    vic(60, [1280, 1760, 40, 3300], P, [720, 5, 5, 750], P, 23976, PR, (16, 9), 0x1),
    vic(61, [1280, 2420, 40, 3960], P, [720, 5, 5, 750], P, 25000, PR, (16, 9), 0x1),
    vic(62, [1280, 1760, 40, 3300], N, [720, 5, 5, 750], P, 29970, PR, (16, 9), 0x1),
    vic(63, [1920, 88, 44, 2200], P, [1080, 4, 5, 1125], P, 119880, PR, (16, 9), 0x1),
    vic(64, [1920, 528, 44, 2640], P, [1080, 4, 5, 1125], P, 100000, PR, (16, 9), 0x1),
    vic(65, [1280, 1760, 40, 3300], P, [720, 5, 5, 750], P, 23976, PR, (64, 27), 0x1),
    vic(66, [1280, 2420, 40, 3960], P, [720, 5, 5, 750], P, 25000, PR, (64, 27), 0x1),
    vic(67, [1280, 1760, 40, 3300], P, [720, 5, 5, 750], P, 29970, PR, (64, 27), 0x1),
    vic(68, [1280, 440, 40, 1980], P, [720, 5, 5, 750], P, 50000, PR, (64, 27), 0x1),
    vic(69, [1280, 110, 40, 1650], P, [720, 5, 5, 750], P, 59940, PR, (64, 27), 0x1),
    vic(70, [1280, 440, 40, 1980], P, [720, 5, 5, 750], P, 100000, PR, (64, 27), 0x1),
    vic(71, [1280, 110, 40, 1650], P, [720, 5, 5, 750], P, 119880, PR, (64, 27), 0x1),
    vic(72, [1920, 638, 44, 2750], P, [1080, 4, 5, 1125], P, 23976, PR, (64, 27), 0x1),
    vic(73, [1920, 528, 44, 2640], P, [1080, 4, 5, 1125], P, 25000, PR, (64, 27), 0x1),
    vic(74, [1920, 88, 44, 2200], P, [1080, 4, 5, 1125], P, 29970, PR, (64, 27), 0x1),
    vic(75, [1920, 528, 44, 2640], P, [1080, 4, 5, 1125], P, 50000, PR, (64, 27), 0x1),
    vic(76, [1920, 88, 44, 2200], P, [1080, 4, 5, 1125], P, 59940, PR, (64, 27), 0x1),
    vic(77, [1920, 528, 44, 2640], P, [1080, 4, 5, 1125], P, 100000, PR, (64, 27), 0x1),
    vic(78, [1920, 88, 44, 2200], P, [1080, 4, 5, 1125], P, 119880, PR, (64, 27), 0x1),
    vic(79, [1680, 1360, 40, 3300], P, [720, 5, 5, 750], P, 23976, PR, (64, 27), 0x1),
    vic(80, [1680, 1228, 40, 3168], P, [720, 5, 5, 750], P, 25000, PR, (64, 27), 0x1),
    vic(81, [1680, 700, 40, 2640], P, [720, 5, 5, 750], P, 29970, PR, (64, 27), 0x1),
    vic(82, [1680, 260, 40, 2200], P, [720, 5, 5, 750], P, 50000, PR, (64, 27), 0x1),
    vic(83, [1680, 260, 40, 2200], P, [720, 5, 5, 750], P, 59940, PR, (64, 27), 0x1),
    vic(84, [1680, 60, 40, 2000], P, [720, 5, 5, 825], P, 100000, PR, (64, 27), 0x1),
    vic(85, [1680, 60, 40, 2000], P, [720, 5, 5, 825], P, 119880, PR, (64, 27), 0x1),
    vic(86, [2560, 998, 44, 3750], P, [1080, 4, 5, 1100], P, 23976, PR, (64, 27), 0x1),
    vic(87, [2560, 448, 44, 3200], P, [1080, 4, 5, 1125], P, 25000, PR, (64, 27), 0x1),
    vic(88, [2560, 768, 44, 3520], P, [1080, 4, 5, 1125], P, 29970, PR, (64, 27), 0x1),
    vic(89, [2560, 548, 44, 3300], P, [1080, 4, 5, 1125], P, 50000, PR, (64, 27), 0x1),
    vic(90, [2560, 248, 44, 3000], P, [1080, 4, 5, 1100], P, 59940, PR, (64, 27), 0x1),
    vic(91, [2560, 218, 44, 2970], P, [1080, 4, 5, 1250], P, 100000, PR, (64, 27), 0x1),
    vic(92, [2560, 548, 44, 3300], P, [1080, 4, 5, 1250], P, 119880, PR, (64, 27), 0x1),
    vic(93, [3840, 1276, 88, 5500], P, [2160, 8, 10, 2250], P, 23976, PR, (16, 9), 0x1),
    vic(94, [3840, 1056, 88, 5280], P, [2160, 8, 10, 2250], P, 25000, PR, (16, 9), 0x1),
    vic(95, [3840, 176, 88, 4400], P, [2160, 8, 10, 2250], P, 29970, PR, (16, 9), 0x1),
    vic(96, [3840, 1056, 88, 5280], P, [2160, 8, 10, 2250], P, 50000, PR, (16, 9), 0x1),
    vic(97, [3840, 176, 88, 4400], P, [2160, 8, 10, 2250], P, 59940, PR, (16, 9), 0x1),
    vic(98, [4096, 1020, 88, 5500], P, [2160, 8, 10, 2250], P, 23976, PR, (256, 135), 0x1),
    vic(99, [4096, 968, 88, 5280], P, [2160, 8, 10, 2250], P, 25000, PR, (256, 135), 0x1),
    vic(100, [4096, 88, 88, 4400], P, [2160, 8, 10, 2250], P, 29970, PR, (256, 135), 0x1),
    vic(101, [4096, 968, 88, 5280], P, [2160, 8, 10, 2250], P, 50000, PR, (256, 135), 0x1),
    vic(102, [4096, 88, 88, 4400], P, [2160, 8, 10, 2250], P, 59940, PR, (256, 135), 0x1),
    vic(103, [3840, 1276, 88, 5500], P, [2160, 8, 10, 2250], P, 23976, PR, (64, 27), 0x1),
    vic(104, [3840, 1056, 88, 5280], P, [2160, 8, 10, 2250], P, 25000, PR, (64, 27), 0x1),
    vic(105, [3840, 176, 88, 4400], P, [2160, 8, 10, 2250], P, 29970, PR, (64, 27), 0x1),
    vic(106, [3840, 1056, 88, 5280], P, [2160, 8, 10, 2250], P, 50000, PR, (64, 27), 0x1),
    vic(107, [3840, 176, 88, 4400], P, [2160, 8, 10, 2250], P, 59940, PR, (64, 27), 0x1),
    vic(108, [1280, 960, 40, 2500], P, [720, 5, 5, 750], P, 47950, PR, (16, 9), 0x1),
    vic(109, [1280, 960, 40, 2500], P, [720, 5, 5, 750], P, 47950, PR, (64, 27), 0x1),
    vic(110, [1680, 810, 40, 2750], P, [720, 5, 5, 750], P, 47950, PR, (64, 27), 0x1),
    vic(111, [1920, 638, 44, 2750], P, [1080, 4, 5, 1125], P, 47950, PR, (16, 9), 0x1),
    vic(112, [1920, 638, 44, 2750], P, [1080, 4, 5, 1125], P, 47950, PR, (64, 27), 0x1),
    vic(113, [2560, 998, 44, 3750], P, [1080, 4, 5, 1100], P, 47950, PR, (64, 27), 0x1),
    vic(114, [3840, 1276, 88, 5500], P, [2160, 8, 10, 2250], P, 47950, PR, (16, 9), 0x1),
    vic(115, [4096, 1020, 88, 5500], P, [2160, 8, 10, 2250], P, 47950, PR, (256, 135), 0x1),
    vic(116, [3840, 1276, 88, 5500], P, [2160, 8, 10, 2250], P, 47950, PR, (64, 27), 0x1),
    vic(117, [3840, 1056, 88, 5280], P, [2160, 8, 10, 2250], P, 100000, PR, (16, 9), 0x1),
    vic(118, [3840, 176, 88, 4400], P, [2160, 8, 10, 2250], P, 119880, PR, (16, 9), 0x1),
    vic(119, [3840, 1056, 88, 5280], P, [2160, 8, 10, 2250], P, 100000, PR, (64, 27), 0x1),
    vic(120, [3840, 176, 88, 4400], P, [2160, 8, 10, 2250], P, 119880, PR, (64, 27), 0x1),
    vic(121, [5120, 1996, 88, 7500], P, [2160, 8, 10, 2200], P, 23976, PR, (64, 27), 0x1),
    vic(122, [5120, 1696, 88, 7200], P, [2160, 8, 10, 2200], P, 25000, PR, (64, 27), 0x1),
    vic(123, [5120, 664, 88, 6000], P, [2160, 8, 10, 2200], P, 29970, PR, (64, 27), 0x1),
    vic(124, [5120, 746, 88, 6250], P, [2160, 8, 10, 2475], P, 47950, PR, (64, 27), 0x1),
    vic(125, [5120, 1096, 88, 6600], P, [2160, 8, 10, 2250], P, 50000, PR, (64, 27), 0x1),
    vic(126, [5120, 164, 88, 5500], P, [2160, 8, 10, 2250], P, 59940, PR, (64, 27), 0x1),
    vic(127, [5120, 1096, 88, 6600], P, [2160, 8, 10, 2250], P, 100000, PR, (64, 27), 0x1),
    vic(193, [5120, 164, 88, 5500], P, [2160, 8, 10, 2250], P, 120000, PR, (64, 27), 0x1),
    vic(194, [7680, 2552, 176, 11000], P, [4320, 16, 20, 4500], P, 23976, PR, (16, 9), 0x1),
    vic(195, [7680, 2352, 176, 10800], P, [4320, 16, 20, 4400], P, 25000, PR, (16, 9), 0x1),
    vic(196, [7680, 552, 176, 9000], P, [4320, 16, 20, 4400], P, 29970, PR, (16, 9), 0x1),
    vic(197, [7680, 2552, 176, 11000], P, [4320, 16, 20, 4500], P, 47950, PR, (16, 9), 0x1),
    vic(198, [7680, 2352, 176, 10800], P, [4320, 16, 20, 4400], P, 50000, PR, (16, 9), 0x1),
    vic(199, [7680, 552, 176, 9000], P, [4320, 16, 20, 4400], P, 59940, PR, (16, 9), 0x1),
    vic(200, [7680, 2112, 176, 10560], P, [4320, 16, 20, 4500], P, 100000, PR, (16, 9), 0x1),
    vic(201, [7680, 352, 176, 8000], P, [4320, 16, 20, 4500], P, 119880, PR, (16, 9), 0x1),
    vic(202, [7680, 2552, 176, 11000], P, [4320, 16, 20, 4500], P, 23976, PR, (64, 27), 0x1),
    vic(203, [7680, 2352, 176, 10800], P, [4320, 16, 20, 4400], P, 25000, PR, (64, 27), 0x1),
    vic(204, [7680, 552, 176, 9000], P, [4320, 16, 20, 4400], P, 29970, PR, (64, 27), 0x1),
    vic(205, [7680, 2552, 176, 11000], P, [4320, 16, 20, 4500], P, 47950, PR, (64, 27), 0x1),
    vic(206, [7680, 2352, 176, 10800], P, [4320, 16, 20, 4400], P, 50000, PR, (64, 27), 0x1),
    vic(207, [7680, 552, 176, 9000], P, [4320, 16, 20, 4400], P, 59940, PR, (64, 27), 0x1),
    vic(208, [7680, 2112, 176, 10560], P, [4320, 16, 20, 4500], P, 100000, PR, (64, 27), 0x1),
    vic(209, [7680, 352, 176, 8800], P, [4500, 16, 20, 4950], P, 119880, PR, (64, 27), 0x1),
    vic(210, [10240, 1492, 176, 12500], P, [4320, 16, 20, 4950], P, 23976, PR, (64, 27), 0x1),
    vic(211, [10240, 2492, 176, 13500], P, [4320, 16, 20, 4400], P, 25000, PR, (64, 27), 0x1),
    vic(212, [10240, 288, 176, 11000], P, [4320, 16, 20, 4500], P, 29970, PR, (64, 27), 0x1),
    vic(213, [10240, 1492, 176, 12500], P, [4320, 16, 20, 4950], P, 47950, PR, (64, 27), 0x1),
    vic(214, [10240, 2492, 176, 13500], P, [4320, 16, 20, 4400], P, 44000, PR, (64, 27), 0x1),
    vic(215, [10240, 288, 176, 11000], P, [4320, 16, 20, 4500], P, 59940, PR, (64, 27), 0x1),
    vic(216, [10240, 2192, 176, 13200], P, [4320, 16, 20, 4500], P, 100000, PR, (64, 27), 0x1),
    vic(217, [10240, 288, 176, 11000], P, [4320, 16, 20, 4500], P, 119880, PR, (64, 27), 0x1),
    vic(218, [4096, 800, 88, 5280], P, [2160, 8, 10, 2250], P, 100000, PR, (256, 135), 0x1),
    vic(219, [4096, 88, 88, 4400], P, [2160, 8, 10, 2250], P, 119880, PR, (256, 135), 0x1),
];

/// VIC pairs describing one raster at 4:3 or 16:9 and the wider 64:27 picture.
static DUAL_ASPECT_VICS: &[(u8, u8)] = &[
    (2, 3),
    (4, 69),
    (6, 7),
    (8, 9),
    (10, 11),
    (12, 13),
    (14, 15),
    (16, 76),
    (17, 18),
    (19, 68),
    (21, 22),
    (23, 24),
    (25, 26),
    (27, 28),
    (29, 30),
    (31, 75),
    (32, 72),
    (33, 73),
    (34, 74),
    (35, 36),
    (37, 38),
    (41, 70),
    (42, 43),
    (44, 45),
    (47, 71),
    (48, 49),
    (50, 51),
    (52, 53),
    (54, 55),
    (56, 57),
    (58, 59),
    (60, 65),
    (61, 66),
    (62, 67),
    (63, 78),
    (64, 77),
    (93, 103),
    (94, 104),
    (95, 105),
    (96, 106),
    (97, 107),
];

/// HDMI 1.4 extended resolutions, indexed by HDMI_VIC - 1.
static HDMI_EXT_4K_TABLE: &[(VicFormat, &str)] = &[
    (
        vic(1, [3840, 176, 88, 4400], P, [2160, 8, 10, 2250], P, 29970, PR, (16, 9), 0x1),
        "HDMI EXT: 3840x2160x29.97/30hz",
    ),
    (
        vic(2, [3840, 1056, 88, 5280], P, [2160, 8, 10, 2250], P, 25000, PR, (16, 9), 0x1),
        "HDMI EXT: 3840x2160x25hz",
    ),
    (
        vic(3, [3840, 1276, 88, 5500], P, [2160, 8, 10, 2250], P, 23976, PR, (16, 9), 0x1),
        "HDMI EXT: 3840x2160x23.98/24hz",
    ),
    (
        vic(4, [4096, 1020, 88, 5500], P, [2160, 8, 10, 2250], P, 24000, PR, (16, 9), 0x1),
        "HDMI EXT: 4096x2160x24hzSmpte",
    ),
];

/// Strips the native flag of a short video descriptor byte.
pub fn svd_vic(svd: u8) -> u8 {
    if svd <= VIC_7BIT_8BIT_SEPARATE_VALUE {
        svd & 0x7F
    } else {
        svd
    }
}

/// The native flag only exists on the 7-bit VIC range.
pub fn svd_is_native(svd: u8) -> bool {
    svd > 0x80 && svd <= VIC_7BIT_8BIT_SEPARATE_VALUE
}

impl VicFormat {
    fn raster(&self, timing_type: TimingType, seq: u8) -> Timing {
        let mut timing = Timing {
            h_visible: self.h[0],
            h_front_porch: self.h[1],
            h_sync_width: self.h[2],
            h_total: self.h[3],
            h_sync_polarity: self.h_sync_polarity,
            v_visible: self.v[0],
            v_front_porch: self.v[1],
            v_sync_width: self.v[2],
            v_total: self.v[3],
            v_sync_polarity: self.v_sync_polarity,
            interlaced: self.interlaced,
            refresh_rate: ((self.rrx1k + 500) / 1000) as u16,
            refresh_rate_x1k: self.rrx1k,
            aspect: self.aspect,
            pixel_repetition: self.pixel_repetition,
            status: TimingStatus::of(timing_type, seq),
            ..Timing::default()
        };
        timing.pclk = rrx1k_to_pclk(&timing);
        timing
    }

    pub fn to_timing(&self) -> Timing {
        let mut timing = self.raster(TimingType::Edid861St, self.vic);
        // 640x480 has a VIC but is an IT format
        if self.vic != 1 {
            timing.status.set_cea_format(self.vic);
        }
        timing.set_name(format!(
            "CTA-861G:#{:3}:{}x{}x{:3}.{:03}Hz/{}",
            self.vic,
            timing.h_visible,
            timing.frame_height(),
            self.rrx1k / 1000,
            self.rrx1k % 1000,
            if self.interlaced { "I" } else { "P" }
        ));
        timing
    }
}

pub fn find_vic(vic: u8) -> Option<&'static VicFormat> {
    CTA861_VIC_TABLE.iter().find(|format| format.vic == vic)
}

/// Canonical timing for a VIC or short video descriptor byte.
pub fn enum_cea861_timing(vic: u8) -> Result<Timing> {
    let vic = svd_vic(vic);
    find_vic(vic)
        .map(VicFormat::to_timing)
        .ok_or_else(|| Error::OutOfRange(format!("Unknown CTA-861 VIC {}", vic)))
}

/// HDMI 1.4 extended 4k timing for HDMI_VIC 1 to 4.
pub fn enum_hdmi_ext_timing(hdmi_vic: u8) -> Result<Timing> {
    let (format, name) = hdmi_vic
        .checked_sub(1)
        .and_then(|index| HDMI_EXT_4K_TABLE.get(index as usize))
        .ok_or_else(|| Error::OutOfRange(format!("Unknown HDMI VIC {}", hdmi_vic)))?;
    let mut timing = format.raster(TimingType::HdmiExt, hdmi_vic);
    timing.set_name(name.to_string());
    Ok(timing)
}

fn ratio_error(aspect: AspectRatio, format: &VicFormat) -> u32 {
    let scaled = aspect.horizontal as u32 * format.aspect.vertical as u32 / aspect.vertical as u32;
    scaled.abs_diff(format.aspect.horizontal as u32)
}

/// VIC a timing is known as, or 0.
///
/// A VIC already stored in the status word wins. Otherwise the raster is compared with every
/// format except VIC 1, which is an IT timing. When the raster is shared by a 4:3 or 16:9 format
/// and a 64:27 one, the format whose aspect ratio is closer to the timing's wins.
pub fn get_cea861_timing_index(timing: &Timing) -> u8 {
    if timing.status.cea_format() != 0 {
        return timing.status.cea_format();
    }
    let Some(format) = CTA861_VIC_TABLE
        .iter()
        .skip_while(|format| format.vic == 1)
        .find(|format| crate::timing::is_relaxed_equal(timing, &format.to_timing()))
    else {
        return 0;
    };
    let aspect = timing.aspect;
    if aspect.horizontal == 0 || aspect.vertical == 0 {
        return format.vic;
    }
    let pair = DUAL_ASPECT_VICS
        .iter()
        .take_while(|(first, _)| *first <= format.vic)
        .find(|(first, _)| *first == format.vic);
    match pair.and_then(|(_, second)| find_vic(*second)) {
        Some(second) if ratio_error(aspect, second) < ratio_error(aspect, format) => {
            trace!("VIC {} resolved to {} by aspect {}", format.vic, second.vic, aspect);
            second.vic
        }
        _ => format.vic,
    }
}

/// Aspect ratio of a VIC, zero if unknown.
pub fn vic_aspect(vic: u8) -> AspectRatio {
    find_vic(vic).map(|format| format.aspect).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use crate::cta861::vic::*;
    use log::LevelFilter;
    use simplelog::{Config, TestLogger};

    #[test]
    fn test_table_is_well_formed() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        for format in CTA861_VIC_TABLE {
            assert!(format.h[3] > format.h[0], "{:?}", format);
            assert!(format.v[3] > format.v[0], "{:?}", format);
            assert!(format.pixel_repetition != 0, "{:?}", format);
        }
        assert!(CTA861_VIC_TABLE.windows(2).all(|pair| pair[0].vic < pair[1].vic));
        assert_eq!(MAX_VIC, CTA861_VIC_TABLE.last().unwrap().vic);
    }

    #[test]
    fn test_vic_16() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let timing = enum_cea861_timing(0x10).unwrap();
        assert_eq!((1920, 1080), (timing.h_visible, timing.v_visible));
        assert_eq!((2200, 1125), (timing.h_total, timing.v_total));
        assert_eq!(14835, timing.pclk);
        assert_eq!(60, timing.refresh_rate);
        assert_eq!(AspectRatio::new(16, 9), timing.aspect);
        assert_eq!(16, timing.status.cea_format());
        assert_eq!(TimingType::Edid861St, timing.status.timing_type());
        assert_eq!("CTA-861G:# 16:1920x1080x 59.940Hz/P", timing.name);
    }

    #[test]
    fn test_native_svd_and_interlaced() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        assert_eq!(16, svd_vic(0x90));
        assert!(svd_is_native(0x90));
        assert_eq!(200, svd_vic(200));
        assert!(!svd_is_native(200));
        let timing = enum_cea861_timing(5).unwrap();
        assert!(timing.interlaced);
        assert_eq!(1080, timing.frame_height());
        assert!(enum_cea861_timing(0).is_err());
        assert!(enum_cea861_timing(0x80).is_err());
        assert!(enum_cea861_timing(220).is_err());
    }

    #[test]
    fn test_dual_aspect_lookup() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        for (first, second) in DUAL_ASPECT_VICS {
            let mut timing = enum_cea861_timing(*first).unwrap();
            timing.status.set_cea_format(0);
            timing.aspect = vic_aspect(*second);
            assert_eq!(*second, get_cea861_timing_index(&timing), "VIC {}", first);
            timing.aspect = vic_aspect(*first);
            assert_eq!(*first, get_cea861_timing_index(&timing), "VIC {}", first);
        }
    }

    #[test]
    fn test_reverse_lookup() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let timing = enum_cea861_timing(1).unwrap();
        assert_eq!(0, timing.status.cea_format());
        assert_eq!(0, get_cea861_timing_index(&timing));
        let mut timing = enum_cea861_timing(97).unwrap();
        timing.status.set_cea_format(0);
        timing.aspect = AspectRatio::default();
        assert_eq!(97, get_cea861_timing_index(&timing));
    }

    #[test]
    fn test_hdmi_ext() {
        let _ = TestLogger::init(LevelFilter::Debug, Config::default());
        let timing = enum_hdmi_ext_timing(1).unwrap();
        assert_eq!((3840, 4400, 2250), (timing.h_visible, timing.h_total, timing.v_total));
        assert_eq!(29670, timing.pclk);
        assert_eq!(TimingType::HdmiExt, timing.status.timing_type());
        assert!(enum_hdmi_ext_timing(0).is_err());
        assert!(enum_hdmi_ext_timing(5).is_err());
    }
}
