//! CRC as computed by the MCU's hardware CRC unit.
//!
//! CRC-32/MPEG-2 (polynomial 0x04C11DB7, no reflection, no final XOR) fed
//! one little-endian 32-bit word at a time, most significant byte first.

const POLY: u32 = 0x04C1_1DB7;

/// Initial accumulator value.
pub const CRC_INIT: u32 = 0xFFFF_FFFF;

const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

fn update_byte(crc: u32, byte: u8) -> u32 {
    (crc << 8) ^ TABLE[((crc >> 24) as u8 ^ byte) as usize]
}

/// Fold `data` into `crc`.
///
/// `data.len()` must be a multiple of 4; firmware chunks are padded before
/// they get here. A trailing partial word is ignored.
pub fn update(mut crc: u32, data: &[u8]) -> u32 {
    debug_assert!(data.len() % 4 == 0, "CRC input not word aligned");
    for word in data.chunks_exact(4) {
        for &byte in word.iter().rev() {
            crc = update_byte(crc, byte);
        }
    }
    crc
}
