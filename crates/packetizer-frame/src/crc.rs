//! CRC-8 used for frame integrity.
//!
//! Both peers must agree on the exact variant; this is part of the wire
//! contract. Frames use CRC-8/SMBUS: polynomial 0x07, init 0x00, no
//! reflection, no final xor.

use crc::{Crc, CRC_8_SMBUS};

/// The pinned CRC-8 algorithm.
pub const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// CRC-8/SMBUS of `data`.
pub fn crc8(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}
