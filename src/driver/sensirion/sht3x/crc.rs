//! CRC-8 protecting every 16-bit word the sensor sends.
//!
//! Polynomial 0x131 (x^8 + x^5 + x^4 + 1), initial value 0xFF, MSB first,
//! no final XOR.

use bytes::Buf;
use crc::{Crc, CRC_8_NRSC_5};

use crate::driver::ChecksumError;

// same parameters as the sensor: poly 0x31, init 0xFF, unreflected
const SENSIRION: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

pub fn crc8(data: &[u8]) -> u8 {
    SENSIRION.checksum(data)
}

pub fn verify(data: &[u8], expected: u8) -> bool {
    crc8(data) == expected
}

/// Checks one `[msb, lsb, crc]` frame and returns its big-endian word.
pub fn check_frame(frame: [u8; 3]) -> Result<u16, ChecksumError> {
    let mut buf = &frame[..];
    let word = buf.get_u16();
    let expected = buf.get_u8();

    let computed = crc8(&frame[..2]);
    if computed == expected {
        Ok(word)
    } else {
        Err(ChecksumError { expected, computed })
    }
}
