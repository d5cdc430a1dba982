//! Packed binary-coded decimal, one decimal digit per nibble.

use crate::driver::ValidationError;

/// Decodes `byte` as two BCD digits.
///
/// Nibbles above 9 are not rejected; they decode to the arithmetic value
/// (`0x1A` gives 20). Use [`is_valid`] to detect malformed input.
pub const fn decode(byte: u8) -> u8 {
    (byte >> 4) * 10 + (byte & 0x0F)
}

pub fn encode(value: u8) -> Result<u8, ValidationError> {
    let value = ValidationError::check_range("bcd", value, 0, 99)?;
    Ok(((value / 10) << 4) | (value % 10))
}

pub const fn is_valid(byte: u8) -> bool {
    (byte >> 4) <= 9 && (byte & 0x0F) <= 9
}
