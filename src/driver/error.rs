use thiserror::Error;

use super::bus::BusError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("i2c error")]
    Bus(#[from] BusError),
    #[error("checksum error")]
    Checksum(#[from] ChecksumError),
    #[error("invalid argument")]
    Validation(#[from] ValidationError),
}

/// A sensor frame whose trailing CRC byte did not match its data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("crc mismatch: expected 0x{expected:02x}, computed 0x{computed:02x}")]
pub struct ChecksumError {
    pub expected: u8,
    pub computed: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} = {value} is out of range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: u8,
        min: u8,
        max: u8,
    },
    #[error("0x{0:02x} is not a 7-bit bus address")]
    BusAddress(u8),
    #[error("0x{0:02x} is not a legal device address")]
    DeviceAddress(u8),
    #[error("no reset pin attached")]
    NoResetPin,
}

impl ValidationError {
    /// Checks that `value` lies in `min..=max`.
    pub(crate) fn check_range(
        field: &'static str,
        value: u8,
        min: u8,
        max: u8,
    ) -> Result<u8, ValidationError> {
        if (min..=max).contains(&value) {
            Ok(value)
        } else {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min,
                max,
            })
        }
    }
}
