//! Alarm registers: alarm 1 at 0x07..=0x0A, alarm 2 at 0x0B..=0x0D.
//!
//! Each alarm byte holds a BCD field in its low seven bits and an "ignore
//! this field" mask bit (AxMn) in bit 7. The last byte also holds the
//! day/date select flag in bit 6: set means the low bits are a weekday.
//!
//! A match mode is stored as the mask bits it implies: bit `n` of the mode
//! value is AxM(n+1), and the next bit up selects weekday matching.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::bcd;
use crate::driver::ValidationError;

const MASK: u8 = 0x80;
const DAY_SELECT: u8 = 0x40;

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum Alarm1Mode {
    OncePerSecond = 0x0F,
    SecondMatch = 0x0E,
    MinuteSecondMatch = 0x0C,
    HourMinuteSecondMatch = 0x08,
    DateHourMinuteSecondMatch = 0x00,
    WeekdayHourMinuteSecondMatch = 0x10,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum Alarm2Mode {
    OncePerMinute = 0x07,
    MinuteMatch = 0x06,
    HourMinuteMatch = 0x04,
    DateHourMinuteMatch = 0x00,
    WeekdayHourMinuteMatch = 0x08,
}

/// When an alarm fires. Fields the match mode ignores are still written to
/// the chip but are not range checked beyond fitting in BCD.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AlarmSpec {
    pub date: u8,
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    /// Only used by alarm 1.
    pub second: u8,
}

impl Alarm1Mode {
    fn bits(self) -> u8 {
        self as u8
    }

    fn matches_day(self) -> bool {
        matches!(
            self,
            Self::DateHourMinuteSecondMatch | Self::WeekdayHourMinuteSecondMatch
        )
    }
}

impl Alarm2Mode {
    fn bits(self) -> u8 {
        self as u8
    }

    fn matches_day(self) -> bool {
        matches!(self, Self::DateHourMinuteMatch | Self::WeekdayHourMinuteMatch)
    }
}

fn mask_bit(mode: u8, bit: u8) -> u8 {
    if mode & (1 << bit) != 0 {
        MASK
    } else {
        0
    }
}

fn encode_day(
    spec: &AlarmSpec,
    weekday: bool,
    check: bool,
    mask: u8,
) -> Result<u8, ValidationError> {
    let byte = if weekday {
        let day = if check {
            ValidationError::check_range("weekday", spec.weekday, 1, 7)?
        } else {
            spec.weekday
        };
        bcd::encode(day)? | DAY_SELECT
    } else {
        let day = if check {
            ValidationError::check_range("date", spec.date, 1, 31)?
        } else {
            spec.date
        };
        bcd::encode(day)?
    };

    Ok(byte | mask)
}

fn encode_hms(field: &'static str, value: u8, max: u8, mask: u8) -> Result<u8, ValidationError> {
    let value = ValidationError::check_range(field, value, 0, max)?;
    Ok(bcd::encode(value)? | mask)
}

pub fn encode_alarm1(mode: Alarm1Mode, spec: &AlarmSpec) -> Result<[u8; 4], ValidationError> {
    let bits = mode.bits();

    Ok([
        encode_hms("second", spec.second, 59, mask_bit(bits, 0))?,
        encode_hms("minute", spec.minute, 59, mask_bit(bits, 1))?,
        // 24-hour form; bit 6 stays clear
        encode_hms("hour", spec.hour, 23, mask_bit(bits, 2))?,
        encode_day(spec, bits & 0x10 != 0, mode.matches_day(), mask_bit(bits, 3))?,
    ])
}

pub fn encode_alarm2(mode: Alarm2Mode, spec: &AlarmSpec) -> Result<[u8; 3], ValidationError> {
    let bits = mode.bits();

    Ok([
        encode_hms("minute", spec.minute, 59, mask_bit(bits, 0))?,
        encode_hms("hour", spec.hour, 23, mask_bit(bits, 1))?,
        encode_day(spec, bits & 0x08 != 0, mode.matches_day(), mask_bit(bits, 2))?,
    ])
}

fn mask_of(byte: u8, bit: u8) -> u8 {
    ((byte & MASK) >> 7) << bit
}

fn decode_day(byte: u8, spec: &mut AlarmSpec) -> bool {
    let weekday = byte & DAY_SELECT != 0;
    let value = bcd::decode(byte & 0x3F);
    if weekday {
        spec.weekday = value;
    } else {
        spec.date = value;
    }
    weekday
}

/// Decodes alarm 1 registers. Returns `None` for a mask combination the
/// chip documents as invalid.
pub fn decode_alarm1(raw: &[u8; 4]) -> Option<(Alarm1Mode, AlarmSpec)> {
    let mut spec = AlarmSpec {
        second: bcd::decode(raw[0] & !MASK),
        minute: bcd::decode(raw[1] & !MASK),
        hour: super::time::decode_hour(raw[2] & !MASK),
        ..Default::default()
    };
    let weekday = decode_day(raw[3], &mut spec);

    let mut bits = mask_of(raw[0], 0) | mask_of(raw[1], 1) | mask_of(raw[2], 2) | mask_of(raw[3], 3);
    if weekday && bits == 0 {
        bits = 0x10;
    }

    Some((Alarm1Mode::from_u8(bits)?, spec))
}

pub fn decode_alarm2(raw: &[u8; 3]) -> Option<(Alarm2Mode, AlarmSpec)> {
    let mut spec = AlarmSpec {
        minute: bcd::decode(raw[0] & !MASK),
        hour: super::time::decode_hour(raw[1] & !MASK),
        ..Default::default()
    };
    let weekday = decode_day(raw[2], &mut spec);

    let mut bits = mask_of(raw[0], 0) | mask_of(raw[1], 1) | mask_of(raw[2], 2);
    if weekday && bits == 0 {
        bits = 0x08;
    }

    Some((Alarm2Mode::from_u8(bits)?, spec))
}
