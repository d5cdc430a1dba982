//! Timekeeping registers 0x00..=0x06.
//!
//! Layout on the wire, one BCD byte each: seconds, minutes, hours, weekday,
//! date, month (bit 7 is the century flag), year. The hours byte carries the
//! 12-hour flag in bit 6 and the PM flag in bit 5.

use std::fmt;

use super::bcd;
use crate::driver::ValidationError;

const HOUR_12H: u8 = 0x40;
const HOUR_PM: u8 = 0x20;
const MONTH_CENTURY: u8 = 0x80;

/// Calendar time as the RTC keeps it. `year` counts from 2000.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WallClockTime {
    pub year: u8,
    pub month: u8,
    pub date: u8,
    /// 1..=7, meaning is up to the application.
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    pub year: u8,
    pub month: u8,
    pub date: u8,
    pub weekday: u8,
}

impl WallClockTime {
    pub fn from_parts(date: Date, clock: Clock) -> Self {
        Self {
            year: date.year,
            month: date.month,
            date: date.date,
            weekday: date.weekday,
            hour: clock.hour,
            minute: clock.minute,
            second: clock.second,
        }
    }

    pub fn clock(&self) -> Clock {
        Clock {
            hour: self.hour,
            minute: self.minute,
            second: self.second,
        }
    }

    pub fn date(&self) -> Date {
        Date {
            year: self.year,
            month: self.month,
            date: self.date,
            weekday: self.weekday,
        }
    }
}

impl fmt::Display for WallClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date(), self.clock())
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "20{:02}-{:02}-{:02}", self.year, self.month, self.date)
    }
}

/// Number of days in `month` of year `2000 + year`.
pub const fn days_in_month(month: u8, year: u8) -> u8 {
    match month {
        2 if year % 4 == 0 => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Decodes an hours register, folding 12-hour mode into 0..=23.
///
/// In 12-hour mode the PM flag adds twelve to the BCD hour, so 12 AM reads
/// back as 12 and 12 PM as 24; the chip is never put into that mode here.
pub const fn decode_hour(byte: u8) -> u8 {
    if byte & HOUR_12H != 0 {
        let hour = bcd::decode(byte & 0x1F);
        if byte & HOUR_PM != 0 {
            hour + 12
        } else {
            hour
        }
    } else {
        bcd::decode(byte & 0x3F)
    }
}

pub fn decode_clock(raw: &[u8; 3]) -> Clock {
    Clock {
        second: bcd::decode(raw[0]),
        minute: bcd::decode(raw[1]),
        hour: decode_hour(raw[2]),
    }
}

pub fn decode_date(raw: &[u8; 4]) -> Date {
    Date {
        weekday: bcd::decode(raw[0]),
        date: bcd::decode(raw[1]),
        month: bcd::decode(raw[2] & !MONTH_CENTURY),
        year: bcd::decode(raw[3]),
    }
}

pub fn decode_time(raw: &[u8; 7]) -> WallClockTime {
    let clock = decode_clock(&[raw[0], raw[1], raw[2]]);
    let date = decode_date(&[raw[3], raw[4], raw[5], raw[6]]);
    WallClockTime::from_parts(date, clock)
}

/// Encodes hour/minute/second, always in 24-hour form.
pub fn encode_clock(clock: &Clock) -> Result<[u8; 3], ValidationError> {
    let second = ValidationError::check_range("second", clock.second, 0, 59)?;
    let minute = ValidationError::check_range("minute", clock.minute, 0, 59)?;
    let hour = ValidationError::check_range("hour", clock.hour, 0, 23)?;

    // bit 6 stays clear, selecting 24-hour mode
    Ok([bcd::encode(second)?, bcd::encode(minute)?, bcd::encode(hour)?])
}

pub fn encode_date(date: &Date) -> Result<[u8; 4], ValidationError> {
    let weekday = ValidationError::check_range("weekday", date.weekday, 1, 7)?;
    let year = ValidationError::check_range("year", date.year, 0, 99)?;
    let month = ValidationError::check_range("month", date.month, 1, 12)?;
    let day = ValidationError::check_range("date", date.date, 1, days_in_month(month, year))?;

    Ok([
        bcd::encode(weekday)?,
        bcd::encode(day)?,
        bcd::encode(month)?,
        bcd::encode(year)?,
    ])
}

pub fn encode_time(time: &WallClockTime) -> Result<[u8; 7], ValidationError> {
    let [second, minute, hour] = encode_clock(&time.clock())?;
    let [weekday, date, month, year] = encode_date(&time.date())?;
    Ok([second, minute, hour, weekday, date, month, year])
}
