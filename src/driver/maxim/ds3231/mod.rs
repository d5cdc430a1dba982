//! Driver for the Maxim DS3231 real-time clock.
//!
//! The driver keeps no state besides the bus and the address. Every call is
//! one register transaction, or a read followed by a write for the control
//! and status registers.

use tracing::{debug, warn};

use crate::driver::{
    bus::{BusAddress, Transport},
    Error,
};

pub mod alarm;
pub mod bcd;
pub mod control;
pub mod time;

use alarm::{Alarm1Mode, Alarm2Mode, AlarmSpec};
use control::AlarmId;
use time::{Clock, Date, WallClockTime};

pub const ADDRESS: u8 = 0x68;

pub mod reg {
    pub const SECONDS: u8 = 0x00;
    pub const MINUTES: u8 = 0x01;
    pub const HOURS: u8 = 0x02;
    pub const WEEKDAY: u8 = 0x03;
    pub const DATE: u8 = 0x04;
    pub const MONTH: u8 = 0x05;
    pub const YEAR: u8 = 0x06;
    pub const ALARM1: u8 = 0x07;
    pub const ALARM2: u8 = 0x0B;
    pub const CONTROL: u8 = 0x0E;
    pub const STATUS: u8 = 0x0F;
    pub const TEMP_MSB: u8 = 0x11;
}

pub struct Ds3231<T> {
    bus: T,
    address: BusAddress,
}

impl<T: Transport> Ds3231<T> {
    pub fn new(bus: T, address: u8) -> Result<Self, Error> {
        let address = BusAddress::try_from(address)?;
        debug!("attached ds3231 at 0x{:02x}", address.get());
        Ok(Self { bus, address })
    }

    /// Detaches the driver and hands back the bus.
    pub fn destroy(self) -> T {
        self.bus
    }

    fn read<const N: usize>(&self, register: u8) -> Result<[u8; N], Error> {
        let mut buf = [0u8; N];
        self.bus.read_registers(self.address, register, &mut buf)?;
        check_digits(register, &buf);
        Ok(buf)
    }

    fn write(&self, register: u8, payload: &[u8]) -> Result<(), Error> {
        self.bus.write_registers(self.address, register, payload)
    }

    fn read_byte(&self, register: u8) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        self.bus.read_registers(self.address, register, &mut buf)?;
        Ok(buf[0])
    }

    /// Current date and time, with the hour folded into 24-hour form.
    pub fn time(&self) -> Result<WallClockTime, Error> {
        Ok(time::decode_time(&self.read(reg::SECONDS)?))
    }

    pub fn set_time(&self, time: &WallClockTime) -> Result<(), Error> {
        self.write(reg::SECONDS, &time::encode_time(time)?)
    }

    pub fn clock(&self) -> Result<Clock, Error> {
        Ok(time::decode_clock(&self.read(reg::SECONDS)?))
    }

    pub fn set_clock(&self, clock: &Clock) -> Result<(), Error> {
        self.write(reg::SECONDS, &time::encode_clock(clock)?)
    }

    pub fn date(&self) -> Result<Date, Error> {
        Ok(time::decode_date(&self.read(reg::WEEKDAY)?))
    }

    pub fn set_date(&self, date: &Date) -> Result<(), Error> {
        self.write(reg::WEEKDAY, &time::encode_date(date)?)
    }

    pub fn set_alarm1(&self, mode: Alarm1Mode, spec: &AlarmSpec) -> Result<(), Error> {
        self.write(reg::ALARM1, &alarm::encode_alarm1(mode, spec)?)
    }

    pub fn set_alarm2(&self, mode: Alarm2Mode, spec: &AlarmSpec) -> Result<(), Error> {
        self.write(reg::ALARM2, &alarm::encode_alarm2(mode, spec)?)
    }

    /// Reads back alarm 1. `None` if the registers hold a mask combination
    /// that is not one of the documented modes.
    pub fn alarm1(&self) -> Result<Option<(Alarm1Mode, AlarmSpec)>, Error> {
        let mut raw = [0u8; 4];
        self.bus.read_registers(self.address, reg::ALARM1, &mut raw)?;
        Ok(alarm::decode_alarm1(&raw))
    }

    pub fn alarm2(&self) -> Result<Option<(Alarm2Mode, AlarmSpec)>, Error> {
        let mut raw = [0u8; 3];
        self.bus.read_registers(self.address, reg::ALARM2, &mut raw)?;
        Ok(alarm::decode_alarm2(&raw))
    }

    pub fn enable_alarm_interrupt(&self, which: AlarmId) -> Result<(), Error> {
        let control = self.read_byte(reg::CONTROL)?;
        self.write(
            reg::CONTROL,
            &[control::enable_alarm_interrupt(control, which)],
        )
    }

    pub fn disable_alarm_interrupt(&self, which: AlarmId) -> Result<(), Error> {
        let control = self.read_byte(reg::CONTROL)?;
        self.write(
            reg::CONTROL,
            &[control::disable_alarm_interrupt(control, which)],
        )
    }

    pub fn is_alarm_interrupt_enabled(&self, which: AlarmId) -> Result<bool, Error> {
        let control = self.read_byte(reg::CONTROL)?;
        Ok(control::alarm_interrupt_enabled(control, which))
    }

    /// Returns whether `which` has fired and clears its flag, leaving the
    /// other alarm's flag as it was.
    pub fn has_alarm_fired(&self, which: AlarmId) -> Result<bool, Error> {
        let status = self.read_byte(reg::STATUS)?;
        let (fired, status) = control::consume_alarm_fired(status, which);
        self.write(reg::STATUS, &[status])?;
        Ok(fired)
    }

    /// Whether the oscillator has stopped at some point, meaning the time
    /// can't be trusted until it is set again.
    pub fn oscillator_stopped(&self) -> Result<bool, Error> {
        Ok(control::oscillator_stopped(self.read_byte(reg::STATUS)?))
    }

    /// Die temperature in Celsius, 0.25° resolution.
    pub fn temperature(&self) -> Result<f32, Error> {
        let mut raw = [0u8; 2];
        self.bus.read_registers(self.address, reg::TEMP_MSB, &mut raw)?;
        Ok(decode_temperature(raw))
    }
}

fn decode_temperature([msb, lsb]: [u8; 2]) -> f32 {
    msb as i8 as f32 + (lsb >> 6) as f32 * 0.25
}

/// Warns about timekeeping bytes whose digits are not BCD. They still decode,
/// just to a wrong number.
fn check_digits(first: u8, raw: &[u8]) {
    for (register, &byte) in (first..).zip(raw) {
        let digits = match register {
            reg::HOURS if byte & 0x40 != 0 => byte & 0x1F,
            reg::HOURS => byte & 0x3F,
            reg::MONTH => byte & 0x7F,
            reg::SECONDS | reg::MINUTES | reg::WEEKDAY | reg::DATE | reg::YEAR => byte,
            _ => continue,
        };

        if !bcd::is_valid(digits) {
            warn!("register 0x{register:02x} holds malformed bcd 0x{byte:02x}");
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::ErrorKind;

    use embedded_hal_mock::{
        i2c::{Mock as I2cMock, Transaction},
        MockError,
    };

    use super::*;
    use crate::driver::{bus::Bus, bus::BusError, ValidationError};

    fn rtc(expectations: &[Transaction]) -> Ds3231<Bus<I2cMock>> {
        Ds3231::new(Bus::new("mock", I2cMock::new(expectations)), ADDRESS).unwrap()
    }

    fn done(rtc: Ds3231<Bus<I2cMock>>) {
        rtc.destroy().into_inner().done();
    }

    #[test]
    fn get_time_reads_seven_registers() {
        let rtc = rtc(&[Transaction::write_read(
            ADDRESS,
            vec![0x00],
            vec![0x30, 0x45, 0x69, 0x05, 0x17, 0x06, 0x26],
        )]);

        let time = rtc.time().unwrap();
        assert_eq!(time.hour, 21);
        assert_eq!(time.year, 26);
        assert_eq!(time.second, 30);

        done(rtc);
    }

    #[test]
    fn set_time_writes_24_hour_bcd() {
        let rtc = rtc(&[Transaction::write(
            ADDRESS,
            vec![0x00, 0x00, 0x15, 0x18, 0x02, 0x31, 0x12, 0x25],
        )]);

        rtc.set_time(&WallClockTime {
            year: 25,
            month: 12,
            date: 31,
            weekday: 2,
            hour: 18,
            minute: 15,
            second: 0,
        })
        .unwrap();

        done(rtc);
    }

    #[test]
    fn invalid_time_never_reaches_the_bus() {
        let rtc = rtc(&[]);

        let err = rtc
            .set_clock(&Clock {
                hour: 12,
                minute: 61,
                second: 0,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::OutOfRange { field: "minute", .. })
        ));

        done(rtc);
    }

    #[test]
    fn clock_and_date_use_their_own_windows() {
        let rtc = rtc(&[
            Transaction::write_read(ADDRESS, vec![0x00], vec![0x59, 0x59, 0x49]),
            Transaction::write_read(ADDRESS, vec![0x03], vec![0x07, 0x28, 0x02, 0x24]),
            Transaction::write(ADDRESS, vec![0x00, 0x00, 0x30, 0x08]),
            Transaction::write(ADDRESS, vec![0x03, 0x01, 0x01, 0x01, 0x25]),
        ]);

        assert_eq!(
            rtc.clock().unwrap(),
            Clock {
                hour: 9,
                minute: 59,
                second: 59
            }
        );
        assert_eq!(
            rtc.date().unwrap(),
            Date {
                year: 24,
                month: 2,
                date: 28,
                weekday: 7
            }
        );
        rtc.set_clock(&Clock {
            hour: 8,
            minute: 30,
            second: 0,
        })
        .unwrap();
        rtc.set_date(&Date {
            year: 25,
            month: 1,
            date: 1,
            weekday: 1,
        })
        .unwrap();

        done(rtc);
    }

    #[test]
    fn set_alarms_write_their_registers() {
        let spec = AlarmSpec {
            hour: 6,
            minute: 45,
            second: 0,
            ..Default::default()
        };
        let rtc = rtc(&[
            Transaction::write(ADDRESS, vec![0x07, 0x00, 0x45, 0x06, 0x80]),
            Transaction::write(ADDRESS, vec![0x0B, 0x45, 0x06, 0x80]),
            Transaction::write_read(ADDRESS, vec![0x07], vec![0x00, 0x45, 0x06, 0x80]),
        ]);

        rtc.set_alarm1(Alarm1Mode::HourMinuteSecondMatch, &spec)
            .unwrap();
        rtc.set_alarm2(Alarm2Mode::HourMinuteMatch, &spec).unwrap();
        assert_eq!(
            rtc.alarm1().unwrap(),
            Some((Alarm1Mode::HourMinuteSecondMatch, spec))
        );

        done(rtc);
    }

    #[test]
    fn enable_is_read_modify_write() {
        let rtc = rtc(&[
            Transaction::write_read(ADDRESS, vec![0x0E], vec![0x18]),
            Transaction::write(ADDRESS, vec![0x0E, 0x1D]),
            Transaction::write_read(ADDRESS, vec![0x0E], vec![0x1D]),
        ]);

        rtc.enable_alarm_interrupt(AlarmId::Alarm1).unwrap();
        assert!(rtc.is_alarm_interrupt_enabled(AlarmId::Alarm1).unwrap());

        done(rtc);
    }

    #[test]
    fn disable_twice_writes_the_same_value() {
        let rtc = rtc(&[
            Transaction::write_read(ADDRESS, vec![0x0E], vec![0x07]),
            Transaction::write(ADDRESS, vec![0x0E, 0x06]),
            Transaction::write_read(ADDRESS, vec![0x0E], vec![0x06]),
            Transaction::write(ADDRESS, vec![0x0E, 0x06]),
        ]);

        rtc.disable_alarm_interrupt(AlarmId::Alarm1).unwrap();
        rtc.disable_alarm_interrupt(AlarmId::Alarm1).unwrap();

        done(rtc);
    }

    #[test]
    fn fired_flag_is_consumed_alone() {
        let rtc = rtc(&[
            Transaction::write_read(ADDRESS, vec![0x0F], vec![0x03]),
            Transaction::write(ADDRESS, vec![0x0F, 0x01]),
            Transaction::write_read(ADDRESS, vec![0x0F], vec![0x01]),
            Transaction::write(ADDRESS, vec![0x0F, 0x01]),
        ]);

        assert!(rtc.has_alarm_fired(AlarmId::Alarm2).unwrap());
        assert!(!rtc.has_alarm_fired(AlarmId::Alarm2).unwrap());

        done(rtc);
    }

    #[test]
    fn failed_read_skips_the_write_back() {
        let rtc = rtc(&[Transaction::write_read(ADDRESS, vec![0x0F], vec![0x00])
            .with_error(MockError::Io(ErrorKind::Other))]);

        assert_eq!(
            rtc.has_alarm_fired(AlarmId::Alarm1),
            Err(Error::Bus(BusError::Transfer { address: ADDRESS }))
        );

        done(rtc);
    }

    #[test]
    fn temperature_and_oscillator() {
        let rtc = rtc(&[
            Transaction::write_read(ADDRESS, vec![0x11], vec![0x19, 0x40]),
            Transaction::write_read(ADDRESS, vec![0x11], vec![0xF6, 0xC0]),
            Transaction::write_read(ADDRESS, vec![0x0F], vec![0x88]),
        ]);

        assert_eq!(rtc.temperature().unwrap(), 25.25);
        assert_eq!(rtc.temperature().unwrap(), -9.25);
        assert!(rtc.oscillator_stopped().unwrap());

        done(rtc);
    }

    #[test]
    fn rejects_wide_address() {
        let bus = Bus::new("mock", I2cMock::new(&[]));
        assert!(matches!(
            Ds3231::new(&bus, 0xD0),
            Err(Error::Validation(ValidationError::BusAddress(0xD0)))
        ));
        bus.into_inner().done();
    }
}
