//! Driver for the Sensirion SHT3x humidity and temperature sensor.
//!
//! Every exchange with the sensor is a 16-bit command, sometimes followed
//! after a fixed wait by a read of CRC-protected words. The device lock is
//! held from the command to the last byte read, so concurrent callers on
//! one handle never interleave commands.

use std::{
    convert::Infallible,
    sync::{Mutex, MutexGuard, PoisonError},
};

use embedded_hal::{blocking::delay::DelayMs, digital::v2::OutputPin};
use tracing::{debug, trace, warn};

use crate::driver::{
    bus::{BusAddress, Transport},
    Error, ValidationError,
};

pub mod command;
pub mod crc;
pub mod status;

pub use command::{ClockMode, Repeatability};
pub use status::Status;

/// Address with the ADDR pin pulled down.
pub const ADDRESS_PD: u8 = 0x44;
/// Address with the ADDR pin pulled up.
pub const ADDRESS_PU: u8 = 0x45;

const RESET_PULSE_MS: u32 = 100;
const RESET_RECOVERY_MS: u32 = 50;
const SERIAL_NUMBER_DELAY_MS: u32 = 1;

/// Stand-in for a sensor whose nRESET line is not wired to a GPIO.
#[derive(Debug, Clone, Copy)]
pub struct NoPin;

impl OutputPin for NoPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Result of one single-shot measurement. A field is `None` when its frame
/// failed the CRC check.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
}

pub fn convert_temperature(raw: u16) -> f32 {
    -45.0 + raw as f32 * 175.0 / 65534.0
}

pub fn convert_humidity(raw: u16) -> f32 {
    raw as f32 * 0.0015259022
}

struct Inner<D, P> {
    delay: D,
    reset_pin: Option<P>,
    status: Status,
    temperature: f32,
    humidity: f32,
}

pub struct Sht3x<T, D, P = NoPin> {
    bus: T,
    address: BusAddress,
    clock: ClockMode,
    repeatability: Repeatability,
    inner: Mutex<Inner<D, P>>,
}

impl<T, D, P> Sht3x<T, D, P>
where
    T: Transport,
    D: DelayMs<u32>,
    P: OutputPin<Error = Infallible>,
{
    /// Attaches to the sensor at `address` and clears its status register.
    pub fn new(
        bus: T,
        address: u8,
        reset_pin: Option<P>,
        clock: ClockMode,
        repeatability: Repeatability,
        delay: D,
    ) -> Result<Self, Error> {
        if address != ADDRESS_PD && address != ADDRESS_PU {
            return Err(ValidationError::DeviceAddress(address).into());
        }
        let address = BusAddress::try_from(address)?;

        let mut reset_pin = reset_pin;
        if let Some(pin) = reset_pin.as_mut() {
            pin.set_high().unwrap_or_else(|never| match never {});
        }

        let sht = Self {
            bus,
            address,
            clock,
            repeatability,
            inner: Mutex::new(Inner {
                delay,
                reset_pin,
                status: Status::default(),
                temperature: 0.0,
                humidity: 0.0,
            }),
        };

        sht.clear_status()?;

        debug!(
            "attached sht3x at 0x{:02x}, {clock:?} / {repeatability:?}",
            address.get()
        );

        Ok(sht)
    }

    /// Detaches the driver and hands back the bus and the reset pin.
    pub fn destroy(self) -> (T, Option<P>) {
        let inner = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        (self.bus, inner.reset_pin)
    }

    fn lock(&self) -> MutexGuard<'_, Inner<D, P>> {
        // nothing in Inner is left half-updated by a panicking holder
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_command(&self, command: u16) -> Result<(), Error> {
        trace!("sht3x command 0x{command:04x}");
        Ok(self.bus.write(self.address, &command.to_be_bytes())?)
    }

    fn read_words<const N: usize>(&self) -> Result<[u8; N], Error> {
        let mut buf = [0u8; N];
        self.bus.read(self.address, &mut buf)?;
        Ok(buf)
    }

    fn send(&self, command: u16) -> Result<(), Error> {
        let _guard = self.lock();
        self.write_command(command)
    }

    pub fn read_serial_number(&self) -> Result<u32, Error> {
        let mut inner = self.lock();

        self.write_command(command::READ_SERIAL_NUMBER)?;
        inner.delay.delay_ms(SERIAL_NUMBER_DELAY_MS);
        let [a0, a1, a2, b0, b1, b2] = self.read_words::<6>()?;

        let high = crc::check_frame([a0, a1, a2])?;
        let low = crc::check_frame([b0, b1, b2])?;

        Ok((high as u32) << 16 | low as u32)
    }

    /// Runs one measurement with the configured clock mode and
    /// repeatability.
    ///
    /// Temperature and humidity arrive in separate CRC frames and are
    /// accepted independently: a corrupted humidity frame still lets the
    /// temperature through, and the cached humidity keeps its old value.
    /// Fails with a checksum error only if neither frame is intact.
    pub fn read_single_shot(&self) -> Result<Reading, Error> {
        let command = command::single_shot(self.clock, self.repeatability);
        let mut inner = self.lock();

        self.write_command(command)?;
        inner.delay.delay_ms(self.clock.measurement_delay_ms());
        let [t0, t1, t2, h0, h1, h2] = self.read_words::<6>()?;

        let temperature = crc::check_frame([t0, t1, t2]);
        let humidity = crc::check_frame([h0, h1, h2]);

        if let (Err(err), Err(_)) = (temperature, humidity) {
            warn!("sht3x measurement rejected: {err}");
            return Err(err.into());
        }

        let mut reading = Reading::default();

        match temperature {
            Ok(raw) => {
                inner.temperature = convert_temperature(raw);
                reading.temperature = Some(inner.temperature);
            }
            Err(err) => warn!("sht3x temperature frame rejected: {err}"),
        }

        match humidity {
            Ok(raw) => {
                inner.humidity = convert_humidity(raw);
                reading.humidity = Some(inner.humidity);
            }
            Err(err) => warn!("sht3x humidity frame rejected: {err}"),
        }

        Ok(reading)
    }

    pub fn read_status(&self) -> Result<Status, Error> {
        let mut inner = self.lock();

        self.write_command(command::READ_STATUS)?;
        let [s0, s1, s2] = self.read_words::<3>()?;
        let status = Status::from(crc::check_frame([s0, s1, s2])?);

        inner.status = status;
        Ok(status)
    }

    pub fn clear_status(&self) -> Result<(), Error> {
        self.send(command::CLEAR_STATUS)
    }

    pub fn soft_reset(&self) -> Result<(), Error> {
        self.send(command::SOFT_RESET)
    }

    pub fn enable_heater(&self) -> Result<(), Error> {
        self.send(command::HEATER_ENABLE)
    }

    pub fn disable_heater(&self) -> Result<(), Error> {
        self.send(command::HEATER_DISABLE)
    }

    /// Pulses nRESET low, then waits for the sensor to come back up.
    pub fn hard_reset(&self) -> Result<(), Error> {
        let mut inner = self.lock();
        let Inner {
            delay, reset_pin, ..
        } = &mut *inner;
        let pin = reset_pin.as_mut().ok_or(ValidationError::NoResetPin)?;

        pin.set_low().unwrap_or_else(|never| match never {});
        delay.delay_ms(RESET_PULSE_MS);
        pin.set_high().unwrap_or_else(|never| match never {});
        delay.delay_ms(RESET_RECOVERY_MS);

        Ok(())
    }

    /// Last temperature accepted by [`Self::read_single_shot`], in °C.
    pub fn temperature(&self) -> f32 {
        self.lock().temperature
    }

    /// Last relative humidity accepted by [`Self::read_single_shot`], in %.
    pub fn humidity(&self) -> f32 {
        self.lock().humidity
    }

    /// Status word from the last successful [`Self::read_status`].
    pub fn status(&self) -> Status {
        self.lock().status
    }

    pub fn clock_mode(&self) -> ClockMode {
        self.clock
    }

    pub fn repeatability(&self) -> Repeatability {
        self.repeatability
    }
}
