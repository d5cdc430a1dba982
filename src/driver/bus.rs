//! Addressed transfers over a shared I2C bus.
//!
//! [`Transport`] is the only primitive the device drivers depend on. A
//! [`Bus`] implements it over any blocking `embedded-hal` I2C master by
//! serializing transfers behind a mutex, so a write phase and the read phase
//! that follows it always reach the wire as one repeated-start transaction.

use std::{
    fmt::Debug,
    sync::{Arc, Mutex, PoisonError},
};

use embedded_hal::blocking::i2c::{Read, Write, WriteRead};
use rppal::i2c::I2c;
use thiserror::Error;
use tracing::{debug, trace};

use super::{Error, ValidationError};

const BUFFER_MAX: usize = 32;
const PAYLOAD_MAX: usize = BUFFER_MAX - 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("can't find i2c bus {0:?}")]
    NotFound(String),
    #[error("transfer with device 0x{address:02x} did not complete")]
    Transfer { address: u8 },
}

/// 7-bit slave address of one device on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusAddress(u8);

impl BusAddress {
    pub const MAX: u8 = 0x7F;

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for BusAddress {
    type Error = ValidationError;

    fn try_from(addr: u8) -> Result<Self, Self::Error> {
        if addr <= Self::MAX {
            Ok(Self(addr))
        } else {
            Err(ValidationError::BusAddress(addr))
        }
    }
}

pub trait Transport {
    /// Sends `write` (if non-empty) and then fills `read` (if non-empty) in
    /// one atomic transaction. No other transfer on the same bus can land
    /// between the two phases.
    fn transfer(&self, address: BusAddress, write: &[u8], read: &mut [u8])
        -> Result<(), BusError>;

    fn write(&self, address: BusAddress, bytes: &[u8]) -> Result<(), BusError> {
        self.transfer(address, bytes, &mut [])
    }

    fn read(&self, address: BusAddress, buf: &mut [u8]) -> Result<(), BusError> {
        self.transfer(address, &[], buf)
    }

    /// Writes `payload` to consecutive registers starting at `register`.
    fn write_registers(
        &self,
        address: BusAddress,
        register: u8,
        payload: &[u8],
    ) -> Result<(), Error> {
        if payload.len() > PAYLOAD_MAX {
            return Err(ValidationError::OutOfRange {
                field: "payload length",
                value: payload.len().min(u8::MAX as usize) as u8,
                min: 0,
                max: PAYLOAD_MAX as u8,
            }
            .into());
        }

        let mut tx_buf = [0u8; BUFFER_MAX];
        let end = 1 + payload.len();

        tx_buf[0] = register;
        tx_buf[1..end].copy_from_slice(payload);

        Ok(self.write(address, &tx_buf[..end])?)
    }

    /// Selects `register` and reads `buf.len()` consecutive registers from it.
    fn read_registers(
        &self,
        address: BusAddress,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), BusError> {
        self.transfer(address, &[register], buf)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn transfer(
        &self,
        address: BusAddress,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), BusError> {
        (**self).transfer(address, write, read)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn transfer(
        &self,
        address: BusAddress,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), BusError> {
        (**self).transfer(address, write, read)
    }
}

/// A named I2C master shared by every driver attached to it.
pub struct Bus<I2C> {
    name: String,
    i2c: Mutex<I2C>,
}

impl<I2C> Bus<I2C> {
    pub fn new(name: impl Into<String>, i2c: I2C) -> Self {
        Self {
            name: name.into(),
            i2c: Mutex::new(i2c),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_inner(self) -> I2C {
        self.i2c.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<I2C, E> Transport for Bus<I2C>
where
    I2C: Read<Error = E> + Write<Error = E> + WriteRead<Error = E>,
    E: Debug,
{
    fn transfer(
        &self,
        address: BusAddress,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), BusError> {
        let addr = address.get();

        // a panic elsewhere can't leave the master mid-transfer, so the
        // poisoned guard is still usable
        let mut i2c = self.i2c.lock().unwrap_or_else(PoisonError::into_inner);

        let result = match (write.is_empty(), read.is_empty()) {
            (false, false) => i2c.write_read(addr, write, read),
            (false, true) => i2c.write(addr, write),
            (true, false) => i2c.read(addr, read),
            (true, true) => return Ok(()),
        };

        match result {
            Ok(()) => {
                trace!(bus = %self.name, addr, tx = ?write, rx = ?read, "transfer");
                Ok(())
            }
            Err(err) => {
                trace!(bus = %self.name, addr, ?err, "transfer failed");
                Err(BusError::Transfer { address: addr })
            }
        }
    }
}

/// Resolves a bus name such as `i2c1`, `i2c-1`, `1` or `/dev/i2c-1` to an
/// open Linux I2C device.
pub fn find_bus(name: &str) -> Result<Bus<I2c>, BusError> {
    let number = parse_bus_number(name).ok_or_else(|| BusError::NotFound(name.to_owned()))?;

    let i2c = I2c::with_bus(number).map_err(|err| {
        debug!("failed to open i2c bus {name:?}: {err}");
        BusError::NotFound(name.to_owned())
    })?;

    debug!("opened i2c bus {name:?} (/dev/i2c-{number})");

    Ok(Bus::new(name, i2c))
}

fn parse_bus_number(name: &str) -> Option<u8> {
    let digits = name
        .strip_prefix("/dev/i2c-")
        .or_else(|| name.strip_prefix("i2c-"))
        .or_else(|| name.strip_prefix("i2c"))
        .unwrap_or(name);

    digits.parse().ok()
}

#[cfg(test)]
mod test {
    use std::io::ErrorKind;

    use embedded_hal_mock::{
        i2c::{Mock as I2cMock, Transaction},
        MockError,
    };

    use super::*;

    const ADDR: u8 = 0x68;

    fn addr() -> BusAddress {
        BusAddress::try_from(ADDR).unwrap()
    }

    #[test]
    fn bus_address_is_seven_bits() {
        assert_eq!(BusAddress::try_from(0x7F).unwrap().get(), 0x7F);
        assert_eq!(
            BusAddress::try_from(0x80),
            Err(ValidationError::BusAddress(0x80))
        );
    }

    #[test]
    fn parse_bus_names() {
        assert_eq!(parse_bus_number("i2c1"), Some(1));
        assert_eq!(parse_bus_number("i2c-22"), Some(22));
        assert_eq!(parse_bus_number("/dev/i2c-0"), Some(0));
        assert_eq!(parse_bus_number("3"), Some(3));
        assert_eq!(parse_bus_number("spi0"), None);
        assert_eq!(parse_bus_number("i2c"), None);
    }

    #[test]
    fn write_then_read_is_one_transaction() {
        let expectations = [Transaction::write_read(ADDR, vec![0x0E], vec![0x1C, 0x88])];
        let bus = Bus::new("mock", I2cMock::new(&expectations));

        let mut buf = [0u8; 2];
        bus.transfer(addr(), &[0x0E], &mut buf).unwrap();
        assert_eq!(buf, [0x1C, 0x88]);

        bus.into_inner().done();
    }

    #[test]
    fn single_phase_transfers() {
        let expectations = [
            Transaction::write(ADDR, vec![0x0F, 0x00]),
            Transaction::read(ADDR, vec![0xAA, 0xBB, 0xCC]),
        ];
        let bus = Bus::new("mock", I2cMock::new(&expectations));

        bus.write(addr(), &[0x0F, 0x00]).unwrap();
        let mut buf = [0u8; 3];
        bus.read(addr(), &mut buf).unwrap();
        assert_eq!(buf, [0xAA, 0xBB, 0xCC]);

        // nothing to do, nothing on the wire
        bus.transfer(addr(), &[], &mut []).unwrap();

        bus.into_inner().done();
    }

    #[test]
    fn register_helpers_prefix_the_register() {
        let expectations = [
            Transaction::write(ADDR, vec![0x03, 0x01, 0x02]),
            Transaction::write_read(ADDR, vec![0x11], vec![0x19, 0x40]),
        ];
        let bus = Arc::new(Bus::new("mock", I2cMock::new(&expectations)));

        bus.write_registers(addr(), 0x03, &[0x01, 0x02]).unwrap();
        let mut buf = [0u8; 2];
        bus.read_registers(addr(), 0x11, &mut buf).unwrap();
        assert_eq!(buf, [0x19, 0x40]);

        let bus = Arc::try_unwrap(bus).ok().unwrap();
        bus.into_inner().done();
    }

    #[test]
    fn oversized_payload_is_rejected_before_the_bus() {
        let bus = Bus::new("mock", I2cMock::new(&[]));

        let err = bus.write_registers(addr(), 0x00, &[0u8; 40]).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::OutOfRange { value: 40, .. })
        ));

        bus.into_inner().done();
    }

    #[test]
    fn failed_transfer_is_a_bus_error() {
        let expectations = [Transaction::write(ADDR, vec![0x0E, 0x05])
            .with_error(MockError::Io(ErrorKind::Other))];
        let bus = Bus::new("mock", I2cMock::new(&expectations));

        assert_eq!(
            bus.write(addr(), &[0x0E, 0x05]),
            Err(BusError::Transfer { address: ADDR })
        );

        bus.into_inner().done();
    }
}
