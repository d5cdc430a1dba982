use std::time::Duration;

pub mod bus;
pub mod error;
pub mod maxim;
pub mod sensirion;

pub use error::{ChecksumError, Error, ValidationError};

/// Blocking delay backed by the OS scheduler, so waiting threads yield the
/// processor instead of spinning.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl embedded_hal::blocking::delay::DelayMs<u32> for ThreadDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64))
    }
}
