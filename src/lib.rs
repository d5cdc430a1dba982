//! Bus-transaction layer of a desk clock: a shared I2C transport, a DS3231
//! real-time clock driver and an SHT3x humidity/temperature sensor driver.

pub mod config;
pub mod driver;
