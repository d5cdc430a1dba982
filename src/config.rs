use std::{str::FromStr, time::Duration};

use anyhow::Context;

use crate::driver::{
    maxim::ds3231,
    sensirion::sht3x::{self, ClockMode, Repeatability},
};

const PREFIX: &str = "DESKCLOCK_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub i2c_bus: String,
    pub rtc_address: u8,
    pub sht3x_address: u8,
    /// BCM number of the GPIO driving the sensor's nRESET line.
    pub sht3x_reset_pin: Option<u8>,
    /// BCM number of the GPIO wired to the RTC's INT/SQW output.
    pub alarm_pin: Option<u8>,
    pub clock_mode: ClockMode,
    pub repeatability: Repeatability,
    pub poll_period: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            i2c_bus: "i2c1".to_owned(),
            rtc_address: ds3231::ADDRESS,
            sht3x_address: sht3x::ADDRESS_PD,
            sht3x_reset_pin: None,
            alarm_pin: None,
            clock_mode: ClockMode::default(),
            repeatability: Repeatability::default(),
            poll_period: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Defaults, overridden by any `DESKCLOCK_*` variables that are set.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str| {
            let key = format!("{PREFIX}{name}");
            lookup(key.as_str()).map(|value| (key, value))
        };

        let mut config = Self::default();

        if let Some((_, bus)) = var("I2C_BUS") {
            config.i2c_bus = bus;
        }
        if let Some((key, value)) = var("RTC_ADDRESS") {
            config.rtc_address = parse_number(&key, &value)?;
        }
        if let Some((key, value)) = var("SHT3X_ADDRESS") {
            config.sht3x_address = parse_number(&key, &value)?;
        }
        if let Some((key, value)) = var("SHT3X_RESET_PIN") {
            config.sht3x_reset_pin = Some(parse_number(&key, &value)?);
        }
        if let Some((key, value)) = var("ALARM_PIN") {
            config.alarm_pin = Some(parse_number(&key, &value)?);
        }
        if let Some((key, value)) = var("CLOCK_MODE") {
            config.clock_mode = parse_setting(&key, &value)?;
        }
        if let Some((key, value)) = var("REPEATABILITY") {
            config.repeatability = parse_setting(&key, &value)?;
        }
        if let Some((key, value)) = var("POLL_SECS") {
            let secs: u64 = parse_number(&key, &value)?;
            anyhow::ensure!(secs > 0, "{key} must be at least 1");
            config.poll_period = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

/// Parses decimal or `0x`-prefixed hex.
fn parse_number<N>(key: &str, value: &str) -> anyhow::Result<N>
where
    N: FromStr + TryFrom<u64>,
    <N as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    let value = value.trim();

    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => {
            let wide = u64::from_str_radix(hex, 16)
                .with_context(|| format!("{key}: {value:?} is not a hex number"))?;
            N::try_from(wide)
                .map_err(|_| anyhow::anyhow!("{key}: {value} is out of range"))
        }
        None => value
            .parse()
            .with_context(|| format!("{key}: {value:?} is not a number")),
    }
}

fn parse_setting<S>(key: &str, value: &str) -> anyhow::Result<S>
where
    S: FromStr,
    <S as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    value.trim().parse().with_context(|| format!("invalid {key}"))
}
