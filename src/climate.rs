use std::{sync::Arc, thread::JoinHandle};

use anyhow::Context;
use deskclock::{
    config::Config,
    driver::{bus::Transport, sensirion::sht3x::Sht3x, Error, ThreadDelay},
};
use rppal::gpio::{Gpio, OutputPin};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{util::Interval, Event};

fn reset_pin(pin: u8) -> anyhow::Result<OutputPin> {
    Ok(Gpio::new()
        .context("failed to open gpio")?
        .get(pin)
        .with_context(|| format!("failed to get gpio {pin}"))?
        .into_output_high())
}

pub fn spawn_thread<T>(
    ct: CancellationToken,
    bus: Arc<T>,
    config: &Config,
    evt_tx: flume::Sender<Event>,
) -> JoinHandle<anyhow::Result<()>>
where
    T: Transport + Send + Sync + 'static,
{
    let address = config.sht3x_address;
    let pin = config.sht3x_reset_pin;
    let clock = config.clock_mode;
    let repeatability = config.repeatability;
    let period = config.poll_period;

    std::thread::spawn(move || {
        let pin = pin.map(reset_pin).transpose()?;
        let has_pin = pin.is_some();
        let sht = Sht3x::new(bus, address, pin, clock, repeatability, ThreadDelay)
            .context("failed to attach sht3x")?;

        // start from a known state when the reset line is wired
        if has_pin {
            sht.hard_reset().context("failed to reset sht3x")?;
            sht.clear_status().context("failed to clear sht3x status")?;
        }

        let serial = sht
            .read_serial_number()
            .context("failed to read sht3x serial number")?;
        debug!("initialized sht3x, serial number = {serial:08x}");

        let mut interval = Interval::new(period);

        while !ct.is_cancelled() {
            match sht.read_single_shot() {
                Ok(reading) => {
                    debug!(
                        "{:.2}°C, {:.1}%RH",
                        sht.temperature(),
                        sht.humidity()
                    );
                    let _ = evt_tx.send(Event::Climate(reading));
                }
                // a corrupted frame is worth retrying at the next poll
                Err(Error::Checksum(err)) => warn!("dropped sht3x measurement: {err}"),
                Err(err) => return Err(err).context("failed to read sht3x"),
            }

            interval.tick();
        }

        debug!("climate thread cancelled");

        Ok(())
    })
}
