use std::{sync::Arc, time::Duration};

use anyhow::Context;
use deskclock::{
    config::Config,
    driver::{
        bus::find_bus,
        maxim::ds3231::{control::AlarmId, time::WallClockTime},
        sensirion::sht3x::Reading,
    },
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use tracing_subscriber::EnvFilter;

mod climate;
mod clock;
mod util;

#[derive(Debug, Clone, Copy)]
pub enum Event {
    Tick(WallClockTime),
    Alarm(AlarmId),
    Climate(Reading),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    debug!("{config:?}");

    let ct = CancellationToken::new();

    {
        let ct = ct.clone();
        ctrlc::set_handler(move || {
            info!("received ctrl+c, exiting");
            ct.cancel();
        })?;
    }

    let bus = Arc::new(
        find_bus(&config.i2c_bus)
            .with_context(|| format!("failed to open i2c bus {}", config.i2c_bus))?,
    );
    info!("started on {}", bus.name());

    let (evt_tx, evt_rx) = flume::bounded(256);

    let clock_join = clock::spawn_thread(
        ct.clone(),
        bus.clone(),
        config.rtc_address,
        config.alarm_pin,
        evt_tx.clone(),
    );
    let climate_join = climate::spawn_thread(ct.clone(), bus, &config, evt_tx);

    loop {
        match evt_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(Event::Tick(time)) => trace!("{time}"),
            Ok(Event::Alarm(which)) => info!("alarm: {which:?}"),
            Ok(Event::Climate(reading)) => debug!("climate: {reading:?}"),
            Err(flume::RecvTimeoutError::Timeout) => {}
            // both threads have dropped their senders
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }

        // one thread failing takes the other one down with it
        if clock_join.is_finished() || climate_join.is_finished() {
            ct.cancel();
        }
    }

    let clock_result = clock_join
        .join()
        .map_err(|_| anyhow::anyhow!("clock thread panicked"))?;
    let climate_result = climate_join
        .join()
        .map_err(|_| anyhow::anyhow!("climate thread panicked"))?;

    clock_result?;
    climate_result?;

    info!("exit");

    Ok(())
}
