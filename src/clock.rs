use std::{sync::Arc, thread::JoinHandle, time::Duration};

use anyhow::Context;
use deskclock::driver::{
    bus::Transport,
    maxim::ds3231::{control::AlarmId, Ds3231},
};
use rppal::gpio::{Gpio, InputPin, Trigger};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{util::Interval, Event};

const TICK: Duration = Duration::from_secs(1);

/// Forwards falling edges on the RTC's INT/SQW line into a channel. The pin
/// has to stay alive for as long as the interrupt should fire.
fn watch_alarm_pin(pin: u8) -> anyhow::Result<(InputPin, flume::Receiver<()>)> {
    let (tx, rx) = flume::bounded(8);

    let mut pin = Gpio::new()
        .context("failed to open gpio")?
        .get(pin)
        .with_context(|| format!("failed to get gpio {pin}"))?
        .into_input_pullup();

    pin.set_async_interrupt(Trigger::FallingEdge, move |_| {
        // a full channel already means a check is pending
        let _ = tx.try_send(());
    })
    .context("failed to watch alarm pin")?;

    Ok((pin, rx))
}

fn check_alarms<T: Transport>(
    rtc: &Ds3231<T>,
    evt_tx: &flume::Sender<Event>,
) -> anyhow::Result<()> {
    for which in [AlarmId::Alarm1, AlarmId::Alarm2] {
        if rtc.has_alarm_fired(which)? {
            info!("{which:?} fired");
            let _ = evt_tx.send(Event::Alarm(which));
        }
    }

    Ok(())
}

pub fn spawn_thread<T>(
    ct: CancellationToken,
    bus: Arc<T>,
    address: u8,
    alarm_pin: Option<u8>,
    evt_tx: flume::Sender<Event>,
) -> JoinHandle<anyhow::Result<()>>
where
    T: Transport + Send + Sync + 'static,
{
    std::thread::spawn(move || {
        let rtc = Ds3231::new(bus, address).context("failed to attach ds3231")?;

        if rtc
            .oscillator_stopped()
            .context("failed to read ds3231 status")?
        {
            warn!("ds3231 oscillator has stopped, the time needs to be set");
        }

        let temperature = rtc.temperature().context("failed to read ds3231 temperature")?;
        debug!("initialized ds3231, die temperature = {temperature:.2}°C");

        // without the interrupt line the flags are polled once per tick
        let alarm = alarm_pin.map(watch_alarm_pin).transpose()?;

        // a flag latched while nobody was listening holds INT/SQW low, and no
        // edge will follow until it is consumed
        check_alarms(&rtc, &evt_tx)?;

        let mut interval = Interval::new(TICK);

        while !ct.is_cancelled() {
            let time = rtc.time().context("failed to read time")?;
            trace!("time is {time}");
            let _ = evt_tx.send(Event::Tick(time));

            let pending = match &alarm {
                Some((pin, edges)) => edges.try_iter().count() > 0 || pin.is_low(),
                None => true,
            };

            if pending {
                check_alarms(&rtc, &evt_tx)?;
            }

            interval.tick();
        }

        debug!("clock thread cancelled");

        Ok(())
    })
}

#[cfg(test)]
mod test {
    use deskclock::driver::{bus::Bus, maxim::ds3231::ADDRESS};
    use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction};

    use super::*;

    #[test]
    fn latched_flags_are_consumed_and_reported() {
        let expectations = [
            Transaction::write_read(ADDRESS, vec![0x0F], vec![0x03]),
            Transaction::write(ADDRESS, vec![0x0F, 0x02]),
            Transaction::write_read(ADDRESS, vec![0x0F], vec![0x02]),
            Transaction::write(ADDRESS, vec![0x0F, 0x00]),
        ];
        let rtc = Ds3231::new(Bus::new("mock", I2cMock::new(&expectations)), ADDRESS).unwrap();
        let (evt_tx, evt_rx) = flume::unbounded();

        check_alarms(&rtc, &evt_tx).unwrap();

        let fired: Vec<_> = evt_rx
            .try_iter()
            .map(|evt| match evt {
                Event::Alarm(which) => which,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(fired, vec![AlarmId::Alarm1, AlarmId::Alarm2]);

        rtc.destroy().into_inner().done();
    }

    #[test]
    fn quiet_flags_send_nothing() {
        let expectations = [
            Transaction::write_read(ADDRESS, vec![0x0F], vec![0x80]),
            Transaction::write(ADDRESS, vec![0x0F, 0x80]),
            Transaction::write_read(ADDRESS, vec![0x0F], vec![0x80]),
            Transaction::write(ADDRESS, vec![0x0F, 0x80]),
        ];
        let rtc = Ds3231::new(Bus::new("mock", I2cMock::new(&expectations)), ADDRESS).unwrap();
        let (evt_tx, evt_rx) = flume::unbounded();

        check_alarms(&rtc, &evt_tx).unwrap();
        assert!(evt_rx.is_empty());

        rtc.destroy().into_inner().done();
    }
}
