use std::time::{Duration, Instant};

/// Paces a polling loop: each `tick` sleeps away whatever is left of the
/// period since the previous one.
pub struct Interval {
    last_tick: Instant,
    period: Duration,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Self {
            last_tick: Instant::now(),
            period,
        }
    }

    pub fn tick(&mut self) {
        let current_tick = Instant::now();
        let last_tick_duration = current_tick - self.last_tick;

        if last_tick_duration < self.period {
            std::thread::sleep(self.period - last_tick_duration);
        }

        self.last_tick = Instant::now();
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, Instant};

    use super::Interval;

    #[test]
    fn tick_waits_out_the_period() {
        let mut interval = Interval::new(Duration::from_millis(20));

        let start = Instant::now();
        interval.tick();
        interval.tick();
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn slow_iterations_do_not_sleep() {
        let mut interval = Interval::new(Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(10));

        let start = Instant::now();
        interval.tick();
        assert!(start.elapsed() < Duration::from_millis(5));
    }
}
