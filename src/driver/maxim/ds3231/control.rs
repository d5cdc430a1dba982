//! Control (0x0E) and status (0x0F) register transforms.
//!
//! The driver reads the current byte, computes the new one here and writes
//! it back, so every read-modify-write step is a plain function of the byte.

pub mod bits {
    /// Control: alarm 1 interrupt enable.
    pub const A1IE: u8 = 0x01;
    /// Control: alarm 2 interrupt enable.
    pub const A2IE: u8 = 0x02;
    /// Control: route alarms to INT/SQW instead of the square wave.
    pub const INTCN: u8 = 0x04;

    /// Status: alarm 1 fired.
    pub const A1F: u8 = 0x01;
    /// Status: alarm 2 fired.
    pub const A2F: u8 = 0x02;
    /// Status: oscillator stopped since the flag was last cleared.
    pub const OSF: u8 = 0x80;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AlarmId {
    Alarm1,
    Alarm2,
}

impl From<u8> for AlarmId {
    /// `1` selects alarm 1; any other number selects alarm 2.
    fn from(n: u8) -> Self {
        match n {
            1 => AlarmId::Alarm1,
            _ => AlarmId::Alarm2,
        }
    }
}

impl AlarmId {
    const fn enable_bit(self) -> u8 {
        match self {
            AlarmId::Alarm1 => bits::A1IE,
            AlarmId::Alarm2 => bits::A2IE,
        }
    }

    const fn flag_bit(self) -> u8 {
        match self {
            AlarmId::Alarm1 => bits::A1F,
            AlarmId::Alarm2 => bits::A2F,
        }
    }
}

/// An alarm can only raise INT/SQW while INTCN is set, so its own enable bit
/// alone does not count.
pub const fn alarm_interrupt_enabled(control: u8, which: AlarmId) -> bool {
    control & bits::INTCN != 0 && control & which.enable_bit() != 0
}

pub const fn enable_alarm_interrupt(control: u8, which: AlarmId) -> u8 {
    control | bits::INTCN | which.enable_bit()
}

pub const fn disable_alarm_interrupt(control: u8, which: AlarmId) -> u8 {
    control & !which.enable_bit()
}

/// Returns whether `which` fired and the status byte to write back, which
/// differs from `status` only in that alarm's flag.
pub const fn consume_alarm_fired(status: u8, which: AlarmId) -> (bool, u8) {
    let flag = which.flag_bit();
    (status & flag != 0, status & !flag)
}

pub const fn oscillator_stopped(status: u8) -> bool {
    status & bits::OSF != 0
}
