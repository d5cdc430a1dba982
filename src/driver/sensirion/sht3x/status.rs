/// The sensor's 16-bit status register.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub u16);

impl Status {
    pub const ALERT_PENDING: u16 = 1 << 15;
    pub const HEATER: u16 = 1 << 13;
    pub const RH_TRACKING_ALERT: u16 = 1 << 11;
    pub const T_TRACKING_ALERT: u16 = 1 << 10;
    pub const RESET_DETECTED: u16 = 1 << 4;
    pub const COMMAND_FAILED: u16 = 1 << 1;
    pub const WRITE_CHECKSUM_FAILED: u16 = 1 << 0;

    fn bit(self, mask: u16) -> bool {
        self.0 & mask != 0
    }

    pub fn alert_pending(self) -> bool {
        self.bit(Self::ALERT_PENDING)
    }

    pub fn heater_on(self) -> bool {
        self.bit(Self::HEATER)
    }

    pub fn humidity_alert(self) -> bool {
        self.bit(Self::RH_TRACKING_ALERT)
    }

    pub fn temperature_alert(self) -> bool {
        self.bit(Self::T_TRACKING_ALERT)
    }

    /// Set after a power-up, soft reset or hard reset.
    pub fn reset_detected(self) -> bool {
        self.bit(Self::RESET_DETECTED)
    }

    /// The last command was not processed.
    pub fn command_failed(self) -> bool {
        self.bit(Self::COMMAND_FAILED)
    }

    pub fn write_checksum_failed(self) -> bool {
        self.bit(Self::WRITE_CHECKSUM_FAILED)
    }
}

impl From<u16> for Status {
    fn from(word: u16) -> Self {
        Self(word)
    }
}

#[cfg(test)]
mod test {
    use super::Status;

    #[test]
    fn decode_bits() {
        let status = Status::from(0x8010);
        assert!(status.alert_pending());
        assert!(status.reset_detected());
        assert!(!status.heater_on());
        assert!(!status.command_failed());

        let status = Status::from(0x2C03);
        assert!(status.heater_on());
        assert!(status.humidity_alert());
        assert!(status.temperature_alert());
        assert!(status.command_failed());
        assert!(status.write_checksum_failed());
    }
}
