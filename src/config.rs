use std::time::Duration;

use serialport::{DataBits, Parity, StopBits};

use crate::catalog::PortDescriptor;
use crate::constants::{DEFAULT_BAUD_RATE, DEFAULT_DELIMITER, DEFAULT_TIMEOUT_MS};

/// Receive discipline of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Blocking calls; replies are read with `get_data`/`handshake`
    Sync,

    /// Notification driven; replies are delivered through `data_ready`
    #[default]
    Async,
}

/// Line parameters of a session. Only `mode` may change once the
/// session is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineConfig {
    pub delimiter: Vec<u8>,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub timeout: Duration,
    pub mode: Mode,
}

impl Default for LineConfig {
    fn default() -> Self {
        LineConfig {
            delimiter: DEFAULT_DELIMITER.to_vec(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            mode: Mode::default(),
        }
    }
}

impl LineConfig {
    pub fn with_delimiter(mut self, delimiter: impl Into<Vec<u8>>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}

/// Narrows discovery to ports whose identity metadata matches.
/// An empty filter accepts every port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortFilter {
    /// Case-insensitive substring of the USB manufacturer string
    pub manufacturer: Option<String>,

    /// Accepted USB product ids
    pub product_ids: Vec<u16>,
}

impl PortFilter {
    pub fn matches(&self, port: &PortDescriptor) -> bool {
        if let Some(wanted) = &self.manufacturer {
            let wanted = wanted.to_lowercase();
            match &port.manufacturer {
                Some(manufacturer) if manufacturer.to_lowercase().contains(&wanted) => {}
                _ => return false,
            }
        }

        if !self.product_ids.is_empty() {
            return port.pid.is_some_and(|pid| self.product_ids.contains(&pid));
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usb_port(manufacturer: &str, pid: u16) -> PortDescriptor {
        PortDescriptor {
            manufacturer: Some(manufacturer.to_string()),
            pid: Some(pid),
            ..PortDescriptor::new("/dev/ttyUSB0")
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = LineConfig::default();
        assert_eq!(config.delimiter, b"\r");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.timeout, Duration::from_millis(1000));
        assert_eq!(config.mode, Mode::Async);
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = PortFilter::default();
        assert!(filter.matches(&PortDescriptor::new("COM3")));
        assert!(filter.matches(&usb_port("FTDI", 0x6001)));
    }

    #[test]
    fn manufacturer_filter_is_case_insensitive() {
        let filter = PortFilter {
            manufacturer: Some("prolific".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&usb_port("Prolific Technology Inc.", 0x2303)));
        assert!(!filter.matches(&usb_port("FTDI", 0x6001)));
        assert!(!filter.matches(&PortDescriptor::new("/dev/ttyS0")));
    }

    #[test]
    fn product_filter_requires_listed_pid() {
        let filter = PortFilter {
            product_ids: vec![0x2303, 0x7523],
            ..Default::default()
        };
        assert!(filter.matches(&usb_port("Prolific", 0x2303)));
        assert!(!filter.matches(&usb_port("FTDI", 0x6001)));
    }
}
