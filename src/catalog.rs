use serialport::SerialPortType;
use tracing::{debug, warn};

use crate::error::{LineError, LineResult};

/// Snapshot of one serial endpoint visible on the host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortDescriptor {
    /// System location, e.g. `/dev/ttyUSB0` or `COM3`
    pub name: String,
    pub busy: bool,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

impl PortDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        PortDescriptor {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl From<serialport::SerialPortInfo> for PortDescriptor {
    fn from(info: serialport::SerialPortInfo) -> Self {
        let mut port = PortDescriptor::new(info.port_name);
        if let SerialPortType::UsbPort(usb) = info.port_type {
            port.manufacturer = usb.manufacturer;
            port.product = usb.product;
            port.serial_number = usb.serial_number;
            port.vid = Some(usb.vid);
            port.pid = Some(usb.pid);
        }
        port
    }
}

pub trait PortCatalog {
    /// Currently visible serial endpoints. An empty list is not an error.
    fn available_ports(&self) -> LineResult<Vec<PortDescriptor>>;
}

/// Ports enumerated by the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCatalog;

impl PortCatalog for SystemCatalog {
    fn available_ports(&self) -> LineResult<Vec<PortDescriptor>> {
        let ports = serialport::available_ports().map_err(|e| {
            LineError::Communication(format!("Could not get available ports. Err {:?}", e))
        })?;

        if ports.is_empty() {
            warn!("{}", LineError::NoPortsAvailable);
        }

        let ports: Vec<PortDescriptor> = ports.into_iter().map(PortDescriptor::from).collect();
        debug!("Found ports {:?}", ports.iter().map(|p| &p.name).collect::<Vec<_>>());
        Ok(ports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::{SerialPortInfo, UsbPortInfo};

    #[test]
    fn usb_metadata_is_carried_over() {
        let info = SerialPortInfo {
            port_name: "/dev/ttyUSB0".to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid: 0x067b,
                pid: 0x2303,
                serial_number: Some("A1".to_string()),
                manufacturer: Some("Prolific".to_string()),
                product: Some("USB-Serial Controller".to_string()),
            }),
        };

        let port = PortDescriptor::from(info);
        assert_eq!(port.name, "/dev/ttyUSB0");
        assert!(!port.busy);
        assert_eq!(port.manufacturer.as_deref(), Some("Prolific"));
        assert_eq!(port.vid, Some(0x067b));
        assert_eq!(port.pid, Some(0x2303));
    }

    #[test]
    fn builtin_ports_have_no_usb_identity() {
        let info = SerialPortInfo {
            port_name: "/dev/ttyS0".to_string(),
            port_type: SerialPortType::Unknown,
        };

        let port = PortDescriptor::from(info);
        assert_eq!(port, PortDescriptor::new("/dev/ttyS0"));
    }
}
