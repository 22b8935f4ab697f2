use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use tracing::{debug, trace};

use super::{Channel, Transport, ensure_not_busy};
use crate::catalog::PortDescriptor;
use crate::config::LineConfig;
use crate::constants::READ_CHUNK_SIZE;
use crate::error::{LineError, LineResult};

/// Opens host serial ports through the `serialport` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortTransport;

impl Transport for SerialPortTransport {
    fn open(&self, port: &PortDescriptor, config: &LineConfig) -> LineResult<Box<dyn Channel>> {
        ensure_not_busy(port)?;

        let serial_port = serialport::new(port.name.as_str(), config.baud_rate)
            .data_bits(config.data_bits)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .timeout(config.timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::Io(ErrorKind::ResourceBusy) => {
                    LineError::PortBusy(port.name.clone())
                }
                _ => LineError::OpenFailed {
                    port: port.name.clone(),
                    reason: e.to_string(),
                },
            })?;

        debug!("Opened {} at {} baud", port.name, config.baud_rate);
        Ok(Box::new(SerialPortChannel {
            name: port.name.clone(),
            serial_port: Some(serial_port),
        }))
    }
}

/// Channel backed by an opened host serial port
pub struct SerialPortChannel {
    name: String,
    serial_port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialPortChannel {
    fn port(&mut self) -> LineResult<&mut Box<dyn serialport::SerialPort>> {
        self.serial_port.as_mut().ok_or(LineError::NotOpen)
    }
}

impl Channel for SerialPortChannel {
    fn is_open(&self) -> bool {
        self.serial_port.is_some()
    }

    fn write(&mut self, bytes: &[u8]) -> LineResult<()> {
        self.port()?
            .write_all(bytes)
            .map_err(|e| LineError::Communication(format!("{:?}", e)))?;
        trace!("Sent bytes {:?}", bytes);
        Ok(())
    }

    // The timeout only applies where the driver supports a timed drain; POSIX
    // tcdrain blocks until the output queue is empty.
    fn wait_for_bytes_written(&mut self, timeout: Duration) -> LineResult<bool> {
        let port = self.port()?;
        port.set_timeout(timeout)
            .map_err(|e| LineError::Communication(format!("{:?}", e)))?;

        match port.flush() {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(false),
            Err(e) => Err(LineError::Communication(format!("{:?}", e))),
        }
    }

    fn bytes_available(&mut self) -> LineResult<usize> {
        let count = self
            .port()?
            .bytes_to_read()
            .map_err(|e| LineError::Communication(format!("{:?}", e)))?;
        Ok(count as usize)
    }

    fn read_available(&mut self) -> LineResult<Vec<u8>> {
        let available = self.bytes_available()?;
        if available == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0; available];
        let size = self
            .port()?
            .read(&mut buffer)
            .map_err(|e| LineError::Communication(format!("{:?}", e)))?;
        buffer.truncate(size);
        trace!("Received bytes {:?}", buffer);
        Ok(buffer)
    }

    fn read(&mut self, max_wait: Duration) -> LineResult<Vec<u8>> {
        let port = self.port()?;
        port.set_timeout(max_wait)
            .map_err(|e| LineError::Communication(format!("{:?}", e)))?;

        let mut buffer = vec![0; READ_CHUNK_SIZE];
        let size = port
            .read(&mut buffer)
            // Timeout error is fine, the caller decides what to do with it
            .or_else(|e| {
                if e.kind() == ErrorKind::TimedOut {
                    Ok(0)
                } else {
                    Err(e)
                }
            })
            .map_err(|e| LineError::Communication(format!("{:?}", e)))?;

        buffer.truncate(size);
        trace!("Received bytes {:?}", buffer);
        Ok(buffer)
    }

    fn close(&mut self) {
        if self.serial_port.take().is_some() {
            debug!("Closed {}", self.name);
        }
    }
}
