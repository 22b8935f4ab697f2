//! In-memory serial endpoints.
//!
//! `MockCatalog` and `MockTransport` stand in for the host port list and the
//! serial driver so that sessions can be exercised without hardware. Each
//! `MockDevice` keeps its state behind an `Arc<Mutex<_>>`, so a test can hold
//! a handle to the device while the session owns the opened channel.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{Channel, Transport, ensure_not_busy};
use crate::catalog::{PortCatalog, PortDescriptor};
use crate::config::LineConfig;
use crate::error::{LineError, LineResult};

type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

#[derive(Default)]
struct DeviceState {
    /// Chunks queued for the host; one blocking read returns one chunk
    incoming: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    responder: Option<Responder>,
    refuse_open: bool,
    stall_writes: bool,
    open: bool,
    open_count: usize,
}

/// Simulated instrument behind one port
#[derive(Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        // A panicking test thread must not hide the device from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue bytes sent by the device, delivered as a single read
    pub fn push_incoming(&self, bytes: &[u8]) {
        self.state().incoming.push_back(bytes.to_vec());
    }

    /// Reply to every write with whatever `responder` returns.
    /// An empty reply sends nothing.
    pub fn respond_with(&self, responder: impl FnMut(&[u8]) -> Vec<u8> + Send + 'static) {
        self.state().responder = Some(Box::new(responder));
    }

    /// Make every open attempt on this device fail
    pub fn refuse_open(&self) {
        self.state().refuse_open = true;
    }

    /// Make transmissions never complete
    pub fn stall_writes(&self) {
        self.state().stall_writes = true;
    }

    /// Everything the host has written, one entry per write
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state().written.clone()
    }

    pub fn is_open(&self) -> bool {
        self.state().open
    }

    /// How many times the device has been opened
    pub fn open_count(&self) -> usize {
        self.state().open_count
    }

    pub fn pending(&self) -> usize {
        self.state().incoming.iter().map(Vec::len).sum()
    }
}

/// Fixed list of ports
#[derive(Clone, Default)]
pub struct MockCatalog {
    ports: Vec<PortDescriptor>,
}

impl MockCatalog {
    pub fn new(ports: Vec<PortDescriptor>) -> Self {
        MockCatalog { ports }
    }
}

impl PortCatalog for MockCatalog {
    fn available_ports(&self) -> LineResult<Vec<PortDescriptor>> {
        Ok(self.ports.clone())
    }
}

/// Opens `MockDevice`s by port name
#[derive(Clone, Default)]
pub struct MockTransport {
    devices: HashMap<String, MockDevice>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `device` at `name` and return a handle to it
    pub fn attach(&mut self, name: &str, device: MockDevice) -> MockDevice {
        self.devices.insert(name.to_string(), device.clone());
        device
    }
}

impl Transport for MockTransport {
    fn open(&self, port: &PortDescriptor, _config: &LineConfig) -> LineResult<Box<dyn Channel>> {
        ensure_not_busy(port)?;

        let device = self
            .devices
            .get(&port.name)
            .ok_or_else(|| LineError::OpenFailed {
                port: port.name.clone(),
                reason: "no such device".to_string(),
            })?;

        {
            let mut state = device.state();
            if state.refuse_open || state.open {
                return Err(LineError::OpenFailed {
                    port: port.name.clone(),
                    reason: "open refused".to_string(),
                });
            }
            state.open = true;
            state.open_count += 1;
        }

        Ok(Box::new(MockChannel {
            device: Some(device.clone()),
        }))
    }
}

struct MockChannel {
    device: Option<MockDevice>,
}

impl MockChannel {
    fn device(&self) -> LineResult<&MockDevice> {
        self.device.as_ref().ok_or(LineError::NotOpen)
    }
}

impl Channel for MockChannel {
    fn is_open(&self) -> bool {
        self.device.is_some()
    }

    fn write(&mut self, bytes: &[u8]) -> LineResult<()> {
        let mut state = self.device()?.state();
        state.written.push(bytes.to_vec());

        let reply = state.responder.as_mut().map(|respond| respond(bytes));
        if let Some(reply) = reply.filter(|reply| !reply.is_empty()) {
            state.incoming.push_back(reply);
        }
        Ok(())
    }

    fn wait_for_bytes_written(&mut self, _timeout: Duration) -> LineResult<bool> {
        Ok(!self.device()?.state().stall_writes)
    }

    fn bytes_available(&mut self) -> LineResult<usize> {
        Ok(self.device()?.pending())
    }

    fn read_available(&mut self) -> LineResult<Vec<u8>> {
        let mut state = self.device()?.state();
        Ok(state.incoming.drain(..).flatten().collect())
    }

    fn read(&mut self, _max_wait: Duration) -> LineResult<Vec<u8>> {
        // An empty queue behaves like an elapsed timeout
        Ok(self.device()?.state().incoming.pop_front().unwrap_or_default())
    }

    fn close(&mut self) {
        if let Some(device) = self.device.take() {
            device.state().open = false;
        }
    }
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_descriptor_is_refused() {
        let mut transport = MockTransport::new();
        let device = transport.attach("COM1", MockDevice::new());
        let port = PortDescriptor {
            busy: true,
            ..PortDescriptor::new("COM1")
        };

        let result = transport.open(&port, &LineConfig::default());
        assert!(matches!(result, Err(LineError::PortBusy(name)) if name == "COM1"));
        assert_eq!(device.open_count(), 0);
    }

    #[test]
    fn unknown_port_fails_to_open() {
        let transport = MockTransport::new();
        let result = transport.open(&PortDescriptor::new("COM9"), &LineConfig::default());
        assert!(matches!(result, Err(LineError::OpenFailed { .. })));
    }

    #[test]
    fn flush_stale_drains_queued_bytes() {
        let mut transport = MockTransport::new();
        let device = transport.attach("COM1", MockDevice::new());
        device.push_incoming(b"garbage");
        device.push_incoming(b" from last run");

        let mut channel = transport
            .open(&PortDescriptor::new("COM1"), &LineConfig::default())
            .unwrap();
        assert_eq!(channel.flush_stale().unwrap(), 21);
        assert_eq!(device.pending(), 0);
        assert_eq!(channel.flush_stale().unwrap(), 0);
    }

    #[test]
    fn close_is_idempotent() {
        let mut transport = MockTransport::new();
        let device = transport.attach("COM1", MockDevice::new());
        let mut channel = transport
            .open(&PortDescriptor::new("COM1"), &LineConfig::default())
            .unwrap();

        channel.close();
        channel.close();
        assert!(!channel.is_open());
        assert!(!device.is_open());
        assert!(matches!(channel.write(b"x"), Err(LineError::NotOpen)));
    }
}
