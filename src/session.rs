use std::sync::mpsc;

use tracing::{debug, error, info, warn};

use crate::catalog::{PortCatalog, PortDescriptor, SystemCatalog};
use crate::config::{LineConfig, Mode, PortFilter};
use crate::error::{LineError, LineResult};
use crate::events::DataReady;
use crate::framer::ReceiveBuffer;
use crate::identify::{AlwaysIdentify, Identify};
use crate::transport::serialport::SerialPortTransport;
use crate::transport::{Channel, Transport};

/// Binding between the channel's bytes-available notification and the
/// asynchronous receive path. Connecting an already bound path is a no-op.
#[derive(Debug, Default)]
struct ReadyRead {
    bound: bool,
}

impl ReadyRead {
    fn connect(&mut self) {
        self.bound = true;
    }

    fn disconnect(&mut self) {
        self.bound = false;
    }
}

/// Assembles a `DeviceSession`. Without an explicit port, the session
/// discovers one when opened.
pub struct SessionBuilder {
    config: LineConfig,
    port: Option<PortDescriptor>,
    filter: PortFilter,
    catalog: Box<dyn PortCatalog + Send>,
    transport: Box<dyn Transport + Send>,
    identify: Box<dyn Identify + Send>,
}

impl SessionBuilder {
    pub fn port(mut self, port: PortDescriptor) -> Self {
        self.port = Some(port);
        self
    }

    pub fn filter(mut self, filter: PortFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn catalog(mut self, catalog: impl PortCatalog + Send + 'static) -> Self {
        self.catalog = Box::new(catalog);
        self
    }

    pub fn transport(mut self, transport: impl Transport + Send + 'static) -> Self {
        self.transport = Box::new(transport);
        self
    }

    pub fn identify(mut self, identify: impl Identify + Send + 'static) -> Self {
        self.identify = Box::new(identify);
        self
    }

    /// Acquire the device. Fails with `DeviceNotFound` if no port both
    /// opens and identifies.
    pub fn open(self) -> LineResult<DeviceSession> {
        let mut session = DeviceSession {
            config: self.config,
            filter: self.filter,
            catalog: self.catalog,
            transport: self.transport,
            identify: self.identify,
            channel: None,
            port: None,
            buffer: ReceiveBuffer::new(),
            ready_read: ReadyRead::default(),
            data_ready: DataReady::default(),
        };

        match self.port {
            Some(port) => {
                if !session.setup(&port) {
                    return Err(LineError::DeviceNotFound);
                }
            }
            None => session.discover()?,
        }

        Ok(session)
    }
}

/// An instrument attached to a serial port, exchanging delimiter
/// terminated text messages
pub struct DeviceSession {
    config: LineConfig,
    filter: PortFilter,
    catalog: Box<dyn PortCatalog + Send>,
    transport: Box<dyn Transport + Send>,
    identify: Box<dyn Identify + Send>,
    channel: Option<Box<dyn Channel>>,
    port: Option<PortDescriptor>,
    buffer: ReceiveBuffer,
    ready_read: ReadyRead,
    data_ready: DataReady,
}

impl DeviceSession {
    /// Session on the host's serial ports, accepting any device
    pub fn new(config: LineConfig, port: Option<PortDescriptor>) -> LineResult<Self> {
        let builder = Self::builder(config);
        match port {
            Some(port) => builder.port(port).open(),
            None => builder.open(),
        }
    }

    pub fn builder(config: LineConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            port: None,
            filter: PortFilter::default(),
            catalog: Box::new(SystemCatalog),
            transport: Box::new(SerialPortTransport),
            identify: Box::new(AlwaysIdentify),
        }
    }

    /// Probe the catalog in order and keep the first port that opens and
    /// identifies. Every other port is left closed.
    pub fn discover(&mut self) -> LineResult<()> {
        self.close();

        let ports = self.catalog.available_ports()?;
        if ports.is_empty() {
            warn!("{}", LineError::NoPortsAvailable);
        }

        for port in ports {
            if !self.filter.matches(&port) {
                debug!("Skipping {}: does not match {:?}", port.name, self.filter);
                continue;
            }
            if self.setup(&port) {
                return Ok(());
            }
        }

        Err(LineError::DeviceNotFound)
    }

    /// Open `port`, flush stale bytes and identify the device on it.
    /// Returns false, leaving the session closed, if any step fails.
    pub fn setup(&mut self, port: &PortDescriptor) -> bool {
        self.close();
        debug!("Setting up {}", port.name);

        let mut channel = match self.transport.open(port, &self.config) {
            Ok(channel) => channel,
            Err(LineError::PortBusy(name)) => {
                debug!("Port is busy: {}", name);
                return false;
            }
            Err(e) => {
                debug!("Could not open port: {}", e);
                return false;
            }
        };

        if let Err(e) = channel.flush_stale() {
            debug!("Could not clear {}: {}", port.name, e);
            channel.close();
            return false;
        }

        self.channel = Some(channel);
        self.port = Some(port.clone());

        if self.run_identify() {
            info!("Device found at {}", port.name);
            true
        } else {
            self.close();
            debug!("Device not connected to {}", port.name);
            false
        }
    }

    /// Run the identification check in synchronous mode, then apply the
    /// configured mode
    fn run_identify(&mut self) -> bool {
        let mode = self.config.mode;
        let mut identify = std::mem::replace(&mut self.identify, Box::new(AlwaysIdentify));

        self.set_mode(Mode::Sync);
        let identified = identify.identify(self);
        self.buffer.clear();
        self.set_mode(mode);

        self.identify = identify;
        identified
    }

    /// Select the receive discipline. Any existing notification binding is
    /// removed first; asynchronous mode then binds the receive path.
    pub fn set_mode(&mut self, mode: Mode) {
        self.ready_read.disconnect();
        self.config.mode = mode;
        if mode == Mode::Async {
            self.ready_read.connect();
        }
    }

    /// Write `text` followed by the delimiter
    pub fn send_data(&mut self, text: &str) -> LineResult<()> {
        let mut command = text.as_bytes().to_vec();
        command.extend_from_slice(&self.config.delimiter);

        let timeout = self.config.timeout;
        let sync = self.config.mode == Mode::Sync;
        let channel = self.channel_mut()?;

        channel.write(&command)?;
        if sync && !channel.wait_for_bytes_written(timeout)? {
            warn!("{}: {}", LineError::WriteTimeout(timeout), text);
            return Ok(());
        }
        debug!("Data sent: {}", text);
        Ok(())
    }

    /// Read until a complete message arrives.
    ///
    /// Stops at the first read that times out and returns whatever text is
    /// buffered at that point, which may be an unterminated fragment.
    pub fn get_data(&mut self) -> LineResult<String> {
        let timeout = self.config.timeout;

        loop {
            if let Some(message) = self.buffer.try_extract(&self.config.delimiter)? {
                debug!("get_data received {} bytes: {}", message.len(), message);
                return Ok(message);
            }

            let bytes = self.channel_mut()?.read(timeout)?;
            if bytes.is_empty() {
                debug!("get_data: {}", LineError::ReadTimeout(timeout));
                break;
            }
            self.buffer.append(&bytes);
        }

        let message = self.buffer.take_partial()?;
        debug!("get_data received {} bytes: {}", message.len(), message);
        Ok(message)
    }

    /// Send `text` and return the reply. Only available in synchronous mode;
    /// in asynchronous mode nothing is sent and the reply is empty.
    pub fn handshake(&mut self, text: &str) -> LineResult<String> {
        if self.config.mode != Mode::Sync {
            error!(
                "{}",
                LineError::Mode("Cannot handshake data in asynchronous mode".to_string())
            );
            return Ok(String::new());
        }

        self.send_data(text)?;
        self.get_data()
    }

    /// Dispatch pending bytes to the asynchronous receive path. Returns the
    /// number of messages emitted through `data_ready`.
    pub fn process_events(&mut self) -> LineResult<usize> {
        let Some(channel) = self.channel.as_mut() else {
            return Ok(0);
        };
        if !self.ready_read.bound || channel.bytes_available()? == 0 {
            return Ok(0);
        }

        Ok(usize::from(self.receive()?))
    }

    fn receive(&mut self) -> LineResult<bool> {
        let bytes = self.channel_mut()?.read_available()?;
        if bytes.is_empty() {
            return Ok(false);
        }

        debug!("Data received");
        self.buffer.append(&bytes);
        match self.buffer.try_extract(&self.config.delimiter) {
            Ok(Some(message)) => {
                debug!("EOL character received");
                self.data_ready.emit(&message);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => {
                warn!("Dropped message: {}", e);
                Ok(false)
            }
        }
    }

    /// Receive every message emitted in asynchronous mode
    pub fn subscribe(&mut self) -> mpsc::Receiver<String> {
        self.data_ready.subscribe()
    }

    /// Release the port and drop buffered bytes. Safe to call at any time.
    pub fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.port = None;
        self.buffer.clear();
    }

    pub fn is_open(&self) -> bool {
        self.channel.as_ref().is_some_and(|channel| channel.is_open())
    }

    pub fn port(&self) -> Option<&PortDescriptor> {
        self.port.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    pub fn buffered(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// Number of bindings (0 or 1) between the bytes-available notification and
    /// the asynchronous receive path
    pub fn notification_bindings(&self) -> usize {
        usize::from(self.ready_read.bound)
    }

    fn channel_mut(&mut self) -> LineResult<&mut Box<dyn Channel>> {
        self.channel.as_mut().ok_or(LineError::NotOpen)
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.close();
    }
}
