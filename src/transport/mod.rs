pub mod mock;
pub mod serialport;

use std::time::Duration;

use tracing::info;

use crate::catalog::PortDescriptor;
use crate::config::LineConfig;
use crate::error::{LineError, LineResult};

/// Opens serial endpoints
pub trait Transport {
    /// Open `port` with the line parameters of `config`.
    /// Fails with `PortBusy` for a busy descriptor and `OpenFailed` otherwise.
    fn open(&self, port: &PortDescriptor, config: &LineConfig) -> LineResult<Box<dyn Channel>>;
}

/// One opened serial endpoint
pub trait Channel: Send {
    fn is_open(&self) -> bool;

    /// Queue bytes for transmission
    fn write(&mut self, bytes: &[u8]) -> LineResult<()>;

    /// Block until queued output has been transmitted.
    /// Returns false if that did not happen within `timeout`.
    fn wait_for_bytes_written(&mut self, timeout: Duration) -> LineResult<bool>;

    /// Number of received bytes waiting to be read
    fn bytes_available(&mut self) -> LineResult<usize>;

    /// Take whatever is already queued without blocking
    fn read_available(&mut self) -> LineResult<Vec<u8>>;

    /// Block up to `max_wait` for incoming bytes. Empty on timeout.
    fn read(&mut self, max_wait: Duration) -> LineResult<Vec<u8>>;

    /// Release the endpoint. Safe to call more than once.
    fn close(&mut self);

    /// Drain bytes left over from an earlier, unterminated exchange
    fn flush_stale(&mut self) -> LineResult<usize> {
        if self.bytes_available()? == 0 {
            return Ok(0);
        }

        let stale = self.read_available()?;
        info!("Cleared bytes from device: {:?}", String::from_utf8_lossy(&stale));
        Ok(stale.len())
    }
}

pub(crate) fn ensure_not_busy(port: &PortDescriptor) -> LineResult<()> {
    if port.busy {
        return Err(LineError::PortBusy(port.name.clone()));
    }
    Ok(())
}
