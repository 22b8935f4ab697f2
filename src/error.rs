use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LineError {
    #[error("No serial ports detected")]
    NoPortsAvailable,

    #[error("Port is busy: {0}")]
    PortBusy(String),

    #[error("Could not open port {port}: {reason}")]
    OpenFailed { port: String, reason: String },

    #[error("Could not find serial device")]
    DeviceNotFound,

    #[error("Data not sent within {0:?}")]
    WriteTimeout(Duration),

    #[error("No data received within {0:?}")]
    ReadTimeout(Duration),

    #[error("Mode error: {0}")]
    Mode(String),

    #[error("Received bytes are not valid text: {0}")]
    Decode(#[from] std::str::Utf8Error),

    #[error("Session is not open")]
    NotOpen,

    #[error("Communication error: {0}")]
    Communication(String),
}

pub type LineResult<T> = std::result::Result<T, LineError>;
