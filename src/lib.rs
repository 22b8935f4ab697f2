//! Line-oriented communication with instruments attached over a serial port.
//!
//! A [`DeviceSession`] finds the port hosting the expected device, then
//! exchanges delimiter terminated text messages with it either by blocking
//! request/response calls ([`Mode::Sync`]) or through `data_ready`
//! notifications ([`Mode::Async`]).

pub use catalog::{PortCatalog, PortDescriptor, SystemCatalog};
pub use config::{LineConfig, Mode, PortFilter};
pub use error::{LineError, LineResult};
pub use identify::{AlwaysIdentify, Identify, QueryIdentify};
pub use session::{DeviceSession, SessionBuilder};

pub mod catalog;
pub mod config;
pub(crate) mod constants;
pub mod error;
pub mod events;
pub mod framer;
pub mod identify;
pub mod session;
pub mod transport;
