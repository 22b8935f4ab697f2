use tracing::debug;

use crate::session::DeviceSession;

/// Confirms that the device on a freshly opened port is the expected one.
///
/// Runs once per candidate port, after stale bytes have been flushed. The
/// session is in synchronous mode while the check runs, so `handshake` can
/// be used to query the device. The receive buffer is cleared afterwards
/// whatever the outcome.
pub trait Identify {
    fn identify(&mut self, session: &mut DeviceSession) -> bool;
}

impl<F> Identify for F
where
    F: FnMut(&mut DeviceSession) -> bool,
{
    fn identify(&mut self, session: &mut DeviceSession) -> bool {
        self(session)
    }
}

/// Accepts any device
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysIdentify;

impl Identify for AlwaysIdentify {
    fn identify(&mut self, _session: &mut DeviceSession) -> bool {
        true
    }
}

/// Sends a query and accepts the device if the reply contains `expected`
#[derive(Debug, Clone)]
pub struct QueryIdentify {
    pub query: String,
    pub expected: String,
}

impl QueryIdentify {
    pub fn new(query: impl Into<String>, expected: impl Into<String>) -> Self {
        QueryIdentify {
            query: query.into(),
            expected: expected.into(),
        }
    }
}

impl Identify for QueryIdentify {
    fn identify(&mut self, session: &mut DeviceSession) -> bool {
        match session.handshake(&self.query) {
            Ok(reply) => {
                debug!("{:?} answered {:?}", self.query, reply);
                reply.contains(&self.expected)
            }
            Err(e) => {
                debug!("Identification query failed: {}", e);
                false
            }
        }
    }
}
