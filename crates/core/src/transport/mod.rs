//! Network transport for RTSP signaling.
//!
//! The client core never touches sockets. It hands finished requests to a
//! [`Transport`] and receives parsed responses through the
//! [`ResponseCorrelator`] the transport was initialised with. Responses are
//! delivered from whatever thread the transport reads on.
//!
//! [`tcp`] provides the standard implementation: one TCP connection with a
//! reader thread.

pub mod tcp;

use std::sync::Arc;

use crate::correlator::ResponseCorrelator;
use crate::error::Result;
use crate::protocol::RtspRequest;

pub use tcp::TcpTransport;

/// Connection that carries RTSP requests out and responses back.
pub trait Transport: Send {
    /// Open the connection. Every response received afterwards must be
    /// passed to `sink.deliver`.
    fn init(&mut self, sink: Arc<ResponseCorrelator>) -> Result<()>;

    /// Hand a request over for transmission.
    ///
    /// Returns [`RtspError::NotConnected`](crate::RtspError::NotConnected)
    /// before [`init`](Self::init), and
    /// [`RtspError::Transport`](crate::RtspError::Transport) if writing fails.
    fn send(&mut self, request: &RtspRequest) -> Result<()>;

    /// Close the connection. Idempotent.
    fn terminate(&mut self);
}
