pub mod client;
pub mod correlator;
pub mod error;
pub mod protocol;
pub mod sequence;
pub mod session;
pub mod transport;

pub use client::{CancelHandle, Client, ClientConfig, Credentials};
pub use correlator::{ResponseCorrelator, ResponseOutcome, ResponsePayload};
pub use error::{ParseErrorKind, Result, RtspError};
pub use protocol::MethodKind;
pub use session::{Phase, SessionState};
pub use transport::{TcpTransport, Transport};
