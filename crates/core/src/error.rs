//! Error types for the RTSP client library.

use std::fmt;
use std::time::Duration;

use crate::protocol::MethodKind;
use crate::session::Phase;

/// Errors that can occur while driving an RTSP client session.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Transport**: [`Io`](Self::Io), [`Transport`](Self::Transport),
///   [`NotConnected`](Self::NotConnected).
/// - **Correlation**: [`AlreadyPending`](Self::AlreadyPending),
///   [`NoPendingRequest`](Self::NoPendingRequest), [`Timeout`](Self::Timeout),
///   [`Cancelled`](Self::Cancelled), [`Mismatch`](Self::Mismatch).
/// - **Session**: [`StaleResponse`](Self::StaleResponse),
///   [`ProtocolFailure`](Self::ProtocolFailure), [`NotReady`](Self::NotReady),
///   [`MissingAuthorization`](Self::MissingAuthorization).
/// - **Protocol**: [`Parse`](Self::Parse) — malformed RTSP messages or headers.
#[derive(Debug, thiserror::Error)]
pub enum RtspError {
    /// Underlying I/O or socket error (connect, clone, shutdown).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Handing a request to the transport failed. The cycle is abandoned
    /// and session state is left untouched; the caller may retry.
    #[error("transport error: {0}")]
    Transport(String),

    /// [`Transport::send`](crate::transport::Transport::send) was called
    /// before [`Transport::init`](crate::transport::Transport::init).
    #[error("transport not connected")]
    NotConnected,

    /// A request is already in flight. Requests must be serialized.
    #[error("request CSeq {cseq} already pending")]
    AlreadyPending { cseq: u64 },

    /// `await_match` was called without a registered request.
    #[error("no request pending")]
    NoPendingRequest,

    /// No response arrived within the configured duration.
    #[error("{method} (CSeq {cseq}) timed out after {elapsed:?}")]
    Timeout {
        cseq: u64,
        method: MethodKind,
        elapsed: Duration,
    },

    /// The wait was interrupted by a shutdown signal.
    #[error("wait cancelled")]
    Cancelled,

    /// A response arrived whose CSeq did not match the pending request.
    /// `received` is `None` when the CSeq header was absent or unparsable.
    #[error("CSeq mismatch: expected {expected}, received {received:?}")]
    Mismatch { expected: u64, received: Option<u64> },

    /// A response older than the last one applied to the session.
    #[error("stale response CSeq {cseq} (last applied {last_applied})")]
    StaleResponse { cseq: u64, last_applied: u64 },

    /// Failed to parse an RTSP response or one of its headers.
    #[error("RTSP parse error: {kind}")]
    Parse { kind: ParseErrorKind },

    /// Non-success status code, or a response for an unexpected method.
    #[error("{method} failed: {status} {reason}")]
    ProtocolFailure {
        method: MethodKind,
        status: u16,
        reason: String,
    },

    /// The session is not in the phase that accepts `requested` next.
    #[error("cannot send {requested} while {phase:?}")]
    NotReady { requested: MethodKind, phase: Phase },

    /// Authorization was required but no credentials are configured.
    #[error("authorization required but no credentials configured")]
    MissingAuthorization,
}

/// Specific kind of RTSP parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input was empty (no status line).
    EmptyResponse,
    /// Status line did not have the expected `Version Code Reason` format.
    InvalidStatusLine,
    /// A header line did not contain a colon separator.
    InvalidHeader,
    /// A header required for this method was absent.
    MissingHeader(&'static str),
    /// `server_port` was not of the form `<low>-<high>`.
    InvalidPortRange(String),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyResponse => write!(f, "empty response"),
            Self::InvalidStatusLine => write!(f, "invalid status line"),
            Self::InvalidHeader => write!(f, "invalid header"),
            Self::MissingHeader(name) => write!(f, "missing {} header", name),
            Self::InvalidPortRange(value) => write!(f, "invalid port range {:?}", value),
        }
    }
}

impl From<ParseErrorKind> for RtspError {
    fn from(kind: ParseErrorKind) -> Self {
        RtspError::Parse { kind }
    }
}

/// Convenience alias for `Result<T, RtspError>`.
pub type Result<T> = std::result::Result<T, RtspError>;
