use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::correlator::{ResponseCorrelator, ResponseOutcome};
use crate::error::{Result, RtspError};
use crate::protocol::{MethodKind, RtspRequest, sdp};
use crate::sequence::SequenceAllocator;
use crate::session::transport::client_transport_header;
use crate::session::{Phase, SessionState, SessionStateMachine};
use crate::transport::Transport;

/// Credentials for the `Authorization` header (RFC 2326 §12.5).
#[derive(Clone)]
pub enum Credentials {
    /// HTTP Basic: `Basic base64(username:password)`.
    Basic { username: String, password: String },
    /// A complete header value supplied by the caller, e.g. a precomputed
    /// Digest response.
    Header(String),
}

impl Credentials {
    pub fn header_value(&self) -> String {
        match self {
            Credentials::Basic { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
            }
            Credentials::Header(value) => value.clone(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Credentials::Header(_) => f.write_str("Header(..)"),
        }
    }
}

/// Client-level configuration used to build requests.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base request URI, e.g. `rtsp://server.example/`.
    pub base_uri: String,
    /// Stream path appended to `base_uri` for ANNOUNCE.
    pub stream_name: String,
    /// Local address advertised in the SDP `o=` and `c=` lines.
    pub local_host: String,
    /// Local RTP port offered in SETUP and the SDP `m=` line.
    pub client_rtp_port: u16,
    /// Local RTCP port offered in SETUP.
    pub client_rtcp_port: u16,
    /// How long `perform` waits for each response.
    pub response_timeout: Duration,
    /// First CSeq issued.
    pub initial_cseq: u64,
    /// Sent when a request requires authorization.
    pub credentials: Option<Credentials>,
    /// SDP origin username field (`o=<username> ...`).
    pub sdp_username: String,
    /// SDP session name (`s=`).
    pub sdp_session_name: String,
    /// SDP session information (`i=`).
    pub sdp_session_info: String,
    /// RTP payload type for the announced video track.
    pub payload_type: u8,
    /// `a=fmtp` parameters for the announced track; omitted when empty.
    pub fmtp: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_uri: "rtsp://localhost:554/".to_string(),
            stream_name: "stream".to_string(),
            local_host: "127.0.0.1".to_string(),
            client_rtp_port: 50000,
            client_rtcp_port: 50001,
            response_timeout: Duration::from_secs(5),
            initial_cseq: 0,
            credentials: None,
            sdp_username: "-".to_string(),
            sdp_session_name: "Stream".to_string(),
            sdp_session_info: "N/A".to_string(),
            payload_type: 96,
            fmtp: "packetization-mode=1".to_string(),
        }
    }
}

impl ClientConfig {
    /// URI of the announced stream (`base_uri` + `stream_name`).
    pub fn stream_uri(&self) -> String {
        if self.base_uri.ends_with('/') {
            format!("{}{}", self.base_uri, self.stream_name)
        } else {
            format!("{}/{}", self.base_uri, self.stream_name)
        }
    }
}

/// Interrupts a blocked [`Client::perform`] from another thread.
#[derive(Clone)]
pub struct CancelHandle {
    correlator: Arc<ResponseCorrelator>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.correlator.cancel();
    }
}

/// Drives an RTSP publishing session one request at a time.
///
/// Each [`perform`](Self::perform) call sends one request and blocks until
/// its response is matched, the configured timeout elapses, or the session
/// is cancelled. Requests must follow the progression
/// OPTIONS → ANNOUNCE → SETUP → RECORD → TEARDOWN.
pub struct Client {
    config: ClientConfig,
    transport: Box<dyn Transport>,
    correlator: Arc<ResponseCorrelator>,
    sequence: SequenceAllocator,
    session: SessionStateMachine,
}

impl Client {
    pub fn new(config: ClientConfig, transport: Box<dyn Transport>) -> Self {
        let sequence = SequenceAllocator::new(config.initial_cseq);
        Self {
            config,
            transport,
            correlator: Arc::new(ResponseCorrelator::new()),
            sequence,
            session: SessionStateMachine::new(),
        }
    }

    /// Initialise the transport and get ready for OPTIONS.
    pub fn start(&mut self) -> Result<()> {
        if self.session.phase() != Phase::Idle {
            return Ok(());
        }
        self.transport.init(self.correlator.clone())?;
        self.session.open();
        tracing::info!(uri = %self.config.base_uri, "client started");
        Ok(())
    }

    /// Wake any blocked request and close the transport.
    pub fn shutdown(&mut self) {
        self.correlator.cancel();
        self.transport.terminate();
        tracing::info!(phase = ?self.session.phase(), "client stopped");
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            correlator: self.correlator.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    pub fn session(&self) -> &SessionState {
        self.session.state()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one request/response cycle for `method`.
    ///
    /// A [`RtspError::Timeout`] or transport failure leaves the phase
    /// unchanged, so the same method may be issued again with a fresh CSeq.
    /// Mismatched responses, cancellation and error statuses move the
    /// session to [`Phase::Failed`].
    pub fn perform(
        &mut self,
        method: MethodKind,
        authorization_required: bool,
    ) -> Result<ResponseOutcome> {
        if !self.session.is_ready_for(method) {
            return Err(RtspError::NotReady {
                requested: method,
                phase: self.session.phase(),
            });
        }

        let authorization = match (authorization_required, &self.config.credentials) {
            (false, _) => None,
            (true, Some(credentials)) => Some(credentials.header_value()),
            (true, None) => return Err(RtspError::MissingAuthorization),
        };

        let cseq = self.sequence.next();
        let mut request = self.build_request(method, cseq);
        if let Some(value) = authorization {
            request = request.add_header("Authorization", &value);
        }

        if let Err(e) = self.correlator.begin_wait(cseq, method) {
            tracing::warn!(cseq, %method, error = %e, "request not registered");
            self.session.fail();
            return Err(e);
        }

        if let Err(e) = self.transport.send(&request) {
            self.correlator.abandon();
            tracing::warn!(cseq, %method, error = %e, "send failed");
            return Err(e);
        }

        let outcome = match self.correlator.await_match(self.config.response_timeout) {
            Ok(outcome) => outcome,
            Err(e @ RtspError::Timeout { .. }) => return Err(e),
            Err(e) => {
                tracing::warn!(cseq, %method, error = %e, "request aborted");
                self.session.fail();
                return Err(e);
            }
        };

        if let Err(e) = self.session.apply(&outcome) {
            tracing::warn!(cseq, %method, error = %e, "response rejected");
            return Err(e);
        }
        Ok(outcome)
    }

    pub fn options(&mut self) -> Result<ResponseOutcome> {
        self.perform(MethodKind::CapabilityDiscovery, false)
    }

    pub fn announce(&mut self, authorization_required: bool) -> Result<ResponseOutcome> {
        self.perform(MethodKind::Announce, authorization_required)
    }

    pub fn setup(&mut self, authorization_required: bool) -> Result<ResponseOutcome> {
        self.perform(MethodKind::Setup, authorization_required)
    }

    pub fn record(&mut self, authorization_required: bool) -> Result<ResponseOutcome> {
        self.perform(MethodKind::Start, authorization_required)
    }

    pub fn teardown(&mut self, authorization_required: bool) -> Result<ResponseOutcome> {
        self.perform(MethodKind::Teardown, authorization_required)
    }

    fn build_request(&self, method: MethodKind, cseq: u64) -> RtspRequest {
        let session_id = self.session.state().session_id.as_deref();

        let request = match method {
            MethodKind::Announce => {
                RtspRequest::new(method, &self.config.stream_uri(), cseq)
                    .with_body("application/sdp", sdp::announce_sdp(&self.config))
            }
            MethodKind::Setup => RtspRequest::new(method, &self.config.stream_uri(), cseq)
                .add_header(
                    "Transport",
                    &client_transport_header(
                        self.config.client_rtp_port,
                        self.config.client_rtcp_port,
                    ),
                ),
            MethodKind::Start => RtspRequest::new(method, &self.config.stream_uri(), cseq)
                .add_header("Range", "npt=0.000-"),
            MethodKind::Teardown => RtspRequest::new(method, &self.config.stream_uri(), cseq),
            MethodKind::CapabilityDiscovery | MethodKind::Invalid => {
                RtspRequest::new(method, &self.config.base_uri, cseq)
            }
        };

        match session_id {
            Some(id) if method != MethodKind::CapabilityDiscovery => {
                request.add_header("Session", id)
            }
            _ => request,
        }
    }
}
