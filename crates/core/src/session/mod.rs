//! Client-side RTSP session state (RFC 2326 §3, §12.37).
//!
//! A publishing client walks a fixed progression, one request at a time:
//!
//! ```text
//! start()                     -> AwaitingCapabilities
//! OPTIONS  200                -> AwaitingAnnounceAck
//! ANNOUNCE 200 (Session: id)  -> AwaitingSetupAck
//! SETUP    200 (server_port)  -> AwaitingStartAck
//! RECORD   200                -> AwaitingTeardownAck
//! TEARDOWN 200                -> Closed
//! any error status / mismatch -> Failed (absorbing)
//! ```
//!
//! Each `Awaiting*` phase accepts exactly one method next. Session fields are
//! only written from validated responses, on the caller's thread.

pub mod transport;

use crate::correlator::{ResponseOutcome, ResponsePayload};
use crate::error::{Result, RtspError};
use crate::protocol::MethodKind;
pub use transport::ServerPorts;

/// Position of the client in the request progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Transport not initialised yet.
    Idle,
    AwaitingCapabilities,
    AwaitingAnnounceAck,
    AwaitingSetupAck,
    AwaitingStartAck,
    AwaitingTeardownAck,
    /// TEARDOWN acknowledged.
    Closed,
    /// A cycle failed; no further requests are accepted.
    Failed,
}

impl Phase {
    /// The method this phase accepts next, [`MethodKind::Invalid`] for
    /// `Idle` and the terminal phases.
    pub fn expected_method(self) -> MethodKind {
        match self.position() {
            Some(position) => MethodKind::from_position(position),
            None => MethodKind::Invalid,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Closed | Phase::Failed)
    }

    fn position(self) -> Option<i64> {
        match self {
            Phase::AwaitingCapabilities => Some(0),
            Phase::AwaitingAnnounceAck => Some(1),
            Phase::AwaitingSetupAck => Some(2),
            Phase::AwaitingStartAck => Some(3),
            Phase::AwaitingTeardownAck => Some(4),
            Phase::Idle | Phase::Closed | Phase::Failed => None,
        }
    }

    fn next(self) -> Phase {
        match self {
            Phase::Idle => Phase::AwaitingCapabilities,
            Phase::AwaitingCapabilities => Phase::AwaitingAnnounceAck,
            Phase::AwaitingAnnounceAck => Phase::AwaitingSetupAck,
            Phase::AwaitingSetupAck => Phase::AwaitingStartAck,
            Phase::AwaitingStartAck => Phase::AwaitingTeardownAck,
            Phase::AwaitingTeardownAck | Phase::Closed => Phase::Closed,
            Phase::Failed => Phase::Failed,
        }
    }
}

/// Values learned from the server over the life of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Server-assigned session id, without `;timeout=`.
    pub session_id: Option<String>,
    /// Server RTP port from SETUP.
    pub server_data_port: Option<u16>,
    /// Server RTCP port from SETUP.
    pub server_control_port: Option<u16>,
    /// Methods advertised in the OPTIONS `Public` header.
    pub capabilities: Option<Vec<String>>,
    /// Required methods the server did not advertise.
    pub missing_capabilities: Vec<MethodKind>,
    /// CSeq of the last response applied to this state.
    pub last_applied_cseq: Option<u64>,
}

impl SessionState {
    pub fn server_ports(&self) -> Option<ServerPorts> {
        Some(ServerPorts {
            data_port: self.server_data_port?,
            control_port: self.server_control_port?,
        })
    }
}

/// Phase tracking plus the session fields each phase produces.
#[derive(Debug)]
pub struct SessionStateMachine {
    phase: Phase,
    state: SessionState,
}

impl SessionStateMachine {
    pub fn new() -> Self {
        SessionStateMachine {
            phase: Phase::Idle,
            state: SessionState::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether `method` is the one the current phase accepts.
    pub fn is_ready_for(&self, method: MethodKind) -> bool {
        method != MethodKind::Invalid && self.phase.expected_method() == method
    }

    /// Leave `Idle` once the transport is up. No-op in any other phase.
    pub fn open(&mut self) {
        if self.phase == Phase::Idle {
            self.transition(Phase::AwaitingCapabilities);
        }
    }

    /// Move to `Failed`.
    pub fn fail(&mut self) {
        if self.phase != Phase::Failed {
            self.transition(Phase::Failed);
        }
    }

    /// Apply a matched response for the method the current phase expects.
    ///
    /// On any error the machine moves to [`Phase::Failed`] and the session
    /// fields are left as they were.
    pub fn apply(&mut self, outcome: &ResponseOutcome) -> Result<()> {
        let result = self.try_apply(outcome);
        if result.is_err() {
            self.fail();
        }
        result
    }

    fn try_apply(&mut self, outcome: &ResponseOutcome) -> Result<()> {
        if let Some(last_applied) = self.state.last_applied_cseq
            && outcome.cseq <= last_applied
        {
            tracing::warn!(cseq = outcome.cseq, last_applied, "stale response");
            return Err(RtspError::StaleResponse {
                cseq: outcome.cseq,
                last_applied,
            });
        }

        if outcome.method == MethodKind::Invalid
            || !self.is_ready_for(outcome.method)
            || !outcome.status_ok
        {
            return Err(RtspError::ProtocolFailure {
                method: outcome.method,
                status: outcome.status_code,
                reason: outcome.reason.clone(),
            });
        }

        match &outcome.payload {
            ResponsePayload::Capabilities(Some(advertised)) => {
                let missing: Vec<MethodKind> = MethodKind::REQUIRED
                    .into_iter()
                    .filter(|method| {
                        !advertised
                            .iter()
                            .any(|name| name.eq_ignore_ascii_case(method.as_str()))
                    })
                    .collect();
                if !missing.is_empty() {
                    tracing::warn!(?missing, "server does not advertise all required methods");
                }
                self.state.capabilities = Some(advertised.clone());
                self.state.missing_capabilities = missing;
            }
            ResponsePayload::Capabilities(None) => {
                tracing::debug!("OPTIONS response without Public header");
            }
            ResponsePayload::Session(session_id) => {
                if let Some(id) = session_id {
                    tracing::info!(session_id = %id, "session established");
                    self.state.session_id = Some(id.clone());
                }
            }
            ResponsePayload::Transport { ports, session_id } => {
                let ports = ports.clone()?;
                tracing::info!(
                    data_port = ports.data_port,
                    control_port = ports.control_port,
                    "server ports negotiated"
                );
                self.state.server_data_port = Some(ports.data_port);
                self.state.server_control_port = Some(ports.control_port);
                if let Some(id) = session_id {
                    self.state.session_id = Some(id.clone());
                }
            }
            ResponsePayload::None => {}
        }

        self.state.last_applied_cseq = Some(outcome.cseq);
        self.transition(self.phase.next());
        Ok(())
    }

    fn transition(&mut self, phase: Phase) {
        tracing::debug!(old_phase = ?self.phase, new_phase = ?phase, "phase transition");
        self.phase = phase;
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
