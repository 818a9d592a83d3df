//! Request/response rendezvous between the caller and the receive thread.
//!
//! RTSP over a single connection allows one outstanding request at a time
//! for this client. The caller registers the request with
//! [`ResponseCorrelator::begin_wait`], hands it to the transport, then parks
//! in [`ResponseCorrelator::await_match`]. The transport's receive thread
//! calls [`ResponseCorrelator::deliver`] for every response it frames.
//!
//! ```text
//! caller thread                       receive thread
//! -------------                       --------------
//! begin_wait(cseq, method)
//! transport.send(request)  ───────▶   (wire)
//! await_match(timeout) ── parks       deliver(response)
//!                                       lock slot
//!                                       check CSeq, parse payload
//!                                       clear pending, store completion
//!                                       notify
//! ◀── wakes with outcome
//! ```
//!
//! The slot is a single `parking_lot::Mutex`; the completion is stored under
//! the same lock that clears the pending request, so a response that lands
//! before the caller parks is not lost and a duplicate is never credited to
//! a later request.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{ParseErrorKind, Result, RtspError};
use crate::protocol::{MethodKind, RtspResponse};
use crate::session::transport::ServerPorts;

/// The single request in flight.
#[derive(Debug, Clone, Copy)]
pub struct PendingRequest {
    pub cseq: u64,
    pub method: MethodKind,
    pub issued_at: Instant,
}

/// Method-specific fields extracted from a successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePayload {
    /// Nothing to extract (RECORD, TEARDOWN, or a failed status).
    None,
    /// `Public` methods from an OPTIONS response; `None` when the header
    /// was absent.
    Capabilities(Option<Vec<String>>),
    /// Session id from an ANNOUNCE response; `None` when the header was absent.
    Session(Option<String>),
    /// Server ports from a SETUP response, plus the session id if the
    /// server sent one.
    Transport {
        ports: std::result::Result<ServerPorts, ParseErrorKind>,
        session_id: Option<String>,
    },
}

/// A response matched to the request that produced it.
///
/// Only matched responses become outcomes; mismatches, timeouts and
/// cancellation surface as [`RtspError`] from [`ResponseCorrelator::await_match`].
#[derive(Debug, Clone)]
pub struct ResponseOutcome {
    pub cseq: u64,
    pub method: MethodKind,
    pub status_code: u16,
    pub reason: String,
    pub status_ok: bool,
    pub payload: ResponsePayload,
    /// The full response, for headers the core does not interpret.
    pub response: RtspResponse,
}

#[derive(Debug)]
enum Completion {
    Matched(ResponseOutcome),
    Mismatch { expected: u64, received: Option<u64> },
    Rejected(ParseErrorKind),
}

#[derive(Debug, Default)]
struct Slot {
    pending: Option<PendingRequest>,
    completion: Option<Completion>,
    cancelled: bool,
}

/// Single-slot rendezvous for one in-flight RTSP request.
#[derive(Debug, Default)]
pub struct ResponseCorrelator {
    slot: Mutex<Slot>,
    ready: Condvar,
}

impl ResponseCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the request about to be sent.
    ///
    /// Fails with [`RtspError::AlreadyPending`] if another request is still
    /// outstanding; the existing registration is left in place.
    pub fn begin_wait(&self, cseq: u64, method: MethodKind) -> Result<()> {
        let mut slot = self.slot.lock();

        if slot.cancelled {
            return Err(RtspError::Cancelled);
        }
        if let Some(pending) = &slot.pending {
            tracing::error!(
                pending = pending.cseq,
                requested = cseq,
                "request issued while another is in flight"
            );
            return Err(RtspError::AlreadyPending { cseq: pending.cseq });
        }

        slot.completion = None;
        slot.pending = Some(PendingRequest {
            cseq,
            method,
            issued_at: Instant::now(),
        });
        tracing::trace!(cseq, %method, "awaiting response");
        Ok(())
    }

    /// Block until the pending request is answered, the timeout elapses, or
    /// [`cancel`](Self::cancel) is called.
    ///
    /// The pending slot is empty when this returns, whatever the result.
    pub fn await_match(&self, timeout: Duration) -> Result<ResponseOutcome> {
        // `None` when the timeout is too large to represent: wait without a deadline
        let deadline = Instant::now().checked_add(timeout);
        let mut slot = self.slot.lock();

        loop {
            if let Some(completion) = slot.completion.take() {
                return match completion {
                    Completion::Matched(outcome) => Ok(outcome),
                    Completion::Mismatch { expected, received } => {
                        Err(RtspError::Mismatch { expected, received })
                    }
                    Completion::Rejected(kind) => Err(RtspError::Parse { kind }),
                };
            }

            let Some(pending) = slot.pending else {
                return Err(RtspError::NoPendingRequest);
            };

            if slot.cancelled {
                slot.pending = None;
                tracing::debug!(cseq = pending.cseq, "wait cancelled");
                return Err(RtspError::Cancelled);
            }

            let Some(deadline) = deadline else {
                self.ready.wait(&mut slot);
                continue;
            };

            if self.ready.wait_until(&mut slot, deadline).timed_out()
                && slot.completion.is_none()
                && !slot.cancelled
            {
                slot.pending = None;
                let elapsed = pending.issued_at.elapsed();
                tracing::warn!(
                    cseq = pending.cseq,
                    method = %pending.method,
                    ?elapsed,
                    "no response before deadline"
                );
                return Err(RtspError::Timeout {
                    cseq: pending.cseq,
                    method: pending.method,
                    elapsed,
                });
            }
        }
    }

    /// Offer a response received from the transport.
    ///
    /// Responses arriving with nothing pending are dropped. A response whose
    /// CSeq is absent or differs from the pending one aborts the wait.
    pub fn deliver(&self, response: RtspResponse) {
        let mut slot = self.slot.lock();

        let Some(pending) = slot.pending else {
            tracing::warn!(
                cseq = ?response.cseq(),
                status = response.status_code,
                "dropping response with no request pending"
            );
            return;
        };

        let received = response.cseq();
        if received != Some(pending.cseq) {
            let method = received.map_or(MethodKind::Invalid, |_| pending.method);
            tracing::warn!(
                expected = pending.cseq,
                ?received,
                %method,
                "response CSeq does not match pending request"
            );
            slot.pending = None;
            slot.completion = Some(Completion::Mismatch {
                expected: pending.cseq,
                received,
            });
            self.ready.notify_all();
            return;
        }

        let status_ok = response.is_success();
        if !status_ok {
            tracing::warn!(
                cseq = pending.cseq,
                method = %pending.method,
                status = response.status_code,
                reason = %response.reason,
                "server returned error status"
            );
        }

        let payload = if status_ok {
            extract_payload(pending.method, &response)
        } else {
            ResponsePayload::None
        };

        tracing::debug!(
            cseq = pending.cseq,
            method = %pending.method,
            status = response.status_code,
            elapsed = ?pending.issued_at.elapsed(),
            "response matched"
        );

        slot.pending = None;
        slot.completion = Some(Completion::Matched(ResponseOutcome {
            cseq: pending.cseq,
            method: pending.method,
            status_code: response.status_code,
            reason: response.reason.clone(),
            status_ok,
            payload,
            response,
        }));
        self.ready.notify_all();
    }

    /// Report a frame the transport could not parse.
    ///
    /// With a request pending, the wait completes with [`RtspError::Parse`];
    /// otherwise the frame is dropped.
    pub fn reject(&self, kind: ParseErrorKind) {
        let mut slot = self.slot.lock();

        let Some(pending) = slot.pending.take() else {
            tracing::warn!(error = %kind, "dropping unparsable response with no request pending");
            return;
        };

        tracing::warn!(
            cseq = pending.cseq,
            method = %pending.method,
            error = %kind,
            "unparsable response aborts pending request"
        );
        slot.completion = Some(Completion::Rejected(kind));
        self.ready.notify_all();
    }

    /// Drop the pending registration without waiting (send failed).
    pub fn abandon(&self) {
        let mut slot = self.slot.lock();
        if let Some(pending) = slot.pending.take() {
            tracing::debug!(cseq = pending.cseq, "pending request abandoned");
        }
        slot.completion = None;
    }

    /// Signal shutdown. Wakes any parked waiter with [`RtspError::Cancelled`]
    /// and refuses further registrations.
    pub fn cancel(&self) {
        let mut slot = self.slot.lock();
        if !slot.cancelled {
            slot.cancelled = true;
            tracing::debug!(pending = ?slot.pending.map(|p| p.cseq), "correlator cancelled");
        }
        self.ready.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.slot.lock().cancelled
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().pending.is_some()
    }

    /// CSeq of the request currently in flight.
    pub fn pending_cseq(&self) -> Option<u64> {
        self.slot.lock().pending.map(|p| p.cseq)
    }
}

fn extract_payload(method: MethodKind, response: &RtspResponse) -> ResponsePayload {
    match method {
        MethodKind::CapabilityDiscovery => ResponsePayload::Capabilities(response.public_methods()),
        MethodKind::Announce => ResponsePayload::Session(response.session_id()),
        MethodKind::Setup => {
            let ports = response
                .get_header("Transport")
                .ok_or(ParseErrorKind::MissingHeader("Transport"))
                .and_then(ServerPorts::parse);
            if let Err(kind) = &ports {
                tracing::warn!(
                    cseq = ?response.cseq(),
                    transport = ?response.get_header("Transport"),
                    error = %kind,
                    "malformed SETUP transport"
                );
            }
            ResponsePayload::Transport {
                ports,
                session_id: response.session_id(),
            }
        }
        MethodKind::Start | MethodKind::Teardown | MethodKind::Invalid => ResponsePayload::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn response(raw: &str) -> RtspResponse {
        RtspResponse::parse(raw).unwrap()
    }

    #[test]
    fn begin_wait_twice_is_rejected() {
        let correlator = ResponseCorrelator::new();
        correlator.begin_wait(0, MethodKind::CapabilityDiscovery).unwrap();

        let err = correlator.begin_wait(1, MethodKind::Announce).unwrap_err();
        assert!(matches!(err, RtspError::AlreadyPending { cseq: 0 }));
        assert_eq!(correlator.pending_cseq(), Some(0));
    }

    #[test]
    fn delivery_before_wait_is_not_lost() {
        let correlator = ResponseCorrelator::new();
        correlator.begin_wait(7, MethodKind::Start).unwrap();
        correlator.deliver(response("RTSP/1.0 200 OK\r\nCSeq: 7\r\n\r\n"));

        let outcome = correlator.await_match(Duration::from_millis(10)).unwrap();
        assert_eq!(outcome.cseq, 7);
        assert_eq!(outcome.method, MethodKind::Start);
        assert!(outcome.status_ok);
        assert!(!correlator.is_pending());
    }

    #[test]
    fn delivery_from_other_thread_wakes_waiter() {
        let correlator = Arc::new(ResponseCorrelator::new());
        correlator.begin_wait(1, MethodKind::Announce).unwrap();

        let sender = correlator.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            sender.deliver(response(
                "RTSP/1.0 200 OK\r\nCSeq: 1\r\nSession: abc123;timeout=60\r\n\r\n",
            ));
        });

        let outcome = correlator.await_match(Duration::from_secs(2)).unwrap();
        handle.join().unwrap();
        assert_eq!(
            outcome.payload,
            ResponsePayload::Session(Some("abc123".to_string()))
        );
    }

    #[test]
    fn wrong_cseq_aborts_without_match() {
        let correlator = ResponseCorrelator::new();
        correlator.begin_wait(3, MethodKind::Setup).unwrap();
        correlator.deliver(response("RTSP/1.0 200 OK\r\nCSeq: 2\r\n\r\n"));

        let err = correlator.await_match(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(
            err,
            RtspError::Mismatch {
                expected: 3,
                received: Some(2)
            }
        ));
        assert!(!correlator.is_pending());
    }

    #[test]
    fn missing_cseq_aborts_without_match() {
        let correlator = ResponseCorrelator::new();
        correlator.begin_wait(0, MethodKind::CapabilityDiscovery).unwrap();
        correlator.deliver(response("RTSP/1.0 200 OK\r\n\r\n"));

        let err = correlator.await_match(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, RtspError::Mismatch { received: None, .. }));
    }

    #[test]
    fn stray_delivery_without_pending_is_dropped() {
        let correlator = ResponseCorrelator::new();
        correlator.deliver(response("RTSP/1.0 200 OK\r\nCSeq: 0\r\n\r\n"));
        assert!(!correlator.is_pending());

        correlator.begin_wait(1, MethodKind::Announce).unwrap();
        let err = correlator.await_match(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, RtspError::Timeout { cseq: 1, .. }));
    }

    #[test]
    fn duplicate_delivery_is_not_credited_to_next_request() {
        let correlator = ResponseCorrelator::new();
        correlator.begin_wait(0, MethodKind::CapabilityDiscovery).unwrap();
        correlator.deliver(response("RTSP/1.0 200 OK\r\nCSeq: 0\r\n\r\n"));
        correlator.deliver(response("RTSP/1.0 200 OK\r\nCSeq: 0\r\n\r\n"));
        correlator.await_match(Duration::from_millis(10)).unwrap();

        correlator.begin_wait(1, MethodKind::Announce).unwrap();
        let err = correlator.await_match(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, RtspError::Timeout { cseq: 1, .. }));
    }

    #[test]
    fn timeout_clears_slot() {
        let correlator = ResponseCorrelator::new();
        correlator.begin_wait(4, MethodKind::Teardown).unwrap();

        let started = Instant::now();
        let err = correlator.await_match(Duration::from_millis(50)).unwrap_err();
        let waited = started.elapsed();

        assert!(matches!(
            err,
            RtspError::Timeout {
                cseq: 4,
                method: MethodKind::Teardown,
                ..
            }
        ));
        assert!(waited >= Duration::from_millis(50));
        assert!(waited < Duration::from_secs(1));
        assert!(!correlator.is_pending());

        // a late response for the abandoned request is dropped
        correlator.deliver(response("RTSP/1.0 200 OK\r\nCSeq: 4\r\n\r\n"));
        correlator.begin_wait(5, MethodKind::Teardown).unwrap();
        assert!(correlator.await_match(Duration::from_millis(10)).is_err());
    }

    #[test]
    fn cancel_unblocks_parked_waiter() {
        let correlator = Arc::new(ResponseCorrelator::new());
        correlator.begin_wait(2, MethodKind::Setup).unwrap();

        let canceller = correlator.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            canceller.cancel();
        });

        let err = correlator.await_match(Duration::from_secs(5)).unwrap_err();
        handle.join().unwrap();
        assert!(matches!(err, RtspError::Cancelled));
        assert!(!correlator.is_pending());
        assert!(matches!(
            correlator.begin_wait(3, MethodKind::Start),
            Err(RtspError::Cancelled)
        ));
    }

    #[test]
    fn error_status_is_matched_but_not_ok() {
        let correlator = ResponseCorrelator::new();
        correlator.begin_wait(1, MethodKind::Announce).unwrap();
        correlator.deliver(response(
            "RTSP/1.0 404 Not Found\r\nCSeq: 1\r\nSession: abc;timeout=60\r\n\r\n",
        ));

        let outcome = correlator.await_match(Duration::from_millis(10)).unwrap();
        assert!(!outcome.status_ok);
        assert_eq!(outcome.status_code, 404);
        assert_eq!(outcome.payload, ResponsePayload::None);
    }

    #[test]
    fn setup_payload_carries_parse_error() {
        let correlator = ResponseCorrelator::new();
        correlator.begin_wait(2, MethodKind::Setup).unwrap();
        correlator.deliver(response(
            "RTSP/1.0 200 OK\r\nCSeq: 2\r\nTransport: RTP/AVP;server_port=6970\r\n\r\n",
        ));

        let outcome = correlator.await_match(Duration::from_millis(10)).unwrap();
        match outcome.payload {
            ResponsePayload::Transport { ports, .. } => {
                assert!(matches!(ports, Err(ParseErrorKind::InvalidPortRange(_))))
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn await_without_begin_is_an_error() {
        let correlator = ResponseCorrelator::new();
        assert!(matches!(
            correlator.await_match(Duration::from_millis(1)),
            Err(RtspError::NoPendingRequest)
        ));
    }

    #[test]
    fn abandon_frees_slot() {
        let correlator = ResponseCorrelator::new();
        correlator.begin_wait(0, MethodKind::CapabilityDiscovery).unwrap();
        correlator.abandon();
        assert!(!correlator.is_pending());
        correlator.begin_wait(1, MethodKind::CapabilityDiscovery).unwrap();
    }

    #[test]
    fn unbounded_timeout_returns_delivered_response() {
        let correlator = ResponseCorrelator::new();
        correlator.begin_wait(0, MethodKind::CapabilityDiscovery).unwrap();
        correlator.deliver(response("RTSP/1.0 200 OK\r\nCSeq: 0\r\n\r\n"));

        let outcome = correlator.await_match(Duration::MAX).unwrap();
        assert_eq!(outcome.cseq, 0);
        assert!(!correlator.is_pending());
        correlator.begin_wait(1, MethodKind::Announce).unwrap();
    }

    #[test]
    fn unbounded_timeout_still_wakes_on_delivery() {
        let correlator = Arc::new(ResponseCorrelator::new());
        correlator.begin_wait(3, MethodKind::Start).unwrap();

        let sender = correlator.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            sender.deliver(response("RTSP/1.0 200 OK\r\nCSeq: 3\r\n\r\n"));
        });

        let outcome = correlator.await_match(Duration::MAX).unwrap();
        handle.join().unwrap();
        assert_eq!(outcome.method, MethodKind::Start);
    }

    #[test]
    fn rejected_frame_aborts_pending_wait() {
        let correlator = ResponseCorrelator::new();
        correlator.begin_wait(0, MethodKind::CapabilityDiscovery).unwrap();
        correlator.reject(ParseErrorKind::InvalidStatusLine);

        let err = correlator.await_match(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(
            err,
            RtspError::Parse {
                kind: ParseErrorKind::InvalidStatusLine
            }
        ));
        assert!(!correlator.is_pending());
    }

    #[test]
    fn rejected_frame_without_pending_is_dropped() {
        let correlator = ResponseCorrelator::new();
        correlator.reject(ParseErrorKind::EmptyResponse);

        correlator.begin_wait(0, MethodKind::CapabilityDiscovery).unwrap();
        let err = correlator.await_match(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, RtspError::Timeout { cseq: 0, .. }));
    }
}
