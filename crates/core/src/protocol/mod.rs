//! RTSP protocol implementation (RFC 2326), client side.
//!
//! This module handles the text-based RTSP signaling protocol — building
//! requests, parsing responses, naming methods, and generating SDP.
//!
//! ## RTSP message format (RFC 2326 §4)
//!
//! ```text
//! ANNOUNCE rtsp://server/stream RTSP/1.0\r\n
//! CSeq: 1\r\n
//! Content-Type: application/sdp\r\n
//! \r\n
//! ```
//!
//! The server echoes `CSeq` in its response; that echo is the only link
//! between a response and the request that produced it.
//!
//! ## Methods used by a publishing client
//!
//! | Method | RFC section | Purpose |
//! |--------|-------------|---------|
//! | OPTIONS | §10.1 | Capability discovery |
//! | ANNOUNCE | §10.3 | Post the SDP session description |
//! | SETUP | §10.4 | Negotiate transport (UDP ports) |
//! | RECORD | §10.11 | Start media delivery to the server |
//! | TEARDOWN | §10.7 | Destroy session |

pub mod method;
pub mod request;
pub mod response;
pub mod sdp;

pub use method::MethodKind;
pub use request::RtspRequest;
pub use response::RtspResponse;
