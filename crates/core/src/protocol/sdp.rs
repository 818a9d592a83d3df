//! SDP (Session Description Protocol) generation (RFC 4566 / RFC 8866).
//!
//! Produces the body sent with ANNOUNCE. The format:
//!
//! ```text
//! v=0                                   ← protocol version
//! o=- 0 0 IN IP4 <addr>                 ← origin
//! s=<session-name>                      ← session name
//! i=<session-info>                      ← session information
//! c=IN IP4 <addr>                       ← connection address
//! t=0 0                                 ← timing (live stream)
//! a=recvonly                            ← direction
//! m=video <port> RTP/AVP <pt>           ← media description
//! a=rtpmap:<pt> H264/90000              ← codec/clock rate
//! a=fmtp:<pt> <params>                  ← codec parameters
//! a=control:trackID=1                   ← track control URL
//! ```
//!
//! All fields come from [`ClientConfig`](crate::ClientConfig).

use crate::client::ClientConfig;

/// Generate the ANNOUNCE session description for the configured stream.
pub fn announce_sdp(config: &ClientConfig) -> String {
    let mut sdp: Vec<String> = Vec::new();

    sdp.push("v=0".to_string());
    sdp.push(format!("o={} 0 0 IN IP4 {}", config.sdp_username, config.local_host));
    sdp.push(format!("s={}", config.sdp_session_name));
    sdp.push(format!("i={}", config.sdp_session_info));
    sdp.push(format!("c=IN IP4 {}", config.local_host));
    sdp.push("t=0 0".to_string());
    sdp.push("a=recvonly".to_string());
    sdp.push(format!(
        "m=video {} RTP/AVP {}",
        config.client_rtp_port, config.payload_type
    ));
    sdp.push(format!("a=rtpmap:{} H264/90000", config.payload_type));
    if !config.fmtp.is_empty() {
        sdp.push(format!("a=fmtp:{} {}", config.payload_type, config.fmtp));
    }
    sdp.push("a=control:trackID=1".to_string());

    tracing::trace!("SDP: {}", sdp.join("\r\n"));

    format!("{}\r\n", sdp.join("\r\n"))
}
