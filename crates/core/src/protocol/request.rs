use crate::protocol::MethodKind;

/// An outgoing RTSP request (RFC 2326 §6).
///
/// Serializes to the standard text format:
///
/// ```text
/// ANNOUNCE rtsp://server/stream RTSP/1.0\r\n
/// CSeq: 1\r\n
/// User-Agent: rtsp-control/0.1\r\n
/// Content-Type: application/sdp\r\n
/// Content-Length: 142\r\n
/// \r\n
/// v=0\r\n...
/// ```
///
/// Uses a builder pattern — chain [`add_header`](Self::add_header) and
/// [`with_body`](Self::with_body), then call [`serialize`](Self::serialize).
/// `Content-Length` is always written: the body length, or 0 without one.
#[must_use]
#[derive(Debug, Clone)]
pub struct RtspRequest {
    pub method: MethodKind,
    pub uri: String,
    /// CSeq (RFC 2326 §12.17). The response must echo it.
    pub cseq: u64,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Client identification string included in every request
/// per RFC 2326 §12.41.
pub const USER_AGENT: &str = "rtsp-control/0.1";

impl RtspRequest {
    pub fn new(method: MethodKind, uri: &str, cseq: u64) -> Self {
        RtspRequest {
            method,
            uri: uri.to_string(),
            cseq,
            headers: vec![("User-Agent".to_string(), USER_AGENT.to_string())],
            body: None,
        }
    }

    pub fn add_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, content_type: &str, body: String) -> Self {
        self.headers
            .push(("Content-Type".to_string(), content_type.to_string()));
        self.body = Some(body);
        self
    }

    /// Look up a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Serialize to the RTSP text wire format.
    pub fn serialize(&self) -> String {
        let mut request = format!("{} {} RTSP/1.0\r\n", self.method, self.uri);
        request.push_str(&format!("CSeq: {}\r\n", self.cseq));

        for (name, value) in &self.headers {
            request.push_str(&format!("{}: {}\r\n", name, value));
        }

        match &self.body {
            Some(body) => {
                request.push_str(&format!("Content-Length: {}\r\n", body.len()));
                request.push_str("\r\n");
                request.push_str(body);
            }
            None => {
                request.push_str("Content-Length: 0\r\n");
                request.push_str("\r\n");
            }
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_options() {
        let req = RtspRequest::new(MethodKind::CapabilityDiscovery, "rtsp://host/", 0);
        let s = req.serialize();
        assert!(s.starts_with("OPTIONS rtsp://host/ RTSP/1.0\r\nCSeq: 0\r\n"));
        assert!(s.contains("User-Agent: rtsp-control/0.1\r\n"));
        assert!(s.ends_with("Content-Length: 0\r\n\r\n"));
    }

    #[test]
    fn serialize_with_body() {
        let req = RtspRequest::new(MethodKind::Announce, "rtsp://host/live", 1)
            .with_body("application/sdp", "v=0\r\n".to_string());
        let s = req.serialize();
        assert!(s.starts_with("ANNOUNCE rtsp://host/live RTSP/1.0\r\n"));
        assert!(s.contains("Content-Type: application/sdp\r\n"));
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(s.ends_with("\r\n\r\nv=0\r\n"));
    }

    #[test]
    fn header_lookup_case_insensitive() {
        let req = RtspRequest::new(MethodKind::Start, "rtsp://host/live", 3)
            .add_header("Session", "abc");
        assert_eq!(req.get_header("session"), Some("abc"));
        assert_eq!(req.get_header("Range"), None);
    }
}
