use crate::error::{ParseErrorKind, RtspError};

/// A parsed RTSP response (RFC 2326 §7).
///
/// RTSP responses follow HTTP/1.1 syntax:
///
/// ```text
/// RTSP-Version SP Status-Code SP Reason-Phrase CRLF
/// *(Header: Value CRLF)
/// CRLF
/// [body]
/// ```
///
/// Header lookup is case-insensitive per RFC 2326 §4.2.
#[derive(Debug, Clone)]
pub struct RtspResponse {
    /// Protocol version (expected: `RTSP/1.0`).
    pub version: String,
    pub status_code: u16,
    pub reason: String,
    /// Headers as ordered (name, value) pairs. Names are stored as-received;
    /// lookups via [`get_header`](Self::get_header) are case-insensitive.
    pub headers: Vec<(String, String)>,
    /// Everything after the blank line, if anything.
    pub body: Option<String>,
}

impl RtspResponse {
    /// Parse an RTSP response from its text representation.
    ///
    /// Expects a status line, headers, a blank line and an optional body.
    /// Returns [`RtspError::Parse`] on malformed input.
    pub fn parse(raw: &str) -> crate::error::Result<Self> {
        let (head, body) = match raw.find("\r\n\r\n") {
            Some(pos) => (&raw[..pos], &raw[pos + 4..]),
            None => match raw.find("\n\n") {
                Some(pos) => (&raw[..pos], &raw[pos + 2..]),
                None => (raw, ""),
            },
        };

        let mut lines = head.lines();

        let status_line = lines
            .next()
            .filter(|line| !line.trim().is_empty())
            .ok_or(RtspError::Parse {
                kind: ParseErrorKind::EmptyResponse,
            })?;

        let mut parts = status_line.splitn(3, ' ');
        let version = parts.next().unwrap_or("").to_string();
        let status_code = parts
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or(RtspError::Parse {
                kind: ParseErrorKind::InvalidStatusLine,
            })?;
        let reason = parts.next().unwrap_or("").trim().to_string();

        if !version.starts_with("RTSP/") {
            return Err(RtspError::Parse {
                kind: ParseErrorKind::InvalidStatusLine,
            });
        }
        if version != "RTSP/1.0" {
            tracing::warn!(version, "server sent non-RTSP/1.0 version");
        }

        let mut headers = Vec::new();

        for line in lines {
            if line.is_empty() {
                break;
            }

            let colon_pos = line.find(':').ok_or(RtspError::Parse {
                kind: ParseErrorKind::InvalidHeader,
            })?;

            let name = line[..colon_pos].trim().to_string();
            let value = line[colon_pos + 1..].trim().to_string();

            headers.push((name, value));
        }

        Ok(RtspResponse {
            version,
            status_code,
            reason,
            headers,
            body: (!body.is_empty()).then(|| body.to_string()),
        })
    }

    /// Look up a header value by name (case-insensitive, per RFC 2326 §4.2).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The echoed CSeq (RFC 2326 §12.17), or `None` if absent or not numeric.
    pub fn cseq(&self) -> Option<u64> {
        self.get_header("CSeq")?.trim().parse().ok()
    }

    /// 2xx status class (RFC 2326 §7.1.1).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Methods listed in the `Public` header (RFC 2326 §12.28).
    pub fn public_methods(&self) -> Option<Vec<String>> {
        self.get_header("Public").map(|value| {
            value
                .split(',')
                .map(|method| method.trim().to_string())
                .filter(|method| !method.is_empty())
                .collect()
        })
    }

    /// Session identifier from the `Session` header (RFC 2326 §12.37),
    /// without the trailing `;timeout=` parameter.
    pub fn session_id(&self) -> Option<String> {
        self.get_header("Session").and_then(session_id_from_header)
    }
}

/// Strip parameters from a `Session` header value.
///
/// ```
/// use rtsp::protocol::response::session_id_from_header;
///
/// assert_eq!(session_id_from_header("abc123;timeout=60").as_deref(), Some("abc123"));
/// assert_eq!(session_id_from_header("abc123").as_deref(), Some("abc123"));
/// assert_eq!(session_id_from_header(";timeout=60"), None);
/// ```
pub fn session_id_from_header(value: &str) -> Option<String> {
    let id = value.split(';').next().unwrap_or(value).trim();
    (!id.is_empty()).then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_options_response() {
        let raw = "RTSP/1.0 200 OK\r\n\
                   CSeq: 0\r\n\
                   Public: OPTIONS, ANNOUNCE, SETUP, RECORD, TEARDOWN\r\n\r\n";
        let resp = RtspResponse::parse(raw).unwrap();
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.reason, "OK");
        assert_eq!(resp.cseq(), Some(0));
        assert!(resp.is_success());
        assert_eq!(
            resp.public_methods().unwrap(),
            vec!["OPTIONS", "ANNOUNCE", "SETUP", "RECORD", "TEARDOWN"]
        );
        assert!(resp.body.is_none());
    }

    #[test]
    fn parse_reason_with_spaces() {
        let resp = RtspResponse::parse("RTSP/1.0 404 Not Found\r\nCSeq: 2\r\n\r\n").unwrap();
        assert_eq!(resp.status_code, 404);
        assert_eq!(resp.reason, "Not Found");
        assert!(!resp.is_success());
    }

    #[test]
    fn parse_body() {
        let raw = "RTSP/1.0 200 OK\r\nCSeq: 1\r\nContent-Length: 5\r\n\r\nv=0\r\n";
        let resp = RtspResponse::parse(raw).unwrap();
        assert_eq!(resp.body.as_deref(), Some("v=0\r\n"));
    }

    #[test]
    fn parse_empty_response() {
        assert!(RtspResponse::parse("").is_err());
    }

    #[test]
    fn parse_invalid_status_line() {
        assert!(RtspResponse::parse("RTSP/1.0 OK\r\n\r\n").is_err());
        assert!(RtspResponse::parse("HELLO 200 OK\r\n\r\n").is_err());
    }

    #[test]
    fn parse_invalid_header() {
        assert!(RtspResponse::parse("RTSP/1.0 200 OK\r\nno colon\r\n\r\n").is_err());
    }

    #[test]
    fn cseq_missing_or_garbage() {
        let resp = RtspResponse::parse("RTSP/1.0 200 OK\r\n\r\n").unwrap();
        assert_eq!(resp.cseq(), None);
        let resp = RtspResponse::parse("RTSP/1.0 200 OK\r\nCSeq: two\r\n\r\n").unwrap();
        assert_eq!(resp.cseq(), None);
    }

    #[test]
    fn header_lookup_case_insensitive() {
        let resp = RtspResponse::parse("RTSP/1.0 200 OK\r\ncseq: 42\r\n\r\n").unwrap();
        assert_eq!(resp.get_header("CSeq"), Some("42"));
        assert_eq!(resp.get_header("CSEQ"), Some("42"));
    }

    #[test]
    fn session_header_parameters_stripped() {
        let raw = "RTSP/1.0 200 OK\r\nCSeq: 1\r\nSession: xyz;timeout=60\r\n\r\n";
        let resp = RtspResponse::parse(raw).unwrap();
        assert_eq!(resp.session_id().as_deref(), Some("xyz"));
    }
}
