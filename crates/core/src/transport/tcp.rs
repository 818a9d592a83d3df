use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::correlator::ResponseCorrelator;
use crate::error::{Result, RtspError};
use crate::protocol::{RtspRequest, RtspResponse};
use crate::transport::Transport;

/// Largest response body accepted from the server.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Largest header block accepted from the server.
pub const MAX_HEADER_BYTES: usize = 16 * 1024;

/// RTSP over a single TCP connection (RFC 2326 §10.12 framing not used).
///
/// [`init`](Transport::init) connects and spawns a reader thread that
/// frames responses and delivers them to the correlator. If the server
/// closes the connection while the transport is still running, the
/// correlator is cancelled so a parked caller wakes up.
pub struct TcpTransport {
    server_addr: String,
    connect_timeout: Duration,
    writer: Option<TcpStream>,
    running: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl TcpTransport {
    pub fn new(server_addr: &str, connect_timeout: Duration) -> Self {
        Self {
            server_addr: server_addr.to_string(),
            connect_timeout,
            writer: None,
            running: Arc::new(AtomicBool::new(false)),
            reader: None,
        }
    }

    fn resolve(&self) -> Result<SocketAddr> {
        self.server_addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                RtspError::Transport(format!("cannot resolve {}", self.server_addr))
            })
    }
}

impl Transport for TcpTransport {
    fn init(&mut self, sink: Arc<ResponseCorrelator>) -> Result<()> {
        if self.writer.is_some() {
            return Ok(());
        }

        let addr = self.resolve()?;
        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout)?;
        stream.set_nodelay(true)?;
        let reader_stream = stream.try_clone()?;

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        tracing::info!(server = %addr, "connected");

        self.reader = Some(thread::spawn(move || {
            let reason = read_loop(BufReader::new(reader_stream), &sink, &running);
            if running.swap(false, Ordering::SeqCst) {
                tracing::warn!(server = %addr, reason, "connection lost");
                sink.cancel();
            } else {
                tracing::debug!(server = %addr, reason, "reader exited");
            }
        }));
        self.writer = Some(stream);
        Ok(())
    }

    fn send(&mut self, request: &RtspRequest) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(RtspError::NotConnected)?;

        tracing::debug!(
            method = %request.method,
            uri = %request.uri,
            cseq = request.cseq,
            "request"
        );

        writer
            .write_all(request.serialize().as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| RtspError::Transport(e.to_string()))
    }

    fn terminate(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(stream) = self.writer.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        if let Some(reader) = self.reader.take()
            && reader.join().is_err()
        {
            tracing::error!("reader thread panicked");
        }
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Read responses until the connection closes. Returns the reason for exiting.
fn read_loop<R: Read>(
    mut reader: BufReader<R>,
    sink: &ResponseCorrelator,
    running: &AtomicBool,
) -> &'static str {
    while running.load(Ordering::SeqCst) {
        let text = match read_message(&mut reader) {
            Ok(Some(text)) => text,
            Ok(None) => return "connection closed by server",
            Err(_) => return "read error",
        };

        if text.trim().is_empty() {
            continue;
        }

        match RtspResponse::parse(&text) {
            Ok(response) => {
                tracing::debug!(
                    status = response.status_code,
                    cseq = ?response.cseq(),
                    "response"
                );
                sink.deliver(response);
            }
            Err(RtspError::Parse { kind }) => sink.reject(kind),
            Err(e) => {
                tracing::warn!(error = %e, "unparsable response");
            }
        }
    }

    "transport terminated"
}

/// Read one message: header block up to the blank line, then
/// `Content-Length` bytes of body. `Ok(None)` on a clean EOF.
///
/// Non-UTF-8 bytes are replaced rather than rejected. Frames larger than
/// [`MAX_HEADER_BYTES`] / [`MAX_BODY_BYTES`] fail with `InvalidData`.
fn read_message<R: BufRead>(reader: &mut R) -> std::io::Result<Option<String>> {
    let mut text = String::new();
    let mut raw = Vec::new();
    loop {
        raw.clear();
        let limit = (MAX_HEADER_BYTES - text.len()) as u64 + 1;
        if reader.by_ref().take(limit).read_until(b'\n', &mut raw)? == 0 {
            return Ok(None);
        }
        if !raw.ends_with(b"\n") && text.len() + raw.len() > MAX_HEADER_BYTES {
            return Err(invalid_data("response header block too large"));
        }
        let line = String::from_utf8_lossy(&raw);
        if line == "\r\n" || line == "\n" {
            if text.is_empty() {
                continue;
            }
            text.push_str(&line);
            break;
        }
        text.push_str(&line);
        if text.len() > MAX_HEADER_BYTES {
            return Err(invalid_data("response header block too large"));
        }
    }

    let content_length = text
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("Content-Length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    if content_length > MAX_BODY_BYTES {
        return Err(invalid_data("response body too large"));
    }

    if content_length > 0 {
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body)?;
        text.push_str(&String::from_utf8_lossy(&body));
    }

    Ok(Some(text))
}

fn invalid_data(message: &'static str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frames_consecutive_messages() {
        let wire = "RTSP/1.0 200 OK\r\nCSeq: 0\r\n\r\n\
                    RTSP/1.0 200 OK\r\nCSeq: 1\r\nContent-Length: 5\r\n\r\nv=0\r\n";
        let mut reader = Cursor::new(wire.as_bytes());

        let first = read_message(&mut reader).unwrap().unwrap();
        assert_eq!(first, "RTSP/1.0 200 OK\r\nCSeq: 0\r\n\r\n");

        let second = read_message(&mut reader).unwrap().unwrap();
        assert!(second.ends_with("\r\n\r\nv=0\r\n"));
        assert_eq!(RtspResponse::parse(&second).unwrap().cseq(), Some(1));

        assert!(read_message(&mut reader).unwrap().is_none());
    }

    #[test]
    fn oversized_body_is_invalid_data() {
        let wire = "RTSP/1.0 200 OK\r\nCSeq: 0\r\nContent-Length: 18446744073709551615\r\n\r\nx";
        let err = read_message(&mut Cursor::new(wire.as_bytes())).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

        let wire = format!(
            "RTSP/1.0 200 OK\r\nCSeq: 0\r\nContent-Length: {}\r\n\r\n",
            MAX_BODY_BYTES + 1
        );
        let err = read_message(&mut Cursor::new(wire.as_bytes())).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn oversized_header_block_is_invalid_data() {
        let wire = format!(
            "RTSP/1.0 200 OK\r\nX-Padding: {}\r\n\r\n",
            "a".repeat(MAX_HEADER_BYTES)
        );
        let err = read_message(&mut Cursor::new(wire.as_bytes())).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn non_utf8_header_is_replaced() {
        let mut wire = b"RTSP/1.0 200 Caf\xe9\r\nCSeq: 4\r\n\r\n".to_vec();
        wire.extend_from_slice(b"RTSP/1.0 200 OK\r\nCSeq: 5\r\n\r\n");
        let mut reader = Cursor::new(wire);

        let text = read_message(&mut reader).unwrap().unwrap();
        let response = RtspResponse::parse(&text).unwrap();
        assert_eq!(response.cseq(), Some(4));
        assert_eq!(response.reason, "Caf\u{FFFD}");

        let text = read_message(&mut reader).unwrap().unwrap();
        assert_eq!(RtspResponse::parse(&text).unwrap().cseq(), Some(5));
    }

    #[test]
    fn skips_leading_blank_lines() {
        let mut reader = Cursor::new("\r\nRTSP/1.0 200 OK\r\nCSeq: 3\r\n\r\n".as_bytes());
        let text = read_message(&mut reader).unwrap().unwrap();
        assert!(text.starts_with("RTSP/1.0 200 OK"));
    }

    #[test]
    fn send_before_init_is_not_connected() {
        let mut transport = TcpTransport::new("127.0.0.1:1", Duration::from_millis(10));
        let request = RtspRequest::new(crate::protocol::MethodKind::CapabilityDiscovery, "rtsp://h/", 0);
        assert!(matches!(
            transport.send(&request),
            Err(RtspError::NotConnected)
        ));
    }
}
