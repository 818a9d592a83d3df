use crate::error::ParseErrorKind;

/// Server-side RTP/RTCP ports negotiated during SETUP (RFC 2326 §12.39).
///
/// ## Wire format example
///
/// ```text
/// Client → Server:
///   Transport: RTP/AVP;unicast;client_port=50000-50001;mode=record
///
/// Server → Client:
///   Transport: RTP/AVP;unicast;client_port=50000-50001;server_port=6970-6971
/// ```
///
/// The client sends RTP to `server:data_port` and RTCP to
/// `server:control_port`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerPorts {
    /// Server's RTP receive port.
    pub data_port: u16,
    /// Server's RTCP port (typically `data_port + 1`).
    pub control_port: u16,
}

impl ServerPorts {
    /// Parse the `server_port=<low>-<high>` pair out of a `Transport`
    /// header value.
    ///
    /// ## Examples
    ///
    /// ```
    /// use rtsp::session::transport::ServerPorts;
    ///
    /// let ports = ServerPorts::parse("RTP/AVP;unicast;server_port=6970-6971").unwrap();
    /// assert_eq!(ports.data_port, 6970);
    /// assert_eq!(ports.control_port, 6971);
    ///
    /// assert!(ServerPorts::parse("RTP/AVP;unicast;server_port=6970").is_err());
    /// ```
    pub fn parse(header: &str) -> Result<Self, ParseErrorKind> {
        let ports = header
            .split(';')
            .map(str::trim)
            .find_map(|part| part.strip_prefix("server_port="))
            .ok_or(ParseErrorKind::MissingHeader("server_port"))?;

        let invalid = || ParseErrorKind::InvalidPortRange(ports.to_string());

        let (low, high) = ports.split_once('-').ok_or_else(invalid)?;
        let data_port: u16 = low.trim().parse().map_err(|_| invalid())?;
        let control_port: u16 = high.trim().parse().map_err(|_| invalid())?;

        Ok(ServerPorts {
            data_port,
            control_port,
        })
    }
}

/// Build the client `Transport` header for a record session.
pub fn client_transport_header(rtp_port: u16, rtcp_port: u16) -> String {
    format!(
        "RTP/AVP;unicast;client_port={}-{};mode=record",
        rtp_port, rtcp_port
    )
}
