use std::fmt;

/// The RTSP methods a publishing client issues, in protocol order.
///
/// Each variant has a fixed position in the progression
/// OPTIONS → ANNOUNCE → SETUP → RECORD → TEARDOWN. Anything outside that
/// progression maps to [`Invalid`](Self::Invalid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// OPTIONS (RFC 2326 §10.1).
    CapabilityDiscovery,
    /// ANNOUNCE (RFC 2326 §10.3), carries the SDP body.
    Announce,
    /// SETUP (RFC 2326 §10.4).
    Setup,
    /// RECORD (RFC 2326 §10.11).
    Start,
    /// TEARDOWN (RFC 2326 §10.7).
    Teardown,
    Invalid,
}

impl MethodKind {
    /// Methods the server must advertise in `Public` for a record session.
    pub const REQUIRED: [MethodKind; 4] = [
        MethodKind::Announce,
        MethodKind::Setup,
        MethodKind::Start,
        MethodKind::Teardown,
    ];

    /// Map a position in the progression to its method.
    ///
    /// ```
    /// use rtsp::protocol::MethodKind;
    ///
    /// assert_eq!(MethodKind::from_position(0), MethodKind::CapabilityDiscovery);
    /// assert_eq!(MethodKind::from_position(4), MethodKind::Teardown);
    /// assert_eq!(MethodKind::from_position(-1), MethodKind::Invalid);
    /// assert_eq!(MethodKind::from_position(5), MethodKind::Invalid);
    /// ```
    pub fn from_position(position: i64) -> Self {
        match position {
            0 => MethodKind::CapabilityDiscovery,
            1 => MethodKind::Announce,
            2 => MethodKind::Setup,
            3 => MethodKind::Start,
            4 => MethodKind::Teardown,
            _ => MethodKind::Invalid,
        }
    }

    /// Position in the progression, or `None` for [`Invalid`](Self::Invalid).
    pub fn position(self) -> Option<i64> {
        match self {
            MethodKind::CapabilityDiscovery => Some(0),
            MethodKind::Announce => Some(1),
            MethodKind::Setup => Some(2),
            MethodKind::Start => Some(3),
            MethodKind::Teardown => Some(4),
            MethodKind::Invalid => None,
        }
    }

    /// Method token as written on the request line.
    pub fn as_str(self) -> &'static str {
        match self {
            MethodKind::CapabilityDiscovery => "OPTIONS",
            MethodKind::Announce => "ANNOUNCE",
            MethodKind::Setup => "SETUP",
            MethodKind::Start => "RECORD",
            MethodKind::Teardown => "TEARDOWN",
            MethodKind::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
