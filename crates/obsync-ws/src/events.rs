//! Transport lifecycle events

use std::fmt;

/// Stream transport state
///
/// `Idle → Connecting → Open → Closed`. `Closed → Connecting` only happens
/// through an explicit `connect()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// Never connected
    #[default]
    Idle,
    /// Socket handshake in progress
    Connecting,
    /// Connected; sends go straight to the socket
    Open,
    /// Closed by the application, the server or a network failure
    Closed,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Reason the socket went down without the application asking for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Server closed the connection
    ServerClosed,
    /// Network error occurred while open
    NetworkError(String),
    /// The connection attempt itself failed
    ConnectFailed(String),
}

/// Payload of a close notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// Why the socket closed
    pub reason: DisconnectReason,
}

impl CloseEvent {
    /// Create a close event
    pub fn new(reason: DisconnectReason) -> Self {
        Self { reason }
    }

    /// True if the socket never reached the open state
    pub fn is_connect_failure(&self) -> bool {
        matches!(self.reason, DisconnectReason::ConnectFailed(_))
    }
}

/// Close code and reason sent with an application-initiated close
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// WebSocket close code (1000 = normal closure)
    pub code: u16,
    /// Human-readable reason
    pub reason: String,
}

impl CloseFrame {
    /// Normal closure (1000) with a reason
    pub fn normal(reason: impl Into<String>) -> Self {
        Self {
            code: 1000,
            reason: reason.into(),
        }
    }
}
