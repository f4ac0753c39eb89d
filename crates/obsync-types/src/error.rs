//! Error types for the order book synchronization engine
//!
//! Nothing in this taxonomy is fatal to the process. The worst outcome of any
//! variant is a temporarily stale or empty view until the next good snapshot.

use crate::{AmountError, ChecksumParseError};
use thiserror::Error;

/// What the engine does about an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Request a fresh snapshot for the current market
    Resubscribe,
    /// Drop the offending frame and continue
    Drop,
    /// Leave it to the caller's reconnect policy
    Reconnect,
    /// Nothing to do
    None,
}

/// Main error type for synchronization operations
#[derive(Error, Debug)]
pub enum SyncError {
    // === Connection Errors ===
    /// Socket-level failure; the connection is marked down
    #[error("transport error: {0}")]
    Transport(String),

    // === Protocol Errors ===
    /// Inbound frame was not valid JSON or did not match the message schema
    #[error("invalid frame: {message}")]
    Parse {
        message: String,
        raw: Option<String>,
    },

    /// Local top-of-book disagrees with the server's checksum
    #[error("checksum mismatch for market {market_id}: expected {expected}, computed {computed}")]
    ChecksumMismatch {
        market_id: String,
        expected: u32,
        computed: u32,
    },

    /// Delta arrived before any snapshot for the market
    #[error("update for market {market_id} arrived before a snapshot")]
    ProtocolGap { market_id: String },

    /// Frame for a market other than the selected one
    #[error("frame for market {received} while {selected} is selected")]
    StaleMarketFrame { selected: String, received: String },

    // === Value Errors ===
    /// Malformed price or quantity
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),

    /// Malformed checksum value
    #[error(transparent)]
    InvalidChecksum(#[from] ChecksumParseError),

    // === Setup Errors ===
    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SyncError {
    /// Create a parse error from a serde failure and the offending frame
    pub fn parse(err: &serde_json::Error, raw: impl Into<String>) -> Self {
        Self::Parse {
            message: err.to_string(),
            raw: Some(raw.into()),
        }
    }

    /// Create a checksum mismatch error
    pub fn checksum_mismatch(market_id: impl Into<String>, expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch {
            market_id: market_id.into(),
            expected,
            computed,
        }
    }

    /// Always false: the core never takes the process down
    pub fn is_fatal(&self) -> bool {
        false
    }

    /// True for conditions that are expected during warm-up or market switches
    pub fn is_expected_transient(&self) -> bool {
        matches!(self, Self::ProtocolGap { .. } | Self::StaleMarketFrame { .. })
    }

    /// Get the recovery action for this error
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::ChecksumMismatch { .. } => Recovery::Resubscribe,
            Self::Parse { .. }
            | Self::ProtocolGap { .. }
            | Self::StaleMarketFrame { .. }
            | Self::InvalidAmount(_)
            | Self::InvalidChecksum(_) => Recovery::Drop,
            Self::Transport(_) => Recovery::Reconnect,
            Self::Configuration(_) => Recovery::None,
        }
    }
}

/// Result type alias for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_strategy() {
        let err = SyncError::checksum_mismatch("1", 123, 456);
        assert_eq!(err.recovery(), Recovery::Resubscribe);
        assert!(!err.is_fatal());

        let err = SyncError::ProtocolGap { market_id: "1".into() };
        assert_eq!(err.recovery(), Recovery::Drop);
        assert!(err.is_expected_transient());

        let err = SyncError::Transport("reset by peer".into());
        assert_eq!(err.recovery(), Recovery::Reconnect);
        assert!(!err.is_expected_transient());
    }

    #[test]
    fn test_parse_error_keeps_raw_frame() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = SyncError::parse(&serde_err, "{oops");
        match err {
            SyncError::Parse { raw, .. } => assert_eq!(raw.as_deref(), Some("{oops")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        let err = SyncError::checksum_mismatch("4", 1, 2);
        assert_eq!(
            err.to_string(),
            "checksum mismatch for market 4: expected 1, computed 2"
        );
    }
}
