//! Error types for market catalog requests

/// Errors that can occur while fetching the market catalog
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// Connection could not be established or was dropped
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// Body was not a market catalog
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Base URL could not be used
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    /// Anything else
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl CatalogError {
    /// Build an error from a non-success HTTP status
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            "no body".to_string()
        } else {
            body.trim().chars().take(200).collect()
        };
        Self::Status { status, message }
    }

    /// Stable error code for logs and UI
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "network_error",
            Self::Timeout => "timeout_error",
            Self::Status { status: 401, .. } => "unauthorized",
            Self::Status { status: 403, .. } => "forbidden",
            Self::Status { status: 404, .. } => "not_found",
            Self::Status { status, .. } if *status >= 500 => "server_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Status { .. } | Self::InvalidUrl(_) | Self::Unknown(_) => "unknown_error",
        }
    }

    /// Check if retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() || err.is_request() {
            Self::Network(err.to_string())
        } else if err.is_decode() || err.is_body() {
            Self::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Unknown(err.to_string())
        }
    }
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(CatalogError::from_status(401, "").code(), "unauthorized");
        assert_eq!(CatalogError::from_status(403, "").code(), "forbidden");
        assert_eq!(CatalogError::from_status(404, "").code(), "not_found");
        assert_eq!(CatalogError::from_status(500, "").code(), "server_error");
        assert_eq!(CatalogError::from_status(503, "").code(), "server_error");
        assert_eq!(CatalogError::from_status(418, "").code(), "unknown_error");
    }

    #[test]
    fn test_other_codes() {
        assert_eq!(CatalogError::Network("refused".into()).code(), "network_error");
        assert_eq!(CatalogError::Timeout.code(), "timeout_error");
        assert_eq!(CatalogError::InvalidResponse("x".into()).code(), "invalid_response");
        assert_eq!(CatalogError::Unknown("x".into()).code(), "unknown_error");
    }

    #[test]
    fn test_retryable() {
        assert!(CatalogError::Timeout.is_retryable());
        assert!(CatalogError::from_status(502, "bad gateway").is_retryable());
        assert!(!CatalogError::from_status(404, "").is_retryable());
        assert!(!CatalogError::InvalidResponse("x".into()).is_retryable());
    }

    #[test]
    fn test_status_message_trimmed() {
        let err = CatalogError::from_status(500, &"x".repeat(500));
        match err {
            CatalogError::Status { message, .. } => assert_eq!(message.len(), 200),
            other => panic!("unexpected {other:?}"),
        }
    }
}
