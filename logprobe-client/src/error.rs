//! Error types for the backend clients

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// AWS error codes worth retrying
const TRANSIENT_AWS_CODES: &[&str] = &[
    "ThrottlingException",
    "ServiceUnavailableException",
    "RequestLimitExceeded",
    "LimitExceededException",
    "InternalFailure",
];

/// Errors that can occur when querying a log store
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Backend returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the backend
        message: String,
    },

    /// AWS service returned a typed error
    #[error("AWS error {code} (status {status}): {message}")]
    AwsError {
        status: u16,
        code: String,
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Request could not be built from the given parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A non-HTTP transport (e.g. exec into a pod) failed
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ApiError { status: 404, .. } => true,
            Self::AwsError { code, .. } => code == "ResourceNotFoundException",
            _ => false,
        }
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(status) if (400..500).contains(&status))
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(status) if status >= 500)
    }

    /// Whether retrying the same call later may succeed
    ///
    /// Timeouts, connection failures, rate limiting and server errors are
    /// transient. Authentication failures and malformed responses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            Self::ApiError { status, .. } => matches!(status, 408 | 429) || *status >= 500,
            Self::AwsError { status, code, .. } => {
                *status >= 500 || TRANSIENT_AWS_CODES.contains(&code.as_str())
            }
            Self::Transport(_) => true,
            Self::ParseError(_) | Self::InvalidRequest(_) => false,
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } | Self::AwsError { status, .. } => Some(*status),
            Self::RequestFailed(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
