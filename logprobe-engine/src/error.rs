//! Engine error types

use logprobe_client::ClientError;
use logprobe_core::domain::RequestError;
use thiserror::Error;

/// Errors that stop a verification before or outside polling
///
/// A category that is merely missing, ambiguous or failing on the backend is
/// not an error: it is reported as `false` in the result.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The request or the engine configuration cannot be used
    #[error("configuration error: {0}")]
    Config(String),

    /// A backend call failed outside of a verification
    #[error(transparent)]
    Backend(#[from] ClientError),
}

impl From<RequestError> for VerifyError {
    fn from(err: RequestError) -> Self {
        VerifyError::Config(err.to_string())
    }
}

impl VerifyError {
    pub fn is_config(&self) -> bool {
        matches!(self, VerifyError::Config(_))
    }
}

/// Why a single category check stopped polling
#[derive(Debug)]
pub(crate) enum CheckError {
    /// More than one group matched a pattern that must be unique
    Ambiguous(Vec<String>),
    /// Backend failure that retrying will not fix
    Backend(ClientError),
}

impl From<ClientError> for CheckError {
    fn from(err: ClientError) -> Self {
        CheckError::Backend(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_is_config() {
        let err = VerifyError::from(RequestError::NoNodes);
        assert!(err.is_config());
        assert_eq!(
            err.to_string(),
            "configuration error: infrastructure verification requires at least one node"
        );
    }
}
