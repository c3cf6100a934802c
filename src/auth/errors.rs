use thiserror::Error;

use crate::transport::envelope::{ApiError, Envelope, CODE_SESSION_EXPIRED};

/// Terminal refresh failures. Each one ends the session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Token refresh failed: {0}")]
    RefreshRejected(String),

    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("Session changed while refreshing")]
    SessionChanged,

    /// No answer from the backend; says nothing about the refresh token itself
    #[error("Backend unreachable during refresh: {0}")]
    Unreachable(String),
}

impl AuthError {
    /// Failures that prove the refresh token is unusable
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AuthError::Unreachable(_) | AuthError::SessionChanged)
    }

    pub fn to_api_error(&self) -> ApiError {
        ApiError::with_code(self.to_string(), CODE_SESSION_EXPIRED)
    }
}

impl<T> From<AuthError> for Envelope<T> {
    fn from(err: AuthError) -> Self {
        Envelope::failure(err.to_api_error())
    }
}
