//! Classified request outcomes.

use super::{ApiRequest, ApiResponse};
use crate::config::ExcludedPaths;
use crate::errors::TransportError;

/// What a finished request means for the caller.
///
/// Computed after the stage chain has run, so any session or connectivity
/// side effect has already been applied by the time a caller sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedOutcome {
    /// 2xx/3xx with the raw body.
    Success(Vec<u8>),
    /// 401. `password_validation` is true when the request was the
    /// current-password check, in which case the session was left alone.
    Unauthorized {
        /// Whether this was the password validation endpoint.
        password_validation: bool,
    },
    /// 5xx.
    ServerError(u16),
    /// Any other 4xx; passed through with no side effects.
    Rejected(u16),
    /// No response arrived.
    TransportFailure(TransportError),
}

impl ClassifiedOutcome {
    /// Classifies the result of running `request` through the pipeline.
    #[must_use]
    pub fn classify(
        request: &ApiRequest,
        result: Result<ApiResponse, TransportError>,
        excluded: &ExcludedPaths,
    ) -> Self {
        match result {
            Err(err) => Self::TransportFailure(err),
            Ok(response) if response.is_unauthorized() => Self::Unauthorized {
                password_validation: excluded.is_logout_exempt(&request.path),
            },
            Ok(response) if response.is_server_error() => Self::ServerError(response.status),
            Ok(response) if response.status >= 400 => Self::Rejected(response.status),
            Ok(response) => Self::Success(response.body),
        }
    }

    /// Returns true for `Success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true if the outcome ended the session.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized {
                password_validation: false
            }
        )
    }

    /// Returns the status code, if a response arrived.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Success(_) | Self::TransportFailure(_) => None,
            Self::Unauthorized { .. } => Some(401),
            Self::ServerError(code) | Self::Rejected(code) => Some(*code),
        }
    }
}
