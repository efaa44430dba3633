// Error handling module
// Defines the dispatch error taxonomy and its mapping onto a normalized response

use serde_json::Value;
use thiserror::Error;

use crate::models::response::{Response, CODE_UNAUTHORIZED};

/// Error code reported for failures that never reached the server
pub const CODE_CLIENT_ERROR: i64 = -1;

/// Error code reported for malformed requests built locally
pub const CODE_BAD_REQUEST: i64 = 400;

/// Why the refresh sub-protocol could not renew the session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RefreshFailure {
    /// No refresh token in the credential store
    #[error("no refresh token")]
    NoRefreshToken,

    /// The auth service call failed or was rejected; the session was torn down
    #[error("refresh rejected: {0}")]
    Rejected(String),
}

/// How an application error is surfaced, decided by the call's flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSurface {
    /// Rejected with the message, nothing shown to the user
    Silent,
    /// Rejected with the message for the caller to handle
    Explicit,
    /// Rejected with the data payload and shown through the error notifier
    Default,
}

/// Detail a rejected application error carries
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    Message(String),
    Data(Value),
}

/// Errors that can terminate a dispatch
#[derive(Error, Debug)]
pub enum DispatchError {
    /// URL template placeholder without a binding
    #[error("Missing path variable: {0}")]
    MissingPathVariable(String),

    /// Resolved URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Authenticated call without a stored access token; login redirect was triggered
    #[error("No access token available; redirected to login")]
    NoCredential,

    /// Server reported 401 and the credentials were refreshed; the call must be reissued
    #[error("Session expired; credentials refreshed, reissue the request")]
    SessionExpired,

    /// Server reported 401 and the credentials could not be refreshed
    #[error("Session refresh failed: {0}")]
    RefreshFailed(RefreshFailure),

    /// Server reported a status other than 200 or 401
    #[error("Application error: {code} - {message}")]
    Application {
        code: i64,
        message: String,
        detail: ErrorDetail,
        surface: ErrorSurface,
    },

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Response body is not a valid envelope or its data does not match the expected type
    #[error("Invalid response envelope: {0}")]
    InvalidEnvelope(String),

    /// Credential store failure
    #[error("Credential store error: {0}")]
    Store(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DispatchError {
    /// Whether a login redirect superseded normal completion of the call
    pub fn redirected(&self) -> bool {
        matches!(
            self,
            DispatchError::NoCredential
                | DispatchError::RefreshFailed(RefreshFailure::Rejected(_))
        )
    }

    /// Numeric code used in a normalized failure response
    pub fn error_code(&self) -> i64 {
        match self {
            DispatchError::MissingPathVariable(_) | DispatchError::InvalidUrl(_) => {
                CODE_BAD_REQUEST
            }
            DispatchError::NoCredential
            | DispatchError::SessionExpired
            | DispatchError::RefreshFailed(_) => CODE_UNAUTHORIZED,
            DispatchError::Application { code, .. } => *code,
            DispatchError::Network(_)
            | DispatchError::InvalidEnvelope(_)
            | DispatchError::Store(_)
            | DispatchError::Internal(_) => CODE_CLIENT_ERROR,
        }
    }

    /// Message used in a normalized failure response
    pub fn error_message(&self) -> String {
        match self {
            DispatchError::Application { message, .. } if !message.is_empty() => message.clone(),
            DispatchError::RefreshFailed(reason) => reason.to_string(),
            other => other.to_string(),
        }
    }

    /// Fold the error into a `success: false` response
    ///
    /// Payload data is kept when the server sent one that decodes as `T`.
    pub fn into_response<T: serde::de::DeserializeOwned>(self) -> Response<T> {
        let error_code = self.error_code();
        let error_message = self.error_message();
        let data = match self {
            DispatchError::Application {
                detail: ErrorDetail::Data(value),
                ..
            } => serde_json::from_value(value).ok(),
            _ => None,
        };
        Response::Failure {
            error_code,
            error_message,
            data,
        }
    }
}

/// Result type alias for dispatch operations
pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_messages() {
        let err = DispatchError::MissingPathVariable("id".to_string());
        assert_eq!(err.to_string(), "Missing path variable: id");

        let err = DispatchError::RefreshFailed(RefreshFailure::NoRefreshToken);
        assert_eq!(err.to_string(), "Session refresh failed: no refresh token");

        let err = DispatchError::Application {
            code: 500,
            message: "boom".to_string(),
            detail: ErrorDetail::Message("boom".to_string()),
            surface: ErrorSurface::Silent,
        };
        assert_eq!(err.to_string(), "Application error: 500 - boom");
    }

    #[test]
    fn test_internal_error_message() {
        let err = DispatchError::Internal(anyhow::anyhow!("Something went wrong"));
        assert_eq!(err.to_string(), "Internal error: Something went wrong");
    }

    #[test]
    fn test_redirected() {
        assert!(DispatchError::NoCredential.redirected());
        assert!(DispatchError::RefreshFailed(RefreshFailure::Rejected("x".into())).redirected());
        assert!(!DispatchError::RefreshFailed(RefreshFailure::NoRefreshToken).redirected());
        assert!(!DispatchError::SessionExpired.redirected());
        assert!(!DispatchError::Network("down".into()).redirected());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            DispatchError::MissingPathVariable("id".into()).error_code(),
            CODE_BAD_REQUEST
        );
        assert_eq!(DispatchError::SessionExpired.error_code(), 401);
        assert_eq!(
            DispatchError::Network("timeout".into()).error_code(),
            CODE_CLIENT_ERROR
        );
        let err = DispatchError::Application {
            code: 503,
            message: "down".into(),
            detail: ErrorDetail::Message("down".into()),
            surface: ErrorSurface::Explicit,
        };
        assert_eq!(err.error_code(), 503);
    }

    #[test]
    fn test_into_response_keeps_decodable_data() {
        let err = DispatchError::Application {
            code: 422,
            message: "invalid".into(),
            detail: ErrorDetail::Data(json!({"field": "name"})),
            surface: ErrorSurface::Default,
        };
        let resp: Response<serde_json::Value> = err.into_response();
        assert_eq!(
            resp,
            Response::Failure {
                error_code: 422,
                error_message: "invalid".into(),
                data: Some(json!({"field": "name"})),
            }
        );
    }

    #[test]
    fn test_into_response_refresh_reason() {
        let resp: Response<i32> =
            DispatchError::RefreshFailed(RefreshFailure::NoRefreshToken).into_response();
        assert_eq!(resp, Response::failure(401, "no refresh token"));
    }
}
