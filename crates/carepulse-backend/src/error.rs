//! Backend error types.

use serde::Deserialize;

/// Errors returned by the backend services.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The resource already exists (HTTP 409), e.g. a user with the same email.
    #[error("Conflict: {message}")]
    Conflict {
        /// Message reported by the backend.
        message: String,
    },

    /// The requested resource does not exist (HTTP 404).
    #[error("Not found: {message}")]
    NotFound {
        /// Message reported by the backend.
        message: String,
    },

    /// Any other non-success response.
    #[error("Backend returned {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Backend error type, when reported.
        kind: Option<String>,
        /// Message reported by the backend.
        message: String,
    },

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// The client could not be built from its configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Error body returned by the backend REST API.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl BackendError {
    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new `Http` error without a backend error type.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            kind: None,
            message: message.into(),
        }
    }

    /// Map a non-success status and its body to an error.
    pub(crate) fn from_status(status: u16, body: &str) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        let message = parsed
            .as_ref()
            .map(|b| b.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.trim().to_string());
        match status {
            409 => Self::conflict(message),
            404 => Self::not_found(message),
            _ => Self::Http {
                status,
                kind: parsed.and_then(|b| b.kind),
                message,
            },
        }
    }

    /// Returns true when the backend reported a duplicate resource.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns true when the backend reported a missing resource.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP status associated with the error, if the backend answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Conflict { .. } => Some(409),
            Self::NotFound { .. } => Some(404),
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) | Self::Config(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_status_codes() {
        let body = r#"{"message":"A user with the same id, email, or phone already exists in this project.","code":409,"type":"user_already_exists"}"#;
        let err = BackendError::from_status(409, body);
        assert!(err.is_conflict());
        assert!(err.to_string().contains("already exists"));

        let err = BackendError::from_status(404, r#"{"message":"User with the requested ID could not be found."}"#);
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn keeps_error_type_for_other_statuses() {
        let err = BackendError::from_status(
            401,
            r#"{"message":"Missing scope","code":401,"type":"general_unauthorized_scope"}"#,
        );
        match err {
            BackendError::Http { status, kind, message } => {
                assert_eq!(status, 401);
                assert_eq!(kind.as_deref(), Some("general_unauthorized_scope"));
                assert_eq!(message, "Missing scope");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_raw_body() {
        let err = BackendError::from_status(502, "bad gateway\n");
        assert_eq!(err.to_string(), "Backend returned 502: bad gateway");
    }
}
