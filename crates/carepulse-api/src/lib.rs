use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use carepulse_core::{FieldViolation, ValidationErrors};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON error body: `{"error": {"code", "message", "fields"}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetail {
    /// Stable machine-readable cause
    pub code: String,
    pub message: String,
    /// Per-field validation messages, in form declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldMessage {
    pub field: String,
    pub message: String,
}

impl From<&FieldViolation> for FieldMessage {
    fn from(v: &FieldViolation) -> Self {
        Self {
            field: v.field.clone(),
            message: v.message.clone(),
        }
    }
}

/// High-level API errors mapped to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{errors}")]
    Validation { errors: ValidationErrors },
    /// A backend call failed; `code` names the step that failed.
    #[error("Upstream failure ({code}): {message}")]
    BadGateway { code: String, message: String },
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn validation(errors: ValidationErrors) -> Self {
        Self::Validation { errors }
    }
    pub fn bad_gateway(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::BadGateway {
            code: code.into(),
            message: msg.into(),
        }
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Validation { .. } => "validation_failed",
            ApiError::BadGateway { code, .. } => code,
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let (message, fields) = match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Internal(msg) => (msg.clone(), Vec::new()),
            ApiError::BadGateway { message, .. } => (message.clone(), Vec::new()),
            ApiError::Validation { errors } => (
                "One or more fields are invalid".to_string(),
                errors.iter().map(FieldMessage::from).collect(),
            ),
        };
        ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
                fields,
            },
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation(errors)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::to_vec(&self.to_body()).unwrap_or_else(|_| {
            br#"{"error":{"code":"internal","message":"Serialization failure"}}"#.to_vec()
        });

        let mut response = (status, body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}
