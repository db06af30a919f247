// HTTP API error type and the domain-error classification table.
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::models::InvalidEnumValue;
use crate::services::{Family, ServiceError};

/// Transport error carried out of every handler. Status, stable code and a
/// client-safe message travel together; the failure envelope is built from
/// them in exactly one place.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    Validation { code: String, message: String },

    // 401 Unauthorized
    Unauthorized { code: &'static str, message: String },

    // 403 Forbidden
    Forbidden { code: &'static str, message: String },

    // 404 Not Found
    NotFound { family: Family, message: String },

    // 409 Conflict
    Conflict { code: String, message: String },

    // 500 Internal Server Error
    Internal { code: String, message: String },
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Validation { .. } => 400,
            ApiError::Unauthorized { .. } => 401,
            ApiError::Forbidden { .. } => 403,
            ApiError::NotFound { .. } => 404,
            ApiError::Conflict { .. } => 409,
            ApiError::Internal { .. } => 500,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> String {
        match self {
            ApiError::Validation { code, .. } => code.clone(),
            ApiError::Unauthorized { code, .. } => (*code).to_string(),
            ApiError::Forbidden { code, .. } => (*code).to_string(),
            ApiError::NotFound { family, .. } => format!("{}_NOT_FOUND", family.code_fragment()),
            ApiError::Conflict { code, .. } => code.clone(),
            ApiError::Internal { code, .. } => code.clone(),
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation { message, .. } => message,
            ApiError::Unauthorized { message, .. } => message,
            ApiError::Forbidden { message, .. } => message,
            ApiError::NotFound { message, .. } => message,
            ApiError::Conflict { message, .. } => message,
            ApiError::Internal { message, .. } => message,
        }
    }

    /// Failure envelope body. Shape is fixed: machine code and message inside
    /// `error`, nothing else.
    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": {
                "code": self.error_code(),
                "message": self.message(),
            }
        })
    }
}

// Static constructor methods used at validation and authorization sites
impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation { code: "VALIDATION_ERROR".to_string(), message: message.into() }
    }

    /// 400 with an `INVALID_<FIELD>` code for a single bad field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            code: format!("INVALID_{}", field.to_uppercase()),
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        ApiError::Validation { code: "INVALID_REQUEST".to_string(), message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized { code: "UNAUTHORIZED", message: message.into() }
    }

    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized {
            code: "INVALID_CREDENTIALS",
            message: "Invalid credentials".to_string(),
        }
    }

    pub fn invalid_refresh_token() -> Self {
        ApiError::Unauthorized {
            code: "INVALID_REFRESH_TOKEN",
            message: "Refresh token is invalid or expired".to_string(),
        }
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        ApiError::Forbidden { code: "ACCESS_DENIED", message: message.into() }
    }

    pub fn insufficient_privilege(message: impl Into<String>) -> Self {
        ApiError::Forbidden { code: "INSUFFICIENT_PRIVILEGE", message: message.into() }
    }

    pub fn not_found(family: Family) -> Self {
        ApiError::NotFound { family, message: format!("{} not found", family) }
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Conflict { code: code.into(), message: message.into() }
    }

    /// 500 with an `<ACTION>_FAILED` code; `action` is the family verb, e.g.
    /// "login" or "create_workspace".
    pub fn internal(action: &str) -> Self {
        ApiError::Internal {
            code: format!("{}_FAILED", action.to_uppercase()),
            message: "An error occurred while processing your request".to_string(),
        }
    }
}

/// The classification table. This `From` impl is the only place domain
/// errors become HTTP policy.
impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidCredentials => ApiError::invalid_credentials(),
            ServiceError::InvalidRefreshToken => ApiError::invalid_refresh_token(),
            ServiceError::NotFound(family) => ApiError::not_found(family),
            ServiceError::AccessDenied(msg) => ApiError::access_denied(msg),
            ServiceError::InsufficientPrivilege(msg) => ApiError::insufficient_privilege(msg),
            ServiceError::Validation(msg) => ApiError::validation(msg),
            ServiceError::InvalidField { field, message } => {
                ApiError::invalid_field(field, message)
            }
            ServiceError::AlreadyRead => {
                ApiError::conflict("ALREADY_READ", "Notification is already read")
            }
            ServiceError::MemberAlreadyExists => ApiError::conflict(
                "MEMBER_ALREADY_EXISTS",
                "User is already a member of this workspace",
            ),
            ServiceError::Conflict { state, message } => {
                ApiError::conflict(format!("{}_CONFLICT", state.to_uppercase()), message)
            }
            ServiceError::Internal { action, source } => {
                // Log the real error but return a generic message
                tracing::error!("service action '{}' failed: {:#}", action, source);
                ApiError::internal(action)
            }
            ServiceError::Other(source) => {
                tracing::error!("unclassified service error: {:#}", source);
                ApiError::Internal {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An error occurred while processing your request".to_string(),
                }
            }
        }
    }
}

impl From<crate::render::RenderError> for ApiError {
    fn from(err: crate::render::RenderError) -> Self {
        tracing::error!("fragment rendering failed: {}", err);
        ApiError::internal("render")
    }
}

impl From<InvalidEnumValue> for ApiError {
    fn from(err: InvalidEnumValue) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
