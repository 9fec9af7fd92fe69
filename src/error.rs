// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

/// The single place failure classification happens. Every failure raised
/// anywhere in a request's processing chain propagates here unhandled, and
/// this type alone decides the HTTP status and body. No handler makes its
/// own status-code decision.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request (malformed resource identifier)
    BadRequest(String),

    // 401 Unauthorized (missing/invalid credential)
    Unauthorized(String),

    // 401 Unauthorized (ownership mismatch). This API reports ownership
    // failures as 401 rather than the conventional 403; established
    // contract, do not change without revising the whole taxonomy.
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 422 Unprocessable Entity (store rejected a document)
    ValidationError {
        message: String,
        field_errors: HashMap<String, String>,
    },

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::ValidationError { .. } => 422,
            ApiError::InternalServerError(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Convert to JSON response body. Only validation and internal errors
    /// carry a body; 400/401/404 are status-only responses.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            ApiError::ValidationError { message, field_errors } => Some(json!({
                "error": true,
                "message": message,
                "code": self.error_code(),
                "field_errors": field_errors,
            })),
            ApiError::InternalServerError(_) => Some(json!({
                "error": true,
                "message": self.message(),
                "code": self.error_code(),
            })),
            _ => None,
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: HashMap<String, String>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

// Convert store failures to ApiError
impl From<crate::store::StoreError> for ApiError {
    fn from(err: crate::store::StoreError) -> Self {
        match err {
            crate::store::StoreError::Validation { field_errors } => {
                ApiError::validation_error("Missing or invalid required fields", field_errors)
            }
            crate::store::StoreError::Connection(msg) => {
                tracing::error!("Store connection error: {}", msg);
                ApiError::internal_server_error("Store temporarily unavailable")
            }
            crate::store::StoreError::Sqlx(sqlx_err) => {
                // Log the real error but return a generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

// Standard error trait implementations
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

        match self.to_json() {
            Some(body) => (status, Json(body)).into_response(),
            None => status.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_mismatch_maps_to_401() {
        assert_eq!(ApiError::forbidden("not yours").status_code(), 401);
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(ApiError::bad_request("bad id").status_code(), 400);
        assert_eq!(ApiError::unauthorized("no token").status_code(), 401);
        assert_eq!(ApiError::not_found("gone").status_code(), 404);
        assert_eq!(
            ApiError::validation_error("invalid", HashMap::new()).status_code(),
            422
        );
        assert_eq!(ApiError::internal_server_error("boom").status_code(), 500);
    }

    #[test]
    fn not_found_carries_no_body() {
        assert!(ApiError::not_found("gone").to_json().is_none());
        assert!(ApiError::forbidden("not yours").to_json().is_none());
        assert!(ApiError::bad_request("bad id").to_json().is_none());
    }

    #[test]
    fn validation_body_includes_field_detail() {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), "This field is required".to_string());
        let body = ApiError::validation_error("Missing or invalid required fields", fields)
            .to_json()
            .unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field_errors"]["name"], "This field is required");
    }
}
