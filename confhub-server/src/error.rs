//! HTTP error mapping for confhub-server
//!
//! Every handler returns [`ApiResult`]. Errors render as
//! `{"error": {"code": ..., "message": ...}}` with the status taken from the
//! error kind. Permission failures and internal faults never echo their
//! detail to the client.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use confhub_common::Error;
use serde_json::json;
use tracing::{debug, error};

const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action";
const INTERNAL_MESSAGE: &str = "Internal server error";

/// API error type
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Error::ProfileNotFound(_) => StatusCode::NOT_FOUND,
            Error::RoleNotSupported(_) => StatusCode::FORBIDDEN,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Internal(_)
            | Error::Database(_)
            | Error::Serialization(_)
            | Error::Io(_)
            | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show the caller
    fn public_message(&self) -> String {
        match &self.0 {
            Error::Unauthenticated(_) => "Authentication required".to_string(),
            Error::ProfileNotFound(_) => "Profile not found".to_string(),
            Error::RoleNotSupported(_) => "Role not supported".to_string(),
            Error::Forbidden(_) => FORBIDDEN_MESSAGE.to_string(),
            Error::NotFound(msg)
            | Error::InvalidArgument(msg)
            | Error::ServiceUnavailable(msg)
            | Error::Conflict(msg) => msg.clone(),
            _ => INTERNAL_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            err if err.is_internal() => error!("Request failed: {}", err),
            Error::Forbidden(detail) => debug!("Request forbidden: {}", detail),
            Error::Unauthenticated(detail) => debug!("Request unauthenticated: {}", detail),
            _ => {}
        }

        let status = self.status();
        let body = Json(json!({
            "error": {
                "code": self.0.code(),
                "message": self.public_message(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(Error::InvalidArgument(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(Error::InvalidArgument(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError(Error::InvalidArgument(rejection.body_text()))
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
