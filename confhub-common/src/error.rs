//! Common error types for confhub

use thiserror::Error;

/// Common result type for confhub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the store adapter, the engines and the HTTP layer
#[derive(Error, Debug)]
pub enum Error {
    /// No valid session credential on the request
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Verified identity has no profile document
    #[error("Profile not found for user {0}")]
    ProfileNotFound(String),

    /// Profile carries a role outside organizer/author/reviewer
    #[error("Role not supported: {0}")]
    RoleNotSupported(String),

    /// Caller is not allowed to perform the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation cannot be served right now (e.g. reviewer pool too small)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Write lost against a concurrent change
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored document could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthenticated(_) => "UNAUTHENTICATED",
            Error::ProfileNotFound(_) => "PROFILE_NOT_FOUND",
            Error::RoleNotSupported(_) => "ROLE_NOT_SUPPORTED",
            Error::Forbidden(_) => "FORBIDDEN",
            Error::NotFound(_) => "NOT_FOUND",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Error::Conflict(_) => "CONFLICT",
            Error::Internal(_)
            | Error::Database(_)
            | Error::Serialization(_)
            | Error::Io(_)
            | Error::Config(_) => "INTERNAL_ERROR",
        }
    }

    /// True for failures that are not the caller's fault
    pub fn is_internal(&self) -> bool {
        self.code() == "INTERNAL_ERROR"
    }
}
