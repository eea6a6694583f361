//! API error types and formatting

use serde::Serialize;
use thiserror::Error;

/// Error categories surfaced by the HTTP API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The resource exists but does not accept the request method
    MethodNotAllowed,
    /// Unknown resource, id or sub-route
    NotFound,
    /// Malformed request body
    InvalidInput,
    /// Request body larger than the configured limit
    PayloadTooLarge,
    /// A query or transaction against the store failed
    StoreFailure,
    /// Catch-all for failures outside the store
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::NotFound => "NotFound",
            Self::InvalidInput => "InvalidInput",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::StoreFailure => "StoreFailure",
            Self::Internal => "Internal",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::MethodNotAllowed => 405,
            Self::NotFound => 404,
            Self::InvalidInput => 400,
            Self::PayloadTooLarge => 413,
            Self::StoreFailure | Self::Internal => 500,
        }
    }
}

/// Error returned to API callers as `{"error": message}`
#[derive(Debug, Error)]
#[error("{}: {message}", .kind.as_str())]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn method_not_allowed() -> Self {
        Self::new(ErrorKind::MethodNotAllowed, "Method not allowed")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            ErrorKind::PayloadTooLarge,
            format!("Request body exceeds {limit} bytes"),
        )
    }

    /// Wrap a store failure; the detail is diagnostic only.
    pub fn store(detail: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::StoreFailure, format!("Database error: {detail}"))
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::Internal, format!("Server error: {detail}"))
    }

    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }

    /// Format as the JSON error body
    pub fn to_json(&self) -> String {
        #[derive(Serialize)]
        struct JsonError<'a> {
            error: &'a str,
        }

        serde_json::to_string(&JsonError {
            error: &self.message,
        })
        .unwrap_or_else(|_| r#"{"error":"Server error"}"#.to_string())
    }
}
