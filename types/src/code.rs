//! The closed error code enumeration shared with the remote service.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classified error code.
///
/// Mirrors the Connect/gRPC code set. The wire form is snake_case
/// (`"not_found"`), matching what the remote service emits in error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Canceled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

/// Codes that are never retried, by any call site.
///
/// Both the executor's logging and the client retry policy read this table;
/// keep it the only copy.
const NON_RETRYABLE: [ErrorCode; 5] = [
    ErrorCode::Unauthenticated,
    ErrorCode::NotFound,
    ErrorCode::DeadlineExceeded,
    ErrorCode::InvalidArgument,
    ErrorCode::PermissionDenied,
];

impl ErrorCode {
    pub const ALL: [ErrorCode; 16] = [
        ErrorCode::Canceled,
        ErrorCode::Unknown,
        ErrorCode::InvalidArgument,
        ErrorCode::DeadlineExceeded,
        ErrorCode::NotFound,
        ErrorCode::AlreadyExists,
        ErrorCode::PermissionDenied,
        ErrorCode::ResourceExhausted,
        ErrorCode::FailedPrecondition,
        ErrorCode::Aborted,
        ErrorCode::OutOfRange,
        ErrorCode::Unimplemented,
        ErrorCode::Internal,
        ErrorCode::Unavailable,
        ErrorCode::DataLoss,
        ErrorCode::Unauthenticated,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Canceled => "canceled",
            ErrorCode::Unknown => "unknown",
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::DeadlineExceeded => "deadline_exceeded",
            ErrorCode::NotFound => "not_found",
            ErrorCode::AlreadyExists => "already_exists",
            ErrorCode::PermissionDenied => "permission_denied",
            ErrorCode::ResourceExhausted => "resource_exhausted",
            ErrorCode::FailedPrecondition => "failed_precondition",
            ErrorCode::Aborted => "aborted",
            ErrorCode::OutOfRange => "out_of_range",
            ErrorCode::Unimplemented => "unimplemented",
            ErrorCode::Internal => "internal",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::DataLoss => "data_loss",
            ErrorCode::Unauthenticated => "unauthenticated",
        }
    }

    /// Parse a code name.
    ///
    /// Accepts the snake_case wire form as well as CamelCase names
    /// (`NotFound`), case-insensitively. `"cancelled"` is accepted as an alias.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        if normalized == "cancelled" {
            return Some(ErrorCode::Canceled);
        }

        Self::ALL
            .into_iter()
            .find(|code| code.as_str().replace('_', "") == normalized)
    }

    /// Fallback classification for an error response that carries no code.
    #[must_use]
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            400 => ErrorCode::InvalidArgument,
            401 => ErrorCode::Unauthenticated,
            403 => ErrorCode::PermissionDenied,
            404 => ErrorCode::Unimplemented,
            408 => ErrorCode::DeadlineExceeded,
            409 => ErrorCode::Aborted,
            429 | 502 | 503 | 504 => ErrorCode::Unavailable,
            _ => ErrorCode::Unknown,
        }
    }

    /// Whether a failure with this code may be attempted again.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        !NON_RETRYABLE.contains(&self)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
