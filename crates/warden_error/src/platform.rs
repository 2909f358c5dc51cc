//! Platform (chat service) error types.

use std::time::Duration;

/// Failure modes reported by the platform adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum PlatformErrorKind {
    /// Timeout, connection reset or 5xx from the platform
    #[display("Transient platform failure: {}", _0)]
    Transient(String),
    /// The platform asked us to slow down
    #[display("Rate limited by platform, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Delay requested by the platform
        retry_after_ms: u64,
    },
    /// The bot lacks the permission for the operation
    #[display("Permission denied: {}", _0)]
    PermissionDenied(String),
    /// Target message, member or post does not exist
    #[display("Not found: {}", _0)]
    NotFound(String),
    /// The message was deleted before we got to it
    #[display("Message already deleted: {}", _0)]
    AlreadyDeleted(String),
}

impl PlatformErrorKind {
    /// Whether the operation may succeed if attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::RateLimited { .. })
    }

    /// Minimum delay requested by the platform before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after_ms } => Some(Duration::from_millis(*retry_after_ms)),
            _ => None,
        }
    }
}

/// Platform error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Platform Error: {} at line {} in {}", kind, line, file)]
pub struct PlatformError {
    /// The kind of error that occurred
    pub kind: PlatformErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PlatformError {
    /// Create a new platform error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PlatformErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether the failed operation may be retried.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;
