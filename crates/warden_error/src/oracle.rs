//! AI oracle error types.

/// Failure modes of the external scoring / suggestion oracle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum OracleErrorKind {
    /// The call exceeded its deadline
    #[display("Oracle call timed out after {}ms", _0)]
    Timeout(u64),
    /// Network failure or 5xx
    #[display("Transient oracle failure: {}", _0)]
    Transient(String),
    /// Rejected request, bad credentials, malformed response
    #[display("Oracle failure: {}", _0)]
    Permanent(String),
}

impl OracleErrorKind {
    /// Only network-level failures earn a retry; timeouts already spent the budget.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Oracle error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Oracle Error: {} at line {} in {}", kind, line, file)]
pub struct OracleError {
    /// The kind of error that occurred
    pub kind: OracleErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl OracleError {
    /// Create a new oracle error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: OracleErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether the failed call may be retried.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Result type for oracle calls.
pub type OracleResult<T> = Result<T, OracleError>;
