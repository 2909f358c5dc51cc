//! Storage error types.

/// What went wrong reading or writing engine state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// A rule file or record is missing
    #[display("Not found: {}", _0)]
    NotFound(String),
    /// Reading a rule file failed
    #[display("Read failed: {}", _0)]
    Io(String),
    /// A rule file or snapshot did not decode
    #[display("Malformed data: {}", _0)]
    Malformed(String),
}

/// Storage error carrying the call site that raised it.
///
/// # Examples
///
/// ```
/// use warden_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::NotFound("/etc/warden/rules.toml".to_string()));
/// assert!(err.to_string().contains("Not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage: {} ({}:{})", kind, file, line)]
pub struct StorageError {
    /// Failure kind
    pub kind: StorageErrorKind,
    /// Line of the call site
    pub line: u32,
    /// Source file of the call site
    pub file: &'static str,
}

impl StorageError {
    /// Record `kind` at the caller's location.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let caller = std::panic::Location::caller();
        Self {
            kind,
            line: caller.line(),
            file: caller.file(),
        }
    }
}

/// Result of a store or rule-source call.
pub type StorageResult<T> = Result<T, StorageError>;
