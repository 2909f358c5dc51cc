//! Error types for the Warden moderation engine.
//!
//! Every area carries its own `XxxError { kind, line, file }` so a log line
//! always points at the call site that produced it. [`WardenError`] wraps any
//! of them for code that crosses component boundaries.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod oracle;
mod pipeline;
mod platform;
mod storage;

pub use config::{ConfigError, ConfigErrorKind};
pub use oracle::{OracleError, OracleErrorKind, OracleResult};
pub use pipeline::{PipelineError, PipelineErrorKind};
pub use platform::{PlatformError, PlatformErrorKind, PlatformResult};
pub use storage::{StorageError, StorageErrorKind, StorageResult};

/// Warden error variants.
#[derive(Debug, derive_more::From, derive_more::Display)]
pub enum WardenErrorKind {
    /// Configuration or rule-set error
    #[display("{}", _0)]
    Config(ConfigError),
    /// Chat platform error
    #[display("{}", _0)]
    Platform(PlatformError),
    /// AI oracle error
    #[display("{}", _0)]
    Oracle(OracleError),
    /// Persistence error
    #[display("{}", _0)]
    Storage(StorageError),
    /// Ingest pipeline error
    #[display("{}", _0)]
    Pipeline(PipelineError),
}

/// Warden error with kind discrimination.
#[derive(Debug)]
pub struct WardenError(Box<WardenErrorKind>);

impl WardenError {
    /// Create a new error from a kind.
    pub fn new(kind: WardenErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &WardenErrorKind {
        &self.0
    }
}

impl std::fmt::Display for WardenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Warden Error: {}", self.0)
    }
}

impl std::error::Error for WardenError {}

// Generic From implementation for any type that converts to WardenErrorKind
impl<T> From<T> for WardenError
where
    T: Into<WardenErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Warden operations.
pub type WardenResult<T> = std::result::Result<T, WardenError>;
