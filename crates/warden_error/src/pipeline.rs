//! Ingest pipeline error types.

/// Kinds of pipeline errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum PipelineErrorKind {
    /// The lane for a (guild, channel) pair is at capacity
    #[display("Ingest queue full for guild {guild_id} channel {channel_id}")]
    QueueFull {
        /// Guild of the rejected event
        guild_id: u64,
        /// Channel of the rejected event
        channel_id: u64,
    },
    /// The guild has been removed or blocked
    #[display("Guild {} is blocked", _0)]
    GuildBlocked(u64),
    /// Event kind and payload disagree
    #[display("Malformed event: {}", _0)]
    MalformedEvent(String),
    /// The pipeline no longer accepts events
    #[display("Pipeline is shutting down")]
    ShuttingDown,
}

/// Pipeline error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Pipeline Error: {} at line {} in {}", kind, line, file)]
pub struct PipelineError {
    /// The kind of error that occurred
    pub kind: PipelineErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PipelineError {
    /// Create a new pipeline error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PipelineErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
