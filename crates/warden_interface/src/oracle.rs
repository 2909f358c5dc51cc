//! AI oracle trait.

use async_trait::async_trait;
use warden_core::{Score, Suggestion, ThreadContext};
use warden_error::OracleResult;

/// External scoring and suggestion service.
///
/// The oracle is untrusted and slow. Callers wrap it with their own timeout;
/// implementations only need to report what went wrong.
#[async_trait]
pub trait ModerationOracle: Send + Sync {
    /// Score a message for harmful content.
    async fn classify(&self, text: &str) -> OracleResult<Score>;

    /// Propose an answer for a help thread.
    async fn suggest_solution(&self, thread: &ThreadContext) -> OracleResult<Suggestion>;

    /// Oracle name, for logs.
    fn oracle_name(&self) -> &str;
}
