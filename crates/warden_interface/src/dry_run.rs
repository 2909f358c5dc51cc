//! Recording adapters for dry runs and tests.
//!
//! [`DryRunPlatform`] performs no network I/O: it records every successful
//! call, keeps track of the posts it "created" and can be scripted to fail.
//! [`StaticOracle`] replays scripted answers and can hang forever to exercise
//! caller timeouts.

use crate::{ModerationOracle, PlatformAdapter};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use warden_core::{ChannelId, GuildId, MessageId, PostId, Score, Suggestion, ThreadContext, UserId};
use warden_error::{
    OracleError, OracleErrorKind, OracleResult, PlatformError, PlatformErrorKind, PlatformResult,
};

/// Platform operation, used to script failures and count attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PlatformOp {
    /// `delete_message`
    DeleteMessage,
    /// `timeout_member`
    TimeoutMember,
    /// `ban_member`
    BanMember,
    /// `create_post`
    CreatePost,
    /// `edit_post`
    EditPost,
    /// `delete_post`
    DeletePost,
}

/// A successful platform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    /// Message deleted
    DeleteMessage {
        /// Channel of the message
        channel_id: ChannelId,
        /// Deleted message
        message_id: MessageId,
    },
    /// Member timed out
    TimeoutMember {
        /// Guild of the member
        guild_id: GuildId,
        /// Timed out member
        user_id: UserId,
        /// Timeout length in seconds
        duration_secs: u64,
        /// Audit log reason
        reason: String,
    },
    /// Member banned
    BanMember {
        /// Guild of the member
        guild_id: GuildId,
        /// Banned member
        user_id: UserId,
        /// Audit log reason
        reason: String,
    },
    /// Post created
    CreatePost {
        /// New post
        post_id: PostId,
        /// Post content
        content: String,
    },
    /// Post edited
    EditPost {
        /// Edited post
        post_id: PostId,
        /// New content
        content: String,
    },
    /// Post deleted
    DeletePost {
        /// Deleted post
        post_id: PostId,
    },
}

impl PlatformCall {
    /// Operation this call performed.
    pub fn op(&self) -> PlatformOp {
        match self {
            PlatformCall::DeleteMessage { .. } => PlatformOp::DeleteMessage,
            PlatformCall::TimeoutMember { .. } => PlatformOp::TimeoutMember,
            PlatformCall::BanMember { .. } => PlatformOp::BanMember,
            PlatformCall::CreatePost { .. } => PlatformOp::CreatePost,
            PlatformCall::EditPost { .. } => PlatformOp::EditPost,
            PlatformCall::DeletePost { .. } => PlatformOp::DeletePost,
        }
    }
}

#[derive(Debug, Default)]
struct PlatformLog {
    calls: Vec<PlatformCall>,
    attempts: HashMap<PlatformOp, usize>,
    failures: HashMap<PlatformOp, VecDeque<PlatformErrorKind>>,
    posts: HashMap<PostId, String>,
}

/// Platform adapter that records instead of calling out.
#[derive(Debug)]
pub struct DryRunPlatform {
    log: Mutex<PlatformLog>,
    next_post: AtomicU64,
    latency: Option<Duration>,
}

impl Default for DryRunPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl DryRunPlatform {
    /// Empty recorder.
    pub fn new() -> Self {
        Self {
            log: Mutex::new(PlatformLog::default()),
            next_post: AtomicU64::new(1_000_000),
            latency: None,
        }
    }

    /// Sleep this long inside every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next attempt of `op` with `kind`. Scripts queue up per operation.
    pub fn fail_next(&self, op: PlatformOp, kind: PlatformErrorKind) {
        self.fail_times(op, kind, 1);
    }

    /// Fail the next `times` attempts of `op` with `kind`.
    pub fn fail_times(&self, op: PlatformOp, kind: PlatformErrorKind, times: usize) {
        let mut log = self.log.lock();
        let queue = log.failures.entry(op).or_default();
        queue.extend(std::iter::repeat_n(kind, times));
    }

    /// Successful calls, in order.
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.log.lock().calls.clone()
    }

    /// Successful calls of one operation.
    pub fn calls_of(&self, op: PlatformOp) -> Vec<PlatformCall> {
        self.log
            .lock()
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .cloned()
            .collect()
    }

    /// Attempts of `op`, failed ones included.
    pub fn attempts(&self, op: PlatformOp) -> usize {
        self.log.lock().attempts.get(&op).copied().unwrap_or(0)
    }

    /// Content of a live post.
    pub fn post(&self, post: PostId) -> Option<String> {
        self.log.lock().posts.get(&post).cloned()
    }

    /// Number of live posts.
    pub fn live_posts(&self) -> usize {
        self.log.lock().posts.len()
    }

    /// Delete a post behind the engine's back, as a moderator would.
    pub fn remove_post_out_of_band(&self, post: PostId) -> bool {
        self.log.lock().posts.remove(&post).is_some()
    }

    async fn begin(&self, op: PlatformOp) -> PlatformResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut log = self.log.lock();
        *log.attempts.entry(op).or_default() += 1;
        match log.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(kind) => {
                tracing::debug!(%op, %kind, "Dry run failing scripted call");
                Err(PlatformError::new(kind))
            }
            None => Ok(()),
        }
    }

    fn record(&self, call: PlatformCall) {
        tracing::debug!(?call, "Dry run platform call");
        self.log.lock().calls.push(call);
    }
}

#[async_trait]
impl PlatformAdapter for DryRunPlatform {
    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()> {
        self.begin(PlatformOp::DeleteMessage).await?;
        self.record(PlatformCall::DeleteMessage {
            channel_id: channel,
            message_id: message,
        });
        Ok(())
    }

    async fn timeout_member(
        &self,
        guild: GuildId,
        user: UserId,
        duration: Duration,
        reason: &str,
    ) -> PlatformResult<()> {
        self.begin(PlatformOp::TimeoutMember).await?;
        self.record(PlatformCall::TimeoutMember {
            guild_id: guild,
            user_id: user,
            duration_secs: duration.as_secs(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn ban_member(&self, guild: GuildId, user: UserId, reason: &str) -> PlatformResult<()> {
        self.begin(PlatformOp::BanMember).await?;
        self.record(PlatformCall::BanMember {
            guild_id: guild,
            user_id: user,
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn create_post(&self, channel: ChannelId, content: &str) -> PlatformResult<PostId> {
        self.begin(PlatformOp::CreatePost).await?;
        let message = MessageId(self.next_post.fetch_add(1, Ordering::Relaxed));
        let post_id = PostId::new(channel, message);
        self.log.lock().posts.insert(post_id, content.to_string());
        self.record(PlatformCall::CreatePost {
            post_id,
            content: content.to_string(),
        });
        Ok(post_id)
    }

    async fn edit_post(&self, post: PostId, content: &str) -> PlatformResult<()> {
        self.begin(PlatformOp::EditPost).await?;
        {
            let mut log = self.log.lock();
            match log.posts.get_mut(&post) {
                Some(existing) => *existing = content.to_string(),
                None => {
                    return Err(PlatformError::new(PlatformErrorKind::NotFound(format!(
                        "post {post}"
                    ))));
                }
            }
        }
        self.record(PlatformCall::EditPost {
            post_id: post,
            content: content.to_string(),
        });
        Ok(())
    }

    async fn delete_post(&self, post: PostId) -> PlatformResult<()> {
        self.begin(PlatformOp::DeletePost).await?;
        if self.log.lock().posts.remove(&post).is_none() {
            return Err(PlatformError::new(PlatformErrorKind::NotFound(format!(
                "post {post}"
            ))));
        }
        self.record(PlatformCall::DeletePost { post_id: post });
        Ok(())
    }

    fn platform_name(&self) -> &str {
        "dry-run"
    }
}

/// One scripted oracle answer.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply<T> {
    /// Answer with this value
    Answer(T),
    /// Fail with this error
    Fail(OracleErrorKind),
    /// Never answer
    Hang,
}

/// Oracle that replays scripted answers.
///
/// When the script for an operation is empty, `classify` scores by keyword
/// (highest matching keyword, else the default score) and `suggest_solution`
/// returns the default suggestion or a permanent error when there is none.
#[derive(Debug, Default)]
pub struct StaticOracle {
    default_score: f32,
    keywords: Vec<(String, f32)>,
    default_suggestion: Option<String>,
    classify_script: Mutex<VecDeque<ScriptedReply<Score>>>,
    suggest_script: Mutex<VecDeque<ScriptedReply<Suggestion>>>,
    classify_calls: AtomicUsize,
    suggest_calls: AtomicUsize,
}

impl StaticOracle {
    /// Oracle that scores everything 0.0 and has no suggestions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Score used when nothing else applies.
    pub fn with_default_score(mut self, score: f32) -> Self {
        self.default_score = score;
        self
    }

    /// Score messages containing `keyword` (case-insensitive) at least `score`.
    pub fn with_keyword(mut self, keyword: impl Into<String>, score: f32) -> Self {
        self.keywords.push((keyword.into().to_lowercase(), score));
        self
    }

    /// Suggestion text used when the suggestion script is empty.
    pub fn with_suggestion(mut self, text: impl Into<String>) -> Self {
        self.default_suggestion = Some(text.into());
        self
    }

    /// Queue a classify answer.
    pub fn push_classify(&self, reply: ScriptedReply<Score>) {
        self.classify_script.lock().push_back(reply);
    }

    /// Queue a suggestion answer.
    pub fn push_suggestion(&self, reply: ScriptedReply<Suggestion>) {
        self.suggest_script.lock().push_back(reply);
    }

    /// Number of classify calls so far.
    pub fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    /// Number of suggestion calls so far.
    pub fn suggest_calls(&self) -> usize {
        self.suggest_calls.load(Ordering::SeqCst)
    }

    fn keyword_score(&self, text: &str) -> Score {
        let lowered = text.to_lowercase();
        let value = self
            .keywords
            .iter()
            .filter(|(keyword, _)| lowered.contains(keyword.as_str()))
            .map(|(_, score)| *score)
            .fold(self.default_score, f32::max);
        Score::new(value)
    }
}

async fn play<T>(reply: ScriptedReply<T>) -> OracleResult<T> {
    match reply {
        ScriptedReply::Answer(value) => Ok(value),
        ScriptedReply::Fail(kind) => Err(OracleError::new(kind)),
        ScriptedReply::Hang => std::future::pending().await,
    }
}

#[async_trait]
impl ModerationOracle for StaticOracle {
    async fn classify(&self, text: &str) -> OracleResult<Score> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.classify_script.lock().pop_front();
        match scripted {
            Some(reply) => play(reply).await,
            None => Ok(self.keyword_score(text)),
        }
    }

    async fn suggest_solution(&self, thread: &ThreadContext) -> OracleResult<Suggestion> {
        self.suggest_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.suggest_script.lock().pop_front();
        match scripted {
            Some(reply) => play(reply).await,
            None => match &self.default_suggestion {
                Some(text) => Ok(Suggestion { text: text.clone() }),
                None => Err(OracleError::new(OracleErrorKind::Permanent(format!(
                    "no suggestion for thread {}",
                    thread.thread_id
                )))),
            },
        }
    }

    fn oracle_name(&self) -> &str {
        "static"
    }
}
