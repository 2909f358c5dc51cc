//! Turns verdicts into platform calls.
//!
//! Each guild owns a token bucket. A verdict runs immediately when a token is
//! free and nothing is waiting ahead of it; otherwise it joins the guild's
//! bounded queue, which a drain task empties one token at a time. A full queue
//! drops its oldest entry. A newer verdict for a message replaces any weaker
//! verdict still waiting for the same message.

use crate::EnforcementConfig;
use crate::ledger::{ActionKey, Ledger};
use crate::report::{render_log_line, render_warning};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use warden_core::{Action, GuildId, MessageId, ModerationVerdict};
use warden_error::{ConfigError, PlatformError, PlatformErrorKind, PlatformResult};
use warden_interface::PlatformAdapter;
use warden_rate_limit::{GuildRateLimiter, RetryError, retry_with_backoff};

/// What happened to a submitted verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Every platform call succeeded
    Applied {
        /// Platform calls made, retries included
        attempts: u32,
    },
    /// The verdict carried no enforcement action
    Skipped,
    /// The action was already applied, running or waiting
    Duplicate,
    /// Waiting for the guild's rate limit
    Queued {
        /// Position in the guild queue, starting at 1
        position: usize,
    },
    /// A platform call failed for good
    Failed {
        /// Last platform error
        error: PlatformErrorKind,
        /// Platform calls made, retries included
        attempts: u32,
    },
    /// The guild was blocked before the action completed
    Abandoned,
}

impl ExecutionResult {
    /// Whether the action reached the platform successfully.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Debug, Default)]
struct GuildQueue {
    pending: VecDeque<ModerationVerdict>,
    draining: bool,
}

enum Admission {
    Duplicate,
    RunNow(ModerationVerdict),
    Queued {
        position: usize,
        dropped: Vec<ModerationVerdict>,
        spawn_drain: bool,
    },
}

struct Inner {
    platform: Arc<dyn PlatformAdapter>,
    config: EnforcementConfig,
    limiter: GuildRateLimiter,
    ledger: Mutex<Ledger>,
    queues: Mutex<HashMap<GuildId, GuildQueue>>,
    blocked: RwLock<HashSet<GuildId>>,
}

/// Applies moderation verdicts against the platform.
///
/// Cheap to clone; clones share the ledger, queues and limiter.
#[derive(Clone)]
pub struct ActionExecutor {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("platform", &self.inner.platform.platform_name())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

fn key_of(verdict: &ModerationVerdict) -> ActionKey {
    (verdict.message_id, verdict.action)
}

impl ActionExecutor {
    /// Build an executor over `platform`.
    pub fn new(
        platform: Arc<dyn PlatformAdapter>,
        config: EnforcementConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let limiter = GuildRateLimiter::new(config.rate_limit())?;
        let ledger = Ledger::new(*config.ledger_capacity());
        Ok(Self {
            inner: Arc::new(Inner {
                platform,
                config,
                limiter,
                ledger: Mutex::new(ledger),
                queues: Mutex::new(HashMap::new()),
                blocked: RwLock::new(HashSet::new()),
            }),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &EnforcementConfig {
        &self.inner.config
    }

    /// Submit a verdict.
    ///
    /// Returns once the action has run, or as soon as it is queued behind the
    /// guild's rate limit.
    #[instrument(
        skip(self, verdict),
        fields(
            guild_id = %verdict.guild_id,
            message_id = %verdict.message_id,
            action = %verdict.action
        )
    )]
    pub async fn execute(&self, verdict: ModerationVerdict) -> ExecutionResult {
        if !verdict.action.is_enforcement() {
            return ExecutionResult::Skipped;
        }
        let guild = verdict.guild_id;
        if self.inner.is_blocked(guild) {
            debug!("Guild blocked, verdict abandoned");
            return ExecutionResult::Abandoned;
        }

        match self.inner.admit(verdict) {
            Admission::Duplicate => {
                debug!("Action already applied or pending");
                ExecutionResult::Duplicate
            }
            Admission::RunNow(verdict) => self.inner.apply(verdict).await,
            Admission::Queued {
                position,
                dropped,
                spawn_drain,
            } => {
                if spawn_drain {
                    tokio::spawn(drain(Arc::clone(&self.inner), guild));
                }
                for lost in dropped {
                    warn!(
                        dropped_message_id = %lost.message_id,
                        dropped_action = %lost.action,
                        "Enforcement queue full, dropped oldest action"
                    );
                    self.inner
                        .report(&lost, "dropped: enforcement queue overflow")
                        .await;
                }
                debug!(position, "Action queued behind rate limit");
                ExecutionResult::Queued { position }
            }
        }
    }

    /// Stop enforcing in `guild`. Queued actions are discarded and in-flight
    /// retries give up before their next attempt. Returns the discarded count.
    pub fn block_guild(&self, guild: GuildId) -> usize {
        self.inner.blocked.write().insert(guild);
        let dropped = self
            .inner
            .queues
            .lock()
            .get_mut(&guild)
            .map(|queue| {
                let count = queue.pending.len();
                queue.pending.clear();
                count
            })
            .unwrap_or(0);
        if dropped > 0 {
            warn!(guild_id = %guild, dropped, "Guild blocked, queued actions discarded");
        } else {
            info!(guild_id = %guild, "Guild blocked");
        }
        dropped
    }

    /// Resume enforcing in `guild`.
    pub fn unblock_guild(&self, guild: GuildId) {
        if self.inner.blocked.write().remove(&guild) {
            info!(guild_id = %guild, "Guild unblocked");
        }
    }

    /// Whether `guild` is blocked.
    pub fn is_blocked(&self, guild: GuildId) -> bool {
        self.inner.is_blocked(guild)
    }

    /// Whether `action` on `message` was applied, is running or is queued,
    /// directly or through a stronger action.
    pub fn covers(&self, guild: GuildId, message: MessageId, action: Action) -> bool {
        let key = (message, action);
        let queues = self.inner.queues.lock();
        {
            let ledger = self.inner.ledger.lock();
            if ledger.covers(&key) || ledger.is_in_flight(&key) {
                return true;
            }
        }
        queues.get(&guild).is_some_and(|queue| {
            queue
                .pending
                .iter()
                .any(|waiting| waiting.message_id == message && waiting.action >= action)
        })
    }

    /// Actions waiting in `guild`'s queue.
    pub fn pending_len(&self, guild: GuildId) -> usize {
        self.inner
            .queues
            .lock()
            .get(&guild)
            .map(|queue| queue.pending.len())
            .unwrap_or(0)
    }

    /// No queued and no running actions.
    pub fn is_idle(&self) -> bool {
        let queued = self
            .inner
            .queues
            .lock()
            .values()
            .any(|queue| !queue.pending.is_empty());
        !queued && self.inner.ledger.lock().in_flight_len() == 0
    }

    /// Wait until the executor is idle or `timeout` passes. Returns whether it
    /// went idle.
    pub async fn flush(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.is_idle() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!("Enforcement flush timed out with work outstanding");
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Forget rate limit state of guilds that have been quiet.
    pub fn prune(&self) {
        self.inner.limiter.prune();
    }
}

impl Inner {
    fn is_blocked(&self, guild: GuildId) -> bool {
        self.blocked.read().contains(&guild)
    }

    /// Decide whether a verdict runs now, waits, or is a duplicate.
    fn admit(&self, verdict: ModerationVerdict) -> Admission {
        let key = key_of(&verdict);
        let guild = verdict.guild_id;
        let mut queues = self.queues.lock();

        {
            let ledger = self.ledger.lock();
            if ledger.covers(&key) || ledger.is_in_flight(&key) {
                return Admission::Duplicate;
            }
        }

        let queue = queues.entry(guild).or_default();
        if queue
            .pending
            .iter()
            .any(|waiting| waiting.message_id == key.0 && waiting.action >= key.1)
        {
            return Admission::Duplicate;
        }

        if queue.pending.is_empty() && !queue.draining && self.limiter.try_acquire(&guild).is_ok()
        {
            self.ledger.lock().begin(key);
            return Admission::RunNow(verdict);
        }

        let before = queue.pending.len();
        queue.pending.retain(|waiting| waiting.message_id != key.0);
        if queue.pending.len() < before {
            debug!(message_id = %key.0, "Superseded weaker queued action");
        }

        let capacity = *self.config.queue_capacity();
        let mut dropped = Vec::new();
        while queue.pending.len() >= capacity {
            match queue.pending.pop_front() {
                Some(oldest) => dropped.push(oldest),
                None => break,
            }
        }
        queue.pending.push_back(verdict);
        let position = queue.pending.len();
        let spawn_drain = !queue.draining;
        queue.draining = true;

        Admission::Queued {
            position,
            dropped,
            spawn_drain,
        }
    }

    /// Run a claimed verdict and release its claim.
    async fn apply(&self, verdict: ModerationVerdict) -> ExecutionResult {
        let key = key_of(&verdict);
        let result = match self.run_steps(&verdict).await {
            Ok(attempts) => ExecutionResult::Applied { attempts },
            Err(RetryError::Aborted { attempts }) => {
                warn!(attempts, message_id = %verdict.message_id, "Guild blocked mid-action");
                ExecutionResult::Abandoned
            }
            Err(err) => {
                let attempts = err.attempts();
                match err.into_error() {
                    Some(platform_error) => ExecutionResult::Failed {
                        error: platform_error.kind,
                        attempts,
                    },
                    None => ExecutionResult::Abandoned,
                }
            }
        };

        self.ledger.lock().finish(key, result.is_applied());

        match &result {
            ExecutionResult::Applied { attempts } => {
                info!(
                    message_id = %verdict.message_id,
                    action = %verdict.action,
                    attempts,
                    "Enforcement action applied"
                );
                if *self.config.report_applied() {
                    self.report(&verdict, "applied").await;
                }
            }
            ExecutionResult::Failed { error, attempts } => {
                error!(
                    message_id = %verdict.message_id,
                    action = %verdict.action,
                    attempts,
                    error = %error,
                    "Enforcement action failed"
                );
                self.report(&verdict, &format!("failed: {error}")).await;
            }
            _ => {}
        }
        result
    }

    /// Platform calls for the verdict's action, in order.
    async fn run_steps(
        &self,
        verdict: &ModerationVerdict,
    ) -> Result<u32, RetryError<PlatformError>> {
        let platform = self.platform.as_ref();
        let guild = verdict.guild_id;
        let channel = verdict.channel_id;
        let user = verdict.author_id;
        let reason = verdict.reason.as_str();

        match verdict.action {
            Action::None => Ok(0),
            Action::Warn => {
                let warning = render_warning(self.config.warn_template(), verdict);
                let warning = warning.as_str();
                let (_, attempts) = self
                    .step(guild, "warn", move || platform.create_post(channel, warning))
                    .await?;
                Ok(attempts)
            }
            Action::Delete => {
                let (_, attempts) = self.delete(verdict).await?;
                Ok(attempts)
            }
            Action::Timeout => {
                let deleted = self.delete_tolerant(verdict).await?;
                let duration = self.config.timeout_duration();
                let (_, attempts) = self
                    .step(guild, "timeout_member", move || {
                        platform.timeout_member(guild, user, duration, reason)
                    })
                    .await?;
                Ok(deleted + attempts)
            }
            Action::Ban => {
                let deleted = self.delete_tolerant(verdict).await?;
                let (_, attempts) = self
                    .step(guild, "ban_member", move || {
                        platform.ban_member(guild, user, reason)
                    })
                    .await?;
                Ok(deleted + attempts)
            }
        }
    }

    async fn delete(
        &self,
        verdict: &ModerationVerdict,
    ) -> Result<((), u32), RetryError<PlatformError>> {
        let platform = self.platform.as_ref();
        let channel = verdict.channel_id;
        let message = verdict.message_id;
        self.step(verdict.guild_id, "delete_message", move || {
            platform.delete_message(channel, message)
        })
        .await
    }

    /// Delete as the first step of a sanction; a message that is already gone
    /// does not stop the sanction.
    async fn delete_tolerant(
        &self,
        verdict: &ModerationVerdict,
    ) -> Result<u32, RetryError<PlatformError>> {
        match self.delete(verdict).await {
            Ok((_, attempts)) => Ok(attempts),
            Err(RetryError::Permanent { attempts, error })
                if matches!(
                    error.kind,
                    PlatformErrorKind::AlreadyDeleted(_) | PlatformErrorKind::NotFound(_)
                ) =>
            {
                debug!(message_id = %verdict.message_id, "Message already gone, continuing");
                Ok(attempts)
            }
            Err(err) => Err(err),
        }
    }

    async fn step<T, F, Fut>(
        &self,
        guild: GuildId,
        op_name: &str,
        operation: F,
    ) -> Result<(T, u32), RetryError<PlatformError>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PlatformResult<T>>,
    {
        retry_with_backoff(
            self.config.retry(),
            op_name,
            || self.is_blocked(guild),
            operation,
        )
        .await
    }

    /// Post to the moderation log, if one is configured. Failures are logged only.
    async fn report(&self, verdict: &ModerationVerdict, outcome: &str) {
        let Some(channel) = *self.config.mod_log_channel_id() else {
            return;
        };
        let line = render_log_line(verdict, outcome);
        if let Err(e) = self.platform.create_post(channel, &line).await {
            warn!(channel_id = %channel, error = %e, "Failed to write moderation log");
        }
    }
}

/// Empty a guild queue one token at a time.
async fn drain(inner: Arc<Inner>, guild: GuildId) {
    debug!(guild_id = %guild, "Enforcement drain started");
    loop {
        inner.limiter.acquire(&guild).await;
        let next = {
            let mut queues = inner.queues.lock();
            let Some(queue) = queues.get_mut(&guild) else {
                return;
            };
            match queue.pending.pop_front() {
                Some(verdict) => {
                    inner.ledger.lock().begin(key_of(&verdict));
                    verdict
                }
                None => {
                    queues.remove(&guild);
                    debug!(guild_id = %guild, "Enforcement drain finished");
                    return;
                }
            }
        };
        if inner.is_blocked(guild) {
            inner.ledger.lock().finish(key_of(&next), false);
            continue;
        }
        let result = inner.apply(next).await;
        debug!(guild_id = %guild, ?result, "Drained queued action");
    }
}
