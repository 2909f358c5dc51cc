//! The ingest pipeline.
//!
//! Every (guild, channel) pair gets its own lane: a bounded channel drained by
//! one worker task, so events of a lane are handled in arrival order while
//! lanes run in parallel. A worker exits after sitting idle and is recreated
//! on the next event for its lane.
//!
//! Removing a guild bumps its epoch. Lanes opened before the bump skip what
//! they still hold, and a lane reopened for the same pair waits for the
//! retired worker to exit before it handles anything.
//!
//! Per event the worker runs, by kind:
//! - message created or edited: verdict, enforcement, link cleaning
//! - thread message: moderation and the thread resolver, concurrently
//! - reaction added or removed: the starboard

use crate::WardenConfig;
use crate::config::IngestConfig;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use warden_core::{Action, Event, EventKind, GuildId, LaneKey};
use warden_enforcement::{ActionExecutor, ExecutionResult};
use warden_error::{
    ConfigError, ConfigErrorKind, PipelineError, PipelineErrorKind, WardenResult,
};
use warden_interface::{
    BlocklistSource, ModerationOracle, PlatformAdapter, StarboardStore, ThreadStore, VerdictStore,
};
use warden_moderation::{
    BlocklistMatcher, ClassifierAdapter, LinkSanitizer, RepeatTracker, VerdictEngine,
};
use warden_starboard::StarboardAggregator;
use warden_storage::{InMemoryStore, TomlBlocklistSource};
use warden_support::ThreadResolver;

/// External collaborators the engine runs against.
#[derive(Clone)]
pub struct Components {
    /// Chat platform
    pub platform: Arc<dyn PlatformAdapter>,
    /// AI oracle
    pub oracle: Arc<dyn ModerationOracle>,
    /// Blocklist rules; without a source the blocklist starts empty
    pub blocklist_source: Option<Arc<dyn BlocklistSource>>,
    /// Starboard entries
    pub starboard_store: Arc<dyn StarboardStore>,
    /// Help thread state
    pub thread_store: Arc<dyn ThreadStore>,
    /// Verdicts
    pub verdict_store: Arc<dyn VerdictStore>,
}

impl std::fmt::Debug for Components {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Components")
            .field("platform", &self.platform.platform_name())
            .field("oracle", &self.oracle.oracle_name())
            .field("blocklist_source", &self.blocklist_source.is_some())
            .finish_non_exhaustive()
    }
}

impl Components {
    /// Components backed by one in-memory store. The blocklist source is the
    /// configured rule file, if any.
    pub fn in_memory(
        platform: Arc<dyn PlatformAdapter>,
        oracle: Arc<dyn ModerationOracle>,
        config: &WardenConfig,
    ) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let blocklist_source = config
            .blocklist()
            .path()
            .as_ref()
            .map(|path| Arc::new(TomlBlocklistSource::new(path)) as Arc<dyn BlocklistSource>);
        Self {
            platform,
            oracle,
            blocklist_source,
            starboard_store: store.clone(),
            thread_store: store.clone(),
            verdict_store: store,
        }
    }

    /// Replace the blocklist source.
    pub fn with_blocklist_source(mut self, source: Arc<dyn BlocklistSource>) -> Self {
        self.blocklist_source = Some(source);
        self
    }
}

struct Lane {
    id: u64,
    epoch: u64,
    tx: mpsc::Sender<Event>,
    handle: JoinHandle<()>,
}

struct Shared {
    ingest: IngestConfig,
    engine: VerdictEngine,
    executor: ActionExecutor,
    starboard: StarboardAggregator,
    resolver: ThreadResolver,
    links: LinkSanitizer,
    reply_with_cleaned_links: bool,
    platform: Arc<dyn PlatformAdapter>,
    blocklist_source: Option<Arc<dyn BlocklistSource>>,
    lanes: Mutex<HashMap<LaneKey, Lane>>,
    retired: Mutex<HashMap<LaneKey, JoinHandle<()>>>,
    next_lane_id: AtomicU64,
    blocked: RwLock<HashSet<GuildId>>,
    epochs: RwLock<HashMap<GuildId, u64>>,
    shutting_down: AtomicBool,
}

/// The running engine.
///
/// Cheap to clone; clones feed the same lanes.
#[derive(Clone)]
pub struct Warden {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Warden {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warden")
            .field("lanes", &self.shared.lanes.lock().len())
            .field("platform", &self.shared.platform.platform_name())
            .finish_non_exhaustive()
    }
}

impl Warden {
    /// Validate `config`, wire every stage and load the blocklist.
    #[instrument(skip_all, fields(platform = components.platform.platform_name()))]
    pub async fn start(config: WardenConfig, components: Components) -> WardenResult<Self> {
        config.validate()?;

        let blocklist = Arc::new(BlocklistMatcher::default());
        if let Some(source) = &components.blocklist_source {
            let version = blocklist.reload_from(source.as_ref()).await?;
            info!(version, "Initial blocklist loaded");
        }

        let engine = VerdictEngine::new(
            config.moderation().clone(),
            blocklist,
            ClassifierAdapter::new(components.oracle.clone(), config.classifier().clone())?,
            RepeatTracker::new(config.repeat().clone()),
            components.verdict_store.clone(),
        );
        let executor =
            ActionExecutor::new(components.platform.clone(), config.enforcement().clone())?;
        let starboard = StarboardAggregator::new(
            config.starboard().clone(),
            components.platform.clone(),
            components.starboard_store.clone(),
        )?;
        let resolver = ThreadResolver::new(
            config.support().clone(),
            ClassifierAdapter::new(components.oracle.clone(), config.classifier().clone())?,
            components.platform.clone(),
            components.thread_store.clone(),
        )?;

        info!("Warden started");
        Ok(Self {
            shared: Arc::new(Shared {
                ingest: config.ingest().clone(),
                engine,
                executor,
                starboard,
                resolver,
                links: LinkSanitizer::from_config(config.links()),
                reply_with_cleaned_links: *config.links().reply_with_cleaned_links(),
                platform: components.platform,
                blocklist_source: components.blocklist_source,
                lanes: Mutex::new(HashMap::new()),
                retired: Mutex::new(HashMap::new()),
                next_lane_id: AtomicU64::new(0),
                blocked: RwLock::new(HashSet::new()),
                epochs: RwLock::new(HashMap::new()),
                shutting_down: AtomicBool::new(false),
            }),
        })
    }

    /// Queue an event on its lane. Never waits: a full lane is reported as
    /// [`PipelineErrorKind::QueueFull`] and the event is not accepted.
    ///
    /// Must be called from within a tokio runtime.
    pub fn ingest(&self, event: Event) -> Result<(), PipelineError> {
        if self.shared.shutting_down.load(Ordering::Acquire) {
            return Err(PipelineError::new(PipelineErrorKind::ShuttingDown));
        }
        if !event.is_consistent() {
            return Err(PipelineError::new(PipelineErrorKind::MalformedEvent(
                format!("{} event {} carries a mismatched payload", event.kind(), event.id()),
            )));
        }
        let key = event.lane();
        if self.shared.is_blocked(key.guild_id) {
            return Err(PipelineError::new(PipelineErrorKind::GuildBlocked(
                key.guild_id.0,
            )));
        }

        let mut lanes = self.shared.lanes.lock();
        let epoch = self.shared.epoch(key.guild_id);
        let tx = match lanes.get(&key) {
            Some(lane) if !lane.tx.is_closed() && lane.epoch == epoch => lane.tx.clone(),
            _ => {
                let lane = self.spawn_lane(key, epoch);
                let tx = lane.tx.clone();
                lanes.insert(key, lane);
                tx
            }
        };

        // Sent under the lanes lock; see `run_lane`.
        tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                warn!(lane = %key, "Ingest lane full, event rejected");
                PipelineError::new(PipelineErrorKind::QueueFull {
                    guild_id: key.guild_id.0,
                    channel_id: key.channel_id.0,
                })
            }
            mpsc::error::TrySendError::Closed(_) => {
                PipelineError::new(PipelineErrorKind::ShuttingDown)
            }
        })
    }

    /// Reload the blocklist from its source. The active rules stay in effect
    /// when the new set is invalid or older.
    pub async fn reload_blocklist(&self) -> WardenResult<u64> {
        let Some(source) = &self.shared.blocklist_source else {
            return Err(ConfigError::new(ConfigErrorKind::Load(
                "no blocklist source configured".to_string(),
            ))
            .into());
        };
        self.shared
            .engine
            .blocklist()
            .reload_from(source.as_ref())
            .await
    }

    /// Stop processing a guild: new events are refused, queued ones are
    /// skipped and in-flight enforcement gives up before its next attempt.
    ///
    /// Events queued before the removal stay skipped even if the guild is
    /// restored before its lanes drain.
    #[instrument(skip(self))]
    pub fn remove_guild(&self, guild: GuildId) {
        self.shared.blocked.write().insert(guild);
        let dropped = self.shared.executor.block_guild(guild);

        let mut lanes = self.shared.lanes.lock();
        *self.shared.epochs.write().entry(guild).or_default() += 1;
        let closing: Vec<LaneKey> = lanes
            .keys()
            .filter(|key| key.guild_id == guild)
            .copied()
            .collect();
        let mut retired = self.shared.retired.lock();
        retired.retain(|_, handle| !handle.is_finished());
        for key in &closing {
            if let Some(lane) = lanes.remove(key) {
                retired.insert(*key, lane.handle);
            }
        }
        info!(
            lanes_closed = closing.len(),
            actions_dropped = dropped,
            "Guild removed"
        );
    }

    /// Accept events for a previously removed guild again.
    pub fn restore_guild(&self, guild: GuildId) {
        self.shared.blocked.write().remove(&guild);
        self.shared.executor.unblock_guild(guild);
        info!(guild_id = %guild, "Guild restored");
    }

    /// Stop accepting events, let every lane finish what it holds and wait
    /// for queued enforcement, up to `grace`. Returns whether everything
    /// finished in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.shared.shutting_down.store(true, Ordering::Release);
        let lanes: Vec<Lane> = self
            .shared
            .lanes
            .lock()
            .drain()
            .map(|(_, lane)| lane)
            .collect();
        let retired: Vec<JoinHandle<()>> = self
            .shared
            .retired
            .lock()
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        info!(lanes = lanes.len(), retired = retired.len(), "Shutting down");

        let deadline = tokio::time::Instant::now() + grace;
        let mut clean = true;
        let mut handles = Vec::with_capacity(lanes.len() + retired.len());
        for Lane { tx, handle, .. } in lanes {
            drop(tx);
            handles.push(handle);
        }
        handles.extend(retired);
        for handle in handles {
            if tokio::time::timeout_at(deadline, handle).await.is_err() {
                warn!("Lane worker did not finish before the deadline");
                clean = false;
            }
        }
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        clean &= self.shared.executor.flush(remaining).await;
        info!(clean, "Shutdown complete");
        clean
    }

    /// Housekeeping: forget idle rate limit buckets and starboard locks.
    pub async fn maintain(&self) {
        self.shared.executor.prune();
        self.shared.starboard.cleanup_locks().await;
    }

    /// Number of live lanes.
    pub fn lane_count(&self) -> usize {
        self.shared.lanes.lock().len()
    }

    /// The verdict engine.
    pub fn engine(&self) -> &VerdictEngine {
        &self.shared.engine
    }

    /// The action executor.
    pub fn executor(&self) -> &ActionExecutor {
        &self.shared.executor
    }

    /// The starboard, for entry queries.
    pub fn starboard(&self) -> &StarboardAggregator {
        &self.shared.starboard
    }

    /// The thread resolver, for status queries and closing threads.
    pub fn resolver(&self) -> &ThreadResolver {
        &self.shared.resolver
    }

    /// Called with the lanes lock held.
    fn spawn_lane(&self, key: LaneKey, epoch: u64) -> Lane {
        let (tx, rx) = mpsc::channel(*self.shared.ingest.lane_capacity());
        let id = self.shared.next_lane_id.fetch_add(1, Ordering::Relaxed);
        let predecessor = self.shared.retired.lock().remove(&key);
        debug!(lane = %key, id, epoch, waits = predecessor.is_some(), "Lane opened");
        let worker = LaneWorker {
            key,
            id,
            epoch,
            predecessor,
        };
        let handle = tokio::spawn(run_lane(Arc::clone(&self.shared), worker, rx));
        Lane {
            id,
            epoch,
            tx,
            handle,
        }
    }
}

struct LaneWorker {
    key: LaneKey,
    id: u64,
    epoch: u64,
    /// Worker of a lane retired by a guild removal, still draining.
    predecessor: Option<JoinHandle<()>>,
}

/// Drain one lane until it is closed or idle.
async fn run_lane(shared: Arc<Shared>, worker: LaneWorker, mut rx: mpsc::Receiver<Event>) {
    let LaneWorker {
        key,
        id,
        epoch,
        predecessor,
    } = worker;
    if let Some(handle) = predecessor {
        if let Err(e) = handle.await {
            error!(lane = %key, error = %e, "Retired lane worker failed");
        }
    }

    let idle = shared.ingest.idle_lane_timeout();
    loop {
        match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(event)) if shared.epoch(key.guild_id) != epoch => {
                debug!(lane = %key, event_id = %event.id(), "Guild removed since queued, event skipped");
            }
            Ok(Some(event)) => shared.dispatch(event).await,
            Ok(None) => break,
            Err(_) => {
                // Ingest sends under the same lock, so an empty queue here
                // stays empty once the lane is unregistered.
                let mut lanes = shared.lanes.lock();
                if rx.is_empty() {
                    if lanes.get(&key).is_some_and(|lane| lane.id == id) {
                        lanes.remove(&key);
                    }
                    break;
                }
            }
        }
    }
    debug!(lane = %key, id, "Lane closed");
}

impl Shared {
    fn is_blocked(&self, guild: GuildId) -> bool {
        self.blocked.read().contains(&guild)
    }

    /// How many times `guild` has been removed.
    fn epoch(&self, guild: GuildId) -> u64 {
        self.epochs.read().get(&guild).copied().unwrap_or_default()
    }

    #[instrument(
        skip(self, event),
        fields(
            event_id = %event.id(),
            kind = %event.kind(),
            guild_id = %event.guild_id(),
            channel_id = %event.channel_id()
        )
    )]
    async fn dispatch(&self, event: Event) {
        if self.is_blocked(*event.guild_id()) {
            debug!("Guild blocked, event skipped");
            return;
        }
        match event.kind() {
            EventKind::MessageCreated => {
                let decided = self.moderate(&event).await;
                if !decided.is_some_and(|action| action >= Action::Delete) {
                    self.reply_with_cleaned_links(&event).await;
                }
            }
            EventKind::MessageEdited => {
                self.moderate(&event).await;
            }
            EventKind::ThreadMessage => {
                let (_, resolved) =
                    tokio::join!(self.moderate(&event), self.resolver.handle(&event));
                match resolved {
                    Ok(outcome) => debug!(?outcome, "Thread message handled"),
                    Err(e) => error!(error = %e, "Thread resolver failed"),
                }
            }
            EventKind::ReactionAdded | EventKind::ReactionRemoved => {
                match self.starboard.handle(&event).await {
                    Ok(outcome) => debug!(?outcome, "Reaction handled"),
                    Err(e) => error!(error = %e, "Starboard failed"),
                }
            }
        }
    }

    /// Evaluate and enforce. Returns the action now in force for the message.
    async fn moderate(&self, event: &Event) -> Option<Action> {
        let decision = match self.engine.evaluate(event).await {
            Ok(Some(decision)) => decision,
            Ok(None) => return None,
            Err(e) => {
                error!(error = %e, "Verdict evaluation failed");
                return None;
            }
        };

        if decision.should_execute() {
            let result = self.executor.execute(decision.verdict.clone()).await;
            log_execution(&decision.verdict.action, &result);
            for related in decision.related_verdicts() {
                let result = self.executor.execute(related).await;
                log_execution(&Action::Delete, &result);
            }
            return Some(decision.verdict.action);
        }

        // The stored verdict outlives a failed or dropped action.
        if let Some(kept) = decision.kept_verdict() {
            let action = kept.action;
            if !self.executor.covers(kept.guild_id, kept.message_id, action) {
                info!(message_id = %kept.message_id, %action, "Re-submitting unenforced action");
                let result = self.executor.execute(kept).await;
                log_execution(&action, &result);
            }
            return Some(action);
        }
        Some(decision.verdict.action)
    }

    async fn reply_with_cleaned_links(&self, event: &Event) {
        if !self.reply_with_cleaned_links {
            return;
        }
        let Some(message) = event.message() else {
            return;
        };
        let cleaned = self.links.clean_links(&message.content);
        if cleaned.is_empty() {
            return;
        }
        let mut reply = String::from("Links without tracking parameters:");
        for link in &cleaned {
            reply.push('\n');
            reply.push_str(&link.cleaned);
        }
        match self.platform.create_post(*event.channel_id(), &reply).await {
            Ok(post) => debug!(%post, links = cleaned.len(), "Posted cleaned links"),
            Err(e) => warn!(error = %e, "Failed to post cleaned links"),
        }
    }
}

fn log_execution(action: &Action, result: &ExecutionResult) {
    match result {
        ExecutionResult::Applied { .. }
        | ExecutionResult::Queued { .. }
        | ExecutionResult::Duplicate
        | ExecutionResult::Skipped => debug!(%action, ?result, "Enforcement submitted"),
        ExecutionResult::Failed { .. } | ExecutionResult::Abandoned => {
            warn!(%action, ?result, "Enforcement did not complete")
        }
    }
}
