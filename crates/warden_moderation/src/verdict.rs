//! Signal fusion and verdicts.
//!
//! Precedence, highest first:
//! 1. a hard blocklist hit deletes, without asking the classifier;
//! 2. otherwise the classifier score plus weighted soft hits is compared
//!    against the action thresholds;
//! 3. a cross-channel repeat raises the result to the configured floor, a
//!    hard hit's Delete included. Without a repeat a hard hit is exactly Delete.
//!
//! Re-evaluation (edits) only ever escalates: a prior action is never undone.

use crate::link::extract_urls;
use crate::{BlocklistMatcher, ClassifierAdapter, ModerationConfig, RepeatHit, RepeatTracker};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use warden_core::{
    Action, ChannelId, ClassifierOutcome, Event, EventKind, MessageId, ModerationVerdict, RuleHit,
    Severity,
};
use warden_error::WardenResult;
use warden_interface::VerdictStore;

/// How a verdict relates to the previous one for the same message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// First verdict for the message
    New,
    /// More severe than the previous verdict
    Escalated {
        /// Previous action
        from: Action,
    },
    /// Not more severe; the previous verdict stands
    Unchanged {
        /// Action that remains in force
        kept: Action,
    },
}

/// Outcome of evaluating one message.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Freshly computed verdict
    pub verdict: ModerationVerdict,
    /// Relation to the stored verdict
    pub disposition: Disposition,
    /// Earlier copies of repeated content that should be removed as well
    pub related_messages: Vec<(ChannelId, MessageId)>,
}

impl Decision {
    /// Whether the verdict should be handed to the executor.
    pub fn should_execute(&self) -> bool {
        self.verdict.action.is_enforcement()
            && !matches!(self.disposition, Disposition::Unchanged { .. })
    }

    /// The action still in force when this verdict did not escalate, as a
    /// verdict for the same message. Lets a caller re-submit an action whose
    /// earlier enforcement never completed.
    pub fn kept_verdict(&self) -> Option<ModerationVerdict> {
        match self.disposition {
            Disposition::Unchanged { kept } if kept.is_enforcement() => Some(ModerationVerdict {
                action: kept,
                reason: format!("{kept} kept from an earlier verdict"),
                ..self.verdict.clone()
            }),
            _ => None,
        }
    }

    /// Delete verdicts for the earlier copies of repeated content.
    pub fn related_verdicts(&self) -> Vec<ModerationVerdict> {
        self.related_messages
            .iter()
            .map(|(channel_id, message_id)| ModerationVerdict {
                message_id: *message_id,
                channel_id: *channel_id,
                rule_hits: Vec::new(),
                classifier_score: None,
                blocklist_hit: false,
                action: Action::Delete,
                reason: format!("Repeat of message {}", self.verdict.message_id),
                ..self.verdict.clone()
            })
            .collect()
    }
}

/// Fused action and its justification.
#[derive(Debug, Clone, PartialEq)]
pub struct Fusion {
    /// Decided action
    pub action: Action,
    /// Combined score, when the score path was taken
    pub combined_score: Option<f32>,
    /// Human readable justification
    pub reason: String,
}

/// Turns message events into verdicts. Performs no platform I/O.
pub struct VerdictEngine {
    config: ModerationConfig,
    blocklist: Arc<BlocklistMatcher>,
    classifier: ClassifierAdapter,
    repeats: RepeatTracker,
    verdicts: Arc<dyn VerdictStore>,
}

impl std::fmt::Debug for VerdictEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerdictEngine")
            .field("config", &self.config)
            .field("blocklist_version", &self.blocklist.version())
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

impl VerdictEngine {
    /// Assemble an engine.
    pub fn new(
        config: ModerationConfig,
        blocklist: Arc<BlocklistMatcher>,
        classifier: ClassifierAdapter,
        repeats: RepeatTracker,
        verdicts: Arc<dyn VerdictStore>,
    ) -> Self {
        Self {
            config,
            blocklist,
            classifier,
            repeats,
            verdicts,
        }
    }

    /// The shared blocklist.
    pub fn blocklist(&self) -> &Arc<BlocklistMatcher> {
        &self.blocklist
    }

    /// The classifier adapter.
    pub fn classifier(&self) -> &ClassifierAdapter {
        &self.classifier
    }

    /// Evaluate a message event.
    ///
    /// Returns `None` for events without a message body and for exempt
    /// authors. The verdict store is updated for new and escalated verdicts
    /// that carry an action.
    #[instrument(
        skip(self, event),
        fields(
            guild_id = %event.guild_id(),
            channel_id = %event.channel_id(),
            kind = %event.kind(),
        )
    )]
    pub async fn evaluate(&self, event: &Event) -> WardenResult<Option<Decision>> {
        let Some(message) = event.message() else {
            return Ok(None);
        };
        if *self.config.ignore_bots() && message.author_is_bot {
            debug!("Ignoring bot author");
            return Ok(None);
        }
        if message
            .author_roles
            .iter()
            .any(|role| self.config.exempt_role_ids().contains(role))
        {
            debug!("Author holds an exempt role");
            return Ok(None);
        }

        let author = *event.author_id();
        let urls = extract_urls(&message.content);
        let hits = self.blocklist.matches(&message.content, &urls);
        let hard = hits.iter().any(|hit| hit.severity == Severity::Hard);

        let repeat = match event.kind() {
            EventKind::MessageEdited => None,
            _ => self
                .repeats
                .observe(author, *event.channel_id(), message),
        };

        let classifier = if hard {
            ClassifierOutcome::Skipped
        } else {
            self.classifier.classify(author, &message.content).await
        };

        let fusion = self.fuse(&hits, &classifier, repeat.as_ref());
        let verdict = ModerationVerdict {
            message_id: message.message_id,
            guild_id: *event.guild_id(),
            channel_id: *event.channel_id(),
            author_id: author,
            blocklist_hit: !hits.is_empty(),
            rule_hits: hits.into_iter().collect(),
            classifier_score: classifier.score(),
            action: fusion.action,
            reason: fusion.reason,
            decided_at: Utc::now(),
        };

        let prior = self.verdicts.get_verdict(message.message_id).await?;
        let disposition = match prior {
            None => Disposition::New,
            Some(prior) if verdict.action > prior.action => Disposition::Escalated {
                from: prior.action,
            },
            Some(prior) => Disposition::Unchanged { kept: prior.action },
        };

        if verdict.action.is_enforcement() && !matches!(disposition, Disposition::Unchanged { .. })
        {
            self.verdicts.put_verdict(&verdict).await?;
            info!(
                message_id = %verdict.message_id,
                action = %verdict.action,
                ?disposition,
                reason = %verdict.reason,
                "Verdict reached"
            );
        } else {
            debug!(action = %verdict.action, ?disposition, "No new enforcement");
        }

        let related_messages = match (&repeat, &disposition) {
            (Some(hit), Disposition::New | Disposition::Escalated { .. }) => {
                hit.earlier_messages.clone()
            }
            _ => Vec::new(),
        };

        Ok(Some(Decision {
            verdict,
            disposition,
            related_messages,
        }))
    }

    /// Combine signals into an action.
    pub fn fuse(
        &self,
        hits: &BTreeSet<RuleHit>,
        classifier: &ClassifierOutcome,
        repeat: Option<&RepeatHit>,
    ) -> Fusion {
        let hard: Vec<&str> = hits
            .iter()
            .filter(|hit| hit.severity == Severity::Hard)
            .map(|hit| hit.rule_id.0.as_str())
            .collect();

        let mut fusion = if !hard.is_empty() {
            Fusion {
                action: Action::Delete,
                combined_score: None,
                reason: format!("Hard blocklist rule matched: {}", hard.join(", ")),
            }
        } else {
            let soft = hits.iter().filter(|hit| hit.severity == Severity::Soft).count();
            let score = classifier.score().unwrap_or(0.0);
            let combined = (self.config.classifier_weight() * score
                + self.config.soft_hit_weight() * soft as f32)
                .clamp(0.0, 1.0);
            let action = self.config.thresholds().action_for(combined);
            let signal = match classifier {
                ClassifierOutcome::Scored { score } => format!("classifier {score:.2}"),
                ClassifierOutcome::Unavailable => "classifier unavailable".to_string(),
                ClassifierOutcome::Skipped => "classifier skipped".to_string(),
            };
            Fusion {
                action,
                combined_score: Some(combined),
                reason: format!("Combined score {combined:.2} ({signal}, {soft} soft rule hits)"),
            }
        };

        if let Some(repeat) = repeat {
            let floor = *self.repeats.floor();
            if floor > fusion.action {
                fusion.action = floor;
            }
            fusion.reason = format!(
                "{}; same content posted {} times across {} channels",
                fusion.reason,
                repeat.count,
                repeat.channels.len()
            );
        }

        fusion
    }
}
