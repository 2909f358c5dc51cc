//! Classifier scores and suggestions.

use crate::ThreadId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw oracle score.
///
/// `value` is the overall score; `categories` carries per-category scores when
/// the oracle reports them. Values outside `[0, 1]` are clamped on construction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Score {
    /// Overall score in [0, 1]
    pub value: f32,
    /// Per-category scores in [0, 1]
    #[serde(default)]
    pub categories: BTreeMap<String, f32>,
}

impl Score {
    /// Overall score only.
    pub fn new(value: f32) -> Self {
        Self {
            value: clamp_unit(value),
            categories: BTreeMap::new(),
        }
    }

    /// Add a category score.
    pub fn with_category(mut self, name: impl Into<String>, value: f32) -> Self {
        self.categories.insert(name.into(), clamp_unit(value));
        self
    }

    /// Highest score among `names`, falling back to the overall value when none
    /// of them were reported.
    pub fn focused(&self, names: &[String]) -> f32 {
        names
            .iter()
            .filter_map(|name| self.categories.get(name).copied())
            .reduce(f32::max)
            .unwrap_or(self.value)
    }

    /// Whether every reported number is finite.
    pub fn is_finite(&self) -> bool {
        self.value.is_finite() && self.categories.values().all(|v| v.is_finite())
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() { value } else { value.clamp(0.0, 1.0) }
}

/// Result of asking the classifier, as seen by the verdict engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClassifierOutcome {
    /// The oracle answered
    Scored {
        /// Focused score in [0, 1]
        score: f32,
    },
    /// Timeout, exhausted retries or a permanent failure
    Unavailable,
    /// Not asked (hard blocklist hit, per-user cooldown)
    Skipped,
}

impl ClassifierOutcome {
    /// The score, when there is one.
    pub fn score(&self) -> Option<f32> {
        match self {
            ClassifierOutcome::Scored { score } => Some(*score),
            _ => None,
        }
    }
}

/// What the oracle sees of a help thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadContext {
    /// Thread being helped
    pub thread_id: ThreadId,
    /// Thread title
    pub title: String,
    /// Opening message text
    pub body: String,
}

/// A suggested answer for a help thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Answer text
    pub text: String,
}

/// Result of asking for a suggestion.
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionOutcome {
    /// The oracle answered
    Suggested(Suggestion),
    /// The oracle could not answer in time
    Unavailable,
}
