//! Blocklist rule definitions.

use crate::RuleId;
use serde::{Deserialize, Serialize};

/// How a rule's pattern is interpreted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PatternKind {
    /// Case-insensitive equality with a token, the whole message or a URL
    Exact,
    /// Host equals the pattern or is a subdomain of it
    DomainSuffix,
    /// Case-insensitive regular expression over the message text
    Regex,
}

/// Rule severity. Hard hits delete without consulting the classifier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    /// Contributes weight to the fused score
    Soft,
    /// Deletes immediately
    Hard,
}

/// One blocklist rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlocklistRule {
    /// Unique rule id
    pub id: RuleId,
    /// Pattern text, interpreted per `pattern_kind`
    pub pattern: String,
    /// How to interpret `pattern`
    pub pattern_kind: PatternKind,
    /// What a hit means
    pub severity: Severity,
    /// Rule-set version this rule was published in
    pub version: u64,
}

/// A rule that matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleHit {
    /// Severity of the matched rule
    pub severity: Severity,
    /// Matched rule
    pub rule_id: RuleId,
    /// How it matched
    pub pattern_kind: PatternKind,
    /// The text, host or URL that matched
    pub matched: String,
}
