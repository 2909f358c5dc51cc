//! Versioned blocklist with atomic snapshot swap.
//!
//! A [`BlocklistSnapshot`] is built and validated off the hot path, then
//! published through an [`ArcSwap`]. Readers load the current `Arc` without
//! locking and keep using it for the whole match even if a reload lands
//! meanwhile; the old snapshot is freed when its last reader drops it.

use crate::link::extract_urls;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;
use warden_core::{BlocklistRule, PatternKind, RuleHit, RuleId, Severity};
use warden_error::{ConfigError, ConfigErrorKind, WardenResult};
use warden_interface::BlocklistSource;

const REGEX_SIZE_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone)]
struct RuleRef {
    id: RuleId,
    severity: Severity,
}

#[derive(Debug)]
struct RegexGroup {
    severity: Severity,
    rules: Vec<(RuleId, Regex)>,
}

/// Immutable, validated rule set.
#[derive(Debug, Default)]
pub struct BlocklistSnapshot {
    version: u64,
    rule_count: usize,
    exact: HashMap<String, Vec<RuleRef>>,
    domains: HashMap<String, Vec<RuleRef>>,
    regex_groups: Vec<RegexGroup>,
}

impl BlocklistSnapshot {
    /// Snapshot with no rules at version 0.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate and index `rules`. Any invalid rule rejects the whole set.
    ///
    /// The snapshot version is the highest rule version.
    pub fn build(rules: Vec<BlocklistRule>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut exact: HashMap<String, Vec<RuleRef>> = HashMap::new();
        let mut domains: HashMap<String, Vec<RuleRef>> = HashMap::new();
        let mut hard_regex = Vec::new();
        let mut soft_regex = Vec::new();
        let mut version = 0;

        for rule in &rules {
            if !seen.insert(rule.id.clone()) {
                return Err(ConfigError::new(ConfigErrorKind::DuplicateRule(
                    rule.id.to_string(),
                )));
            }
            let pattern = rule.pattern.trim();
            if pattern.is_empty() {
                return Err(invalid(&rule.id, "pattern is empty"));
            }
            version = version.max(rule.version);
            let reference = RuleRef {
                id: rule.id.clone(),
                severity: rule.severity,
            };

            match rule.pattern_kind {
                PatternKind::Exact => {
                    exact
                        .entry(pattern.to_lowercase())
                        .or_default()
                        .push(reference);
                }
                PatternKind::DomainSuffix => {
                    let domain = normalize_domain(pattern)
                        .ok_or_else(|| invalid(&rule.id, "not a valid domain"))?;
                    domains.entry(domain).or_default().push(reference);
                }
                PatternKind::Regex => {
                    let regex = RegexBuilder::new(pattern)
                        .case_insensitive(true)
                        .size_limit(REGEX_SIZE_LIMIT)
                        .build()
                        .map_err(|e| invalid(&rule.id, &e.to_string()))?;
                    match rule.severity {
                        Severity::Hard => hard_regex.push((rule.id.clone(), regex)),
                        Severity::Soft => soft_regex.push((rule.id.clone(), regex)),
                    }
                }
            }
        }

        let regex_groups = [
            RegexGroup {
                severity: Severity::Hard,
                rules: hard_regex,
            },
            RegexGroup {
                severity: Severity::Soft,
                rules: soft_regex,
            },
        ]
        .into_iter()
        .filter(|group| !group.rules.is_empty())
        .collect();

        Ok(Self {
            version,
            rule_count: rules.len(),
            exact,
            domains,
            regex_groups,
        })
    }

    /// Rule-set version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rule_count
    }

    /// Whether the snapshot has no rules.
    pub fn is_empty(&self) -> bool {
        self.rule_count == 0
    }

    /// Every rule matching `text` or one of `urls`.
    ///
    /// Exact rules are looked up for the whole text, each word and each URL;
    /// domain rules for every host in `urls` and every domain-looking word,
    /// walking up to parent domains. Within a regex group only the first
    /// matching rule is reported.
    pub fn matches(&self, text: &str, urls: &[&str]) -> BTreeSet<RuleHit> {
        let mut hits = BTreeSet::new();
        let normalized = text.trim().to_lowercase();

        let mut candidates: Vec<String> = vec![normalized.clone()];
        candidates.extend(normalized.split_whitespace().map(trim_word).map(String::from));
        candidates.extend(urls.iter().map(|u| u.to_lowercase()));
        for candidate in &candidates {
            if let Some(rules) = self.exact.get(candidate) {
                for rule in rules {
                    hits.insert(hit(rule, PatternKind::Exact, candidate));
                }
            }
        }

        if !self.domains.is_empty() {
            let mut hosts: Vec<String> = urls.iter().filter_map(|u| host_of(u)).collect();
            hosts.extend(
                normalized
                    .split_whitespace()
                    .map(trim_word)
                    .filter(|word| word.contains('.') && !word.contains("://"))
                    .filter_map(|word| host_of(&format!("http://{word}"))),
            );
            for host in &hosts {
                for suffix in domain_suffixes(host) {
                    if let Some(rules) = self.domains.get(suffix) {
                        for rule in rules {
                            hits.insert(hit(rule, PatternKind::DomainSuffix, host));
                        }
                    }
                }
            }
        }

        for group in &self.regex_groups {
            let matched = group
                .rules
                .iter()
                .find_map(|(id, regex)| regex.find(text).map(|m| (id, m.as_str())));
            if let Some((id, matched)) = matched {
                hits.insert(RuleHit {
                    severity: group.severity,
                    rule_id: id.clone(),
                    pattern_kind: PatternKind::Regex,
                    matched: matched.to_string(),
                });
            }
        }

        hits
    }
}

fn invalid(id: &RuleId, reason: &str) -> ConfigError {
    ConfigError::new(ConfigErrorKind::InvalidRule {
        rule_id: id.to_string(),
        reason: reason.to_string(),
    })
}

fn hit(rule: &RuleRef, kind: PatternKind, matched: &str) -> RuleHit {
    RuleHit {
        severity: rule.severity,
        rule_id: rule.id.clone(),
        pattern_kind: kind,
        matched: matched.to_string(),
    }
}

fn trim_word(word: &str) -> &str {
    word.trim_matches(|c: char| {
        matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | '(' | ')' | '"' | '\'' | '<' | '>')
    })
}

fn normalize_domain(pattern: &str) -> Option<String> {
    let domain = pattern
        .trim()
        .trim_start_matches("*.")
        .trim_start_matches('.')
        .trim_end_matches('.')
        .to_lowercase();
    if domain.is_empty() || domain.contains(['/', ':', ' ', '?', '#', '@']) {
        return None;
    }
    url::Host::parse(&domain).ok()?;
    Some(domain)
}

fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.trim_end_matches('.').to_lowercase();
    (!host.is_empty()).then_some(host)
}

/// `a.b.example.com`, `b.example.com`, `example.com`, `com`.
fn domain_suffixes(host: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(host), |current| {
        current.split_once('.').map(|(_, rest)| rest)
    })
    .filter(|suffix| !suffix.is_empty())
}

/// Shared matcher whose snapshot can be swapped at runtime.
#[derive(Debug)]
pub struct BlocklistMatcher {
    current: ArcSwap<BlocklistSnapshot>,
    reload_lock: Mutex<()>,
}

impl Default for BlocklistMatcher {
    fn default() -> Self {
        Self::new(BlocklistSnapshot::empty())
    }
}

impl BlocklistMatcher {
    /// Matcher starting from `snapshot`.
    pub fn new(snapshot: BlocklistSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
            reload_lock: Mutex::new(()),
        }
    }

    /// Matcher built from `rules`.
    pub fn from_rules(rules: Vec<BlocklistRule>) -> Result<Self, ConfigError> {
        Ok(Self::new(BlocklistSnapshot::build(rules)?))
    }

    /// The active snapshot. Holding it pins that version.
    pub fn snapshot(&self) -> Arc<BlocklistSnapshot> {
        self.current.load_full()
    }

    /// Active rule-set version.
    pub fn version(&self) -> u64 {
        self.current.load().version()
    }

    /// Match against the active snapshot.
    pub fn matches(&self, text: &str, urls: &[&str]) -> BTreeSet<RuleHit> {
        self.current.load().matches(text, urls)
    }

    /// Match `text` and the URLs found in it.
    pub fn matches_text(&self, text: &str) -> BTreeSet<RuleHit> {
        let urls = extract_urls(text);
        self.matches(text, &urls)
    }

    /// Replace the active snapshot with one built from `rules`.
    ///
    /// On any error the active snapshot stays in effect. Rule sets older than
    /// the active version are rejected.
    #[instrument(skip(self, rules), fields(rules = rules.len()))]
    pub fn reload(&self, rules: Vec<BlocklistRule>) -> Result<u64, ConfigError> {
        let candidate = match BlocklistSnapshot::build(rules) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, active = self.version(), "Rejected blocklist reload");
                return Err(e);
            }
        };

        let _guard = self.reload_lock.lock();
        let active = self.version();
        if candidate.version() < active {
            warn!(active, offered = candidate.version(), "Rejected stale blocklist");
            return Err(ConfigError::new(ConfigErrorKind::StaleVersion {
                active,
                offered: candidate.version(),
            }));
        }

        let version = candidate.version();
        let count = candidate.len();
        self.current.store(Arc::new(candidate));
        info!(version, rules = count, "Blocklist snapshot swapped");
        Ok(version)
    }

    /// Pull the rule set from `source` and reload.
    #[instrument(skip(self, source))]
    pub async fn reload_from(&self, source: &dyn BlocklistSource) -> WardenResult<u64> {
        debug!("Loading blocklist from source");
        let rules = source.load_blocklist_snapshot().await?;
        Ok(self.reload(rules)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_suffixes_walk_to_tld() {
        let suffixes: Vec<_> = domain_suffixes("a.b.example.com").collect();
        assert_eq!(suffixes, vec!["a.b.example.com", "b.example.com", "example.com", "com"]);
    }

    #[test]
    fn test_normalize_domain_strips_wildcards() {
        assert_eq!(normalize_domain("*.Example.COM."), Some("example.com".to_string()));
        assert_eq!(normalize_domain("https://example.com"), None);
        assert_eq!(normalize_domain(""), None);
    }
}
