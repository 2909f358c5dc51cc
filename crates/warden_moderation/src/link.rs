//! Tracking-parameter removal.
//!
//! Sanitizing edits the raw query string instead of re-serializing a parsed
//! URL: host, path, fragment and the spelling of surviving parameters come
//! through byte for byte, so cleaning a clean link is a no-op.

use crate::LinkConfig;
use std::collections::HashSet;
use url::Url;

/// A link that changed when sanitized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedLink {
    /// Link as posted
    pub original: String,
    /// Link without tracking parameters
    pub cleaned: String,
}

/// Strips known tracking parameters from http(s) URLs.
#[derive(Debug, Clone)]
pub struct LinkSanitizer {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl Default for LinkSanitizer {
    fn default() -> Self {
        Self::from_config(&LinkConfig::default())
    }
}

impl LinkSanitizer {
    /// Build from deny-list entries. Entries ending in `*` match by prefix;
    /// matching ignores ASCII case.
    pub fn new<S: AsRef<str>>(deny_list: &[S]) -> Self {
        let mut exact = HashSet::new();
        let mut prefixes = Vec::new();
        for entry in deny_list {
            let entry = entry.as_ref().trim().to_ascii_lowercase();
            if entry.is_empty() {
                continue;
            }
            match entry.strip_suffix('*') {
                Some(prefix) if !prefix.is_empty() => prefixes.push(prefix.to_string()),
                Some(_) => {}
                None => {
                    exact.insert(entry);
                }
            }
        }
        Self { exact, prefixes }
    }

    /// Build from the link section of the configuration.
    pub fn from_config(config: &LinkConfig) -> Self {
        Self::new(config.tracking_params().as_slice())
    }

    /// Whether a (decoded) query key is a tracking parameter.
    pub fn is_tracking_param(&self, key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        self.exact.contains(&key) || self.prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }

    /// Remove tracking parameters from `raw`.
    ///
    /// Anything that is not a parseable http(s) URL comes back unchanged.
    pub fn sanitize(&self, raw: &str) -> String {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return raw.to_string(),
        }

        let (before_fragment, fragment) = match raw.find('#') {
            Some(i) => raw.split_at(i),
            None => (raw, ""),
        };
        let Some(query_start) = before_fragment.find('?') else {
            return raw.to_string();
        };
        let base = &before_fragment[..query_start];
        let query = &before_fragment[query_start + 1..];

        let mut removed = false;
        let mut kept = Vec::new();
        for segment in query.split('&') {
            if segment.is_empty() {
                continue;
            }
            if self.segment_is_tracking(segment) {
                removed = true;
            } else {
                kept.push(segment);
            }
        }

        if !removed {
            return raw.to_string();
        }

        let mut cleaned = String::with_capacity(raw.len());
        cleaned.push_str(base);
        if !kept.is_empty() {
            cleaned.push('?');
            cleaned.push_str(&kept.join("&"));
        }
        cleaned.push_str(fragment);
        cleaned
    }

    /// Sanitize every link in `text`, returning only those that changed.
    pub fn clean_links(&self, text: &str) -> Vec<CleanedLink> {
        extract_urls(text)
            .into_iter()
            .filter_map(|original| {
                let cleaned = self.sanitize(original);
                (cleaned != original).then(|| CleanedLink {
                    original: original.to_string(),
                    cleaned,
                })
            })
            .collect()
    }

    fn segment_is_tracking(&self, segment: &str) -> bool {
        url::form_urlencoded::parse(segment.as_bytes())
            .next()
            .is_some_and(|(key, _)| self.is_tracking_param(&key))
    }
}

/// Whitespace-separated words that parse as http(s) URLs. Angle brackets
/// (embed suppression) are stripped.
pub fn extract_urls(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|word| word.trim_start_matches('<').trim_end_matches('>'))
        .filter(|word| {
            Url::parse(word).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_key_is_percent_decoded() {
        let sanitizer = LinkSanitizer::new(&["fbclid"]);
        assert!(sanitizer.segment_is_tracking("fb%63lid=1"));
        assert!(!sanitizer.segment_is_tracking("q=fbclid"));
    }

    #[test]
    fn test_lone_star_entry_is_ignored() {
        let sanitizer = LinkSanitizer::new(&["*", "utm_*"]);
        assert!(sanitizer.prefixes == vec!["utm_".to_string()]);
        assert!(!sanitizer.is_tracking_param("q"));
    }
}
