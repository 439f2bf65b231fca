//! Pattern Matcher - longest pattern first
//!
//! All (pattern, category) pairs are flattened once and stably sorted by
//! pattern length, longest first, so "capital of canada" is tried before
//! "capital of" and ties keep knowledge-base order. Short patterns must match
//! on word boundaries ("hi" should not fire inside "this"); longer ones are
//! plain substrings.

use regex::Regex;
use tracing::debug;

use crate::error::ParleyError;
use crate::knowledge::{Category, KnowledgeBase};

#[derive(Debug)]
enum Rule {
    WordBoundary(Regex),
    Substring,
}

#[derive(Debug)]
struct IndexedPattern {
    pattern: String,
    category: Category,
    rule: Rule,
}

/// A successful exact match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatch<'a> {
    pub category: Category,
    pub pattern: &'a str,
}

#[derive(Debug)]
pub struct PatternMatcher {
    patterns: Vec<IndexedPattern>,
}

impl PatternMatcher {
    /// Index every pattern in the knowledge base.
    ///
    /// Patterns of at most `short_pattern_len` characters get a compiled
    /// word-boundary regex.
    pub fn new(kb: &KnowledgeBase, short_pattern_len: usize) -> Result<Self, ParleyError> {
        let mut patterns = Vec::new();
        for entry in kb.entries() {
            for pattern in &entry.patterns {
                let rule = if pattern.chars().count() <= short_pattern_len {
                    Rule::WordBoundary(Regex::new(&format!(r"\b{}\b", regex::escape(pattern)))?)
                } else {
                    Rule::Substring
                };
                patterns.push(IndexedPattern {
                    pattern: pattern.clone(),
                    category: entry.category,
                    rule,
                });
            }
        }

        // sort_by_key is stable
        patterns.sort_by_key(|p| std::cmp::Reverse(p.pattern.chars().count()));
        debug!("Indexed {} patterns", patterns.len());

        Ok(Self { patterns })
    }

    /// First pattern (longest first) found in either form of the message
    pub fn find(&self, normalized: &str, raw_lower: &str) -> Option<PatternMatch<'_>> {
        self.patterns
            .iter()
            .find(|p| match &p.rule {
                Rule::WordBoundary(re) => re.is_match(normalized) || re.is_match(raw_lower),
                Rule::Substring => {
                    normalized.contains(p.pattern.as_str()) || raw_lower.contains(p.pattern.as_str())
                }
            })
            .map(|p| PatternMatch {
                category: p.category,
                pattern: &p.pattern,
            })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
