//! Context extraction from the message and recent history

use serde::{Deserialize, Serialize};

use crate::conversation::{Role, Turn};

const QUESTION_WORDS: &[&str] = &[
    "what", "who", "where", "when", "why", "how", "which", "whose", "whom",
];

/// Single words match whole tokens, phrases match as substrings
const GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "howdy",
    "greetings",
    "good morning",
    "good afternoon",
    "good evening",
];

const FAREWELLS: &[&str] = &[
    "bye",
    "goodbye",
    "farewell",
    "see you",
    "gotta go",
    "good night",
];

const FOLLOW_UPS: &[&str] = &[
    "another one",
    "one more",
    "next one",
    "another",
    "more",
    "again",
];

/// Assistant turns inspected for the recent topic
const TOPIC_LOOKBACK: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Jokes,
    Facts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextSignals {
    pub is_question: bool,
    pub is_greeting: bool,
    pub is_farewell: bool,
    pub recent_topic: Option<Topic>,
}

fn contains_term(normalized: &str, tokens: &[&str], term: &str) -> bool {
    if term.contains(' ') {
        normalized.contains(term)
    } else {
        tokens.contains(&term)
    }
}

fn mentions_any(normalized: &str, terms: &[&str]) -> bool {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    terms.iter().any(|term| contains_term(normalized, &tokens, term))
}

/// Topic of the most recent assistant turn that had one, within the last
/// [`TOPIC_LOOKBACK`] turns
pub fn recent_topic(history: &[Turn]) -> Option<Topic> {
    let start = history.len().saturating_sub(TOPIC_LOOKBACK);
    history[start..]
        .iter()
        .rev()
        .filter(|turn| turn.role == Role::Assistant)
        .find_map(|turn| {
            let content = turn.content.to_lowercase();
            if content.contains("joke") {
                Some(Topic::Jokes)
            } else if content.contains("fact") {
                Some(Topic::Facts)
            } else {
                None
            }
        })
}

/// Derive signals from the raw message, its normalized form and history
pub fn extract(raw: &str, normalized: &str, history: &[Turn]) -> ContextSignals {
    ContextSignals {
        is_question: raw.contains('?') || mentions_any(normalized, QUESTION_WORDS),
        is_greeting: mentions_any(normalized, GREETINGS),
        is_farewell: mentions_any(normalized, FAREWELLS),
        recent_topic: recent_topic(history),
    }
}

/// Whether the message asks for "more of the same"
pub fn is_follow_up(normalized: &str) -> bool {
    mentions_any(normalized, FOLLOW_UPS)
}
