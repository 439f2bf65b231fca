//! Keyword-tally sentiment of an incoming message

use serde::{Deserialize, Serialize};
use std::fmt;

const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "awesome",
    "excellent",
    "happy",
    "love",
    "best",
    "thanks",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "hate",
    "worst",
    "sad",
    "angry",
    "disappointed",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Count listed keywords occurring anywhere in the message; ties are neutral
    pub fn analyze(message: &str) -> Self {
        let lowered = message.to_lowercase();
        let positive = POSITIVE_WORDS.iter().filter(|w| lowered.contains(*w)).count();
        let negative = NEGATIVE_WORDS.iter().filter(|w| lowered.contains(*w)).count();

        match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => Sentiment::Positive,
            std::cmp::Ordering::Less => Sentiment::Negative,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "😊 Positive",
            Sentiment::Negative => "😔 Negative",
            Sentiment::Neutral => "😐 Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
