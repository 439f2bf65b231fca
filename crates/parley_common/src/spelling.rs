//! Spelling normalizer
//!
//! Token-level cleanup applied before pattern matching: trim punctuation
//! around each word, swap known misspellings and chat shorthand for the
//! canonical word, collapse whitespace, lower-case.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Misspelling -> canonical spelling
const MISSPELLINGS: &[(&str, &str)] = &[
    ("teh", "the"),
    ("hte", "the"),
    ("wat", "what"),
    ("wht", "what"),
    ("whta", "what"),
    ("waht", "what"),
    ("whats", "what's"),
    ("u", "you"),
    ("r", "are"),
    ("ur", "your"),
    ("pls", "please"),
    ("plz", "please"),
    ("thnx", "thanks"),
    ("thnks", "thanks"),
    ("thanx", "thanks"),
    ("ty", "thanks"),
    ("hii", "hi"),
    ("hiii", "hi"),
    ("helo", "hello"),
    ("hellow", "hello"),
    ("hallo", "hello"),
    ("jok", "joke"),
    ("jokee", "joke"),
    ("joek", "joke"),
    ("fcat", "fact"),
    ("facs", "facts"),
    ("captial", "capital"),
    ("capitol", "capital"),
    ("capial", "capital"),
    ("canda", "canada"),
    ("cananda", "canada"),
    ("tiem", "time"),
    ("tmie", "time"),
    ("dat", "date"),
    ("tody", "today"),
    ("todya", "today"),
    ("calcualte", "calculate"),
    ("calulate", "calculate"),
    ("caculate", "calculate"),
    ("explian", "explain"),
    ("expalin", "explain"),
    ("goodbey", "goodbye"),
    ("gudbye", "goodbye"),
    ("byee", "bye"),
    ("cya", "see you"),
    ("intresting", "interesting"),
    ("interestin", "interesting"),
    ("somthing", "something"),
    ("tel", "tell"),
    ("abt", "about"),
    ("yourslef", "yourself"),
];

fn table() -> &'static HashMap<&'static str, &'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| MISSPELLINGS.iter().copied().collect())
}

/// Normalize a raw chat message for matching
///
/// Tokens made only of punctuation disappear; unknown tokens pass through.
pub fn normalize(message: &str) -> String {
    let table = table();

    message
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| c.is_ascii_punctuation()).to_lowercase())
        .filter(|token| !token.is_empty())
        .map(|token| match table.get(token.as_str()) {
            Some(fixed) => (*fixed).to_string(),
            None => token,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrects_known_misspellings() {
        assert_eq!(normalize("tell me a jok"), "tell me a joke");
        assert_eq!(normalize("wat is teh captial of canda?"), "what is the capital of canada");
    }

    #[test]
    fn test_strips_surrounding_punctuation_only() {
        assert_eq!(normalize("Hello!!!  How's   it going?"), "hello how's it going");
        assert_eq!(normalize("\"quoted\", (parens)"), "quoted parens");
    }

    #[test]
    fn test_lowercases_and_passes_unknown_tokens() {
        assert_eq!(normalize("Quantum CHROMODYNAMICS"), "quantum chromodynamics");
    }

    #[test]
    fn test_punctuation_only_tokens_vanish() {
        assert_eq!(normalize("25 * 4"), "25 4");
        assert_eq!(normalize("?!"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_shorthand_expands() {
        assert_eq!(normalize("thx u r great"), "thx you are great");
        assert_eq!(normalize("cya"), "see you");
    }
}
