//! Per-sender conversation history
//!
//! Each sender owns a slot holding a bounded FIFO of turns and an async gate.
//! The resolver holds the gate for a whole resolution so one sender's turns
//! land in arrival order, while different senders proceed in parallel.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::config::ConversationSettings;
use crate::locking::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One sender's history plus the gate serializing their messages
#[derive(Debug, Default)]
pub struct SenderSlot {
    gate: AsyncMutex<()>,
    turns: Mutex<VecDeque<Turn>>,
}

impl SenderSlot {
    /// Wait for this sender's previous message to finish resolving
    pub async fn enter(&self) -> AsyncMutexGuard<'_, ()> {
        self.gate.lock().await
    }

    fn push(&self, turn: Turn, max_turns: usize) {
        self.push_all([turn], max_turns);
    }

    /// Append turns under one lock, so a concurrent clear never splits them
    fn push_all(&self, new_turns: impl IntoIterator<Item = Turn>, max_turns: usize) {
        let mut turns = lock(&self.turns);
        turns.extend(new_turns);
        while turns.len() > max_turns {
            turns.pop_front();
        }
    }

    fn snapshot(&self) -> Vec<Turn> {
        lock(&self.turns).iter().cloned().collect()
    }

    fn len(&self) -> usize {
        lock(&self.turns).len()
    }

    fn clear(&self) -> usize {
        let mut turns = lock(&self.turns);
        let cleared = turns.len();
        turns.clear();
        cleared
    }
}

/// All conversations, keyed by sender id
#[derive(Debug)]
pub struct ConversationStore {
    senders: Mutex<HashMap<String, Arc<SenderSlot>>>,
    max_turns: usize,
}

impl ConversationStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
            max_turns: max_turns.max(1),
        }
    }

    pub fn from_settings(settings: &ConversationSettings) -> Self {
        Self::new(settings.effective_max_turns())
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Get the sender's slot, creating it on first sight.
    /// The flag is true when the slot was just created.
    pub fn slot(&self, sender: &str) -> (Arc<SenderSlot>, bool) {
        let mut senders = lock(&self.senders);
        if let Some(slot) = senders.get(sender) {
            return (Arc::clone(slot), false);
        }
        let slot = Arc::new(SenderSlot::default());
        senders.insert(sender.to_string(), Arc::clone(&slot));
        (slot, true)
    }

    /// The sender's slot, if they have ever been seen
    pub fn existing(&self, sender: &str) -> Option<Arc<SenderSlot>> {
        lock(&self.senders).get(sender).cloned()
    }

    /// Append one turn, dropping the oldest beyond the cap
    pub fn append(&self, sender: &str, turn: Turn) {
        let (slot, _) = self.slot(sender);
        slot.push(turn, self.max_turns);
    }

    /// Append a user message and the reply it got
    pub fn record_exchange(&self, sender: &str, message: &str, reply: &str) {
        let (slot, _) = self.slot(sender);
        slot.push_all([Turn::user(message), Turn::assistant(reply)], self.max_turns);
    }

    /// Oldest-first copy of the sender's history
    pub fn history(&self, sender: &str) -> Vec<Turn> {
        self.existing(sender)
            .map(|slot| slot.snapshot())
            .unwrap_or_default()
    }

    /// The last `n` turns, oldest first
    pub fn recent(&self, sender: &str, n: usize) -> Vec<Turn> {
        let mut history = self.history(sender);
        let skip = history.len().saturating_sub(n);
        history.drain(..skip);
        history
    }

    pub fn len(&self, sender: &str) -> usize {
        self.existing(sender).map(|slot| slot.len()).unwrap_or(0)
    }

    /// Clear a sender's history.
    ///
    /// Returns the number of turns removed, or `None` for a sender never
    /// seen. The sender stays known, so resetting twice is harmless.
    pub fn reset(&self, sender: &str) -> Option<usize> {
        self.existing(sender).map(|slot| slot.clear())
    }

    pub fn sender_count(&self) -> usize {
        lock(&self.senders).len()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::from_settings(&ConversationSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_created_once() {
        let store = ConversationStore::default();
        let (_, created) = store.slot("alice");
        assert!(created);
        let (_, created) = store.slot("alice");
        assert!(!created);
        assert_eq!(store.sender_count(), 1);
    }

    #[test]
    fn test_history_capped_fifo() {
        let store = ConversationStore::new(10);
        for i in 0..13 {
            store.append("bob", Turn::user(format!("m{}", i)));
        }

        let history = store.history("bob");
        assert_eq!(history.len(), 10);
        let contents: Vec<_> = history.iter().map(|t| t.content.as_str()).collect();
        let expected: Vec<String> = (3..13).map(|i| format!("m{}", i)).collect();
        assert_eq!(contents, expected);
    }

    #[test]
    fn test_record_exchange_orders_roles() {
        let store = ConversationStore::default();
        store.record_exchange("carol", "hi", "Hello!");

        let history = store.history("carol");
        assert_eq!(history, vec![Turn::user("hi"), Turn::assistant("Hello!")]);
        assert_eq!(store.recent("carol", 1), vec![Turn::assistant("Hello!")]);
        assert_eq!(store.recent("carol", 5).len(), 2);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let store = ConversationStore::default();
        assert_eq!(store.reset("nobody"), None);

        store.record_exchange("dave", "a", "b");
        assert_eq!(store.reset("dave"), Some(2));
        assert_eq!(store.reset("dave"), Some(0));
        assert_eq!(store.len("dave"), 0);
        assert_eq!(store.sender_count(), 1);
    }

    #[test]
    fn test_unknown_sender_reads_empty() {
        let store = ConversationStore::default();
        assert!(store.history("ghost").is_empty());
        assert_eq!(store.len("ghost"), 0);
        assert_eq!(store.sender_count(), 0);
    }

    #[test]
    fn test_exchanges_stay_paired_across_resets() {
        let store = Arc::new(ConversationStore::new(4));
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..500 {
                    store.record_exchange("frank", &format!("q{}", i), &format!("a{}", i));
                }
            })
        };
        for _ in 0..500 {
            store.reset("frank");
        }
        writer.join().unwrap();

        let history = store.history("frank");
        assert_eq!(history.len() % 2, 0);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
    }

    #[test]
    fn test_existing_does_not_create() {
        let store = ConversationStore::default();
        assert!(store.existing("gina").is_none());
        assert_eq!(store.sender_count(), 0);
        store.slot("gina");
        assert!(store.existing("gina").is_some());
    }

    #[tokio::test]
    async fn test_gate_serializes_same_sender() {
        let store = ConversationStore::default();
        let (slot, _) = store.slot("erin");
        let guard = slot.enter().await;
        assert!(slot.gate.try_lock().is_err());
        drop(guard);
        assert!(slot.gate.try_lock().is_ok());
    }
}
