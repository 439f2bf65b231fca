//! Resolution counters
//!
//! Lock-free monotonically increasing counters, read out as a serializable
//! snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Which stage produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Cache,
    Arithmetic,
    Remote,
    Context,
    Pattern,
    Fuzzy,
    Default,
    /// A chat command; not counted as a message
    Command,
}

impl ReplySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplySource::Cache => "cache",
            ReplySource::Arithmetic => "arithmetic",
            ReplySource::Remote => "remote",
            ReplySource::Context => "context",
            ReplySource::Pattern => "pattern",
            ReplySource::Fuzzy => "fuzzy",
            ReplySource::Default => "default",
            ReplySource::Command => "command",
        }
    }
}

#[derive(Debug)]
pub struct Stats {
    started: Instant,
    started_at: DateTime<Utc>,
    total_messages: AtomicU64,
    total_users: AtomicU64,
    cache_hits: AtomicU64,
    arithmetic_hits: AtomicU64,
    remote_replies: AtomicU64,
    remote_failures: AtomicU64,
    context_hits: AtomicU64,
    pattern_hits: AtomicU64,
    fuzzy_hits: AtomicU64,
    default_replies: AtomicU64,
    rate_limited: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl Stats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
            total_messages: AtomicU64::new(0),
            total_users: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            arithmetic_hits: AtomicU64::new(0),
            remote_replies: AtomicU64::new(0),
            remote_failures: AtomicU64::new(0),
            context_hits: AtomicU64::new(0),
            pattern_hits: AtomicU64::new(0),
            fuzzy_hits: AtomicU64::new(0),
            default_replies: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
        }
    }

    /// Count one resolved message and the stage that answered it
    pub fn record_reply(&self, source: ReplySource) {
        let counter = match source {
            ReplySource::Cache => &self.cache_hits,
            ReplySource::Arithmetic => &self.arithmetic_hits,
            ReplySource::Remote => &self.remote_replies,
            ReplySource::Context => &self.context_hits,
            ReplySource::Pattern => &self.pattern_hits,
            ReplySource::Fuzzy => &self.fuzzy_hits,
            ReplySource::Default => &self.default_replies,
            ReplySource::Command => return,
        };
        bump(&self.total_messages);
        bump(counter);
    }

    pub fn record_new_user(&self) {
        bump(&self.total_users);
    }

    pub fn record_remote_failure(&self) {
        bump(&self.remote_failures);
    }

    pub fn record_rate_limited(&self) {
        bump(&self.rate_limited);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            started_at: self.started_at,
            uptime_secs: self.started.elapsed().as_secs(),
            total_messages: load(&self.total_messages),
            total_users: load(&self.total_users),
            cache_hits: load(&self.cache_hits),
            arithmetic_hits: load(&self.arithmetic_hits),
            remote_replies: load(&self.remote_replies),
            remote_failures: load(&self.remote_failures),
            context_hits: load(&self.context_hits),
            pattern_hits: load(&self.pattern_hits),
            fuzzy_hits: load(&self.fuzzy_hits),
            default_replies: load(&self.default_replies),
            rate_limited: load(&self.rate_limited),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub total_messages: u64,
    pub total_users: u64,
    pub cache_hits: u64,
    pub arithmetic_hits: u64,
    /// Successful remote answers; failures are in `remote_failures`
    pub remote_replies: u64,
    pub remote_failures: u64,
    pub context_hits: u64,
    pub pattern_hits: u64,
    pub fuzzy_hits: u64,
    pub default_replies: u64,
    /// Turns where the limiter refused the remote call, plus quota failures
    pub rate_limited: u64,
}

impl StatsSnapshot {
    /// Replies produced locally rather than by the remote backend or cache
    pub fn local_replies(&self) -> u64 {
        self.arithmetic_hits
            + self.context_hits
            + self.pattern_hits
            + self.fuzzy_hits
            + self.default_replies
    }

    pub fn uptime_minutes(&self) -> u64 {
        self.uptime_secs / 60
    }
}
