//! Response Resolver
//!
//! Orchestrates one chat turn:
//! cache -> arithmetic -> remote (if configured and admitted) ->
//! follow-up shortcut -> exact pattern -> fuzzy pattern -> default reply.
//!
//! Every stage degrades to the next one; nothing here returns an error to
//! the chat user. Each sender's turns are serialized by that sender's gate,
//! and no data lock is held across the remote call.

use chrono::{DateTime, FixedOffset, Local, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::arithmetic::ArithmeticEvaluator;
use crate::cache::ResponseCache;
use crate::commands::{self, Command};
use crate::config::{ParleyConfig, TimeZoneSetting};
use crate::context::{self, Topic};
use crate::conversation::{ConversationStore, SenderSlot};
use crate::error::{ParleyError, RemoteError};
use crate::fuzzy::FuzzyMatcher;
use crate::knowledge::{Category, KnowledgeBase, GENERIC_DEFAULTS, QUESTION_DEFAULTS};
use crate::locking::lock;
use crate::matcher::PatternMatcher;
use crate::rate_limit::{Admission, FailureKind, LimiterStatus, RateLimiter};
use crate::remote::{HttpRemoteResponder, RemoteResponder};
use crate::sentiment::Sentiment;
use crate::spelling;
use crate::stats::{ReplySource, Stats, StatsSnapshot};

/// What the caller sends back to the chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    /// `None` when sentiment is switched off
    pub sentiment: Option<Sentiment>,
    pub source: ReplySource,
}

#[derive(Debug)]
struct Outcome {
    text: String,
    source: ReplySource,
    cacheable: bool,
}

impl Outcome {
    fn new(text: String, source: ReplySource) -> Self {
        Self {
            text,
            source,
            cacheable: true,
        }
    }

    fn uncached(mut self) -> Self {
        self.cacheable = false;
        self
    }
}

pub struct Resolver {
    knowledge: KnowledgeBase,
    matcher: PatternMatcher,
    fuzzy: FuzzyMatcher,
    arithmetic: ArithmeticEvaluator,
    cache: ResponseCache,
    conversations: ConversationStore,
    limiter: RateLimiter,
    stats: Stats,
    remote: Option<Arc<dyn RemoteResponder>>,
    remote_timeout: Duration,
    history_turns: usize,
    rng: Mutex<StdRng>,
    time_zone: TimeZoneSetting,
    sentiment_enabled: bool,
    mode: String,
}

impl Resolver {
    /// Build a resolver over the built-in knowledge base.
    ///
    /// `remote` is the fallback backend, if any; pass `None` for a purely
    /// local resolver.
    pub fn new(
        config: &ParleyConfig,
        remote: Option<Arc<dyn RemoteResponder>>,
    ) -> Result<Self, ParleyError> {
        Self::with_knowledge(config, KnowledgeBase::builtin(), remote)
    }

    /// Build a resolver, creating the HTTP backend when `[remote]` is enabled
    pub fn from_config(config: &ParleyConfig) -> Result<Self, ParleyError> {
        let remote: Option<Arc<dyn RemoteResponder>> = if config.remote.enabled {
            Some(Arc::new(HttpRemoteResponder::new(config.remote.clone())?))
        } else {
            None
        };
        Self::new(config, remote)
    }

    pub fn with_knowledge(
        config: &ParleyConfig,
        knowledge: KnowledgeBase,
        remote: Option<Arc<dyn RemoteResponder>>,
    ) -> Result<Self, ParleyError> {
        config.validate()?;

        let matcher = PatternMatcher::new(&knowledge, config.matching.short_pattern_len)?;
        let fuzzy = FuzzyMatcher::new(&knowledge, config.matching.effective_fuzzy_threshold());
        let rng = match config.matching.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mode = match &remote {
            Some(_) => format!("Remote ({})", config.remote.model),
            None => "Local".to_string(),
        };

        info!(
            "Resolver ready: {} categories, {} patterns, mode {}",
            knowledge.len(),
            matcher.len(),
            mode
        );

        Ok(Self {
            arithmetic: ArithmeticEvaluator::new()?,
            cache: ResponseCache::from_settings(&config.cache),
            conversations: ConversationStore::from_settings(&config.conversation),
            limiter: RateLimiter::new(config.rate_limit.clone()),
            stats: Stats::new(),
            remote,
            remote_timeout: Duration::from_secs(config.remote.timeout_secs.max(1)),
            history_turns: config.remote.history_turns,
            rng: Mutex::new(rng),
            time_zone: config.clock.time_zone()?,
            sentiment_enabled: config.features.sentiment,
            mode,
            knowledge,
            matcher,
            fuzzy,
        })
    }

    /// Answer one message from `sender`. Never fails.
    pub async fn resolve(&self, message: &str, sender: &str) -> Reply {
        let slot = self.sender_slot(sender);
        let _turn = slot.enter().await;

        self.resolve_turn(message, sender).await
    }

    /// Like [`Resolver::resolve`], but chat commands are answered first
    pub async fn handle(&self, message: &str, sender: &str) -> Reply {
        let Some(command) = Command::parse(message) else {
            return self.resolve(message, sender).await;
        };

        // Commands never create a sender; a known one is still ordered by its gate
        let slot = self.conversations.existing(sender);
        let _turn = match &slot {
            Some(slot) => Some(slot.enter().await),
            None => None,
        };
        debug!("Command {:?} from {}", command, sender);

        let text = match command {
            Command::Start => commands::welcome_text(&self.mode),
            Command::Help => commands::help_text().to_string(),
            Command::Reset => commands::reset_text(self.reset(sender)),
            Command::Stats => commands::stats_text(
                &self.stats_snapshot(),
                self.conversations.len(sender),
                &self.mode,
                &commands::remote_status_text(self.remote.is_some(), self.remote_status()),
            ),
        };

        Reply {
            text,
            sentiment: None,
            source: ReplySource::Command,
        }
    }

    /// Clear a sender's history; returns the turns removed, `None` if the
    /// sender was never seen
    pub fn reset(&self, sender: &str) -> Option<usize> {
        let cleared = self.conversations.reset(sender);
        debug!("Reset {}: {:?}", sender, cleared);
        cleared
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn remote_status(&self) -> LimiterStatus {
        self.limiter.status()
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    fn sender_slot(&self, sender: &str) -> Arc<SenderSlot> {
        let (slot, created) = self.conversations.slot(sender);
        if created {
            self.stats.record_new_user();
            info!("New sender {}", sender);
        }
        slot
    }

    async fn resolve_turn(&self, message: &str, sender: &str) -> Reply {
        let sentiment = self
            .sentiment_enabled
            .then(|| Sentiment::analyze(message));

        // Follow-up phrases depend on the sender's history, so they bypass the cache
        let follow_up = context::is_follow_up(&spelling::normalize(message));
        let cached = if follow_up {
            None
        } else {
            self.cache.get(message)
        };

        let outcome = match cached {
            Some(text) => {
                debug!("Cache hit");
                Outcome::new(text, ReplySource::Cache)
            }
            None => {
                let outcome = self.resolve_uncached(message, sender).await;
                if outcome.cacheable && !follow_up {
                    self.cache.put(message, &outcome.text);
                }
                outcome
            }
        };

        self.conversations
            .record_exchange(sender, message, &outcome.text);
        self.stats.record_reply(outcome.source);
        debug!("Answered from {}", outcome.source.as_str());

        Reply {
            text: outcome.text,
            sentiment,
            source: outcome.source,
        }
    }

    async fn resolve_uncached(&self, message: &str, sender: &str) -> Outcome {
        if let Some(text) = self.arithmetic.evaluate(message) {
            return Outcome::new(text, ReplySource::Arithmetic);
        }

        if let Some(text) = self.ask_remote(message, sender).await {
            return Outcome::new(text, ReplySource::Remote);
        }

        self.resolve_locally(message, sender)
    }

    /// Remote fallback, gated by the limiter. `None` means answer locally.
    async fn ask_remote(&self, message: &str, sender: &str) -> Option<String> {
        let remote = self.remote.as_ref()?;

        match self.limiter.try_acquire() {
            Admission::Allowed => {}
            rejected => {
                debug!("Remote call skipped: {:?}", rejected);
                self.stats.record_rate_limited();
                return None;
            }
        }

        let history = self.conversations.recent(sender, self.history_turns);
        let responder = Arc::clone(remote);
        let owned = message.to_string();
        let call = tokio::task::spawn_blocking(move || responder.respond(&history, &owned));

        let result = match tokio::time::timeout(self.remote_timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(RemoteError::Http(format!(
                "remote task failed: {}",
                join_error
            ))),
            Err(_) => Err(RemoteError::Timeout(self.remote_timeout.as_secs())),
        };

        match result {
            Ok(text) => {
                self.limiter.record_success();
                Some(text)
            }
            Err(e) => {
                warn!("Remote call failed: {}", e);
                self.stats.record_remote_failure();
                let kind = if e.is_quota() {
                    self.stats.record_rate_limited();
                    FailureKind::QuotaExhausted
                } else {
                    FailureKind::Other
                };
                self.limiter.record_failure(kind);
                None
            }
        }
    }

    fn resolve_locally(&self, message: &str, sender: &str) -> Outcome {
        let normalized = spelling::normalize(message);
        let raw_lower = message.to_lowercase();
        let history = self.conversations.history(sender);
        let signals = context::extract(message, &normalized, &history);
        debug!("Context: {:?}", signals);

        if let Some(topic) = signals.recent_topic {
            if context::is_follow_up(&normalized) {
                let category = match topic {
                    Topic::Jokes => Category::Joke,
                    Topic::Facts => Category::Fact,
                };
                if let Some(outcome) = self.pick(category, ReplySource::Context) {
                    return outcome.uncached();
                }
            }
        }

        if let Some(found) = self.matcher.find(&normalized, &raw_lower) {
            debug!("Pattern '{}' -> {}", found.pattern, found.category.as_str());
            if let Some(outcome) = self.pick(found.category, ReplySource::Pattern) {
                return outcome;
            }
        }

        if let Some(found) = self.fuzzy.best_match(&normalized) {
            debug!("Fuzzy {} ({:.2})", found.category.as_str(), found.score);
            if let Some(outcome) = self.pick(found.category, ReplySource::Fuzzy) {
                return outcome;
            }
        }

        self.default_reply(message, signals.is_question)
    }

    /// Random reply from a category, rendered now
    fn pick(&self, category: Category, source: ReplySource) -> Option<Outcome> {
        let responses = self.knowledge.responses(category);
        if responses.is_empty() {
            return None;
        }

        let index = lock(&self.rng).gen_range(0..responses.len());
        let template = &responses[index];
        let outcome = Outcome::new(template.render(&self.now()), source);

        Some(if template.is_dynamic() {
            outcome.uncached()
        } else {
            outcome
        })
    }

    fn default_reply(&self, message: &str, is_question: bool) -> Outcome {
        let templates = if is_question {
            QUESTION_DEFAULTS
        } else {
            GENERIC_DEFAULTS
        };
        let index = lock(&self.rng).gen_range(0..templates.len());
        let text = templates[index].replace("{message}", message.trim());
        Outcome::new(text, ReplySource::Default)
    }

    fn now(&self) -> DateTime<FixedOffset> {
        match self.time_zone {
            TimeZoneSetting::Local => {
                let now = Local::now();
                now.with_timezone(now.offset())
            }
            TimeZoneSetting::Fixed(offset) => Utc::now().with_timezone(&offset),
        }
    }
}
