//! Parley Common - the response resolution engine
//!
//! Answers free-text chat messages locally: spelling normalization,
//! arithmetic, longest-first keyword matching, fuzzy matching and
//! conversation context, with an optional rate-limited remote fallback.

pub mod arithmetic;
pub mod cache;
pub mod commands;
pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod fuzzy;
pub mod knowledge;
mod locking;
pub mod matcher;
pub mod rate_limit;
pub mod remote;
pub mod resolver;
pub mod sentiment;
pub mod spelling;
pub mod stats;

pub use config::ParleyConfig;
pub use error::{ParleyError, RemoteError};
pub use knowledge::{Category, Country, KnowledgeBase, ResponseTemplate};
pub use remote::{FakeRemote, HttpRemoteResponder, RemoteResponder};
pub use resolver::{Reply, Resolver};
pub use sentiment::Sentiment;
pub use stats::{ReplySource, StatsSnapshot};
