//! Parley Configuration
//!
//! Engine tuning knobs: cache TTL, history depth, fuzzy threshold, rate
//! limits, remote fallback backend and the clock used for time/date replies.
//!
//! Config file: ~/.config/parley/config.toml or /etc/parley/config.toml
//! Every field has a default, so an empty file is a valid configuration.

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ParleyError;

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV: &str = "PARLEY_CONFIG";

/// Environment variable holding the remote backend API key
pub const API_KEY_ENV: &str = "PARLEY_REMOTE_API_KEY";

/// Upper bound for every duration setting (30 days)
pub const MAX_DURATION_SECS: u64 = 30 * 24 * 3600;

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds a cached reply stays visible
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Maximum cached replies; oldest entries are evicted first
    #[serde(default = "default_cache_entries")]
    pub max_entries: usize,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

fn default_cache_entries() -> usize {
    1024
}

impl CacheSettings {
    pub fn effective_max_entries(&self) -> usize {
        self.max_entries.max(1)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_entries(),
        }
    }
}

/// Conversation history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSettings {
    /// Turns kept per sender (user + assistant each count as one)
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

fn default_max_turns() -> usize {
    10 // 5 exchanges
}

impl ConversationSettings {
    /// At least one full exchange is always kept
    pub fn effective_max_turns(&self) -> usize {
        self.max_turns.max(2)
    }
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

/// Pattern and fuzzy matching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingSettings {
    /// Minimum similarity ratio for a fuzzy match (0.0-1.0)
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,

    /// Patterns up to this many characters must match on word boundaries
    #[serde(default = "default_short_pattern_len")]
    pub short_pattern_len: usize,

    /// Fixed seed for response selection (tests, reproducible demos)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_fuzzy_threshold() -> f64 {
    0.65
}

fn default_short_pattern_len() -> usize {
    5
}

impl MatchingSettings {
    pub fn effective_fuzzy_threshold(&self) -> f64 {
        if self.fuzzy_threshold.is_nan() {
            return default_fuzzy_threshold();
        }
        self.fuzzy_threshold.clamp(0.0, 1.0)
    }
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
            short_pattern_len: default_short_pattern_len(),
            seed: None,
        }
    }
}

/// Rate limiting and backoff for the remote fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_per_minute")]
    pub max_requests_per_minute: usize,

    #[serde(default = "default_per_hour")]
    pub max_requests_per_hour: usize,

    /// Cooldown after the per-minute limit trips
    #[serde(default = "default_minute_cooldown")]
    pub minute_cooldown_secs: u64,

    /// Cooldown after the per-hour limit trips
    #[serde(default = "default_hour_cooldown")]
    pub hour_cooldown_secs: u64,

    /// Disable window after the first quota failure
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_secs: u64,

    /// Hard ceiling on any disable window
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Consecutive non-quota failures before the backend is switched off
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_failure_disable")]
    pub failure_disable_secs: u64,
}

fn default_per_minute() -> usize {
    10
}

fn default_per_hour() -> usize {
    100
}

fn default_minute_cooldown() -> u64 {
    10
}

fn default_hour_cooldown() -> u64 {
    300
}

fn default_initial_backoff() -> u64 {
    60
}

fn default_max_backoff() -> u64 {
    3600
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_failure_disable() -> u64 {
    120
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests_per_minute: default_per_minute(),
            max_requests_per_hour: default_per_hour(),
            minute_cooldown_secs: default_minute_cooldown(),
            hour_cooldown_secs: default_hour_cooldown(),
            initial_backoff_secs: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            failure_threshold: default_failure_threshold(),
            failure_disable_secs: default_failure_disable(),
        }
    }
}

/// Remote fallback backend (OpenAI-compatible or Ollama)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Falls back to $PARLEY_REMOTE_API_KEY when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,

    /// Conversation turns included in the prompt
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,

    #[serde(default = "default_max_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_remote_timeout() -> u64 {
    20
}

fn default_history_turns() -> usize {
    6
}

fn default_max_tokens() -> u32 {
    200
}

fn default_temperature() -> f32 {
    0.8
}

impl RemoteSettings {
    /// API key from config, else from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_remote_timeout(),
            history_turns: default_history_turns(),
            max_output_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Clock used for time/date replies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockSettings {
    /// "local", "utc", or a fixed offset such as "+05:30" / "-0800"
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

fn default_utc_offset() -> String {
    "local".to_string()
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
        }
    }
}

/// Where time/date sentinels take their wall clock from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeZoneSetting {
    Local,
    Fixed(FixedOffset),
}

impl ClockSettings {
    pub fn time_zone(&self) -> Result<TimeZoneSetting, ParleyError> {
        parse_time_zone(&self.utc_offset)
    }
}

/// Parse "local", "utc"/"z", "+HH:MM", "+HHMM" or "+HH"
pub fn parse_time_zone(raw: &str) -> Result<TimeZoneSetting, ParleyError> {
    let value = raw.trim().to_lowercase();
    match value.as_str() {
        "" | "local" => return Ok(TimeZoneSetting::Local),
        "utc" | "z" | "gmt" => {
            return FixedOffset::east_opt(0)
                .map(TimeZoneSetting::Fixed)
                .ok_or_else(|| ParleyError::Config("invalid UTC offset".to_string()))
        }
        _ => {}
    }

    let invalid = || ParleyError::Config(format!("invalid utc_offset '{}'", raw));

    let (sign, rest) = match value.chars().next() {
        Some('+') => (1, &value[1..]),
        Some('-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
        4 => (
            digits[..2].parse::<i32>().map_err(|_| invalid())?,
            digits[2..].parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };

    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .map(TimeZoneSetting::Fixed)
        .ok_or_else(invalid)
}

/// Feature toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSettings {
    #[serde(default = "default_true")]
    pub sentiment: bool,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self { sentiment: true }
    }
}

/// Main Parley configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub conversation: ConversationSettings,

    #[serde(default)]
    pub matching: MatchingSettings,

    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub clock: ClockSettings,

    #[serde(default)]
    pub features: FeatureSettings,
}

impl ParleyConfig {
    /// Get default user config path: ~/.config/parley/config.toml
    pub fn user_config_path() -> Result<PathBuf> {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg).join("parley").join("config.toml"));
        }

        let home = std::env::var("HOME").context("Cannot determine home directory")?;
        Ok(Path::new(&home)
            .join(".config")
            .join("parley")
            .join("config.toml"))
    }

    /// Get system config path: /etc/parley/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/parley/config.toml")
    }

    /// Load configuration
    ///
    /// Priority:
    /// 1. Explicit path (CLI flag)
    /// 2. $PARLEY_CONFIG
    /// 3. User config (~/.config/parley/config.toml)
    /// 4. System config (/etc/parley/config.toml)
    /// 5. Defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load_from(Path::new(&path));
        }

        if let Ok(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::load_from(&user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Self::load_from(&system_path);
        }

        Ok(Self::default())
    }

    /// Load and validate a single file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ParleyConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Reject values that cannot be clamped into something sensible
    pub fn validate(&self) -> Result<(), ParleyError> {
        self.clock.time_zone()?;

        if self.remote.enabled && self.remote.endpoint.trim().is_empty() {
            return Err(ParleyError::Config(
                "remote.enabled is set but remote.endpoint is empty".to_string(),
            ));
        }

        let durations = [
            ("cache.ttl_secs", self.cache.ttl_secs),
            ("rate_limit.minute_cooldown_secs", self.rate_limit.minute_cooldown_secs),
            ("rate_limit.hour_cooldown_secs", self.rate_limit.hour_cooldown_secs),
            ("rate_limit.initial_backoff_secs", self.rate_limit.initial_backoff_secs),
            ("rate_limit.max_backoff_secs", self.rate_limit.max_backoff_secs),
            ("rate_limit.failure_disable_secs", self.rate_limit.failure_disable_secs),
            ("remote.timeout_secs", self.remote.timeout_secs),
        ];
        for (name, secs) in durations {
            if secs > MAX_DURATION_SECS {
                return Err(ParleyError::Config(format!(
                    "{} is {}s, the maximum is {}s",
                    name, secs, MAX_DURATION_SECS
                )));
            }
        }

        if self.rate_limit.max_backoff_secs < self.rate_limit.initial_backoff_secs {
            return Err(ParleyError::Config(
                "rate_limit.max_backoff_secs is smaller than initial_backoff_secs".to_string(),
            ));
        }

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ParleyConfig::default();
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.conversation.max_turns, 10);
        assert_eq!(config.matching.fuzzy_threshold, 0.65);
        assert_eq!(config.matching.short_pattern_len, 5);
        assert_eq!(config.rate_limit.max_requests_per_minute, 10);
        assert_eq!(config.rate_limit.max_requests_per_hour, 100);
        assert_eq!(config.rate_limit.max_backoff_secs, 3600);
        assert!(!config.remote.enabled);
        assert!(config.features.sentiment);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: ParleyConfig = toml::from_str("").unwrap();
        assert_eq!(config.cache.max_entries, 1024);
        assert_eq!(config.remote.history_turns, 6);
    }

    #[test]
    fn test_partial_section() {
        let config: ParleyConfig = toml::from_str(
            r#"
            [cache]
            ttl_secs = 60

            [matching]
            seed = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.ttl_secs, 60);
        assert!(config.cache.enabled);
        assert_eq!(config.matching.seed, Some(7));
        assert_eq!(config.matching.fuzzy_threshold, 0.65);
    }

    #[test]
    fn test_effective_values_clamped() {
        let mut config = ParleyConfig::default();
        config.matching.fuzzy_threshold = 3.0;
        config.conversation.max_turns = 0;
        config.cache.max_entries = 0;

        assert_eq!(config.matching.effective_fuzzy_threshold(), 1.0);
        assert_eq!(config.conversation.effective_max_turns(), 2);
        assert_eq!(config.cache.effective_max_entries(), 1);
    }

    #[test]
    fn test_validate_rejects_huge_durations() {
        let config: ParleyConfig = toml::from_str(
            r#"
            [cache]
            ttl_secs = 9223372036854775807
            "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cache.ttl_secs"));

        let mut config = ParleyConfig::default();
        config.rate_limit.failure_disable_secs = MAX_DURATION_SECS + 1;
        assert!(config.validate().is_err());

        config.rate_limit.failure_disable_secs = MAX_DURATION_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_time_zone() {
        assert_eq!(parse_time_zone("local").unwrap(), TimeZoneSetting::Local);
        assert_eq!(
            parse_time_zone("UTC").unwrap(),
            TimeZoneSetting::Fixed(FixedOffset::east_opt(0).unwrap())
        );
        assert_eq!(
            parse_time_zone("+05:30").unwrap(),
            TimeZoneSetting::Fixed(FixedOffset::east_opt(5 * 3600 + 1800).unwrap())
        );
        assert_eq!(
            parse_time_zone("-0800").unwrap(),
            TimeZoneSetting::Fixed(FixedOffset::west_opt(8 * 3600).unwrap())
        );
        assert_eq!(
            parse_time_zone("+1").unwrap(),
            TimeZoneSetting::Fixed(FixedOffset::east_opt(3600).unwrap())
        );
        assert!(parse_time_zone("+25:00").is_err());
        assert!(parse_time_zone("tokyo").is_err());
        assert!(parse_time_zone("+5:3").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[clock]\nutc_offset = \"+01:00\"\n[conversation]\nmax_turns = 4").unwrap();

        let config = ParleyConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.conversation.max_turns, 4);
        assert_eq!(config.clock.utc_offset, "+01:00");
    }

    #[test]
    fn test_load_rejects_bad_offset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[clock]\nutc_offset = \"somewhere\"").unwrap();

        let err = ParleyConfig::load(Some(file.path())).unwrap_err();
        assert!(format!("{:#}", err).contains("utc_offset"));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut original = ParleyConfig::default();
        original.remote.enabled = true;
        original.matching.seed = Some(42);

        let toml = original.to_toml().unwrap();
        assert!(toml.contains("[rate_limit]"));

        let parsed: ParleyConfig = toml::from_str(&toml).unwrap();
        assert!(parsed.remote.enabled);
        assert_eq!(parsed.matching.seed, Some(42));
    }
}
