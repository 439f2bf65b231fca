//! Remote fallback behaviour: limiter gating, backoff and local degradation.

use std::sync::Arc;
use std::time::Duration;

use parley_common::rate_limit::LimiterStatus;
use parley_common::{FakeRemote, ParleyConfig, RemoteError, RemoteResponder, ReplySource, Resolver};

fn config() -> ParleyConfig {
    let mut config = ParleyConfig::default();
    config.matching.seed = Some(11);
    config.clock.utc_offset = "utc".to_string();
    config.cache.enabled = false;
    config
}

fn resolver_with(fake: &Arc<FakeRemote>, config: &ParleyConfig) -> Resolver {
    let remote: Arc<dyn RemoteResponder> = fake.clone();
    Resolver::new(config, Some(remote)).unwrap()
}

#[tokio::test]
async fn test_remote_reply_used_and_cached() {
    let mut config = config();
    config.cache.enabled = true;
    let fake = Arc::new(FakeRemote::always_ok("Paris is lovely in spring 🌸"));
    let resolver = resolver_with(&fake, &config);

    let first = resolver.resolve("tell me about paris", "a").await;
    assert_eq!(first.source, ReplySource::Remote);
    assert_eq!(first.text, "Paris is lovely in spring 🌸");

    let second = resolver.resolve("tell me about paris", "b").await;
    assert_eq!(second.source, ReplySource::Cache);
    assert_eq!(fake.call_count(), 1);
    assert_eq!(resolver.stats_snapshot().remote_replies, 1);
}

#[tokio::test]
async fn test_failure_falls_back_to_local_match() {
    let fake = Arc::new(FakeRemote::always_error(RemoteError::Http(
        "HTTP 500".to_string(),
    )));
    let resolver = resolver_with(&fake, &config());

    let reply = resolver.resolve("capital of canada", "a").await;
    assert!(reply.text.contains("Ottawa"));
    assert_eq!(reply.source, ReplySource::Pattern);
    assert_eq!(resolver.stats_snapshot().remote_failures, 1);
    assert_eq!(resolver.remote_status(), LimiterStatus::Active);
}

#[tokio::test]
async fn test_quota_exhaustion_disables_backend() {
    let fake = Arc::new(FakeRemote::always_error(RemoteError::QuotaExhausted(
        "HTTP 429".to_string(),
    )));
    let resolver = resolver_with(&fake, &config());

    resolver.resolve("hello", "a").await;
    assert!(matches!(
        resolver.remote_status(),
        LimiterStatus::Disabled { remaining } if remaining <= Duration::from_secs(60)
    ));

    // Disabled backend is not called again
    let reply = resolver.resolve("tell me a joke", "a").await;
    assert_eq!(reply.source, ReplySource::Pattern);
    assert_eq!(fake.call_count(), 1);

    // One quota failure plus one refused turn
    assert_eq!(resolver.stats_snapshot().rate_limited, 2);
}

#[tokio::test]
async fn test_repeated_failures_trip_breaker() {
    let fake = Arc::new(FakeRemote::always_error(RemoteError::EmptyResponse));
    let resolver = resolver_with(&fake, &config());

    for i in 0..5 {
        resolver.resolve(&format!("message number {}", i), "a").await;
    }

    // Threshold is 3 consecutive failures
    assert_eq!(fake.call_count(), 3);
    assert!(matches!(
        resolver.remote_status(),
        LimiterStatus::Disabled { .. }
    ));
}

#[tokio::test]
async fn test_minute_window_limits_remote_calls() {
    let fake = Arc::new(FakeRemote::always_ok("remote"));
    let resolver = resolver_with(&fake, &config());

    for i in 0..12 {
        resolver.resolve(&format!("question {}", i), "a").await;
    }

    assert_eq!(fake.call_count(), 10);
    assert!(matches!(
        resolver.remote_status(),
        LimiterStatus::CoolingDown { .. }
    ));
    let stats = resolver.stats_snapshot();
    assert_eq!(stats.remote_replies, 10);
    assert_eq!(stats.rate_limited, 2);
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let mut config = config();
    config.remote.timeout_secs = 1;
    let fake = Arc::new(FakeRemote::always_ok("too late").with_delay(Duration::from_secs(3)));
    let resolver = resolver_with(&fake, &config);

    let reply = resolver.resolve("hello", "a").await;
    assert_ne!(reply.source, ReplySource::Remote);
    assert_eq!(resolver.stats_snapshot().remote_failures, 1);
}

#[tokio::test]
async fn test_arithmetic_never_reaches_backend() {
    let fake = Arc::new(FakeRemote::always_ok("remote"));
    let resolver = resolver_with(&fake, &config());

    let reply = resolver.resolve("(2 + 3) * 4", "a").await;
    assert_eq!(reply.text, "🔢 (2 + 3) * 4 = 20");
    assert_eq!(fake.call_count(), 0);
}

#[tokio::test]
async fn test_stats_command_shows_remote_mode() {
    let fake = Arc::new(FakeRemote::always_ok("remote"));
    let resolver = resolver_with(&fake, &config());

    let reply = resolver.handle("/stats", "a").await;
    assert!(reply.text.contains("Mode: Remote (llama3.2:3b)"));
    assert!(reply.text.contains("API Status: ✅ Active"));
}
