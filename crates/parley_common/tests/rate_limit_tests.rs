//! Sliding-window limiter and quota backoff, driven with explicit instants.

use std::time::{Duration, Instant};

use parley_common::config::RateLimitSettings;
use parley_common::rate_limit::{Admission, FailureKind, LimitWindow, LimiterStatus, RateLimiter};

fn at(start: Instant, secs: u64) -> Instant {
    start + Duration::from_secs(secs)
}

#[test]
fn test_eleventh_call_in_a_minute_rejected() {
    let limiter = RateLimiter::new(RateLimitSettings::default());
    let start = Instant::now();

    for i in 0..10 {
        assert_eq!(limiter.try_acquire_at(at(start, i * 5)), Admission::Allowed);
    }
    assert!(matches!(
        limiter.try_acquire_at(at(start, 50)),
        Admission::Throttled {
            window: LimitWindow::Minute,
            ..
        }
    ));

    // Cooldown is over and the oldest requests have left the window
    assert_eq!(limiter.try_acquire_at(at(start, 70)), Admission::Allowed);
}

#[test]
fn test_third_quota_failure_at_least_four_times_first() {
    let limiter = RateLimiter::new(RateLimitSettings::default());
    let now = Instant::now();

    let windows: Vec<Duration> = (0..3)
        .map(|_| {
            limiter
                .record_failure_at(FailureKind::QuotaExhausted, now)
                .unwrap()
        })
        .collect();

    assert!(windows[2] >= windows[0] * 4);
    assert!(windows.iter().all(|w| *w <= Duration::from_secs(3600)));
}

#[test]
fn test_backoff_respects_custom_cap() {
    let settings = RateLimitSettings {
        initial_backoff_secs: 30,
        max_backoff_secs: 100,
        ..RateLimitSettings::default()
    };
    let limiter = RateLimiter::new(settings);
    let now = Instant::now();

    limiter.record_failure_at(FailureKind::QuotaExhausted, now);
    limiter.record_failure_at(FailureKind::QuotaExhausted, now);
    let third = limiter
        .record_failure_at(FailureKind::QuotaExhausted, now)
        .unwrap();

    assert_eq!(third, Duration::from_secs(100));
    assert_eq!(
        limiter.status_at(at(now, 40)),
        LimiterStatus::Disabled {
            remaining: Duration::from_secs(60)
        }
    );
}

#[test]
fn test_disabled_rejects_until_expiry() {
    let limiter = RateLimiter::new(RateLimitSettings::default());
    let now = Instant::now();

    limiter.record_failure_at(FailureKind::QuotaExhausted, now);
    for secs in [0, 10, 59] {
        assert!(limiter.try_acquire_at(at(now, secs)).is_rejected());
    }
    assert!(limiter.try_acquire_at(at(now, 60)).is_allowed());
}
