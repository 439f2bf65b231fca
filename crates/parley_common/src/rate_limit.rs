//! Rate limiter and backoff controller for the remote fallback
//!
//! Sliding-window request counting (per minute, per hour) plus an
//! exponential-backoff circuit breaker that switches the remote backend off
//! after quota errors or repeated failures.
//!
//! States:
//! - Disabled: `disabled_until` in the future, every call rejected
//! - Cooldown: `cooldown_until` in the future, every call rejected
//! - Active: calls admitted while under both window limits

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::{RateLimitSettings, MAX_DURATION_SECS};
use crate::locking::lock;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Configured seconds as a window that is always safe to add to an `Instant`
fn window_secs(secs: u64) -> Duration {
    Duration::from_secs(secs.min(MAX_DURATION_SECS))
}

/// Which sliding window tripped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitWindow {
    Minute,
    Hour,
}

/// Outcome of asking to make a remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Call may proceed; a timestamp was recorded
    Allowed,
    /// Backend switched off after failures
    Disabled { remaining: Duration },
    /// Cooling down after a window limit tripped earlier
    CoolingDown { remaining: Duration },
    /// A window limit tripped on this call; a cooldown just started
    Throttled { window: LimitWindow, cooldown: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }

    pub fn is_rejected(&self) -> bool {
        !self.is_allowed()
    }
}

/// Snapshot of the limiter for status displays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterStatus {
    Active,
    CoolingDown { remaining: Duration },
    Disabled { remaining: Duration },
}

/// How a remote call failed, as far as backoff is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    QuotaExhausted,
    Other,
}

#[derive(Debug)]
struct LimiterState {
    request_timestamps: VecDeque<Instant>,
    cooldown_until: Option<Instant>,
    disabled_until: Option<Instant>,
    consecutive_failures: u32,
    backoff_secs: u64,
}

/// Process-wide limiter for the remote fallback path
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<LimiterState>,
    settings: RateLimitSettings,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            state: Mutex::new(LimiterState {
                request_timestamps: VecDeque::new(),
                cooldown_until: None,
                disabled_until: None,
                consecutive_failures: 0,
                backoff_secs: settings.initial_backoff_secs,
            }),
            settings,
        }
    }

    pub fn try_acquire(&self) -> Admission {
        self.try_acquire_at(Instant::now())
    }

    /// Decide whether a remote call may happen at `now`, recording it if so
    pub fn try_acquire_at(&self, now: Instant) -> Admission {
        if !self.settings.enabled {
            return Admission::Allowed;
        }

        let mut state = lock(&self.state);

        if let Some(until) = state.disabled_until {
            if now < until {
                return Admission::Disabled {
                    remaining: until - now,
                };
            }
            state.disabled_until = None;
            state.consecutive_failures = 0;
            state.backoff_secs = self.settings.initial_backoff_secs;
            info!("Remote backend re-enabled after backoff");
        }

        if let Some(until) = state.cooldown_until {
            if now < until {
                return Admission::CoolingDown {
                    remaining: until - now,
                };
            }
            state.cooldown_until = None;
        }

        state
            .request_timestamps
            .retain(|ts| now.saturating_duration_since(*ts) < HOUR);

        let last_minute = state
            .request_timestamps
            .iter()
            .filter(|ts| now.saturating_duration_since(**ts) < MINUTE)
            .count();

        if last_minute >= self.settings.max_requests_per_minute {
            let cooldown = window_secs(self.settings.minute_cooldown_secs);
            state.cooldown_until = Some(now + cooldown);
            warn!("Per-minute rate limit hit ({} requests)", last_minute);
            return Admission::Throttled {
                window: LimitWindow::Minute,
                cooldown,
            };
        }

        let last_hour = state.request_timestamps.len();
        if last_hour >= self.settings.max_requests_per_hour {
            let cooldown = window_secs(self.settings.hour_cooldown_secs);
            state.cooldown_until = Some(now + cooldown);
            warn!("Per-hour rate limit hit ({} requests)", last_hour);
            return Admission::Throttled {
                window: LimitWindow::Hour,
                cooldown,
            };
        }

        state.request_timestamps.push_back(now);
        Admission::Allowed
    }

    /// A remote call succeeded
    pub fn record_success(&self) {
        lock(&self.state).consecutive_failures = 0;
    }

    pub fn record_failure(&self, kind: FailureKind) -> Option<Duration> {
        self.record_failure_at(kind, Instant::now())
    }

    /// A remote call failed at `now`; returns the disable window if one was set
    pub fn record_failure_at(&self, kind: FailureKind, now: Instant) -> Option<Duration> {
        let mut state = lock(&self.state);
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);

        match kind {
            FailureKind::QuotaExhausted => {
                let factor = 2u64.saturating_pow(state.consecutive_failures - 1);
                let backoff = state
                    .backoff_secs
                    .saturating_mul(factor)
                    .min(self.settings.max_backoff_secs);
                let window = window_secs(backoff);

                state.disabled_until = Some(now + window);
                state.backoff_secs = backoff;
                warn!(
                    "Quota exhausted, remote backend disabled for {}s (attempt {})",
                    backoff, state.consecutive_failures
                );
                Some(window)
            }
            FailureKind::Other if state.consecutive_failures >= self.settings.failure_threshold => {
                let window = window_secs(self.settings.failure_disable_secs);
                state.disabled_until = Some(now + window);
                warn!(
                    "{} consecutive remote failures, disabling for {}s",
                    state.consecutive_failures,
                    window.as_secs()
                );
                Some(window)
            }
            FailureKind::Other => None,
        }
    }

    pub fn status(&self) -> LimiterStatus {
        self.status_at(Instant::now())
    }

    /// Current state without mutating anything
    pub fn status_at(&self, now: Instant) -> LimiterStatus {
        let state = lock(&self.state);

        if let Some(until) = state.disabled_until.filter(|until| now < *until) {
            return LimiterStatus::Disabled {
                remaining: until - now,
            };
        }
        if let Some(until) = state.cooldown_until.filter(|until| now < *until) {
            return LimiterStatus::CoolingDown {
                remaining: until - now,
            };
        }
        LimiterStatus::Active
    }

    pub fn consecutive_failures(&self) -> u32 {
        lock(&self.state).consecutive_failures
    }

    pub fn backoff_secs(&self) -> u64 {
        lock(&self.state).backoff_secs
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_allow_within_limit() {
        let limiter = RateLimiter::default();
        let start = Instant::now();

        for i in 0..10 {
            assert!(limiter.try_acquire_at(start + secs(i)).is_allowed());
        }
    }

    #[test]
    fn test_minute_limit_starts_cooldown() {
        let limiter = RateLimiter::default();
        let start = Instant::now();

        for i in 0..10 {
            assert!(limiter.try_acquire_at(start + secs(i)).is_allowed());
        }

        assert_eq!(
            limiter.try_acquire_at(start + secs(10)),
            Admission::Throttled {
                window: LimitWindow::Minute,
                cooldown: secs(10)
            }
        );
        assert_eq!(
            limiter.try_acquire_at(start + secs(15)),
            Admission::CoolingDown { remaining: secs(5) }
        );
        assert_eq!(
            limiter.status_at(start + secs(15)),
            LimiterStatus::CoolingDown { remaining: secs(5) }
        );
    }

    #[test]
    fn test_accepts_again_after_cooldown_and_window() {
        let limiter = RateLimiter::default();
        let start = Instant::now();

        for i in 0..10 {
            limiter.try_acquire_at(start + secs(i));
        }
        assert!(limiter.try_acquire_at(start + secs(10)).is_rejected());

        // Cooldown over but the minute window is still full
        assert!(limiter.try_acquire_at(start + secs(21)).is_rejected());

        assert!(limiter.try_acquire_at(start + secs(75)).is_allowed());
    }

    #[test]
    fn test_hour_limit() {
        let settings = RateLimitSettings {
            max_requests_per_hour: 5,
            ..RateLimitSettings::default()
        };
        let limiter = RateLimiter::new(settings);
        let start = Instant::now();

        for i in 0..5 {
            assert!(limiter.try_acquire_at(start + secs(i * 120)).is_allowed());
        }
        assert_eq!(
            limiter.try_acquire_at(start + secs(600)),
            Admission::Throttled {
                window: LimitWindow::Hour,
                cooldown: secs(300)
            }
        );

        // The first request ages out of the hour window
        assert!(limiter.try_acquire_at(start + secs(3601)).is_allowed());
    }

    #[test]
    fn test_quota_backoff_grows_exponentially() {
        let limiter = RateLimiter::default();
        let now = Instant::now();

        let first = limiter.record_failure_at(FailureKind::QuotaExhausted, now).unwrap();
        let second = limiter.record_failure_at(FailureKind::QuotaExhausted, now).unwrap();
        let third = limiter.record_failure_at(FailureKind::QuotaExhausted, now).unwrap();

        assert_eq!(first, secs(60));
        assert_eq!(second, secs(120));
        assert_eq!(third, secs(480));
        assert!(third >= first * 4);
        assert_eq!(limiter.backoff_secs(), 480);
    }

    #[test]
    fn test_quota_backoff_capped() {
        let limiter = RateLimiter::default();
        let now = Instant::now();

        let mut last = Duration::ZERO;
        for _ in 0..40 {
            last = limiter.record_failure_at(FailureKind::QuotaExhausted, now).unwrap();
        }
        assert_eq!(last, secs(3600));
    }

    #[test]
    fn test_disabled_then_reenabled() {
        let limiter = RateLimiter::default();
        let now = Instant::now();

        limiter.record_failure_at(FailureKind::QuotaExhausted, now);
        assert_eq!(
            limiter.try_acquire_at(now + secs(30)),
            Admission::Disabled { remaining: secs(30) }
        );

        // Expiry resets failures and backoff
        assert!(limiter.try_acquire_at(now + secs(61)).is_allowed());
        assert_eq!(limiter.consecutive_failures(), 0);
        assert_eq!(limiter.backoff_secs(), 60);
        assert_eq!(limiter.status_at(now + secs(61)), LimiterStatus::Active);
    }

    #[test]
    fn test_repeated_failures_trip_breaker() {
        let limiter = RateLimiter::default();
        let now = Instant::now();

        assert!(limiter.record_failure_at(FailureKind::Other, now).is_none());
        assert!(limiter.record_failure_at(FailureKind::Other, now).is_none());
        assert_eq!(
            limiter.record_failure_at(FailureKind::Other, now),
            Some(secs(120))
        );
        assert_eq!(
            limiter.status_at(now + secs(1)),
            LimiterStatus::Disabled { remaining: secs(119) }
        );
    }

    #[test]
    fn test_success_resets_failures() {
        let limiter = RateLimiter::default();
        let now = Instant::now();

        limiter.record_failure_at(FailureKind::Other, now);
        limiter.record_failure_at(FailureKind::Other, now);
        limiter.record_success();
        assert_eq!(limiter.consecutive_failures(), 0);

        assert!(limiter.record_failure_at(FailureKind::Other, now).is_none());
    }

    #[test]
    fn test_disabled_limiter_always_allows() {
        let settings = RateLimitSettings {
            enabled: false,
            max_requests_per_minute: 1,
            ..RateLimitSettings::default()
        };
        let limiter = RateLimiter::new(settings);
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.try_acquire_at(now).is_allowed());
        }
    }

    #[test]
    fn test_huge_windows_do_not_overflow() {
        let settings = RateLimitSettings {
            max_requests_per_minute: 1,
            minute_cooldown_secs: u64::MAX,
            initial_backoff_secs: u64::MAX,
            max_backoff_secs: u64::MAX,
            failure_disable_secs: u64::MAX,
            failure_threshold: 1,
            ..RateLimitSettings::default()
        };
        let limiter = RateLimiter::new(settings);
        let now = Instant::now();

        assert!(limiter.try_acquire_at(now).is_allowed());
        assert!(limiter.try_acquire_at(now).is_rejected());

        let window = limiter.record_failure_at(FailureKind::QuotaExhausted, now);
        assert_eq!(window, Some(secs(MAX_DURATION_SECS)));
        let window = limiter.record_failure_at(FailureKind::Other, now);
        assert_eq!(window, Some(secs(MAX_DURATION_SECS)));
    }
}

