// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding-window rate limiter with a consecutive-failure circuit breaker.
//!
//! Volume is throttled: when the window is full, [`RateLimiter::reserve_slot`]
//! waits until the oldest call leaves it. Failure is rejected: while the
//! circuit is open every reservation returns [`SlotDecision::Blocked`] until
//! the cooldown has elapsed.

use std::collections::VecDeque;
use std::time::Duration;

use kara_config::model::RateLimitConfig;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Tuning for a [`RateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterSettings {
    pub max_calls: usize,
    pub window: Duration,
    pub cooldown: Duration,
    pub failure_threshold: u32,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

impl From<&RateLimitConfig> for LimiterSettings {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            max_calls: config.max_calls_per_minute.max(1) as usize,
            window: Duration::from_secs(config.window_secs.max(1)),
            cooldown: Duration::from_secs(config.cooldown_secs),
            failure_threshold: config.failure_threshold.max(1),
        }
    }
}

/// Outcome of a slot reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotDecision {
    /// The call may proceed now.
    Admitted,
    /// The circuit is open; do not call before `retry_after` has passed.
    Blocked { retry_after: Duration },
}

/// Point-in-time view of the limiter, for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterSnapshot {
    pub calls_in_window: usize,
    pub circuit_open: bool,
    pub consecutive_errors: u32,
}

#[derive(Debug, Default)]
struct LimiterState {
    /// Completed call instants, oldest first, pruned to the window.
    calls: VecDeque<Instant>,
    circuit_open: bool,
    opened_at: Option<Instant>,
    consecutive_errors: u32,
}

impl LimiterState {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.calls.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    fn open(&mut self, now: Instant) {
        self.circuit_open = true;
        self.opened_at = Some(now);
    }
}

/// Process-local guard in front of the LLM provider.
#[derive(Debug)]
pub struct RateLimiter {
    settings: LimiterSettings,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(settings: LimiterSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(LimiterState::default()),
        }
    }

    pub fn settings(&self) -> LimiterSettings {
        self.settings
    }

    /// Asks permission for one outbound call.
    ///
    /// Closes the circuit (and clears the error counter) once the cooldown
    /// has elapsed. When the window is at capacity, sleeps until a slot
    /// frees up instead of rejecting.
    pub async fn reserve_slot(&self) -> SlotDecision {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();

                if state.circuit_open {
                    let opened_at = state.opened_at.unwrap_or(now);
                    let reopen_at = opened_at + self.settings.cooldown;
                    if now < reopen_at {
                        return SlotDecision::Blocked {
                            retry_after: reopen_at - now,
                        };
                    }
                    state.circuit_open = false;
                    state.opened_at = None;
                    state.consecutive_errors = 0;
                    info!("circuit closed after cooldown");
                }

                state.prune(now, self.settings.window);
                if state.calls.len() < self.settings.max_calls {
                    return SlotDecision::Admitted;
                }

                match state.calls.front() {
                    Some(&oldest) => (oldest + self.settings.window).saturating_duration_since(now),
                    None => return SlotDecision::Admitted,
                }
            };

            debug!(wait_ms = wait.as_millis() as u64, "rate window full, throttling");
            tokio::time::sleep(wait).await;
        }
    }

    /// Records a successful call and resets the error counter.
    pub async fn record_success(&self) {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        state.calls.push_back(now);
        state.prune(now, self.settings.window);
        state.consecutive_errors = 0;
    }

    /// Records a failed call.
    ///
    /// A provider rate-limit response opens the circuit at once; otherwise
    /// it opens when the consecutive-error counter reaches the threshold.
    pub async fn record_failure(&self, is_rate_limited: bool) {
        let mut state = self.state.lock().await;
        state.consecutive_errors = state.consecutive_errors.saturating_add(1);
        let tripped = is_rate_limited || state.consecutive_errors >= self.settings.failure_threshold;
        if tripped && !state.circuit_open {
            state.open(Instant::now());
            warn!(
                consecutive_errors = state.consecutive_errors,
                is_rate_limited,
                cooldown_secs = self.settings.cooldown.as_secs(),
                "circuit opened"
            );
        }
    }

    pub async fn snapshot(&self) -> LimiterSnapshot {
        let mut state = self.state.lock().await;
        state.prune(Instant::now(), self.settings.window);
        LimiterSnapshot {
            calls_in_window: state.calls.len(),
            circuit_open: state.circuit_open,
            consecutive_errors: state.consecutive_errors,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(LimiterSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_calls: usize) -> RateLimiter {
        RateLimiter::new(LimiterSettings {
            max_calls,
            window: Duration::from_secs(60),
            cooldown: Duration::from_secs(120),
            failure_threshold: 3,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn admits_while_under_cap() {
        let limiter = limiter(3);
        for _ in 0..3 {
            assert_eq!(limiter.reserve_slot().await, SlotDecision::Admitted);
            limiter.record_success().await;
        }
        assert_eq!(limiter.snapshot().await.calls_in_window, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn full_window_throttles_instead_of_rejecting() {
        let limiter = limiter(2);
        limiter.record_success().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        limiter.record_success().await;

        let start = Instant::now();
        assert_eq!(limiter.reserve_slot().await, SlotDecision::Admitted);
        let waited = start.elapsed();
        assert!(
            waited >= Duration::from_secs(50) && waited < Duration::from_secs(51),
            "waited {waited:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn provider_rate_limit_opens_circuit_immediately() {
        let limiter = limiter(10);
        limiter.record_failure(true).await;

        let snapshot = limiter.snapshot().await;
        assert!(snapshot.circuit_open);
        assert_eq!(snapshot.consecutive_errors, 1);
        assert_eq!(
            limiter.reserve_slot().await,
            SlotDecision::Blocked {
                retry_after: Duration::from_secs(120)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn threshold_of_plain_failures_opens_circuit() {
        let limiter = limiter(10);
        limiter.record_failure(false).await;
        limiter.record_failure(false).await;
        assert!(!limiter.snapshot().await.circuit_open);
        limiter.record_failure(false).await;
        assert!(limiter.snapshot().await.circuit_open);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_error_counter() {
        let limiter = limiter(10);
        limiter.record_failure(false).await;
        limiter.record_failure(false).await;
        limiter.record_success().await;
        limiter.record_failure(false).await;

        let snapshot = limiter.snapshot().await;
        assert_eq!(snapshot.consecutive_errors, 1);
        assert!(!snapshot.circuit_open);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_admitted_before_cooldown_elapses() {
        let limiter = limiter(10);
        limiter.record_failure(true).await;

        tokio::time::advance(Duration::from_secs(119)).await;
        match limiter.reserve_slot().await {
            SlotDecision::Blocked { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(1));
            }
            SlotDecision::Admitted => panic!("admitted before cooldown"),
        }

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(limiter.reserve_slot().await, SlotDecision::Admitted);
        let snapshot = limiter.snapshot().await;
        assert!(!snapshot.circuit_open);
        assert_eq!(snapshot.consecutive_errors, 0);

        limiter.record_success().await;
        assert_eq!(limiter.snapshot().await.consecutive_errors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_while_open_do_not_extend_cooldown() {
        let limiter = limiter(10);
        limiter.record_failure(true).await;
        tokio::time::advance(Duration::from_secs(60)).await;
        limiter.record_failure(true).await;
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(limiter.reserve_slot().await, SlotDecision::Admitted);
    }

    #[test]
    fn settings_follow_config() {
        let config = RateLimitConfig {
            max_calls_per_minute: 12,
            window_secs: 30,
            cooldown_secs: 45,
            failure_threshold: 4,
        };
        let settings = LimiterSettings::from(&config);
        assert_eq!(settings.max_calls, 12);
        assert_eq!(settings.window, Duration::from_secs(30));
        assert_eq!(settings.cooldown, Duration::from_secs(45));
        assert_eq!(settings.failure_threshold, 4);
    }
}
