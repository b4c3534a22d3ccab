//! Settle delays and polling waits.
//!
//! The automation service has no "wait until the UI is idle" primitive, so
//! state-mutating actions are followed by a fixed settle delay from
//! [`SettlePolicy`]. Where a step can name the condition it is waiting for,
//! [`poll_until`] re-checks it on an interval until a deadline instead.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

/// Default interval between polls in [`poll_until`] callers.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Settle delays inserted after state-mutating actions.
///
/// Serialized as whole milliseconds. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlePolicy {
    /// After clearing a text field.
    #[serde(with = "duration_ms")]
    pub after_clear: Duration,
    /// After sending keys.
    #[serde(with = "duration_ms")]
    pub after_type: Duration,
    /// After a click that may raise an alert.
    #[serde(with = "duration_ms")]
    pub after_click: Duration,
    /// After an alert button was clicked.
    #[serde(with = "duration_ms")]
    pub after_dismiss: Duration,
    /// After any other UI update (toggle, dismissal sequence, option pick).
    #[serde(with = "duration_ms")]
    pub after_update: Duration,
    /// After a swipe or scroll gesture.
    #[serde(with = "duration_ms")]
    pub after_swipe: Duration,
    /// After the nudge scroll that precedes a lookup retry.
    #[serde(with = "duration_ms")]
    pub after_scroll_retry: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            after_clear: Duration::from_millis(1000),
            after_type: Duration::from_millis(1000),
            after_click: Duration::from_millis(2000),
            after_dismiss: Duration::from_millis(500),
            after_update: Duration::from_millis(1000),
            after_swipe: Duration::from_millis(1000),
            after_scroll_retry: Duration::from_millis(500),
        }
    }
}

impl SettlePolicy {
    /// A policy with every delay set to zero.
    pub fn immediate() -> Self {
        Self {
            after_clear: Duration::ZERO,
            after_type: Duration::ZERO,
            after_click: Duration::ZERO,
            after_dismiss: Duration::ZERO,
            after_update: Duration::ZERO,
            after_swipe: Duration::ZERO,
            after_scroll_retry: Duration::ZERO,
        }
    }
}

/// Sleeps for `delay`, skipping the timer entirely for zero.
pub async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Returned by [`poll_until`] when the deadline passes first.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("condition not met after {}ms", .elapsed.as_millis())]
pub struct WaitTimeout {
    pub elapsed: Duration,
}

/// Polls `probe` until it yields `Some`, or until `timeout` has elapsed.
///
/// A probe still running at the deadline is dropped, so the wait never
/// outlasts `timeout` however slow a single probe is. The probe is always
/// polled at least once, even with a zero timeout.
pub async fn poll_until<T, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<T, WaitTimeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let start = Instant::now();
    loop {
        let remaining = timeout.saturating_sub(start.elapsed());
        match tokio::time::timeout(remaining, probe()).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(_) => return Err(WaitTimeout { elapsed: start.elapsed() }),
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(WaitTimeout { elapsed });
        }
        tokio::time::sleep(interval.min(timeout - elapsed)).await;
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
