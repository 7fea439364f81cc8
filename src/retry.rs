//! Bounded confirm-by-polling.
//!
//! Devices apply some writes asynchronously, so a successful mutating
//! request only means the portal accepted it. Confirmation is a
//! re-check loop: repeat an async probe until it reports the target
//! condition, bounded by a finite attempt count and a delay policy,
//! and cancellable at any point. The attempt bound is deliberate; an
//! unbounded loop hangs forever against a persistently failing device.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Delay schedule and attempt bound for a confirmation loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total probe invocations allowed. Must be finite and non-zero.
    pub max_attempts: u32,
    /// Delay before the second and later attempts. With `backoff` the
    /// actual delay is `base_delay * 2^(attempt - 1)`, capped.
    pub base_delay: Duration,
    /// Hard cap on the computed delay.
    pub max_delay: Duration,
    /// Exponential backoff when true, fixed delay when false.
    pub backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff: true,
        }
    }
}

impl RetryPolicy {
    /// Fixed delay between every attempt.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            backoff: false,
        }
    }

    /// Delay to sleep before the given attempt (1-indexed; attempt 1
    /// runs immediately).
    fn delay_before_attempt(&self, attempt: u32) -> Duration {
        if !self.backoff {
            return self.base_delay.min(self.max_delay);
        }
        // Checked shift so large attempt numbers saturate instead of
        // overflowing.
        let exponent = attempt.saturating_sub(1);
        let multiplier = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// What a single probe observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The device reports the target condition; stop.
    Confirmed,
    /// Not there yet; try again if the budget allows.
    Pending,
}

/// An async check repeated by [`confirm`] until it reports
/// [`ProbeOutcome::Confirmed`].
#[allow(async_fn_in_trait)]
pub trait ConfirmProbe {
    async fn probe(&mut self, attempt: u32) -> ProbeOutcome;
}

/// Outcome when a confirmation loop does not confirm.
///
/// Distinct from a failed write and from a failed connect so callers
/// can tell the three apart.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmError {
    #[error("confirmation timed out after {attempts} attempts")]
    TimedOut { attempts: u32 },

    #[error("confirmation cancelled")]
    Cancelled,
}

/// Drive `probe` until it confirms, the policy's attempt budget runs
/// out, or `cancel` fires.
///
/// The probe is invoked at most `policy.max_attempts` times, exactly
/// that many when nothing confirms. Returns the 1-indexed attempt that
/// confirmed.
pub async fn confirm<P: ConfirmProbe>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    probe: &mut P,
) -> Result<u32, ConfirmError> {
    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            return Err(ConfirmError::Cancelled);
        }

        if attempt > 1 {
            let delay = policy.delay_before_attempt(attempt);
            tokio::select! {
                _ = cancel.cancelled() => return Err(ConfirmError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        match probe.probe(attempt).await {
            ProbeOutcome::Confirmed => return Ok(attempt),
            ProbeOutcome::Pending => {
                warn!(attempt, max = policy.max_attempts, "confirmation pending, will retry");
            }
        }
    }

    Err(ConfirmError::TimedOut {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingProbe {
        calls: u32,
        confirm_on: Option<u32>,
    }

    impl CountingProbe {
        fn never() -> Self {
            Self { calls: 0, confirm_on: None }
        }

        fn on(attempt: u32) -> Self {
            Self { calls: 0, confirm_on: Some(attempt) }
        }
    }

    impl ConfirmProbe for CountingProbe {
        async fn probe(&mut self, attempt: u32) -> ProbeOutcome {
            self.calls += 1;
            if self.confirm_on == Some(attempt) {
                ProbeOutcome::Confirmed
            } else {
                ProbeOutcome::Pending
            }
        }
    }

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::fixed(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn fixed_policy_ignores_the_attempt_number() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(100));
        assert_eq!(policy.delay_before_attempt(2), Duration::from_millis(100));
        assert_eq!(policy.delay_before_attempt(9), Duration::from_millis(100));
    }

    #[test]
    fn backoff_doubles_and_respects_the_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            backoff: true,
        };
        assert_eq!(policy.delay_before_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_before_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.delay_before_attempt(4), Duration::from_millis(800));
        // 100ms * 2^4 = 1600ms, capped to 1s
        assert_eq!(policy.delay_before_attempt(5), Duration::from_secs(1));
        // Huge attempt numbers saturate rather than overflow
        assert_eq!(policy.delay_before_attempt(64), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn confirms_on_first_attempt_without_sleeping() {
        let mut probe = CountingProbe::on(1);
        let result = confirm(&quick_policy(3), &CancellationToken::new(), &mut probe).await;
        assert_eq!(result, Ok(1));
        assert_eq!(probe.calls, 1);
    }

    #[tokio::test]
    async fn exhausts_exactly_max_attempts_then_times_out() {
        let mut probe = CountingProbe::never();
        let result = confirm(&quick_policy(3), &CancellationToken::new(), &mut probe).await;
        assert_eq!(result, Err(ConfirmError::TimedOut { attempts: 3 }));
        assert_eq!(probe.calls, 3);
    }

    #[tokio::test]
    async fn confirms_midway_and_stops_probing() {
        let mut probe = CountingProbe::on(2);
        let result = confirm(&quick_policy(5), &CancellationToken::new(), &mut probe).await;
        assert_eq!(result, Ok(2));
        assert_eq!(probe.calls, 2);
    }

    #[tokio::test]
    async fn pre_cancelled_token_skips_all_probes() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut probe = CountingProbe::on(1);
        let result = confirm(&quick_policy(3), &cancel, &mut probe).await;
        assert_eq!(result, Err(ConfirmError::Cancelled));
        assert_eq!(probe.calls, 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_backoff_sleep() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let mut probe = CountingProbe::never();
        let result = confirm(&policy, &cancel, &mut probe).await;
        assert_eq!(result, Err(ConfirmError::Cancelled));
        // First attempt ran, the minute-long sleep before the second
        // was interrupted.
        assert_eq!(probe.calls, 1);
    }
}
