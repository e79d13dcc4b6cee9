use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Fixed-interval polling budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready { value: T, attempts: u32 },
    Exhausted { attempts: u32 },
}

/// Run `probe` until it yields a value or the attempt budget is spent.
///
/// Attempts are numbered from 1. The interval is slept between attempts only,
/// so a probe that succeeds first time returns without waiting.
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, mut probe: F) -> PollOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 1..=policy.max_attempts {
        if let Some(value) = probe(attempt).await {
            return PollOutcome::Ready {
                value,
                attempts: attempt,
            };
        }

        if attempt < policy.max_attempts {
            sleep(policy.interval).await;
        }
    }

    PollOutcome::Exhausted {
        attempts: policy.max_attempts,
    }
}
