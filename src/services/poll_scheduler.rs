//! Client-side poll scheduling
//!
//! A consumer of the snapshot read asks again once the server says the next
//! refresh is due, plus a random jitter so many clients do not hit the server
//! in the same second. At most one poll is pending; scheduling a new one
//! aborts the previous timer.

use parking_lot::Mutex;
use rand::{Rng, rng};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Upper bound of the random delay added to the server hint
    pub max_jitter: Duration,
    /// Floor for any hint-driven delay, so a stale or negative hint never busy-loops
    pub min_delay: Duration,
    /// Delay after a failed request; no jitter
    pub retry_delay: Duration,
    /// Delay when the response carried no usable hint
    pub missing_hint_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_jitter: Duration::from_secs(10),
            min_delay: Duration::from_secs(5),
            retry_delay: Duration::from_secs(30),
            missing_hint_delay: Duration::from_secs(60),
        }
    }
}

impl PollPolicy {
    /// `hint + jitter`, never below `min_delay`. Negative hints count as zero.
    pub fn delay_for_hint(&self, hint_ms: i64, jitter: Duration) -> Duration {
        let hint = u64::try_from(hint_ms)
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO);

        (hint + jitter).max(self.min_delay)
    }

    pub fn random_jitter(&self) -> Duration {
        let max_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng().random_range(0..=max_ms))
    }
}

struct PendingPoll {
    id: u64,
    fire_at: Instant,
    handle: AbortHandle,
}

#[derive(Default)]
struct SchedulerState {
    next_id: u64,
    pending: Option<PendingPoll>,
}

pub struct PollScheduler {
    policy: PollPolicy,
    state: Arc<Mutex<SchedulerState>>,
}

impl PollScheduler {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            state: Arc::new(Mutex::new(SchedulerState::default())),
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Run `task` after `delay`, replacing any pending poll. Returns the
    /// instant the new poll fires at.
    ///
    /// The pending slot is cleared right before `task` runs, so `task` may
    /// itself schedule the next poll.
    pub fn schedule<F, Fut>(&self, delay: Duration, task: F) -> Instant
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.state.lock();

        if let Some(previous) = state.pending.take() {
            previous.handle.abort();
        }

        let id = state.next_id;
        state.next_id += 1;

        let fire_at = Instant::now() + delay;
        let shared = Arc::clone(&self.state);

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(fire_at).await;

            {
                let mut state = shared.lock();
                if state.pending.as_ref().map(|pending| pending.id) != Some(id) {
                    return;
                }
                state.pending = None;
            }

            task().await;
        })
        .abort_handle();

        state.pending = Some(PendingPoll {
            id,
            fire_at,
            handle,
        });

        tracing::debug!("Next poll in {:?}", delay);
        fire_at
    }

    /// Schedule from the server's "time until next update" hint in
    /// milliseconds. A missing hint falls back to the fixed missing-hint delay.
    pub fn schedule_from_hint<F, Fut>(&self, hint_ms: Option<i64>, task: F) -> Instant
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let delay = match hint_ms {
            Some(hint) => self.policy.delay_for_hint(hint, self.policy.random_jitter()),
            None => {
                tracing::warn!(
                    "No update hint in response, polling again in {:?}",
                    self.policy.missing_hint_delay
                );
                self.policy.missing_hint_delay
            }
        };

        self.schedule(delay, task)
    }

    /// Schedule after a failed request, ignoring any earlier hint.
    pub fn schedule_retry<F, Fut>(&self, task: F) -> Instant
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.schedule(self.policy.retry_delay, task)
    }

    /// Abort the pending poll. Returns false when nothing was pending.
    pub fn cancel(&self) -> bool {
        match self.state.lock().pending.take() {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn next_fire_at(&self) -> Option<Instant> {
        self.state.lock().pending.as_ref().map(|pending| pending.fire_at)
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
