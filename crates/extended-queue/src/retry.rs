//! # Retry Module
//!
//! Resubmits the failed subset of a batch put with a bounded number of
//! attempts. Delays default to a fixed interval; exponential backoff and
//! jitter are available for callers sharing a queue with many producers.

use crate::client::ExtendedQueue;
use crate::error::{ExtendedQueueError, ValidationError};
use crate::message::{Message, OpStatus, QueueHandle};
use rand::Rng;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Retry policy configuration
///
/// # Examples
///
/// ```rust
/// use extended_queue::retry::RetryPolicy;
/// use std::time::Duration;
///
/// // Default policy: 3 attempts, fixed 500ms delay
/// let policy = RetryPolicy::default();
///
/// // Exponential policy with jitter
/// let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_secs(5), 2.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Growth factor per attempt; 1.0 keeps the delay fixed
    pub backoff_multiplier: f64,

    /// Whether to add jitter to delays
    pub use_jitter: bool,

    /// Jitter range as percentage (0.25 = ±25%)
    pub jitter_percent: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_millis(500))
    }
}

impl RetryPolicy {
    /// Create an exponential backoff policy with ±25% jitter
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
            use_jitter: true,
            jitter_percent: 0.25,
        }
    }

    /// Create a policy that waits the same delay before every attempt
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            max_delay: delay,
            backoff_multiplier: 1.0,
            use_jitter: false,
            jitter_percent: 0.0,
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Set custom jitter percentage (0.0 to 1.0)
    pub fn with_jitter_percent(mut self, percent: f64) -> Self {
        self.use_jitter = true;
        self.jitter_percent = percent.clamp(0.0, 1.0);
        self
    }

    /// Calculate delay for a retry attempt (0-based)
    ///
    /// delay = min(initial * multiplier^attempt, max_delay), then jitter if enabled
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay_secs =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        // Negative multipliers and NaN clamp to zero
        let capped_delay_secs = base_delay_secs
            .min(self.max_delay.as_secs_f64())
            .max(0.0);

        let final_delay_secs = if self.use_jitter {
            Self::add_jitter(capped_delay_secs, self.jitter_percent)
        } else {
            capped_delay_secs
        };

        Duration::from_secs_f64(final_delay_secs)
    }

    /// Check if another retry is allowed for this attempt number (0-based)
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Apply random variation in the range [delay * (1-jitter), delay * (1+jitter)]
    fn add_jitter(delay_secs: f64, jitter_percent: f64) -> f64 {
        let jitter_range = delay_secs * jitter_percent;
        if jitter_range <= 0.0 {
            return delay_secs;
        }

        let mut rng = rand::thread_rng();
        let jitter = rng.gen_range(-jitter_range..=jitter_range);
        (delay_secs + jitter).max(0.0)
    }
}

/// State tracker for retry operations
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    /// Current retry attempt (0-based)
    pub attempt: u32,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_attempt(&mut self) {
        self.attempt += 1;
    }

    pub fn get_delay(&self, policy: &RetryPolicy) -> Duration {
        policy.calculate_delay(self.attempt)
    }

    pub fn can_retry(&self, policy: &RetryPolicy) -> bool {
        policy.should_retry(self.attempt)
    }
}

/// Resubmit the messages whose status is failed until they all succeed or
/// the policy runs out of attempts.
///
/// `statuses` is the outcome of a previous put of `messages` (for example
/// from [`ExtendedQueueError::statuses`]). Messages are copied back into
/// `messages` after every attempt so payload offloading done during a retry
/// is visible to the caller.
///
/// # Errors
///
/// - `PartialFailure` with the aggregate statuses when attempts run out
/// - Any other error from a put is returned immediately
#[instrument(skip_all, fields(queue = %queue, messages = messages.len()))]
pub async fn retry_put(
    client: &dyn ExtendedQueue,
    queue: &QueueHandle,
    messages: &mut [Message],
    mut statuses: Vec<OpStatus>,
    policy: &RetryPolicy,
) -> Result<Vec<OpStatus>, ExtendedQueueError> {
    if statuses.len() != messages.len() {
        return Err(ValidationError::InvalidFormat {
            field: "statuses".to_string(),
            message: format!(
                "{} statuses supplied for {} messages",
                statuses.len(),
                messages.len()
            ),
        }
        .into());
    }

    let mut pending: Vec<usize> = statuses
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_failure())
        .map(|(ix, _)| ix)
        .collect();
    let mut state = RetryState::new();

    loop {
        if pending.is_empty() {
            return Ok(statuses);
        }

        if !state.can_retry(policy) {
            warn!(
                attempts = state.attempt,
                still_failing = pending.len(),
                "Retry attempts exhausted"
            );
            return Err(ExtendedQueueError::PartialFailure { statuses });
        }

        let delay = state.get_delay(policy);
        info!(
            attempt = state.attempt + 1,
            pending = pending.len(),
            delay_ms = delay.as_millis() as u64,
            "Retrying failed messages"
        );
        tokio::time::sleep(delay).await;

        let mut subset: Vec<Message> = pending.iter().map(|&ix| messages[ix].clone()).collect();
        let outcome = client.put_batch(queue, &mut subset).await;

        for (&ix, message) in pending.iter().zip(subset) {
            messages[ix] = message;
        }

        let subset_statuses = match outcome {
            Ok(subset_statuses) => subset_statuses,
            Err(ExtendedQueueError::PartialFailure {
                statuses: subset_statuses,
            }) => subset_statuses,
            Err(e) => return Err(e),
        };

        for (&ix, status) in pending.iter().zip(&subset_statuses) {
            statuses[ix] = *status;
        }
        pending.retain(|&ix| statuses[ix].is_failure());
        state.next_attempt();
    }
}

/// Put a batch and retry any failed messages according to `policy`
pub async fn put_with_retry(
    client: &dyn ExtendedQueue,
    queue: &QueueHandle,
    messages: &mut [Message],
    policy: &RetryPolicy,
) -> Result<Vec<OpStatus>, ExtendedQueueError> {
    match client.put_batch(queue, messages).await {
        Err(ExtendedQueueError::PartialFailure { statuses }) => {
            retry_put(client, queue, messages, statuses, policy).await
        }
        other => other,
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
