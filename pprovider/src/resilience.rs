//! Retry/backoff policy and operation hook contracts.
//!
//! The chat core never retries on its own. Hosts that want retries wrap their
//! own calls in [`execute_with_retry`].
//!
//! ```rust
//! use std::time::Duration;
//! use pprovider::{ProviderError, RetryPolicy};
//!
//! let policy = RetryPolicy::new(2);
//! assert!(policy.should_retry(1, &ProviderError::timeout("slow")));
//! assert!(!policy.should_retry(2, &ProviderError::timeout("slow")));
//! assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(250));
//! ```

use std::future::Future;
use std::time::Duration;

use crate::ProviderError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(8),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Never retries; useful as an explicit "off" switch.
    pub fn none() -> Self {
        Self::new(1)
    }

    pub fn should_retry(&self, attempt: u32, error: &ProviderError) -> bool {
        error.retryable && attempt < self.max_attempts
    }

    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let scaled = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(scaled.min(self.max_backoff.as_secs_f64()))
    }
}

/// Observer for backend operations. `backend` is a stable label such as
/// `openai` or `tts:gpt-sovits`.
pub trait ProviderOperationHooks: Send + Sync {
    fn on_attempt_start(&self, _backend: &str, _operation: &str, _attempt: u32) {}

    fn on_retry_scheduled(
        &self,
        _backend: &str,
        _operation: &str,
        _attempt: u32,
        _delay: Duration,
        _error: &ProviderError,
    ) {
    }

    fn on_success(&self, _backend: &str, _operation: &str, _attempts: u32) {}

    fn on_failure(&self, _backend: &str, _operation: &str, _attempts: u32, _error: &ProviderError) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}

/// Runs `execute` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts. `sleep` is injected so callers choose the timer.
pub async fn execute_with_retry<T, Op, OpFuture, Sleep, SleepFuture>(
    backend: &str,
    operation: &str,
    policy: &RetryPolicy,
    hooks: &dyn ProviderOperationHooks,
    mut execute: Op,
    mut sleep: Sleep,
) -> Result<T, ProviderError>
where
    Op: FnMut(u32) -> OpFuture,
    OpFuture: Future<Output = Result<T, ProviderError>>,
    Sleep: FnMut(Duration) -> SleepFuture,
    SleepFuture: Future<Output = ()>,
{
    let mut attempt = 1;

    loop {
        hooks.on_attempt_start(backend, operation, attempt);

        let error = match execute(attempt).await {
            Ok(value) => {
                hooks.on_success(backend, operation, attempt);
                return Ok(value);
            }
            Err(error) => error,
        };

        if !policy.should_retry(attempt, &error) {
            hooks.on_failure(backend, operation, attempt, &error);
            return Err(error);
        }

        let delay = policy.backoff_for_attempt(attempt);
        hooks.on_retry_scheduled(backend, operation, attempt, delay, &error);
        sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::ProviderErrorKind;

    #[derive(Default)]
    struct EventLog {
        events: Mutex<Vec<String>>,
    }

    impl EventLog {
        fn push(&self, event: String) {
            self.events.lock().expect("events lock").push(event);
        }

        fn snapshot(&self) -> Vec<String> {
            self.events.lock().expect("events lock").clone()
        }
    }

    impl ProviderOperationHooks for EventLog {
        fn on_attempt_start(&self, backend: &str, operation: &str, attempt: u32) {
            self.push(format!("attempt {backend}/{operation} #{attempt}"));
        }

        fn on_retry_scheduled(
            &self,
            backend: &str,
            _operation: &str,
            attempt: u32,
            delay: Duration,
            _error: &ProviderError,
        ) {
            self.push(format!("retry {backend} #{attempt} after {}ms", delay.as_millis()));
        }

        fn on_success(&self, backend: &str, _operation: &str, attempts: u32) {
            self.push(format!("ok {backend} after {attempts}"));
        }

        fn on_failure(
            &self,
            backend: &str,
            _operation: &str,
            attempts: u32,
            error: &ProviderError,
        ) {
            self.push(format!("failed {backend} after {attempts}: {:?}", error.kind));
        }
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let policy = RetryPolicy {
            max_attempts: 6,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(150),
            backoff_multiplier: 2.0,
        };

        let delays = (1..=4)
            .map(|attempt| policy.backoff_for_attempt(attempt).as_millis())
            .collect::<Vec<_>>();
        assert_eq!(delays, vec![50, 100, 150, 150]);
    }

    #[test]
    fn none_policy_never_retries() {
        let policy = RetryPolicy::none();
        assert!(!policy.should_retry(1, &ProviderError::transport("reset")));
    }

    #[tokio::test]
    async fn timeouts_are_retried_until_success() {
        let hooks = EventLog::default();
        let slept = Arc::new(Mutex::new(0_u32));

        let value = execute_with_retry(
            "tts:openai",
            "synthesize",
            &RetryPolicy::new(4),
            &hooks,
            |attempt| async move {
                if attempt == 1 {
                    Err(ProviderError::timeout("slow synthesis"))
                } else {
                    Ok(attempt * 10)
                }
            },
            {
                let slept = Arc::clone(&slept);
                move |_| {
                    let slept = Arc::clone(&slept);
                    async move {
                        *slept.lock().expect("sleep lock") += 1;
                    }
                }
            },
        )
        .await
        .expect("second attempt succeeds");

        assert_eq!(value, 20);
        assert_eq!(*slept.lock().expect("sleep lock"), 1);
        assert_eq!(
            hooks.snapshot(),
            vec![
                "attempt tts:openai/synthesize #1".to_string(),
                "retry tts:openai #1 after 250ms".to_string(),
                "attempt tts:openai/synthesize #2".to_string(),
                "ok tts:openai after 2".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn configuration_errors_fail_immediately() {
        let hooks = EventLog::default();

        let error = execute_with_retry::<(), _, _, _, _>(
            "openai",
            "complete",
            &RetryPolicy::new(5),
            &hooks,
            |_| async { Err(ProviderError::configuration("api key missing")) },
            |_| async {},
        )
        .await
        .expect_err("configuration errors are not retryable");

        assert_eq!(error.kind, ProviderErrorKind::Configuration);
        assert_eq!(
            hooks.snapshot().last().map(String::as_str),
            Some("failed openai after 1: Configuration")
        );
    }
}
