//! Wrappers that keep a panicking observer from unwinding into the caller.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use pchat::{ChatError, TurnHooks, TurnPhase};
use pcommon::{SessionId, TurnId};
use pplugin::{DispatchHooks, LifecyclePhase, PluginError};
use pprovider::{ProviderError, ProviderOperationHooks};

pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_attempt_start(&self, backend: &str, operation: &str, attempt: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_attempt_start(backend, operation, attempt)
        }));
    }

    fn on_retry_scheduled(
        &self,
        backend: &str,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_retry_scheduled(backend, operation, attempt, delay, error)
        }));
    }

    fn on_success(&self, backend: &str, operation: &str, attempts: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_success(backend, operation, attempts)
        }));
    }

    fn on_failure(&self, backend: &str, operation: &str, attempts: u32, error: &ProviderError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(backend, operation, attempts, error)
        }));
    }
}

pub struct SafeDispatchHooks<H> {
    inner: H,
}

impl<H> SafeDispatchHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> DispatchHooks for SafeDispatchHooks<H>
where
    H: DispatchHooks,
{
    fn on_hook_failure(&self, plugin: &str, phase: LifecyclePhase, error: &PluginError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_hook_failure(plugin, phase, error)
        }));
    }

    fn on_action_start(&self, plugin: &str, arguments: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_action_start(plugin, arguments)
        }));
    }

    fn on_action_success(&self, plugin: &str, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_action_success(plugin, elapsed)
        }));
    }

    fn on_action_failure(&self, plugin: &str, error: &PluginError, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_action_failure(plugin, error, elapsed)
        }));
    }

    fn on_unmatched_marker(&self, name: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_unmatched_marker(name)));
    }
}

pub struct SafeTurnHooks<H> {
    inner: H,
}

impl<H> SafeTurnHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> TurnHooks for SafeTurnHooks<H>
where
    H: TurnHooks,
{
    fn on_turn_start(&self, session: &SessionId, turn: &TurnId, continuation: bool) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_start(session, turn, continuation)
        }));
    }

    fn on_phase_change(&self, session: &SessionId, turn: &TurnId, phase: TurnPhase) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_phase_change(session, turn, phase)
        }));
    }

    fn on_turn_success(&self, session: &SessionId, turn: &TurnId, rounds: u32, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_success(session, turn, rounds, elapsed)
        }));
    }

    fn on_turn_failure(
        &self,
        session: &SessionId,
        turn: &TurnId,
        error: &ChatError,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_failure(session, turn, error, elapsed)
        }));
    }
}
