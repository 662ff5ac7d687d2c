//! Tracing-based observability hooks for provider, dispatch, and turn phases.
//!
//! ```rust
//! use pobserve::TracingObservabilityHooks;
//! use pchat::TurnHooks;
//!
//! fn accepts_turn_hooks(_hooks: &dyn TurnHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_turn_hooks(&hooks);
//! ```

use std::time::Duration;

use pchat::{ChatError, TurnHooks, TurnPhase};
use pcommon::{SessionId, TurnId};
use pplugin::{DispatchHooks, LifecyclePhase, PluginError};
use pprovider::{ProviderError, ProviderOperationHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_attempt_start(&self, backend: &str, operation: &str, attempt: u32) {
        tracing::info!(
            phase = "provider",
            event = "attempt_start",
            backend,
            operation,
            attempt
        );
    }

    fn on_retry_scheduled(
        &self,
        backend: &str,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        tracing::warn!(
            phase = "provider",
            event = "retry_scheduled",
            backend,
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error_kind = ?error.kind,
            status = error.status,
            error = %error
        );
    }

    fn on_success(&self, backend: &str, operation: &str, attempts: u32) {
        tracing::info!(
            phase = "provider",
            event = "success",
            backend,
            operation,
            attempts
        );
    }

    fn on_failure(&self, backend: &str, operation: &str, attempts: u32, error: &ProviderError) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            backend,
            operation,
            attempts,
            error_kind = ?error.kind,
            status = error.status,
            error = %error
        );
    }
}

impl DispatchHooks for TracingObservabilityHooks {
    fn on_hook_failure(&self, plugin: &str, phase: LifecyclePhase, error: &PluginError) {
        tracing::warn!(
            phase = "plugin",
            event = "hook_failure",
            plugin,
            lifecycle_phase = phase.as_str(),
            error_kind = ?error.kind,
            error = %error
        );
    }

    fn on_action_start(&self, plugin: &str, arguments: &str) {
        tracing::debug!(
            phase = "plugin",
            event = "action_start",
            plugin,
            arguments
        );
    }

    fn on_action_success(&self, plugin: &str, elapsed: Duration) {
        tracing::info!(
            phase = "plugin",
            event = "action_success",
            plugin,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_action_failure(&self, plugin: &str, error: &PluginError, elapsed: Duration) {
        tracing::error!(
            phase = "plugin",
            event = "action_failure",
            plugin,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            error = %error
        );
    }

    fn on_unmatched_marker(&self, name: &str) {
        tracing::debug!(phase = "plugin", event = "unmatched_marker", marker = name);
    }
}

impl TurnHooks for TracingObservabilityHooks {
    fn on_turn_start(&self, session: &SessionId, turn: &TurnId, continuation: bool) {
        tracing::info!(
            phase = "turn",
            event = "turn_start",
            session_id = %session,
            turn_id = %turn,
            continuation
        );
    }

    fn on_phase_change(&self, session: &SessionId, turn: &TurnId, phase: TurnPhase) {
        tracing::debug!(
            phase = "turn",
            event = "phase_change",
            session_id = %session,
            turn_id = %turn,
            turn_phase = phase.as_str()
        );
    }

    fn on_turn_success(&self, session: &SessionId, turn: &TurnId, rounds: u32, elapsed: Duration) {
        tracing::info!(
            phase = "turn",
            event = "turn_success",
            session_id = %session,
            turn_id = %turn,
            rounds,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_turn_failure(
        &self,
        session: &SessionId,
        turn: &TurnId,
        error: &ChatError,
        elapsed: Duration,
    ) {
        tracing::error!(
            phase = "turn",
            event = "turn_failure",
            session_id = %session,
            turn_id = %turn,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            error_phase = error.phase.map(|phase| phase.as_str()),
            backend = error.backend.as_deref(),
            error = %error
        );
    }
}
