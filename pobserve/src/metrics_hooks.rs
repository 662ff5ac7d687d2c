//! Metrics-based observability hooks for provider, dispatch, and turn phases.
//!
//! ```rust
//! use pobserve::MetricsObservabilityHooks;
//! use pprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use pchat::{ChatError, TurnHooks, TurnPhase};
use pcommon::{SessionId, TurnId};
use pplugin::{DispatchHooks, LifecyclePhase, PluginError};
use pprovider::{ProviderError, ProviderOperationHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_attempt_start(&self, backend: &str, operation: &str, _attempt: u32) {
        metrics::counter!(
            "petchat_provider_attempt_start_total",
            "backend" => backend.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_retry_scheduled(
        &self,
        backend: &str,
        operation: &str,
        _attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "petchat_provider_retry_scheduled_total",
            "backend" => backend.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "petchat_provider_retry_delay_seconds",
            "backend" => backend.to_string(),
            "operation" => operation.to_string()
        )
        .record(delay.as_secs_f64());
    }

    fn on_success(&self, backend: &str, operation: &str, attempts: u32) {
        metrics::counter!(
            "petchat_provider_success_total",
            "backend" => backend.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "petchat_provider_attempts_per_success",
            "backend" => backend.to_string(),
            "operation" => operation.to_string()
        )
        .record(f64::from(attempts));
    }

    fn on_failure(&self, backend: &str, operation: &str, attempts: u32, error: &ProviderError) {
        metrics::counter!(
            "petchat_provider_failure_total",
            "backend" => backend.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "petchat_provider_attempts_per_failure",
            "backend" => backend.to_string(),
            "operation" => operation.to_string()
        )
        .record(f64::from(attempts));
    }
}

impl DispatchHooks for MetricsObservabilityHooks {
    fn on_hook_failure(&self, plugin: &str, phase: LifecyclePhase, error: &PluginError) {
        metrics::counter!(
            "petchat_plugin_hook_failure_total",
            "plugin" => plugin.to_string(),
            "lifecycle_phase" => phase.as_str(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }

    fn on_action_start(&self, plugin: &str, _arguments: &str) {
        metrics::counter!(
            "petchat_plugin_action_start_total",
            "plugin" => plugin.to_string()
        )
        .increment(1);
    }

    fn on_action_success(&self, plugin: &str, elapsed: Duration) {
        metrics::counter!(
            "petchat_plugin_action_success_total",
            "plugin" => plugin.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "petchat_plugin_action_duration_seconds",
            "plugin" => plugin.to_string(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_action_failure(&self, plugin: &str, error: &PluginError, elapsed: Duration) {
        metrics::counter!(
            "petchat_plugin_action_failure_total",
            "plugin" => plugin.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "petchat_plugin_action_duration_seconds",
            "plugin" => plugin.to_string(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_unmatched_marker(&self, _name: &str) {
        metrics::counter!("petchat_plugin_unmatched_marker_total").increment(1);
    }
}

impl TurnHooks for MetricsObservabilityHooks {
    fn on_turn_start(&self, _session: &SessionId, _turn: &TurnId, continuation: bool) {
        metrics::counter!(
            "petchat_turn_start_total",
            "continuation" => continuation.to_string()
        )
        .increment(1);
    }

    fn on_phase_change(&self, _session: &SessionId, _turn: &TurnId, phase: TurnPhase) {
        metrics::counter!(
            "petchat_turn_phase_change_total",
            "turn_phase" => phase.as_str()
        )
        .increment(1);
    }

    fn on_turn_success(
        &self,
        _session: &SessionId,
        _turn: &TurnId,
        rounds: u32,
        elapsed: Duration,
    ) {
        metrics::counter!("petchat_turn_success_total").increment(1);
        metrics::histogram!("petchat_turn_rounds").record(f64::from(rounds));
        metrics::histogram!("petchat_turn_duration_seconds", "status" => "success")
            .record(elapsed.as_secs_f64());
    }

    fn on_turn_failure(
        &self,
        _session: &SessionId,
        _turn: &TurnId,
        error: &ChatError,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "petchat_turn_failure_total",
            "error_kind" => format!("{:?}", error.kind),
            "error_phase" => error.phase.map_or("turn", |phase| phase.as_str())
        )
        .increment(1);
        metrics::histogram!("petchat_turn_duration_seconds", "status" => "failure")
            .record(elapsed.as_secs_f64());
    }
}
