//! Dispatch observability hooks.
//!
//! ```rust
//! use pplugin::{DispatchHooks, NoopDispatchHooks};
//!
//! fn assert_hooks_trait(_hooks: &dyn DispatchHooks) {}
//!
//! assert_hooks_trait(&NoopDispatchHooks);
//! ```

use std::time::Duration;

use crate::{LifecyclePhase, PluginError};

pub trait DispatchHooks: Send + Sync {
    fn on_hook_failure(&self, _plugin: &str, _phase: LifecyclePhase, _error: &PluginError) {}

    fn on_action_start(&self, _plugin: &str, _arguments: &str) {}

    fn on_action_success(&self, _plugin: &str, _elapsed: Duration) {}

    fn on_action_failure(&self, _plugin: &str, _error: &PluginError, _elapsed: Duration) {}

    /// A syntactically valid marker named no registered action plugin.
    fn on_unmatched_marker(&self, _name: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDispatchHooks;

impl DispatchHooks for NoopDispatchHooks {}
