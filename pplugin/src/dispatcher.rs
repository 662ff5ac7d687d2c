//! Registration-order dispatch with per-plugin error isolation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_timer::Delay;
use futures_util::future::{Either, select};

use crate::{
    ActionPlugin, ChannelModeDefinition, DispatchHooks, LifecyclePhase, LifecyclePlugin,
    NoopDispatchHooks, Plugin, PluginError, PluginRegistry, ProcessingContext, ProcessingFailure,
    find_markers,
};

pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// One executed marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Registered plugin name (not the marker's spelling).
    pub plugin: String,
    pub arguments: String,
    pub result: Result<String, PluginError>,
    pub follows_up: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionResolution {
    /// Backend text with every successful marker replaced by its result.
    pub text: String,
    pub outcomes: Vec<ActionOutcome>,
}

impl ActionResolution {
    /// Successful results whose plugin asked for a follow-up round.
    pub fn follow_ups(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.result {
            Ok(result) if outcome.follows_up => Some((outcome.plugin.as_str(), result.as_str())),
            _ => None,
        })
    }

    pub fn has_follow_up(&self) -> bool {
        self.follow_ups().next().is_some()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PluginError> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err())
    }
}

#[derive(Clone)]
pub struct PluginDispatcher {
    registry: Arc<PluginRegistry>,
    hooks: Arc<dyn DispatchHooks>,
    action_timeout: Duration,
}

impl PluginDispatcher {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            hooks: Arc::new(NoopDispatchHooks),
            action_timeout: DEFAULT_ACTION_TIMEOUT,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn DispatchHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    pub fn registry(&self) -> Arc<PluginRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn action_timeout(&self) -> Duration {
        self.action_timeout
    }

    /// Runs every start hook and stores returned state in `context`. Each
    /// failure is then reported to all lifecycle plugins.
    pub async fn processing_start(&self, context: &mut ProcessingContext) -> Vec<PluginError> {
        let mut failures = Vec::new();

        for (name, lifecycle) in self.lifecycle_plugins() {
            match lifecycle.on_processing_start(&*context).await {
                Ok(Some(state)) => context.insert_state(&name, state),
                Ok(None) => {}
                Err(error) => {
                    failures.push(self.hook_failed(&name, LifecyclePhase::ProcessingStart, error))
                }
            }
        }

        self.route_failures(context, LifecyclePhase::ProcessingStart, &failures)
            .await;
        failures
    }

    pub async fn response_start(
        &self,
        context: &ProcessingContext,
        response: &str,
    ) -> Vec<PluginError> {
        let mut failures = Vec::new();

        for (name, lifecycle) in self.lifecycle_plugins() {
            if let Err(error) = lifecycle.on_response_start(context, response).await {
                failures.push(self.hook_failed(&name, LifecyclePhase::ResponseStart, error));
            }
        }

        self.route_failures(context, LifecyclePhase::ResponseStart, &failures)
            .await;
        failures
    }

    pub async fn processing_complete(
        &self,
        context: &ProcessingContext,
        final_text: &str,
    ) -> Vec<PluginError> {
        let mut failures = Vec::new();

        for (name, lifecycle) in self.lifecycle_plugins() {
            if let Err(error) = lifecycle.on_processing_complete(context, final_text).await {
                failures.push(self.hook_failed(&name, LifecyclePhase::ProcessingComplete, error));
            }
        }

        self.route_failures(context, LifecyclePhase::ProcessingComplete, &failures)
            .await;
        failures
    }

    /// Tells every lifecycle plugin about `failure`. Errors raised by error
    /// hooks are only reported to the dispatch hooks.
    pub async fn processing_error(
        &self,
        context: &ProcessingContext,
        failure: &ProcessingFailure,
    ) -> Vec<PluginError> {
        let mut failures = Vec::new();

        for (name, lifecycle) in self.lifecycle_plugins() {
            if let Err(error) = lifecycle.on_processing_error(context, failure).await {
                failures.push(self.hook_failed(&name, LifecyclePhase::ProcessingError, error));
            }
        }

        failures
    }

    /// Non-empty contributions joined by newlines, in registration order.
    pub fn dynamic_info(&self) -> Option<String> {
        let parts = self
            .registry
            .snapshot()
            .iter()
            .filter_map(|plugin| plugin.dynamic_info())
            .filter_map(|provider| provider.dynamic_info())
            .map(|info| info.trim().to_string())
            .filter(|info| !info.is_empty())
            .collect::<Vec<_>>();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }

    pub fn custom_modes(&self) -> Vec<ChannelModeDefinition> {
        self.registry
            .snapshot()
            .iter()
            .filter_map(|plugin| plugin.channel_modes())
            .flat_map(|provider| provider.custom_modes())
            .collect()
    }

    /// Executes each marker naming a registered action plugin exactly once, in
    /// text order. Unmatched and failed markers stay in the text verbatim.
    pub async fn resolve_actions(
        &self,
        context: &ProcessingContext,
        text: &str,
    ) -> ActionResolution {
        let markers = find_markers(text);
        if markers.is_empty() {
            return ActionResolution {
                text: text.to_string(),
                outcomes: Vec::new(),
            };
        }

        let plugins = self.registry.snapshot();
        let mut output = String::with_capacity(text.len());
        let mut outcomes = Vec::new();
        let mut last = 0;

        for marker in markers {
            output.push_str(&text[last..marker.span.start]);
            last = marker.span.end;

            let Some((name, action)) = find_action(&plugins, &marker.name) else {
                self.hooks.on_unmatched_marker(&marker.name);
                output.push_str(&marker.raw);
                continue;
            };

            let result = self.invoke(&name, &action, &marker.arguments).await;
            match &result {
                Ok(replacement) => output.push_str(replacement),
                Err(error) => {
                    output.push_str(&marker.raw);
                    let failure = ProcessingFailure::from_plugin_error("action_resolution", error);
                    self.processing_error(context, &failure).await;
                }
            }

            outcomes.push(ActionOutcome {
                plugin: name,
                arguments: marker.arguments,
                result,
                follows_up: action.follows_up(),
            });
        }

        output.push_str(&text[last..]);
        ActionResolution {
            text: output,
            outcomes,
        }
    }

    async fn invoke(
        &self,
        name: &str,
        action: &Arc<dyn ActionPlugin>,
        arguments: &str,
    ) -> Result<String, PluginError> {
        self.hooks.on_action_start(name, arguments);
        let started = Instant::now();

        let call = action.function(arguments);
        let deadline = Box::pin(Delay::new(self.action_timeout));
        let result = match select(call, deadline).await {
            Either::Left((result, _)) => result.map_err(|error| error.with_plugin(name)),
            Either::Right(_) => Err(PluginError::timeout(format!(
                "action '{name}' did not finish within {:?}",
                self.action_timeout
            ))
            .with_plugin(name)),
        };

        let elapsed = started.elapsed();
        match &result {
            Ok(_) => self.hooks.on_action_success(name, elapsed),
            Err(error) => self.hooks.on_action_failure(name, error, elapsed),
        }
        result
    }

    fn lifecycle_plugins(&self) -> Vec<(String, Arc<dyn LifecyclePlugin>)> {
        self.registry
            .snapshot()
            .iter()
            .filter_map(|plugin| {
                plugin
                    .lifecycle()
                    .map(|lifecycle| (plugin.name().to_string(), Arc::clone(lifecycle)))
            })
            .collect()
    }

    fn hook_failed(&self, plugin: &str, phase: LifecyclePhase, error: PluginError) -> PluginError {
        let error = error.with_plugin(plugin);
        self.hooks.on_hook_failure(plugin, phase, &error);
        error
    }

    async fn route_failures(
        &self,
        context: &ProcessingContext,
        phase: LifecyclePhase,
        failures: &[PluginError],
    ) {
        for error in failures {
            let failure = ProcessingFailure::from_plugin_error(phase.as_str(), error);
            self.processing_error(context, &failure).await;
        }
    }
}

fn find_action(plugins: &[Arc<Plugin>], name: &str) -> Option<(String, Arc<dyn ActionPlugin>)> {
    plugins.iter().find_map(|plugin| {
        if !plugin.matches(name) {
            return None;
        }
        plugin
            .action()
            .map(|action| (plugin.name().to_string(), Arc::clone(action)))
    })
}
