//! Plugin record: an identity plus optional capability handlers.
//!
//! ```rust
//! use pplugin::{Capability, FunctionAction, Plugin};
//!
//! let plugin = Plugin::builder("Feed")
//!     .action(FunctionAction::new(|args| async move { Ok(format!("fed {args}")) }))
//!     .build()
//!     .expect("plugin should build");
//!
//! assert_eq!(plugin.name(), "Feed");
//! assert_eq!(plugin.descriptor().capabilities, vec![Capability::Action]);
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::{
    ActionPlugin, ChannelModeProvider, DynamicInfoProvider, LifecyclePlugin, PluginError,
    PluginFuture,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Action,
    ProcessingLifecycle,
    DynamicInfo,
    ChannelMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub name: String,
    pub capabilities: Vec<Capability>,
}

#[derive(Clone)]
pub struct Plugin {
    name: String,
    action: Option<Arc<dyn ActionPlugin>>,
    lifecycle: Option<Arc<dyn LifecyclePlugin>>,
    dynamic_info: Option<Arc<dyn DynamicInfoProvider>>,
    channel_modes: Option<Arc<dyn ChannelModeProvider>>,
}

impl Plugin {
    pub fn builder(name: impl Into<String>) -> PluginBuilder {
        PluginBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> Option<&Arc<dyn ActionPlugin>> {
        self.action.as_ref()
    }

    pub fn lifecycle(&self) -> Option<&Arc<dyn LifecyclePlugin>> {
        self.lifecycle.as_ref()
    }

    pub fn dynamic_info(&self) -> Option<&Arc<dyn DynamicInfoProvider>> {
        self.dynamic_info.as_ref()
    }

    pub fn channel_modes(&self) -> Option<&Arc<dyn ChannelModeProvider>> {
        self.channel_modes.as_ref()
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Action => self.action.is_some(),
            Capability::ProcessingLifecycle => self.lifecycle.is_some(),
            Capability::DynamicInfo => self.dynamic_info.is_some(),
            Capability::ChannelMode => self.channel_modes.is_some(),
        }
    }

    pub fn descriptor(&self) -> PluginDescriptor {
        let capabilities = [
            Capability::Action,
            Capability::ProcessingLifecycle,
            Capability::DynamicInfo,
            Capability::ChannelMode,
        ]
        .into_iter()
        .filter(|capability| self.has(*capability))
        .collect();

        PluginDescriptor {
            name: self.name.clone(),
            capabilities,
        }
    }

    pub(crate) fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("capabilities", &self.descriptor().capabilities)
            .finish()
    }
}

pub struct PluginBuilder {
    plugin: Plugin,
}

impl PluginBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            plugin: Plugin {
                name: name.into().trim().to_string(),
                action: None,
                lifecycle: None,
                dynamic_info: None,
                channel_modes: None,
            },
        }
    }

    pub fn action<A>(self, action: A) -> Self
    where
        A: ActionPlugin + 'static,
    {
        self.action_arc(Arc::new(action))
    }

    pub fn action_arc(mut self, action: Arc<dyn ActionPlugin>) -> Self {
        self.plugin.action = Some(action);
        self
    }

    pub fn lifecycle<L>(self, lifecycle: L) -> Self
    where
        L: LifecyclePlugin + 'static,
    {
        self.lifecycle_arc(Arc::new(lifecycle))
    }

    pub fn lifecycle_arc(mut self, lifecycle: Arc<dyn LifecyclePlugin>) -> Self {
        self.plugin.lifecycle = Some(lifecycle);
        self
    }

    pub fn dynamic_info<D>(self, provider: D) -> Self
    where
        D: DynamicInfoProvider + 'static,
    {
        self.dynamic_info_arc(Arc::new(provider))
    }

    pub fn dynamic_info_arc(mut self, provider: Arc<dyn DynamicInfoProvider>) -> Self {
        self.plugin.dynamic_info = Some(provider);
        self
    }

    pub fn channel_modes<C>(self, provider: C) -> Self
    where
        C: ChannelModeProvider + 'static,
    {
        self.channel_modes_arc(Arc::new(provider))
    }

    pub fn channel_modes_arc(mut self, provider: Arc<dyn ChannelModeProvider>) -> Self {
        self.plugin.channel_modes = Some(provider);
        self
    }

    pub fn build(self) -> Result<Plugin, PluginError> {
        let plugin = self.plugin;
        if plugin.name.trim().is_empty() {
            return Err(PluginError::registration("plugin name must not be empty"));
        }

        if plugin.name.contains([':', '[', ']']) {
            return Err(PluginError::registration(format!(
                "plugin name '{}' must not contain ':', '[' or ']'",
                plugin.name
            ))
            .with_plugin(plugin.name.clone()));
        }

        if plugin.descriptor().capabilities.is_empty() {
            return Err(PluginError::registration(format!(
                "plugin '{}' declares no capabilities",
                plugin.name
            ))
            .with_plugin(plugin.name.clone()));
        }

        Ok(plugin)
    }
}

type ActionHandler =
    dyn Fn(String) -> PluginFuture<'static, Result<String, PluginError>> + Send + Sync;

/// Closure-backed [`ActionPlugin`].
pub struct FunctionAction {
    handler: Arc<ActionHandler>,
    follows_up: bool,
}

impl FunctionAction {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, PluginError>> + Send + 'static,
    {
        let handler: Arc<ActionHandler> = Arc::new(move |arguments| Box::pin(handler(arguments)));
        Self {
            handler,
            follows_up: false,
        }
    }

    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(&str) -> Result<String, PluginError> + Send + Sync + 'static,
    {
        Self::new(move |arguments| {
            let output = handler(&arguments);
            async move { output }
        })
    }

    pub fn with_follow_up(mut self, follows_up: bool) -> Self {
        self.follows_up = follows_up;
        self
    }
}

impl ActionPlugin for FunctionAction {
    fn function<'a>(&'a self, arguments: &'a str) -> PluginFuture<'a, Result<String, PluginError>> {
        (self.handler)(arguments.to_string())
    }

    fn follows_up(&self) -> bool {
        self.follows_up
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChannelModeDefinition, PluginErrorKind};

    struct Modes;

    impl ChannelModeProvider for Modes {
        fn custom_modes(&self) -> Vec<ChannelModeDefinition> {
            Vec::new()
        }
    }

    #[test]
    fn builder_rejects_blank_names_and_empty_capability_sets() {
        let error = Plugin::builder("  ")
            .channel_modes(Modes)
            .build()
            .expect_err("blank name");
        assert_eq!(error.kind, PluginErrorKind::Registration);

        let error = Plugin::builder("Idle").build().expect_err("no capabilities");
        assert_eq!(error.plugin.as_deref(), Some("Idle"));

        let error = Plugin::builder("Bad:Name")
            .channel_modes(Modes)
            .build()
            .expect_err("colon in name");
        assert_eq!(error.kind, PluginErrorKind::Registration);
    }

    #[test]
    fn descriptor_lists_capabilities_in_fixed_order() {
        let plugin = Plugin::builder("Toy")
            .channel_modes(Modes)
            .action(FunctionAction::sync(|_| Ok("squeak".to_string())))
            .build()
            .expect("plugin");
        assert_eq!(
            plugin.descriptor().capabilities,
            vec![Capability::Action, Capability::ChannelMode]
        );
        assert!(plugin.matches("toy"));
    }

    #[tokio::test]
    async fn function_action_passes_raw_arguments() {
        let action = FunctionAction::sync(|args| Ok(args.to_uppercase())).with_follow_up(true);
        assert_eq!(action.function("treat").await.expect("ok"), "TREAT");
        assert!(action.follows_up());
    }
}
