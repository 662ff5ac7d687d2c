//! Runtime plugin registry with validated registration.
//!
//! ```rust
//! use pplugin::{FunctionAction, Plugin, PluginRegistry};
//!
//! let registry = PluginRegistry::new();
//! let plugin = Plugin::builder("Pet")
//!     .action(FunctionAction::sync(|_| Ok("purr".to_string())))
//!     .build()
//!     .expect("plugin");
//!
//! registry.add(plugin).expect("first registration");
//! assert_eq!(registry.names(), vec!["Pet"]);
//! assert!(registry.remove("pet").is_some());
//! ```

use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{ChannelModeDefinition, Plugin, PluginError};

/// Registration order is dispatch order. Readers take a snapshot so a plugin
/// added or removed mid-turn only affects phases that start afterwards.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<Vec<Arc<Plugin>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, plugin: Plugin) -> Result<Arc<Plugin>, PluginError> {
        let new_modes = plugin
            .channel_modes()
            .map(|provider| provider.custom_modes())
            .unwrap_or_default();

        let mut plugins = self.write()?;

        if plugins.iter().any(|existing| existing.matches(plugin.name())) {
            return Err(PluginError::registration(format!(
                "a plugin named '{}' is already registered",
                plugin.name()
            ))
            .with_plugin(plugin.name()));
        }

        validate_modes(&plugin, &new_modes, &plugins)?;

        let plugin = Arc::new(plugin);
        plugins.push(Arc::clone(&plugin));
        Ok(plugin)
    }

    /// Name lookup ignores ASCII case.
    pub fn remove(&self, name: &str) -> Option<Arc<Plugin>> {
        let mut plugins = self.write().ok()?;
        let index = plugins.iter().position(|plugin| plugin.matches(name))?;
        Some(plugins.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<Arc<Plugin>> {
        self.snapshot()
            .into_iter()
            .find(|plugin| plugin.matches(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn snapshot(&self) -> Vec<Arc<Plugin>> {
        self.read().map(|plugins| plugins.clone()).unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .map(|plugin| plugin.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().map(|plugins| plugins.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Arc<Plugin>>>, PluginError> {
        self.plugins
            .read()
            .map_err(|_| PluginError::other("plugin registry lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Arc<Plugin>>>, PluginError> {
        self.plugins
            .write()
            .map_err(|_| PluginError::other("plugin registry lock poisoned"))
    }
}

fn validate_modes(
    plugin: &Plugin,
    modes: &[ChannelModeDefinition],
    existing: &[Arc<Plugin>],
) -> Result<(), PluginError> {
    let reject =
        |message: String| Err(PluginError::registration(message).with_plugin(plugin.name()));

    let mut taken = existing
        .iter()
        .filter_map(|other| other.channel_modes())
        .flat_map(|provider| provider.custom_modes())
        .map(|mode| mode.mode_id.to_ascii_lowercase())
        .collect::<HashSet<_>>();

    for mode in modes {
        let (prefix, mode_name) = match mode.mode_id.split_once(':') {
            Some(parts) => parts,
            None => {
                return reject(format!(
                    "mode id '{}' must have the form '{}:<mode>'",
                    mode.mode_id,
                    plugin.name()
                ));
            }
        };

        if !prefix.eq_ignore_ascii_case(plugin.name()) || mode_name.trim().is_empty() {
            return reject(format!(
                "mode id '{}' must have the form '{}:<mode>'",
                mode.mode_id,
                plugin.name()
            ));
        }

        if !taken.insert(mode.mode_id.to_ascii_lowercase()) {
            return reject(format!("duplicate channel mode id '{}'", mode.mode_id));
        }
    }

    Ok(())
}
