//! Per-turn processing context.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::time::SystemTime;

use pcommon::{MetadataMap, TurnId};

use crate::TurnState;

/// Created when a turn starts and passed by reference to every later hook of
/// that turn. Never shared across turns and never persisted.
pub struct ProcessingContext {
    turn_id: TurnId,
    user_input: String,
    started_at: SystemTime,
    continuation: bool,
    states: HashMap<String, TurnState>,
    metadata: MetadataMap,
}

impl ProcessingContext {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            turn_id: TurnId::generate(),
            user_input: user_input.into(),
            started_at: SystemTime::now(),
            continuation: false,
            states: HashMap::new(),
            metadata: MetadataMap::new(),
        }
    }

    /// Context for a function-call continuation that has no user turn to join.
    /// Start hooks are skipped, so no plugin state is ever attached.
    pub fn continuation(user_input: impl Into<String>) -> Self {
        let mut context = Self::new(user_input);
        context.continuation = true;
        context
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn turn_id(&self) -> &TurnId {
        &self.turn_id
    }

    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    pub fn is_continuation(&self) -> bool {
        self.continuation
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    /// State returned by `plugin`'s start hook, if it has type `T`.
    pub fn state<T: Any>(&self, plugin: &str) -> Option<&T> {
        self.states.get(plugin)?.downcast_ref::<T>()
    }

    pub fn has_state(&self, plugin: &str) -> bool {
        self.states.contains_key(plugin)
    }

    pub(crate) fn insert_state(&mut self, plugin: &str, state: TurnState) {
        self.states.insert(plugin.to_string(), state);
    }
}

impl Debug for ProcessingContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut plugins = self.states.keys().collect::<Vec<_>>();
        plugins.sort();

        f.debug_struct("ProcessingContext")
            .field("turn_id", &self.turn_id)
            .field("user_input", &self.user_input)
            .field("continuation", &self.continuation)
            .field("states", &plugins)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_state_is_recovered_by_plugin_name() {
        let mut context = ProcessingContext::new("hello");
        context.insert_state("Mood", Box::new(7_u8));

        assert_eq!(context.state::<u8>("Mood"), Some(&7));
        assert_eq!(context.state::<String>("Mood"), None);
        assert_eq!(context.state::<u8>("Feed"), None);
    }

    #[test]
    fn each_context_gets_its_own_turn_id() {
        let first = ProcessingContext::new("a");
        let second = ProcessingContext::continuation("b");
        assert_ne!(first.turn_id(), second.turn_id());
        assert!(second.is_continuation());
        assert!(!first.is_continuation());
    }
}
