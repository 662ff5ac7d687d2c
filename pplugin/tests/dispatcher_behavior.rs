use std::sync::{Arc, Mutex};
use std::time::Duration;

use pplugin::prelude::*;
use pplugin::{DispatchHooks, LifecyclePhase, PluginErrorKind};

#[derive(Default)]
struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    fn push(&self, entry: String) {
        self.entries.lock().expect("journal lock").push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.entries.lock().expect("journal lock").clone()
    }
}

struct RecordingLifecycle {
    name: &'static str,
    journal: Arc<Journal>,
    fail_response_start: bool,
}

impl LifecyclePlugin for RecordingLifecycle {
    fn on_processing_start<'a>(
        &'a self,
        context: &'a ProcessingContext,
    ) -> PluginFuture<'a, Result<Option<TurnState>, PluginError>> {
        Box::pin(async move {
            self.journal
                .push(format!("{}:start:{}", self.name, context.user_input()));
            Ok(Some(Box::new(self.name.len()) as TurnState))
        })
    }

    fn on_response_start<'a>(
        &'a self,
        _context: &'a ProcessingContext,
        response: &'a str,
    ) -> PluginFuture<'a, Result<(), PluginError>> {
        Box::pin(async move {
            self.journal.push(format!("{}:response:{response}", self.name));
            if self.fail_response_start {
                return Err(PluginError::execution("mood sensor unplugged"));
            }
            Ok(())
        })
    }

    fn on_processing_complete<'a>(
        &'a self,
        _context: &'a ProcessingContext,
        final_text: &'a str,
    ) -> PluginFuture<'a, Result<(), PluginError>> {
        Box::pin(async move {
            self.journal.push(format!("{}:complete:{final_text}", self.name));
            Ok(())
        })
    }

    fn on_processing_error<'a>(
        &'a self,
        _context: &'a ProcessingContext,
        failure: &'a ProcessingFailure,
    ) -> PluginFuture<'a, Result<(), PluginError>> {
        Box::pin(async move {
            self.journal.push(format!(
                "{}:error:{}:{}",
                self.name,
                failure.plugin().unwrap_or("-"),
                failure.phase
            ));
            Ok(())
        })
    }
}

#[derive(Default)]
struct RecordingHooks {
    events: Mutex<Vec<String>>,
}

impl DispatchHooks for RecordingHooks {
    fn on_hook_failure(&self, plugin: &str, phase: LifecyclePhase, _error: &PluginError) {
        self.events
            .lock()
            .expect("events lock")
            .push(format!("hook_failure:{plugin}:{}", phase.as_str()));
    }

    fn on_action_start(&self, plugin: &str, arguments: &str) {
        self.events
            .lock()
            .expect("events lock")
            .push(format!("action_start:{plugin}:{arguments}"));
    }

    fn on_unmatched_marker(&self, name: &str) {
        self.events
            .lock()
            .expect("events lock")
            .push(format!("unmatched:{name}"));
    }
}

fn lifecycle_plugin(name: &'static str, journal: &Arc<Journal>, fail: bool) -> Plugin {
    Plugin::builder(name)
        .lifecycle(RecordingLifecycle {
            name,
            journal: Arc::clone(journal),
            fail_response_start: fail,
        })
        .build()
        .expect("lifecycle plugin should build")
}

#[tokio::test]
async fn failing_response_hook_is_isolated_and_reported_to_every_plugin() {
    let journal = Arc::new(Journal::default());
    let registry = Arc::new(PluginRegistry::new());
    for (name, fail) in [("Alpha", false), ("Beta", true), ("Gamma", false)] {
        registry
            .add(lifecycle_plugin(name, &journal, fail))
            .expect("register");
    }

    let hooks = Arc::new(RecordingHooks::default());
    let dispatcher = PluginDispatcher::new(registry).with_hooks(hooks.clone());
    let context = ProcessingContext::new("hello");

    let failures = dispatcher.response_start(&context, "meow").await;

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].plugin.as_deref(), Some("Beta"));
    assert_eq!(
        journal.entries(),
        vec![
            "Alpha:response:meow",
            "Beta:response:meow",
            "Gamma:response:meow",
            "Alpha:error:Beta:response_start",
            "Beta:error:Beta:response_start",
            "Gamma:error:Beta:response_start",
        ]
    );
    assert_eq!(
        hooks.events.lock().expect("events lock").clone(),
        vec!["hook_failure:Beta:response_start"]
    );
}

#[tokio::test]
async fn start_hook_state_is_visible_for_the_rest_of_the_turn() {
    let journal = Arc::new(Journal::default());
    let registry = Arc::new(PluginRegistry::new());
    registry
        .add(lifecycle_plugin("Mood", &journal, false))
        .expect("register");

    let dispatcher = PluginDispatcher::new(registry);
    let mut context = ProcessingContext::new("pet me");

    assert!(dispatcher.processing_start(&mut context).await.is_empty());
    assert_eq!(context.state::<usize>("Mood"), Some(&4));
    assert_eq!(journal.entries(), vec!["Mood:start:pet me"]);
}

#[tokio::test]
async fn unregistered_marker_stays_literal() {
    let registry = Arc::new(PluginRegistry::new());
    let hooks = Arc::new(RecordingHooks::default());
    let dispatcher = PluginDispatcher::new(registry).with_hooks(hooks.clone());
    let context = ProcessingContext::new("hi");

    let resolution = dispatcher
        .resolve_actions(&context, "Let me [Dance:fast] for you.")
        .await;

    assert_eq!(resolution.text, "Let me [Dance:fast] for you.");
    assert!(resolution.outcomes.is_empty());
    assert_eq!(
        hooks.events.lock().expect("events lock").clone(),
        vec!["unmatched:Dance"]
    );
}

#[tokio::test]
async fn matched_marker_is_replaced_by_the_action_result() {
    let calls = Arc::new(Mutex::new(Vec::<String>::new()));
    let recorded = Arc::clone(&calls);

    let registry = Arc::new(PluginRegistry::new());
    registry
        .add(
            Plugin::builder("Feed")
                .action(FunctionAction::sync(move |args| {
                    recorded.lock().expect("calls lock").push(args.to_string());
                    Ok("fed".to_string())
                }))
                .build()
                .expect("feed plugin"),
        )
        .expect("register");

    let dispatcher = PluginDispatcher::new(registry);
    let context = ProcessingContext::new("I'm hungry");

    let resolution = dispatcher
        .resolve_actions(&context, "Okay! [Feed:treat] Enjoy.")
        .await;

    assert_eq!(resolution.text, "Okay! fed Enjoy.");
    assert_eq!(calls.lock().expect("calls lock").clone(), vec!["treat"]);
    assert_eq!(resolution.outcomes.len(), 1);
    assert_eq!(resolution.outcomes[0].plugin, "Feed");
    assert!(!resolution.has_follow_up());
}

#[tokio::test]
async fn failed_action_keeps_marker_and_notifies_lifecycle_plugins() {
    let journal = Arc::new(Journal::default());
    let registry = Arc::new(PluginRegistry::new());
    registry
        .add(lifecycle_plugin("Watcher", &journal, false))
        .expect("register watcher");
    registry
        .add(
            Plugin::builder("Walk")
                .action(FunctionAction::sync(|_| {
                    Err(PluginError::execution("leash missing"))
                }))
                .build()
                .expect("walk plugin"),
        )
        .expect("register walk");

    let dispatcher = PluginDispatcher::new(registry);
    let context = ProcessingContext::new("walk?");

    let resolution = dispatcher.resolve_actions(&context, "Sure [walk] now").await;

    assert_eq!(resolution.text, "Sure [walk] now");
    let failures = resolution.failures().collect::<Vec<_>>();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].plugin.as_deref(), Some("Walk"));
    assert_eq!(
        journal.entries(),
        vec!["Watcher:error:Walk:action_resolution"]
    );
}

#[tokio::test]
async fn slow_action_times_out() {
    let registry = Arc::new(PluginRegistry::new());
    registry
        .add(
            Plugin::builder("Nap")
                .action(FunctionAction::new(|_| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok("zzz".to_string())
                }))
                .build()
                .expect("nap plugin"),
        )
        .expect("register");

    let dispatcher =
        PluginDispatcher::new(registry).with_action_timeout(Duration::from_millis(20));
    let context = ProcessingContext::new("sleepy?");

    let resolution = dispatcher.resolve_actions(&context, "[Nap]").await;

    assert_eq!(resolution.text, "[Nap]");
    let error = resolution.outcomes[0]
        .result
        .as_ref()
        .expect_err("action should time out");
    assert_eq!(error.kind, PluginErrorKind::Timeout);
}

#[tokio::test]
async fn follow_up_results_are_reported() {
    let registry = Arc::new(PluginRegistry::new());
    registry
        .add(
            Plugin::builder("Weather")
                .action(
                    FunctionAction::sync(|city| Ok(format!("sunny in {city}")))
                        .with_follow_up(true),
                )
                .build()
                .expect("weather plugin"),
        )
        .expect("register");

    let dispatcher = PluginDispatcher::new(registry);
    let context = ProcessingContext::new("weather?");
    let resolution = dispatcher
        .resolve_actions(&context, "[Weather:Oslo]")
        .await;

    assert_eq!(
        resolution.follow_ups().collect::<Vec<_>>(),
        vec![("Weather", "sunny in Oslo")]
    );
}

#[test]
fn mode_ids_must_be_prefixed_and_unique() {
    struct Modes(&'static str);

    impl ChannelModeProvider for Modes {
        fn custom_modes(&self) -> Vec<ChannelModeDefinition> {
            vec![ChannelModeDefinition::new(self.0, "Mode", "A custom mode")]
        }
    }

    let registry = PluginRegistry::new();
    let error = registry
        .add(
            Plugin::builder("Game")
                .channel_modes(Modes("Other:quiz"))
                .build()
                .expect("plugin"),
        )
        .expect_err("wrong prefix");
    assert_eq!(error.kind, PluginErrorKind::Registration);

    registry
        .add(
            Plugin::builder("Game")
                .channel_modes(Modes("Game:quiz"))
                .build()
                .expect("plugin"),
        )
        .expect("valid mode");

    let error = registry
        .add(
            Plugin::builder("game")
                .channel_modes(Modes("Game:trivia"))
                .build()
                .expect("plugin"),
        )
        .expect_err("duplicate plugin name");
    assert_eq!(error.kind, PluginErrorKind::Registration);

    let dispatcher = PluginDispatcher::new(Arc::new(registry));
    assert_eq!(dispatcher.custom_modes()[0].mode_id, "Game:quiz");
}

#[test]
fn dynamic_info_joins_non_empty_contributions() {
    struct Info(&'static str);

    impl DynamicInfoProvider for Info {
        fn dynamic_info(&self) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    let registry = Arc::new(PluginRegistry::new());
    for (name, info) in [("Clock", "It is noon."), ("Blank", "  "), ("Mood", "Pet is happy.")] {
        registry
            .add(
                Plugin::builder(name)
                    .dynamic_info(Info(info))
                    .build()
                    .expect("plugin"),
            )
            .expect("register");
    }

    let dispatcher = PluginDispatcher::new(registry);
    assert_eq!(
        dispatcher.dynamic_info().as_deref(),
        Some("It is noon.\nPet is happy.")
    );
}

struct Janitor {
    registry: Arc<PluginRegistry>,
    journal: Arc<Journal>,
}

impl LifecyclePlugin for Janitor {
    fn on_processing_start<'a>(
        &'a self,
        _context: &'a ProcessingContext,
    ) -> PluginFuture<'a, Result<Option<TurnState>, PluginError>> {
        Box::pin(async move { Ok(None) })
    }

    fn on_response_start<'a>(
        &'a self,
        _context: &'a ProcessingContext,
        _response: &'a str,
    ) -> PluginFuture<'a, Result<(), PluginError>> {
        Box::pin(async move {
            self.registry.remove("Beta");
            self.registry
                .add(lifecycle_plugin("Gamma", &self.journal, false))?;
            Ok(())
        })
    }

    fn on_processing_complete<'a>(
        &'a self,
        _context: &'a ProcessingContext,
        _final_text: &'a str,
    ) -> PluginFuture<'a, Result<(), PluginError>> {
        Box::pin(async move { Ok(()) })
    }

    fn on_processing_error<'a>(
        &'a self,
        _context: &'a ProcessingContext,
        _failure: &'a ProcessingFailure,
    ) -> PluginFuture<'a, Result<(), PluginError>> {
        Box::pin(async move { Ok(()) })
    }
}

#[tokio::test]
async fn registry_changes_mid_phase_apply_from_the_next_phase() {
    let journal = Arc::new(Journal::default());
    let registry = Arc::new(PluginRegistry::new());
    registry
        .add(
            Plugin::builder("Janitor")
                .lifecycle(Janitor {
                    registry: Arc::clone(&registry),
                    journal: Arc::clone(&journal),
                })
                .build()
                .expect("janitor plugin"),
        )
        .expect("register janitor");
    registry
        .add(lifecycle_plugin("Beta", &journal, false))
        .expect("register beta");
    let dispatcher = PluginDispatcher::new(Arc::clone(&registry));

    let context = ProcessingContext::new("tidy up");
    let failures = dispatcher.response_start(&context, "meow").await;
    assert!(failures.is_empty());
    assert_eq!(journal.entries(), vec!["Beta:response:meow"]);
    assert_eq!(registry.names(), vec!["Janitor", "Gamma"]);

    dispatcher.processing_complete(&context, "meow").await;
    assert_eq!(
        journal.entries(),
        vec!["Beta:response:meow", "Gamma:complete:meow"]
    );
}
