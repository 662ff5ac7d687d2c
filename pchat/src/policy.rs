//! Turn policy knobs with documented defaults.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use pchat::ChatPolicy;
//!
//! let policy = ChatPolicy::default().with_system_prompt("You are Mochi, a small cat.");
//! assert_eq!(policy.max_action_rounds, 3);
//! assert_eq!(policy.history_token_budget, 4096);
//! assert_eq!(policy.request_timeout, Duration::from_secs(60));
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer};

pub const DEFAULT_MAX_ACTION_ROUNDS: u32 = 3;
pub const DEFAULT_HISTORY_TOKEN_BUDGET: usize = 4096;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChatPolicy {
    pub system_prompt: Option<String>,
    /// Follow-up backend calls allowed per turn after the first one.
    pub max_action_rounds: u32,
    /// Estimated tokens sent per request; live history is never truncated.
    pub history_token_budget: usize,
    /// Seconds when deserialized.
    #[serde(deserialize_with = "duration_from_secs")]
    pub request_timeout: Duration,
    pub stream: bool,
    /// Empty lets the adapter pick its fallback model.
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for ChatPolicy {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_action_rounds: DEFAULT_MAX_ACTION_ROUNDS,
            history_token_budget: DEFAULT_HISTORY_TOKEN_BUDGET,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            stream: false,
            model: String::new(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl ChatPolicy {
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_max_action_rounds(mut self, rounds: u32) -> Self {
        self.max_action_rounds = rounds;
        self
    }

    pub fn with_history_token_budget(mut self, budget: usize) -> Self {
        self.history_token_budget = budget;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

fn duration_from_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(serde::de::Error::custom(
            "request_timeout must be a positive number of seconds",
        ));
    }
    Duration::try_from_secs_f64(secs).map_err(|error| {
        serde::de::Error::custom(format!("request_timeout is out of range: {error}"))
    })
}
