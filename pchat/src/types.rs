//! Turn phases, response events, and turn results.

use std::sync::Arc;

use pcommon::TurnId;
use pplugin::ActionOutcome;
use pprovider::TokenUsage;

/// `Idle -> AwaitingBackend -> ActionResolution -> Finalizing -> Idle`, with
/// `Error` reachable from every non-idle phase. A failed turn leaves the core
/// in `Error` until the next turn starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    AwaitingBackend,
    ActionResolution,
    Finalizing,
    Error,
}

impl TurnPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingBackend => "awaiting_backend",
            Self::ActionResolution => "action_resolution",
            Self::Finalizing => "finalizing",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    /// Incremental backend text; only emitted when streaming.
    Delta(String),
    /// Resolved text of one backend round, markers already replaced.
    Complete(String),
}

pub type ResponseHandler = Arc<dyn Fn(ResponseEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurnResult {
    pub turn_id: TurnId,
    /// Round texts joined with `'\n'`.
    pub text: String,
    /// Backend calls made, the first one included.
    pub rounds: u32,
    pub usage: TokenUsage,
    pub actions: Vec<ActionOutcome>,
}
