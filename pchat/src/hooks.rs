//! Turn observability hooks.
//!
//! ```rust
//! use pchat::{NoopTurnHooks, TurnHooks};
//!
//! fn assert_hooks_trait(_hooks: &dyn TurnHooks) {}
//!
//! assert_hooks_trait(&NoopTurnHooks);
//! ```

use std::time::Duration;

use pcommon::{SessionId, TurnId};

use crate::{ChatError, TurnPhase};

pub trait TurnHooks: Send + Sync {
    fn on_turn_start(&self, _session: &SessionId, _turn: &TurnId, _continuation: bool) {}

    fn on_phase_change(&self, _session: &SessionId, _turn: &TurnId, _phase: TurnPhase) {}

    fn on_turn_success(
        &self,
        _session: &SessionId,
        _turn: &TurnId,
        _rounds: u32,
        _elapsed: Duration,
    ) {
    }

    fn on_turn_failure(
        &self,
        _session: &SessionId,
        _turn: &TurnId,
        _error: &ChatError,
        _elapsed: Duration,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTurnHooks;

impl TurnHooks for NoopTurnHooks {}
