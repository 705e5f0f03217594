use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// CoordinatorState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    Idle,
    Executing,
    Stuck,
    Disputing,
    Rotating,
    Completed,
    Failed,
    Cancelled,
}

impl CoordinatorState {
    /// Returns `true` for states no event leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CoordinatorState::Idle => "idle",
            CoordinatorState::Executing => "executing",
            CoordinatorState::Stuck => "stuck",
            CoordinatorState::Disputing => "disputing",
            CoordinatorState::Rotating => "rotating",
            CoordinatorState::Completed => "completed",
            CoordinatorState::Failed => "failed",
            CoordinatorState::Cancelled => "cancelled",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// CoordinatorEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorEvent {
    /// `execute_task` was called.
    Start,
    /// The primary stalled.
    Stall,
    /// A helper unblocked the primary.
    Recover,
    /// Primary and assistant disagree.
    Dispute,
    /// The arbitrator ruled.
    Settle,
    /// The primary needs a break.
    Fatigue,
    /// The primary is back.
    Return,
    /// Every assigned subtask is done.
    Complete,
    Fail,
    Cancel,
}

impl fmt::Display for CoordinatorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CoordinatorEvent::Start => "start",
            CoordinatorEvent::Stall => "stall",
            CoordinatorEvent::Recover => "recover",
            CoordinatorEvent::Dispute => "dispute",
            CoordinatorEvent::Settle => "settle",
            CoordinatorEvent::Fatigue => "fatigue",
            CoordinatorEvent::Return => "return",
            CoordinatorEvent::Complete => "complete",
            CoordinatorEvent::Fail => "fail",
            CoordinatorEvent::Cancel => "cancel",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// An event was applied in a state that does not accept it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    #[error("invalid transition: cannot apply {event} in state {state}")]
    InvalidTransition {
        state: CoordinatorState,
        event: CoordinatorEvent,
    },
}

// ---------------------------------------------------------------------------
// CoordinatorStateMachine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CoordinatorStateMachine {
    current: CoordinatorState,
    history: Vec<(CoordinatorState, CoordinatorEvent, CoordinatorState)>,
}

impl CoordinatorStateMachine {
    /// Create a new state machine starting in `Idle`.
    pub fn new() -> Self {
        Self {
            current: CoordinatorState::Idle,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.current
    }

    /// Return the full transition history.
    pub fn history(&self) -> &[(CoordinatorState, CoordinatorEvent, CoordinatorState)] {
        &self.history
    }

    fn next(state: CoordinatorState, event: CoordinatorEvent) -> Option<CoordinatorState> {
        use CoordinatorEvent as E;
        use CoordinatorState as S;

        let next = match (state, event) {
            (S::Idle, E::Start) => S::Executing,
            (S::Executing, E::Stall) => S::Stuck,
            (S::Stuck, E::Recover) => S::Executing,
            (S::Executing, E::Dispute) => S::Disputing,
            (S::Disputing, E::Settle) => S::Executing,
            (S::Executing, E::Fatigue) => S::Rotating,
            (S::Rotating, E::Return) => S::Executing,
            (S::Executing, E::Complete) => S::Completed,
            (S::Executing | S::Stuck | S::Disputing | S::Rotating, E::Fail) => S::Failed,
            (s, E::Cancel) if !s.is_terminal() => S::Cancelled,
            _ => return None,
        };
        Some(next)
    }

    /// Attempt a state transition driven by `event`.
    ///
    /// Valid transitions:
    /// - Idle      + Start    -> Executing
    /// - Executing + Stall    -> Stuck
    /// - Stuck     + Recover  -> Executing
    /// - Executing + Dispute  -> Disputing
    /// - Disputing + Settle   -> Executing
    /// - Executing + Fatigue  -> Rotating
    /// - Rotating  + Return   -> Executing
    /// - Executing + Complete -> Completed
    /// - any running state + Fail -> Failed
    /// - any non-terminal state + Cancel -> Cancelled
    pub fn transition(
        &mut self,
        event: CoordinatorEvent,
    ) -> Result<CoordinatorState, StateMachineError> {
        let next = Self::next(self.current, event).ok_or(StateMachineError::InvalidTransition {
            state: self.current,
            event,
        })?;

        let from = self.current;
        self.current = next;
        self.history.push((from, event, next));
        tracing::debug!(from = %from, event = %event, to = %next, "coordinator state transition");
        Ok(next)
    }

    /// Returns `true` if the given event is valid in the current state.
    pub fn can_transition(&self, event: CoordinatorEvent) -> bool {
        Self::next(self.current, event).is_some()
    }
}

impl Default for CoordinatorStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
