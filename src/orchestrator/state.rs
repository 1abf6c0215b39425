use std::fmt;

use serde::{Deserialize, Serialize};

/// Progress of one form through the fill pipeline.
///
/// ```text
/// Idle -> Connected -> SnapshotCaptured -> PlanReceived -> Executing -> Completed
///            |                |                  |
///            +----------------+------------------+--> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormState {
    Idle,
    Connected,
    SnapshotCaptured,
    PlanReceived,
    Executing,
    Completed,
    Failed,
}

impl FormState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FormState::Completed | FormState::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: FormState) -> bool {
        use FormState::*;
        matches!(
            (self, next),
            (Idle, Connected)
                | (Idle, Failed)
                | (Connected, SnapshotCaptured)
                | (Connected, Failed)
                | (SnapshotCaptured, PlanReceived)
                | (SnapshotCaptured, Failed)
                | (PlanReceived, Executing)
                | (PlanReceived, Failed)
                | (Executing, Completed)
        )
    }
}

impl fmt::Display for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormState::Idle => "idle",
            FormState::Connected => "connected",
            FormState::SnapshotCaptured => "snapshot_captured",
            FormState::PlanReceived => "plan_received",
            FormState::Executing => "executing",
            FormState::Completed => "completed",
            FormState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Records the path a form takes through `FormState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormProgress {
    state: FormState,
    history: Vec<FormState>,
}

impl Default for FormProgress {
    fn default() -> Self {
        Self {
            state: FormState::Idle,
            history: vec![FormState::Idle],
        }
    }
}

impl FormProgress {
    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn history(&self) -> &[FormState] {
        &self.history
    }

    /// Move to `next`. Illegal moves are ignored and reported as `false`.
    pub fn advance(&mut self, next: FormState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!(from = %self.state, to = %next, "ignoring illegal form transition");
            return false;
        }
        tracing::debug!(from = %self.state, to = %next, "form state");
        self.state = next;
        self.history.push(next);
        true
    }
}
