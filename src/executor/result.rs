use serde::{Deserialize, Serialize};

use crate::orchestrator::state::FormState;
use crate::plan::plan_model::ActionKind;
use crate::resolve::resolver::MatchStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStatus {
    /// The action ran to completion
    Filled,
    /// No element matched the target
    SkippedNotFound,
    /// The element was found but the backend rejected the action
    Failed,
}

/// Outcome of one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillResult {
    pub action_index: usize,
    pub kind: ActionKind,
    pub target_label: String,
    pub status: FillStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<MatchStrategy>,
}

impl FillResult {
    pub fn filled(action_index: usize, kind: ActionKind, label: String) -> Self {
        Self {
            action_index,
            kind,
            target_label: label,
            status: FillStatus::Filled,
            detail: None,
            strategy: None,
        }
    }

    pub fn skipped(action_index: usize, kind: ActionKind, label: String, detail: String) -> Self {
        Self {
            status: FillStatus::SkippedNotFound,
            detail: Some(detail),
            ..Self::filled(action_index, kind, label)
        }
    }

    pub fn failed(action_index: usize, kind: ActionKind, label: String, detail: String) -> Self {
        Self {
            status: FillStatus::Failed,
            detail: Some(detail),
            ..Self::filled(action_index, kind, label)
        }
    }

    pub fn with_strategy(mut self, strategy: Option<MatchStrategy>) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Stage at which a form's attempt was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Connection,
    Snapshot,
    Mapping,
    Plan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormFailure {
    pub stage: FailureStage,
    pub message: String,
}

/// Aggregate outcome of one form. Always produced, even when the form
/// failed before any action ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillSummary {
    pub filled: usize,
    pub skipped: usize,
    pub failed: usize,
    pub details: Vec<FillResult>,
    pub plan_size: usize,
    pub validation_failures: usize,
    pub final_state: FormState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FormFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_fingerprint: Option<String>,
}

impl FillSummary {
    pub fn from_results(details: Vec<FillResult>, plan_size: usize, validation_failures: usize) -> Self {
        let count = |status: FillStatus| details.iter().filter(|r| r.status == status).count();
        Self {
            filled: count(FillStatus::Filled),
            skipped: count(FillStatus::SkippedNotFound),
            failed: count(FillStatus::Failed),
            details,
            plan_size,
            validation_failures,
            final_state: FormState::Completed,
            failure: None,
            snapshot_fingerprint: None,
        }
    }

    /// All-zero summary for a form abandoned at `stage`.
    pub fn aborted(stage: FailureStage, message: impl ToString) -> Self {
        Self {
            filled: 0,
            skipped: 0,
            failed: 0,
            details: Vec::new(),
            plan_size: 0,
            validation_failures: 0,
            final_state: FormState::Failed,
            failure: Some(FormFailure {
                stage,
                message: message.to_string(),
            }),
            snapshot_fingerprint: None,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: String) -> Self {
        self.snapshot_fingerprint = Some(fingerprint);
        self
    }

    /// Completed with nothing failed or skipped.
    pub fn is_clean(&self) -> bool {
        self.failure.is_none() && self.failed == 0 && self.skipped == 0
    }

    pub fn has_failures(&self) -> bool {
        self.failure.is_some() || self.failed > 0
    }
}
