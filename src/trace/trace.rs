use serde::Serialize;

use crate::executor::result::{FillResult, FillSummary};
use crate::tree::snapshot::now_ms;

/// One line of the JSONL execution trace.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u64,
    pub form_index: usize,

    /// "action" for an executed action, "form" for a form's outcome
    pub event: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TraceEvent {
    pub fn now(form_index: usize, event: &'static str, status: impl ToString) -> Self {
        Self {
            timestamp_ms: now_ms(),
            form_index,
            event,
            action_index: None,
            kind: None,
            target: None,
            status: status.to_string(),
            strategy: None,
            detail: None,
        }
    }

    pub fn for_action(form_index: usize, result: &FillResult) -> Self {
        let status = serde_json::to_value(result.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{:?}", result.status));

        let mut event = Self::now(form_index, "action", status);
        event.action_index = Some(result.action_index);
        event.kind = Some(result.kind.to_string());
        event.target = Some(result.target_label.clone());
        event.strategy = result.strategy.map(|s| format!("{:?}", s));
        event.detail = result.detail.clone();
        event
    }

    pub fn for_form(form_index: usize, summary: &FillSummary) -> Self {
        let mut event = Self::now(form_index, "form", summary.final_state);
        event.detail = Some(match &summary.failure {
            Some(failure) => format!("{:?}: {}", failure.stage, failure.message),
            None => format!(
                "filled={} skipped={} failed={}",
                summary.filled, summary.skipped, summary.failed
            ),
        });
        event
    }
}
