use serde::{Deserialize, Serialize};

use crate::executor::result::FillSummary;

// ============================================================================
// Batch report: aggregates the summaries of one batch run
// ============================================================================

/// One form's summary, labelled for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormReport {
    pub label: String,
    pub summary: FillSummary,
}

/// Aggregated report for a batch of forms.
///
/// Built from labelled summaries via `from_summaries()`. Consumed by the
/// console and JSON reporters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Number of records supplied
    pub total: usize,

    /// Forms actually attempted
    pub attempted: usize,

    /// Forms completed with nothing failed or skipped
    pub clean: usize,

    /// Forms that aborted or had failing actions
    pub with_failures: usize,

    pub filled: usize,
    pub skipped: usize,
    pub failed: usize,

    /// The batch stopped before every record was attempted
    pub interrupted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    pub forms: Vec<FormReport>,
}

impl BatchReport {
    pub fn from_summaries(total: usize, forms: Vec<FormReport>) -> Self {
        let sum = |f: fn(&FillSummary) -> usize| forms.iter().map(|r| f(&r.summary)).sum::<usize>();
        Self {
            total,
            attempted: forms.len(),
            clean: forms.iter().filter(|r| r.summary.is_clean()).count(),
            with_failures: forms.iter().filter(|r| r.summary.has_failures()).count(),
            filled: sum(|s| s.filled),
            skipped: sum(|s| s.skipped),
            failed: sum(|s| s.failed),
            interrupted: forms.len() < total,
            duration_ms: None,
            forms,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// No form aborted and no action failed. Skipped fields do not count.
    pub fn all_succeeded(&self) -> bool {
        self.with_failures == 0 && !self.interrupted
    }
}
