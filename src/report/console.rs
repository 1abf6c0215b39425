use crate::executor::result::{FillStatus, FillSummary};
use crate::report::report_model::BatchReport;

// ============================================================================
// Console reporter: formatted terminal output
// ============================================================================

/// Format a batch report for terminal output.
///
/// Produces output like:
/// ```text
/// === Batch: w2.json ===
///
/// ✓ PASS  John Smith (2 filled, 0 skipped, 0 failed)
/// ✗ FAIL  Jane Doe (1 filled, 1 skipped, 1 failed)
///     [SKIP] #1 set_text Wages: Element not found: Wages
///     [FAIL] #2 click Submit: Action execution error: click refused
///
/// === Results: 1 clean, 1 with failures (2 total) in 12.3s ===
/// ```
pub fn format_console_report(title: &str, report: &BatchReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Batch: {} ===\n\n", title));

    for form in &report.forms {
        out.push_str(&format_form_line(&form.label, &form.summary));
    }

    if report.interrupted {
        out.push_str(&format!(
            "\n[INTERRUPTED] {} of {} forms attempted\n",
            report.attempted, report.total
        ));
    }

    out.push_str(&format!(
        "\n=== Results: {} clean, {} with failures ({} total)",
        report.clean, report.with_failures, report.attempted
    ));

    if let Some(ms) = report.duration_ms {
        let secs = ms as f64 / 1000.0;
        out.push_str(&format!(" in {:.1}s", secs));
    }

    out.push_str(" ===\n");

    out
}

/// Summary block for a single form, as printed by `fill`.
pub fn format_summary(label: &str, summary: &FillSummary) -> String {
    let mut out = format_form_line(label, summary);
    out.push_str(&format!(
        "    plan: {} actions, {} rejected, final state {}\n",
        summary.plan_size, summary.validation_failures, summary.final_state
    ));
    out
}

fn format_form_line(label: &str, summary: &FillSummary) -> String {
    let marker = if summary.has_failures() {
        "\u{2717} FAIL"
    } else {
        "\u{2713} PASS"
    };

    let mut out = format!(
        "{}  {} ({} filled, {} skipped, {} failed)\n",
        marker, label, summary.filled, summary.skipped, summary.failed
    );

    if let Some(ref failure) = summary.failure {
        out.push_str(&format!("    [ERROR] {:?}: {}\n", failure.stage, failure.message));
    }

    for result in &summary.details {
        let tag = match result.status {
            FillStatus::Filled => continue,
            FillStatus::SkippedNotFound => "SKIP",
            FillStatus::Failed => "FAIL",
        };
        let detail = result.detail.as_deref().unwrap_or("no detail");
        out.push_str(&format!(
            "    [{}] #{} {} {}: {}\n",
            tag, result.action_index, result.kind, result.target_label, detail
        ));
    }

    out
}
