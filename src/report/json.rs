use crate::report::report_model::BatchReport;

/// Pretty-printed JSON rendering of a batch report.
pub fn generate_json_report(report: &BatchReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
