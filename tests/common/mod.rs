#![allow(dead_code)]

use std::time::Duration;

use form_autofill::backend::memory::MemoryBackend;
use form_autofill::executor::executor::{ActionExecutor, ExecutorConfig};
use form_autofill::executor::settle::Settle;
use form_autofill::oracle::oracle::StaticOracle;
use form_autofill::orchestrator::orchestrator::{FillOrchestrator, OrchestratorConfig};
use form_autofill::plan::builder::FormValues;
use form_autofill::resolve::resolver::ElementResolver;
use form_autofill::tree::tree_model::UIElementNode;

pub const APP: &str = "ProSeries";

// ============================================================================
// Trees
// ============================================================================

pub fn text_field(title: &str, identifier: &str) -> UIElementNode {
    UIElementNode::new("AXTextField")
        .with_title(title)
        .with_identifier(identifier)
        .with_value("")
        .with_enabled(true)
        .with_visible(true)
}

pub fn label(title: &str) -> UIElementNode {
    UIElementNode::new("AXStaticText")
        .with_title(title)
        .with_enabled(true)
        .with_visible(true)
}

pub fn button(title: &str, identifier: &str) -> UIElementNode {
    UIElementNode::new("AXButton")
        .with_title(title)
        .with_identifier(identifier)
        .with_enabled(true)
        .with_visible(true)
}

/// A W-2 entry window. Pre-order: each label precedes the field it names.
///
/// ```text
/// AXWindow "W-2 Entry"
///   AXGroup "Employee"
///     AXStaticText "Employee Name"
///     AXTextField  "Employee Name"                 txtEmployeeName
///     AXStaticText "Employee SSN"
///     AXTextField  "Employee SSN"                  txtSSN
///   AXGroup "Wages"
///     AXTextField  "Wages, tips, other comp."      txtWages
///     AXTextField  "Federal income tax withheld"   txtFedTax
///   AXComboBox "State"                             cboState
///   AXButton "OK"                                  btnOK
///   AXButton "Cancel"                              btnCancel
/// ```
pub fn w2_form() -> UIElementNode {
    UIElementNode::new("AXWindow")
        .with_title("W-2 Entry")
        .with_enabled(true)
        .with_visible(true)
        .with_children([
            UIElementNode::new("AXGroup")
                .with_title("Employee")
                .with_visible(true)
                .with_children([
                    label("Employee Name"),
                    text_field("Employee Name", "txtEmployeeName"),
                    label("Employee SSN"),
                    text_field("Employee SSN", "txtSSN"),
                ]),
            UIElementNode::new("AXGroup")
                .with_title("Wages")
                .with_visible(true)
                .with_children([
                    text_field("Wages, tips, other comp.", "txtWages"),
                    text_field("Federal income tax withheld", "txtFedTax"),
                ]),
            UIElementNode::new("AXComboBox")
                .with_title("State")
                .with_identifier("cboState")
                .with_enabled(true)
                .with_visible(true),
            button("OK", "btnOK"),
            button("Cancel", "btnCancel"),
        ])
}

pub fn w2_backend() -> MemoryBackend {
    MemoryBackend::new(w2_form()).for_app(APP)
}

// ============================================================================
// Values and replies
// ============================================================================

pub fn values(pairs: &[(&str, &str)]) -> FormValues {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Mapping reply in the shape the oracle is asked for, wrapped in prose and a
/// fenced block the way chat models tend to answer.
pub fn mapping_reply(entries: &[(&str, &str, &str)]) -> String {
    let mappings: Vec<serde_json::Value> = entries
        .iter()
        .map(|(field, title, identifier)| {
            serde_json::json!({
                "data_field": field,
                "ui_title": title,
                "ui_identifier": identifier,
                "ui_path": format!("Window > {}", title),
                "confidence": "high",
            })
        })
        .collect();
    let body = serde_json::json!({ "mappings": mappings, "instructions": "" });
    format!(
        "Here is the mapping:\n```json\n{}\n```\nLet me know if you need anything else.",
        serde_json::to_string_pretty(&body).unwrap()
    )
}

// ============================================================================
// Components with delays disabled
// ============================================================================

pub fn quiet_executor() -> ActionExecutor {
    ActionExecutor::new(
        ElementResolver::default(),
        ExecutorConfig {
            settle: Settle::None,
            action_delay: Duration::ZERO,
        },
    )
}

pub fn orchestrator(
    backend: MemoryBackend,
    reply: &str,
) -> FillOrchestrator<MemoryBackend, StaticOracle> {
    FillOrchestrator::new(backend, StaticOracle::new(reply), OrchestratorConfig::new(APP))
        .with_executor(quiet_executor())
}
