use form_autofill::error::FillError;
use form_autofill::plan::builder::{RawAction, build_plan, plan_from_actions, plan_from_mappings, validate_action};
use form_autofill::plan::extract::{Proposal, extract_payload, parse_proposal};
use form_autofill::plan::plan_model::{ActionKind, Confidence, FieldMapping, PlanSource};
use form_autofill::resolve::criteria::{ElementCriteria, ResolveTarget};
use serde_json::json;

use crate::common::{mapping_reply, values};

mod common;

fn raw(kind: &str, target: Option<serde_json::Value>, value: Option<serde_json::Value>) -> RawAction {
    RawAction {
        kind: kind.to_string(),
        target,
        value,
        description: None,
    }
}

// ============================================================================
// Payload extraction
// ============================================================================

#[test]
fn extracts_fenced_block_before_anything_else() {
    let reply = "Sure! {not json}\n```json\n{\"mappings\": []}\n```\n";
    assert_eq!(extract_payload(reply).unwrap(), json!({"mappings": []}));
}

#[test]
fn extracts_bare_reply() {
    let reply = r#"  [{"type": "tab"}]  "#;
    assert_eq!(extract_payload(reply).unwrap(), json!([{"type": "tab"}]));
}

#[test]
fn extracts_outermost_object_from_prose() {
    let reply = r#"The mapping is {"mappings": [{"data_field": "wages", "ui_title": "Wages"}]} as requested."#;
    let payload = extract_payload(reply).unwrap();
    assert_eq!(payload["mappings"][0]["data_field"], "wages");
}

#[test]
fn brackets_in_prose_do_not_hide_the_object() {
    let reply = r#"Based on the tree [see below], here is the mapping: {"mappings": [{"data_field": "wages", "ui_title": "Wages"}]}"#;
    let payload = extract_payload(reply).unwrap();
    assert_eq!(payload["mappings"][0]["ui_title"], "Wages");

    let reply = r#"Note {draft}: [{"type": "tab"}]"#;
    assert_eq!(extract_payload(reply).unwrap(), json!([{"type": "tab"}]));
}

#[test]
fn reply_without_json_is_a_mapping_error() {
    for reply in ["", "I could not find any fields.", "{broken", "42"] {
        assert!(
            matches!(extract_payload(reply), Err(FillError::Mapping(_))),
            "reply {:?} should not extract",
            reply
        );
    }
}

#[test]
fn mapping_error_is_form_fatal() {
    let err = parse_proposal("no json here").unwrap_err();
    assert!(err.is_form_fatal());
    assert!(!FillError::ElementNotFound("x".into()).is_form_fatal());
    assert!(!FillError::ActionExecution("x".into()).is_form_fatal());
}

// ============================================================================
// Proposal shapes
// ============================================================================

#[test]
fn mappings_object_becomes_mapping_proposal() {
    let reply = mapping_reply(&[("wages", "Wages", "txtWages")]);
    match parse_proposal(&reply).unwrap() {
        Proposal::Mappings { entries, .. } => assert_eq!(entries.len(), 1),
        other => panic!("expected mappings, got {:?}", other),
    }
}

#[test]
fn actions_object_and_bare_array_become_action_proposals() {
    let wrapped = r#"{"actions": [{"type": "tab"}, {"type": "wait", "value": 2}]}"#;
    assert!(matches!(parse_proposal(wrapped).unwrap(), Proposal::Actions(a) if a.len() == 2));

    let bare = r#"[{"type": "click", "target": "OK"}]"#;
    assert!(matches!(parse_proposal(bare).unwrap(), Proposal::Actions(a) if a.len() == 1));
}

#[test]
fn bare_array_of_field_mappings_is_recognised() {
    let reply = r#"[{"data_field": "wages", "ui_title": "Wages"}]"#;
    assert!(matches!(parse_proposal(reply).unwrap(), Proposal::Mappings { .. }));
}

#[test]
fn object_without_known_key_is_rejected() {
    assert!(matches!(
        parse_proposal(r#"{"fields": []}"#),
        Err(FillError::Mapping(_))
    ));
}

// ============================================================================
// Plan construction
// ============================================================================

#[test]
fn unknown_action_kind_is_rejected_without_dropping_the_rest() {
    let reply = r#"[
        {"type": "set_text", "target": "Employee Name", "value": "John Smith"},
        {"type": "double_click", "target": "OK"},
        {"type": "click", "target": "OK"}
    ]"#;
    let proposal = parse_proposal(reply).unwrap();
    let plan = build_plan(&proposal, &values(&[]));

    assert_eq!(plan.source, PlanSource::Actions);
    assert_eq!(plan.len(), 2);
    assert_eq!(plan.validation_failures(), 1);
    assert_eq!(plan.rejected[0].index, 1);
    assert_eq!(plan.actions[0].kind, ActionKind::SetText);
    assert_eq!(plan.actions[1].kind, ActionKind::Click);
}

#[test]
fn mappings_become_set_text_actions_in_order() {
    let reply = mapping_reply(&[
        ("employee_name", "Employee Name", "txtEmployeeName"),
        ("wages", "Wages, tips, other comp.", "txtWages"),
    ]);
    let proposal = parse_proposal(&reply).unwrap();
    let plan = build_plan(
        &proposal,
        &values(&[("employee_name", "John Smith"), ("wages", "75000.00")]),
    );

    assert_eq!(plan.source, PlanSource::Mappings);
    assert_eq!(plan.len(), 2);
    assert!(plan.actions.iter().all(|a| a.kind == ActionKind::SetText));
    assert_eq!(plan.actions[0].value.as_deref(), Some("John Smith"));
    assert_eq!(
        plan.actions[1].target,
        Some(ResolveTarget::Criteria(
            ElementCriteria::by_title("Wages, tips, other comp.").with_identifier("txtWages")
        ))
    );
}

#[test]
fn mappings_for_fields_without_values_are_dropped_silently() {
    let mappings = vec![
        FieldMapping::new("employee_name").with_title("Employee Name"),
        FieldMapping::new("allocated_tips").with_title("Allocated tips"),
        FieldMapping::new("state_tax").with_title("State income tax"),
    ];
    let plan = plan_from_mappings(
        &mappings,
        &values(&[("employee_name", "Jane Doe"), ("state_tax", "")]),
    );

    assert_eq!(plan.len(), 1);
    assert_eq!(plan.validation_failures(), 0);
}

#[test]
fn mapping_naming_no_element_is_rejected() {
    let reply = r#"{"mappings": [
        {"data_field": "wages", "ui_title": "", "confidence": "low"},
        {"data_field": "employee_name", "ui_identifier": "txtEmployeeName"},
        {"ui_title": "orphan"}
    ]}"#;
    let proposal = parse_proposal(reply).unwrap();
    let plan = build_plan(
        &proposal,
        &values(&[("wages", "100.00"), ("employee_name", "Jane Doe")]),
    );

    assert_eq!(plan.len(), 1);
    assert_eq!(plan.validation_failures(), 2);
    let indices: Vec<usize> = plan.rejected.iter().map(|f| f.index).collect();
    assert_eq!(indices, vec![0, 2]);
}

#[test]
fn confidence_is_read_leniently() {
    let mapping: FieldMapping =
        serde_json::from_value(json!({"data_field": "wages", "ui_title": "Wages", "confidence": "HIGH"})).unwrap();
    assert_eq!(mapping.confidence, Confidence::High);

    let mapping: FieldMapping =
        serde_json::from_value(json!({"data_field": "wages", "ui_title": "Wages", "confidence": "certain"})).unwrap();
    assert_eq!(mapping.confidence, Confidence::Medium);

    let mapping: FieldMapping = serde_json::from_value(json!({"data_field": "wages"})).unwrap();
    assert_eq!(mapping.confidence, Confidence::Medium);
}

// ============================================================================
// Action validation
// ============================================================================

#[test]
fn set_text_and_select_need_a_target_and_a_value() {
    assert!(validate_action(&raw("set_text", None, Some(json!("x")))).is_err());
    assert!(validate_action(&raw("set_text", Some(json!("Wages")), None)).is_err());
    assert!(validate_action(&raw("set_text", Some(json!("Wages")), Some(json!("")))).is_err());
    assert!(validate_action(&raw("select", Some(json!("State")), None)).is_err());
    assert!(validate_action(&raw("click", Some(json!("   ")), None)).is_err());

    let ok = validate_action(&raw("select", Some(json!("State")), Some(json!("NY")))).unwrap();
    assert_eq!(ok.kind, ActionKind::Select);
}

#[test]
fn scalar_values_are_stringified() {
    let action = validate_action(&raw("set_text", Some(json!("Wages")), Some(json!(75000.5)))).unwrap();
    assert_eq!(action.value.as_deref(), Some("75000.5"));

    let nested = validate_action(&raw("set_text", Some(json!("Wages")), Some(json!({"amount": 1}))));
    assert!(nested.is_err());
}

#[test]
fn object_targets_become_criteria() {
    let action = validate_action(&raw(
        "click",
        Some(json!({"title": "OK", "role": "button"})),
        Some(json!("ignored")),
    ))
    .unwrap();

    assert_eq!(
        action.target,
        Some(ResolveTarget::Criteria(ElementCriteria::by_title("OK").with_role("button")))
    );
    assert_eq!(action.value, None);
}

#[test]
fn wait_defaults_to_one_second_and_rejects_negative_values() {
    let default = validate_action(&raw("wait", None, None)).unwrap();
    assert_eq!(default.wait_duration().as_secs_f64(), 1.0);

    let garbled = validate_action(&raw("wait", None, Some(json!("soon")))).unwrap();
    assert_eq!(garbled.wait_duration().as_secs_f64(), 1.0);

    let explicit = validate_action(&raw("wait", None, Some(json!("2.5")))).unwrap();
    assert_eq!(explicit.wait_duration().as_millis(), 2500);

    assert!(validate_action(&raw("wait", None, Some(json!(-3)))).is_err());
}

#[test]
fn oversized_waits_are_rejected_with_the_rest_kept() {
    assert!(validate_action(&raw("wait", None, Some(json!("1e20")))).is_err());
    assert!(validate_action(&raw("wait", None, Some(json!(601)))).is_err());
    assert!(validate_action(&raw("wait", None, Some(json!(600)))).is_ok());

    let proposal =
        parse_proposal(r#"{"actions": [{"type": "wait", "value": "1e20"}, {"type": "click", "target": "OK"}]}"#)
            .unwrap();
    let plan = build_plan(&proposal, &values(&[]));
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.rejected.len(), 1);
    assert_eq!(plan.actions[0].kind, ActionKind::Click);
}

#[test]
fn tab_never_carries_a_target() {
    let action = validate_action(&raw("tab", Some(json!("Wages")), Some(json!("x")))).unwrap();
    assert_eq!(action.kind, ActionKind::Tab);
    assert_eq!(action.target, None);
    assert_eq!(action.value, None);
}

#[test]
fn action_kind_aliases_are_accepted() {
    let entries: Vec<RawAction> = serde_json::from_value(json!([
        {"action": "click", "target": "OK"},
        {"type": "TAB"},
        {"kind": "set_text", "target": "Wages", "value": "1.00"}
    ]))
    .unwrap();
    let plan = plan_from_actions(&entries);

    assert_eq!(plan.validation_failures(), 0);
    let kinds: Vec<ActionKind> = plan.actions.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![ActionKind::Click, ActionKind::Tab, ActionKind::SetText]);
}
