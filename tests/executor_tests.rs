use std::time::Duration;

use form_autofill::backend::backend::{AccessibilityBackend, Keystroke};
use form_autofill::backend::memory::{BackendCall, MemoryBackend, Operation};
use form_autofill::executor::executor::{ActionExecutor, ExecutorConfig};
use form_autofill::executor::result::{FillStatus, FillSummary};
use form_autofill::executor::settle::{Settle, SettleMode};
use form_autofill::plan::plan_model::{Action, ActionPlan, PlanSource};
use form_autofill::resolve::criteria::{ElementCriteria, ResolveTarget};
use form_autofill::resolve::resolver::{ElementResolver, MatchStrategy};

use crate::common::{APP, quiet_executor, w2_backend};

mod common;

fn text(target: &str) -> ResolveTarget {
    ResolveTarget::Text(target.to_string())
}

fn run(backend: &mut MemoryBackend, actions: Vec<Action>) -> FillSummary {
    let root = backend.root(APP).unwrap();
    let plan = ActionPlan::new(PlanSource::Actions, actions);
    let results = quiet_executor().execute(backend, &root, &plan);
    FillSummary::from_results(results, plan.len(), 0)
}

// ============================================================================
// Isolation
// ============================================================================

#[test]
fn failing_action_does_not_stop_the_plan() {
    let mut backend = w2_backend()
        .failing(Operation::SetValue, "txtWages")
        .failing(Operation::SendKey, "txtWages");

    let summary = run(
        &mut backend,
        vec![
            Action::set_text(text("Employee Name"), "John Smith"),
            Action::set_text(text("txtWages"), "75000.00"),
            Action::click(text("OK")),
        ],
    );

    assert_eq!((summary.filled, summary.skipped, summary.failed), (2, 0, 1));
    assert_eq!(summary.details.len(), 3);
    assert_eq!(summary.details[1].status, FillStatus::Failed);
    assert!(summary.details[1]
        .detail
        .as_deref()
        .unwrap()
        .contains("keystroke fallback failed"));
    assert_eq!(backend.value_of("txtEmployeeName").as_deref(), Some("John Smith"));
    assert!(backend
        .calls()
        .iter()
        .any(|c| matches!(c, BackendCall::Click(h) if Some(h) == backend.handle_of("btnOK").as_ref())));
}

#[test]
fn missing_target_is_skipped_and_plan_continues() {
    let mut backend = w2_backend();

    let summary = run(
        &mut backend,
        vec![
            Action::set_text(text("Box 12a code"), "D"),
            Action::set_text(text("Employee SSN"), "123-45-6789"),
        ],
    );

    assert_eq!((summary.filled, summary.skipped, summary.failed), (1, 1, 0));
    let skipped = &summary.details[0];
    assert_eq!(skipped.status, FillStatus::SkippedNotFound);
    assert!(skipped.detail.as_deref().unwrap().starts_with("Element not found"));
    assert_eq!(backend.value_of("txtSSN").as_deref(), Some("123-45-6789"));
}

#[test]
fn results_follow_plan_order() {
    let mut backend = w2_backend();

    let summary = run(
        &mut backend,
        vec![
            Action::tab(),
            Action::set_text(text("txtFedTax"), "12500.00"),
            Action::wait(0.0),
            Action::click(text("Cancel")),
        ],
    );

    let indices: Vec<usize> = summary.details.iter().map(|r| r.action_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(summary.filled, 4);
}

// ============================================================================
// Primitives
// ============================================================================

#[test]
fn set_text_focuses_clears_then_assigns() {
    let mut backend = w2_backend();
    let root = backend.root(APP).unwrap();
    backend.clear_calls();

    let plan = ActionPlan::new(
        PlanSource::Mappings,
        vec![Action::set_text(
            ResolveTarget::Criteria(ElementCriteria::by_identifier("txtWages")),
            "75000.00",
        )],
    );
    let results = quiet_executor().execute(&mut backend, &root, &plan);

    let field = backend.handle_of("txtWages").unwrap();
    assert_eq!(
        backend.calls(),
        &[
            BackendCall::Focus(field.clone()),
            BackendCall::SetValue(field.clone(), String::new()),
            BackendCall::SetValue(field, "75000.00".into()),
        ]
    );
    assert_eq!(results[0].strategy, Some(MatchStrategy::Identifier));
}

#[test]
fn set_text_falls_back_to_keystrokes() {
    let mut backend = w2_backend().failing(Operation::SetValue, "txtEmployeeName");

    let summary = run(
        &mut backend,
        vec![Action::set_text(text("Employee Name"), "Jane Doe")],
    );

    assert_eq!(summary.filled, 1);
    assert_eq!(backend.value_of("txtEmployeeName").as_deref(), Some("Jane Doe"));
    assert!(backend
        .calls()
        .iter()
        .any(|c| matches!(c, BackendCall::SendKey(_, Keystroke::SelectAll))));
}

#[test]
fn keystroke_fallback_refocuses_the_field_first() {
    let mut backend = w2_backend().failing(Operation::Focus, "txtEmployeeName");
    let root = backend.root(APP).unwrap();
    backend.clear_calls();

    let plan = ActionPlan::new(
        PlanSource::Actions,
        vec![Action::set_text(text("Employee Name"), "Jane Doe")],
    );
    let results = quiet_executor().execute(&mut backend, &root, &plan);

    let field = backend.handle_of("txtEmployeeName").unwrap();
    assert_eq!(results[0].status, FillStatus::Filled);
    assert_eq!(
        backend.calls(),
        &[
            BackendCall::Focus(field.clone()),
            BackendCall::Focus(field.clone()),
            BackendCall::SendKey(field.clone(), Keystroke::SelectAll),
            BackendCall::SendKey(field, Keystroke::Type("Jane Doe".into())),
        ]
    );
    assert_eq!(backend.value_of("txtEmployeeName").as_deref(), Some("Jane Doe"));
}

#[test]
fn oversized_wait_falls_back_and_plan_continues() {
    let mut backend = w2_backend();
    let mut huge = Action::wait(0.0);
    huge.value = Some("1e20".into());

    let summary = run(&mut backend, vec![huge, Action::click(text("OK"))]);

    assert_eq!((summary.filled, summary.skipped, summary.failed), (2, 0, 0));
}

#[test]
fn select_sets_the_choice_control() {
    let mut backend = w2_backend();

    let summary = run(&mut backend, vec![Action::select(text("State"), "NY")]);

    assert_eq!(summary.filled, 1);
    assert_eq!(backend.value_of("cboState").as_deref(), Some("NY"));
}

#[test]
fn tab_goes_to_the_window_and_failures_are_recorded() {
    let mut backend = w2_backend();
    let root = backend.root(APP).unwrap();
    let summary = run(&mut backend, vec![Action::tab()]);
    assert_eq!(summary.filled, 1);
    assert!(backend.calls().contains(&BackendCall::SendKey(root, Keystroke::Tab)));

    let mut refusing = w2_backend().failing(Operation::SendKey, "W-2 Entry");
    let summary = run(&mut refusing, vec![Action::tab()]);
    assert_eq!(summary.failed, 1);
    assert!(summary.details[0]
        .detail
        .as_deref()
        .unwrap()
        .starts_with("Action execution error"));
}

#[test]
fn click_failure_is_an_action_execution_error() {
    let mut backend = w2_backend().failing(Operation::Click, "btnOK");

    let summary = run(&mut backend, vec![Action::click(text("OK"))]);

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.details[0].strategy, Some(MatchStrategy::ExactTitle));
}

#[test]
fn targets_are_re_resolved_for_every_action() {
    let mut backend = w2_backend();

    let summary = run(
        &mut backend,
        vec![
            Action::set_text(text("Wages, tips, other comp."), "1.00"),
            Action::set_text(text("Wages, tips, other comp."), "2.00"),
        ],
    );

    assert_eq!(summary.filled, 2);
    assert_eq!(backend.value_of("txtWages").as_deref(), Some("2.00"));
}

// ============================================================================
// Settle
// ============================================================================

#[test]
fn settle_is_built_from_config() {
    assert_eq!(Settle::from_config(SettleMode::Fixed, 0, 50, 1000), Settle::None);
    assert_eq!(
        Settle::from_config(SettleMode::Fixed, 300, 50, 1000),
        Settle::Fixed(Duration::from_millis(300))
    );
    assert!(matches!(
        Settle::from_config(SettleMode::Poll, 300, 0, 1000),
        Settle::Poll { interval, .. } if interval == Duration::from_millis(1)
    ));
}

#[test]
fn polling_settle_returns_once_element_is_stable() {
    let mut backend = w2_backend();
    let root = backend.root(APP).unwrap();
    let executor = ActionExecutor::new(
        ElementResolver::default(),
        ExecutorConfig {
            settle: Settle::Poll {
                interval: Duration::from_millis(1),
                timeout: Duration::from_millis(500),
                fallback: Duration::from_secs(30),
            },
            action_delay: Duration::ZERO,
        },
    );
    let plan = ActionPlan::new(
        PlanSource::Actions,
        vec![Action::set_text(text("txtSSN"), "987-65-4321")],
    );

    let started = std::time::Instant::now();
    let results = executor.execute(&mut backend, &root, &plan);

    assert_eq!(results[0].status, FillStatus::Filled);
    // A static tree is stable on the second read, well before the fallback
    assert!(started.elapsed() < Duration::from_secs(5));
}
