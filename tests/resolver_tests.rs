use form_autofill::backend::backend::AccessibilityBackend;
use form_autofill::backend::memory::{MemoryBackend, Operation};
use form_autofill::resolve::criteria::{ControlCategory, ElementCriteria, ResolveTarget};
use form_autofill::resolve::resolver::{ElementResolver, MatchStrategy};
use form_autofill::tree::tree_model::UIElementNode;

use crate::common::{APP, label, text_field, w2_backend};

mod common;

fn resolve(
    backend: &mut MemoryBackend,
    target: ResolveTarget,
    category: ControlCategory,
) -> Option<(String, MatchStrategy)> {
    let root = backend.root(APP).unwrap();
    ElementResolver::default()
        .resolve(backend, &root, &target, category)
        .map(|r| (r.handle.to_string(), r.strategy))
}

fn handle(backend: &MemoryBackend, label: &str) -> String {
    backend.handle_of(label).unwrap().to_string()
}

// ============================================================================
// Strategy precedence
// ============================================================================

#[test]
fn identifier_match_wins_over_title_match() {
    let mut backend = w2_backend();
    // The title alone would land on the federal tax field
    let target = ResolveTarget::Criteria(
        ElementCriteria::by_identifier("txtWages").with_title("Federal income tax withheld"),
    );

    let (found, strategy) = resolve(&mut backend, target, ControlCategory::TextEntry).unwrap();
    assert_eq!(found, handle(&backend, "txtWages"));
    assert_eq!(strategy, MatchStrategy::Identifier);
}

#[test]
fn identifier_found_by_scan_when_lookup_unsupported() {
    let mut backend = w2_backend().without_identifier_lookup();
    let target = ResolveTarget::Criteria(ElementCriteria::by_identifier("txtFedTax"));

    let (found, strategy) = resolve(&mut backend, target, ControlCategory::TextEntry).unwrap();
    assert_eq!(found, handle(&backend, "txtFedTax"));
    assert_eq!(strategy, MatchStrategy::Identifier);
}

#[test]
fn exact_title_skips_static_labels() {
    let mut backend = w2_backend();
    let target = ResolveTarget::Text("Employee Name".into());

    let (found, strategy) = resolve(&mut backend, target, ControlCategory::TextEntry).unwrap();
    assert_eq!(found, handle(&backend, "txtEmployeeName"));
    assert_eq!(strategy, MatchStrategy::ExactTitle);
}

#[test]
fn exact_title_respects_requested_role() {
    let mut backend = w2_backend();
    let target = ResolveTarget::Criteria(ElementCriteria::by_title("State").with_role("combo"));

    let (found, strategy) = resolve(&mut backend, target, ControlCategory::Choice).unwrap();
    assert_eq!(found, handle(&backend, "cboState"));
    assert_eq!(strategy, MatchStrategy::ExactTitle);
}

#[test]
fn title_substring_is_case_insensitive() {
    let mut backend = w2_backend();
    let target = ResolveTarget::Text("FEDERAL INCOME".into());

    let (found, strategy) = resolve(&mut backend, target, ControlCategory::TextEntry).unwrap();
    assert_eq!(found, handle(&backend, "txtFedTax"));
    assert_eq!(strategy, MatchStrategy::TitleSubstring);
}

#[test]
fn title_substring_treats_pattern_characters_literally() {
    let mut backend = w2_backend();
    let target = ResolveTarget::Text("tips, other comp.".into());

    let (found, _) = resolve(&mut backend, target, ControlCategory::TextEntry).unwrap();
    assert_eq!(found, handle(&backend, "txtWages"));

    let regex_like = ResolveTarget::Text("Wages.*withheld".into());
    assert!(resolve(&mut backend, regex_like, ControlCategory::TextEntry).is_none());
}

#[test]
fn substring_ties_break_in_document_order() {
    let tree = UIElementNode::new("AXWindow").with_visible(true).with_children([
        UIElementNode::new("AXGroup").with_children([
            text_field("Medicare wages and tips", "txtMedicareWages"),
        ]),
        text_field("Social security wages", "txtSsWages"),
        text_field("State wages", "txtStateWages"),
    ]);
    let mut backend = MemoryBackend::new(tree);

    let (found, strategy) = resolve(
        &mut backend,
        ResolveTarget::Text("wages".into()),
        ControlCategory::TextEntry,
    )
    .unwrap();
    assert_eq!(found, handle(&backend, "txtMedicareWages"));
    assert_eq!(strategy, MatchStrategy::TitleSubstring);
}

#[test]
fn text_scan_skips_disabled_and_invisible_elements() {
    let tree = UIElementNode::new("AXWindow").with_visible(true).with_children([
        label("Hint").with_value("Enter the state code").with_enabled(false),
        label("Hidden").with_value("Enter the state code").with_visible(false),
        UIElementNode::new("AXStaticText")
            .with_description("Enter the state code here")
            .with_identifier("lblStateHelp")
            .with_enabled(true)
            .with_visible(true),
    ]);
    let mut backend = MemoryBackend::new(tree);

    let (found, strategy) = resolve(
        &mut backend,
        ResolveTarget::Text("state code".into()),
        ControlCategory::TextEntry,
    )
    .unwrap();
    assert_eq!(found, handle(&backend, "lblStateHelp"));
    assert_eq!(strategy, MatchStrategy::TextScan);
}

#[test]
fn criteria_scan_requires_every_populated_field() {
    let mut backend = w2_backend();

    // Buttons are not text entries, so only the scan can reach "Cancel"
    let title_only = ResolveTarget::Criteria(ElementCriteria::by_title("Cancel"));
    let (found, strategy) = resolve(&mut backend, title_only, ControlCategory::TextEntry).unwrap();
    assert_eq!(found, handle(&backend, "btnCancel"));
    assert_eq!(strategy, MatchStrategy::TextScan);

    // "Cancel" carries no description
    let with_description = ResolveTarget::Criteria(
        ElementCriteria::by_title("Cancel").with_description("dismiss the dialog"),
    );
    assert!(resolve(&mut backend, with_description, ControlCategory::TextEntry).is_none());
}

// ============================================================================
// Empty targets and bounds
// ============================================================================

#[test]
fn empty_criteria_match_nothing() {
    let mut backend = w2_backend();

    assert!(resolve(
        &mut backend,
        ResolveTarget::Criteria(ElementCriteria::default()),
        ControlCategory::Any
    )
    .is_none());

    let blank = ElementCriteria {
        title: Some("   ".into()),
        identifier: Some(String::new()),
        ..ElementCriteria::default()
    };
    assert!(resolve(&mut backend, ResolveTarget::Criteria(blank), ControlCategory::Any).is_none());
    assert!(resolve(&mut backend, ResolveTarget::Text(" ".into()), ControlCategory::Any).is_none());
}

#[test]
fn elements_beyond_depth_bound_are_not_found() {
    let deep = UIElementNode::new("AXWindow").with_child(
        UIElementNode::new("AXGroup").with_child(
            UIElementNode::new("AXGroup").with_child(text_field("Box 14 Other", "txtBox14")),
        ),
    );
    let target = ResolveTarget::Criteria(ElementCriteria::by_identifier("txtBox14"));

    let backends = [
        MemoryBackend::new(deep.clone()),
        MemoryBackend::new(deep).without_identifier_lookup(),
    ];
    for mut backend in backends {
        let root = backend.root(APP).unwrap();

        // The field sits at depth 3
        let shallow =
            ElementResolver::new(3).resolve(&mut backend, &root, &target, ControlCategory::TextEntry);
        assert!(shallow.is_none());

        let bounded =
            ElementResolver::new(4).resolve(&mut backend, &root, &target, ControlCategory::TextEntry);
        assert_eq!(bounded.map(|r| r.strategy), Some(MatchStrategy::Identifier));
    }
}

#[test]
fn unreadable_subtree_is_skipped_without_hiding_siblings() {
    let mut backend = w2_backend()
        .without_identifier_lookup()
        .failing(Operation::Children, "Employee");

    let hidden = ResolveTarget::Criteria(ElementCriteria::by_identifier("txtEmployeeName"));
    assert!(resolve(&mut backend, hidden, ControlCategory::TextEntry).is_none());

    let visible = ResolveTarget::Criteria(ElementCriteria::by_identifier("txtWages"));
    assert!(resolve(&mut backend, visible, ControlCategory::TextEntry).is_some());
}

#[test]
fn unreadable_node_is_skipped_but_its_children_are_searched() {
    let mut backend = w2_backend().failing(Operation::Attributes, "Wages");

    let (found, _) = resolve(
        &mut backend,
        ResolveTarget::Text("Federal income tax withheld".into()),
        ControlCategory::TextEntry,
    )
    .unwrap();
    assert_eq!(found, handle(&backend, "txtFedTax"));
}

// ============================================================================
// Purity
// ============================================================================

#[test]
fn resolution_is_idempotent_on_unchanged_tree() {
    let mut backend = w2_backend();
    let target = ResolveTarget::Text("wages".into());

    let first = resolve(&mut backend, target.clone(), ControlCategory::TextEntry);
    let second = resolve(&mut backend, target, ControlCategory::TextEntry);
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn resolution_never_mutates_the_ui() {
    let mut backend = w2_backend();
    let root = backend.root(APP).unwrap();
    backend.clear_calls();

    let resolver = ElementResolver::default();
    for target in ["Employee SSN", "cboState", "OK", "nothing like this"] {
        resolver.resolve(
            &mut backend,
            &root,
            &ResolveTarget::Text(target.into()),
            ControlCategory::Any,
        );
    }
    assert!(backend.calls().is_empty());
}

#[test]
fn control_categories_match_platform_role_names() {
    assert!(ControlCategory::TextEntry.accepts("AXTextField"));
    assert!(ControlCategory::TextEntry.accepts("Edit"));
    assert!(ControlCategory::TextEntry.accepts("text"));
    assert!(!ControlCategory::TextEntry.accepts("AXStaticText"));
    assert!(ControlCategory::Choice.accepts("ComboBox"));
    assert!(ControlCategory::Choice.accepts("AXPopUpButton"));
    assert!(ControlCategory::Activatable.accepts("push button"));
    assert!(ControlCategory::Any.accepts("anything"));
}
