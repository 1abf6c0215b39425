use form_autofill::backend::backend::{ElementHandle, Keystroke};
use form_autofill::backend::bridge::{BridgeBackend, BridgeRequest, BridgeResponse};
use form_autofill::error::BackendError;
use form_autofill::tree::tree_model::Attribute;
use serde_json::json;

fn handle(id: &str) -> ElementHandle {
    ElementHandle::new(id)
}

// =========================================================================
// Wire format
// =========================================================================

#[test]
fn requests_serialize_as_flat_command_objects() {
    let cases = [
        (BridgeRequest::root("ProSeries"), json!({"cmd": "root", "app": "ProSeries"})),
        (
            BridgeRequest::attribute(&handle("e1"), Attribute::Title),
            json!({"cmd": "attribute", "handle": "e1", "attribute": "title"}),
        ),
        (BridgeRequest::children(&handle("e1")), json!({"cmd": "children", "handle": "e1"})),
        (
            BridgeRequest::find_identifier(&handle("w1"), "txtWages", 10),
            json!({"cmd": "find_identifier", "handle": "w1", "identifier": "txtWages", "max_depth": 10}),
        ),
        (
            BridgeRequest::set_value(&handle("e2"), "75000.00"),
            json!({"cmd": "set_value", "handle": "e2", "value": "75000.00"}),
        ),
        (
            BridgeRequest::send_key(&handle("w1"), &Keystroke::Type("CA".into())),
            json!({"cmd": "send_key", "handle": "w1", "key": {"key": "type", "text": "CA"}}),
        ),
        (BridgeRequest::quit(), json!({"cmd": "quit"})),
    ];

    for (request, expected) in cases {
        assert_eq!(serde_json::to_value(&request).unwrap(), expected);
    }
}

#[test]
fn responses_default_missing_fields() {
    let response: BridgeResponse = serde_json::from_str(r#"{"ok": true}"#).unwrap();
    assert!(response.ok);
    assert!(!response.unsupported && !response.stale);
    assert!(response.handle.is_none() && response.attributes.is_none());

    let response: BridgeResponse = serde_json::from_str(
        r#"{"ok": true, "attributes": {"role": "AXTextField", "title": "Wages", "enabled": true}}"#,
    )
    .unwrap();
    let attrs = response.attributes.unwrap();
    assert_eq!(attrs.title.as_deref(), Some("Wages"));
    assert_eq!(attrs.enabled, Some(true));
    assert_eq!(attrs.value, None);
}

// =========================================================================
// Helper process
// =========================================================================

#[test]
fn missing_helper_is_a_spawn_error() {
    let result = BridgeBackend::launch("form-autofill-no-such-helper", &[]);
    assert!(matches!(result, Err(BackendError::Spawn { .. })));
}

#[cfg(unix)]
fn scripted_helper(replies: &[&str]) -> Result<BridgeBackend, BackendError> {
    let mut script = String::from("echo '{\"ok\":true,\"ready\":true}'\n");
    for reply in replies {
        script.push_str(&format!("read line\necho '{}'\n", reply));
    }
    BridgeBackend::launch("sh", &["-c".to_string(), script])
}

#[cfg(unix)]
#[test]
fn helper_replies_map_onto_backend_errors() {
    use form_autofill::backend::backend::AccessibilityBackend;

    let mut bridge = scripted_helper(&[
        r#"{"ok":true,"handle":"w1"}"#,
        r#"{"ok":true,"attributes":{"role":"AXTextField","title":"Wages"}}"#,
        r#"{"ok":true,"handles":["e1","e2"]}"#,
        r#"{"ok":false,"unsupported":true,"error":"not available"}"#,
        r#"{"ok":false,"stale":true,"error":"e1 is gone"}"#,
        r#"{"ok":false,"error":"button disabled"}"#,
    ])
    .unwrap();

    let root = bridge.root("ProSeries").unwrap();
    assert_eq!(root, handle("w1"));

    let attrs = bridge.read_attributes(&root).unwrap();
    assert_eq!(attrs.role.as_deref(), Some("AXTextField"));

    assert_eq!(bridge.children(&root).unwrap(), vec![handle("e1"), handle("e2")]);

    assert!(matches!(
        bridge.find_by_identifier(&root, "txtWages", 10),
        Err(BackendError::Unsupported("find_identifier"))
    ));
    assert!(matches!(
        bridge.set_value(&handle("e1"), "1.00"),
        Err(BackendError::StaleHandle(_))
    ));
    assert!(matches!(
        bridge.click(&handle("e2")),
        Err(BackendError::Protocol { ref error, .. }) if error == "button disabled"
    ));
}

#[cfg(unix)]
#[test]
fn helper_without_ready_signal_is_rejected() {
    let result = BridgeBackend::launch("sh", &["-c".to_string(), "echo '{\"ok\":false}'".to_string()]);
    assert!(matches!(result, Err(BackendError::Protocol { .. })));
}

#[cfg(unix)]
#[test]
fn refused_root_is_a_connection_error() {
    use form_autofill::backend::backend::AccessibilityBackend;

    let mut bridge = scripted_helper(&[r#"{"ok":false,"error":"no window for QuickBooks"}"#]).unwrap();
    let err = bridge.root("QuickBooks").unwrap_err();
    assert!(matches!(err, BackendError::Connection { ref app, .. } if app == "QuickBooks"));
}
