use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::tree::tree_model::{TreeSnapshot, UIElementNode};

/// How a snapshot is handed to the mapping oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    /// Indented one-line-per-element outline
    #[default]
    Text,
    /// Pretty-printed JSON of the whole tree
    Json,
}

impl std::str::FromStr for SnapshotFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(SnapshotFormat::Text),
            "json" => Ok(SnapshotFormat::Json),
            other => Err(format!("unknown snapshot format '{}' (expected text or json)", other)),
        }
    }
}

pub fn render_snapshot(snapshot: &TreeSnapshot, format: SnapshotFormat) -> String {
    match format {
        SnapshotFormat::Text => render_outline(&snapshot.root),
        SnapshotFormat::Json => serde_json::to_string_pretty(&snapshot.root).unwrap_or_default(),
    }
}

/// Outline of the labelled, visible elements.
///
/// Unlabelled containers are not printed but their children still are, one
/// indent level deeper, so the outline keeps the tree's nesting.
pub fn render_outline(root: &UIElementNode) -> String {
    let mut out = String::new();
    outline_node(root, 0, &mut out);
    out
}

fn outline_node(node: &UIElementNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);

    if node.truncated {
        let _ = writeln!(out, "{}...", indent);
        return;
    }
    if node.error.is_some() || node.visible == Some(false) {
        return;
    }

    if has_label(node) {
        let _ = write!(out, "{}[{}]", indent, node.role);
        if let Some(title) = non_empty(&node.title) {
            let _ = write!(out, " Title: '{}'", title);
        }
        if let Some(id) = non_empty(&node.identifier) {
            let _ = write!(out, " ID: '{}'", id);
        }
        if let Some(value) = non_empty(&node.value) {
            let _ = write!(out, " Value: '{}'", value);
        }
        if let Some(desc) = non_empty(&node.description) {
            let _ = write!(out, " Description: '{}'", desc);
        }
        let _ = writeln!(out, " (Enabled: {})", node.enabled.unwrap_or(true));
    }

    for child in &node.children {
        outline_node(child, depth + 1, out);
    }

    if node.omitted_children > 0 {
        let _ = writeln!(out, "{}  ... {} more", indent, node.omitted_children);
    }
}

fn has_label(node: &UIElementNode) -> bool {
    non_empty(&node.title).is_some()
        || non_empty(&node.identifier).is_some()
        || non_empty(&node.description).is_some()
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}
