use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::backend::backend::{AccessibilityBackend, ElementHandle};
use crate::error::FillError;
use crate::tree::tree_model::{TreeSnapshot, UIElementNode};

pub const DEFAULT_SNAPSHOT_DEPTH: usize = 6;
pub const DEFAULT_MAX_CHILDREN: usize = 50;

/// Bounds applied while walking the live tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotOptions {
    /// Nodes at this depth (root = 0) become truncated sentinels
    pub max_depth: usize,
    /// Children kept per node; the rest are counted as omitted
    pub max_children: Option<usize>,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_SNAPSHOT_DEPTH,
            max_children: Some(DEFAULT_MAX_CHILDREN),
        }
    }
}

/// Capture the tree under `root`.
///
/// Only an unreadable root is fatal. Below it, a node whose attributes fail
/// becomes an unreadable sentinel and a node whose children fail keeps its own
/// attributes with no children.
pub fn capture_snapshot(
    backend: &mut dyn AccessibilityBackend,
    root: &ElementHandle,
    app: &str,
    options: SnapshotOptions,
) -> Result<TreeSnapshot, FillError> {
    let attrs = backend
        .read_attributes(root)
        .map_err(|e| FillError::Snapshot(format!("root element unreadable: {}", e)))?;

    let handles = backend
        .children(root)
        .map_err(|e| FillError::Snapshot(format!("root children unreadable: {}", e)))?;

    let mut node = UIElementNode::from_attributes(attrs);
    attach_children(backend, &mut node, handles, 1, &options);

    let snapshot = TreeSnapshot::new(app, now_ms(), options.max_depth, node);
    debug!(
        app,
        nodes = snapshot.node_count,
        max_depth = options.max_depth,
        "captured tree snapshot"
    );
    Ok(snapshot)
}

fn attach_children(
    backend: &mut dyn AccessibilityBackend,
    parent: &mut UIElementNode,
    mut handles: Vec<ElementHandle>,
    depth: usize,
    options: &SnapshotOptions,
) {
    if let Some(limit) = options.max_children {
        if handles.len() > limit {
            parent.omitted_children = handles.len() - limit;
            handles.truncate(limit);
        }
    }

    for handle in handles {
        parent.children.push(capture_node(backend, &handle, depth, options));
    }
}

fn capture_node(
    backend: &mut dyn AccessibilityBackend,
    handle: &ElementHandle,
    depth: usize,
    options: &SnapshotOptions,
) -> UIElementNode {
    if depth >= options.max_depth {
        return UIElementNode::truncated();
    }

    let attrs = match backend.read_attributes(handle) {
        Ok(attrs) => attrs,
        Err(e) => {
            debug!(%handle, error = %e, "node unreadable during snapshot");
            return UIElementNode::unreadable(e);
        }
    };

    let mut node = UIElementNode::from_attributes(attrs);
    match backend.children(handle) {
        Ok(handles) => attach_children(backend, &mut node, handles, depth + 1, options),
        Err(e) => warn!(%handle, error = %e, "children unreadable, subtree skipped"),
    }
    node
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
