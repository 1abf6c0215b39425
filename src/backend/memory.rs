use std::path::Path;

use tracing::debug;

use crate::backend::backend::{AccessibilityBackend, ElementHandle, Keystroke};
use crate::error::BackendError;
use crate::tree::tree_model::{Attribute, AttributeValue, NodeAttributes, TreeSnapshot, UIElementNode};

// ============================================================================
// In-memory backend: replays a captured tree, records every mutation
// ============================================================================

/// Backend primitives that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Attributes,
    Children,
    Focus,
    SetValue,
    Click,
    Select,
    SendKey,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    operation: Operation,
    /// Matched against a node's title or identifier
    target: String,
}

/// Mutating calls made against the backend, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Root(String),
    Focus(ElementHandle),
    SetValue(ElementHandle, String),
    Click(ElementHandle),
    Select(ElementHandle, String),
    SendKey(ElementHandle, Keystroke),
}

#[derive(Debug, Clone)]
struct MemoryNode {
    attrs: NodeAttributes,
    children: Vec<usize>,
}

/// Accessibility backend over an in-memory tree.
///
/// Used for dry runs against a saved snapshot and as the test double for the
/// resolver, executor and orchestrator. Values written through `set_value`,
/// `select` and typed keystrokes are kept, so a later read sees them.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    app: Option<String>,
    nodes: Vec<MemoryNode>,
    failures: Vec<InjectedFailure>,
    connection_failures: usize,
    identifier_lookup: bool,
    select_all_pending: bool,
    calls: Vec<BackendCall>,
}

impl MemoryBackend {
    /// Backend serving `root` to any application name.
    pub fn new(root: UIElementNode) -> Self {
        let mut backend = MemoryBackend {
            app: None,
            nodes: Vec::new(),
            failures: Vec::new(),
            connection_failures: 0,
            identifier_lookup: true,
            select_all_pending: false,
            calls: Vec::new(),
        };
        backend.insert(root);
        backend
    }

    /// Load a tree saved by `inspect` (a serialized `TreeSnapshot`) or a bare node.
    pub fn from_snapshot_file(path: &Path) -> Result<Self, BackendError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BackendError::Io(format!("{}: {}", path.display(), e)))?;

        if let Ok(snapshot) = serde_json::from_str::<TreeSnapshot>(&content) {
            return Ok(Self::new(snapshot.root).for_app(&snapshot.app));
        }

        let root: UIElementNode =
            serde_json::from_str(&content).map_err(|e| BackendError::Json {
                context: format!("tree file {}", path.display()),
                source: e,
            })?;
        Ok(Self::new(root))
    }

    /// Only answer `root()` for this application name.
    pub fn for_app(mut self, app: &str) -> Self {
        self.app = Some(app.to_string());
        self
    }

    /// Make the next `count` calls to `root()` fail with a connection error.
    pub fn failing_connections(mut self, count: usize) -> Self {
        self.connection_failures = count;
        self
    }

    /// Make `operation` fail on every node titled or identified `target`.
    pub fn failing(mut self, operation: Operation, target: &str) -> Self {
        self.failures.push(InjectedFailure {
            operation,
            target: target.to_string(),
        });
        self
    }

    /// Report identifier lookup as unsupported, forcing the resolver to scan.
    pub fn without_identifier_lookup(mut self) -> Self {
        self.identifier_lookup = false;
        self
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Current value of the first node titled or identified `label`.
    pub fn value_of(&self, label: &str) -> Option<String> {
        self.nodes
            .iter()
            .find(|n| matches_label(&n.attrs, label))
            .and_then(|n| n.attrs.value.clone())
    }

    /// Handle of the first node (pre-order) titled or identified `label`.
    pub fn handle_of(&self, label: &str) -> Option<ElementHandle> {
        self.nodes
            .iter()
            .position(|n| matches_label(&n.attrs, label))
            .map(handle_for)
    }

    fn insert(&mut self, node: UIElementNode) -> usize {
        let index = self.nodes.len();
        let attrs = node.attributes();
        let children = node.children;
        self.nodes.push(MemoryNode {
            attrs,
            children: Vec::new(),
        });
        for child in children {
            let child_index = self.insert(child);
            self.nodes[index].children.push(child_index);
        }
        index
    }

    fn index(&self, handle: &ElementHandle) -> Result<usize, BackendError> {
        handle
            .as_str()
            .strip_prefix('m')
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|i| *i < self.nodes.len())
            .ok_or_else(|| BackendError::StaleHandle(handle.to_string()))
    }

    fn check(&self, operation: Operation, index: usize) -> Result<(), BackendError> {
        let attrs = &self.nodes[index].attrs;
        match self
            .failures
            .iter()
            .find(|f| f.operation == operation && matches_label(attrs, &f.target))
        {
            Some(f) => Err(BackendError::failed(
                &format!("{:?}", operation),
                format!("injected failure on '{}'", f.target),
            )),
            None => Ok(()),
        }
    }

    fn find_identifier_from(
        &self,
        index: usize,
        identifier: &str,
        depth_left: usize,
    ) -> Option<usize> {
        if depth_left == 0 {
            return None;
        }
        if self.nodes[index].attrs.identifier.as_deref() == Some(identifier) {
            return Some(index);
        }
        self.nodes[index]
            .children
            .iter()
            .find_map(|&child| self.find_identifier_from(child, identifier, depth_left - 1))
    }
}

fn handle_for(index: usize) -> ElementHandle {
    ElementHandle(format!("m{}", index))
}

fn matches_label(attrs: &NodeAttributes, label: &str) -> bool {
    attrs.title.as_deref() == Some(label) || attrs.identifier.as_deref() == Some(label)
}

impl AccessibilityBackend for MemoryBackend {
    fn root(&mut self, app: &str) -> Result<ElementHandle, BackendError> {
        self.calls.push(BackendCall::Root(app.to_string()));

        if self.connection_failures > 0 {
            self.connection_failures -= 1;
            return Err(BackendError::Connection {
                app: app.to_string(),
                reason: "application is not responding".into(),
            });
        }

        if let Some(expected) = &self.app {
            if expected != app {
                return Err(BackendError::Connection {
                    app: app.to_string(),
                    reason: format!("no running application named '{}'", app),
                });
            }
        }

        Ok(handle_for(0))
    }

    fn read_attribute(
        &mut self,
        handle: &ElementHandle,
        attribute: Attribute,
    ) -> Result<Option<AttributeValue>, BackendError> {
        let index = self.index(handle)?;
        self.check(Operation::Attributes, index)?;
        Ok(self.nodes[index].attrs.get(attribute))
    }

    fn read_attributes(&mut self, handle: &ElementHandle) -> Result<NodeAttributes, BackendError> {
        let index = self.index(handle)?;
        self.check(Operation::Attributes, index)?;
        Ok(self.nodes[index].attrs.clone())
    }

    fn children(&mut self, handle: &ElementHandle) -> Result<Vec<ElementHandle>, BackendError> {
        let index = self.index(handle)?;
        self.check(Operation::Children, index)?;
        Ok(self.nodes[index].children.iter().map(|&i| handle_for(i)).collect())
    }

    fn find_by_identifier(
        &mut self,
        root: &ElementHandle,
        identifier: &str,
        max_depth: usize,
    ) -> Result<Option<ElementHandle>, BackendError> {
        if !self.identifier_lookup {
            return Err(BackendError::Unsupported("find_by_identifier"));
        }
        let index = self.index(root)?;
        Ok(self
            .find_identifier_from(index, identifier, max_depth)
            .map(handle_for))
    }

    fn focus(&mut self, handle: &ElementHandle) -> Result<(), BackendError> {
        let index = self.index(handle)?;
        self.calls.push(BackendCall::Focus(handle.clone()));
        self.check(Operation::Focus, index)?;
        self.select_all_pending = false;
        Ok(())
    }

    fn set_value(&mut self, handle: &ElementHandle, value: &str) -> Result<(), BackendError> {
        let index = self.index(handle)?;
        self.calls.push(BackendCall::SetValue(handle.clone(), value.to_string()));
        self.check(Operation::SetValue, index)?;
        self.nodes[index].attrs.value = Some(value.to_string());
        Ok(())
    }

    fn click(&mut self, handle: &ElementHandle) -> Result<(), BackendError> {
        let index = self.index(handle)?;
        self.calls.push(BackendCall::Click(handle.clone()));
        self.check(Operation::Click, index)
    }

    fn select(&mut self, handle: &ElementHandle, value: &str) -> Result<(), BackendError> {
        let index = self.index(handle)?;
        self.calls.push(BackendCall::Select(handle.clone(), value.to_string()));
        self.check(Operation::Select, index)?;
        self.nodes[index].attrs.value = Some(value.to_string());
        Ok(())
    }

    fn send_key(&mut self, container: &ElementHandle, key: &Keystroke) -> Result<(), BackendError> {
        let index = self.index(container)?;
        self.calls.push(BackendCall::SendKey(container.clone(), key.clone()));
        self.check(Operation::SendKey, index)?;

        match key {
            Keystroke::Tab => self.select_all_pending = false,
            Keystroke::SelectAll => self.select_all_pending = true,
            Keystroke::Type(text) => {
                let attrs = &mut self.nodes[index].attrs;
                let current = if self.select_all_pending {
                    String::new()
                } else {
                    attrs.value.clone().unwrap_or_default()
                };
                attrs.value = Some(format!("{}{}", current, text));
                self.select_all_pending = false;
            }
        }
        debug!(handle = %container, ?key, "memory backend key event");
        Ok(())
    }
}
