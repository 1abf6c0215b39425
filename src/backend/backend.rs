use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::tree::tree_model::{Attribute, AttributeValue, NodeAttributes};

/// Opaque reference to a live element, minted by a backend.
///
/// Handles are only meaningful to the backend that produced them and are not
/// assumed stable across UI mutation, so callers re-resolve instead of caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl ToString) -> Self {
        ElementHandle(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key events the executor sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key", content = "text", rename_all = "snake_case")]
pub enum Keystroke {
    /// Advance focus to the next control
    Tab,
    /// Select the focused control's whole content
    SelectAll,
    /// Type literal text into the focused control
    Type(String),
}

/// The accessibility layer of one platform.
///
/// Element handles expose a capability set: any attribute may be read from
/// any element and absence is a normal answer. Every primitive is fallible;
/// callers decide whether a failure is local to a node, an action, or a form.
pub trait AccessibilityBackend {
    /// Connect to the application and return its root (usually the focused window).
    fn root(&mut self, app: &str) -> Result<ElementHandle, BackendError>;

    /// Read one attribute. `Ok(None)` means the element does not carry it.
    fn read_attribute(
        &mut self,
        handle: &ElementHandle,
        attribute: Attribute,
    ) -> Result<Option<AttributeValue>, BackendError>;

    /// Read every attribute. Each one is read independently, so a failure on
    /// one leaves it absent without hiding the others. Fails only when nothing
    /// at all could be read.
    fn read_attributes(&mut self, handle: &ElementHandle) -> Result<NodeAttributes, BackendError> {
        let mut attrs = NodeAttributes::default();
        let mut last_error = None;
        let mut any_read = false;

        for attribute in Attribute::ALL {
            match self.read_attribute(handle, attribute) {
                Ok(Some(value)) => {
                    any_read = true;
                    attrs.set(attribute, value);
                }
                Ok(None) => any_read = true,
                Err(e) => last_error = Some(e),
            }
        }

        match (any_read, last_error) {
            (false, Some(e)) => Err(e),
            _ => Ok(attrs),
        }
    }

    fn children(&mut self, handle: &ElementHandle) -> Result<Vec<ElementHandle>, BackendError>;

    /// Direct lookup of a descendant by exact identifier, when the platform
    /// offers one. Only nodes shallower than `max_depth` (the root is depth
    /// 0) are eligible. `Ok(None)` means "supported, nothing found".
    fn find_by_identifier(
        &mut self,
        _root: &ElementHandle,
        _identifier: &str,
        _max_depth: usize,
    ) -> Result<Option<ElementHandle>, BackendError> {
        Err(BackendError::Unsupported("find_by_identifier"))
    }

    fn focus(&mut self, handle: &ElementHandle) -> Result<(), BackendError>;

    fn set_value(&mut self, handle: &ElementHandle, value: &str) -> Result<(), BackendError>;

    /// Primary activation (press / click).
    fn click(&mut self, handle: &ElementHandle) -> Result<(), BackendError>;

    /// Choose an entry of a selection control by its displayed value.
    fn select(&mut self, handle: &ElementHandle, value: &str) -> Result<(), BackendError>;

    /// Deliver a key event to `container` (the element or window with focus).
    fn send_key(&mut self, container: &ElementHandle, key: &Keystroke) -> Result<(), BackendError>;
}

impl<B: AccessibilityBackend + ?Sized> AccessibilityBackend for Box<B> {
    fn root(&mut self, app: &str) -> Result<ElementHandle, BackendError> {
        (**self).root(app)
    }

    fn read_attribute(
        &mut self,
        handle: &ElementHandle,
        attribute: Attribute,
    ) -> Result<Option<AttributeValue>, BackendError> {
        (**self).read_attribute(handle, attribute)
    }

    fn read_attributes(&mut self, handle: &ElementHandle) -> Result<NodeAttributes, BackendError> {
        (**self).read_attributes(handle)
    }

    fn children(&mut self, handle: &ElementHandle) -> Result<Vec<ElementHandle>, BackendError> {
        (**self).children(handle)
    }

    fn find_by_identifier(
        &mut self,
        root: &ElementHandle,
        identifier: &str,
        max_depth: usize,
    ) -> Result<Option<ElementHandle>, BackendError> {
        (**self).find_by_identifier(root, identifier, max_depth)
    }

    fn focus(&mut self, handle: &ElementHandle) -> Result<(), BackendError> {
        (**self).focus(handle)
    }

    fn set_value(&mut self, handle: &ElementHandle, value: &str) -> Result<(), BackendError> {
        (**self).set_value(handle, value)
    }

    fn click(&mut self, handle: &ElementHandle) -> Result<(), BackendError> {
        (**self).click(handle)
    }

    fn select(&mut self, handle: &ElementHandle, value: &str) -> Result<(), BackendError> {
        (**self).select(handle, value)
    }

    fn send_key(&mut self, container: &ElementHandle, key: &Keystroke) -> Result<(), BackendError> {
        (**self).send_key(container, key)
    }
}
