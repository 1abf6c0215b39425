use serde::{Deserialize, Serialize};

// ============================================================================
// Attribute model: what a backend can report about one element
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Names of the attributes an element handle can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Role,
    Title,
    Description,
    Value,
    Identifier,
    Enabled,
    Visible,
    Position,
    Size,
}

impl Attribute {
    pub const ALL: [Attribute; 9] = [
        Attribute::Role,
        Attribute::Title,
        Attribute::Description,
        Attribute::Value,
        Attribute::Identifier,
        Attribute::Enabled,
        Attribute::Visible,
        Attribute::Position,
        Attribute::Size,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Text(String),
    Point(Point),
    Size(Size),
}

/// Attributes read from one element. Any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
}

impl NodeAttributes {
    pub fn get(&self, attribute: Attribute) -> Option<AttributeValue> {
        match attribute {
            Attribute::Role => self.role.clone().map(AttributeValue::Text),
            Attribute::Title => self.title.clone().map(AttributeValue::Text),
            Attribute::Description => self.description.clone().map(AttributeValue::Text),
            Attribute::Value => self.value.clone().map(AttributeValue::Text),
            Attribute::Identifier => self.identifier.clone().map(AttributeValue::Text),
            Attribute::Enabled => self.enabled.map(AttributeValue::Bool),
            Attribute::Visible => self.visible.map(AttributeValue::Bool),
            Attribute::Position => self.position.map(AttributeValue::Point),
            Attribute::Size => self.size.map(AttributeValue::Size),
        }
    }

    /// Store a value read for `attribute`. Mismatched value shapes are ignored.
    pub fn set(&mut self, attribute: Attribute, value: AttributeValue) {
        match (attribute, value) {
            (Attribute::Role, AttributeValue::Text(s)) => self.role = Some(s),
            (Attribute::Title, AttributeValue::Text(s)) => self.title = Some(s),
            (Attribute::Description, AttributeValue::Text(s)) => self.description = Some(s),
            (Attribute::Value, AttributeValue::Text(s)) => self.value = Some(s),
            (Attribute::Identifier, AttributeValue::Text(s)) => self.identifier = Some(s),
            (Attribute::Enabled, AttributeValue::Bool(b)) => self.enabled = Some(b),
            (Attribute::Visible, AttributeValue::Bool(b)) => self.visible = Some(b),
            (Attribute::Position, AttributeValue::Point(p)) => self.position = Some(p),
            (Attribute::Size, AttributeValue::Size(s)) => self.size = Some(s),
            _ => {}
        }
    }

    /// Absent `visible` counts as visible.
    pub fn is_visible(&self) -> bool {
        self.visible.unwrap_or(true)
    }

    /// Absent `enabled` counts as enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Text a user would see on the element: title, value, then description.
    pub fn visible_text(&self) -> impl Iterator<Item = &str> {
        [&self.title, &self.value, &self.description]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

// ============================================================================
// Snapshot tree
// ============================================================================

/// One accessibility node as captured at snapshot time.
///
/// Two sentinel shapes exist: a *truncated* leaf stands in for a subtree
/// beyond the depth bound, and an *unreadable* node carries the error raised
/// while reading it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UIElementNode {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<UIElementNode>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub truncated: bool,
    /// Children dropped by the breadth bound
    #[serde(default, skip_serializing_if = "is_zero")]
    pub omitted_children: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

pub const TRUNCATED_ROLE: &str = "truncated";
pub const UNREADABLE_ROLE: &str = "unreadable";
pub const UNKNOWN_ROLE: &str = "unknown";

impl UIElementNode {
    pub fn new(role: &str) -> Self {
        Self {
            role: role.to_string(),
            title: None,
            description: None,
            value: None,
            identifier: None,
            enabled: None,
            visible: None,
            position: None,
            size: None,
            children: Vec::new(),
            truncated: false,
            omitted_children: 0,
            error: None,
        }
    }

    pub fn from_attributes(attrs: NodeAttributes) -> Self {
        Self {
            role: attrs.role.unwrap_or_else(|| UNKNOWN_ROLE.to_string()),
            title: attrs.title,
            description: attrs.description,
            value: attrs.value,
            identifier: attrs.identifier,
            enabled: attrs.enabled,
            visible: attrs.visible,
            position: attrs.position,
            size: attrs.size,
            ..Self::new(UNKNOWN_ROLE)
        }
    }

    /// Sentinel for a subtree cut off by the depth bound.
    pub fn truncated() -> Self {
        Self {
            truncated: true,
            ..Self::new(TRUNCATED_ROLE)
        }
    }

    /// Sentinel for a node whose attributes could not be read.
    pub fn unreadable(error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(UNREADABLE_ROLE)
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_identifier(mut self, identifier: &str) -> Self {
        self.identifier = Some(identifier.to_string());
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn with_child(mut self, child: UIElementNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = UIElementNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn is_sentinel(&self) -> bool {
        self.truncated || self.error.is_some()
    }

    pub fn attributes(&self) -> NodeAttributes {
        NodeAttributes {
            role: Some(self.role.clone()),
            title: self.title.clone(),
            description: self.description.clone(),
            value: self.value.clone(),
            identifier: self.identifier.clone(),
            enabled: self.enabled,
            visible: self.visible,
            position: self.position,
            size: self.size,
        }
    }

    /// Total nodes in this subtree, sentinels included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(UIElementNode::count).sum::<usize>()
    }

    /// Pre-order walk with depth (root = 0).
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a UIElementNode, usize)) {
        self.walk_at(0, visit);
    }

    fn walk_at<'a>(&'a self, depth: usize, visit: &mut impl FnMut(&'a UIElementNode, usize)) {
        visit(self, depth);
        for child in &self.children {
            child.walk_at(depth + 1, visit);
        }
    }
}

/// Immutable point-in-time capture of an application's accessibility tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub app: String,
    pub captured_at_ms: u64,
    pub max_depth: usize,
    pub node_count: usize,
    pub root: UIElementNode,
}

impl TreeSnapshot {
    pub fn new(app: &str, captured_at_ms: u64, max_depth: usize, root: UIElementNode) -> Self {
        Self {
            app: app.to_string(),
            captured_at_ms,
            max_depth,
            node_count: root.count(),
            root,
        }
    }

    /// SHA-1 of the serialized tree. Equal trees give equal fingerprints.
    pub fn fingerprint(&self) -> String {
        let serialized = serde_json::to_string(&self.root).unwrap_or_default();
        crate::data::normalize::text_fingerprint(&serialized)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
