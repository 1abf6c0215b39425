use std::fmt;

use serde::{Deserialize, Serialize};

/// Predicate descriptor for one element. Only non-empty fields take part in
/// matching; criteria with every field empty match nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ElementCriteria {
    pub fn by_title(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::default()
        }
    }

    pub fn by_identifier(identifier: &str) -> Self {
        Self {
            identifier: Some(identifier.to_string()),
            ..Self::default()
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

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }

    pub fn identifier(&self) -> Option<&str> {
        non_empty(&self.identifier)
    }

    pub fn role(&self) -> Option<&str> {
        non_empty(&self.role)
    }

    pub fn description(&self) -> Option<&str> {
        non_empty(&self.description)
    }

    pub fn is_empty(&self) -> bool {
        self.title().is_none()
            && self.identifier().is_none()
            && self.role().is_none()
            && self.description().is_none()
    }
}

impl fmt::Display for ElementCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(title) = self.title() {
            parts.push(format!("title='{}'", title));
        }
        if let Some(id) = self.identifier() {
            parts.push(format!("id='{}'", id));
        }
        if let Some(role) = self.role() {
            parts.push(format!("role='{}'", role));
        }
        if let Some(desc) = self.description() {
            parts.push(format!("description='{}'", desc));
        }
        if parts.is_empty() {
            write!(f, "<empty criteria>")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// What the resolver is asked to find.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResolveTarget {
    /// Structured fields, e.g. built from an oracle field mapping
    Criteria(ElementCriteria),
    /// Free text as written by the oracle in an action list
    Text(String),
}

impl ResolveTarget {
    pub fn is_empty(&self) -> bool {
        match self {
            ResolveTarget::Criteria(c) => c.is_empty(),
            ResolveTarget::Text(t) => t.trim().is_empty(),
        }
    }

    /// Short human label used in results and logs.
    pub fn label(&self) -> String {
        match self {
            ResolveTarget::Criteria(c) => c
                .title()
                .or_else(|| c.identifier())
                .or_else(|| c.description())
                .or_else(|| c.role())
                .unwrap_or("")
                .to_string(),
            ResolveTarget::Text(t) => t.trim().to_string(),
        }
    }
}

impl fmt::Display for ResolveTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveTarget::Criteria(c) => write!(f, "{}", c),
            ResolveTarget::Text(t) => write!(f, "'{}'", t),
        }
    }
}

// ============================================================================
// Control categories
// ============================================================================

const TEXT_ENTRY_ROLES: &[&str] = &[
    "text field",
    "textfield",
    "text area",
    "textarea",
    "text box",
    "textbox",
    "edit",
    "entry",
    "search field",
    "password",
    "spin",
];

const CHOICE_ROLES: &[&str] = &[
    "combo box",
    "combobox",
    "pop up",
    "popup",
    "drop down",
    "dropdown",
    "list",
    "radio group",
];

const ACTIVATABLE_ROLES: &[&str] = &[
    "button",
    "check box",
    "checkbox",
    "radio",
    "link",
    "menu item",
    "menuitem",
    "tab item",
    "page tab",
];

/// Family of controls an action may legitimately target. Keeps title matches
/// off static labels that happen to carry the same text as the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCategory {
    #[default]
    TextEntry,
    Choice,
    Activatable,
    Any,
}

impl ControlCategory {
    /// Role names differ per platform ("Edit", "AXTextField", "text"), so the
    /// check is a case-insensitive keyword match.
    pub fn accepts(&self, role: &str) -> bool {
        let role = role.to_lowercase();
        let keywords = match self {
            ControlCategory::Any => return true,
            ControlCategory::TextEntry => {
                if role == "text" {
                    return true;
                }
                TEXT_ENTRY_ROLES
            }
            ControlCategory::Choice => CHOICE_ROLES,
            ControlCategory::Activatable => ACTIVATABLE_ROLES,
        };
        keywords.iter().any(|k| role.contains(k))
    }
}
