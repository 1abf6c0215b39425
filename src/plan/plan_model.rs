use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::resolve::criteria::{ControlCategory, ElementCriteria, ResolveTarget};

pub const DEFAULT_WAIT_SECS: f64 = 1.0;
/// Longest single `wait` a plan may ask for.
pub const MAX_WAIT_SECS: f64 = 600.0;

// ============================================================================
// Actions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SetText,
    Click,
    Select,
    Tab,
    Wait,
}

impl ActionKind {
    /// Control family the target must belong to for title matches.
    pub fn category(&self) -> ControlCategory {
        match self {
            ActionKind::SetText => ControlCategory::TextEntry,
            ActionKind::Select => ControlCategory::Choice,
            ActionKind::Click => ControlCategory::Activatable,
            ActionKind::Tab | ActionKind::Wait => ControlCategory::Any,
        }
    }

    /// Tab acts on the focused container and wait on nothing.
    pub fn needs_target(&self) -> bool {
        matches!(self, ActionKind::SetText | ActionKind::Click | ActionKind::Select)
    }

    pub fn needs_value(&self) -> bool {
        matches!(self, ActionKind::SetText | ActionKind::Select)
    }

    /// Whether the action changes UI state and is followed by a settle delay.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, ActionKind::Wait)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::SetText => "set_text",
            ActionKind::Click => "click",
            ActionKind::Select => "select",
            ActionKind::Tab => "tab",
            ActionKind::Wait => "wait",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "set_text" => Ok(ActionKind::SetText),
            "click" => Ok(ActionKind::Click),
            "select" => Ok(ActionKind::Select),
            "tab" => Ok(ActionKind::Tab),
            "wait" => Ok(ActionKind::Wait),
            other => Err(format!("unknown action kind '{}'", other)),
        }
    }
}

/// One validated primitive of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ResolveTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Action {
    pub fn set_text(target: ResolveTarget, value: &str) -> Self {
        Self {
            kind: ActionKind::SetText,
            target: Some(target),
            value: Some(value.to_string()),
            description: None,
        }
    }

    pub fn click(target: ResolveTarget) -> Self {
        Self {
            kind: ActionKind::Click,
            target: Some(target),
            value: None,
            description: None,
        }
    }

    pub fn select(target: ResolveTarget, value: &str) -> Self {
        Self {
            kind: ActionKind::Select,
            target: Some(target),
            value: Some(value.to_string()),
            description: None,
        }
    }

    pub fn tab() -> Self {
        Self {
            kind: ActionKind::Tab,
            target: None,
            value: None,
            description: None,
        }
    }

    pub fn wait(seconds: f64) -> Self {
        Self {
            kind: ActionKind::Wait,
            target: None,
            value: Some(seconds.to_string()),
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn target_label(&self) -> String {
        match &self.target {
            Some(target) => target.label(),
            None => match self.kind {
                ActionKind::Wait => format!("{}s", self.value.as_deref().unwrap_or("1")),
                _ => String::new(),
            },
        }
    }

    /// Duration of a `wait`; anything unparseable or out of range counts as
    /// one second.
    pub fn wait_duration(&self) -> Duration {
        self.value
            .as_deref()
            .and_then(parse_seconds)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(Duration::from_secs_f64(DEFAULT_WAIT_SECS))
    }
}

/// Non-negative seconds no larger than `MAX_WAIT_SECS`.
pub fn parse_seconds(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|s| (0.0..=MAX_WAIT_SECS).contains(s))
}

// ============================================================================
// Field mappings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

/// Case-insensitive; anything unrecognised reads as medium.
fn lenient_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Confidence, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("high") => Confidence::High,
        Some("low") => Confidence::Low,
        _ => Confidence::Medium,
    })
}

/// One data-field to element correspondence proposed by the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub data_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_identifier: Option<String>,
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: Confidence,
    /// Advisory only, never matched against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_path: Option<String>,
}

impl FieldMapping {
    pub fn new(data_field: &str) -> Self {
        Self {
            data_field: data_field.to_string(),
            ui_title: None,
            ui_identifier: None,
            confidence: Confidence::default(),
            ui_path: None,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.ui_title = Some(title.to_string());
        self
    }

    pub fn with_identifier(mut self, identifier: &str) -> Self {
        self.ui_identifier = Some(identifier.to_string());
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn criteria(&self) -> ElementCriteria {
        ElementCriteria {
            title: self.ui_title.clone(),
            identifier: self.ui_identifier.clone(),
            ..ElementCriteria::default()
        }
    }
}

// ============================================================================
// Plan
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    Mappings,
    Actions,
}

/// An oracle entry that did not make it into the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Position of the entry in the oracle's list
    pub index: usize,
    pub reason: String,
    /// The entry as received
    pub entry: String,
}

/// Ordered, validated actions for one form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub source: PlanSource,
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<ValidationFailure>,
}

impl ActionPlan {
    pub fn new(source: PlanSource, actions: Vec<Action>) -> Self {
        Self {
            source,
            actions,
            rejected: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn validation_failures(&self) -> usize {
        self.rejected.len()
    }
}
