use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::plan::extract::Proposal;
use crate::plan::plan_model::{
    Action, ActionKind, ActionPlan, DEFAULT_WAIT_SECS, FieldMapping, MAX_WAIT_SECS, PlanSource,
    ValidationFailure, parse_seconds,
};
use crate::resolve::criteria::{ElementCriteria, ResolveTarget};

/// Named values for one form, keyed by data field.
pub type FormValues = BTreeMap<String, String>;

/// An action entry as the oracle wrote it, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAction {
    #[serde(alias = "type", alias = "action")]
    pub kind: String,
    #[serde(default)]
    pub target: Option<Value>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

// ============================================================================
// Entry points
// ============================================================================

/// Build a plan from an extracted oracle proposal. Each entry is validated on
/// its own; rejects are recorded on the plan and the rest kept in order.
pub fn build_plan(proposal: &Proposal, values: &FormValues) -> ActionPlan {
    match proposal {
        Proposal::Mappings { entries, .. } => {
            let mut rejected = Vec::new();
            let mut mappings = Vec::new();
            for (index, entry) in entries.iter().enumerate() {
                match FieldMapping::deserialize(entry) {
                    Ok(mapping) => mappings.push((index, mapping)),
                    Err(e) => rejected.push(failure(index, format!("malformed mapping: {}", e), entry)),
                }
            }
            let mut plan = mappings_to_plan(&mappings, values);
            plan.rejected.extend(rejected);
            plan.rejected.sort_by_key(|f| f.index);
            log_plan(&plan);
            plan
        }
        Proposal::Actions(entries) => {
            let mut plan = ActionPlan::new(PlanSource::Actions, Vec::new());
            for (index, entry) in entries.iter().enumerate() {
                let validated = RawAction::deserialize(entry)
                    .map_err(|e| format!("malformed action: {}", e))
                    .and_then(|raw| validate_action(&raw));
                match validated {
                    Ok(action) => plan.actions.push(action),
                    Err(reason) => plan.rejected.push(failure(index, reason, entry)),
                }
            }
            log_plan(&plan);
            plan
        }
    }
}

/// One `set_text` per mapping whose field has a value. Mappings for fields
/// absent from `values` are dropped without a failure.
pub fn plan_from_mappings(mappings: &[FieldMapping], values: &FormValues) -> ActionPlan {
    let indexed: Vec<(usize, FieldMapping)> = mappings.iter().cloned().enumerate().collect();
    let plan = mappings_to_plan(&indexed, values);
    log_plan(&plan);
    plan
}

/// Validate a typed list of raw actions.
pub fn plan_from_actions(entries: &[RawAction]) -> ActionPlan {
    let mut plan = ActionPlan::new(PlanSource::Actions, Vec::new());
    for (index, raw) in entries.iter().enumerate() {
        match validate_action(raw) {
            Ok(action) => plan.actions.push(action),
            Err(reason) => plan.rejected.push(ValidationFailure {
                index,
                reason,
                entry: format!("{:?}", raw),
            }),
        }
    }
    log_plan(&plan);
    plan
}

// ============================================================================
// Validation
// ============================================================================

fn mappings_to_plan(mappings: &[(usize, FieldMapping)], values: &FormValues) -> ActionPlan {
    let mut plan = ActionPlan::new(PlanSource::Mappings, Vec::new());

    for (index, mapping) in mappings {
        let value = match values.get(&mapping.data_field) {
            Some(v) if !v.is_empty() => v,
            _ => {
                debug!(field = %mapping.data_field, "mapping has no value, dropped");
                continue;
            }
        };

        let criteria = mapping.criteria();
        if criteria.is_empty() {
            plan.rejected.push(ValidationFailure {
                index: *index,
                reason: format!("mapping for '{}' names no title or identifier", mapping.data_field),
                entry: serde_json::to_string(mapping).unwrap_or_default(),
            });
            continue;
        }

        plan.actions.push(
            Action::set_text(ResolveTarget::Criteria(criteria), value)
                .with_description(&format!("{} ({:?} confidence)", mapping.data_field, mapping.confidence)),
        );
    }

    plan
}

/// Turn one raw entry into a typed action, or say why it cannot be.
pub fn validate_action(raw: &RawAction) -> Result<Action, String> {
    let kind: ActionKind = raw.kind.parse()?;
    let target = parse_target(raw.target.as_ref())?;
    let value = parse_value(raw.value.as_ref())?;

    if kind.needs_target() && target.is_none() {
        return Err(format!("{} requires a target", kind));
    }

    let value = match kind {
        ActionKind::SetText | ActionKind::Select => match value {
            Some(v) if !v.is_empty() => Some(v),
            _ => return Err(format!("{} requires a non-empty value", kind)),
        },
        ActionKind::Wait => {
            let secs = match value.as_deref() {
                None => DEFAULT_WAIT_SECS,
                Some(raw_secs) => match raw_secs.trim().parse::<f64>() {
                    Ok(s) if s < 0.0 => return Err(format!("wait duration {} is negative", s)),
                    Ok(s) if s > MAX_WAIT_SECS => {
                        return Err(format!("wait duration {} exceeds {}s", s, MAX_WAIT_SECS));
                    }
                    _ => parse_seconds(raw_secs).unwrap_or(DEFAULT_WAIT_SECS),
                },
            };
            Some(secs.to_string())
        }
        ActionKind::Click | ActionKind::Tab => None,
    };

    Ok(Action {
        kind,
        // Tab acts on the focused container, never on a resolved target
        target: if kind == ActionKind::Tab { None } else { target },
        value,
        description: raw.description.clone(),
    })
}

fn parse_target(raw: Option<&Value>) -> Result<Option<ResolveTarget>, String> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(ResolveTarget::Text(s.clone()))),
        Some(obj @ Value::Object(_)) => {
            let criteria = ElementCriteria::deserialize(obj)
                .map_err(|e| format!("malformed target criteria: {}", e))?;
            Ok((!criteria.is_empty()).then_some(ResolveTarget::Criteria(criteria)))
        }
        Some(other) => Err(format!("target must be text or criteria, got {}", other)),
    }
}

fn parse_value(raw: Option<&Value>) -> Result<Option<String>, String> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(format!("value must be a scalar, got {}", other)),
    }
}

fn failure(index: usize, reason: String, entry: &Value) -> ValidationFailure {
    ValidationFailure {
        index,
        reason,
        entry: entry.to_string(),
    }
}

fn log_plan(plan: &ActionPlan) {
    for rejected in &plan.rejected {
        warn!(index = rejected.index, reason = %rejected.reason, "oracle entry rejected");
    }
    debug!(
        source = ?plan.source,
        actions = plan.len(),
        rejected = plan.validation_failures(),
        "plan built"
    );
}
