use crate::plan::builder::FormValues;

/// Values worth sending: empty cells are left out.
fn values_json(values: &FormValues) -> String {
    let present: FormValues = values
        .iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    serde_json::to_string_pretty(&present).unwrap_or_else(|_| "{}".to_string())
}

/// Ask for field-to-element correspondences.
pub fn build_mapping_prompt(tree: &str, values: &FormValues) -> String {
    format!(
        r#"You are an expert at analyzing desktop application accessibility trees and mapping form data to the UI elements that should receive it.

FORM DATA TO FILL:
{values}

UI STRUCTURE OF THE APPLICATION:
{tree}

Map each data field to the element that should receive its value. Prefer editable
controls (text fields, combo boxes) over static labels. Match on titles,
descriptions, identifiers, or position relative to nearby labels.

Return ONLY a JSON object with this structure:
{{
  "mappings": [
    {{
      "data_field": "name_of_data_field",
      "ui_path": "how to find the element",
      "ui_identifier": "identifier if available",
      "ui_title": "title of the field",
      "confidence": "high|medium|low"
    }}
  ],
  "instructions": "anything special about the fill order"
}}

Respond with ONLY valid JSON, no explanation."#,
        values = values_json(values),
        tree = tree,
    )
}

/// Ask for an explicit ordered action list.
pub fn build_actions_prompt(tree: &str, values: &FormValues) -> String {
    let fields = values
        .iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are an expert at analyzing desktop application UI structures and generating automation commands.

UI STRUCTURE:
{tree}

DATA TO FILL:
{values}

Return a JSON array of actions that fills this form. Each action has:
- "type": "set_text" | "click" | "select" | "tab" | "wait"
- "target": the element title, identifier, or visible text
- "value": the value to set (set_text, select) or seconds to wait (wait)
- "description": what the action does

Example:
[
  {{"type": "set_text", "target": "Employee Name", "value": "John Doe", "description": "Enter employee name"}},
  {{"type": "tab", "description": "Move to next field"}}
]

Guidelines:
1. Match data fields to elements by title or identifier
2. Use "tab" only when a field cannot be targeted directly
3. Only target visible and enabled elements
4. Add a "wait" if the UI needs time to update
5. Fields to map: {fields}

Respond with ONLY the JSON array, no additional text."#,
        tree = tree,
        values = values_json(values),
        fields = if fields.is_empty() { "(none)" } else { &fields },
    )
}
