use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::FillError;

static FENCED_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*([\{\[].*?[\}\]])\s*```").ok());

/// Structured payload found in an oracle reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    /// Field-to-element correspondences, entries not yet validated
    Mappings {
        entries: Vec<Value>,
        instructions: Option<String>,
    },
    /// Explicit action list, entries not yet validated
    Actions(Vec<Value>),
}

impl Proposal {
    pub fn len(&self) -> usize {
        match self {
            Proposal::Mappings { entries, .. } => entries.len(),
            Proposal::Actions(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pull the JSON payload out of free text.
///
/// Tries a fenced code block first, then the whole reply, then the outermost
/// `{...}` span and the outermost `[...]` span. The first candidate that
/// parses wins.
pub fn extract_payload(text: &str) -> Result<Value, FillError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FillError::Mapping("oracle returned an empty reply".into()));
    }

    let mut candidates: Vec<&str> = Vec::new();
    if let Some(block) = FENCED_BLOCK
        .as_ref()
        .and_then(|re| re.captures(trimmed))
        .and_then(|c| c.get(1))
    {
        candidates.push(block.as_str());
    }
    candidates.push(trimmed);
    candidates.extend(outermost_span(trimmed, '{', '}'));
    candidates.extend(outermost_span(trimmed, '[', ']'));

    candidates
        .into_iter()
        .find_map(|candidate| {
            serde_json::from_str::<Value>(candidate)
                .ok()
                .filter(|v| v.is_object() || v.is_array())
        })
        .ok_or_else(|| {
            FillError::Mapping(format!(
                "no JSON object or array found in oracle reply: {}",
                preview(trimmed)
            ))
        })
}

/// Extract and classify the payload of an oracle reply.
pub fn parse_proposal(text: &str) -> Result<Proposal, FillError> {
    let payload = extract_payload(text)?;

    match payload {
        Value::Object(mut map) => {
            if let Some(Value::Array(entries)) = map.remove("mappings") {
                let instructions = map
                    .remove("instructions")
                    .and_then(|v| v.as_str().map(str::to_string));
                return Ok(Proposal::Mappings {
                    entries,
                    instructions,
                });
            }
            if let Some(Value::Array(entries)) = map.remove("actions") {
                return Ok(Proposal::Actions(entries));
            }
            Err(FillError::Mapping(
                "oracle reply has neither a 'mappings' nor an 'actions' list".into(),
            ))
        }
        Value::Array(entries) => {
            let looks_like_mappings = entries
                .first()
                .and_then(Value::as_object)
                .is_some_and(|o| o.contains_key("data_field"));
            if looks_like_mappings {
                Ok(Proposal::Mappings {
                    entries,
                    instructions: None,
                })
            } else {
                Ok(Proposal::Actions(entries))
            }
        }
        _ => Err(FillError::Mapping("oracle payload is not a list".into())),
    }
}

fn outermost_span(text: &str, opener: char, closer: char) -> Option<&str> {
    let start = text.find(opener)?;
    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}

fn preview(text: &str) -> String {
    let snippet: String = text.chars().take(80).collect();
    if snippet.len() < text.len() {
        format!("{}...", snippet)
    } else {
        snippet
    }
}
