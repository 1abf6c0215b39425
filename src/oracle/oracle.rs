use std::cell::RefCell;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::OracleError;
use crate::oracle::prompt::{build_actions_prompt, build_mapping_prompt};
use crate::plan::builder::FormValues;

// ============================================================================
// Traits
// ============================================================================

/// Which kind of answer to ask the oracle for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStyle {
    /// Field-to-element mappings, one `set_text` each
    #[default]
    Mapping,
    /// An explicit action list
    Actions,
}

impl FromStr for ProposalStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mapping" | "mappings" => Ok(ProposalStyle::Mapping),
            "actions" => Ok(ProposalStyle::Actions),
            other => Err(format!("unknown proposal style '{}' (expected mapping or actions)", other)),
        }
    }
}

/// Everything the oracle sees for one form.
#[derive(Debug, Clone, Copy)]
pub struct OracleRequest<'a> {
    /// Rendered snapshot
    pub tree: &'a str,
    pub values: &'a FormValues,
    pub style: ProposalStyle,
}

/// Proposes how to fill a form. Returns the raw reply; extracting and
/// validating its payload is the caller's job.
pub trait MappingOracle {
    fn propose(&self, request: &OracleRequest<'_>) -> Result<String, OracleError>;
}

impl<O: MappingOracle + ?Sized> MappingOracle for Box<O> {
    fn propose(&self, request: &OracleRequest<'_>) -> Result<String, OracleError> {
        (**self).propose(request)
    }
}

/// A text completion provider.
pub trait TextInference {
    fn infer_text(&self, prompt: &str) -> Result<String, OracleError>;
}

// ============================================================================
// LlmOracle: prompt a text model
// ============================================================================

pub struct LlmOracle {
    backend: Box<dyn TextInference>,
}

impl LlmOracle {
    pub fn new(backend: Box<dyn TextInference>) -> Self {
        Self { backend }
    }

    /// Oracle answering every prompt with `response`.
    pub fn with_mock_response(response: &str) -> Self {
        Self::new(Box::new(MockTextInference::new(response)))
    }

    pub fn build_prompt(request: &OracleRequest<'_>) -> String {
        match request.style {
            ProposalStyle::Mapping => build_mapping_prompt(request.tree, request.values),
            ProposalStyle::Actions => build_actions_prompt(request.tree, request.values),
        }
    }
}

impl MappingOracle for LlmOracle {
    fn propose(&self, request: &OracleRequest<'_>) -> Result<String, OracleError> {
        let prompt = Self::build_prompt(request);
        debug!(style = ?request.style, prompt_len = prompt.len(), "consulting oracle");
        let reply = self.backend.infer_text(&prompt)?;
        if reply.trim().is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        Ok(reply)
    }
}

// ============================================================================
// Fixed replies (tests, replay of a saved reply)
// ============================================================================

/// Oracle that always returns the same reply.
#[derive(Debug, Clone)]
pub struct StaticOracle {
    pub response: String,
}

impl StaticOracle {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
        }
    }

    pub fn from_file(path: &str) -> Result<Self, OracleError> {
        std::fs::read_to_string(path)
            .map(|response| Self { response })
            .map_err(|e| OracleError::NotConfigured(format!("cannot read response file {}: {}", path, e)))
    }
}

impl MappingOracle for StaticOracle {
    fn propose(&self, _request: &OracleRequest<'_>) -> Result<String, OracleError> {
        Ok(self.response.clone())
    }
}

/// Inference stand-in returning a canned response and keeping the prompts.
#[derive(Debug, Default)]
pub struct MockTextInference {
    pub response: String,
    prompts: RefCell<Vec<String>>,
}

impl MockTextInference {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl TextInference for MockTextInference {
    fn infer_text(&self, prompt: &str) -> Result<String, OracleError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.response.clone())
    }
}

impl<T: TextInference + ?Sized> TextInference for std::rc::Rc<T> {
    fn infer_text(&self, prompt: &str) -> Result<String, OracleError> {
        (**self).infer_text(prompt)
    }
}
