use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::oracle::oracle::TextInference;

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5:1.5b";

// ============================================================================
// Ollama Backend
// ============================================================================

pub struct OllamaInference {
    pub endpoint: String,
    pub model: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaInference {
    pub fn new(endpoint: &str, model: &str) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            client,
        })
    }

    /// Endpoint and model: explicit value, then `OLLAMA_ENDPOINT` /
    /// `OLLAMA_MODEL`, then the local defaults.
    pub fn from_settings(endpoint: Option<&str>, model: Option<&str>) -> Result<Self, OracleError> {
        let endpoint = endpoint
            .map(str::to_string)
            .or_else(|| std::env::var("OLLAMA_ENDPOINT").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_ENDPOINT.to_string());
        let model = model
            .map(str::to_string)
            .or_else(|| std::env::var("OLLAMA_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());
        Self::new(&endpoint, &model)
    }
}

impl TextInference for OllamaInference {
    fn infer_text(&self, prompt: &str) -> Result<String, OracleError> {
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
        };

        let response = self.client.post(&self.endpoint).json(&request).send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let ollama_response: OllamaResponse = response.json()?;
        Ok(ollama_response.response)
    }
}
