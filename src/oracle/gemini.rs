use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OracleError;
use crate::oracle::oracle::TextInference;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Google Gemini over the `generateContent` REST call.
pub struct GeminiInference {
    pub base_url: String,
    pub model: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Value>,
}

impl GeminiInference {
    pub fn new(api_key: &str, model: &str) -> Result<Self, OracleError> {
        if api_key.trim().is_empty() {
            return Err(OracleError::NotConfigured("Gemini API key is empty".into()));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    /// Key from the `api_key_env` variable; model from the argument, then
    /// `GEMINI_MODEL`, then the default.
    pub fn from_env(api_key_env: &str, model: Option<&str>) -> Result<Self, OracleError> {
        let api_key = std::env::var(api_key_env)
            .map_err(|_| OracleError::NotConfigured(format!("{} is not set", api_key_env)))?;
        let model = model
            .map(str::to_string)
            .or_else(|| std::env::var("GEMINI_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        Self::new(&api_key, &model)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl TextInference for GeminiInference {
    fn infer_text(&self, prompt: &str) -> Result<String, OracleError> {
        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig::default(),
        };

        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json()?;
        first_candidate_text(&parsed.candidates).ok_or(OracleError::EmptyResponse)
    }
}

/// Concatenated text parts of the first candidate.
fn first_candidate_text(candidates: &[Value]) -> Option<String> {
    let parts = candidates.first()?.get("content")?.get("parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    (!text.trim().is_empty()).then_some(text)
}
