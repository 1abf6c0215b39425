pub mod gemini;
pub mod ollama;
pub mod oracle;
pub mod prompt;
