use std::error::Error;
use std::path::Path;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::backend::backend::AccessibilityBackend;
use crate::backend::bridge::BridgeBackend;
use crate::backend::memory::MemoryBackend;
use crate::error::OracleError;
use crate::executor::executor::{ActionExecutor, ExecutorConfig};
use crate::executor::settle::{
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_TIMEOUT_MS, DEFAULT_SETTLE_MS, Settle, SettleMode,
};
use crate::oracle::gemini::{DEFAULT_API_KEY_ENV, GeminiInference};
use crate::oracle::ollama::OllamaInference;
use crate::oracle::oracle::{LlmOracle, MappingOracle, ProposalStyle, StaticOracle};
use crate::orchestrator::orchestrator::{DEFAULT_PACING_SECS, OrchestratorConfig};
use crate::resolve::resolver::{DEFAULT_RESOLVE_DEPTH, ElementResolver};
use crate::tree::render::SnapshotFormat;
use crate::tree::snapshot::{DEFAULT_MAX_CHILDREN, DEFAULT_SNAPSHOT_DEPTH, SnapshotOptions};

pub const DEFAULT_CONFIG_FILE: &str = "form-autofill.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-autofill",
    version,
    about = "Fill desktop application forms through the accessibility tree"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Ollama API endpoint
    #[arg(long, global = true)]
    pub ollama_endpoint: Option<String>,

    /// Ollama model name
    #[arg(long, global = true)]
    pub ollama_model: Option<String>,

    /// Path to config file (default: form-autofill.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Replay a saved snapshot instead of driving a live application
    #[arg(long, global = true)]
    pub tree: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fill the focused form with the first record of a data file
    Fill {
        /// Form values (.json, .yaml, .yml or .csv)
        #[arg(long)]
        data: String,

        /// Target application (overrides config)
        #[arg(long)]
        app: Option<String>,

        /// Validation preset: none or w2
        #[arg(long, default_value = "w2")]
        preset: String,

        /// What to ask the oracle for: mapping or actions
        #[arg(long)]
        style: Option<String>,

        /// Snapshot rendering sent to the oracle: text or json
        #[arg(long)]
        format: Option<String>,
    },

    /// Fill one form per record, pausing between forms
    Batch {
        /// Form values (.json, .yaml, .yml or .csv)
        #[arg(long)]
        data: String,

        /// Target application (overrides config)
        #[arg(long)]
        app: Option<String>,

        /// Validation preset: none or w2
        #[arg(long, default_value = "w2")]
        preset: String,

        /// Seconds to wait between forms
        #[arg(long)]
        pacing: Option<f64>,

        /// Report format: console or json
        #[arg(long, default_value = "console")]
        report: String,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Capture and print the target's accessibility tree
    Inspect {
        /// Target application (overrides config)
        #[arg(long)]
        app: Option<String>,

        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Maximum depth to capture
        #[arg(long)]
        depth: Option<usize>,

        /// Write the snapshot to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Check a data file against the validation preset without filling
    Validate {
        /// Form values (.json, .yaml, .yml or .csv)
        #[arg(long)]
        data: String,

        /// Validation preset: none or w2
        #[arg(long, default_value = "w2")]
        preset: String,
    },

    /// Write sample W-2 records to a JSON file
    Sample {
        #[arg(short, long, default_value = "sample_w2_data.json")]
        output: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-autofill.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub executor: ExecutorSection,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_app")]
    pub app: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self { app: default_app() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_snapshot_depth")]
    pub max_depth: usize,

    #[serde(default = "default_max_children")]
    pub max_children: Option<usize>,

    #[serde(default)]
    pub format: SnapshotFormat,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_SNAPSHOT_DEPTH,
            max_children: Some(DEFAULT_MAX_CHILDREN),
            format: SnapshotFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_resolve_depth")]
    pub max_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_RESOLVE_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorSection {
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default)]
    pub settle: SettleMode,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_ms: u64,

    #[serde(default)]
    pub field_delay_ms: u64,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            settle_ms: DEFAULT_SETTLE_MS,
            settle: SettleMode::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            field_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_pacing")]
    pub pacing_secs: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            pacing_secs: DEFAULT_PACING_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    #[default]
    Ollama,
    Gemini,
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub provider: OracleProvider,

    pub endpoint: Option<String>,

    pub model: Option<String>,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub style: ProposalStyle,

    /// Reply replayed by the `static` provider
    pub response_file: Option<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: OracleProvider::default(),
            endpoint: None,
            model: None,
            api_key_env: default_api_key_env(),
            style: ProposalStyle::default(),
            response_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Bridge,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    #[serde(default = "default_bridge_command")]
    pub bridge_command: String,

    #[serde(default)]
    pub bridge_args: Vec<String>,

    /// Saved snapshot served by the `memory` backend
    pub tree_file: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            bridge_command: default_bridge_command(),
            bridge_args: Vec::new(),
            tree_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    pub artifacts_dir: Option<String>,
    pub trace_file: Option<String>,
}

// Serde default helpers
fn default_app() -> String { "ProSeries".to_string() }
fn default_snapshot_depth() -> usize { DEFAULT_SNAPSHOT_DEPTH }
fn default_max_children() -> Option<usize> { Some(DEFAULT_MAX_CHILDREN) }
fn default_resolve_depth() -> usize { DEFAULT_RESOLVE_DEPTH }
fn default_settle_ms() -> u64 { DEFAULT_SETTLE_MS }
fn default_poll_interval() -> u64 { DEFAULT_POLL_INTERVAL_MS }
fn default_poll_timeout() -> u64 { DEFAULT_POLL_TIMEOUT_MS }
fn default_pacing() -> f64 { DEFAULT_PACING_SECS }
fn default_api_key_env() -> String { DEFAULT_API_KEY_ENV.to_string() }
fn default_bridge_command() -> String { "a11y-bridge".to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

pub fn build_snapshot_options(config: &AppConfig, depth: Option<usize>) -> SnapshotOptions {
    SnapshotOptions {
        max_depth: depth.unwrap_or(config.snapshot.max_depth),
        max_children: config.snapshot.max_children,
    }
}

pub fn build_executor(config: &AppConfig) -> ActionExecutor {
    let section = &config.executor;
    let settle = Settle::from_config(
        section.settle,
        section.settle_ms,
        section.poll_interval_ms,
        section.poll_timeout_ms,
    );
    ActionExecutor::new(
        ElementResolver::new(config.resolver.max_depth),
        ExecutorConfig {
            settle,
            action_delay: Duration::from_millis(section.field_delay_ms),
        },
    )
}

/// Orchestrator settings; `None` arguments fall back to the config file.
pub fn build_orchestrator_config(
    config: &AppConfig,
    app: Option<&str>,
    style: Option<ProposalStyle>,
    format: Option<SnapshotFormat>,
) -> OrchestratorConfig {
    OrchestratorConfig {
        app: app.unwrap_or(&config.target.app).to_string(),
        snapshot: build_snapshot_options(config, None),
        format: format.unwrap_or(config.snapshot.format),
        style: style.unwrap_or(config.oracle.style),
    }
}

/// Backend named by the config, or a memory backend over `tree` when given.
pub fn build_backend(
    config: &BackendConfig,
    tree: Option<&str>,
) -> Result<Box<dyn AccessibilityBackend>, Box<dyn Error>> {
    if let Some(path) = tree {
        return Ok(Box::new(MemoryBackend::from_snapshot_file(Path::new(path))?));
    }

    match config.kind {
        BackendKind::Memory => {
            let path = config
                .tree_file
                .as_deref()
                .ok_or("backend.kind is memory but backend.tree_file is not set")?;
            Ok(Box::new(MemoryBackend::from_snapshot_file(Path::new(path))?))
        }
        BackendKind::Bridge => Ok(Box::new(BridgeBackend::launch(
            &config.bridge_command,
            &config.bridge_args,
        )?)),
    }
}

/// Oracle named by the config. Ollama settings resolve CLI > config > env.
pub fn build_oracle(
    config: &OracleConfig,
    ollama_endpoint: Option<&str>,
    ollama_model: Option<&str>,
) -> Result<Box<dyn MappingOracle>, OracleError> {
    match config.provider {
        OracleProvider::Ollama => {
            let endpoint = ollama_endpoint.or(config.endpoint.as_deref());
            let model = ollama_model.or(config.model.as_deref());
            let inference = OllamaInference::from_settings(endpoint, model)?;
            Ok(Box::new(LlmOracle::new(Box::new(inference))))
        }
        OracleProvider::Gemini => {
            let mut inference = GeminiInference::from_env(&config.api_key_env, config.model.as_deref())?;
            if let Some(base) = config.endpoint.as_deref() {
                inference = inference.with_base_url(base);
            }
            Ok(Box::new(LlmOracle::new(Box::new(inference))))
        }
        OracleProvider::Static => {
            let path = config.response_file.as_deref().ok_or_else(|| {
                OracleError::NotConfigured("oracle.provider is static but oracle.response_file is not set".into())
            })?;
            Ok(Box::new(StaticOracle::from_file(path)?))
        }
    }
}
