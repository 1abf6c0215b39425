use thiserror::Error;

/// Failure of a single accessibility backend primitive.
///
/// Every backend call is fallible. Callers decide the blast radius: the
/// resolver and snapshot treat these as "node unavailable", the executor
/// records them against one action, and only `root()` failures end a form.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Target application or its root element could not be reached
    #[error("Cannot connect to '{app}': {reason}")]
    Connection { app: String, reason: String },

    /// The handle no longer refers to a live element
    #[error("Element '{0}' is no longer available")]
    StaleHandle(String),

    /// The element exists but the attribute or operation is unreadable right now
    #[error("Element unavailable: {0}")]
    Unavailable(String),

    /// The backend does not implement this capability
    #[error("Operation not supported by backend: {0}")]
    Unsupported(&'static str),

    /// The backend attempted the operation and the UI rejected it
    #[error("{operation} failed: {reason}")]
    OperationFailed { operation: String, reason: String },

    /// Bridge process could not be spawned
    #[error("Failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// Reading from or writing to the bridge process failed
    #[error("Bridge I/O error: {0}")]
    Io(String),

    /// Bridge answered a request with an error or a malformed reply
    #[error("Bridge command '{command}' failed: {error}")]
    Protocol { command: String, error: String },

    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },
}

impl BackendError {
    pub fn failed(operation: &str, reason: impl ToString) -> Self {
        BackendError::OperationFailed {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// The fill taxonomy.
///
/// `Connection`, `Snapshot` and `Mapping` abort the current form.
/// `ElementNotFound` and `ActionExecution` are recorded against one action
/// and never stop a plan.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FillError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Action execution error: {0}")]
    ActionExecution(String),
}

impl FillError {
    /// Whether this error ends the current form's attempt.
    pub fn is_form_fatal(&self) -> bool {
        matches!(
            self,
            FillError::Connection(_) | FillError::Snapshot(_) | FillError::Mapping(_)
        )
    }
}

/// Failure talking to a text-inference provider.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Inference request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Inference provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Inference provider returned no text")]
    EmptyResponse,

    #[error("Oracle is not configured: {0}")]
    NotConfigured(String),
}

/// Failure loading form value records from disk.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("Invalid CSV at line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("Unsupported data format: {0}")]
    UnsupportedFormat(String),

    #[error("Record {index} is not a flat object of values")]
    Shape { index: usize },
}
