
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkynetError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Malformed filter '{token}': expected key=value")]
    MalformedFilter { token: String },
    #[error("Filter not recognized: {key}")]
    UnknownFilter { key: String },
    #[error("Invalid value '{value}' for filter {key}: {reason}")]
    InvalidFilterValue { key: String, value: String, reason: String },
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("Lookup error: {0}")]
    Transport(String),
    #[error("Unexpected response: expected {expected}, found {found}")]
    UnexpectedShape { expected: &'static str, found: String },
    #[error("Projection error on {field}: {message}")]
    Projection { field: String, message: String },
    #[error("Duplicate index {key}={value}")]
    DuplicateIndex { key: String, value: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SkynetError>;

// Helper conversions
impl From<reqwest::Error> for SkynetError {
    fn from(e: reqwest::Error) -> Self { Self::Transport(e.to_string()) }
}
impl From<config::ConfigError> for SkynetError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}

impl SkynetError {
    /// Short label describing the JSON kind found where another was expected.
    pub(crate) fn shape(expected: &'static str, found: &serde_json::Value) -> Self {
        let found = match found {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "bool",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::String(_) => "string",
            serde_json::Value::Array(_) => "array",
            serde_json::Value::Object(_) => "object",
        };
        Self::UnexpectedShape { expected, found: found.to_string() }
    }
}
