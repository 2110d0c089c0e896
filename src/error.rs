//! Error types for the saas-planner crew

use thiserror::Error;

/// Result type alias for crew operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crew
#[derive(Debug, Error)]
pub enum Error {
    /// Error reported by the model provider
    #[error("LLM provider error: {0}")]
    Llm(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML definition parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Agent error
    #[error("Agent error: {0}")]
    Agent(String),

    /// Task execution error
    #[error("Task '{task}' failed: {message}")]
    Task { task: String, message: String },


    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A definition references a key that is not defined
    #[error("Unresolved {kind} '{key}' referenced by '{referenced_by}'")]
    UnresolvedKey {
        kind: &'static str,
        key: String,
        referenced_by: String,
    },

    /// A definition entry is missing a required field
    #[error("Missing field '{field}' in {kind} '{key}'")]
    MissingField {
        kind: &'static str,
        key: String,
        field: &'static str,
    },

    /// Malformed URL in configuration
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a provider error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Create an agent error
    pub fn agent(msg: impl Into<String>) -> Self {
        Self::Agent(msg.into())
    }

    /// Create a task error
    pub fn task(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Task {
            task: task.into(),
            message: message.into(),
        }
    }


    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unresolved key error
    pub fn unresolved(
        kind: &'static str,
        key: impl Into<String>,
        referenced_by: impl Into<String>,
    ) -> Self {
        Self::UnresolvedKey {
            kind,
            key: key.into(),
            referenced_by: referenced_by.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(kind: &'static str, key: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            kind,
            key: key.into(),
            field,
        }
    }
}

impl From<::config::ConfigError> for Error {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
