//! Configuration types for the crew
//!
//! Two layers: provider configuration (where a model handle sends its
//! requests) and run [`Settings`] (rate cap, output directory, definition
//! files), the latter read from an optional `saas-planner.toml` and
//! `SAAS_PLANNER_*` environment variables.

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable holding the Groq API key
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Model configuration for a handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier (e.g., "llama3-70b-8192")
    pub model: String,
    /// Temperature for sampling (0.0-2.0)
    pub temperature: f32,
    /// Maximum tokens for completion
    pub max_tokens: Option<u32>,
}

impl ModelConfig {
    /// Create a new model configuration
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Configuration for an OpenAI-compatible chat completions provider
#[derive(Clone)]
pub struct ProviderConfig {
    /// Handle name agents refer to (e.g., "groq")
    pub name: String,
    /// API key
    pub api_key: SecretString,
    /// Base URL, without the `/chat/completions` suffix
    pub base_url: Url,
    /// Model served through this handle
    pub model: ModelConfig,
    /// Request timeout
    pub timeout: Duration,
    /// App name sent as `X-Title`
    pub app_name: String,
}

impl ProviderConfig {
    /// Create a provider configuration
    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        base_url: Url,
        model: ModelConfig,
    ) -> Self {
        Self {
            name: name.into(),
            api_key: SecretString::from(api_key.into()),
            base_url,
            model,
            timeout: Duration::from_secs(120),
            app_name: "saas-planner".to_string(),
        }
    }

    /// Groq-hosted Llama 3, keyed by `GROQ_API_KEY`
    pub fn groq_from_env() -> Result<Self> {
        let api_key = std::env::var(GROQ_API_KEY_ENV).map_err(|_| {
            Error::config(format!("{} environment variable not set", GROQ_API_KEY_ENV))
        })?;

        Ok(Self::new(
            presets::GROQ,
            api_key,
            Url::parse(presets::GROQ_BASE_URL)?,
            ModelConfig::new(presets::GROQ_MODEL),
        ))
    }

    /// Local Ollama server through its OpenAI-compatible endpoint
    pub fn ollama() -> Result<Self> {
        Ok(Self::new(
            presets::OLLAMA,
            "ollama",
            Url::parse(presets::OLLAMA_BASE_URL)?,
            ModelConfig::new(presets::OLLAMA_MODEL),
        ))
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Get the API key as a string
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("api_key", &"***REDACTED***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("app_name", &self.app_name)
            .finish()
    }
}

/// Known model handles
pub mod presets {
    /// Handle name for Groq
    pub const GROQ: &str = "groq";
    /// Groq OpenAI-compatible endpoint
    pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
    /// Model used through Groq
    pub const GROQ_MODEL: &str = "llama3-70b-8192";

    /// Handle name for a local Ollama server
    pub const OLLAMA: &str = "ollama";
    /// Ollama OpenAI-compatible endpoint
    pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
    /// Model used through Ollama
    pub const OLLAMA_MODEL: &str = "mistral";
}

/// Run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Ceiling on model requests per minute
    #[serde(default = "default_max_rpm")]
    pub max_rpm: u32,
    /// Directory task outputs are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Agent definitions file (compiled-in defaults when absent)
    #[serde(default)]
    pub agents_file: Option<PathBuf>,
    /// Task definitions file (compiled-in defaults when absent)
    #[serde(default)]
    pub tasks_file: Option<PathBuf>,
    /// Write `run_trace.json` next to the outputs
    #[serde(default)]
    pub write_trace: bool,
    /// Log every task output as it completes
    #[serde(default = "default_verbose")]
    pub verbose: bool,
}

fn default_max_rpm() -> u32 {
    2
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_verbose() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_rpm: default_max_rpm(),
            output_dir: default_output_dir(),
            agents_file: None,
            tasks_file: None,
            write_trace: false,
            verbose: default_verbose(),
        }
    }
}

impl Settings {
    /// Default settings file name, looked up without extension
    pub const FILE_STEM: &'static str = "saas-planner";

    /// Environment prefix for overrides (e.g. `SAAS_PLANNER_MAX_RPM`)
    pub const ENV_PREFIX: &'static str = "SAAS_PLANNER";

    /// Load settings from `path` (or `saas-planner.*` in the working
    /// directory when `None`), then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => ::config::File::from(path).required(true),
            None => ::config::File::with_name(Self::FILE_STEM).required(false),
        };

        let settings: Settings = ::config::Config::builder()
            .add_source(file)
            .add_source(
                ::config::Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("_")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the run cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.max_rpm == 0 {
            return Err(Error::config("max_rpm must be at least 1"));
        }
        Ok(())
    }
}
