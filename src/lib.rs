//! # saas-planner
//!
//! A sequential multi-agent crew that turns a one-line SaaS product idea into
//! eight planning documents: market analysis, technology selection, UX
//! design, compliance, financials, agile plan, customer support and
//! marketing.
//!
//! ## Features
//!
//! - **Declarative crew**: agents and tasks are keyed YAML definitions,
//!   resolved against a fixed blueprint
//! - **Context forwarding**: each task sees the outputs of every task before it
//! - **Request ceiling**: every model call passes through one sliding-window cap
//! - **Fetch tools**: parameterized GET-and-reshape helpers for market,
//!   technology and financial data
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use saas_planner::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let telemetry = Telemetry::init(&TelemetryConfig::default());
//!     let settings = Settings::load(None)?;
//!
//!     let registry = LlmRegistry::new()
//!         .with(ChatClient::new(ProviderConfig::groq_from_env()?)?.into_handle());
//!     let crew = SequentialCrew::assemble(
//!         "saas-planning",
//!         &Definitions::builtin()?,
//!         &CrewBlueprint::saas(),
//!         registry,
//!         &settings,
//!     )?;
//!
//!     if let Some(idea) = ProductIdea::parse("invoicing for freelance designers") {
//!         let output = crew.kickoff(&CrewInputs::for_idea(&idea), &telemetry).await?;
//!         println!("{}", output.raw);
//!     }
//!     telemetry.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod agent;
pub mod chat;
pub mod config;
pub mod error;
pub mod inputs;
pub mod llm_client;
pub mod orchestrator;
pub mod task;
pub mod telemetry;
pub mod throttle;
pub mod tools;
pub mod tracing_ext;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use agent::{Agent, AgentBuilder, AgentOutput};
pub use chat::{ChatClient, CompletionRequest, CompletionResponse, Message, Role};
pub use crate::config::{ModelConfig, ProviderConfig, Settings};
pub use error::{Error, Result};
pub use inputs::{CrewInputs, ProductIdea, NO_IDEA_NOTICE};
pub use llm_client::{LlmClient, LlmHandle, LlmRegistry};
pub use orchestrator::{CrewBlueprint, CrewOutput, Definitions, ExecutionPolicy, SequentialCrew};
pub use task::{Task, TaskOutput};
pub use telemetry::{LogFormat, Telemetry, TelemetryConfig};
pub use throttle::{RequestCap, ThrottledClient};
pub use tools::{
    fetch, FetchError, FetchErrorKind, FetchResult, FetchSpec, FetchTool, Record, Tool,
    ToolContext, ToolOutput,
};
pub use tracing_ext::RunTrace;
pub use types::{RunId, SpanId, TokenUsage};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::chat::ChatClient;
    pub use crate::config::{ProviderConfig, Settings};
    pub use crate::error::{Error, Result};
    pub use crate::inputs::{CrewInputs, ProductIdea};
    pub use crate::llm_client::LlmRegistry;
    pub use crate::orchestrator::{CrewBlueprint, Definitions, SequentialCrew};
    pub use crate::telemetry::{Telemetry, TelemetryConfig};
    pub use crate::tools::{FetchSpec, FetchTool, Tool};
    pub use crate::types::*;
}
