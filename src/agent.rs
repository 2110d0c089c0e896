//! Agents: a role, its goal and backstory, and the model handle it speaks through

use crate::chat::{CompletionRequest, Message};
use crate::error::{Error, Result};
use crate::inputs::CrewInputs;
use crate::llm_client::LlmHandle;
use crate::types::TokenUsage;
use serde::{Deserialize, Serialize};

/// A configured role in the crew
#[derive(Debug, Clone)]
pub struct Agent {
    /// Definition key (e.g. "market_analyst")
    pub key: String,
    /// Role name, used as the agent's persona
    pub role: String,
    /// What the agent is trying to achieve
    pub goal: String,
    /// Background that shapes the agent's answers
    pub backstory: String,
    /// Whether the agent may hand work to others. Always false in this crew.
    pub allow_delegation: bool,
    /// Log the agent's output as it completes
    pub verbose: bool,
    llm: LlmHandle,
}

impl Agent {
    /// Create a new agent builder
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Model handle this agent uses
    pub fn llm(&self) -> &LlmHandle {
        &self.llm
    }

    /// Persona prompt sent as the system message, with inputs filled in
    pub fn system_prompt(&self, inputs: &CrewInputs) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}",
            inputs.interpolate(&self.role),
            inputs.interpolate(&self.backstory),
            inputs.interpolate(&self.goal),
        )
    }

    /// Run one prompt through the agent's model
    pub async fn perform(&self, inputs: &CrewInputs, prompt: &str) -> Result<AgentOutput> {
        let model = &self.llm.model;
        let mut request = CompletionRequest::new(
            &model.model,
            vec![
                Message::system(self.system_prompt(inputs)),
                Message::user(prompt),
            ],
        )
        .with_temperature(model.temperature);
        if let Some(max_tokens) = model.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        tracing::debug!(agent = %self.key, prompt_len = prompt.len(), "dispatching prompt");
        let response = self.llm.client().complete(request).await?;

        let content = response.first_content().trim().to_string();
        if content.is_empty() {
            return Err(Error::agent(format!(
                "{} received an empty completion",
                self.role
            )));
        }

        Ok(AgentOutput {
            agent_key: self.key.clone(),
            role: self.role.clone(),
            content,
            usage: TokenUsage::from(response.usage),
        })
    }
}

/// Agent builder
#[derive(Default)]
pub struct AgentBuilder {
    key: Option<String>,
    role: Option<String>,
    goal: Option<String>,
    backstory: Option<String>,
    allow_delegation: bool,
    verbose: bool,
    llm: Option<LlmHandle>,
}

impl AgentBuilder {
    /// Create a new agent builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the definition key
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the role
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the goal
    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    /// Set the backstory
    pub fn backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = Some(backstory.into());
        self
    }

    /// Allow or forbid delegation
    pub fn allow_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    /// Set verbosity
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the model handle
    pub fn llm(mut self, llm: LlmHandle) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Build the agent
    pub fn build(self) -> Result<Agent> {
        let key = self.key.ok_or_else(|| Error::config("Agent key is required"))?;
        let role = self
            .role
            .ok_or_else(|| Error::missing_field("agent", &key, "role"))?;
        let goal = self
            .goal
            .ok_or_else(|| Error::missing_field("agent", &key, "goal"))?;
        let backstory = self.backstory.unwrap_or_default();
        let llm = self
            .llm
            .ok_or_else(|| Error::missing_field("agent", &key, "llm"))?;

        if self.allow_delegation {
            return Err(Error::config(format!(
                "Agent '{}' enables delegation, which a sequential crew does not support",
                key
            )));
        }

        Ok(Agent {
            key,
            role,
            goal,
            backstory,
            allow_delegation: false,
            verbose: self.verbose,
            llm,
        })
    }
}

/// Agent output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Key of the agent that produced this output
    pub agent_key: String,
    /// Role of that agent
    pub role: String,
    /// Output content
    pub content: String,
    /// Tokens consumed
    pub usage: TokenUsage,
}
