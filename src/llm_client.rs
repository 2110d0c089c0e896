//! Model client trait and the named handles agents select by key

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::chat::{CompletionRequest, CompletionResponse};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Unified trait for chat completion clients
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a completion request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the client type for debugging/logging
    fn client_type(&self) -> &str;

    /// Get the endpoint requests are sent to
    fn endpoint(&self) -> &str;
}

/// A named model selection: which client to call and with which model
#[derive(Clone)]
pub struct LlmHandle {
    /// Handle name as referenced in agent definitions
    pub name: String,
    /// Model parameters sent with each request
    pub model: ModelConfig,
    client: Arc<dyn LlmClient>,
}

impl LlmHandle {
    /// Create a new handle
    pub fn new(name: impl Into<String>, model: ModelConfig, client: Arc<dyn LlmClient>) -> Self {
        Self {
            name: name.into(),
            model,
            client,
        }
    }

    /// Client behind this handle
    pub fn client(&self) -> &Arc<dyn LlmClient> {
        &self.client
    }

    /// Same handle routed through a different client (e.g. a throttled wrapper)
    pub fn with_client(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.client = client;
        self
    }
}

impl std::fmt::Debug for LlmHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmHandle")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("client_type", &self.client.client_type())
            .field("endpoint", &self.client.endpoint())
            .finish()
    }
}

/// Model handles available to agent definitions, keyed by name
#[derive(Debug, Clone, Default)]
pub struct LlmRegistry {
    handles: BTreeMap<String, LlmHandle>,
}

impl LlmRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle, replacing any handle with the same name
    pub fn register(&mut self, handle: LlmHandle) {
        self.handles.insert(handle.name.clone(), handle);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, handle: LlmHandle) -> Self {
        self.register(handle);
        self
    }

    /// Look up a handle
    pub fn get(&self, name: &str) -> Option<&LlmHandle> {
        self.handles.get(name)
    }

    /// Look up a handle, naming the referrer when it is missing
    pub fn resolve(&self, name: &str, referenced_by: &str) -> Result<LlmHandle> {
        self.get(name)
            .cloned()
            .ok_or_else(|| Error::unresolved("llm", name, referenced_by))
    }

    /// Route every handle through a wrapping client
    pub fn map_clients<F>(self, mut wrap: F) -> Self
    where
        F: FnMut(Arc<dyn LlmClient>) -> Arc<dyn LlmClient>,
    {
        let handles = self
            .handles
            .into_iter()
            .map(|(name, handle)| {
                let client = wrap(handle.client().clone());
                (name, handle.with_client(client))
            })
            .collect();
        Self { handles }
    }
}
