//! Test doubles shared by unit tests

use crate::chat::{Choice, CompletionRequest, CompletionResponse, Message, Usage};
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

/// Model client that replays canned replies and records every dispatch
pub struct ScriptedClient {
    replies: Vec<String>,
    fail_on_call: Option<usize>,
    calls: Mutex<Vec<(Instant, CompletionRequest)>>,
}

impl ScriptedClient {
    /// Always reply with `text`
    pub fn replying(text: &str) -> Self {
        Self::with_replies(vec![text.to_string()])
    }

    /// Reply with `replies` in order, repeating the last one
    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            replies,
            fail_on_call: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reply "output N" for the N-th call (1-based)
    pub fn numbered() -> Self {
        Self::with_replies(Vec::new())
    }

    /// Return a provider error on the given 1-based call
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.calls.lock().iter().map(|(_, r)| r.clone()).collect()
    }

    /// When each request was received
    pub fn dispatch_times(&self) -> Vec<Instant> {
        self.calls.lock().iter().map(|(at, _)| *at).collect()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push((Instant::now(), request));
            calls.len()
        };

        if self.fail_on_call == Some(call) {
            return Err(Error::llm("Request failed with status 500: scripted failure"));
        }

        let content = if self.replies.is_empty() {
            format!("output {}", call)
        } else {
            let index = (call - 1).min(self.replies.len() - 1);
            self.replies[index].clone()
        };

        Ok(CompletionResponse {
            id: format!("scripted-{}", call),
            model: "scripted".to_string(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(content),
                finish_reason: Some("stop".to_string()),
            }],
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
        })
    }

    fn client_type(&self) -> &str {
        "scripted"
    }

    fn endpoint(&self) -> &str {
        "memory://scripted"
    }
}
