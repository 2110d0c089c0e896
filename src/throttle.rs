//! Request ceiling for model calls
//!
//! A sliding-window cap: at most `max_requests` dispatches inside any
//! `window`. There is no burst allowance beyond the ceiling itself; a caller
//! that would exceed it sleeps until the oldest dispatch leaves the window.

use crate::chat::{CompletionRequest, CompletionResponse};
use crate::error::Result;
use crate::llm_client::LlmClient;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding-window request ceiling
#[derive(Debug)]
pub struct RequestCap {
    max_requests: usize,
    window: Duration,
    dispatched: VecDeque<Instant>,
}

impl RequestCap {
    /// Cap of `max_requests` per `window`
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let max_requests = max_requests.max(1) as usize;
        Self {
            max_requests,
            window,
            dispatched: VecDeque::with_capacity(max_requests),
        }
    }

    /// Cap of `max_rpm` requests per minute
    pub fn per_minute(max_rpm: u32) -> Self {
        Self::new(max_rpm, Duration::from_secs(60))
    }

    /// Wrap for sharing between clients
    pub fn shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    /// How long the next dispatch must wait at `now`
    pub fn wait_time(&mut self, now: Instant) -> Duration {
        self.evict(now);
        if self.dispatched.len() < self.max_requests {
            return Duration::ZERO;
        }
        match self.dispatched.front() {
            Some(oldest) => (*oldest + self.window).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Wait for a free slot and record the dispatch
    pub async fn acquire(&mut self) {
        loop {
            let wait = self.wait_time(Instant::now());
            if wait.is_zero() {
                break;
            }
            tracing::info!(
                wait_secs = wait.as_secs_f64(),
                max_requests = self.max_requests,
                "request cap reached, waiting"
            );
            tokio::time::sleep(wait).await;
        }
        self.dispatched.push_back(Instant::now());
    }

    fn evict(&mut self, now: Instant) {
        while let Some(oldest) = self.dispatched.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                self.dispatched.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Client wrapper that passes every request through a shared [`RequestCap`]
pub struct ThrottledClient {
    inner: Arc<dyn LlmClient>,
    cap: Arc<Mutex<RequestCap>>,
}

impl ThrottledClient {
    /// Wrap `inner` so its requests count against `cap`
    pub fn new(inner: Arc<dyn LlmClient>, cap: Arc<Mutex<RequestCap>>) -> Self {
        Self { inner, cap }
    }
}

#[async_trait]
impl LlmClient for ThrottledClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        // The lock is held through the wait so callers queue in order.
        self.cap.lock().await.acquire().await;
        self.inner.complete(request).await
    }

    fn client_type(&self) -> &str {
        self.inner.client_type()
    }

    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }
}
