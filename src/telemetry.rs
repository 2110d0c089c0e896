//! Telemetry lifecycle
//!
//! [`Telemetry::init`] installs the log subscriber and is called once from
//! `main`. The returned handle is passed into each run, records a
//! [`RunTrace`] per kickoff, and is torn down with [`Telemetry::shutdown`].

use crate::error::Error;
use crate::task::TaskOutput;
use crate::tracing_ext::RunTrace;
use crate::types::SpanId;
use parking_lot::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Subscriber options
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Run tracking handle
#[derive(Debug, Default)]
pub struct Telemetry {
    current: Mutex<Option<RunTrace>>,
    finished: Mutex<Vec<RunTrace>>,
}

impl Telemetry {
    /// Install the global log subscriber (writing to stderr) and return a handle
    pub fn init(config: &TelemetryConfig) -> Self {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let registry = tracing_subscriber::registry().with(filter);
        let installed = match config.format {
            LogFormat::Pretty => registry
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Json => registry
                .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
                .try_init(),
        };

        if let Err(e) = installed {
            // Another subscriber is already active; keep using it.
            tracing::debug!(error = %e, "log subscriber already installed");
        } else {
            tracing::info!(format = ?config.format, "telemetry initialized");
        }

        Self::detached()
    }

    /// Handle that records runs without touching the global subscriber
    pub fn detached() -> Self {
        Self::default()
    }

    /// Begin tracking a run
    pub fn start_run(&self, name: &str) -> RunTrace {
        let trace = RunTrace::new(name);
        tracing::info!(run_id = %trace.run_id, name, "run started");
        *self.current.lock() = Some(trace.clone());
        trace
    }

    /// Record that a task was dispatched
    pub fn task_started(&self, task_key: &str, agent_role: &str) -> Option<SpanId> {
        tracing::info!(task = task_key, agent = agent_role, "task started");
        self.current
            .lock()
            .as_mut()
            .map(|trace| trace.open_span(task_key, agent_role))
    }

    /// Record a completed task
    pub fn task_completed(&self, span: Option<SpanId>, output: &TaskOutput) {
        tracing::info!(
            task = %output.task_key,
            file = %output.output_path.display(),
            tokens = output.usage.total_tokens,
            "task completed"
        );
        if let (Some(span), Some(trace)) = (span, self.current.lock().as_mut()) {
            trace.complete_span(span, output);
        }
    }

    /// Record a failed task
    pub fn task_failed(&self, span: Option<SpanId>, task_key: &str, error: &Error) {
        tracing::error!(task = task_key, error = %error, "task failed");
        if let (Some(span), Some(trace)) = (span, self.current.lock().as_mut()) {
            trace.fail_span(span, error.to_string());
        }
    }

    /// Close the current run and return its trace
    pub fn finish_run(&self) -> Option<RunTrace> {
        let mut trace = self.current.lock().take()?;
        trace.finish();
        tracing::info!(
            run_id = %trace.run_id,
            completed = trace.completed(),
            spans = trace.spans.len(),
            total_tokens = trace.total_tokens.total_tokens,
            "run finished"
        );
        self.finished.lock().push(trace.clone());
        Some(trace)
    }

    /// Runs finished so far
    pub fn runs(&self) -> Vec<RunTrace> {
        self.finished.lock().clone()
    }

    /// Close any open run and emit the session summary
    pub fn shutdown(self) -> Vec<RunTrace> {
        if self.current.lock().is_some() {
            tracing::warn!("shutting down with a run still open");
            self.finish_run();
        }
        let runs = self.finished.into_inner();
        let tokens: u64 = runs.iter().map(|r| r.total_tokens.total_tokens).sum();
        tracing::info!(runs = runs.len(), total_tokens = tokens, "telemetry shut down");
        runs
    }
}
