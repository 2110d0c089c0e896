//! Run traces: what each task did, when, and at what token cost

use crate::error::Result;
use crate::task::TaskOutput;
use crate::types::{RunId, SpanId, TokenUsage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name used when a trace is written next to the outputs
pub const TRACE_FILE_NAME: &str = "run_trace.json";

/// Trace of one crew run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTrace {
    /// Unique run identifier
    pub run_id: RunId,
    /// Human-readable workflow name
    pub name: String,
    /// Start timestamp
    pub started_at: DateTime<Utc>,
    /// End timestamp
    pub ended_at: Option<DateTime<Utc>>,
    /// One span per dispatched task, in execution order
    pub spans: Vec<TaskSpan>,
    /// Aggregate token usage
    pub total_tokens: TokenUsage,
}

/// Span covering one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpan {
    /// Unique span identifier
    pub span_id: SpanId,
    /// Task key
    pub task_key: String,
    /// Role of the performing agent
    pub agent_role: String,
    /// Start timestamp
    pub started_at: DateTime<Utc>,
    /// End timestamp
    pub ended_at: Option<DateTime<Utc>>,
    /// Outcome
    pub status: SpanStatus,
    /// Tokens consumed
    pub usage: TokenUsage,
    /// Output file, when written
    pub output_path: Option<PathBuf>,
}

/// Outcome of a span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "message")]
pub enum SpanStatus {
    /// Still running
    Running,
    /// Completed
    Ok,
    /// Failed with the given message
    Failed(String),
}

impl RunTrace {
    /// Start a new trace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            run_id: RunId::new(),
            name: name.into(),
            started_at: Utc::now(),
            ended_at: None,
            spans: Vec::new(),
            total_tokens: TokenUsage::default(),
        }
    }

    /// Open a span for a task
    pub fn open_span(&mut self, task_key: &str, agent_role: &str) -> SpanId {
        let span = TaskSpan {
            span_id: SpanId::new(),
            task_key: task_key.to_string(),
            agent_role: agent_role.to_string(),
            started_at: Utc::now(),
            ended_at: None,
            status: SpanStatus::Running,
            usage: TokenUsage::default(),
            output_path: None,
        };
        let id = span.span_id;
        self.spans.push(span);
        id
    }

    /// Close a span with the task's output
    pub fn complete_span(&mut self, span_id: SpanId, output: &TaskOutput) {
        if let Some(span) = self.span_mut(span_id) {
            span.ended_at = Some(Utc::now());
            span.status = SpanStatus::Ok;
            span.usage = output.usage;
            span.output_path = Some(output.output_path.clone());
        }
        self.total_tokens.add(output.usage);
    }

    /// Close a span as failed
    pub fn fail_span(&mut self, span_id: SpanId, message: impl Into<String>) {
        if let Some(span) = self.span_mut(span_id) {
            span.ended_at = Some(Utc::now());
            span.status = SpanStatus::Failed(message.into());
        }
    }

    /// Mark the run finished
    pub fn finish(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    /// Number of spans that completed
    pub fn completed(&self) -> usize {
        self.spans
            .iter()
            .filter(|s| s.status == SpanStatus::Ok)
            .count()
    }

    /// Wall-clock duration, once finished
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|end| end - self.started_at)
    }

    /// Write the trace as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    fn span_mut(&mut self, span_id: SpanId) -> Option<&mut TaskSpan> {
        self.spans.iter_mut().find(|s| s.span_id == span_id)
    }
}
