//! Sequential crew
//!
//! Tasks execute one at a time in blueprint order. Each task sees the raw
//! outputs of every task before it; nothing else is shared. All model
//! requests pass through one [`RequestCap`].

use crate::agent::Agent;
use crate::config::Settings;
use crate::error::Result;
use crate::inputs::CrewInputs;
use crate::llm_client::{LlmClient, LlmRegistry};
use crate::orchestrator::config::{CrewBlueprint, Definitions};
use crate::task::{Task, TaskOutput};
use crate::telemetry::Telemetry;
use crate::throttle::{RequestCap, ThrottledClient};
use crate::tracing_ext::{RunTrace, TRACE_FILE_NAME};
use crate::types::{RunId, TokenUsage};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// How a crew runs its tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPolicy {
    /// Ceiling on model requests per minute
    pub max_rpm: u32,
    /// Carry memory between tasks beyond the forwarded context. Always false.
    pub memory: bool,
    /// Log each task output as it completes
    pub verbose: bool,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            max_rpm: 2,
            memory: false,
            verbose: true,
        }
    }
}

/// Sequential crew - tasks execute in declaration order
pub struct SequentialCrew {
    name: String,
    agents: Vec<Arc<Agent>>,
    tasks: Vec<Task>,
    policy: ExecutionPolicy,
    output_dir: PathBuf,
    write_trace: bool,
}

impl SequentialCrew {
    /// Build a crew from definitions, routing every model handle through a
    /// shared request cap
    pub fn assemble(
        name: impl Into<String>,
        definitions: &Definitions,
        blueprint: &CrewBlueprint,
        registry: LlmRegistry,
        settings: &Settings,
    ) -> Result<Self> {
        settings.validate()?;
        let policy = ExecutionPolicy {
            max_rpm: settings.max_rpm,
            memory: false,
            verbose: settings.verbose,
        };

        let cap = RequestCap::per_minute(policy.max_rpm).shared();
        let throttled = registry.map_clients(|client| {
            Arc::new(ThrottledClient::new(client, cap.clone())) as Arc<dyn LlmClient>
        });

        let resolved = definitions.resolve(blueprint, &throttled, policy.verbose)?;
        tracing::info!(
            agents = resolved.agents.len(),
            tasks = resolved.tasks.len(),
            max_rpm = policy.max_rpm,
            "crew assembled"
        );

        Ok(Self {
            name: name.into(),
            agents: resolved.agents,
            tasks: resolved.tasks,
            policy,
            output_dir: settings.output_dir.clone(),
            write_trace: settings.write_trace,
        })
    }

    /// Agents in first-use order
    pub fn agents(&self) -> &[Arc<Agent>] {
        &self.agents
    }

    /// Tasks in execution order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Execution policy
    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    /// Run every task once, in order. The first failure aborts the run.
    pub async fn kickoff(&self, inputs: &CrewInputs, telemetry: &Telemetry) -> Result<CrewOutput> {
        let start = Instant::now();
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let trace = telemetry.start_run(&self.name);
        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(self.tasks.len());

        for task in &self.tasks {
            let span = telemetry.task_started(&task.key, &task.agent.role);

            match task.execute(inputs, &outputs, &self.output_dir).await {
                Ok(output) => {
                    telemetry.task_completed(span, &output);
                    if self.policy.verbose || task.agent.verbose {
                        tracing::info!(
                            agent = %output.agent_role,
                            "final answer:\n{}",
                            output.raw
                        );
                    }
                    outputs.push(output);
                }
                Err(e) => {
                    telemetry.task_failed(span, &task.key, &e);
                    self.close_trace(telemetry);
                    return Err(e);
                }
            }
        }

        let trace = self.close_trace(telemetry).unwrap_or(trace);
        let mut usage = TokenUsage::default();
        for output in &outputs {
            usage.add(output.usage);
        }

        tracing::info!(
            run_id = %trace.run_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "crew finished"
        );

        Ok(CrewOutput {
            run_id: trace.run_id,
            raw: outputs.last().map(|o| o.raw.clone()).unwrap_or_default(),
            tasks_output: outputs,
            token_usage: usage,
        })
    }

    fn close_trace(&self, telemetry: &Telemetry) -> Option<RunTrace> {
        let trace = telemetry.finish_run()?;
        if self.write_trace {
            let path = self.output_dir.join(TRACE_FILE_NAME);
            if let Err(e) = trace.save(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to write run trace");
            }
        }
        Some(trace)
    }
}

/// Result of a crew run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewOutput {
    /// Run identifier
    pub run_id: RunId,
    /// Output of the final task
    pub raw: String,
    /// Every task output, in execution order
    pub tasks_output: Vec<TaskOutput>,
    /// Tokens consumed across the run
    pub token_usage: TokenUsage,
}
