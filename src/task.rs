//! Tasks: one instruction, one agent, one output file

use crate::agent::Agent;
use crate::error::{Error, Result};
use crate::inputs::CrewInputs;
use crate::types::TokenUsage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Separator between prior task outputs in the forwarded context
pub const CONTEXT_SEPARATOR: &str = "\n\n----------\n\n";

/// A unit of work bound to exactly one agent and one output file
#[derive(Debug, Clone)]
pub struct Task {
    /// Definition key (e.g. "market_research_task")
    pub key: String,
    /// Instruction template; `{placeholders}` are filled from run inputs
    pub description: String,
    /// What a complete answer looks like
    pub expected_output: String,
    /// Agent that performs the task
    pub agent: Arc<Agent>,
    /// File the result is written to, relative to the output directory
    pub output_file: PathBuf,
}

impl Task {
    /// Prompt for this task given run inputs and the outputs of earlier tasks
    pub fn prompt(&self, inputs: &CrewInputs, prior_outputs: &[TaskOutput]) -> String {
        let mut prompt = format!(
            "Current Task: {}\n\nThis is the expected criteria for your final answer: {}\n\
             You MUST return the actual complete content as the final answer, not a summary.",
            inputs.interpolate(&self.description),
            inputs.interpolate(&self.expected_output),
        );

        if !prior_outputs.is_empty() {
            let context = prior_outputs
                .iter()
                .map(|output| output.raw.as_str())
                .collect::<Vec<_>>()
                .join(CONTEXT_SEPARATOR);
            prompt.push_str("\n\nThis is the context you're working with:\n");
            prompt.push_str(&context);
        }

        prompt
    }

    /// Run the task through its agent and write the result under `output_dir`
    pub async fn execute(
        &self,
        inputs: &CrewInputs,
        prior_outputs: &[TaskOutput],
        output_dir: &Path,
    ) -> Result<TaskOutput> {
        let prompt = self.prompt(inputs, prior_outputs);
        let output = self
            .agent
            .perform(inputs, &prompt)
            .await
            .map_err(|e| Error::task(&self.key, e.to_string()))?;

        let path = output_dir.join(&self.output_file);
        write_output(&path, &output.content)
            .await
            .map_err(|e| Error::task(&self.key, format!("writing {}: {}", path.display(), e)))?;

        Ok(TaskOutput {
            task_key: self.key.clone(),
            agent_role: output.role,
            raw: output.content,
            output_path: path,
            usage: output.usage,
        })
    }
}

async fn write_output(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content.as_bytes()).await
}

/// Result of one executed task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Key of the task
    pub task_key: String,
    /// Role of the agent that performed it
    pub agent_role: String,
    /// Raw text produced
    pub raw: String,
    /// Where the text was written
    pub output_path: PathBuf,
    /// Tokens consumed
    pub usage: TokenUsage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::inputs::ProductIdea;
    use crate::llm_client::LlmHandle;
    use crate::testing::ScriptedClient;

    fn task(client: Arc<ScriptedClient>) -> Task {
        let agent = Agent::builder()
            .key("financial_analyst")
            .role("Financial Analyst")
            .goal("Model revenue")
            .llm(LlmHandle::new("groq", ModelConfig::new("m"), client))
            .build()
            .unwrap();
        Task {
            key: "financial_modeling_task".to_string(),
            description: "Project revenue for {product_idea}.".to_string(),
            expected_output: "A three-year model.".to_string(),
            agent: Arc::new(agent),
            output_file: PathBuf::from("financial_analysis.md"),
        }
    }

    fn prior(raw: &str) -> TaskOutput {
        TaskOutput {
            task_key: "t".to_string(),
            agent_role: "r".to_string(),
            raw: raw.to_string(),
            output_path: PathBuf::from("x.md"),
            usage: TokenUsage::default(),
        }
    }

    #[test]
    fn prompt_interpolates_and_appends_context() {
        let task = task(Arc::new(ScriptedClient::replying("ok")));
        let inputs = CrewInputs::for_idea(&ProductIdea::parse("pet insurance").unwrap());

        let first = task.prompt(&inputs, &[]);
        assert!(first.starts_with("Current Task: Project revenue for pet insurance."));
        assert!(!first.contains("context you're working with"));

        let later = task.prompt(&inputs, &[prior("market notes"), prior("stack notes")]);
        assert!(later.ends_with("market notes\n\n----------\n\nstack notes"));
    }

    #[tokio::test]
    async fn execute_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let task = task(Arc::new(ScriptedClient::replying("# Model\nRevenue grows.")));

        let output = task
            .execute(&CrewInputs::new(), &[], dir.path())
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("financial_analysis.md")).unwrap();
        assert_eq!(written, "# Model\nRevenue grows.");
        assert_eq!(output.output_path, dir.path().join("financial_analysis.md"));
        assert_eq!(output.agent_role, "Financial Analyst");
    }

    #[tokio::test]
    async fn nested_output_file_creates_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = task(Arc::new(ScriptedClient::replying("stack notes")));
        task.output_file = PathBuf::from("docs/tech.md");

        let output = task
            .execute(&CrewInputs::new(), &[], dir.path())
            .await
            .unwrap();

        assert_eq!(output.output_path, dir.path().join("docs/tech.md"));
        let written = std::fs::read_to_string(dir.path().join("docs").join("tech.md")).unwrap();
        assert_eq!(written, "stack notes");
    }

    #[tokio::test]
    async fn write_failure_names_the_task() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let task = task(Arc::new(ScriptedClient::replying("ok")));

        let err = task
            .execute(&CrewInputs::new(), &[], &blocker)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Task { ref task, .. } if task == "financial_modeling_task"));
    }

    #[tokio::test]
    async fn agent_failure_names_the_task() {
        let dir = tempfile::tempdir().unwrap();
        let task = task(Arc::new(ScriptedClient::numbered().failing_on(1)));

        let err = task
            .execute(&CrewInputs::new(), &[], dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Task { ref task, .. } if task == "financial_modeling_task"));
        assert!(!dir.path().join("financial_analysis.md").exists());
    }
}
