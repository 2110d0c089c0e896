//! Crew definitions: agents and tasks from YAML, bound by a blueprint
//!
//! The YAML files only carry text (roles, goals, task descriptions). Which
//! agent performs which task, and where the result is written, comes from a
//! [`CrewBlueprint`]. [`Definitions::resolve`] joins the two and fails on the
//! first key that does not line up, before any task runs.

use crate::agent::Agent;
use crate::error::{Error, Result};
use crate::llm_client::LlmRegistry;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Agent definitions shipped with the crate
pub const DEFAULT_AGENTS_YAML: &str = include_str!("../../config/agents.yaml");

/// Task definitions shipped with the crate
pub const DEFAULT_TASKS_YAML: &str = include_str!("../../config/tasks.yaml");

/// One agent entry in `agents.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Role name
    pub role: Option<String>,
    /// Goal text
    pub goal: Option<String>,
    /// Backstory text
    pub backstory: Option<String>,
    /// Model handle name
    pub llm: Option<String>,
    /// Delegation flag
    #[serde(default)]
    pub allow_delegation: bool,
}

/// One task entry in `tasks.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Instruction template
    pub description: Option<String>,
    /// Expected output text
    pub expected_output: Option<String>,
}

/// Parsed agent and task definition files
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    /// Agent entries by key
    pub agents: BTreeMap<String, AgentDefinition>,
    /// Task entries by key
    pub tasks: BTreeMap<String, TaskDefinition>,
}

impl Definitions {
    /// Parse both definition documents
    pub fn from_yaml(agents_yaml: &str, tasks_yaml: &str) -> Result<Self> {
        Ok(Self {
            agents: serde_yaml::from_str(agents_yaml)?,
            tasks: serde_yaml::from_str(tasks_yaml)?,
        })
    }

    /// Definitions compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(DEFAULT_AGENTS_YAML, DEFAULT_TASKS_YAML)
    }

    /// Load from the given paths, falling back to the built-in file for
    /// whichever is not given
    pub fn load(agents: Option<&Path>, tasks: Option<&Path>) -> Result<Self> {
        let agents_yaml = match agents {
            Some(path) => read(path)?,
            None => DEFAULT_AGENTS_YAML.to_string(),
        };
        let tasks_yaml = match tasks {
            Some(path) => read(path)?,
            None => DEFAULT_TASKS_YAML.to_string(),
        };
        Self::from_yaml(&agents_yaml, &tasks_yaml)
    }

    /// Build typed agents and tasks in blueprint order
    pub fn resolve(
        &self,
        blueprint: &CrewBlueprint,
        registry: &LlmRegistry,
        verbose: bool,
    ) -> Result<ResolvedCrew> {
        blueprint.validate()?;

        let mut agents: Vec<Arc<Agent>> = Vec::new();
        let mut tasks = Vec::with_capacity(blueprint.entries.len());

        for entry in &blueprint.entries {
            let agent = match agents.iter().find(|a| a.key == entry.agent) {
                Some(agent) => agent.clone(),
                None => {
                    let agent = Arc::new(self.build_agent(&entry.agent, &entry.task, registry, verbose)?);
                    agents.push(agent.clone());
                    agent
                }
            };

            let definition = self
                .tasks
                .get(&entry.task)
                .ok_or_else(|| Error::unresolved("task", &entry.task, "crew blueprint"))?;
            let description = required(&definition.description, "task", &entry.task, "description")?;
            let expected_output =
                required(&definition.expected_output, "task", &entry.task, "expected_output")?;

            tasks.push(Task {
                key: entry.task.clone(),
                description,
                expected_output,
                agent,
                output_file: entry.output_file.clone(),
            });
        }

        Ok(ResolvedCrew { agents, tasks })
    }

    fn build_agent(
        &self,
        key: &str,
        task_key: &str,
        registry: &LlmRegistry,
        verbose: bool,
    ) -> Result<Agent> {
        let definition = self
            .agents
            .get(key)
            .ok_or_else(|| Error::unresolved("agent", key, task_key))?;

        let llm_name = definition
            .llm
            .as_deref()
            .map(str::trim)
            .unwrap_or(crate::config::presets::GROQ);
        let llm = registry.resolve(llm_name, key)?;

        Agent::builder()
            .key(key)
            .role(required(&definition.role, "agent", key, "role")?)
            .goal(required(&definition.goal, "agent", key, "goal")?)
            .backstory(required(&definition.backstory, "agent", key, "backstory")?)
            .allow_delegation(definition.allow_delegation)
            .verbose(verbose)
            .llm(llm)
            .build()
    }
}

/// Agents and tasks ready to run
#[derive(Debug, Clone)]
pub struct ResolvedCrew {
    /// Agents in first-use order
    pub agents: Vec<Arc<Agent>>,
    /// Tasks in execution order
    pub tasks: Vec<Task>,
}

/// Binds a task key to its agent key and output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintEntry {
    /// Agent definition key
    pub agent: String,
    /// Task definition key
    pub task: String,
    /// Output file name
    pub output_file: PathBuf,
}

impl BlueprintEntry {
    /// Create an entry
    pub fn new(agent: &str, task: &str, output_file: &str) -> Self {
        Self {
            agent: agent.to_string(),
            task: task.to_string(),
            output_file: PathBuf::from(output_file),
        }
    }
}

/// Ordered execution plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewBlueprint {
    /// Entries in execution order
    pub entries: Vec<BlueprintEntry>,
}

impl CrewBlueprint {
    /// The eight-step SaaS planning crew
    pub fn saas() -> Self {
        Self {
            entries: vec![
                BlueprintEntry::new("market_analyst", "market_research_task", "market_analysis.md"),
                BlueprintEntry::new(
                    "technology_architect",
                    "technology_selection_task",
                    "technology_selection.md",
                ),
                BlueprintEntry::new("ux_designer", "ux_design_task", "ui_design.md"),
                BlueprintEntry::new(
                    "compliance_officer",
                    "compliance_audit_task",
                    "compliance_report.md",
                ),
                BlueprintEntry::new(
                    "financial_analyst",
                    "financial_modeling_task",
                    "financial_analysis.md",
                ),
                BlueprintEntry::new(
                    "agile_coach",
                    "agile_implementation_task",
                    "agile_implementation.md",
                ),
                BlueprintEntry::new(
                    "customer_support_manager",
                    "customer_support_setup_task",
                    "customer_support_setup.md",
                ),
                BlueprintEntry::new(
                    "marketing_strategist",
                    "marketing_campaign_task",
                    "marketing_strategy.md",
                ),
            ],
        }
    }

    /// Reject empty plans, repeated tasks or files, and output paths that
    /// escape the output directory
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(Error::config("crew blueprint has no tasks"));
        }

        let mut tasks = HashSet::new();
        let mut files = HashSet::new();
        for entry in &self.entries {
            if !tasks.insert(entry.task.as_str()) {
                return Err(Error::config(format!("task '{}' is listed twice", entry.task)));
            }
            if !files.insert(entry.output_file.as_path()) {
                return Err(Error::config(format!(
                    "output file '{}' is used by more than one task",
                    entry.output_file.display()
                )));
            }
            let plain = entry
                .output_file
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
            if !plain || entry.output_file.as_os_str().is_empty() {
                return Err(Error::config(format!(
                    "output file '{}' of task '{}' must be a relative path inside the output directory",
                    entry.output_file.display(),
                    entry.task
                )));
            }
        }
        Ok(())
    }
}

impl Default for CrewBlueprint {
    fn default() -> Self {
        Self::saas()
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("Failed to read {}: {}", path.display(), e)))
}

fn required(
    value: &Option<String>,
    kind: &'static str,
    key: &str,
    field: &'static str,
) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(Error::missing_field(kind, key, field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::llm_client::LlmHandle;
    use crate::testing::ScriptedClient;

    fn registry() -> LlmRegistry {
        let client = Arc::new(ScriptedClient::replying("ok"));
        LlmRegistry::new().with(LlmHandle::new("groq", ModelConfig::new("llama3-70b-8192"), client))
    }

    #[test]
    fn builtin_definitions_resolve_to_eight_tasks() {
        let crew = Definitions::builtin()
            .unwrap()
            .resolve(&CrewBlueprint::saas(), &registry(), true)
            .unwrap();

        assert_eq!(crew.agents.len(), 8);
        let keys: Vec<&str> = crew.tasks.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(
            keys,
            [
                "market_research_task",
                "technology_selection_task",
                "ux_design_task",
                "compliance_audit_task",
                "financial_modeling_task",
                "agile_implementation_task",
                "customer_support_setup_task",
                "marketing_campaign_task",
            ]
        );
        assert_eq!(crew.tasks[2].agent.role, "UX Designer");
        assert!(crew.agents.iter().all(|a| !a.allow_delegation));
    }

    #[test]
    fn unknown_agent_key_fails_at_load() {
        let defs = Definitions::from_yaml(
            "analyst:\n  role: A\n  goal: G\n  backstory: B\n",
            "t:\n  description: D\n  expected_output: E\n",
        )
        .unwrap();
        let blueprint = CrewBlueprint {
            entries: vec![BlueprintEntry::new("missing_agent", "t", "t.md")],
        };

        let err = defs.resolve(&blueprint, &registry(), false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unresolved agent 'missing_agent' referenced by 't'"
        );
    }

    #[test]
    fn unknown_llm_handle_fails_at_load() {
        let defs = Definitions::from_yaml(
            "analyst:\n  role: A\n  goal: G\n  backstory: B\n  llm: claude\n",
            "t:\n  description: D\n  expected_output: E\n",
        )
        .unwrap();
        let blueprint = CrewBlueprint {
            entries: vec![BlueprintEntry::new("analyst", "t", "t.md")],
        };

        let err = defs.resolve(&blueprint, &registry(), false).unwrap_err();
        assert!(matches!(err, Error::UnresolvedKey { kind: "llm", .. }));
    }

    #[test]
    fn blank_goal_is_a_missing_field() {
        let defs = Definitions::from_yaml(
            "analyst:\n  role: A\n  goal: '  '\n  backstory: B\n",
            "t:\n  description: D\n  expected_output: E\n",
        )
        .unwrap();
        let blueprint = CrewBlueprint {
            entries: vec![BlueprintEntry::new("analyst", "t", "t.md")],
        };

        let err = defs.resolve(&blueprint, &registry(), false).unwrap_err();
        assert_eq!(err.to_string(), "Missing field 'goal' in agent 'analyst'");
    }

    #[test]
    fn blueprint_rejects_escaping_paths_and_duplicates() {
        let escaping = CrewBlueprint {
            entries: vec![BlueprintEntry::new("a", "t", "../t.md")],
        };
        assert!(escaping.validate().is_err());

        let duplicate = CrewBlueprint {
            entries: vec![
                BlueprintEntry::new("a", "t1", "same.md"),
                BlueprintEntry::new("b", "t2", "same.md"),
            ],
        };
        assert!(duplicate.validate().is_err());

        assert!(CrewBlueprint::saas().validate().is_ok());
    }

    #[test]
    fn folded_yaml_text_is_trimmed() {
        let defs = Definitions::builtin().unwrap();
        let role = defs.agents["market_analyst"].role.clone().unwrap();
        assert_eq!(role, "Market Analyst\n");
        assert_eq!(required(&Some(role), "agent", "k", "role").unwrap(), "Market Analyst");
    }
}
