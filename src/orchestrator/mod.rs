//! Orchestrator module - the sequential planning crew
//!
//! # Example
//!
//! ```rust,ignore
//! use saas_planner::orchestrator::{CrewBlueprint, Definitions, SequentialCrew};
//!
//! let definitions = Definitions::builtin()?;
//! let crew = SequentialCrew::assemble("saas", &definitions, &CrewBlueprint::saas(), registry, &settings)?;
//! let result = crew.kickoff(&inputs, &telemetry).await?;
//! ```

pub mod config;
pub mod sequential;

pub use self::config::{
    AgentDefinition,
    BlueprintEntry,
    CrewBlueprint,
    Definitions,
    ResolvedCrew,
    TaskDefinition,
};
pub use self::sequential::{CrewOutput, ExecutionPolicy, SequentialCrew};
