//! saas-planner - drafts SaaS planning documents from a product idea
//!
//! ## Usage
//!
//! ```bash
//! # Prompt for the idea, then run the full crew
//! saas-planner
//!
//! # Supply the idea and an output directory
//! saas-planner --idea "Scheduling for yoga studios" --output-dir plans/
//!
//! # Query one of the data endpoints directly
//! saas-planner fetch technology category=backend
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use saas_planner::{
    ChatClient, CrewBlueprint, CrewInputs, Definitions, FetchSpec, FetchTool, LlmRegistry,
    LogFormat, ProductIdea, ProviderConfig, SequentialCrew, Settings, Telemetry,
    TelemetryConfig, NO_IDEA_NOTICE,
};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

const IDEA_PROMPT: &str = "Please enter a brief description of your SaaS product idea: ";

/// Sequential planning crew for SaaS product ideas
#[derive(Parser, Debug)]
#[command(name = "saas-planner")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to run (the crew runs when omitted)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Product idea; prompted for on stdin when omitted
    #[arg(long)]
    idea: Option<String>,

    /// Agent definitions YAML (overrides the settings file)
    #[arg(long)]
    agents: Option<PathBuf>,

    /// Task definitions YAML (overrides the settings file)
    #[arg(long)]
    tasks: Option<PathBuf>,

    /// Directory the planning documents are written to
    #[arg(short, long, env = "SAAS_PLANNER_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Settings file (defaults to ./saas-planner.{toml,yaml,json} if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch and reshape records from one data endpoint
    Fetch {
        /// Which endpoint to query
        #[arg(value_enum)]
        source: FetchSource,

        /// Query parameters as key=value
        #[arg(value_parser = parse_query_pair)]
        params: Vec<(String, String)>,

        /// Override the endpoint URL
        #[arg(long)]
        url: Option<url::Url>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FetchSource {
    /// SaaS market reports
    MarketData,
    /// Technology stack trends
    Technology,
    /// Financial projections
    Financial,
}

impl FetchSource {
    fn spec(self) -> saas_planner::Result<FetchSpec> {
        match self {
            FetchSource::MarketData => FetchSpec::market_data(),
            FetchSource::Technology => FetchSpec::technology_stack(),
            FetchSource::Financial => FetchSpec::financial_analysis(),
        }
    }
}

fn parse_query_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env_file(None);
    let cli = Cli::parse();

    let telemetry = Telemetry::init(&TelemetryConfig {
        format: if cli.log_json {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        },
        ..TelemetryConfig::default()
    });

    let result = match &cli.command {
        Some(Commands::Fetch {
            source,
            params,
            url,
        }) => run_fetch(*source, params, url.clone()).await,
        None => run_crew(&cli, &telemetry).await,
    };

    telemetry.shutdown();
    result
}

/// Load `.env` (or `path`) into the process environment. Runs before
/// anything reads the environment; a missing file is not an error.
fn load_env_file(path: Option<&Path>) {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|_| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    if let Err(e) = loaded {
        if !e.not_found() {
            eprintln!("warning: could not load .env: {}", e);
        }
    }
}

async fn run_fetch(
    source: FetchSource,
    params: &[(String, String)],
    url: Option<url::Url>,
) -> anyhow::Result<()> {
    let mut spec = source.spec()?;
    if let Some(url) = url {
        spec = spec.with_base_url(url);
    }
    let tool = FetchTool::new(spec)?;

    match tool.fetch(params).await {
        Ok(records) => {
            println!("{}", serde_json::to_string_pretty(&records)?);
            Ok(())
        }
        Err(e) => anyhow::bail!(e),
    }
}

async fn run_crew(cli: &Cli, telemetry: &Telemetry) -> anyhow::Result<()> {
    let raw_idea = match &cli.idea {
        Some(idea) => idea.clone(),
        None => prompt_for_idea(std::io::stdin().lock(), std::io::stdout())?,
    };
    let Some(idea) = ProductIdea::parse(&raw_idea) else {
        println!("{}", NO_IDEA_NOTICE);
        return Ok(());
    };

    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = dir.clone();
    }
    if let Some(agents) = &cli.agents {
        settings.agents_file = Some(agents.clone());
    }
    if let Some(tasks) = &cli.tasks {
        settings.tasks_file = Some(tasks.clone());
    }

    let registry = LlmRegistry::new()
        .with(ChatClient::new(ProviderConfig::groq_from_env()?)?.into_handle())
        .with(ChatClient::new(ProviderConfig::ollama()?)?.into_handle());

    let definitions = Definitions::load(
        settings.agents_file.as_deref(),
        settings.tasks_file.as_deref(),
    )
    .context("loading agent and task definitions")?;

    let crew = SequentialCrew::assemble(
        "saas-planning",
        &definitions,
        &CrewBlueprint::saas(),
        registry,
        &settings,
    )?;

    let output = crew
        .kickoff(&CrewInputs::for_idea(&idea), telemetry)
        .await?;

    println!("Analysis Result:");
    println!("{}", output.raw);
    Ok(())
}

fn prompt_for_idea(mut input: impl BufRead, mut output: impl Write) -> anyhow::Result<String> {
    write!(output, "{}", IDEA_PROMPT)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line)
}
