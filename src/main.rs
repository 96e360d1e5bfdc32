//! Atlas - 命令行入口
//!
//! 解析参数、加载配置、按阶段创建后端，运行规划并写出 JSON 与摘要。

use std::path::PathBuf;

use anyhow::Context;
use atlas::config::load_config;
use atlas::llm::ProviderKind;
use atlas::{observability, report, OrchestratorBuilder, TravelConstraints, TravelStyle};
use clap::Parser;

/// Atlas - multi-agent travel planner
#[derive(Debug, Parser)]
#[command(name = "atlas", about = "Research, plan and personalize a trip with three LLM-backed agents")]
struct Cli {
    /// Destination to plan for
    #[arg(long)]
    destination: String,

    /// Total budget in USD
    #[arg(long)]
    budget: f64,

    /// Trip duration in days
    #[arg(long)]
    days: u32,

    /// Number of travelers
    #[arg(long, default_value_t = 2)]
    travelers: u32,

    /// Travel style (budget, balanced, luxury)
    #[arg(long, default_value = "balanced")]
    style: TravelStyle,

    /// Travel preferences
    #[arg(long, num_args = 1.., default_values = ["culture", "food"])]
    preferences: Vec<String>,

    /// Places that must be visited
    #[arg(long, num_args = 1..)]
    must_visit: Vec<String>,

    /// Things to avoid
    #[arg(long, num_args = 1..)]
    avoid: Vec<String>,

    /// Output file (defaults to [app].output)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use offline mock backends for every stage
    #[arg(long)]
    mock: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.clone()).context("Failed to load config")?;
    if cli.mock {
        for section in [
            &mut config.research,
            &mut config.planning,
            &mut config.personalization,
        ] {
            section.provider = Some(ProviderKind::Mock);
        }
    }
    let output = cli.output.clone().unwrap_or_else(|| config.app.output.clone());

    let constraints = TravelConstraints::builder(cli.budget, cli.days, cli.travelers)
        .preferences(cli.preferences)
        .must_visit(cli.must_visit)
        .avoid(cli.avoid)
        .style(cli.style)
        .build()
        .context("Invalid trip constraints")?;

    let builder = OrchestratorBuilder::new(config)
        .with_span(tracing::info_span!("atlas", destination = %cli.destination));
    let missing = builder.missing_api_keys();
    if !missing.is_empty() {
        anyhow::bail!(
            "Missing API keys. Please set {} (or run with --mock)",
            missing.join(", ")
        );
    }
    let orchestrator = builder.build().context("Failed to create LLM clients")?;

    let plan = orchestrator
        .plan_trip(&cli.destination, constraints)
        .await
        .context("Trip planning failed")?;

    report::write_plan(&output, &plan)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Trip planning completed!");
    println!("Total time: {:.2} seconds", plan.total_processing_time);
    println!("Output saved to: {}", output.display());
    println!();
    println!("{}", report::summary(&plan));

    Ok(())
}
