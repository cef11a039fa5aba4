//! DuoRun CLI - inspect capability catalogs and preview routing plans.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use duorun_core::{CapabilityTag, OptimizationStrategy, TaskDescriptor, WorkerId};
use duorun_router::{CapabilityCatalog, DuoSelector, RouterConfig};

/// DuoRun CLI - capability catalog and routing tool
#[derive(Parser)]
#[command(name = "duorun")]
#[command(about = "Inspect worker catalogs and preview duo routing", long_about = None)]
struct Cli {
    /// Catalog file (defaults to $DUORUN_CATALOG)
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the catalog file
    Validate,

    /// List workers in the catalog
    Workers,

    /// Select the primary/secondary duo for a task
    Plan {
        #[command(flatten)]
        task: TaskArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank every candidate for a task
    Score {
        #[command(flatten)]
        task: TaskArgs,
    },
}

#[derive(clap::Args)]
struct TaskArgs {
    /// Required capabilities (comma separated, e.g. CODE_GENERATION,CODE_REVIEW)
    #[arg(long, value_delimiter = ',', required = true)]
    caps: Vec<CapabilityTag>,

    /// Candidate worker ids (comma separated; defaults to the whole catalog)
    #[arg(long, value_delimiter = ',')]
    workers: Vec<String>,

    /// Optimization strategy: quality, speed, cost, balanced
    #[arg(short, long, default_value = "balanced")]
    strategy: OptimizationStrategy,
}

impl TaskArgs {
    fn descriptor(
        &self,
        catalog: &CapabilityCatalog,
    ) -> Result<TaskDescriptor, Box<dyn std::error::Error>> {
        let workers: Vec<WorkerId> = if self.workers.is_empty() {
            catalog.profiles().map(|p| p.id.clone()).collect()
        } else {
            self.workers.iter().map(|w| WorkerId::new(w.trim())).collect()
        };
        Ok(TaskDescriptor::new(
            self.caps.iter().cloned(),
            workers,
            self.strategy,
        )?)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "duorun=debug" } else { "duorun=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let config = RouterConfig::from_env()?;
    let path = cli
        .catalog
        .or(config.catalog_path)
        .ok_or("no catalog given (use --catalog or set DUORUN_CATALOG)")?;
    debug!(path = %path.display(), "Loading catalog");
    let catalog = CapabilityCatalog::load(&path)?;

    match cli.command {
        Commands::Validate => {
            println!("Catalog OK: {} workers", catalog.len());
        }
        Commands::Workers => {
            list_workers(&catalog);
        }
        Commands::Plan { task, json } => {
            let descriptor = task.descriptor(&catalog)?;
            let plan = DuoSelector::new(catalog.into()).select(&descriptor)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("Primary:   {} ({})", plan.primary, plan.primary_role);
                match (&plan.secondary, &plan.secondary_role) {
                    (Some(worker), Some(role)) => println!("Secondary: {} ({})", worker, role),
                    _ => println!("Secondary: none (single-worker plan)"),
                }
                println!("Category:  {}", plan.category);
                println!("Reason:    {}", plan.rationale);
            }
        }
        Commands::Score { task } => {
            let descriptor = task.descriptor(&catalog)?;
            let ranked = DuoSelector::new(catalog.into()).rank(&descriptor);
            println!("{:<4}  {:<24}  {:>8}", "RANK", "WORKER", "SCORE");
            println!("{}", "-".repeat(40));
            for (i, candidate) in ranked.iter().enumerate() {
                println!(
                    "{:<4}  {:<24}  {:>8.3}",
                    i + 1,
                    candidate.profile.id.as_str(),
                    candidate.score
                );
            }
        }
    }

    Ok(())
}

fn list_workers(catalog: &CapabilityCatalog) {
    println!("Workers ({}):", catalog.len());
    println!(
        "{:<20}  {:>10}  {:>10}  {:>6}  {}",
        "ID", "COST/1K", "LATENCY", "MAX", "CAPABILITIES"
    );
    println!("{}", "-".repeat(90));

    for profile in catalog.profiles() {
        let mut caps: Vec<String> = profile
            .capability_scores
            .iter()
            .map(|(tag, score)| format!("{tag}={score}"))
            .collect();
        caps.sort();
        println!(
            "{:<20}  {:>10.4}  {:>8.0}ms  {:>6}  {}",
            profile.id.as_str(),
            profile.cost_per_k_tokens,
            profile.avg_latency_ms,
            profile.max_concurrent_tasks,
            caps.join(", ")
        );
    }
}
