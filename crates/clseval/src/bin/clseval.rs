use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::config::Config;
use clap::{Parser, Subcommand};
use clseval::{
    backend::{create_device, SelectedBackend, BACKEND_NAME},
    runner::{config_from_names, load_results, run_evaluation},
};
use clseval_metric::{EvaluatorConfig, MetricKind};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clseval")]
#[command(about = "Classification metrics over recorded predictions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute metrics over a JSON Lines results file
    Evaluate {
        /// Results file, one processed sample per line
        #[arg(short, long)]
        results: PathBuf,

        /// Evaluator configuration file (JSON)
        #[arg(short, long, conflicts_with = "metric")]
        config: Option<PathBuf>,

        /// Registered metric to run with its default configuration, repeatable
        #[arg(short, long)]
        metric: Vec<String>,
    },

    /// Write the default configuration of the given metrics
    InitConfig {
        /// Output path of the configuration file
        #[arg(short, long)]
        output: PathBuf,

        /// Registered metric to include, repeatable
        #[arg(short, long, required = true)]
        metric: Vec<String>,
    },

    /// List registered metrics
    List,

    /// Show backend information
    Info,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            results,
            config,
            metric,
        } => {
            let config = match config {
                Some(path) => EvaluatorConfig::load(&path)
                    .with_context(|| format!("failed to load {}", path.display()))?,
                None if metric.is_empty() => config_from_names(&["Accuracy".to_owned()])?,
                None => config_from_names(&metric)?,
            };
            let results = load_results(&results)?;

            let device = create_device();
            tracing::info!(backend = BACKEND_NAME, "starting evaluation");
            let metrics = run_evaluation::<SelectedBackend>(&config, &results, &device)?;

            println!("{}", serde_json::to_string_pretty(&metrics)?);
            Ok(())
        }

        Commands::InitConfig { output, metric } => {
            config_from_names(&metric)?
                .save(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            tracing::info!(path = %output.display(), "configuration written");
            Ok(())
        }

        Commands::List => {
            for kind in MetricKind::ALL {
                println!("{kind}");
            }
            Ok(())
        }

        Commands::Info => {
            println!("clseval");
            println!("  Backend: {BACKEND_NAME}");
            println!("  Device: {:?}", create_device());
            Ok(())
        }
    }
}
