use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use groupcrab_core::config::{AggregationConfig, AggregationPlan};
use groupcrab_core::local::LocalAggregator;
use groupcrab_core::registry::FunctionRegistry;
use groupcrab_core::types::Record;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod json;

#[derive(Parser, Debug)]
#[command(name = "groupcrab")]
#[command(about = "Windowed GROUP-BY aggregation over JSON records", long_about = None)]
struct Cli {
    /// Default log level; `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate a batch of records and print one output record per line.
    Run {
        /// Job description (JSON `AggregationConfig`).
        #[arg(long)]
        config: PathBuf,
        /// JSON array of records, each an array of field values.
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 1)]
        parallelism: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Run {
            config,
            input,
            parallelism,
        } => run(&config, &input, parallelism),
    }
}

fn run(config_path: &Path, input_path: &Path, parallelism: usize) -> Result<()> {
    let config: AggregationConfig = read_json(config_path)?;
    let plan = AggregationPlan::new(config, &FunctionRegistry::new())
        .with_context(|| format!("invalid job {}", config_path.display()))?;

    let raw: Vec<serde_json::Value> = read_json(input_path)?;
    let records = raw
        .iter()
        .enumerate()
        .map(|(i, item)| {
            json::record_from_json(item, plan.input_schema())
                .with_context(|| format!("record {i} in {}", input_path.display()))
        })
        .collect::<Result<Vec<Record>>>()?;
    tracing::info!(
        records = records.len(),
        parallelism,
        output_fields = plan.output_schema().len(),
        "running aggregation"
    );

    let aggregator = LocalAggregator::new(plan);
    let output = aggregator.execute_with_parallelism(&records, parallelism)?;

    let mut out = BufWriter::new(std::io::stdout().lock());
    for record in &output {
        writeln!(out, "{}", json::record_to_json(record))?;
    }
    out.flush()?;
    tracing::info!(groups = output.len(), "aggregation finished");
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
