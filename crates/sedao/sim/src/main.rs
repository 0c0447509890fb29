//! sedao-sim - replay metered slots through a SEDAO ledger
//!
//! Reads a CSV of per-member consumption, settles every slot as the oracle
//! and writes member balances after each slot to a JSON report.

use anyhow::Context;
use clap::Parser;
use sedao_sim::{SimConfig, Simulation, SlotTable};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// SEDAO simulator CLI
#[derive(Parser)]
#[command(name = "sedao-sim")]
#[command(about = "Replay metered energy slots through a SEDAO ledger", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SEDAO_CONFIG")]
    config: Option<String>,

    /// Slot CSV file
    #[arg(short, long, env = "FILENAME")]
    input: Option<String>,

    /// Report output path
    #[arg(short, long)]
    output: Option<String>,

    /// Price per kWh, as a decimal
    #[arg(long, env = "KWH_PRICE")]
    kwh_price: Option<String>,

    /// Pause between slots in milliseconds
    #[arg(long)]
    slot_delay_ms: Option<u64>,

    /// Log level
    #[arg(long, env = "SEDAO_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = SimConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(input) = cli.input {
        config.input = input;
    }
    if let Some(output) = cli.output {
        config.output = output;
    }
    if let Some(price) = cli.kwh_price {
        config.kwh_price = price;
    }
    if let Some(delay) = cli.slot_delay_ms {
        config.slot_delay_ms = delay;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let text = std::fs::read_to_string(&config.input)
        .with_context(|| format!("reading {}", config.input))?;
    let table = SlotTable::parse(&text)?;
    info!(
        input = %config.input,
        slots = table.slots.len(),
        columns = table.columns.len(),
        "Slot table loaded"
    );

    let output = config.output.clone();
    let simulation = Simulation::setup(config).await?;
    let report = simulation.run(&table).await?;

    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&output, json).with_context(|| format!("writing {}", output))?;
    info!(output = %output, slots = report.len(), "Report written");

    Ok(())
}
