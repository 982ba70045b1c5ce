//! Intraday hedged-SMA trading simulator.
//!
//! # Usage
//!
//! ```bash
//! # Run one session with default parameters
//! hedgesim-backtest run
//!
//! # Reproducible session from a config file
//! hedgesim-backtest run --config config/default.toml --seed 42
//!
//! # Machine-readable result
//! hedgesim-backtest run --seed 42 --json
//!
//! # Value a single option
//! hedgesim-backtest quote --kind put --spot 100 --strike 95
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hedgesim_backtest::backtest::{Session, SessionConfig};
use hedgesim_backtest::data::OptionType;
use hedgesim_backtest::pricing;

const SEPARATOR: &str = "============================================================";

/// Trade lines already go to stdout, so library logs stay quiet unless
/// `RUST_LOG` asks for them.
const DEFAULT_LOG_FILTER: &str = "hedgesim_backtest=warn";

#[derive(Parser)]
#[command(name = "hedgesim-backtest")]
#[command(about = "Intraday moving-average trading simulator with option hedges")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one trading session
    Run {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed for the price feed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Override ticks per session
        #[arg(short, long)]
        ticks: Option<u32>,

        /// Print the result as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Value a European option with Black-Scholes
    Quote {
        /// call or put
        #[arg(short, long)]
        kind: OptionType,

        /// Underlying price
        #[arg(long)]
        spot: f64,

        /// Strike price
        #[arg(long)]
        strike: f64,

        /// Time to maturity
        #[arg(long, default_value_t = 0.1)]
        maturity: f64,

        /// Risk-free rate
        #[arg(long, default_value_t = 0.01)]
        rate: f64,

        /// Volatility
        #[arg(long, default_value_t = 0.20)]
        volatility: f64,
    },
}

fn main() -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            seed,
            ticks,
            json,
        } => cmd_run(config, seed, ticks, json),
        Commands::Quote {
            kind,
            spot,
            strike,
            maturity,
            rate,
            volatility,
        } => cmd_quote(kind, spot, strike, maturity, rate, volatility),
    }
}

/// `RUST_LOG` when set and parseable, otherwise [`DEFAULT_LOG_FILTER`].
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn cmd_run(
    config_path: Option<PathBuf>,
    seed: Option<u64>,
    ticks: Option<u32>,
    json: bool,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => SessionConfig::from_toml(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    if let Some(ticks) = ticks {
        config.ticks_per_session = ticks;
    }

    let session = Session::new(config.clone()).context("Invalid session configuration")?;

    if json {
        let result = session.run().context("Session failed")?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", SEPARATOR);
    println!("Initial Balance: ${:.2}", config.initial_balance);
    println!("Instruments: {}", config.instruments.join(", "));
    println!("{}", SEPARATOR);

    let result = session
        .run_with(|sample, report| {
            for event in &report.events {
                println!("[{}] {}", sample.time.format("%H:%M"), event);
            }
        })
        .context("Session failed")?;

    println!("\n--- End of session ---");
    for event in &result.settlement.events {
        println!("{}", event);
    }

    println!("\n{}", SEPARATOR);
    println!("{}", result.summary());
    println!("{}", SEPARATOR);

    Ok(())
}

fn cmd_quote(
    kind: OptionType,
    spot: f64,
    strike: f64,
    maturity: f64,
    rate: f64,
    volatility: f64,
) -> Result<()> {
    if spot <= 0.0 || strike <= 0.0 || maturity <= 0.0 {
        anyhow::bail!("spot, strike and maturity must be positive");
    }
    if volatility < 0.0 {
        anyhow::bail!("volatility must be non-negative");
    }

    let value = pricing::value(kind, spot, strike, maturity, rate, volatility);
    println!(
        "{} spot={:.2} strike={:.2} T={} r={} vol={}: {:.4}",
        kind, spot, strike, maturity, rate, volatility, value
    );
    Ok(())
}
