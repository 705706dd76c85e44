use anyhow::Context;
use clap::{Parser, ValueEnum};
use ordersim::{Orchestrator, SimConfig, WorkloadMode};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Steady,
    Bursty,
}

impl From<ModeArg> for WorkloadMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Steady => WorkloadMode::Steady,
            ModeArg::Bursty => WorkloadMode::Bursty,
        }
    }
}

/// Synthetic retail-order workload simulator
#[derive(Debug, Parser)]
#[command(name = "ordersim", version, about)]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Traffic shape
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Engine-wide target rate, items per second
    #[arg(long)]
    rate: Option<f64>,

    /// Number of generator workers
    #[arg(long)]
    workers: Option<usize>,

    /// Probability a generated item is retained
    #[arg(long)]
    retained_probability: Option<f64>,

    /// Admission ceiling for retained items
    #[arg(long)]
    max_active: Option<usize>,

    /// Bounded cache capacity
    #[arg(long)]
    cache_capacity: Option<usize>,

    /// Retained-item lifetime, milliseconds
    #[arg(long)]
    item_lifetime_ms: Option<u64>,

    /// Base RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// How long to run, seconds; 0 runs until ctrl-c
    #[arg(long, default_value_t = 30)]
    duration_secs: u64,
}

impl Cli {
    fn build_config(&self) -> anyhow::Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => SimConfig::new(),
        };

        if let Some(mode) = self.mode {
            config = config.mode(mode.into());
        }
        if let Some(rate) = self.rate {
            config = config.rate(rate);
        }
        if let Some(workers) = self.workers {
            config = config.worker_count(workers);
        }
        if let Some(p) = self.retained_probability {
            config = config.retained_probability(p);
        }
        if let Some(max) = self.max_active {
            config = config.max_active(max);
        }
        if let Some(capacity) = self.cache_capacity {
            config = config.cache_capacity(capacity);
        }
        if let Some(ms) = self.item_lifetime_ms {
            config = config.item_lifetime(Duration::from_millis(ms));
        }
        if let Some(seed) = self.seed {
            config = config.seed(seed);
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.build_config()?;
    let shutdown_timeout = config.shutdown_timeout;

    let engine = Orchestrator::new(config)?;
    engine.start()?;

    if cli.duration_secs > 0 {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(cli.duration_secs)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping early");
            }
        }
    } else {
        tokio::signal::ctrl_c().await?;
        info!("interrupted, stopping");
    }

    let outcome = engine.stop(shutdown_timeout).await?;
    info!(?outcome, state = %engine.state(), "run finished");

    // The reporter published a final snapshot on its way out; reading it
    // back keeps the interval latency intact.
    let final_snapshot = engine.latest_snapshot();
    println!("{}", serde_json::to_string_pretty(&final_snapshot)?);

    Ok(())
}
