//! SR Simulate - run a Selective Repeat transfer over a simulated link
//!
//! Parameters come from an optional TOML file; flags override it.
//!
//! Examples:
//!   sr-simulate --messages 1000 --loss 0.1
//!   sr-simulate --config lossy.toml --seed 7
//!   sr-simulate --loss 0.2 --write-config lossy.toml

use clap::Parser;
use sr::sim::Simulation;
use sr_cli::{display_report, summary_line, FileConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sr-simulate")]
#[command(about = "Selective Repeat transfer simulator", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Window size on both ends
    #[arg(short, long)]
    window: Option<u32>,

    /// Sequence number modulus (at least twice the window)
    #[arg(short = 'k', long)]
    modulus: Option<u32>,

    /// Retransmission timeout in ticks
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Number of messages to transfer
    #[arg(short = 'n', long)]
    messages: Option<u64>,

    /// Loss probability, both directions
    #[arg(long)]
    loss: Option<f64>,

    /// Corruption probability, both directions
    #[arg(long)]
    corruption: Option<f64>,

    /// Duplication probability, both directions
    #[arg(long)]
    duplication: Option<f64>,

    /// Minimum channel delay in ticks
    #[arg(long)]
    min_delay: Option<u64>,

    /// Maximum channel delay in ticks
    #[arg(long)]
    max_delay: Option<u64>,

    /// Ticks between application sends
    #[arg(long)]
    interval: Option<u64>,

    /// RNG seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Give up after this many ticks
    #[arg(long)]
    max_time: Option<u64>,

    /// Write the effective configuration to this file and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// One summary line instead of the full table
    #[arg(short, long)]
    quiet: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Apply flag overrides on top of the file configuration
    fn apply(&self, config: &mut FileConfig) {
        let p = &mut config.protocol;
        if let Some(window) = self.window {
            p.window_size = window;
            p.receive_window = Some(window);
        }
        if let Some(modulus) = self.modulus {
            p.modulus = modulus;
        }
        if let Some(timeout) = self.timeout {
            p.timeout_ticks = timeout;
        }

        for channel in [&mut config.data_channel, &mut config.ack_channel] {
            if let Some(loss) = self.loss {
                channel.loss = loss;
            }
            if let Some(corruption) = self.corruption {
                channel.corruption = corruption;
            }
            if let Some(duplication) = self.duplication {
                channel.duplication = duplication;
            }
            if let Some(min_delay) = self.min_delay {
                channel.min_delay = min_delay;
            }
            if let Some(max_delay) = self.max_delay {
                channel.max_delay = max_delay;
            }
        }

        let run = &mut config.run;
        if let Some(messages) = self.messages {
            run.messages = messages;
        }
        if let Some(interval) = self.interval {
            run.send_interval = interval;
        }
        if let Some(seed) = self.seed {
            run.seed = seed;
        }
        if let Some(max_time) = self.max_time {
            run.max_time = max_time;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let log_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut file_config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            FileConfig::from_file(path)?
        }
        None => FileConfig::default(),
    };
    args.apply(&mut file_config);

    let config = file_config.to_sim_config()?;

    if let Some(path) = &args.write_config {
        FileConfig::from(&config).to_file(path)?;
        tracing::info!("Configuration written to {}", path.display());
        return Ok(());
    }

    tracing::info!(
        window = config.protocol.window_size,
        modulus = config.protocol.modulus,
        timeout = config.protocol.timeout_ticks,
        messages = config.messages,
        seed = config.seed,
        "starting simulation"
    );

    let mut simulation = Simulation::new(config)?;
    let report = simulation.run();

    if args.quiet {
        println!("{}", summary_line(&report));
    } else {
        display_report(&report);
    }

    if !report.complete {
        anyhow::bail!(
            "transfer incomplete: {} of {} messages delivered by {}",
            report.delivered,
            report.messages,
            report.finished_at
        );
    }
    if !report.exactly_once_in_order {
        anyhow::bail!("delivered payloads are not exactly once and in order");
    }

    Ok(())
}
