use anyhow::{Context, Result};
use clap::Parser;
use spamcoin_core::{
    build_chain_with, constants::DEFAULT_CHAIN_HEIGHT, CancelToken, MiningConfig, SystemClock,
};
use std::{io::IsTerminal, time::Duration};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "spamcoin")]
#[command(about = "Grow a toy proof-of-work block chain and print it")]
struct Cli {
    /// Total number of blocks, genesis included
    #[arg(long, default_value_t = DEFAULT_CHAIN_HEIGHT)]
    height: u64,
    /// Hashing difficulty: leading zero hex digits every block hash must have
    #[arg(long)]
    difficulty: Option<u32>,
    /// Be verbose about it
    #[arg(short, long)]
    verbose: bool,
    /// Search each block's nonces on this many threads
    #[arg(long)]
    threads: Option<usize>,
    /// Give up on a block after this many nonces
    #[arg(long)]
    max_attempts: Option<u64>,
    /// Give up on a block after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Print the chain as JSON instead of one line per block
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn mining_config(&self) -> MiningConfig {
        MiningConfig::default()
            .with_difficulty(self.difficulty)
            .with_verbose(self.verbose)
            .with_threads(self.threads)
            .with_max_attempts(self.max_attempts)
            .with_deadline(self.timeout_secs.map(Duration::from_secs))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let config = cli.mining_config();
    let report = build_chain_with(
        cli.height,
        &config,
        &SystemClock,
        &CancelToken::new(),
        |block| {
            if !cli.json {
                println!("A Block has been added to the blockchain.");
                println!("{block}");
            }
        },
    )
    .context("failed to build chain")?;

    info!(
        blocks = report.chain.len(),
        elapsed_secs = report.elapsed.as_secs_f64(),
        average_nonce = report.average_nonce(),
        "run complete"
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report.chain)?);
    } else {
        println!("Elapsed: {:.3}s", report.elapsed.as_secs_f64());
        println!("Average nonce: {:.2}", report.average_nonce());
    }
    Ok(())
}
