//! smokeshow - ephemeral, write-once static sites
//!
//! `serve` runs the HTTP service; `generate-key` searches for a
//! proof-of-work token accepted by `POST /create/`.

use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use url::Url;

use common::credential::{generate_token, Threshold, DEFAULT_THRESHOLD_BITS};
use service::{Config, ConfigFile};

/// Attempts between progress dots while generating a key
const PROGRESS_EVERY: u64 = 100_000;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve(ServeArgs),
    /// Search for a token valid for site creation
    GenerateKey(GenerateKeyArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Path to a TOML config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on for HTTP requests
    #[arg(short, long)]
    port: Option<u16>,

    /// Public origin sites are served under (e.g. https://smokeshow.example.com)
    #[arg(long)]
    public_url: Option<Url>,

    /// Path to SQLite database file, in-memory sqlite if omitted
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Keep all state in process memory instead of sqlite
    #[arg(long, conflicts_with = "database")]
    memory: bool,

    /// Short-lived sites and a threshold every token passes
    #[arg(long)]
    testing: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<tracing::Level>,

    /// Directory for daily rolling log files
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateKeyArgs {
    /// Tokens must hash below 2^bits
    #[arg(long, default_value_t = DEFAULT_THRESHOLD_BITS)]
    threshold_bits: u32,
}

impl ServeArgs {
    fn into_config(self) -> Result<Config> {
        let file = match &self.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        let mut config = file.into_config()?;

        if let Some(port) = self.port {
            config.listen_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), port);
        }
        if let Some(public_url) = self.public_url {
            config.public_url = Some(public_url);
        }
        if let Some(database) = self.database {
            config.sqlite_path = Some(database);
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
        if let Some(log_dir) = self.log_dir {
            config.log_dir = Some(log_dir);
        }
        config.memory_store = self.memory;
        if self.testing {
            config.apply_testing_profile();
        }
        Ok(config)
    }
}

fn generate_key(args: GenerateKeyArgs) -> Result<()> {
    let threshold = Threshold::new(args.threshold_bits);
    println!(
        "searching for a token with sha256 below 2^{}...",
        threshold.bits()
    );

    let mut stderr = std::io::stderr();
    let generated = generate_token(&threshold, |attempt| {
        if attempt % PROGRESS_EVERY == 0 {
            let _ = write!(stderr, ".");
            let _ = stderr.flush();
        }
    });
    eprintln!();

    let mut stdout = std::io::stdout();
    writeln!(stdout, "success, attempts: {}", generated.attempts)
        .context("failed to write token")?;
    writeln!(stdout, "{}", generated.token).context("failed to write token")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => {
            let config = args.into_config()?;
            service::process::spawn_service(&config).await;
        }
        Command::GenerateKey(args) => generate_key(args)?,
    }
    Ok(())
}
