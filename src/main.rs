use clap::Parser;
use log::{error, info};
use ringstage::config::{load_config, Config, OverflowPolicy};
use ringstage::error::Error;
use ringstage::pump::Pump;
use ringstage::sources::open_source;
use std::process::ExitCode;
use tokio::io::AsyncWrite;

/// Stage a byte stream through a fixed-capacity circular buffer.
#[derive(Debug, Parser)]
#[command(name = "ringstage", version)]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<String>,
    /// Buffer capacity in bytes
    #[arg(long)]
    capacity: Option<usize>,
    /// Overflow policy: overwrite or reject
    #[arg(long)]
    policy: Option<String>,
    /// Input file (stdin when absent)
    #[arg(short, long)]
    input: Option<String>,
    /// Output file (stdout when absent)
    #[arg(short, long)]
    output: Option<String>,
    /// Pause between drains in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,
}

fn build_config(args: Args) -> Result<Config, Error> {
    let mut cfg = match args.config.as_deref() {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if let Some(capacity) = args.capacity {
        cfg.buffer.capacity = capacity;
    }
    if let Some(policy) = args.policy {
        OverflowPolicy::parse(&policy)?;
        cfg.buffer.policy = Some(policy);
    }
    if args.input.is_some() {
        cfg.input.path = args.input;
    }
    if args.output.is_some() {
        cfg.output.path = args.output;
    }
    if let Some(ms) = args.interval_ms {
        cfg.output.interval_ms = ms;
    }
    cfg.validate()?;
    Ok(cfg)
}

async fn open_sink(path: Option<&str>) -> Result<Box<dyn AsyncWrite + Unpin + Send>, Error> {
    match path {
        Some(path) => {
            info!("Writing to {}", path);
            Ok(Box::new(tokio::fs::File::create(path).await?))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

async fn run(cfg: Config) -> Result<(), Error> {
    let pump = Pump::from_config(&cfg)?;
    let mut source = open_source(&cfg.input).await?;
    let mut sink = open_sink(cfg.output.path.as_deref()).await?;

    let stats = pump.run(&mut *source, &mut *sink).await?;
    info!(
        "Done: {} bytes in, {} staged, {} dropped, {} out",
        stats.bytes_in, stats.bytes_staged, stats.bytes_dropped, stats.bytes_out
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    let cfg = match build_config(Args::parse()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };

    match run(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Staging failed: {} (status {})", e, e.to_status_code());
            ExitCode::FAILURE
        }
    }
}
